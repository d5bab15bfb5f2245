use tracing::debug;

use crate::{
    cache::{
        CacheError, DUMMY_ID, EntityKind, Row, Store,
        store::{self, RowReader},
    },
    types::DeviceInfo,
};

/// A playback device as last reported by the player API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub device_type: String,
    pub is_active: bool,
    pub is_private_session: bool,
    pub is_restricted: bool,
    pub supports_volume: bool,
    pub volume_percent: Option<i64>,
}

impl Device {
    /// `None` for devices the API reports without an id.
    pub fn from_info(info: &DeviceInfo) -> Option<Self> {
        let id = info.id.clone().filter(|id| !id.is_empty())?;
        Some(Self {
            id,
            name: info.name.clone(),
            device_type: info.device_type.clone(),
            is_active: info.is_active,
            is_private_session: info.is_private_session,
            is_restricted: info.is_restricted,
            supports_volume: info.supports_volume,
            volume_percent: info.volume_percent.map(i64::from),
        })
    }

    pub fn load<S: Store>(store: &S, id: &str) -> Result<Option<Device>, CacheError> {
        if id == DUMMY_ID {
            return Err(CacheError::DummyId {
                kind: EntityKind::Device,
            });
        }
        store
            .get(EntityKind::Device, id)?
            .map(|row| Device::from_row(&row))
            .transpose()
    }

    fn from_row(row: &Row) -> Result<Self, CacheError> {
        let r = RowReader::new(EntityKind::Device, row);
        Ok(Self {
            id: r.text("id")?,
            name: r.text("name")?,
            device_type: r.opt_text("device_type")?.unwrap_or_default(),
            is_active: r.flag("is_active")?,
            is_private_session: r.flag("is_private_session")?,
            is_restricted: r.flag("is_restricted")?,
            supports_volume: r.flag("supports_volume")?,
            volume_percent: r.opt_int("volume_percent")?,
        })
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("id".into(), store::text(&self.id));
        row.insert("name".into(), store::text(&self.name));
        row.insert("device_type".into(), store::text(&self.device_type));
        row.insert("is_active".into(), store::int(self.is_active as i64));
        row.insert("is_private_session".into(), store::int(self.is_private_session as i64));
        row.insert("is_restricted".into(), store::int(self.is_restricted as i64));
        row.insert("supports_volume".into(), store::int(self.supports_volume as i64));
        row.insert(
            "volume_percent".into(),
            self.volume_percent.map_or(store::SqlValue::Null, store::int),
        );
        row
    }

    /// Inserts the device or overwrites every column of the cached row.
    pub fn save<S: Store>(&self, store: &S) -> Result<(), CacheError> {
        let row = self.to_row();
        if !store.insert(EntityKind::Device, &row)? {
            for (column, value) in row {
                if column != "id" {
                    store.update_column(EntityKind::Device, &self.id, &column, value)?;
                }
            }
        }
        Ok(())
    }

    /// Upserts every reported device and returns the cached wrappers.
    pub fn refresh_all<S: Store>(store: &S, infos: &[DeviceInfo]) -> Result<Vec<Device>, CacheError> {
        let devices: Vec<Device> = infos.iter().filter_map(Device::from_info).collect();
        for device in &devices {
            device.save(store)?;
        }
        debug!(count = devices.len(), "refreshed devices");
        Ok(devices)
    }
}
