use tracing::debug;

use crate::cache::{
    CacheError, DUMMY_ID, EntityKind, INITIAL_POPULARITY, Row, SqlValue, Store, StoreError,
    store::{self, RowReader},
};

/// Closed interval of one audio feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRange {
    pub lower: f64,
    pub upper: f64,
}

impl FeatureRange {
    pub const fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }
}

/// Audio feature ranges a track has to fall into to match a genre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioFeatureBounds {
    pub acousticness: FeatureRange,
    pub danceability: FeatureRange,
    pub energy: FeatureRange,
    pub instrumentalness: FeatureRange,
    pub key: FeatureRange,
    pub liveness: FeatureRange,
    pub loudness: FeatureRange,
    pub mode: FeatureRange,
    pub speechiness: FeatureRange,
    pub tempo: FeatureRange,
    pub valence: FeatureRange,
}

impl Default for AudioFeatureBounds {
    /// The full range Spotify documents for each feature.
    fn default() -> Self {
        Self {
            acousticness: FeatureRange::new(0.0, 1.0),
            danceability: FeatureRange::new(0.0, 1.0),
            energy: FeatureRange::new(0.0, 1.0),
            instrumentalness: FeatureRange::new(0.0, 1.0),
            key: FeatureRange::new(-1.0, 11.0),
            liveness: FeatureRange::new(0.0, 1.0),
            loudness: FeatureRange::new(-60.0, 0.0),
            mode: FeatureRange::new(0.0, 1.0),
            speechiness: FeatureRange::new(0.0, 1.0),
            tempo: FeatureRange::new(0.0, 250.0),
            valence: FeatureRange::new(0.0, 1.0),
        }
    }
}

impl AudioFeatureBounds {
    /// Every feature with its range, in column order.
    pub fn ranges(&self) -> [(&'static str, FeatureRange); 11] {
        [
            ("acousticness", self.acousticness),
            ("danceability", self.danceability),
            ("energy", self.energy),
            ("instrumentalness", self.instrumentalness),
            ("key", self.key),
            ("liveness", self.liveness),
            ("loudness", self.loudness),
            ("mode", self.mode),
            ("speechiness", self.speechiness),
            ("tempo", self.tempo),
            ("valence", self.valence),
        ]
    }

    fn from_reader(r: &RowReader<'_>) -> Result<Self, StoreError> {
        let range = |feature: &str| -> Result<FeatureRange, StoreError> {
            Ok(FeatureRange::new(
                r.real(&format!("{}_lower", feature))?,
                r.real(&format!("{}_upper", feature))?,
            ))
        };
        Ok(Self {
            acousticness: range("acousticness")?,
            danceability: range("danceability")?,
            energy: range("energy")?,
            instrumentalness: range("instrumentalness")?,
            key: range("key")?,
            liveness: range("liveness")?,
            loudness: range("loudness")?,
            mode: range("mode")?,
            speechiness: range("speechiness")?,
            tempo: range("tempo")?,
            valence: range("valence")?,
        })
    }
}

/// A genre row. Genres only exist locally; they are created the first time
/// an album, artist or user mentions them.
#[derive(Debug, Clone, PartialEq)]
pub struct Genre {
    pub name: String,
    pub bounds: AudioFeatureBounds,
    pub duration_ms: i64,
    pub popularity: i64,
    pub blacklisted: bool,
}

impl Genre {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bounds: AudioFeatureBounds::default(),
            duration_ms: 0,
            popularity: INITIAL_POPULARITY,
            blacklisted: false,
        }
    }

    /// Inserts a default row for `name` if none exists. Returns whether a
    /// row was created.
    pub fn ensure<S: Store>(store: &S, name: &str, popularity: i64) -> Result<bool, StoreError> {
        if name.trim().is_empty() || name == DUMMY_ID {
            return Ok(false);
        }
        let genre = Genre {
            popularity,
            ..Genre::new(name)
        };
        let created = store.insert(EntityKind::Genre, &genre.to_row())?;
        if created {
            debug!(genre = %name, "new genre");
        }
        Ok(created)
    }

    pub fn load<S: Store>(store: &S, name: &str) -> Result<Option<Genre>, CacheError> {
        if name == DUMMY_ID {
            return Err(CacheError::DummyId {
                kind: EntityKind::Genre,
            });
        }
        store
            .get(EntityKind::Genre, name)?
            .map(|row| Genre::from_row(&row))
            .transpose()
    }

    fn from_row(row: &Row) -> Result<Self, CacheError> {
        let r = RowReader::new(EntityKind::Genre, row);
        Ok(Self {
            name: r.text("name")?,
            bounds: AudioFeatureBounds::from_reader(&r)?,
            duration_ms: r.opt_int("duration_ms")?.unwrap_or(0),
            popularity: r.int("popularity")?,
            blacklisted: r.flag("blacklisted")?,
        })
    }

    fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("name".into(), store::text(&self.name));
        for (feature, range) in self.bounds.ranges() {
            row.insert(format!("{}_lower", feature), SqlValue::Real(range.lower));
            row.insert(format!("{}_upper", feature), SqlValue::Real(range.upper));
        }
        row.insert("duration_ms".into(), store::int(self.duration_ms));
        row.insert("popularity".into(), store::int(self.popularity));
        row.insert("blacklisted".into(), store::int(self.blacklisted as i64));
        row
    }

    /// Persists new feature bounds for an existing genre.
    pub fn set_bounds<S: Store>(
        &mut self,
        store: &S,
        bounds: AudioFeatureBounds,
    ) -> Result<(), CacheError> {
        for (feature, range) in bounds.ranges() {
            let lower = format!("{}_lower", feature);
            let upper = format!("{}_upper", feature);
            store.update_column(EntityKind::Genre, &self.name, &lower, SqlValue::Real(range.lower))?;
            store.update_column(EntityKind::Genre, &self.name, &upper, SqlValue::Real(range.upper))?;
        }
        self.bounds = bounds;
        Ok(())
    }

    pub fn adjust_popularity<S: Store>(&mut self, store: &S, delta: i64) -> Result<i64, CacheError> {
        let value = super::adjust_popularity(store, EntityKind::Genre, &self.name, delta)?
            .unwrap_or(self.popularity + delta);
        self.popularity = value;
        Ok(value)
    }

    pub fn set_blacklisted<S: Store>(&mut self, store: &S, blacklisted: bool) -> Result<(), CacheError> {
        store.update_column(
            EntityKind::Genre,
            &self.name,
            "blacklisted",
            store::int(blacklisted as i64),
        )?;
        self.blacklisted = blacklisted;
        Ok(())
    }
}
