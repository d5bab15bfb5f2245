use serde_json::Value;

use super::{Base, Entity, array, collect_ids, link_all, stored_list};
use crate::cache::{
    CacheError, Context, EntityKind, RemoteGateway, Row, SqlValue, Store,
    store::{self, RowReader},
};

#[derive(Debug, Clone)]
pub struct Track {
    base: Base,
    duration: i64,
    artist_ids: Option<Vec<String>>,
    album_ids: Option<Vec<String>>,
}

impl Entity for Track {
    const KIND: EntityKind = EntityKind::Track;

    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }

    fn from_base(base: Base) -> Self {
        let duration = base
            .field("duration_ms")
            .and_then(Value::as_i64)
            .unwrap_or(0);
        Self {
            base,
            duration,
            artist_ids: None,
            album_ids: None,
        }
    }

    fn from_row(row: &Row) -> Result<Self, CacheError> {
        let r = RowReader::new(Self::KIND, row);
        let base = Base::from_row(Self::KIND, row)?;
        let hydrated = base.hydrated;
        Ok(Self {
            duration: r.opt_int("duration")?.unwrap_or(0),
            artist_ids: hydrated.then(|| r.list("artist_ids")).transpose()?,
            album_ids: hydrated.then(|| r.list("album_ids")).transpose()?,
            base,
        })
    }

    fn eager_columns(&self) -> Vec<(&'static str, SqlValue)> {
        vec![("duration", store::int(self.duration))]
    }

    /// Tracks carry no artwork of their own; the album cover is used.
    fn images(payload: &Value) -> Option<&Value> {
        payload.pointer("/album/images")
    }

    async fn hydrate<S: Store, R: RemoteGateway>(
        &mut self,
        ctx: &mut Context<S, R>,
    ) -> Result<(), CacheError> {
        self.artist_ids(ctx)?;
        self.album_ids(ctx)?;
        self.mark_hydrated(&ctx.store)
    }
}

impl Track {
    /// Duration in milliseconds.
    pub fn duration(&self) -> i64 {
        self.duration
    }

    pub fn artist_ids<S: Store, R: RemoteGateway>(
        &mut self,
        ctx: &mut Context<S, R>,
    ) -> Result<&[String], CacheError> {
        if self.artist_ids.is_none() {
            let ids = collect_ids(array(self.base.field("artists")), "/id");
            let ids = link_all(ctx, Self::KIND, &self.base.id, "artist_ids", EntityKind::Artist, ids)?;
            self.artist_ids = Some(ids);
        }
        Ok(self.artist_ids.as_deref().unwrap_or_default())
    }

    pub fn album_ids<S: Store, R: RemoteGateway>(
        &mut self,
        ctx: &mut Context<S, R>,
    ) -> Result<&[String], CacheError> {
        if self.album_ids.is_none() {
            let ids = collect_ids(self.base.field("album"), "/id");
            let ids = link_all(ctx, Self::KIND, &self.base.id, "album_ids", EntityKind::Album, ids)?;
            self.album_ids = Some(ids);
        }
        Ok(self.album_ids.as_deref().unwrap_or_default())
    }

    /// Filled in by playlist hydration.
    pub fn playlist_ids<S: Store>(&self, store: &S) -> Result<Vec<String>, CacheError> {
        Ok(stored_list(store, Self::KIND, &self.base.id, "playlist_ids")?)
    }

    /// Spotify assigns genres to albums and artists only.
    pub fn genre_names<S: Store>(&self, store: &S) -> Result<Vec<String>, CacheError> {
        Ok(stored_list(store, Self::KIND, &self.base.id, "genre_names")?)
    }
}
