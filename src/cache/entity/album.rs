use serde_json::Value;

use super::{
    Base, Entity, Genre, array, collect_ids, collect_pages, link_all, strings,
};
use crate::cache::{
    CacheError, Context, EntityKind, RemoteGateway, Row, SqlValue, Store, SubResource,
    store::{self, RowReader},
};

#[derive(Debug, Clone)]
pub struct Album {
    base: Base,
    track_count: i64,
    artist_ids: Option<Vec<String>>,
    track_ids: Option<Vec<String>>,
    total_duration: Option<i64>,
    genre_names: Option<Vec<String>>,
}

impl Entity for Album {
    const KIND: EntityKind = EntityKind::Album;

    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }

    fn from_base(base: Base) -> Self {
        let track_count = base
            .field("total_tracks")
            .and_then(Value::as_i64)
            .unwrap_or(0);
        Self {
            base,
            track_count,
            artist_ids: None,
            track_ids: None,
            total_duration: None,
            genre_names: None,
        }
    }

    fn from_row(row: &Row) -> Result<Self, CacheError> {
        let r = RowReader::new(Self::KIND, row);
        let base = Base::from_row(Self::KIND, row)?;
        let hydrated = base.hydrated;
        Ok(Self {
            track_count: r.opt_int("track_count")?.unwrap_or(0),
            artist_ids: hydrated.then(|| r.list("artist_ids")).transpose()?,
            track_ids: hydrated.then(|| r.list("track_ids")).transpose()?,
            total_duration: if hydrated { r.opt_int("total_duration")? } else { None },
            genre_names: hydrated.then(|| r.list("genre_names")).transpose()?,
            base,
        })
    }

    fn eager_columns(&self) -> Vec<(&'static str, SqlValue)> {
        vec![("track_count", store::int(self.track_count))]
    }

    async fn hydrate<S: Store, R: RemoteGateway>(
        &mut self,
        ctx: &mut Context<S, R>,
    ) -> Result<(), CacheError> {
        self.artist_ids(ctx)?;
        self.track_ids(ctx).await?;
        self.genre_names(ctx)?;
        self.mark_hydrated(&ctx.store)
    }
}

impl Album {
    pub fn track_count(&self) -> i64 {
        self.track_count
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

    pub async fn track_ids<S: Store, R: RemoteGateway>(
        &mut self,
        ctx: &mut Context<S, R>,
    ) -> Result<&[String], CacheError> {
        if self.track_ids.is_none() {
            self.load_tracks(ctx).await?;
        }
        Ok(self.track_ids.as_deref().unwrap_or_default())
    }

    /// Sum of all track durations in milliseconds.
    pub async fn total_duration<S: Store, R: RemoteGateway>(
        &mut self,
        ctx: &mut Context<S, R>,
    ) -> Result<i64, CacheError> {
        if self.total_duration.is_none() {
            self.load_tracks(ctx).await?;
        }
        Ok(self.total_duration.unwrap_or(0))
    }

    async fn load_tracks<S: Store, R: RemoteGateway>(
        &mut self,
        ctx: &mut Context<S, R>,
    ) -> Result<(), CacheError> {
        let id = self.base.id.clone();
        let items = collect_pages(
            &ctx.remote,
            SubResource::AlbumTracks,
            &id,
            ctx.settings.album_page_size,
            Some(self.track_count.max(0) as u64),
        )
        .await
        .map_err(|e| CacheError::remote(Self::KIND, &id, e))?;

        let duration: i64 = items
            .iter()
            .filter_map(|item| item.get("duration_ms").and_then(Value::as_i64))
            .sum();
        let ids = collect_ids(&items, "/id");
        let ids = link_all(ctx, Self::KIND, &id, "track_ids", EntityKind::Track, ids)?;

        ctx.store
            .update_column(Self::KIND, &id, "total_duration", store::int(duration))?;
        self.total_duration = Some(duration);
        self.track_ids = Some(ids);
        Ok(())
    }

    pub fn genre_names<S: Store, R: RemoteGateway>(
        &mut self,
        ctx: &mut Context<S, R>,
    ) -> Result<&[String], CacheError> {
        if self.genre_names.is_none() {
            let names = strings(self.base.field("genres"));
            for name in &names {
                Genre::ensure(&ctx.store, name, ctx.settings.initial_popularity)?;
            }
            ctx.store
                .update_column(Self::KIND, &self.base.id, "genre_names", store::list(&names))?;
            self.genre_names = Some(names);
        }
        Ok(self.genre_names.as_deref().unwrap_or_default())
    }
}
