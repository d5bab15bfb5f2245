use serde_json::Value;
use tracing::debug;

use super::{Base, Entity, collect_ids, collect_pages, link_all, stored_list};
use crate::cache::{
    CacheError, Context, EntityKind, RemoteGateway, Row, SqlValue, Store, SubResource,
    discovery::record_relation,
    store::{self, RowReader},
};

#[derive(Debug, Clone)]
pub struct Playlist {
    base: Base,
    owner_id: Option<String>,
    track_count: i64,
    track_ids: Option<Vec<String>>,
    total_duration: Option<i64>,
}

impl Entity for Playlist {
    const KIND: EntityKind = EntityKind::Playlist;

    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }

    fn from_base(base: Base) -> Self {
        let owner_id = base
            .field("owner")
            .and_then(|o| o.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let track_count = base
            .field("tracks")
            .and_then(|t| t.get("total"))
            .and_then(Value::as_i64)
            .unwrap_or(0);
        Self {
            base,
            owner_id,
            track_count,
            track_ids: None,
            total_duration: None,
        }
    }

    fn from_row(row: &Row) -> Result<Self, CacheError> {
        let r = RowReader::new(Self::KIND, row);
        let base = Base::from_row(Self::KIND, row)?;
        let hydrated = base.hydrated;
        Ok(Self {
            owner_id: r.opt_text("owner_id")?.filter(|id| !id.is_empty()),
            track_count: r.opt_int("track_count")?.unwrap_or(0),
            track_ids: hydrated.then(|| r.list("track_ids")).transpose()?,
            total_duration: if hydrated { r.opt_int("total_duration")? } else { None },
            base,
        })
    }

    fn eager_columns(&self) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("owner_id", store::opt_text(self.owner_id.clone())),
            ("track_count", store::int(self.track_count)),
        ]
    }

    async fn hydrate<S: Store, R: RemoteGateway>(
        &mut self,
        ctx: &mut Context<S, R>,
    ) -> Result<(), CacheError> {
        if let Some(owner) = &self.owner_id {
            ctx.schedule(EntityKind::User, owner)?;
        }
        self.track_ids(ctx).await?;
        self.mark_hydrated(&ctx.store)
    }
}

impl Playlist {
    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    pub fn track_count(&self) -> i64 {
        self.track_count
    }

    pub async fn track_ids<S: Store, R: RemoteGateway>(
        &mut self,
        ctx: &mut Context<S, R>,
    ) -> Result<&[String], CacheError> {
        if self.track_ids.is_none() {
            self.load_items(ctx).await?;
        }
        Ok(self.track_ids.as_deref().unwrap_or_default())
    }

    /// Sum of all item durations in milliseconds.
    pub async fn total_duration<S: Store, R: RemoteGateway>(
        &mut self,
        ctx: &mut Context<S, R>,
    ) -> Result<i64, CacheError> {
        if self.total_duration.is_none() {
            self.load_items(ctx).await?;
        }
        Ok(self.total_duration.unwrap_or(0))
    }

    /// Spotify assigns genres to albums and artists only.
    pub fn genre_names<S: Store>(&self, store: &S) -> Result<Vec<String>, CacheError> {
        Ok(stored_list(store, Self::KIND, &self.base.id, "genre_names")?)
    }

    async fn load_items<S: Store, R: RemoteGateway>(
        &mut self,
        ctx: &mut Context<S, R>,
    ) -> Result<(), CacheError> {
        let id = self.base.id.clone();
        let items = collect_pages(
            &ctx.remote,
            SubResource::PlaylistTracks,
            &id,
            ctx.settings.playlist_page_size,
            Some(self.track_count.max(0) as u64),
        )
        .await
        .map_err(|e| CacheError::remote(Self::KIND, &id, e))?;

        // Local files and removed tracks come back with a null track or id.
        // Podcast episodes share the slot but are not catalog tracks.
        let tracks: Vec<&Value> = items
            .iter()
            .filter_map(|item| item.get("track"))
            .filter(|track| !track.is_null())
            .filter(|track| {
                track
                    .get("type")
                    .and_then(Value::as_str)
                    .is_none_or(|kind| kind == "track")
            })
            .collect();

        let duration: i64 = tracks
            .iter()
            .filter_map(|track| track.get("duration_ms").and_then(Value::as_i64))
            .sum();
        let artist_ids = collect_ids(
            tracks
                .iter()
                .filter_map(|track| track.get("artists"))
                .filter_map(Value::as_array)
                .flatten(),
            "/id",
        );
        let ids = collect_ids(tracks.iter().copied(), "/id");
        let ids = link_all(ctx, Self::KIND, &id, "track_ids", EntityKind::Track, ids)?;

        for track_id in &ids {
            record_relation(&ctx.store, EntityKind::Track, track_id, "playlist_ids", &id)?;
        }
        for artist_id in &artist_ids {
            record_relation(&ctx.store, EntityKind::Artist, artist_id, "playlist_ids", &id)?;
        }
        debug!(playlist = %id, tracks = ids.len(), artists = artist_ids.len(), "linked playlist back-references");

        ctx.store
            .update_column(Self::KIND, &id, "total_duration", store::int(duration))?;
        self.total_duration = Some(duration);
        self.track_ids = Some(ids);
        Ok(())
    }
}
