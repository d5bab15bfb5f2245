use serde_json::Value;

use super::{
    Base, Entity, Genre, collect_ids, collect_pages, link_all, stored_list, strings,
};
use crate::cache::{
    CacheError, Context, EntityKind, RemoteGateway, Row, SqlValue, Store, SubResource,
    store::{self, RowReader},
};

#[derive(Debug, Clone)]
pub struct Artist {
    base: Base,
    follower_count: i64,
    album_ids: Option<Vec<String>>,
    top_track_ids: Option<Vec<String>>,
    genre_names: Option<Vec<String>>,
}

impl Entity for Artist {
    const KIND: EntityKind = EntityKind::Artist;

    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }

    fn from_base(base: Base) -> Self {
        let follower_count = base
            .field("followers")
            .and_then(|f| f.get("total"))
            .and_then(Value::as_i64)
            .unwrap_or(0);
        Self {
            base,
            follower_count,
            album_ids: None,
            top_track_ids: None,
            genre_names: None,
        }
    }

    fn from_row(row: &Row) -> Result<Self, CacheError> {
        let r = RowReader::new(Self::KIND, row);
        let base = Base::from_row(Self::KIND, row)?;
        let hydrated = base.hydrated;
        Ok(Self {
            follower_count: r.opt_int("follower_count")?.unwrap_or(0),
            album_ids: hydrated.then(|| r.list("album_ids")).transpose()?,
            top_track_ids: hydrated.then(|| r.list("top_track_ids")).transpose()?,
            genre_names: hydrated.then(|| r.list("genre_names")).transpose()?,
            base,
        })
    }

    fn eager_columns(&self) -> Vec<(&'static str, SqlValue)> {
        vec![("follower_count", store::int(self.follower_count))]
    }

    async fn hydrate<S: Store, R: RemoteGateway>(
        &mut self,
        ctx: &mut Context<S, R>,
    ) -> Result<(), CacheError> {
        self.album_ids(ctx).await?;
        self.top_track_ids(ctx).await?;
        self.genre_names(ctx)?;
        self.mark_hydrated(&ctx.store)
    }
}

impl Artist {
    pub fn follower_count(&self) -> i64 {
        self.follower_count
    }

    pub async fn album_ids<S: Store, R: RemoteGateway>(
        &mut self,
        ctx: &mut Context<S, R>,
    ) -> Result<&[String], CacheError> {
        if self.album_ids.is_none() {
            let id = self.base.id.clone();
            let items = collect_pages(
                &ctx.remote,
                SubResource::ArtistAlbums,
                &id,
                ctx.settings.collection_page_size,
                None,
            )
            .await
            .map_err(|e| CacheError::remote(Self::KIND, &id, e))?;
            let ids = collect_ids(&items, "/id");
            let ids = link_all(ctx, Self::KIND, &id, "album_ids", EntityKind::Album, ids)?;
            self.album_ids = Some(ids);
        }
        Ok(self.album_ids.as_deref().unwrap_or_default())
    }

    pub async fn top_track_ids<S: Store, R: RemoteGateway>(
        &mut self,
        ctx: &mut Context<S, R>,
    ) -> Result<&[String], CacheError> {
        if self.top_track_ids.is_none() {
            let id = self.base.id.clone();
            let items = collect_pages(
                &ctx.remote,
                SubResource::ArtistTopTracks,
                &id,
                ctx.settings.collection_page_size,
                None,
            )
            .await
            .map_err(|e| CacheError::remote(Self::KIND, &id, e))?;
            let ids = collect_ids(&items, "/id");
            let ids = link_all(ctx, Self::KIND, &id, "top_track_ids", EntityKind::Track, ids)?;
            self.top_track_ids = Some(ids);
        }
        Ok(self.top_track_ids.as_deref().unwrap_or_default())
    }

    /// Playlists this artist appears in. Filled in by playlist hydration, so
    /// always read from the cache.
    pub fn playlist_ids<S: Store>(&self, store: &S) -> Result<Vec<String>, CacheError> {
        Ok(stored_list(store, Self::KIND, &self.base.id, "playlist_ids")?)
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
