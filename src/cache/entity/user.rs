use std::collections::HashMap;

use serde_json::Value;

use super::{Base, Entity, Genre, collect_ids, collect_pages, link_all, strings};
use crate::cache::{
    CacheError, Context, EntityKind, RemoteGateway, Row, SqlValue, Store, SubResource,
    store::{self, RowReader},
};

#[derive(Debug, Clone)]
pub struct User {
    base: Base,
    follower_count: i64,
    playlist_ids: Option<Vec<String>>,
    top_track_ids: Option<Vec<String>>,
    top_artist_ids: Option<Vec<String>>,
    top_genre_names: Option<Vec<String>>,
}

impl Entity for User {
    const KIND: EntityKind = EntityKind::User;

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
            playlist_ids: None,
            top_track_ids: None,
            top_artist_ids: None,
            top_genre_names: None,
        }
    }

    fn from_row(row: &Row) -> Result<Self, CacheError> {
        let r = RowReader::new(Self::KIND, row);
        let base = Base::from_row(Self::KIND, row)?;
        let hydrated = base.hydrated;
        Ok(Self {
            follower_count: r.opt_int("follower_count")?.unwrap_or(0),
            playlist_ids: hydrated.then(|| r.list("playlist_ids")).transpose()?,
            top_track_ids: hydrated.then(|| r.list("top_track_ids")).transpose()?,
            top_artist_ids: hydrated.then(|| r.list("top_artist_ids")).transpose()?,
            top_genre_names: hydrated.then(|| r.list("top_genre_names")).transpose()?,
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
        self.playlist_ids(ctx).await?;
        self.top_track_ids(ctx).await?;
        self.top_artist_ids(ctx).await?;
        self.mark_hydrated(&ctx.store)
    }
}

impl User {
    pub fn follower_count(&self) -> i64 {
        self.follower_count
    }

    fn is_current<S, R>(&self, ctx: &Context<S, R>) -> bool {
        ctx.settings.current_user.as_deref() == Some(self.base.id.as_str())
    }

    pub async fn playlist_ids<S: Store, R: RemoteGateway>(
        &mut self,
        ctx: &mut Context<S, R>,
    ) -> Result<&[String], CacheError> {
        if self.playlist_ids.is_none() {
            let id = self.base.id.clone();
            let items = collect_pages(
                &ctx.remote,
                SubResource::UserPlaylists,
                &id,
                ctx.settings.collection_page_size,
                None,
            )
            .await
            .map_err(|e| CacheError::remote(Self::KIND, &id, e))?;
            let ids = collect_ids(&items, "/id");
            let ids = link_all(ctx, Self::KIND, &id, "playlist_ids", EntityKind::Playlist, ids)?;
            self.playlist_ids = Some(ids);
        }
        Ok(self.playlist_ids.as_deref().unwrap_or_default())
    }

    /// Empty for every user but the authenticated one.
    pub async fn top_track_ids<S: Store, R: RemoteGateway>(
        &mut self,
        ctx: &mut Context<S, R>,
    ) -> Result<&[String], CacheError> {
        if self.top_track_ids.is_none() {
            let id = self.base.id.clone();
            let ids = if self.is_current(ctx) {
                let items = collect_pages(
                    &ctx.remote,
                    SubResource::UserTopTracks,
                    &id,
                    ctx.settings.collection_page_size,
                    None,
                )
                .await
                .map_err(|e| CacheError::remote(Self::KIND, &id, e))?;
                collect_ids(&items, "/id")
            } else {
                Vec::new()
            };
            let ids = link_all(ctx, Self::KIND, &id, "top_track_ids", EntityKind::Track, ids)?;
            self.top_track_ids = Some(ids);
        }
        Ok(self.top_track_ids.as_deref().unwrap_or_default())
    }

    /// Also derives the top genres from the genres of the top artists.
    pub async fn top_artist_ids<S: Store, R: RemoteGateway>(
        &mut self,
        ctx: &mut Context<S, R>,
    ) -> Result<&[String], CacheError> {
        if self.top_artist_ids.is_none() {
            let id = self.base.id.clone();
            let items = if self.is_current(ctx) {
                collect_pages(
                    &ctx.remote,
                    SubResource::UserTopArtists,
                    &id,
                    ctx.settings.collection_page_size,
                    None,
                )
                .await
                .map_err(|e| CacheError::remote(Self::KIND, &id, e))?
            } else {
                Vec::new()
            };

            let genres = rank_genres(&items);
            for name in &genres {
                Genre::ensure(&ctx.store, name, ctx.settings.initial_popularity)?;
            }
            ctx.store
                .update_column(Self::KIND, &id, "top_genre_names", store::list(&genres))?;
            self.top_genre_names = Some(genres);

            let ids = collect_ids(&items, "/id");
            let ids = link_all(ctx, Self::KIND, &id, "top_artist_ids", EntityKind::Artist, ids)?;
            self.top_artist_ids = Some(ids);
        }
        Ok(self.top_artist_ids.as_deref().unwrap_or_default())
    }

    pub async fn top_genre_names<S: Store, R: RemoteGateway>(
        &mut self,
        ctx: &mut Context<S, R>,
    ) -> Result<&[String], CacheError> {
        if self.top_genre_names.is_none() {
            self.top_artist_ids(ctx).await?;
        }
        Ok(self.top_genre_names.as_deref().unwrap_or_default())
    }
}

/// Genres of the given artists, most frequent first. Ties keep the order in
/// which the genres first appear.
fn rank_genres(artists: &[Value]) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for artist in artists {
        for genre in strings(artist.get("genres")) {
            let count = counts.entry(genre.clone()).or_insert(0);
            if *count == 0 {
                order.push(genre);
            }
            *count += 1;
        }
    }
    order.sort_by_key(|genre| std::cmp::Reverse(counts.get(genre).copied().unwrap_or(0)));
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn genres_are_ranked_by_frequency() {
        let artists = vec![
            json!({"id": "a", "genres": ["indie", "rock"]}),
            json!({"id": "b", "genres": ["rock"]}),
            json!({"id": "c", "genres": ["jazz", "indie", "rock"]}),
            json!({"id": "d"}),
        ];
        assert_eq!(rank_genres(&artists), vec!["rock", "indie", "jazz"]);
    }
}
