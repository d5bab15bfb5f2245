use serde_json::Value;
use tracing::debug;

use super::SpotifyClient;
use crate::{
    cache::{EntityKind, FetchError, Page, RemoteGateway, SubResource},
    utils::split_into_chunks,
};

/// Path segment of a remote object kind.
fn object_path(kind: EntityKind) -> Result<&'static str, FetchError> {
    match kind {
        EntityKind::Album => Ok("albums"),
        EntityKind::Artist => Ok("artists"),
        EntityKind::Playlist => Ok("playlists"),
        EntityKind::Track => Ok("tracks"),
        EntityKind::User => Ok("users"),
        EntityKind::Genre | EntityKind::Device => Err(FetchError::Malformed(format!(
            "{} is not a Spotify catalog object",
            kind
        ))),
    }
}

/// Ids per request of the several-items endpoints.
fn bulk_limit(kind: EntityKind) -> Option<usize> {
    match kind {
        EntityKind::Album => Some(20),
        EntityKind::Artist | EntityKind::Track => Some(50),
        _ => None,
    }
}

fn page_limit(resource: SubResource) -> u32 {
    match resource {
        SubResource::PlaylistTracks => 100,
        _ => 50,
    }
}

impl SpotifyClient {
    fn market_query(&self, kind: EntityKind) -> Vec<(&'static str, String)> {
        match kind {
            EntityKind::Album | EntityKind::Track | EntityKind::Playlist => {
                vec![("market", self.config.market.clone())]
            }
            _ => Vec::new(),
        }
    }
}

impl RemoteGateway for SpotifyClient {
    async fn fetch_one(&self, kind: EntityKind, id: &str) -> Result<Value, FetchError> {
        let path = format!("{}/{}", object_path(kind)?, id);
        let url = self.endpoint(&path, &self.market_query(kind))?;
        self.get_json(url).await
    }

    async fn fetch_many(&self, kind: EntityKind, ids: &[String]) -> Result<Vec<Value>, FetchError> {
        let Some(limit) = bulk_limit(kind) else {
            let mut payloads = Vec::with_capacity(ids.len());
            for id in ids {
                match self.fetch_one(kind, id).await {
                    Ok(payload) => payloads.push(payload),
                    Err(FetchError::NotFound { .. }) => debug!(%kind, %id, "not found"),
                    Err(e) => return Err(e),
                }
            }
            return Ok(payloads);
        };

        let key = object_path(kind)?;
        let mut payloads = Vec::with_capacity(ids.len());
        for chunk in split_into_chunks(ids, limit) {
            let mut query = self.market_query(kind);
            query.push(("ids", chunk.join(",")));
            let url = self.endpoint(key, &query)?;
            let mut body = self.get_json(url).await?;
            let items = body
                .get_mut(key)
                .and_then(Value::as_array_mut)
                .map(std::mem::take)
                .ok_or_else(|| FetchError::Malformed(format!("missing '{}' array", key)))?;
            // Unknown ids come back as null.
            payloads.extend(items.into_iter().filter(|item| !item.is_null()));
        }
        Ok(payloads)
    }

    async fn fetch_page(
        &self,
        resource: SubResource,
        id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Page, FetchError> {
        let market = self.config.market.clone();
        let paging = vec![
            ("limit", limit.clamp(1, page_limit(resource)).to_string()),
            ("offset", offset.to_string()),
        ];

        let (path, query) = match resource {
            SubResource::AlbumTracks => (
                format!("albums/{}/tracks", id),
                [paging, vec![("market", market)]].concat(),
            ),
            SubResource::ArtistAlbums => (
                format!("artists/{}/albums", id),
                [
                    paging,
                    vec![
                        ("include_groups", "album,single,compilation".to_string()),
                        ("market", market),
                    ],
                ]
                .concat(),
            ),
            SubResource::ArtistTopTracks => {
                let url = self.endpoint(
                    &format!("artists/{}/top-tracks", id),
                    &[("market", market)],
                )?;
                let mut body = self.get_json(url).await?;
                let items = body
                    .get_mut("tracks")
                    .and_then(Value::as_array_mut)
                    .map(std::mem::take)
                    .unwrap_or_default();
                return Ok(Page {
                    total: items.len() as u64,
                    items,
                    next: None,
                });
            }
            SubResource::PlaylistTracks => (
                format!("playlists/{}/tracks", id),
                [paging, vec![("market", market)]].concat(),
            ),
            SubResource::UserPlaylists => (format!("users/{}/playlists", id), paging),
            SubResource::UserTopTracks => (
                "me/top/tracks".to_string(),
                [paging, vec![("time_range", "medium_term".to_string())]].concat(),
            ),
            SubResource::UserTopArtists => (
                "me/top/artists".to_string(),
                [paging, vec![("time_range", "medium_term".to_string())]].concat(),
            ),
        };

        let url = self.endpoint(&path, &query)?;
        let body = self.get_json(url).await?;
        serde_json::from_value(body).map_err(|e| FetchError::Malformed(e.to_string()))
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                message: format!("image download from {}", url),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}
