use serde::Deserialize;
use serde_json::Value;

use super::{EntityKind, FetchError};

/// Paginated collections the entities read while hydrating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubResource {
    AlbumTracks,
    ArtistAlbums,
    /// Not paginated by the Web API; a single page holds every item.
    ArtistTopTracks,
    PlaylistTracks,
    UserPlaylists,
    /// Only available for the authenticated user.
    UserTopTracks,
    UserTopArtists,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub items: Vec<Value>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub next: Option<String>,
}

/// Remote Fetch Gateway. Implemented by [`crate::spotify::SpotifyClient`] and
/// by test doubles.
#[allow(async_fn_in_trait)]
pub trait RemoteGateway {
    async fn fetch_one(&self, kind: EntityKind, id: &str) -> Result<Value, FetchError>;

    /// Payloads in request order. Ids unknown to the remote are left out.
    async fn fetch_many(&self, kind: EntityKind, ids: &[String]) -> Result<Vec<Value>, FetchError>;

    async fn fetch_page(
        &self,
        resource: SubResource,
        id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Page, FetchError>;

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}
