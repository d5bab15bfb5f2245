use reqwest::Method;
use tracing::debug;

use super::SpotifyClient;
use crate::{
    cache::FetchError,
    types::{
        ChangePlaylistDetailsRequest, CreatePlaylistRequest, CreatePlaylistResponse, CurrentUser,
        PlaylistItemsRequest,
    },
    utils::split_into_chunks,
};

/// Items per add/replace request.
const ITEMS_PER_REQUEST: usize = 100;

fn to_body<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, FetchError> {
    serde_json::to_value(value).map_err(|e| FetchError::Malformed(e.to_string()))
}

impl SpotifyClient {
    pub async fn current_user(&self) -> Result<CurrentUser, FetchError> {
        let url = self.endpoint("me", &[])?;
        let body = self.get_json(url).await?;
        serde_json::from_value(body).map_err(|e| FetchError::Malformed(e.to_string()))
    }

    pub async fn create_playlist(
        &self,
        user_id: &str,
        request: &CreatePlaylistRequest,
    ) -> Result<CreatePlaylistResponse, FetchError> {
        let url = self.endpoint(&format!("users/{}/playlists", user_id), &[])?;
        let body = self
            .send(Method::POST, url, Some(&to_body(request)?))
            .await?
            .ok_or_else(|| FetchError::Malformed("empty create playlist response".to_string()))?;
        serde_json::from_value(body).map_err(|e| FetchError::Malformed(e.to_string()))
    }

    pub async fn rename_playlist(&self, playlist_id: &str, name: &str) -> Result<(), FetchError> {
        let url = self.endpoint(&format!("playlists/{}", playlist_id), &[])?;
        let body = to_body(&ChangePlaylistDetailsRequest {
            name: name.to_string(),
        })?;
        self.send(Method::PUT, url, Some(&body)).await?;
        Ok(())
    }

    /// Replaces the whole content of a playlist. The first hundred items
    /// replace the old content, the rest is appended in chunks.
    pub async fn replace_playlist_items(
        &self,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<(), FetchError> {
        let path = format!("playlists/{}/tracks", playlist_id);
        let chunks = split_into_chunks(uris, ITEMS_PER_REQUEST);

        let first = chunks.first().cloned().unwrap_or_default();
        let url = self.endpoint(&path, &[])?;
        self.send(
            Method::PUT,
            url,
            Some(&to_body(&PlaylistItemsRequest { uris: first })?),
        )
        .await?;

        for chunk in chunks.into_iter().skip(1) {
            let url = self.endpoint(&path, &[])?;
            self.send(
                Method::POST,
                url,
                Some(&to_body(&PlaylistItemsRequest { uris: chunk })?),
            )
            .await?;
        }
        debug!(playlist = %playlist_id, items = uris.len(), "rewrote playlist items");
        Ok(())
    }
}
