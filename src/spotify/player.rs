use std::fmt;

use clap::ValueEnum;
use reqwest::Method;
use serde_json::{Value, json};

use super::SpotifyClient;
use crate::{
    cache::FetchError,
    types::{DeviceInfo, DevicesResponse, PlaybackState},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RepeatMode {
    Track,
    Context,
    Off,
}

impl fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RepeatMode::Track => "track",
            RepeatMode::Context => "context",
            RepeatMode::Off => "off",
        })
    }
}

fn device_query(device_id: Option<&str>) -> Vec<(&'static str, String)> {
    device_id
        .map(|id| vec![("device_id", id.to_string())])
        .unwrap_or_default()
}

impl SpotifyClient {
    async fn player_command(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<(), FetchError> {
        let url = self.endpoint(path, query)?;
        self.send(method, url, body.as_ref()).await?;
        Ok(())
    }

    /// `None` when nothing is playing on any device.
    pub async fn playback_state(&self) -> Result<Option<PlaybackState>, FetchError> {
        let url = self.endpoint("me/player", &[("market", self.config.market.clone())])?;
        match self.send(Method::GET, url, None).await? {
            None => Ok(None),
            Some(body) => serde_json::from_value(body)
                .map(Some)
                .map_err(|e| FetchError::Malformed(e.to_string())),
        }
    }

    pub async fn devices(&self) -> Result<Vec<DeviceInfo>, FetchError> {
        let url = self.endpoint("me/player/devices", &[])?;
        let body = self.get_json(url).await?;
        let response: DevicesResponse =
            serde_json::from_value(body).map_err(|e| FetchError::Malformed(e.to_string()))?;
        Ok(response.devices)
    }

    /// Resumes playback, or starts `context_uri` if given.
    pub async fn play(&self, device_id: Option<&str>, context_uri: Option<&str>) -> Result<(), FetchError> {
        let body = context_uri.map(|uri| json!({ "context_uri": uri }));
        self.player_command(Method::PUT, "me/player/play", &device_query(device_id), body)
            .await
    }

    pub async fn pause(&self, device_id: Option<&str>) -> Result<(), FetchError> {
        self.player_command(Method::PUT, "me/player/pause", &device_query(device_id), None)
            .await
    }

    pub async fn next(&self, device_id: Option<&str>) -> Result<(), FetchError> {
        self.player_command(Method::POST, "me/player/next", &device_query(device_id), None)
            .await
    }

    pub async fn previous(&self, device_id: Option<&str>) -> Result<(), FetchError> {
        self.player_command(Method::POST, "me/player/previous", &device_query(device_id), None)
            .await
    }

    pub async fn seek(&self, position_ms: u64, device_id: Option<&str>) -> Result<(), FetchError> {
        let mut query = device_query(device_id);
        query.push(("position_ms", position_ms.to_string()));
        self.player_command(Method::PUT, "me/player/seek", &query, None)
            .await
    }

    pub async fn set_repeat(&self, mode: RepeatMode, device_id: Option<&str>) -> Result<(), FetchError> {
        let mut query = device_query(device_id);
        query.push(("state", mode.to_string()));
        self.player_command(Method::PUT, "me/player/repeat", &query, None)
            .await
    }

    pub async fn set_volume(&self, percent: u8, device_id: Option<&str>) -> Result<(), FetchError> {
        let mut query = device_query(device_id);
        query.push(("volume_percent", percent.min(100).to_string()));
        self.player_command(Method::PUT, "me/player/volume", &query, None)
            .await
    }

    pub async fn set_shuffle(&self, state: bool, device_id: Option<&str>) -> Result<(), FetchError> {
        let mut query = device_query(device_id);
        query.push(("state", state.to_string()));
        self.player_command(Method::PUT, "me/player/shuffle", &query, None)
            .await
    }

    pub async fn transfer(&self, device_id: &str, play: bool) -> Result<(), FetchError> {
        let body = json!({ "device_ids": [device_id], "play": play });
        self.player_command(Method::PUT, "me/player", &[], Some(body))
            .await
    }

    pub async fn add_to_queue(&self, uri: &str, device_id: Option<&str>) -> Result<(), FetchError> {
        let mut query = device_query(device_id);
        query.push(("uri", uri.to_string()));
        self.player_command(Method::POST, "me/player/queue", &query, None)
            .await
    }
}
