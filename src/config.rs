//! Configuration management for spotmirror.
//!
//! Configuration comes from environment variables, optionally seeded from a
//! `.env` file in the local data directory. Everything is read once into a
//! [`Config`] value that the rest of the application passes around; no module
//! reads the environment on its own.
//!
//! Precedence:
//! 1. Environment variables
//! 2. `.env` file in the local data directory
//! 3. Built-in defaults (for everything except the client id and redirect uri)

use std::{env, path::PathBuf, time::Duration};

use thiserror::Error;

use crate::cache::CacheSettings;

const APP_DIR: &str = "spotmirror";

/// Scopes requested during authentication.
pub const DEFAULT_SCOPE: &str = "playlist-modify-private playlist-modify-public playlist-read-private ugc-image-upload user-follow-read user-library-read user-modify-playback-state user-read-currently-playing user-read-email user-read-playback-state user-read-recently-played user-top-read";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,
    pub api_url: String,
    pub auth_url: String,
    pub token_url: String,
    pub server_addr: String,
    pub market: String,
    pub database_path: PathBuf,
    pub token_path: PathBuf,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub user_id: Option<String>,
}

/// Platform data directory of the application, e.g.
/// `~/.local/share/spotmirror` on Linux.
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_DIR);
    path
}

/// Loads environment variables from `<data dir>/.env`.
///
/// Creates the data directory if needed. A missing `.env` file is not an
/// error since every value can also come from the real environment.
pub async fn load_env() -> Result<(), String> {
    let dir = data_dir();
    async_fs::create_dir_all(&dir)
        .await
        .map_err(|e| e.to_string())?;

    let path = dir.join(".env");
    if path.is_file() {
        dotenv::from_path(&path).map_err(|e| format!("{}: {}", path.display(), e))?;
    }
    Ok(())
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Empty values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let database_path = get("SPOTMIRROR_DATABASE")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir().join("cache.db"));

        Ok(Self {
            client_id: required("SPOTIFY_API_AUTH_CLIENT_ID")?,
            redirect_uri: required("SPOTIFY_API_REDIRECT_URI")?,
            scope: or("SPOTIFY_API_AUTH_SCOPE", DEFAULT_SCOPE),
            api_url: or("SPOTIFY_API_URL", "https://api.spotify.com/v1"),
            auth_url: or("SPOTIFY_API_AUTH_URL", "https://accounts.spotify.com/authorize"),
            token_url: or("SPOTIFY_API_TOKEN_URL", "https://accounts.spotify.com/api/token"),
            server_addr: or("SERVER_ADDRESS", "127.0.0.1:8888"),
            market: or("SPOTIFY_MARKET", "DE"),
            database_path,
            token_path: data_dir().join("cache").join("token.json"),
            request_timeout: Duration::from_secs(parse_number(
                "SPOTMIRROR_REQUEST_TIMEOUT_SECS",
                get("SPOTMIRROR_REQUEST_TIMEOUT_SECS"),
                30,
            )?),
            max_retries: parse_number("SPOTMIRROR_MAX_RETRIES", get("SPOTMIRROR_MAX_RETRIES"), 5)?,
            user_id: get("SPOTIFY_USER_ID"),
        })
    }

    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            current_user: self.user_id.clone(),
            ..CacheSettings::default()
        }
    }
}

fn parse_number<T>(key: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
    }
}
