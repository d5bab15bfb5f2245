//! # Spotify Integration Module
//!
//! HTTP access to the Spotify Web API. Everything goes through one
//! [`SpotifyClient`], which owns the HTTP connection pool, the configuration
//! and the [`TokenManager`] that keeps the OAuth token fresh.
//!
//! ## Layout
//!
//! ```text
//! cache::RemoteGateway ──▶ catalog   (albums, artists, playlists, tracks, users, pages, images)
//! player::Player       ──▶ player    (playback state, transport controls, devices)
//! organize             ──▶ playlist  (current user, create, rename, rewrite items)
//! cli::auth            ──▶ auth      (OAuth 2.0 PKCE flow, token exchange and refresh)
//!                            │
//!                  SpotifyClient::send (retry loop)
//!                            │
//!                     Spotify Web API
//! ```
//!
//! ## Error handling and retries
//!
//! [`SpotifyClient::send`] maps every failure onto [`FetchError`]:
//!
//! - **429 Too Many Requests**: the `Retry-After` header is honored if it is
//!   at most two minutes, otherwise [`FetchError::RateLimited`] is returned.
//! - **5xx**: retried after a fixed pause.
//! - **Timeouts**: retried, then reported as [`FetchError::Timeout`].
//! - **404**: [`FetchError::NotFound`], never retried.
//! - **401**: [`FetchError::Unauthorized`]; run `spotmirror auth` again.
//!
//! At most `SPOTMIRROR_MAX_RETRIES` attempts are made per request.

pub mod auth;
mod catalog;
pub mod player;
mod playlist;

use std::{sync::Arc, time::Duration};

use reqwest::{Client, Method, StatusCode, Url};
use serde_json::Value;
use tokio::{sync::Mutex, time::sleep};
use tracing::{debug, warn};

use crate::{cache::FetchError, config::Config, management::TokenManager};

const SERVER_ERROR_BACKOFF: Duration = Duration::from_secs(10);
const TIMEOUT_BACKOFF: Duration = Duration::from_secs(2);
const MAX_RETRY_AFTER_SECS: u64 = 120;

pub struct SpotifyClient {
    http: Client,
    config: Arc<Config>,
    tokens: Mutex<TokenManager>,
}

impl SpotifyClient {
    /// Loads the stored token. Fails with [`FetchError::Unauthorized`] if
    /// the user never authenticated.
    pub async fn connect(config: Arc<Config>) -> Result<Self, FetchError> {
        let tokens = TokenManager::load(&config.token_path).await.map_err(|e| {
            FetchError::Unauthorized(format!(
                "no stored token ({}). Please run spotmirror auth",
                e
            ))
        })?;
        let http = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            http,
            config,
            tokens: Mutex::new(tokens),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Absolute API url for `path` with the given query parameters.
    pub(crate) fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url, FetchError> {
        let base = self.config.api_url.trim_end_matches('/');
        let mut url = Url::parse(&format!("{}/{}", base, path.trim_start_matches('/')))
            .map_err(|e| FetchError::Malformed(format!("invalid url for {}: {}", path, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    /// Sends an authorized request and decodes the JSON body. `None` means
    /// the API answered without content (204, or a write endpoint returning
    /// plain text).
    pub(crate) async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<Option<Value>, FetchError> {
        let max_attempts = self.config.max_retries.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let token = {
                let mut tokens = self.tokens.lock().await;
                tokens.get_valid_token(&self.http, &self.config).await?
            };

            let mut request = self.http.request(method.clone(), url.clone()).bearer_auth(token);
            if let Some(body) = body {
                request = request.json(body);
            } else if method != Method::GET {
                request = request.header(reqwest::header::CONTENT_LENGTH, 0);
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) if e.is_timeout() => {
                    if attempt < max_attempts {
                        warn!(%url, attempt, "request timed out, retrying");
                        sleep(TIMEOUT_BACKOFF).await;
                        continue;
                    }
                    return Err(FetchError::Timeout {
                        url: url.to_string(),
                    });
                }
                Err(e) => return Err(FetchError::Http(e)),
            };

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .unwrap_or(1);
                if retry_after <= MAX_RETRY_AFTER_SECS && attempt < max_attempts {
                    warn!(%url, retry_after, "rate limited, waiting");
                    sleep(Duration::from_secs(retry_after)).await;
                    continue;
                }
                return Err(FetchError::RateLimited { retry_after });
            }

            if status.is_server_error() && attempt < max_attempts {
                warn!(%url, %status, attempt, "server error, retrying");
                sleep(SERVER_ERROR_BACKOFF).await;
                continue;
            }

            if status == StatusCode::NOT_FOUND {
                return Err(FetchError::NotFound {
                    url: url.to_string(),
                });
            }

            if status == StatusCode::UNAUTHORIZED {
                let message = response.text().await.unwrap_or_default();
                return Err(FetchError::Unauthorized(message));
            }

            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(FetchError::Status {
                    status: status.as_u16(),
                    message,
                });
            }

            let bytes = response.bytes().await?;
            debug!(%method, %url, %status, bytes = bytes.len(), "spotify response");
            if bytes.is_empty() {
                return Ok(None);
            }
            return match serde_json::from_slice::<Value>(&bytes) {
                Ok(value) => Ok(Some(value)),
                Err(_) if method != Method::GET => Ok(None),
                Err(e) => Err(FetchError::Malformed(e.to_string())),
            };
        }
    }

    pub(crate) async fn get_json(&self, url: Url) -> Result<Value, FetchError> {
        let path = url.path().to_string();
        self.send(Method::GET, url, None)
            .await?
            .ok_or_else(|| FetchError::Malformed(format!("empty response from {}", path)))
    }
}
