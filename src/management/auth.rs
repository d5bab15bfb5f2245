use std::path::{Path, PathBuf};

use chrono::Utc;
use reqwest::Client;
use tracing::{debug, warn};

use crate::{cache::FetchError, config::Config, spotify::auth, types::Token};

/// Seconds before the real expiry at which a token counts as expired.
const EXPIRY_MARGIN_SECS: u64 = 240;

/// Owns the persisted OAuth token and refreshes it when it is about to expire.
pub struct TokenManager {
    token: Token,
    path: PathBuf,
}

impl TokenManager {
    pub fn new(token: Token, path: PathBuf) -> Self {
        TokenManager { token, path }
    }

    pub async fn load(path: &Path) -> Result<Self, String> {
        let content = async_fs::read_to_string(path)
            .await
            .map_err(|e| format!("{}: {}", path.display(), e))?;
        let token: Token = serde_json::from_str(&content).map_err(|e| e.to_string())?;
        Ok(Self {
            token,
            path: path.to_path_buf(),
        })
    }

    pub async fn persist(&self) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent)
                .await
                .map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(&self.token).map_err(|e| e.to_string())?;
        async_fs::write(&self.path, json)
            .await
            .map_err(|e| e.to_string())
    }

    /// Access token that stays valid for at least a few more minutes.
    pub async fn get_valid_token(
        &mut self,
        http: &Client,
        config: &Config,
    ) -> Result<String, FetchError> {
        if self.is_expired_at(Utc::now().timestamp() as u64) {
            debug!("access token expired, refreshing");
            let mut fresh = auth::refresh_token(http, config, &self.token.refresh_token).await?;
            // Spotify only sometimes rotates the refresh token.
            if fresh.refresh_token.is_empty() {
                fresh.refresh_token = self.token.refresh_token.clone();
            }
            self.token = fresh;
            if let Err(e) = self.persist().await {
                warn!(error = %e, "could not persist refreshed token");
            }
        }

        Ok(self.token.access_token.clone())
    }

    pub fn is_expired_at(&self, now: u64) -> bool {
        now + EXPIRY_MARGIN_SECS >= self.token.obtained_at + self.token.expires_in
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(obtained_at: u64, expires_in: u64) -> TokenManager {
        TokenManager::new(
            Token {
                access_token: "access".into(),
                refresh_token: "refresh".into(),
                scope: String::new(),
                expires_in,
                obtained_at,
            },
            PathBuf::from("token.json"),
        )
    }

    #[test]
    fn token_expires_four_minutes_early() {
        let m = manager(1_000, 3_600);
        assert!(!m.is_expired_at(1_000));
        assert!(!m.is_expired_at(4_359));
        assert!(m.is_expired_at(4_360));
        assert!(m.is_expired_at(10_000));
    }
}
