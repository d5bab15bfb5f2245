use std::{sync::Arc, time::Duration};

use chrono::Utc;
use reqwest::{Client, Url};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::{
    Res,
    cache::FetchError,
    config::Config,
    management::TokenManager,
    server::start_api_server,
    success,
    types::{PkceToken, Token},
    utils, warning,
};

/// Runs the OAuth 2.0 PKCE flow and persists the resulting token.
///
/// 1. Generates a code verifier and its S256 challenge
/// 2. Starts the local callback server on `config.server_addr`
/// 3. Opens the authorization URL in the default browser
/// 4. Waits up to 60 seconds for the callback to deliver a token
/// 5. Writes the token to `config.token_path`
///
/// If the browser cannot be opened the URL is printed so the user can open
/// it manually.
pub async fn auth(config: Arc<Config>, shared_state: Arc<Mutex<Option<PkceToken>>>) -> Res<()> {
    let code_verifier = utils::generate_code_verifier();
    let code_challenge = utils::generate_code_challenge(&code_verifier);

    {
        let mut lock = shared_state.lock().await;
        *lock = Some(PkceToken {
            code_verifier: code_verifier.clone(),
            token: None,
        });
    }

    let server_state = Arc::clone(&shared_state);
    let server_config = Arc::clone(&config);
    let server = tokio::spawn(async move { start_api_server(server_state, server_config).await });

    let auth_url = authorize_url(&config, &code_challenge)?;
    if webbrowser::open(auth_url.as_str()).is_err() {
        warning!(
            "Failed to open browser. Please navigate to the following URL manually:\n{}",
            auth_url
        )
    }

    let token = wait_for_token(shared_state).await;
    server.abort();

    match token {
        Some(t) => {
            let token_manager = TokenManager::new(t, config.token_path.clone());
            token_manager
                .persist()
                .await
                .map_err(|e| format!("Failed to save token: {}", e))?;
            success!("Authentication successful!");
            Ok(())
        }
        None => Err("Authentication failed or timed out.".into()),
    }
}

/// Authorization endpoint URL with every PKCE parameter encoded.
pub fn authorize_url(config: &Config, code_challenge: &str) -> Result<Url, String> {
    Url::parse_with_params(
        &config.auth_url,
        &[
            ("client_id", config.client_id.as_str()),
            ("response_type", "code"),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("code_challenge", code_challenge),
            ("code_challenge_method", "S256"),
            ("scope", config.scope.as_str()),
        ],
    )
    .map_err(|e| format!("invalid SPOTIFY_API_AUTH_URL '{}': {}", config.auth_url, e))
}

async fn wait_for_token(shared_state: Arc<Mutex<Option<PkceToken>>>) -> Option<Token> {
    use std::time::Instant;

    let max_wait = Duration::from_secs(60);
    let start = Instant::now();

    while start.elapsed() < max_wait {
        let lock = shared_state.lock().await;
        if let Some(pkce_token) = lock.as_ref() {
            if let Some(token) = &pkce_token.token {
                return Some(token.clone());
            }
        }
        drop(lock);
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    None
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

impl From<TokenResponse> for Token {
    fn from(res: TokenResponse) -> Self {
        Token {
            access_token: res.access_token,
            refresh_token: res.refresh_token.unwrap_or_default(),
            scope: res.scope.unwrap_or_default(),
            expires_in: res.expires_in,
            obtained_at: Utc::now().timestamp() as u64,
        }
    }
}

async fn request_token(
    http: &Client,
    config: &Config,
    form: &[(&str, &str)],
) -> Result<Token, FetchError> {
    let response = http.post(&config.token_url).form(form).send().await?;
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(FetchError::Unauthorized(format!("{}: {}", status, message)));
    }
    let body: TokenResponse = response
        .json()
        .await
        .map_err(|e| FetchError::Malformed(e.to_string()))?;
    Ok(body.into())
}

/// Exchanges a refresh token for a new access token.
pub async fn refresh_token(
    http: &Client,
    config: &Config,
    refresh_token: &str,
) -> Result<Token, FetchError> {
    request_token(
        http,
        config,
        &[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", config.client_id.as_str()),
        ],
    )
    .await
}

/// Exchanges the authorization code from the callback for a token. The
/// verifier must be the one whose challenge started the flow.
pub async fn exchange_code_pkce(
    http: &Client,
    config: &Config,
    code: &str,
    verifier: &str,
) -> Result<Token, FetchError> {
    request_token(
        http,
        config,
        &[
            ("grant_type", "authorization_code"),
            ("client_id", config.client_id.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("redirect_uri", config.redirect_uri.as_str()),
        ],
    )
    .await
}
