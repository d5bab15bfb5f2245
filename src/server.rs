use axum::{Extension, Router, routing::get};
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::sync::Mutex;
use tracing::info;

use crate::{Res, api, config::Config, types::PkceToken};

/// Serves `/health` and the OAuth `/callback` until the task is aborted.
pub async fn start_api_server(
    state: Arc<Mutex<Option<PkceToken>>>,
    config: Arc<Config>,
) -> Res<()> {
    let app = Router::new()
        .route("/health", get(api::health))
        .route("/callback", get(api::callback))
        .layer(Extension(state))
        .layer(Extension(Arc::clone(&config)));

    let addr = SocketAddr::from_str(&config.server_addr)
        .map_err(|e| format!("Failed to parse server address '{}': {}", config.server_addr, e))?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "callback server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
