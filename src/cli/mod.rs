//! # CLI Module
//!
//! Command implementations behind the `spotmirror` binary. Every command
//! reports to the terminal through the console macros and tables; failures
//! that leave nothing useful to do end the process through `error!`.
//!
//! ## Commands
//!
//! - [`auth`] - OAuth 2.0 PKCE login, stores the token
//! - [`init`] - creates the cache database and prints its tables
//! - [`show`] - loads one entity (fetching it on a cache miss)
//! - [`crawl`] - seeds the queues and drains them until nothing is left
//! - [`blacklist`] and [`popularity`] - manual curation of cached rows
//! - `player_*` - playback control with blacklist skipping
//! - [`organize`] - shuffle, dedupe and filter an album or playlist
//!
//! ## Layering
//!
//! ```text
//! CLI layer (this module)
//!     ↓
//! cache / player / organize
//!     ↓
//! spotify::SpotifyClient ──▶ Spotify Web API
//! ```
//!
//! ## Usage
//!
//! ```bash
//! spotmirror auth
//! spotmirror crawl --playlist 37i9dQZF1DXcBWIGoYBM5M
//! spotmirror show track 4uLU6hMCjMI75M1A2tKUQC
//! spotmirror blacklist artist 0OdUWJ0sBjDrqHygGUXeCF
//! spotmirror player next
//! spotmirror organize https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M --shuffle --dedupe
//! ```

mod auth;
mod cache;
mod organize;
mod player;

pub use auth::auth;
pub use cache::{CrawlSeeds, blacklist, crawl, init, popularity, show};
pub use organize::organize;
pub use player::{
    player_devices, player_guard, player_next, player_pause, player_play, player_previous,
    player_queue, player_repeat, player_seek, player_shuffle, player_status, player_transfer,
    player_volume,
};

use std::sync::Arc;

use crate::{
    cache::{Context, EntityKind, SqliteStore},
    config::Config,
    error,
    spotify::SpotifyClient,
    utils,
};

fn open_store(config: &Config) -> SqliteStore {
    match SqliteStore::open(&config.database_path) {
        Ok(store) => store,
        Err(e) => error!(
            "Cannot open cache at {}. Err: {}",
            config.database_path.display(),
            e
        ),
    }
}

async fn connect(config: &Arc<Config>) -> SpotifyClient {
    match SpotifyClient::connect(Arc::clone(config)).await {
        Ok(client) => client,
        Err(e) => error!("Cannot connect to Spotify. Err: {}", e),
    }
}

async fn open_context(config: &Arc<Config>) -> Context<SqliteStore, SpotifyClient> {
    let store = open_store(config);
    let client = connect(config).await;
    Context::new(store, client, config.cache_settings())
}

/// Accepts a bare id, a uri or an open.spotify.com link. Genre names are
/// taken as they are; user ids are not base62.
fn resolve_id(kind: EntityKind, input: &str) -> String {
    let input = input.trim();
    if matches!(kind, EntityKind::Genre | EntityKind::Device) {
        return input.to_string();
    }

    let uri = utils::normalize_uri(input);
    let candidate = match uri.as_deref().and_then(utils::parse_uri) {
        Some((found, id)) if found == kind => Some(id),
        Some((found, _)) => error!("Expected a {} but got a {}: {}", kind, found, input),
        None if kind == EntityKind::User && !input.is_empty() && !input.contains(':') => {
            Some(input.to_string())
        }
        None => utils::uri_to_id(input),
    };

    match candidate {
        Some(id) if kind == EntityKind::User || utils::is_valid_id(&id) => id,
        _ => error!("Not a valid {} id: {}", kind, input),
    }
}
