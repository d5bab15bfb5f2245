//! # Local Cache
//!
//! The cache mirrors a subset of the user's Spotify library into SQLite and
//! keeps it growing incrementally. Every entity wrapper in [`entity`] follows
//! the same contract:
//!
//! 1. **Cache hit**: the row is decoded by column name, no remote call happens.
//! 2. **Cache miss**: the payload is fetched (or taken from a batch response),
//!    eager fields are extracted and the row is inserted right away with
//!    `hydrated = 0`.
//! 3. **Hydration**: lazy fields (relation id lists, durations) are computed on
//!    first access, persisted, and every referenced entity is handed to
//!    [`Context::discover`] so it gets scheduled exactly once.
//!
//! [`drain::drain_queues`] then works through the five pending queues until
//! the reachable part of the catalog is cached.
//!
//! ```text
//! Entity wrappers ──discover──▶ ItemQueues ──drain──▶ Entity wrappers
//!        │                                                  │
//!        └──────────── Store (SQLite) ◀─────────────────────┘
//!                          ▲
//!                 RemoteGateway (Spotify Web API)
//! ```
//!
//! All state lives in an explicit [`Context`]; nothing in this module reaches
//! for a global database handle or queue.

pub mod codec;
pub mod discovery;
pub mod drain;
pub mod entity;
mod error;
pub mod gateway;
mod kind;
pub mod queue;
pub mod schema;
pub mod sqlite;
pub mod store;

pub use discovery::Discovery;
pub use drain::{DrainReport, drain_queues};
pub use error::{CacheError, FetchError, StoreError};
pub use gateway::{Page, RemoteGateway, SubResource};
pub use kind::{EntityKind, FetchMode};
pub use queue::ItemQueues;
pub use sqlite::SqliteStore;
pub use store::{Row, SqlValue, Store};

/// Fixed id of the sentinel row every table carries.
pub const DUMMY_ID: &str = "0000000000000000000000";

/// Base64 PNG stored when an entity has no artwork or the download fails.
pub const NO_IMAGE: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

/// Tunables of the cache layer.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Popularity a freshly cached entity starts with.
    pub initial_popularity: i64,
    /// Ids per bulk request while draining album, artist and track queues.
    pub bulk_batch_size: usize,
    pub playlist_page_size: u32,
    pub album_page_size: u32,
    /// Page size for artist albums and user playlists.
    pub collection_page_size: u32,
    /// Id of the authenticated user. Top tracks and artists are only
    /// available for this user.
    pub current_user: Option<String>,
}

/// Popularity of a row nothing has rated yet.
pub const INITIAL_POPULARITY: i64 = 20;

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            initial_popularity: INITIAL_POPULARITY,
            bulk_batch_size: 50,
            playlist_page_size: 100,
            album_page_size: 50,
            collection_page_size: 50,
            current_user: None,
        }
    }
}

/// Everything an entity needs to load, hydrate and discover: the persistence
/// gateway, the remote gateway and the pending queues.
pub struct Context<S, R> {
    pub store: S,
    pub remote: R,
    pub queues: ItemQueues,
    pub settings: CacheSettings,
}

impl<S: Store, R: RemoteGateway> Context<S, R> {
    pub fn new(store: S, remote: R, settings: CacheSettings) -> Self {
        Self {
            store,
            remote,
            queues: ItemQueues::new(),
            settings,
        }
    }

    /// Enqueues `id` for hydration unless it is already cached, already
    /// queued, marked dead or not a queued kind at all.
    pub fn schedule(&mut self, kind: EntityKind, id: &str) -> Result<bool, StoreError> {
        if !kind.is_queued() || id.is_empty() || id == DUMMY_ID {
            return Ok(false);
        }
        if self.store.contains(kind, id)? {
            return Ok(false);
        }
        Ok(self.queues.push(kind, id))
    }
}
