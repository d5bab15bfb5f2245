use thiserror::Error;

use super::EntityKind;

/// Failures of the Remote Fetch Gateway.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("{url} not found")]
    NotFound { url: String },

    #[error("rate limited, retry after {retry_after} seconds")]
    RateLimited { retry_after: u64 },

    #[error("Spotify API returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("not authorized: {0}")]
    Unauthorized(String),
}

impl FetchError {
    /// Whether the same request may succeed later.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Http(e) => !e.is_decode() && !e.is_builder(),
            FetchError::Timeout { .. } | FetchError::RateLimited { .. } => true,
            FetchError::Status { status, .. } => *status >= 500,
            FetchError::NotFound { .. }
            | FetchError::Malformed(_)
            | FetchError::Unauthorized(_) => false,
        }
    }
}

/// Failures of the Persistence Gateway.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("table '{table}' has no column '{column}'")]
    UnknownColumn { table: &'static str, column: String },

    #[error("row in '{table}' is missing column '{column}'")]
    MissingColumn { table: &'static str, column: String },

    #[error("invalid value in {table}.{column}: {reason}")]
    InvalidValue {
        table: &'static str,
        column: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the entity layer.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("could not fetch {kind} '{id}': {source}")]
    RemoteFetchFailed {
        kind: EntityKind,
        id: String,
        #[source]
        source: FetchError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("malformed {kind} payload: {reason}")]
    MalformedPayload { kind: EntityKind, reason: String },

    #[error("the dummy {kind} row is not a real entity")]
    DummyId { kind: EntityKind },

    #[error("{operation} is not supported for {kind}")]
    Unsupported {
        kind: EntityKind,
        operation: &'static str,
    },
}

impl CacheError {
    /// Errors that leave the local database unusable. The queue drain aborts
    /// on these and skips everything else.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CacheError::Store(_))
    }

    pub(crate) fn remote(kind: EntityKind, id: &str, source: FetchError) -> Self {
        CacheError::RemoteFetchFailed {
            kind,
            id: id.to_string(),
            source,
        }
    }
}
