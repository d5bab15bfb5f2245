//! spotmirror library
//!
//! Mirrors a Spotify library into a local SQLite cache and builds a few
//! tools on top of it: playback control with blacklists, popularity
//! feedback from skips and playlist organizing.
//!
//! # Modules
//!
//! - `api` - handlers of the local OAuth callback server
//! - `cache` - entity wrappers, relation discovery and the queue drain
//! - `cli` - command implementations behind the `spotmirror` binary
//! - `config` - environment based configuration
//! - `management` - token persistence and refresh
//! - `organize` - shuffle, dedupe and filter albums and playlists
//! - `player` - blacklist skipping and listen tracking
//! - `server` - local HTTP server for OAuth callbacks
//! - `spotify` - Spotify Web API client
//! - `types` - API payloads and table rows
//! - `utils` - id, uri and PKCE helpers

pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod management;
pub mod organize;
pub mod player;
pub mod server;
pub mod spotify;
pub mod types;
pub mod utils;

/// Result alias used by the binary-facing layers.
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints an informational line with a blue bullet.
///
/// ```ignore
/// info!("Cached {} tracks", count);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success line with a green checkmark.
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error line and exits the process with status 1. Only the
/// command layer uses it; library code returns errors instead.
///
/// ```ignore
/// error!("Cannot open cache. Err: {}", e);
/// // not reached
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning line with a yellow exclamation mark.
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
