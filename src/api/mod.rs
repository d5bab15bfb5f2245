//! Handlers of the local HTTP server that receives the OAuth redirect.
//!
//! - `GET /health` reports the server status and crate version.
//! - `GET /callback` completes the PKCE flow started by `spotmirror auth`.

mod callback;
mod health;

pub use callback::callback;
pub use health::health;
