use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};

use crate::cache::EntityKind;

/// Length of a Spotify base62 id.
pub const ID_LENGTH: usize = 22;

pub fn generate_code_verifier() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(128)
        .map(char::from)
        .collect()
}

pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

pub fn is_valid_id(id: &str) -> bool {
    id.len() == ID_LENGTH && id.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Returns the id of `spotify:<kind>:<id>`. Plain ids are passed through.
/// User uris may carry ids that are not base62, so they are not validated.
pub fn uri_to_id(uri: &str) -> Option<String> {
    let parts: Vec<&str> = uri.split(':').collect();
    match parts.as_slice() {
        [id] if is_valid_id(id) => Some(id.to_string()),
        ["spotify", "user", id] if !id.is_empty() => Some(id.to_string()),
        ["spotify", _, id] if is_valid_id(id) => Some(id.to_string()),
        _ => None,
    }
}

pub fn id_to_uri(kind: EntityKind, id: &str) -> String {
    format!("spotify:{}:{}", kind.as_str(), id)
}

/// Kind and id of a `spotify:<kind>:<id>` uri.
pub fn parse_uri(uri: &str) -> Option<(EntityKind, String)> {
    let mut parts = uri.splitn(3, ':');
    if parts.next()? != "spotify" {
        return None;
    }
    let kind: EntityKind = parts.next()?.parse().ok()?;
    let id = parts.next()?;
    if id.is_empty() {
        return None;
    }
    Some((kind, id.to_string()))
}

/// Converts an `open.spotify.com` link into a uri. Query strings and
/// locale prefixes (`/intl-de/`) are ignored.
pub fn url_to_uri(url: &str) -> Option<String> {
    let rest = url
        .trim()
        .strip_prefix("https://")
        .or_else(|| url.trim().strip_prefix("http://"))?;
    let rest = rest.strip_prefix("open.spotify.com/")?;
    let path = rest.split(['?', '#']).next()?;

    let segments: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty() && !s.starts_with("intl-"))
        .collect();
    match segments.as_slice() {
        [kind, id, ..] => {
            let kind: EntityKind = kind.parse().ok()?;
            Some(id_to_uri(kind, id))
        }
        _ => None,
    }
}

/// Accepts a uri, an open.spotify.com link or a bare uri string.
pub fn normalize_uri(input: &str) -> Option<String> {
    if input.starts_with("spotify:") {
        parse_uri(input).map(|(kind, id)| id_to_uri(kind, &id))
    } else {
        url_to_uri(input)
    }
}

/// Formats milliseconds as `m:ss`.
pub fn millis_to_minutes(ms: u64) -> String {
    let seconds = ms / 1000;
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

pub fn split_into_chunks<T: Clone>(items: &[T], size: usize) -> Vec<Vec<T>> {
    items
        .chunks(size.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}
