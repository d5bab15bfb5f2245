//! Rewrites albums and playlists: shuffle, drop duplicates and drop tracks
//! whose name matches a pattern.
//!
//! Playlists owned by the current user are rewritten in place, everything
//! else is copied into a new playlist named `<name> (Shuffled)`.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use regex::{Regex, RegexBuilder};
use serde_json::Value;
use tracing::info;

use crate::{
    cache::{EntityKind, FetchError, RemoteGateway, SubResource, entity::collect_pages},
    spotify::SpotifyClient,
    types::CreatePlaylistRequest,
    utils,
};

pub const SHUFFLED_SUFFIX: &str = " (Shuffled)";

/// One playable item of an album or playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionTrack {
    pub uri: String,
    pub name: String,
    /// First credited artist.
    pub artist_id: Option<String>,
}

impl CollectionTrack {
    /// Reads a track object. Local files and podcast episodes without a
    /// track uri are skipped.
    pub fn from_payload(track: &Value) -> Option<Self> {
        let uri = track.get("uri")?.as_str()?;
        if !uri.starts_with("spotify:track:") {
            return None;
        }
        Some(Self {
            uri: uri.to_string(),
            name: track
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            artist_id: track
                .pointer("/artists/0/id")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}

pub fn all_shuffle(tracks: &mut [CollectionTrack]) {
    tracks.shuffle(&mut rand::rng());
}

/// Drops every track with the same name and first artist as an earlier one.
pub fn remove_duplicates(tracks: &mut Vec<CollectionTrack>) {
    let mut seen = HashSet::new();
    tracks.retain(|t| seen.insert((t.name.to_lowercase(), t.artist_id.clone())));
}

pub fn remove_matching(tracks: &mut Vec<CollectionTrack>, patterns: &[Regex]) {
    tracks.retain(|t| !patterns.iter().any(|p| p.is_match(&t.name)));
}

#[derive(Debug, Clone, Default)]
pub struct OrganizeOptions {
    pub shuffle: bool,
    pub dedupe: bool,
    pub remove_patterns: Vec<Regex>,
}

impl OrganizeOptions {
    /// Patterns are matched case-insensitively against track names.
    pub fn new(shuffle: bool, dedupe: bool, patterns: &[String]) -> Result<Self, regex::Error> {
        let remove_patterns = patterns
            .iter()
            .map(|p| RegexBuilder::new(p).case_insensitive(true).build())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            shuffle,
            dedupe,
            remove_patterns,
        })
    }

    /// Filters run before the shuffle so the first occurrence of a
    /// duplicate is the one from the original order.
    pub fn apply(&self, tracks: &mut Vec<CollectionTrack>) {
        if self.dedupe {
            remove_duplicates(tracks);
        }
        if !self.remove_patterns.is_empty() {
            remove_matching(tracks, &self.remove_patterns);
        }
        if self.shuffle {
            all_shuffle(tracks);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizeReport {
    pub playlist_id: String,
    pub playlist_name: String,
    /// A new playlist was created instead of rewriting the source.
    pub created: bool,
    pub before: usize,
    pub after: usize,
}

struct Collection {
    name: String,
    owner_id: Option<String>,
    tracks: Vec<CollectionTrack>,
}

async fn read_collection(
    client: &SpotifyClient,
    kind: EntityKind,
    id: &str,
) -> Result<Collection, FetchError> {
    let payload = client.fetch_one(kind, id).await?;
    let name = payload
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or(id)
        .to_string();

    let (resource, page_size, wrapped) = match kind {
        EntityKind::Album => (SubResource::AlbumTracks, 50, false),
        EntityKind::Playlist => (SubResource::PlaylistTracks, 100, true),
        _ => {
            return Err(FetchError::Malformed(format!(
                "cannot organize a {}, expected an album or playlist",
                kind
            )));
        }
    };

    let items = collect_pages(client, resource, id, page_size, None).await?;
    let tracks = items
        .iter()
        .filter_map(|item| if wrapped { item.get("track") } else { Some(item) })
        .filter_map(CollectionTrack::from_payload)
        .collect();

    Ok(Collection {
        name,
        owner_id: payload
            .pointer("/owner/id")
            .and_then(Value::as_str)
            .map(str::to_string),
        tracks,
    })
}

/// Reads an album or playlist, applies `options` and writes the result to
/// a playlist of the current user.
pub async fn organize_collection(
    client: &SpotifyClient,
    uri_or_url: &str,
    options: &OrganizeOptions,
) -> Result<OrganizeReport, FetchError> {
    let (kind, id) = utils::normalize_uri(uri_or_url)
        .as_deref()
        .and_then(utils::parse_uri)
        .ok_or_else(|| FetchError::Malformed(format!("not a Spotify uri or link: {}", uri_or_url)))?;

    let mut collection = read_collection(client, kind, &id).await?;
    let before = collection.tracks.len();
    options.apply(&mut collection.tracks);

    let user_id = match client.config().user_id.clone() {
        Some(user_id) => user_id,
        None => client.current_user().await?.id,
    };

    let owned = collection.owner_id.as_deref() == Some(user_id.as_str());
    let (playlist_id, playlist_name) = if owned {
        let name = if collection.name.ends_with(SHUFFLED_SUFFIX) {
            collection.name.clone()
        } else {
            format!("{}{}", collection.name, SHUFFLED_SUFFIX)
        };
        client.rename_playlist(&id, &name).await?;
        (id, name)
    } else {
        let request = CreatePlaylistRequest {
            name: format!("{}{}", collection.name, SHUFFLED_SUFFIX),
            description: format!("Organized copy of {}", collection.name),
            public: false,
            collaborative: false,
        };
        let created = client.create_playlist(&user_id, &request).await?;
        (created.id, created.name)
    };

    let uris: Vec<String> = collection.tracks.iter().map(|t| t.uri.clone()).collect();
    client.replace_playlist_items(&playlist_id, &uris).await?;

    info!(playlist = %playlist_id, before, after = uris.len(), "collection organized");
    Ok(OrganizeReport {
        playlist_id,
        playlist_name,
        created: !owned,
        before,
        after: uris.len(),
    })
}
