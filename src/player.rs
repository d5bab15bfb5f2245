//! Playback helpers on top of the cache: blacklist enforcement and
//! popularity feedback from how far a track was listened to.

use thiserror::Error;
use tracing::{debug, info};

use crate::{
    cache::{
        EntityKind, FetchError, Store, StoreError,
        entity::{adjust_popularity, is_blacklisted},
    },
    spotify::SpotifyClient,
    types::PlaybackState,
    utils,
};

/// Listens shorter than this count as an early skip.
pub const EARLY_SKIP_MS: u64 = 20_000;

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The parts of the playback state the cache cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackSnapshot {
    pub track_id: Option<String>,
    pub track_name: String,
    pub album_id: Option<String>,
    pub artist_ids: Vec<String>,
    /// Playlist, album or artist the track is played from.
    pub context: Option<(EntityKind, String)>,
    pub progress_ms: u64,
    pub duration_ms: u64,
    pub is_playing: bool,
    pub device_id: Option<String>,
}

impl From<&PlaybackState> for PlaybackSnapshot {
    fn from(state: &PlaybackState) -> Self {
        let item = state.item.as_ref();
        Self {
            track_id: item.and_then(|i| i.id.clone()),
            track_name: item.map(|i| i.name.clone()).unwrap_or_default(),
            album_id: item.and_then(|i| i.album.as_ref()).and_then(|a| a.id.clone()),
            artist_ids: item
                .map(|i| i.artists.iter().filter_map(|a| a.id.clone()).collect())
                .unwrap_or_default(),
            context: state
                .context
                .as_ref()
                .and_then(|c| utils::parse_uri(&c.uri)),
            progress_ms: state.progress_ms.unwrap_or(0),
            duration_ms: item.map(|i| i.duration_ms).unwrap_or(0),
            is_playing: state.is_playing,
            device_id: state.device.as_ref().and_then(|d| d.id.clone()),
        }
    }
}

/// True if the track, its album, one of its artists or the playing context
/// is blacklisted in the cache.
pub fn should_skip<S: Store>(store: &S, snapshot: &PlaybackSnapshot) -> Result<bool, StoreError> {
    let mut candidates: Vec<(EntityKind, &str)> = Vec::new();
    if let Some(id) = &snapshot.track_id {
        candidates.push((EntityKind::Track, id.as_str()));
    }
    if let Some(id) = &snapshot.album_id {
        candidates.push((EntityKind::Album, id.as_str()));
    }
    candidates.extend(snapshot.artist_ids.iter().map(|id| (EntityKind::Artist, id.as_str())));
    if let Some((kind, id)) = &snapshot.context {
        candidates.push((*kind, id.as_str()));
    }

    for (kind, id) in candidates {
        if is_blacklisted(store, kind, id)? {
            debug!(%kind, %id, "blacklisted");
            return Ok(true);
        }
    }
    Ok(false)
}

/// How far a track got before playback moved on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipStage {
    EarlySkip,
    FirstHalf,
    ThirdQuarter,
    LastQuarter,
    Finished,
}

impl SkipStage {
    pub fn classify(progress_ms: u64, duration_ms: u64) -> Self {
        if duration_ms == 0 || progress_ms >= duration_ms {
            return SkipStage::Finished;
        }
        if progress_ms < EARLY_SKIP_MS {
            return SkipStage::EarlySkip;
        }
        let ratio = progress_ms as f64 / duration_ms as f64;
        if ratio < 0.5 {
            SkipStage::FirstHalf
        } else if ratio < 0.75 {
            SkipStage::ThirdQuarter
        } else {
            SkipStage::LastQuarter
        }
    }

    /// Popularity change applied for this stage.
    pub fn step(self) -> i64 {
        match self {
            SkipStage::EarlySkip => -2,
            SkipStage::FirstHalf => -1,
            SkipStage::ThirdQuarter | SkipStage::LastQuarter => 0,
            SkipStage::Finished => 1,
        }
    }
}

/// Applies the skip stage of a listen to the cached track. Returns the new
/// popularity, `None` if the track is not cached or the step is zero.
pub fn record_listen<S: Store>(
    store: &S,
    track_id: &str,
    progress_ms: u64,
    duration_ms: u64,
) -> Result<Option<i64>, StoreError> {
    let stage = SkipStage::classify(progress_ms, duration_ms);
    if stage.step() == 0 {
        return Ok(None);
    }
    let popularity = adjust_popularity(store, EntityKind::Track, track_id, stage.step())?;
    if let Some(value) = popularity {
        debug!(track = %track_id, ?stage, popularity = value, "listen recorded");
    }
    Ok(popularity)
}

pub struct Player<'a> {
    client: &'a SpotifyClient,
}

impl<'a> Player<'a> {
    pub fn new(client: &'a SpotifyClient) -> Self {
        Self { client }
    }

    pub async fn snapshot(&self) -> Result<Option<PlaybackSnapshot>, PlayerError> {
        let state = self.client.playback_state().await?;
        Ok(state.as_ref().map(PlaybackSnapshot::from))
    }

    /// Skips the current track if anything it belongs to is blacklisted.
    /// Returns the skipped snapshot.
    pub async fn skip_blacklisted<S: Store>(
        &self,
        store: &S,
    ) -> Result<Option<PlaybackSnapshot>, PlayerError> {
        let Some(snapshot) = self.snapshot().await? else {
            return Ok(None);
        };
        if !snapshot.is_playing || !should_skip(store, &snapshot)? {
            return Ok(None);
        }
        info!(track = %snapshot.track_name, "skipping blacklisted track");
        self.client.next(snapshot.device_id.as_deref()).await?;
        Ok(Some(snapshot))
    }

    /// Moves to the next track and feeds the listen of the current one back
    /// into its popularity.
    pub async fn next<S: Store>(&self, store: &S) -> Result<Option<i64>, PlayerError> {
        let snapshot = self.snapshot().await?;
        self.client
            .next(snapshot.as_ref().and_then(|s| s.device_id.as_deref()))
            .await?;

        let Some(snapshot) = snapshot else {
            return Ok(None);
        };
        let Some(track_id) = snapshot.track_id.as_deref() else {
            return Ok(None);
        };
        Ok(record_listen(
            store,
            track_id,
            snapshot.progress_ms,
            snapshot.duration_ms,
        )?)
    }
}
