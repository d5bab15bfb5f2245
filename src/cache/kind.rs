use std::{fmt, str::FromStr};

/// How the drain fetches a queued kind from the Web API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Several ids per request (`/albums?ids=`, `/artists?ids=`, `/tracks?ids=`).
    Bulk,
    /// One request per id.
    Single,
    /// Never fetched by the drain.
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Album,
    Artist,
    Playlist,
    Track,
    User,
    Genre,
    Device,
}

impl EntityKind {
    /// Kinds that have a pending queue, in drain order.
    pub const QUEUED: [EntityKind; 5] = [
        EntityKind::Album,
        EntityKind::Artist,
        EntityKind::Playlist,
        EntityKind::Track,
        EntityKind::User,
    ];

    pub const ALL: [EntityKind; 7] = [
        EntityKind::Album,
        EntityKind::Artist,
        EntityKind::Playlist,
        EntityKind::Track,
        EntityKind::User,
        EntityKind::Genre,
        EntityKind::Device,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Album => "album",
            EntityKind::Artist => "artist",
            EntityKind::Playlist => "playlist",
            EntityKind::Track => "track",
            EntityKind::User => "user",
            EntityKind::Genre => "genre",
            EntityKind::Device => "device",
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            EntityKind::Album => "albums",
            EntityKind::Artist => "artists",
            EntityKind::Playlist => "playlists",
            EntityKind::Track => "tracks",
            EntityKind::User => "users",
            EntityKind::Genre => "genres",
            EntityKind::Device => "devices",
        }
    }

    pub fn primary_key(self) -> &'static str {
        match self {
            EntityKind::Genre => "name",
            _ => "id",
        }
    }

    pub fn fetch_mode(self) -> FetchMode {
        match self {
            EntityKind::Album | EntityKind::Artist | EntityKind::Track => FetchMode::Bulk,
            EntityKind::Playlist | EntityKind::User => FetchMode::Single,
            EntityKind::Genre | EntityKind::Device => FetchMode::Local,
        }
    }

    pub fn is_queued(self) -> bool {
        self.fetch_mode() != FetchMode::Local
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let singular = lower.strip_suffix('s').unwrap_or(&lower);
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == singular)
            .ok_or_else(|| {
                format!(
                    "unknown entity kind '{}', expected one of: album, artist, playlist, track, user, genre, device",
                    s
                )
            })
    }
}
