use super::{DUMMY_ID, EntityKind, Row, SqlValue};

/// Bumped whenever a table definition changes. Stored in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
    Real,
    /// TEXT column holding an encoded id list.
    List,
}

impl SqlType {
    fn declaration(self) -> &'static str {
        match self {
            SqlType::Text | SqlType::List => "TEXT",
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
        }
    }
}

#[derive(Debug)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: SqlType,
}

const fn col(name: &'static str, sql_type: SqlType) -> Column {
    Column { name, sql_type }
}

#[derive(Debug)]
pub struct Table {
    pub kind: EntityKind,
    pub columns: &'static [Column],
}

impl Table {
    pub fn name(&self) -> &'static str {
        self.kind.table()
    }

    pub fn column(&self, name: &str) -> Option<&'static Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn create_statement(&self) -> String {
        let pk = self.kind.primary_key();
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                let mut def = format!("{} {}", c.name, c.sql_type.declaration());
                if c.name == pk {
                    def.push_str(" PRIMARY KEY");
                } else if c.sql_type == SqlType::List {
                    def.push_str(" NOT NULL DEFAULT '[]'");
                } else if c.name == "popularity" {
                    // Written on every insert from the cache settings.
                    def.push_str(" NOT NULL");
                } else if matches!(c.name, "blacklisted" | "hydrated") {
                    def.push_str(" NOT NULL DEFAULT 0");
                }
                def
            })
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.name(),
            columns.join(", ")
        )
    }

    /// Sentinel row present in every table so none is ever empty.
    pub fn dummy_row(&self) -> Row {
        let pk = self.kind.primary_key();
        self.columns
            .iter()
            .map(|c| {
                let value = match c.name {
                    n if n == pk => SqlValue::Text(DUMMY_ID.to_string()),
                    "name" => SqlValue::Text("dummy".to_string()),
                    "uri" => SqlValue::Text(format!("spotify:{}:{}", self.kind, DUMMY_ID)),
                    "hydrated" => SqlValue::Integer(1),
                    "payload" => SqlValue::Text("{}".to_string()),
                    _ => match c.sql_type {
                        SqlType::Text => SqlValue::Text(String::new()),
                        SqlType::List => SqlValue::Text("[]".to_string()),
                        SqlType::Integer => SqlValue::Integer(0),
                        SqlType::Real => SqlValue::Real(0.0),
                    },
                };
                (c.name.to_string(), value)
            })
            .collect()
    }
}

/// A list column that references entities of another kind.
#[derive(Debug, Clone, Copy)]
pub struct Relation {
    pub owner: EntityKind,
    pub column: &'static str,
    pub target: EntityKind,
    /// Scalar id instead of an encoded list.
    pub scalar: bool,
}

const fn rel(owner: EntityKind, column: &'static str, target: EntityKind) -> Relation {
    Relation {
        owner,
        column,
        target,
        scalar: false,
    }
}

pub const RELATIONS: &[Relation] = &[
    rel(EntityKind::Album, "artist_ids", EntityKind::Artist),
    rel(EntityKind::Album, "track_ids", EntityKind::Track),
    rel(EntityKind::Artist, "album_ids", EntityKind::Album),
    rel(EntityKind::Artist, "playlist_ids", EntityKind::Playlist),
    rel(EntityKind::Artist, "top_track_ids", EntityKind::Track),
    rel(EntityKind::Playlist, "track_ids", EntityKind::Track),
    Relation {
        owner: EntityKind::Playlist,
        column: "owner_id",
        target: EntityKind::User,
        scalar: true,
    },
    rel(EntityKind::Track, "album_ids", EntityKind::Album),
    rel(EntityKind::Track, "artist_ids", EntityKind::Artist),
    rel(EntityKind::Track, "playlist_ids", EntityKind::Playlist),
    rel(EntityKind::User, "playlist_ids", EntityKind::Playlist),
    rel(EntityKind::User, "top_track_ids", EntityKind::Track),
    rel(EntityKind::User, "top_artist_ids", EntityKind::Artist),
];

pub fn relation(owner: EntityKind, column: &str) -> Option<&'static Relation> {
    RELATIONS
        .iter()
        .find(|r| r.owner == owner && r.column == column)
}

use SqlType::{Integer, List, Real, Text};

const ALBUMS: Table = Table {
    kind: EntityKind::Album,
    columns: &[
        col("id", Text),
        col("name", Text),
        col("uri", Text),
        col("url", Text),
        col("image", Text),
        col("genre_names", List),
        col("total_duration", Integer),
        col("track_count", Integer),
        col("artist_ids", List),
        col("track_ids", List),
        col("popularity", Integer),
        col("blacklisted", Integer),
        col("hydrated", Integer),
        col("payload", Text),
    ],
};

const ARTISTS: Table = Table {
    kind: EntityKind::Artist,
    columns: &[
        col("id", Text),
        col("name", Text),
        col("uri", Text),
        col("url", Text),
        col("image", Text),
        col("genre_names", List),
        col("follower_count", Integer),
        col("album_ids", List),
        col("playlist_ids", List),
        col("top_track_ids", List),
        col("popularity", Integer),
        col("blacklisted", Integer),
        col("hydrated", Integer),
        col("payload", Text),
    ],
};

const PLAYLISTS: Table = Table {
    kind: EntityKind::Playlist,
    columns: &[
        col("id", Text),
        col("name", Text),
        col("uri", Text),
        col("url", Text),
        col("image", Text),
        col("genre_names", List),
        col("total_duration", Integer),
        col("track_count", Integer),
        col("owner_id", Text),
        col("track_ids", List),
        col("popularity", Integer),
        col("blacklisted", Integer),
        col("hydrated", Integer),
        col("payload", Text),
    ],
};

const TRACKS: Table = Table {
    kind: EntityKind::Track,
    columns: &[
        col("id", Text),
        col("name", Text),
        col("uri", Text),
        col("url", Text),
        col("image", Text),
        col("genre_names", List),
        col("duration", Integer),
        col("album_ids", List),
        col("artist_ids", List),
        col("playlist_ids", List),
        col("popularity", Integer),
        col("blacklisted", Integer),
        col("hydrated", Integer),
        col("payload", Text),
    ],
};

const USERS: Table = Table {
    kind: EntityKind::User,
    columns: &[
        col("id", Text),
        col("name", Text),
        col("uri", Text),
        col("url", Text),
        col("image", Text),
        col("follower_count", Integer),
        col("playlist_ids", List),
        col("top_track_ids", List),
        col("top_artist_ids", List),
        col("top_genre_names", List),
        col("popularity", Integer),
        col("blacklisted", Integer),
        col("hydrated", Integer),
        col("payload", Text),
    ],
};

const GENRES: Table = Table {
    kind: EntityKind::Genre,
    columns: &[
        col("name", Text),
        col("acousticness_lower", Real),
        col("acousticness_upper", Real),
        col("danceability_lower", Real),
        col("danceability_upper", Real),
        col("energy_lower", Real),
        col("energy_upper", Real),
        col("instrumentalness_lower", Real),
        col("instrumentalness_upper", Real),
        col("key_lower", Real),
        col("key_upper", Real),
        col("liveness_lower", Real),
        col("liveness_upper", Real),
        col("loudness_lower", Real),
        col("loudness_upper", Real),
        col("mode_lower", Real),
        col("mode_upper", Real),
        col("speechiness_lower", Real),
        col("speechiness_upper", Real),
        col("tempo_lower", Real),
        col("tempo_upper", Real),
        col("valence_lower", Real),
        col("valence_upper", Real),
        col("duration_ms", Integer),
        col("popularity", Integer),
        col("blacklisted", Integer),
    ],
};

const DEVICES: Table = Table {
    kind: EntityKind::Device,
    columns: &[
        col("id", Text),
        col("name", Text),
        col("device_type", Text),
        col("is_active", Integer),
        col("is_private_session", Integer),
        col("is_restricted", Integer),
        col("supports_volume", Integer),
        col("volume_percent", Integer),
        col("payload", Text),
    ],
};

pub const TABLES: [&Table; 7] = [
    &ALBUMS, &ARTISTS, &PLAYLISTS, &TRACKS, &USERS, &GENRES, &DEVICES,
];

pub fn table(kind: EntityKind) -> &'static Table {
    match kind {
        EntityKind::Album => &ALBUMS,
        EntityKind::Artist => &ARTISTS,
        EntityKind::Playlist => &PLAYLISTS,
        EntityKind::Track => &TRACKS,
        EntityKind::User => &USERS,
        EntityKind::Genre => &GENRES,
        EntityKind::Device => &DEVICES,
    }
}
