use std::{sync::Arc, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};
use tabled::Table;

use super::{open_context, open_store, resolve_id};
use crate::{
    cache::{
        CacheError, Context, EntityKind, RemoteGateway, SqliteStore, Store, drain_queues,
        entity::{
            self, Album, Artist, Device, Entity, Genre, Playlist, Source, Track, User,
            load_hydrated,
        },
    },
    config::Config,
    error, info, success,
    types::{CountTableRow, FailedTableRow, FieldTableRow},
    utils, warning,
};

/// Ids a crawl starts from, one list per queued kind.
#[derive(Debug, Clone, Default)]
pub struct CrawlSeeds {
    pub albums: Vec<String>,
    pub artists: Vec<String>,
    pub playlists: Vec<String>,
    pub tracks: Vec<String>,
    pub users: Vec<String>,
}

impl CrawlSeeds {
    fn iter(&self) -> impl Iterator<Item = (EntityKind, &String)> {
        let lists = [
            (EntityKind::Album, &self.albums),
            (EntityKind::Artist, &self.artists),
            (EntityKind::Playlist, &self.playlists),
            (EntityKind::Track, &self.tracks),
            (EntityKind::User, &self.users),
        ];
        lists
            .into_iter()
            .flat_map(|(kind, ids)| ids.iter().map(move |id| (kind, id)))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

fn print_counts(store: &SqliteStore) {
    match store.counts() {
        Ok(counts) => {
            let rows: Vec<CountTableRow> = counts
                .into_iter()
                .map(|(kind, rows)| CountTableRow {
                    table: kind.table().to_string(),
                    rows,
                })
                .collect();
            println!("{}", Table::new(rows));
        }
        Err(e) => warning!("Cannot count cached rows. Err: {}", e),
    }
}

pub async fn init(config: Arc<Config>) {
    let store = open_store(&config);
    match store.schema_version() {
        Ok(version) => success!(
            "Cache ready at {} (schema version {})",
            config.database_path.display(),
            version
        ),
        Err(e) => error!("Cannot read schema version. Err: {}", e),
    }
    print_counts(&store);
}

fn field(name: &str, value: impl ToString) -> FieldTableRow {
    FieldTableRow {
        field: name.to_string(),
        value: value.to_string(),
    }
}

fn list_field(name: &str, ids: &[String]) -> FieldTableRow {
    let value = match ids.len() {
        0 => "-".to_string(),
        1..=5 => ids.join(", "),
        n => format!("{}, ... ({} total)", ids[..5].join(", "), n),
    };
    field(name, value)
}

fn base_fields<E: Entity>(entity: &E) -> Vec<FieldTableRow> {
    vec![
        field("kind", E::KIND),
        field("id", entity.id()),
        field("name", entity.name()),
        field("uri", entity.uri()),
        field("url", entity.url()),
        field("popularity", entity.popularity()),
        field("blacklisted", entity.is_blacklisted()),
    ]
}

async fn entity_fields<S: Store, R: RemoteGateway>(
    ctx: &mut Context<S, R>,
    kind: EntityKind,
    id: &str,
) -> Result<Vec<FieldTableRow>, CacheError> {
    let source = Source::Id(id);
    let fields = match kind {
        EntityKind::Album => {
            let mut album: Album = load_hydrated(ctx, source).await?;
            let mut rows = base_fields(&album);
            rows.push(field("tracks", album.track_count()));
            let duration = album.total_duration(ctx).await?;
            rows.push(field("duration", utils::millis_to_minutes(duration.max(0) as u64)));
            rows.push(list_field("artists", album.artist_ids(ctx)?));
            rows.push(list_field("genres", album.genre_names(ctx)?));
            rows.push(list_field("track ids", album.track_ids(ctx).await?));
            rows
        }
        EntityKind::Artist => {
            let mut artist: Artist = load_hydrated(ctx, source).await?;
            let mut rows = base_fields(&artist);
            rows.push(field("followers", artist.follower_count()));
            rows.push(list_field("genres", artist.genre_names(ctx)?));
            rows.push(list_field("albums", artist.album_ids(ctx).await?));
            rows.push(list_field("top tracks", artist.top_track_ids(ctx).await?));
            rows.push(list_field("playlists", &artist.playlist_ids(&ctx.store)?));
            rows
        }
        EntityKind::Playlist => {
            let mut playlist: Playlist = load_hydrated(ctx, source).await?;
            let mut rows = base_fields(&playlist);
            rows.push(field("owner", playlist.owner_id().unwrap_or("-")));
            rows.push(field("tracks", playlist.track_count()));
            let duration = playlist.total_duration(ctx).await?;
            rows.push(field("duration", utils::millis_to_minutes(duration.max(0) as u64)));
            rows.push(list_field("track ids", playlist.track_ids(ctx).await?));
            rows
        }
        EntityKind::Track => {
            let mut track: Track = load_hydrated(ctx, source).await?;
            let mut rows = base_fields(&track);
            rows.push(field("duration", utils::millis_to_minutes(track.duration().max(0) as u64)));
            rows.push(list_field("artists", track.artist_ids(ctx)?));
            rows.push(list_field("albums", track.album_ids(ctx)?));
            rows.push(list_field("playlists", &track.playlist_ids(&ctx.store)?));
            rows
        }
        EntityKind::User => {
            let mut user: User = load_hydrated(ctx, source).await?;
            let mut rows = base_fields(&user);
            rows.push(field("followers", user.follower_count()));
            rows.push(list_field("playlists", user.playlist_ids(ctx).await?));
            rows.push(list_field("top tracks", user.top_track_ids(ctx).await?));
            rows.push(list_field("top artists", user.top_artist_ids(ctx).await?));
            rows.push(list_field("top genres", user.top_genre_names(ctx).await?));
            rows
        }
        EntityKind::Genre => {
            let Some(genre) = Genre::load(&ctx.store, id)? else {
                return Ok(Vec::new());
            };
            let mut rows = vec![
                field("kind", kind),
                field("name", &genre.name),
                field("popularity", genre.popularity),
                field("blacklisted", genre.blacklisted),
            ];
            for (feature, range) in genre.bounds.ranges() {
                rows.push(field(feature, format!("{} .. {}", range.lower, range.upper)));
            }
            rows
        }
        EntityKind::Device => {
            let Some(device) = Device::load(&ctx.store, id)? else {
                return Ok(Vec::new());
            };
            vec![
                field("kind", kind),
                field("id", &device.id),
                field("name", &device.name),
                field("type", &device.device_type),
                field("active", device.is_active),
                field(
                    "volume",
                    device
                        .volume_percent
                        .map_or("-".to_string(), |v| format!("{}%", v)),
                ),
            ]
        }
    };
    Ok(fields)
}

pub async fn show(config: Arc<Config>, kind: EntityKind, input: String) {
    let id = resolve_id(kind, &input);
    let mut ctx = open_context(&config).await;

    match entity_fields(&mut ctx, kind, &id).await {
        Ok(rows) if rows.is_empty() => warning!("No {} '{}' in the cache.", kind, id),
        Ok(rows) => println!("{}", Table::new(rows)),
        Err(e) => error!("Cannot load {} {}. Err: {}", kind, id, e),
    }

    let pending = ctx.queues.total_len();
    if pending > 0 {
        info!(
            "{} related items discovered, run `spotmirror crawl --from-cache` to cache them.",
            pending
        );
    }
}

pub async fn crawl(config: Arc<Config>, seeds: CrawlSeeds, from_cache: bool) {
    let mut ctx = open_context(&config).await;

    for (kind, input) in seeds.iter() {
        let id = resolve_id(kind, input);
        match ctx.schedule(kind, &id) {
            Ok(true) => {}
            Ok(false) => info!("{} {} is already cached.", kind, id),
            Err(e) => error!("Cannot schedule {} {}. Err: {}", kind, id, e),
        }
    }

    if from_cache {
        match ctx.queues.refill_from_store(&ctx.store) {
            Ok(added) => info!("{} ids referenced by cached rows are queued.", added),
            Err(e) => error!("Cannot refill queues from cache. Err: {}", e),
        }
    }

    if ctx.queues.is_empty() {
        success!("Nothing to crawl.");
        return;
    }

    let pb = ProgressBar::new_spinner();
    pb.set_message(format!(
        "Crawling from {} queued items...",
        ctx.queues.total_len()
    ));
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );

    let result = drain_queues(&mut ctx).await;
    pb.finish_and_clear();

    let report = match result {
        Ok(report) => report,
        Err(e) => error!("Crawl aborted. Err: {}", e),
    };

    success!(
        "Cached {} items in {} passes.",
        report.hydrated,
        report.passes
    );
    if !report.failed.is_empty() {
        warning!("{} items could not be cached:", report.failed.len());
        let rows: Vec<FailedTableRow> = report
            .failed
            .iter()
            .map(|(kind, id)| FailedTableRow {
                kind: kind.to_string(),
                id: id.clone(),
            })
            .collect();
        println!("{}", Table::new(rows));
    }
    print_counts(&ctx.store);
}

fn ensure_curatable(kind: EntityKind) {
    if kind == EntityKind::Device {
        error!("Devices have no popularity or blacklist flag.");
    }
}

pub async fn blacklist(config: Arc<Config>, kind: EntityKind, input: String, off: bool) {
    ensure_curatable(kind);
    let id = resolve_id(kind, &input);
    let store = open_store(&config);

    match entity::set_blacklisted(&store, kind, &id, !off) {
        Ok(true) if off => success!("{} {} is no longer blacklisted.", kind, id),
        Ok(true) => success!("{} {} is blacklisted.", kind, id),
        Ok(false) => warning!(
            "{} {} is not cached. Run `spotmirror show {} {}` first.",
            kind,
            id,
            kind,
            id
        ),
        Err(e) => error!("Cannot update {} {}. Err: {}", kind, id, e),
    }
}

pub async fn popularity(config: Arc<Config>, kind: EntityKind, input: String, delta: i64) {
    ensure_curatable(kind);
    let id = resolve_id(kind, &input);
    let store = open_store(&config);

    match entity::adjust_popularity(&store, kind, &id, delta) {
        Ok(Some(value)) => success!("Popularity of {} {} is now {}.", kind, id, value),
        Ok(None) => warning!("{} {} is not cached.", kind, id),
        Err(e) => error!("Cannot update {} {}. Err: {}", kind, id, e),
    }
}
