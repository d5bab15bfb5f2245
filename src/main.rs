use std::{sync::Arc, time::Duration};

use clap::{
    ArgAction, CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

use spotmirror::{
    cache::EntityKind,
    cli,
    config::{self, Config},
    error,
    spotify::player::RepeatMode,
    types::PkceToken,
};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Authorize with Spotify API
    Auth,

    /// Create the cache database and show its tables
    Init,

    /// Show a cached item, fetching it on a cache miss
    Show(ShowOptions),

    /// Cache items and everything reachable from them
    Crawl(CrawlOptions),

    /// Blacklist an item so the player skips it
    Blacklist(BlacklistOptions),

    /// Change the popularity of a cached item
    Popularity(PopularityOptions),

    /// Control playback
    Player(PlayerOptions),

    /// Shuffle, dedupe or filter an album or playlist into a playlist
    Organize(OrganizeOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct ShowOptions {
    /// album, artist, playlist, track, user, genre or device
    kind: EntityKind,
    /// Id, uri or open.spotify.com link (genre name for genres)
    id: String,
}

#[derive(Parser, Debug, Clone)]
pub struct CrawlOptions {
    /// Album to start from; can be repeated
    #[clap(long = "album", action = ArgAction::Append)]
    albums: Vec<String>,

    /// Artist to start from; can be repeated
    #[clap(long = "artist", action = ArgAction::Append)]
    artists: Vec<String>,

    /// Playlist to start from; can be repeated
    #[clap(long = "playlist", action = ArgAction::Append)]
    playlists: Vec<String>,

    /// Track to start from; can be repeated
    #[clap(long = "track", action = ArgAction::Append)]
    tracks: Vec<String>,

    /// User to start from; can be repeated
    #[clap(long = "user", action = ArgAction::Append)]
    users: Vec<String>,

    /// Also queue every id referenced by cached rows but not cached itself
    #[clap(long)]
    from_cache: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct BlacklistOptions {
    kind: EntityKind,
    id: String,
    /// Remove the item from the blacklist
    #[clap(long)]
    off: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct PopularityOptions {
    kind: EntityKind,
    id: String,
    /// Value added to the popularity, may be negative
    #[clap(allow_hyphen_values = true)]
    delta: i64,
}

#[derive(Parser, Debug, Clone)]
pub struct PlayerOptions {
    #[command(subcommand)]
    command: PlayerSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PlayerSubcommand {
    /// Show what is playing
    Status,
    /// Skip blacklisted tracks until interrupted
    Guard {
        /// Seconds between two checks
        #[clap(long, default_value_t = 5)]
        interval: u64,
    },
    /// Resume playback or start a context
    Play {
        /// Album, artist or playlist uri or link
        context: Option<String>,
        #[clap(long)]
        device: Option<String>,
    },
    Pause,
    /// Skip the current track and record the skip
    Next,
    Previous,
    /// Jump to a position in seconds
    Seek { seconds: u64 },
    Volume {
        #[clap(value_parser = clap::value_parser!(u8).range(0..=100))]
        percent: u8,
    },
    Repeat { mode: RepeatMode },
    Shuffle {
        #[clap(action = ArgAction::Set)]
        state: bool,
    },
    /// Append a track or episode to the playback queue
    Queue {
        /// Uri or open.spotify.com link
        item: String,
    },
    /// List available devices
    Devices,
    /// Move playback to another device
    Transfer {
        device_id: String,
        /// Start playing on the new device
        #[clap(long)]
        play: bool,
    },
}

#[derive(Parser, Debug, Clone)]
pub struct OrganizeOptions {
    /// Album or playlist uri or link
    source: String,
    #[clap(long)]
    shuffle: bool,
    /// Drop tracks with the same name and first artist
    #[clap(long)]
    dedupe: bool,
    /// Drop tracks whose name matches the pattern; can be repeated
    #[clap(long = "remove", action = ArgAction::Append)]
    remove: Vec<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("spotmirror=info")),
        )
        .with_target(false)
        .init();

    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();

    if let Command::Completions(opt) = &cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(opt.shell, &mut cmd, name, &mut std::io::stdout());
        return;
    }

    let config = match Config::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => error!("Invalid configuration. Err: {}", e),
    };

    match cli.command {
        Command::Auth => {
            let oauth_result: Arc<Mutex<Option<PkceToken>>> = Arc::new(Mutex::new(None));
            cli::auth(config, Arc::clone(&oauth_result)).await;
        }
        Command::Init => cli::init(config).await,
        Command::Show(opt) => cli::show(config, opt.kind, opt.id).await,
        Command::Crawl(opt) => {
            let seeds = cli::CrawlSeeds {
                albums: opt.albums,
                artists: opt.artists,
                playlists: opt.playlists,
                tracks: opt.tracks,
                users: opt.users,
            };
            if seeds.is_empty() && !opt.from_cache {
                error!("Nothing to start from. Pass at least one id or --from-cache.");
            }
            cli::crawl(config, seeds, opt.from_cache).await
        }
        Command::Blacklist(opt) => cli::blacklist(config, opt.kind, opt.id, opt.off).await,
        Command::Popularity(opt) => cli::popularity(config, opt.kind, opt.id, opt.delta).await,
        Command::Player(opt) => match opt.command {
            PlayerSubcommand::Status => cli::player_status(config).await,
            PlayerSubcommand::Guard { interval } => {
                cli::player_guard(config, Duration::from_secs(interval.max(1))).await
            }
            PlayerSubcommand::Play { context, device } => {
                cli::player_play(config, device, context).await
            }
            PlayerSubcommand::Pause => cli::player_pause(config).await,
            PlayerSubcommand::Next => cli::player_next(config).await,
            PlayerSubcommand::Previous => cli::player_previous(config).await,
            PlayerSubcommand::Seek { seconds } => cli::player_seek(config, seconds).await,
            PlayerSubcommand::Volume { percent } => cli::player_volume(config, percent).await,
            PlayerSubcommand::Repeat { mode } => cli::player_repeat(config, mode).await,
            PlayerSubcommand::Shuffle { state } => cli::player_shuffle(config, state).await,
            PlayerSubcommand::Devices => cli::player_devices(config).await,
            PlayerSubcommand::Queue { item } => cli::player_queue(config, item).await,
            PlayerSubcommand::Transfer { device_id, play } => {
                cli::player_transfer(config, device_id, play).await
            }
        },
        Command::Organize(opt) => {
            cli::organize(config, opt.source, opt.shuffle, opt.dedupe, opt.remove).await
        }
        Command::Completions(_) => {}
    }
}
