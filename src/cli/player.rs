use std::{sync::Arc, time::Duration};

use tabled::Table;
use tokio::time::sleep;

use super::{connect, open_store};
use crate::{
    cache::entity::Device,
    config::Config,
    error, info,
    player::{Player, PlaybackSnapshot, should_skip},
    spotify::player::RepeatMode,
    success,
    types::{DeviceTableRow, FieldTableRow},
    utils, warning,
};

fn print_snapshot(snapshot: &PlaybackSnapshot, blacklisted: bool) {
    let mut rows = vec![
        FieldTableRow {
            field: "track".to_string(),
            value: snapshot.track_name.clone(),
        },
        FieldTableRow {
            field: "id".to_string(),
            value: snapshot.track_id.clone().unwrap_or_else(|| "-".to_string()),
        },
        FieldTableRow {
            field: "position".to_string(),
            value: format!(
                "{} / {}",
                utils::millis_to_minutes(snapshot.progress_ms),
                utils::millis_to_minutes(snapshot.duration_ms)
            ),
        },
        FieldTableRow {
            field: "playing".to_string(),
            value: snapshot.is_playing.to_string(),
        },
    ];
    if let Some((kind, id)) = &snapshot.context {
        rows.push(FieldTableRow {
            field: "context".to_string(),
            value: utils::id_to_uri(*kind, id),
        });
    }
    rows.push(FieldTableRow {
        field: "blacklisted".to_string(),
        value: blacklisted.to_string(),
    });
    println!("{}", Table::new(rows));
}

pub async fn player_status(config: Arc<Config>) {
    let client = connect(&config).await;
    let store = open_store(&config);

    match Player::new(&client).snapshot().await {
        Ok(Some(snapshot)) => {
            let blacklisted = should_skip(&store, &snapshot).unwrap_or_else(|e| {
                warning!("Cannot check blacklist. Err: {}", e);
                false
            });
            print_snapshot(&snapshot, blacklisted);
        }
        Ok(None) => info!("Nothing is playing."),
        Err(e) => error!("Cannot read playback state. Err: {}", e),
    }
}

/// Polls the playback state and skips blacklisted tracks until interrupted.
pub async fn player_guard(config: Arc<Config>, interval: Duration) {
    let client = connect(&config).await;
    let store = open_store(&config);
    let player = Player::new(&client);

    info!("Skipping blacklisted tracks, press Ctrl+C to stop.");
    loop {
        match player.skip_blacklisted(&store).await {
            Ok(Some(skipped)) => info!("Skipped {}", skipped.track_name),
            Ok(None) => {}
            Err(e) => warning!("Cannot check playback. Err: {}", e),
        }
        sleep(interval).await;
    }
}

pub async fn player_play(config: Arc<Config>, device: Option<String>, context: Option<String>) {
    let client = connect(&config).await;
    let context = context.map(|input| match utils::normalize_uri(&input) {
        Some(uri) => uri,
        None => error!("Not a Spotify uri or link: {}", input),
    });
    match client.play(device.as_deref(), context.as_deref()).await {
        Ok(()) => success!("Playback started."),
        Err(e) => error!("Cannot start playback. Err: {}", e),
    }
}

pub async fn player_pause(config: Arc<Config>) {
    let client = connect(&config).await;
    match client.pause(None).await {
        Ok(()) => success!("Playback paused."),
        Err(e) => error!("Cannot pause playback. Err: {}", e),
    }
}

/// Skips to the next track and records how far the current one got.
pub async fn player_next(config: Arc<Config>) {
    let client = connect(&config).await;
    let store = open_store(&config);
    match Player::new(&client).next(&store).await {
        Ok(Some(popularity)) => success!("Next track. Popularity of the skipped track: {}", popularity),
        Ok(None) => success!("Next track."),
        Err(e) => error!("Cannot skip track. Err: {}", e),
    }
}

pub async fn player_previous(config: Arc<Config>) {
    let client = connect(&config).await;
    match client.previous(None).await {
        Ok(()) => success!("Previous track."),
        Err(e) => error!("Cannot go back. Err: {}", e),
    }
}

pub async fn player_seek(config: Arc<Config>, seconds: u64) {
    let client = connect(&config).await;
    match client.seek(seconds * 1000, None).await {
        Ok(()) => success!("Moved to {}.", utils::millis_to_minutes(seconds * 1000)),
        Err(e) => error!("Cannot seek. Err: {}", e),
    }
}

pub async fn player_volume(config: Arc<Config>, percent: u8) {
    let client = connect(&config).await;
    match client.set_volume(percent, None).await {
        Ok(()) => success!("Volume set to {}%.", percent.min(100)),
        Err(e) => error!("Cannot set volume. Err: {}", e),
    }
}

pub async fn player_repeat(config: Arc<Config>, mode: RepeatMode) {
    let client = connect(&config).await;
    match client.set_repeat(mode, None).await {
        Ok(()) => success!("Repeat mode set to {}.", mode),
        Err(e) => error!("Cannot set repeat mode. Err: {}", e),
    }
}

pub async fn player_shuffle(config: Arc<Config>, state: bool) {
    let client = connect(&config).await;
    match client.set_shuffle(state, None).await {
        Ok(()) if state => success!("Shuffle on."),
        Ok(()) => success!("Shuffle off."),
        Err(e) => error!("Cannot change shuffle. Err: {}", e),
    }
}

/// Lists the available devices and caches them.
pub async fn player_devices(config: Arc<Config>) {
    let client = connect(&config).await;
    let store = open_store(&config);

    let infos = match client.devices().await {
        Ok(infos) => infos,
        Err(e) => error!("Cannot list devices. Err: {}", e),
    };
    let devices = match Device::refresh_all(&store, &infos) {
        Ok(devices) => devices,
        Err(e) => {
            warning!("Cannot cache devices. Err: {}", e);
            infos.iter().filter_map(Device::from_info).collect()
        }
    };

    if devices.is_empty() {
        info!("No devices available. Open Spotify on any device first.");
        return;
    }
    let rows: Vec<DeviceTableRow> = devices
        .into_iter()
        .map(|d| DeviceTableRow {
            name: d.name,
            device_type: d.device_type,
            active: if d.is_active { "yes" } else { "" }.to_string(),
            volume: d
                .volume_percent
                .map_or("-".to_string(), |v| format!("{}%", v)),
            id: d.id,
        })
        .collect();
    println!("{}", Table::new(rows));
}

pub async fn player_transfer(config: Arc<Config>, device_id: String, play: bool) {
    let client = connect(&config).await;
    match client.transfer(&device_id, play).await {
        Ok(()) => success!("Playback transferred to {}.", device_id),
        Err(e) => error!("Cannot transfer playback. Err: {}", e),
    }
}

pub async fn player_queue(config: Arc<Config>, item: String) {
    let Some(uri) = utils::normalize_uri(&item) else {
        error!("'{}' is neither a spotify uri nor an open.spotify.com link.", item);
    };
    let client = connect(&config).await;
    match client.add_to_queue(&uri, None).await {
        Ok(()) => success!("Queued {}.", uri),
        Err(e) => error!("Cannot queue {}. Err: {}", uri, e),
    }
}
