use std::{sync::Arc, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};

use super::connect;
use crate::{
    config::Config,
    error,
    organize::{OrganizeOptions, organize_collection},
    success,
};

pub async fn organize(
    config: Arc<Config>,
    source: String,
    shuffle: bool,
    dedupe: bool,
    remove: Vec<String>,
) {
    let options = match OrganizeOptions::new(shuffle, dedupe, &remove) {
        Ok(options) => options,
        Err(e) => error!("Invalid --remove pattern. Err: {}", e),
    };
    let client = connect(&config).await;

    let pb = ProgressBar::new_spinner();
    pb.set_message(format!("Organizing {}...", source));
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );

    let result = organize_collection(&client, &source, &options).await;
    pb.finish_and_clear();

    match result {
        Ok(report) => {
            let action = if report.created { "Created" } else { "Rewrote" };
            success!(
                "{} playlist '{}' with {} of {} tracks ({}).",
                action,
                report.playlist_name,
                report.after,
                report.before,
                report.playlist_id
            );
        }
        Err(e) => error!("Cannot organize {}. Err: {}", source, e),
    }
}
