//! `host`: play a queue from a JSON track list.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use cotune_core::types::Track;
use cotune_player::{ClientCommand, ClientOptions};

use crate::output;

#[derive(Debug, Args)]
pub struct HostArgs {
    /// JSON file with an array of tracks (`_id`, `title`, `artist`, `audioUrl`, `duration`)
    #[arg(short, long)]
    pub playlist: PathBuf,

    /// Queue position to start from
    #[arg(long, default_value_t = 0)]
    pub start: usize,
}

pub async fn execute(args: &HostArgs, options: ClientOptions) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(&args.playlist)
        .await
        .with_context(|| format!("Failed to read {}", args.playlist.display()))?;
    let songs: Vec<Track> = serde_json::from_str(&raw).context("Playlist is not a track array")?;
    anyhow::ensure!(
        args.start < songs.len(),
        "Start index {} is outside a {}-track playlist",
        args.start,
        songs.len()
    );

    output::print_success(&format!(
        "Hosting {} tracks as {}",
        songs.len(),
        options.identity
    ));

    super::run_client(
        options,
        ClientCommand::PlayAlbum {
            songs,
            start_index: args.start,
        },
        |_| false,
    )
    .await
}
