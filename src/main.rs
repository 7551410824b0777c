//! Mediabar debug frontend - terminal presentation adapter
//!
//! Connects to the session bus, tracks MPRIS players, and prints the
//! favored player's state on every update. Useful for checking what a
//! panel widget built on this core would render.

use std::{error::Error, path::PathBuf, sync::Arc};

use clap::Parser;
use futures::StreamExt;
use tracing::info;

use mediabar::{PlayerSet, VolumeLevel, config::Config, tracing_config};

#[derive(Parser, Debug)]
#[command(name = "mediabar", about = "MPRIS media player monitor for panel widgets")]
struct Args {
    /// Path to an alternative config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the current state once and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    tracing_config::init(config.general.log_level.as_deref().unwrap_or("info"))?;
    info!("Starting mediabar");

    let players = Arc::new(PlayerSet::new(config.ignored_players).await?);
    players.start().await?;

    let states = players.updated_states();
    let mut states = std::pin::pin!(states);

    while let Some(state) = states.next().await {
        match state {
            Some(state) => {
                let volume = VolumeLevel::from_volume(state.volume);
                println!(
                    "{} [{:?}] ({})",
                    state.display_line(),
                    state.playback_status,
                    volume.icon_name(),
                );
            }
            None => println!("(no players)"),
        }

        if args.once {
            break;
        }
    }

    Ok(())
}
