//! Mediabar - MPRIS media player control core for desktop panel widgets.
//!
//! Mediabar discovers media players on the D-Bus session bus and keeps a
//! normalized snapshot of each player's state up to date. The main pieces:
//!
//! - Bus name registry that watches for players appearing on the bus
//! - Per-player sessions that track properties and expose control actions
//! - A player set manager that picks the favored player to surface
//!
//! A presentation layer (panel widget, status bar module, the bundled
//! `mediabar` binary) subscribes to update events and forwards user control
//! intents back into the core.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mediabar::PlayerSet;
//!
//! # async fn run() -> Result<(), mediabar::MediaError> {
//! let players = Arc::new(PlayerSet::new(Vec::new()).await?);
//! players.start().await?;
//!
//! if let Some(player) = players.favored().await {
//!     player.play_pause().await?;
//! }
//! # Ok(())
//! # }
//! ```

/// Configuration loading for the panel widget.
pub mod config;

/// Reactive services for system integration.
pub mod services;

/// Tracing subscriber setup.
pub mod tracing_config;

pub use services::mpris::{
    LoopStatus, MediaError, MediaEvent, PlaybackStatus, PlayerId, PlayerSession, PlayerSet,
    PlayerState, SessionPhase, TrackMetadata, VolumeLevel,
};
