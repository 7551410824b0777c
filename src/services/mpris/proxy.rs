use std::collections::HashMap;

use zbus::{Result, proxy};

/// MPRIS MediaPlayer2 interface proxy
///
/// Base interface of a media player instance: application identity and
/// window raising.
#[proxy(
    interface = "org.mpris.MediaPlayer2",
    default_service = "org.mpris.MediaPlayer2",
    default_path = "/org/mpris/MediaPlayer2"
)]
pub trait MediaPlayer2 {
    /// Raise the media player window to the foreground
    fn raise(&self) -> Result<()>;

    /// Quit the media player application
    fn quit(&self) -> Result<()>;

    /// Whether the player can be quit
    #[zbus(property)]
    fn can_quit(&self) -> Result<bool>;

    /// Whether the player window can be raised
    #[zbus(property)]
    fn can_raise(&self) -> Result<bool>;

    /// Human-readable name of the player
    #[zbus(property)]
    fn identity(&self) -> Result<String>;

    /// Desktop entry name for the player
    #[zbus(property)]
    fn desktop_entry(&self) -> Result<String>;
}

/// MPRIS MediaPlayer2.Player interface proxy
///
/// Playback control surface used by the widget.
#[proxy(
    interface = "org.mpris.MediaPlayer2.Player",
    default_service = "org.mpris.MediaPlayer2",
    default_path = "/org/mpris/MediaPlayer2"
)]
pub trait MediaPlayer2Player {
    /// Toggle play/pause state
    fn play_pause(&self) -> Result<()>;

    /// Skip to next track
    fn next(&self) -> Result<()>;

    /// Skip to previous track
    fn previous(&self) -> Result<()>;

    /// Stop playback
    fn stop(&self) -> Result<()>;

    /// Start playback
    fn play(&self) -> Result<()>;

    /// Whether the player can be controlled
    #[zbus(property)]
    fn can_control(&self) -> Result<bool>;

    /// Whether the player can skip to next track
    #[zbus(property)]
    fn can_go_next(&self) -> Result<bool>;

    /// Whether the player can skip to previous track
    #[zbus(property)]
    fn can_go_previous(&self) -> Result<bool>;

    /// Whether the player can start playback
    #[zbus(property)]
    fn can_play(&self) -> Result<bool>;

    /// Whether the player can pause playback
    #[zbus(property)]
    fn can_pause(&self) -> Result<bool>;

    /// Current track metadata
    #[zbus(property)]
    fn metadata(&self) -> Result<HashMap<String, zbus::zvariant::OwnedValue>>;

    /// Current playback status (Playing, Paused, Stopped)
    #[zbus(property)]
    fn playback_status(&self) -> Result<String>;

    /// Whether shuffle mode is enabled
    #[zbus(property)]
    fn shuffle(&self) -> Result<bool>;

    /// Set shuffle mode
    #[zbus(property)]
    fn set_shuffle(&self, shuffle: bool) -> Result<()>;

    /// Current loop status (None, Track, Playlist)
    #[zbus(property)]
    fn loop_status(&self) -> Result<String>;

    /// Set the loop status
    #[zbus(property)]
    fn set_loop_status(&self, status: &str) -> Result<()>;

    /// Current volume level (0.0 to 1.0)
    #[zbus(property)]
    fn volume(&self) -> Result<f64>;

    /// Set volume level
    #[zbus(property)]
    fn set_volume(&self, volume: f64) -> Result<()>;
}
