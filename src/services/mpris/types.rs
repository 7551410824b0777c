use std::fmt;

use super::metadata::{UNKNOWN_ARTIST, UNKNOWN_TITLE};

/// Unique identifier for a media player
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlayerId(String);

impl PlayerId {
    /// Create a PlayerId from a D-Bus bus name
    pub fn from_bus_name(bus_name: &str) -> Self {
        Self(bus_name.to_string())
    }

    /// Get the D-Bus bus name
    pub fn bus_name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current playback status of a media player
///
/// Unrecognized D-Bus values map to `Unknown`; the icon helpers return
/// `None` for it so a renderer keeps whatever it showed last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    /// Player is currently playing
    Playing,

    /// Player is paused
    Paused,

    /// Player is stopped
    Stopped,

    /// Status not reported or not recognized
    #[default]
    Unknown,
}

impl From<&str> for PlaybackStatus {
    fn from(status: &str) -> Self {
        match status {
            "Playing" => Self::Playing,
            "Paused" => Self::Paused,
            "Stopped" => Self::Stopped,
            _ => Self::Unknown,
        }
    }
}

impl PlaybackStatus {
    /// Symbolic icon for the play/pause button in this status.
    ///
    /// `None` means the previous icon should stay in place.
    pub fn icon_name(self) -> Option<&'static str> {
        match self {
            Self::Playing => Some("media-playback-pause-symbolic"),
            Self::Paused | Self::Stopped => Some("media-playback-start-symbolic"),
            Self::Unknown => None,
        }
    }
}

/// Loop status for track or playlist repetition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopStatus {
    /// No looping
    None,

    /// Loop current track
    Track,

    /// Loop entire playlist
    Playlist,

    /// Status not reported or not recognized
    #[default]
    Unknown,
}

impl From<&str> for LoopStatus {
    fn from(status: &str) -> Self {
        match status {
            "None" => Self::None,
            "Track" => Self::Track,
            "Playlist" => Self::Playlist,
            _ => Self::Unknown,
        }
    }
}

impl From<LoopStatus> for &'static str {
    fn from(status: LoopStatus) -> Self {
        match status {
            LoopStatus::Track => "Track",
            LoopStatus::Playlist => "Playlist",
            LoopStatus::None | LoopStatus::Unknown => "None",
        }
    }
}

impl LoopStatus {
    /// Next status in the None → Track → Playlist → None cycle.
    ///
    /// Returns `None` for [`LoopStatus::Unknown`], which makes cycling a
    /// no-op.
    pub fn cycled(self) -> Option<Self> {
        match self {
            Self::None => Some(Self::Track),
            Self::Track => Some(Self::Playlist),
            Self::Playlist => Some(Self::None),
            Self::Unknown => None,
        }
    }

    /// Symbolic icon and active flag for the loop button.
    ///
    /// `None` means the previous icon should stay in place.
    pub fn icon(self) -> Option<(&'static str, bool)> {
        match self {
            Self::None => Some(("media-playlist-repeat-symbolic", false)),
            Self::Track => Some(("media-playlist-repeat-symbolic", true)),
            Self::Playlist => Some(("media-playlist-repeat-song-symbolic", true)),
            Self::Unknown => None,
        }
    }
}

/// Volume tier for picking the speaker icon.
///
/// Tiers use half-open intervals; each boundary value belongs to the tier
/// it opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeLevel {
    /// Below 0.1
    Muted,

    /// 0.1 up to (not including) 0.33
    Low,

    /// 0.33 up to (not including) 0.66
    Medium,

    /// 0.66 and above
    High,
}

impl VolumeLevel {
    /// Classify a raw volume value into its tier.
    pub fn from_volume(volume: f64) -> Self {
        if volume < 0.1 {
            Self::Muted
        } else if volume < 0.33 {
            Self::Low
        } else if volume < 0.66 {
            Self::Medium
        } else {
            Self::High
        }
    }

    /// Symbolic icon for this tier.
    pub fn icon_name(self) -> &'static str {
        match self {
            Self::Muted => "audio-volume-muted-symbolic",
            Self::Low => "audio-volume-low-symbolic",
            Self::Medium => "audio-volume-medium-symbolic",
            Self::High => "audio-volume-high-symbolic",
        }
    }
}

/// Lifecycle phase of a player session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Proxy handshakes are in flight
    AwaitingProxies,

    /// Both proxies are up and property changes are being tracked
    Ready,

    /// The owning bus name went away; the session is permanently dead
    Closed,
}

/// Normalized snapshot of a player's state.
///
/// Recomputed wholesale from the D-Bus properties on every change
/// notification; there is no incremental diffing.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    /// Track artists; never empty
    pub artists: Vec<String>,

    /// Track title
    pub title: String,

    /// Artwork URL; empty string means no artwork
    pub cover_url: String,

    /// Current playback status
    pub playback_status: PlaybackStatus,

    /// Whether shuffle mode is enabled
    pub shuffle: bool,

    /// Current loop status
    pub loop_status: LoopStatus,

    /// Volume as reported by the player, not clamped
    pub volume: f64,

    /// Can skip to next track
    pub can_go_next: bool,

    /// Can go to previous track
    pub can_go_previous: bool,

    /// Can start playback
    pub can_play: bool,

    /// Can pause playback
    pub can_pause: bool,

    /// Can raise the player window
    pub can_raise: bool,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            artists: vec![UNKNOWN_ARTIST.to_string()],
            title: UNKNOWN_TITLE.to_string(),
            cover_url: String::new(),
            playback_status: PlaybackStatus::Unknown,
            shuffle: false,
            loop_status: LoopStatus::Unknown,
            volume: 0.0,
            can_go_next: false,
            can_go_previous: false,
            can_play: false,
            can_pause: false,
            can_raise: false,
        }
    }
}

impl PlayerState {
    /// "Artist, Artist - Title" line for compact panel display.
    pub fn display_line(&self) -> String {
        format!("{} - {}", self.artists.join(", "), self.title)
    }
}

/// Events emitted by the player set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    /// A new player session was created
    PlayerAdded(PlayerId),

    /// A player's normalized state was recomputed
    PlayerUpdated(PlayerId),

    /// A player session closed and was removed from the set
    PlayerRemoved(PlayerId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playback_status_parses_known_values() {
        assert_eq!(PlaybackStatus::from("Playing"), PlaybackStatus::Playing);
        assert_eq!(PlaybackStatus::from("Paused"), PlaybackStatus::Paused);
        assert_eq!(PlaybackStatus::from("Stopped"), PlaybackStatus::Stopped);
        assert_eq!(PlaybackStatus::from("Buffering"), PlaybackStatus::Unknown);
        assert_eq!(PlaybackStatus::from(""), PlaybackStatus::Unknown);
    }

    #[test]
    fn unknown_statuses_have_no_icon() {
        assert_eq!(PlaybackStatus::Unknown.icon_name(), None);
        assert_eq!(LoopStatus::Unknown.icon(), None);
    }

    #[test]
    fn loop_cycle_returns_to_start_after_three_steps() {
        let first = LoopStatus::None.cycled();
        assert_eq!(first, Some(LoopStatus::Track));

        let second = LoopStatus::Track.cycled();
        assert_eq!(second, Some(LoopStatus::Playlist));

        let third = LoopStatus::Playlist.cycled();
        assert_eq!(third, Some(LoopStatus::None));
    }

    #[test]
    fn loop_cycle_is_a_noop_for_unknown() {
        assert_eq!(LoopStatus::Unknown.cycled(), None);
    }

    #[test]
    fn volume_tiers_cover_sample_values() {
        assert_eq!(VolumeLevel::from_volume(0.05), VolumeLevel::Muted);
        assert_eq!(VolumeLevel::from_volume(0.5), VolumeLevel::Medium);
        assert_eq!(VolumeLevel::from_volume(0.9), VolumeLevel::High);
    }

    #[test]
    fn volume_tier_boundaries_belong_to_the_tier_they_open() {
        assert_eq!(VolumeLevel::from_volume(0.1), VolumeLevel::Low);
        assert_eq!(VolumeLevel::from_volume(0.33), VolumeLevel::Medium);
        assert_eq!(VolumeLevel::from_volume(0.66), VolumeLevel::High);
    }

    #[test]
    fn default_state_uses_sentinels() {
        let state = PlayerState::default();
        assert_eq!(state.artists, vec![UNKNOWN_ARTIST.to_string()]);
        assert_eq!(state.title, UNKNOWN_TITLE);
        assert_eq!(state.cover_url, "");
    }
}
