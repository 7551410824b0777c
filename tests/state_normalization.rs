//! Integration tests for metadata normalization and status mapping.

#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::collections::HashMap;

use zbus::zvariant::{OwnedValue, Value};

use mediabar::{
    LoopStatus, PlaybackStatus, PlayerState, TrackMetadata, VolumeLevel,
};

fn owned(value: Value<'_>) -> OwnedValue {
    OwnedValue::try_from(value).unwrap()
}

mod metadata_normalization {
    use super::*;

    #[test]
    fn well_formed_metadata_is_kept() {
        let mut metadata = HashMap::new();
        metadata.insert(
            "xesam:artist".to_string(),
            owned(Value::from(vec!["Miles Davis"])),
        );
        metadata.insert("xesam:title".to_string(), owned(Value::from("So What")));
        metadata.insert(
            "mpris:artUrl".to_string(),
            owned(Value::from("https://example.org/kind-of-blue.jpg")),
        );

        let track = TrackMetadata::from(metadata);
        assert_eq!(track.artists, vec!["Miles Davis"]);
        assert_eq!(track.title, "So What");
        assert_eq!(track.cover_url, "https://example.org/kind-of-blue.jpg");
    }

    #[test]
    fn malformed_artists_become_the_sentinel() {
        for value in [
            Value::from("not an array"),
            Value::from(vec![7_u32, 8]),
            Value::from(Vec::<String>::new()),
            Value::from(1.5_f64),
        ] {
            let mut metadata = HashMap::new();
            metadata.insert("xesam:artist".to_string(), owned(value));

            let track = TrackMetadata::from(metadata);
            assert_eq!(track.artists, vec!["Unknown artist".to_string()]);
        }
    }

    #[test]
    fn missing_everything_yields_sentinels() {
        let track = TrackMetadata::from(HashMap::new());
        assert_eq!(track.artists, vec!["Unknown artist".to_string()]);
        assert_eq!(track.title, "Unknown title");
        assert_eq!(track.cover_url, "");
    }

    #[test]
    fn non_string_title_becomes_the_sentinel() {
        let mut metadata = HashMap::new();
        metadata.insert("xesam:title".to_string(), owned(Value::from(123_i64)));

        let track = TrackMetadata::from(metadata);
        assert_eq!(track.title, "Unknown title");
    }
}

mod status_mapping {
    use super::*;

    #[test]
    fn loop_status_cycles_none_track_playlist_none() {
        let mut status = LoopStatus::None;
        let mut visited = Vec::new();

        for _ in 0..3 {
            status = status.cycled().unwrap();
            visited.push(status);
        }

        assert_eq!(
            visited,
            vec![LoopStatus::Track, LoopStatus::Playlist, LoopStatus::None]
        );
    }

    #[test]
    fn unrecognized_statuses_leave_icons_unchanged() {
        assert_eq!(PlaybackStatus::from("Loading").icon_name(), None);
        assert_eq!(LoopStatus::from("Shuffle").icon(), None);
    }

    #[test]
    fn default_state_reports_unknowns() {
        let state = PlayerState::default();
        assert_eq!(state.playback_status, PlaybackStatus::Unknown);
        assert_eq!(state.loop_status, LoopStatus::Unknown);
        assert_eq!(state.display_line(), "Unknown artist - Unknown title");
    }

    #[test]
    fn volume_icon_tiers_use_half_open_intervals() {
        let tiers = [
            (0.0, VolumeLevel::Muted),
            (0.05, VolumeLevel::Muted),
            (0.1, VolumeLevel::Low),
            (0.32, VolumeLevel::Low),
            (0.33, VolumeLevel::Medium),
            (0.5, VolumeLevel::Medium),
            (0.66, VolumeLevel::High),
            (0.9, VolumeLevel::High),
            (1.2, VolumeLevel::High),
        ];

        for (volume, expected) in tiers {
            assert_eq!(VolumeLevel::from_volume(volume), expected, "volume {volume}");
        }
    }
}
