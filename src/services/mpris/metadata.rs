use std::collections::HashMap;

use zbus::zvariant::{Array, OwnedValue};

/// Sentinel shown when a player reports no usable artist list.
pub const UNKNOWN_ARTIST: &str = "Unknown artist";

/// Sentinel shown when a player reports no usable title.
pub const UNKNOWN_TITLE: &str = "Unknown title";

/// Normalized track metadata.
///
/// Players disagree wildly about which metadata fields they fill in and
/// with what types, so every field here is guaranteed usable: the artist
/// list is never empty and the title is always a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackMetadata {
    /// Track artists; falls back to a single "Unknown artist" entry
    pub artists: Vec<String>,

    /// Track title; falls back to "Unknown title"
    pub title: String,

    /// Artwork URL; empty string means no artwork
    pub cover_url: String,
}

impl Default for TrackMetadata {
    fn default() -> Self {
        Self {
            artists: vec![UNKNOWN_ARTIST.to_string()],
            title: UNKNOWN_TITLE.to_string(),
            cover_url: String::new(),
        }
    }
}

impl From<HashMap<String, OwnedValue>> for TrackMetadata {
    fn from(metadata: HashMap<String, OwnedValue>) -> Self {
        let artists = metadata
            .get("xesam:artist")
            .and_then(parse_artists)
            .unwrap_or_else(|| vec![UNKNOWN_ARTIST.to_string()]);

        let title = metadata
            .get("xesam:title")
            .and_then(|value| String::try_from(value.clone()).ok())
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string());

        let cover_url = metadata
            .get("mpris:artUrl")
            .and_then(|value| String::try_from(value.clone()).ok())
            .unwrap_or_default();

        Self {
            artists,
            title,
            cover_url,
        }
    }
}

/// Parse `xesam:artist` as a non-empty array of strings.
///
/// Any non-string element rejects the whole list; callers substitute the
/// sentinel instead of keeping a partial result.
fn parse_artists(value: &OwnedValue) -> Option<Vec<String>> {
    let array = <&Array>::try_from(value).ok()?;

    let mut artists = Vec::with_capacity(array.len());
    for entry in array.iter() {
        if let Ok(artist) = entry.downcast_ref::<String>() {
            artists.push(artist);
        } else if let Ok(artist) = entry.downcast_ref::<&str>() {
            artists.push(artist.to_string());
        } else {
            return None;
        }
    }

    if artists.is_empty() { None } else { Some(artists) }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use zbus::zvariant::Value;

    use super::*;

    fn owned(value: Value<'_>) -> OwnedValue {
        OwnedValue::try_from(value).unwrap()
    }

    fn metadata_with(key: &str, value: Value<'_>) -> HashMap<String, OwnedValue> {
        let mut metadata = HashMap::new();
        metadata.insert(key.to_string(), owned(value));
        metadata
    }

    #[test]
    fn valid_metadata_passes_through() {
        let mut metadata = metadata_with("xesam:artist", Value::from(vec!["Ella", "Louis"]));
        metadata.insert(
            "xesam:title".to_string(),
            owned(Value::from("Summertime")),
        );
        metadata.insert(
            "mpris:artUrl".to_string(),
            owned(Value::from("file:///tmp/cover.png")),
        );

        let track = TrackMetadata::from(metadata);
        assert_eq!(track.artists, vec!["Ella", "Louis"]);
        assert_eq!(track.title, "Summertime");
        assert_eq!(track.cover_url, "file:///tmp/cover.png");
    }

    #[test]
    fn absent_fields_fall_back_to_sentinels() {
        let track = TrackMetadata::from(HashMap::new());
        assert_eq!(track.artists, vec![UNKNOWN_ARTIST.to_string()]);
        assert_eq!(track.title, UNKNOWN_TITLE);
        assert_eq!(track.cover_url, "");
    }

    #[test]
    fn non_array_artist_is_replaced_wholesale() {
        let metadata = metadata_with("xesam:artist", Value::from("just a string"));
        let track = TrackMetadata::from(metadata);
        assert_eq!(track.artists, vec![UNKNOWN_ARTIST.to_string()]);
    }

    #[test]
    fn artist_array_with_non_string_elements_is_replaced_wholesale() {
        let metadata = metadata_with("xesam:artist", Value::from(vec![1_i32, 2, 3]));
        let track = TrackMetadata::from(metadata);
        assert_eq!(track.artists, vec![UNKNOWN_ARTIST.to_string()]);
    }

    #[test]
    fn empty_artist_array_is_replaced_wholesale() {
        let metadata = metadata_with("xesam:artist", Value::from(Vec::<String>::new()));
        let track = TrackMetadata::from(metadata);
        assert_eq!(track.artists, vec![UNKNOWN_ARTIST.to_string()]);
    }

    #[test]
    fn non_string_title_falls_back_to_sentinel() {
        let metadata = metadata_with("xesam:title", Value::from(42_u32));
        let track = TrackMetadata::from(metadata);
        assert_eq!(track.title, UNKNOWN_TITLE);
    }

    #[test]
    fn non_string_art_url_falls_back_to_empty() {
        let metadata = metadata_with("mpris:artUrl", Value::from(false));
        let track = TrackMetadata::from(metadata);
        assert_eq!(track.cover_url, "");
    }
}
