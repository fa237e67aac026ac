//! Track catalog loading.
//!
//! The dashboard page embeds the user's saved tracks exactly as the provider
//! returns them (`items[].track`). Only id, name and preview URL are kept.

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// A single track from the user's library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub preview_url: Option<String>,
}

impl Track {
    pub fn new(id: impl Into<String>, name: impl Into<String>, preview_url: Option<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            preview_url,
        }
    }

    /// The preview URL, if present and non-empty.
    pub fn playable_url(&self) -> Option<&str> {
        self.preview_url.as_deref().filter(|url| !url.is_empty())
    }

    pub fn is_playable(&self) -> bool {
        self.playable_url().is_some()
    }
}

#[derive(Deserialize)]
struct SavedTrackItem {
    track: Track,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogPayload {
    /// `{ "items": [{ "track": {...} }] }`, the raw saved-tracks page.
    Page { items: Vec<SavedTrackItem> },
    /// `[{ "track": {...} }]`, the items array on its own.
    Items(Vec<SavedTrackItem>),
    /// `[{ "id": .., "name": .., "preview_url": .. }]`
    Tracks(Vec<Track>),
}

/// The ordered list of tracks handed to the visualization.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tracks: Vec<Track>,
}

impl Catalog {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    /// Parse a saved-tracks payload. Accepts the full page, the bare items
    /// array, or a flat array of tracks.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let payload: CatalogPayload = serde_json::from_str(json)?;
        let tracks = match payload {
            CatalogPayload::Page { items } | CatalogPayload::Items(items) => {
                items.into_iter().map(|item| item.track).collect()
            }
            CatalogPayload::Tracks(tracks) => tracks,
        };
        log::info!("Loaded catalog with {} tracks", tracks.len());
        Ok(Self { tracks })
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_file(path: &std::path::Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Tracks that have a preview URL, in catalog order.
    pub fn playable(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter().filter(|t| t.is_playable())
    }

    /// Deduplicated, non-empty preview URLs in first-seen order.
    pub fn preview_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = Vec::new();
        for url in self.tracks.iter().filter_map(Track::playable_url) {
            if !urls.iter().any(|u| u == url) {
                urls.push(url.to_string());
            }
        }
        urls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_saved_tracks_page() {
        let json = r#"{
            "href": "https://api.example.com/v1/me/tracks",
            "items": [
                { "added_at": "2024-01-01T00:00:00Z", "track": { "id": "a", "name": "Song A", "preview_url": "https://p/a" } },
                { "track": { "id": "b", "name": "Song B", "preview_url": null } }
            ]
        }"#;
        let catalog = Catalog::from_json(json).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.tracks()[0].playable_url(), Some("https://p/a"));
        assert!(!catalog.tracks()[1].is_playable());
    }

    #[test]
    fn test_parse_flat_track_array() {
        let json = r#"[{ "id": "x", "name": "X" }]"#;
        let catalog = Catalog::from_json(json).unwrap();
        assert_eq!(catalog.tracks()[0].name, "X");
        assert_eq!(catalog.tracks()[0].preview_url, None);
    }

    #[test]
    fn test_empty_preview_url_is_not_playable() {
        let track = Track::new("1", "Empty", Some(String::new()));
        assert!(!track.is_playable());
    }

    #[test]
    fn test_preview_urls_are_deduplicated_in_order() {
        let catalog = Catalog::new(vec![
            Track::new("1", "One", Some("u1".into())),
            Track::new("2", "Two", None),
            Track::new("3", "Three", Some("u2".into())),
            Track::new("4", "One again", Some("u1".into())),
        ]);
        assert_eq!(catalog.preview_urls(), vec!["u1".to_string(), "u2".to_string()]);
        assert_eq!(catalog.playable().count(), 3);
    }

    #[test]
    fn test_malformed_payload() {
        assert!(Catalog::from_json("{ not json").is_err());
    }
}
