//! Genre labels, classification metadata and the genre color palette.

use serde::{Deserialize, Serialize};

/// Color used for genres the palette does not know.
pub const NEUTRAL_COLOR: [f32; 3] = [0.8, 0.8, 0.8];

/// Genre label as produced by the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Genre {
    Rock,
    Pop,
    Classical,
    HipHop,
    Country,
    Latin,
    EdmDance,
    Jazz,
    Other(String),
}

impl Genre {
    /// Parse a classifier label. Case and separators are ignored, so
    /// `"HipHop"`, `"hiphop"` and `"hip_hop"` are the same genre.
    pub fn parse(label: &str) -> Self {
        let key: String = label
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "rock" => Self::Rock,
            "pop" => Self::Pop,
            "classical" => Self::Classical,
            "hiphop" => Self::HipHop,
            "country" => Self::Country,
            "latin" => Self::Latin,
            "edmdance" | "edm" | "dance" => Self::EdmDance,
            "jazz" => Self::Jazz,
            _ => Self::Other(label.to_string()),
        }
    }

    /// Canonical label, as the classifier spells it.
    pub fn label(&self) -> &str {
        match self {
            Self::Rock => "rock",
            Self::Pop => "pop",
            Self::Classical => "classical",
            Self::HipHop => "hiphop",
            Self::Country => "country",
            Self::Latin => "latin",
            Self::EdmDance => "edm_dance",
            Self::Jazz => "jazz",
            Self::Other(label) => label,
        }
    }

    /// Palette color, or `None` for an unrecognized genre.
    pub fn palette_color(&self) -> Option<[f32; 3]> {
        let hex = match self {
            Self::Rock => 0x0000ff,
            Self::Pop => 0xffff00,
            Self::Classical => 0xffa500,
            Self::HipHop => 0xff00ff,
            Self::Country => 0x00ff00,
            Self::Latin => 0x8a2be2,
            Self::EdmDance => 0x808080,
            Self::Jazz => 0xffc0cb,
            Self::Other(_) => return None,
        };
        Some(hex_to_rgb(hex))
    }

    /// Base color used for terrain blending. Never fails.
    pub fn base_color(&self) -> [f32; 3] {
        self.palette_color().unwrap_or(NEUTRAL_COLOR)
    }
}

impl std::fmt::Display for Genre {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Genre {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Genre {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Self::parse(&label))
    }
}

/// Explicit placement supplied by the enrichment service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialHint {
    pub x: f32,
    pub z: f32,
}

/// Classification metadata attached to one track.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreInfo {
    pub genre: Genre,
    /// Beats per minute.
    pub tempo: f32,
    /// Decibel-like, typically negative.
    pub loudness: f32,
    pub hint: Option<SpatialHint>,
}

impl GenreInfo {
    pub fn new(genre: Genre, tempo: f32, loudness: f32) -> Self {
        Self {
            genre,
            tempo,
            loudness,
            hint: None,
        }
    }

    pub fn with_hint(mut self, x: f32, z: f32) -> Self {
        self.hint = Some(SpatialHint { x, z });
        self
    }
}

/// Convert a 0xRRGGBB color to linear-ish [0, 1] RGB components.
pub fn hex_to_rgb(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}
