//! Tunables for the planetarium.
//!
//! Every field has a default, and a JSON config file only needs to name the
//! values it overrides:
//!
//! ```json
//! { "placement": { "strategy": "explicit_coordinates" }, "seed": 7 }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How body positions are derived from enrichment data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementStrategy {
    /// Loudness maps onto orbital distance, random angle.
    #[default]
    DistanceByLoudness,
    /// Use the (x, z) hint from the enrichment response.
    ExplicitCoordinates,
}

/// How the enrichment client talks to the classifier endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestMode {
    /// One request carrying every preview URL.
    #[default]
    Batched,
    /// One request per preview URL, sequential.
    PerTrack,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanetariumConfig {
    pub placement: PlacementConfig,
    pub terrain: TerrainConfig,
    pub selection: SelectionConfig,
    pub camera: CameraSettings,
    pub ambient: AmbientConfig,
    pub enrichment: EnrichmentConfig,
    /// Seed for placement angles and ambient layout.
    pub seed: u64,
}

impl Default for PlanetariumConfig {
    fn default() -> Self {
        Self {
            placement: PlacementConfig::default(),
            terrain: TerrainConfig::default(),
            selection: SelectionConfig::default(),
            camera: CameraSettings::default(),
            ambient: AmbientConfig::default(),
            enrichment: EnrichmentConfig::default(),
            seed: 0x5eed,
        }
    }
}

impl PlanetariumConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    pub strategy: PlacementStrategy,
    /// Loudness range (dB) mapped onto the distance range.
    pub min_db: f32,
    pub max_db: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// All bodies sit on this plane.
    pub plane_y: f32,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            strategy: PlacementStrategy::DistanceByLoudness,
            min_db: -60.0,
            max_db: 0.0,
            min_distance: 200.0,
            max_distance: 600.0,
            plane_y: 0.0,
        }
    }
}

impl PlacementConfig {
    /// Loudness normalized into [0, 1] over the configured dB range.
    pub fn normalized_loudness(&self, loudness: f32) -> f32 {
        let span = self.max_db - self.min_db;
        if span.abs() < f32::EPSILON {
            return 0.0;
        }
        ((loudness - self.min_db) / span).clamp(0.0, 1.0)
    }

    /// Orbital distance for a loudness value.
    pub fn distance_for(&self, loudness: f32) -> f32 {
        let t = self.normalized_loudness(loudness);
        self.min_distance + (self.max_distance - self.min_distance) * t
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    pub radius: f32,
    pub lat_segments: u32,
    pub lon_segments: u32,
    pub noise_scale: f32,
    /// Extra factor on the y noise coordinate (flattens bands).
    pub y_noise_factor: f32,
    /// Exponent on |noise|, > 1 sharpens peaks.
    pub exponent: f32,
    pub displacement_scale: f32,
    pub sea_level: f32,
    pub land_band: f32,
    pub mountain_band: f32,
    /// Fraction of the genre color mixed into every tier.
    pub genre_blend: f32,
    pub sea_color: u32,
    pub land_color: u32,
    pub mountain_color: u32,
    pub label_offset: f32,
    pub label_size: [f32; 2],
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            radius: 12.0,
            lat_segments: 64,
            lon_segments: 64,
            noise_scale: 0.2,
            y_noise_factor: 0.5,
            exponent: 1.5,
            displacement_scale: 0.15,
            sea_level: 0.05,
            land_band: 0.05,
            mountain_band: 0.1,
            genre_blend: 0.3,
            sea_color: 0x0077be,
            land_color: 0x228b22,
            mountain_color: 0x8b4513,
            label_offset: 2.0,
            label_size: [10.0, 5.0],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub primary_neighbors: usize,
    pub secondary_neighbors: usize,
    pub camera_tween_secs: f32,
    pub scale_tween_secs: f32,
    pub min_scale: f32,
    pub max_scale: f32,
    /// Extra scale per unit of instantaneous amplitude while playing.
    pub pulse_gain: f32,
    /// Window (seconds) for the amplitude peak lookup.
    pub pulse_window_secs: f32,
    /// Camera offset from the selected body; x and z follow the body's sign.
    pub framing_offset: [f32; 3],
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            primary_neighbors: 5,
            secondary_neighbors: 1,
            camera_tween_secs: 1.5,
            scale_tween_secs: 0.5,
            min_scale: 1.0,
            max_scale: 1.5,
            pulse_gain: 0.2,
            pulse_window_secs: 0.1,
            framing_offset: [50.0, 200.0, 150.0],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Starting position before the intro zoom.
    pub start_position: [f32; 3],
    /// Where the intro zoom ends.
    pub intro_position: [f32; 3],
    pub intro_secs: f32,
    /// Decorative orbit around the origin, radians per second.
    pub orbit_rate: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Fraction of residual velocity kept per frame (60 fps reference).
    pub damping: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov: 75.0,
            near: 0.1,
            far: 5000.0,
            start_position: [0.0, 0.0, 1000.0],
            intro_position: [0.0, 100.0, 200.0],
            intro_secs: 3.0,
            // 0.0005 rad per frame at 60 fps
            orbit_rate: 0.03,
            min_distance: 60.0,
            max_distance: 1000.0,
            damping: 0.95,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbientConfig {
    pub star_count: usize,
    pub star_min_radius: f32,
    pub star_max_radius: f32,
    /// Vertical squash of the star shell.
    pub star_y_scale: f32,
    pub nebula_layers: usize,
    pub nebula_radius: f32,
    /// Radians per second.
    pub nebula_rotation_rate: f32,
    pub shooting_stars: usize,
    pub shooting_star_extent: f32,
    pub sun_radius: f32,
    pub orbit_rings: Vec<f32>,
    /// Flashing edge time advance per second.
    pub edge_flash_rate: f32,
}

impl Default for AmbientConfig {
    fn default() -> Self {
        Self {
            star_count: 2000,
            star_min_radius: 700.0,
            star_max_radius: 3000.0,
            star_y_scale: 0.25,
            nebula_layers: 10,
            nebula_radius: 2000.0,
            nebula_rotation_rate: 0.006,
            shooting_stars: 50,
            shooting_star_extent: 4000.0,
            sun_radius: 23.0,
            orbit_rings: vec![200.0, 400.0, 600.0],
            edge_flash_rate: 0.6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Classifier endpoint, relative to the page origin in the browser.
    pub endpoint: String,
    pub mode: RequestMode,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            endpoint: "/getGenre".to_string(),
            mode: RequestMode::Batched,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = PlanetariumConfig::from_json(
            r#"{ "placement": { "strategy": "explicit_coordinates" }, "seed": 7 }"#,
        )
        .unwrap();
        assert_eq!(config.placement.strategy, PlacementStrategy::ExplicitCoordinates);
        assert_eq!(config.placement.min_db, -60.0);
        assert_eq!(config.seed, 7);
        assert_eq!(config.selection.primary_neighbors, 5);
        assert_eq!(config.enrichment.mode, RequestMode::Batched);
    }

    #[test]
    fn test_distance_mapping_is_linear_and_clamped() {
        let placement = PlacementConfig::default();
        assert_eq!(placement.distance_for(-60.0), 200.0);
        assert_eq!(placement.distance_for(0.0), 600.0);
        assert_eq!(placement.distance_for(-30.0), 400.0);
        assert_eq!(placement.distance_for(-120.0), 200.0);
        assert_eq!(placement.distance_for(12.0), 600.0);
    }

    #[test]
    fn test_degenerate_db_range() {
        let placement = PlacementConfig {
            min_db: -10.0,
            max_db: -10.0,
            ..Default::default()
        };
        assert_eq!(placement.normalized_loudness(-3.0), 0.0);
    }

    #[test]
    fn test_invalid_json() {
        assert!(PlanetariumConfig::from_json("[1, 2]").is_err());
    }
}
