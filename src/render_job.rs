//! Offline render job specification and metadata.
//!
//! A job names the inputs of one headless render (saved-tracks catalog plus
//! either a genre records file or a live classifier endpoint) and the frame
//! sequence to produce. Metadata is written next to the frames.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

fn default_frames() -> usize {
    120
}

fn default_fps() -> f32 {
    60.0
}

fn default_width() -> u32 {
    1280
}

fn default_height() -> u32 {
    720
}

/// Everything needed to render a planetarium deterministically.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderJobSpec {
    /// Saved-tracks payload (JSON).
    pub catalog_path: PathBuf,

    /// Pre-classified genre records (JSON array), used instead of an endpoint.
    #[serde(default)]
    pub genres_path: Option<PathBuf>,

    /// Classifier endpoint queried for genre records.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Output directory for frames and metadata.
    pub output_dir: PathBuf,

    #[serde(default = "default_frames")]
    pub frames: usize,

    #[serde(default = "default_fps")]
    pub fps: f32,

    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    /// Name of a track to select before rendering.
    #[serde(default)]
    pub select: Option<String>,

    /// Optional planetarium config overrides.
    #[serde(default)]
    pub config_path: Option<PathBuf>,
}

impl RenderJobSpec {
    pub fn new(catalog_path: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            catalog_path,
            genres_path: None,
            endpoint: None,
            output_dir,
            frames: default_frames(),
            fps: default_fps(),
            width: default_width(),
            height: default_height(),
            select: None,
            config_path: None,
        }
    }

    /// Validate the job specification.
    pub fn validate(&self) -> Result<(), String> {
        if !self.catalog_path.exists() {
            return Err(format!("Catalog file not found: {:?}", self.catalog_path));
        }
        match (&self.genres_path, &self.endpoint) {
            (None, None) => return Err("Either a genres file or an endpoint is required".to_string()),
            (Some(_), Some(_)) => return Err("Genres file and endpoint are mutually exclusive".to_string()),
            (Some(path), None) if !path.exists() => {
                return Err(format!("Genres file not found: {:?}", path));
            }
            _ => {}
        }
        if let Some(path) = &self.config_path {
            if !path.exists() {
                return Err(format!("Config file not found: {:?}", path));
            }
        }
        if self.fps <= 0.0 || !self.fps.is_finite() {
            return Err("FPS must be positive".to_string());
        }
        if self.width == 0 || self.height == 0 {
            return Err("Width and height must be positive".to_string());
        }
        Ok(())
    }

    pub fn frame_path(&self, index: usize) -> PathBuf {
        self.output_dir.join(format!("frame_{:05}.png", index))
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.output_dir.join("metadata.json")
    }
}

/// Metadata for a completed render.
/// Written as metadata.json alongside rendered frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderMetadata {
    pub job: RenderJobSpec,

    /// Timestamp when render started (ISO 8601).
    pub started_at: DateTime<Utc>,

    /// Timestamp when render completed (ISO 8601).
    pub completed_at: DateTime<Utc>,

    pub render_duration_secs: f64,

    pub frame_count: usize,

    /// Average rendering FPS (frames / render_duration).
    pub average_render_fps: f64,

    /// SHA-256 of the catalog file.
    pub catalog_hash: String,

    /// SHA-256 of the genres file, when one was used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genres_hash: Option<String>,

    pub body_count: usize,

    pub planetarium_version: String,

    pub gpu_adapter: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl RenderMetadata {
    /// Compute SHA-256 hash of file content.
    pub fn hash_file(path: &Path) -> Result<String, std::io::Error> {
        use std::io::Read;

        let mut file = std::fs::File::open(path)?;
        let mut hasher = Sha256::new();
        let mut buffer = [0u8; 8192];

        loop {
            let bytes_read = file.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(format!("{:x}", hasher.finalize()))
    }

    pub fn save(&self, path: &Path) -> Result<(), String> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize metadata: {}", e))?;
        std::fs::write(path, json).map_err(|e| format!("Failed to write metadata: {}", e))
    }
}

/// Render phase for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPhase {
    Validation,
    InputLoading,
    Enrichment,
    GpuSetup,
    FrameRender,
    FrameSave,
    MetadataSave,
}

impl std::fmt::Display for RenderPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderPhase::Validation => write!(f, "Validation"),
            RenderPhase::InputLoading => write!(f, "Input Loading"),
            RenderPhase::Enrichment => write!(f, "Enrichment"),
            RenderPhase::GpuSetup => write!(f, "GPU Setup"),
            RenderPhase::FrameRender => write!(f, "Frame Render"),
            RenderPhase::FrameSave => write!(f, "Frame Save"),
            RenderPhase::MetadataSave => write!(f, "Metadata Save"),
        }
    }
}

/// Structured error for render failures.
#[derive(Debug)]
pub struct RenderError {
    pub phase: RenderPhase,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.phase, self.message)?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl RenderError {
    pub fn new(phase: RenderPhase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        phase: RenderPhase,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            phase,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Progress information for render logging.
#[derive(Debug, Clone)]
pub struct RenderProgress {
    /// Current frame number (1-indexed).
    pub current_frame: usize,
    pub total_frames: usize,
    pub elapsed_secs: f64,
}

impl RenderProgress {
    /// Get progress as a percentage (0.0 to 100.0).
    pub fn percentage(&self) -> f64 {
        if self.total_frames == 0 {
            100.0
        } else {
            (self.current_frame as f64 / self.total_frames as f64) * 100.0
        }
    }

    /// Estimated seconds remaining, from the average pace so far.
    pub fn eta_secs(&self) -> Option<f64> {
        if self.current_frame == 0 {
            return None;
        }
        let per_frame = self.elapsed_secs / self.current_frame as f64;
        Some(per_frame * self.total_frames.saturating_sub(self.current_frame) as f64)
    }
}
