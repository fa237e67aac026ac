use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};

use crate::builder::build_scene;
use crate::catalog::Catalog;
use crate::config::PlanetariumConfig;
use crate::context::SceneContext;
use crate::enrichment::{match_records, parse_body, EnrichedTrack, EnrichmentClient};
use crate::gpu::renderer::Renderer;
use crate::interaction;
use crate::playback::CommandQueue;
use crate::render_job::{RenderError, RenderJobSpec, RenderMetadata, RenderPhase, RenderProgress};
use crate::server::{self, ClassifierConfig, ServerConfig};
use crate::visualiser;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web server (OAuth proxy, dashboard, classifier bridge)
    Serve {
        #[arg(long, env = "PLANETARIUM_HOST", default_value = "127.0.0.1")]
        host: String,

        #[arg(long, env = "PLANETARIUM_PORT", default_value_t = 3000)]
        port: u16,

        /// Directory of static page assets
        #[arg(long, env = "PLANETARIUM_PUBLIC_DIR", default_value = "public")]
        public_dir: PathBuf,

        #[arg(long, env = "PLANETARIUM_CLIENT_ID", default_value = "")]
        client_id: String,

        #[arg(long, env = "PLANETARIUM_CLIENT_SECRET", default_value = "", hide_env_values = true)]
        client_secret: String,

        /// Redirect URI registered with the provider
        #[arg(long, env = "PLANETARIUM_REDIRECT_URI")]
        redirect_uri: Option<String>,

        /// Interpreter that runs the classifier script
        #[arg(long, env = "PLANETARIUM_INTERPRETER", default_value = "python3")]
        interpreter: PathBuf,

        /// Genre classifier script, invoked as `<interpreter> <script> <url>`
        #[arg(long, env = "PLANETARIUM_CLASSIFIER", default_value = "getGenre.py")]
        classifier: PathBuf,
    },

    /// Render frames to disk
    Render {
        /// Saved-tracks JSON payload
        #[arg(long)]
        catalog: PathBuf,

        /// Pre-classified genre records (JSON array)
        #[arg(long, conflicts_with = "endpoint")]
        genres: Option<PathBuf>,

        /// Classifier endpoint to query instead of a genres file
        #[arg(long)]
        endpoint: Option<String>,

        /// Output directory for frames
        #[arg(long)]
        out: PathBuf,

        /// Number of frames to render
        #[arg(long, default_value_t = 120)]
        frames: usize,

        /// Frames per second
        #[arg(long, default_value_t = 60.0)]
        fps: f32,

        /// Output width
        #[arg(long, default_value_t = 1280)]
        width: u32,

        /// Output height
        #[arg(long, default_value_t = 720)]
        height: u32,

        /// Select the track with this name before rendering
        #[arg(long)]
        select: Option<String>,

        /// Planetarium config overrides (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            public_dir,
            client_id,
            client_secret,
            redirect_uri,
            interpreter,
            classifier,
        } => {
            let config = ServerConfig {
                redirect_uri: redirect_uri.unwrap_or_else(|| format!("http://localhost:{}/callback", port)),
                host,
                port,
                public_dir,
                client_id,
                client_secret,
                classifier: ClassifierConfig {
                    interpreter,
                    script: classifier,
                },
                ..Default::default()
            };
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(server::run_server(config))?;
        }
        Commands::Render {
            catalog,
            genres,
            endpoint,
            out,
            frames,
            fps,
            width,
            height,
            select,
            config,
        } => {
            let job = RenderJobSpec {
                catalog_path: catalog,
                genres_path: genres,
                endpoint,
                output_dir: out,
                frames,
                fps,
                width,
                height,
                select,
                config_path: config,
            };
            let metadata = pollster::block_on(render_offline(job))?;
            println!(
                "Rendered {} frames with {} bodies in {:.1}s",
                metadata.frame_count, metadata.body_count, metadata.render_duration_secs
            );
        }
    }
    Ok(())
}

fn load_config(job: &RenderJobSpec) -> Result<PlanetariumConfig, RenderError> {
    match &job.config_path {
        Some(path) => PlanetariumConfig::from_file(path)
            .map_err(|e| RenderError::with_source(RenderPhase::InputLoading, "Failed to load config", e)),
        None => Ok(PlanetariumConfig::default()),
    }
}

/// Enriched tracks from the genres file or the classifier endpoint.
fn load_enriched(
    job: &RenderJobSpec,
    config: &PlanetariumConfig,
    catalog: &Catalog,
) -> Result<Vec<EnrichedTrack>, RenderError> {
    if let Some(path) = &job.genres_path {
        let body = std::fs::read_to_string(path)
            .map_err(|e| RenderError::with_source(RenderPhase::InputLoading, "Failed to read genres file", e))?;
        let records = parse_body(&body, &catalog.preview_urls())
            .map_err(|e| RenderError::with_source(RenderPhase::InputLoading, "Invalid genres file", e))?;
        return Ok(match_records(catalog.tracks(), &records));
    }

    let endpoint = job
        .endpoint
        .as_deref()
        .ok_or_else(|| RenderError::new(RenderPhase::Enrichment, "No enrichment source"))?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| RenderError::with_source(RenderPhase::Enrichment, "Failed to start runtime", e))?;
    Ok(runtime.block_on(async {
        let client = EnrichmentClient::new(&config.enrichment).with_endpoint(endpoint);
        client.enrich(catalog).await
    }))
}

async fn render_offline(job: RenderJobSpec) -> Result<RenderMetadata, RenderError> {
    job.validate().map_err(|e| RenderError::new(RenderPhase::Validation, e))?;
    let started_at = Utc::now();
    let start = Instant::now();

    // === Scene ===

    let config = load_config(&job)?;
    let catalog = Catalog::from_file(&job.catalog_path)
        .map_err(|e| RenderError::with_source(RenderPhase::InputLoading, "Failed to load catalog", e))?;
    let enriched = load_enriched(&job, &config, &catalog)?;

    let mut ctx = SceneContext::new(config);
    let bodies = build_scene(&mut ctx, &enriched);

    let mut warnings = Vec::new();
    let mut player = CommandQueue::new();
    if let Some(name) = &job.select {
        match ctx.bodies.find_by_name(name) {
            Some(id) => {
                interaction::select(&mut ctx, id, &mut player);
                interaction::on_player_ready(&mut ctx, &mut player);
            }
            None => {
                log::warn!("No body named '{}', rendering without a selection", name);
                warnings.push(format!("track '{}' not found", name));
            }
        }
    }

    // === GPU Setup ===

    let (width, height) = (job.width, job.height);
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None, // Headless
            force_fallback_adapter: false,
        })
        .await
        .ok_or_else(|| RenderError::new(RenderPhase::GpuSetup, "No adapter found"))?;
    let adapter_name = adapter.get_info().name;

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor::default(), None)
        .await
        .map_err(|e| RenderError::with_source(RenderPhase::GpuSetup, "Failed to create device", e))?;

    let texture_desc = wgpu::TextureDescriptor {
        label: Some("Target Texture"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    };
    let texture = device.create_texture(&texture_desc);
    let texture_view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    // Buffer for reading back data
    let unpadded_bytes_per_row = 4 * width;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;
    let output_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Output Buffer"),
        size: (padded_bytes_per_row * height) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut renderer = Renderer::new(device, queue, texture_desc.format, width, height);

    std::fs::create_dir_all(&job.output_dir)
        .map_err(|e| RenderError::with_source(RenderPhase::FrameSave, "Failed to create output directory", e))?;
    log::info!("Rendering {} frames to {:?} on {}", job.frames, job.output_dir, adapter_name);

    // === Frames ===

    let dt = 1.0 / job.fps;
    for i in 0..job.frames {
        visualiser::tick(&mut ctx, dt);
        renderer.render(&texture_view, &ctx);

        let mut encoder = renderer
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &output_buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            texture_desc.size,
        );
        renderer.queue().submit(Some(encoder.finish()));

        let buffer_slice = output_buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        renderer.device().poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|e| RenderError::with_source(RenderPhase::FrameRender, "Readback channel closed", e))?
            .map_err(|e| RenderError::with_source(RenderPhase::FrameRender, "Failed to map output buffer", e))?;

        let pixels = {
            let data = buffer_slice.get_mapped_range();
            let mut unpadded = Vec::with_capacity((unpadded_bytes_per_row * height) as usize);
            for row in 0..height {
                let start = (row * padded_bytes_per_row) as usize;
                unpadded.extend_from_slice(&data[start..start + unpadded_bytes_per_row as usize]);
            }
            unpadded
        };
        output_buffer.unmap();

        image::save_buffer(job.frame_path(i), &pixels, width, height, image::ColorType::Rgba8)
            .map_err(|e| RenderError::with_source(RenderPhase::FrameSave, format!("Failed to save frame {}", i), e))?;

        if (i + 1) % 60 == 0 || i + 1 == job.frames {
            let progress = RenderProgress {
                current_frame: i + 1,
                total_frames: job.frames,
                elapsed_secs: start.elapsed().as_secs_f64(),
            };
            log::info!(
                "Frame {}/{} ({:.0}%, eta {:.1}s)",
                progress.current_frame,
                progress.total_frames,
                progress.percentage(),
                progress.eta_secs().unwrap_or(0.0)
            );
        }
    }

    // === Metadata ===

    let render_duration_secs = start.elapsed().as_secs_f64();
    let catalog_hash = RenderMetadata::hash_file(&job.catalog_path)
        .map_err(|e| RenderError::with_source(RenderPhase::MetadataSave, "Failed to hash catalog", e))?;
    let genres_hash = match &job.genres_path {
        Some(path) => Some(
            RenderMetadata::hash_file(path)
                .map_err(|e| RenderError::with_source(RenderPhase::MetadataSave, "Failed to hash genres", e))?,
        ),
        None => None,
    };
    if bodies.is_empty() {
        warnings.push("no celestial bodies were built".to_string());
    }

    let metadata = RenderMetadata {
        started_at,
        completed_at: Utc::now(),
        render_duration_secs,
        frame_count: job.frames,
        average_render_fps: if render_duration_secs > 0.0 {
            job.frames as f64 / render_duration_secs
        } else {
            0.0
        },
        catalog_hash,
        genres_hash,
        body_count: bodies.len(),
        planetarium_version: env!("CARGO_PKG_VERSION").to_string(),
        gpu_adapter: adapter_name,
        warnings,
        job,
    };
    metadata
        .save(&metadata.job.metadata_path())
        .map_err(|e| RenderError::new(RenderPhase::MetadataSave, e))?;
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_render_rejects_genres_with_endpoint() {
        let result = Cli::try_parse_from([
            "planetarium",
            "render",
            "--catalog",
            "tracks.json",
            "--genres",
            "genres.json",
            "--endpoint",
            "http://localhost:3000/getGenre",
            "--out",
            "frames",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_enriched_from_genres_file() {
        let dir = tempfile::tempdir().unwrap();
        let catalog_path = dir.path().join("tracks.json");
        let genres_path = dir.path().join("genres.json");
        std::fs::write(
            &catalog_path,
            r#"[{"id":"1","name":"A","preview_url":"u1"},{"id":"2","name":"B","preview_url":null}]"#,
        )
        .unwrap();
        std::fs::write(&genres_path, r#"[{"url":"u1","genre":"rock","tempo":120,"loudness":-8}]"#).unwrap();

        let mut job = RenderJobSpec::new(catalog_path.clone(), dir.path().join("out"));
        job.genres_path = Some(genres_path);
        let catalog = Catalog::from_file(&catalog_path).unwrap();
        let enriched = load_enriched(&job, &PlanetariumConfig::default(), &catalog).unwrap();

        assert_eq!(enriched.len(), 1);
        assert_eq!(enriched[0].track.name, "A");
        assert_eq!(enriched[0].info.loudness, -8.0);
    }
}
