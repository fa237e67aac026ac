use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use serde::Serialize;
use wasm_bindgen::prelude::*;
use web_sys::HtmlCanvasElement;

use crate::builder::build_scene;
use crate::catalog::Catalog;
use crate::config::PlanetariumConfig;
use crate::context::SceneContext;
use crate::enrichment::EnrichmentClient;
use crate::gpu::renderer::Renderer;
use crate::interaction;
use crate::playback::{AmplitudeEnvelope, CommandQueue};
use crate::visualiser;

#[wasm_bindgen]
pub struct WasmPlanetarium {
    inner: Rc<RefCell<PlanetariumHost>>,
}

struct PlanetariumHost {
    renderer: Renderer,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    scene: SceneContext,
    player: CommandQueue,
}

#[wasm_bindgen]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        log::error!("Failed to serialize: {}", e);
        "null".to_string()
    })
}

/// Relative endpoints are resolved against the page origin.
fn resolve_endpoint(endpoint: &str) -> String {
    if !endpoint.starts_with('/') {
        return endpoint.to_string();
    }
    let origin = web_sys::window()
        .and_then(|w| w.location().origin().ok())
        .unwrap_or_default();
    format!("{}{}", origin, endpoint)
}

#[wasm_bindgen]
impl WasmPlanetarium {
    pub fn resize(&self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        let mut inner = self.inner.borrow_mut();
        let host = &mut *inner;

        host.renderer.resize(width, height);
        host.config.width = width;
        host.config.height = height;

        host.surface.configure(host.renderer.device(), &host.config);
    }

    /// Advance the scene by `dt` seconds and draw a frame.
    pub fn render(&self, dt: f32) {
        let mut inner = self.inner.borrow_mut();
        let host = &mut *inner;

        visualiser::tick(&mut host.scene, dt);

        match host.surface.get_current_texture() {
            Ok(output) => {
                let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());
                host.renderer.render(&view, &host.scene);
                output.present();
            }
            Err(wgpu::SurfaceError::Lost) => {
                host.renderer.resize(host.config.width, host.config.height);
                host.surface.configure(host.renderer.device(), &host.config);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Surface out of memory");
            }
            Err(e) => {
                log::warn!("Surface error: {:?}", e);
            }
        }
    }

    /// Pointer click in normalized device coordinates (x right, y up).
    /// Returns the index of the body hit, if any.
    pub fn click(&self, x: f32, y: f32) -> Option<u32> {
        let mut inner = self.inner.borrow_mut();
        let host = &mut *inner;
        let ray = host.scene.rig.camera.screen_ray(Vec2::new(x, y), host.renderer.aspect());
        interaction::click(&mut host.scene, &ray, &mut host.player).map(|id| id.index() as u32)
    }

    /// Orbit the camera, in radians.
    pub fn rotate(&self, azimuth: f32, polar: f32) {
        self.inner.borrow_mut().scene.rig.controls.rotate(azimuth, polar);
    }

    pub fn zoom(&self, amount: f32) {
        self.inner.borrow_mut().scene.rig.controls.zoom(amount);
    }

    /// Select the `index`-th neighbor listed in the side panel.
    pub fn select_neighbor(&self, index: usize) -> bool {
        let mut inner = self.inner.borrow_mut();
        let host = &mut *inner;
        interaction::select_neighbor(&mut host.scene, index, &mut host.player)
    }

    pub fn player_ready(&self) {
        let mut inner = self.inner.borrow_mut();
        let host = &mut *inner;
        interaction::on_player_ready(&mut host.scene, &mut host.player);
    }

    pub fn audio_progress(&self, time: f32) {
        interaction::on_audio_progress(&mut self.inner.borrow_mut().scene, time);
    }

    /// Amplitude samples of the current clip, as decoded by the page.
    pub fn set_envelope(&self, samples: Vec<f32>, sample_rate: f32) {
        let envelope = AmplitudeEnvelope::new(samples, sample_rate);
        interaction::set_envelope(&mut self.inner.borrow_mut().scene, envelope);
    }

    pub fn toggle_playback(&self) {
        let mut inner = self.inner.borrow_mut();
        let host = &mut *inner;
        interaction::toggle_playback(&mut host.scene, &mut host.player);
    }

    pub fn seek(&self, fraction: f32) {
        let mut inner = self.inner.borrow_mut();
        let host = &mut *inner;
        interaction::seek(&mut host.scene, fraction, &mut host.player);
    }

    /// Player commands issued since the last call, as a JSON array.
    pub fn drain_commands(&self) -> String {
        to_json(&self.inner.borrow_mut().player.drain())
    }

    /// Screen placements of body labels for the page to draw, as JSON.
    pub fn labels(&self) -> String {
        let inner = self.inner.borrow();
        to_json(&visualiser::label_placements(&inner.scene, inner.renderer.aspect()))
    }

    /// Side panel model (selected song and neighbors), or `null`.
    pub fn panel(&self) -> String {
        to_json(&self.inner.borrow().scene.selection.panel)
    }

    pub fn body_count(&self) -> usize {
        self.inner.borrow().scene.bodies.len()
    }
}

/// Set up the GPU on `canvas`, classify the catalog's tracks and build the
/// planetarium. `config_json` may override any tunable.
#[wasm_bindgen]
pub async fn create_planetarium(
    canvas: HtmlCanvasElement,
    catalog_json: String,
    config_json: Option<String>,
) -> Result<WasmPlanetarium, JsValue> {
    init_panic_hook();

    let planetarium_config = match config_json {
        Some(json) => PlanetariumConfig::from_json(&json)
            .map_err(|e| JsValue::from_str(&format!("Invalid config: {}", e)))?,
        None => PlanetariumConfig::default(),
    };
    let catalog =
        Catalog::from_json(&catalog_json).map_err(|e| JsValue::from_str(&format!("Invalid catalog: {}", e)))?;

    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        dx12_shader_compiler: Default::default(),
        flags: wgpu::InstanceFlags::default(),
        gles_minor_version: wgpu::Gles3MinorVersion::Automatic,
    });

    let target = wgpu::SurfaceTarget::Canvas(canvas.clone());
    let surface = instance
        .create_surface(target)
        .map_err(|e| JsValue::from_str(&format!("Failed to create surface: {}", e)))?;

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::None,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        })
        .await
        .ok_or_else(|| JsValue::from_str("Failed to find an appropriate adapter"))?;

    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_webgl2_defaults(),
                memory_hints: Default::default(),
            },
            None,
        )
        .await
        .map_err(|e| JsValue::from_str(&format!("Failed to create device: {}", e)))?;

    let surface_caps = surface.get_capabilities(&adapter);
    let surface_format = surface_caps
        .formats
        .iter()
        .copied()
        .find(|f: &wgpu::TextureFormat| f.is_srgb())
        .or_else(|| surface_caps.formats.first().copied())
        .ok_or_else(|| JsValue::from_str("Surface has no supported formats"))?;

    let config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: surface_format,
        width: canvas.width().max(1),
        height: canvas.height().max(1),
        present_mode: surface_caps.present_modes.first().copied().unwrap_or_default(),
        alpha_mode: surface_caps.alpha_modes.first().copied().unwrap_or_default(),
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    };
    surface.configure(&device, &config);

    let renderer = Renderer::new(device, queue, config.format, config.width, config.height);

    // Enrichment finishes before any body exists
    let endpoint = resolve_endpoint(&planetarium_config.enrichment.endpoint);
    let client = EnrichmentClient::new(&planetarium_config.enrichment).with_endpoint(endpoint);
    let enriched = client.enrich(&catalog).await;

    let mut scene = SceneContext::new(planetarium_config);
    build_scene(&mut scene, &enriched);

    Ok(WasmPlanetarium {
        inner: Rc::new(RefCell::new(PlanetariumHost {
            renderer,
            surface,
            config,
            scene,
            player: CommandQueue::new(),
        })),
    })
}
