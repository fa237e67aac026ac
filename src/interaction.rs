//! Selection, playback and camera coordination.
//!
//! Selecting a body switches (or toggles) the audio, grows the body, rebuilds
//! the highlight edges and side panel, and flies the camera over. Input is
//! never blocked: a new selection retargets whatever is still animating.

use serde::Serialize;

use crate::adjacency::{highlight_graph, HighlightGraph};
use crate::body::BodyId;
use crate::camera::framing_point;
use crate::config::{PlacementConfig, SelectionConfig};
use crate::context::SceneContext;
use crate::picking::{pick_body, Ray};
use crate::playback::{AmplitudeEnvelope, AudioPlayer, PlaybackStatus};
use crate::scene_graph::EntityId;
use crate::tween::Easing;

const EDGE_COLOR: [f32; 3] = [1.0, 1.0, 1.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionState {
    #[default]
    Idle,
    /// Selection tweens are still running.
    Selecting,
}

/// One row of the side panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelEntry {
    pub body: usize,
    pub name: String,
    pub genre: String,
    pub tempo: f32,
    pub loudness: f32,
}

/// Selected song plus its connected songs; neighbors are selectable by index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SidePanel {
    pub selected: PanelEntry,
    pub neighbors: Vec<PanelEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub state: InteractionState,
    pub selected: Option<BodyId>,
    /// Current audio source URL.
    pub source: Option<String>,
    pub status: PlaybackStatus,
    pub highlight: Option<HighlightGraph>,
    /// Edge entities of the current highlight.
    pub edges: Vec<EntityId>,
    pub panel: Option<SidePanel>,
    envelope: Option<AmplitudeEnvelope>,
    awaiting_ready: bool,
}

impl Selection {
    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }
}

/// Emphasis scale for a loudness value, over the configured dB range.
pub fn loudness_scale(loudness: f32, placement: &PlacementConfig, selection: &SelectionConfig) -> f32 {
    let t = placement.normalized_loudness(loudness);
    selection.min_scale + (selection.max_scale - selection.min_scale) * t
}

/// Handle a pointer click. A ray that hits nothing changes nothing.
pub fn click(ctx: &mut SceneContext, ray: &Ray, player: &mut dyn AudioPlayer) -> Option<BodyId> {
    let hit = pick_body(ray, &ctx.bodies, &ctx.scene, &ctx.rig.camera)?;
    select(ctx, hit, player);
    Some(hit)
}

/// Select a body. Returns false for an unknown id.
pub fn select(ctx: &mut SceneContext, id: BodyId, player: &mut dyn AudioPlayer) -> bool {
    let Some(body) = ctx.bodies.get(id) else {
        log::warn!("Ignoring selection of unknown body {}", id);
        return false;
    };
    let url = body.preview_url().to_string();
    let name = body.name().to_string();
    let loudness = body.info.loudness;

    let selection = &mut ctx.selection;
    if selection.source.as_deref() != Some(url.as_str()) {
        log::info!("Now playing '{}'", name);
        player.set_source(&url);
        selection.source = Some(url);
        selection.status = PlaybackStatus::Playing;
        selection.awaiting_ready = true;
        selection.envelope = None;
    } else {
        player.toggle();
        selection.status = selection.status.toggled();
        log::debug!("Toggled '{}' to {:?}", name, selection.status);
    }

    let previous = selection.selected.replace(id);
    let config = &ctx.config.selection;
    if previous != Some(id) {
        if let Some(prev) = previous.and_then(|p| ctx.bodies.get_mut(p)) {
            let base = prev.base_scale;
            prev.scale.retarget(base, config.scale_tween_secs, Easing::CubicOut);
            prev.pulse = 1.0;
        }
        if let Some(body) = ctx.bodies.get_mut(id) {
            let target = body.base_scale * loudness_scale(loudness, &ctx.config.placement, config);
            body.scale.retarget(target, config.scale_tween_secs, Easing::CubicOut);
        }
    }

    let positions = ctx.bodies.positions();
    let graph = highlight_graph(&positions, id, config.primary_neighbors, config.secondary_neighbors);
    replace_edges(ctx, &graph, &positions);
    let panel = build_panel(ctx, &graph);
    ctx.selection.panel = Some(panel);
    ctx.selection.highlight = Some(graph);

    let body_position = positions[id.index()];
    let framing = framing_point(body_position, ctx.config.selection.framing_offset);
    ctx.rig.frame(framing, body_position, ctx.config.selection.camera_tween_secs);

    ctx.selection.state = InteractionState::Selecting;
    true
}

/// Select the `index`-th connected song of the side panel.
pub fn select_neighbor(ctx: &mut SceneContext, index: usize, player: &mut dyn AudioPlayer) -> bool {
    let target = ctx
        .selection
        .panel
        .as_ref()
        .and_then(|panel| panel.neighbors.get(index))
        .map(|entry| BodyId(entry.body));
    match target {
        Some(id) => select(ctx, id, player),
        None => false,
    }
}

/// The player finished loading a new source.
pub fn on_player_ready(ctx: &mut SceneContext, player: &mut dyn AudioPlayer) {
    let selection = &mut ctx.selection;
    if selection.awaiting_ready {
        selection.awaiting_ready = false;
        if selection.status == PlaybackStatus::Playing {
            player.play();
        }
    }
}

/// Waveform peaks of the current source, supplied once the player decoded it.
pub fn set_envelope(ctx: &mut SceneContext, envelope: AmplitudeEnvelope) {
    ctx.selection.envelope = Some(envelope);
}

/// Playback progress tick: pulse the selected body with the audio.
pub fn on_audio_progress(ctx: &mut SceneContext, time: f32) {
    let Some(id) = ctx.selection.selected else {
        return;
    };
    let amplitude = match (&ctx.selection.envelope, ctx.selection.status) {
        (Some(envelope), PlaybackStatus::Playing) => {
            envelope.peak(time, ctx.config.selection.pulse_window_secs)
        }
        _ => 0.0,
    };
    if let Some(body) = ctx.bodies.get_mut(id) {
        body.pulse = 1.0 + ctx.config.selection.pulse_gain * amplitude;
    }
}

/// Explicit play/pause button.
pub fn toggle_playback(ctx: &mut SceneContext, player: &mut dyn AudioPlayer) {
    if ctx.selection.source.is_none() {
        return;
    }
    player.toggle();
    ctx.selection.status = ctx.selection.status.toggled();
    if !ctx.selection.is_playing() {
        if let Some(body) = ctx.selection.selected.and_then(|id| ctx.bodies.get_mut(id)) {
            body.pulse = 1.0;
        }
    }
}

/// Waveform click at a fraction of the clip.
pub fn seek(ctx: &mut SceneContext, fraction: f32, player: &mut dyn AudioPlayer) {
    if ctx.selection.source.is_none() || !fraction.is_finite() {
        return;
    }
    player.seek_to(fraction.clamp(0.0, 1.0));
}

/// Advance body and camera tweens and settle back to idle when done.
pub fn advance(ctx: &mut SceneContext, dt: f32) {
    let mut animating = false;
    for (_, body) in ctx.bodies.iter_mut() {
        body.scale.advance(dt);
        animating |= body.scale.is_active();
        if let Some(t) = ctx.scene.transform_mut(body.mesh_entity) {
            t.scale = glam::Vec3::splat(body.display_scale());
        }
    }

    ctx.rig.advance_tweens(dt);
    animating |= ctx.rig.is_framing();

    if ctx.selection.state == InteractionState::Selecting && !animating {
        ctx.selection.state = InteractionState::Idle;
    }
}

fn replace_edges(ctx: &mut SceneContext, graph: &HighlightGraph, positions: &[glam::Vec3]) {
    let old = std::mem::take(&mut ctx.selection.edges);
    ctx.scene.destroy_batch(&old);

    let edges: Vec<EntityId> = graph
        .edges
        .iter()
        .map(|&(a, b)| {
            let id = ctx
                .scene
                .create_lines(vec![positions[a.index()], positions[b.index()]], EDGE_COLOR, true);
            ctx.scene.add_to_scene(id);
            id
        })
        .collect();
    ctx.selection.edges = edges;
}

fn panel_entry(ctx: &SceneContext, id: BodyId) -> Option<PanelEntry> {
    let body = ctx.bodies.get(id)?;
    Some(PanelEntry {
        body: id.index(),
        name: body.name().to_string(),
        genre: body.info.genre.to_string(),
        tempo: body.info.tempo,
        loudness: body.info.loudness,
    })
}

fn build_panel(ctx: &SceneContext, graph: &HighlightGraph) -> SidePanel {
    let selected = panel_entry(ctx, graph.selected).unwrap_or_else(|| PanelEntry {
        body: graph.selected.index(),
        name: String::new(),
        genre: String::new(),
        tempo: 0.0,
        loudness: 0.0,
    });
    SidePanel {
        selected,
        neighbors: graph.primary.iter().filter_map(|&id| panel_entry(ctx, id)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_scene;
    use crate::catalog::Track;
    use crate::config::PlanetariumConfig;
    use crate::enrichment::EnrichedTrack;
    use crate::genre::{Genre, GenreInfo};
    use crate::playback::{CommandQueue, PlayerCommand};

    fn context_with_bodies(loudness: &[f32]) -> SceneContext {
        let mut config = PlanetariumConfig::default();
        config.terrain.lat_segments = 6;
        config.terrain.lon_segments = 6;
        config.ambient.star_count = 4;
        config.ambient.nebula_layers = 0;
        config.ambient.shooting_stars = 0;
        let mut ctx = SceneContext::new(config);
        let tracks: Vec<EnrichedTrack> = loudness
            .iter()
            .enumerate()
            .map(|(i, &db)| EnrichedTrack {
                track: Track::new(format!("{}", i), format!("Song {}", i), Some(format!("https://p/{}", i))),
                info: GenreInfo::new(Genre::Rock, 120.0, db),
            })
            .collect();
        build_scene(&mut ctx, &tracks);
        ctx
    }

    fn settle(ctx: &mut SceneContext) {
        for _ in 0..240 {
            advance(ctx, 1.0 / 60.0);
        }
    }

    #[test]
    fn test_first_selection_switches_source() {
        let mut ctx = context_with_bodies(&[-10.0, -20.0, -30.0]);
        let mut player = CommandQueue::new();

        assert!(select(&mut ctx, BodyId(1), &mut player));
        assert_eq!(player.drain(), vec![PlayerCommand::SetSource { url: "https://p/1".into() }]);
        assert_eq!(ctx.selection.status, PlaybackStatus::Playing);
        assert_eq!(ctx.selection.state, InteractionState::Selecting);

        on_player_ready(&mut ctx, &mut player);
        assert_eq!(player.drain(), vec![PlayerCommand::Play]);
        // A second ready does not replay
        on_player_ready(&mut ctx, &mut player);
        assert!(player.drain().is_empty());
    }

    #[test]
    fn test_reselect_toggles_without_restarting_scale() {
        let mut ctx = context_with_bodies(&[0.0, -20.0, -30.0]);
        let mut player = CommandQueue::new();
        select(&mut ctx, BodyId(0), &mut player);
        for _ in 0..6 {
            advance(&mut ctx, 1.0 / 60.0);
        }
        let mid_scale = ctx.bodies.get(BodyId(0)).unwrap().scale.value();
        assert!(mid_scale > 1.0 && mid_scale < 1.5);
        player.drain();

        select(&mut ctx, BodyId(0), &mut player);
        assert_eq!(player.drain(), vec![PlayerCommand::Toggle]);
        assert_eq!(ctx.selection.status, PlaybackStatus::Paused);
        let body = ctx.bodies.get(BodyId(0)).unwrap();
        assert_eq!(body.scale.value(), mid_scale);
        assert_eq!(body.scale.target(), 1.5);

        settle(&mut ctx);
        assert_eq!(ctx.bodies.get(BodyId(0)).unwrap().scale.value(), 1.5);
    }

    #[test]
    fn test_new_selection_shrinks_previous() {
        let mut ctx = context_with_bodies(&[-30.0, -15.0, -45.0]);
        let mut player = CommandQueue::new();
        select(&mut ctx, BodyId(0), &mut player);
        settle(&mut ctx);
        assert_eq!(ctx.bodies.get(BodyId(0)).unwrap().scale.value(), 1.25);
        assert_eq!(ctx.selection.state, InteractionState::Idle);

        select(&mut ctx, BodyId(1), &mut player);
        settle(&mut ctx);
        assert_eq!(ctx.bodies.get(BodyId(0)).unwrap().scale.value(), 1.0);
        assert_eq!(ctx.bodies.get(BodyId(1)).unwrap().scale.value(), 1.375);
        assert_eq!(ctx.selection.source.as_deref(), Some("https://p/1"));
    }

    #[test]
    fn test_edges_are_replaced_as_a_batch() {
        let mut ctx = context_with_bodies(&[-10.0, -20.0, -30.0, -40.0]);
        let mut player = CommandQueue::new();
        let baseline = ctx.scene.lines().count();

        select(&mut ctx, BodyId(0), &mut player);
        // 3 primary edges + 3 second hops
        assert_eq!(ctx.selection.edges.len(), 6);
        assert_eq!(ctx.scene.lines().count(), baseline + 6);
        let first_batch = ctx.selection.edges.clone();

        select(&mut ctx, BodyId(2), &mut player);
        assert_eq!(ctx.scene.lines().count(), baseline + 6);
        assert!(first_batch.iter().all(|&e| !ctx.scene.exists(e)));
    }

    #[test]
    fn test_panel_neighbor_selection_recurses() {
        let mut ctx = context_with_bodies(&[-10.0, -20.0, -30.0]);
        let mut player = CommandQueue::new();
        select(&mut ctx, BodyId(0), &mut player);

        let panel = ctx.selection.panel.clone().unwrap();
        assert_eq!(panel.selected.name, "Song 0");
        assert_eq!(panel.neighbors.len(), 2);
        let expected = BodyId(panel.neighbors[1].body);

        assert!(select_neighbor(&mut ctx, 1, &mut player));
        assert_eq!(ctx.selection.selected, Some(expected));
        assert!(!select_neighbor(&mut ctx, 10, &mut player));
    }

    #[test]
    fn test_click_on_nothing_is_a_no_op() {
        let mut ctx = context_with_bodies(&[-10.0, -20.0]);
        let mut player = CommandQueue::new();
        let ray = Ray::new(glam::Vec3::new(0.0, 5000.0, 0.0), glam::Vec3::Y);
        assert_eq!(click(&mut ctx, &ray, &mut player), None);
        assert!(player.pending().is_empty());
        assert_eq!(ctx.selection.selected, None);
        assert_eq!(ctx.selection.state, InteractionState::Idle);
    }

    #[test]
    fn test_click_hits_body() {
        let mut ctx = context_with_bodies(&[-10.0, -20.0]);
        let mut player = CommandQueue::new();
        let target = ctx.bodies.get(BodyId(1)).unwrap().position;
        let origin = target + glam::Vec3::new(0.0, 0.0, 100.0);
        let ray = Ray::new(origin, target - origin);
        assert_eq!(click(&mut ctx, &ray, &mut player), Some(BodyId(1)));
    }

    #[test]
    fn test_pulse_follows_amplitude_only_while_playing() {
        let mut ctx = context_with_bodies(&[-10.0, -20.0]);
        let mut player = CommandQueue::new();
        select(&mut ctx, BodyId(0), &mut player);
        set_envelope(&mut ctx, AmplitudeEnvelope::new(vec![0.5; 100], 10.0));

        on_audio_progress(&mut ctx, 2.0);
        assert!((ctx.bodies.get(BodyId(0)).unwrap().pulse - 1.1).abs() < 1e-5);

        toggle_playback(&mut ctx, &mut player);
        assert_eq!(ctx.selection.status, PlaybackStatus::Paused);
        assert_eq!(ctx.bodies.get(BodyId(0)).unwrap().pulse, 1.0);
        on_audio_progress(&mut ctx, 2.5);
        assert_eq!(ctx.bodies.get(BodyId(0)).unwrap().pulse, 1.0);
    }

    #[test]
    fn test_seek_is_clamped_and_needs_a_source() {
        let mut ctx = context_with_bodies(&[-10.0]);
        let mut player = CommandQueue::new();
        seek(&mut ctx, 0.5, &mut player);
        assert!(player.pending().is_empty());

        select(&mut ctx, BodyId(0), &mut player);
        player.drain();
        seek(&mut ctx, 1.7, &mut player);
        seek(&mut ctx, f32::NAN, &mut player);
        assert_eq!(player.drain(), vec![PlayerCommand::Seek { fraction: 1.0 }]);
    }

    #[test]
    fn test_camera_frames_selected_body() {
        let mut ctx = context_with_bodies(&[-10.0, -20.0]);
        let mut player = CommandQueue::new();
        select(&mut ctx, BodyId(1), &mut player);
        settle(&mut ctx);
        let body = ctx.bodies.get(BodyId(1)).unwrap().position;
        assert_eq!(ctx.rig.controls.target, body);
        assert_eq!(ctx.rig.camera.position, framing_point(body, [50.0, 200.0, 150.0]));
    }

    #[test]
    fn test_click_on_label_selects_owner() {
        let mut ctx = context_with_bodies(&[-10.0, -20.0, -30.0]);
        let mut player = CommandQueue::new();
        select(&mut ctx, BodyId(1), &mut player);
        settle(&mut ctx);
        select(&mut ctx, BodyId(0), &mut player);
        player.drain();

        let body = ctx.bodies.get(BodyId(1)).unwrap();
        let label = ctx.scene.world_position(body.label_entity);
        let camera = &ctx.rig.camera;
        let right = camera.forward().cross(camera.up).normalize();
        let up = right.cross(camera.forward());
        let aim = label + right * 4.0 + up * 2.0;
        let ray = Ray::new(camera.position, aim - camera.position);

        assert_eq!(click(&mut ctx, &ray, &mut player), Some(BodyId(1)));
        assert_eq!(ctx.selection.selected, Some(BodyId(1)));
        assert_eq!(player.drain(), vec![PlayerCommand::SetSource { url: "https://p/1".into() }]);
    }
}
