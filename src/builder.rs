//! Turns enriched tracks into celestial bodies.

use std::sync::Arc;

use glam::Vec3;

use crate::body::{BodyId, CelestialBody};
use crate::context::SceneContext;
use crate::enrichment::EnrichedTrack;
use crate::placement::place_body;
use crate::scene_graph::Transform;
use crate::terrain::{build_planet_mesh, seed_for};
use crate::tween::Tween;

/// Build one body per enriched track, in order. Returns the new body ids.
pub fn build_scene(ctx: &mut SceneContext, enriched: &[EnrichedTrack]) -> Vec<BodyId> {
    let ids: Vec<BodyId> = enriched.iter().filter_map(|track| build_body(ctx, track)).collect();
    log::info!(
        "Built {} celestial bodies ({} skipped)",
        ids.len(),
        enriched.len() - ids.len()
    );
    ids
}

/// Build a single body: terrain mesh, label, placement and registry entry.
///
/// Tracks without a playable preview URL are refused.
pub fn build_body(ctx: &mut SceneContext, enriched: &EnrichedTrack) -> Option<BodyId> {
    let Some(url) = enriched.track.playable_url() else {
        log::debug!("'{}' has no preview URL, not building a body", enriched.track.name);
        return None;
    };

    let terrain = &ctx.config.terrain;
    let genre_color = enriched.info.genre.base_color();
    if enriched.info.genre.palette_color().is_none() {
        log::debug!("Unknown genre '{}', using neutral color", enriched.info.genre);
    }

    let mesh = Arc::new(build_planet_mesh(seed_for(url), genre_color, terrain));
    let position = place_body(&enriched.info, &ctx.config.placement, &mut ctx.rng);

    let mesh_entity = ctx.scene.create_mesh(mesh.clone(), Transform::at(position));
    let label_entity = ctx.scene.create_label(
        enriched.track.name.clone(),
        terrain.label_size,
        Transform::at(Vec3::new(0.0, terrain.radius + terrain.label_offset, 0.0)),
    );
    ctx.scene.set_parent(label_entity, mesh_entity);
    ctx.scene.add_to_scene(mesh_entity);
    ctx.scene.add_to_scene(label_entity);

    let base_scale = 1.0;
    let id = ctx.bodies.push(CelestialBody {
        track: enriched.track.clone(),
        info: enriched.info.clone(),
        mesh,
        position,
        mesh_entity,
        label_entity,
        base_scale,
        scale: Tween::new(base_scale),
        pulse: 1.0,
    });
    log::debug!(
        "Body {} '{}' ({}) at ({:.1}, {:.1}, {:.1})",
        id,
        enriched.track.name,
        enriched.info.genre,
        position.x,
        position.y,
        position.z
    );
    Some(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Track;
    use crate::config::PlanetariumConfig;
    use crate::genre::{Genre, GenreInfo};
    use crate::scene_graph::SceneEntity;

    fn small_context() -> SceneContext {
        let mut config = PlanetariumConfig::default();
        config.terrain.lat_segments = 8;
        config.terrain.lon_segments = 8;
        config.ambient.star_count = 10;
        config.ambient.nebula_layers = 1;
        config.ambient.shooting_stars = 1;
        SceneContext::new(config)
    }

    fn enriched(name: &str, url: Option<&str>, genre: Genre, loudness: f32) -> EnrichedTrack {
        EnrichedTrack {
            track: Track::new(name, name, url.map(String::from)),
            info: GenreInfo::new(genre, 120.0, loudness),
        }
    }

    #[test]
    fn test_track_without_preview_builds_nothing() {
        let mut ctx = small_context();
        let ids = build_scene(
            &mut ctx,
            &[
                enriched("a", Some("u1"), Genre::Rock, -10.0),
                enriched("b", None, Genre::Pop, -10.0),
                enriched("c", Some(""), Genre::Pop, -10.0),
            ],
        );
        assert_eq!(ids, vec![BodyId(0)]);
        assert_eq!(ctx.bodies.len(), 1);
    }

    #[test]
    fn test_label_sits_above_body() {
        let mut ctx = small_context();
        let id = build_body(&mut ctx, &enriched("Song", Some("u"), Genre::Jazz, -30.0)).unwrap();
        let body = ctx.bodies.get(id).unwrap();

        assert_eq!(ctx.scene.parent(body.label_entity), Some(body.mesh_entity));
        let label_pos = ctx.scene.world_position(body.label_entity);
        let expected = body.position + Vec3::new(0.0, 14.0, 0.0);
        assert!((label_pos - expected).length() < 1e-3);

        match ctx.scene.get(body.label_entity) {
            Some(SceneEntity::Label(label)) => {
                assert_eq!(label.text, "Song");
                assert_eq!(label.size, [10.0, 5.0]);
            }
            other => panic!("expected label, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_genre_still_builds() {
        let mut ctx = small_context();
        let id = build_body(&mut ctx, &enriched("x", Some("u"), Genre::parse("polka"), -5.0));
        assert!(id.is_some());
    }
}
