use glam::Vec2;
use serde::Serialize;

use crate::context::SceneContext;
use crate::interaction;
use crate::scene_graph::SceneEntity;

/// Screen placement of one body label, for the host page to draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelPlacement {
    pub body: usize,
    pub text: String,
    /// Normalized device coordinates, y up.
    pub x: f32,
    pub y: f32,
    /// Depth in [0, 1], smaller is closer.
    pub depth: f32,
    /// On-screen size in NDC units.
    pub width: f32,
    pub height: f32,
}

/// One render-loop tick. Only touches already-built state.
pub fn tick(ctx: &mut SceneContext, dt: f32) {
    let dt = dt.max(0.0);
    ctx.time += dt;
    ctx.frame += 1;

    // Decorative orbit
    ctx.rig.orbit(dt);

    // Ambient layers
    ctx.ambient.advance(&mut ctx.scene, dt, &mut ctx.rng);
    ctx.rig.advance_intro(dt);

    // Selection tweens
    interaction::advance(ctx, dt);

    // Orbit controls have the final say on the camera
    ctx.rig.update_controls(dt);
}

/// Labels visible from the current camera, far to near.
pub fn label_placements(ctx: &SceneContext, aspect: f32) -> Vec<LabelPlacement> {
    let camera = &ctx.rig.camera;
    let mut placements: Vec<LabelPlacement> = ctx
        .bodies
        .iter()
        .filter_map(|(id, body)| {
            let label = match ctx.scene.get(body.label_entity)? {
                SceneEntity::Label(label) if label.visible => label,
                _ => return None,
            };
            if !ctx.scene.is_in_scene(body.label_entity) {
                return None;
            }
            let center = ctx.scene.world_position(body.label_entity);
            let ndc = camera.project(center, aspect)?;
            if !(0.0..=1.0).contains(&ndc.z) || ndc.x.abs() > 1.2 || ndc.y.abs() > 1.2 {
                return None;
            }

            // Project the label's top-right corner to measure its size on screen
            let forward = camera.forward();
            let right = forward.cross(camera.up).normalize_or_zero();
            let up = right.cross(forward);
            let scale = body.display_scale();
            let corner = center + right * label.size[0] * scale * 0.5 + up * label.size[1] * scale * 0.5;
            let extent = camera
                .project(corner, aspect)
                .map(|c| (c.truncate() - ndc.truncate()).abs() * 2.0)
                .unwrap_or(Vec2::ZERO);

            Some(LabelPlacement {
                body: id.index(),
                text: label.text.clone(),
                x: ndc.x,
                y: ndc.y,
                depth: ndc.z,
                width: extent.x,
                height: extent.y,
            })
        })
        .collect();

    placements.sort_by(|a, b| b.depth.total_cmp(&a.depth));
    placements
}
