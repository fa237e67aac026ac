//! Ray casting against bodies and their labels.

use glam::Vec3;

use crate::body::{BodyId, BodyRegistry};
use crate::camera::Camera;
use crate::scene_graph::{EntityId, SceneEntity, SceneGraph};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length.
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Distance along the ray to the first sphere surface hit.
    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let oc = self.origin - center;
        let b = oc.dot(self.direction);
        let c = oc.length_squared() - radius * radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        let sqrt = discriminant.sqrt();
        let near = -b - sqrt;
        let far = -b + sqrt;
        if near >= 0.0 {
            Some(near)
        } else if far >= 0.0 {
            // Origin inside the sphere
            Some(far)
        } else {
            None
        }
    }

    /// Hit distance on a camera-facing rectangle of `size` centered at `center`.
    pub fn intersect_billboard(&self, center: Vec3, size: [f32; 2], right: Vec3, up: Vec3) -> Option<f32> {
        let normal = right.cross(up).normalize_or_zero();
        let denom = normal.dot(self.direction);
        if denom.abs() < 1e-6 {
            return None;
        }
        let t = (center - self.origin).dot(normal) / denom;
        if t < 0.0 {
            return None;
        }
        let local = self.at(t) - center;
        let inside = local.dot(right).abs() <= size[0] * 0.5 && local.dot(up).abs() <= size[1] * 0.5;
        inside.then_some(t)
    }
}

/// Closest body whose sphere or label the ray hits.
///
/// The nearest entity along the ray wins and is resolved to the body owning it.
pub fn pick_body(ray: &Ray, bodies: &BodyRegistry, scene: &SceneGraph, camera: &Camera) -> Option<BodyId> {
    let forward = camera.forward();
    let right = forward.cross(camera.up).normalize_or_zero();
    let up = right.cross(forward);

    let mut best: Option<(EntityId, f32)> = None;
    let mut consider = |entity: EntityId, t: f32| {
        if best.map_or(true, |(_, best_t)| t < best_t) {
            best = Some((entity, t));
        }
    };

    for (_, body) in bodies.iter() {
        if !scene.is_in_scene(body.mesh_entity) {
            continue;
        }
        let center = scene.world_position(body.mesh_entity);
        if let Some(t) = ray.intersect_sphere(center, body.pick_radius()) {
            consider(body.mesh_entity, t);
        }

        if let Some(SceneEntity::Label(label)) = scene.get(body.label_entity) {
            if label.visible && scene.is_in_scene(body.label_entity) {
                let center = scene.world_position(body.label_entity);
                let scale = body.display_scale();
                let size = [label.size[0] * scale, label.size[1] * scale];
                if let Some(t) = ray.intersect_billboard(center, size, right, up) {
                    consider(body.label_entity, t);
                }
            }
        }
    }

    best.and_then(|(entity, _)| bodies.owner_of(entity))
}
