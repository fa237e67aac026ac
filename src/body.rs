//! Celestial bodies: one planet per classified track.

use std::sync::Arc;

use glam::Vec3;

use crate::catalog::Track;
use crate::genre::GenreInfo;
use crate::gpu::mesh::MeshData;
use crate::scene_graph::EntityId;
use crate::tween::Tween;

/// Index of a body in the registry. Registry order is build order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub usize);

impl BodyId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for BodyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct CelestialBody {
    pub track: Track,
    pub info: GenreInfo,
    pub mesh: Arc<MeshData>,
    pub position: Vec3,
    pub mesh_entity: EntityId,
    pub label_entity: EntityId,
    pub base_scale: f32,
    /// Emphasis scale, animated on selection.
    pub scale: Tween<f32>,
    /// Multiplier on top of `scale`, driven by audio amplitude.
    pub pulse: f32,
}

impl CelestialBody {
    pub fn name(&self) -> &str {
        &self.track.name
    }

    /// Preview URL. Bodies are only built from playable tracks.
    pub fn preview_url(&self) -> &str {
        self.track.playable_url().unwrap_or_default()
    }

    /// Scale currently applied to the mesh.
    pub fn display_scale(&self) -> f32 {
        self.scale.value() * self.pulse
    }

    /// Picking radius at the current scale.
    pub fn pick_radius(&self) -> f32 {
        self.mesh.bounding_radius * self.display_scale()
    }
}

/// Ordered body registry.
#[derive(Debug, Clone, Default)]
pub struct BodyRegistry {
    bodies: Vec<CelestialBody>,
}

impl BodyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, body: CelestialBody) -> BodyId {
        self.bodies.push(body);
        BodyId(self.bodies.len() - 1)
    }

    pub fn get(&self, id: BodyId) -> Option<&CelestialBody> {
        self.bodies.get(id.0)
    }

    pub fn get_mut(&mut self, id: BodyId) -> Option<&mut CelestialBody> {
        self.bodies.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BodyId, &CelestialBody)> {
        self.bodies.iter().enumerate().map(|(i, b)| (BodyId(i), b))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (BodyId, &mut CelestialBody)> {
        self.bodies.iter_mut().enumerate().map(|(i, b)| (BodyId(i), b))
    }

    /// World positions in registry order.
    pub fn positions(&self) -> Vec<Vec3> {
        self.bodies.iter().map(|b| b.position).collect()
    }

    /// Body owning a mesh or label entity.
    pub fn owner_of(&self, entity: EntityId) -> Option<BodyId> {
        self.bodies
            .iter()
            .position(|b| b.mesh_entity == entity || b.label_entity == entity)
            .map(BodyId)
    }

    pub fn find_by_name(&self, name: &str) -> Option<BodyId> {
        self.bodies.iter().position(|b| b.track.name == name).map(BodyId)
    }
}
