//! Scene graph for the planetarium.
//!
//! Entities are created detached and only rendered once added to the scene.
//! A child entity (a planet's label) follows its parent's world transform.

use std::collections::HashMap;
use std::sync::Arc;

use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::gpu::mesh::MeshData;

/// Unique identifier for scene entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

/// Transform component for scene entities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3, // Euler angles in radians
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z);
        Mat4::from_scale_rotation_translation(self.scale, rotation, self.position)
    }
}

/// A mesh instance - references shared geometry with its own transform.
#[derive(Debug, Clone)]
pub struct MeshInstance {
    pub mesh: Arc<MeshData>,
    pub transform: Transform,
    pub visible: bool,
    /// 0 is fully lit, 1 ignores lighting.
    pub emissive: f32,
}

/// Line-list geometry: consecutive point pairs are segments.
#[derive(Debug, Clone)]
pub struct LineSet {
    pub points: Vec<Vec3>,
    pub color: [f32; 3],
    /// Flashing lines take their color from the animated edge palette.
    pub flashing: bool,
    pub transform: Transform,
    pub visible: bool,
}

/// Billboard text label. Text is rasterized by the host page.
#[derive(Debug, Clone)]
pub struct Label {
    pub text: String,
    /// World-space width and height.
    pub size: [f32; 2],
    pub transform: Transform,
    pub visible: bool,
}

/// Point sprites (stars, shooting star trails).
#[derive(Debug, Clone)]
pub struct PointCloud {
    pub points: Vec<Vec3>,
    pub color: [f32; 3],
    /// Point size in pixels.
    pub size: f32,
    /// Brightness multiplier animated by the ambient layer.
    pub intensity: f32,
    pub transform: Transform,
    pub visible: bool,
}

#[derive(Debug, Clone)]
pub enum SceneEntity {
    Mesh(MeshInstance),
    Lines(LineSet),
    Label(Label),
    Points(PointCloud),
}

impl SceneEntity {
    pub fn transform(&self) -> &Transform {
        match self {
            SceneEntity::Mesh(m) => &m.transform,
            SceneEntity::Lines(l) => &l.transform,
            SceneEntity::Label(l) => &l.transform,
            SceneEntity::Points(p) => &p.transform,
        }
    }

    pub fn transform_mut(&mut self) -> &mut Transform {
        match self {
            SceneEntity::Mesh(m) => &mut m.transform,
            SceneEntity::Lines(l) => &mut l.transform,
            SceneEntity::Label(l) => &mut l.transform,
            SceneEntity::Points(p) => &mut p.transform,
        }
    }

    pub fn visible(&self) -> bool {
        match self {
            SceneEntity::Mesh(m) => m.visible,
            SceneEntity::Lines(l) => l.visible,
            SceneEntity::Label(l) => l.visible,
            SceneEntity::Points(p) => p.visible,
        }
    }
}

/// Owns every entity of the visualization.
#[derive(Debug)]
pub struct SceneGraph {
    entities: HashMap<EntityId, SceneEntity>,
    parents: HashMap<EntityId, EntityId>,
    /// Entities that have been added to the scene, in insertion order.
    scene_entities: Vec<EntityId>,
    next_id: u64,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            entities: HashMap::new(),
            parents: HashMap::new(),
            scene_entities: Vec::new(),
            next_id: 1,
        }
    }

    fn insert(&mut self, entity: SceneEntity) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        self.entities.insert(id, entity);
        id
    }

    /// Create a mesh instance. Not added to the scene automatically.
    pub fn create_mesh(&mut self, mesh: Arc<MeshData>, transform: Transform) -> EntityId {
        self.insert(SceneEntity::Mesh(MeshInstance {
            mesh,
            transform,
            visible: true,
            emissive: 0.0,
        }))
    }

    pub fn create_lines(&mut self, points: Vec<Vec3>, color: [f32; 3], flashing: bool) -> EntityId {
        self.insert(SceneEntity::Lines(LineSet {
            points,
            color,
            flashing,
            transform: Transform::default(),
            visible: true,
        }))
    }

    pub fn create_label(&mut self, text: impl Into<String>, size: [f32; 2], transform: Transform) -> EntityId {
        self.insert(SceneEntity::Label(Label {
            text: text.into(),
            size,
            transform,
            visible: true,
        }))
    }

    pub fn create_points(&mut self, points: Vec<Vec3>, color: [f32; 3], size: f32) -> EntityId {
        self.insert(SceneEntity::Points(PointCloud {
            points,
            color,
            size,
            intensity: 1.0,
            transform: Transform::default(),
            visible: true,
        }))
    }

    /// Attach `child` to `parent`. Fails on unknown ids and self-parenting.
    pub fn set_parent(&mut self, child: EntityId, parent: EntityId) -> bool {
        if child == parent || !self.exists(child) || !self.exists(parent) {
            return false;
        }
        // Refuse cycles
        let mut cursor = Some(parent);
        while let Some(id) = cursor {
            if id == child {
                return false;
            }
            cursor = self.parents.get(&id).copied();
        }
        self.parents.insert(child, parent);
        true
    }

    pub fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.parents.get(&id).copied()
    }

    /// Local-to-world matrix, composed through the parent chain.
    pub fn world_matrix(&self, id: EntityId) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            match self.entities.get(&current) {
                Some(entity) => matrix = entity.transform().matrix() * matrix,
                None => break,
            }
            cursor = self.parents.get(&current).copied();
        }
        matrix
    }

    pub fn world_position(&self, id: EntityId) -> Vec3 {
        self.world_matrix(id).transform_point3(Vec3::ZERO)
    }

    /// Add an entity to the scene (make it renderable).
    /// Returns false if already in scene or the entity doesn't exist.
    pub fn add_to_scene(&mut self, id: EntityId) -> bool {
        if !self.entities.contains_key(&id) || self.scene_entities.contains(&id) {
            return false;
        }
        self.scene_entities.push(id);
        true
    }

    /// Remove an entity from the scene. The entity still exists and can be re-added.
    pub fn remove_from_scene(&mut self, id: EntityId) -> bool {
        if let Some(pos) = self.scene_entities.iter().position(|&e| e == id) {
            self.scene_entities.remove(pos);
            true
        } else {
            false
        }
    }

    /// Destroy an entity completely, detaching any children.
    pub fn destroy(&mut self, id: EntityId) -> bool {
        self.remove_from_scene(id);
        self.parents.remove(&id);
        self.parents.retain(|_, parent| *parent != id);
        self.entities.remove(&id).is_some()
    }

    /// Destroy a batch of entities with a single pass over the scene list.
    pub fn destroy_batch(&mut self, ids: &[EntityId]) {
        if ids.is_empty() {
            return;
        }
        self.scene_entities.retain(|id| !ids.contains(id));
        self.parents.retain(|child, parent| !ids.contains(child) && !ids.contains(parent));
        for id in ids {
            self.entities.remove(id);
        }
    }

    pub fn get(&self, id: EntityId) -> Option<&SceneEntity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut SceneEntity> {
        self.entities.get_mut(&id)
    }

    pub fn transform_mut(&mut self, id: EntityId) -> Option<&mut Transform> {
        self.entities.get_mut(&id).map(SceneEntity::transform_mut)
    }

    /// All entities currently in the scene, in insertion order.
    pub fn scene_entities(&self) -> impl Iterator<Item = (EntityId, &SceneEntity)> {
        self.scene_entities
            .iter()
            .filter_map(|&id| self.entities.get(&id).map(|e| (id, e)))
    }

    pub fn meshes(&self) -> impl Iterator<Item = (EntityId, &MeshInstance)> {
        self.scene_entities().filter_map(|(id, entity)| match entity {
            SceneEntity::Mesh(mesh) => Some((id, mesh)),
            _ => None,
        })
    }

    pub fn lines(&self) -> impl Iterator<Item = (EntityId, &LineSet)> {
        self.scene_entities().filter_map(|(id, entity)| match entity {
            SceneEntity::Lines(lines) => Some((id, lines)),
            _ => None,
        })
    }

    pub fn labels(&self) -> impl Iterator<Item = (EntityId, &Label)> {
        self.scene_entities().filter_map(|(id, entity)| match entity {
            SceneEntity::Label(label) => Some((id, label)),
            _ => None,
        })
    }

    pub fn points(&self) -> impl Iterator<Item = (EntityId, &PointCloud)> {
        self.scene_entities().filter_map(|(id, entity)| match entity {
            SceneEntity::Points(points) => Some((id, points)),
            _ => None,
        })
    }

    pub fn exists(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn is_in_scene(&self, id: EntityId) -> bool {
        self.scene_entities.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}
