//! The scene context: all mutable visualization state in one place.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::ambient::AmbientState;
use crate::body::BodyRegistry;
use crate::camera::CameraRig;
use crate::config::PlanetariumConfig;
use crate::interaction::Selection;
use crate::scene_graph::SceneGraph;

/// Owned by a single host thread and passed explicitly to every operation.
#[derive(Debug)]
pub struct SceneContext {
    pub config: PlanetariumConfig,
    pub scene: SceneGraph,
    pub bodies: BodyRegistry,
    pub rig: CameraRig,
    pub ambient: AmbientState,
    pub selection: Selection,
    pub rng: StdRng,
    /// Seconds since the context was created.
    pub time: f32,
    pub frame: u64,
}

impl SceneContext {
    /// Empty planetarium: background layers and camera, no bodies yet.
    pub fn new(config: PlanetariumConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut scene = SceneGraph::new();
        let ambient = AmbientState::build(&mut scene, &config.ambient, &mut rng);
        let rig = CameraRig::new(&config.camera);

        Self {
            config,
            scene,
            bodies: BodyRegistry::new(),
            rig,
            ambient,
            selection: Selection::default(),
            rng,
            time: 0.0,
            frame: 0,
        }
    }
}

impl Default for SceneContext {
    fn default() -> Self {
        Self::new(PlanetariumConfig::default())
    }
}
