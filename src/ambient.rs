//! Background scenery: starfield, nebula shells, shooting stars, the sun and
//! its orbit rings, plus the flashing palette of highlight edges.

use std::sync::Arc;

use glam::Vec3;
use rand::Rng;

use crate::config::AmbientConfig;
use crate::gpu::mesh::{create_ring_geometry, MeshData};
use crate::scene_graph::{EntityId, SceneEntity, SceneGraph, Transform};

const SUN_COLOR: [f32; 3] = [1.0, 0.85, 0.3];
const STAR_COLOR: [f32; 3] = [1.0, 1.0, 0.85];
const RING_COLOR: [f32; 3] = [1.0, 1.0, 1.0];
const NEBULA_COLORS: [[f32; 3]; 3] = [[0.8, 0.4, 0.2], [0.85, 0.33, 0.5], [0.21, 0.47, 0.67]];
const EDGE_COLOR_A: [f32; 3] = [1.0, 1.0, 1.0];
const EDGE_COLOR_B: [f32; 3] = [1.0, 1.0, 0.0];

const TRAIL_POINTS: usize = 20;
const SHOOTING_STAR_LIMIT: f32 = 5000.0;

#[derive(Debug, Clone)]
struct ShootingStar {
    entity: EntityId,
    /// Units per 60 Hz frame.
    velocity: Vec3,
}

#[derive(Debug, Clone)]
struct NebulaLayer {
    entity: EntityId,
    spin: f32,
}

/// Animated state of the background layers.
#[derive(Debug, Clone)]
pub struct AmbientState {
    config: AmbientConfig,
    pub sun: EntityId,
    pub star_field: EntityId,
    pub rings: Vec<EntityId>,
    nebula: Vec<NebulaLayer>,
    shooting_stars: Vec<ShootingStar>,
    time: f32,
    edge_time: f32,
}

impl AmbientState {
    /// Create every background entity and add it to the scene.
    pub fn build<R: Rng + ?Sized>(scene: &mut SceneGraph, config: &AmbientConfig, rng: &mut R) -> Self {
        let sun = scene.create_mesh(
            Arc::new(MeshData::sphere(config.sun_radius, 32, SUN_COLOR)),
            Transform::default(),
        );
        if let Some(SceneEntity::Mesh(mesh)) = scene.get_mut(sun) {
            mesh.emissive = 1.0;
        }
        scene.add_to_scene(sun);

        let star_field = scene.create_points(star_shell(config, rng), STAR_COLOR, 2.0);
        scene.add_to_scene(star_field);

        let rings = config
            .orbit_rings
            .iter()
            .map(|&radius| {
                let points = create_ring_geometry(radius, 64, RING_COLOR)
                    .into_iter()
                    .map(|v| Vec3::from_array(v.position))
                    .collect();
                let id = scene.create_lines(points, RING_COLOR, false);
                scene.add_to_scene(id);
                id
            })
            .collect();

        let nebula = (0..config.nebula_layers)
            .map(|i| {
                let points = (0..400)
                    .map(|_| random_unit(rng) * config.nebula_radius * (0.9 + i as f32 * 0.1))
                    .collect();
                let color = NEBULA_COLORS[i % NEBULA_COLORS.len()];
                let id = scene.create_points(points, color, 6.0);
                if let Some(t) = scene.transform_mut(id) {
                    t.rotation = Vec3::new(
                        rng.gen_range(0.0..std::f32::consts::TAU),
                        rng.gen_range(0.0..std::f32::consts::TAU),
                        rng.gen_range(0.0..std::f32::consts::TAU),
                    );
                }
                if let Some(SceneEntity::Points(cloud)) = scene.get_mut(id) {
                    cloud.intensity = 0.35;
                }
                scene.add_to_scene(id);
                NebulaLayer {
                    entity: id,
                    spin: if i % 2 == 0 { 1.0 } else { -1.0 },
                }
            })
            .collect();

        let shooting_stars = (0..config.shooting_stars)
            .map(|_| {
                let velocity = random_velocity(rng, 5.0, 10.0);
                let trail = (0..TRAIL_POINTS)
                    .map(|i| -velocity.normalize_or_zero() * i as f32 * 2.0)
                    .collect();
                let id = scene.create_points(trail, [1.0, 1.0, 1.0], 10.0);
                if let Some(t) = scene.transform_mut(id) {
                    t.position = random_in_cube(rng, config.shooting_star_extent);
                }
                scene.add_to_scene(id);
                ShootingStar { entity: id, velocity }
            })
            .collect();

        log::debug!(
            "Ambient scene: {} stars, {} nebula layers, {} shooting stars",
            config.star_count,
            config.nebula_layers,
            config.shooting_stars
        );

        Self {
            config: config.clone(),
            sun,
            star_field,
            rings,
            nebula,
            shooting_stars,
            time: 0.0,
            edge_time: 0.0,
        }
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    /// Blend factor between the two edge colors, in [0, 1].
    pub fn edge_mix(&self) -> f32 {
        (self.edge_time * 2.0).sin() * 0.5 + 0.5
    }

    /// Current color of flashing highlight edges.
    pub fn edge_color(&self) -> [f32; 3] {
        let t = self.edge_mix();
        std::array::from_fn(|i| EDGE_COLOR_A[i] + (EDGE_COLOR_B[i] - EDGE_COLOR_A[i]) * t)
    }

    /// Advance every background animation by `dt` seconds.
    pub fn advance<R: Rng + ?Sized>(&mut self, scene: &mut SceneGraph, dt: f32, rng: &mut R) {
        let frames = dt * 60.0;
        self.time += dt;
        self.edge_time += self.config.edge_flash_rate * dt;

        for layer in &self.nebula {
            if let Some(t) = scene.transform_mut(layer.entity) {
                t.rotation.y += layer.spin * self.config.nebula_rotation_rate * dt;
                t.rotation.z += layer.spin * self.config.nebula_rotation_rate * 0.5 * dt;
            }
        }

        if let Some(SceneEntity::Points(stars)) = scene.get_mut(self.star_field) {
            stars.intensity = 0.85 + 0.15 * (self.time * 1.5).sin();
        }

        if let Some(t) = scene.transform_mut(self.sun) {
            t.scale = Vec3::splat((self.time * 2.0).sin() * 0.01 + 2.0);
            t.rotation.y += 0.001 * frames;
        }

        for star in &mut self.shooting_stars {
            let Some(t) = scene.transform_mut(star.entity) else {
                continue;
            };
            t.position += star.velocity * frames;
            if t.position.length() > SHOOTING_STAR_LIMIT {
                t.position = random_in_cube(rng, self.config.shooting_star_extent);
                star.velocity = random_velocity(rng, 3.0, 6.0);
            }
        }
    }
}

fn star_shell<R: Rng + ?Sized>(config: &AmbientConfig, rng: &mut R) -> Vec<Vec3> {
    let max_radius = config.star_max_radius.max(config.star_min_radius + f32::EPSILON);
    (0..config.star_count)
        .map(|_| {
            let r = rng.gen_range(config.star_min_radius..max_radius);
            let theta = rng.gen_range(0.0..std::f32::consts::TAU);
            let phi = (2.0 * rng.gen::<f32>() - 1.0).acos();
            Vec3::new(
                r * phi.sin() * theta.cos(),
                r * phi.sin() * theta.sin() * config.star_y_scale,
                r * phi.cos(),
            )
        })
        .collect()
}

fn random_unit<R: Rng + ?Sized>(rng: &mut R) -> Vec3 {
    let theta = rng.gen_range(0.0..std::f32::consts::TAU);
    let z: f32 = rng.gen_range(-1.0..=1.0);
    let r = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(r * theta.cos(), r * theta.sin(), z)
}

fn random_in_cube<R: Rng + ?Sized>(rng: &mut R, extent: f32) -> Vec3 {
    let extent = extent.abs().max(1.0);
    Vec3::new(
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
        rng.gen_range(-extent..extent),
    )
}

/// Diagonal drift toward negative x, y and z.
fn random_velocity<R: Rng + ?Sized>(rng: &mut R, min: f32, max: f32) -> Vec3 {
    Vec3::new(
        -rng.gen_range(min..max),
        -rng.gen_range(min..max),
        -rng.gen_range(min..max),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn small_config() -> AmbientConfig {
        AmbientConfig {
            star_count: 200,
            nebula_layers: 3,
            shooting_stars: 5,
            ..Default::default()
        }
    }

    #[test]
    fn test_build_adds_every_layer() {
        let mut scene = SceneGraph::new();
        let mut rng = StdRng::seed_from_u64(1);
        let ambient = AmbientState::build(&mut scene, &small_config(), &mut rng);

        assert!(scene.is_in_scene(ambient.sun));
        assert_eq!(ambient.rings.len(), 3);
        assert_eq!(scene.lines().count(), 3);
        // star field + nebula layers + shooting stars
        assert_eq!(scene.points().count(), 1 + 3 + 5);
    }

    #[test]
    fn test_star_shell_respects_radii() {
        let config = small_config();
        let stars = star_shell(&config, &mut StdRng::seed_from_u64(2));
        assert_eq!(stars.len(), 200);
        for s in stars {
            let unsquashed = Vec3::new(s.x, s.y / config.star_y_scale, s.z).length();
            assert!(unsquashed >= config.star_min_radius - 1e-2);
            assert!(unsquashed <= config.star_max_radius + 1e-2);
        }
    }

    #[test]
    fn test_edge_palette_oscillates() {
        let mut scene = SceneGraph::new();
        let mut rng = StdRng::seed_from_u64(3);
        let mut ambient = AmbientState::build(&mut scene, &small_config(), &mut rng);
        assert_eq!(ambient.edge_mix(), 0.5);

        let mut seen_low = false;
        let mut seen_high = false;
        for _ in 0..600 {
            ambient.advance(&mut scene, 1.0 / 60.0, &mut rng);
            let mix = ambient.edge_mix();
            assert!((0.0..=1.0).contains(&mix));
            seen_low |= mix < 0.1;
            seen_high |= mix > 0.9;
        }
        assert!(seen_low && seen_high);
        assert_eq!(ambient.edge_color()[0], 1.0);
    }

    #[test]
    fn test_shooting_stars_stay_bounded() {
        let mut scene = SceneGraph::new();
        let mut rng = StdRng::seed_from_u64(4);
        let mut ambient = AmbientState::build(&mut scene, &small_config(), &mut rng);
        for _ in 0..2000 {
            ambient.advance(&mut scene, 1.0 / 60.0, &mut rng);
        }
        // Either still in flight or freshly respawned inside the cube
        let respawn_limit = ambient.config.shooting_star_extent * 3.0_f32.sqrt();
        for star in &ambient.shooting_stars {
            let p = scene.get(star.entity).map(|e| e.transform().position).unwrap();
            assert!(p.length() <= SHOOTING_STAR_LIMIT.max(respawn_limit) + 1.0);
            assert!(star.velocity.x < 0.0 && star.velocity.y < 0.0 && star.velocity.z < 0.0);
        }
    }

    #[test]
    fn test_sun_pulses_around_double_size() {
        let mut scene = SceneGraph::new();
        let mut rng = StdRng::seed_from_u64(5);
        let mut ambient = AmbientState::build(&mut scene, &small_config(), &mut rng);
        ambient.advance(&mut scene, 0.5, &mut rng);
        let scale = scene.get(ambient.sun).map(|e| e.transform().scale.x).unwrap();
        assert!((scale - 2.0).abs() <= 0.01 + 1e-6);
    }
}
