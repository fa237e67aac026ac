//! Procedural planet terrain.
//!
//! A UV sphere is displaced radially by deterministic 3D noise and colored by
//! elevation tier, each tier tinted toward the genre color. Everything runs on
//! the CPU so the same track always produces the same planet on every host.

use sha2::{Digest, Sha256};

use crate::config::TerrainConfig;
use crate::genre::hex_to_rgb;
use crate::gpu::mesh::{compute_vertex_normals, sphere_positions, MeshData, Vertex};

/// Elevation tier of a displaced vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Elevation {
    Sea,
    Land,
    Mountain,
}

/// Noise seed for a preview URL. Stable across runs and platforms.
pub fn seed_for(key: &str) -> u32 {
    let digest = Sha256::digest(key.as_bytes());
    u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
}

/// Radial displacement factor for a vertex on the undisplaced sphere.
pub fn displacement_at(position: [f32; 3], seed: u32, config: &TerrainConfig) -> f32 {
    let noise = noise_3d(
        position[0] * config.noise_scale,
        position[1] * config.noise_scale * config.y_noise_factor,
        position[2] * config.noise_scale,
        seed,
    );
    noise.abs().powf(config.exponent) * config.displacement_scale
}

pub fn classify(displacement: f32, config: &TerrainConfig) -> Elevation {
    if displacement < config.sea_level {
        Elevation::Sea
    } else if displacement < config.sea_level + config.land_band {
        Elevation::Land
    } else {
        Elevation::Mountain
    }
}

/// Vertex color for a displacement value, tinted toward `genre_color`.
pub fn terrain_color(displacement: f32, genre_color: [f32; 3], config: &TerrainConfig) -> [f32; 3] {
    let sea = hex_to_rgb(config.sea_color);
    let land = hex_to_rgb(config.land_color);
    let mountain = hex_to_rgb(config.mountain_color);

    let tier = match classify(displacement, config) {
        Elevation::Sea => sea,
        Elevation::Land => land,
        Elevation::Mountain => {
            let t = if config.mountain_band > 0.0 {
                (displacement - (config.sea_level + config.land_band)) / config.mountain_band
            } else {
                1.0
            };
            lerp3(land, mountain, t.clamp(0.0, 1.0))
        }
    };
    lerp3(tier, genre_color, config.genre_blend)
}

/// Build the displaced, colored sphere for one track.
pub fn build_planet_mesh(seed: u32, genre_color: [f32; 3], config: &TerrainConfig) -> MeshData {
    let (base, indices) = sphere_positions(config.radius, config.lat_segments, config.lon_segments);

    let mut positions = Vec::with_capacity(base.len());
    let mut colors = Vec::with_capacity(base.len());
    let mut bounding_radius: f32 = 0.0;

    for p in &base {
        let displacement = displacement_at(*p, seed, config);
        let direction = glam::Vec3::from_array(*p).normalize_or_zero();
        let displaced = direction * config.radius * (1.0 + displacement);

        bounding_radius = bounding_radius.max(displaced.length());
        positions.push(displaced.to_array());
        colors.push(terrain_color(displacement, genre_color, config));
    }

    let normals = compute_vertex_normals(&positions, &indices);
    let vertices = positions
        .into_iter()
        .zip(normals)
        .zip(colors)
        .map(|((position, normal), color)| Vertex::new(position, normal, color))
        .collect();

    MeshData {
        vertices,
        indices,
        bounding_radius,
    }
}

/// Deterministic 3D value noise in [-1, 1].
pub fn noise_3d(x: f32, y: f32, z: f32, seed: u32) -> f32 {
    let ix = x.floor() as i32;
    let iy = y.floor() as i32;
    let iz = z.floor() as i32;

    let fx = x - x.floor();
    let fy = y - y.floor();
    let fz = z - z.floor();

    // Smoothstep interpolation weights
    let u = fx * fx * (3.0 - 2.0 * fx);
    let v = fy * fy * (3.0 - 2.0 * fy);
    let w = fz * fz * (3.0 - 2.0 * fz);

    let n000 = hash_to_float(hash_3d(ix, iy, iz, seed));
    let n100 = hash_to_float(hash_3d(ix + 1, iy, iz, seed));
    let n010 = hash_to_float(hash_3d(ix, iy + 1, iz, seed));
    let n110 = hash_to_float(hash_3d(ix + 1, iy + 1, iz, seed));
    let n001 = hash_to_float(hash_3d(ix, iy, iz + 1, seed));
    let n101 = hash_to_float(hash_3d(ix + 1, iy, iz + 1, seed));
    let n011 = hash_to_float(hash_3d(ix, iy + 1, iz + 1, seed));
    let n111 = hash_to_float(hash_3d(ix + 1, iy + 1, iz + 1, seed));

    let nx00 = lerp(n000, n100, u);
    let nx10 = lerp(n010, n110, u);
    let nx01 = lerp(n001, n101, u);
    let nx11 = lerp(n011, n111, u);

    let nxy0 = lerp(nx00, nx10, v);
    let nxy1 = lerp(nx01, nx11, v);

    lerp(nxy0, nxy1, w)
}

fn hash_3d(x: i32, y: i32, z: i32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_add(x as u32).wrapping_mul(0x9e3779b9);
    h = h.wrapping_add(y as u32).wrapping_mul(0x85ebca6b);
    h = h.wrapping_add(z as u32).wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;
    h
}

fn hash_to_float(h: u32) -> f32 {
    (h as f32 / u32::MAX as f32) * 2.0 - 1.0
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn lerp3(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [lerp(a[0], b[0], t), lerp(a[1], b[1], t), lerp(a[2], b[2], t)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> TerrainConfig {
        TerrainConfig {
            lat_segments: 12,
            lon_segments: 16,
            ..Default::default()
        }
    }

    fn approx(a: [f32; 3], b: [f32; 3]) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-5)
    }

    #[test]
    fn test_noise_is_deterministic_and_bounded() {
        for i in 0..100 {
            let x = i as f32 * 0.37;
            let a = noise_3d(x, x * 0.5, -x, 42);
            let b = noise_3d(x, x * 0.5, -x, 42);
            assert_eq!(a, b);
            assert!((-1.0..=1.0).contains(&a));
        }
    }

    #[test]
    fn test_seed_is_stable_per_url() {
        assert_eq!(seed_for("https://p/a"), seed_for("https://p/a"));
        assert_ne!(seed_for("https://p/a"), seed_for("https://p/b"));
    }

    #[test]
    fn test_below_sea_level_is_always_sea_blend() {
        let config = TerrainConfig::default();
        let genre = [1.0, 1.0, 0.0];
        let expected = lerp3(hex_to_rgb(config.sea_color), genre, config.genre_blend);
        for step in 0..50 {
            let d = config.sea_level * step as f32 / 50.0;
            assert_eq!(classify(d, &config), Elevation::Sea);
            assert!(approx(terrain_color(d, genre, &config), expected));
        }
    }

    #[test]
    fn test_tier_boundaries() {
        let config = TerrainConfig::default();
        assert_eq!(classify(0.049, &config), Elevation::Sea);
        assert_eq!(classify(0.05, &config), Elevation::Land);
        assert_eq!(classify(0.099, &config), Elevation::Land);
        assert_eq!(classify(0.1, &config), Elevation::Mountain);
    }

    #[test]
    fn test_mountain_blend_saturates() {
        let config = TerrainConfig::default();
        let genre = [0.0, 0.0, 0.0];
        let peak = terrain_color(10.0, genre, &config);
        let expected = lerp3(hex_to_rgb(config.mountain_color), genre, config.genre_blend);
        assert!(approx(peak, expected));
    }

    #[test]
    fn test_planet_vertices_stay_within_displacement_bounds() {
        let config = small_config();
        let mesh = build_planet_mesh(seed_for("track"), [0.0, 0.0, 1.0], &config);
        let max_radius = config.radius * (1.0 + config.displacement_scale);
        for v in &mesh.vertices {
            let r = glam::Vec3::from_array(v.position).length();
            assert!(r >= config.radius - 1e-3);
            assert!(r <= max_radius + 1e-3);
        }
        assert!(mesh.bounding_radius >= config.radius - 1e-3);
        assert!(mesh.bounding_radius <= max_radius + 1e-3);
    }

    #[test]
    fn test_same_seed_same_planet() {
        let config = small_config();
        let a = build_planet_mesh(7, [1.0, 0.0, 0.0], &config);
        let b = build_planet_mesh(7, [1.0, 0.0, 0.0], &config);
        assert_eq!(a.vertices, b.vertices);
        assert_eq!(a.indices, b.indices);
    }
}
