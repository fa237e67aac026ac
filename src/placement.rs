//! World positions for celestial bodies.

use glam::Vec3;
use rand::Rng;

use crate::config::{PlacementConfig, PlacementStrategy};
use crate::genre::GenreInfo;

/// Position for one body under the configured strategy.
///
/// Every strategy keeps the body on the orbital plane `plane_y`.
pub fn place_body<R: Rng + ?Sized>(info: &GenreInfo, config: &PlacementConfig, rng: &mut R) -> Vec3 {
    match config.strategy {
        PlacementStrategy::ExplicitCoordinates => match info.hint {
            Some(hint) => Vec3::new(hint.x, config.plane_y, hint.z),
            None => {
                log::debug!("No coordinate hint for {} track, placing by loudness", info.genre);
                by_loudness(info.loudness, config, rng)
            }
        },
        PlacementStrategy::DistanceByLoudness => by_loudness(info.loudness, config, rng),
    }
}

fn by_loudness<R: Rng + ?Sized>(loudness: f32, config: &PlacementConfig, rng: &mut R) -> Vec3 {
    let distance = config.distance_for(loudness);
    let angle: f32 = rng.gen_range(0.0..std::f32::consts::TAU);
    Vec3::new(distance * angle.cos(), config.plane_y, distance * angle.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genre::Genre;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_loudness_sets_orbital_distance() {
        let config = PlacementConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        for (loudness, expected) in [(-60.0, 200.0), (-30.0, 400.0), (0.0, 600.0), (-90.0, 200.0)] {
            let info = GenreInfo::new(Genre::Rock, 120.0, loudness);
            let p = place_body(&info, &config, &mut rng);
            let radial = (p.x * p.x + p.z * p.z).sqrt();
            assert!((radial - expected).abs() < 1e-2, "{} -> {}", loudness, radial);
            assert_eq!(p.y, 0.0);
        }
    }

    #[test]
    fn test_explicit_coordinates() {
        let config = PlacementConfig {
            strategy: PlacementStrategy::ExplicitCoordinates,
            plane_y: 5.0,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let info = GenreInfo::new(Genre::Pop, 100.0, -8.0).with_hint(12.0, -40.0);
        assert_eq!(place_body(&info, &config, &mut rng), Vec3::new(12.0, 5.0, -40.0));
    }

    #[test]
    fn test_missing_hint_falls_back_to_loudness() {
        let config = PlacementConfig {
            strategy: PlacementStrategy::ExplicitCoordinates,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(9);
        let info = GenreInfo::new(Genre::Jazz, 90.0, -30.0);
        let p = place_body(&info, &config, &mut rng);
        assert!(((p.x * p.x + p.z * p.z).sqrt() - 400.0).abs() < 1e-2);
    }

    #[test]
    fn test_same_seed_same_layout() {
        let config = PlacementConfig::default();
        let info = GenreInfo::new(Genre::Latin, 100.0, -12.0);
        let a = place_body(&info, &config, &mut StdRng::seed_from_u64(3));
        let b = place_body(&info, &config, &mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
    }
}
