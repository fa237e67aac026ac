//! Catalog to scene to selection, end to end, without a GPU.

use planetarium::body::BodyId;
use planetarium::builder::build_scene;
use planetarium::catalog::Catalog;
use planetarium::config::PlanetariumConfig;
use planetarium::context::SceneContext;
use planetarium::enrichment::{match_records, parse_body};
use planetarium::interaction::{self, InteractionState};
use planetarium::playback::{CommandQueue, PlayerCommand};
use planetarium::visualiser;

const CATALOG: &str = r#"{
  "items": [
    { "track": { "id": "1", "name": "Loud Rock", "preview_url": "https://p/rock.mp3" } },
    { "track": { "id": "2", "name": "No Preview", "preview_url": null } },
    { "track": { "id": "3", "name": "Mid Pop", "preview_url": "https://p/pop.mp3" } },
    { "track": { "id": "4", "name": "Quiet Strings", "preview_url": "https://p/classical.mp3" } }
  ]
}"#;

const GENRES: &str = r#"[
  { "url": "https://p/classical.mp3", "genre": "Classical", "tempo": 70, "loudness": -45 },
  { "url": "https://p/rock.mp3", "genre": "Rock", "tempo": 140, "loudness": -6 },
  { "url": "https://p/pop.mp3", "genre": "Pop", "tempo": 118, "loudness": -20 }
]"#;

fn small_config() -> PlanetariumConfig {
    let mut config = PlanetariumConfig::default();
    config.terrain.lat_segments = 12;
    config.terrain.lon_segments = 12;
    config.ambient.star_count = 50;
    config.ambient.nebula_layers = 1;
    config.ambient.shooting_stars = 2;
    config
}

fn built_scene() -> SceneContext {
    let catalog = Catalog::from_json(CATALOG).unwrap();
    let records = parse_body(GENRES, &catalog.preview_urls()).unwrap();
    let enriched = match_records(catalog.tracks(), &records);

    let mut ctx = SceneContext::new(small_config());
    build_scene(&mut ctx, &enriched);
    ctx
}

#[test]
fn test_three_playable_tracks_make_three_bodies_at_loudness_distance() {
    let ctx = built_scene();
    assert_eq!(ctx.bodies.len(), 3);

    let placement = &ctx.config.placement;
    for (_, body) in ctx.bodies.iter() {
        let radial = (body.position.x.powi(2) + body.position.z.powi(2)).sqrt();
        let expected = placement.distance_for(body.info.loudness);
        assert!((radial - expected).abs() < 1e-2, "{}: {} vs {}", body.name(), radial, expected);
    }
    let names: Vec<&str> = ctx.bodies.iter().map(|(_, b)| b.name()).collect();
    assert_eq!(names, vec!["Loud Rock", "Mid Pop", "Quiet Strings"]);
}

#[test]
fn test_selecting_first_body_highlights_the_other_two_nearest_first() {
    let mut ctx = built_scene();
    let mut player = CommandQueue::new();

    assert!(interaction::select(&mut ctx, BodyId(0), &mut player));

    let graph = ctx.selection.highlight.clone().unwrap();
    assert_eq!(graph.primary.len(), 2);
    let origin = ctx.bodies.get(BodyId(0)).unwrap().position;
    let d: Vec<f32> = graph
        .primary
        .iter()
        .map(|id| ctx.bodies.get(*id).unwrap().position.distance(origin))
        .collect();
    assert!(d[0] <= d[1]);

    assert_eq!(
        player.drain(),
        vec![PlayerCommand::SetSource {
            url: "https://p/rock.mp3".to_string()
        }]
    );
    let panel = ctx.selection.panel.clone().unwrap();
    assert_eq!(panel.selected.name, "Loud Rock");
    assert_eq!(panel.neighbors.len(), 2);
}

#[test]
fn test_selection_settles_after_the_tweens() {
    let mut ctx = built_scene();
    let mut player = CommandQueue::new();
    interaction::select(&mut ctx, BodyId(1), &mut player);
    assert_eq!(ctx.selection.state, InteractionState::Selecting);

    for _ in 0..240 {
        visualiser::tick(&mut ctx, 1.0 / 60.0);
    }
    assert_eq!(ctx.selection.state, InteractionState::Idle);

    let body = ctx.bodies.get(BodyId(1)).unwrap();
    assert!(body.display_scale() > body.base_scale);
}

#[test]
fn test_empty_enrichment_builds_nothing_and_still_ticks() {
    let mut ctx = SceneContext::new(small_config());
    assert!(build_scene(&mut ctx, &[]).is_empty());
    for _ in 0..10 {
        visualiser::tick(&mut ctx, 1.0 / 60.0);
    }
    assert!(ctx.bodies.is_empty());
    assert!(visualiser::label_placements(&ctx, 1.5).is_empty());
}
