pub mod error;
pub mod config;

// Data and enrichment
pub mod catalog;
pub mod genre;
pub mod enrichment;

// Scene building
pub mod gpu;
pub mod scene_graph;
pub mod terrain;
pub mod placement;
pub mod body;
pub mod builder;
pub mod ambient;
pub mod context;

// Adjacency and interaction
pub mod adjacency;
pub mod camera;
pub mod picking;
pub mod playback;
pub mod tween;
pub mod interaction;

pub mod visualiser;

#[cfg(not(target_arch = "wasm32"))]
pub mod render_job;

#[cfg(not(target_arch = "wasm32"))]
pub mod server;

#[cfg(not(target_arch = "wasm32"))]
pub mod cli;

#[cfg(target_arch = "wasm32")]
pub mod wasm;
