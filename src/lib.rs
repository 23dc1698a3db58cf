//! # tilengine
//!
//! A tile lifecycle and viewport engine for an interactive Web-Mercator
//! slippy map: projection and tile-coordinate algebra, a three-tier tile
//! cache (GPU → RAM → disk) with retry/backoff and LRU eviction, a smooth
//! zoom animator, a poll-based input mapper, and the per-frame orchestrator
//! and render walker that tie them together.
//!
//! This crate has no GPU, windowing, or network-protocol implementation of
//! its own — those are collaborator contracts (`TextureDecoder`,
//! `InputSource`, `reqwest`) the embedding application supplies.

pub mod cache;
pub mod constants;
pub mod core;
pub mod disk_cache;
pub mod easing;
pub mod error;
pub mod fetch;
pub mod input;
pub mod orchestrator;
pub mod prelude;
pub mod provider;
pub mod render;
pub mod retry;
pub mod zoom;

pub use crate::core::{
    bounds::MapBounds,
    config::{MapConfig, MapPerformanceProfile},
    geo::{LatLng, Point, TileCoord, TileFrac},
    viewport::Viewport,
};
pub use crate::error::{MapError, Result};

/// Error type alias for convenience.
pub type Error = MapError;
