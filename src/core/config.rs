//! Engine tuning (§6.4, §10.3). Follows the preset-enum pattern of the
//! original `MapPerformanceProfile`: each variant resolves to a concrete
//! `MapConfig`, so callers (and this crate's own tests) pick a coherent
//! bundle of defaults instead of hand-assembling one field at a time.

use crate::constants::*;

#[derive(Debug, Clone, PartialEq)]
pub struct MapConfig {
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    pub disk_cache: DiskCacheConfig,
    pub animation: AnimationConfig,
    pub prefetch: PrefetchConfig,
    pub fetch: FetchConfig,
    pub tile_size: u32,
    pub keyboard_pan_speed: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        MapPerformanceProfile::default().resolve()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_frames: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_frames: DEFAULT_BASE_DELAY_FRAMES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheConfig {
    pub buffer_tiles: i64,
    pub max_cached_images: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            buffer_tiles: DEFAULT_BUFFER_TILES,
            max_cached_images: DEFAULT_MAX_CACHED_IMAGES,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiskCacheConfig {
    pub max_size_bytes: u64,
    pub cache_dir: std::path::PathBuf,
    pub tileset_name: String,
}

impl Default for DiskCacheConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: DEFAULT_DISK_MAX_BYTES,
            cache_dir: std::path::PathBuf::from(".tile_cache"),
            tileset_name: "default".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationConfig {
    pub zoom_debounce_frames: u64,
    pub lerp_factor: f64,
    pub snap_threshold: f64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            zoom_debounce_frames: DEFAULT_ZOOM_DEBOUNCE_FRAMES,
            lerp_factor: DEFAULT_LERP_FACTOR,
            snap_threshold: DEFAULT_SNAP_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrefetchConfig {
    pub look_ahead_ms: f64,
    pub min_velocity: f64,
    pub max_prefetch_tiles: usize,
    pub velocity_smoothing: f64,
    pub velocity_decay: f64,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            look_ahead_ms: DEFAULT_LOOK_AHEAD_MS,
            min_velocity: DEFAULT_MIN_VELOCITY,
            max_prefetch_tiles: DEFAULT_MAX_PREFETCH_TILES,
            velocity_smoothing: DEFAULT_VELOCITY_SMOOTHING,
            velocity_decay: DEFAULT_VELOCITY_DECAY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchConfig {
    pub max_concurrent_fetches: usize,
    pub http_timeout_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: 6,
            http_timeout_ms: 10_000,
        }
    }
}

/// Coherent configuration bundles for common deployment shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum MapPerformanceProfile {
    /// The §6.4 defaults table, verbatim.
    Balanced,
    /// Mobile/constrained environments: smaller caches, fewer concurrent
    /// fetches, more conservative prefetch.
    LowResource,
    /// Desktop applications with bandwidth and RAM to spare.
    HighPerformance,
    /// Deterministic, fast-settling defaults for tests — no debounce window,
    /// a small disk budget, and aggressive retry timing so tests don't need
    /// to simulate hundreds of frames.
    ForTesting,
    Custom(MapConfig),
}

impl Default for MapPerformanceProfile {
    fn default() -> Self {
        Self::Balanced
    }
}

impl MapPerformanceProfile {
    pub fn resolve(&self) -> MapConfig {
        match self {
            Self::Balanced => MapConfig {
                retry: RetryConfig::default(),
                cache: CacheConfig::default(),
                disk_cache: DiskCacheConfig::default(),
                animation: AnimationConfig::default(),
                prefetch: PrefetchConfig::default(),
                fetch: FetchConfig::default(),
                tile_size: DEFAULT_TILE_SIZE,
                keyboard_pan_speed: DEFAULT_KEYBOARD_PAN_SPEED,
            },
            Self::LowResource => MapConfig {
                retry: RetryConfig {
                    max_retries: 2,
                    base_delay_frames: 90,
                },
                cache: CacheConfig {
                    buffer_tiles: 1,
                    max_cached_images: 300,
                },
                disk_cache: DiskCacheConfig {
                    max_size_bytes: 20 * 1024 * 1024,
                    ..DiskCacheConfig::default()
                },
                animation: AnimationConfig::default(),
                prefetch: PrefetchConfig {
                    max_prefetch_tiles: 2,
                    ..PrefetchConfig::default()
                },
                fetch: FetchConfig {
                    max_concurrent_fetches: 2,
                    http_timeout_ms: 10_000,
                },
                tile_size: DEFAULT_TILE_SIZE,
                keyboard_pan_speed: DEFAULT_KEYBOARD_PAN_SPEED,
            },
            Self::HighPerformance => MapConfig {
                retry: RetryConfig {
                    max_retries: 5,
                    base_delay_frames: 45,
                },
                cache: CacheConfig {
                    buffer_tiles: 4,
                    max_cached_images: 4000,
                },
                disk_cache: DiskCacheConfig {
                    max_size_bytes: 500 * 1024 * 1024,
                    ..DiskCacheConfig::default()
                },
                animation: AnimationConfig::default(),
                prefetch: PrefetchConfig {
                    max_prefetch_tiles: 16,
                    ..PrefetchConfig::default()
                },
                fetch: FetchConfig {
                    max_concurrent_fetches: 16,
                    http_timeout_ms: 10_000,
                },
                tile_size: DEFAULT_TILE_SIZE,
                keyboard_pan_speed: DEFAULT_KEYBOARD_PAN_SPEED,
            },
            Self::ForTesting => MapConfig {
                retry: RetryConfig {
                    max_retries: 3,
                    base_delay_frames: 2,
                },
                cache: CacheConfig {
                    buffer_tiles: 1,
                    max_cached_images: 16,
                },
                disk_cache: DiskCacheConfig {
                    max_size_bytes: 1024 * 1024,
                    cache_dir: std::env::temp_dir().join("tilengine_test_cache"),
                    tileset_name: "test".to_string(),
                },
                animation: AnimationConfig {
                    zoom_debounce_frames: 0,
                    ..AnimationConfig::default()
                },
                prefetch: PrefetchConfig::default(),
                fetch: FetchConfig {
                    max_concurrent_fetches: 4,
                    http_timeout_ms: 1_000,
                },
                tile_size: DEFAULT_TILE_SIZE,
                keyboard_pan_speed: DEFAULT_KEYBOARD_PAN_SPEED,
            },
            Self::Custom(config) => config.clone(),
        }
    }
}
