//! Engine-wide default tunables (§6.4). Kept in one place so they're easy to
//! cross-check against the defaults table rather than scattered as magic
//! numbers across the orchestrator, animator and input mapper.

/// Maximum representable zoom level.
pub const MAX_ZOOM: u8 = 19;

/// Web Mercator's representable latitude range.
pub const MAX_LATITUDE: f64 = 85.0;

/// Default square tile size in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Retry attempts before a tile is marked `Exhausted`.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Retry back-off base, in frames (≈ 1s at 60 fps).
pub const DEFAULT_BASE_DELAY_FRAMES: u64 = 60;

/// Tiles of slack kept loaded around the visible rectangle.
pub const DEFAULT_BUFFER_TILES: i64 = 3;

/// Upper bound on RAM-resident (`Cached`) tile entries.
pub const DEFAULT_MAX_CACHED_IMAGES: usize = 1500;

/// Disk cache byte budget (100 MiB).
pub const DEFAULT_DISK_MAX_BYTES: u64 = 100 * 1024 * 1024;

/// Frames a zoom-triggered debounce window suppresses new fetches for.
pub const DEFAULT_ZOOM_DEBOUNCE_FRAMES: u64 = 6;

/// Fraction of the remaining zoom delta consumed per animation step.
pub const DEFAULT_LERP_FACTOR: f64 = 0.15;

/// Below this distance from the target, the animator snaps instead of easing.
pub const DEFAULT_SNAP_THRESHOLD: f64 = 0.01;

/// Prefetch look-ahead horizon, in milliseconds.
pub const DEFAULT_LOOK_AHEAD_MS: f64 = 500.0;

/// Minimum pan speed (px/frame) before velocity-based prefetch engages.
pub const DEFAULT_MIN_VELOCITY: f64 = 5.0;

/// Cap on speculative prefetch fetches spawned per frame.
pub const DEFAULT_MAX_PREFETCH_TILES: usize = 8;

/// Exponential smoothing factor applied to per-frame drag velocity samples.
pub const DEFAULT_VELOCITY_SMOOTHING: f64 = 0.8;

/// Per-frame geometric decay applied to velocity after drag release.
pub const DEFAULT_VELOCITY_DECAY: f64 = 0.9;

/// Keyboard arrow-key pan step, in pixels.
pub const DEFAULT_KEYBOARD_PAN_SPEED: f64 = 100.0;

/// Maximum ancestor levels walked by `get_loaded_ancestors`.
pub const MAX_ANCESTOR_LEVELS: u32 = 8;

/// Maximum ancestor levels walked by the render walker's parent fallback.
pub const MAX_FALLBACK_LEVELS: u32 = 3;
