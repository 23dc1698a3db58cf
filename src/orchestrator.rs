//! The update orchestrator (component I): the strict per-frame algorithm
//! that ties the viewport, tile cache, disk cache, and fetch engine
//! together. There is no direct teacher analogue for this exact sequencing
//! — it's modeled on the spirit of the teacher's `core/map.rs` per-frame
//! `update()` (collect keep set, reconcile cache, drain loader results,
//! issue new loads) but restructured into the eleven explicit, ordered
//! steps this engine's invariants require.

use crate::cache::{TileCache, TileState};
use crate::core::bounds::MapBounds;
use crate::core::config::MapConfig;
use crate::core::geo::TileCoord;
use crate::core::viewport::{squared_distance_frac, Viewport};
use crate::disk_cache::DiskCacheIndex;
use crate::fetch::{CancelFlag, FetchEngine, FetchOutcome, TextureDecoder};
use crate::input::{InputMapper, InputSource};
use crate::provider::TileSource;
use crate::retry::{self, RetryState};
use crate::zoom::ZoomAnimator;
use fxhash::{FxHashMap, FxHashSet};
use std::sync::{Arc, Mutex};

const FRAME_MS: f64 = 1000.0 / 60.0;

/// The aggregate mutable state the orchestrator advances one frame at a
/// time. Owned and driven by the embedding application's event loop; never
/// touched by fetch/decode tasks directly (§5).
pub struct MapState {
    pub viewport: Viewport,
    pub cache: TileCache,
    pub bounds: MapBounds,
    pub config: MapConfig,
    pub zoom: ZoomAnimator,
    pub input: InputMapper,
    pub tau: u64,
    active_tasks: FxHashMap<TileCoord, CancelFlag>,
    fetch_engine: FetchEngine,
    disk_index: Arc<Mutex<DiskCacheIndex>>,
    source: Arc<dyn TileSource>,
    decoder: Arc<dyn TextureDecoder>,
    initial_center: crate::core::geo::LatLng,
    initial_zoom: u8,
}

impl MapState {
    pub fn new(
        viewport: Viewport,
        bounds: MapBounds,
        config: MapConfig,
        source: Arc<dyn TileSource>,
        decoder: Arc<dyn TextureDecoder>,
    ) -> Self {
        let disk_index = Arc::new(Mutex::new(DiskCacheIndex::new(
            config.disk_cache.cache_dir.clone(),
            config.disk_cache.tileset_name.clone(),
            config.disk_cache.max_size_bytes,
        )));
        let fetch_engine = FetchEngine::new(config.fetch.max_concurrent_fetches);
        let initial_center = viewport.center;
        let initial_zoom = viewport.zoom;
        Self {
            zoom: ZoomAnimator::at_rest(viewport.zoom),
            input: InputMapper::new(initial_center, initial_zoom),
            viewport,
            cache: TileCache::new(),
            bounds,
            config,
            tau: 0,
            active_tasks: FxHashMap::default(),
            fetch_engine,
            disk_index,
            source,
            decoder,
            initial_center,
            initial_zoom,
        }
    }

    /// `compute_keep_set` (§4.I step 1): visible-with-buffer ∪ their parents
    /// ∪ for every not-yet-loaded base tile, its loaded ancestors (up to 8
    /// levels) and any loaded children.
    fn compute_keep_set(&self) -> FxHashSet<TileCoord> {
        let base = self.viewport.visible_tiles_with_buffer(self.config.cache.buffer_tiles);
        let mut keep = base.clone();
        for coord in &base {
            if let Some(parent) = coord.parent() {
                keep.insert(parent);
            }
        }
        for coord in &base {
            let is_loaded = matches!(self.cache.get(coord), Some(TileState::Loaded { .. }));
            if !is_loaded {
                keep.extend(self.cache.get_loaded_ancestors(coord, crate::constants::MAX_ANCESTOR_LEVELS));
                keep.extend(self.cache.get_loaded_children(coord));
            }
        }
        keep
    }

    /// `retry_state` is `Some` when this fetch is a retry of a previously
    /// failed tile: the cache keeps `Retrying(rs)` in place (instead of
    /// `Pending`) for the duration of the flight, so Step 7 can recover
    /// `rs.retry_count` when the result comes back rather than starting a
    /// fresh `RetryState` and resetting backoff on every attempt (§4.C).
    fn spawn_fetch_for(&mut self, coord: TileCoord, retry_state: Option<RetryState>) {
        let cancel = CancelFlag::new();
        self.active_tasks.insert(coord, cancel.clone());
        let was_retry = retry_state.is_some();
        self.cache.insert(
            coord,
            match retry_state {
                Some(rs) => TileState::Retrying(rs),
                None => TileState::Pending,
            },
        );
        self.fetch_engine.spawn_fetch(
            coord,
            cancel,
            was_retry,
            self.source.clone(),
            self.decoder.clone(),
            self.disk_index.clone(),
        );
    }

    fn spawn_decode_for(&mut self, coord: TileCoord, bytes: crate::cache::TileBytes) {
        let cancel = CancelFlag::new();
        self.active_tasks.insert(coord, cancel.clone());
        self.cache.insert(coord, TileState::Pending);
        self.fetch_engine.spawn_decode(coord, bytes, cancel, self.decoder.clone());
    }

    /// Advances the engine by exactly one frame: applies polled input, then
    /// the eleven-step update (§4.H, §4.I).
    pub fn update_frame(&mut self, input_source: &dyn InputSource) {
        self.input.apply_frame(
            input_source,
            &mut self.viewport,
            &mut self.zoom,
            &self.bounds,
            &self.config,
            self.tau,
        );
        self.zoom.step(&mut self.viewport, &self.config.animation);
        self.viewport.zoom = self.bounds.clamp_zoom(self.viewport.zoom);

        let keep_set = self.compute_keep_set();

        // Step 2: cancel stale tasks.
        let stale_task_coords: Vec<TileCoord> = self
            .active_tasks
            .keys()
            .filter(|coord| !keep_set.contains(coord))
            .copied()
            .collect();
        for coord in stale_task_coords {
            if let Some(flag) = self.active_tasks.remove(&coord) {
                #[cfg(feature = "debug")]
                log::debug!("cancelling stale task for tile {:?}", coord);
                flag.cancel();
            }
        }

        // Step 3: unload distant.
        for unload in self.cache.tiles_to_unload(&keep_set) {
            #[cfg(feature = "debug")]
            log::debug!("unloading tile {:?}: Loaded -> Cached", unload.coord);
            self.decoder.destroy(unload.texture);
            self.cache.insert(
                unload.coord,
                TileState::Cached { bytes: unload.bytes, last_access: self.tau },
            );
        }

        // Step 4: remove stale.
        for coord in self.cache.stale_tiles(&keep_set) {
            self.cache.remove(&coord);
        }

        // Step 5: evict RAM-cached by LRU.
        for coord in self.cache.cached_images_to_evict(&keep_set, self.config.cache.max_cached_images) {
            self.cache.remove(&coord);
        }

        let visible_set = self.viewport.visible_tiles_with_buffer(0);

        // Step 6: reload cached tiles re-entering view.
        let to_reload: Vec<_> = self
            .cache
            .cached_tiles_to_reload(&visible_set)
            .into_iter()
            .filter(|entry| !self.active_tasks.contains_key(&entry.coord))
            .collect();
        for entry in to_reload {
            self.spawn_decode_for(entry.coord, entry.bytes);
        }

        // Step 7: drain result queue.
        for result in self.fetch_engine.drain_results() {
            self.active_tasks.remove(&result.coord);
            match result.outcome {
                FetchOutcome::Ok { texture, bytes } => {
                    #[cfg(feature = "debug")]
                    log::debug!("tile {:?}: Pending/Retrying -> Loaded", result.coord);
                    self.cache.insert(result.coord, TileState::Loaded { texture, bytes });
                }
                FetchOutcome::Err(message) => {
                    let next_state = if result.was_retry {
                        if let Some(TileState::Retrying(rs)) = self.cache.get(&result.coord) {
                            let advanced = rs.advance(self.tau, message);
                            if retry::is_exhausted(&advanced, self.config.retry.max_retries) {
                                #[cfg(feature = "debug")]
                                log::error!(
                                    "tile {:?} exhausted retries after {} attempts: {}",
                                    result.coord,
                                    advanced.retry_count,
                                    advanced.error_message
                                );
                                TileState::Exhausted(advanced)
                            } else {
                                TileState::Failed(advanced)
                            }
                        } else {
                            TileState::Failed(RetryState::initial(self.tau, message))
                        }
                    } else {
                        TileState::Failed(RetryState::initial(self.tau, message))
                    };
                    self.cache.insert(result.coord, next_state);
                }
            }
        }

        // Step 8: schedule retries for visible failed tiles.
        let retry_candidates: Vec<TileCoord> = visible_set
            .iter()
            .filter(|coord| match self.cache.get(coord) {
                Some(TileState::Failed(rs)) => retry::should_retry(
                    rs,
                    self.tau,
                    self.config.retry.max_retries,
                    self.config.retry.base_delay_frames,
                ),
                _ => false,
            })
            .copied()
            .collect();
        for coord in retry_candidates {
            if let Some(TileState::Failed(rs)) = self.cache.get(&coord) {
                let rs = rs.clone();
                self.spawn_fetch_for(coord, Some(rs));
            }
        }

        // Step 9: should-fetch gate.
        let should_fetch_new = !self.zoom.is_animating
            || (self.tau.saturating_sub(self.input.last_zoom_change_frame))
                >= self.config.animation.zoom_debounce_frames;

        if should_fetch_new {
            self.spawn_new_fetches(&visible_set);
        }

        // Step 11: advance the frame counter.
        self.tau += 1;
    }

    /// Step 10: parents first, then visible sorted by distance, then
    /// velocity-based prefetch.
    fn spawn_new_fetches(&mut self, visible_set: &FxHashSet<TileCoord>) {
        // 10a: parents first.
        let parents: Vec<TileCoord> = visible_set
            .iter()
            .filter_map(|coord| coord.parent())
            .filter(|parent| !self.cache.contains(parent))
            .collect();
        for parent in dedup(parents) {
            self.spawn_fetch_for(parent, None);
        }

        // 10b: visible tiles sorted ascending by squared distance from the
        // fractional center.
        let center_frac = self.viewport.center_tile_frac();
        let mut visible: Vec<TileCoord> = visible_set
            .iter()
            .filter(|coord| !self.cache.contains(coord))
            .copied()
            .collect();
        visible.sort_by(|a, b| {
            squared_distance_frac(center_frac, a)
                .partial_cmp(&squared_distance_frac(center_frac, b))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for coord in visible {
            self.spawn_fetch_for(coord, None);
        }

        // 10c: velocity-based prefetch.
        let velocity = self.input.velocity();
        let speed = (velocity.x * velocity.x + velocity.y * velocity.y).sqrt();
        if speed >= self.config.prefetch.min_velocity {
            self.spawn_prefetch(visible_set, center_frac, velocity, speed);
        }
    }

    fn spawn_prefetch(
        &mut self,
        visible_set: &FxHashSet<TileCoord>,
        _center_frac: crate::core::geo::TileFrac,
        velocity: crate::core::geo::Point,
        _speed: f64,
    ) {
        let frames_ahead = self.config.prefetch.look_ahead_ms / FRAME_MS;
        // Center moves opposite the pan velocity: dragging right moves the
        // map's visible content right, which means the *center* point moves
        // left (§4.I step 10c).
        let dx = -velocity.x * frames_ahead;
        let dy = -velocity.y * frames_ahead;
        let (d_lon, d_lat) = self.viewport.pixels_to_degrees(dx, dy);
        let predicted_center = self.bounds.clamp_center(crate::core::geo::LatLng::new(
            self.viewport.center.lat + d_lat,
            self.viewport.center.lng + d_lon,
        ));

        let predicted_viewport = Viewport::new(
            predicted_center,
            self.viewport.zoom,
            self.viewport.screen_w,
            self.viewport.screen_h,
            self.viewport.tile_size,
        );
        let predicted_frac = predicted_viewport.center_tile_frac();
        let predicted_visible = predicted_viewport.visible_tiles_with_buffer(0);

        let mut candidates: Vec<TileCoord> = predicted_visible
            .into_iter()
            .filter(|coord| !visible_set.contains(coord) && !self.cache.contains(coord))
            .collect();
        candidates.sort_by(|a, b| {
            squared_distance_frac(predicted_frac, a)
                .partial_cmp(&squared_distance_frac(predicted_frac, b))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.truncate(self.config.prefetch.max_prefetch_tiles);

        for coord in candidates {
            self.spawn_fetch_for(coord, None);
        }
    }

    pub fn reset_to_initial_view(&mut self) {
        self.viewport.center = self.initial_center;
        self.viewport.zoom = self.initial_zoom;
        self.zoom = ZoomAnimator::at_rest(self.initial_zoom);
    }
}

fn dedup(mut coords: Vec<TileCoord>) -> Vec<TileCoord> {
    coords.sort();
    coords.dedup();
    coords
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::MapPerformanceProfile;
    use crate::core::geo::{LatLng, Point};
    use crate::provider::CartoDarkProvider;

    struct NullDecoder;
    impl TextureDecoder for NullDecoder {
        fn decode(&self, _bytes: &[u8]) -> crate::error::Result<crate::cache::TextureHandle> {
            Ok(crate::cache::TextureHandle(1))
        }
        fn destroy(&self, _texture: crate::cache::TextureHandle) {}
    }

    struct IdleInput;
    impl InputSource for IdleInput {
        fn pointer_position(&self) -> Point {
            Point::new(0.0, 0.0)
        }
        fn pointer_button_down(&self) -> bool {
            false
        }
        fn scroll_delta_y(&self) -> f64 {
            0.0
        }
        fn pressed_key(&self) -> Option<crate::input::Key> {
            None
        }
    }

    fn state() -> MapState {
        let viewport = Viewport::new(LatLng::new(37.7749, -122.4194), 10, 800, 600, 256);
        MapState::new(
            viewport,
            MapBounds::default(),
            MapPerformanceProfile::ForTesting.resolve(),
            Arc::new(CartoDarkProvider::new()),
            Arc::new(NullDecoder),
        )
    }

    #[test]
    fn frame_counter_advances_exactly_once_per_update() {
        let mut map = state();
        assert_eq!(map.tau, 0);
        map.update_frame(&IdleInput);
        assert_eq!(map.tau, 1);
        map.update_frame(&IdleInput);
        assert_eq!(map.tau, 2);
    }

    #[test]
    fn keep_set_contains_the_visible_center_tile() {
        let map = state();
        let keep = map.compute_keep_set();
        let center = TileCoord::from_lat_lng(&map.viewport.center, map.viewport.zoom);
        assert!(keep.contains(&center));
    }

    #[test]
    fn reset_to_initial_view_clears_animation_state() {
        let mut map = state();
        map.zoom.begin(
            15,
            crate::zoom::Anchor { lat: 0.0, lng: 0.0, screen_x: 400.0, screen_y: 300.0 },
        );
        map.reset_to_initial_view();
        assert!(!map.zoom.is_animating);
        assert_eq!(map.viewport.zoom, map.initial_zoom);
    }
}
