//! The tile cache state machine (component D): a keyed map of
//! `TileCoord → TileState` plus LRU eviction of RAM-resident bytes, stale
//! detection and loaded-ancestor lookup. Grounded in the teacher's
//! `layers/tile/cache.rs` (an `lru::LruCache` behind a mutex) and
//! `layers/tile/types.rs` (tile state + retry fields), but restructured as
//! the spec's exhaustively-matched six-variant sum type rather than a
//! flags struct.

use crate::core::geo::TileCoord;
use crate::retry::RetryState;
use fxhash::{FxHashMap, FxHashSet};
use std::sync::Arc;

/// Opaque handle to a GPU-resident texture. The real resource lives with
/// whatever `TextureDecoder` implementation the embedding application
/// supplies (§6.1); the engine only ever holds and compares the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// The encoded (PNG) bytes for a tile, shared so unload/reload doesn't
/// require a copy.
pub type TileBytes = Arc<Vec<u8>>;

/// Six-variant tagged state (§3). Exhaustively matched everywhere it's
/// consumed so adding a seventh variant is a compile error at every call
/// site, not a silently-skipped case.
#[derive(Debug, Clone)]
pub enum TileState {
    Pending,
    Loaded { texture: TextureHandle, bytes: TileBytes },
    Cached { bytes: TileBytes, last_access: u64 },
    Failed(RetryState),
    Retrying(RetryState),
    Exhausted(RetryState),
}

impl TileState {
    pub fn is_loaded(&self) -> bool {
        matches!(self, TileState::Loaded { .. })
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, TileState::Cached { .. })
    }

    /// `Pending | Failed | Retrying | Exhausted` — every variant with no
    /// GPU/RAM payload worth preserving once it falls out of the keep set.
    pub fn is_stale_outside_keep(&self) -> bool {
        matches!(
            self,
            TileState::Pending | TileState::Failed(_) | TileState::Retrying(_) | TileState::Exhausted(_)
        )
    }
}

/// Unload/eviction request surfaced to the caller, who owns destroying the
/// GPU texture (§4.D `tiles_to_unload`).
pub struct UnloadEntry {
    pub coord: TileCoord,
    pub texture: TextureHandle,
    pub bytes: TileBytes,
}

/// Re-decode request for a `Cached` tile re-entering view (§4.D
/// `cached_tiles_to_reload`).
pub struct ReloadEntry {
    pub coord: TileCoord,
    pub bytes: TileBytes,
}

pub struct TileCache {
    entries: FxHashMap<TileCoord, TileState>,
}

impl TileCache {
    pub fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }

    pub fn get(&self, coord: &TileCoord) -> Option<&TileState> {
        self.entries.get(coord)
    }

    pub fn insert(&mut self, coord: TileCoord, state: TileState) {
        self.entries.insert(coord, state);
    }

    pub fn contains(&self, coord: &TileCoord) -> bool {
        self.entries.contains_key(coord)
    }

    pub fn remove(&mut self, coord: &TileCoord) -> Option<TileState> {
        self.entries.remove(coord)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Wholesale clear — used on provider change (§3 lifecycles).
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// `tiles_to_unload` (§4.D): every `Loaded` coord not in `keep_set`.
    /// Caller destroys the texture and re-inserts the coord as `Cached`
    /// (the orchestrator does this in a single pass; see `orchestrator.rs`).
    pub fn tiles_to_unload(&self, keep_set: &FxHashSet<TileCoord>) -> Vec<UnloadEntry> {
        self.entries
            .iter()
            .filter_map(|(coord, state)| match state {
                TileState::Loaded { texture, bytes } if !keep_set.contains(coord) => {
                    Some(UnloadEntry {
                        coord: *coord,
                        texture: *texture,
                        bytes: bytes.clone(),
                    })
                }
                _ => None,
            })
            .collect()
    }

    /// `stale_tiles` (§4.D): coords in `Pending | Failed | Retrying |
    /// Exhausted` not in `keep_set` — cheap to drop outright.
    pub fn stale_tiles(&self, keep_set: &FxHashSet<TileCoord>) -> Vec<TileCoord> {
        self.entries
            .iter()
            .filter(|(coord, state)| !keep_set.contains(coord) && state.is_stale_outside_keep())
            .map(|(coord, _)| *coord)
            .collect()
    }

    /// `cached_tiles_to_reload` (§4.D): every `Cached` coord in
    /// `visible_set`, for off-main-thread re-decode.
    pub fn cached_tiles_to_reload(&self, visible_set: &FxHashSet<TileCoord>) -> Vec<ReloadEntry> {
        self.entries
            .iter()
            .filter_map(|(coord, state)| match state {
                TileState::Cached { bytes, .. } if visible_set.contains(coord) => Some(ReloadEntry {
                    coord: *coord,
                    bytes: bytes.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    /// `cached_images_to_evict` (§4.D): oldest-first `Cached` coords outside
    /// `keep_set`, enough to bring the count down to `max_to_keep`. Ties in
    /// `last_access` break by `TileCoord`'s total order — deterministic, as
    /// the spec only requires *some* deterministic order.
    pub fn cached_images_to_evict(
        &self,
        keep_set: &FxHashSet<TileCoord>,
        max_to_keep: usize,
    ) -> Vec<TileCoord> {
        let mut candidates: Vec<(TileCoord, u64)> = self
            .entries
            .iter()
            .filter_map(|(coord, state)| match state {
                TileState::Cached { last_access, .. } if !keep_set.contains(coord) => {
                    Some((*coord, *last_access))
                }
                _ => None,
            })
            .collect();

        if candidates.len() <= max_to_keep {
            return Vec::new();
        }

        candidates.sort_by_key(|(coord, last_access)| (*last_access, *coord));
        let evict_count = candidates.len() - max_to_keep;
        candidates
            .into_iter()
            .take(evict_count)
            .map(|(coord, _)| coord)
            .collect()
    }

    /// `get_loaded_ancestors` (§4.D): walks up to `max_levels` parents,
    /// returning every ancestor whose current state is `Loaded`.
    pub fn get_loaded_ancestors(&self, coord: &TileCoord, max_levels: u32) -> Vec<TileCoord> {
        coord
            .ancestors(max_levels)
            .into_iter()
            .filter(|ancestor| matches!(self.get(ancestor), Some(TileState::Loaded { .. })))
            .collect()
    }

    /// Every `Loaded` child of `coord`, used by the keep-set computation
    /// (§4.I step 1) so a loaded child isn't unloaded out from under a
    /// zoomed-out parent view.
    pub fn get_loaded_children(&self, coord: &TileCoord) -> Vec<TileCoord> {
        coord
            .children()
            .into_iter()
            .filter(|child| matches!(self.get(child), Some(TileState::Loaded { .. })))
            .collect()
    }
}

impl Default for TileCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes() -> TileBytes {
        Arc::new(vec![1, 2, 3])
    }

    #[test]
    fn loaded_and_cached_are_mutually_exclusive_by_construction() {
        let mut cache = TileCache::new();
        let coord = TileCoord::new(0, 0, 0);
        cache.insert(coord, TileState::Loaded { texture: TextureHandle(1), bytes: bytes() });
        assert!(cache.get(&coord).unwrap().is_loaded());
        cache.insert(coord, TileState::Cached { bytes: bytes(), last_access: 10 });
        assert!(cache.get(&coord).unwrap().is_cached());
        assert!(!cache.get(&coord).unwrap().is_loaded());
    }

    #[test]
    fn lru_eviction_returns_oldest_first() {
        // §8 scenario 6.
        let mut cache = TileCache::new();
        let a = TileCoord::new(0, 0, 5);
        let b = TileCoord::new(1, 0, 5);
        let c = TileCoord::new(2, 0, 5);
        cache.insert(a, TileState::Cached { bytes: bytes(), last_access: 100 });
        cache.insert(b, TileState::Cached { bytes: bytes(), last_access: 200 });
        cache.insert(c, TileState::Cached { bytes: bytes(), last_access: 300 });

        let keep_set = FxHashSet::default();
        let evicted = cache.cached_images_to_evict(&keep_set, 1);
        assert_eq!(evicted, vec![a, b]);
    }

    #[test]
    fn eviction_respects_keep_set() {
        let mut cache = TileCache::new();
        let keep = TileCoord::new(0, 0, 5);
        let drop_me = TileCoord::new(1, 0, 5);
        cache.insert(keep, TileState::Cached { bytes: bytes(), last_access: 1 });
        cache.insert(drop_me, TileState::Cached { bytes: bytes(), last_access: 2 });

        let mut keep_set = FxHashSet::default();
        keep_set.insert(keep);
        let evicted = cache.cached_images_to_evict(&keep_set, 0);
        assert_eq!(evicted, vec![drop_me]);
    }

    #[test]
    fn stale_tiles_excludes_loaded_and_cached() {
        let mut cache = TileCache::new();
        let pending = TileCoord::new(0, 0, 1);
        let loaded = TileCoord::new(1, 0, 1);
        cache.insert(pending, TileState::Pending);
        cache.insert(loaded, TileState::Loaded { texture: TextureHandle(1), bytes: bytes() });

        let keep_set = FxHashSet::default();
        let stale = cache.stale_tiles(&keep_set);
        assert_eq!(stale, vec![pending]);
    }

    #[test]
    fn loaded_ancestors_walks_up_to_max_levels() {
        let mut cache = TileCache::new();
        let leaf = TileCoord::new(8, 8, 4);
        let grandparent = leaf.parent().unwrap().parent().unwrap();
        cache.insert(grandparent, TileState::Loaded { texture: TextureHandle(2), bytes: bytes() });

        let ancestors = cache.get_loaded_ancestors(&leaf, 8);
        assert_eq!(ancestors, vec![grandparent]);
    }
}
