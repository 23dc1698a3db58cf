//! The on-disk tile cache index (component E): an in-memory LRU index over
//! on-disk tile files, authoritative for eviction during a run. Grounded in
//! the teacher's `layers/tile/cache.rs` LRU-by-timestamp bookkeeping and the
//! `other_examples` prune-by-`last_used` policy (`tile_cache.rs`'s
//! `PRUNE_THRESH`/`PRUNE_TIME`), adapted to a hard byte budget rather than an
//! entry-count threshold.

use crate::core::geo::TileCoord;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct DiskEntry {
    pub coord: TileCoord,
    pub file_path: PathBuf,
    pub size_bytes: u64,
    pub last_access_time: u64,
}

/// §4.E / §6.3. The index starts empty on every run (§9 open question,
/// decided): pre-existing files on disk are orphans until rewritten, and
/// re-scanning them is out of scope here.
pub struct DiskCacheIndex {
    entries: Vec<DiskEntry>,
    max_size_bytes: u64,
    total_bytes: u64,
    cache_dir: PathBuf,
    tileset_name: String,
}

impl DiskCacheIndex {
    pub fn new(cache_dir: PathBuf, tileset_name: impl Into<String>, max_size_bytes: u64) -> Self {
        Self {
            entries: Vec::new(),
            max_size_bytes,
            total_bytes: 0,
            cache_dir,
            tileset_name: tileset_name.into(),
        }
    }

    /// `{cache_dir}/{tileset_name}/{z}/{x}/{y}.png` (§4.E, §6.3).
    pub fn tile_path(&self, coord: TileCoord) -> PathBuf {
        self.cache_dir
            .join(&self.tileset_name)
            .join(coord.z.to_string())
            .join(coord.x.to_string())
            .join(format!("{}.png", coord.y))
    }

    pub fn contains(&self, coord: TileCoord) -> bool {
        self.entries.iter().any(|e| e.coord == coord)
    }

    /// `select_evictions` (§4.E): the minimum LRU-sorted prefix whose
    /// removal makes room for `new_size` within `max_size_bytes`.
    pub fn select_evictions(&self, new_size: u64) -> Vec<TileCoord> {
        if self.total_bytes + new_size <= self.max_size_bytes {
            return Vec::new();
        }

        let mut ordered: Vec<&DiskEntry> = self.entries.iter().collect();
        ordered.sort_by_key(|e| (e.last_access_time, e.coord));

        let mut freed = 0u64;
        let needed = (self.total_bytes + new_size).saturating_sub(self.max_size_bytes);
        let mut victims = Vec::new();
        for entry in ordered {
            if freed >= needed {
                break;
            }
            freed += entry.size_bytes;
            victims.push(entry.coord);
        }
        victims
    }

    /// Atomically removes `victims` and adds `entry` — the combined
    /// operation `spawn_fetch` performs before writing a new tile to disk
    /// (§4.F step 5).
    pub fn add_entry(&mut self, entry: DiskEntry, victims: &[TileCoord]) {
        self.remove_entries(victims);
        self.total_bytes += entry.size_bytes;
        self.entries.push(entry);
    }

    pub fn remove_entries(&mut self, coords: &[TileCoord]) {
        self.entries.retain(|e| {
            if coords.contains(&e.coord) {
                self.total_bytes = self.total_bytes.saturating_sub(e.size_bytes);
                false
            } else {
                true
            }
        });
    }

    pub fn touch_entry(&mut self, coord: TileCoord, now_ms: u64) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.coord == coord) {
            entry.last_access_time = now_ms;
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
