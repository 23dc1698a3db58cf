//! The render walker (component J): two passes per frame over the visible
//! tile set, both keyed off the fractional `display_zoom` rather than the
//! integer `viewport.zoom` so zoom animation reads as continuous scaling
//! instead of a level pop. There's no teacher analogue for the fallback
//! sub-region math (the teacher always has a concrete decoded texture or
//! skips the tile); the `Renderable`/`UiRenderable` shape in the teacher's
//! `traits.rs` is kept only as the idea of a draw collaborator, generalized
//! here to `TileCanvas`.

use crate::cache::{TextureHandle, TileCache, TileState};
use crate::core::geo::TileCoord;
use crate::core::viewport::Viewport;

/// The drawing collaborator (§6.1 `draw_textured_quad`). `src_xywh` and
/// `dst_xywh` are `(x, y, w, h)` — source in UV space `[0, 1]`, destination
/// in screen pixels.
pub trait TileCanvas {
    fn draw_textured_quad(
        &self,
        texture: TextureHandle,
        src_xywh: (f64, f64, f64, f64),
        dst_xywh: (f64, f64, f64, f64),
        alpha: f64,
    );
}

/// NW-corner screen position and on-screen size of one tile at `coord`,
/// rendered at fractional `display_zoom`. Tile-index differences are
/// expressed in display-zoom tile-units before multiplying by `tile_size` —
/// that unit already encodes the `2^z` scaling, so the same multiplier
/// works at every level (§4.J).
fn screen_rect_for_tile(coord: TileCoord, display_zoom: f64, viewport: &Viewport) -> (f64, f64, f64, f64) {
    let center_frac = crate::core::geo::geo_to_tile_frac(viewport.center.lat, viewport.center.lng, display_zoom);
    let level_scale = 2f64.powf(display_zoom - coord.z as f64);
    let tile_x_at_display = coord.x as f64 * level_scale;
    let tile_y_at_display = coord.y as f64 * level_scale;
    let size = viewport.tile_size as f64 * level_scale;
    let x = viewport.screen_w as f64 / 2.0 + (tile_x_at_display - center_frac.tx) * viewport.tile_size as f64;
    let y = viewport.screen_h as f64 / 2.0 + (tile_y_at_display - center_frac.ty) * viewport.tile_size as f64;
    (x, y, size, size)
}

/// Walks up from `coord` looking for a `Loaded` ancestor within
/// `max_levels`. Returns the ancestor, its distance `d`, and the UV
/// sub-region of the ancestor's texture that covers `coord` (§4.J).
fn find_parent_fallback(
    coord: TileCoord,
    cache: &TileCache,
    max_levels: u32,
) -> Option<(TileCoord, u32, (f64, f64, f64, f64))> {
    let mut current = coord;
    for d in 1..=max_levels {
        let parent = current.parent()?;
        if let Some(TileState::Loaded { .. }) = cache.get(&parent) {
            let scale = 1u32 << d;
            let offset_x = (coord.x as f64 - parent.x as f64 * scale as f64) / scale as f64;
            let offset_y = (coord.y as f64 - parent.y as f64 * scale as f64) / scale as f64;
            let uv_size = 1.0 / scale as f64;
            return Some((parent, d, (offset_x, offset_y, uv_size, uv_size)));
        }
        current = parent;
    }
    None
}

pub struct RenderWalker {
    pub max_fallback_levels: u32,
}

impl RenderWalker {
    pub fn new() -> Self {
        Self { max_fallback_levels: crate::constants::MAX_FALLBACK_LEVELS }
    }

    /// Renders one frame. `visible` is the strict (unbuffered) visible tile
    /// set — the caller passes `viewport.visible_tiles_with_buffer(0)`.
    pub fn render(
        &self,
        visible: &fxhash::FxHashSet<TileCoord>,
        cache: &TileCache,
        viewport: &Viewport,
        display_zoom: f64,
        canvas: &dyn TileCanvas,
    ) {
        self.render_background_pass(visible, cache, viewport, display_zoom, canvas);
        self.render_foreground_pass(visible, cache, viewport, display_zoom, canvas);
    }

    /// Pass 1: draw `Loaded` parents of the visible set at double size, as a
    /// cheap placeholder under whatever pass 2 draws on top (§4.J).
    fn render_background_pass(
        &self,
        visible: &fxhash::FxHashSet<TileCoord>,
        cache: &TileCache,
        viewport: &Viewport,
        display_zoom: f64,
        canvas: &dyn TileCanvas,
    ) {
        let mut parents: Vec<TileCoord> = visible.iter().filter_map(|coord| coord.parent()).collect();
        parents.sort();
        parents.dedup();

        for parent in parents {
            if let Some(TileState::Loaded { texture, .. }) = cache.get(&parent) {
                let (x, y, w, h) = screen_rect_for_tile(parent, display_zoom, viewport);
                canvas.draw_textured_quad(*texture, (0.0, 0.0, 1.0, 1.0), (x, y, w * 2.0, h * 2.0), 1.0);
            }
        }
    }

    /// Pass 2: draw every visible tile, falling back to an ancestor's
    /// sub-region when not yet loaded (§4.J).
    fn render_foreground_pass(
        &self,
        visible: &fxhash::FxHashSet<TileCoord>,
        cache: &TileCache,
        viewport: &Viewport,
        display_zoom: f64,
        canvas: &dyn TileCanvas,
    ) {
        for &coord in visible {
            let dst = screen_rect_for_tile(coord, display_zoom, viewport);
            match cache.get(&coord) {
                Some(TileState::Loaded { texture, .. }) => {
                    canvas.draw_textured_quad(*texture, (0.0, 0.0, 1.0, 1.0), dst, 1.0);
                }
                _ => {
                    if let Some((ancestor, _d, src)) = find_parent_fallback(coord, cache, self.max_fallback_levels) {
                        if let Some(TileState::Loaded { texture, .. }) = cache.get(&ancestor) {
                            canvas.draw_textured_quad(*texture, src, dst, 1.0);
                        }
                    }
                }
            }
        }
    }
}

impl Default for RenderWalker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::LatLng;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingCanvas {
        draws: RefCell<Vec<(TextureHandle, (f64, f64, f64, f64))>>,
    }

    impl TileCanvas for RecordingCanvas {
        fn draw_textured_quad(
            &self,
            texture: TextureHandle,
            src: (f64, f64, f64, f64),
            _dst: (f64, f64, f64, f64),
            _alpha: f64,
        ) {
            self.draws.borrow_mut().push((texture, src));
        }
    }

    fn sample_bytes() -> crate::cache::TileBytes {
        std::sync::Arc::new(vec![0u8])
    }

    #[test]
    fn loaded_tile_draws_with_full_uv_rect() {
        let viewport = Viewport::new(LatLng::new(0.0, 0.0), 4, 800, 600, 256);
        let mut cache = TileCache::new();
        let coord = TileCoord::from_lat_lng(&viewport.center, viewport.zoom);
        cache.insert(coord, TileState::Loaded { texture: TextureHandle(7), bytes: sample_bytes() });

        let mut visible = fxhash::FxHashSet::default();
        visible.insert(coord);

        let canvas = RecordingCanvas::default();
        let walker = RenderWalker::new();
        walker.render(&visible, &cache, &viewport, viewport.zoom as f64, &canvas);

        let draws = canvas.draws.borrow();
        assert!(draws.iter().any(|(tex, src)| *tex == TextureHandle(7) && *src == (0.0, 0.0, 1.0, 1.0)));
    }

    #[test]
    fn unloaded_tile_falls_back_to_loaded_grandparent_subregion() {
        let viewport = Viewport::new(LatLng::new(0.0, 0.0), 6, 800, 600, 256);
        let mut cache = TileCache::new();
        let coord = TileCoord::from_lat_lng(&viewport.center, viewport.zoom);
        let grandparent = coord.parent().unwrap().parent().unwrap();
        cache.insert(grandparent, TileState::Loaded { texture: TextureHandle(3), bytes: sample_bytes() });

        let mut visible = fxhash::FxHashSet::default();
        visible.insert(coord);

        let canvas = RecordingCanvas::default();
        let walker = RenderWalker::new();
        walker.render(&visible, &cache, &viewport, viewport.zoom as f64, &canvas);

        let draws = canvas.draws.borrow();
        assert!(draws.iter().any(|(tex, src)| *tex == TextureHandle(3) && src.2 == 0.25));
    }

    #[test]
    fn fallback_beyond_max_levels_draws_nothing() {
        let viewport = Viewport::new(LatLng::new(0.0, 0.0), 6, 800, 600, 256);
        let cache = TileCache::new();
        let coord = TileCoord::from_lat_lng(&viewport.center, viewport.zoom);

        let mut visible = fxhash::FxHashSet::default();
        visible.insert(coord);

        let canvas = RecordingCanvas::default();
        let walker = RenderWalker::new();
        walker.render(&visible, &cache, &viewport, viewport.zoom as f64, &canvas);

        assert!(canvas.draws.borrow().is_empty());
    }
}
