//! The viewport model (component B): screen ↔ tile ↔ geo conversions, and
//! the visible/buffered/fallback tile-set computations the orchestrator and
//! render walker build on.

use crate::core::geo::{geo_to_tile_frac, tile_frac_to_geo, LatLng, Point, TileCoord, TileFrac};
use fxhash::FxHashSet;
use std::collections::HashSet;

/// `{center_lat, center_lon, zoom: int, screen_w, screen_h, tile_size}` (§3).
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub center: LatLng,
    pub zoom: u8,
    pub screen_w: u32,
    pub screen_h: u32,
    pub tile_size: u32,
}

impl Viewport {
    pub fn new(center: LatLng, zoom: u8, screen_w: u32, screen_h: u32, tile_size: u32) -> Self {
        Self {
            center,
            zoom,
            screen_w,
            screen_h,
            tile_size,
        }
    }

    fn n(&self) -> f64 {
        2f64.powi(self.zoom as i32)
    }

    /// Fractional tile-space position of the viewport center.
    pub fn center_tile_frac(&self) -> TileFrac {
        geo_to_tile_frac(self.center.lat, self.center.lng, self.zoom as f64)
    }

    /// Converts a screen pixel to its geographic position at the current
    /// zoom.
    pub fn pixel_to_geo(&self, px: Point) -> LatLng {
        let center = self.center_tile_frac();
        let tx = center.tx + (px.x - self.screen_w as f64 / 2.0) / self.tile_size as f64;
        let ty = center.ty + (px.y - self.screen_h as f64 / 2.0) / self.tile_size as f64;
        tile_frac_to_geo(tx, ty, self.zoom as f64)
    }

    /// Converts a geographic position to its screen pixel at the current
    /// zoom.
    pub fn geo_to_pixel(&self, pos: LatLng) -> Point {
        let center = self.center_tile_frac();
        let frac = geo_to_tile_frac(pos.lat, pos.lng, self.zoom as f64);
        Point::new(
            self.screen_w as f64 / 2.0 + (frac.tx - center.tx) * self.tile_size as f64,
            self.screen_h as f64 / 2.0 + (frac.ty - center.ty) * self.tile_size as f64,
        )
    }

    /// `pixels_to_degrees` (§4.B). The cosine factor on the vertical axis is
    /// an approximation carried over intentionally — true Web Mercator's
    /// vertical scale is not `cos(lat)` but varies through `sec(lat)`'s
    /// integral. This keeps drag feel self-consistent with the projection
    /// inverse rather than "fixing" an asymmetry nothing else depends on
    /// (§9 open question).
    pub fn pixels_to_degrees(&self, dx: f64, dy: f64) -> (f64, f64) {
        let n = self.n();
        let lat_rad = self.center.lat.to_radians();
        let d_lon = dx * 360.0 / (n * self.tile_size as f64);
        let d_lat = dy * 360.0 * lat_rad.cos() / (n * self.tile_size as f64);
        (d_lon, d_lat)
    }

    /// `visible_tiles_with_buffer` (§4.B): the integer tile range covering
    /// the screen rectangle, expanded by `buffer` tiles on every edge. `x`
    /// wraps modulo `2^z`; `y` is clamped, never wrapped.
    pub fn visible_tiles_with_buffer(&self, buffer: i64) -> FxHashSet<TileCoord> {
        let center = self.center_tile_frac();
        let half_w = self.screen_w as f64 / 2.0 / self.tile_size as f64;
        let half_h = self.screen_h as f64 / 2.0 / self.tile_size as f64;

        let min_tx = (center.tx - half_w).floor() as i64 - buffer;
        let max_tx = (center.tx + half_w).ceil() as i64 + buffer;
        let min_ty = (center.ty - half_h).floor() as i64 - buffer;
        let max_ty = (center.ty + half_h).ceil() as i64 + buffer;

        let n = 1i64 << self.zoom;
        let mut out = FxHashSet::default();
        for ty in min_ty..=max_ty {
            if ty < 0 || ty >= n {
                continue;
            }
            for tx in min_tx..=max_tx {
                let x = TileCoord::wrap_x(tx, self.zoom);
                out.insert(TileCoord::new(x, ty as u32, self.zoom));
            }
        }
        out
    }

    /// `visible_tile_set_with_fallbacks` (§4.B): base ∪ parents ∪
    /// grandparents ∪ children, used to build the keep set.
    pub fn visible_tile_set_with_fallbacks(&self, buffer: i64) -> FxHashSet<TileCoord> {
        let base = self.visible_tiles_with_buffer(buffer);
        let mut out = base.clone();
        for coord in &base {
            if let Some(parent) = coord.parent() {
                out.insert(parent);
                if let Some(grandparent) = parent.parent() {
                    out.insert(grandparent);
                }
            }
            if coord.z < crate::constants::MAX_ZOOM {
                out.extend(coord.children());
            }
        }
        out
    }
}

/// Squared distance between two tile coordinates' fractional centers,
/// used to sort spawn priority (§4.I step 10b/10c).
pub fn squared_distance_frac(a: TileFrac, coord: &TileCoord) -> f64 {
    let dx = a.tx - (coord.x as f64 + 0.5);
    let dy = a.ty - (coord.y as f64 + 0.5);
    dx * dx + dy * dy
}

/// Order-independence helper for tests: two tile sets are equal regardless
/// of iteration order.
pub fn sets_equal(a: &FxHashSet<TileCoord>, b: &HashSet<TileCoord>) -> bool {
    a.len() == b.len() && a.iter().all(|c| b.contains(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_viewport() -> Viewport {
        Viewport::new(LatLng::new(37.7749, -122.4194), 12, 1280, 720, 512)
    }

    #[test]
    fn visible_tiles_contains_the_center_tile() {
        let vp = sample_viewport();
        let center = TileCoord::from_lat_lng(&vp.center, vp.zoom);
        let visible = vp.visible_tiles_with_buffer(0);
        assert!(visible.contains(&center));
    }

    #[test]
    fn buffer_expands_the_visible_set() {
        let vp = sample_viewport();
        let unbuffered = vp.visible_tiles_with_buffer(0);
        let buffered = vp.visible_tiles_with_buffer(3);
        assert!(buffered.len() >= unbuffered.len());
        assert!(unbuffered.iter().all(|c| buffered.contains(c)));
    }

    #[test]
    fn x_wraps_at_the_antimeridian() {
        let vp = Viewport::new(LatLng::new(0.0, 179.99), 4, 4000, 100, 256);
        let visible = vp.visible_tiles_with_buffer(1);
        let n = 1u32 << vp.zoom;
        assert!(visible.iter().all(|c| c.x < n));
    }

    #[test]
    fn y_never_exceeds_pole_bounds() {
        let vp = Viewport::new(LatLng::new(84.0, 0.0), 2, 4000, 4000, 256);
        let visible = vp.visible_tiles_with_buffer(5);
        let n = 1u32 << vp.zoom;
        assert!(visible.iter().all(|c| c.y < n));
    }

    #[test]
    fn fallback_set_includes_parents_and_children() {
        let vp = sample_viewport();
        let base = vp.visible_tiles_with_buffer(0);
        let with_fallbacks = vp.visible_tile_set_with_fallbacks(0);
        for coord in &base {
            if let Some(parent) = coord.parent() {
                assert!(with_fallbacks.contains(&parent));
            }
        }
    }

    #[test]
    fn pixel_geo_round_trip() {
        let vp = sample_viewport();
        let px = Point::new(100.0, 250.0);
        let geo = vp.pixel_to_geo(px);
        let back = vp.geo_to_pixel(geo);
        assert!((back.x - px.x).abs() < 1e-6);
        assert!((back.y - px.y).abs() < 1e-6);
    }
}
