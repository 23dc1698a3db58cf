//! Web Mercator projection and tile-coordinate algebra (component A).

use crate::constants::MAX_LATITUDE;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// A geographic coordinate. Latitude is clamped to `[-85, 85]` (the Web
/// Mercator representable range); longitude is wrapped into `[-180, 180]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat: Self::clamp_lat(lat),
            lng: Self::wrap_lng(lng),
        }
    }

    /// Like `new`, but does not clamp/wrap — used internally where a value
    /// is already known to be in range and the cost of re-validating would
    /// be wasted (e.g. results of the projection inverse).
    pub fn new_unchecked(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn wrap_lng(lng: f64) -> f64 {
        let wrapped = lng % 360.0;
        if wrapped > 180.0 {
            wrapped - 360.0
        } else if wrapped < -180.0 {
            wrapped + 360.0
        } else {
            wrapped
        }
    }

    pub fn clamp_lat(lat: f64) -> f64 {
        lat.clamp(-MAX_LATITUDE, MAX_LATITUDE)
    }
}

impl Default for LatLng {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// A point in pixel/screen space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A fractional tile-space coordinate — the continuous analogue of
/// `TileCoord`, used by the zoom animator and the viewport's buffered/visible
/// tile enumeration before flooring to integers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileFrac {
    pub tx: f64,
    pub ty: f64,
}

/// `geo_to_tile_frac` (§4.A): projects a geographic point to fractional tile
/// coordinates at zoom `z_f`, which need not be an integer.
pub fn geo_to_tile_frac(lat: f64, lng: f64, z_f: f64) -> TileFrac {
    let n = 2f64.powf(z_f);
    let lat_rad = LatLng::clamp_lat(lat).to_radians();
    let tx = (lng + 180.0) / 360.0 * n;
    let ty = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n;
    TileFrac { tx, ty }
}

/// `tile_frac_to_geo` (§4.A): the inverse of `geo_to_tile_frac`.
pub fn tile_frac_to_geo(tx: f64, ty: f64, z_f: f64) -> LatLng {
    let n = 2f64.powf(z_f);
    let lng = tx / n * 360.0 - 180.0;
    let lat_rad = (PI * (1.0 - 2.0 * ty / n)).sinh().atan();
    LatLng::new_unchecked(lat_rad.to_degrees(), lng)
}

/// Integer tile coordinate, `(x, y, z)` with `z ∈ [0, 19]` and
/// `x, y ∈ [0, 2^z - 1]`. Hashable and totally ordered by `(z, y, x)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub z: u8,
    pub y: u32,
    pub x: u32,
}

impl TileCoord {
    pub fn new(x: u32, y: u32, z: u8) -> Self {
        Self { x, y, z }
    }

    /// The checked counterpart to `new`, for coordinates arriving from
    /// outside the engine (parsed from a request, loaded from a saved view)
    /// rather than computed by `from_lat_lng`/`parent`/`children`, which can
    /// never produce an out-of-range result.
    pub fn checked_new(x: u32, y: u32, z: u8) -> crate::error::Result<Self> {
        let coord = Self::new(x, y, z);
        if coord.is_valid() {
            Ok(coord)
        } else {
            Err(crate::error::MapError::InvalidCoordinate(format!(
                "tile ({x}, {y}) out of range at zoom {z}"
            )))
        }
    }

    /// `tile_at` (§4.A): floor of `geo_to_tile_frac` at integer zoom `z`.
    pub fn from_lat_lng(pos: &LatLng, z: u8) -> Self {
        let frac = geo_to_tile_frac(pos.lat, pos.lng, z as f64);
        let n = 1u32 << z;
        let x = (frac.tx.floor() as i64).rem_euclid(n as i64) as u32;
        let y = (frac.ty.floor() as i64).clamp(0, n as i64 - 1) as u32;
        Self::new(x, y, z)
    }

    /// The north-west corner of the tile. Round-tripping a geo point through
    /// `from_lat_lng` then `to_lat_lng` recovers this corner, not the
    /// original point — see §4.A.
    pub fn to_lat_lng(&self) -> LatLng {
        tile_frac_to_geo(self.x as f64, self.y as f64, self.z as f64)
    }

    pub fn parent(&self) -> Option<TileCoord> {
        if self.z == 0 {
            None
        } else {
            Some(TileCoord::new(self.x / 2, self.y / 2, self.z - 1))
        }
    }

    /// Walks up to `levels` ancestors, stopping early at `z == 0`.
    pub fn ancestors(&self, levels: u32) -> Vec<TileCoord> {
        let mut out = Vec::new();
        let mut cur = *self;
        for _ in 0..levels {
            match cur.parent() {
                Some(p) => {
                    out.push(p);
                    cur = p;
                }
                None => break,
            }
        }
        out
    }

    pub fn children(&self) -> Vec<TileCoord> {
        if self.z >= crate::constants::MAX_ZOOM {
            return Vec::new();
        }
        let z = self.z + 1;
        vec![
            TileCoord::new(self.x * 2, self.y * 2, z),
            TileCoord::new(self.x * 2 + 1, self.y * 2, z),
            TileCoord::new(self.x * 2, self.y * 2 + 1, z),
            TileCoord::new(self.x * 2 + 1, self.y * 2 + 1, z),
        ]
    }

    pub fn is_valid(&self) -> bool {
        if self.z > crate::constants::MAX_ZOOM {
            return false;
        }
        let n = 1u32 << self.z;
        self.x < n && self.y < n
    }

    /// Wraps an x coordinate (possibly negative or out of range) into
    /// `[0, 2^z - 1]`. Longitude is cyclic; `y` never wraps (§9).
    pub fn wrap_x(x: i64, z: u8) -> u32 {
        let n = 1i64 << z;
        x.rem_euclid(n) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_round_trip_recovers_tile_nw_corner() {
        let pos = LatLng::new(40.7128, -74.0060);
        for z in [0u8, 5, 10, 18, 19] {
            let tile = TileCoord::from_lat_lng(&pos, z);
            let nw = tile.to_lat_lng();
            let frac = geo_to_tile_frac(nw.lat, nw.lng, z as f64);
            assert!((frac.tx - tile.x as f64).abs() < 1e-6);
            assert!((frac.ty - tile.y as f64).abs() < 1e-6);
        }
    }

    #[test]
    fn geo_tile_geo_round_trip() {
        for &(lat, lng) in &[(0.0, 0.0), (51.5, -0.1), (-33.8, 151.2), (84.0, 179.9)] {
            for z in [2u8, 10, 19] {
                let frac = geo_to_tile_frac(lat, lng, z as f64);
                let back = tile_frac_to_geo(frac.tx, frac.ty, z as f64);
                assert!((back.lat - LatLng::clamp_lat(lat)).abs() < 1e-6);
                assert!((back.lng - lng).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn every_child_reports_its_parent() {
        for &(x, y, z) in &[(0u32, 0u32, 0u8), (12, 7, 8), (1234, 5678, 12)] {
            let coord = TileCoord::new(x, y, z);
            for child in coord.children() {
                assert_eq!(child.parent(), Some(coord));
            }
        }
    }

    #[test]
    fn x_wraps_but_y_does_not() {
        assert_eq!(TileCoord::wrap_x(-1, 4), 15);
        assert_eq!(TileCoord::wrap_x(16, 4), 0);
        assert_eq!(TileCoord::wrap_x(5, 4), 5);
    }

    #[test]
    fn root_tile_has_no_parent() {
        assert_eq!(TileCoord::new(0, 0, 0).parent(), None);
    }

    #[test]
    fn max_zoom_tile_has_no_children() {
        assert!(TileCoord::new(0, 0, crate::constants::MAX_ZOOM)
            .children()
            .is_empty());
    }

    #[test]
    fn checked_new_rejects_out_of_range_xy() {
        assert!(TileCoord::checked_new(0, 0, 3).is_ok());
        let err = TileCoord::checked_new(8, 0, 3).unwrap_err();
        assert!(matches!(err, crate::error::MapError::InvalidCoordinate(_)));
    }
}
