//! The smooth zoom animator (component G): advances a fractional
//! `display_zoom` toward an integer `target_zoom`, recomputing the center
//! every step so the anchor point's screen position stays fixed.

use crate::core::config::AnimationConfig;
use crate::core::geo::{geo_to_tile_frac, tile_frac_to_geo, LatLng, Point};
use crate::core::viewport::Viewport;
use crate::easing::Easing;

/// The screen-pixel/geo-point pair captured when a zoom animation begins.
#[derive(Debug, Clone, Copy)]
pub struct Anchor {
    pub lat: f64,
    pub lng: f64,
    pub screen_x: f64,
    pub screen_y: f64,
}

pub struct ZoomAnimator {
    pub target_zoom: u8,
    pub display_zoom: f64,
    pub anchor: Anchor,
    pub is_animating: bool,
    pub easing: Easing,
}

impl ZoomAnimator {
    pub fn at_rest(zoom: u8) -> Self {
        Self {
            target_zoom: zoom,
            display_zoom: zoom as f64,
            anchor: Anchor {
                lat: 0.0,
                lng: 0.0,
                screen_x: 0.0,
                screen_y: 0.0,
            },
            is_animating: false,
            easing: Easing::default(),
        }
    }

    /// Begins an animation toward `target_zoom`, capturing `anchor` as the
    /// screen/geo pair to keep fixed. Called by the input mapper on scroll
    /// (§4.H) if not already animating.
    pub fn begin(&mut self, target_zoom: u8, anchor: Anchor) {
        self.target_zoom = target_zoom;
        self.anchor = anchor;
        self.is_animating = true;
    }

    /// Retargets an in-flight animation without recapturing the anchor —
    /// successive scroll events before the debounce window elapses keep the
    /// original anchor (§4.H: "if not already animating, capture...").
    pub fn retarget(&mut self, target_zoom: u8) {
        self.target_zoom = target_zoom;
    }

    /// Advances one frame (§4.G). Mutates `viewport.center` and
    /// `viewport.zoom` in place; returns whether the animation is still
    /// in flight after this step.
    pub fn step(&mut self, viewport: &mut Viewport, config: &AnimationConfig) -> bool {
        if !self.is_animating {
            return false;
        }

        let target_f = self.target_zoom as f64;
        if (target_f - self.display_zoom).abs() < config.snap_threshold {
            self.display_zoom = target_f;
            self.is_animating = false;
        } else {
            let progress = config.lerp_factor;
            let shaped = self.easing.apply(progress);
            self.display_zoom += (target_f - self.display_zoom) * shaped;
        }

        self.recenter_on_anchor(viewport);
        viewport.zoom = (self.display_zoom.floor() as i64).clamp(0, crate::constants::MAX_ZOOM as i64) as u8;

        self.is_animating
    }

    /// `center_for_anchor` (§4.G): recomputes `viewport.center` so the
    /// anchor's geographic point still projects to `anchor_screen` at the
    /// current `display_zoom`.
    fn recenter_on_anchor(&self, viewport: &mut Viewport) {
        let anchor_frac = geo_to_tile_frac(self.anchor.lat, self.anchor.lng, self.display_zoom);
        let dtx = (self.anchor.screen_x - viewport.screen_w as f64 / 2.0) / viewport.tile_size as f64;
        let dty = (self.anchor.screen_y - viewport.screen_h as f64 / 2.0) / viewport.tile_size as f64;
        viewport.center = tile_frac_to_geo(anchor_frac.tx - dtx, anchor_frac.ty - dty, self.display_zoom);
    }

    /// Screen projection of the anchor at the current `display_zoom` — used
    /// to verify the anchor-fixity invariant (§4.G, §8).
    pub fn anchor_screen_projection(&self, viewport: &Viewport) -> Point {
        let center = geo_to_tile_frac(viewport.center.lat, viewport.center.lng, self.display_zoom);
        let anchor_frac = geo_to_tile_frac(self.anchor.lat, self.anchor.lng, self.display_zoom);
        Point::new(
            viewport.screen_w as f64 / 2.0 + (anchor_frac.tx - center.tx) * viewport.tile_size as f64,
            viewport.screen_h as f64 / 2.0 + (anchor_frac.ty - center.ty) * viewport.tile_size as f64,
        )
    }
}
