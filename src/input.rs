//! The input mapper (component H): poll-based drag/scroll/keyboard handling.
//! Unlike the teacher's `input/handler.rs` event-registry/dispatch pipeline,
//! this reads a snapshot of input state once per frame — there is no
//! windowing surface here to emit discrete events from (§6.1 `InputSource`
//! is the only collaborator). Velocity smoothing is grounded in the
//! teacher's `input/gestures.rs` swipe-velocity tracking, adapted to the
//! spec's exponential-smoothing constants.

use crate::core::bounds::MapBounds;
use crate::core::config::MapConfig;
use crate::core::geo::{LatLng, Point};
use crate::core::viewport::Viewport;
use crate::zoom::{Anchor, ZoomAnimator};

/// A single polled keycode, consumed at most once per frame (§4.H).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    ZoomIn,
    ZoomOut,
    Digit(u8),
    Home,
}

/// One frame's worth of raw input, polled from the embedding application's
/// windowing layer (§6.1).
pub trait InputSource {
    fn pointer_position(&self) -> Point;
    fn pointer_button_down(&self) -> bool;
    fn scroll_delta_y(&self) -> f64;
    fn pressed_key(&self) -> Option<Key>;
}

struct DragState {
    start_screen: Point,
    start_center: LatLng,
}

/// Tracks drag/scroll/keyboard state across frames and applies it to a
/// `Viewport` and `ZoomAnimator` each frame (§4.H).
pub struct InputMapper {
    drag: Option<DragState>,
    velocity: Point,
    last_pointer: Option<Point>,
    initial_center: LatLng,
    initial_zoom: u8,
    pub last_zoom_change_frame: u64,
}

const VELOCITY_SMOOTHING: f64 = 0.8;
const VELOCITY_DECAY: f64 = 0.9;

impl InputMapper {
    pub fn new(initial_center: LatLng, initial_zoom: u8) -> Self {
        Self {
            drag: None,
            velocity: Point::new(0.0, 0.0),
            last_pointer: None,
            initial_center,
            initial_zoom,
            last_zoom_change_frame: 0,
        }
    }

    pub fn velocity(&self) -> Point {
        self.velocity
    }

    /// Applies one frame of polled input. `tau` is the current frame
    /// counter, used to stamp `last_zoom_change_frame` on scroll.
    pub fn apply_frame(
        &mut self,
        source: &dyn InputSource,
        viewport: &mut Viewport,
        zoom: &mut ZoomAnimator,
        bounds: &MapBounds,
        config: &MapConfig,
        tau: u64,
    ) {
        self.apply_drag(source, viewport, bounds);
        self.apply_scroll(source, viewport, zoom, tau);
        self.apply_keyboard(source, viewport, zoom, bounds, config);
    }

    fn apply_drag(&mut self, source: &dyn InputSource, viewport: &mut Viewport, bounds: &MapBounds) {
        let pointer = source.pointer_position();

        if source.pointer_button_down() {
            if self.drag.is_none() {
                self.drag = Some(DragState {
                    start_screen: pointer,
                    start_center: viewport.center,
                });
            }

            if let Some(last) = self.last_pointer {
                let dx = pointer.x - last.x;
                let dy = pointer.y - last.y;
                self.velocity.x = VELOCITY_SMOOTHING * self.velocity.x + (1.0 - VELOCITY_SMOOTHING) * dx;
                self.velocity.y = VELOCITY_SMOOTHING * self.velocity.y + (1.0 - VELOCITY_SMOOTHING) * dy;
            }

            if let Some(drag) = &self.drag {
                let total_dx = pointer.x - drag.start_screen.x;
                let total_dy = pointer.y - drag.start_screen.y;
                let (d_lon, d_lat) = viewport.pixels_to_degrees(-total_dx, total_dy);
                let mut center = LatLng::new(drag.start_center.lat + d_lat, drag.start_center.lng + d_lon);
                center = bounds.clamp_center(center);
                viewport.center = center;
            }

            self.last_pointer = Some(pointer);
        } else {
            if self.drag.is_some() {
                self.drag = None;
            }
            self.last_pointer = None;
            self.velocity.x *= VELOCITY_DECAY;
            self.velocity.y *= VELOCITY_DECAY;
        }
    }

    fn apply_scroll(
        &mut self,
        source: &dyn InputSource,
        viewport: &Viewport,
        zoom: &mut ZoomAnimator,
        tau: u64,
    ) {
        let wheel = source.scroll_delta_y();
        if wheel == 0.0 {
            return;
        }
        let delta = wheel.signum() as i32;
        let new_target = (zoom.target_zoom as i32 + delta).clamp(0, crate::constants::MAX_ZOOM as i32) as u8;

        if !zoom.is_animating {
            let cursor = source.pointer_position();
            let anchor_geo = viewport.pixel_to_geo(cursor);
            zoom.begin(
                new_target,
                Anchor {
                    lat: anchor_geo.lat,
                    lng: anchor_geo.lng,
                    screen_x: cursor.x,
                    screen_y: cursor.y,
                },
            );
        } else {
            zoom.retarget(new_target);
        }

        self.last_zoom_change_frame = tau;
    }

    fn apply_keyboard(
        &mut self,
        source: &dyn InputSource,
        viewport: &mut Viewport,
        zoom: &mut ZoomAnimator,
        bounds: &MapBounds,
        config: &MapConfig,
    ) {
        let Some(key) = source.pressed_key() else {
            return;
        };

        match key {
            Key::Up | Key::Down | Key::Left | Key::Right => {
                let speed = config.keyboard_pan_speed;
                let (dx, dy) = match key {
                    Key::Up => (0.0, -speed),
                    Key::Down => (0.0, speed),
                    Key::Left => (-speed, 0.0),
                    Key::Right => (speed, 0.0),
                    _ => unreachable!(),
                };
                let (d_lon, d_lat) = viewport.pixels_to_degrees(dx, dy);
                viewport.center = bounds.clamp_center(LatLng::new(
                    viewport.center.lat + d_lat,
                    viewport.center.lng + d_lon,
                ));
            }
            Key::ZoomIn => {
                let target = (viewport.zoom as i32 + 1).clamp(0, crate::constants::MAX_ZOOM as i32) as u8;
                viewport.zoom = bounds.clamp_zoom(target);
                zoom.display_zoom = viewport.zoom as f64;
                zoom.target_zoom = viewport.zoom;
                zoom.is_animating = false;
            }
            Key::ZoomOut => {
                let target = (viewport.zoom as i32 - 1).clamp(0, crate::constants::MAX_ZOOM as i32) as u8;
                viewport.zoom = bounds.clamp_zoom(target);
                zoom.display_zoom = viewport.zoom as f64;
                zoom.target_zoom = viewport.zoom;
                zoom.is_animating = false;
            }
            Key::Digit(n) => {
                let target = if n == 0 { 10 } else { n as u8 };
                let target = bounds.clamp_zoom(target);
                viewport.zoom = target;
                zoom.display_zoom = target as f64;
                zoom.target_zoom = target;
                zoom.is_animating = false;
            }
            Key::Home => {
                viewport.center = self.initial_center;
                viewport.zoom = self.initial_zoom;
                zoom.display_zoom = self.initial_zoom as f64;
                zoom.target_zoom = self.initial_zoom;
                zoom.is_animating = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::MapConfig;

    struct FakeSource {
        pointer: Point,
        button_down: bool,
        scroll: f64,
        key: Option<Key>,
    }

    impl InputSource for FakeSource {
        fn pointer_position(&self) -> Point {
            self.pointer
        }
        fn pointer_button_down(&self) -> bool {
            self.button_down
        }
        fn scroll_delta_y(&self) -> f64 {
            self.scroll
        }
        fn pressed_key(&self) -> Option<Key> {
            self.key
        }
    }

    fn viewport() -> Viewport {
        Viewport::new(LatLng::new(0.0, 0.0), 5, 800, 600, 256)
    }

    #[test]
    fn home_key_resets_to_initial_view() {
        let mut mapper = InputMapper::new(LatLng::new(10.0, 20.0), 7);
        let mut vp = viewport();
        let mut zoom = ZoomAnimator::at_rest(5);
        let bounds = MapBounds::default();
        let config = MapConfig::default();
        let source = FakeSource {
            pointer: Point::new(0.0, 0.0),
            button_down: false,
            scroll: 0.0,
            key: Some(Key::Home),
        };
        mapper.apply_frame(&source, &mut vp, &mut zoom, &bounds, &config, 0);
        assert_eq!(vp.center.lat, 10.0);
        assert_eq!(vp.center.lng, 20.0);
        assert_eq!(vp.zoom, 7);
    }

    #[test]
    fn scroll_updates_last_zoom_change_frame_every_time() {
        let mut mapper = InputMapper::new(LatLng::new(0.0, 0.0), 5);
        let mut vp = viewport();
        let mut zoom = ZoomAnimator::at_rest(5);
        let bounds = MapBounds::default();
        let config = MapConfig::default();
        let source = FakeSource {
            pointer: Point::new(400.0, 300.0),
            button_down: false,
            scroll: 1.0,
            key: None,
        };
        mapper.apply_frame(&source, &mut vp, &mut zoom, &bounds, &config, 42);
        assert_eq!(mapper.last_zoom_change_frame, 42);
        assert!(zoom.is_animating);
        assert_eq!(zoom.target_zoom, 6);
    }

    #[test]
    fn drag_translates_pixels_into_degrees_relative_to_start() {
        let mut mapper = InputMapper::new(LatLng::new(0.0, 0.0), 5);
        let mut vp = viewport();
        let mut zoom = ZoomAnimator::at_rest(5);
        let bounds = MapBounds::default();
        let config = MapConfig::default();

        let first = FakeSource { pointer: Point::new(400.0, 300.0), button_down: true, scroll: 0.0, key: None };
        mapper.apply_frame(&first, &mut vp, &mut zoom, &bounds, &config, 0);
        let start_center = vp.center;

        let second = FakeSource { pointer: Point::new(450.0, 300.0), button_down: true, scroll: 0.0, key: None };
        mapper.apply_frame(&second, &mut vp, &mut zoom, &bounds, &config, 1);
        assert_ne!(vp.center.lng, start_center.lng);
    }

    #[test]
    fn digit_key_sets_absolute_zoom_zero_means_ten() {
        let mut mapper = InputMapper::new(LatLng::new(0.0, 0.0), 5);
        let mut vp = viewport();
        let mut zoom = ZoomAnimator::at_rest(5);
        let bounds = MapBounds::default();
        let config = MapConfig::default();
        let source = FakeSource { pointer: Point::new(0.0, 0.0), button_down: false, scroll: 0.0, key: Some(Key::Digit(0)) };
        mapper.apply_frame(&source, &mut vp, &mut zoom, &bounds, &config, 0);
        assert_eq!(vp.zoom, 10);
    }
}
