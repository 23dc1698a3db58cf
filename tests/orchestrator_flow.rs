//! End-to-end frame-driving tests against mock collaborators, in the place
//! and style the teacher's `tests/integration_tests.rs` drove `Map` — but
//! against `TextureDecoder`/`InputSource` mocks instead of `egui` (§10.4).

use std::sync::Arc;
use tilengine::prelude::*;

struct CountingDecoder {
    decodes: std::sync::atomic::AtomicU64,
}

impl CountingDecoder {
    fn new() -> Self {
        Self { decodes: std::sync::atomic::AtomicU64::new(0) }
    }
}

impl TextureDecoder for CountingDecoder {
    fn decode(&self, _bytes: &[u8]) -> Result<TextureHandle> {
        let n = self.decodes.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Ok(TextureHandle(n))
    }

    fn destroy(&self, _texture: TextureHandle) {}
}

struct IdleSource;

impl InputSource for IdleSource {
    fn pointer_position(&self) -> Point {
        Point::new(0.0, 0.0)
    }
    fn pointer_button_down(&self) -> bool {
        false
    }
    fn scroll_delta_y(&self) -> f64 {
        0.0
    }
    fn pressed_key(&self) -> Option<Key> {
        None
    }
}

fn new_state() -> MapState {
    let viewport = Viewport::new(LatLng::new(37.7749, -122.4194), 10, 800, 600, 256);
    MapState::new(
        viewport,
        MapBounds::default(),
        MapPerformanceProfile::ForTesting.resolve(),
        Arc::new(CartoDarkProvider::new()),
        Arc::new(CountingDecoder::new()),
    )
}

#[tokio::test]
async fn frames_advance_tau_monotonically_with_idle_input() {
    let mut map = new_state();
    for expected in 1..=10u64 {
        map.update_frame(&IdleSource);
        assert_eq!(map.tau, expected);
    }
}

#[tokio::test]
async fn home_key_restores_initial_view_after_navigation() {
    struct HomeKeySource;
    impl InputSource for HomeKeySource {
        fn pointer_position(&self) -> Point {
            Point::new(0.0, 0.0)
        }
        fn pointer_button_down(&self) -> bool {
            false
        }
        fn scroll_delta_y(&self) -> f64 {
            0.0
        }
        fn pressed_key(&self) -> Option<Key> {
            Some(Key::Home)
        }
    }

    let mut map = new_state();
    let initial_center = map.viewport.center;
    let initial_zoom = map.viewport.zoom;

    map.viewport.center = LatLng::new(10.0, 10.0);
    map.viewport.zoom = 5;

    map.update_frame(&HomeKeySource);

    assert_eq!(map.viewport.center.lat, initial_center.lat);
    assert_eq!(map.viewport.center.lng, initial_center.lng);
    assert_eq!(map.viewport.zoom, initial_zoom);
}

#[tokio::test]
async fn repeated_frames_do_not_panic_with_no_network_available() {
    // Exercises the full step 1-11 sequence repeatedly; fetches will fail
    // (no real network in the test sandbox) and should settle into
    // Failed/Retrying states rather than panicking the orchestrator.
    let mut map = new_state();
    for _ in 0..5 {
        map.update_frame(&IdleSource);
    }
    assert!(map.tau >= 5);
}
