//! Headless driver loop for the `tilengine` map engine. There is no GPU
//! surface or windowing layer here — `StubDecoder`/`IdleSource` satisfy the
//! engine's collaborator contracts (§6.1) with no-ops so the orchestrator
//! and render walker can run standalone, the same way the teacher's
//! `examples/headless.rs` drives `Map` without `eframe`.

use std::sync::Arc;
use tilengine::prelude::*;

struct StubDecoder;

impl TextureDecoder for StubDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<TextureHandle> {
        Ok(TextureHandle(bytes.len() as u64))
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

struct NullCanvas;

impl TileCanvas for NullCanvas {
    fn draw_textured_quad(
        &self,
        _texture: TextureHandle,
        _src_xywh: (f64, f64, f64, f64),
        _dst_xywh: (f64, f64, f64, f64),
        _alpha: f64,
    ) {
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let center = LatLng::new(37.7749, -122.4194);
    let viewport = Viewport::new(center, 12, 1280, 720, 256);

    let mut map = MapState::new(
        viewport,
        MapBounds::default(),
        MapPerformanceProfile::Balanced.resolve(),
        Arc::new(CartoDarkProvider::new()),
        Arc::new(StubDecoder),
    );

    let walker = RenderWalker::new();
    let canvas = NullCanvas;
    let mut ticker = tokio::time::interval(std::time::Duration::from_millis(16));

    let run_frames = std::env::var("TILENGINE_DEMO_FRAMES")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(120);

    for frame in 0..run_frames {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => break,
        }

        map.update_frame(&IdleSource);

        let visible = map.viewport.visible_tiles_with_buffer(0);
        walker.render(&visible, &map.cache, &map.viewport, map.zoom.display_zoom, &canvas);

        if frame % 30 == 0 {
            log::info!(
                "frame {frame}: tau={} loaded={} center=({:.4},{:.4}) zoom={}",
                map.tau,
                map.cache.len(),
                map.viewport.center.lat,
                map.viewport.center.lng,
                map.viewport.zoom
            );
        }
    }

    Ok(())
}
