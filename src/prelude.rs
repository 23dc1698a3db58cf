//! Common imports for consumers of this crate.

pub use crate::cache::{TextureHandle, TileBytes, TileCache, TileState};
pub use crate::core::{
    bounds::MapBounds,
    config::{MapConfig, MapPerformanceProfile},
    geo::{LatLng, Point, TileCoord, TileFrac},
    viewport::Viewport,
};
pub use crate::disk_cache::DiskCacheIndex;
pub use crate::easing::Easing;
pub use crate::fetch::{CancelFlag, FetchEngine, FetchOutcome, FetchResult, TextureDecoder};
pub use crate::input::{InputMapper, InputSource, Key};
pub use crate::orchestrator::MapState;
pub use crate::provider::{CartoDarkProvider, TileSource, UrlTemplateProvider};
pub use crate::render::{RenderWalker, TileCanvas};
pub use crate::retry::RetryState;
pub use crate::zoom::{Anchor, ZoomAnimator};
pub use crate::{Error, MapError, Result};

pub use fxhash::{FxHashMap, FxHashSet};
pub use std::sync::Arc;
