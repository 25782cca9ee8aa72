//! Time navigation: window mapping and the cursor engine

mod engine;
mod window;

pub use engine::{NavigationEngine, PlaybackControl, DEFAULT_REFRESH_INTERVAL};
pub use window::{TimeWindow, DEFAULT_ANCHOR_RATIO};
