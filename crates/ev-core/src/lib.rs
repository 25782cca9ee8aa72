//! Core functionality for the electrophysiology viewer
//!
//! This crate provides the time-window mapping, cursor navigation and the
//! per-viewer style state shared by the data and view layers.

pub mod navigation;
pub mod state;

// Re-export commonly used types
pub use navigation::{
    NavigationEngine, PlaybackControl, TimeWindow,
    DEFAULT_ANCHOR_RATIO, DEFAULT_REFRESH_INTERVAL,
};
pub use state::{
    color_to_hex, parse_color, ChannelParams, ParamsError, StyleBinding, ViewerParams,
};
