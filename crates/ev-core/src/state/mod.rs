//! Per-viewer style state
//!
//! `ViewerParams` is owned by the UI layer. The render path only ever reads
//! it through the `StyleBinding` trait.

use egui::Color32;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::navigation::DEFAULT_ANCHOR_RATIO;

/// Default trace/epoch color for a channel
pub const DEFAULT_CHANNEL_COLOR: Color32 = Color32::from_rgb(0x55, 0xFF, 0x00);

/// Errors raised while editing or loading viewer parameters
#[derive(Error, Debug)]
pub enum ParamsError {
    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("Anchor ratio must lie strictly between 0 and 1, got {0}")]
    InvalidAnchorRatio(f64),

    #[error("Channel {channel} out of range (nb_channel: {nb_channel})")]
    UnknownChannel { channel: usize, nb_channel: usize },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read-only view of the style state consumed by the render step
pub trait StyleBinding {
    /// Visible channel indices, in display order
    fn visible_channels(&self) -> Vec<usize>;

    fn color(&self, channel: usize) -> Color32;

    fn display_labels(&self) -> bool;

    /// Width of the visible window in seconds
    fn xsize(&self) -> f64;

    fn background_color(&self) -> Color32;

    fn anchor_ratio(&self) -> f64 {
        DEFAULT_ANCHOR_RATIO
    }
}

/// Style of a single channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelParams {
    pub color: Color32,
    pub visible: bool,
}

impl Default for ChannelParams {
    fn default() -> Self {
        Self {
            color: DEFAULT_CHANNEL_COLOR,
            visible: true,
        }
    }
}

/// Global and per-channel parameters of one viewer
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerParams {
    xsize: f64,
    background_color: Color32,
    display_labels: bool,
    anchor_ratio: f64,
    channels: Vec<ChannelParams>,
}

/// Serialized form, colors as hex strings
#[derive(Debug, Serialize, Deserialize)]
struct ParamsConfig {
    xsize: f64,
    background_color: String,
    display_labels: bool,
    #[serde(default = "default_anchor_ratio")]
    anchor_ratio: f64,
    #[serde(default)]
    channels: Vec<ChannelConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChannelConfig {
    color: String,
    visible: bool,
}

fn default_anchor_ratio() -> f64 {
    DEFAULT_ANCHOR_RATIO
}

impl ViewerParams {
    /// Defaults for a source with `nb_channel` channels
    pub fn new(nb_channel: usize) -> Self {
        Self {
            xsize: 3.0,
            background_color: Color32::BLACK,
            display_labels: true,
            anchor_ratio: DEFAULT_ANCHOR_RATIO,
            channels: vec![ChannelParams::default(); nb_channel],
        }
    }

    pub fn nb_channel(&self) -> usize {
        self.channels.len()
    }

    pub fn channel(&self, channel: usize) -> Option<&ChannelParams> {
        self.channels.get(channel)
    }

    /// Negative or non-finite sizes collapse to an empty window
    pub fn set_xsize(&mut self, xsize: f64) {
        self.xsize = if xsize.is_finite() { xsize.max(0.0) } else { 0.0 };
    }

    pub fn set_background_color(&mut self, color: Color32) {
        self.background_color = color;
    }

    pub fn set_display_labels(&mut self, display: bool) {
        self.display_labels = display;
    }

    pub fn set_anchor_ratio(&mut self, ratio: f64) -> Result<(), ParamsError> {
        if !(ratio > 0.0 && ratio < 1.0) {
            return Err(ParamsError::InvalidAnchorRatio(ratio));
        }
        self.anchor_ratio = ratio;
        Ok(())
    }

    pub fn set_color(&mut self, channel: usize, color: Color32) -> Result<(), ParamsError> {
        self.channel_mut(channel)?.color = color;
        Ok(())
    }

    pub fn set_visible(&mut self, channel: usize, visible: bool) -> Result<(), ParamsError> {
        self.channel_mut(channel)?.visible = visible;
        Ok(())
    }

    /// Show exactly the channels in `selected`, hide the rest
    pub fn set_visible_selection(&mut self, selected: &[usize]) -> Result<(), ParamsError> {
        let nb_channel = self.channels.len();
        if let Some(&channel) = selected.iter().find(|&&c| c >= nb_channel) {
            return Err(ParamsError::UnknownChannel { channel, nb_channel });
        }
        for (index, params) in self.channels.iter_mut().enumerate() {
            params.visible = selected.contains(&index);
        }
        Ok(())
    }

    fn channel_mut(&mut self, channel: usize) -> Result<&mut ChannelParams, ParamsError> {
        let nb_channel = self.channels.len();
        self.channels
            .get_mut(channel)
            .ok_or(ParamsError::UnknownChannel { channel, nb_channel })
    }

    /// Save configuration
    pub fn save_config(&self) -> Value {
        let config = ParamsConfig {
            xsize: self.xsize,
            background_color: color_to_hex(self.background_color),
            display_labels: self.display_labels,
            anchor_ratio: self.anchor_ratio,
            channels: self
                .channels
                .iter()
                .map(|c| ChannelConfig {
                    color: color_to_hex(c.color),
                    visible: c.visible,
                })
                .collect(),
        };
        serde_json::to_value(config).unwrap_or(Value::Null)
    }

    /// Load configuration, keeping the current channel count.
    ///
    /// Nothing is applied unless the whole document is valid.
    pub fn load_config(&mut self, config: Value) -> Result<(), ParamsError> {
        let config: ParamsConfig = serde_json::from_value(config)?;

        let mut loaded = self.clone();
        loaded.set_xsize(config.xsize);
        loaded.background_color = parse_color(&config.background_color)?;
        loaded.display_labels = config.display_labels;
        loaded.set_anchor_ratio(config.anchor_ratio)?;

        if config.channels.len() != loaded.channels.len() {
            tracing::warn!(
                "Config describes {} channels, viewer has {}; applying the overlap",
                config.channels.len(),
                loaded.channels.len()
            );
        }
        for (params, saved) in loaded.channels.iter_mut().zip(&config.channels) {
            params.color = parse_color(&saved.color)?;
            params.visible = saved.visible;
        }

        *self = loaded;
        Ok(())
    }
}

impl StyleBinding for ViewerParams {
    fn visible_channels(&self) -> Vec<usize> {
        self.channels
            .iter()
            .enumerate()
            .filter(|(_, c)| c.visible)
            .map(|(i, _)| i)
            .collect()
    }

    fn color(&self, channel: usize) -> Color32 {
        self.channels
            .get(channel)
            .map(|c| c.color)
            .unwrap_or(DEFAULT_CHANNEL_COLOR)
    }

    fn display_labels(&self) -> bool {
        self.display_labels
    }

    fn xsize(&self) -> f64 {
        self.xsize
    }

    fn background_color(&self) -> Color32 {
        self.background_color
    }

    fn anchor_ratio(&self) -> f64 {
        self.anchor_ratio
    }
}

/// Parse a color: single-letter names (`k`, `w`, `r`, ...) or
/// `RRGGBB` / `RRGGBBAA` hex with an optional leading `#`.
pub fn parse_color(text: &str) -> Result<Color32, ParamsError> {
    let text = text.trim();
    let named = match text {
        "k" => Some(Color32::BLACK),
        "w" => Some(Color32::WHITE),
        "r" => Some(Color32::from_rgb(255, 0, 0)),
        "g" => Some(Color32::from_rgb(0, 255, 0)),
        "b" => Some(Color32::from_rgb(0, 0, 255)),
        "c" => Some(Color32::from_rgb(0, 255, 255)),
        "m" => Some(Color32::from_rgb(255, 0, 255)),
        "y" => Some(Color32::from_rgb(255, 255, 0)),
        _ => None,
    };
    if let Some(color) = named {
        return Ok(color);
    }

    let hex = text.strip_prefix('#').unwrap_or(text);
    let invalid = || ParamsError::InvalidColor(text.to_string());
    if !hex.is_ascii() || (hex.len() != 6 && hex.len() != 8) {
        return Err(invalid());
    }

    let component = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
    let (r, g, b) = (component(0)?, component(2)?, component(4)?);
    let a = if hex.len() == 8 { component(6)? } else { 255 };
    Ok(Color32::from_rgba_unmultiplied(r, g, b, a))
}

/// Hex form understood by `parse_color`; alpha only when not opaque
pub fn color_to_hex(color: Color32) -> String {
    let [r, g, b, a] = color.to_srgba_unmultiplied();
    if a == 255 {
        format!("#{:02X}{:02X}{:02X}", r, g, b)
    } else {
        format!("#{:02X}{:02X}{:02X}{:02X}", r, g, b, a)
    }
}
