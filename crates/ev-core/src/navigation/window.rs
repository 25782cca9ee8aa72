use serde::{Deserialize, Serialize};

/// Fraction of the visible window placed before the cursor
pub const DEFAULT_ANCHOR_RATIO: f64 = 0.3;

/// A `[t_start, t_stop)` time range, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub t_start: f64,
    pub t_stop: f64,
}

impl TimeWindow {
    pub fn new(t_start: f64, t_stop: f64) -> Self {
        Self { t_start, t_stop }
    }

    /// Map a cursor time to the window shown around it.
    ///
    /// `xsize * ratio` seconds end up before `t` and the remainder after it.
    /// No clamping happens here: sources clamp when asked for data outside
    /// their own bounds.
    pub fn around(t: f64, xsize: f64, ratio: f64) -> Self {
        Self {
            t_start: t - xsize * ratio,
            t_stop: t + xsize * (1.0 - ratio),
        }
    }

    pub fn duration(&self) -> f64 {
        self.t_stop - self.t_start
    }

    pub fn is_valid(&self) -> bool {
        self.t_start <= self.t_stop
    }

    /// Whether `[start, stop)` shares any time with this window
    pub fn overlaps(&self, start: f64, stop: f64) -> bool {
        start < self.t_stop && stop > self.t_start
    }
}
