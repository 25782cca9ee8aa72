//! Navigation engine implementation

use std::sync::Arc;
use std::time::{Duration, Instant};
use parking_lot::RwLock;

/// Minimum spacing between two cursor positions released for refresh
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(40);

/// Playback settings
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackControl {
    pub playing: bool,
    /// Seconds of recording per second of wall clock; negative plays backwards
    pub speed: f64,
    pub looping: bool,
}

impl Default for PlaybackControl {
    fn default() -> Self {
        Self {
            playing: false,
            speed: 1.0,
            looping: false,
        }
    }
}

/// Navigation state stored internally
#[derive(Debug, Clone)]
struct NavigationState {
    position: f64,
    t_start: f64,
    t_stop: f64,
    control: PlaybackControl,
    /// Position moved since the last release
    dirty: bool,
    last_release: Option<Instant>,
}

/// Shared time cursor for every viewer showing the same recording.
///
/// Moves are coalesced: `take_pending` hands out at most one position per
/// refresh interval, so a burst of scrubbing turns into a handful of fetches
/// instead of one per input event.
#[derive(Clone)]
pub struct NavigationEngine {
    state: Arc<RwLock<NavigationState>>,
    min_interval: Duration,
}

impl NavigationEngine {
    /// Create an engine over `[t_start, t_stop]` with the cursor at `t_start`
    pub fn new(t_start: f64, t_stop: f64) -> Self {
        let (t_start, t_stop) = ordered(t_start, t_stop);
        let state = NavigationState {
            position: t_start,
            t_start,
            t_stop,
            control: PlaybackControl::default(),
            dirty: true,
            last_release: None,
        };

        Self {
            state: Arc::new(RwLock::new(state)),
            min_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// Update the navigable range (e.g., when a source is added)
    pub fn update_bounds(&self, t_start: f64, t_stop: f64) {
        let (t_start, t_stop) = ordered(t_start, t_stop);
        let mut state = self.state.write();
        state.t_start = t_start;
        state.t_stop = t_stop;
        let clamped = state.position.clamp(t_start, t_stop);
        if clamped != state.position {
            state.position = clamped;
            state.dirty = true;
        }
    }

    pub fn position(&self) -> f64 {
        self.state.read().position
    }

    pub fn bounds(&self) -> (f64, f64) {
        let state = self.state.read();
        (state.t_start, state.t_stop)
    }

    /// Move the cursor, clamped into the navigable range
    pub fn seek_to(&self, t: f64) {
        if !t.is_finite() {
            tracing::warn!("Ignoring non-finite seek target {}", t);
            return;
        }
        let mut state = self.state.write();
        let target = t.clamp(state.t_start, state.t_stop);
        if target != state.position {
            state.position = target;
            state.dirty = true;
        }
    }

    /// Move the cursor by `dt` seconds
    pub fn step(&self, dt: f64) {
        let position = self.position();
        self.seek_to(position + dt);
    }

    pub fn play(&self) {
        self.state.write().control.playing = true;
    }

    pub fn pause(&self) {
        self.state.write().control.playing = false;
    }

    pub fn set_speed(&self, speed: f64) {
        self.state.write().control.speed = speed;
    }

    pub fn set_looping(&self, looping: bool) {
        self.state.write().control.looping = looping;
    }

    pub fn control(&self) -> PlaybackControl {
        self.state.read().control.clone()
    }

    /// Advance playback by `elapsed` wall-clock time.
    ///
    /// Reaching either end stops playback, or wraps around when looping.
    pub fn advance(&self, elapsed: Duration) {
        let mut state = self.state.write();
        if !state.control.playing {
            return;
        }

        let span = state.t_stop - state.t_start;
        let mut next = state.position + elapsed.as_secs_f64() * state.control.speed;

        if next > state.t_stop || next < state.t_start {
            if state.control.looping && span > 0.0 {
                next = state.t_start + (next - state.t_start).rem_euclid(span);
            } else {
                next = next.clamp(state.t_start, state.t_stop);
                state.control.playing = false;
                tracing::debug!("Playback reached the end of the recording at {:.3}s", next);
            }
        }

        if next != state.position {
            state.position = next;
            state.dirty = true;
        }
    }

    /// Release the cursor for a refresh if it moved and the interval elapsed
    pub fn take_pending(&self, now: Instant) -> Option<f64> {
        let mut state = self.state.write();
        if !state.dirty {
            return None;
        }
        if let Some(last) = state.last_release {
            if now.saturating_duration_since(last) < self.min_interval {
                return None;
            }
        }
        state.dirty = false;
        state.last_release = Some(now);
        Some(state.position)
    }
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b { (a, b) } else { (b, a) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seek_clamps_to_bounds() {
        let engine = NavigationEngine::new(0.0, 10.0);
        engine.seek_to(12.0);
        assert_eq!(engine.position(), 10.0);
        engine.seek_to(-3.0);
        assert_eq!(engine.position(), 0.0);
        engine.step(2.5);
        assert_eq!(engine.position(), 2.5);
    }

    #[test]
    fn test_take_pending_coalesces_moves() {
        let engine = NavigationEngine::new(0.0, 100.0)
            .with_refresh_interval(Duration::from_millis(50));
        let start = Instant::now();

        assert_eq!(engine.take_pending(start), Some(0.0));
        assert_eq!(engine.take_pending(start), None);

        engine.seek_to(1.0);
        engine.seek_to(2.0);
        engine.seek_to(3.0);
        // Too soon after the previous release
        assert_eq!(engine.take_pending(start + Duration::from_millis(10)), None);
        // Only the latest position comes out
        assert_eq!(engine.take_pending(start + Duration::from_millis(60)), Some(3.0));
        assert_eq!(engine.take_pending(start + Duration::from_millis(200)), None);
    }

    #[test]
    fn test_playback_stops_at_end() {
        let engine = NavigationEngine::new(0.0, 1.0);
        engine.set_speed(2.0);
        engine.play();
        engine.advance(Duration::from_millis(250));
        assert!((engine.position() - 0.5).abs() < 1e-9);
        engine.advance(Duration::from_secs(1));
        assert_eq!(engine.position(), 1.0);
        assert!(!engine.control().playing);
    }

    #[test]
    fn test_playback_loops() {
        let engine = NavigationEngine::new(0.0, 4.0);
        engine.set_looping(true);
        engine.seek_to(3.0);
        engine.play();
        engine.advance(Duration::from_secs(2));
        assert!((engine.position() - 1.0).abs() < 1e-9);
        assert!(engine.control().playing);
    }

    #[test]
    fn test_paused_engine_does_not_move() {
        let engine = NavigationEngine::new(0.0, 4.0);
        engine.advance(Duration::from_secs(2));
        assert_eq!(engine.position(), 0.0);
    }

    #[test]
    fn test_update_bounds_pulls_cursor_inside() {
        let engine = NavigationEngine::new(0.0, 10.0);
        engine.seek_to(9.0);
        let now = Instant::now();
        engine.take_pending(now);
        engine.update_bounds(0.0, 5.0);
        assert_eq!(engine.position(), 5.0);
        assert_eq!(engine.take_pending(now + Duration::from_secs(1)), Some(5.0));
    }
}
