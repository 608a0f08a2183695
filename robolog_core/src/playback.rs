//! Playback controller driving the cursor from a periodic timer.
//!
//! Playback keeps its own continuous clock (`current_time`, seconds since the
//! start of the log). Every tick advances the clock by `period * speed` and
//! moves the cursor forward until its sample time catches up.

use crate::cursor::Cursor;
use crate::log_file::TimeAxis;
use std::time::Duration;
use tracing::debug;

/// Default timer period.
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Paused,
    Running,
    /// The viewer is shutting down; no further state changes.
    Closed,
}

/// Periodic playback of a log.
#[derive(Debug, Clone)]
pub struct Playback {
    state: PlaybackState,
    /// Timer period
    pub period: Duration,
    /// Playback speed multiplier (1.0 = real time)
    pub speed: f64,
    current_time: f64,
}

impl Playback {
    pub fn new(period: Duration, speed: f64) -> Self {
        let speed = if speed.is_finite() && speed > 0.0 { speed } else { 1.0 };
        Self {
            state: PlaybackState::Paused,
            period,
            speed,
            current_time: 0.0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == PlaybackState::Running
    }

    /// Playback clock in seconds since the start of the log.
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn play(&mut self) {
        if self.state != PlaybackState::Closed {
            self.state = PlaybackState::Running;
        }
    }

    pub fn pause(&mut self) {
        if self.state != PlaybackState::Closed {
            self.state = PlaybackState::Paused;
        }
    }

    pub fn toggle(&mut self) {
        match self.state {
            PlaybackState::Running => self.pause(),
            PlaybackState::Paused => self.play(),
            PlaybackState::Closed => {}
        }
    }

    pub fn close(&mut self) {
        self.state = PlaybackState::Closed;
    }

    /// Resets the clock to the cursor's time after the cursor was moved by hand.
    pub fn sync_to(&mut self, cursor: &Cursor, axis: &TimeAxis) {
        self.current_time = cursor.current_time(axis);
    }

    /// Advances one timer period. Returns whether the cursor moved.
    pub fn tick(&mut self, cursor: &mut Cursor, axis: &TimeAxis) -> bool {
        self.advance(self.period, cursor, axis)
    }

    /// Advances the clock by `elapsed` wall time. Returns whether the cursor moved.
    pub fn advance(&mut self, elapsed: Duration, cursor: &mut Cursor, axis: &TimeAxis) -> bool {
        if self.state != PlaybackState::Running || cursor.is_empty() {
            return false;
        }

        let duration = axis.duration();
        self.current_time = (self.current_time + elapsed.as_secs_f64() * self.speed).min(duration);

        let start = cursor.index();
        let mut index = start;
        while index + 1 < cursor.len() && self.current_time > axis.time_at(index) {
            index += 1;
        }
        // repeated final timestamps never satisfy the strict comparison
        if self.current_time >= duration {
            index = cursor.len() - 1;
        }
        cursor.set_index(index);

        if cursor.at_end() {
            debug!("Reached the end of the log at {:.2}s", self.current_time);
            self.pause();
        }

        index != start
    }
}

impl Default for Playback {
    fn default() -> Self {
        Self::new(DEFAULT_PERIOD, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn axis(n: usize, dt: f64) -> TimeAxis {
        let mut axis = TimeAxis::new();
        let ts: Vec<f64> = (0..n).map(|i| 50.0 + i as f64 * dt).collect();
        axis.absorb(&ts);
        axis
    }

    #[test]
    fn test_paused_does_not_move() {
        let axis = axis(10, 0.01);
        let mut cursor = Cursor::new(axis.len());
        let mut playback = Playback::default();
        assert!(!playback.tick(&mut cursor, &axis));
        assert_eq!(cursor.index(), 0);
    }

    #[test]
    fn test_tick_advances_with_period_and_speed() {
        let axis = axis(100, 0.125);
        let mut cursor = Cursor::new(axis.len());
        let mut playback = Playback::new(Duration::from_millis(250), 2.0);
        playback.play();

        assert!(playback.tick(&mut cursor, &axis));
        assert_relative_eq!(playback.current_time(), 0.5, epsilon = 1e-9);
        // first sample with time >= 0.5
        assert_eq!(cursor.index(), 4);
    }

    #[test]
    fn test_playback_is_monotonic_and_stops_at_end() {
        let axis = axis(50, 0.01);
        let mut cursor = Cursor::new(axis.len());
        let mut playback = Playback::default();
        playback.play();

        let mut last = cursor.index();
        for _ in 0..100 {
            playback.tick(&mut cursor, &axis);
            assert!(cursor.index() >= last);
            last = cursor.index();
        }
        assert_eq!(cursor.index(), 49);
        assert_eq!(playback.state(), PlaybackState::Paused);
        assert_relative_eq!(playback.current_time(), axis.duration(), epsilon = 1e-9);
    }

    #[test]
    fn test_repeated_last_timestamp_still_pauses() {
        let mut axis = TimeAxis::new();
        axis.absorb(&[0.0, 0.01, 0.02, 0.03, 0.03]);
        let mut cursor = Cursor::new(axis.len());
        let mut playback = Playback::default();
        playback.play();

        for _ in 0..10 {
            playback.tick(&mut cursor, &axis);
        }
        assert_eq!(cursor.index(), 4);
        assert_eq!(playback.state(), PlaybackState::Paused);
    }

    #[test]
    fn test_sync_to_follows_manual_moves() {
        let axis = axis(100, 0.1);
        let mut cursor = Cursor::new(axis.len());
        let mut playback = Playback::default();

        cursor.set_fraction(0.5);
        playback.sync_to(&cursor, &axis);
        assert_relative_eq!(playback.current_time(), 5.0, epsilon = 1e-9);

        playback.play();
        playback.advance(Duration::from_millis(150), &mut cursor, &axis);
        assert_eq!(cursor.index(), 52);
    }

    #[test]
    fn test_closed_ignores_toggle() {
        let mut playback = Playback::default();
        playback.toggle();
        assert!(playback.is_running());
        playback.close();
        playback.toggle();
        playback.play();
        assert_eq!(playback.state(), PlaybackState::Closed);
    }

    #[test]
    fn test_invalid_speed_defaults_to_real_time() {
        assert_eq!(Playback::new(DEFAULT_PERIOD, 0.0).speed, 1.0);
        assert_eq!(Playback::new(DEFAULT_PERIOD, f64::NAN).speed, 1.0);
    }
}
