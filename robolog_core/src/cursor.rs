//! Position on the common time axis shared by every view.

use crate::log_file::TimeAxis;

/// Index into the common time axis, always within `[0, len - 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    index: usize,
    len: usize,
}

impl Cursor {
    /// Creates a cursor at the start of an axis of `len` samples.
    pub fn new(len: usize) -> Self {
        Self { index: 0, len }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn last(&self) -> usize {
        self.len.saturating_sub(1)
    }

    /// Moves to `index`, clamped to the axis.
    pub fn set_index(&mut self, index: usize) {
        self.index = index.min(self.last());
    }

    /// Moves to a fraction of the log in `[0, 1]`; 1.0 lands on the last sample.
    pub fn set_fraction(&mut self, fraction: f64) {
        let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
        self.set_index((fraction * self.len as f64) as usize);
    }

    /// Moves by `delta` samples.
    pub fn step(&mut self, delta: isize) {
        let target = if delta < 0 {
            self.index.saturating_sub(delta.unsigned_abs())
        } else {
            self.index.saturating_add(delta as usize)
        };
        self.set_index(target);
    }

    pub fn to_start(&mut self) {
        self.index = 0;
    }

    pub fn to_end(&mut self) {
        self.index = self.last();
    }

    pub fn at_end(&self) -> bool {
        self.index >= self.last()
    }

    /// Position as a fraction of the axis.
    pub fn fraction(&self) -> f64 {
        if self.len <= 1 {
            return 0.0;
        }
        self.index as f64 / self.last() as f64
    }

    /// Seconds since the start of the log.
    pub fn current_time(&self, axis: &TimeAxis) -> f64 {
        axis.time_at(self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_set_index_clamps() {
        let mut cursor = Cursor::new(10);
        cursor.set_index(4);
        assert_eq!(cursor.index(), 4);
        cursor.set_index(1000);
        assert_eq!(cursor.index(), 9);
        assert!(cursor.at_end());
    }

    #[test]
    fn test_set_fraction() {
        let mut cursor = Cursor::new(100);
        cursor.set_fraction(0.5);
        assert_eq!(cursor.index(), 50);
        cursor.set_fraction(1.0);
        assert_eq!(cursor.index(), 99);
        cursor.set_fraction(-3.0);
        assert_eq!(cursor.index(), 0);
        cursor.set_fraction(f64::NAN);
        assert_eq!(cursor.index(), 0);
    }

    #[test]
    fn test_step() {
        let mut cursor = Cursor::new(5);
        cursor.step(-1);
        assert_eq!(cursor.index(), 0);
        cursor.step(3);
        assert_eq!(cursor.index(), 3);
        cursor.step(isize::MAX);
        assert_eq!(cursor.index(), 4);
        cursor.step(isize::MIN);
        assert_eq!(cursor.index(), 0);
    }

    #[test]
    fn test_current_time_is_relative() {
        let mut axis = TimeAxis::new();
        axis.absorb(&[100.0, 100.5, 101.0]);
        let mut cursor = Cursor::new(axis.len());
        cursor.to_end();
        assert_eq!(cursor.current_time(&axis), 1.0);
        assert_eq!(cursor.fraction(), 1.0);
    }

    #[test]
    fn test_empty_axis() {
        let mut cursor = Cursor::new(0);
        cursor.set_fraction(0.7);
        cursor.step(2);
        assert_eq!(cursor.index(), 0);
        assert_eq!(cursor.fraction(), 0.0);
    }

    proptest! {
        #[test]
        fn test_cursor_stays_in_range(len in 1usize..5000, ops in prop::collection::vec((-100isize..100, 0.0f64..1.5), 0..50)) {
            let mut cursor = Cursor::new(len);
            for (delta, fraction) in ops {
                cursor.step(delta);
                prop_assert!(cursor.index() < len);
                cursor.set_fraction(fraction);
                prop_assert!(cursor.index() < len);
            }
        }
    }
}
