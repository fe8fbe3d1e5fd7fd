//! Simulation step timing.
//!
//! The [`Time`] value is advanced by [`Stage::tick`](crate::stage::Stage::tick)
//! with the delta the host passes in. The stage never reads a clock itself,
//! so a fixed-step host gets fixed-step time.

use std::time::Duration;

/// Step timing, copied out of the stage with [`Stage::time`](crate::stage::Stage::time).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Time {
    delta: Duration,
    elapsed: Duration,
    tick_count: u64,
}

impl Time {
    pub(crate) fn advance(&mut self, delta: Duration) {
        self.delta = delta;
        self.elapsed += delta;
        self.tick_count += 1;
    }

    /// Duration of the last step.
    pub fn delta(&self) -> Duration {
        self.delta
    }

    pub fn delta_secs(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Sum of every step so far.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    /// Number of completed steps.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_accumulates() {
        let mut time = Time::default();
        time.advance(Duration::from_millis(16));
        time.advance(Duration::from_millis(20));
        assert_eq!(time.delta(), Duration::from_millis(20));
        assert_eq!(time.elapsed(), Duration::from_millis(36));
        assert_eq!(time.tick_count(), 2);
    }
}
