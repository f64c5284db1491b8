//! The logical simulation clock.

use crate::types::SimTime;

/// Current logical time of a run.
///
/// Only the top-level driving loop writes it; the rest of the tree reads it
/// through a shared reference, so every simulator sees the same value within
/// a cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SimulationClock {
    time: SimTime,
}

impl SimulationClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_time(time: SimTime) -> Self {
        Self { time }
    }

    pub fn time(&self) -> SimTime {
        self.time
    }

    pub fn set_time(&mut self, time: SimTime) {
        self.time = time;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::INFINITY;

    #[test]
    fn test_clock() {
        let mut clock = SimulationClock::new();
        assert_eq!(clock.time(), 0.0);

        clock.set_time(12.5);
        assert_eq!(clock.time(), 12.5);

        clock.set_time(INFINITY);
        assert!(clock.time().is_infinite());
        assert_eq!(SimulationClock::with_time(3.0).time(), 3.0);
    }
}
