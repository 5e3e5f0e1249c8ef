//! Monotonic animation clock.

use instant::Instant;

/// Elapsed-time source for scene animation.
///
/// The first [`tick`](Self::tick) fixes the epoch and reports `0.0`. Every later
/// tick reports the seconds elapsed since that epoch. The epoch is never rebased,
/// so animation time grows without wrapping for the whole renderer lifetime.
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    epoch: Option<Instant>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self { epoch: None }
    }

    /// Seconds since the first tick.
    pub fn tick(&mut self) -> f64 {
        self.tick_at(Instant::now())
    }

    pub fn has_started(&self) -> bool {
        self.epoch.is_some()
    }

    pub(crate) fn tick_at(&mut self, now: Instant) -> f64 {
        match self.epoch {
            None => {
                self.epoch = Some(now);
                0.0
            }
            Some(epoch) => now.saturating_duration_since(epoch).as_secs_f64(),
        }
    }
}

#[cfg(test)]
mod tests {
    use instant::Duration;

    use super::*;

    #[test]
    fn first_tick_is_zero() {
        let mut clock = FrameClock::new();
        assert!(!clock.has_started());
        assert_eq!(clock.tick(), 0.0);
        assert!(clock.has_started());
    }

    #[test]
    fn later_ticks_measure_from_the_first_one() {
        let mut clock = FrameClock::new();
        let start = Instant::now();
        assert_eq!(clock.tick_at(start), 0.0);

        let t1 = clock.tick_at(start + Duration::from_millis(250));
        let t2 = clock.tick_at(start + Duration::from_millis(1500));
        assert!((t1 - 0.25).abs() < 1e-9);
        assert!((t2 - 1.5).abs() < 1e-9);

        // no rebase: asking again at the same instant returns the same value
        let t3 = clock.tick_at(start + Duration::from_millis(1500));
        assert_eq!(t2, t3);
    }

    #[test]
    fn instants_before_the_epoch_saturate_to_zero() {
        let mut clock = FrameClock::new();
        let start = Instant::now() + Duration::from_secs(1);
        clock.tick_at(start);
        assert_eq!(clock.tick_at(start - Duration::from_millis(10)), 0.0);
    }
}
