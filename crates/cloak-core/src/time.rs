//! Fixed-step clock that decouples the simulation tick from the jittery
//! frame/timer callbacks feeding it wall time.

/// Outcome of feeding elapsed wall time into a [`FixedStepClock`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Advance {
    /// A tick is due and the caller must step the simulation once.
    pub step: bool,
    /// Wall time discarded because the simulation fell behind.
    pub dropped: f64,
}

/// Accumulates wall time and releases at most one fixed tick per callback.
///
/// If time is still owed after a tick, the backlog is discarded instead of
/// being worked off with catch-up ticks.
#[derive(Debug, Clone)]
pub struct FixedStepClock {
    tick: f64,
    accumulated: f64,
    ticks: u64,
}

impl FixedStepClock {
    /// Create a clock for the given tick rate in Hz.
    pub fn from_rate(tick_rate_hz: f64) -> Self {
        Self::new(1.0 / tick_rate_hz)
    }

    pub fn new(tick: f64) -> Self {
        assert!(
            tick.is_finite() && tick > 0.0,
            "tick must be a positive duration, got {tick}"
        );
        Self {
            tick,
            accumulated: 0.0,
            ticks: 0,
        }
    }

    /// Fixed tick size in seconds.
    pub fn tick(&self) -> f64 {
        self.tick
    }

    /// Period at which the driving timer should fire: a tenth of a tick.
    pub fn callback_interval(&self) -> f64 {
        0.1 * self.tick
    }

    /// Simulation time released so far (ticks × tick size).
    pub fn sim_time(&self) -> f64 {
        self.ticks as f64 * self.tick
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Wall time owed to the simulation.
    pub fn accumulated(&self) -> f64 {
        self.accumulated
    }

    /// Feed elapsed wall time. Negative or non-finite input is ignored.
    pub fn advance(&mut self, elapsed: f64) -> Advance {
        if elapsed.is_finite() && elapsed > 0.0 {
            self.accumulated += elapsed;
        }

        let mut result = Advance::default();
        if self.accumulated >= self.tick {
            self.accumulated -= self.tick;
            self.ticks += 1;
            result.step = true;
        }
        if self.accumulated > self.tick {
            result.dropped = self.accumulated;
            self.accumulated = 0.0;
            tracing::trace!(dropped = result.dropped, "Skipping frames");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: f64 = 1.0 / 60.0;

    #[test]
    fn no_step_before_a_full_tick() {
        let mut clock = FixedStepClock::new(TICK);
        for _ in 0..9 {
            assert!(!clock.advance(0.1 * TICK).step);
        }
        assert_eq!(clock.ticks(), 0);
    }

    #[test]
    fn steps_once_per_tick_of_wall_time() {
        // Binary fractions keep the accumulator exact.
        let mut clock = FixedStepClock::new(0.25);
        let mut steps = 0;
        for _ in 0..32 {
            if clock.advance(0.03125).step {
                steps += 1;
            }
        }
        assert_eq!(steps, 4);
        assert_eq!(clock.ticks(), 4);
        assert!((clock.sim_time() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn long_stall_steps_once_and_drops_backlog() {
        let mut clock = FixedStepClock::new(TICK);
        let out = clock.advance(10.0 * TICK);
        assert!(out.step);
        assert!(out.dropped > 8.0 * TICK);
        assert_eq!(clock.accumulated(), 0.0);
        assert_eq!(clock.ticks(), 1);
    }

    #[test]
    fn remainder_below_one_tick_is_kept() {
        let mut clock = FixedStepClock::new(1.0);
        let out = clock.advance(1.5);
        assert!(out.step);
        assert_eq!(out.dropped, 0.0);
        assert!((clock.accumulated() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn callback_interval_is_a_tenth_of_a_tick() {
        let clock = FixedStepClock::from_rate(60.0);
        assert!((clock.callback_interval() - TICK / 10.0).abs() < 1e-12);
    }

    #[test]
    fn garbage_elapsed_is_ignored() {
        let mut clock = FixedStepClock::new(TICK);
        assert!(!clock.advance(f64::NAN).step);
        assert!(!clock.advance(-1.0).step);
        assert_eq!(clock.accumulated(), 0.0);
    }

    #[test]
    #[should_panic(expected = "positive duration")]
    fn zero_tick_is_rejected() {
        let _ = FixedStepClock::new(0.0);
    }
}
