//! Period clock for the simulation
//!
//! The market runs in discrete periods ("trading days"), each made of at most
//! `steps_per_period` matching steps. This module tracks where the run is and
//! which phase of the per-period state machine is active:
//!
//! ```text
//! Reset -> Stepping -> Exhausted -> (Reset of the next period | run finished)
//! ```
//!
//! Period and step numbers are 1-indexed, as they appear in the trade log.

use serde::{Deserialize, Serialize};

/// Phase of the per-period state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodPhase {
    /// Agents and book are about to be reset (also the state before period 1)
    Reset,
    /// Matching steps are being executed
    Stepping,
    /// Step budget used up, or every agent has traded
    Exhausted,
}

/// Tracks the current period, step and phase
///
/// # Example
/// ```
/// use market_simulator_core_rs::PeriodClock;
///
/// let mut clock = PeriodClock::new(2, 3);
/// clock.enter_reset();
/// assert_eq!(clock.open_period(), 1);
/// assert_eq!(clock.advance_step(), 1);
/// clock.close_period();
/// assert!(!clock.is_finished());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodClock {
    num_periods: usize,
    steps_per_period: usize,
    /// Current period (1-indexed, 0 before the first period opens)
    period: usize,
    /// Steps executed in the current period
    step: usize,
    phase: PeriodPhase,
}

impl PeriodClock {
    /// Create a clock for `num_periods` periods of `steps_per_period` steps
    ///
    /// # Panics
    /// Panics if either argument is zero
    pub fn new(num_periods: usize, steps_per_period: usize) -> Self {
        assert!(num_periods > 0, "num_periods must be positive");
        assert!(steps_per_period > 0, "steps_per_period must be positive");
        Self {
            num_periods,
            steps_per_period,
            period: 0,
            step: 0,
            phase: PeriodPhase::Reset,
        }
    }

    /// Clock positioned right after `completed` whole periods
    pub fn resume_after(num_periods: usize, steps_per_period: usize, completed: usize) -> Self {
        let mut clock = Self::new(num_periods, steps_per_period);
        clock.period = completed.min(num_periods);
        if clock.period > 0 {
            clock.phase = PeriodPhase::Exhausted;
        }
        clock
    }

    /// Enter `Reset` ahead of the next period
    ///
    /// # Panics
    /// Panics if a period is still stepping or the run is finished
    pub fn enter_reset(&mut self) {
        assert!(
            self.phase != PeriodPhase::Stepping,
            "period {} is still stepping",
            self.period
        );
        assert!(self.period < self.num_periods, "all periods already ran");
        self.phase = PeriodPhase::Reset;
    }

    /// Leave `Reset`, open the next period and enter `Stepping`; returns the new period number
    ///
    /// # Panics
    /// Panics unless the clock is in `Reset`
    pub fn open_period(&mut self) -> usize {
        assert!(
            self.phase == PeriodPhase::Reset,
            "a period can only open from reset"
        );
        self.period += 1;
        self.step = 0;
        self.phase = PeriodPhase::Stepping;
        self.period
    }

    /// Count one step; returns its 1-indexed number within the period
    pub fn advance_step(&mut self) -> usize {
        assert!(
            self.phase == PeriodPhase::Stepping,
            "steps can only run while stepping"
        );
        assert!(!self.budget_exhausted(), "step budget exceeded");
        self.step += 1;
        self.step
    }

    /// Whether the current period has used its whole step budget
    pub fn budget_exhausted(&self) -> bool {
        self.step >= self.steps_per_period
    }

    /// End the current period
    pub fn close_period(&mut self) {
        self.phase = PeriodPhase::Exhausted;
    }

    /// All configured periods have run to exhaustion
    pub fn is_finished(&self) -> bool {
        self.period == self.num_periods && self.phase == PeriodPhase::Exhausted
    }

    pub fn phase(&self) -> PeriodPhase {
        self.phase
    }

    /// Current period (1-indexed; 0 before the first period)
    pub fn period(&self) -> usize {
        self.period
    }

    /// Steps executed so far in the current period
    pub fn steps_taken(&self) -> usize {
        self.step
    }

    /// Periods that have fully completed
    pub fn completed_periods(&self) -> usize {
        match self.phase {
            PeriodPhase::Stepping => self.period - 1,
            _ => self.period,
        }
    }

    pub fn num_periods(&self) -> usize {
        self.num_periods
    }

    pub fn steps_per_period(&self) -> usize {
        self.steps_per_period
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "steps_per_period must be positive")]
    fn test_zero_steps_panics() {
        PeriodClock::new(1, 0);
    }

    #[test]
    fn test_period_lifecycle() {
        let mut clock = PeriodClock::new(2, 2);
        assert_eq!(clock.phase(), PeriodPhase::Reset);
        assert_eq!(clock.completed_periods(), 0);

        assert_eq!(clock.open_period(), 1);
        assert_eq!(clock.completed_periods(), 0);
        clock.advance_step();
        clock.advance_step();
        assert!(clock.budget_exhausted());
        clock.close_period();
        assert_eq!(clock.completed_periods(), 1);
        assert!(!clock.is_finished());

        clock.enter_reset();
        assert_eq!(clock.phase(), PeriodPhase::Reset);
        assert_eq!(clock.completed_periods(), 1);
        assert_eq!(clock.open_period(), 2);
        assert_eq!(clock.steps_taken(), 0);
        clock.close_period();
        assert!(clock.is_finished());
    }

    #[test]
    #[should_panic(expected = "step budget exceeded")]
    fn test_step_budget_enforced() {
        let mut clock = PeriodClock::new(1, 1);
        clock.open_period();
        clock.advance_step();
        clock.advance_step();
    }

    #[test]
    #[should_panic(expected = "all periods already ran")]
    fn test_cannot_open_past_last_period() {
        let mut clock = PeriodClock::new(1, 1);
        clock.open_period();
        clock.close_period();
        clock.enter_reset();
    }

    #[test]
    #[should_panic(expected = "a period can only open from reset")]
    fn test_exhausted_period_must_reset_before_opening() {
        let mut clock = PeriodClock::new(3, 1);
        clock.open_period();
        clock.close_period();
        clock.open_period();
    }

    #[test]
    fn test_resume_after() {
        let clock = PeriodClock::resume_after(5, 10, 3);
        assert_eq!(clock.completed_periods(), 3);
        assert_eq!(clock.phase(), PeriodPhase::Exhausted);
        assert!(!clock.is_finished());
    }
}
