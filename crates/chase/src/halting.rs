//! Halting conditions, composed by logical AND
//!
//! The chase loop continues only while every condition reports
//! continue. The default configuration combines
//! [`CreatedFactsAtPreviousStep`] and [`HasRulesToApply`], a correct
//! fixpoint detector regardless of other policy choices.

use crate::chase::ChaseView;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One vote on whether the chase may take another step
pub trait HaltingCondition: Send {
    /// Called once when the chase starts (timeouts stamp their clock)
    fn start(&mut self, _view: &ChaseView<'_>) {}

    /// True while this condition allows the chase to continue
    fn should_continue(&self, view: &ChaseView<'_>) -> bool;
}

/// Stop at fixpoint: the last step created zero facts
///
/// Unknown created facts (initial state, delegated evaluation) count
/// as "keep going".
#[derive(Debug, Default)]
pub struct CreatedFactsAtPreviousStep;

impl CreatedFactsAtPreviousStep {
    /// Create the fixpoint condition
    pub fn new() -> Self {
        Self
    }
}

impl HaltingCondition for CreatedFactsAtPreviousStep {
    fn should_continue(&self, view: &ChaseView<'_>) -> bool {
        match view.last.created_count() {
            None => true,
            Some(count) => count > 0,
        }
    }
}

/// Stop when the scheduler has nothing left to offer
#[derive(Debug, Default)]
pub struct HasRulesToApply;

impl HasRulesToApply {
    /// Create the empty-schedule condition
    pub fn new() -> Self {
        Self
    }
}

impl HaltingCondition for HasRulesToApply {
    fn should_continue(&self, view: &ChaseView<'_>) -> bool {
        view.upcoming_rules > 0
    }
}

/// Stop once the target holds at least `max_atoms` atoms
#[derive(Debug)]
pub struct LimitAtoms {
    max_atoms: usize,
}

impl LimitAtoms {
    /// Stop when the target reaches the given size
    pub fn new(max_atoms: usize) -> Self {
        Self { max_atoms }
    }
}

impl HaltingCondition for LimitAtoms {
    fn should_continue(&self, view: &ChaseView<'_>) -> bool {
        view.target_size < self.max_atoms
    }
}

/// Stop after a fixed number of steps
#[derive(Debug)]
pub struct LimitSteps {
    max_steps: usize,
}

impl LimitSteps {
    /// Stop after `max_steps` completed steps
    pub fn new(max_steps: usize) -> Self {
        Self { max_steps }
    }
}

impl HaltingCondition for LimitSteps {
    fn should_continue(&self, view: &ChaseView<'_>) -> bool {
        view.step_count < self.max_steps
    }
}

/// Stop when the wall-clock budget is exhausted
///
/// The clock starts at chase start, not at construction.
#[derive(Debug)]
pub struct Timeout {
    budget: Duration,
    started: Option<Instant>,
}

impl Timeout {
    /// A wall-clock budget in milliseconds
    pub fn from_millis(budget_ms: u64) -> Self {
        Self {
            budget: Duration::from_millis(budget_ms),
            started: None,
        }
    }
}

impl HaltingCondition for Timeout {
    fn start(&mut self, _view: &ChaseView<'_>) {
        self.started = Some(Instant::now());
    }

    fn should_continue(&self, _view: &ChaseView<'_>) -> bool {
        match self.started {
            Some(started) => started.elapsed() < self.budget,
            None => true,
        }
    }
}

/// Stop when an externally-owned flag is raised
///
/// Checked between steps only: no partial step is ever visible.
#[derive(Debug)]
pub struct ExternalInterruption {
    stop: Arc<AtomicBool>,
}

impl ExternalInterruption {
    /// Watch the given flag
    pub fn new(stop: Arc<AtomicBool>) -> Self {
        Self { stop }
    }
}

impl HaltingCondition for ExternalInterruption {
    fn should_continue(&self, _view: &ChaseView<'_>) -> bool {
        !self.stop.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::StepResult;

    fn view(last: &StepResult, step_count: usize, target_size: usize) -> ChaseView<'_> {
        ChaseView {
            step_count,
            last,
            target_size,
            upcoming_rules: 1,
        }
    }

    #[test]
    fn test_fixpoint_condition() {
        let condition = CreatedFactsAtPreviousStep::new();
        let initial = StepResult::initial();
        assert!(condition.should_continue(&view(&initial, 0, 0)));
        let empty = StepResult::from_created(Default::default(), vec![]);
        assert!(!condition.should_continue(&view(&empty, 1, 0)));
    }

    #[test]
    fn test_limits() {
        let last = StepResult::initial();
        assert!(LimitSteps::new(3).should_continue(&view(&last, 2, 0)));
        assert!(!LimitSteps::new(3).should_continue(&view(&last, 3, 0)));
        assert!(LimitAtoms::new(10).should_continue(&view(&last, 0, 9)));
        assert!(!LimitAtoms::new(10).should_continue(&view(&last, 0, 10)));
    }

    #[test]
    fn test_external_interruption() {
        let flag = Arc::new(AtomicBool::new(false));
        let condition = ExternalInterruption::new(flag.clone());
        let last = StepResult::initial();
        assert!(condition.should_continue(&view(&last, 0, 0)));
        flag.store(true, Ordering::Relaxed);
        assert!(!condition.should_continue(&view(&last, 0, 0)));
    }

    #[test]
    fn test_timeout_only_counts_after_start() {
        let mut condition = Timeout::from_millis(0);
        let last = StepResult::initial();
        // Unstarted: always continue.
        assert!(condition.should_continue(&view(&last, 0, 0)));
        condition.start(&view(&last, 0, 0));
        assert!(!condition.should_continue(&view(&last, 0, 0)));
    }
}
