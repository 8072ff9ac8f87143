//! The chase loop

use crate::applier::RuleApplier;
use crate::data::ChasableData;
use crate::halting::HaltingCondition;
use crate::scheduler::RuleScheduler;
use crate::step::{StepContext, StepResult};
use crate::treatment::Treatment;
use crate::{ChaseError, ChaseResult};
use atom_model::RuleBase;
use fact_store::MaterializedData;
use std::collections::BTreeSet;
use tracing::debug;

/// Snapshot handed to halting conditions between steps
pub struct ChaseView<'a> {
    /// Number of completed steps
    pub step_count: usize,
    /// The last step's result
    pub last: &'a StepResult,
    /// Current atom count of the writing target
    pub target_size: usize,
    /// Number of rules the scheduler would offer next
    pub upcoming_rules: usize,
}

/// The mutable heart of a chase: rule base, data and pipeline
///
/// Treatments receive this to do their work; the surrounding [`Chase`]
/// owns the treatment and halting lists.
pub struct ChaseCore {
    rule_base: RuleBase,
    data: ChasableData,
    scheduler: Box<dyn RuleScheduler>,
    applier: Box<dyn RuleApplier>,
    last_step: StepResult,
    step_count: usize,
}

impl ChaseCore {
    pub(crate) fn new(
        rule_base: RuleBase,
        data: ChasableData,
        mut scheduler: Box<dyn RuleScheduler>,
        mut applier: Box<dyn RuleApplier>,
    ) -> Self {
        scheduler.init(&rule_base);
        applier.init(&rule_base);
        Self {
            rule_base,
            data,
            scheduler,
            applier,
            last_step: StepResult::initial(),
            step_count: 0,
        }
    }

    /// The rule base being chased
    pub fn rule_base(&self) -> &RuleBase {
        &self.rule_base
    }

    /// Swap the rule base before the first step
    ///
    /// Re-initializes the scheduler and applier and resets the step
    /// state; swapping after execution has started is a configuration
    /// error (build a new chase instead).
    pub fn set_rule_base(&mut self, rule_base: RuleBase) -> ChaseResult<()> {
        if self.step_count > 0 {
            return Err(ChaseError::Configuration(
                "the rule base must not change after the chase has started".to_string(),
            ));
        }
        self.scheduler.init(&rule_base);
        self.applier.init(&rule_base);
        self.rule_base = rule_base;
        self.last_step = StepResult::initial();
        Ok(())
    }

    /// The chased data
    pub fn data(&self) -> &ChasableData {
        &self.data
    }

    /// The chased data, writable
    pub fn data_mut(&mut self) -> &mut ChasableData {
        &mut self.data
    }

    /// The last step's result
    pub fn last_step(&self) -> &StepResult {
        &self.last_step
    }

    /// Number of completed steps
    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// The rules the scheduler offers for the next step
    fn upcoming_rules(&self) -> ChaseResult<BTreeSet<usize>> {
        self.scheduler.rules_to_apply(self.last_step.applied_rules())
    }

    /// Run one step over the given rules
    fn run_step(&mut self, rules: &BTreeSet<usize>) -> ChaseResult<StepResult> {
        self.step_count += 1;
        let ctx = StepContext {
            step: self.step_count,
            last: &self.last_step,
            rule_base: &self.rule_base,
        };
        self.applier.apply(rules, &mut self.data, &ctx)
    }

    fn view<'a>(&'a self, upcoming: &BTreeSet<usize>) -> ChaseView<'a> {
        ChaseView {
            step_count: self.step_count,
            last: &self.last_step,
            target_size: self.data.target().len(),
            upcoming_rules: upcoming.len(),
        }
    }
}

/// A configured chase, ready to saturate its data
///
/// Build through the [`ChaseBuilder`](crate::ChaseBuilder).
pub struct Chase {
    core: ChaseCore,
    halting: Vec<Box<dyn HaltingCondition>>,
    global_pretreatments: Vec<Box<dyn Treatment>>,
    step_pretreatments: Vec<Box<dyn Treatment>>,
    end_of_step_treatments: Vec<Box<dyn Treatment>>,
    global_end_treatments: Vec<Box<dyn Treatment>>,
}

impl Chase {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn assemble(
        core: ChaseCore,
        halting: Vec<Box<dyn HaltingCondition>>,
        global_pretreatments: Vec<Box<dyn Treatment>>,
        step_pretreatments: Vec<Box<dyn Treatment>>,
        end_of_step_treatments: Vec<Box<dyn Treatment>>,
        global_end_treatments: Vec<Box<dyn Treatment>>,
    ) -> Self {
        Self {
            core,
            halting,
            global_pretreatments,
            step_pretreatments,
            end_of_step_treatments,
            global_end_treatments,
        }
    }

    /// Run the saturation loop to completion
    ///
    /// Executes global pretreatments, then steps while every halting
    /// condition reports continue, then global end treatments. A
    /// saturated chase executed again is a no-op (the fixpoint
    /// detector stops it before the first new step).
    pub fn execute(&mut self) -> ChaseResult<()> {
        for treatment in &mut self.global_pretreatments {
            treatment.apply(&mut self.core)?;
        }

        {
            let upcoming = self.core.upcoming_rules()?;
            let view = self.core.view(&upcoming);
            for condition in &mut self.halting {
                condition.start(&view);
            }
        }

        loop {
            {
                let upcoming = self.core.upcoming_rules()?;
                let view = self.core.view(&upcoming);
                if !self.halting.iter().all(|c| c.should_continue(&view)) {
                    break;
                }
            }
            for treatment in &mut self.step_pretreatments {
                treatment.apply(&mut self.core)?;
            }
            // Recomputed after pretreatments, which may have adjusted
            // the rule base.
            let rules = self.core.upcoming_rules()?;
            self.core.last_step = self.core.run_step(&rules)?;
            debug!(
                step = self.core.step_count,
                created = ?self.core.last_step.created_count(),
                "chase step done"
            );
            for treatment in &mut self.end_of_step_treatments {
                treatment.apply(&mut self.core)?;
            }
        }

        for treatment in &mut self.global_end_treatments {
            treatment.apply(&mut self.core)?;
        }
        Ok(())
    }

    /// The chase core (rule base, data, step state)
    pub fn core(&self) -> &ChaseCore {
        &self.core
    }

    /// The chase core, writable
    pub fn core_mut(&mut self) -> &mut ChaseCore {
        &mut self.core
    }

    /// Number of completed steps
    pub fn step_count(&self) -> usize {
        self.core.step_count
    }

    /// Unwrap into the chased data
    pub fn into_data(self) -> ChasableData {
        self.core.data
    }
}
