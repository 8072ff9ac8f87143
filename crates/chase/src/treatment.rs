//! Treatments: hooks around the whole run and around each step

use crate::chase::ChaseCore;
use crate::ChaseResult;
use atom_model::{Atom, Predicate, RuleBase};
use fact_store::{FactBase, InMemoryGraphStore, MaterializedData, Writable};
use rustc_hash::FxHashMap;
use std::time::Instant;
use tracing::info;

/// A hook run around the chase or around one of its steps
///
/// The builder decides where a treatment runs: global pretreatment,
/// step pretreatment, end-of-step, or global end.
pub trait Treatment: Send {
    /// Do the treatment's work against the chase state
    fn apply(&mut self, core: &mut ChaseCore) -> ChaseResult<()>;
}

/// Merge the last step's created facts into the writing target
///
/// Required at end of step whenever the applier collects facts through
/// delegated application; merging deduplicates against the target.
#[derive(Debug, Default)]
pub struct AddCreatedFacts;

impl AddCreatedFacts {
    /// Create the merge treatment
    pub fn new() -> Self {
        Self
    }
}

impl Treatment for AddCreatedFacts {
    fn apply(&mut self, core: &mut ChaseCore) -> ChaseResult<()> {
        let created: Vec<Atom> = match core.last_step().created_facts() {
            Some(facts) => facts.atoms().cloned().collect(),
            None => return Ok(()),
        };
        core.data_mut().target_mut().add_all(created)?;
        Ok(())
    }
}

/// An external core (minimization) procedure over a fact base
pub trait CoreProcessor: Send {
    /// Minimize the whole target
    fn compute_core(&self, target: &mut dyn FactBase) -> ChaseResult<()>;

    /// Minimize around recently created facts only
    ///
    /// Defaults to the full computation.
    fn compute_local_core(
        &self,
        target: &mut dyn FactBase,
        _recent: &InMemoryGraphStore,
    ) -> ChaseResult<()> {
        self.compute_core(target)
    }
}

/// Invoke a core processor on the whole target
pub struct ComputeCore {
    processor: Box<dyn CoreProcessor>,
}

impl ComputeCore {
    /// Wrap a core processor as a treatment
    pub fn new(processor: Box<dyn CoreProcessor>) -> Self {
        Self { processor }
    }
}

impl Treatment for ComputeCore {
    fn apply(&mut self, core: &mut ChaseCore) -> ChaseResult<()> {
        self.processor.compute_core(core.data_mut().target_mut())
    }
}

/// Invoke a core processor locally around the last step's facts
pub struct ComputeLocalCore {
    processor: Box<dyn CoreProcessor>,
}

impl ComputeLocalCore {
    /// Wrap a core processor as a local treatment
    pub fn new(processor: Box<dyn CoreProcessor>) -> Self {
        Self { processor }
    }
}

impl Treatment for ComputeLocalCore {
    fn apply(&mut self, core: &mut ChaseCore) -> ChaseResult<()> {
        let recent = match core.last_step().created_facts() {
            Some(facts) => facts.clone(),
            None => InMemoryGraphStore::new(),
        };
        self.processor
            .compute_local_core(core.data_mut().target_mut(), &recent)
    }
}

/// Rewrite the rule base so every head is a single piece
///
/// A global pretreatment; it changes the chase's behavior only for
/// renaming strategies that key on whole-head substitutions.
#[derive(Debug, Default)]
pub struct RuleSplit;

impl RuleSplit {
    /// Create the rule-split treatment
    pub fn new() -> Self {
        Self
    }
}

impl Treatment for RuleSplit {
    fn apply(&mut self, core: &mut ChaseCore) -> ChaseResult<()> {
        let mut split = RuleBase::new();
        for rule in core.rule_base().rules() {
            for piece_rule in rule.split_single_pieces()? {
                split.add_rule(piece_rule);
            }
        }
        for constraint in core.rule_base().negative_constraints() {
            split.add_negative_constraint(constraint.clone());
        }
        core.set_rule_base(split)
    }
}

/// Drop atoms of given predicates at given step numbers
///
/// The stratified chase uses this to discard intermediate predicates
/// once no later stratum reads them.
#[derive(Debug, Default)]
pub struct PredicateFilter {
    predicates_by_step: FxHashMap<usize, Vec<Predicate>>,
}

impl PredicateFilter {
    /// Removal plan: step number → predicates to drop after that step
    pub fn new(predicates_by_step: FxHashMap<usize, Vec<Predicate>>) -> Self {
        Self { predicates_by_step }
    }
}

impl Treatment for PredicateFilter {
    fn apply(&mut self, core: &mut ChaseCore) -> ChaseResult<()> {
        let step = core.step_count();
        let Some(predicates) = self.predicates_by_step.get(&step) else {
            return Ok(());
        };
        let doomed: Vec<Atom> = core
            .data()
            .target()
            .atoms()
            .filter(|atom| predicates.contains(atom.predicate()))
            .cloned()
            .collect();
        if !doomed.is_empty() {
            core.data_mut().target_mut().remove_all(&doomed);
        }
        Ok(())
    }
}

/// Log step statistics through `tracing`
#[derive(Debug, Default)]
pub struct Debug {
    last_instant: Option<Instant>,
}

impl Debug {
    /// Create the debug treatment
    pub fn new() -> Self {
        Self::default()
    }
}

impl Treatment for Debug {
    fn apply(&mut self, core: &mut ChaseCore) -> ChaseResult<()> {
        let now = Instant::now();
        let elapsed_ms = self
            .last_instant
            .map(|last| last.elapsed().as_millis())
            .unwrap_or(0);
        self.last_instant = Some(now);
        info!(
            step = core.step_count(),
            atoms = core.data().target().len(),
            added = ?core.last_step().created_count(),
            applied = ?core.last_step().applied_rules().map(|r| r.len()),
            elapsed_ms,
            "chase step"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atom_model::{Formula, Rule, Term};

    fn atom(p: &str, vars: &[&str]) -> Formula {
        Formula::Atom(
            Atom::new(
                Predicate::new(p, vars.len()),
                vars.iter().map(|v| Term::variable(*v)),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_rule_split_splits_disconnected_heads() {
        use crate::builder::ChaseBuilder;
        use crate::data::ChasableData;

        let body = Formula::and(atom("r", &["X"]), atom("r", &["Z"]));
        let head = Formula::and(atom("s", &["X"]), atom("t", &["Z"]));
        let base = RuleBase::from_rules(
            [Rule::universally_closed(body, head, None).unwrap()],
            [],
        );
        let mut chase = ChaseBuilder::new()
            .chasable_data(ChasableData::new(Box::new(InMemoryGraphStore::new())))
            .rule_base(base)
            .build()
            .unwrap();
        RuleSplit::new().apply(chase.core_mut()).unwrap();
        assert_eq!(chase.core().rule_base().len(), 2);
    }
}
