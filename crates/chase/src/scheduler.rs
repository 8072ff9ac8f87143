//! Rule scheduling: which rules to try at the next step

use crate::grd::Grd;
use crate::{ChaseError, ChaseResult};
use atom_model::{Predicate, RuleBase};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

/// Computes the rules worth applying given the last step's outcome
///
/// Every scheduler returns the full rule base when the last step is
/// unknown (the first step). Using a scheduler before [`init`] is a
/// lifecycle error.
///
/// [`init`]: RuleScheduler::init
pub trait RuleScheduler {
    /// Bind the scheduler to a rule base, precomputing its indexes
    fn init(&mut self, rule_base: &RuleBase);

    /// The rule indices to try next
    fn rules_to_apply(
        &self,
        last_applied: Option<&BTreeSet<usize>>,
    ) -> ChaseResult<BTreeSet<usize>>;
}

fn all_rules(count: usize) -> BTreeSet<usize> {
    (0..count).collect()
}

fn uninitialized(name: &str) -> ChaseError {
    ChaseError::Lifecycle(format!("{name} was not initialized with a rule base"))
}

/// Always returns the full rule base
#[derive(Debug, Default)]
pub struct NaiveScheduler {
    rule_count: Option<usize>,
}

impl NaiveScheduler {
    /// Create an uninitialized naive scheduler
    pub fn new() -> Self {
        Self::default()
    }
}

impl RuleScheduler for NaiveScheduler {
    fn init(&mut self, rule_base: &RuleBase) {
        self.rule_count = Some(rule_base.len());
    }

    fn rules_to_apply(
        &self,
        _last_applied: Option<&BTreeSet<usize>>,
    ) -> ChaseResult<BTreeSet<usize>> {
        let count = self.rule_count.ok_or_else(|| uninitialized("NaiveScheduler"))?;
        Ok(all_rules(count))
    }
}

/// Wakes rules whose body mentions a freshly produced predicate
///
/// Indexes each rule by its body predicates (including negated body
/// atoms); after a step, returns every rule whose body references a
/// predicate occurring in an applied rule's head.
#[derive(Debug, Default)]
pub struct ByPredicateScheduler {
    rule_count: Option<usize>,
    rules_by_body_predicate: FxHashMap<Predicate, BTreeSet<usize>>,
    head_predicates: Vec<Vec<Predicate>>,
}

impl ByPredicateScheduler {
    /// Create an uninitialized by-predicate scheduler
    pub fn new() -> Self {
        Self::default()
    }
}

impl RuleScheduler for ByPredicateScheduler {
    fn init(&mut self, rule_base: &RuleBase) {
        self.rule_count = Some(rule_base.len());
        self.rules_by_body_predicate.clear();
        self.head_predicates.clear();
        for (index, rule) in rule_base.rules().iter().enumerate() {
            for atom in rule.flattened_body().atoms_with_negated() {
                self.rules_by_body_predicate
                    .entry(atom.predicate().clone())
                    .or_default()
                    .insert(index);
            }
            let mut heads: Vec<Predicate> = Vec::new();
            for atom in rule.head_atoms() {
                if !heads.contains(atom.predicate()) {
                    heads.push(atom.predicate().clone());
                }
            }
            self.head_predicates.push(heads);
        }
    }

    fn rules_to_apply(
        &self,
        last_applied: Option<&BTreeSet<usize>>,
    ) -> ChaseResult<BTreeSet<usize>> {
        let count = self
            .rule_count
            .ok_or_else(|| uninitialized("ByPredicateScheduler"))?;
        let Some(last_applied) = last_applied else {
            return Ok(all_rules(count));
        };
        let mut to_apply = BTreeSet::new();
        for &applied in last_applied {
            for predicate in self.head_predicates.get(applied).into_iter().flatten() {
                if let Some(consumers) = self.rules_by_body_predicate.get(predicate) {
                    to_apply.extend(consumers.iter().copied());
                }
            }
        }
        Ok(to_apply)
    }
}

/// Follows the precomputed graph of rule dependencies
#[derive(Debug, Default)]
pub struct GrdScheduler {
    grd: Option<Grd>,
}

impl GrdScheduler {
    /// Create an uninitialized GRD scheduler
    pub fn new() -> Self {
        Self::default()
    }
}

impl RuleScheduler for GrdScheduler {
    fn init(&mut self, rule_base: &RuleBase) {
        self.grd = Some(Grd::new(rule_base));
    }

    fn rules_to_apply(
        &self,
        last_applied: Option<&BTreeSet<usize>>,
    ) -> ChaseResult<BTreeSet<usize>> {
        let grd = self.grd.as_ref().ok_or_else(|| uninitialized("GrdScheduler"))?;
        let Some(last_applied) = last_applied else {
            return Ok(all_rules(grd.len()));
        };
        let mut to_apply = BTreeSet::new();
        for &applied in last_applied {
            to_apply.extend(grd.successors(applied).iter().copied());
        }
        Ok(to_apply)
    }
}
