//! Stratified meta-chase: one inner chase per stratum
//!
//! A stratification splits the rule base into a sequence of rule
//! bases; each stratum is saturated to fixpoint by a fresh inner chase
//! sharing the writing target before the next begins. With a
//! final-predicate projection configured, intermediate predicates are
//! dropped at the stratum boundary where no later stratum reads them.

use crate::builder::ChaseBuilder;
use crate::data::ChasableData;
use crate::grd::Grd;
use crate::{builder::ChaseConfig, ChaseError, ChaseResult};
use atom_model::{Predicate, RuleBase};
use fact_store::MaterializedData;
use rustc_hash::FxHashMap;
use tracing::debug;

/// How to derive the strata from a rule base
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StratificationStrategy {
    /// One stratum per strongly connected component of the GRD, in
    /// topological order
    #[default]
    ByScc,
    /// SCCs merged by condensation level: fewer, larger strata
    PseudoMinimal,
    /// No splitting: the whole rule base as a single stratum
    SingleEvaluation,
}

/// Compute a stratification of a rule base
pub fn stratify(rule_base: &RuleBase, strategy: StratificationStrategy) -> Vec<RuleBase> {
    if rule_base.is_empty() {
        return vec![rule_base.clone()];
    }
    match strategy {
        StratificationStrategy::SingleEvaluation => vec![rule_base.clone()],
        StratificationStrategy::ByScc => {
            let grd = Grd::new(rule_base);
            grd.sccs()
                .into_iter()
                .map(|component| stratum_of(rule_base, &component))
                .collect()
        }
        StratificationStrategy::PseudoMinimal => {
            let grd = Grd::new(rule_base);
            let sccs = grd.sccs();
            // Level of an SCC: one past the highest level among its
            // predecessors. SCCs are already topologically ordered.
            let mut level_of_rule: FxHashMap<usize, usize> = FxHashMap::default();
            let mut levels: Vec<Vec<usize>> = Vec::new();
            for component in &sccs {
                let mut level = 0;
                for &rule in component {
                    for (&other, &other_level) in &level_of_rule {
                        if grd.successors(other).contains(&rule) {
                            level = level.max(other_level + 1);
                        }
                    }
                }
                while levels.len() <= level {
                    levels.push(Vec::new());
                }
                for &rule in component {
                    level_of_rule.insert(rule, level);
                    levels[level].push(rule);
                }
            }
            levels
                .into_iter()
                .filter(|rules| !rules.is_empty())
                .map(|rules| stratum_of(rule_base, &rules))
                .collect()
        }
    }
}

/// A rule base holding the selected rules; negative constraints ride
/// along on the last stratum only, via the caller
fn stratum_of(rule_base: &RuleBase, members: &[usize]) -> RuleBase {
    let mut stratum = RuleBase::new();
    for &index in members {
        if let Some(rule) = rule_base.rules().get(index) {
            stratum.add_rule(rule.clone());
        }
    }
    stratum
}

/// The stratified chase
///
/// Owns the chasable data and threads it through one inner chase per
/// stratum.
pub struct StratifiedChase {
    strata: Vec<RuleBase>,
    data: Option<ChasableData>,
    config: ChaseConfig,
    final_predicates: Option<Vec<Predicate>>,
    strata_run: usize,
}

impl StratifiedChase {
    /// Run every stratum to fixpoint, in order
    pub fn execute(&mut self) -> ChaseResult<()> {
        let mut data = self.data.take().ok_or_else(|| {
            ChaseError::Configuration("stratified chase has no chasable data".to_string())
        })?;

        let removal_plan = self.removal_plan();
        for (index, stratum) in self.strata.iter().enumerate() {
            let mut chase = ChaseBuilder::new()
                .chasable_data(data)
                .rule_base(stratum.clone())
                .scheduler(self.config.scheduler)
                .applier(self.config.applier)
                .transformer(self.config.transformer)
                .computer(self.config.computer)
                .checker(self.config.checker)
                .renamer(self.config.renamer)
                .facts_handler(self.config.handler)
                .build()?;
            chase.execute()?;
            data = chase.into_data();
            self.strata_run = index + 1;

            if let Some(doomed) = removal_plan.get(&index) {
                drop_predicates(&mut data, doomed);
            }
            debug!(
                stratum = index,
                rules = stratum.len(),
                atoms = data.target().len(),
                "stratum saturated"
            );
        }
        self.data = Some(data);
        Ok(())
    }

    /// Number of strata completed so far
    pub fn strata_run(&self) -> usize {
        self.strata_run
    }

    /// The strata, in execution order
    pub fn strata(&self) -> &[RuleBase] {
        &self.strata
    }

    /// Unwrap into the chased data
    ///
    /// Fails when called while a run is in flight.
    pub fn into_data(self) -> ChaseResult<ChasableData> {
        self.data.ok_or_else(|| {
            ChaseError::Lifecycle("stratified chase data was consumed mid-run".to_string())
        })
    }

    /// After which stratum can each intermediate predicate be dropped?
    ///
    /// A non-final predicate is dropped right after the last stratum
    /// whose rule bodies (or constraints) read it.
    fn removal_plan(&self) -> FxHashMap<usize, Vec<Predicate>> {
        let mut plan: FxHashMap<usize, Vec<Predicate>> = FxHashMap::default();
        let Some(final_predicates) = &self.final_predicates else {
            return plan;
        };

        let mut all_predicates: Vec<Predicate> = Vec::new();
        let mut last_read: FxHashMap<Predicate, usize> = FxHashMap::default();
        let mut last_produced: FxHashMap<Predicate, usize> = FxHashMap::default();
        for (index, stratum) in self.strata.iter().enumerate() {
            for rule in stratum.rules() {
                for atom in rule.flattened_body().atoms_with_negated() {
                    let predicate = atom.predicate().clone();
                    if !all_predicates.contains(&predicate) {
                        all_predicates.push(predicate.clone());
                    }
                    last_read.insert(predicate, index);
                }
                for atom in rule.head_atoms() {
                    let predicate = atom.predicate().clone();
                    if !all_predicates.contains(&predicate) {
                        all_predicates.push(predicate.clone());
                    }
                    last_produced.insert(predicate, index);
                }
            }
            for constraint in stratum.negative_constraints() {
                for atom in constraint.body().atoms_with_negated() {
                    last_read.insert(atom.predicate().clone(), index);
                }
            }
        }

        let last_stratum = self.strata.len().saturating_sub(1);
        for predicate in all_predicates {
            if final_predicates.contains(&predicate) {
                continue;
            }
            // Not before the last stratum reading it, and not before
            // the last stratum still producing it.
            let drop_after = last_read
                .get(&predicate)
                .copied()
                .unwrap_or(0)
                .max(last_produced.get(&predicate).copied().unwrap_or(0));
            plan.entry(drop_after.min(last_stratum))
                .or_default()
                .push(predicate);
        }
        plan
    }
}

fn drop_predicates(data: &mut ChasableData, predicates: &[Predicate]) {
    let doomed: Vec<atom_model::Atom> = data
        .target()
        .atoms()
        .filter(|atom| predicates.contains(atom.predicate()))
        .cloned()
        .collect();
    if !doomed.is_empty() {
        data.target_mut().remove_all(&doomed);
    }
}

/// Builder for the stratified chase
///
/// Carries the same policy selectors as [`ChaseBuilder`]; strata can
/// be given explicitly or derived by a [`StratificationStrategy`].
#[derive(Default)]
pub struct StratifiedChaseBuilder {
    config: ChaseConfig,
    data: Option<ChasableData>,
    rule_base: Option<RuleBase>,
    explicit_strata: Option<Vec<RuleBase>>,
    strategy: StratificationStrategy,
    final_predicates: Option<Vec<Predicate>>,
}

impl StratifiedChaseBuilder {
    /// An empty builder with default selectors
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the data to saturate (required)
    pub fn chasable_data(mut self, data: ChasableData) -> Self {
        self.data = Some(data);
        self
    }

    /// Set the rule base the strata derive from
    pub fn rule_base(mut self, rule_base: RuleBase) -> Self {
        self.rule_base = Some(rule_base);
        self
    }

    /// Give the strata explicitly, bypassing stratification
    pub fn strata(mut self, strata: Vec<RuleBase>) -> Self {
        self.explicit_strata = Some(strata);
        self
    }

    /// Select the stratification strategy
    pub fn strategy(mut self, strategy: StratificationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Keep only these predicates in the final target; intermediates
    /// are dropped as soon as no later stratum reads them
    pub fn final_predicates(mut self, predicates: Vec<Predicate>) -> Self {
        self.final_predicates = Some(predicates);
        self
    }

    /// Select the inner scheduler
    pub fn scheduler(mut self, kind: crate::SchedulerKind) -> Self {
        self.config.scheduler = kind;
        self
    }

    /// Select the inner trigger computer
    pub fn computer(mut self, kind: crate::ComputerKind) -> Self {
        self.config.computer = kind;
        self
    }

    /// Select the inner trigger checker
    pub fn checker(mut self, kind: crate::CheckerKind) -> Self {
        self.config.checker = kind;
        self
    }

    /// Select the inner existential renamer
    pub fn renamer(mut self, kind: crate::RenamerKind) -> Self {
        self.config.renamer = kind;
        self
    }

    /// Materialize the stratified chase
    pub fn build(self) -> ChaseResult<StratifiedChase> {
        let data = self.data.ok_or_else(|| {
            ChaseError::Configuration("chasable data is not set".to_string())
        })?;
        let strata = match self.explicit_strata {
            Some(strata) => strata,
            None => {
                let rule_base = self.rule_base.ok_or_else(|| {
                    ChaseError::Configuration(
                        "rule base is not set and no explicit strata were given".to_string(),
                    )
                })?;
                stratify(&rule_base, self.strategy)
            }
        };
        Ok(StratifiedChase {
            strata,
            data: Some(data),
            config: self.config,
            final_predicates: self.final_predicates,
            strata_run: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atom_model::{Atom, Formula, Rule, Term};

    fn atom(p: &str, vars: &[&str]) -> Formula {
        Formula::Atom(
            Atom::new(
                Predicate::new(p, vars.len()),
                vars.iter().map(|v| Term::variable(*v)),
            )
            .unwrap(),
        )
    }

    fn chain_base() -> RuleBase {
        RuleBase::from_rules(
            [
                Rule::new(atom("p", &["X"]), atom("q", &["X"]), None).unwrap(),
                Rule::new(atom("q", &["X"]), atom("r", &["X"]), None).unwrap(),
            ],
            [],
        )
    }

    #[test]
    fn test_by_scc_stratification_orders_strata() {
        let strata = stratify(&chain_base(), StratificationStrategy::ByScc);
        assert_eq!(strata.len(), 2);
        assert_eq!(strata[0].rules()[0].head_atoms()[0].predicate().name(), "q");
        assert_eq!(strata[1].rules()[0].head_atoms()[0].predicate().name(), "r");
    }

    #[test]
    fn test_single_evaluation_is_one_stratum() {
        let strata = stratify(&chain_base(), StratificationStrategy::SingleEvaluation);
        assert_eq!(strata.len(), 1);
        assert_eq!(strata[0].len(), 2);
    }

    #[test]
    fn test_pseudo_minimal_merges_independent_rules() {
        // Two independent rules share level 0: one stratum.
        let base = RuleBase::from_rules(
            [
                Rule::new(atom("p", &["X"]), atom("q", &["X"]), None).unwrap(),
                Rule::new(atom("a", &["X"]), atom("b", &["X"]), None).unwrap(),
            ],
            [],
        );
        let strata = stratify(&base, StratificationStrategy::PseudoMinimal);
        assert_eq!(strata.len(), 1);
        assert_eq!(strata[0].len(), 2);
    }
}
