//! Trigger computation: substitutions satisfying a shared rule body

use crate::data::ChasableData;
use crate::step::StepContext;
use crate::ChaseResult;
use atom_model::{Atom, FoQuery, Formula, Predicate, RuleBase, Substitution, Variable};
use fact_store::{Data, WithoutAtoms};
use homomorphism::FoQueryEvaluator;
use rustc_hash::FxHashSet;

/// Enumerates the substitutions satisfying a grouped rule body
///
/// Computers are stateless per step (`compute` takes `&self`); the
/// semi-naive variant precomputes its IDB predicate set in [`init`].
///
/// [`init`]: TriggerComputer::init
pub trait TriggerComputer: Send + Sync {
    /// Bind the computer to the rule base it will serve
    fn init(&mut self, _rule_base: &RuleBase) {}

    /// Substitutions satisfying `body` against the readable data
    fn compute(
        &self,
        body: &FoQuery,
        rules: &[usize],
        data: &ChasableData,
        ctx: &StepContext<'_>,
    ) -> ChaseResult<Vec<Substitution>>;
}

/// Evaluate the body against the full readable data
fn naive_compute(
    evaluator: &FoQueryEvaluator,
    body: &FoQuery,
    data: &ChasableData,
) -> ChaseResult<Vec<Substitution>> {
    let view = data.read_view();
    let results: Vec<Substitution> = evaluator.evaluate(body, &view)?.collect();
    Ok(results)
}

/// The conjunct atoms of a body that is a plain conjunction of atoms
///
/// `None` when the body carries negation, disjunction or quantifiers;
/// the incremental computers fall back to naive evaluation then.
fn conjunctive_atoms(formula: &Formula) -> Option<Vec<&Atom>> {
    match formula {
        Formula::Atom(atom) => Some(vec![atom]),
        Formula::And(l, r) => {
            let mut atoms = conjunctive_atoms(l)?;
            atoms.extend(conjunctive_atoms(r)?);
            Some(atoms)
        }
        _ => None,
    }
}

/// Extend each partial substitution by matching one more atom
fn join_with_atom(
    evaluator: &FoQueryEvaluator,
    partial: Vec<Substitution>,
    atom: &Atom,
    data: &dyn Data,
) -> ChaseResult<Vec<Substitution>> {
    let query = FoQuery::from_atom(atom.clone());
    let mut out = Vec::new();
    for seed in partial {
        let extensions: Vec<Substitution> =
            evaluator.evaluate_with(&query, data, seed)?.collect();
        out.extend(extensions);
    }
    Ok(out)
}

/// Naive trigger computer: the full body against the full data
#[derive(Debug, Default)]
pub struct NaiveComputer {
    evaluator: FoQueryEvaluator,
}

impl NaiveComputer {
    /// Create a naive computer
    pub fn new() -> Self {
        Self::default()
    }
}

impl TriggerComputer for NaiveComputer {
    fn compute(
        &self,
        body: &FoQuery,
        _rules: &[usize],
        data: &ChasableData,
        _ctx: &StepContext<'_>,
    ) -> ChaseResult<Vec<Substitution>> {
        naive_compute(&self.evaluator, body, data)
    }
}

/// Semi-naive trigger computer
///
/// Requires at least one IDB atom of the body to match a fact produced
/// in the last step (the anchor). Atoms left of the anchor join
/// against the full data; IDB atoms right of the anchor join against a
/// delta view subtracting the last step's facts, so no trigger is
/// rediscovered through two different anchors.
#[derive(Debug, Default)]
pub struct SemiNaiveComputer {
    evaluator: FoQueryEvaluator,
    idb_predicates: FxHashSet<Predicate>,
}

impl SemiNaiveComputer {
    /// Create a semi-naive computer
    pub fn new() -> Self {
        Self::default()
    }
}

impl TriggerComputer for SemiNaiveComputer {
    fn init(&mut self, rule_base: &RuleBase) {
        self.idb_predicates.clear();
        for rule in rule_base.rules() {
            for atom in rule.head_atoms() {
                self.idb_predicates.insert(atom.predicate().clone());
            }
        }
    }

    fn compute(
        &self,
        body: &FoQuery,
        _rules: &[usize],
        data: &ChasableData,
        ctx: &StepContext<'_>,
    ) -> ChaseResult<Vec<Substitution>> {
        let Some(last_facts) = ctx.last.created_facts() else {
            return naive_compute(&self.evaluator, body, data);
        };
        let Some(atoms) = conjunctive_atoms(body.formula()) else {
            return naive_compute(&self.evaluator, body, data);
        };

        let (idb_atoms, edb_atoms): (Vec<&Atom>, Vec<&Atom>) = atoms
            .into_iter()
            .partition(|a| self.idb_predicates.contains(a.predicate()));
        if idb_atoms.is_empty() {
            return naive_compute(&self.evaluator, body, data);
        }

        let view = data.read_view();
        let delta_removed = WithoutAtoms::new(&view, last_facts);

        let mut seen: FxHashSet<Substitution> = FxHashSet::default();
        let mut results: Vec<Substitution> = Vec::new();

        for (anchor_index, anchor) in idb_atoms.iter().enumerate() {
            let anchor_query = FoQuery::from_atom((*anchor).clone());
            let seeds: Vec<Substitution> = self
                .evaluator
                .evaluate(&anchor_query, last_facts)?
                .collect();
            if seeds.is_empty() {
                continue;
            }

            let mut partial = seeds;
            for atom in edb_atoms.iter().chain(&idb_atoms[..anchor_index]) {
                partial = join_with_atom(&self.evaluator, partial, atom, &view)?;
                if partial.is_empty() {
                    break;
                }
            }
            if partial.is_empty() {
                continue;
            }
            for atom in &idb_atoms[anchor_index + 1..] {
                partial = join_with_atom(&self.evaluator, partial, atom, &delta_removed)?;
                if partial.is_empty() {
                    break;
                }
            }

            for substitution in partial {
                let normalized = substitution.normalize();
                if seen.insert(normalized.clone()) {
                    results.push(normalized);
                }
            }
        }
        Ok(results)
    }
}

/// Two-steps trigger computer
///
/// Seeds matches from the last step's facts (any body atom may be the
/// seed), then completes each seed against the full data.
#[derive(Debug, Default)]
pub struct TwoStepsComputer {
    evaluator: FoQueryEvaluator,
}

impl TwoStepsComputer {
    /// Create a two-steps computer
    pub fn new() -> Self {
        Self::default()
    }
}

impl TriggerComputer for TwoStepsComputer {
    fn compute(
        &self,
        body: &FoQuery,
        _rules: &[usize],
        data: &ChasableData,
        ctx: &StepContext<'_>,
    ) -> ChaseResult<Vec<Substitution>> {
        let Some(last_facts) = ctx.last.created_facts() else {
            return naive_compute(&self.evaluator, body, data);
        };
        let Some(atoms) = conjunctive_atoms(body.formula()) else {
            return naive_compute(&self.evaluator, body, data);
        };

        if atoms.len() == 1 {
            let results: Vec<Substitution> =
                self.evaluator.evaluate(body, last_facts)?.collect();
            return Ok(results);
        }

        let view = data.read_view();
        let mut seen: FxHashSet<Substitution> = FxHashSet::default();
        let mut results: Vec<Substitution> = Vec::new();

        for atom in atoms {
            let seed_query = FoQuery::from_atom(atom.clone());
            let seeds: Vec<Substitution> =
                self.evaluator.evaluate(&seed_query, last_facts)?.collect();
            for seed in seeds {
                let completions: Vec<Substitution> =
                    self.evaluator.evaluate_with(body, &view, seed)?.collect();
                for substitution in completions {
                    let normalized = substitution.normalize();
                    if seen.insert(normalized.clone()) {
                        results.push(normalized);
                    }
                }
            }
        }
        Ok(results)
    }
}

/// Restricted trigger computer: evaluates `body ∧ ¬head` per rule
///
/// Skips triggers whose head is already satisfied, directly at
/// computation time.
#[derive(Debug, Default)]
pub struct RestrictedComputer {
    evaluator: FoQueryEvaluator,
}

impl RestrictedComputer {
    /// Create a restricted computer
    pub fn new() -> Self {
        Self::default()
    }
}

impl TriggerComputer for RestrictedComputer {
    fn compute(
        &self,
        body: &FoQuery,
        rules: &[usize],
        data: &ChasableData,
        ctx: &StepContext<'_>,
    ) -> ChaseResult<Vec<Substitution>> {
        let view = data.read_view();
        let mut seen: FxHashSet<Substitution> = FxHashSet::default();
        let mut results: Vec<Substitution> = Vec::new();
        for &index in rules {
            let Some(rule) = ctx.rule_base.rules().get(index) else {
                continue;
            };
            let answers: Vec<Variable> = body.formula().free_variables().into_iter().collect();
            let formula = Formula::and(
                rule.flattened_body().clone(),
                Formula::not(rule.head().clone()),
            );
            let query = FoQuery::new(formula, answers);
            let found: Vec<Substitution> = self.evaluator.evaluate(&query, &view)?.collect();
            for substitution in found {
                let normalized = substitution.normalize();
                if seen.insert(normalized.clone()) {
                    results.push(normalized);
                }
            }
        }
        Ok(results)
    }
}
