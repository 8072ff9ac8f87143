//! Trigger checking: is this (rule, substitution) firing legal?

use crate::ChaseResult;
use ahash::AHashSet;
use atom_model::{Atom, FoQuery, Rule, Substitution, Term, Variable};
use fact_store::FactBase;
use homomorphism::{FoQueryEvaluator, HomomorphismIterator};
use std::collections::BTreeSet;

/// Decides whether a candidate trigger may fire
///
/// Checkers are stateful (memoized sets of already-fired triggers)
/// and consulted once per (rule, substitution) candidate.
pub trait TriggerChecker: Send {
    /// True when the trigger is allowed to fire
    fn check(
        &mut self,
        rule_index: usize,
        rule: &Rule,
        substitution: &Substitution,
        target: &dyn FactBase,
    ) -> ChaseResult<bool>;
}

/// Fires unconditionally
///
/// Only safe for datalog, and only combined with a step or atom limit.
#[derive(Debug, Default)]
pub struct AlwaysTrueChecker;

impl AlwaysTrueChecker {
    /// Create an always-true checker
    pub fn new() -> Self {
        Self
    }
}

impl TriggerChecker for AlwaysTrueChecker {
    fn check(
        &mut self,
        _rule_index: usize,
        _rule: &Rule,
        _substitution: &Substitution,
        _target: &dyn FactBase,
    ) -> ChaseResult<bool> {
        Ok(true)
    }
}

/// Fires each (rule, substitution) at most once per chase
#[derive(Debug, Default)]
pub struct ObliviousChecker {
    fired: AHashSet<(usize, Substitution)>,
}

impl ObliviousChecker {
    /// Create an oblivious checker
    pub fn new() -> Self {
        Self::default()
    }
}

impl TriggerChecker for ObliviousChecker {
    fn check(
        &mut self,
        rule_index: usize,
        _rule: &Rule,
        substitution: &Substitution,
        _target: &dyn FactBase,
    ) -> ChaseResult<bool> {
        Ok(self.fired.insert((rule_index, substitution.normalize())))
    }
}

/// Fires each (rule, frontier restriction) at most once per chase
#[derive(Debug, Default)]
pub struct SemiObliviousChecker {
    fired: AHashSet<(usize, Substitution)>,
}

impl SemiObliviousChecker {
    /// Create a semi-oblivious checker
    pub fn new() -> Self {
        Self::default()
    }
}

impl TriggerChecker for SemiObliviousChecker {
    fn check(
        &mut self,
        rule_index: usize,
        rule: &Rule,
        substitution: &Substitution,
        _target: &dyn FactBase,
    ) -> ChaseResult<bool> {
        let key = substitution.restrict(rule.frontier());
        Ok(self.fired.insert((rule_index, key)))
    }
}

/// Fires only when the head is not already satisfied
///
/// The head under the frontier bindings (existentials still
/// quantified) is evaluated as a query against the target; any
/// homomorphism means the trigger is redundant. For datalog rules the
/// frontier image is the full head, so this degenerates to a
/// containment check. A semi-oblivious memo gates re-checks of the
/// same trigger.
#[derive(Debug, Default)]
pub struct RestrictedChecker {
    gate: SemiObliviousChecker,
    evaluator: FoQueryEvaluator,
}

impl RestrictedChecker {
    /// Create a restricted checker
    pub fn new() -> Self {
        Self::default()
    }

    fn head_satisfied(
        &self,
        rule: &Rule,
        substitution: &Substitution,
        target: &dyn FactBase,
    ) -> ChaseResult<bool> {
        let query = FoQuery::new(rule.head().clone(), Vec::new());
        let seed = substitution.restrict(rule.frontier());
        let mut results = self
            .evaluator
            .evaluate_with(&query, target.as_data(), seed)?;
        Ok(results.next().is_some())
    }
}

impl TriggerChecker for RestrictedChecker {
    fn check(
        &mut self,
        rule_index: usize,
        rule: &Rule,
        substitution: &Substitution,
        target: &dyn FactBase,
    ) -> ChaseResult<bool> {
        if !self.gate.check(rule_index, rule, substitution, target)? {
            return Ok(false);
        }
        Ok(!self.head_satisfied(rule, substitution, target)?)
    }
}

/// Restricted plus a local homomorphism-equivalence guard
///
/// After the restricted test passes, collects the target piece
/// reachable from the frontier images through shared nulls and rejects
/// the trigger when piece ∪ head image folds into the target. This is
/// a per-trigger homomorphism-equivalence test: expensive, intended
/// for verification-grade runs rather than production saturation.
#[derive(Debug, Default)]
pub struct EquivalentChecker {
    restricted: RestrictedChecker,
}

impl EquivalentChecker {
    /// Create an equivalent checker
    pub fn new() -> Self {
        Self::default()
    }

    /// Target atoms connected to the frontier images via variables
    fn frontier_piece(
        rule: &Rule,
        substitution: &Substitution,
        target: &dyn FactBase,
    ) -> Vec<Atom> {
        let mut pending: Vec<Variable> = Vec::new();
        for variable in rule.frontier() {
            if let Term::Variable(null) = substitution.apply_term(&Term::Variable(variable.clone()))
            {
                pending.push(null);
            }
        }
        let mut visited: BTreeSet<Variable> = BTreeSet::new();
        let mut piece: Vec<Atom> = Vec::new();
        while let Some(current) = pending.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            for atom in target.atoms() {
                let variables = atom.variables();
                if !variables.contains(&current) || piece.contains(atom) {
                    continue;
                }
                piece.push(atom.clone());
                for variable in variables {
                    if !visited.contains(&variable) {
                        pending.push(variable);
                    }
                }
            }
        }
        piece
    }
}

impl TriggerChecker for EquivalentChecker {
    fn check(
        &mut self,
        rule_index: usize,
        rule: &Rule,
        substitution: &Substitution,
        target: &dyn FactBase,
    ) -> ChaseResult<bool> {
        if !self.restricted.check(rule_index, rule, substitution, target)? {
            return Ok(false);
        }
        let piece = Self::frontier_piece(rule, substitution, target);
        if piece.is_empty() {
            return Ok(true);
        }
        let mut atoms = piece;
        for atom in rule.head_atoms() {
            let image = substitution.apply_atom(atom);
            if !atoms.contains(&image) {
                atoms.push(image);
            }
        }
        let mut folded =
            HomomorphismIterator::new(&atoms, target.as_data(), Substitution::new())?;
        Ok(folded.next().is_none())
    }
}

/// Conjunction of several checkers (short-circuiting)
pub struct MultiChecker {
    checkers: Vec<Box<dyn TriggerChecker>>,
}

impl MultiChecker {
    /// Combine checkers; all must accept for the trigger to fire
    pub fn new(checkers: Vec<Box<dyn TriggerChecker>>) -> Self {
        Self { checkers }
    }
}

impl TriggerChecker for MultiChecker {
    fn check(
        &mut self,
        rule_index: usize,
        rule: &Rule,
        substitution: &Substitution,
        target: &dyn FactBase,
    ) -> ChaseResult<bool> {
        for checker in &mut self.checkers {
            if !checker.check(rule_index, rule, substitution, target)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
