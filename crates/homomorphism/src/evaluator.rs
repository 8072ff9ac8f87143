//! First-order query evaluation
//!
//! Dispatches on the formula sum. Conjunctions funnel their atoms into
//! one backtracking join; disjunction concatenates and deduplicates;
//! negation is negation-as-failure over range-restricted subformulas;
//! existentials project their variable out; universals are supported
//! in the `∀v.¬ψ` shape (the `¬∃v.ψ` reading).
//!
//! A validation pass runs before any iterator is built, so the lazy
//! pipeline itself never fails: every structural problem (unknown
//! predicate in a routed union, unsafely quantified negation,
//! unschedulable ground-required operand, quantifier shadowing)
//! surfaces eagerly as an [`EvalError`].

use crate::join::HomomorphismIterator;
use crate::plan;
use crate::{EvalError, EvalResult};
use atom_model::{Atom, ConjunctiveQuery, FoQuery, Formula, Substitution, Term, Variable};
use fact_store::Data;
use rustc_hash::FxHashSet;
use std::collections::BTreeSet;

/// A lazy stream of substitutions
pub type SubstitutionIter<'a> = Box<dyn Iterator<Item = Substitution> + 'a>;

/// Evaluator for first-order and conjunctive queries
///
/// Stateless; one instance serves any number of queries.
#[derive(Clone, Copy, Debug, Default)]
pub struct FoQueryEvaluator;

impl FoQueryEvaluator {
    /// Create an evaluator
    pub fn new() -> Self {
        Self
    }

    /// Evaluate a first-order query
    pub fn evaluate<'a>(
        &self,
        query: &'a FoQuery,
        data: &'a dyn Data,
    ) -> EvalResult<SubstitutionIter<'a>> {
        self.evaluate_with(query, data, Substitution::new())
    }

    /// Evaluate a first-order query under seed bindings
    ///
    /// The query's own pre-substitution (if any) extends the seed.
    pub fn evaluate_with<'a>(
        &self,
        query: &'a FoQuery,
        data: &'a dyn Data,
        seed: Substitution,
    ) -> EvalResult<SubstitutionIter<'a>> {
        let mut seed = seed;
        if let Some(pre) = query.pre_substitution() {
            for (variable, term) in pre.iter() {
                seed.insert(variable.clone(), term.clone());
            }
        }
        let bound: BTreeSet<Variable> = seed.domain().cloned().collect();
        validate(query.formula(), data, &bound)?;
        eval_formula(query.formula(), data, seed)
    }

    /// Evaluate a conjunctive query through the join engine directly
    pub fn evaluate_conjunctive<'a>(
        &self,
        query: &'a ConjunctiveQuery,
        data: &'a dyn Data,
    ) -> EvalResult<SubstitutionIter<'a>> {
        let seed = query.pre_substitution().cloned().unwrap_or_default();
        Ok(Box::new(HomomorphismIterator::new(
            query.atoms(),
            data,
            seed,
        )?))
    }

    /// Evaluate and project each result onto the answer variables
    ///
    /// An answer variable the formula leaves unbound projects to
    /// itself.
    pub fn evaluate_and_project<'a>(
        &self,
        query: &'a FoQuery,
        data: &'a dyn Data,
    ) -> EvalResult<Box<dyn Iterator<Item = Vec<Term>> + 'a>> {
        let answers: Vec<Variable> = query.answer_variables().to_vec();
        let results = self.evaluate(query, data)?;
        Ok(Box::new(results.map(move |substitution| {
            answers
                .iter()
                .map(|v| substitution.apply_term(&Term::Variable(v.clone())))
                .collect()
        })))
    }
}

/// Flatten a conjunction tree into its conjunct list
fn flatten_and<'a>(formula: &'a Formula, out: &mut Vec<&'a Formula>) {
    match formula {
        Formula::And(l, r) => {
            flatten_and(l, out);
            flatten_and(r, out);
        }
        _ => out.push(formula),
    }
}

fn eval_formula<'a>(
    formula: &'a Formula,
    data: &'a dyn Data,
    seed: Substitution,
) -> EvalResult<SubstitutionIter<'a>> {
    match formula {
        Formula::Atom(_) | Formula::And(..) => eval_conjunction(formula, data, seed),
        Formula::Or(..) => eval_disjunction(formula, data, seed),
        Formula::Not(_) | Formula::Forall(..) => {
            // A bare filter formula: emit the seed iff it holds.
            if negation_holds(formula, data, &seed) {
                Ok(Box::new(std::iter::once(seed)))
            } else {
                Ok(Box::new(std::iter::empty()))
            }
        }
        Formula::Exists(variable, inner) => {
            let variable = variable.clone();
            let results = eval_formula(inner, data, seed)?;
            Ok(Box::new(results.map(move |mut substitution| {
                substitution.remove(&variable);
                substitution
            })))
        }
    }
}

/// Conjunction: one backtracking join for the atoms, then the complex
/// conjuncts in order, then the negative filters
fn eval_conjunction<'a>(
    formula: &'a Formula,
    data: &'a dyn Data,
    seed: Substitution,
) -> EvalResult<SubstitutionIter<'a>> {
    let mut conjuncts = Vec::new();
    flatten_and(formula, &mut conjuncts);

    let mut atoms: Vec<Atom> = Vec::new();
    let mut complex: Vec<&'a Formula> = Vec::new();
    let mut filters: Vec<&'a Formula> = Vec::new();
    for conjunct in conjuncts {
        match conjunct {
            Formula::Atom(atom) => atoms.push(atom.clone()),
            Formula::Not(_) | Formula::Forall(..) => filters.push(conjunct),
            _ => complex.push(conjunct),
        }
    }

    let mut results: SubstitutionIter<'a> = if atoms.is_empty() {
        Box::new(std::iter::once(seed))
    } else {
        Box::new(HomomorphismIterator::new(&atoms, data, seed)?)
    };

    for conjunct in complex {
        results = Box::new(results.flat_map(move |substitution| {
            // Validation has vouched for this subformula; a residual
            // failure contributes nothing.
            eval_formula(conjunct, data, substitution)
                .unwrap_or_else(|_| Box::new(std::iter::empty()))
        }));
    }

    for filter in filters {
        results = Box::new(results.filter(move |s| negation_holds(filter, data, s)));
    }
    Ok(results)
}

/// Disjunction: concatenate the disjuncts' results, deduplicated on
/// the projection to the disjunction's free variables
fn eval_disjunction<'a>(
    formula: &'a Formula,
    data: &'a dyn Data,
    seed: Substitution,
) -> EvalResult<SubstitutionIter<'a>> {
    let free: Vec<Variable> = formula.free_variables().into_iter().collect();
    let mut results: SubstitutionIter<'a> = Box::new(std::iter::empty());
    for disjunct in formula.disjuncts() {
        let branch = eval_formula(disjunct, data, seed.clone())?;
        results = Box::new(results.chain(branch));
    }
    let mut seen: FxHashSet<Substitution> = FxHashSet::default();
    Ok(Box::new(
        results.filter(move |s| seen.insert(s.restrict(free.iter()))),
    ))
}

/// Does a negative filter hold under the given bindings?
///
/// - `¬ψ`: ψ has no result under the bindings
/// - `¬¬ψ`: ψ has a result (the boolean reading)
/// - `∀v.¬ψ`: no `v` satisfies ψ (the `¬∃v.ψ` reading)
fn negation_holds(formula: &Formula, data: &dyn Data, substitution: &Substitution) -> bool {
    match formula {
        Formula::Not(inner) => match inner.as_ref() {
            Formula::Not(positive) => has_any(positive, data, substitution),
            other => !has_any(other, data, substitution),
        },
        Formula::Forall(_, inner) => match inner.as_ref() {
            Formula::Not(positive) => !has_any(positive, data, substitution),
            // Rejected during validation.
            _ => false,
        },
        _ => false,
    }
}

fn has_any(formula: &Formula, data: &dyn Data, substitution: &Substitution) -> bool {
    eval_formula(formula, data, substitution.clone())
        .map(|mut results| results.next().is_some())
        .unwrap_or(false)
}

/// Structural validation, simulating which variables are bound
///
/// Returns the variable set guaranteed bound after this formula has
/// produced a result.
fn validate(
    formula: &Formula,
    data: &dyn Data,
    bound: &BTreeSet<Variable>,
) -> EvalResult<BTreeSet<Variable>> {
    match formula {
        Formula::Atom(_) | Formula::And(..) => {
            let mut conjuncts = Vec::new();
            flatten_and(formula, &mut conjuncts);

            let mut atoms: Vec<Atom> = Vec::new();
            let mut complex: Vec<&Formula> = Vec::new();
            let mut filters: Vec<&Formula> = Vec::new();
            for conjunct in conjuncts {
                match conjunct {
                    Formula::Atom(atom) => atoms.push(atom.clone()),
                    Formula::Not(_) | Formula::Forall(..) => filters.push(conjunct),
                    _ => complex.push(conjunct),
                }
            }

            let mut now_bound = bound.clone();
            plan::validate_atoms(&atoms, data, &now_bound)?;
            for atom in &atoms {
                now_bound.extend(atom.variables());
            }
            for conjunct in complex {
                now_bound = validate(conjunct, data, &now_bound)?;
            }
            for filter in filters {
                validate_filter(filter, data, &now_bound)?;
            }
            Ok(now_bound)
        }
        Formula::Or(..) => {
            // Only variables bound in every branch are bound after.
            let mut common: Option<BTreeSet<Variable>> = None;
            for disjunct in formula.disjuncts() {
                let branch = validate(disjunct, data, bound)?;
                common = Some(match common {
                    None => branch,
                    Some(acc) => acc.intersection(&branch).cloned().collect(),
                });
            }
            Ok(common.unwrap_or_else(|| bound.clone()))
        }
        Formula::Not(_) | Formula::Forall(..) => {
            validate_filter(formula, data, bound)?;
            Ok(bound.clone())
        }
        Formula::Exists(variable, inner) => {
            if bound.contains(variable) {
                return Err(EvalError::UnsupportedQuery(format!(
                    "quantified variable {variable} shadows a bound variable"
                )));
            }
            let mut after = validate(inner, data, bound)?;
            after.remove(variable);
            Ok(after)
        }
    }
}

/// Validate a negative filter (`¬ψ`, `¬¬ψ` or `∀v.¬ψ`)
fn validate_filter(
    formula: &Formula,
    data: &dyn Data,
    bound: &BTreeSet<Variable>,
) -> EvalResult<()> {
    match formula {
        Formula::Not(inner) => match inner.as_ref() {
            // The boolean reading leaves ψ's variables existential.
            Formula::Not(positive) => {
                validate(positive, data, bound)?;
                Ok(())
            }
            other => {
                if let Some(unsafe_var) =
                    other.free_variables().iter().find(|v| !bound.contains(*v))
                {
                    return Err(EvalError::UnsafeNegation(format!(
                        "variable {unsafe_var} in a negated subformula is not bound by \
                         an enclosing conjunct"
                    )));
                }
                validate(other, data, bound)?;
                Ok(())
            }
        },
        Formula::Forall(variable, inner) => {
            if let Some(unsafe_var) = formula
                .free_variables()
                .iter()
                .find(|v| !bound.contains(*v))
            {
                return Err(EvalError::UnsafeNegation(format!(
                    "variable {unsafe_var} under a universal filter is not bound by \
                     an enclosing conjunct"
                )));
            }
            match inner.as_ref() {
                Formula::Not(positive) => {
                    let after = validate(positive, data, bound)?;
                    if !after.contains(variable) {
                        return Err(EvalError::UnsafeNegation(format!(
                            "universal variable {variable} is not range-restricted \
                             by the negated body"
                        )));
                    }
                    Ok(())
                }
                _ => Err(EvalError::UnsupportedQuery(
                    "universal quantification is only supported over a negated body \
                     (the \u{00ac}\u{2203} reading)"
                        .to_string(),
                )),
            }
        }
        _ => Ok(()),
    }
}
