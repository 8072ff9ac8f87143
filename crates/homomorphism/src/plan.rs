//! Join planning: equality elimination, function-term expansion and
//! greedy atom ordering

use crate::{EvalError, EvalResult};
use atom_model::{Atom, BasicQuery, Substitution, Term, Variable};
use fact_store::{function_predicate, Data, PositionConstraint};
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

/// A prepared join: ordered atoms plus the extended seed substitution
pub(crate) struct Plan {
    /// Atoms to join, already rewritten under the seed substitution
    pub atoms: Vec<Atom>,
    /// Seed bindings extended by eager equality unification
    pub initial: Substitution,
    /// True when an equality constraint is unsatisfiable: the join
    /// emits nothing at all
    pub unsatisfiable: bool,
}

/// Prepare a source atom set for joining
///
/// 1. Expand evaluable function terms into computed-predicate atoms
///    (also inside `=` atoms, so `D = add(P, P)` becomes a computed
///    atom plus a variable equality).
/// 2. Resolve `=` atoms by eager unification extending the seed: a
///    ground/ground mismatch or an occurs-check failure makes the
///    plan unsatisfiable.
/// 3. Rewrite the remaining atoms under the extended seed.
/// 4. Reorder greedily, most-constrained first.
pub(crate) fn prepare(
    source: &[Atom],
    data: &dyn Data,
    seed: Substitution,
) -> EvalResult<Plan> {
    let mut substitution = seed;

    let mut expanded_source: Vec<Atom> = Vec::new();
    for atom in source {
        expand_function_terms(atom, &mut expanded_source)?;
    }

    // Equality elimination. Every step applies the current substitution
    // first, so chains like X = Y, Y = a resolve regardless of order;
    // the composition keeps earlier images resolved as well.
    let mut pending: Vec<Atom> = Vec::with_capacity(expanded_source.len());
    for atom in expanded_source {
        if !atom.predicate().is_equality() {
            pending.push(atom);
            continue;
        }
        let left = substitution.apply_term(&atom.terms()[0]);
        let right = substitution.apply_term(&atom.terms()[1]);
        if left == right {
            continue;
        }
        let unified = match (&left, &right) {
            (Term::Variable(v), other) | (other, Term::Variable(v)) => {
                if occurs(v, other) {
                    None
                } else {
                    let binding: Substitution =
                        [(v.clone(), (*other).clone())].into_iter().collect();
                    Some(binding.compose(&substitution))
                }
            }
            // Two distinct non-variable sides never unify here.
            _ => None,
        };
        match unified {
            Some(extended) => substitution = extended,
            None => {
                return Ok(Plan {
                    atoms: Vec::new(),
                    initial: substitution,
                    unsatisfiable: true,
                })
            }
        }
    }

    let expanded: Vec<Atom> = pending
        .iter()
        .map(|atom| substitution.apply_atom(atom))
        .collect();

    probe_unknown_predicates(&expanded, data)?;

    let ordered = order_atoms(expanded, data, substitution.domain().cloned().collect())?;
    trace!(atoms = ordered.len(), seed = %substitution, "join planned");
    Ok(Plan {
        atoms: ordered,
        initial: substitution,
        unsatisfiable: false,
    })
}

/// Occurs check: does the variable appear anywhere in the term?
fn occurs(variable: &Variable, term: &Term) -> bool {
    let mut vars = BTreeSet::new();
    term.collect_variables(&mut vars);
    vars.contains(variable)
}

/// Surface unknown-predicate failures at plan time
///
/// A plain store answers an absent predicate with emptiness; a routed
/// union reports the lookup failure we propagate here.
fn probe_unknown_predicates(atoms: &[Atom], data: &dyn Data) -> EvalResult<()> {
    for atom in atoms {
        if !data.has_predicate(atom.predicate()) {
            let probe = BasicQuery::new(
                atom.predicate().clone(),
                BTreeMap::new(),
                BTreeMap::new(),
            )?;
            data.evaluate(&probe)?;
        }
    }
    Ok(())
}

/// Validate a conjunct atom list without running it
///
/// Mirrors [`prepare`] on a variable-set level: equality variables
/// count as determined, function terms are expanded, unknown
/// predicates are probed, and the greedy order must exist given the
/// variables `bound` by the enclosing context.
pub(crate) fn validate_atoms(
    atoms: &[Atom],
    data: &dyn Data,
    bound: &BTreeSet<Variable>,
) -> EvalResult<()> {
    let mut determined = bound.clone();
    let mut rest: Vec<Atom> = Vec::new();
    for atom in atoms {
        if atom.predicate().is_equality() {
            determined.extend(atom.variables());
        } else {
            rest.push(atom.clone());
        }
    }
    let mut expanded: Vec<Atom> = Vec::new();
    for atom in &rest {
        expand_function_terms(atom, &mut expanded)?;
    }
    probe_unknown_predicates(&expanded, data)?;
    order_atoms(expanded, data, determined)?;
    Ok(())
}

/// Rewrite one atom, pushing computed-predicate atoms for every
/// evaluable function term it contains (innermost first)
fn expand_function_terms(atom: &Atom, out: &mut Vec<Atom>) -> EvalResult<()> {
    let mut new_terms: Vec<Term> = Vec::with_capacity(atom.terms().len());
    let mut extra: Vec<Atom> = Vec::new();
    for term in atom.terms() {
        new_terms.push(rewrite_term(term, &mut extra)?);
    }
    out.extend(extra);
    if new_terms.as_slice() == atom.terms() {
        out.push(atom.clone());
    } else {
        out.push(Atom::new(atom.predicate().clone(), new_terms)?);
    }
    Ok(())
}

fn rewrite_term(term: &Term, extra: &mut Vec<Atom>) -> EvalResult<Term> {
    match term {
        Term::EvaluableFunction(function) => {
            let mut args: Vec<Term> = Vec::with_capacity(function.args().len());
            for arg in function.args() {
                args.push(rewrite_term(arg, extra)?);
            }
            let result = Term::Variable(Variable::fresh());
            let predicate = function_predicate(function.name(), args.len());
            args.push(result.clone());
            extra.push(Atom::new(predicate, args)?);
            Ok(result)
        }
        _ => Ok(term.clone()),
    }
}

/// Greedy most-constrained-first ordering
///
/// Repeatedly pick, among the atoms schedulable under the variables
/// already determined, the one with the smallest estimated result.
/// Sources that cannot estimate sink to the end; ties break on the
/// original index. Fails when no remaining atom is schedulable (an
/// operand of a ground-required position can never become bound).
pub(crate) fn order_atoms(
    atoms: Vec<Atom>,
    data: &dyn Data,
    mut determined: BTreeSet<Variable>,
) -> EvalResult<Vec<Atom>> {
    let mut remaining: Vec<Option<Atom>> = atoms.into_iter().map(Some).collect();
    let mut ordered: Vec<Atom> = Vec::with_capacity(remaining.len());

    while ordered.len() < remaining.len() {
        let mut best: Option<(usize, usize)> = None; // (estimate, index)
        for (index, slot) in remaining.iter().enumerate() {
            let Some(atom) = slot else { continue };
            if !schedulable(atom, data, &determined) {
                continue;
            }
            let estimate = estimate(atom, data).unwrap_or(usize::MAX);
            let better = match best {
                None => true,
                Some((best_estimate, _)) => estimate < best_estimate,
            };
            if better {
                best = Some((estimate, index));
            }
        }
        let Some((_, index)) = best else {
            let stuck: Vec<String> = remaining
                .iter()
                .flatten()
                .map(|a| a.to_string())
                .collect();
            return Err(EvalError::UnsupportedQuery(format!(
                "no schedulable atom among: {}",
                stuck.join(", ")
            )));
        };
        let Some(atom) = remaining[index].take() else {
            continue;
        };
        determined.extend(atom.variables());
        ordered.push(atom);
    }
    Ok(ordered)
}

/// Will this atom's ground requirements be satisfied once the
/// determined variables carry runtime bindings?
pub(crate) fn schedulable(atom: &Atom, data: &dyn Data, determined: &BTreeSet<Variable>) -> bool {
    let Some(pattern) = data.atomic_pattern(atom.predicate()) else {
        // Unknown pattern: nothing to check, the source decides later.
        return true;
    };
    atom.terms()
        .iter()
        .enumerate()
        .all(|(position, term)| match pattern.constraint(position) {
            PositionConstraint::Any => true,
            PositionConstraint::Ground => match term {
                Term::Variable(v) => determined.contains(v),
                _ => term.is_ground(),
            },
        })
}

/// Advisory result-size estimate from the syntactically ground positions
fn estimate(atom: &Atom, data: &dyn Data) -> Option<usize> {
    let mut bound = BTreeMap::new();
    for (position, term) in atom.terms().iter().enumerate() {
        if term.is_ground() {
            bound.insert(position, term.clone());
        }
    }
    let query = BasicQuery::new(atom.predicate().clone(), bound, BTreeMap::new()).ok()?;
    data.estimate_bound(&query)
}
