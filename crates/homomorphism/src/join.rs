//! The backtracking join iterator
//!
//! A depth-first traversal over the planned atom order, one frame per
//! atom, yielding one complete substitution per `next()`. The stack is
//! explicit, so query depth never threatens the call stack.

use crate::plan::{self, Plan};
use crate::EvalResult;
use atom_model::{Atom, BasicQuery, Substitution, Term, Variable};
use fact_store::{Data, TupleIter};
use std::collections::BTreeMap;

/// One open atom during the search
struct Frame<'a> {
    /// Remaining result tuples for this atom under the bindings that
    /// were current when the frame was opened
    results: TupleIter<'a>,
    /// Answer variables by ascending position
    answer_variables: Vec<Variable>,
    /// Variables this frame's current tuple introduced (undone on
    /// advance and on backtrack)
    introduced: Vec<Variable>,
}

/// Lazy backtracking join of an atom set against a data source
///
/// Emits every substitution `σ` extending the seed such that each
/// source atom under `σ` is deducible from the data. An empty source
/// set emits exactly the seed. Construction performs the fallible
/// planning (ordering, equality elimination, function expansion,
/// unknown-predicate surfacing); iteration is infallible.
pub struct HomomorphismIterator<'a> {
    data: &'a dyn Data,
    atoms: Vec<Atom>,
    frames: Vec<Frame<'a>>,
    current: Substitution,
    started: bool,
    done: bool,
}

impl<'a> HomomorphismIterator<'a> {
    /// Plan and open a join over the given source atoms
    pub fn new(source: &[Atom], data: &'a dyn Data, seed: Substitution) -> EvalResult<Self> {
        let Plan {
            atoms,
            initial,
            unsatisfiable,
        } = plan::prepare(source, data, seed)?;
        Ok(Self {
            data,
            atoms,
            frames: Vec::new(),
            current: initial,
            started: false,
            done: unsatisfiable,
        })
    }

    /// Open the frame for the atom at `depth` under current bindings
    fn open_frame(&self, depth: usize) -> Frame<'a> {
        let atom = self.current.apply_atom(&self.atoms[depth]);
        let mut bound: BTreeMap<usize, Term> = BTreeMap::new();
        let mut answers: BTreeMap<usize, Variable> = BTreeMap::new();
        for (position, term) in atom.terms().iter().enumerate() {
            match term {
                Term::Variable(v) => {
                    answers.insert(position, v.clone());
                }
                _ => {
                    bound.insert(position, term.clone());
                }
            }
        }
        let answer_variables: Vec<Variable> = answers.values().cloned().collect();
        let empty = || Frame {
            results: Box::new(std::iter::empty()),
            answer_variables: Vec::new(),
            introduced: Vec::new(),
        };

        let Ok(query) = BasicQuery::new(atom.predicate().clone(), bound, answers) else {
            return empty();
        };
        // A ground-required position holding a non-ground binding (for
        // instance a labelled null flowing into a comparison) simply
        // matches nothing.
        if !self.data.can_evaluate(&query) {
            return empty();
        }
        match self.data.evaluate(&query) {
            Ok(results) => Frame {
                results,
                answer_variables,
                introduced: Vec::new(),
            },
            // Planning has already surfaced routing failures; residual
            // evaluation errors degrade to emptiness.
            Err(_) => empty(),
        }
    }

    /// The current bindings with variable chains resolved
    ///
    /// Equality unification can leave `D ↦ R` while the join later
    /// binds `R ↦ 20`; emitted substitutions chase such chains to a
    /// fixpoint (with a depth guard against degenerate stores that
    /// hold variables aliasing query variables).
    fn resolved(&self) -> Substitution {
        let mut out = Substitution::new();
        for (variable, term) in self.current.iter() {
            let mut resolved = term.clone();
            for _ in 0..64 {
                let next = self.current.apply_term(&resolved);
                if next == resolved {
                    break;
                }
                resolved = next;
            }
            out.insert(variable.clone(), resolved);
        }
        out
    }

    /// Undo the top frame's bindings, then advance it to its next
    /// consistent tuple. Returns `false` when the frame is exhausted.
    fn advance_top(&mut self) -> bool {
        // Disjoint borrows of the frame stack and the binding state.
        let Self {
            frames, current, ..
        } = self;
        let Some(frame) = frames.last_mut() else {
            return false;
        };
        for variable in frame.introduced.drain(..) {
            current.remove(&variable);
        }
        'tuples: for tuple in frame.results.by_ref() {
            let mut introduced = Vec::new();
            for (variable, value) in frame.answer_variables.iter().zip(tuple) {
                let fresh = !current.contains(variable);
                if !current.bind(variable.clone(), value) {
                    for undo in introduced {
                        current.remove(&undo);
                    }
                    continue 'tuples;
                }
                if fresh {
                    introduced.push(variable.clone());
                }
            }
            frame.introduced = introduced;
            return true;
        }
        false
    }
}

impl Iterator for HomomorphismIterator<'_> {
    type Item = Substitution;

    fn next(&mut self) -> Option<Substitution> {
        if self.done {
            return None;
        }
        // An empty source set yields exactly the seed.
        if self.atoms.is_empty() {
            self.done = true;
            return Some(self.resolved());
        }
        if !self.started {
            self.started = true;
            let frame = self.open_frame(0);
            self.frames.push(frame);
        }
        loop {
            if self.advance_top() {
                if self.frames.len() == self.atoms.len() {
                    return Some(self.resolved());
                }
                let frame = self.open_frame(self.frames.len());
                self.frames.push(frame);
            } else {
                self.frames.pop();
                if self.frames.is_empty() {
                    self.done = true;
                    return None;
                }
            }
        }
    }
}
