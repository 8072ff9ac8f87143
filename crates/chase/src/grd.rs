//! Graph of rule dependencies
//!
//! Edge `r₁ → r₂` exists iff some atom of `r₁`'s head unifies with an
//! atom of `r₂`'s body after renaming apart: firing `r₁` may enable a
//! new trigger for `r₂`.

use crate::unify::unify;
use atom_model::{Rule, RuleBase, Substitution};
use std::collections::BTreeSet;

/// Precomputed rule-dependency graph over rule indices
#[derive(Debug, Clone)]
pub struct Grd {
    successors: Vec<BTreeSet<usize>>,
}

impl Grd {
    /// Build the dependency graph of a rule base
    pub fn new(rule_base: &RuleBase) -> Self {
        let rules = rule_base.rules();
        let mut successors = vec![BTreeSet::new(); rules.len()];
        for (producer, r1) in rules.iter().enumerate() {
            for (consumer, r2) in rules.iter().enumerate() {
                if Self::depends(r1, r2) {
                    successors[producer].insert(consumer);
                }
            }
        }
        Self { successors }
    }

    /// Can firing `producer` enable a trigger of `consumer`?
    fn depends(producer: &Rule, consumer: &Rule) -> bool {
        // Rename the producer's head apart so shared variable names
        // between the two rules cannot fake a unification.
        let mut head_vars = BTreeSet::new();
        for atom in producer.head_atoms() {
            head_vars.extend(atom.variables());
        }
        let renaming = Substitution::fresh_renaming(head_vars.iter());
        // Negated body atoms participate: producing such a predicate
        // can invalidate the negation, so the consumer is rescheduled.
        for head_atom in producer.head_atoms() {
            let renamed = renaming.apply_atom(head_atom);
            for body_atom in consumer.flattened_body().atoms_with_negated() {
                if unify(&renamed, body_atom).is_some() {
                    return true;
                }
            }
        }
        false
    }

    /// Rules whose bodies the given rule's head can activate
    pub fn successors(&self, rule: usize) -> &BTreeSet<usize> {
        &self.successors[rule]
    }

    /// Number of rules in the graph
    pub fn len(&self) -> usize {
        self.successors.len()
    }

    /// True when the graph covers no rule
    pub fn is_empty(&self) -> bool {
        self.successors.is_empty()
    }

    /// Strongly connected components in topological order
    ///
    /// Tarjan's algorithm emits components in reverse topological
    /// order; the result here is reversed so earlier components never
    /// depend on later ones.
    pub fn sccs(&self) -> Vec<Vec<usize>> {
        let mut state = TarjanState {
            graph: &self.successors,
            index: vec![None; self.successors.len()],
            low: vec![0; self.successors.len()],
            on_stack: vec![false; self.successors.len()],
            stack: Vec::new(),
            next_index: 0,
            components: Vec::new(),
        };
        for node in 0..self.successors.len() {
            if state.index[node].is_none() {
                state.visit(node);
            }
        }
        let mut components = state.components;
        components.reverse();
        components
    }
}

struct TarjanState<'a> {
    graph: &'a [BTreeSet<usize>],
    index: Vec<Option<usize>>,
    low: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    next_index: usize,
    components: Vec<Vec<usize>>,
}

impl TarjanState<'_> {
    fn visit(&mut self, node: usize) {
        self.index[node] = Some(self.next_index);
        self.low[node] = self.next_index;
        self.next_index += 1;
        self.stack.push(node);
        self.on_stack[node] = true;

        for &next in &self.graph[node].clone() {
            match self.index[next] {
                None => {
                    self.visit(next);
                    self.low[node] = self.low[node].min(self.low[next]);
                }
                Some(next_index) => {
                    if self.on_stack[next] {
                        self.low[node] = self.low[node].min(next_index);
                    }
                }
            }
        }

        if Some(self.low[node]) == self.index[node] {
            let mut component = Vec::new();
            while let Some(member) = self.stack.pop() {
                self.on_stack[member] = false;
                component.push(member);
                if member == node {
                    break;
                }
            }
            component.sort_unstable();
            self.components.push(component);
        }
    }
}
