//! Step results and the per-step context handed to components

use atom_model::{Atom, RuleBase};
use fact_store::{InMemoryGraphStore, MaterializedData};
use std::collections::BTreeSet;

/// Result of one rule-application step
///
/// `None` marks the unknown state: before the first step, or when a
/// delegated store reported "changed" without enumerating the facts.
#[derive(Debug, Default)]
pub struct StepResult {
    applied_rules: Option<BTreeSet<usize>>,
    created_facts: Option<InMemoryGraphStore>,
}

impl StepResult {
    /// The initial state before any step has run
    pub fn initial() -> Self {
        Self::default()
    }

    /// A step that applied the given rules and created the given atoms
    pub fn from_created(applied_rules: BTreeSet<usize>, atoms: Vec<Atom>) -> Self {
        Self {
            applied_rules: Some(applied_rules),
            created_facts: Some(InMemoryGraphStore::with_atoms(atoms)),
        }
    }

    /// A step whose created facts are unknown (delegated evaluation)
    pub fn unknown_created(applied_rules: BTreeSet<usize>) -> Self {
        Self {
            applied_rules: Some(applied_rules),
            created_facts: None,
        }
    }

    /// Indices of the rules applied at this step, if known
    pub fn applied_rules(&self) -> Option<&BTreeSet<usize>> {
        self.applied_rules.as_ref()
    }

    /// The facts created at this step, if known
    pub fn created_facts(&self) -> Option<&InMemoryGraphStore> {
        self.created_facts.as_ref()
    }

    /// Number of created facts, if known
    pub fn created_count(&self) -> Option<usize> {
        self.created_facts.as_ref().map(MaterializedData::len)
    }
}

/// Read-only context a component receives during one step
///
/// Components never hold a reference back to the chase; everything
/// they may consult is passed here.
pub struct StepContext<'a> {
    /// The 1-based number of the running step
    pub step: usize,
    /// The previous step's result
    pub last: &'a StepResult,
    /// The rule base the chase is running
    pub rule_base: &'a RuleBase,
}
