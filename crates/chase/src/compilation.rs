//! Rule-compilation contract
//!
//! Compilation subsystems (hierarchical, ID-based) pre-compile parts
//! of a rule base so the evaluator can skip them. They compose with
//! the chase as an orthogonal layer; only the contract lives here,
//! together with the identity implementation used when no compilation
//! is configured.

use crate::unify::matches;
use atom_model::{Atom, RuleBase};

/// Contract a rule-compilation layer must satisfy
pub trait RuleCompilation: Send + Sync {
    /// Can this compilation be used with the given rule base?
    fn is_compatible(&self, rule_base: &RuleBase) -> bool;

    /// Is `specific` an instance of `general` modulo the compiled
    /// rules?
    fn is_more_specific_than(&self, specific: &Atom, general: &Atom) -> bool;

    /// The atoms an atom stands for once compiled rules are unfolded
    fn unfold(&self, atom: &Atom) -> Vec<Atom>;
}

/// The identity compilation: nothing is compiled away
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCompilation;

impl NoCompilation {
    /// Create the identity compilation
    pub fn new() -> Self {
        Self
    }
}

impl RuleCompilation for NoCompilation {
    fn is_compatible(&self, _rule_base: &RuleBase) -> bool {
        true
    }

    fn is_more_specific_than(&self, specific: &Atom, general: &Atom) -> bool {
        matches(general, specific).is_some()
    }

    fn unfold(&self, atom: &Atom) -> Vec<Atom> {
        vec![atom.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atom_model::{Predicate, Term};

    #[test]
    fn test_no_compilation_instance_check() {
        let compilation = NoCompilation::new();
        let general = Atom::new(
            Predicate::new("p", 2),
            vec![Term::variable("X"), Term::variable("Y")],
        )
        .unwrap();
        let specific = Atom::new(
            Predicate::new("p", 2),
            vec![Term::constant("a"), Term::constant("b")],
        )
        .unwrap();
        assert!(compilation.is_more_specific_than(&specific, &general));
        assert!(!compilation.is_more_specific_than(&general, &specific));
        assert_eq!(compilation.unfold(&specific), vec![specific]);
    }
}
