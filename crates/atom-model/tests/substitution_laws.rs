//! Property coverage for the substitution algebra

use atom_model::{Substitution, Term, Variable};
use proptest::prelude::*;

/// A small universe keeps collisions frequent enough to matter.
fn arb_variable() -> impl Strategy<Value = Variable> {
    prop_oneof![
        Just(Variable::new("X")),
        Just(Variable::new("Y")),
        Just(Variable::new("Z")),
        Just(Variable::new("W")),
    ]
}

fn arb_term() -> impl Strategy<Value = Term> {
    prop_oneof![
        arb_variable().prop_map(Term::Variable),
        Just(Term::constant("a")),
        Just(Term::constant("b")),
        Just(Term::literal_int(1)),
        Just(Term::literal_int(2)),
    ]
}

fn arb_substitution() -> impl Strategy<Value = Substitution> {
    proptest::collection::vec((arb_variable(), arb_term()), 0..4)
        .prop_map(|pairs| pairs.into_iter().collect())
}

proptest! {
    /// Composing with the identity substitution changes nothing.
    #[test]
    fn identity_is_neutral(s in arb_substitution(), t in arb_term()) {
        let id = Substitution::new();
        prop_assert_eq!(s.compose(&id).apply_term(&t), s.apply_term(&t));
        prop_assert_eq!(id.compose(&s).apply_term(&t), s.apply_term(&t));
    }

    /// apply(a ∘ b, t) == apply(a, apply(b, t)) for every term.
    #[test]
    fn composition_is_application(
        a in arb_substitution(),
        b in arb_substitution(),
        t in arb_term(),
    ) {
        let composed = a.compose(&b);
        prop_assert_eq!(composed.apply_term(&t), a.apply_term(&b.apply_term(&t)));
    }

    /// Composition is associative up to application.
    #[test]
    fn composition_is_associative(
        a in arb_substitution(),
        b in arb_substitution(),
        c in arb_substitution(),
        t in arb_term(),
    ) {
        let left = a.compose(&b).compose(&c);
        let right = a.compose(&b.compose(&c));
        prop_assert_eq!(left.apply_term(&t), right.apply_term(&t));
    }

    /// Normalization is idempotent and never maps a variable to itself.
    #[test]
    fn normalization_is_idempotent(s in arb_substitution()) {
        let once = s.normalize();
        prop_assert_eq!(once.normalize(), once.clone());
        for (v, t) in once.iter() {
            prop_assert_ne!(&Term::Variable(v.clone()), t);
        }
    }
}
