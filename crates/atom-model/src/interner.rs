//! Session-scoped interning of identifiers
//!
//! Terms carry `Arc<str>` identifiers; the factory deduplicates the
//! allocations so equal identifiers share one backing string. A
//! factory is a session handle: clone it freely, clones share storage.

use crate::atom::Predicate;
use crate::literal::{Literal, LiteralPolicy};
use crate::term::{BlankNode, Constant, Term, Variable};
use parking_lot::RwLock;
use rustc_hash::FxHashSet;
use std::sync::Arc;

/// Thread-safe identifier interner and term factory
///
/// Also carries the session-wide [`LiteralPolicy`] so every literal
/// built through the factory compares consistently.
#[derive(Clone)]
pub struct TermFactory {
    inner: Arc<Inner>,
}

struct Inner {
    strings: RwLock<FxHashSet<Arc<str>>>,
    policy: LiteralPolicy,
}

impl TermFactory {
    /// Create a factory with the default (normalized-value) policy
    pub fn new() -> Self {
        Self::with_policy(LiteralPolicy::default())
    }

    /// Create a factory with an explicit literal policy
    pub fn with_policy(policy: LiteralPolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                strings: RwLock::new(FxHashSet::default()),
                policy,
            }),
        }
    }

    /// The session-wide literal comparison policy
    pub fn policy(&self) -> LiteralPolicy {
        self.inner.policy
    }

    /// Intern a string, returning the shared allocation
    pub fn intern(&self, s: &str) -> Arc<str> {
        // Fast path under the read lock.
        {
            let guard = self.inner.strings.read();
            if let Some(existing) = guard.get(s) {
                return existing.clone();
            }
        }

        let mut guard = self.inner.strings.write();
        // Re-check: another writer may have interned it meanwhile.
        if let Some(existing) = guard.get(s) {
            return existing.clone();
        }
        let arc: Arc<str> = s.into();
        guard.insert(arc.clone());
        arc
    }

    /// An interned constant term
    pub fn constant(&self, name: &str) -> Term {
        Term::Constant(Constant::new(self.intern(name)))
    }

    /// An interned variable term
    pub fn variable(&self, name: &str) -> Term {
        Term::Variable(Variable::new(self.intern(name)))
    }

    /// An interned blank-node term
    pub fn blank(&self, id: &str) -> Term {
        Term::Blank(BlankNode::new(self.intern(id)))
    }

    /// An interned predicate
    pub fn predicate(&self, name: &str, arity: usize) -> Predicate {
        Predicate::new(self.intern(name), arity)
    }

    /// A plain literal term under the session policy
    pub fn literal(&self, lexical: &str) -> Term {
        Term::Literal(Literal::new(
            self.intern(lexical),
            None,
            None,
            self.inner.policy,
        ))
    }

    /// A typed literal term under the session policy
    pub fn typed_literal(&self, lexical: &str, datatype: &str) -> Term {
        Term::Literal(Literal::new(
            self.intern(lexical),
            Some(self.intern(datatype)),
            None,
            self.inner.policy,
        ))
    }

    /// A language-tagged literal term under the session policy
    pub fn lang_literal(&self, lexical: &str, tag: &str) -> Term {
        Term::Literal(Literal::new(
            self.intern(lexical),
            None,
            Some(self.intern(tag)),
            self.inner.policy,
        ))
    }

    /// Number of interned identifiers
    pub fn len(&self) -> usize {
        self.inner.strings.read().len()
    }

    /// True when nothing has been interned yet
    pub fn is_empty(&self) -> bool {
        self.inner.strings.read().is_empty()
    }
}

impl Default for TermFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_shares_allocation() {
        let factory = TermFactory::new();
        let a = factory.intern("alice");
        let b = factory.intern("alice");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(factory.len(), 1);
    }

    #[test]
    fn test_clone_shares_storage() {
        let f1 = TermFactory::new();
        let _ = f1.constant("a");
        let f2 = f1.clone();
        let _ = f2.constant("a");
        assert_eq!(f1.len(), 1);
        assert_eq!(f2.len(), 1);
    }

    #[test]
    fn test_factory_terms_equal_direct_terms() {
        let factory = TermFactory::new();
        assert_eq!(factory.constant("a"), Term::constant("a"));
        assert_eq!(factory.variable("X"), Term::variable("X"));
    }

    #[test]
    fn test_lexical_policy_factory() {
        let factory = TermFactory::with_policy(LiteralPolicy::Lexical);
        let a = factory.typed_literal("01", crate::literal::XSD_INTEGER);
        let b = factory.typed_literal("1", crate::literal::XSD_INTEGER);
        assert_ne!(a, b);
    }
}
