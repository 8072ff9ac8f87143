//! Term variants with interned identifiers
//!
//! Every term carries a stable identifier usable as a dictionary key.
//! Identifiers are `Arc<str>` so clones never reallocate; the
//! [`TermFactory`](crate::TermFactory) deduplicates the allocations
//! themselves.

use crate::literal::Literal;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Process-wide counter backing [`Variable::fresh`].
///
/// Shared across sessions on purpose: two chases running in the same
/// process must never hand out the same fresh variable.
static FRESH_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Prefix reserved for fresh variables.
const FRESH_PREFIX: &str = "_v";

/// A logical term
///
/// The variant set is closed; evaluator dispatch is a `match` on the
/// tag (no trait objects involved).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Term {
    /// A variable, e.g. `X`
    Variable(Variable),
    /// An individual constant, e.g. `alice`
    Constant(Constant),
    /// A literal value, e.g. `"42"^^xsd:integer`
    Literal(Literal),
    /// A blank node, e.g. `_:b0` (non-ground, non-variable)
    Blank(BlankNode),
    /// An inert function term, e.g. a Skolem term `sk1(X)`
    LogicalFunction(FunctionTerm),
    /// A function term evaluated by a computed-predicate source
    EvaluableFunction(FunctionTerm),
}

impl Term {
    /// Create a variable term
    pub fn variable(name: impl Into<Arc<str>>) -> Self {
        Term::Variable(Variable::new(name))
    }

    /// Create a constant term
    pub fn constant(name: impl Into<Arc<str>>) -> Self {
        Term::Constant(Constant::new(name))
    }

    /// Create a blank-node term
    pub fn blank(id: impl Into<Arc<str>>) -> Self {
        Term::Blank(BlankNode::new(id))
    }

    /// Create a plain string literal term
    pub fn literal_str(value: impl Into<Arc<str>>) -> Self {
        Term::Literal(Literal::plain(value))
    }

    /// Create an integer literal term
    pub fn literal_int(value: i64) -> Self {
        Term::Literal(Literal::integer(value))
    }

    /// Create a decimal literal term
    pub fn literal_decimal(value: f64) -> Self {
        Term::Literal(Literal::decimal(value))
    }

    /// True for constants and literals; structural for function terms
    ///
    /// Variables and blank nodes are never ground.
    pub fn is_ground(&self) -> bool {
        match self {
            Term::Variable(_) | Term::Blank(_) => false,
            Term::Constant(_) | Term::Literal(_) => true,
            Term::LogicalFunction(f) | Term::EvaluableFunction(f) => f.is_ground(),
        }
    }

    /// Check if this is a variable
    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Variable(_))
    }

    /// Get as variable, if any
    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            Term::Variable(v) => Some(v),
            _ => None,
        }
    }

    /// Get as constant, if any
    pub fn as_constant(&self) -> Option<&Constant> {
        match self {
            Term::Constant(c) => Some(c),
            _ => None,
        }
    }

    /// Get as literal, if any
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(l) => Some(l),
            _ => None,
        }
    }

    /// Get as a function term (logical or evaluable), if any
    pub fn as_function(&self) -> Option<&FunctionTerm> {
        match self {
            Term::LogicalFunction(f) | Term::EvaluableFunction(f) => Some(f),
            _ => None,
        }
    }

    /// Check if this term contains a variable anywhere
    pub fn has_variables(&self) -> bool {
        match self {
            Term::Variable(_) => true,
            Term::Constant(_) | Term::Literal(_) | Term::Blank(_) => false,
            Term::LogicalFunction(f) | Term::EvaluableFunction(f) => {
                f.args().iter().any(Term::has_variables)
            }
        }
    }

    /// Collect the variables of this term into `out`
    pub fn collect_variables(&self, out: &mut std::collections::BTreeSet<Variable>) {
        match self {
            Term::Variable(v) => {
                out.insert(v.clone());
            }
            Term::Constant(_) | Term::Literal(_) | Term::Blank(_) => {}
            Term::LogicalFunction(f) | Term::EvaluableFunction(f) => {
                for arg in f.args() {
                    arg.collect_variables(out);
                }
            }
        }
    }

    /// Stable identifier usable as a dictionary key
    pub fn identifier(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Variable(v) => write!(f, "{v}"),
            Term::Constant(c) => write!(f, "{c}"),
            Term::Literal(l) => write!(f, "{l}"),
            Term::Blank(b) => write!(f, "{b}"),
            Term::LogicalFunction(t) | Term::EvaluableFunction(t) => write!(f, "{t}"),
        }
    }
}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Variable(v) => write!(f, "Var:{v}"),
            Term::Constant(c) => write!(f, "Cst:{c}"),
            Term::Literal(l) => write!(f, "Lit:{l}"),
            Term::Blank(b) => write!(f, "BNode:{b}"),
            Term::LogicalFunction(t) => write!(f, "Func:{t}"),
            Term::EvaluableFunction(t) => write!(f, "Eval:{t}"),
        }
    }
}

/// A variable, identified by name
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Variable {
    name: Arc<str>,
}

impl Variable {
    /// Create a variable with the given name
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self { name: name.into() }
    }

    /// Allocate a globally-unique variable
    ///
    /// Fresh names use the reserved `_v` prefix; the counter is a
    /// process-wide atomic so the operation is thread-safe.
    pub fn fresh() -> Self {
        let n = FRESH_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self {
            name: format!("{FRESH_PREFIX}{n}").into(),
        }
    }

    /// The variable's name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Var:{}", self.name)
    }
}

/// An individual constant, identified by name
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Constant {
    name: Arc<str>,
}

impl Constant {
    /// Create a constant with the given identifier
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self { name: name.into() }
    }

    /// The constant's identifier
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl fmt::Debug for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cst:{}", self.name)
    }
}

/// A blank node: anonymous, non-ground, not substitutable
///
/// Identifiers are normalized to the `_:` prefix.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlankNode {
    id: Arc<str>,
}

impl BlankNode {
    /// Create a blank node, normalizing the identifier
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        let id: Arc<str> = id.into();
        if id.starts_with("_:") {
            Self { id }
        } else {
            Self {
                id: format!("_:{id}").into(),
            }
        }
    }

    /// The normalized identifier (including the `_:` prefix)
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for BlankNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl fmt::Debug for BlankNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BNode:{}", self.id)
    }
}

/// A function symbol applied to terms
///
/// Shared payload of the `LogicalFunction` and `EvaluableFunction`
/// variants; only the enclosing variant decides whether the engine
/// treats the term as inert or computable.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FunctionTerm {
    name: Arc<str>,
    args: Vec<Term>,
}

impl FunctionTerm {
    /// Create a function term
    pub fn new(name: impl Into<Arc<str>>, args: Vec<Term>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// The function symbol
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The argument terms
    pub fn args(&self) -> &[Term] {
        &self.args
    }

    /// True when every argument is ground
    pub fn is_ground(&self) -> bool {
        self.args.iter().all(Term::is_ground)
    }
}

impl fmt::Display for FunctionTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ")")
    }
}

impl fmt::Debug for FunctionTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groundness() {
        assert!(Term::constant("a").is_ground());
        assert!(Term::literal_int(1).is_ground());
        assert!(!Term::variable("X").is_ground());
        assert!(!Term::blank("b0").is_ground());
    }

    #[test]
    fn test_function_term_groundness_is_structural() {
        let ground = Term::LogicalFunction(FunctionTerm::new(
            "f",
            vec![Term::constant("a"), Term::literal_int(2)],
        ));
        assert!(ground.is_ground());

        let open = Term::LogicalFunction(FunctionTerm::new(
            "f",
            vec![Term::constant("a"), Term::variable("X")],
        ));
        assert!(!open.is_ground());
        assert!(open.has_variables());
    }

    #[test]
    fn test_fresh_variables_are_unique() {
        let a = Variable::fresh();
        let b = Variable::fresh();
        assert_ne!(a, b);
        assert!(a.name().starts_with("_v"));
    }

    #[test]
    fn test_blank_node_normalization() {
        assert_eq!(BlankNode::new("b0"), BlankNode::new("_:b0"));
        assert_eq!(BlankNode::new("b0").id(), "_:b0");
    }

    #[test]
    fn test_equal_identifier_means_equal_term() {
        assert_eq!(Term::constant("a"), Term::constant("a"));
        assert_ne!(Term::constant("a"), Term::variable("a"));
    }
}
