//! Existential rules, rule bases and negative constraints

use crate::atom::Atom;
use crate::formula::Formula;
use crate::term::Variable;
use crate::{ModelError, ModelResult};
use std::collections::BTreeSet;
use std::fmt;

/// An existential rule `body → head`
///
/// The *frontier* is the shared free-variable set of body and head;
/// existential variables appear only under `∃` in the head. Both sets
/// are computed once at construction.
#[derive(Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rule {
    body: Formula,
    head: Formula,
    label: Option<String>,
    frontier: BTreeSet<Variable>,
    existentials: BTreeSet<Variable>,
}

impl Rule {
    /// Create a rule, validating its variable discipline
    ///
    /// Fails with [`ModelError::FrontierMismatch`] when body and head
    /// free variables differ, and with
    /// [`ModelError::ExistentialInBody`] when a head existential also
    /// occurs free in the body.
    pub fn new(body: Formula, head: Formula, label: Option<String>) -> ModelResult<Self> {
        let body_free = body.free_variables();
        let head_free = head.free_variables();
        if body_free != head_free {
            return Err(ModelError::FrontierMismatch {
                body: body_free.iter().map(ToString::to_string).collect(),
                head: head_free.iter().map(ToString::to_string).collect(),
            });
        }
        let existentials = head.existential_variables();
        if let Some(bad) = existentials.iter().find(|v| body_free.contains(*v)) {
            return Err(ModelError::ExistentialInBody(bad.to_string()));
        }
        Ok(Self {
            body,
            head,
            label,
            frontier: body_free,
            existentials,
        })
    }

    /// Create a rule, universally closing body-only variables
    ///
    /// Body variables absent from the head are wrapped in `∀` so the
    /// frontier discipline holds; this matches the rule-level reading
    /// `∀X∀Y (body → head)` used by parsers.
    pub fn universally_closed(
        body: Formula,
        head: Formula,
        label: Option<String>,
    ) -> ModelResult<Self> {
        let closed = close_missing(body, &head);
        Rule::new(closed, head, label)
    }

    /// The body formula
    pub fn body(&self) -> &Formula {
        &self.body
    }

    /// The body with its universal-closure prefix removed
    ///
    /// Body-only variables are `∀`-closed at rule level; as a query the
    /// body is evaluated with those variables as plain join variables,
    /// so trigger computation starts from this view.
    pub fn flattened_body(&self) -> &Formula {
        let mut formula = &self.body;
        while let Formula::Forall(_, inner) = formula {
            formula = inner;
        }
        formula
    }

    /// The head formula
    pub fn head(&self) -> &Formula {
        &self.head
    }

    /// The optional label
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// The frontier: variables shared by body and head
    pub fn frontier(&self) -> &BTreeSet<Variable> {
        &self.frontier
    }

    /// The existential variables of the head
    pub fn existential_variables(&self) -> &BTreeSet<Variable> {
        &self.existentials
    }

    /// The head viewed as an ordered list of disjunction-free formulas
    pub fn head_disjuncts(&self) -> Vec<&Formula> {
        self.head.disjuncts()
    }

    /// True when the head has a single disjunct
    pub fn is_conjunctive(&self) -> bool {
        self.head_disjuncts().len() == 1
    }

    /// True when the rule is plain datalog (no existential variable)
    pub fn is_datalog(&self) -> bool {
        self.existentials.is_empty()
    }

    /// The positive atoms of the head, in syntactic order
    pub fn head_atoms(&self) -> Vec<&Atom> {
        self.head.atoms()
    }

    /// The positive atoms of the body, in syntactic order
    pub fn body_atoms(&self) -> Vec<&Atom> {
        self.body.atoms()
    }

    /// Conjoin two conjunctive rules into one
    pub fn aggregate_conjunctive(r1: &Rule, r2: &Rule) -> ModelResult<Rule> {
        if r1 == r2 {
            return Ok(r1.clone());
        }
        Rule::new(
            Formula::and(r1.body.clone(), r2.body.clone()),
            Formula::and(r1.head.clone(), r2.head.clone()),
            None,
        )
    }

    /// Extract one disjunct of the head as a conjunctive rule
    ///
    /// Body variables absent from the chosen disjunct are universally
    /// quantified so the frontier discipline still holds.
    pub fn extract_disjunct(&self, index: usize) -> ModelResult<Rule> {
        let disjuncts = self.head_disjuncts();
        let head = disjuncts
            .get(index)
            .copied()
            .ok_or(ModelError::DisjunctOutOfRange {
                index,
                count: disjuncts.len(),
            })?
            .clone();
        Rule::new(
            close_missing(self.body.clone(), &head),
            head,
            self.label.clone(),
        )
    }

    /// Rewrite this rule into rules whose heads are single pieces
    ///
    /// Applies per head disjunct; a rule whose head is already a single
    /// piece is returned as its own clone.
    pub fn split_single_pieces(&self) -> ModelResult<Vec<Rule>> {
        let mut out = Vec::new();
        for disjunct in self.head_disjuncts() {
            for piece in disjunct.single_pieces() {
                out.push(Rule::new(
                    close_missing(self.body.clone(), &piece),
                    piece,
                    self.label.clone(),
                )?);
            }
        }
        Ok(out)
    }
}

/// Universally close body variables that `head` does not mention
fn close_missing(body: Formula, head: &Formula) -> Formula {
    let head_free = head.free_variables();
    let missing: Vec<Variable> = body
        .free_variables()
        .into_iter()
        .filter(|v| !head_free.contains(v))
        .collect();
    missing
        .into_iter()
        .rev()
        .fold(body, |acc, v| Formula::forall(v, acc))
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(label) = &self.label {
            write!(f, "[{label}] ")?;
        }
        write!(f, "{} \u{2192} {}", self.body, self.head)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Rule: {self}>")
    }
}

/// A negative constraint: a body whose satisfaction is an inconsistency
#[derive(Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NegativeConstraint {
    body: Formula,
    label: Option<String>,
}

impl NegativeConstraint {
    /// Create a negative constraint
    pub fn new(body: Formula, label: Option<String>) -> Self {
        Self { body, label }
    }

    /// The constraint body
    pub fn body(&self) -> &Formula {
        &self.body
    }

    /// The optional label
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

impl fmt::Display for NegativeConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(label) = &self.label {
            write!(f, "[{label}] ")?;
        }
        write!(f, "{} \u{2192} \u{22a5}", self.body)
    }
}

/// An ordered, deduplicated collection of rules and constraints
///
/// Rule identity elsewhere in the engine is the index into this list;
/// the list never reorders.
#[derive(Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RuleBase {
    rules: Vec<Rule>,
    negative_constraints: Vec<NegativeConstraint>,
}

impl RuleBase {
    /// An empty rule base
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from rules and constraints, deduplicating rules
    pub fn from_rules(
        rules: impl IntoIterator<Item = Rule>,
        negative_constraints: impl IntoIterator<Item = NegativeConstraint>,
    ) -> Self {
        let mut base = Self::new();
        for rule in rules {
            base.add_rule(rule);
        }
        for constraint in negative_constraints {
            base.add_negative_constraint(constraint);
        }
        base
    }

    /// The rules, in insertion order
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// The negative constraints, in insertion order
    pub fn negative_constraints(&self) -> &[NegativeConstraint] {
        &self.negative_constraints
    }

    /// Add a rule unless an equal one is already present
    pub fn add_rule(&mut self, rule: Rule) {
        if !self.rules.contains(&rule) {
            self.rules.push(rule);
        }
    }

    /// Add a negative constraint unless an equal one is already present
    pub fn add_negative_constraint(&mut self, constraint: NegativeConstraint) {
        if !self.negative_constraints.contains(&constraint) {
            self.negative_constraints.push(constraint);
        }
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when there is no rule
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl fmt::Debug for RuleBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleBase")
            .field("rules", &self.rules.len())
            .field("negative_constraints", &self.negative_constraints.len())
            .finish()
    }
}
