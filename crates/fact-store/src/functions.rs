//! Computed predicates backed by a function registry
//!
//! A function term `f(x, y)` in a rule head or query body is rewritten
//! into an atom `fn:f(x, y, R)` over a computed predicate with one
//! extra result position. This source evaluates such atoms: forward
//! (inputs ground → compute the result) and, where a solver is
//! registered, backward (result ground, all inputs but one ground →
//! compute the missing input).

use crate::pattern::{AtomicPattern, PositionConstraint};
use crate::{Data, StoreResult, TupleIter};
use atom_model::{BasicQuery, Predicate, Term};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Namespace prefix of computed predicates
const COMPUTED_PREFIX: &str = "fn:";

/// The computed predicate for a function of the given arity
///
/// The predicate arity is `arity + 1`: inputs first, result last.
pub fn function_predicate(name: &str, arity: usize) -> Predicate {
    Predicate::new(format!("{COMPUTED_PREFIX}{name}"), arity + 1)
}

/// Numeric view shared by the standard arithmetic functions
#[derive(Clone, Copy)]
enum Num {
    Int(i64),
    Dec(f64),
}

impl Num {
    fn of(term: &Term) -> Option<Num> {
        let literal = term.as_literal()?;
        if let Some(i) = literal.as_i64() {
            Some(Num::Int(i))
        } else {
            literal.as_f64().map(Num::Dec)
        }
    }

    fn to_term(self) -> Term {
        match self {
            Num::Int(i) => Term::literal_int(i),
            Num::Dec(d) => Term::literal_decimal(d),
        }
    }

    fn binop(
        self,
        other: Num,
        int_op: impl Fn(i64, i64) -> Option<i64>,
        dec_op: impl Fn(f64, f64) -> f64,
    ) -> Option<Num> {
        match (self, other) {
            (Num::Int(a), Num::Int(b)) => int_op(a, b).map(Num::Int),
            (a, b) => Some(Num::Dec(dec_op(a.as_f64(), b.as_f64()))),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Dec(d) => d,
        }
    }
}

/// Textual view shared by the standard string functions
fn text_of(term: &Term) -> Option<String> {
    match term {
        Term::Literal(l) => Some(l.lexical().to_string()),
        Term::Constant(c) => Some(c.name().to_string()),
        _ => None,
    }
}

/// Forward evaluation: ground inputs to an output term
pub type ForwardFn = fn(&[Term]) -> Option<Term>;

/// Backward solving: `(missing position, result, inputs)` to the
/// missing input (the entry at the missing position is ignored)
pub type BackwardFn = fn(usize, &Term, &[Term]) -> Option<Term>;

/// A named function over ground terms
#[derive(Clone)]
pub struct StandardFunction {
    name: String,
    arity: usize,
    forward: ForwardFn,
    backward: Option<BackwardFn>,
}

impl StandardFunction {
    /// Define a forward-only function
    pub fn new(name: impl Into<String>, arity: usize, forward: ForwardFn) -> Self {
        Self {
            name: name.into(),
            arity,
            forward,
            backward: None,
        }
    }

    /// Attach a backward solver
    pub fn with_backward(mut self, backward: BackwardFn) -> Self {
        self.backward = Some(backward);
        self
    }

    /// The function name (without the `fn:` prefix)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The input arity
    pub fn arity(&self) -> usize {
        self.arity
    }
}

fn num2(args: &[Term]) -> Option<(Num, Num)> {
    Some((Num::of(&args[0])?, Num::of(&args[1])?))
}

fn fn_add(args: &[Term]) -> Option<Term> {
    let (a, b) = num2(args)?;
    Some(a.binop(b, i64::checked_add, |x, y| x + y)?.to_term())
}

fn fn_sub(args: &[Term]) -> Option<Term> {
    let (a, b) = num2(args)?;
    Some(a.binop(b, i64::checked_sub, |x, y| x - y)?.to_term())
}

fn fn_mul(args: &[Term]) -> Option<Term> {
    let (a, b) = num2(args)?;
    Some(a.binop(b, i64::checked_mul, |x, y| x * y)?.to_term())
}

fn fn_div(args: &[Term]) -> Option<Term> {
    let (a, b) = num2(args)?;
    if b.as_f64() == 0.0 {
        return None;
    }
    let exact_int = |x: i64, y: i64| (x % y == 0).then(|| x / y);
    Some(a.binop(b, exact_int, |x, y| x / y)?.to_term())
}

fn fn_abs(args: &[Term]) -> Option<Term> {
    Some(match Num::of(&args[0])? {
        Num::Int(i) => Term::literal_int(i.checked_abs()?),
        Num::Dec(d) => Term::literal_decimal(d.abs()),
    })
}

fn fn_min(args: &[Term]) -> Option<Term> {
    let (a, b) = num2(args)?;
    Some(if a.as_f64() <= b.as_f64() { a } else { b }.to_term())
}

fn fn_max(args: &[Term]) -> Option<Term> {
    let (a, b) = num2(args)?;
    Some(if a.as_f64() >= b.as_f64() { a } else { b }.to_term())
}

fn fn_concat(args: &[Term]) -> Option<Term> {
    let mut out = text_of(&args[0])?;
    out.push_str(&text_of(&args[1])?);
    Some(Term::literal_str(out))
}

fn fn_upper(args: &[Term]) -> Option<Term> {
    Some(Term::literal_str(text_of(&args[0])?.to_uppercase()))
}

fn fn_lower(args: &[Term]) -> Option<Term> {
    Some(Term::literal_str(text_of(&args[0])?.to_lowercase()))
}

fn fn_length(args: &[Term]) -> Option<Term> {
    Some(Term::literal_int(text_of(&args[0])?.chars().count() as i64))
}

fn solve_add(missing: usize, result: &Term, args: &[Term]) -> Option<Term> {
    let r = Num::of(result)?;
    let other = Num::of(&args[1 - missing])?;
    Some(r.binop(other, i64::checked_sub, |x, y| x - y)?.to_term())
}

fn solve_sub(missing: usize, result: &Term, args: &[Term]) -> Option<Term> {
    let r = Num::of(result)?;
    match missing {
        // x - a1 = r  =>  x = r + a1
        0 => {
            let b = Num::of(&args[1])?;
            Some(r.binop(b, i64::checked_add, |x, y| x + y)?.to_term())
        }
        // a0 - x = r  =>  x = a0 - r
        _ => {
            let a = Num::of(&args[0])?;
            Some(a.binop(r, i64::checked_sub, |x, y| x - y)?.to_term())
        }
    }
}

fn solve_mul(missing: usize, result: &Term, args: &[Term]) -> Option<Term> {
    let r = Num::of(result)?;
    let other = Num::of(&args[1 - missing])?;
    if other.as_f64() == 0.0 {
        return None;
    }
    let exact_int = |x: i64, y: i64| (x % y == 0).then(|| x / y);
    Some(r.binop(other, exact_int, |x, y| x / y)?.to_term())
}

/// A registry of named functions
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: FxHashMap<String, StandardFunction>,
}

impl FunctionRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry of standard functions
    ///
    /// Arithmetic (`add`, `sub`, `mul`, `div`, `abs`, `min`, `max`)
    /// and strings (`concat`, `upper`, `lower`, `length`); `add`,
    /// `sub` and `mul` carry backward solvers.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(StandardFunction::new("add", 2, fn_add).with_backward(solve_add));
        registry.register(StandardFunction::new("sub", 2, fn_sub).with_backward(solve_sub));
        registry.register(StandardFunction::new("mul", 2, fn_mul).with_backward(solve_mul));
        registry.register(StandardFunction::new("div", 2, fn_div));
        registry.register(StandardFunction::new("abs", 1, fn_abs));
        registry.register(StandardFunction::new("min", 2, fn_min));
        registry.register(StandardFunction::new("max", 2, fn_max));
        registry.register(StandardFunction::new("concat", 2, fn_concat));
        registry.register(StandardFunction::new("upper", 1, fn_upper));
        registry.register(StandardFunction::new("lower", 1, fn_lower));
        registry.register(StandardFunction::new("length", 1, fn_length));
        registry
    }

    /// Register (or replace) a function
    pub fn register(&mut self, function: StandardFunction) {
        self.functions.insert(function.name.clone(), function);
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&StandardFunction> {
        self.functions.get(name)
    }

    /// Evaluate a function forward over ground arguments
    ///
    /// `None` on unknown function, wrong arity, non-ground arguments
    /// or evaluation failure; never an error.
    pub fn evaluate(&self, name: &str, args: &[Term]) -> Option<Term> {
        let function = self.functions.get(name)?;
        if args.len() != function.arity || !args.iter().all(Term::is_ground) {
            return None;
        }
        (function.forward)(args)
    }

    /// Iterate over the registered functions
    pub fn functions(&self) -> impl Iterator<Item = &StandardFunction> {
        self.functions.values()
    }
}

/// Read-only source exposing the registry as computed predicates
#[derive(Clone)]
pub struct FunctionSource {
    registry: Arc<FunctionRegistry>,
}

impl FunctionSource {
    /// Expose a registry as a data source
    pub fn new(registry: Arc<FunctionRegistry>) -> Self {
        Self { registry }
    }

    /// A source over the standard registry
    pub fn standard() -> Self {
        Self::new(Arc::new(FunctionRegistry::standard()))
    }

    /// The underlying registry
    pub fn registry(&self) -> &Arc<FunctionRegistry> {
        &self.registry
    }

    fn function_for(&self, predicate: &Predicate) -> Option<&StandardFunction> {
        let name = predicate.name().strip_prefix(COMPUTED_PREFIX)?;
        let function = self.registry.get(name)?;
        (function.arity + 1 == predicate.arity()).then_some(function)
    }

    /// The fully-computed tuple for a query, if solvable
    ///
    /// Returns the full term vector (inputs then result) on success.
    fn solve(&self, function: &StandardFunction, query: &BasicQuery) -> Option<Vec<Term>> {
        let arity = function.arity;
        let result_position = arity;
        let inputs: Vec<Option<&Term>> = (0..arity)
            .map(|position| query.bound_term(position).filter(|t| t.is_ground()))
            .collect();
        let bound_result = query.bound_term(result_position).filter(|t| t.is_ground());
        let missing: Vec<usize> = (0..arity).filter(|i| inputs[*i].is_none()).collect();

        match (missing.as_slice(), bound_result) {
            // Forward: all inputs ground.
            ([], _) => {
                let args: Vec<Term> = inputs.iter().filter_map(|t| t.map(Term::clone)).collect();
                let output = (function.forward)(&args)?;
                if let Some(expected) = bound_result {
                    if *expected != output {
                        return None;
                    }
                }
                let mut tuple = args;
                tuple.push(output);
                Some(tuple)
            }
            // Backward: one missing input, result known, solver registered.
            ([missing_position], Some(result)) => {
                let backward = function.backward?;
                let args: Vec<Term> = inputs
                    .iter()
                    .map(|t| t.cloned().unwrap_or_else(|| Term::variable("_")))
                    .collect();
                let solved = backward(*missing_position, result, &args)?;
                // The solved input must reproduce the result exactly.
                let mut check = args;
                check[*missing_position] = solved;
                let output = (function.forward)(&check)?;
                if output != *result {
                    return None;
                }
                check.push(output);
                Some(check)
            }
            _ => None,
        }
    }
}

impl Data for FunctionSource {
    fn predicates(&self) -> Vec<Predicate> {
        self.registry
            .functions()
            .map(|f| function_predicate(&f.name, f.arity))
            .collect()
    }

    fn has_predicate(&self, predicate: &Predicate) -> bool {
        self.function_for(predicate).is_some()
    }

    fn atomic_pattern(&self, predicate: &Predicate) -> Option<AtomicPattern> {
        let function = self.function_for(predicate)?;
        let mut constraints = vec![PositionConstraint::Ground; function.arity];
        constraints.push(PositionConstraint::Any);
        Some(AtomicPattern::new(predicate.clone(), constraints))
    }

    fn evaluate<'a>(&'a self, query: &BasicQuery) -> StoreResult<TupleIter<'a>> {
        let Some(function) = self.function_for(query.predicate()) else {
            return Ok(Box::new(std::iter::empty()));
        };
        let Some(tuple) = self.solve(function, query) else {
            return Ok(Box::new(std::iter::empty()));
        };
        let projection: Vec<Term> = query
            .answer_variables()
            .keys()
            .filter_map(|position| tuple.get(*position).cloned())
            .collect();
        Ok(Box::new(std::iter::once(projection)))
    }

    /// Forward needs every input ground; backward additionally accepts
    /// one unbound input when the result is ground and a solver exists.
    fn can_evaluate(&self, query: &BasicQuery) -> bool {
        let Some(function) = self.function_for(query.predicate()) else {
            return false;
        };
        let arity = function.arity;
        let ground_inputs = (0..arity)
            .filter(|i| {
                query
                    .bound_term(*i)
                    .map(|t| t.is_ground())
                    .unwrap_or(false)
            })
            .count();
        let result_ground = query
            .bound_term(arity)
            .map(|t| t.is_ground())
            .unwrap_or(false);
        ground_inputs == arity
            || (function.backward.is_some() && result_ground && ground_inputs + 1 == arity)
    }
}
