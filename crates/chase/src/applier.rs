//! Rule application: the trigger pipeline and its drivers

use crate::body::{group_rules_by_body, BodyToQuery, FrontierTransformer};
use crate::checker::{ObliviousChecker, TriggerChecker};
use crate::computer::{NaiveComputer, TriggerComputer};
use crate::data::ChasableData;
use crate::renamer::{ExistentialRenamer, FreshRenamer};
use crate::step::{StepContext, StepResult};
use crate::{ChaseError, ChaseResult};
use atom_model::{Atom, Rule, RuleBase, Substitution, Term};
use fact_store::{FactBase, FunctionRegistry, MaterializedData, Writable};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// What to do with the atoms a fired trigger materializes
pub trait FactsHandler: Send + Sync {
    /// Hand over freshly materialized atoms
    ///
    /// Returns the genuinely new atoms, or `None` when every atom was
    /// already present (the trigger application is then void).
    fn add(&self, atoms: Vec<Atom>, target: &mut dyn FactBase) -> ChaseResult<Option<Vec<Atom>>>;
}

/// Immediately write new atoms into the target
#[derive(Debug, Default)]
pub struct DirectApplication;

impl DirectApplication {
    /// Create a direct facts handler
    pub fn new() -> Self {
        Self
    }
}

impl FactsHandler for DirectApplication {
    fn add(&self, atoms: Vec<Atom>, target: &mut dyn FactBase) -> ChaseResult<Option<Vec<Atom>>> {
        let mut added = Vec::new();
        for atom in atoms {
            if target.contains(&atom) {
                continue;
            }
            if target.add(atom.clone())? {
                added.push(atom);
            }
        }
        Ok((!added.is_empty()).then_some(added))
    }
}

/// Collect new atoms without touching the target
///
/// The target is updated at end of step by the
/// [`AddCreatedFacts`](crate::AddCreatedFacts) treatment.
#[derive(Debug, Default)]
pub struct DelegatedApplication;

impl DelegatedApplication {
    /// Create a delegated facts handler
    pub fn new() -> Self {
        Self
    }
}

impl FactsHandler for DelegatedApplication {
    fn add(&self, atoms: Vec<Atom>, target: &mut dyn FactBase) -> ChaseResult<Option<Vec<Atom>>> {
        let kept: Vec<Atom> = atoms
            .into_iter()
            .filter(|atom| !target.contains(atom))
            .collect();
        Ok((!kept.is_empty()).then_some(kept))
    }
}

/// Applies one trigger: rename existentials, materialize head atoms
pub struct TriggerApplier {
    renamer: Box<dyn ExistentialRenamer>,
    handler: Box<dyn FactsHandler>,
    functions: Arc<FunctionRegistry>,
}

impl TriggerApplier {
    /// Assemble a trigger applier
    pub fn new(
        renamer: Box<dyn ExistentialRenamer>,
        handler: Box<dyn FactsHandler>,
        functions: Arc<FunctionRegistry>,
    ) -> Self {
        Self {
            renamer,
            handler,
            functions,
        }
    }

    /// Fire a trigger against the target
    ///
    /// Returns the atoms genuinely produced, or `None` for a void
    /// application.
    pub fn apply(
        &mut self,
        rule_index: usize,
        rule: &Rule,
        substitution: &Substitution,
        target: &mut dyn FactBase,
    ) -> ChaseResult<Option<Vec<Atom>>> {
        let full = self.renamer.rename(rule_index, rule, substitution);
        let image: ChaseResult<Vec<Atom>> = rule
            .head_atoms()
            .into_iter()
            .map(|atom| self.materialize(&full.apply_atom(atom)))
            .collect();
        let image = image?;
        if image.is_empty() {
            return Ok(None);
        }
        self.handler.add(image, target)
    }

    /// Eagerly evaluate ground evaluable function terms in an atom
    fn materialize(&self, atom: &Atom) -> ChaseResult<Atom> {
        let terms: Vec<Term> = atom
            .terms()
            .iter()
            .map(|term| self.evaluate_term(term))
            .collect();
        if terms.as_slice() == atom.terms() {
            Ok(atom.clone())
        } else {
            Ok(Atom::new(atom.predicate().clone(), terms)?)
        }
    }

    fn evaluate_term(&self, term: &Term) -> Term {
        match term {
            Term::EvaluableFunction(function) => {
                let args: Vec<Term> =
                    function.args().iter().map(|a| self.evaluate_term(a)).collect();
                if args.iter().all(Term::is_ground) {
                    if let Some(value) = self.functions.evaluate(function.name(), &args) {
                        return value;
                    }
                }
                Term::EvaluableFunction(atom_model::FunctionTerm::new(
                    function.name().to_string(),
                    args,
                ))
            }
            _ => term.clone(),
        }
    }
}

/// Drives the trigger pipeline over a step's scheduled rules
pub trait RuleApplier {
    /// Bind the applier's computer to the rule base
    fn init(&mut self, _rule_base: &RuleBase) {}

    /// Run one step over the scheduled rules
    fn apply(
        &mut self,
        rules: &BTreeSet<usize>,
        data: &mut ChasableData,
        ctx: &StepContext<'_>,
    ) -> ChaseResult<StepResult>;
}

/// Computes every group's triggers, then checks and applies them
///
/// Trigger computation for all groups happens against the data as of
/// step start; application follows in deterministic group order.
pub struct BreadthFirstApplier {
    transformer: Box<dyn BodyToQuery>,
    computer: Box<dyn TriggerComputer>,
    checker: Box<dyn TriggerChecker>,
    applier: TriggerApplier,
}

impl BreadthFirstApplier {
    /// Assemble a breadth-first applier
    pub fn new(
        transformer: Box<dyn BodyToQuery>,
        computer: Box<dyn TriggerComputer>,
        checker: Box<dyn TriggerChecker>,
        applier: TriggerApplier,
    ) -> Self {
        Self {
            transformer,
            computer,
            checker,
            applier,
        }
    }
}

impl RuleApplier for BreadthFirstApplier {
    fn init(&mut self, rule_base: &RuleBase) {
        self.computer.init(rule_base);
    }

    fn apply(
        &mut self,
        rules: &BTreeSet<usize>,
        data: &mut ChasableData,
        ctx: &StepContext<'_>,
    ) -> ChaseResult<StepResult> {
        let groups = group_rules_by_body(self.transformer.as_ref(), rules, ctx.rule_base);
        let mut computed: Vec<(Vec<usize>, Vec<Substitution>)> = Vec::with_capacity(groups.len());
        for (body, members) in &groups {
            let substitutions = self.computer.compute(body, members, data, ctx)?;
            computed.push((members.clone(), substitutions));
        }
        debug!(
            groups = computed.len(),
            triggers = computed.iter().map(|(_, s)| s.len()).sum::<usize>(),
            "triggers computed"
        );

        let mut applied: BTreeSet<usize> = BTreeSet::new();
        let mut created: Vec<Atom> = Vec::new();
        for (members, substitutions) in computed {
            for substitution in &substitutions {
                for &index in &members {
                    let Some(rule) = ctx.rule_base.rules().get(index) else {
                        continue;
                    };
                    if !self.checker.check(index, rule, substitution, data.target())? {
                        continue;
                    }
                    if let Some(atoms) =
                        self.applier
                            .apply(index, rule, substitution, data.target_mut())?
                    {
                        applied.insert(index);
                        created.extend(atoms);
                    }
                }
            }
        }
        Ok(StepResult::from_created(applied, created))
    }
}

/// Parallelizes trigger computation across rule-body groups
///
/// One task per grouped body on a pool of `min(32, max(1, groups))`
/// workers; all reads of the writing target happen in that phase.
/// Checking and application run after the workers join, serialized in
/// deterministic group order, which meets the single-mutator contract
/// by construction. The set of created facts matches the sequential
/// applier's modulo null identities under the fresh renamer.
pub struct MultiThreadApplier {
    transformer: Box<dyn BodyToQuery>,
    computer: Box<dyn TriggerComputer>,
    checker: Box<dyn TriggerChecker>,
    applier: TriggerApplier,
}

impl MultiThreadApplier {
    /// Assemble a multi-threaded applier
    pub fn new(
        transformer: Box<dyn BodyToQuery>,
        computer: Box<dyn TriggerComputer>,
        checker: Box<dyn TriggerChecker>,
        applier: TriggerApplier,
    ) -> Self {
        Self {
            transformer,
            computer,
            checker,
            applier,
        }
    }
}

impl RuleApplier for MultiThreadApplier {
    fn init(&mut self, rule_base: &RuleBase) {
        self.computer.init(rule_base);
    }

    fn apply(
        &mut self,
        rules: &BTreeSet<usize>,
        data: &mut ChasableData,
        ctx: &StepContext<'_>,
    ) -> ChaseResult<StepResult> {
        use rayon::prelude::*;

        let groups = group_rules_by_body(self.transformer.as_ref(), rules, ctx.rule_base);
        let workers = groups.len().clamp(1, 32);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| ChaseError::Configuration(format!("worker pool: {e}")))?;

        let computer = self.computer.as_ref();
        let shared_data: &ChasableData = data;
        let computed: Vec<(Vec<usize>, Vec<Substitution>)> = pool.install(|| {
            groups
                .par_iter()
                .map(|(body, members)| {
                    let substitutions = computer.compute(body, members, shared_data, ctx)?;
                    Ok((members.clone(), substitutions))
                })
                .collect::<ChaseResult<Vec<_>>>()
        })?;

        let mut applied: BTreeSet<usize> = BTreeSet::new();
        let mut created: Vec<Atom> = Vec::new();
        for (members, substitutions) in computed {
            for substitution in &substitutions {
                for &index in &members {
                    let Some(rule) = ctx.rule_base.rules().get(index) else {
                        continue;
                    };
                    if !self.checker.check(index, rule, substitution, data.target())? {
                        continue;
                    }
                    if let Some(atoms) =
                        self.applier
                            .apply(index, rule, substitution, data.target_mut())?
                    {
                        applied.insert(index);
                        created.extend(atoms);
                    }
                }
            }
        }
        Ok(StepResult::from_created(applied, created))
    }
}

/// Hands datalog rules to a store that saturates them natively
///
/// When the target implements the datalog-delegation capability and no
/// side sources are configured, the step's datalog rules go to the
/// store as one batch; existential rules run through the fallback
/// applier (which writes directly). A `true` "changed" answer from the
/// store makes the step's created facts unknown, which still drives
/// the fixpoint detector.
pub struct SourceDelegatedDatalogApplier {
    fallback: Box<dyn RuleApplier>,
}

impl SourceDelegatedDatalogApplier {
    /// With an explicit fallback applier
    pub fn new(fallback: Box<dyn RuleApplier>) -> Self {
        Self { fallback }
    }

    /// With the standard fallback: naive computation, oblivious
    /// checking, fresh renaming, direct application
    pub fn standard(functions: Arc<FunctionRegistry>) -> Self {
        Self::new(Box::new(BreadthFirstApplier::new(
            Box::new(FrontierTransformer),
            Box::new(NaiveComputer::new()),
            Box::new(ObliviousChecker::new()),
            TriggerApplier::new(
                Box::new(FreshRenamer::new()),
                Box::new(DirectApplication::new()),
                functions,
            ),
        )))
    }
}

impl RuleApplier for SourceDelegatedDatalogApplier {
    fn init(&mut self, rule_base: &RuleBase) {
        self.fallback.init(rule_base);
    }

    fn apply(
        &mut self,
        rules: &BTreeSet<usize>,
        data: &mut ChasableData,
        ctx: &StepContext<'_>,
    ) -> ChaseResult<StepResult> {
        let delegable = data.sources().is_empty()
            && data.target_mut().datalog_delegable().is_some();
        if !delegable {
            return self.fallback.apply(rules, data, ctx);
        }

        let mut datalog: Vec<usize> = Vec::new();
        let mut existential: BTreeSet<usize> = BTreeSet::new();
        for &index in rules {
            match ctx.rule_base.rules().get(index) {
                Some(rule) if rule.is_datalog() => datalog.push(index),
                Some(_) => {
                    existential.insert(index);
                }
                None => {}
            }
        }

        let changed = if datalog.is_empty() {
            false
        } else {
            let batch: Vec<Rule> = datalog
                .iter()
                .filter_map(|&i| ctx.rule_base.rules().get(i).cloned())
                .collect();
            match data.target_mut().datalog_delegable() {
                Some(store) => store.delegate_rules(&batch)?,
                None => false,
            }
        };

        let existential_result = self.fallback.apply(&existential, data, ctx)?;
        let mut applied: BTreeSet<usize> = existential_result
            .applied_rules()
            .cloned()
            .unwrap_or_default();
        applied.extend(datalog);

        if changed {
            // Unknown new facts: the fallback wrote its own directly.
            Ok(StepResult::unknown_created(applied))
        } else {
            let created: Vec<Atom> = existential_result
                .created_facts()
                .map(|facts| facts.atoms().cloned().collect())
                .unwrap_or_default();
            Ok(StepResult::from_created(applied, created))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atom_model::{Formula, Predicate, Variable};
    use fact_store::InMemoryGraphStore;

    fn atom(p: &str, terms: Vec<Term>) -> Atom {
        Atom::new(Predicate::new(p, terms.len()), terms).unwrap()
    }

    fn rule_r_to_e() -> Rule {
        Rule::new(
            Formula::Atom(atom("r", vec![Term::variable("X")])),
            Formula::exists(
                Variable::new("Y"),
                Formula::Atom(atom("e", vec![Term::variable("X"), Term::variable("Y")])),
            ),
            None,
        )
        .unwrap()
    }

    fn trigger() -> Substitution {
        [(Variable::new("X"), Term::constant("a"))]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_direct_application_writes_and_reports() {
        let mut target = InMemoryGraphStore::new();
        let mut applier = TriggerApplier::new(
            Box::new(FreshRenamer::new()),
            Box::new(DirectApplication::new()),
            Arc::new(FunctionRegistry::standard()),
        );
        let produced = applier
            .apply(0, &rule_r_to_e(), &trigger(), &mut target)
            .unwrap()
            .unwrap();
        assert_eq!(produced.len(), 1);
        assert_eq!(target.len(), 1);
    }

    #[test]
    fn test_delegated_application_leaves_target_untouched() {
        let mut target = InMemoryGraphStore::new();
        let mut applier = TriggerApplier::new(
            Box::new(FreshRenamer::new()),
            Box::new(DelegatedApplication::new()),
            Arc::new(FunctionRegistry::standard()),
        );
        let produced = applier
            .apply(0, &rule_r_to_e(), &trigger(), &mut target)
            .unwrap()
            .unwrap();
        assert_eq!(produced.len(), 1);
        assert_eq!(target.len(), 0);
    }

    #[test]
    fn test_void_application_when_atoms_present() {
        // Datalog rule whose head image already exists.
        let rule = Rule::new(
            Formula::Atom(atom("r", vec![Term::variable("X")])),
            Formula::Atom(atom("s", vec![Term::variable("X")])),
            None,
        )
        .unwrap();
        let mut target = InMemoryGraphStore::with_atoms([atom("s", vec![Term::constant("a")])]);
        let mut applier = TriggerApplier::new(
            Box::new(FreshRenamer::new()),
            Box::new(DirectApplication::new()),
            Arc::new(FunctionRegistry::standard()),
        );
        assert!(applier
            .apply(0, &rule, &trigger(), &mut target)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_evaluable_heads_evaluate_eagerly() {
        // r(X) → total(add(X, X)) with X bound to 2 becomes total(4).
        let head = Formula::Atom(
            Atom::new(
                Predicate::new("total", 1),
                vec![Term::EvaluableFunction(atom_model::FunctionTerm::new(
                    "add",
                    vec![Term::variable("X"), Term::variable("X")],
                ))],
            )
            .unwrap(),
        );
        let rule = Rule::new(
            Formula::Atom(atom("r", vec![Term::variable("X")])),
            head,
            None,
        )
        .unwrap();
        let seed: Substitution = [(Variable::new("X"), Term::literal_int(2))]
            .into_iter()
            .collect();
        let mut target = InMemoryGraphStore::new();
        let mut applier = TriggerApplier::new(
            Box::new(FreshRenamer::new()),
            Box::new(DirectApplication::new()),
            Arc::new(FunctionRegistry::standard()),
        );
        let produced = applier.apply(0, &rule, &seed, &mut target).unwrap().unwrap();
        assert_eq!(
            produced,
            vec![atom("total", vec![Term::literal_int(4)])]
        );
    }
}
