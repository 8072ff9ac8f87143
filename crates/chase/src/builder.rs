//! Builder for configured chases

use crate::applier::{
    BreadthFirstApplier, DelegatedApplication, DirectApplication, FactsHandler,
    MultiThreadApplier, RuleApplier, SourceDelegatedDatalogApplier, TriggerApplier,
};
use crate::body::{AllTransformer, BodyToQuery, FrontierTransformer};
use crate::chase::{Chase, ChaseCore};
use crate::checker::{
    AlwaysTrueChecker, EquivalentChecker, MultiChecker, ObliviousChecker, RestrictedChecker,
    SemiObliviousChecker, TriggerChecker,
};
use crate::computer::{
    NaiveComputer, RestrictedComputer, SemiNaiveComputer, TriggerComputer, TwoStepsComputer,
};
use crate::data::ChasableData;
use crate::halting::{CreatedFactsAtPreviousStep, HaltingCondition, HasRulesToApply};
use crate::renamer::{
    BodyPseudoSkolem, BodyTrueSkolem, ExistentialRenamer, FreshRenamer,
    FrontierByPiecePseudoSkolem, FrontierByPieceTrueSkolem, FrontierPseudoSkolem,
    FrontierTrueSkolem,
};
use crate::scheduler::{ByPredicateScheduler, GrdScheduler, NaiveScheduler, RuleScheduler};
use crate::treatment::{AddCreatedFacts, Debug as DebugTreatment, Treatment};
use crate::{ChaseError, ChaseResult};
use atom_model::RuleBase;
use fact_store::FunctionRegistry;
use std::sync::Arc;

/// Scheduler selection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SchedulerKind {
    /// Always offer the full rule base
    Naive,
    /// Follow body-predicate production
    ByPredicate,
    /// Follow the graph of rule dependencies
    #[default]
    Grd,
}

/// Rule-applier selection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ApplierKind {
    /// Sequential: compute all groups, then check and apply
    #[default]
    BreadthFirst,
    /// Parallel trigger computation across body groups
    MultiThread,
    /// Hand datalog rules to a delegable store, fall back otherwise
    SourceDelegatedDatalog,
}

/// Body-to-query transformer selection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransformerKind {
    /// Answer variables are all body variables
    All,
    /// Answer variables are the frontier
    #[default]
    Frontier,
}

/// Trigger-computer selection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ComputerKind {
    /// Full body against full data
    #[default]
    Naive,
    /// Anchor on last-step facts with a delta view
    SemiNaive,
    /// Seed on last-step facts, complete on full data
    TwoSteps,
    /// Evaluate body ∧ ¬head directly
    Restricted,
}

/// Trigger-checker selection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CheckerKind {
    /// Fire unconditionally (datalog with a step limit only)
    AlwaysTrue,
    /// Fire each (rule, substitution) once
    Oblivious,
    /// Fire each (rule, frontier image) once
    #[default]
    SemiOblivious,
    /// Fire only unsatisfied heads
    Restricted,
    /// Restricted plus the local equivalence guard
    Equivalent,
    /// Semi-oblivious and restricted combined
    SemiObliviousRestricted,
}

/// Existential-renamer selection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenamerKind {
    /// A new null per firing
    #[default]
    Fresh,
    /// Nulls cached per full body substitution
    BodyPseudoSkolem,
    /// Nulls cached per frontier image
    FrontierPseudoSkolem,
    /// Nulls cached per head piece and piece frontier
    FrontierByPiecePseudoSkolem,
    /// Skolem terms keyed by the full body substitution
    BodyTrueSkolem,
    /// Skolem terms keyed by the frontier image
    FrontierTrueSkolem,
    /// Skolem terms keyed per head piece
    FrontierByPieceTrueSkolem,
}

/// Facts-handler selection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FactsHandlerKind {
    /// Write atoms immediately
    Direct,
    /// Collect atoms, merged at end of step by `AddCreatedFacts`
    #[default]
    Delegated,
}

/// The policy selectors a chase is materialized from
///
/// Shared between [`ChaseBuilder`] and the stratified builder, which
/// must instantiate a fresh pipeline per stratum.
#[derive(Clone, Debug, Default)]
pub(crate) struct ChaseConfig {
    pub scheduler: SchedulerKind,
    pub applier: ApplierKind,
    pub transformer: TransformerKind,
    pub computer: ComputerKind,
    pub checker: CheckerKind,
    pub renamer: RenamerKind,
    pub handler: FactsHandlerKind,
}

impl ChaseConfig {
    pub fn build_scheduler(&self) -> Box<dyn RuleScheduler> {
        match self.scheduler {
            SchedulerKind::Naive => Box::new(NaiveScheduler::new()),
            SchedulerKind::ByPredicate => Box::new(ByPredicateScheduler::new()),
            SchedulerKind::Grd => Box::new(GrdScheduler::new()),
        }
    }

    fn build_transformer(&self) -> Box<dyn BodyToQuery> {
        match self.transformer {
            TransformerKind::All => Box::new(AllTransformer),
            TransformerKind::Frontier => Box::new(FrontierTransformer),
        }
    }

    fn build_computer(&self) -> Box<dyn TriggerComputer> {
        match self.computer {
            ComputerKind::Naive => Box::new(NaiveComputer::new()),
            ComputerKind::SemiNaive => Box::new(SemiNaiveComputer::new()),
            ComputerKind::TwoSteps => Box::new(TwoStepsComputer::new()),
            ComputerKind::Restricted => Box::new(RestrictedComputer::new()),
        }
    }

    fn build_checker(&self) -> Box<dyn TriggerChecker> {
        match self.checker {
            CheckerKind::AlwaysTrue => Box::new(AlwaysTrueChecker::new()),
            CheckerKind::Oblivious => Box::new(ObliviousChecker::new()),
            CheckerKind::SemiOblivious => Box::new(SemiObliviousChecker::new()),
            CheckerKind::Restricted => Box::new(RestrictedChecker::new()),
            CheckerKind::Equivalent => Box::new(EquivalentChecker::new()),
            CheckerKind::SemiObliviousRestricted => Box::new(MultiChecker::new(vec![
                Box::new(SemiObliviousChecker::new()),
                Box::new(RestrictedChecker::new()),
            ])),
        }
    }

    fn build_renamer(&self) -> Box<dyn ExistentialRenamer> {
        match self.renamer {
            RenamerKind::Fresh => Box::new(FreshRenamer::new()),
            RenamerKind::BodyPseudoSkolem => Box::new(BodyPseudoSkolem::new()),
            RenamerKind::FrontierPseudoSkolem => Box::new(FrontierPseudoSkolem::new()),
            RenamerKind::FrontierByPiecePseudoSkolem => {
                Box::new(FrontierByPiecePseudoSkolem::new())
            }
            RenamerKind::BodyTrueSkolem => Box::new(BodyTrueSkolem::new()),
            RenamerKind::FrontierTrueSkolem => Box::new(FrontierTrueSkolem::new()),
            RenamerKind::FrontierByPieceTrueSkolem => {
                Box::new(FrontierByPieceTrueSkolem::new())
            }
        }
    }

    fn build_handler(&self) -> Box<dyn FactsHandler> {
        match self.handler {
            FactsHandlerKind::Direct => Box::new(DirectApplication::new()),
            FactsHandlerKind::Delegated => Box::new(DelegatedApplication::new()),
        }
    }

    pub fn build_applier(&self, functions: Arc<FunctionRegistry>) -> Box<dyn RuleApplier> {
        let trigger_applier = TriggerApplier::new(
            self.build_renamer(),
            self.build_handler(),
            functions.clone(),
        );
        match self.applier {
            ApplierKind::BreadthFirst => Box::new(BreadthFirstApplier::new(
                self.build_transformer(),
                self.build_computer(),
                self.build_checker(),
                trigger_applier,
            )),
            ApplierKind::MultiThread => Box::new(MultiThreadApplier::new(
                self.build_transformer(),
                self.build_computer(),
                self.build_checker(),
                trigger_applier,
            )),
            ApplierKind::SourceDelegatedDatalog => {
                Box::new(SourceDelegatedDatalogApplier::standard(functions))
            }
        }
    }

    /// Delegated application needs the end-of-step merge
    pub fn needs_add_created_facts(&self) -> bool {
        matches!(self.applier, ApplierKind::BreadthFirst | ApplierKind::MultiThread)
            && self.handler == FactsHandlerKind::Delegated
    }
}

/// Builder with selectors for every pluggable chase component
///
/// Refuses to build while chasable data or rule base is unset. The
/// defaults give the standard configuration: GRD scheduler, frontier
/// transformer, naive computer, semi-oblivious checker, fresh renamer,
/// delegated application with the end-of-step merge, and the fixpoint
/// halting pair.
#[derive(Default)]
pub struct ChaseBuilder {
    config: ChaseConfig,
    data: Option<ChasableData>,
    rule_base: Option<RuleBase>,
    scheduler_override: Option<Box<dyn RuleScheduler>>,
    applier_override: Option<Box<dyn RuleApplier>>,
    functions: Option<Arc<FunctionRegistry>>,
    halting: Vec<Box<dyn HaltingCondition>>,
    global_pretreatments: Vec<Box<dyn Treatment>>,
    step_pretreatments: Vec<Box<dyn Treatment>>,
    end_of_step_treatments: Vec<Box<dyn Treatment>>,
    global_end_treatments: Vec<Box<dyn Treatment>>,
    debug: bool,
}

impl ChaseBuilder {
    /// An empty builder with default selectors
    pub fn new() -> Self {
        Self::default()
    }

    /// The default chase over the given data and rules
    pub fn default_chase(data: ChasableData, rule_base: RuleBase) -> ChaseResult<Chase> {
        Self::new().chasable_data(data).rule_base(rule_base).build()
    }

    /// Set the data to saturate (required)
    pub fn chasable_data(mut self, data: ChasableData) -> Self {
        self.data = Some(data);
        self
    }

    /// Set the rule base (required)
    pub fn rule_base(mut self, rule_base: RuleBase) -> Self {
        self.rule_base = Some(rule_base);
        self
    }

    /// Select the scheduler
    pub fn scheduler(mut self, kind: SchedulerKind) -> Self {
        self.config.scheduler = kind;
        self
    }

    /// Select the rule applier
    pub fn applier(mut self, kind: ApplierKind) -> Self {
        self.config.applier = kind;
        self
    }

    /// Select the body-to-query transformer
    pub fn transformer(mut self, kind: TransformerKind) -> Self {
        self.config.transformer = kind;
        self
    }

    /// Select the trigger computer
    pub fn computer(mut self, kind: ComputerKind) -> Self {
        self.config.computer = kind;
        self
    }

    /// Select the trigger checker
    pub fn checker(mut self, kind: CheckerKind) -> Self {
        self.config.checker = kind;
        self
    }

    /// Select the existential renamer
    pub fn renamer(mut self, kind: RenamerKind) -> Self {
        self.config.renamer = kind;
        self
    }

    /// Select the facts handler
    pub fn facts_handler(mut self, kind: FactsHandlerKind) -> Self {
        self.config.handler = kind;
        self
    }

    /// Inject a custom scheduler (overrides the selector)
    pub fn custom_scheduler(mut self, scheduler: Box<dyn RuleScheduler>) -> Self {
        self.scheduler_override = Some(scheduler);
        self
    }

    /// Inject a custom rule applier (overrides the selectors)
    pub fn custom_applier(mut self, applier: Box<dyn RuleApplier>) -> Self {
        self.applier_override = Some(applier);
        self
    }

    /// Use a specific function registry for evaluable terms
    pub fn functions(mut self, functions: Arc<FunctionRegistry>) -> Self {
        self.functions = Some(functions);
        self
    }

    /// Append a halting condition
    pub fn halting_condition(mut self, condition: Box<dyn HaltingCondition>) -> Self {
        self.halting.push(condition);
        self
    }

    /// Append the standard fixpoint pair of halting conditions
    pub fn standard_halting_conditions(mut self) -> Self {
        self.halting.push(Box::new(CreatedFactsAtPreviousStep::new()));
        self.halting.push(Box::new(HasRulesToApply::new()));
        self
    }

    /// Append a global pretreatment
    pub fn global_pretreatment(mut self, treatment: Box<dyn Treatment>) -> Self {
        self.global_pretreatments.push(treatment);
        self
    }

    /// Append a per-step pretreatment
    pub fn step_pretreatment(mut self, treatment: Box<dyn Treatment>) -> Self {
        self.step_pretreatments.push(treatment);
        self
    }

    /// Append an end-of-step treatment
    pub fn end_of_step_treatment(mut self, treatment: Box<dyn Treatment>) -> Self {
        self.end_of_step_treatments.push(treatment);
        self
    }

    /// Append a global end treatment
    pub fn global_end_treatment(mut self, treatment: Box<dyn Treatment>) -> Self {
        self.global_end_treatments.push(treatment);
        self
    }

    /// Log step statistics while chasing
    pub fn debug(mut self) -> Self {
        self.debug = true;
        self
    }

    /// Materialize the chase
    ///
    /// Fails with [`ChaseError::Configuration`] when data or rule base
    /// is missing.
    pub fn build(mut self) -> ChaseResult<Chase> {
        let data = self
            .data
            .take()
            .ok_or_else(|| ChaseError::Configuration("chasable data is not set".to_string()))?;
        let rule_base = self
            .rule_base
            .take()
            .ok_or_else(|| ChaseError::Configuration("rule base is not set".to_string()))?;

        let functions = self
            .functions
            .unwrap_or_else(|| Arc::new(FunctionRegistry::standard()));
        let scheduler = self
            .scheduler_override
            .unwrap_or_else(|| self.config.build_scheduler());
        let needs_merge = self.applier_override.is_none() && self.config.needs_add_created_facts();
        let applier = self
            .applier_override
            .unwrap_or_else(|| self.config.build_applier(functions));

        let mut halting = self.halting;
        if halting.is_empty() {
            halting.push(Box::new(CreatedFactsAtPreviousStep::new()));
            halting.push(Box::new(HasRulesToApply::new()));
        }

        let mut end_of_step = self.end_of_step_treatments;
        if needs_merge {
            end_of_step.insert(0, Box::new(AddCreatedFacts::new()));
        }
        if self.debug {
            end_of_step.push(Box::new(DebugTreatment::new()));
        }

        let core = ChaseCore::new(rule_base, data, scheduler, applier);
        Ok(Chase::assemble(
            core,
            halting,
            self.global_pretreatments,
            self.step_pretreatments,
            end_of_step,
            self.global_end_treatments,
        ))
    }
}
