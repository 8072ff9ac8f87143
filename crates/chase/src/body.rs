//! Rule bodies as queries, and grouping rules by shared body

use atom_model::{FoQuery, RuleBase, Variable};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

/// Turns a rule body into the query the trigger computer evaluates
///
/// The body's universal-closure prefix is stripped: at trigger time
/// those variables are plain join variables.
pub trait BodyToQuery: Send + Sync {
    /// The body query for one rule
    fn transform(&self, rule: &atom_model::Rule) -> FoQuery;
}

/// Answer variables are all free variables of the body
#[derive(Debug, Default, Clone, Copy)]
pub struct AllTransformer;

impl BodyToQuery for AllTransformer {
    fn transform(&self, rule: &atom_model::Rule) -> FoQuery {
        let flattened = rule.flattened_body();
        let answers: Vec<Variable> = flattened.free_variables().into_iter().collect();
        FoQuery::new(flattened.clone(), answers)
    }
}

/// Answer variables are the frontier only
#[derive(Debug, Default, Clone, Copy)]
pub struct FrontierTransformer;

impl BodyToQuery for FrontierTransformer {
    fn transform(&self, rule: &atom_model::Rule) -> FoQuery {
        let answers: Vec<Variable> = rule.frontier().iter().cloned().collect();
        FoQuery::new(rule.flattened_body().clone(), answers)
    }
}

/// Group rule indices by their (transformed) body query
///
/// Rules with equal bodies share one join; groups come out ordered by
/// their smallest rule index so iteration is deterministic.
pub fn group_rules_by_body(
    transformer: &dyn BodyToQuery,
    rules: &BTreeSet<usize>,
    rule_base: &RuleBase,
) -> Vec<(FoQuery, Vec<usize>)> {
    let mut grouped: FxHashMap<FoQuery, Vec<usize>> = FxHashMap::default();
    for &index in rules {
        let Some(rule) = rule_base.rules().get(index) else {
            continue;
        };
        grouped
            .entry(transformer.transform(rule))
            .or_default()
            .push(index);
    }
    let mut groups: Vec<(FoQuery, Vec<usize>)> = grouped.into_iter().collect();
    groups.sort_by_key(|(_, members)| members.iter().copied().min().unwrap_or(usize::MAX));
    groups
}
