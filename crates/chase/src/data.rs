//! Chasable data: the writing target plus read-only side sources

use fact_store::{Data, DataCollection, FactBase, MaterializedData, MissingAsEmpty};

/// The data a chase saturates
///
/// The chase writes to the target; trigger computation reads a merged
/// view routing each predicate to the target first, then to the side
/// sources in order. Missing predicates read as empty (a rule body
/// over a predicate nothing has produced yet simply finds no trigger).
pub struct ChasableData {
    target: Box<dyn FactBase>,
    sources: Vec<Box<dyn Data>>,
}

impl ChasableData {
    /// Chasable data with a writing target and no side sources
    pub fn new(target: Box<dyn FactBase>) -> Self {
        Self {
            target,
            sources: Vec::new(),
        }
    }

    /// Chasable data with read-only side sources
    pub fn with_sources(target: Box<dyn FactBase>, sources: Vec<Box<dyn Data>>) -> Self {
        Self { target, sources }
    }

    /// The writing target, readable
    pub fn target(&self) -> &dyn FactBase {
        self.target.as_ref()
    }

    /// The writing target, writable
    pub fn target_mut(&mut self) -> &mut dyn FactBase {
        self.target.as_mut()
    }

    /// The read-only side sources, in routing order
    pub fn sources(&self) -> &[Box<dyn Data>] {
        &self.sources
    }

    /// The merged read view over target and sources
    pub fn read_view(&self) -> MissingAsEmpty<DataCollection<'_>> {
        let mut union = DataCollection::new();
        union.push(self.target.as_data());
        for source in &self.sources {
            union.push(source.as_ref());
        }
        MissingAsEmpty(union)
    }

    /// Unwrap into the writing target
    pub fn into_target(self) -> Box<dyn FactBase> {
        self.target
    }
}

impl std::fmt::Debug for ChasableData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChasableData")
            .field("target_atoms", &self.target.len())
            .field("sources", &self.sources.len())
            .finish()
    }
}
