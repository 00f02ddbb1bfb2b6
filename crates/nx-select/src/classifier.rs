//! Ordered bins of conjunctive cuts.

use std::path::Path;

use log::debug;
use nx_core::{Error, Event, Result};

use crate::definitions::BinDefinitions;
use crate::predicate::Predicate;

/// One analysis bin: every predicate must pass.
#[derive(Debug, Clone)]
pub struct Bin {
    predicates: Vec<Predicate>,
}

impl Bin {
    /// Create a bin from its ordered cuts.
    pub fn new(predicates: Vec<Predicate>) -> Self {
        Self { predicates }
    }

    /// The cuts of this bin.
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// True iff every cut passes.
    #[inline]
    pub fn passes(&self, event: &dyn Event) -> bool {
        self.predicates.iter().all(|p| p.evaluate(event))
    }
}

/// Maps an event to the indices of the bins it passes.
///
/// Bin order is fixed at construction and defines the output index space.
/// The classifier holds no per-event state and can be shared across threads.
#[derive(Debug, Clone)]
pub struct BinClassifier {
    bins: Vec<Bin>,
}

impl BinClassifier {
    /// Build from ready-made bins. Zero bins, or a bin without cuts, is a
    /// configuration error.
    pub fn new(bins: Vec<Bin>) -> Result<Self> {
        if bins.is_empty() {
            return Err(Error::Config("bin classifier needs at least one bin".into()));
        }
        if let Some(i) = bins.iter().position(|b| b.predicates.is_empty()) {
            return Err(Error::Config(format!("bin {i} has no cuts")));
        }
        Ok(Self { bins })
    }

    /// Build from parsed definitions.
    pub fn load(defs: &BinDefinitions) -> Result<Self> {
        defs.check()?;
        let bins = defs
            .bins
            .iter()
            .map(|b| Bin::new(b.cuts.iter().map(|c| c.to_predicate()).collect()))
            .collect();
        let classifier = Self::new(bins)?;
        debug!(
            "loaded bin classifier: {} bins, {} cuts",
            classifier.n_bins(),
            classifier.bins.iter().map(|b| b.predicates.len()).sum::<usize>()
        );
        Ok(classifier)
    }

    /// Parse and build from a definition table.
    pub fn from_text(text: &str) -> Result<Self> {
        Self::load(&BinDefinitions::parse(text)?)
    }

    /// Read, parse and build from a definition file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::load(&BinDefinitions::from_path(path)?)
    }

    /// Number of bins.
    pub fn n_bins(&self) -> usize {
        self.bins.len()
    }

    /// Bins in index order.
    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    /// Indices of all bins `event` passes, ascending.
    pub fn classify(&self, event: &dyn Event) -> Vec<usize> {
        let mut out = Vec::new();
        self.classify_into(event, &mut out);
        out
    }

    /// Like [`classify`](Self::classify) but reuses `passing`, which is cleared first.
    pub fn classify_into(&self, event: &dyn Event, passing: &mut Vec<usize>) {
        passing.clear();
        passing.extend(
            self.bins.iter().enumerate().filter(|(_, b)| b.passes(event)).map(|(i, _)| i),
        );
    }

    /// True iff `event` passes at least one bin.
    pub fn is_signal(&self, event: &dyn Event) -> bool {
        self.bins.iter().any(|b| b.passes(event))
    }
}
