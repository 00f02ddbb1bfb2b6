//! Per-event selection: derive variables, classify, hand weights to a sink.

use std::sync::Arc;

use log::warn;
use nx_core::Event;
use serde::{Deserialize, Serialize};

use crate::accumulate::BinSink;
use crate::classifier::BinClassifier;
use crate::variables::{CachedEvent, VariableCache, VariableSet};

/// How an event passing several bins distributes its weight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Full weight to every passing bin.
    #[default]
    EveryMatch,
    /// Full weight to the lowest-index passing bin only.
    FirstMatch,
    /// Weight divided evenly between the passing bins.
    Split,
}

/// Signal selection and bin filling for one stream of events.
///
/// Holds per-event scratch state (derived-variable cache and passing-bin
/// buffer), so each worker thread needs its own selector; the classifier and
/// variable definitions are shared.
#[derive(Debug, Clone)]
pub struct EventSelector {
    classifier: Arc<BinClassifier>,
    variables: Arc<VariableSet>,
    overlap: OverlapPolicy,
    cache: VariableCache,
    passing: Vec<usize>,
    overlapping_events: u64,
    warn_on_overlap: bool,
}

impl EventSelector {
    /// Create a selector with the default overlap policy.
    pub fn new(classifier: Arc<BinClassifier>, variables: Arc<VariableSet>) -> Self {
        Self {
            classifier,
            variables,
            overlap: OverlapPolicy::default(),
            cache: VariableCache::new(),
            passing: Vec::new(),
            overlapping_events: 0,
            warn_on_overlap: true,
        }
    }

    /// Set the overlap policy.
    pub fn with_overlap_policy(mut self, overlap: OverlapPolicy) -> Self {
        self.overlap = overlap;
        self
    }

    /// Enable or disable the warning logged on the first overlapping event.
    pub fn with_overlap_warning(mut self, enabled: bool) -> Self {
        self.warn_on_overlap = enabled;
        self
    }

    /// Shared classifier.
    pub fn classifier(&self) -> &Arc<BinClassifier> {
        &self.classifier
    }

    /// Shared derived-variable definitions.
    pub fn variables(&self) -> &Arc<VariableSet> {
        &self.variables
    }

    /// Active overlap policy.
    pub fn overlap_policy(&self) -> OverlapPolicy {
        self.overlap
    }

    /// Recompute the derived variables for `event`, discarding the previous event's values.
    pub fn fill_variables(&mut self, event: &dyn Event) {
        self.variables.compute(event, &mut self.cache);
    }

    /// Cached value of a derived variable for the current event.
    pub fn variable(&self, name: &str) -> Option<f64> {
        self.variables.index_of(name).and_then(|i| self.cache.get(i))
    }

    /// Bins passed by the most recently classified event.
    pub fn passing_bins(&self) -> &[usize] {
        &self.passing
    }

    /// Number of processed events that passed more than one bin.
    pub fn overlapping_events(&self) -> u64 {
        self.overlapping_events
    }

    /// Add overlapping events counted elsewhere, e.g. by parallel workers.
    pub fn record_overlapping_events(&mut self, n: u64) {
        self.overlapping_events += n;
    }

    fn classify_current(&mut self, event: &dyn Event) {
        let view = CachedEvent::new(event, &self.variables, &self.cache);
        self.classifier.classify_into(&view, &mut self.passing);
    }

    /// Fill variables and classify; true iff at least one bin passed.
    pub fn is_signal(&mut self, event: &dyn Event) -> bool {
        self.fill_variables(event);
        self.classify_current(event);
        !self.passing.is_empty()
    }

    /// Run the full per-event step and send the event weight to `sink`.
    ///
    /// Returns the number of bins the event passed.
    pub fn process(&mut self, event: &dyn Event, sink: &mut dyn BinSink) -> usize {
        if !self.is_signal(event) {
            return 0;
        }
        let n = self.passing.len();
        if n > 1 {
            self.overlapping_events += 1;
            if self.warn_on_overlap && self.overlapping_events == 1 {
                warn!("event passed {n} bins {:?}; applying {:?}", self.passing, self.overlap);
            }
        }
        let weight = event.weight();
        match self.overlap {
            OverlapPolicy::EveryMatch => {
                for &bin in &self.passing {
                    sink.fill_bin(bin, weight);
                }
            }
            OverlapPolicy::FirstMatch => sink.fill_bin(self.passing[0], weight),
            OverlapPolicy::Split => {
                let share = weight / n as f64;
                for &bin in &self.passing {
                    sink.fill_bin(bin, share);
                }
            }
        }
        n
    }
}
