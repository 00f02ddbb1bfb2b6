//! Event abstraction.
//!
//! Selections only need named scalar extraction plus an event weight; the
//! concrete event record and its production belong to the caller.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Read-only view of one reconstructed or generated event.
pub trait Event {
    /// Value of the named scalar, or `None` when it does not apply to this
    /// event (e.g. no muon candidate).
    fn scalar(&self, name: &str) -> Option<f64>;

    /// Event weight used when accumulating into bins.
    fn weight(&self) -> f64 {
        1.0
    }
}

impl<E: Event + ?Sized> Event for &E {
    fn scalar(&self, name: &str) -> Option<f64> {
        (**self).scalar(name)
    }

    fn weight(&self) -> f64 {
        (**self).weight()
    }
}

/// Map-backed event record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordEvent {
    /// Named scalars.
    pub values: HashMap<String, f64>,
    /// Event weight.
    #[serde(default = "unit_weight")]
    pub weight: f64,
}

fn unit_weight() -> f64 {
    1.0
}

impl RecordEvent {
    /// Create an empty event with unit weight.
    pub fn new() -> Self {
        Self { values: HashMap::new(), weight: 1.0 }
    }

    /// Set a named scalar.
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Set the event weight.
    pub fn weighted(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }
}

impl Default for RecordEvent {
    fn default() -> Self {
        Self::new()
    }
}

impl Event for RecordEvent {
    fn scalar(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    fn weight(&self) -> f64 {
        self.weight
    }
}
