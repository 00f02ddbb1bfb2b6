//! # nx-select
//!
//! Event selection into analysis bins.
//!
//! An analysis bin is an ordered conjunction of cuts; a [`BinClassifier`]
//! holds the bins in index order and reports which ones an event passes.
//! [`EventSelector`] adds the per-event derived-variable cache and decides
//! which bins receive the event weight.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use nx_core::RecordEvent;
//! use nx_select::{BinAccumulator, BinClassifier, EventSelector, VariableSet, VariableSpec};
//!
//! let classifier = BinClassifier::from_text("0 p_mu in 0.1 0.5\n1 p_mu >= 0.5\n").unwrap();
//! let vars = VariableSet::new(&[VariableSpec::new("p_mu", "sqrt(px*px + pz*pz)")]).unwrap();
//! let mut selector = EventSelector::new(Arc::new(classifier), Arc::new(vars));
//!
//! let mut raw = BinAccumulator::new(2);
//! let ev = RecordEvent::new().with("px", 3.0).with("pz", 4.0);
//! assert_eq!(selector.process(&ev, &mut raw), 1);
//! assert_eq!(raw.sumw, vec![0.0, 1.0]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod accumulate;
pub mod classifier;
pub mod definitions;
pub mod expr;
pub mod parallel;
pub mod predicate;
pub mod selector;
pub mod variables;

pub use accumulate::{BinAccumulator, BinSink};
pub use classifier::{Bin, BinClassifier};
pub use definitions::{BinDefinitions, BinSpec, CutSpec};
pub use expr::Expression;
pub use parallel::fill_parallel;
pub use predicate::{Comparison, Predicate};
pub use selector::{EventSelector, OverlapPolicy};
pub use variables::{CachedEvent, VariableCache, VariableSet, VariableSpec};
