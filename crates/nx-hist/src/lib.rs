//! # nx-hist
//!
//! Binned histograms for nuxsec predictions.
//!
//! - [`Histogram`]: 1D histogram with under/overflow and explicit per-bin errors
//! - [`BinGeometry2D`]: rectangle covered by each bin of a flattened 2D binning
//! - [`bin_width_norm_2d`]: divide contents by 2D bin area
//! - [`validate`]: pre-use sanity gate writing tagged diagnostics to a sink

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod density;
pub mod geometry;
pub mod hist2d;
pub mod histogram;
pub mod validate;

pub use density::bin_width_norm_2d;
pub use geometry::{BinGeometry2D, Cell2D, GeometrySpec, YSlice};
pub use hist2d::Histogram2D;
pub use histogram::Histogram;
pub use validate::{HistObject, ValidationReport, ValidationStatus, inspect, validate};
