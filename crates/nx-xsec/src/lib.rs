//! # nx-xsec
//!
//! Turns selected event counts into a cross-section prediction with
//! additional smearing, and compares it with data.
//!
//! - [`RateConverter`]: base conversion, then [`SmearingMatrix`], then optional 2D density
//! - [`LikelihoodPolicy`]: χ² with a full covariance once bins are mixed
//! - [`SmearedMeasurement`]: event loop, conversion and likelihood in one place
//! - [`MeasurementConfig`]: JSON description of a measurement
//!
//! ```
//! use nx_xsec::{RateConverter, IdentityConversion, SmearingMatrix};
//! use nx_hist::Histogram;
//!
//! let m = SmearingMatrix::from_row_slice(2, 1, &[1.0, 1.0]).unwrap();
//! let conv = RateConverter::new(Box::new(IdentityConversion), m);
//! let mut raw = Histogram::indexed("raw", 2).unwrap();
//! raw.set_contents(&[3.0, 4.0], &[0.0, 0.0]).unwrap();
//! assert_eq!(conv.convert(&raw).unwrap().contents(), &[7.0]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod conversion;
pub mod converter;
pub mod likelihood;
pub mod measurement;
pub mod smearing;

pub use config::{BinSource, DataSpec, LikelihoodSpec, MatrixSpec, MeasurementConfig};
pub use conversion::{BaseConversion, ConversionSpec, IdentityConversion, ScaleConversion};
pub use converter::RateConverter;
pub use likelihood::{CovarianceChi2, LikelihoodPolicy, chi2_pvalue, diagonal_chi2};
pub use measurement::SmearedMeasurement;
pub use smearing::SmearingMatrix;
