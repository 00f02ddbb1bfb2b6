//! # nx-core
//!
//! Core types and error handling for nuxsec.
//!
//! This crate provides:
//! - The common error type shared by every stage of the pipeline
//! - The [`Event`] abstraction consumed by selections
//! - A map-backed [`RecordEvent`] for callers without their own event type

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod event;

pub use error::{Error, Result};
pub use event::{Event, RecordEvent};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
