//! Single cuts: an extractor paired with a test.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use nx_core::{Error, Event, Result};
use serde::{Deserialize, Serialize};

/// Comparison operator used by threshold cuts and expressions.
///
/// Every comparison involving NaN is false, including `!=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparison {
    /// `<`
    #[serde(rename = "<")]
    Lt,
    /// `<=`
    #[serde(rename = "<=")]
    Le,
    /// `>`
    #[serde(rename = ">")]
    Gt,
    /// `>=`
    #[serde(rename = ">=")]
    Ge,
    /// `==`
    #[serde(rename = "==")]
    Eq,
    /// `!=`
    #[serde(rename = "!=")]
    Ne,
}

impl Comparison {
    /// Evaluate `lhs <op> rhs`.
    pub fn holds(self, lhs: f64, rhs: f64) -> bool {
        if lhs.is_nan() || rhs.is_nan() {
            return false;
        }
        match self {
            Comparison::Lt => lhs < rhs,
            Comparison::Le => lhs <= rhs,
            Comparison::Gt => lhs > rhs,
            Comparison::Ge => lhs >= rhs,
            Comparison::Eq => (lhs - rhs).abs() < f64::EPSILON || lhs == rhs,
            Comparison::Ne => !((lhs - rhs).abs() < f64::EPSILON || lhs == rhs),
        }
    }

    /// Operator symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
            Comparison::Eq => "==",
            Comparison::Ne => "!=",
        }
    }
}

impl FromStr for Comparison {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "<" => Comparison::Lt,
            "<=" => Comparison::Le,
            ">" => Comparison::Gt,
            ">=" => Comparison::Ge,
            "==" => Comparison::Eq,
            "!=" => Comparison::Ne,
            other => return Err(Error::Config(format!("unknown comparison operator '{other}'"))),
        })
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

type Extractor = Arc<dyn Fn(&dyn Event) -> f64 + Send + Sync>;
type Test = Arc<dyn Fn(f64) -> bool + Send + Sync>;

/// A cut: `test(extractor(event))`.
///
/// Extractors signal "not applicable" by returning NaN; tests are expected to
/// reject NaN (all [`Comparison`]s do).
#[derive(Clone)]
pub struct Predicate {
    extractor: Extractor,
    test: Test,
    label: String,
}

impl Predicate {
    /// Build from an arbitrary extractor and test.
    pub fn new(
        extractor: impl Fn(&dyn Event) -> f64 + Send + Sync + 'static,
        test: impl Fn(f64) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self { extractor: Arc::new(extractor), test: Arc::new(test), label: "<custom>".into() }
    }

    /// `variable <op> threshold`; a missing variable fails the cut.
    pub fn threshold(variable: impl Into<String>, op: Comparison, threshold: f64) -> Self {
        let variable = variable.into();
        let label = format!("{variable} {op} {threshold}");
        let name = variable.clone();
        Self {
            extractor: Arc::new(move |ev: &dyn Event| ev.scalar(&name).unwrap_or(f64::NAN)),
            test: Arc::new(move |x| op.holds(x, threshold)),
            label,
        }
    }

    /// Attach a human-readable label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Human-readable label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Apply the cut to `event`.
    #[inline]
    pub fn evaluate(&self, event: &dyn Event) -> bool {
        (self.test)((self.extractor)(event))
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate").field("label", &self.label).finish()
    }
}
