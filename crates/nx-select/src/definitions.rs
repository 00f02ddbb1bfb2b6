//! Bin-definition tables.
//!
//! One cut per line:
//!
//! ```text
//! # bin  variable  op  threshold
//! 0      p_mu      >=  0.10
//! 0      p_mu      <   0.24
//! 1      cos_mu    in  -1.0  -0.5     # shorthand for >= -1.0 and < -0.5
//! ```
//!
//! `#` and `//` start comments. Bin indices start at 0 and must either repeat
//! the previous index or increase it by one; the cuts of a bin keep their
//! file order.

use std::fmt::Write as _;
use std::path::Path;

use log::debug;
use nx_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::predicate::{Comparison, Predicate};

/// `variable <op> threshold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutSpec {
    /// Event or derived variable name.
    pub variable: String,
    /// Comparison operator.
    pub op: Comparison,
    /// Threshold value.
    pub threshold: f64,
}

impl CutSpec {
    /// Create a cut spec.
    pub fn new(variable: impl Into<String>, op: Comparison, threshold: f64) -> Self {
        Self { variable: variable.into(), op, threshold }
    }

    /// Build the predicate for this cut.
    pub fn to_predicate(&self) -> Predicate {
        Predicate::threshold(self.variable.clone(), self.op, self.threshold)
    }
}

/// Ordered cuts of one bin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BinSpec {
    /// Cuts, all of which must pass.
    pub cuts: Vec<CutSpec>,
}

/// Ordered bins of an analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BinDefinitions {
    /// Bins in index order.
    pub bins: Vec<BinSpec>,
}

fn strip_comment(line: &str) -> &str {
    let end = [line.find('#'), line.find("//")].into_iter().flatten().min();
    match end {
        Some(i) => &line[..i],
        None => line,
    }
}

fn parse_number(tok: &str, line_no: usize) -> Result<f64> {
    let v: f64 = tok
        .parse()
        .map_err(|_| Error::Config(format!("line {line_no}: invalid threshold '{tok}'")))?;
    if v.is_nan() {
        return Err(Error::Config(format!("line {line_no}: threshold is NaN")));
    }
    Ok(v)
}

impl BinDefinitions {
    /// Parse a definition table.
    pub fn parse(text: &str) -> Result<Self> {
        let mut bins: Vec<BinSpec> = Vec::new();
        for (i, raw) in text.lines().enumerate() {
            let line_no = i + 1;
            let fields: Vec<&str> = strip_comment(raw).split_whitespace().collect();
            if fields.is_empty() {
                continue;
            }
            if fields.len() < 4 {
                return Err(Error::Config(format!(
                    "line {line_no}: expected '<bin> <variable> <op> <threshold>', got '{}'",
                    raw.trim()
                )));
            }
            let index: usize = fields[0]
                .parse()
                .map_err(|_| Error::Config(format!("line {line_no}: invalid bin index '{}'", fields[0])))?;
            let expected_next = bins.len();
            if index.checked_add(1) == Some(expected_next) {
                // continuing the current bin
            } else if index == expected_next {
                bins.push(BinSpec::default());
            } else {
                return Err(Error::Config(format!(
                    "line {line_no}: bin index {index} out of order (expected {} or {expected_next})",
                    expected_next.saturating_sub(1)
                )));
            }
            let variable = fields[1];
            let cuts = &mut bins[index].cuts;
            match (fields[2], fields.len()) {
                ("in", 5) => {
                    let lo = parse_number(fields[3], line_no)?;
                    let hi = parse_number(fields[4], line_no)?;
                    if hi <= lo {
                        return Err(Error::Config(format!(
                            "line {line_no}: empty range [{lo}, {hi}) for '{variable}'"
                        )));
                    }
                    cuts.push(CutSpec::new(variable, Comparison::Ge, lo));
                    cuts.push(CutSpec::new(variable, Comparison::Lt, hi));
                }
                ("in", n) => {
                    return Err(Error::Config(format!(
                        "line {line_no}: 'in' takes a low and a high edge ({} value(s) given)",
                        n - 3
                    )));
                }
                (op, 4) => {
                    let op = op
                        .parse::<Comparison>()
                        .map_err(|e| Error::Config(format!("line {line_no}: {e}")))?;
                    cuts.push(CutSpec::new(variable, op, parse_number(fields[3], line_no)?));
                }
                (_, n) => {
                    return Err(Error::Config(format!(
                        "line {line_no}: expected 4 fields, got {n}"
                    )));
                }
            }
        }
        let defs = Self { bins };
        defs.check()?;
        debug!("parsed {} bin definitions", defs.bins.len());
        Ok(defs)
    }

    /// Read and parse a definition file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Reject empty tables, bins without cuts and NaN thresholds.
    pub fn check(&self) -> Result<()> {
        if self.bins.is_empty() {
            return Err(Error::Config("bin definitions are empty".into()));
        }
        for (i, bin) in self.bins.iter().enumerate() {
            if bin.cuts.is_empty() {
                return Err(Error::Config(format!("bin {i} has no cuts")));
            }
            if let Some(cut) = bin.cuts.iter().find(|c| c.threshold.is_nan()) {
                return Err(Error::Config(format!("bin {i}: threshold of '{}' is NaN", cut.variable)));
            }
        }
        Ok(())
    }

    /// Number of bins.
    pub fn n_bins(&self) -> usize {
        self.bins.len()
    }

    /// Render back to the line-based table format.
    pub fn to_text(&self) -> String {
        let mut out = String::from("# bin variable op threshold\n");
        for (i, bin) in self.bins.iter().enumerate() {
            for cut in &bin.cuts {
                let _ = writeln!(out, "{i} {} {} {}", cut.variable, cut.op, cut.threshold);
            }
        }
        out
    }
}
