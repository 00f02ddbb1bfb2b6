//! 1D histogram with ROOT-style flow bins.
//!
//! Storage layout for `bin_content` / `bin_error` (length `n_bins + 2`):
//! ```text
//! [0]            underflow
//! [1..=n_bins]   in-range bins
//! [n_bins + 1]   overflow
//! ```

use nx_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// A 1D histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// Histogram name.
    pub name: String,
    /// Histogram title.
    pub title: String,
    /// X-axis title.
    pub x_title: String,
    /// Y-axis title.
    pub y_title: String,
    /// Number of bins (excluding under/overflow).
    pub n_bins: usize,
    /// Bin edges (length = n_bins + 1).
    pub bin_edges: Vec<f64>,
    /// Bin contents including under/overflow (length = n_bins + 2).
    pub bin_content: Vec<f64>,
    /// Bin errors including under/overflow (length = n_bins + 2).
    pub bin_error: Vec<f64>,
    /// Whether per-bin sum of squared weights is tracked.
    pub sumw2: bool,
    /// Total number of fills.
    pub entries: f64,
}

impl Histogram {
    /// Create an empty histogram from sorted bin edges.
    pub fn new(name: impl Into<String>, bin_edges: Vec<f64>) -> Result<Self> {
        let name = name.into();
        check_edges(&name, &bin_edges)?;
        let n_bins = bin_edges.len() - 1;
        Ok(Self {
            name,
            title: String::new(),
            x_title: String::new(),
            y_title: String::new(),
            n_bins,
            bin_edges,
            bin_content: vec![0.0; n_bins + 2],
            bin_error: vec![0.0; n_bins + 2],
            sumw2: false,
            entries: 0.0,
        })
    }

    /// Create an empty histogram with `n_bins` equal-width bins on `[x_min, x_max)`.
    pub fn uniform(name: impl Into<String>, n_bins: usize, x_min: f64, x_max: f64) -> Result<Self> {
        if n_bins == 0 {
            return Err(Error::Config("histogram needs at least one bin".into()));
        }
        let width = (x_max - x_min) / n_bins as f64;
        let edges = (0..=n_bins).map(|i| x_min + width * i as f64).collect();
        Self::new(name, edges)
    }

    /// Histogram indexed by analysis bin number: bin `i` spans `[i, i + 1)`.
    pub fn indexed(name: impl Into<String>, n_bins: usize) -> Result<Self> {
        Self::uniform(name, n_bins, 0.0, n_bins as f64)
    }

    /// Set the axis titles.
    pub fn with_axis_titles(mut self, x_title: impl Into<String>, y_title: impl Into<String>) -> Self {
        self.x_title = x_title.into();
        self.y_title = y_title.into();
        self
    }

    /// Enable per-bin sum-of-squared-weights tracking.
    pub fn with_sumw2(mut self) -> Self {
        self.sumw2 = true;
        self
    }

    /// Lower edge of the first bin.
    pub fn x_min(&self) -> f64 {
        self.bin_edges[0]
    }

    /// Upper edge of the last bin.
    pub fn x_max(&self) -> f64 {
        self.bin_edges[self.n_bins]
    }

    /// Width of in-range bin `i` (0-based).
    pub fn bin_width(&self, i: usize) -> f64 {
        self.bin_edges[i + 1] - self.bin_edges[i]
    }

    /// Global storage index for `x`: 0 for underflow, `n_bins + 1` for overflow.
    ///
    /// Returns `None` for NaN.
    pub fn find_bin(&self, x: f64) -> Option<usize> {
        if x.is_nan() {
            return None;
        }
        if x < self.x_min() {
            return Some(0);
        }
        if x >= self.x_max() {
            return Some(self.n_bins + 1);
        }
        match self.bin_edges.binary_search_by(|e| e.total_cmp(&x)) {
            Ok(i) => Some(i + 1),
            Err(i) => Some(i),
        }
    }

    /// Fill the bin containing `x` with `weight`. NaN values are ignored.
    pub fn fill(&mut self, x: f64, weight: f64) {
        if let Some(global) = self.find_bin(x) {
            self.add_at(global, weight);
        }
    }

    /// Add `weight` to in-range bin `i` (0-based). Out-of-range indices go to overflow.
    pub fn fill_bin(&mut self, i: usize, weight: f64) {
        let global = if i < self.n_bins { i + 1 } else { self.n_bins + 1 };
        self.add_at(global, weight);
    }

    fn add_at(&mut self, global: usize, weight: f64) {
        self.bin_content[global] += weight;
        self.bin_error[global] = if self.sumw2 {
            self.bin_error[global].hypot(weight)
        } else {
            self.bin_content[global].abs().sqrt()
        };
        self.entries += 1.0;
    }

    /// In-range bin contents.
    pub fn contents(&self) -> &[f64] {
        &self.bin_content[1..=self.n_bins]
    }

    /// In-range bin errors.
    pub fn errors(&self) -> &[f64] {
        &self.bin_error[1..=self.n_bins]
    }

    /// Content of in-range bin `i` (0-based).
    pub fn content(&self, i: usize) -> f64 {
        self.bin_content[i + 1]
    }

    /// Error of in-range bin `i` (0-based).
    pub fn error(&self, i: usize) -> f64 {
        self.bin_error[i + 1]
    }

    /// Underflow content.
    pub fn underflow(&self) -> f64 {
        self.bin_content[0]
    }

    /// Overflow content.
    pub fn overflow(&self) -> f64 {
        self.bin_content[self.n_bins + 1]
    }

    /// Overwrite in-range contents and errors; flows are zeroed.
    pub fn set_contents(&mut self, content: &[f64], error: &[f64]) -> Result<()> {
        if content.len() != self.n_bins {
            return Err(Error::dimension(format!("{} contents", self.name), self.n_bins, content.len()));
        }
        if error.len() != self.n_bins {
            return Err(Error::dimension(format!("{} errors", self.name), self.n_bins, error.len()));
        }
        self.bin_content[0] = 0.0;
        self.bin_error[0] = 0.0;
        self.bin_content[1..=self.n_bins].copy_from_slice(content);
        self.bin_error[1..=self.n_bins].copy_from_slice(error);
        self.bin_content[self.n_bins + 1] = 0.0;
        self.bin_error[self.n_bins + 1] = 0.0;
        Ok(())
    }

    /// Sum of all contents including under/overflow.
    pub fn integral_with_flows(&self) -> f64 {
        self.bin_content.iter().sum()
    }

    /// Sum of in-range contents.
    pub fn integral(&self) -> f64 {
        self.contents().iter().sum()
    }

    /// Multiply contents and errors (flows included) by `factor`.
    pub fn scale(&mut self, factor: f64) {
        for c in &mut self.bin_content {
            *c *= factor;
        }
        for e in &mut self.bin_error {
            *e *= factor.abs();
        }
    }

    /// Zero all contents, errors and the entry count.
    pub fn reset(&mut self) {
        self.bin_content.iter_mut().for_each(|c| *c = 0.0);
        self.bin_error.iter_mut().for_each(|e| *e = 0.0);
        self.entries = 0.0;
    }

    /// Add another histogram with identical binning bin by bin.
    pub fn add(&mut self, other: &Histogram) -> Result<()> {
        if other.bin_edges != self.bin_edges {
            return Err(Error::dimension(format!("{} += {}", self.name, other.name), self.n_bins, other.n_bins));
        }
        for (c, o) in self.bin_content.iter_mut().zip(&other.bin_content) {
            *c += o;
        }
        for (e, o) in self.bin_error.iter_mut().zip(&other.bin_error) {
            *e = e.hypot(*o);
        }
        self.entries += other.entries;
        Ok(())
    }
}

fn check_edges(name: &str, edges: &[f64]) -> Result<()> {
    if edges.len() < 2 {
        return Err(Error::Config(format!(
            "histogram '{name}' needs at least 2 bin edges, got {}",
            edges.len()
        )));
    }
    if edges.iter().any(|e| !e.is_finite()) {
        return Err(Error::Config(format!("histogram '{name}' has non-finite bin edges")));
    }
    if let Some(w) = edges.windows(2).find(|w| w[1] <= w[0]) {
        return Err(Error::Config(format!(
            "histogram '{name}' bin edges must be strictly increasing ({} -> {})",
            w[0], w[1]
        )));
    }
    Ok(())
}
