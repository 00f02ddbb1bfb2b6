//! Destinations for selected event weights.

use nx_core::Result;
use nx_hist::Histogram;

/// Receives `(bin, weight)` pairs chosen by the selector.
pub trait BinSink {
    /// Add `weight` to analysis bin `bin`.
    fn fill_bin(&mut self, bin: usize, weight: f64);
}

impl BinSink for Histogram {
    fn fill_bin(&mut self, bin: usize, weight: f64) {
        Histogram::fill_bin(self, bin, weight);
    }
}

/// Plain per-bin sums, used as a private buffer by each parallel worker.
#[derive(Debug, Clone, PartialEq)]
pub struct BinAccumulator {
    /// Sum of weights per bin.
    pub sumw: Vec<f64>,
    /// Sum of squared weights per bin.
    pub sumw2: Vec<f64>,
    /// Number of fills.
    pub entries: u64,
    /// Events that passed more than one bin, as counted by the filling selector.
    pub overlapping_events: u64,
}

impl BinAccumulator {
    /// Zeroed accumulator for `n_bins` bins.
    pub fn new(n_bins: usize) -> Self {
        Self { sumw: vec![0.0; n_bins], sumw2: vec![0.0; n_bins], entries: 0, overlapping_events: 0 }
    }

    /// Add another accumulator bin by bin.
    pub fn merge(&mut self, other: &BinAccumulator) {
        for (a, b) in self.sumw.iter_mut().zip(&other.sumw) {
            *a += b;
        }
        for (a, b) in self.sumw2.iter_mut().zip(&other.sumw2) {
            *a += b;
        }
        self.entries += other.entries;
        self.overlapping_events += other.overlapping_events;
    }

    /// Convert into a bin-indexed histogram with `sqrt(sumw2)` errors.
    pub fn into_histogram(self, name: impl Into<String>) -> Result<Histogram> {
        let mut h = Histogram::indexed(name, self.sumw.len())?.with_sumw2();
        let errors: Vec<f64> = self.sumw2.iter().map(|w2| w2.sqrt()).collect();
        h.set_contents(&self.sumw, &errors)?;
        h.entries = self.entries as f64;
        Ok(h)
    }
}

impl BinSink for BinAccumulator {
    fn fill_bin(&mut self, bin: usize, weight: f64) {
        if bin < self.sumw.len() {
            self.sumw[bin] += weight;
            self.sumw2[bin] += weight * weight;
            self.entries += 1;
        }
    }
}
