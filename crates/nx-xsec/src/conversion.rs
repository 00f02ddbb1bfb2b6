//! Raw event counts → physical units, before any smearing.

use std::fmt;

use nx_core::{Error, Result};
use nx_hist::Histogram;
use serde::{Deserialize, Serialize};

/// Normalization of accumulated MC weights into the measured quantity.
pub trait BaseConversion: Send + Sync + fmt::Debug {
    /// Convert `raw` into a new histogram with the same binning.
    fn convert(&self, raw: &Histogram) -> Result<Histogram>;
}

/// Multiply by a constant, optionally dividing by the bin width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleConversion {
    scale_factor: f64,
    divide_by_width: bool,
}

impl ScaleConversion {
    /// Scale by `scale_factor`; it must be finite and positive.
    pub fn new(scale_factor: f64) -> Result<Self> {
        if !(scale_factor.is_finite() && scale_factor > 0.0) {
            return Err(Error::Config(format!(
                "scale factor must be finite and > 0, got {scale_factor}"
            )));
        }
        Ok(Self { scale_factor, divide_by_width: false })
    }

    /// Flux-averaged cross-section per event:
    /// `event_rate * units / (n_events * flux)`.
    pub fn from_exposure(event_rate: f64, flux_integral: f64, n_events: u64, units: f64) -> Result<Self> {
        if n_events == 0 || !(flux_integral > 0.0) {
            return Err(Error::Config(format!(
                "exposure needs n_events > 0 and flux > 0 (n_events={n_events}, flux={flux_integral})"
            )));
        }
        Self::new(event_rate * units / (n_events as f64 * flux_integral))
    }

    /// Also divide each bin by its width.
    pub fn per_unit_width(mut self) -> Self {
        self.divide_by_width = true;
        self
    }

    /// The multiplicative factor.
    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }
}

impl BaseConversion for ScaleConversion {
    fn convert(&self, raw: &Histogram) -> Result<Histogram> {
        let mut out = raw.clone();
        out.scale(self.scale_factor);
        if self.divide_by_width {
            for i in 0..out.n_bins {
                let w = out.bin_width(i);
                out.bin_content[i + 1] /= w;
                out.bin_error[i + 1] /= w;
            }
        }
        Ok(out)
    }
}

/// Pass-through, for inputs already in physical units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdentityConversion;

impl BaseConversion for IdentityConversion {
    fn convert(&self, raw: &Histogram) -> Result<Histogram> {
        Ok(raw.clone())
    }
}

fn default_units() -> f64 {
    1e-38
}

/// Serializable choice of [`BaseConversion`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversionSpec {
    /// [`ScaleConversion::new`].
    Scale {
        /// Multiplicative factor.
        scale_factor: f64,
        /// Divide by bin width.
        #[serde(default)]
        divide_by_width: bool,
    },
    /// [`ScaleConversion::from_exposure`].
    Exposure {
        /// Total event rate of the generated sample.
        event_rate: f64,
        /// Integrated flux.
        flux_integral: f64,
        /// Number of generated events.
        n_events: u64,
        /// Cross-section unit (defaults to 1e-38 cm²).
        #[serde(default = "default_units")]
        units: f64,
        /// Divide by bin width.
        #[serde(default)]
        divide_by_width: bool,
    },
    /// [`IdentityConversion`].
    Identity,
}

impl ConversionSpec {
    /// Build the conversion.
    pub fn build(&self) -> Result<Box<dyn BaseConversion>> {
        let with_width = |c: ScaleConversion, divide: bool| if divide { c.per_unit_width() } else { c };
        let conversion: Box<dyn BaseConversion> = match *self {
            ConversionSpec::Scale { scale_factor, divide_by_width } => {
                Box::new(with_width(ScaleConversion::new(scale_factor)?, divide_by_width))
            }
            ConversionSpec::Exposure { event_rate, flux_integral, n_events, units, divide_by_width } => {
                Box::new(with_width(
                    ScaleConversion::from_exposure(event_rate, flux_integral, n_events, units)?,
                    divide_by_width,
                ))
            }
            ConversionSpec::Identity => Box::new(IdentityConversion),
        };
        Ok(conversion)
    }
}
