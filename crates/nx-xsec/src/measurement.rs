//! Event loop → raw counts → smeared prediction → χ² against data.

use std::io::Write;
use std::sync::Arc;

use log::{debug, info};
use nx_core::{Error, Event, Result};
use nx_hist::{HistObject, Histogram, Histogram2D, inspect, validate};
use nx_select::{BinClassifier, EventSelector, VariableSet, fill_parallel};

use crate::config::MeasurementConfig;
use crate::converter::RateConverter;
use crate::likelihood::{LikelihoodPolicy, chi2_pvalue};
use crate::smearing::SmearingMatrix;

/// A cross-section measurement with additional smearing.
///
/// Owns the selection, the raw per-bin counts, the converter and the data.
/// Call [`process_event`](Self::process_event) (or one of the batch forms) for
/// every MC event, then [`convert_event_rates`](Self::convert_event_rates),
/// then [`get_likelihood`](Self::get_likelihood).
#[derive(Debug)]
pub struct SmearedMeasurement {
    name: String,
    selector: EventSelector,
    raw: Histogram,
    converter: RateConverter,
    data: Vec<f64>,
    data_errors: Vec<f64>,
    likelihood: LikelihoodPolicy,
    prediction: Option<Histogram>,
}

impl SmearedMeasurement {
    /// Assemble a measurement and check that all dimensions agree.
    ///
    /// A converter that mixes bins together with [`LikelihoodPolicy::Diagonal`]
    /// is rejected.
    pub fn new(
        name: impl Into<String>,
        selector: EventSelector,
        converter: RateConverter,
        data: Vec<f64>,
        data_errors: Vec<f64>,
        likelihood: LikelihoodPolicy,
    ) -> Result<Self> {
        let name = name.into();
        let n_bins = selector.classifier().n_bins();
        if converter.input_dim() != n_bins {
            return Err(Error::dimension("converter input vs. analysis bins", n_bins, converter.input_dim()));
        }
        let n_out = converter.output_dim();
        if data.len() != n_out {
            return Err(Error::dimension("data vs. prediction bins", n_out, data.len()));
        }
        if data_errors.len() != n_out {
            return Err(Error::dimension("data errors", n_out, data_errors.len()));
        }
        match &likelihood {
            LikelihoodPolicy::Diagonal if converter.is_smeared() => {
                return Err(Error::Config(format!(
                    "{name}: the diagonal likelihood cannot be used with non-identity smearing; \
                     provide a covariance"
                )));
            }
            LikelihoodPolicy::Diagonal if data_errors.iter().all(|e| *e == 0.0) => {
                return Err(Error::Config(format!(
                    "{name}: the diagonal likelihood needs non-zero data errors"
                )));
            }
            LikelihoodPolicy::Covariance(cov) if cov.dim() != n_out => {
                return Err(Error::dimension("covariance", n_out, cov.dim()));
            }
            _ => {}
        }
        let raw = Histogram::indexed(name.clone(), n_bins)?.with_sumw2();
        Ok(Self { name, selector, raw, converter, data, data_errors, likelihood, prediction: None })
    }

    /// Build everything a config describes.
    pub fn from_config(cfg: &MeasurementConfig) -> Result<Self> {
        let defs = cfg.bins.load(cfg.base_dir())?;
        let classifier = Arc::new(BinClassifier::load(&defs)?);
        let variables = Arc::new(VariableSet::new(&cfg.variables)?);
        let selector = EventSelector::new(classifier, variables).with_overlap_policy(cfg.overlap);

        let smearing = match &cfg.smearing {
            Some(m) => m.build()?,
            None => SmearingMatrix::identity(defs.n_bins()),
        };
        let mut converter = RateConverter::new(cfg.conversion.build()?, smearing);
        if let Some(geometry) = &cfg.density {
            converter = converter.with_density_geometry(geometry.build())?;
        }

        let errors = cfg.data.errors_or_zero();
        let likelihood = cfg.likelihood.build(cfg.data.content.len(), &errors)?;
        let mut m = Self::new(cfg.name.clone(), selector, converter, cfg.data.content.clone(), errors, likelihood)?;
        m.raw.x_title = cfg.x_title.clone();
        m.raw.y_title = cfg.y_title.clone();
        info!(
            "measurement '{}': {} analysis bins -> {} prediction bins",
            m.name,
            m.raw.n_bins,
            m.converter.output_dim()
        );
        Ok(m)
    }

    /// Measurement name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Selector.
    pub fn selector(&self) -> &EventSelector {
        &self.selector
    }

    /// Converter.
    pub fn converter(&self) -> &RateConverter {
        &self.converter
    }

    /// Raw selected counts per analysis bin.
    pub fn raw(&self) -> &Histogram {
        &self.raw
    }

    /// Measured data.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Measured data errors.
    pub fn data_errors(&self) -> &[f64] {
        &self.data_errors
    }

    /// Likelihood policy.
    pub fn likelihood_policy(&self) -> &LikelihoodPolicy {
        &self.likelihood
    }

    /// Clear the raw counts and the prediction.
    pub fn reset(&mut self) {
        self.raw.reset();
        self.prediction = None;
    }

    /// Select one event and add its weight to the raw counts.
    ///
    /// Returns the number of bins it passed.
    pub fn process_event(&mut self, event: &dyn Event) -> usize {
        self.prediction = None;
        self.selector.process(event, &mut self.raw)
    }

    /// Process events in order on the calling thread.
    pub fn process_events<E: Event>(&mut self, events: &[E]) {
        for event in events {
            self.process_event(event);
        }
        debug!("'{}': {} events processed, {} fills", self.name, events.len(), self.raw.entries);
    }

    /// Process events on the rayon pool and merge the result into the raw counts.
    pub fn process_events_par<E: Event + Sync>(&mut self, events: &[E]) -> Result<()> {
        self.prediction = None;
        let acc = fill_parallel(
            self.selector.classifier(),
            self.selector.variables(),
            self.selector.overlap_policy(),
            events,
        );
        let overlapping = acc.overlapping_events;
        self.raw.add(&acc.into_histogram(self.name.clone())?)?;
        self.selector.record_overlapping_events(overlapping);
        Ok(())
    }

    /// Convert the raw counts into the prediction.
    pub fn convert_event_rates(&mut self) -> Result<&Histogram> {
        let mut pred = self.converter.convert(&self.raw)?;
        pred.name = format!("{}_prediction", self.name);
        Ok(&*self.prediction.insert(pred))
    }

    /// The prediction, if [`convert_event_rates`](Self::convert_event_rates) ran since the last fill.
    pub fn prediction(&self) -> Option<&Histogram> {
        self.prediction.as_ref()
    }

    /// The prediction unflattened onto the density grid.
    pub fn prediction_2d(&self) -> Result<Histogram2D> {
        let pred = self.require_prediction()?;
        let geometry = self
            .converter
            .density_geometry()
            .ok_or_else(|| Error::Config(format!("{}: no 2D geometry configured", self.name)))?;
        Histogram2D::from_flat(pred, geometry)
    }

    fn require_prediction(&self) -> Result<&Histogram> {
        self.prediction.as_ref().ok_or_else(|| {
            Error::Computation(format!("{}: event rates have not been converted", self.name))
        })
    }

    /// χ² of the data against the current prediction.
    ///
    /// A prediction failing the histogram checks is an [`Error::Validation`].
    pub fn get_likelihood(&self) -> Result<f64> {
        let pred = self.require_prediction()?;
        inspect(Some(pred as &dyn HistObject)).ensure()?;
        self.likelihood.chi2(&self.data, &self.data_errors, pred.contents())
    }

    /// Degrees of freedom: number of prediction bins.
    pub fn ndof(&self) -> usize {
        self.converter.output_dim()
    }

    /// χ² p-value of the current prediction.
    pub fn p_value(&self) -> Result<f64> {
        chi2_pvalue(self.get_likelihood()?, self.ndof())
    }

    /// Run the histogram checks on the raw counts and the prediction.
    pub fn validate_outputs(&self, sink: &mut dyn Write, verbose: bool) -> bool {
        let raw_ok = validate(Some(&self.raw as &dyn HistObject), sink, verbose);
        let pred_ok = validate(self.prediction.as_ref().map(|p| p as &dyn HistObject), sink, verbose);
        raw_ok && pred_ok
    }
}
