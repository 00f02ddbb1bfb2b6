//! Raw selected counts → smeared prediction.

use log::{debug, warn};
use nx_core::{Error, Result};
use nx_hist::{BinGeometry2D, Histogram, bin_width_norm_2d};

use crate::conversion::{BaseConversion, IdentityConversion};
use crate::smearing::SmearingMatrix;

/// Base conversion, then smearing, then optional 2D density normalization.
#[derive(Debug)]
pub struct RateConverter {
    base: Box<dyn BaseConversion>,
    smearing: SmearingMatrix,
    density: Option<BinGeometry2D>,
}

impl RateConverter {
    /// Build a converter from a base conversion and a smearing matrix.
    pub fn new(base: Box<dyn BaseConversion>, smearing: SmearingMatrix) -> Self {
        Self { base, smearing, density: None }
    }

    /// Identity conversion and no smearing, for `n_bins` bins.
    pub fn unsmeared(n_bins: usize) -> Self {
        Self::new(Box::new(IdentityConversion), SmearingMatrix::identity(n_bins))
    }

    /// Normalize the smeared output by the area of each 2D cell.
    pub fn with_density_geometry(mut self, geometry: BinGeometry2D) -> Result<Self> {
        if geometry.n_cells() != self.output_dim() {
            return Err(Error::dimension(
                "density geometry",
                self.output_dim(),
                geometry.n_cells(),
            ));
        }
        geometry.areas()?;
        self.density = Some(geometry);
        Ok(self)
    }

    /// Number of analysis bins the converter consumes.
    pub fn input_dim(&self) -> usize {
        self.smearing.input_dim()
    }

    /// Number of prediction bins it produces.
    pub fn output_dim(&self) -> usize {
        self.smearing.output_dim()
    }

    /// The smearing matrix.
    pub fn smearing(&self) -> &SmearingMatrix {
        &self.smearing
    }

    /// The density geometry, if any.
    pub fn density_geometry(&self) -> Option<&BinGeometry2D> {
        self.density.as_ref()
    }

    /// True if the smearing matrix mixes bins.
    pub fn is_smeared(&self) -> bool {
        !self.smearing.is_identity()
    }

    /// Produce the prediction histogram from the raw per-bin counts.
    ///
    /// The result is indexed by output bin, keeps the raw histogram's name,
    /// titles and entry count, and has under/overflow zeroed.
    pub fn convert(&self, raw: &Histogram) -> Result<Histogram> {
        if raw.n_bins != self.input_dim() {
            return Err(Error::dimension(
                format!("conversion of '{}'", raw.name),
                self.input_dim(),
                raw.n_bins,
            ));
        }
        let base = self.base.convert(raw)?;
        let content = self.smearing.apply(base.contents())?;
        let error = self.smearing.apply_errors(base.errors())?;

        let mut out = Histogram::indexed(raw.name.clone(), self.output_dim())?
            .with_axis_titles(raw.x_title.clone(), raw.y_title.clone());
        out.title = raw.title.clone();
        out.sumw2 = raw.sumw2;
        out.entries = raw.entries;
        out.set_contents(&content, &error)?;

        let negative = content.iter().filter(|c| **c < 0.0).count();
        if negative > 0 {
            warn!("'{}': {negative} smeared bins are negative", out.name);
        }
        if let Some(geometry) = &self.density {
            bin_width_norm_2d(&mut out, geometry)?;
        }
        debug!("converted '{}': {} -> {} bins", out.name, raw.n_bins, out.n_bins);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::ScaleConversion;
    use nx_hist::Cell2D;

    fn raw(content: &[f64]) -> Histogram {
        let mut h = Histogram::indexed("raw", content.len()).unwrap().with_axis_titles("bin", "events");
        let err: Vec<f64> = content.iter().map(|c| c.sqrt()).collect();
        h.set_contents(content, &err).unwrap();
        h.entries = 7.0;
        h
    }

    #[test]
    fn scale_then_smear() {
        let m = SmearingMatrix::from_row_slice(2, 2, &[0.5, 0.5, 0.0, 1.0]).unwrap();
        let c = RateConverter::new(Box::new(ScaleConversion::new(2.0).unwrap()), m);
        let out = c.convert(&raw(&[4.0, 9.0])).unwrap();
        // base: [8, 18], errors [4, 6]
        assert_eq!(out.contents(), &[4.0, 22.0]);
        assert_eq!(out.error(0), 2.0);
        assert_eq!(out.error(1), (4.0f64 + 36.0).sqrt());
        assert_eq!(out.x_title, "bin");
        assert_eq!(out.entries, 7.0);
        assert!(c.is_smeared());
    }

    #[test]
    fn density_after_smearing() {
        let m = SmearingMatrix::from_row_slice(1, 2, &[1.0, 1.0]).unwrap();
        let g = BinGeometry2D::from_cells(vec![
            Cell2D { x_lo: 0.0, x_hi: 2.0, y_lo: 0.0, y_hi: 1.0 },
            Cell2D { x_lo: 2.0, x_hi: 6.0, y_lo: 0.0, y_hi: 1.0 },
        ]);
        let c = RateConverter::new(Box::new(IdentityConversion), m).with_density_geometry(g).unwrap();
        let out = c.convert(&raw(&[8.0])).unwrap();
        assert_eq!(out.contents(), &[4.0, 2.0]);
    }

    #[test]
    fn density_geometry_must_match_output() {
        let g = BinGeometry2D::from_grid(&[0.0, 1.0], &[0.0, 1.0]);
        let err = RateConverter::unsmeared(3).with_density_geometry(g).unwrap_err();
        assert!(err.is_dimension());
    }

    #[test]
    fn raw_dimension_checked() {
        let c = RateConverter::unsmeared(3);
        assert!(c.convert(&raw(&[1.0, 2.0])).unwrap_err().is_dimension());
        assert!(!c.is_smeared());
    }
}
