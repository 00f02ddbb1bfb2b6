//! χ² of a prediction against measured data.
//!
//! Once smearing mixes bins the per-bin independent form is wrong, so the
//! likelihood is a policy chosen when the measurement is built.

use nalgebra::{Cholesky, DMatrix, DVector, Dyn};
use nx_core::{Error, Result};
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// χ² with a full data covariance, `r^T C^-1 r`.
#[derive(Debug, Clone)]
pub struct CovarianceChi2 {
    covariance: DMatrix<f64>,
    chol: Cholesky<f64, Dyn>,
}

impl CovarianceChi2 {
    /// Factorize `covariance`; it must be square and positive definite.
    pub fn new(covariance: DMatrix<f64>) -> Result<Self> {
        if !covariance.is_square() || covariance.nrows() == 0 {
            return Err(Error::Config(format!(
                "covariance must be a non-empty square matrix, got {}x{}",
                covariance.nrows(),
                covariance.ncols()
            )));
        }
        let chol = covariance
            .clone()
            .cholesky()
            .ok_or_else(|| Error::Config("covariance matrix is not positive definite".into()))?;
        Ok(Self { covariance, chol })
    }

    /// Row-major `n x n` covariance.
    pub fn from_row_slice(n: usize, values: &[f64]) -> Result<Self> {
        if values.len() != n * n {
            return Err(Error::dimension("covariance values", n * n, values.len()));
        }
        Self::new(DMatrix::from_row_slice(n, n, values))
    }

    /// Uncorrelated covariance from per-bin errors.
    pub fn from_errors(errors: &[f64]) -> Result<Self> {
        let var = DVector::from_iterator(errors.len(), errors.iter().map(|e| e * e));
        Self::new(DMatrix::from_diagonal(&var))
    }

    /// Number of bins.
    pub fn dim(&self) -> usize {
        self.covariance.nrows()
    }

    /// The covariance matrix.
    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    /// `r^T C^-1 r` with `r = data - prediction`.
    pub fn chi2(&self, data: &[f64], prediction: &[f64]) -> Result<f64> {
        let n = self.dim();
        if data.len() != n {
            return Err(Error::dimension("chi2 data", n, data.len()));
        }
        if prediction.len() != n {
            return Err(Error::dimension("chi2 prediction", n, prediction.len()));
        }
        let r = DVector::from_iterator(n, data.iter().zip(prediction).map(|(d, p)| d - p));
        let c_inv_r = self.chol.solve(&r);
        Ok(r.dot(&c_inv_r))
    }
}

/// Per-bin independent χ²; bins with zero error are skipped.
pub fn diagonal_chi2(data: &[f64], errors: &[f64], prediction: &[f64]) -> Result<f64> {
    if errors.len() != data.len() {
        return Err(Error::dimension("chi2 errors", data.len(), errors.len()));
    }
    if prediction.len() != data.len() {
        return Err(Error::dimension("chi2 prediction", data.len(), prediction.len()));
    }
    Ok(data
        .iter()
        .zip(errors)
        .zip(prediction)
        .filter(|((_, e), _)| **e != 0.0)
        .map(|((d, e), p)| ((d - p) / e).powi(2))
        .sum())
}

/// Upper-tail probability of `chi2` with `ndof` degrees of freedom.
pub fn chi2_pvalue(chi2: f64, ndof: usize) -> Result<f64> {
    let dist = ChiSquared::new(ndof as f64)
        .map_err(|e| Error::Computation(format!("chi2 distribution with ndof={ndof}: {e}")))?;
    Ok(dist.sf(chi2))
}

/// How [`get_likelihood`](crate::SmearedMeasurement::get_likelihood) compares data and prediction.
#[derive(Debug, Clone)]
pub enum LikelihoodPolicy {
    /// Independent bins, per-bin data errors.
    Diagonal,
    /// Full covariance.
    Covariance(CovarianceChi2),
}

impl LikelihoodPolicy {
    /// Evaluate χ².
    pub fn chi2(&self, data: &[f64], errors: &[f64], prediction: &[f64]) -> Result<f64> {
        match self {
            LikelihoodPolicy::Diagonal => diagonal_chi2(data, errors, prediction),
            LikelihoodPolicy::Covariance(c) => c.chi2(data, prediction),
        }
    }

    /// True if off-diagonal bin correlations enter the χ².
    pub fn accounts_for_bin_correlations(&self) -> bool {
        matches!(self, LikelihoodPolicy::Covariance(_))
    }
}
