//! Additional smearing matrix applied to converted predictions.

use nalgebra::{DMatrix, DVector};
use nx_core::{Error, Result};

/// Dense `input × output` transfer matrix.
///
/// Element `(i, j)` is the fraction of input bin `i` that ends up in output
/// bin `j`, so the smeared vector is `Aᵀ · v`. Rows define the expected input
/// length, columns the output length. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct SmearingMatrix {
    matrix: DMatrix<f64>,
}

impl SmearingMatrix {
    /// Wrap a matrix; it must be non-empty and finite.
    pub fn new(matrix: DMatrix<f64>) -> Result<Self> {
        if matrix.nrows() == 0 || matrix.ncols() == 0 {
            return Err(Error::Config("smearing matrix is empty".into()));
        }
        if let Some(pos) = matrix.iter().position(|v| !v.is_finite()) {
            // nalgebra storage is column-major
            let (r, c) = (pos % matrix.nrows(), pos / matrix.nrows());
            return Err(Error::Config(format!("smearing matrix element ({r}, {c}) is not finite")));
        }
        Ok(Self { matrix })
    }

    /// Build from row-major values.
    pub fn from_row_slice(rows: usize, cols: usize, values: &[f64]) -> Result<Self> {
        if values.len() != rows * cols {
            return Err(Error::dimension(
                format!("smearing matrix {rows}x{cols} values"),
                rows * cols,
                values.len(),
            ));
        }
        Self::new(DMatrix::from_row_slice(rows, cols, values))
    }

    /// `n × n` identity.
    pub fn identity(n: usize) -> Self {
        Self { matrix: DMatrix::identity(n, n) }
    }

    /// Expected input length (rows).
    pub fn input_dim(&self) -> usize {
        self.matrix.nrows()
    }

    /// Output length (columns).
    pub fn output_dim(&self) -> usize {
        self.matrix.ncols()
    }

    /// Underlying matrix.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// True for a square identity matrix (no bin mixing).
    pub fn is_identity(&self) -> bool {
        self.matrix.is_square() && self.matrix == DMatrix::identity(self.input_dim(), self.output_dim())
    }

    fn check_input(&self, len: usize) -> Result<()> {
        if len != self.input_dim() {
            return Err(Error::dimension("smearing input vector", self.input_dim(), len));
        }
        Ok(())
    }

    /// `Aᵀ · v`. Negative output is kept as is.
    pub fn apply(&self, v: &[f64]) -> Result<Vec<f64>> {
        self.check_input(v.len())?;
        let out = self.matrix.tr_mul(&DVector::from_column_slice(v));
        Ok(out.iter().copied().collect())
    }

    /// Propagate uncorrelated per-bin errors: `σ'_j = sqrt(Σ_i A_ij² σ_i²)`.
    pub fn apply_errors(&self, sigma: &[f64]) -> Result<Vec<f64>> {
        self.check_input(sigma.len())?;
        let var = DVector::from_iterator(sigma.len(), sigma.iter().map(|s| s * s));
        let out = self.matrix.map(|a| a * a).tr_mul(&var);
        Ok(out.iter().map(|v| v.sqrt()).collect())
    }

    /// `Aᵀ · C · A` for an input-space covariance `C`.
    pub fn transform_covariance(&self, cov: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        if cov.nrows() != self.input_dim() || cov.ncols() != self.input_dim() {
            return Err(Error::dimension("covariance to smear", self.input_dim(), cov.nrows()));
        }
        Ok(self.matrix.tr_mul(cov) * &self.matrix)
    }
}
