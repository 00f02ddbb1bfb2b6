//! JSON measurement configuration.
//!
//! ```json
//! {
//!   "name": "numu_cc_pmu_cosmu",
//!   "variables": [{"name": "p_mu", "expr": "sqrt(px*px + py*py + pz*pz)"}],
//!   "bins": "bins.txt",
//!   "conversion": {"kind": "scale", "scale_factor": 1e-3},
//!   "smearing": {"rows": 2, "cols": 2, "values": [0.9, 0.1, 0.2, 0.8]},
//!   "data": {"content": [10.0, 20.0], "errors": [3.0, 4.0]},
//!   "likelihood": {"kind": "covariance", "matrix": [9.0, 0.0, 0.0, 16.0]}
//! }
//! ```
//!
//! `bins` is either a path to a bin-definition file (relative paths resolve
//! against the config file's directory) or an inline list of bins.

use std::path::{Path, PathBuf};

use nx_core::{Error, Result};
use nx_hist::GeometrySpec;
use nx_select::{BinDefinitions, OverlapPolicy, VariableSpec};
use serde::{Deserialize, Serialize};

use crate::conversion::ConversionSpec;
use crate::likelihood::{CovarianceChi2, LikelihoodPolicy};
use crate::smearing::SmearingMatrix;

/// Where the bin definitions come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BinSource {
    /// Definition file.
    File(PathBuf),
    /// Inline bins.
    Inline(BinDefinitions),
}

impl BinSource {
    /// Load the definitions, resolving a relative file against `base_dir`.
    pub fn load(&self, base_dir: Option<&Path>) -> Result<BinDefinitions> {
        match self {
            BinSource::Inline(defs) => {
                defs.check()?;
                Ok(defs.clone())
            }
            BinSource::File(path) => match base_dir {
                Some(dir) if path.is_relative() => BinDefinitions::from_path(dir.join(path)),
                _ => BinDefinitions::from_path(path),
            },
        }
    }
}

/// Row-major dense matrix, `rows` = input bins, `cols` = output bins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixSpec {
    /// Input dimension.
    pub rows: usize,
    /// Output dimension.
    pub cols: usize,
    /// Row-major values.
    pub values: Vec<f64>,
}

impl MatrixSpec {
    /// Build the smearing matrix.
    pub fn build(&self) -> Result<SmearingMatrix> {
        SmearingMatrix::from_row_slice(self.rows, self.cols, &self.values)
    }
}

/// Measured values in the output binning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSpec {
    /// Measured content per output bin.
    pub content: Vec<f64>,
    /// Per-bin errors; zero if omitted.
    #[serde(default)]
    pub errors: Option<Vec<f64>>,
}

impl DataSpec {
    /// Errors, zero-filled when absent.
    pub fn errors_or_zero(&self) -> Vec<f64> {
        self.errors.clone().unwrap_or_else(|| vec![0.0; self.content.len()])
    }
}

/// Serializable likelihood choice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LikelihoodSpec {
    /// Independent bins.
    #[default]
    Diagonal,
    /// Full covariance, row-major `n x n`.
    Covariance {
        /// Row-major values.
        matrix: Vec<f64>,
    },
    /// Covariance built from the data errors (no correlations).
    DataErrors,
}

impl LikelihoodSpec {
    /// Build the policy for `n` output bins.
    pub fn build(&self, n: usize, data_errors: &[f64]) -> Result<LikelihoodPolicy> {
        Ok(match self {
            LikelihoodSpec::Diagonal => LikelihoodPolicy::Diagonal,
            LikelihoodSpec::Covariance { matrix } => {
                LikelihoodPolicy::Covariance(CovarianceChi2::from_row_slice(n, matrix)?)
            }
            LikelihoodSpec::DataErrors => {
                LikelihoodPolicy::Covariance(CovarianceChi2::from_errors(data_errors)?)
            }
        })
    }
}

fn default_conversion() -> ConversionSpec {
    ConversionSpec::Identity
}

/// One measurement: selection, conversion, smearing and data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementConfig {
    /// Name given to the raw and predicted histograms.
    pub name: String,
    /// Derived variables, computed in order.
    #[serde(default)]
    pub variables: Vec<VariableSpec>,
    /// Bin definitions.
    pub bins: BinSource,
    /// Weight sharing for events passing several bins.
    #[serde(default)]
    pub overlap: OverlapPolicy,
    /// Base conversion to physical units.
    #[serde(default = "default_conversion")]
    pub conversion: ConversionSpec,
    /// Smearing matrix; identity if omitted.
    #[serde(default)]
    pub smearing: Option<MatrixSpec>,
    /// 2D geometry of the output bins for density normalization.
    #[serde(default)]
    pub density: Option<GeometrySpec>,
    /// Measured data.
    pub data: DataSpec,
    /// Likelihood policy.
    #[serde(default)]
    pub likelihood: LikelihoodSpec,
    /// X axis title of the output histograms.
    #[serde(default)]
    pub x_title: String,
    /// Y axis title of the output histograms.
    #[serde(default)]
    pub y_title: String,
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl MeasurementConfig {
    /// Parse a config from JSON text. Relative bin files resolve against the
    /// working directory.
    ///
    /// Malformed JSON or fields of the wrong shape are [`Error::Config`].
    pub fn from_json_str(text: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(text)
            .map_err(|e| Error::Config(format!("invalid measurement config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read a config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut cfg = Self::from_json_str(&text).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{}: {msg}", path.display())),
            other => other,
        })?;
        cfg.base_dir = path.parent().map(Path::to_path_buf);
        Ok(cfg)
    }

    /// Directory relative bin files resolve against.
    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    /// Shape checks that do not need the bin definitions.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::Config("measurement name is empty".into()));
        }
        if let Some(m) = &self.smearing
            && m.values.len() != m.rows * m.cols
        {
            return Err(Error::dimension("smearing values", m.rows * m.cols, m.values.len()));
        }
        if let Some(errors) = &self.data.errors
            && errors.len() != self.data.content.len()
        {
            return Err(Error::dimension("data errors", self.data.content.len(), errors.len()));
        }
        if matches!(self.likelihood, LikelihoodSpec::Diagonal) {
            let has_errors = self.data.errors.as_ref().is_some_and(|e| e.iter().any(|x| *x != 0.0));
            if !has_errors {
                return Err(Error::Config(format!(
                    "{}: the diagonal likelihood needs non-zero data errors",
                    self.name
                )));
            }
        }
        if let LikelihoodSpec::Covariance { matrix } = &self.likelihood {
            let n = self.data.content.len();
            if matrix.len() != n * n {
                return Err(Error::dimension("covariance values", n * n, matrix.len()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON: &str = r#"{
        "name": "numu",
        "variables": [{"name": "p", "expr": "sqrt(px*px + pz*pz)"}],
        "bins": [{"cuts": [{"variable": "p", "op": "<", "threshold": 1.0}]},
                 {"cuts": [{"variable": "p", "op": ">=", "threshold": 1.0}]}],
        "overlap": "first_match",
        "smearing": {"rows": 2, "cols": 2, "values": [0.9, 0.1, 0.2, 0.8]},
        "data": {"content": [1.0, 2.0], "errors": [1.0, 1.0]},
        "likelihood": {"kind": "covariance", "matrix": [1.0, 0.0, 0.0, 1.0]}
    }"#;

    #[test]
    fn parse_inline() {
        let cfg = MeasurementConfig::from_json_str(JSON).unwrap();
        assert_eq!(cfg.overlap, OverlapPolicy::FirstMatch);
        assert_eq!(cfg.conversion, ConversionSpec::Identity);
        assert_eq!(cfg.bins.load(None).unwrap().n_bins(), 2);
        assert_eq!(cfg.smearing.as_ref().unwrap().build().unwrap().input_dim(), 2);
        assert!(cfg.base_dir().is_none());
    }

    #[test]
    fn shape_errors() {
        let bad = JSON.replace("[0.9, 0.1, 0.2, 0.8]", "[0.9, 0.1, 0.2]");
        assert!(MeasurementConfig::from_json_str(&bad).unwrap_err().is_dimension());
        let bad = JSON.replace(r#""errors": [1.0, 1.0]"#, r#""errors": [1.0]"#);
        assert!(MeasurementConfig::from_json_str(&bad).unwrap_err().is_dimension());
    }

    #[test]
    fn diagonal_likelihood_requires_data_errors() {
        let missing = r#"{"name": "m", "bins": [{"cuts": [{"variable": "x", "op": "<", "threshold": 1.0}]}],
                          "data": {"content": [1000.0]}}"#;
        let err = MeasurementConfig::from_json_str(missing).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("non-zero data errors"), "{err}");

        let zeros = missing.replace(r#"[1000.0]}"#, r#"[1000.0], "errors": [0.0]}"#);
        assert!(MeasurementConfig::from_json_str(&zeros).unwrap_err().is_config());

        let with_errors = missing.replace(r#"[1000.0]}"#, r#"[1000.0], "errors": [30.0]}"#);
        assert!(MeasurementConfig::from_json_str(&with_errors).is_ok());
    }

    #[test]
    fn error_kinds_survive_loading_from_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.json");

        let bad_shape = JSON.replace("[0.9, 0.1, 0.2, 0.8]", "[0.9, 0.1, 0.2]");
        std::fs::write(&path, bad_shape).unwrap();
        assert!(MeasurementConfig::from_path(&path).unwrap_err().is_dimension());

        let bad_bins = JSON.replace(r#""op": "<""#, r#""op": "=>""#);
        assert!(MeasurementConfig::from_json_str(&bad_bins).unwrap_err().is_config());
        std::fs::write(&path, bad_bins).unwrap();
        let err = MeasurementConfig::from_path(&path).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("m.json"), "{err}");
    }

    #[test]
    fn relative_bin_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bins.txt"), "0 p < 1\n1 p >= 1\n").unwrap();
        let json = r#"{"name": "m", "bins": "bins.txt", "data": {"content": [0.0, 0.0], "errors": [1.0, 1.0]}}"#;
        let cfg_path = dir.path().join("m.json");
        std::fs::write(&cfg_path, json).unwrap();

        let cfg = MeasurementConfig::from_path(&cfg_path).unwrap();
        assert_eq!(cfg.bins, BinSource::File(PathBuf::from("bins.txt")));
        let defs = cfg.bins.load(cfg.base_dir()).unwrap();
        assert_eq!(defs.n_bins(), 2);
        assert_eq!(cfg.data.errors_or_zero(), vec![1.0, 1.0]);
        assert!(matches!(cfg.likelihood, LikelihoodSpec::Diagonal));
    }
}
