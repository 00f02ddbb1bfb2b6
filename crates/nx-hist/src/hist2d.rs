//! Regular 2D view of a flattened histogram.

use nx_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::geometry::BinGeometry2D;
use crate::histogram::Histogram;

/// 2D histogram on a regular grid (no flow bins).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram2D {
    /// Histogram name.
    pub name: String,
    /// Histogram title.
    pub title: String,
    /// x edges.
    pub x_edges: Vec<f64>,
    /// y edges.
    pub y_edges: Vec<f64>,
    /// Contents, `iy * nx + ix`.
    pub content: Vec<f64>,
    /// Errors, same layout as `content`.
    pub error: Vec<f64>,
}

impl Histogram2D {
    /// Unflatten `hist` using a grid geometry.
    pub fn from_flat(hist: &Histogram, geometry: &BinGeometry2D) -> Result<Self> {
        let Some((x_edges, y_edges)) = geometry.grid() else {
            return Err(Error::Config(format!(
                "cannot unflatten '{}': geometry is not a regular grid",
                hist.name
            )));
        };
        if geometry.n_cells() != hist.n_bins {
            return Err(Error::dimension(
                format!("unflatten '{}'", hist.name),
                geometry.n_cells(),
                hist.n_bins,
            ));
        }
        Ok(Self {
            name: format!("{}_2D", hist.name),
            title: hist.title.clone(),
            x_edges: x_edges.to_vec(),
            y_edges: y_edges.to_vec(),
            content: hist.contents().to_vec(),
            error: hist.errors().to_vec(),
        })
    }

    /// Number of x bins.
    pub fn nx(&self) -> usize {
        self.x_edges.len().saturating_sub(1)
    }

    /// Number of y bins.
    pub fn ny(&self) -> usize {
        self.y_edges.len().saturating_sub(1)
    }

    /// Content of cell `(ix, iy)`.
    pub fn content(&self, ix: usize, iy: usize) -> f64 {
        self.content[iy * self.nx() + ix]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unflatten_grid() {
        let mut h = Histogram::indexed("pred", 6).unwrap();
        h.set_contents(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[0.0; 6]).unwrap();
        let g = BinGeometry2D::from_grid(&[0.0, 1.0, 2.0, 3.0], &[0.0, 1.0, 2.0]);
        let h2 = Histogram2D::from_flat(&h, &g).unwrap();
        assert_eq!((h2.nx(), h2.ny()), (3, 2));
        assert_eq!(h2.content(0, 1), 4.0);
        assert_eq!(h2.name, "pred_2D");
    }

    #[test]
    fn unflatten_requires_grid() {
        let h = Histogram::indexed("pred", 1).unwrap();
        let g = BinGeometry2D::from_slices(&[crate::geometry::YSlice {
            y_lo: 0.0,
            y_hi: 1.0,
            x_edges: vec![0.0, 1.0],
        }]);
        assert!(Histogram2D::from_flat(&h, &g).unwrap_err().is_config());
    }
}
