//! Geometry of a flattened 2D binning.
//!
//! Differential measurements in two variables are usually published as a
//! single flattened bin index: for each y-slice (e.g. a muon-angle range) a
//! list of x-bins (e.g. muon-momentum ranges), with slice-dependent x edges.
//! [`BinGeometry2D`] records the rectangle covered by every flattened bin so
//! densities can be formed without knowing how the flattening was done.

use nx_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Rectangle covered by one flattened bin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cell2D {
    /// Lower x edge.
    pub x_lo: f64,
    /// Upper x edge.
    pub x_hi: f64,
    /// Lower y edge.
    pub y_lo: f64,
    /// Upper y edge.
    pub y_hi: f64,
}

impl Cell2D {
    /// Width along x.
    pub fn width_x(&self) -> f64 {
        self.x_hi - self.x_lo
    }

    /// Width along y.
    pub fn width_y(&self) -> f64 {
        self.y_hi - self.y_lo
    }

    /// `width_x * width_y`.
    pub fn area(&self) -> f64 {
        self.width_x() * self.width_y()
    }
}

/// One y-slice with its own x binning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YSlice {
    /// Lower y edge.
    pub y_lo: f64,
    /// Upper y edge.
    pub y_hi: f64,
    /// x edges inside this slice (length = number of x bins + 1).
    pub x_edges: Vec<f64>,
}

/// Serializable description of a [`BinGeometry2D`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeometrySpec {
    /// Regular grid, x index fastest.
    Grid {
        /// x edges.
        x_edges: Vec<f64>,
        /// y edges.
        y_edges: Vec<f64>,
    },
    /// Irregular binning: consecutive y-slices, each with its own x edges.
    Slices {
        /// Slices in flattening order.
        slices: Vec<YSlice>,
    },
    /// Explicit cell list.
    Cells {
        /// Cells in flattening order.
        cells: Vec<Cell2D>,
    },
}

impl GeometrySpec {
    /// Build the described geometry.
    pub fn build(&self) -> BinGeometry2D {
        match self {
            GeometrySpec::Grid { x_edges, y_edges } => BinGeometry2D::from_grid(x_edges, y_edges),
            GeometrySpec::Slices { slices } => BinGeometry2D::from_slices(slices),
            GeometrySpec::Cells { cells } => BinGeometry2D::from_cells(cells.clone()),
        }
    }
}

/// Per-bin rectangles of a flattened 2D binning.
#[derive(Debug, Clone, PartialEq)]
pub struct BinGeometry2D {
    cells: Vec<Cell2D>,
    grid: Option<(Vec<f64>, Vec<f64>)>,
}

impl BinGeometry2D {
    /// Regular grid; flattened index = `iy * nx + ix`.
    pub fn from_grid(x_edges: &[f64], y_edges: &[f64]) -> Self {
        let mut cells = Vec::new();
        for y in y_edges.windows(2) {
            for x in x_edges.windows(2) {
                cells.push(Cell2D { x_lo: x[0], x_hi: x[1], y_lo: y[0], y_hi: y[1] });
            }
        }
        Self { cells, grid: Some((x_edges.to_vec(), y_edges.to_vec())) }
    }

    /// Slice-wise binning; flattened index runs over x bins of slice 0, then slice 1, ...
    pub fn from_slices(slices: &[YSlice]) -> Self {
        let cells = slices
            .iter()
            .flat_map(|s| {
                s.x_edges.windows(2).map(move |x| Cell2D {
                    x_lo: x[0],
                    x_hi: x[1],
                    y_lo: s.y_lo,
                    y_hi: s.y_hi,
                })
            })
            .collect();
        Self { cells, grid: None }
    }

    /// Explicit cells in flattening order.
    pub fn from_cells(cells: Vec<Cell2D>) -> Self {
        Self { cells, grid: None }
    }

    /// Number of flattened bins.
    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    /// All cells in flattening order.
    pub fn cells(&self) -> &[Cell2D] {
        &self.cells
    }

    /// `(x_edges, y_edges)` when built from a regular grid.
    pub fn grid(&self) -> Option<(&[f64], &[f64])> {
        self.grid.as_ref().map(|(x, y)| (x.as_slice(), y.as_slice()))
    }

    /// Area of every cell. Fails on a zero, negative or non-finite width.
    pub fn areas(&self) -> Result<Vec<f64>> {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let (wx, wy) = (c.width_x(), c.width_y());
                if !(wx.is_finite() && wy.is_finite() && wx > 0.0 && wy > 0.0) {
                    return Err(Error::Config(format!(
                        "2D bin {i} has non-positive width (x: {wx}, y: {wy})"
                    )));
                }
                Ok(wx * wy)
            })
            .collect()
    }
}
