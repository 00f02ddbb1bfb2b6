//! Bin-width normalization for flattened 2D binnings.

use log::debug;
use nx_core::{Error, Result};

use crate::geometry::BinGeometry2D;
use crate::histogram::Histogram;

/// Divide each in-range bin's content and error by the area of its 2D cell.
///
/// Under/overflow are left untouched. The geometry is checked before any bin
/// is modified, so on error the histogram is unchanged.
pub fn bin_width_norm_2d(hist: &mut Histogram, geometry: &BinGeometry2D) -> Result<()> {
    if geometry.n_cells() != hist.n_bins {
        return Err(Error::dimension(
            format!("2D geometry for '{}'", hist.name),
            hist.n_bins,
            geometry.n_cells(),
        ));
    }
    let areas = geometry.areas()?;
    for (i, area) in areas.iter().enumerate() {
        hist.bin_content[i + 1] /= area;
        hist.bin_error[i + 1] /= area;
    }
    debug!("normalized '{}' by 2D bin area ({} bins)", hist.name, areas.len());
    Ok(())
}
