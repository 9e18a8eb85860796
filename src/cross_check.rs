//! Left-right consistency check.

use ndarray::{Array2, Zip};

use crate::disparity::DisparityMap;
use crate::error::{Result, StereoError};

/// Keeps a left-referenced disparity `d` at `(x, y)` only if the
/// right-referenced map agrees at the pixel it points to:
/// `|d - right(x - d, y)| <= threshold`. Everything else becomes invalid.
pub fn cross_check(
    left: &DisparityMap,
    right: &DisparityMap,
    threshold: u32,
) -> Result<DisparityMap> {
    if left.width() != right.width() || left.height() != right.height() {
        return Err(StereoError::InvalidInput(format!(
            "cannot cross check a {}x{} map against a {}x{} map",
            left.width(),
            left.height(),
            right.width(),
            right.height()
        )));
    }
    let mut out = Array2::<Option<u32>>::from_elem((left.height(), left.width()), None);
    Zip::indexed(&mut out)
        .and(left.as_array())
        .par_for_each(|(y, x), checked, &dl| {
            *checked = dl.filter(|&d| {
                let Some(xr) = x.checked_sub(d as usize) else {
                    return false;
                };
                matches!(right.get(xr, y), Some(dr) if d.abs_diff(dr) <= threshold)
            });
        });
    Ok(DisparityMap::from_array(out))
}
