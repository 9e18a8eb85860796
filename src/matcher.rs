//! Winner-takes-all disparity search scored by zero-mean normalized
//! cross-correlation (ZNCC).

use ndarray::{Array2, Zip};

use crate::disparity::DisparityMap;
use crate::error::{Result, StereoError};
use crate::stats::{clamped_range, window_stats, WindowStats};

/// Windows with a standard deviation at or below this are treated as flat;
/// their correlation is undefined and the candidate is never selected.
pub const MIN_STD_DEV: f32 = 1e-3;

/// Which way the target column moves as the disparity grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDirection {
    /// `x' = x - d`: left image as reference, searching the right image.
    Negative,
    /// `x' = x + d`: right image as reference, searching the left image.
    Positive,
}

impl SearchDirection {
    pub fn inverted(self) -> Self {
        match self {
            SearchDirection::Negative => SearchDirection::Positive,
            SearchDirection::Positive => SearchDirection::Negative,
        }
    }

    /// Column in the target grid for reference column `x` at disparity `d`,
    /// or `None` when it falls off a grid of `width` columns.
    pub fn target_column(self, x: usize, d: usize, width: usize) -> Option<usize> {
        let xt = match self {
            SearchDirection::Negative => x.checked_sub(d)?,
            SearchDirection::Positive => x + d,
        };
        (xt < width).then_some(xt)
    }
}

/// An intensity grid together with its precomputed window statistics.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub intensity: Array2<f32>,
    pub stats: WindowStats,
}

impl PreparedImage {
    pub fn new(intensity: Array2<f32>, window_size: usize) -> Self {
        let stats = window_stats(&intensity, window_size);
        PreparedImage { intensity, stats }
    }

    pub fn from_parts(intensity: Array2<f32>, stats: WindowStats) -> Self {
        PreparedImage { intensity, stats }
    }

    pub fn width(&self) -> usize {
        self.intensity.ncols()
    }

    pub fn height(&self) -> usize {
        self.intensity.nrows()
    }
}

/// ZNCC between the window around `(x, y)` in `reference` and the window
/// around `(xt, y)` in `target`, over rows `y0..=y1` and `half` columns
/// either side. Both windows must lie inside their grids horizontally.
fn zncc_score(
    reference: &PreparedImage,
    target: &PreparedImage,
    (x, xt): (usize, usize),
    (y, y0, y1): (usize, usize, usize),
    half: usize,
    ref_norm: (f32, f32),
) -> Option<f32> {
    let (mean_r, sd_r) = ref_norm;
    let sd_t = target.stats.std_dev[(y, xt)];
    if sd_t <= MIN_STD_DEV {
        return None;
    }
    let mean_t = target.stats.mean[(y, xt)];
    let mut acc = 0.0f32;
    for yy in y0..=y1 {
        let row_r = reference.intensity.row(yy);
        let row_t = target.intensity.row(yy);
        for i in 0..=2 * half {
            acc += (row_r[x - half + i] - mean_r) * (row_t[xt - half + i] - mean_t);
        }
    }
    let n = ((y1 - y0 + 1) * (2 * half + 1)) as f32;
    Some(acc / (n * sd_r * sd_t))
}

/// Searches disparities `0..=max_disparity` for every reference pixel and
/// keeps the best-scoring one; ties go to the smaller disparity.
///
/// Both the reference and every target window must lie fully inside their
/// grids horizontally (rows are clamped identically on both sides). A pixel
/// whose search range is cut short by the grid edge is left invalid rather
/// than matched against the candidates that remain. Flat target windows are
/// skipped, and pixels without any scored candidate are left invalid.
pub fn match_disparity(
    reference: &PreparedImage,
    target: &PreparedImage,
    direction: SearchDirection,
    max_disparity: u32,
    window_size: usize,
) -> Result<DisparityMap> {
    let (h, w) = reference.intensity.dim();
    if target.intensity.dim() != (h, w) {
        return Err(StereoError::InvalidInput(format!(
            "reference grid {}x{} and target grid {}x{} differ",
            w,
            h,
            target.width(),
            target.height()
        )));
    }
    let half = window_size / 2;
    let max_d = max_disparity as usize;

    let mut out = Array2::<Option<u32>>::from_elem((h, w), None);
    if h == 0 || w == 0 {
        return Ok(DisparityMap::from_array(out));
    }
    let inside = |xt: Option<usize>| matches!(xt, Some(xt) if xt >= half && xt + half < w);
    Zip::indexed(&mut out).par_for_each(|(y, x), disp| {
        // target columns move monotonically with d, so checking both ends
        // covers the whole range
        if !inside(Some(x)) || !inside(direction.target_column(x, max_d, w)) {
            return;
        }
        let sd_r = reference.stats.std_dev[(y, x)];
        if sd_r <= MIN_STD_DEV {
            return;
        }
        let ref_norm = (reference.stats.mean[(y, x)], sd_r);
        let (y0, y1) = clamped_range(y, half, h);

        let mut best_score = f32::NEG_INFINITY;
        for d in 0..=max_d {
            let Some(xt) = direction.target_column(x, d, w) else {
                continue;
            };
            let score = zncc_score(reference, target, (x, xt), (y, y0, y1), half, ref_norm);
            if let Some(score) = score {
                if score > best_score {
                    best_score = score;
                    *disp = Some(d as u32);
                }
            }
        }
    });
    Ok(DisparityMap::from_array(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texture(x: usize, y: usize) -> f32 {
        let mut h =
            (x as u32).wrapping_mul(374_761_393) ^ (y as u32).wrapping_mul(668_265_263);
        h = (h ^ (h >> 13)).wrapping_mul(1_274_126_177);
        (h >> 24) as f32
    }

    /// Right view of a scene whose left view is `texture`, shifted by `k`.
    fn shifted_pair(w: usize, h: usize, k: usize) -> (Array2<f32>, Array2<f32>) {
        let left = Array2::from_shape_fn((h, w), |(y, x)| texture(x + 16, y));
        let right = Array2::from_shape_fn((h, w), |(y, x)| texture(x + 16 + k, y));
        (left, right)
    }

    #[test]
    fn target_column_respects_grid() {
        assert_eq!(SearchDirection::Negative.target_column(5, 3, 10), Some(2));
        assert_eq!(SearchDirection::Negative.target_column(2, 3, 10), None);
        assert_eq!(SearchDirection::Positive.target_column(5, 3, 10), Some(8));
        assert_eq!(SearchDirection::Positive.target_column(8, 3, 10), None);
        assert_eq!(
            SearchDirection::Negative.inverted(),
            SearchDirection::Positive
        );
    }

    #[test]
    fn recovers_known_shift() {
        let (w, h, k, window, max_d) = (48, 24, 5, 7, 10);
        let (left, right) = shifted_pair(w, h, k);
        let left = PreparedImage::new(left, window);
        let right = PreparedImage::new(right, window);
        let map =
            match_disparity(&left, &right, SearchDirection::Negative, max_d, window).unwrap();
        let half = window / 2;
        for y in 0..h {
            for x in (half + max_d as usize)..(w - half) {
                assert_eq!(map.get(x, y), Some(k as u32), "pixel {x},{y}");
            }
        }
    }

    #[test]
    fn inverted_direction_recovers_shift_from_right_view() {
        let (w, h, k, window, max_d) = (48, 16, 4, 5, 8);
        let (left, right) = shifted_pair(w, h, k);
        let left = PreparedImage::new(left, window);
        let right = PreparedImage::new(right, window);
        let map =
            match_disparity(&right, &left, SearchDirection::Positive, max_d, window).unwrap();
        let half = window / 2;
        for y in 0..h {
            for x in half..(w - half - max_d as usize) {
                assert_eq!(map.get(x, y), Some(k as u32), "pixel {x},{y}");
            }
        }
    }

    #[test]
    fn border_columns_stay_invalid() {
        let (left, right) = shifted_pair(20, 6, 0);
        let window = 5;
        let map = match_disparity(
            &PreparedImage::new(left, window),
            &PreparedImage::new(right, window),
            SearchDirection::Negative,
            0,
            window,
        )
        .unwrap();
        for y in 0..6 {
            assert_eq!(map.get(0, y), None);
            assert_eq!(map.get(1, y), None);
            assert_eq!(map.get(18, y), None);
            assert_eq!(map.get(19, y), None);
            assert_eq!(map.get(2, y), Some(0));
        }
    }

    #[test]
    fn flat_candidates_are_never_selected() {
        let (w, h, window) = (40, 12, 5);
        let half = window / 2;
        let reference = Array2::from_shape_fn((h, w), |(y, x)| texture(x, y));
        // target is flat on its left half and textured on its right half
        let target = Array2::from_shape_fn((h, w), |(y, x)| {
            if x < 20 {
                80.0
            } else {
                texture(x, y)
            }
        });
        let reference = PreparedImage::new(reference, window);
        let target = PreparedImage::new(target, window);
        let map =
            match_disparity(&reference, &target, SearchDirection::Negative, 12, window).unwrap();
        for y in 0..h {
            for x in 0..w {
                if let Some(d) = map.get(x, y) {
                    let xt = x - d as usize;
                    assert!(
                        target.stats.std_dev[(y, xt)] > MIN_STD_DEV,
                        "flat window chosen at {x},{y} (d={d})"
                    );
                    assert!(xt >= half);
                }
            }
        }
        // pixels that can only reach flat target windows are invalid
        assert_eq!(map.get(14, 3), None);
    }

    #[test]
    fn truncated_search_range_is_invalid() {
        let (w, h, k, window, max_d) = (30, 6, 2, 5, 6);
        let (left, right) = shifted_pair(w, h, k);
        let left = PreparedImage::new(left, window);
        let right = PreparedImage::new(right, window);
        let half = window / 2;

        let map =
            match_disparity(&left, &right, SearchDirection::Negative, max_d, window).unwrap();
        for y in 0..h {
            // the true match at d = k is reachable here, but d = max_d is not
            for x in 0..(half + max_d as usize) {
                assert_eq!(map.get(x, y), None, "pixel {x},{y}");
            }
            for x in (half + max_d as usize)..(w - half) {
                assert_eq!(map.get(x, y), Some(k as u32), "pixel {x},{y}");
            }
        }

        let map =
            match_disparity(&right, &left, SearchDirection::Positive, max_d, window).unwrap();
        for y in 0..h {
            for x in (w - half - max_d as usize)..w {
                assert_eq!(map.get(x, y), None, "pixel {x},{y}");
            }
            assert_eq!(map.get(w - half - max_d as usize - 1, y), Some(k as u32));
        }
    }

    #[test]
    fn flat_reference_is_invalid_without_error() {
        let flat = PreparedImage::new(Array2::from_elem((10, 10), 3.0), 3);
        let map = match_disparity(&flat, &flat, SearchDirection::Negative, 4, 3).unwrap();
        assert_eq!(map.invalid_count(), 100);
    }

    #[test]
    fn ties_prefer_smaller_disparity() {
        // a row pattern with period 4 matches equally well at d = 0, 4, 8
        let img = Array2::from_shape_fn((9, 30), |(_, x)| [10.0, 50.0, 90.0, 20.0][x % 4]);
        let img = PreparedImage::new(img, 3);
        let map = match_disparity(&img, &img, SearchDirection::Negative, 8, 3).unwrap();
        assert_eq!(map.get(15, 4), Some(0));
        assert_eq!(map.get(12, 4), Some(0));
    }

    #[test]
    fn mismatched_grids_are_rejected() {
        let a = PreparedImage::new(Array2::zeros((4, 5)), 3);
        let b = PreparedImage::new(Array2::zeros((4, 6)), 3);
        assert!(matches!(
            match_disparity(&a, &b, SearchDirection::Negative, 1, 3),
            Err(StereoError::InvalidInput(_))
        ));
    }
}
