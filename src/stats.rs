//! Windowed mean and standard deviation of an intensity grid.
//!
//! Both statistics are read from summed-area tables of `I` and `I^2`, so the
//! cost per pixel does not depend on the window size. Windows touching the
//! grid border are clamped to the grid (out-of-range cells are excluded and
//! the pixel count shrinks accordingly).

use ndarray::{Array2, Zip};

/// Per-pixel window statistics of one image.
#[derive(Debug, Clone)]
pub struct WindowStats {
    pub mean: Array2<f32>,
    pub std_dev: Array2<f32>,
}

/// Inclusive range of indices covered by a window of half-size `half`
/// centered on `center`, intersected with `0..len`.
pub(crate) fn clamped_range(center: usize, half: usize, len: usize) -> (usize, usize) {
    (center.saturating_sub(half), (center + half).min(len - 1))
}

struct SummedArea {
    sum: Array2<f64>,
    sum_sq: Array2<f64>,
}

impl SummedArea {
    fn new(img: &Array2<f32>) -> Self {
        let (h, w) = img.dim();
        let mut sum = Array2::<f64>::zeros((h + 1, w + 1));
        let mut sum_sq = Array2::<f64>::zeros((h + 1, w + 1));
        for y in 0..h {
            let mut row_sum = 0.0f64;
            let mut row_sum_sq = 0.0f64;
            for x in 0..w {
                let v = img[(y, x)] as f64;
                row_sum += v;
                row_sum_sq += v * v;
                sum[(y + 1, x + 1)] = sum[(y, x + 1)] + row_sum;
                sum_sq[(y + 1, x + 1)] = sum_sq[(y, x + 1)] + row_sum_sq;
            }
        }
        SummedArea { sum, sum_sq }
    }

    /// Sum and sum of squares over rows `y0..=y1`, columns `x0..=x1`.
    fn rect(&self, y0: usize, y1: usize, x0: usize, x1: usize) -> (f64, f64) {
        let area = |t: &Array2<f64>| {
            t[(y1 + 1, x1 + 1)] - t[(y0, x1 + 1)] - t[(y1 + 1, x0)] + t[(y0, x0)]
        };
        (area(&self.sum), area(&self.sum_sq))
    }
}

/// Computes mean and standard deviation over the clamped `window_size`
/// square around every pixel of `img`.
///
/// A perfectly flat window yields a standard deviation of zero.
pub fn window_stats(img: &Array2<f32>, window_size: usize) -> WindowStats {
    let (h, w) = img.dim();
    let half = window_size / 2;
    let mut mean = Array2::<f32>::zeros((h, w));
    let mut std_dev = Array2::<f32>::zeros((h, w));
    if h == 0 || w == 0 {
        return WindowStats { mean, std_dev };
    }
    let table = SummedArea::new(img);

    Zip::indexed(&mut mean)
        .and(&mut std_dev)
        .par_for_each(|(y, x), m, s| {
            let (y0, y1) = clamped_range(y, half, h);
            let (x0, x1) = clamped_range(x, half, w);
            let n = ((y1 - y0 + 1) * (x1 - x0 + 1)) as f64;
            let (sum, sum_sq) = table.rect(y0, y1, x0, x1);
            let mu = sum / n;
            let var = (sum_sq / n - mu * mu).max(0.0);
            *m = mu as f32;
            *s = var.sqrt() as f32;
        });

    WindowStats { mean, std_dev }
}
