//! RGBA to single-channel intensity conversion with box-filter decimation.

use image::RgbaImage;
use ndarray::{Array2, Zip};

use crate::error::{Result, StereoError};

const LUMA_R: f32 = 0.2126;
const LUMA_G: f32 = 0.7152;
const LUMA_B: f32 = 0.0722;

/// Shrinks `img` by `factor` in both dimensions, averaging every
/// `factor`x`factor` block and converting it to luma. Alpha is discarded.
///
/// Trailing rows/columns that do not fill a whole block are dropped.
pub fn downscale_gray(img: &RgbaImage, factor: u32) -> Result<Array2<f32>> {
    let (w, h) = img.dimensions();
    if factor == 0 {
        return Err(StereoError::InvalidInput(
            "downscale factor must be at least 1".to_string(),
        ));
    }
    if w < factor || h < factor {
        return Err(StereoError::InvalidInput(format!(
            "image {}x{} is smaller than the downscale factor {}",
            w, h, factor
        )));
    }
    let out_w = (w / factor) as usize;
    let out_h = (h / factor) as usize;
    let s = factor as usize;
    let area = (s * s) as f64;
    let raw: &[u8] = img.as_raw();
    let stride = w as usize * 4;

    let mut gray = Array2::<f32>::zeros((out_h, out_w));
    Zip::indexed(&mut gray).par_for_each(|(y, x), val| {
        let block = (y * s..(y + 1) * s).flat_map(move |sy| {
            let row = &raw[sy * stride..(sy + 1) * stride];
            row[x * s * 4..(x + 1) * s * 4].chunks_exact(4)
        });
        let [r, g, b] = sum_rgb(block);
        *val = ((LUMA_R as f64 * r as f64 + LUMA_G as f64 * g as f64 + LUMA_B as f64 * b as f64)
            / area) as f32;
    });
    Ok(gray)
}

/// Per-channel RGB totals over a block of RGBA pixels. A block holds up to
/// `factor²` pixels, which outgrows `u32` sums for large factors.
fn sum_rgb<'a>(pixels: impl Iterator<Item = &'a [u8]>) -> [u64; 3] {
    pixels.fold([0u64; 3], |mut acc, px| {
        acc[0] += px[0] as u64;
        acc[1] += px[1] as u64;
        acc[2] += px[2] as u64;
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn output_has_floored_dimensions() {
        let img = RgbaImage::from_pixel(18, 9, Rgba([10, 10, 10, 255]));
        let gray = downscale_gray(&img, 4).unwrap();
        assert_eq!(gray.dim(), (2, 4));
    }

    #[test]
    fn blocks_are_averaged_and_alpha_ignored() {
        let mut img = RgbaImage::from_pixel(4, 2, Rgba([0, 0, 0, 0]));
        // left 2x2 block: two white pixels, two black ones
        img.put_pixel(0, 0, Rgba([200, 200, 200, 17]));
        img.put_pixel(1, 1, Rgba([200, 200, 200, 255]));
        // right block: pure red
        for y in 0..2 {
            for x in 2..4 {
                img.put_pixel(x, y, Rgba([100, 0, 0, 3]));
            }
        }
        let gray = downscale_gray(&img, 2).unwrap();
        assert_eq!(gray.dim(), (1, 2));
        assert!((gray[(0, 0)] - 100.0).abs() < 1e-3);
        assert!((gray[(0, 1)] - 100.0 * LUMA_R).abs() < 1e-3);
    }

    #[test]
    fn factor_one_keeps_gray_levels() {
        let img = RgbaImage::from_fn(5, 3, |x, y| {
            let v = (x * 40 + y) as u8;
            Rgba([v, v, v, 255])
        });
        let gray = downscale_gray(&img, 1).unwrap();
        assert_eq!(gray.dim(), (3, 5));
        assert!((gray[(2, 4)] - 162.0).abs() < 1e-3);
    }

    #[test]
    fn large_blocks_do_not_overflow() {
        // a white 4105x4105 block sums past u32::MAX in every channel
        let side = 4105u64;
        let white = [255u8, 255, 255, 255];
        let block = std::iter::repeat(&white[..]).take((side * side) as usize);
        assert_eq!(sum_rgb(block), [255 * side * side; 3]);
    }

    #[test]
    fn image_smaller_than_factor_is_invalid() {
        let img = RgbaImage::new(3, 8);
        assert!(matches!(
            downscale_gray(&img, 4),
            Err(StereoError::InvalidInput(_))
        ));
    }
}
