//! Occlusion filling along image rows.

use ndarray::{Array2, Zip};

use crate::disparity::DisparityMap;

/// Closest valid disparity on row `y` within `max_offset` columns of `x`.
/// Equidistant candidates on both sides resolve to the smaller disparity,
/// i.e. the background.
fn nearest_valid(map: &DisparityMap, x: usize, y: usize, max_offset: usize) -> Option<u32> {
    let w = map.width();
    for dist in 1..=max_offset {
        let left = x.checked_sub(dist).and_then(|xl| map.get(xl, y));
        let right = (x + dist < w).then(|| map.get(x + dist, y)).flatten();
        match (left, right) {
            (Some(l), Some(r)) => return Some(l.min(r)),
            (Some(v), None) | (None, Some(v)) => return Some(v),
            (None, None) => {
                if dist > x && x + dist >= w {
                    break;
                }
            }
        }
    }
    None
}

/// Replaces every invalid pixel with the nearest valid disparity on its row,
/// searching at most `max_offset` columns away. Only values present in the
/// input map are copied, so fills never chain. Pixels with no valid
/// neighbour in range stay invalid.
pub fn fill_occlusions(map: &DisparityMap, max_offset: usize) -> DisparityMap {
    let mut out = Array2::<Option<u32>>::from_elem((map.height(), map.width()), None);
    Zip::indexed(&mut out)
        .and(map.as_array())
        .par_for_each(|(y, x), filled, &d| {
            *filled = d.or_else(|| nearest_valid(map, x, y, max_offset));
        });
    DisparityMap::from_array(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(vals: &[Option<u32>]) -> DisparityMap {
        DisparityMap::from_array(Array2::from_shape_vec((1, vals.len()), vals.to_vec()).unwrap())
    }

    #[test]
    fn copies_nearest_valid_neighbour() {
        let map = row(&[Some(5), None, None, None, Some(9)]);
        let filled = fill_occlusions(&map, 10);
        assert_eq!(filled, row(&[Some(5), Some(5), Some(5), Some(9), Some(9)]));
    }

    #[test]
    fn equidistant_tie_prefers_smaller_disparity() {
        let map = row(&[Some(9), None, Some(4), None, Some(2)]);
        let filled = fill_occlusions(&map, 3);
        assert_eq!(filled, row(&[Some(9), Some(4), Some(4), Some(2), Some(2)]));
    }

    #[test]
    fn pixels_out_of_reach_stay_invalid() {
        let map = row(&[Some(3), None, None, None, None, None]);
        let filled = fill_occlusions(&map, 2);
        assert_eq!(filled, row(&[Some(3), Some(3), Some(3), None, None, None]));
        assert_eq!(filled.to_luma().as_raw(), &vec![3u8, 3, 3, 0, 0, 0]);
    }

    #[test]
    fn fully_invalid_row_is_left_alone() {
        let map = DisparityMap::new(8, 3);
        let filled = fill_occlusions(&map, 50);
        assert_eq!(filled.invalid_count(), 24);
    }

    #[test]
    fn fill_stays_within_radius_and_row() {
        let (h, w, radius) = (5, 40, 4);
        let data = Array2::from_shape_fn((h, w), |(y, x)| {
            ((x * 11 + y * 5) % 9 < 2).then_some((x % 7) as u32)
        });
        let map = DisparityMap::from_array(data);
        let filled = fill_occlusions(&map, radius);
        for y in 0..h {
            for x in 0..w {
                match (map.get(x, y), filled.get(x, y)) {
                    (Some(before), after) => assert_eq!(after, Some(before)),
                    (None, Some(v)) => {
                        let lo = x.saturating_sub(radius);
                        let hi = (x + radius).min(w - 1);
                        assert!(
                            (lo..=hi).any(|xs| map.get(xs, y) == Some(v)),
                            "value {v} at {x},{y} not copied from within radius"
                        );
                    }
                    (None, None) => {
                        let lo = x.saturating_sub(radius);
                        let hi = (x + radius).min(w - 1);
                        assert!((lo..=hi).all(|xs| map.get(xs, y).is_none()));
                    }
                }
            }
        }
    }
}
