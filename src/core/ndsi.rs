use crate::types::{BandImage, GlacioError, GlacioResult, IndexImage};
use ndarray::Zip;

/// NDSI value above which a pixel counts as snow
pub const DEFAULT_SNOW_THRESHOLD: f32 = 0.5;

/// Normalized difference snow index from the green and swir1 bands.
///
/// Landsat products use 0 as the nodata fill, so a pixel with either band
/// at 0 carries no radiometry and maps to -1, the no-snow extreme. For real
/// measurements both bands are positive and the quotient is well defined.
pub fn compute_ndsi(green: &BandImage, swir1: &BandImage) -> GlacioResult<IndexImage> {
    if green.dim() != swir1.dim() {
        return Err(GlacioError::InvalidFormat(format!(
            "NDSI input dimensions differ: green {:?} vs swir1 {:?}",
            green.dim(),
            swir1.dim()
        )));
    }

    let ndsi = Zip::from(green).and(swir1).par_map_collect(|&g, &s| {
        if g == 0 || s == 0 {
            -1.0
        } else {
            let g = g as f32;
            let s = s as f32;
            (g - s) / (g + s)
        }
    });

    Ok(ndsi)
}

/// Fraction of pixels strictly above the snow threshold
pub fn snow_ratio(index: &IndexImage, threshold: f32) -> f64 {
    let total = index.len();
    if total == 0 {
        return 0.0;
    }
    let snow = index.iter().filter(|&&v| v > threshold).count();
    snow as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array;

    #[test]
    fn test_ndsi_values() {
        let green = Array::from_shape_vec((1, 3), vec![200u16, 100, 300]).unwrap();
        let swir1 = Array::from_shape_vec((1, 3), vec![100u16, 200, 300]).unwrap();
        let ndsi = compute_ndsi(&green, &swir1).unwrap();

        // (200-100)/(200+100) = 1/3
        assert_abs_diff_eq!(ndsi[[0, 0]], 1.0 / 3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(ndsi[[0, 1]], -1.0 / 3.0, epsilon = 1e-6);
        assert_abs_diff_eq!(ndsi[[0, 2]], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_nodata_pixels_map_to_minus_one() {
        let green = Array::from_shape_vec((1, 3), vec![0u16, 500, 0]).unwrap();
        let swir1 = Array::from_shape_vec((1, 3), vec![400u16, 0, 0]).unwrap();
        let ndsi = compute_ndsi(&green, &swir1).unwrap();

        assert_eq!(ndsi[[0, 0]], -1.0);
        assert_eq!(ndsi[[0, 1]], -1.0);
        assert_eq!(ndsi[[0, 2]], -1.0);
    }

    #[test]
    fn test_dimension_mismatch_is_an_error() {
        let green = BandImage::zeros((2, 2));
        let swir1 = BandImage::zeros((2, 3));
        assert!(compute_ndsi(&green, &swir1).is_err());
    }

    #[test]
    fn test_snow_ratio() {
        let index =
            Array::from_shape_vec((2, 2), vec![0.9f32, 0.6, 0.2, -1.0]).unwrap();
        assert_abs_diff_eq!(snow_ratio(&index, DEFAULT_SNOW_THRESHOLD), 0.5);
        // the comparison is strict, a pixel exactly at the threshold is not snow
        let boundary = Array::from_shape_vec((1, 2), vec![0.5f32, 0.51]).unwrap();
        assert_abs_diff_eq!(snow_ratio(&boundary, 0.5), 0.5);
    }

    #[test]
    fn test_snow_ratio_of_empty_index() {
        let index = IndexImage::zeros((0, 0));
        assert_eq!(snow_ratio(&index, DEFAULT_SNOW_THRESHOLD), 0.0);
    }
}
