use crate::types::{GlacioError, GlacioResult, GrayImage};
use ndarray::ArrayView2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// 256-bit binary descriptor packed into 32 bytes
pub type Descriptor = [u8; 32];

/// Parameters for grid-constrained feature extraction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureParams {
    /// Total keypoint budget for the whole image, shared evenly by the grid
    pub total_features: usize,
    /// Number of grid rows the image is divided into
    pub grid_rows: usize,
    /// Number of grid columns the image is divided into
    pub grid_cols: usize,
    /// Minimum intensity step for the segment test
    pub fast_threshold: u8,
    /// Minimum pixel distance kept between detected corners
    pub suppression_radius: f32,
}

impl Default for FeatureParams {
    fn default() -> Self {
        Self {
            total_features: 5000,   // Keypoint budget across the scene
            grid_rows: 8,           // 8x8 grid spreads detections spatially
            grid_cols: 8,
            fast_threshold: 20,     // Intensity step on the 8-bit scale
            suppression_radius: 5.0,
        }
    }
}

impl FeatureParams {
    /// Keypoint budget of a single grid cell
    pub fn cell_budget(&self) -> usize {
        let cells = self.grid_rows * self.grid_cols;
        if cells == 0 {
            return 0;
        }
        self.total_features / cells
    }
}

/// A detected corner in full-image pixel coordinates
#[derive(Debug, Clone, Copy)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    /// Local contrast score used for ranking within a cell
    pub response: f32,
    /// Dominant intensity-centroid orientation in radians
    pub angle: f32,
    /// Grid cell (row, col) the corner was detected in
    pub cell: (usize, usize),
}

/// Segment-test circle of radius 3, clockwise from north
const CIRCLE_OFFSETS: [(i32, i32); 16] = [
    (0, -3),
    (1, -3),
    (2, -2),
    (3, -1),
    (3, 0),
    (3, 1),
    (2, 2),
    (1, 3),
    (0, 3),
    (-1, 3),
    (-2, 2),
    (-3, 1),
    (-3, 0),
    (-3, -1),
    (-2, -2),
    (-1, -3),
];

/// Rotation-steered intensity comparison pairs, 8 per descriptor byte
const ORB_PATTERN: [(i8, i8, i8, i8); 256] = [
    (8, -3, 9, 5), (-11, 9, -8, 2), (3, -12, -13, 2), (-3, -7, -4, 5),
    (1, -11, 12, -2), (1, -1, 11, -1), (4, -2, -5, -8), (2, -13, -8, 9),
    (-11, 1, 6, 2), (11, 11, 12, -1), (6, -12, -9, -8), (12, 5, 3, -6),
    (1, 1, -4, -1), (7, -4, -6, 7), (-3, 2, 9, -8), (-4, -8, 3, 3),
    (-5, 3, 0, -4), (2, -11, -13, 0), (10, 5, 5, 2), (0, 9, 10, -3),
    (5, -8, -10, 1), (8, 3, -8, -5), (2, -6, -9, -4), (-12, 2, 0, -10),
    (5, -10, -7, -2), (-7, 9, -1, 0), (0, -1, -3, 3), (-12, 5, -2, -1),
    (-1, 1, -5, -11), (-1, 2, -3, 0), (-5, -6, 7, -1), (4, 7, 0, -8),
    (-9, 9, 3, -13), (7, -3, 13, -7), (10, -4, -5, 3), (6, 1, -13, -13),
    (-12, -11, 7, 0), (0, -1, -8, -6), (-10, -5, -6, 7), (10, 2, -6, -12),
    (-11, 8, 4, -2), (9, 0, -11, -4), (0, 11, 6, -11), (4, 1, -10, -3),
    (-6, 12, 1, 12), (-4, -8, 8, -7), (-3, 0, 8, 3), (3, 3, -3, -1),
    (-6, -11, -2, 12), (0, -3, -6, -3), (-6, 3, -12, -8), (6, 3, -2, -10),
    (-3, -10, -1, 0), (11, 2, 11, 3), (1, -8, -10, 8), (2, -2, -7, 8),
    (0, -13, 13, 0), (6, -9, -1, -1), (7, 5, 6, 3), (-13, 7, -7, -7),
    (-5, -13, 5, -11), (6, 7, -2, 12), (-6, -11, 8, 6), (-2, -2, -5, 9),
    (5, 4, 7, -6), (0, 11, -4, -5), (10, 1, 2, -8), (-3, -10, -10, -10),
    (1, 9, 6, -5), (-7, -11, 11, 3), (11, -2, -4, 3), (7, -1, 5, 12),
    (-5, 5, -2, -5), (8, -11, -1, -13), (-13, 2, -11, -8), (-2, 9, 5, 0),
    (2, -5, 2, 0), (3, -13, -12, 9), (6, -3, 5, 4), (10, 10, 1, -9),
    (-13, -8, -4, 10), (2, -2, -3, 8), (-13, -11, -8, -3), (2, -4, -7, -3),
    (12, 0, -2, 13), (-11, 7, -10, -1), (-5, -10, 0, -11), (6, 7, 12, -3),
    (-1, -1, 8, -6), (-6, 3, -1, -3), (-2, -11, -11, -3), (12, -2, 3, -10),
    (-11, -1, -2, -8), (3, -1, 7, 3), (2, -2, -12, 12), (6, -4, 12, -2),
    (-3, 11, 2, -12), (-1, 3, 2, 3), (1, 3, -11, -3), (2, -8, -7, -5),
    (0, -5, -11, -6), (-12, 8, -2, 9), (3, -7, 9, -8), (-10, -6, -1, -11),
    (11, -6, -3, -13), (3, 0, 0, -8), (-5, -2, -1, -13), (-8, -5, -10, -13),
    (7, -13, 0, -3), (1, -4, -1, -13), (6, -5, -7, 8), (8, 7, -5, -13),
    (2, 0, -8, -6), (-8, -3, -13, -6), (-6, 5, 0, 6), (-8, 8, -9, 1),
    (10, 1, -9, 4), (-4, -8, -5, 7), (7, 7, 10, -8), (-7, -3, -1, 1),
    (10, -1, 3, 1), (5, 6, -10, -8), (-6, -13, 5, -8), (4, -3, -4, -13),
    (-3, 4, -2, -13), (10, -11, 9, 11), (-9, 0, 12, 2), (-4, -2, 13, -6),
    (2, -10, -6, 1), (11, -13, 4, -13), (1, -1, 1, 9), (1, -5, -13, -5),
    (7, 4, 12, -7), (0, -2, -8, 3), (7, 2, 2, -8), (-2, 7, -12, -4),
    (1, 11, 6, -2), (-1, -1, -4, 10), (0, 8, 0, -13), (3, 12, 5, -13),
    (-9, -1, 9, -13), (12, 4, -6, -4), (-13, 13, 1, -4), (0, -2, -7, -9),
    (10, -8, -13, 3), (2, -13, 6, 8), (10, -6, -7, 0), (-11, 7, -1, -7),
    (12, 0, 5, -4), (-7, -8, 4, -12), (-13, 5, -5, -2), (0, 5, 4, 4),
    (-2, -11, -1, 8), (9, 3, -1, -12), (0, 6, -10, 12), (1, -8, -7, -10),
    (-6, 4, -6, 3), (5, 1, -3, -9), (-6, 6, -6, 3), (7, -8, 1, -7),
    (3, 8, -9, -5), (2, -4, 5, 7), (11, 4, 6, -3), (-8, -1, 11, -1),
    (-3, -6, -10, -8), (2, 7, 3, -12), (-4, -10, 12, -3), (1, -2, -4, 6),
    (3, 11, -11, 0), (-6, 2, 3, -8), (6, 12, 0, -13), (3, 2, -2, -5),
    (-4, 1, -6, 5), (-12, 0, -13, 9), (-6, 2, 7, -8), (-2, -4, -6, 5),
    (0, 0, 0, -13), (9, -13, -2, 0), (3, -13, 5, -12), (10, 11, -13, -13),
    (-2, 3, -12, 3), (11, 7, -7, 0), (12, 2, 1, -13), (12, -11, 12, -8),
    (-7, -2, -4, -7), (7, 5, -1, -13), (-5, -8, -9, 10), (6, 0, -3, -13),
    (12, 4, -13, 1), (-7, 8, 8, -3), (10, -4, 0, -13), (2, 1, -7, 0),
    (-5, 4, 2, -8), (12, 8, 4, -13), (8, 7, -10, 0), (-3, 6, -2, 4),
    (-5, -1, -8, -12), (4, -1, -2, -10), (6, -4, -13, 9), (-7, 8, -6, -12),
    (-10, 2, -13, 10), (-1, -7, 0, 2), (-5, 6, -5, -12), (6, -13, 7, -3),
    (-13, 2, -1, 8), (2, 8, -13, 0), (-6, -9, 1, -4), (-9, 13, 0, -13),
    (-2, -3, 8, 0), (4, 0, -11, 12), (0, 3, -10, 10), (-6, -9, -3, -2),
    (9, -4, -6, 2), (5, 0, -13, -10), (-3, -8, -13, 3), (-12, -1, -4, -2),
    (7, -9, -4, 3), (-8, -4, 1, 11), (11, 6, 2, -12), (6, 6, -8, 12),
    (-3, -8, 2, -10), (2, 5, -8, 8), (-9, 8, -6, -8), (-4, 0, -11, -7),
    (7, 6, -3, 8), (-5, 7, -12, 5), (2, -8, -5, 1), (0, 4, -5, -3),
    (9, -9, -6, -12), (0, -13, 0, -13), (-7, -11, -3, -13), (6, -12, -7, 10),
    (6, -8, -13, 7), (8, 7, -11, -1), (-11, -5, -6, 9), (6, 4, 2, -13),
    (-1, -6, 3, -9), (1, -4, 4, -3), (-6, 8, -12, 0), (-11, 3, -6, 2),
    (7, -10, 11, -6), (5, 0, 12, -13), (4, -8, 1, -1), (-13, 12, -6, 3),
    (1, 4, -9, -2), (-8, -12, -8, 7), (-9, 5, 0, -5), (9, 7, 5, 3),
    (-12, -2, 8, -8), (3, 7, 12, -8), (-13, 3, -1, -1), (-10, -4, -10, 12),
    (5, -2, 0, 13), (-7, 1, -12, 8), (2, 9, -5, -11), (11, -13, 0, 2),
];

/// Grid-constrained corner detector with binary descriptors.
///
/// Corners are detected over the whole image, then ranked within a fixed
/// grid where each cell keeps its strongest detections under an even share
/// of the total budget, so low-contrast regions still contribute control
/// points instead of the strongest area soaking up the whole budget. The
/// merged set is described in a single pass.
pub struct GridFeatureExtractor {
    params: FeatureParams,
}

impl Default for GridFeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl GridFeatureExtractor {
    pub fn new() -> Self {
        Self {
            params: FeatureParams::default(),
        }
    }

    pub fn with_params(params: FeatureParams) -> Self {
        Self { params }
    }

    /// Detect and describe corners across the whole image.
    ///
    /// An empty result is not an error; callers decide what a featureless
    /// image means for them.
    pub fn extract(&self, image: &GrayImage) -> GlacioResult<(Vec<Keypoint>, Vec<Descriptor>)> {
        let (rows, cols) = (self.params.grid_rows, self.params.grid_cols);
        if rows == 0 || cols == 0 {
            return Err(GlacioError::Processing(
                "Feature grid must have at least one row and one column".to_string(),
            ));
        }
        let cell_budget = self.params.cell_budget();
        if cell_budget == 0 {
            return Err(GlacioError::Processing(format!(
                "Feature budget {} leaves no keypoints for a {}x{} grid",
                self.params.total_features, rows, cols
            )));
        }

        let (height, width) = image.dim();

        // Detection runs over the whole image, row-parallel, so a corner on
        // an interior cell border is found like any other; only the ring
        // margin at the image edge goes untested.
        let detected: Vec<Vec<Keypoint>> = if height < 7 || width < 7 {
            Vec::new()
        } else {
            let view = image.view();
            (3..height - 3)
                .into_par_iter()
                .map(|y| self.detect_in_row(&view, y))
                .collect()
        };

        // Grid cells have floor-division edges: uneven sizes, but they tile
        // the image exactly with the last cell absorbing the remainder. Each
        // corner falls to the cell holding its coordinates, and ranking and
        // the budget are settled per cell.
        let mut buckets: Vec<Vec<Keypoint>> = vec![Vec::new(); rows * cols];
        for mut kp in detected.into_iter().flatten() {
            let r = ((kp.y as usize + 1) * rows - 1) / height;
            let c = ((kp.x as usize + 1) * cols - 1) / width;
            kp.cell = (r, c);
            buckets[r * cols + c].push(kp);
        }
        let mut keypoints: Vec<Keypoint> = buckets
            .into_iter()
            .flat_map(|bucket| self.suppress_and_rank(bucket, cell_budget))
            .collect();

        // One description pass over the merged set, on the full image, so
        // orientation and sampling see context across cell borders.
        let descriptors: Vec<Descriptor> = {
            let view = image.view();
            keypoints
                .par_iter_mut()
                .map(|kp| {
                    kp.angle = Self::orientation(&view, kp.x as i32, kp.y as i32);
                    Self::describe(&view, kp)
                })
                .collect()
        };

        log::debug!(
            "Extracted {} keypoints ({}x{} grid, {} per cell)",
            keypoints.len(),
            rows,
            cols,
            cell_budget
        );

        Ok((keypoints, descriptors))
    }

    /// Segment-test detection over one image row
    fn detect_in_row(&self, image: &ArrayView2<u8>, y: usize) -> Vec<Keypoint> {
        let width = image.dim().1;
        let mut corners = Vec::new();
        for x in 3..width - 3 {
            let center = image[[y, x]];
            if !self.cardinal_pre_check(image, x, y, center) {
                continue;
            }
            if self.segment_test(image, x, y, center) {
                corners.push(Keypoint {
                    x: x as f32,
                    y: y as f32,
                    response: Self::contrast_response(image, x, y),
                    angle: 0.0,
                    cell: (0, 0),
                });
            }
        }
        corners
    }

    /// Cheap rejection using the four cardinal circle pixels.
    ///
    /// Nine contiguous ring pixels always cover at least two cardinals, so
    /// fewer than two brighter and fewer than two darker means no corner.
    fn cardinal_pre_check(&self, image: &ArrayView2<u8>, x: usize, y: usize, center: u8) -> bool {
        let bright = center.saturating_add(self.params.fast_threshold);
        let dark = center.saturating_sub(self.params.fast_threshold);

        let pixels = [
            image[[y - 3, x]],
            image[[y, x + 3]],
            image[[y + 3, x]],
            image[[y, x - 3]],
        ];

        let brighter = pixels.iter().filter(|&&p| p > bright).count();
        let darker = pixels.iter().filter(|&&p| p < dark).count();
        brighter >= 2 || darker >= 2
    }

    /// Full 16-pixel segment test: 9 contiguous brighter or darker pixels
    fn segment_test(&self, image: &ArrayView2<u8>, x: usize, y: usize, center: u8) -> bool {
        let bright = center.saturating_add(self.params.fast_threshold);
        let dark = center.saturating_sub(self.params.fast_threshold);

        let mut best_bright = 0;
        let mut best_dark = 0;
        let mut run_bright = 0;
        let mut run_dark = 0;

        // circle walked twice so wraparound runs count
        for i in 0..CIRCLE_OFFSETS.len() * 2 {
            let (dx, dy) = CIRCLE_OFFSETS[i % CIRCLE_OFFSETS.len()];
            let px = (x as i32 + dx) as usize;
            let py = (y as i32 + dy) as usize;
            let pixel = image[[py, px]];

            if pixel > bright {
                run_bright += 1;
                run_dark = 0;
                best_bright = best_bright.max(run_bright);
            } else if pixel < dark {
                run_dark += 1;
                run_bright = 0;
                best_dark = best_dark.max(run_dark);
            } else {
                run_bright = 0;
                run_dark = 0;
            }
        }

        best_bright >= 9 || best_dark >= 9
    }

    /// Intensity standard deviation over a 5x5 window.
    ///
    /// The window stays inside the detection margin, so no bounds checks.
    fn contrast_response(image: &ArrayView2<u8>, x: usize, y: usize) -> f32 {
        let mut sum = 0.0f32;
        let mut sum_sq = 0.0f32;
        for dy in -2i32..=2 {
            for dx in -2i32..=2 {
                let v = image[[(y as i32 + dy) as usize, (x as i32 + dx) as usize]] as f32;
                sum += v;
                sum_sq += v * v;
            }
        }
        let mean = sum / 25.0;
        (sum_sq / 25.0 - mean * mean).max(0.0).sqrt()
    }

    /// Strongest-first greedy suppression, capped at the cell budget
    fn suppress_and_rank(&self, mut corners: Vec<Keypoint>, budget: usize) -> Vec<Keypoint> {
        if corners.is_empty() {
            return corners;
        }

        corners.sort_by(|a, b| {
            b.response
                .partial_cmp(&a.response)
                .unwrap_or(Ordering::Equal)
        });

        let radius_sq = self.params.suppression_radius * self.params.suppression_radius;
        let mut selected: Vec<Keypoint> = Vec::with_capacity(budget.min(corners.len()));
        for corner in corners {
            let crowded = selected.iter().any(|kept| {
                let dx = kept.x - corner.x;
                let dy = kept.y - corner.y;
                dx * dx + dy * dy < radius_sq
            });
            if !crowded {
                selected.push(corner);
                if selected.len() >= budget {
                    break;
                }
            }
        }
        selected
    }

    /// Intensity-centroid orientation over a radius-15 disc
    fn orientation(image: &ArrayView2<u8>, x: i32, y: i32) -> f32 {
        const RADIUS: i32 = 15;
        let (height, width) = image.dim();
        let mut m01 = 0.0f32;
        let mut m10 = 0.0f32;

        for dy in -RADIUS..=RADIUS {
            for dx in -RADIUS..=RADIUS {
                if dx * dx + dy * dy > RADIUS * RADIUS {
                    continue;
                }
                let px = x + dx;
                let py = y + dy;
                if px < 0 || py < 0 || px >= width as i32 || py >= height as i32 {
                    continue;
                }
                let v = image[[py as usize, px as usize]] as f32;
                m01 += v * dy as f32;
                m10 += v * dx as f32;
            }
        }

        m01.atan2(m10)
    }

    /// Steered binary descriptor: the comparison pattern rotates with the
    /// keypoint orientation, sample coordinates clamp at the image edge.
    fn describe(image: &ArrayView2<u8>, keypoint: &Keypoint) -> Descriptor {
        let (height, width) = image.dim();
        let x = keypoint.x as i32;
        let y = keypoint.y as i32;
        let (sin, cos) = keypoint.angle.sin_cos();

        let clamp = |px: i32, py: i32| -> u8 {
            let cx = px.max(0).min(width as i32 - 1) as usize;
            let cy = py.max(0).min(height as i32 - 1) as usize;
            image[[cy, cx]]
        };

        let mut descriptor = [0u8; 32];
        for (byte_idx, byte_tests) in ORB_PATTERN.chunks(8).enumerate() {
            let mut byte_val = 0u8;
            for (bit_idx, &(dx1, dy1, dx2, dy2)) in byte_tests.iter().enumerate() {
                let rx1 = (dx1 as f32 * cos - dy1 as f32 * sin) as i32;
                let ry1 = (dx1 as f32 * sin + dy1 as f32 * cos) as i32;
                let rx2 = (dx2 as f32 * cos - dy2 as f32 * sin) as i32;
                let ry2 = (dx2 as f32 * sin + dy2 as f32 * cos) as i32;

                let first = clamp(x + rx1, y + ry1);
                let second = clamp(x + rx2, y + ry2);
                if first < second {
                    byte_val |= 1 << bit_idx;
                }
            }
            descriptor[byte_idx] = byte_val;
        }
        descriptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    /// Dark canvas with a bright axis-aligned square
    fn square_image(size: usize, top: usize, left: usize, side: usize) -> GrayImage {
        let mut image = Array2::from_elem((size, size), 30u8);
        for y in top..top + side {
            for x in left..left + side {
                image[[y, x]] = 220;
            }
        }
        image
    }

    #[test]
    fn test_flat_image_has_no_features() {
        let image = Array2::from_elem((64, 64), 128u8);
        let extractor = GridFeatureExtractor::new();
        let (keypoints, descriptors) = extractor.extract(&image).unwrap();
        assert!(keypoints.is_empty());
        assert!(descriptors.is_empty());
    }

    #[test]
    fn test_square_corners_are_detected() {
        let image = square_image(64, 20, 24, 16);
        let extractor = GridFeatureExtractor::new();
        let (keypoints, descriptors) = extractor.extract(&image).unwrap();

        assert!(!keypoints.is_empty());
        assert_eq!(keypoints.len(), descriptors.len());

        // everything detected sits on the square's boundary region,
        // in full-image coordinates
        for kp in &keypoints {
            assert!(kp.x >= 20.0 && kp.x <= 44.0, "x = {}", kp.x);
            assert!(kp.y >= 16.0 && kp.y <= 40.0, "y = {}", kp.y);
        }

        // all four square corners must come out, including the ones sitting
        // on grid-cell borders: x = 24 is the first column of its cell and
        // x = 39 the last, where a cell-clipped detector goes blind
        for &(cy, cx) in &[(20.0f32, 24.0f32), (20.0, 39.0), (35.0, 24.0), (35.0, 39.0)] {
            assert!(
                keypoints
                    .iter()
                    .any(|kp| (kp.x - cx).abs() <= 1.5 && (kp.y - cy).abs() <= 1.5),
                "no corner near ({}, {})",
                cy,
                cx
            );
        }

        // 64 px image over the default 8x8 grid gives exact 8 px cells, so
        // the source-cell tag is the floor division of the coordinates
        for kp in &keypoints {
            assert_eq!(kp.cell, (kp.y as usize / 8, kp.x as usize / 8));
        }
    }

    #[test]
    fn test_cell_budget_caps_keypoints() {
        // one isolated bright square per grid cell, offset from the cell
        // edges, so every cell offers more corners than its budget
        let mut image = Array2::from_elem((96, 96), 30u8);
        for cell_row in 0..4usize {
            for cell_col in 0..4usize {
                let top = cell_row * 24 + 5 + (cell_row + 2 * cell_col) % 4;
                let left = cell_col * 24 + 5 + (3 * cell_row + cell_col) % 4;
                for y in top..top + 7 {
                    for x in left..left + 7 {
                        image[[y, x]] = 220;
                    }
                }
            }
        }

        let params = FeatureParams {
            total_features: 32,
            grid_rows: 4,
            grid_cols: 4,
            ..FeatureParams::default()
        };
        assert_eq!(params.cell_budget(), 2);

        let extractor = GridFeatureExtractor::with_params(params);
        let (keypoints, _) = extractor.extract(&image).unwrap();
        assert!(keypoints.len() <= 32);
        assert!(!keypoints.is_empty());

        // every cell contributes, none exceeds its share
        for r in 0..4 {
            for c in 0..4 {
                let in_cell = keypoints.iter().filter(|kp| kp.cell == (r, c)).count();
                assert!(
                    (1..=2).contains(&in_cell),
                    "cell ({}, {}) kept {}",
                    r,
                    c,
                    in_cell
                );
            }
        }
    }

    #[test]
    fn test_budget_too_small_for_grid_is_an_error() {
        let params = FeatureParams {
            total_features: 10,
            grid_rows: 8,
            grid_cols: 8,
            ..FeatureParams::default()
        };
        let extractor = GridFeatureExtractor::with_params(params);
        let image = Array2::from_elem((64, 64), 128u8);
        assert!(extractor.extract(&image).is_err());
    }

    #[test]
    fn test_tiny_image_yields_nothing() {
        let image = square_image(6, 1, 1, 3);
        let params = FeatureParams {
            grid_rows: 1,
            grid_cols: 1,
            ..FeatureParams::default()
        };
        let extractor = GridFeatureExtractor::with_params(params);
        let (keypoints, _) = extractor.extract(&image).unwrap();
        assert!(keypoints.is_empty());
    }

    #[test]
    fn test_suppression_thins_clustered_corners() {
        let image = square_image(64, 20, 24, 16);
        let tight = GridFeatureExtractor::with_params(FeatureParams {
            suppression_radius: 1.0,
            grid_rows: 1,
            grid_cols: 1,
            ..FeatureParams::default()
        });
        let loose = GridFeatureExtractor::with_params(FeatureParams {
            suppression_radius: 12.0,
            grid_rows: 1,
            grid_cols: 1,
            ..FeatureParams::default()
        });

        let (dense, _) = tight.extract(&image).unwrap();
        let (sparse, _) = loose.extract(&image).unwrap();
        assert!(sparse.len() <= dense.len());
    }
}
