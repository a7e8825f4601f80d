use nalgebra::{DMatrix, DVector};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// 2x3 affine map from target pixel coordinates into reference pixel
/// coordinates, row-major
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform {
    pub matrix: [[f64; 3]; 2],
}

impl AffineTransform {
    pub fn identity() -> Self {
        Self {
            matrix: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        }
    }

    /// Map a point through the transform
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let m = &self.matrix;
        (
            m[0][0] * x + m[0][1] * y + m[0][2],
            m[1][0] * x + m[1][1] * y + m[1][2],
        )
    }

    /// Translation component (last column)
    pub fn translation(&self) -> (f64, f64) {
        (self.matrix[0][2], self.matrix[1][2])
    }

    /// Determinant of the linear 2x2 part
    pub fn determinant(&self) -> f64 {
        let m = &self.matrix;
        m[0][0] * m[1][1] - m[0][1] * m[1][0]
    }

    /// Inverse map, unless the linear part collapses the plane
    pub fn inverse(&self) -> Option<AffineTransform> {
        let det = self.determinant();
        if det.abs() < 1e-12 {
            return None;
        }
        let m = &self.matrix;
        let ia = m[1][1] / det;
        let ib = -m[0][1] / det;
        let id = -m[1][0] / det;
        let ie = m[0][0] / det;
        let ic = -(ia * m[0][2] + ib * m[1][2]);
        let if_ = -(id * m[0][2] + ie * m[1][2]);
        Some(AffineTransform {
            matrix: [[ia, ib, ic], [id, ie, if_]],
        })
    }
}

impl std::fmt::Display for AffineTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let m = &self.matrix;
        write!(
            f,
            "[[{:.4}, {:.4}, {:.4}], [{:.4}, {:.4}, {:.4}]]",
            m[0][0], m[0][1], m[0][2], m[1][0], m[1][1], m[1][2]
        )
    }
}

/// Parameters for robust affine estimation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacParams {
    /// Upper bound on sampling rounds
    pub max_iterations: usize,
    /// Reprojection distance in pixels under which a pair counts as inlier
    pub inlier_threshold: f64,
    /// Target probability of having sampled one outlier-free triple
    pub confidence: f64,
    /// Smallest consensus set an accepted model may have
    pub min_inliers: usize,
    /// Fixed RNG seed; None draws one from the OS
    pub seed: Option<u64>,
}

impl Default for RansacParams {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            inlier_threshold: 3.0, // Pixels of reprojection slack
            confidence: 0.99,
            min_inliers: 3, // An affine model needs three points
            seed: None,
        }
    }
}

/// Result of a successful robust estimation
#[derive(Debug, Clone)]
pub struct RansacFit {
    pub transform: AffineTransform,
    /// Size of the consensus set of the returned model
    pub inliers: usize,
    /// Sampling rounds actually performed
    pub iterations: usize,
    /// Consensus size over total correspondences
    pub inlier_ratio: f64,
}

/// RANSAC estimator for the target-to-reference affine map.
///
/// Minimal three-point models are sampled until the adaptive round bound
/// says a clean sample was likely seen, then the best consensus set gets a
/// least-squares polish.
pub struct TransformEstimator {
    params: RansacParams,
}

impl Default for TransformEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformEstimator {
    pub fn new() -> Self {
        Self {
            params: RansacParams::default(),
        }
    }

    pub fn with_params(params: RansacParams) -> Self {
        Self { params }
    }

    /// Estimate the affine map taking target points onto reference points.
    ///
    /// Point slices pair up index by index. Returns None when no model with
    /// enough support exists, which includes fewer than three input pairs
    /// and fully degenerate geometry.
    pub fn estimate(
        &self,
        target: &[(f64, f64)],
        reference: &[(f64, f64)],
    ) -> Option<RansacFit> {
        let n = target.len();
        if n < 3 || reference.len() != n {
            return None;
        }

        let mut rng = match self.params.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let threshold_sq = self.params.inlier_threshold * self.params.inlier_threshold;
        let mut best: Option<(AffineTransform, Vec<usize>)> = None;
        let mut required = self.params.max_iterations;
        let mut performed = 0;

        while performed < required {
            performed += 1;

            let sample = sample_three(&mut rng, n);
            let t = [target[sample[0]], target[sample[1]], target[sample[2]]];
            let r = [reference[sample[0]], reference[sample[1]], reference[sample[2]]];

            let model = match solve_minimal(&t, &r) {
                Some(model) => model,
                None => continue, // collinear sample
            };

            let inliers = consensus(&model, target, reference, threshold_sq);
            let better = match &best {
                Some((_, current)) => inliers.len() > current.len(),
                None => true,
            };
            if better {
                let ratio = inliers.len() as f64 / n as f64;
                required = adaptive_rounds(ratio, self.params.confidence)
                    .min(self.params.max_iterations);
                best = Some((model, inliers));
            }
        }

        let (mut transform, mut inliers) = best?;

        // least-squares polish over the consensus set
        if let Some(refined) = refit(target, reference, &inliers) {
            let refined_inliers = consensus(&refined, target, reference, threshold_sq);
            if refined_inliers.len() >= inliers.len() {
                transform = refined;
                inliers = refined_inliers;
            }
        }

        if inliers.len() < self.params.min_inliers.max(3) {
            return None;
        }

        let fit = RansacFit {
            transform,
            inliers: inliers.len(),
            iterations: performed,
            inlier_ratio: inliers.len() as f64 / n as f64,
        };
        log::debug!(
            "Affine fit: {} of {} inliers after {} rounds",
            fit.inliers,
            n,
            fit.iterations
        );
        Some(fit)
    }
}

/// Three distinct indices below n, Floyd's algorithm
fn sample_three(rng: &mut ChaCha8Rng, n: usize) -> [usize; 3] {
    let mut chosen: Vec<usize> = Vec::with_capacity(3);
    for j in (n - 3)..n {
        let t = rng.gen_range(0..=j);
        if chosen.contains(&t) {
            chosen.push(j);
        } else {
            chosen.push(t);
        }
    }
    [chosen[0], chosen[1], chosen[2]]
}

/// Exact affine model through three point pairs, by Cramer's rule
fn solve_minimal(t: &[(f64, f64); 3], r: &[(f64, f64); 3]) -> Option<AffineTransform> {
    let (x1, y1) = t[0];
    let (x2, y2) = t[1];
    let (x3, y3) = t[2];

    let det = x1 * (y2 - y3) - y1 * (x2 - x3) + (x2 * y3 - x3 * y2);
    if det.abs() < 1e-10 {
        return None;
    }

    let solve_row = |u1: f64, u2: f64, u3: f64| -> [f64; 3] {
        let da = u1 * (y2 - y3) - y1 * (u2 - u3) + (u2 * y3 - u3 * y2);
        let db = x1 * (u2 - u3) - u1 * (x2 - x3) + (x2 * u3 - x3 * u2);
        let dc = x1 * (y2 * u3 - y3 * u2) - y1 * (x2 * u3 - x3 * u2) + u1 * (x2 * y3 - x3 * y2);
        [da / det, db / det, dc / det]
    };

    Some(AffineTransform {
        matrix: [solve_row(r[0].0, r[1].0, r[2].0), solve_row(r[0].1, r[1].1, r[2].1)],
    })
}

/// Indices of pairs the model reprojects within the threshold
fn consensus(
    model: &AffineTransform,
    target: &[(f64, f64)],
    reference: &[(f64, f64)],
    threshold_sq: f64,
) -> Vec<usize> {
    target
        .iter()
        .zip(reference.iter())
        .enumerate()
        .filter_map(|(i, (&(tx, ty), &(rx, ry)))| {
            let (px, py) = model.apply(tx, ty);
            let dx = px - rx;
            let dy = py - ry;
            if dx * dx + dy * dy <= threshold_sq {
                Some(i)
            } else {
                None
            }
        })
        .collect()
}

/// Rounds needed to sample one outlier-free triple with the given confidence
fn adaptive_rounds(inlier_ratio: f64, confidence: f64) -> usize {
    if inlier_ratio <= 0.0 {
        return usize::MAX;
    }
    let clean_prob = inlier_ratio.powi(3);
    if clean_prob >= 1.0 {
        return 0;
    }
    let rounds = (1.0 - confidence).ln() / (1.0 - clean_prob).ln();
    if rounds.is_finite() {
        rounds.ceil() as usize
    } else {
        usize::MAX
    }
}

/// Least-squares affine fit over the chosen pairs
fn refit(
    target: &[(f64, f64)],
    reference: &[(f64, f64)],
    inliers: &[usize],
) -> Option<AffineTransform> {
    let n = inliers.len();
    if n < 3 {
        return None;
    }

    let a = DMatrix::from_fn(n, 3, |row, col| {
        let (x, y) = target[inliers[row]];
        match col {
            0 => x,
            1 => y,
            _ => 1.0,
        }
    });
    let bu = DVector::from_fn(n, |row, _| reference[inliers[row]].0);
    let bv = DVector::from_fn(n, |row, _| reference[inliers[row]].1);

    let svd = a.svd(true, true);
    let row_u = svd.solve(&bu, 1e-12).ok()?;
    let row_v = svd.solve(&bv, 1e-12).ok()?;

    Some(AffineTransform {
        matrix: [
            [row_u[0], row_u[1], row_u[2]],
            [row_v[0], row_v[1], row_v[2]],
        ],
    })
}
