use crate::core::estimation::AffineTransform;
use serde::{Deserialize, Serialize};

/// Tolerances for accepting an estimated transform
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationParams {
    /// Largest deviation allowed in the linear 2x2 part
    pub rotation_tolerance: f64,
    /// Largest deviation in pixels allowed in the translation column
    pub translation_tolerance: f64,
}

impl Default for ValidationParams {
    fn default() -> Self {
        Self {
            rotation_tolerance: 0.01,      // Scenes of one tile barely rotate
            translation_tolerance: 100.0,  // Pixels of orbit-to-orbit drift
        }
    }
}

/// Plausibility gate for estimated transforms.
///
/// Scenes of one tile are near-registered already, so an honest correction
/// stays close to the identity. A transform further away than the tolerance
/// matrix in any element is treated as a mis-estimation and rejected rather
/// than applied.
pub struct TransformValidator {
    params: ValidationParams,
}

impl Default for TransformValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformValidator {
    pub fn new() -> Self {
        Self {
            params: ValidationParams::default(),
        }
    }

    pub fn with_params(params: ValidationParams) -> Self {
        Self { params }
    }

    /// Per-element tolerance matrix the deviation is compared against
    pub fn comparison_matrix(&self) -> [[f64; 3]; 2] {
        let r = self.params.rotation_tolerance;
        let t = self.params.translation_tolerance;
        [[r, r, t], [r, r, t]]
    }

    /// Elementwise absolute deviation of a transform from the identity
    pub fn deviation(&self, transform: &AffineTransform) -> [[f64; 3]; 2] {
        let identity = AffineTransform::identity().matrix;
        let mut deviation = [[0.0; 3]; 2];
        for (row, dev_row) in deviation.iter_mut().enumerate() {
            for (col, dev) in dev_row.iter_mut().enumerate() {
                *dev = (identity[row][col] - transform.matrix[row][col]).abs();
            }
        }
        deviation
    }

    /// True when every element deviates at most its tolerance.
    ///
    /// The comparison is inclusive: a deviation exactly at the tolerance
    /// still passes.
    pub fn validate(&self, transform: &AffineTransform) -> bool {
        let deviation = self.deviation(transform);
        let tolerance = self.comparison_matrix();
        for row in 0..2 {
            for col in 0..3 {
                if deviation[row][col] > tolerance[row][col] {
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_accepted() {
        let validator = TransformValidator::new();
        assert!(validator.validate(&AffineTransform::identity()));
    }

    #[test]
    fn test_small_correction_is_accepted() {
        let validator = TransformValidator::new();
        let transform = AffineTransform {
            matrix: [[1.005, -0.003, 42.0], [0.002, 0.996, -17.5]],
        };
        assert!(validator.validate(&transform));
    }

    #[test]
    fn test_boundary_deviation_is_accepted() {
        let validator = TransformValidator::new();
        // off-diagonal and translation elements sit exactly at their
        // tolerance; the diagonal stays on the identity because 1.0 +- 0.01
        // does not round to a deviation of exactly 0.01 in f64
        let transform = AffineTransform {
            matrix: [[1.0, 0.01, 100.0], [-0.01, 1.0, -100.0]],
        };
        assert!(validator.validate(&transform));
    }

    #[test]
    fn test_rotation_over_tolerance_is_rejected() {
        let validator = TransformValidator::new();
        let transform = AffineTransform {
            matrix: [[1.0, 0.0101, 0.0], [0.0, 1.0, 0.0]],
        };
        assert!(!validator.validate(&transform));
    }

    #[test]
    fn test_translation_over_tolerance_is_rejected() {
        let validator = TransformValidator::new();
        let transform = AffineTransform {
            matrix: [[1.0, 0.0, 0.0], [0.0, 1.0, 100.001]],
        };
        assert!(!validator.validate(&transform));
    }

    #[test]
    fn test_tolerances_are_configurable() {
        let strict = TransformValidator::with_params(ValidationParams {
            rotation_tolerance: 0.001,
            translation_tolerance: 2.0,
        });
        let transform = AffineTransform {
            matrix: [[1.0, 0.0, 5.0], [0.0, 1.0, 0.0]],
        };
        assert!(!strict.validate(&transform));

        let loose = TransformValidator::with_params(ValidationParams {
            rotation_tolerance: 0.001,
            translation_tolerance: 10.0,
        });
        assert!(loose.validate(&transform));
    }

    #[test]
    fn test_deviation_is_symmetric_in_sign() {
        let validator = TransformValidator::new();
        let up = AffineTransform {
            matrix: [[1.0, 0.0, 60.0], [0.0, 1.0, 0.0]],
        };
        let down = AffineTransform {
            matrix: [[1.0, 0.0, -60.0], [0.0, 1.0, 0.0]],
        };
        assert_eq!(validator.deviation(&up), validator.deviation(&down));
        assert!(validator.validate(&up) && validator.validate(&down));
    }
}
