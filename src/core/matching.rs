use crate::core::features::{Descriptor, Keypoint};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Parameters for correspondence selection between two descriptor sets
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchParams {
    /// Fraction of matches kept after ranking by descriptor distance
    pub keep_fraction: f64,
    /// Largest per-axis pixel displacement a correspondence may span
    pub max_displacement: f32,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            keep_fraction: 0.25,     // Keep the best quarter of raw matches
            max_displacement: 200.0, // Scenes of one tile overlap within this
        }
    }
}

/// One tentative point correspondence between target and reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Correspondence {
    /// Index into the reference keypoint set
    pub reference_idx: usize,
    /// Index into the target keypoint set
    pub target_idx: usize,
    /// Hamming distance between the two descriptors
    pub distance: u32,
}

/// Number of differing bits between two descriptors
pub fn hamming_distance(a: &Descriptor, b: &Descriptor) -> u32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x ^ y).count_ones())
        .sum()
}

/// Brute-force descriptor matcher with score and displacement pruning.
///
/// Matching runs from the target into the reference set: every target
/// descriptor gets its nearest reference descriptor, then the weakest
/// matches and the geometrically implausible ones are discarded.
pub struct CorrespondenceMatcher {
    params: MatchParams,
}

impl Default for CorrespondenceMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl CorrespondenceMatcher {
    pub fn new() -> Self {
        Self {
            params: MatchParams::default(),
        }
    }

    pub fn with_params(params: MatchParams) -> Self {
        Self { params }
    }

    /// Nearest reference descriptor for every target descriptor
    pub fn match_descriptors(
        &self,
        reference: &[Descriptor],
        target: &[Descriptor],
    ) -> Vec<Correspondence> {
        if reference.is_empty() || target.is_empty() {
            return Vec::new();
        }

        target
            .par_iter()
            .enumerate()
            .map(|(target_idx, descriptor)| {
                let mut best_idx = 0;
                let mut best_distance = u32::MAX;
                for (reference_idx, candidate) in reference.iter().enumerate() {
                    let distance = hamming_distance(descriptor, candidate);
                    if distance < best_distance {
                        best_distance = distance;
                        best_idx = reference_idx;
                    }
                }
                Correspondence {
                    reference_idx: best_idx,
                    target_idx,
                    distance: best_distance,
                }
            })
            .collect()
    }

    /// Keep the configured fraction of matches with the smallest distances.
    ///
    /// The count rounds down, so a handful of matches under a small fraction
    /// can legitimately prune to nothing.
    pub fn prune_by_score(&self, mut matches: Vec<Correspondence>) -> Vec<Correspondence> {
        matches.sort_by_key(|m| m.distance);
        let keep = (matches.len() as f64 * self.params.keep_fraction) as usize;
        matches.truncate(keep);
        matches
    }

    /// Drop correspondences whose endpoints sit too far apart.
    ///
    /// A pair survives only when both axis displacements stay strictly under
    /// the bound. Already-pruned input passes through unchanged.
    pub fn prune_by_displacement(
        &self,
        matches: Vec<Correspondence>,
        reference_keypoints: &[Keypoint],
        target_keypoints: &[Keypoint],
    ) -> Vec<Correspondence> {
        let bound = self.params.max_displacement;
        matches
            .into_iter()
            .filter(|m| {
                let r = &reference_keypoints[m.reference_idx];
                let t = &target_keypoints[m.target_idx];
                (r.x - t.x).abs() < bound && (r.y - t.y).abs() < bound
            })
            .collect()
    }

    /// Full selection chain: match, rank-prune, then displacement-prune
    pub fn select_correspondences(
        &self,
        reference: &[Descriptor],
        target: &[Descriptor],
        reference_keypoints: &[Keypoint],
        target_keypoints: &[Keypoint],
    ) -> Vec<Correspondence> {
        let raw = self.match_descriptors(reference, target);
        let ranked = self.prune_by_score(raw);
        self.prune_by_displacement(ranked, reference_keypoints, target_keypoints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keypoint(x: f32, y: f32) -> Keypoint {
        Keypoint {
            x,
            y,
            response: 1.0,
            angle: 0.0,
            cell: (0, 0),
        }
    }

    fn descriptor(fill: u8) -> Descriptor {
        [fill; 32]
    }

    #[test]
    fn test_hamming_distance() {
        let zeros = descriptor(0);
        let ones = descriptor(0xFF);
        let mut one_bit = descriptor(0);
        one_bit[5] = 0b0000_0100;

        assert_eq!(hamming_distance(&zeros, &zeros), 0);
        assert_eq!(hamming_distance(&zeros, &ones), 256);
        assert_eq!(hamming_distance(&zeros, &one_bit), 1);
    }

    #[test]
    fn test_match_finds_nearest() {
        let reference = vec![descriptor(0x00), descriptor(0xFF), descriptor(0x0F)];
        let target = vec![descriptor(0xFE)];

        let matcher = CorrespondenceMatcher::new();
        let matches = matcher.match_descriptors(&reference, &target);

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].reference_idx, 1);
        assert_eq!(matches[0].target_idx, 0);
        // 0xFE vs 0xFF differs in one bit per byte
        assert_eq!(matches[0].distance, 32);
    }

    #[test]
    fn test_match_with_empty_side() {
        let matcher = CorrespondenceMatcher::new();
        assert!(matcher.match_descriptors(&[], &[descriptor(1)]).is_empty());
        assert!(matcher.match_descriptors(&[descriptor(1)], &[]).is_empty());
    }

    #[test]
    fn test_prune_by_score_keeps_best_quarter() {
        let matches: Vec<Correspondence> = (0..8)
            .map(|i| Correspondence {
                reference_idx: i,
                target_idx: i,
                distance: (8 - i) as u32 * 10,
            })
            .collect();

        let matcher = CorrespondenceMatcher::new();
        let kept = matcher.prune_by_score(matches);

        // 8 * 0.25 = 2, lowest distances first
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].distance, 10);
        assert_eq!(kept[1].distance, 20);
    }

    #[test]
    fn test_prune_by_score_can_empty_small_sets() {
        let matches = vec![Correspondence {
            reference_idx: 0,
            target_idx: 0,
            distance: 3,
        }];
        let matcher = CorrespondenceMatcher::new();
        // 1 * 0.25 rounds down to zero
        assert!(matcher.prune_by_score(matches).is_empty());
    }

    #[test]
    fn test_prune_by_displacement_is_strict() {
        let reference_kps = vec![keypoint(0.0, 0.0), keypoint(0.0, 0.0), keypoint(0.0, 0.0)];
        let target_kps = vec![
            keypoint(199.0, 0.0), // under the bound
            keypoint(200.0, 0.0), // exactly at the bound, dropped
            keypoint(0.0, 250.0), // one axis over, dropped
        ];
        let matches: Vec<Correspondence> = (0..3)
            .map(|i| Correspondence {
                reference_idx: i,
                target_idx: i,
                distance: 1,
            })
            .collect();

        let matcher = CorrespondenceMatcher::new();
        let kept = matcher.prune_by_displacement(matches, &reference_kps, &target_kps);

        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].target_idx, 0);
    }

    #[test]
    fn test_displacement_prune_is_idempotent() {
        let reference_kps = vec![keypoint(10.0, 10.0), keypoint(500.0, 0.0)];
        let target_kps = vec![keypoint(12.0, 11.0), keypoint(0.0, 0.0)];
        let matches: Vec<Correspondence> = (0..2)
            .map(|i| Correspondence {
                reference_idx: i,
                target_idx: i,
                distance: 1,
            })
            .collect();

        let matcher = CorrespondenceMatcher::new();
        let once = matcher.prune_by_displacement(matches, &reference_kps, &target_kps);
        let twice = matcher.prune_by_displacement(once.clone(), &reference_kps, &target_kps);
        assert_eq!(once, twice);
    }
}
