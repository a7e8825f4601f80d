use crate::core::estimation::{AffineTransform, RansacParams, TransformEstimator};
use crate::core::features::{Descriptor, FeatureParams, GridFeatureExtractor, Keypoint};
use crate::core::matching::{Correspondence, CorrespondenceMatcher, MatchParams};
use crate::core::scene::{reduce_band, SceneRasters};
use crate::core::validation::{TransformValidator, ValidationParams};
use crate::types::{GlacioError, GlacioResult, RegistrationFailure};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// All tunables of the registration chain in one place
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationParams {
    pub features: FeatureParams,
    pub matching: MatchParams,
    pub ransac: RansacParams,
    pub validation: ValidationParams,
}

/// Stage counters of one registration attempt
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrationReport {
    pub reference_features: usize,
    pub target_features: usize,
    pub raw_matches: usize,
    pub score_pruned: usize,
    pub displacement_pruned: usize,
    pub ransac_iterations: usize,
    pub inliers: usize,
}

/// Outcome of one registration attempt
#[derive(Debug, Clone)]
pub enum RegistrationDecision {
    /// Transform accepted, safe to warp with
    Accepted(AffineTransform),
    /// No usable transform; the failure says at which stage the chain ended
    Rejected(RegistrationFailure),
}

/// Everything one attempt produced, kept around for diagnostics.
///
/// Keypoints and surviving correspondences are returned even on rejection
/// so the caller can render the match overlay for every attempt.
#[derive(Debug)]
pub struct Registration {
    pub decision: RegistrationDecision,
    pub report: RegistrationReport,
    pub reference_keypoints: Vec<Keypoint>,
    pub target_keypoints: Vec<Keypoint>,
    pub correspondences: Vec<Correspondence>,
}

impl Registration {
    pub fn is_accepted(&self) -> bool {
        matches!(self.decision, RegistrationDecision::Accepted(_))
    }

    fn rejected(
        failure: RegistrationFailure,
        report: RegistrationReport,
        reference_keypoints: Vec<Keypoint>,
        target_keypoints: Vec<Keypoint>,
        correspondences: Vec<Correspondence>,
    ) -> Self {
        Self {
            decision: RegistrationDecision::Rejected(failure),
            report,
            reference_keypoints,
            target_keypoints,
            correspondences,
        }
    }
}

/// Feature-based registration of a target scene against a reference.
///
/// Both bands of each scene contribute keypoints: snow cover can blank out
/// most of one band's texture while the other still holds usable corners,
/// so the merged set is matched as a whole.
pub struct RegistrationPipeline {
    extractor: GridFeatureExtractor,
    matcher: CorrespondenceMatcher,
    estimator: TransformEstimator,
    validator: TransformValidator,
}

impl Default for RegistrationPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistrationPipeline {
    pub fn new() -> Self {
        Self::with_params(RegistrationParams::default())
    }

    pub fn with_params(params: RegistrationParams) -> Self {
        Self {
            extractor: GridFeatureExtractor::with_params(params.features),
            matcher: CorrespondenceMatcher::with_params(params.matching),
            estimator: TransformEstimator::with_params(params.ransac),
            validator: TransformValidator::with_params(params.validation),
        }
    }

    /// Run the full chain on a loaded scene pair.
    ///
    /// An Err is an input problem (unusable rasters); a Rejected decision is
    /// the normal outcome for a pair the chain could not register safely.
    pub fn register(
        &self,
        reference: &SceneRasters,
        target: &SceneRasters,
    ) -> GlacioResult<Registration> {
        let (ref_rows, ref_cols) = reference.dims();
        let (tgt_rows, tgt_cols) = target.dims();
        if ref_rows == 0 || ref_cols == 0 || tgt_rows == 0 || tgt_cols == 0 {
            return Err(GlacioError::InvalidFormat(
                "Cannot register zero-sized rasters".to_string(),
            ));
        }

        let (reference_keypoints, reference_descriptors) =
            self.extract_scene_features(reference)?;
        let (target_keypoints, target_descriptors) = self.extract_scene_features(target)?;

        let mut report = RegistrationReport {
            reference_features: reference_keypoints.len(),
            target_features: target_keypoints.len(),
            ..RegistrationReport::default()
        };
        debug!(
            "Features: {} reference, {} target",
            report.reference_features, report.target_features
        );

        if reference_keypoints.is_empty() || target_keypoints.is_empty() {
            warn!("No features on at least one side, nothing to match");
            return Ok(Registration::rejected(
                RegistrationFailure::NoFeatures,
                report,
                reference_keypoints,
                target_keypoints,
                Vec::new(),
            ));
        }

        let raw = self
            .matcher
            .match_descriptors(&reference_descriptors, &target_descriptors);
        report.raw_matches = raw.len();

        let ranked = self.matcher.prune_by_score(raw);
        report.score_pruned = ranked.len();

        let correspondences =
            self.matcher
                .prune_by_displacement(ranked, &reference_keypoints, &target_keypoints);
        report.displacement_pruned = correspondences.len();
        debug!(
            "Matches: {} raw, {} after ranking, {} after displacement pruning",
            report.raw_matches, report.score_pruned, report.displacement_pruned
        );

        if correspondences.is_empty() {
            warn!("All matches pruned away, cannot estimate a transform");
            return Ok(Registration::rejected(
                RegistrationFailure::InsufficientMatches,
                report,
                reference_keypoints,
                target_keypoints,
                correspondences,
            ));
        }

        let target_points: Vec<(f64, f64)> = correspondences
            .iter()
            .map(|m| {
                let kp = &target_keypoints[m.target_idx];
                (kp.x as f64, kp.y as f64)
            })
            .collect();
        let reference_points: Vec<(f64, f64)> = correspondences
            .iter()
            .map(|m| {
                let kp = &reference_keypoints[m.reference_idx];
                (kp.x as f64, kp.y as f64)
            })
            .collect();

        let fit = match self.estimator.estimate(&target_points, &reference_points) {
            Some(fit) => fit,
            None => {
                warn!(
                    "No affine model with enough support over {} correspondences",
                    correspondences.len()
                );
                return Ok(Registration::rejected(
                    RegistrationFailure::EstimationFailed,
                    report,
                    reference_keypoints,
                    target_keypoints,
                    correspondences,
                ));
            }
        };
        report.ransac_iterations = fit.iterations;
        report.inliers = fit.inliers;

        if !self.validator.validate(&fit.transform) {
            warn!(
                "Transform {} deviates too far from identity, rejecting",
                fit.transform
            );
            return Ok(Registration::rejected(
                RegistrationFailure::TransformRejected,
                report,
                reference_keypoints,
                target_keypoints,
                correspondences,
            ));
        }

        info!(
            "Accepted transform {} ({} inliers of {} correspondences)",
            fit.transform,
            fit.inliers,
            correspondences.len()
        );
        Ok(Registration {
            decision: RegistrationDecision::Accepted(fit.transform),
            report,
            reference_keypoints,
            target_keypoints,
            correspondences,
        })
    }

    /// Merged keypoints and descriptors from both bands of a scene
    fn extract_scene_features(
        &self,
        rasters: &SceneRasters,
    ) -> GlacioResult<(Vec<Keypoint>, Vec<Descriptor>)> {
        let green = reduce_band(rasters.green());
        let swir1 = reduce_band(rasters.swir1());

        let (mut keypoints, mut descriptors) = self.extractor.extract(&green)?;
        let (swir_keypoints, swir_descriptors) = self.extractor.extract(&swir1)?;
        keypoints.extend(swir_keypoints);
        descriptors.extend(swir_descriptors);

        Ok((keypoints, descriptors))
    }
}
