use crate::core::alignment::{align_scene, draw_correspondences};
use crate::core::grouping::TileGroup;
use crate::core::ndsi::{compute_ndsi, snow_ratio};
use crate::core::pipeline::{
    Registration, RegistrationDecision, RegistrationParams, RegistrationPipeline,
};
use crate::core::scene::{reduce_band, Scene, SceneRasters};
use crate::io::discovery::{GREEN_BAND_SUFFIX, NDSI_SUFFIX, SWIR1_BAND_SUFFIX};
use crate::io::raster;
use crate::types::{GlacioError, GlacioResult, GrayImage, RasterMetadata, RegistrationFailure};
use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Parameters of a batch registration run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchParams {
    /// Worker threads registering scenes of one tile group concurrently
    pub max_workers: usize,
    /// Compute a snow index for targets that do not carry one already
    pub compute_index: bool,
    /// NDSI value above which a pixel counts as snow, for logging
    pub snow_threshold: f32,
}

impl Default for BatchParams {
    fn default() -> Self {
        Self {
            max_workers: 4, // Scene pairs are memory-hungry, keep the pool small
            compute_index: true,
            snow_threshold: crate::core::ndsi::DEFAULT_SNOW_THRESHOLD,
        }
    }
}

/// Per-tile outcome counters of a batch run.
///
/// Attempted covers every job that ran to a decision; cancelled jobs count
/// as skipped instead. The failure counters partition the non-accepted
/// attempts by the stage that ended them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupReport {
    pub path: u16,
    pub row: u16,
    pub attempted: usize,
    pub accepted: usize,
    pub no_features: usize,
    pub insufficient_matches: usize,
    pub estimation_failed: usize,
    pub transform_rejected: usize,
    pub input_errors: usize,
    pub skipped: usize,
}

impl GroupReport {
    fn new(path: u16, row: u16) -> Self {
        Self {
            path,
            row,
            attempted: 0,
            accepted: 0,
            no_features: 0,
            insufficient_matches: 0,
            estimation_failed: 0,
            transform_rejected: 0,
            input_errors: 0,
            skipped: 0,
        }
    }

    /// Accepted share of the attempted registrations, 0 when nothing ran.
    ///
    /// A ratio well under 1 on a tile that used to register cleanly is the
    /// first sign of degraded inputs.
    pub fn acceptance_ratio(&self) -> f64 {
        if self.attempted == 0 {
            return 0.0;
        }
        self.accepted as f64 / self.attempted as f64
    }
}

/// Aggregated outcome of a whole batch run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub groups: Vec<GroupReport>,
}

impl BatchReport {
    pub fn attempted(&self) -> usize {
        self.groups.iter().map(|g| g.attempted).sum()
    }

    pub fn accepted(&self) -> usize {
        self.groups.iter().map(|g| g.accepted).sum()
    }

    pub fn skipped(&self) -> usize {
        self.groups.iter().map(|g| g.skipped).sum()
    }

    pub fn acceptance_ratio(&self) -> f64 {
        let attempted = self.attempted();
        if attempted == 0 {
            return 0.0;
        }
        self.accepted() as f64 / attempted as f64
    }
}

enum JobOutcome {
    Accepted,
    Rejected(RegistrationFailure),
    InputError,
    Skipped,
}

/// Batch driver: registers every target of every tile group against its
/// reference on a bounded worker pool.
///
/// Failures of single scenes never abort the run; they end up as counters
/// in the report. Only an unusable output area or a broken worker pool is
/// fatal.
pub struct BatchRunner {
    pipeline: RegistrationPipeline,
    params: BatchParams,
}

impl Default for BatchRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchRunner {
    pub fn new() -> Self {
        Self::with_params(RegistrationParams::default(), BatchParams::default())
    }

    pub fn with_params(registration: RegistrationParams, batch: BatchParams) -> Self {
        Self {
            pipeline: RegistrationPipeline::with_params(registration),
            params: batch,
        }
    }

    /// Run the batch.
    ///
    /// Aligned bands land under `output_dir/<path>_<row>/`; a match overlay
    /// for every attempt lands in `diagnostics_dir`. Raising `cancel` stops
    /// new jobs from starting, jobs already running finish normally.
    pub fn run(
        &self,
        groups: &[TileGroup],
        output_dir: &Path,
        diagnostics_dir: &Path,
        cancel: &AtomicBool,
    ) -> GlacioResult<BatchReport> {
        std::fs::create_dir_all(output_dir)?;
        std::fs::create_dir_all(diagnostics_dir)?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.params.max_workers.max(1))
            .build()
            .map_err(|e| GlacioError::Processing(format!("Worker pool setup failed: {}", e)))?;

        info!(
            "Batch of {} tile group(s) on {} worker(s)",
            groups.len(),
            self.params.max_workers.max(1)
        );

        let mut report = BatchReport::default();
        for group in groups {
            let group_report = self.run_group(group, output_dir, diagnostics_dir, cancel, &pool)?;
            info!(
                "Tile {:03}/{:03}: {} of {} accepted (ratio {:.2}), {} skipped",
                group_report.path,
                group_report.row,
                group_report.accepted,
                group_report.attempted,
                group_report.acceptance_ratio(),
                group_report.skipped
            );
            report.groups.push(group_report);
        }

        info!(
            "Batch done: {} of {} accepted (ratio {:.2})",
            report.accepted(),
            report.attempted(),
            report.acceptance_ratio()
        );
        Ok(report)
    }

    fn run_group(
        &self,
        group: &TileGroup,
        output_dir: &Path,
        diagnostics_dir: &Path,
        cancel: &AtomicBool,
        pool: &rayon::ThreadPool,
    ) -> GlacioResult<GroupReport> {
        let mut report = GroupReport::new(group.path, group.row);
        if group.targets.is_empty() {
            return Ok(report);
        }

        if cancel.load(Ordering::Relaxed) {
            report.skipped = group.targets.len();
            return Ok(report);
        }

        let (reference, reference_metadata) = match group.reference.load() {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!(
                    "Reference {} failed to load, tile unusable: {}",
                    group.reference.id, e
                );
                report.attempted = group.targets.len();
                report.input_errors = group.targets.len();
                return Ok(report);
            }
        };
        let reference_gray = reduce_band(reference.green());

        let group_dir = output_dir.join(format!("{:03}_{:03}", group.path, group.row));
        std::fs::create_dir_all(&group_dir)?;

        let outcomes: Vec<JobOutcome> = pool.install(|| {
            group
                .targets
                .par_iter()
                .map(|target| {
                    if cancel.load(Ordering::Relaxed) {
                        return JobOutcome::Skipped;
                    }
                    self.run_target(
                        target,
                        &reference,
                        &reference_gray,
                        &reference_metadata,
                        &group_dir,
                        diagnostics_dir,
                    )
                })
                .collect()
        });

        for outcome in outcomes {
            match outcome {
                JobOutcome::Accepted => {
                    report.attempted += 1;
                    report.accepted += 1;
                }
                JobOutcome::Rejected(failure) => {
                    report.attempted += 1;
                    match failure {
                        RegistrationFailure::NoFeatures => report.no_features += 1,
                        RegistrationFailure::InsufficientMatches => {
                            report.insufficient_matches += 1
                        }
                        RegistrationFailure::EstimationFailed => report.estimation_failed += 1,
                        RegistrationFailure::TransformRejected => report.transform_rejected += 1,
                    }
                }
                JobOutcome::InputError => {
                    report.attempted += 1;
                    report.input_errors += 1;
                }
                JobOutcome::Skipped => report.skipped += 1,
            }
        }
        Ok(report)
    }

    /// One registration job. Everything that can go wrong here is scoped to
    /// this scene and reported as an outcome, never bubbled up.
    fn run_target(
        &self,
        target: &Scene,
        reference: &SceneRasters,
        reference_gray: &GrayImage,
        reference_metadata: &RasterMetadata,
        group_dir: &Path,
        diagnostics_dir: &Path,
    ) -> JobOutcome {
        let (mut rasters, _) = match target.load() {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!("Target {} failed to load: {}", target.id, e);
                return JobOutcome::InputError;
            }
        };

        if self.params.compute_index && rasters.index().is_none() {
            match compute_ndsi(rasters.green(), rasters.swir1()) {
                Ok(ndsi) => {
                    info!(
                        "Scene {}: snow ratio {:.3}",
                        target.id,
                        snow_ratio(&ndsi, self.params.snow_threshold)
                    );
                    rasters = rasters.with_index(ndsi);
                }
                Err(e) => {
                    warn!("Scene {}: snow index failed: {}", target.id, e);
                }
            }
        }

        let registration = match self.pipeline.register(reference, &rasters) {
            Ok(registration) => registration,
            Err(e) => {
                warn!("Scene {}: registration errored: {}", target.id, e);
                return JobOutcome::InputError;
            }
        };

        self.write_diagnostics(target, reference_gray, &rasters, &registration, diagnostics_dir);

        let transform = match registration.decision {
            RegistrationDecision::Accepted(transform) => transform,
            RegistrationDecision::Rejected(failure) => {
                info!("Scene {}: rejected ({}), no output written", target.id, failure);
                return JobOutcome::Rejected(failure);
            }
        };

        let aligned = match align_scene(&rasters, &transform, reference.dims()) {
            Ok(aligned) => aligned,
            Err(e) => {
                warn!("Scene {}: warp failed: {}", target.id, e);
                return JobOutcome::InputError;
            }
        };

        if let Err(e) = self.write_outputs(target, &aligned, reference_metadata, group_dir) {
            warn!("Scene {}: output write failed: {}", target.id, e);
            return JobOutcome::InputError;
        }

        JobOutcome::Accepted
    }

    /// Match overlay for this attempt. Diagnostics are best effort, a write
    /// failure only warns.
    fn write_diagnostics(
        &self,
        target: &Scene,
        reference_gray: &GrayImage,
        rasters: &SceneRasters,
        registration: &Registration,
        diagnostics_dir: &Path,
    ) {
        let target_gray = reduce_band(rasters.green());
        let overlay = draw_correspondences(
            reference_gray,
            &target_gray,
            &registration.reference_keypoints,
            &registration.target_keypoints,
            &registration.correspondences,
        );
        let path = diagnostics_dir.join(format!("{}_matches.tif", target.id.name));
        if let Err(e) = raster::write_rgb(&path, &overlay) {
            warn!("Scene {}: overlay write failed: {}", target.id, e);
        }
    }

    /// Aligned layers, georeferenced like the reference
    fn write_outputs(
        &self,
        target: &Scene,
        aligned: &SceneRasters,
        reference_metadata: &RasterMetadata,
        group_dir: &Path,
    ) -> GlacioResult<()> {
        let band_path = |suffix: &str| -> PathBuf {
            group_dir.join(format!("{}{}", target.id.name, suffix))
        };

        raster::write_band(&band_path(GREEN_BAND_SUFFIX), aligned.green(), reference_metadata)?;
        raster::write_band(&band_path(SWIR1_BAND_SUFFIX), aligned.swir1(), reference_metadata)?;
        if let Some(ndsi) = aligned.index() {
            raster::write_index(&band_path(NDSI_SUFFIX), ndsi, reference_metadata)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scene::SceneId;

    fn fake_scene(name: &str) -> Scene {
        Scene {
            id: SceneId::parse(name).unwrap(),
            green_path: PathBuf::from(format!("/nonexistent/{}_B3.TIF", name)),
            swir1_path: PathBuf::from(format!("/nonexistent/{}_B6.TIF", name)),
            ndsi_path: None,
        }
    }

    fn fake_group() -> TileGroup {
        TileGroup {
            path: 196,
            row: 29,
            reference: fake_scene("LC81960292014229LGN00"),
            targets: vec![
                fake_scene("LC81960292015232LGN00"),
                fake_scene("LC81960292016235LGN00"),
            ],
        }
    }

    #[test]
    fn test_acceptance_ratio_of_empty_group() {
        let report = GroupReport::new(196, 29);
        assert_eq!(report.acceptance_ratio(), 0.0);
    }

    #[test]
    fn test_batch_report_totals() {
        let mut a = GroupReport::new(196, 29);
        a.attempted = 4;
        a.accepted = 3;
        let mut b = GroupReport::new(197, 29);
        b.attempted = 2;
        b.accepted = 0;
        b.skipped = 1;

        let report = BatchReport {
            groups: vec![a, b],
        };
        assert_eq!(report.attempted(), 6);
        assert_eq!(report.accepted(), 3);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.acceptance_ratio(), 0.5);
    }

    #[test]
    fn test_cancelled_run_skips_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = AtomicBool::new(true);

        let runner = BatchRunner::new();
        let report = runner
            .run(
                &[fake_group()],
                &dir.path().join("aligned"),
                &dir.path().join("diagnostics"),
                &cancel,
            )
            .unwrap();

        assert_eq!(report.skipped(), 2);
        assert_eq!(report.attempted(), 0);
    }

    #[test]
    fn test_unreadable_reference_counts_as_input_errors() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = AtomicBool::new(false);

        let runner = BatchRunner::new();
        let report = runner
            .run(
                &[fake_group()],
                &dir.path().join("aligned"),
                &dir.path().join("diagnostics"),
                &cancel,
            )
            .unwrap();

        assert_eq!(report.attempted(), 2);
        assert_eq!(report.accepted(), 0);
        assert_eq!(report.groups[0].input_errors, 2);
    }

    #[test]
    fn test_group_without_targets_reports_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = AtomicBool::new(false);
        let group = TileGroup {
            path: 196,
            row: 29,
            reference: fake_scene("LC81960292014229LGN00"),
            targets: Vec::new(),
        };

        let runner = BatchRunner::new();
        let report = runner
            .run(
                &[group],
                &dir.path().join("aligned"),
                &dir.path().join("diagnostics"),
                &cancel,
            )
            .unwrap();

        assert_eq!(report.attempted(), 0);
        assert_eq!(report.skipped(), 0);
        assert_eq!(report.groups.len(), 1);
    }
}
