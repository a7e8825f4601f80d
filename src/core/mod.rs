//! Core scene registration modules

pub mod scene;
pub mod grouping;
pub mod features;
pub mod matching;
pub mod estimation;
pub mod validation;
pub mod alignment;
pub mod ndsi;
pub mod pipeline;
pub mod batch;

// Re-export main types
pub use scene::{reduce_band, Scene, SceneId, SceneRasters};
pub use grouping::{group_scenes, TileGroup};
pub use features::{Descriptor, FeatureParams, GridFeatureExtractor, Keypoint};
pub use matching::{hamming_distance, Correspondence, CorrespondenceMatcher, MatchParams};
pub use estimation::{AffineTransform, RansacFit, RansacParams, TransformEstimator};
pub use validation::{TransformValidator, ValidationParams};
pub use alignment::{align_scene, draw_correspondences, warp_band, warp_index};
pub use ndsi::{compute_ndsi, snow_ratio, DEFAULT_SNOW_THRESHOLD};
pub use pipeline::{
    Registration, RegistrationDecision, RegistrationParams, RegistrationPipeline,
    RegistrationReport,
};
pub use batch::{BatchParams, BatchReport, BatchRunner, GroupReport};
