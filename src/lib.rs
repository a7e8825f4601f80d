//! Glacio: A Fast, Modular Landsat 8 Scene Co-Registration Engine
//!
//! This library registers repeated Landsat 8 acquisitions of the same ground
//! footprint onto a shared pixel grid, so snow cover indices computed over a
//! time series compare the same terrain pixel for pixel. Registration is
//! feature-based: grid-constrained corners, binary descriptor matching, a
//! robust affine fit, and a plausibility gate before anything is resampled.

pub mod types;
pub mod io;
pub mod core;

// Re-export main types
pub use types::{
    BandImage, GeoTransform, GlacioError, GlacioResult, GrayImage, IndexImage, RasterMetadata,
    RegistrationFailure,
};
pub use core::{
    AffineTransform, BatchParams, BatchReport, BatchRunner, FeatureParams, GroupReport,
    MatchParams, RansacParams, Registration, RegistrationDecision, RegistrationParams,
    RegistrationPipeline, Scene, SceneId, SceneRasters, TileGroup, ValidationParams,
};
