use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// 16-bit single-band raster as stored in Landsat GeoTIFF products
pub type BandImage = Array2<u16>;

/// 8-bit raster used for feature detection and diagnostic overlays
pub type GrayImage = Array2<u8>;

/// Floating-point raster for derived index layers (NDSI)
pub type IndexImage = Array2<f32>;

/// Geospatial transformation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Pixel-space transform for rasters without georeferencing
    pub fn pixel_space() -> Self {
        Self {
            top_left_x: 0.0,
            pixel_width: 1.0,
            rotation_x: 0.0,
            top_left_y: 0.0,
            rotation_y: 0.0,
            pixel_height: -1.0,
        }
    }

    /// Layout expected by GDAL's SetGeoTransform
    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.top_left_x,
            self.pixel_width,
            self.rotation_x,
            self.top_left_y,
            self.rotation_y,
            self.pixel_height,
        ]
    }

    pub fn from_gdal(gt: [f64; 6]) -> Self {
        Self {
            top_left_x: gt[0],
            pixel_width: gt[1],
            rotation_x: gt[2],
            top_left_y: gt[3],
            rotation_y: gt[4],
            pixel_height: gt[5],
        }
    }
}

/// Georeferencing carried alongside a raster so aligned outputs keep it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RasterMetadata {
    pub geo_transform: GeoTransform,
    /// WKT projection string, empty when the source carries none
    pub projection: String,
}

impl RasterMetadata {
    pub fn pixel_space() -> Self {
        Self {
            geo_transform: GeoTransform::pixel_space(),
            projection: String::new(),
        }
    }
}

/// Why a registration attempt could not produce an accepted transform.
///
/// These are expected per-scene outcomes, counted and logged by the batch
/// runner; none of them aborts a processing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistrationFailure {
    /// No keypoints or descriptors were found in one or both scenes
    NoFeatures,
    /// No correspondences survived score and displacement pruning
    InsufficientMatches,
    /// The robust fitter could not produce a transform from the matches
    EstimationFailed,
    /// A transform was produced but fell outside the identity tolerance
    TransformRejected,
}

impl std::fmt::Display for RegistrationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistrationFailure::NoFeatures => write!(f, "no features"),
            RegistrationFailure::InsufficientMatches => write!(f, "insufficient matches"),
            RegistrationFailure::EstimationFailed => write!(f, "estimation failed"),
            RegistrationFailure::TransformRejected => write!(f, "transform rejected"),
        }
    }
}

/// Error types for scene registration
#[derive(Debug, thiserror::Error)]
pub enum GlacioError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Invalid scene identifier: {0}")]
    InvalidSceneId(String),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),
}

/// Result type for registration operations
pub type GlacioResult<T> = Result<T, GlacioError>;
