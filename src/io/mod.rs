//! I/O modules for reading band rasters and discovering scenes

pub mod raster;
pub mod discovery;

pub use raster::{read_band, read_index, write_band, write_index, write_rgb};
pub use discovery::{collect_scenes, GREEN_BAND_SUFFIX, NDSI_SUFFIX, SWIR1_BAND_SUFFIX};
