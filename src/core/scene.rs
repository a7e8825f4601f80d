use crate::io::raster;
use crate::types::{BandImage, GlacioError, GlacioResult, GrayImage, IndexImage, RasterMetadata};
use chrono::NaiveDate;
use regex::Regex;
use std::path::PathBuf;

/// Shape of a Landsat product identifier: satellite letter, sensor,
/// satellite number, then path, row, year and day-of-year packed positionally
/// (e.g. LC81960292015232LGN00).
const SCENE_ID_PATTERN: &str = r"^([A-Z])[A-Z0-9](\d)(\d{3})(\d{3})(\d{4})(\d{3})";

/// Identity of one satellite acquisition, parsed from its product name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneId {
    /// Full scene name as it appears in band file names
    pub name: String,
    /// Satellite letter code ('L' for Landsat)
    pub satellite: char,
    /// Satellite number (8 for Landsat 8)
    pub number: u8,
    /// WRS path of the ground footprint
    pub path: u16,
    /// WRS row of the ground footprint
    pub row: u16,
    /// Acquisition date resolved from year and day-of-year
    pub acquired: NaiveDate,
}

impl SceneId {
    /// Parse a scene identifier from a product name.
    ///
    /// The fields are encoded positionally; names that do not match the
    /// product shape or encode an impossible day-of-year are rejected.
    pub fn parse(name: &str) -> GlacioResult<SceneId> {
        let re = Regex::new(SCENE_ID_PATTERN)
            .map_err(|e| GlacioError::Processing(format!("Scene pattern failed to compile: {}", e)))?;

        let captures = re
            .captures(name)
            .ok_or_else(|| GlacioError::InvalidSceneId(name.to_string()))?;

        let field = |idx: usize| captures.get(idx).map(|m| m.as_str()).unwrap_or("");
        let numeric = |idx: usize| -> GlacioResult<u32> {
            field(idx)
                .parse::<u32>()
                .map_err(|_| GlacioError::InvalidSceneId(name.to_string()))
        };

        let satellite = field(1).chars().next().unwrap_or('?');
        let number = numeric(2)? as u8;
        let path = numeric(3)? as u16;
        let row = numeric(4)? as u16;
        let year = numeric(5)? as i32;
        let day_of_year = numeric(6)?;

        let acquired = NaiveDate::from_yo_opt(year, day_of_year).ok_or_else(|| {
            GlacioError::InvalidSceneId(format!("{} (day {} of {})", name, day_of_year, year))
        })?;

        Ok(SceneId {
            name: name.to_string(),
            satellite,
            number,
            path,
            row,
            acquired,
        })
    }

    /// The (path, row) tile key this scene belongs to
    pub fn tile(&self) -> (u16, u16) {
        (self.path, self.row)
    }
}

impl std::fmt::Display for SceneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// One satellite acquisition and the band files that belong to it.
///
/// The green and swir1 bands are mandatory; a pre-computed snow index layer
/// is optional.
#[derive(Debug, Clone)]
pub struct Scene {
    pub id: SceneId,
    pub green_path: PathBuf,
    pub swir1_path: PathBuf,
    pub ndsi_path: Option<PathBuf>,
}

impl Scene {
    /// Read all of this scene's raster layers into memory.
    ///
    /// Returns the layers plus the green band's georeferencing, which the
    /// aligned outputs inherit. Mismatched layer dimensions are an input
    /// error, not a registration failure.
    pub fn load(&self) -> GlacioResult<(SceneRasters, RasterMetadata)> {
        let (green, metadata) = raster::read_band(&self.green_path)?;
        let (swir1, _) = raster::read_band(&self.swir1_path)?;

        if green.dim() != swir1.dim() {
            return Err(GlacioError::InvalidFormat(format!(
                "Scene {} band dimensions differ: green {:?} vs swir1 {:?}",
                self.id,
                green.dim(),
                swir1.dim()
            )));
        }

        let rasters = match &self.ndsi_path {
            Some(ndsi_path) => {
                let (ndsi, _) = raster::read_index(ndsi_path)?;
                if ndsi.dim() != green.dim() {
                    return Err(GlacioError::InvalidFormat(format!(
                        "Scene {} index dimensions {:?} differ from bands {:?}",
                        self.id,
                        ndsi.dim(),
                        green.dim()
                    )));
                }
                SceneRasters::WithIndex { green, swir1, ndsi }
            }
            None => SceneRasters::Basic { green, swir1 },
        };

        Ok((rasters, metadata))
    }
}

/// In-memory raster layers of one scene.
///
/// The variant records whether a derived snow index layer travels with the
/// two mandatory bands, so every warp and write site handles the extra layer
/// exhaustively instead of probing for it.
#[derive(Debug, Clone)]
pub enum SceneRasters {
    Basic {
        green: BandImage,
        swir1: BandImage,
    },
    WithIndex {
        green: BandImage,
        swir1: BandImage,
        ndsi: IndexImage,
    },
}

impl SceneRasters {
    pub fn green(&self) -> &BandImage {
        match self {
            SceneRasters::Basic { green, .. } => green,
            SceneRasters::WithIndex { green, .. } => green,
        }
    }

    pub fn swir1(&self) -> &BandImage {
        match self {
            SceneRasters::Basic { swir1, .. } => swir1,
            SceneRasters::WithIndex { swir1, .. } => swir1,
        }
    }

    pub fn index(&self) -> Option<&IndexImage> {
        match self {
            SceneRasters::Basic { .. } => None,
            SceneRasters::WithIndex { ndsi, .. } => Some(ndsi),
        }
    }

    /// (rows, cols) of the band layers
    pub fn dims(&self) -> (usize, usize) {
        self.green().dim()
    }

    /// Attach (or replace) the snow index layer
    pub fn with_index(self, ndsi: IndexImage) -> SceneRasters {
        match self {
            SceneRasters::Basic { green, swir1 } => SceneRasters::WithIndex { green, swir1, ndsi },
            SceneRasters::WithIndex { green, swir1, .. } => {
                SceneRasters::WithIndex { green, swir1, ndsi }
            }
        }
    }
}

/// Reduce a 16-bit band to the 8-bit depth used for feature work.
///
/// The band is min/max stretched across the full 16-bit range and then
/// shifted down to 8 bits, so relative sample ordering is preserved and the
/// informative range is never clipped. A constant band reduces to all zeros.
pub fn reduce_band(band: &BandImage) -> GrayImage {
    let lo = band.iter().copied().min();
    let hi = band.iter().copied().max();

    let (lo, hi) = match (lo, hi) {
        (Some(lo), Some(hi)) if hi > lo => (lo, hi),
        _ => return GrayImage::zeros(band.dim()),
    };

    let span = (hi - lo) as u64;
    band.mapv(|v| {
        let stretched = ((v - lo) as u64 * u16::MAX as u64) / span;
        (stretched >> 8) as u8
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    #[test]
    fn test_parse_scene_id_fields() {
        let id = SceneId::parse("LC81960292015232LGN00").unwrap();

        assert_eq!(id.satellite, 'L');
        assert_eq!(id.number, 8);
        assert_eq!(id.path, 196);
        assert_eq!(id.row, 29);
        // day 232 of 2015 is August 20th
        assert_eq!(id.acquired, NaiveDate::from_ymd_opt(2015, 8, 20).unwrap());
        assert_eq!(id.tile(), (196, 29));
    }

    #[test]
    fn test_parse_scene_id_leap_day() {
        // day 366 exists in 2016 but not in 2015
        assert!(SceneId::parse("LC81960292016366LGN00").is_ok());
        assert!(SceneId::parse("LC81960292015366LGN00").is_err());
    }

    #[test]
    fn test_parse_scene_id_rejects_garbage() {
        assert!(SceneId::parse("not_a_scene").is_err());
        assert!(SceneId::parse("LC8196029").is_err());
        assert!(SceneId::parse("").is_err());
    }

    #[test]
    fn test_reduce_band_preserves_ordering() {
        let band = Array::from_shape_vec((2, 3), vec![100u16, 200, 300, 400, 500, 600]).unwrap();
        let gray = reduce_band(&band);

        // stretched to the full range: min -> 0, max -> 255
        assert_eq!(gray[[0, 0]], 0);
        assert_eq!(gray[[1, 2]], 255);
        // monotone in the source values
        assert!(gray[[0, 0]] <= gray[[0, 1]]);
        assert!(gray[[0, 1]] <= gray[[0, 2]]);
        assert!(gray[[0, 2]] <= gray[[1, 0]]);
    }

    #[test]
    fn test_reduce_band_flat_image_is_zero() {
        let band = BandImage::from_elem((4, 4), 777);
        let gray = reduce_band(&band);
        assert!(gray.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_scene_rasters_index_tagging() {
        let green = BandImage::zeros((2, 2));
        let swir1 = BandImage::zeros((2, 2));
        let basic = SceneRasters::Basic {
            green: green.clone(),
            swir1: swir1.clone(),
        };
        assert!(basic.index().is_none());
        assert_eq!(basic.dims(), (2, 2));

        let with_index = basic.with_index(IndexImage::zeros((2, 2)));
        assert!(with_index.index().is_some());
    }
}
