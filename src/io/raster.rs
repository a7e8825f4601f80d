use crate::types::{
    BandImage, GeoTransform, GlacioError, GlacioResult, IndexImage, RasterMetadata,
};
use gdal::raster::{Buffer, GdalType};
use gdal::{Dataset, DriverManager};
use ndarray::{s, Array2, Array3};
use std::path::Path;

/// Read a 16-bit single-band GeoTIFF
pub fn read_band(path: &Path) -> GlacioResult<(BandImage, RasterMetadata)> {
    read_single_band::<u16>(path)
}

/// Read a floating-point single-band GeoTIFF (derived index layers)
pub fn read_index(path: &Path) -> GlacioResult<(IndexImage, RasterMetadata)> {
    read_single_band::<f32>(path)
}

fn read_single_band<T: GdalType + Copy>(path: &Path) -> GlacioResult<(Array2<T>, RasterMetadata)> {
    let dataset = Dataset::open(path)?;
    let (width, height) = dataset.raster_size();
    if width == 0 || height == 0 {
        return Err(GlacioError::InvalidFormat(format!(
            "Raster {} has no pixels",
            path.display()
        )));
    }

    // plain TIFFs without georeferencing read as pixel space
    let geo_transform = dataset
        .geo_transform()
        .unwrap_or_else(|_| GeoTransform::pixel_space().to_gdal());
    let projection = dataset.projection();

    let rasterband = dataset.rasterband(1)?;
    let buffer = rasterband.read_as::<T>((0, 0), (width, height), (width, height), None)?;
    let image = Array2::from_shape_vec((height, width), buffer.data).map_err(|e| {
        GlacioError::InvalidFormat(format!("Raster buffer shape mismatch: {}", e))
    })?;

    log::debug!("Read {}x{} raster from {}", width, height, path.display());

    Ok((
        image,
        RasterMetadata {
            geo_transform: GeoTransform::from_gdal(geo_transform),
            projection,
        },
    ))
}

/// Write a 16-bit band as GeoTIFF.
///
/// The data lands in a temporary file next to the destination and is renamed
/// into place afterwards, so a crash mid-write never leaves a half-written
/// product under the final name.
pub fn write_band(path: &Path, image: &BandImage, metadata: &RasterMetadata) -> GlacioResult<()> {
    let (rows, cols) = image.dim();
    if rows == 0 || cols == 0 {
        return Err(GlacioError::InvalidFormat(
            "Cannot write an empty raster".to_string(),
        ));
    }

    let tmp = sibling_tempfile(path)?;
    {
        let driver = DriverManager::get_driver_by_name("GTiff")?;
        let mut dataset =
            driver.create_with_band_type::<u16, _>(tmp.path(), cols as isize, rows as isize, 1)?;
        apply_metadata(&mut dataset, metadata)?;

        let mut band = dataset.rasterband(1)?;
        let buffer = Buffer::new((cols, rows), image.iter().copied().collect());
        band.write((0, 0), (cols, rows), &buffer)?;
        // 0 is the Landsat fill value and the warp fill
        band.set_no_data_value(Some(0.0))?;
    }
    persist(tmp, path)
}

/// Write a floating-point index layer as GeoTIFF
pub fn write_index(path: &Path, image: &IndexImage, metadata: &RasterMetadata) -> GlacioResult<()> {
    let (rows, cols) = image.dim();
    if rows == 0 || cols == 0 {
        return Err(GlacioError::InvalidFormat(
            "Cannot write an empty raster".to_string(),
        ));
    }

    let tmp = sibling_tempfile(path)?;
    {
        let driver = DriverManager::get_driver_by_name("GTiff")?;
        let mut dataset =
            driver.create_with_band_type::<f32, _>(tmp.path(), cols as isize, rows as isize, 1)?;
        apply_metadata(&mut dataset, metadata)?;

        let mut band = dataset.rasterband(1)?;
        let buffer = Buffer::new((cols, rows), image.iter().copied().collect());
        band.write((0, 0), (cols, rows), &buffer)?;
    }
    persist(tmp, path)
}

/// Write an RGB overlay image, channel-last layout, as a 3-band TIFF
pub fn write_rgb(path: &Path, image: &Array3<u8>) -> GlacioResult<()> {
    let (rows, cols, channels) = image.dim();
    if channels != 3 {
        return Err(GlacioError::InvalidFormat(format!(
            "RGB image needs 3 channels, got {}",
            channels
        )));
    }
    if rows == 0 || cols == 0 {
        return Err(GlacioError::InvalidFormat(
            "Cannot write an empty raster".to_string(),
        ));
    }

    let tmp = sibling_tempfile(path)?;
    {
        let driver = DriverManager::get_driver_by_name("GTiff")?;
        let mut dataset =
            driver.create_with_band_type::<u8, _>(tmp.path(), cols as isize, rows as isize, 3)?;

        for channel in 0..3usize {
            let mut band = dataset.rasterband(channel as isize + 1)?;
            let data: Vec<u8> = image.slice(s![.., .., channel]).iter().copied().collect();
            let buffer = Buffer::new((cols, rows), data);
            band.write((0, 0), (cols, rows), &buffer)?;
        }
    }
    persist(tmp, path)
}

fn apply_metadata(dataset: &mut Dataset, metadata: &RasterMetadata) -> GlacioResult<()> {
    dataset.set_geo_transform(&metadata.geo_transform.to_gdal())?;
    if !metadata.projection.is_empty() {
        dataset.set_projection(&metadata.projection)?;
    }
    Ok(())
}

fn sibling_tempfile(path: &Path) -> GlacioResult<tempfile::NamedTempFile> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    let tmp = tempfile::Builder::new()
        .prefix(".tmp-")
        .suffix(".tif")
        .tempfile_in(parent.unwrap_or_else(|| Path::new(".")))?;
    Ok(tmp)
}

fn persist(tmp: tempfile::NamedTempFile, path: &Path) -> GlacioResult<()> {
    tmp.persist(path).map_err(|e| GlacioError::Io(e.error))?;
    log::debug!("Wrote {}", path.display());
    Ok(())
}
