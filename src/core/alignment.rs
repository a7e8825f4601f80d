use crate::core::estimation::AffineTransform;
use crate::core::features::Keypoint;
use crate::core::matching::Correspondence;
use crate::core::scene::SceneRasters;
use crate::types::{BandImage, GlacioError, GlacioResult, GrayImage, IndexImage};
use ndarray::parallel::prelude::*;
use ndarray::{Array2, Array3, Axis};
use num_traits::ToPrimitive;

/// Yellow match lines, dark blue keypoint markers
const MATCH_COLOR: [u8; 3] = [255, 255, 0];
const KEYPOINT_COLOR: [u8; 3] = [0, 0, 100];

/// Warp every layer of a scene onto the reference pixel grid.
///
/// The transform maps target coordinates into reference coordinates; each
/// output pixel is therefore sampled at the inverse-mapped position in the
/// source layer. The variant tag survives the warp, an index layer stays an
/// index layer.
pub fn align_scene(
    rasters: &SceneRasters,
    transform: &AffineTransform,
    output_dims: (usize, usize),
) -> GlacioResult<SceneRasters> {
    match rasters {
        SceneRasters::Basic { green, swir1 } => Ok(SceneRasters::Basic {
            green: warp_band(green, transform, output_dims)?,
            swir1: warp_band(swir1, transform, output_dims)?,
        }),
        SceneRasters::WithIndex { green, swir1, ndsi } => Ok(SceneRasters::WithIndex {
            green: warp_band(green, transform, output_dims)?,
            swir1: warp_band(swir1, transform, output_dims)?,
            ndsi: warp_index(ndsi, transform, output_dims)?,
        }),
    }
}

/// Resample a 16-bit band through the transform, bilinear, 0 fill
pub fn warp_band(
    band: &BandImage,
    transform: &AffineTransform,
    output_dims: (usize, usize),
) -> GlacioResult<BandImage> {
    let inverse = invert(transform)?;
    let (rows, cols) = output_dims;
    let mut output = BandImage::zeros((rows, cols));

    output
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(y, mut row)| {
            for x in 0..cols {
                let (sx, sy) = inverse.apply(x as f64, y as f64);
                if let Some(value) = bilinear_sample(band, sx, sy) {
                    row[x] = value.round().clamp(0.0, u16::MAX as f64) as u16;
                }
            }
        });

    Ok(output)
}

/// Resample a floating-point index layer through the transform
pub fn warp_index(
    index: &IndexImage,
    transform: &AffineTransform,
    output_dims: (usize, usize),
) -> GlacioResult<IndexImage> {
    let inverse = invert(transform)?;
    let (rows, cols) = output_dims;
    let mut output = IndexImage::zeros((rows, cols));

    output
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(y, mut row)| {
            for x in 0..cols {
                let (sx, sy) = inverse.apply(x as f64, y as f64);
                if let Some(value) = bilinear_sample(index, sx, sy) {
                    row[x] = value as f32;
                }
            }
        });

    Ok(output)
}

fn invert(transform: &AffineTransform) -> GlacioResult<AffineTransform> {
    transform.inverse().ok_or_else(|| {
        GlacioError::Processing("affine transform is not invertible".to_string())
    })
}

/// Bilinear sample with edge clamping; None outside the image
fn bilinear_sample<T: ToPrimitive + Copy>(image: &Array2<T>, x: f64, y: f64) -> Option<f64> {
    let (rows, cols) = image.dim();
    if x < 0.0 || y < 0.0 {
        return None;
    }

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    if x0 >= cols || y0 >= rows {
        return None;
    }
    let x1 = (x0 + 1).min(cols - 1);
    let y1 = (y0 + 1).min(rows - 1);

    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let p00 = image[[y0, x0]].to_f64()?;
    let p01 = image[[y0, x1]].to_f64()?;
    let p10 = image[[y1, x0]].to_f64()?;
    let p11 = image[[y1, x1]].to_f64()?;

    let top = p00 * (1.0 - fx) + p01 * fx;
    let bottom = p10 * (1.0 - fx) + p11 * fx;
    Some(top * (1.0 - fy) + bottom * fy)
}

/// Side-by-side match overlay, reference panel left and target panel right.
///
/// Every supplied keypoint gets a marker; the surviving correspondences are
/// drawn as lines across the panels. Indices in the correspondences refer
/// into the given keypoint slices.
pub fn draw_correspondences(
    reference: &GrayImage,
    target: &GrayImage,
    reference_keypoints: &[Keypoint],
    target_keypoints: &[Keypoint],
    matches: &[Correspondence],
) -> Array3<u8> {
    let (ref_h, ref_w) = reference.dim();
    let (tgt_h, tgt_w) = target.dim();
    let height = ref_h.max(tgt_h);
    let width = ref_w + tgt_w;
    let mut canvas = Array3::zeros((height, width, 3));

    for y in 0..ref_h {
        for x in 0..ref_w {
            let v = reference[[y, x]];
            for c in 0..3 {
                canvas[[y, x, c]] = v;
            }
        }
    }
    for y in 0..tgt_h {
        for x in 0..tgt_w {
            let v = target[[y, x]];
            for c in 0..3 {
                canvas[[y, ref_w + x, c]] = v;
            }
        }
    }

    let panel_shift = ref_w as i64;
    for kp in reference_keypoints {
        draw_marker(&mut canvas, kp.x as i64, kp.y as i64);
    }
    for kp in target_keypoints {
        draw_marker(&mut canvas, kp.x as i64 + panel_shift, kp.y as i64);
    }

    for m in matches {
        let r = &reference_keypoints[m.reference_idx];
        let t = &target_keypoints[m.target_idx];
        draw_line(
            &mut canvas,
            (r.x as i64, r.y as i64),
            (t.x as i64 + panel_shift, t.y as i64),
            MATCH_COLOR,
        );
    }

    canvas
}

fn put_pixel(canvas: &mut Array3<u8>, x: i64, y: i64, color: [u8; 3]) {
    let (height, width, _) = canvas.dim();
    if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
        return;
    }
    for (c, &component) in color.iter().enumerate() {
        canvas[[y as usize, x as usize, c]] = component;
    }
}

/// 3x3 block marker
fn draw_marker(canvas: &mut Array3<u8>, x: i64, y: i64) {
    for dy in -1..=1 {
        for dx in -1..=1 {
            put_pixel(canvas, x + dx, y + dy, KEYPOINT_COLOR);
        }
    }
}

/// Integer Bresenham line
fn draw_line(canvas: &mut Array3<u8>, from: (i64, i64), to: (i64, i64), color: [u8; 3]) {
    let (mut x0, mut y0) = from;
    let (x1, y1) = to;
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        put_pixel(canvas, x0, y0, color);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
