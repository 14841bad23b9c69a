use crate::error::{DatasetError, Result};
use crate::grid::GridSpec;
use crate::utils;
use image::{ImageFormat, Rgb, RgbImage, imageops::FilterType};
use ndarray::{Array3, ArrayD};
use std::io::{BufWriter, Write};
use std::path::Path;

const OVERLAY_COLOR: [u8; 3] = [255, 255, 0];
const OVERLAY_ALPHA: u16 = 160;
const OVERLAY_LINE_WIDTH: u32 = 2;

/// Decodes a frame from disk and normalizes it to the expected resolution
///
/// Frames of any other size are resized with Lanczos3 filtering, which is lossy.
pub fn load_frame(path: &Path, width: u32, height: u32) -> Result<RgbImage> {
    let decoded = image::open(path).map_err(|source| DatasetError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    let rgb = decoded.to_rgb8();

    if rgb.dimensions() != (width, height) {
        utils::debug_println(format_args!(
            "resizing {} from {}x{} to {}x{}",
            path.display(),
            rgb.width(),
            rgb.height(),
            width,
            height
        ));
        return Ok(image::imageops::resize(&rgb, width, height, FilterType::Lanczos3));
    }
    Ok(rgb)
}

/// Views an RGB image as an (H, W, 3) array
pub fn rgb_to_array(img: &RgbImage) -> Result<Array3<u8>> {
    let (w, h) = img.dimensions();
    Array3::from_shape_vec((h as usize, w as usize, 3), img.as_raw().clone()).map_err(|source| {
        DatasetError::Buffer {
            width: w,
            height: h,
            source,
        }
    })
}

/// Turns an (H, W, 3) tile array back into an RGB image
pub fn array_to_rgb(tile: &ArrayD<u8>) -> Option<RgbImage> {
    let shape = tile.shape();
    if shape.len() != 3 || shape[2] != 3 || shape[0] == 0 || shape[1] == 0 {
        return None;
    }
    let raw: Vec<u8> = tile.iter().copied().collect();
    RgbImage::from_raw(shape[1] as u32, shape[0] as u32, raw)
}

/// Saves a PNG through a temporary file in the same directory, then renames it into place
pub fn save_png_atomic(img: &RgbImage, path: &Path) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::Builder::new()
        .prefix(".tile")
        .suffix(".png.tmp")
        .tempfile_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        img.write_to(&mut writer, ImageFormat::Png)?;
        writer.flush()?;
    }
    tmp.persist(path).map_err(|e| DatasetError::Io(e.error))?;
    Ok(())
}

/// Copies the frame and blends semi-transparent grid lines over the tile boundaries
pub fn render_grid_overlay(frame: &RgbImage, grid: GridSpec) -> RgbImage {
    let mut overlay = frame.clone();
    let (w, h) = overlay.dimensions();
    let tile_w = w / grid.cols.max(1);
    let tile_h = h / grid.rows.max(1);

    for r in 1..grid.rows {
        let y = r * tile_h;
        for dy in 0..OVERLAY_LINE_WIDTH {
            let yy = (y + dy).saturating_sub(OVERLAY_LINE_WIDTH / 2);
            if yy < h {
                for x in 0..w {
                    blend(overlay.get_pixel_mut(x, yy));
                }
            }
        }
    }
    for c in 1..grid.cols {
        let x = c * tile_w;
        for dx in 0..OVERLAY_LINE_WIDTH {
            let xx = (x + dx).saturating_sub(OVERLAY_LINE_WIDTH / 2);
            if xx < w {
                for y in 0..h {
                    blend(overlay.get_pixel_mut(xx, y));
                }
            }
        }
    }
    overlay
}

fn blend(pixel: &mut Rgb<u8>) {
    for (channel, color) in pixel.0.iter_mut().zip(OVERLAY_COLOR) {
        let mixed = (*channel as u16 * (255 - OVERLAY_ALPHA) + color as u16 * OVERLAY_ALPHA) / 255;
        *channel = mixed as u8;
    }
}
