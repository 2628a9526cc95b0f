//! Image decoding and grayscale conversion.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces the
//! three-channel colour raster both pipelines start from. Alpha is
//! dropped; palette and 16-bit images are converted to 8-bit RGB.

use image::{GrayImage, Luma, RgbImage};

use crate::types::{PipelineError, RasterImage};

/// Decode raw image bytes into an 8-bit RGB raster.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<RasterImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    Ok(RasterImage::Color(img.to_rgb8()))
}

/// Convert an RGB image to grayscale with the standard luminance
/// weights `0.299*R + 0.587*G + 0.114*B`, rounded to nearest.
///
/// `image`'s own `to_luma8` uses Rec. 709 weights, which shift vessel
/// contrast noticeably on red-dominated fundus images.
#[must_use = "returns the grayscale image"]
pub fn to_grayscale(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        let weighted = u32::from(r) * 299 + u32::from(g) * 587 + u32::from(b) * 114;
        // Max is 255 * 1000, so the quotient always fits in a u8.
        #[allow(clippy::cast_possible_truncation)]
        let luma = ((weighted + 500) / 1000) as u8;
        Luma([luma])
    })
}

/// Extract one channel (0 = red, 1 = green, 2 = blue) as a grayscale image.
///
/// # Panics
///
/// Panics if `channel > 2`.
#[must_use = "returns the extracted channel"]
pub fn extract_channel(image: &RgbImage, channel: usize) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([image.get_pixel(x, y).0[channel]])
    })
}
