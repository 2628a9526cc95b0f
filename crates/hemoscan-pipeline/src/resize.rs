//! Resampling to the canonical working size.
//!
//! The step-wise pipeline resizes every input to a fixed square grid
//! (512x512 by default) before any other processing, so that the
//! structuring elements and the adaptive threshold block size cover a
//! comparable share of the fundus regardless of the camera. Aspect ratio
//! is not preserved.

use std::fmt;

use image::RgbImage;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

use crate::types::Dimensions;

/// Resampling filter used when resizing.
///
/// Ordered from fastest/lowest-quality to slowest/highest-quality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResizeFilter {
    /// Nearest-neighbor: fastest, blocky artifacts.
    Nearest,
    /// Bilinear interpolation.
    #[default]
    Triangle,
    /// Bicubic (Catmull-Rom).
    CatmullRom,
    /// Gaussian: smooth output.
    Gaussian,
    /// Lanczos with 3 lobes: slowest, sharpest.
    Lanczos3,
}

impl ResizeFilter {
    /// Convert to the `image` crate's `FilterType`.
    #[must_use]
    pub const fn to_image_filter(self) -> FilterType {
        match self {
            Self::Nearest => FilterType::Nearest,
            Self::Triangle => FilterType::Triangle,
            Self::CatmullRom => FilterType::CatmullRom,
            Self::Gaussian => FilterType::Gaussian,
            Self::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

impl fmt::Display for ResizeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nearest => f.write_str("Nearest"),
            Self::Triangle => f.write_str("Triangle"),
            Self::CatmullRom => f.write_str("CatmullRom"),
            Self::Gaussian => f.write_str("Gaussian"),
            Self::Lanczos3 => f.write_str("Lanczos3"),
        }
    }
}

/// Resize `image` to exactly `target`, ignoring aspect ratio.
///
/// Always resamples, even when the input already has the target size,
/// so the output depends only on the pixels and the filter.
#[must_use = "returns the resized image"]
pub fn resize_to(image: &RgbImage, target: Dimensions, filter: ResizeFilter) -> RgbImage {
    image::imageops::resize(
        image,
        target.width,
        target.height,
        filter.to_image_filter(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_image(w: u32, h: u32) -> RgbImage {
        RgbImage::from_pixel(w, h, image::Rgb([128, 64, 32]))
    }

    const CANONICAL: Dimensions = Dimensions {
        width: 512,
        height: 512,
    };

    #[test]
    fn default_filter_is_triangle() {
        assert_eq!(ResizeFilter::default(), ResizeFilter::Triangle);
    }

    #[test]
    fn upscales_small_image() {
        let result = resize_to(&test_image(100, 100), CANONICAL, ResizeFilter::Triangle);
        assert_eq!(result.dimensions(), (512, 512));
    }

    #[test]
    fn downscales_and_squashes_landscape() {
        let result = resize_to(&test_image(2000, 1500), CANONICAL, ResizeFilter::Triangle);
        assert_eq!(result.dimensions(), (512, 512));
    }

    #[test]
    fn same_size_keeps_uniform_content() {
        let result = resize_to(&test_image(512, 512), CANONICAL, ResizeFilter::Triangle);
        assert_eq!(result.dimensions(), (512, 512));
        assert!(result.pixels().all(|p| p.0 == [128, 64, 32]));
    }

    #[test]
    fn every_filter_hits_target() {
        for filter in [
            ResizeFilter::Nearest,
            ResizeFilter::Triangle,
            ResizeFilter::CatmullRom,
            ResizeFilter::Gaussian,
            ResizeFilter::Lanczos3,
        ] {
            let result = resize_to(&test_image(37, 91), CANONICAL, filter);
            assert_eq!(result.dimensions(), (512, 512), "{filter}");
        }
    }
}
