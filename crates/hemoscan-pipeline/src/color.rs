//! Hue-saturation-value conversion and red lesion segmentation.
//!
//! Hue uses the 8-bit convention where 0..=180 covers the full 0..360
//! degree circle (one step is two degrees). Saturation and value span
//! 0..=255.

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::mask::BinaryMask;

/// Largest hue value in the 8-bit convention.
pub const MAX_HUE: u8 = 180;

/// One pixel in hue-saturation-value form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsv {
    /// Hue, `0..=180` (degrees / 2).
    pub h: u8,
    /// Saturation, `0..=255`.
    pub s: u8,
    /// Value (brightness), `0..=255`.
    pub v: u8,
}

impl Hsv {
    /// Convert an RGB triple.
    ///
    /// Gray pixels (zero chroma) get hue 0, black gets saturation 0.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::many_single_char_names
    )]
    pub fn from_rgb(rgb: [u8; 3]) -> Self {
        let [r8, g8, b8] = rgb;
        let v = r8.max(g8).max(b8);
        let min = r8.min(g8).min(b8);
        let chroma = f32::from(v - min);

        let s = if v == 0 {
            0
        } else {
            (255.0 * chroma / f32::from(v)).round() as u8
        };

        let (r, g, b) = (f32::from(r8), f32::from(g8), f32::from(b8));
        let raw = if v == min {
            0.0
        } else if v == r8 {
            30.0 * (g - b) / chroma
        } else if v == g8 {
            30.0f32.mul_add((b - r) / chroma, 60.0)
        } else {
            30.0f32.mul_add((r - g) / chroma, 120.0)
        };
        let mut h = raw.round() as i32;
        if h < 0 {
            h += i32::from(MAX_HUE);
        }

        Self {
            h: h as u8,
            s,
            v,
        }
    }
}

/// An inclusive hue interval in the 0..=180 convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HueBand {
    /// Lowest accepted hue (inclusive).
    pub low: u8,
    /// Highest accepted hue (inclusive).
    pub high: u8,
}

impl HueBand {
    /// Create a band covering `low..=high`.
    #[must_use]
    pub const fn new(low: u8, high: u8) -> Self {
        Self { low, high }
    }

    /// Whether `hue` lies inside the band.
    #[must_use]
    pub const fn contains(self, hue: u8) -> bool {
        self.low <= hue && hue <= self.high
    }
}

/// Select pixels whose hue falls inside any of `bands` and whose
/// saturation and value reach the given minimums.
///
/// Red wraps around hue 0, so callers pass one band near 0 and one near
/// 180; the selections are unioned.
#[must_use = "returns the red lesion mask"]
pub fn hue_mask(
    image: &RgbImage,
    bands: &[HueBand],
    min_saturation: u8,
    min_value: u8,
) -> BinaryMask {
    BinaryMask::from_fn(image.width(), image.height(), |x, y| {
        let hsv = Hsv::from_rgb(image.get_pixel(x, y).0);
        hsv.s >= min_saturation
            && hsv.v >= min_value
            && bands.iter().any(|band| band.contains(hsv.h))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED_BANDS: [HueBand; 2] = [HueBand::new(0, 10), HueBand::new(170, 180)];

    #[test]
    fn primaries() {
        assert_eq!(Hsv::from_rgb([255, 0, 0]), Hsv { h: 0, s: 255, v: 255 });
        assert_eq!(Hsv::from_rgb([0, 255, 0]), Hsv { h: 60, s: 255, v: 255 });
        assert_eq!(Hsv::from_rgb([0, 0, 255]), Hsv { h: 120, s: 255, v: 255 });
    }

    #[test]
    fn gray_has_zero_hue_and_saturation() {
        assert_eq!(Hsv::from_rgb([90, 90, 90]), Hsv { h: 0, s: 0, v: 90 });
        assert_eq!(Hsv::from_rgb([0, 0, 0]), Hsv { h: 0, s: 0, v: 0 });
    }

    #[test]
    fn magenta_leaning_red_wraps_to_high_hue() {
        // Blue slightly above green: hue just below 360 degrees.
        let hsv = Hsv::from_rgb([200, 0, 20]);
        assert!(hsv.h >= 170, "expected wrapped hue, got {}", hsv.h);
        assert_eq!(hsv.v, 200);
    }

    #[test]
    fn saturation_scales_with_chroma() {
        // chroma 100 of value 200 → half saturation.
        assert_eq!(Hsv::from_rgb([200, 100, 100]).s, 128);
    }

    #[test]
    fn band_bounds_are_inclusive() {
        let band = HueBand::new(170, 180);
        assert!(band.contains(170));
        assert!(band.contains(180));
        assert!(!band.contains(169));
    }

    #[test]
    fn hue_mask_selects_saturated_red_only() {
        let img = RgbImage::from_fn(4, 1, |x, _| match x {
            0 => image::Rgb([220, 10, 10]),   // saturated red
            1 => image::Rgb([220, 150, 150]), // pale red, low saturation
            2 => image::Rgb([60, 0, 0]),      // too dark
            _ => image::Rgb([10, 220, 10]),   // green
        });
        let mask = hue_mask(&img, &RED_BANDS, 120, 70);
        assert!(mask.is_set(0, 0));
        assert!(!mask.is_set(1, 0));
        assert!(!mask.is_set(2, 0));
        assert!(!mask.is_set(3, 0));
    }

    #[test]
    fn black_image_yields_empty_mask() {
        let img = RgbImage::new(16, 16);
        assert!(hue_mask(&img, &RED_BANDS, 120, 70).is_empty());
    }
}
