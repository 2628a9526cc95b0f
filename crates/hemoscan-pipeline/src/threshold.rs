//! Global and local (adaptive) thresholding.

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::contrast::ThresholdType;
use imageproc::integral_image::integral_image;

use crate::mask::BinaryMask;

/// Set every pixel strictly brighter than `threshold`.
#[must_use = "returns the binary mask"]
pub fn binary_threshold(image: &GrayImage, threshold: u8) -> BinaryMask {
    let thresholded = imageproc::contrast::threshold(image, threshold, ThresholdType::Binary);
    BinaryMask::from_nonzero(&thresholded)
}

/// Local mean thresholding.
///
/// For every pixel the arithmetic mean of the `block_size` x `block_size`
/// window centred on it is computed (the window is clipped at the image
/// border, and the mean is over the pixels that remain). The pixel is set
/// when `pixel - offset > mean`, compared exactly in integer arithmetic.
///
/// Strict comparison means a pixel equal to its local mean is never set,
/// and a uniform image always produces an empty mask for `offset >= 0`.
///
/// `block_size` should be odd; an even size behaves like the next odd
/// size down.
#[must_use = "returns the binary mask"]
pub fn local_mean_threshold(image: &GrayImage, block_size: u32, offset: i32) -> BinaryMask {
    let (w, h) = image.dimensions();
    let radius = block_size / 2;
    let integral: ImageBuffer<Luma<u64>, Vec<u64>> = integral_image::<_, u64>(image);

    // `integral` is (w + 1) x (h + 1); entry (x, y) holds the sum of all
    // pixels strictly above and to the left of (x, y).
    let window_sum = |x0: u32, y0: u32, x1: u32, y1: u32| -> i64 {
        let at = |x: u32, y: u32| {
            #[allow(clippy::cast_possible_wrap)]
            let v = integral.get_pixel(x, y).0[0] as i64;
            v
        };
        at(x1 + 1, y1 + 1) - at(x0, y1 + 1) - at(x1 + 1, y0) + at(x0, y0)
    };

    BinaryMask::from_fn(w, h, |x, y| {
        let x0 = x.saturating_sub(radius);
        let y0 = y.saturating_sub(radius);
        let x1 = (x + radius).min(w - 1);
        let y1 = (y + radius).min(h - 1);
        let count = i64::from(x1 - x0 + 1) * i64::from(y1 - y0 + 1);
        let sum = window_sum(x0, y0, x1, y1);
        let shifted = i64::from(image.get_pixel(x, y).0[0]) - i64::from(offset);
        shifted * count > sum
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_threshold_is_strict() {
        let img = GrayImage::from_fn(3, 1, |x, _| Luma([[19, 20, 21][x as usize]]));
        let mask = binary_threshold(&img, 20);
        assert!(!mask.is_set(0, 0));
        assert!(!mask.is_set(1, 0));
        assert!(mask.is_set(2, 0));
    }

    #[test]
    fn uniform_image_is_all_background() {
        let img = GrayImage::from_pixel(64, 64, Luma([128]));
        assert!(local_mean_threshold(&img, 51, 10).is_empty());
    }

    #[test]
    fn pixel_equal_to_local_mean_is_background_even_without_offset() {
        let img = GrayImage::from_pixel(9, 9, Luma([77]));
        assert!(local_mean_threshold(&img, 5, 0).is_empty());
    }

    #[test]
    fn margin_must_be_exceeded() {
        // 3x3 image, block covers everything. Centre 100, others 0:
        // mean = 100 / 9 ≈ 11.1. With offset 88, 100 - 88 = 12 > 11.1.
        // With offset 89, 11 < 11.1.
        let img = GrayImage::from_fn(3, 3, |x, y| Luma([if (x, y) == (1, 1) { 100 } else { 0 }]));
        assert!(local_mean_threshold(&img, 3, 88).is_set(1, 1));
        assert!(!local_mean_threshold(&img, 3, 89).is_set(1, 1));
    }

    #[test]
    fn bright_spot_on_dark_background_is_detected() {
        let img = GrayImage::from_fn(60, 60, |x, y| {
            let dx = i64::from(x) - 30;
            let dy = i64::from(y) - 30;
            Luma([if dx * dx + dy * dy <= 9 { 200 } else { 50 }])
        });
        let mask = local_mean_threshold(&img, 51, 10);
        assert!(mask.is_set(30, 30));
        assert!(!mask.is_set(5, 5));
        assert!(!mask.is_set(30, 40));
    }

    #[test]
    fn negative_offset_admits_pixels_below_mean() {
        let img = GrayImage::from_pixel(8, 8, Luma([50]));
        let mask = local_mean_threshold(&img, 3, -1);
        assert_eq!(mask.count(), 64);
    }

    #[test]
    fn window_is_clipped_at_borders() {
        // Bright left column. The clipped window at the corner covers
        // 2x2 pixels (mean 100) and at (0, 2) covers 2x3 (mean 100), so
        // both column pixels clear their mean. (1, 2) is dark.
        let img = GrayImage::from_fn(5, 5, |x, _| Luma([if x == 0 { 200 } else { 0 }]));
        let mask = local_mean_threshold(&img, 3, 0);
        assert!(mask.is_set(0, 0));
        assert!(mask.is_set(0, 2));
        assert!(!mask.is_set(1, 2));
    }
}
