//! Ellipse- and disk-shaped morphology and median smoothing.
//!
//! Thin wrappers over [`imageproc::morphology`] and
//! [`imageproc::filter::median_filter`] that take the radii and kernel
//! sizes used in the configuration.

use image::{GrayImage, Luma};
use imageproc::morphology::Mask;

use crate::mask::BinaryMask;

/// Elliptic structuring element inscribed in a `(2r+1)` square.
///
/// Row `dy` spans `round(sqrt(r^2 - dy^2))` pixels either side of the
/// centre, so radius 2 is the 21-pixel 5x5 ellipse
/// (`00100/11111/11111/11111/00100`) rather than the 13-pixel diamond
/// [`Mask::disk`] produces.
#[must_use]
pub fn ellipse(radius: u8) -> Mask {
    let r = i32::from(radius);
    let side = 2 * u32::from(radius) + 1;
    let footprint = GrayImage::from_fn(side, side, |x, y| {
        #[allow(clippy::cast_possible_wrap)]
        let (dx, dy) = ((x as i32 - r).abs(), (y as i32 - r).abs());
        let half_width = f64::from(r * r - dy * dy).sqrt().round();
        Luma([if f64::from(dx) <= half_width { 255 } else { 0 }])
    });
    Mask::from_image(&footprint, radius, radius)
}

/// Grayscale opening (erosion then dilation) with an [`ellipse`] of
/// `radius`.
///
/// Removes bright details smaller than the ellipse. Radius 0 is the
/// identity.
#[must_use = "returns the opened image"]
pub fn open(image: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return image.clone();
    }
    imageproc::morphology::grayscale_open(image, &ellipse(radius))
}

/// Binary closing (dilation then erosion) with a disk of `radius`.
///
/// Fills holes and gaps narrower than the disk. Radius 0 is the
/// identity.
#[must_use = "returns the closed mask"]
pub fn close_mask(mask: &BinaryMask, radius: u8) -> BinaryMask {
    if radius == 0 {
        return mask.clone();
    }
    let closed = imageproc::morphology::grayscale_close(mask.as_gray(), &Mask::disk(radius));
    BinaryMask::from_nonzero(&closed)
}

/// Median filter over a `kernel` x `kernel` window.
///
/// `kernel` should be odd; it is rounded down to the nearest odd size.
/// Kernels of 1 or less return the image unchanged.
#[must_use = "returns the smoothed image"]
pub fn median(image: &GrayImage, kernel: u32) -> GrayImage {
    let radius = kernel / 2;
    if radius == 0 {
        return image.clone();
    }
    imageproc::filter::median_filter(image, radius, radius)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Footprint of `mask` as rows of 0/1, recovered by dilating a
    /// single bright pixel.
    fn footprint(mask: &Mask, radius: u32) -> Vec<Vec<u8>> {
        let side = 2 * radius + 1;
        let mut dot = GrayImage::new(side, side);
        dot.put_pixel(radius, radius, Luma([255]));
        let dilated = imageproc::morphology::grayscale_dilate(&dot, mask);
        (0..side)
            .map(|y| (0..side).map(|x| u8::from(dilated.get_pixel(x, y).0[0] > 0)).collect())
            .collect()
    }

    #[test]
    fn ellipse_radius_two_is_the_5x5_ellipse() {
        let rows = footprint(&ellipse(2), 2);
        assert_eq!(
            rows,
            vec![
                vec![0, 0, 1, 0, 0],
                vec![1, 1, 1, 1, 1],
                vec![1, 1, 1, 1, 1],
                vec![1, 1, 1, 1, 1],
                vec![0, 0, 1, 0, 0],
            ]
        );
        let area: u32 = rows.iter().flatten().map(|&v| u32::from(v)).sum();
        assert_eq!(area, 21);
    }

    #[test]
    fn ellipse_radius_zero_is_single_pixel() {
        assert_eq!(
            footprint(&ellipse(0), 1),
            vec![vec![0, 0, 0], vec![0, 1, 0], vec![0, 0, 0]]
        );
    }

    #[test]
    fn opening_removes_diamond_smaller_than_ellipse() {
        // A radius-2 diamond of bright pixels: the ellipse does not fit
        // inside it, so nothing survives the erosion.
        let img = GrayImage::from_fn(20, 20, |x, y| {
            Luma([if x.abs_diff(10) + y.abs_diff(10) <= 2 { 200 } else { 30 }])
        });
        let opened = open(&img, 2);
        assert!(opened.pixels().all(|p| p.0[0] == 30));
    }

    /// Dark 20x20 image with a single bright pixel at (10, 10).
    fn speck() -> GrayImage {
        GrayImage::from_fn(20, 20, |x, y| {
            Luma([if (x, y) == (10, 10) { 255 } else { 30 }])
        })
    }

    #[test]
    fn opening_removes_small_bright_detail() {
        let opened = open(&speck(), 2);
        assert!(opened.pixels().all(|p| p.0[0] == 30));
    }

    #[test]
    fn opening_keeps_large_bright_region() {
        let img = GrayImage::from_fn(30, 30, |x, y| {
            Luma([if (5..25).contains(&x) && (5..25).contains(&y) { 200 } else { 10 }])
        });
        let opened = open(&img, 2);
        assert_eq!(opened.get_pixel(15, 15).0[0], 200);
        assert_eq!(opened.get_pixel(0, 0).0[0], 10);
    }

    #[test]
    fn opening_never_brightens() {
        let img = speck();
        let opened = open(&img, 3);
        assert!(opened.pixels().zip(img.pixels()).all(|(o, i)| o.0[0] <= i.0[0]));
    }

    #[test]
    fn closing_fills_small_hole() {
        let mask = BinaryMask::from_fn(20, 20, |x, y| {
            (3..17).contains(&x) && (3..17).contains(&y) && (x, y) != (10, 10)
        });
        let closed = close_mask(&mask, 3);
        assert!(closed.is_set(10, 10));
        assert!(mask.is_subset_of(&closed));
    }

    #[test]
    fn closing_empty_mask_stays_empty() {
        let mask = BinaryMask::empty(16, 16);
        assert!(close_mask(&mask, 3).is_empty());
    }

    #[test]
    fn zero_radius_is_identity() {
        let img = speck();
        assert_eq!(open(&img, 0), img);
    }

    #[test]
    fn median_removes_salt_noise() {
        let smoothed = median(&speck(), 5);
        assert_eq!(smoothed.get_pixel(10, 10).0[0], 30);
    }

    #[test]
    fn median_kernel_one_is_identity() {
        let img = speck();
        assert_eq!(median(&img, 1), img);
    }
}
