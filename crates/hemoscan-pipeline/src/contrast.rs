//! Point-wise intensity operations on grayscale images.

use image::{GrayImage, Luma};

/// Invert every pixel: `255 - v`.
#[must_use = "returns the complemented image"]
pub fn complement(image: &GrayImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([u8::MAX - image.get_pixel(x, y).0[0]])
    })
}

/// Per-pixel `a - b`, clamped at zero.
///
/// Both images must have the same dimensions; the result takes the
/// dimensions of `a` and reads `b` only inside its bounds.
#[must_use = "returns the difference image"]
pub fn saturating_subtract(a: &GrayImage, b: &GrayImage) -> GrayImage {
    debug_assert_eq!(a.dimensions(), b.dimensions());
    GrayImage::from_fn(a.width(), a.height(), |x, y| {
        let rhs = b.get_pixel_checked(x, y).map_or(0, |p| p.0[0]);
        Luma([a.get_pixel(x, y).0[0].saturating_sub(rhs)])
    })
}

/// Stretch the input range `low..=high` to the full `0..=255`.
///
/// Values below `low` become 0, values above `high` become 255, and
/// values in between map linearly (rounded down). `low` must be strictly
/// less than `high`.
#[must_use = "returns the rescaled image"]
pub fn rescale_intensity(image: &GrayImage, low: u8, high: u8) -> GrayImage {
    let span = u32::from(high.saturating_sub(low)).max(1);
    let lut: [u8; 256] = std::array::from_fn(|v| {
        #[allow(clippy::cast_possible_truncation)]
        let v = v as u8;
        let clipped = v.clamp(low, high.max(low));
        let scaled = u32::from(clipped - low) * 255 / span;
        #[allow(clippy::cast_possible_truncation)]
        let out = scaled.min(255) as u8;
        out
    });
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([lut[usize::from(image.get_pixel(x, y).0[0])]])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[u8]) -> GrayImage {
        #[allow(clippy::cast_possible_truncation)]
        let width = values.len() as u32;
        GrayImage::from_fn(width, 1, |x, _| Luma([values[x as usize]]))
    }

    #[test]
    fn complement_inverts() {
        let out = complement(&row(&[0, 100, 255]));
        assert_eq!(out.as_raw(), &vec![255, 155, 0]);
    }

    #[test]
    fn complement_twice_is_identity() {
        let img = row(&[3, 77, 200, 254]);
        assert_eq!(complement(&complement(&img)), img);
    }

    #[test]
    fn subtraction_saturates_at_zero() {
        let out = saturating_subtract(&row(&[10, 200, 50]), &row(&[20, 100, 50]));
        assert_eq!(out.as_raw(), &vec![0, 100, 0]);
    }

    #[test]
    fn rescale_clips_and_stretches() {
        let out = rescale_intensity(&row(&[0, 50, 125, 200, 255]), 50, 200);
        // (125 - 50) * 255 / 150 = 127.5, floored.
        assert_eq!(out.as_raw(), &vec![0, 0, 127, 255, 255]);
    }

    #[test]
    fn rescale_is_monotone() {
        let img = GrayImage::from_fn(256, 1, |x, _| {
            #[allow(clippy::cast_possible_truncation)]
            Luma([x as u8])
        });
        let out = rescale_intensity(&img, 50, 200);
        assert!(out.as_raw().windows(2).all(|w| w[0] <= w[1]));
    }
}
