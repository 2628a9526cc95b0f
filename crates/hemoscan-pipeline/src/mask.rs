//! Binary masks and the operations that combine them.
//!
//! A [`BinaryMask`] is a single-channel raster whose pixels are either
//! 0 (unset) or 255 (set). Detection steps produce masks; this module
//! combines them (AND / OR), removes small connected components, and
//! paints a mask onto a colour image as a highlight overlay.

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::region_labelling::{Connectivity, connected_components};

use crate::types::Dimensions;

/// Value of a set mask pixel.
pub const SET: u8 = 255;

/// Value of an unset mask pixel.
pub const UNSET: u8 = 0;

/// A single-channel mask with every pixel in `{0, 255}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask(GrayImage);

impl BinaryMask {
    /// An all-unset mask.
    #[must_use]
    pub fn empty(width: u32, height: u32) -> Self {
        Self(GrayImage::new(width, height))
    }

    /// Build a mask by evaluating `f` at every pixel.
    #[must_use]
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        Self(GrayImage::from_fn(width, height, |x, y| {
            Luma([if f(x, y) { SET } else { UNSET }])
        }))
    }

    /// Treat every non-zero pixel of `image` as set.
    #[must_use]
    pub fn from_nonzero(image: &GrayImage) -> Self {
        Self::from_fn(image.width(), image.height(), |x, y| {
            image.get_pixel(x, y).0[0] != 0
        })
    }

    /// Mask dimensions.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.0.width(), self.0.height())
    }

    /// Whether the pixel at `(x, y)` is set.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds.
    #[must_use]
    pub fn is_set(&self, x: u32, y: u32) -> bool {
        self.0.get_pixel(x, y).0[0] == SET
    }

    /// Number of set pixels.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.0
            .pixels()
            .map(|p| u64::from(u8::from(p.0[0] == SET)))
            .sum()
    }

    /// Returns `true` if no pixel is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.pixels().all(|p| p.0[0] == UNSET)
    }

    /// Returns `true` if every set pixel of `self` is also set in `other`.
    ///
    /// Masks of different dimensions are never subsets of each other.
    #[must_use]
    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.dimensions() == other.dimensions()
            && self
                .0
                .pixels()
                .zip(other.0.pixels())
                .all(|(a, b)| a.0[0] == UNSET || b.0[0] == SET)
    }

    /// Pixel-wise logical AND.
    ///
    /// Pixels outside the overlap of the two masks are unset.
    #[must_use]
    pub fn and(&self, other: &Self) -> Self {
        self.combine(other, |a, b| a && b)
    }

    /// Pixel-wise logical OR.
    #[must_use]
    pub fn or(&self, other: &Self) -> Self {
        self.combine(other, |a, b| a || b)
    }

    fn combine(&self, other: &Self, op: impl Fn(bool, bool) -> bool) -> Self {
        let width = self.0.width().min(other.0.width());
        let height = self.0.height().min(other.0.height());
        Self::from_fn(self.0.width(), self.0.height(), |x, y| {
            x < width && y < height && op(self.is_set(x, y), other.is_set(x, y))
        })
    }

    /// Borrow the mask as a grayscale image.
    #[must_use]
    pub const fn as_gray(&self) -> &GrayImage {
        &self.0
    }

    /// Consume the mask, returning the underlying grayscale image.
    #[must_use]
    pub fn into_gray(self) -> GrayImage {
        self.0
    }
}

/// Unset every 4-connected component with fewer than `min_size` pixels.
///
/// Components of exactly `min_size` pixels are kept.
#[must_use = "returns the filtered mask"]
pub fn remove_small_objects(mask: &BinaryMask, min_size: u32) -> BinaryMask {
    if min_size <= 1 {
        return mask.clone();
    }

    let labels = connected_components(mask.as_gray(), Connectivity::Four, Luma([UNSET]));
    let max_label = labels.pixels().map(|p| p.0[0]).max().unwrap_or(0);

    let mut sizes = vec![0_u32; max_label as usize + 1];
    for p in labels.pixels() {
        sizes[p.0[0] as usize] += 1;
    }

    BinaryMask::from_fn(labels.width(), labels.height(), |x, y| {
        let label = labels.get_pixel(x, y).0[0];
        label != 0 && sizes[label as usize] >= min_size
    })
}

/// Copy `image` and paint every pixel set in `mask` with `color`.
///
/// Pixels outside the mask are left untouched.
#[must_use = "returns the highlighted image"]
pub fn highlight(image: &RgbImage, mask: &BinaryMask, color: [u8; 3]) -> RgbImage {
    let mut out = image.clone();
    let (w, h) = (
        image.width().min(mask.as_gray().width()),
        image.height().min(mask.as_gray().height()),
    );
    for y in 0..h {
        for x in 0..w {
            if mask.is_set(x, y) {
                out.put_pixel(x, y, Rgb(color));
            }
        }
    }
    out
}
