//! Shared types for the hemoscan detection pipelines.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::mask::BinaryMask;

/// Re-export `GrayImage` so downstream crates can reference
/// single-channel intermediates without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage` so downstream crates can reference colour
/// rasters without depending on `image` directly.
pub use image::RgbImage;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Create a new dimension pair.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total pixel count (`width * height`).
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Returns `true` if either axis is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// An 8-bit raster with either one or three channels.
///
/// Colour rasters use the `image` crate's RGB channel order. Binary masks
/// are carried as [`RasterImage::Gray`] with values in `{0, 255}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RasterImage {
    /// Three-channel colour image.
    Color(RgbImage),
    /// Single-channel grayscale image or materialised mask.
    Gray(GrayImage),
}

impl RasterImage {
    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        match self {
            Self::Color(img) => img.width(),
            Self::Gray(img) => img.width(),
        }
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        match self {
            Self::Color(img) => img.height(),
            Self::Gray(img) => img.height(),
        }
    }

    /// Width and height as [`Dimensions`].
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width(), self.height())
    }

    /// Number of channels per pixel (1 or 3).
    #[must_use]
    pub const fn channel_count(&self) -> u8 {
        match self {
            Self::Color(_) => 3,
            Self::Gray(_) => 1,
        }
    }

    /// The colour raster, if this is a three-channel image.
    #[must_use]
    pub const fn as_color(&self) -> Option<&RgbImage> {
        match self {
            Self::Color(img) => Some(img),
            Self::Gray(_) => None,
        }
    }

    /// The grayscale raster, if this is a single-channel image.
    #[must_use]
    pub const fn as_gray(&self) -> Option<&GrayImage> {
        match self {
            Self::Color(_) => None,
            Self::Gray(img) => Some(img),
        }
    }

    /// Expand to RGB, replicating the gray value across channels when
    /// needed. Used by renderers that compose mixed stages.
    #[must_use]
    pub fn to_rgb(&self) -> RgbImage {
        match self {
            Self::Color(img) => img.clone(),
            Self::Gray(img) => RgbImage::from_fn(img.width(), img.height(), |x, y| {
                let v = img.get_pixel(x, y).0[0];
                image::Rgb([v, v, v])
            }),
        }
    }

    /// Validate that this raster is a non-empty colour image and return it.
    ///
    /// This is the single entry check both pipelines perform before any
    /// filter runs.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidInput`] if the raster has a zero
    /// dimension or is not three-channel.
    pub fn require_color(&self) -> Result<&RgbImage, PipelineError> {
        if self.dimensions().is_empty() {
            return Err(PipelineError::InvalidInput(format!(
                "raster is empty ({})",
                self.dimensions()
            )));
        }
        self.as_color().ok_or_else(|| {
            PipelineError::InvalidInput(format!(
                "expected 3 channels, got {}",
                self.channel_count()
            ))
        })
    }
}

impl From<RgbImage> for RasterImage {
    fn from(img: RgbImage) -> Self {
        Self::Color(img)
    }
}

impl From<GrayImage> for RasterImage {
    fn from(img: GrayImage) -> Self {
        Self::Gray(img)
    }
}

impl From<BinaryMask> for RasterImage {
    fn from(mask: BinaryMask) -> Self {
        Self::Gray(mask.into_gray())
    }
}

impl From<RasterImage> for image::DynamicImage {
    fn from(raster: RasterImage) -> Self {
        match raster {
            RasterImage::Color(img) => Self::ImageRgb8(img),
            RasterImage::Gray(img) => Self::ImageLuma8(img),
        }
    }
}

/// Serde-compatible proxy for [`RasterImage`].
///
/// `image::ImageBuffer` does not implement serde traits, so rasters are
/// represented as `(channels, width, height, raw_pixel_bytes)`.
#[derive(Serialize, Deserialize)]
struct RasterProxy(u8, u32, u32, Vec<u8>);

impl Serialize for RasterImage {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = match self {
            Self::Color(img) => RasterProxy(3, img.width(), img.height(), img.as_raw().clone()),
            Self::Gray(img) => RasterProxy(1, img.width(), img.height(), img.as_raw().clone()),
        };
        proxy.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RasterImage {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let RasterProxy(channels, width, height, raw) = RasterProxy::deserialize(deserializer)?;
        match channels {
            3 => RgbImage::from_raw(width, height, raw)
                .map(Self::Color)
                .ok_or_else(|| serde::de::Error::custom("invalid RGB image dimensions")),
            1 => GrayImage::from_raw(width, height, raw)
                .map(Self::Gray)
                .ok_or_else(|| serde::de::Error::custom("invalid grayscale image dimensions")),
            n => Err(serde::de::Error::custom(format!(
                "unsupported channel count {n}"
            ))),
        }
    }
}

/// Which of the two detection pipelines produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    /// Method 1: vessel enhancement intersected with red-hue lesions.
    Vessel,
    /// Method 2: green-channel contrast, background subtraction and
    /// local thresholding.
    Stepwise,
}

impl Method {
    /// Short machine-friendly name, used for output directory names.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Vessel => "vessel",
            Self::Stepwise => "stepwise",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vessel => f.write_str("Method 1: Vessel + Hemorrhage Detection"),
            Self::Stepwise => f.write_str("Method 2: Step-wise Hemorrhage Detection"),
        }
    }
}

/// One labelled image in a [`PipelineResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageImage {
    /// Stage label, e.g. `"hemorrhage_mask"`.
    pub label: String,
    /// The stage output.
    pub image: RasterImage,
}

/// The ordered, inspectable trace of one pipeline run.
///
/// Order matches the stage sequence. This is the only unit handed to the
/// rendering boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Which pipeline produced these stages.
    pub method: Method,
    stages: Vec<StageImage>,
}

impl PipelineResult {
    /// Create a result from labelled stages in pipeline order.
    #[must_use]
    pub fn new(method: Method, stages: Vec<(&str, RasterImage)>) -> Self {
        Self {
            method,
            stages: stages
                .into_iter()
                .map(|(label, image)| StageImage {
                    label: label.to_owned(),
                    image,
                })
                .collect(),
        }
    }

    /// Number of stages.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns `true` if there are no stages.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage labels in order.
    #[must_use]
    pub fn labels(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.label.as_str()).collect()
    }

    /// Look up a stage image by label.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&RasterImage> {
        self.stages
            .iter()
            .find(|s| s.label == label)
            .map(|s| &s.image)
    }

    /// All stages in order.
    #[must_use]
    pub fn stages(&self) -> &[StageImage] {
        &self.stages
    }

    /// Iterate over stages in order.
    pub fn iter(&self) -> std::slice::Iter<'_, StageImage> {
        self.stages.iter()
    }
}

impl<'a> IntoIterator for &'a PipelineResult {
    type Item = &'a StageImage;
    type IntoIter = std::slice::Iter<'a, StageImage>;

    fn into_iter(self) -> Self::IntoIter {
        self.stages.iter()
    }
}

/// Foreground statistics of a final detection mask.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaskSummary {
    /// Mask dimensions.
    pub dimensions: Dimensions,
    /// Number of set pixels.
    pub foreground_pixels: u64,
    /// `foreground_pixels / pixel_count`, or 0 for an empty raster.
    pub foreground_fraction: f64,
}

impl MaskSummary {
    /// Summarise a binary mask.
    #[must_use]
    pub fn of(mask: &BinaryMask) -> Self {
        let dimensions = mask.dimensions();
        let foreground_pixels = mask.count();
        let total = dimensions.pixel_count();
        #[allow(clippy::cast_precision_loss)]
        let foreground_fraction = if total == 0 {
            0.0
        } else {
            foreground_pixels as f64 / total as f64
        };
        Self {
            dimensions,
            foreground_pixels,
            foreground_fraction,
        }
    }
}

/// Errors that can occur during pipeline processing.
///
/// Degenerate outcomes (empty or uniform masks) are not errors; they are
/// returned as ordinary results.
///
/// Uses custom `Serialize`/`Deserialize` because `image::ImageError`
/// does not implement serde traits. The `ImageDecode` variant is
/// serialized as its `Display` string.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The input raster is zero-sized or has the wrong channel count.
    #[error("invalid input raster: {0}")]
    InvalidInput(String),

    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),
}

/// Serde-compatible proxy for `PipelineError`.
///
/// A deserialized `ImageDecode` becomes `InvalidInput` carrying the
/// original message, since the typed `image::ImageError` cannot be
/// reconstructed.
#[derive(Serialize, Deserialize)]
enum PipelineErrorProxy {
    ImageDecode(String),
    EmptyInput,
    InvalidInput(String),
    InvalidConfig(String),
}

impl Serialize for PipelineError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = match self {
            Self::ImageDecode(e) => PipelineErrorProxy::ImageDecode(e.to_string()),
            Self::EmptyInput => PipelineErrorProxy::EmptyInput,
            Self::InvalidInput(s) => PipelineErrorProxy::InvalidInput(s.clone()),
            Self::InvalidConfig(s) => PipelineErrorProxy::InvalidConfig(s.clone()),
        };
        proxy.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PipelineError {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let proxy = PipelineErrorProxy::deserialize(deserializer)?;
        Ok(match proxy {
            PipelineErrorProxy::ImageDecode(msg) => {
                Self::InvalidInput(format!("image decode error: {msg}"))
            }
            PipelineErrorProxy::EmptyInput => Self::EmptyInput,
            PipelineErrorProxy::InvalidInput(s) => Self::InvalidInput(s),
            PipelineErrorProxy::InvalidConfig(s) => Self::InvalidConfig(s),
        })
    }
}
