//! Tunable parameters for both detection pipelines.
//!
//! Every field has a default matching the published method, exposed as
//! a `DEFAULT_*` associated constant so the CLI and tests can refer to
//! it. Configs deserialize with missing fields filled from the defaults,
//! and [`VesselConfig::validate`] / [`StepwiseConfig::validate`] reject
//! values the filters cannot work with.

use serde::{Deserialize, Serialize};

use crate::color::{HueBand, MAX_HUE};
use crate::resize::ResizeFilter;
use crate::types::{Dimensions, PipelineError};

/// Configuration for Method 1 (vesselness + red lesion detection).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VesselConfig {
    /// Gaussian scales at which vesselness is evaluated.
    pub vesselness_sigmas: Vec<f32>,

    /// Frangi `beta`: sensitivity to blob-like versus line-like
    /// structure. Smaller values suppress blobs more strongly.
    pub vesselness_beta: f32,

    /// 8-bit vesselness response above which a pixel is a vessel.
    pub vessel_threshold: u8,

    /// Vessel components (4-connected) smaller than this are dropped.
    pub min_vessel_size: u32,

    /// Hue intervals (0..=180 convention) counted as red.
    pub red_hue_bands: Vec<HueBand>,

    /// Minimum HSV saturation for a red lesion pixel.
    pub min_saturation: u8,

    /// Minimum HSV value for a red lesion pixel.
    pub min_value: u8,

    /// Colour painted over hemorrhage pixels in the overlay.
    pub highlight_color: [u8; 3],
}

impl VesselConfig {
    /// Default vesselness scales.
    pub const DEFAULT_VESSELNESS_SIGMAS: [f32; 5] = [1.0, 3.0, 5.0, 7.0, 9.0];

    /// Default Frangi `beta`.
    pub const DEFAULT_VESSELNESS_BETA: f32 = 0.5;

    /// Default 8-bit vessel threshold.
    pub const DEFAULT_VESSEL_THRESHOLD: u8 = 20;

    /// Default minimum vessel component size in pixels.
    pub const DEFAULT_MIN_VESSEL_SIZE: u32 = 100;

    /// Default red hue bands: both ends of the hue circle.
    pub const DEFAULT_RED_HUE_BANDS: [HueBand; 2] = [HueBand::new(0, 10), HueBand::new(170, 180)];

    /// Default minimum saturation.
    pub const DEFAULT_MIN_SATURATION: u8 = 120;

    /// Default minimum value.
    pub const DEFAULT_MIN_VALUE: u8 = 70;

    /// Default highlight colour (pure red).
    pub const DEFAULT_HIGHLIGHT_COLOR: [u8; 3] = [255, 0, 0];

    /// Check that every parameter is usable.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] describing the first
    /// offending field.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.vesselness_sigmas.is_empty() {
            return Err(invalid("vesselness_sigmas must not be empty"));
        }
        if let Some(bad) = self
            .vesselness_sigmas
            .iter()
            .find(|s| !s.is_finite() || **s <= 0.0)
        {
            return Err(invalid(format!(
                "vesselness_sigmas must be positive, got {bad}"
            )));
        }
        if !self.vesselness_beta.is_finite() || self.vesselness_beta <= 0.0 {
            return Err(invalid(format!(
                "vesselness_beta must be positive, got {}",
                self.vesselness_beta
            )));
        }
        if self.red_hue_bands.is_empty() {
            return Err(invalid("red_hue_bands must not be empty"));
        }
        for band in &self.red_hue_bands {
            if band.low > band.high || band.high > MAX_HUE {
                return Err(invalid(format!(
                    "hue band {}..={} must satisfy low <= high <= {MAX_HUE}",
                    band.low, band.high
                )));
            }
        }
        Ok(())
    }
}

impl Default for VesselConfig {
    fn default() -> Self {
        Self {
            vesselness_sigmas: Self::DEFAULT_VESSELNESS_SIGMAS.to_vec(),
            vesselness_beta: Self::DEFAULT_VESSELNESS_BETA,
            vessel_threshold: Self::DEFAULT_VESSEL_THRESHOLD,
            min_vessel_size: Self::DEFAULT_MIN_VESSEL_SIZE,
            red_hue_bands: Self::DEFAULT_RED_HUE_BANDS.to_vec(),
            min_saturation: Self::DEFAULT_MIN_SATURATION,
            min_value: Self::DEFAULT_MIN_VALUE,
            highlight_color: Self::DEFAULT_HIGHLIGHT_COLOR,
        }
    }
}

/// Configuration for Method 2 (step-wise morphological detection).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepwiseConfig {
    /// Every input is resized to exactly this size first.
    pub canonical_size: Dimensions,

    /// Resampling filter for the initial resize.
    pub resize_filter: ResizeFilter,

    /// CLAHE tile grid as `(columns, rows)`.
    pub clahe_tiles: (u32, u32),

    /// CLAHE clip limit, relative to the mean histogram bin height.
    pub clahe_clip_limit: f32,

    /// Disk radius of the opening that estimates the background.
    pub open_radius: u8,

    /// Median filter window size (odd).
    pub median_kernel: u32,

    /// Input intensity range stretched to `0..=255`.
    pub rescale_range: (u8, u8),

    /// Adaptive threshold window size (odd, at least 3).
    pub block_size: u32,

    /// Margin a pixel must exceed its local mean by to be foreground.
    pub threshold_offset: i32,

    /// Disk radius of the final closing.
    pub close_radius: u8,
}

impl StepwiseConfig {
    /// Default working size.
    pub const DEFAULT_CANONICAL_SIZE: Dimensions = Dimensions {
        width: 512,
        height: 512,
    };

    /// Default resize filter (bilinear).
    pub const DEFAULT_RESIZE_FILTER: ResizeFilter = ResizeFilter::Triangle;

    /// Default CLAHE grid.
    pub const DEFAULT_CLAHE_TILES: (u32, u32) = (8, 8);

    /// Default CLAHE clip limit.
    pub const DEFAULT_CLAHE_CLIP_LIMIT: f32 = 2.0;

    /// Default opening radius (5x5 ellipse).
    pub const DEFAULT_OPEN_RADIUS: u8 = 2;

    /// Default median window.
    pub const DEFAULT_MEDIAN_KERNEL: u32 = 5;

    /// Default rescale input range.
    pub const DEFAULT_RESCALE_RANGE: (u8, u8) = (50, 200);

    /// Default adaptive threshold window.
    pub const DEFAULT_BLOCK_SIZE: u32 = 51;

    /// Default adaptive threshold offset.
    pub const DEFAULT_THRESHOLD_OFFSET: i32 = 10;

    /// Default closing radius (7x7 disk).
    pub const DEFAULT_CLOSE_RADIUS: u8 = 3;

    /// Check that every parameter is usable.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] describing the first
    /// offending field.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.canonical_size.is_empty() {
            return Err(invalid(format!(
                "canonical_size must be non-zero, got {}",
                self.canonical_size
            )));
        }
        let (tiles_x, tiles_y) = self.clahe_tiles;
        if tiles_x == 0 || tiles_y == 0 {
            return Err(invalid(format!(
                "clahe_tiles must be non-zero, got {tiles_x}x{tiles_y}"
            )));
        }
        if !self.clahe_clip_limit.is_finite() || self.clahe_clip_limit <= 0.0 {
            return Err(invalid(format!(
                "clahe_clip_limit must be positive, got {}",
                self.clahe_clip_limit
            )));
        }
        if self.median_kernel == 0 || self.median_kernel % 2 == 0 {
            return Err(invalid(format!(
                "median_kernel must be odd, got {}",
                self.median_kernel
            )));
        }
        let (low, high) = self.rescale_range;
        if low >= high {
            return Err(invalid(format!(
                "rescale_range must satisfy low < high, got ({low}, {high})"
            )));
        }
        if self.block_size < 3 || self.block_size % 2 == 0 {
            return Err(invalid(format!(
                "block_size must be odd and at least 3, got {}",
                self.block_size
            )));
        }
        Ok(())
    }
}

impl Default for StepwiseConfig {
    fn default() -> Self {
        Self {
            canonical_size: Self::DEFAULT_CANONICAL_SIZE,
            resize_filter: Self::DEFAULT_RESIZE_FILTER,
            clahe_tiles: Self::DEFAULT_CLAHE_TILES,
            clahe_clip_limit: Self::DEFAULT_CLAHE_CLIP_LIMIT,
            open_radius: Self::DEFAULT_OPEN_RADIUS,
            median_kernel: Self::DEFAULT_MEDIAN_KERNEL,
            rescale_range: Self::DEFAULT_RESCALE_RANGE,
            block_size: Self::DEFAULT_BLOCK_SIZE,
            threshold_offset: Self::DEFAULT_THRESHOLD_OFFSET,
            close_radius: Self::DEFAULT_CLOSE_RADIUS,
        }
    }
}

/// Configuration for both pipelines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Method 1 parameters.
    pub vessel: VesselConfig,
    /// Method 2 parameters.
    pub stepwise: StepwiseConfig,
}

impl DetectionConfig {
    /// Validate both halves.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] for the first invalid
    /// field found, checking the vessel settings first.
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.vessel.validate()?;
        self.stepwise.validate()
    }
}

fn invalid(message: impl Into<String>) -> PipelineError {
    PipelineError::InvalidConfig(message.into())
}
