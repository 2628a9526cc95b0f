//! Method 2: step-wise morphological detection on the green channel.
//!
//! The green channel carries most of the contrast between blood and the
//! retinal background. After resizing to the canonical grid it is
//! equalized with CLAHE and inverted so dark lesions become bright. An
//! elliptic opening estimates the background, which is subtracted twice
//! (before and after median smoothing). The result is stretched,
//! inverted again, thresholded against its local mean and closed.

use image::{GrayImage, RgbImage};

use crate::clahe::clahe;
use crate::config::StepwiseConfig;
use crate::contrast::{complement, rescale_intensity, saturating_subtract};
use crate::decode::extract_channel;
use crate::diagnostics::{Clock, PipelineDiagnostics, StageMetrics, StageRecorder, SystemClock};
use crate::mask::BinaryMask;
use crate::morphology::{close_mask, median, open};
use crate::resize::resize_to;
use crate::threshold::local_mean_threshold;
use crate::types::{MaskSummary, Method, PipelineError, PipelineResult, RasterImage};

/// Index of the green channel in an RGB pixel.
const GREEN: usize = 1;

/// Labels of the stages in the rendered [`PipelineResult`], in order.
pub const STAGE_LABELS: [&str; 6] = [
    "original_resized",
    "contrast_enhanced_green",
    "complemented",
    "intensity_adjusted",
    "binary_mask",
    "closed_mask",
];

/// Every intermediate produced by Method 2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepwiseStages {
    /// Input resized to the canonical size.
    pub original_resized: RgbImage,
    /// Green channel of the resized input.
    pub green: GrayImage,
    /// CLAHE-equalized green channel.
    pub contrast_enhanced_green: GrayImage,
    /// `255 - contrast_enhanced_green`.
    pub complemented: GrayImage,
    /// Background estimate: elliptic opening of `complemented`.
    pub opened: GrayImage,
    /// `complemented - opened`, saturating.
    pub subtracted: GrayImage,
    /// Median-smoothed `subtracted`.
    pub median: GrayImage,
    /// `median - opened`, saturating.
    pub final_subtracted: GrayImage,
    /// `final_subtracted` stretched from the rescale range to `0..=255`.
    pub intensity_adjusted: GrayImage,
    /// `255 - intensity_adjusted`.
    pub final_complement: GrayImage,
    /// Local mean threshold of `final_complement`.
    pub binary_mask: BinaryMask,
    /// Disk closing of `binary_mask`.
    pub closed_mask: BinaryMask,
}

impl StepwiseStages {
    /// Statistics of the closed mask.
    #[must_use]
    pub fn summary(&self) -> MaskSummary {
        MaskSummary::of(&self.closed_mask)
    }

    /// The ordered six-stage trace.
    #[must_use]
    pub fn into_pipeline_result(self) -> PipelineResult {
        let [resized, enhanced, complemented, adjusted, binary, closed] = STAGE_LABELS;
        PipelineResult::new(
            Method::Stepwise,
            vec![
                (resized, self.original_resized.into()),
                (enhanced, self.contrast_enhanced_green.into()),
                (complemented, self.complemented.into()),
                (adjusted, self.intensity_adjusted.into()),
                (binary, self.binary_mask.into()),
                (closed, self.closed_mask.into()),
            ],
        )
    }
}

/// Run Method 2 on a colour raster.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `config` fails
/// validation, or [`PipelineError::InvalidInput`] if `input` is empty or
/// not three-channel.
pub fn detect(
    input: &RasterImage,
    config: &StepwiseConfig,
) -> Result<StepwiseStages, PipelineError> {
    detect_with_diagnostics(input, config, &SystemClock).map(|(stages, _)| stages)
}

/// Run Method 2, timing every step with `clock`.
///
/// # Errors
///
/// Same as [`detect`].
pub fn detect_with_diagnostics<C: Clock>(
    input: &RasterImage,
    config: &StepwiseConfig,
    clock: &C,
) -> Result<(StepwiseStages, PipelineDiagnostics), PipelineError> {
    config.validate()?;
    let original = input.require_color()?;

    let mut rec = StageRecorder::start(clock, Method::Stepwise);

    let original_resized = rec.record(
        "resize",
        || resize_to(original, config.canonical_size, config.resize_filter),
        StageMetrics::color,
    );

    let green = rec.record(
        "green_channel",
        || extract_channel(&original_resized, GREEN),
        StageMetrics::gray,
    );

    let (tiles_x, tiles_y) = config.clahe_tiles;
    let contrast_enhanced_green = rec.record(
        "clahe",
        || clahe(&green, tiles_x, tiles_y, config.clahe_clip_limit),
        StageMetrics::gray,
    );

    let complemented = rec.record(
        "complement",
        || complement(&contrast_enhanced_green),
        StageMetrics::gray,
    );

    let opened = rec.record(
        "open",
        || open(&complemented, config.open_radius),
        StageMetrics::gray,
    );

    let subtracted = rec.record(
        "subtract_background",
        || saturating_subtract(&complemented, &opened),
        StageMetrics::gray,
    );

    let smoothed = rec.record(
        "median",
        || median(&subtracted, config.median_kernel),
        StageMetrics::gray,
    );

    let final_subtracted = rec.record(
        "subtract_background_again",
        || saturating_subtract(&smoothed, &opened),
        StageMetrics::gray,
    );

    let (low, high) = config.rescale_range;
    let intensity_adjusted = rec.record(
        "rescale_intensity",
        || rescale_intensity(&final_subtracted, low, high),
        StageMetrics::gray,
    );

    let final_complement = rec.record(
        "complement_again",
        || complement(&intensity_adjusted),
        StageMetrics::gray,
    );

    let binary_mask = rec.record(
        "adaptive_threshold",
        || local_mean_threshold(&final_complement, config.block_size, config.threshold_offset),
        StageMetrics::mask,
    );

    let closed_mask = rec.record(
        "close",
        || close_mask(&binary_mask, config.close_radius),
        StageMetrics::mask,
    );

    let stages = StepwiseStages {
        original_resized,
        green,
        contrast_enhanced_green,
        complemented,
        opened,
        subtracted,
        median: smoothed,
        final_subtracted,
        intensity_adjusted,
        final_complement,
        binary_mask,
        closed_mask,
    };
    let diagnostics = rec.finish(stages.summary());
    Ok((stages, diagnostics))
}
