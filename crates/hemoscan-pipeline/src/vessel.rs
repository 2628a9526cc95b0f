//! Method 1: vessel enhancement intersected with red lesions.
//!
//! ```text
//! colour ─► grayscale ─► vesselness ─► threshold ─► remove small ─┐
//!    │                                                            AND ─► hemorrhage mask ─► overlay
//!    └────► HSV red bands ───────────────────────────────────────┘
//! ```
//!
//! A pixel is reported as a hemorrhage candidate only when it lies on an
//! enhanced vessel *and* has a saturated red hue.

use image::{GrayImage, RgbImage};

use crate::color::hue_mask;
use crate::config::VesselConfig;
use crate::decode::to_grayscale;
use crate::diagnostics::{Clock, PipelineDiagnostics, StageMetrics, StageRecorder, SystemClock};
use crate::mask::{BinaryMask, highlight, remove_small_objects};
use crate::threshold::binary_threshold;
use crate::types::{MaskSummary, Method, PipelineError, PipelineResult, RasterImage};
use crate::vesselness::{frangi, response_to_gray};

/// Labels of the stages in the rendered [`PipelineResult`], in order.
pub const STAGE_LABELS: [&str; 3] = ["original", "hemorrhage_mask", "highlighted_overlay"];

/// Every intermediate produced by Method 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VesselStages {
    /// The input colour image.
    pub original: RgbImage,
    /// Luminance-weighted grayscale.
    pub grayscale: GrayImage,
    /// 8-bit vesselness response.
    pub vesselness: GrayImage,
    /// Thresholded vessels with small components removed.
    pub vessel_mask: BinaryMask,
    /// Pixels in the red hue bands with enough saturation and value.
    pub red_lesion_mask: BinaryMask,
    /// `vessel_mask AND red_lesion_mask`.
    pub hemorrhage_mask: BinaryMask,
    /// The original with hemorrhage pixels painted in the highlight colour.
    pub overlay: RgbImage,
}

impl VesselStages {
    /// Statistics of the hemorrhage mask.
    #[must_use]
    pub fn summary(&self) -> MaskSummary {
        MaskSummary::of(&self.hemorrhage_mask)
    }

    /// The ordered `original, hemorrhage_mask, highlighted_overlay` trace.
    #[must_use]
    pub fn into_pipeline_result(self) -> PipelineResult {
        let [original, hemorrhage, overlay] = STAGE_LABELS;
        PipelineResult::new(
            Method::Vessel,
            vec![
                (original, self.original.into()),
                (hemorrhage, self.hemorrhage_mask.into()),
                (overlay, self.overlay.into()),
            ],
        )
    }
}

/// Run Method 1 on a colour raster.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if `config` fails
/// validation, or [`PipelineError::InvalidInput`] if `input` is empty or
/// not three-channel.
pub fn detect(input: &RasterImage, config: &VesselConfig) -> Result<VesselStages, PipelineError> {
    detect_with_diagnostics(input, config, &SystemClock).map(|(stages, _)| stages)
}

/// Run Method 1, timing every step with `clock`.
///
/// # Errors
///
/// Same as [`detect`].
pub fn detect_with_diagnostics<C: Clock>(
    input: &RasterImage,
    config: &VesselConfig,
    clock: &C,
) -> Result<(VesselStages, PipelineDiagnostics), PipelineError> {
    config.validate()?;
    let original = input.require_color()?;

    let mut rec = StageRecorder::start(clock, Method::Vessel);

    let grayscale = rec.record("grayscale", || to_grayscale(original), StageMetrics::gray);

    let vesselness = rec.record(
        "vesselness",
        || {
            let response = frangi(
                &grayscale,
                &config.vesselness_sigmas,
                config.vesselness_beta,
            );
            response_to_gray(&response)
        },
        StageMetrics::gray,
    );

    let thresholded = rec.record(
        "vessel_threshold",
        || binary_threshold(&vesselness, config.vessel_threshold),
        StageMetrics::mask,
    );

    let vessel_mask = rec.record(
        "remove_small_objects",
        || remove_small_objects(&thresholded, config.min_vessel_size),
        StageMetrics::mask,
    );

    let red_lesion_mask = rec.record(
        "red_lesions",
        || {
            hue_mask(
                original,
                &config.red_hue_bands,
                config.min_saturation,
                config.min_value,
            )
        },
        StageMetrics::mask,
    );

    let hemorrhage_mask = rec.record(
        "hemorrhage_mask",
        || vessel_mask.and(&red_lesion_mask),
        StageMetrics::mask,
    );

    let overlay = rec.record(
        "overlay",
        || highlight(original, &hemorrhage_mask, config.highlight_color),
        StageMetrics::color,
    );

    let stages = VesselStages {
        original: original.clone(),
        grayscale,
        vesselness,
        vessel_mask,
        red_lesion_mask,
        hemorrhage_mask,
        overlay,
    };
    let diagnostics = rec.finish(stages.summary());
    Ok((stages, diagnostics))
}
