//! hemoscan-pipeline: fundus hemorrhage detection (sans-IO).
//!
//! Two independent pipelines turn a colour fundus photograph into an
//! ordered trace of labelled stage images:
//!
//! - [`vessel`] (Method 1): grayscale -> Frangi vesselness -> threshold
//!   -> small-object removal, intersected with an HSV red-lesion mask and
//!   painted over the original.
//! - [`stepwise`] (Method 2): resize -> green channel -> CLAHE ->
//!   complement -> background subtraction -> rescale -> local mean
//!   threshold -> closing.
//!
//! This crate has **no I/O dependencies**. It operates on in-memory byte
//! slices and rasters and returns structured data; reading files and
//! writing PNGs lives in the `hemoscan` binary.

pub mod clahe;
pub mod color;
pub mod config;
pub mod contrast;
pub mod decode;
pub mod diagnostics;
pub mod mask;
pub mod morphology;
pub mod resize;
pub mod stepwise;
pub mod threshold;
pub mod types;
pub mod vessel;
pub mod vesselness;

pub use color::HueBand;
pub use config::{DetectionConfig, StepwiseConfig, VesselConfig};
pub use decode::decode;
pub use diagnostics::{Clock, PipelineDiagnostics, SystemClock};
pub use mask::BinaryMask;
pub use resize::ResizeFilter;
pub use stepwise::StepwiseStages;
pub use types::{
    Dimensions, MaskSummary, Method, PipelineError, PipelineResult, RasterImage, StageImage,
};
pub use vessel::VesselStages;

/// How [`detect_all_with`] schedules the two pipelines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Execution {
    /// Run both pipelines at once on two scoped threads.
    #[default]
    Concurrent,
    /// Run Method 1, then Method 2, on the calling thread.
    Sequential,
}

/// Output of both pipelines for one input.
#[derive(Debug, Clone)]
pub struct Detections {
    /// Method 1 stages.
    pub vessel: VesselStages,
    /// Method 1 timing.
    pub vessel_diagnostics: PipelineDiagnostics,
    /// Method 2 stages.
    pub stepwise: StepwiseStages,
    /// Method 2 timing.
    pub stepwise_diagnostics: PipelineDiagnostics,
}

impl Detections {
    /// Both rendered traces, Method 1 first.
    #[must_use]
    pub fn into_results(self) -> [PipelineResult; 2] {
        [
            self.vessel.into_pipeline_result(),
            self.stepwise.into_pipeline_result(),
        ]
    }
}

/// Run both pipelines concurrently with the system clock.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if either half of `config`
/// is invalid, or [`PipelineError::InvalidInput`] if `input` is empty or
/// not three-channel. Both are checked before any work starts, so no
/// partial results are produced.
pub fn detect_all(
    input: &RasterImage,
    config: &DetectionConfig,
) -> Result<Detections, PipelineError> {
    detect_all_with(input, config, Execution::Concurrent, &SystemClock)
}

/// Run both pipelines with the given scheduling and clock.
///
/// The pipelines share no state; concurrent and sequential execution
/// produce identical stage images.
///
/// # Errors
///
/// Same as [`detect_all`].
pub fn detect_all_with<C: Clock + Sync>(
    input: &RasterImage,
    config: &DetectionConfig,
    execution: Execution,
    clock: &C,
) -> Result<Detections, PipelineError> {
    config.validate()?;
    input.require_color()?;
    tracing::debug!(
        dimensions = %input.dimensions(),
        ?execution,
        "running both detection pipelines",
    );

    let (vessel, stepwise) = match execution {
        Execution::Sequential => (
            vessel::detect_with_diagnostics(input, &config.vessel, clock),
            stepwise::detect_with_diagnostics(input, &config.stepwise, clock),
        ),
        Execution::Concurrent => std::thread::scope(|scope| {
            let vessel = scope.spawn(|| vessel::detect_with_diagnostics(input, &config.vessel, clock));
            let stepwise = stepwise::detect_with_diagnostics(input, &config.stepwise, clock);
            let vessel = vessel
                .join()
                .unwrap_or_else(|payload| std::panic::resume_unwind(payload));
            (vessel, stepwise)
        }),
    };

    let (vessel, vessel_diagnostics) = vessel?;
    let (stepwise, stepwise_diagnostics) = stepwise?;
    Ok(Detections {
        vessel,
        vessel_diagnostics,
        stepwise,
        stepwise_diagnostics,
    })
}
