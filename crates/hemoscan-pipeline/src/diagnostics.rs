//! Pipeline diagnostics: per-stage timing and mask statistics.
//!
//! Every `detect_with_diagnostics` call records one [`StageDiagnostics`]
//! per processing step alongside the stage images. The report is meant
//! for tuning thresholds and spotting slow stages on large fundus images.
//!
//! Time is read through the [`Clock`] trait so callers (and tests) can
//! supply their own source. [`SystemClock`] uses the `web-time` crate,
//! which falls back to `performance.now()` on WASM and
//! `std::time::Instant` on native.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::mask::BinaryMask;
use crate::types::{MaskSummary, Method};

/// Source of monotonic timestamps.
pub trait Clock {
    /// Opaque timestamp type.
    type Instant;

    /// Current timestamp.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// [`Clock`] backed by [`web_time::Instant`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Instant = web_time::Instant;

    fn now(&self) -> web_time::Instant {
        web_time::Instant::now()
    }

    fn elapsed(&self, since: &web_time::Instant) -> Duration {
        since.elapsed()
    }
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Which pipeline ran.
    pub method: Method,
    /// One entry per processing step, in execution order.
    pub stages: Vec<StageDiagnostics>,
    /// Total wall-clock duration of the run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Statistics of the final detection mask.
    pub summary: MaskSummary,
}

/// Diagnostics for a single processing step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Step name, e.g. `"vesselness"` or `"adaptive_threshold"`.
    pub label: String,
    /// Wall-clock duration of this step (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// What the step produced.
    pub metrics: StageMetrics,
}

/// Shape and content statistics of a step's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// A grayscale or colour image.
    Raster {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
        /// 1 for grayscale, 3 for colour.
        channels: u8,
    },
    /// A binary mask.
    Mask {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
        /// Number of set pixels.
        foreground_pixels: u64,
    },
}

impl StageMetrics {
    /// Metrics for a grayscale output.
    #[must_use]
    pub fn gray(image: &image::GrayImage) -> Self {
        Self::Raster {
            width: image.width(),
            height: image.height(),
            channels: 1,
        }
    }

    /// Metrics for a colour output.
    #[must_use]
    pub fn color(image: &image::RgbImage) -> Self {
        Self::Raster {
            width: image.width(),
            height: image.height(),
            channels: 3,
        }
    }

    /// Metrics for a mask output.
    #[must_use]
    pub fn mask(mask: &BinaryMask) -> Self {
        let dims = mask.dimensions();
        Self::Mask {
            width: dims.width,
            height: dims.height,
            foreground_pixels: mask.count(),
        }
    }
}

impl PipelineDiagnostics {
    /// Look up a step by label.
    #[must_use]
    pub fn stage(&self, label: &str) -> Option<&StageDiagnostics> {
        self.stages.iter().find(|s| s.label == label)
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("{}\n{}", self.method, "=".repeat(60)));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<26} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        for stage in &self.stages {
            let ms = duration_ms(stage.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&stage.metrics);
            lines.push(format!(
                "{:<26} {ms:>8.3}ms {pct:>9.1}%  {details}",
                stage.label
            ));
        }

        lines.push(String::new());
        lines.push(format!(
            "Final mask: {} set of {} pixels ({:.3}%)",
            self.summary.foreground_pixels,
            self.summary.dimensions.pixel_count(),
            self.summary.foreground_fraction * 100.0,
        ));

        lines.join("\n")
    }
}

/// Times each step of one pipeline run and logs it as it completes.
pub(crate) struct StageRecorder<'c, C: Clock> {
    clock: &'c C,
    method: Method,
    started: C::Instant,
    stages: Vec<StageDiagnostics>,
}

impl<'c, C: Clock> StageRecorder<'c, C> {
    pub(crate) fn start(clock: &'c C, method: Method) -> Self {
        Self {
            clock,
            method,
            started: clock.now(),
            stages: Vec::new(),
        }
    }

    /// Run `step`, recording its duration and the metrics of its output.
    pub(crate) fn record<T>(
        &mut self,
        label: &str,
        step: impl FnOnce() -> T,
        metrics: impl FnOnce(&T) -> StageMetrics,
    ) -> T {
        let t0 = self.clock.now();
        let output = step();
        let duration = self.clock.elapsed(&t0);
        let metrics = metrics(&output);
        tracing::debug!(
            method = self.method.slug(),
            stage = label,
            elapsed_ms = duration_ms(duration),
            details = %format_metrics(&metrics),
            "stage complete",
        );
        self.stages.push(StageDiagnostics {
            label: label.to_owned(),
            duration,
            metrics,
        });
        output
    }

    pub(crate) fn finish(self, summary: MaskSummary) -> PipelineDiagnostics {
        let total_duration = self.clock.elapsed(&self.started);
        tracing::info!(
            method = self.method.slug(),
            elapsed_ms = duration_ms(total_duration),
            foreground_pixels = summary.foreground_pixels,
            "pipeline complete",
        );
        PipelineDiagnostics {
            method: self.method,
            stages: self.stages,
            total_duration,
            summary,
        }
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Raster {
            width,
            height,
            channels,
        } => format!("{width}x{height}x{channels}"),
        StageMetrics::Mask {
            width,
            height,
            foreground_pixels,
        } => {
            let total = u64::from(*width) * u64::from(*height);
            #[allow(clippy::cast_precision_loss)]
            let density = if total > 0 {
                *foreground_pixels as f64 / total as f64 * 100.0
            } else {
                0.0
            };
            format!("{width}x{height} set={foreground_pixels} ({density:.2}%)")
        }
    }
}
