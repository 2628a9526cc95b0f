//! hemoscan: run the fundus hemorrhage detection pipelines from the
//! command line.
//!
//! Decodes one fundus photograph, runs Method 1 (vessel + red lesion),
//! Method 2 (step-wise morphology) or both, and writes every rendered
//! stage as a PNG plus a side-by-side comparison panel per method.
//! Per-stage timing is printed as a table or as JSON.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin hemoscan -- [OPTIONS] <IMAGE> --out <DIR>
//! ```
//!
//! Output layout:
//!
//! ```text
//! <DIR>/vessel/00_original.png
//! <DIR>/vessel/01_hemorrhage_mask.png
//! <DIR>/vessel/02_highlighted_overlay.png
//! <DIR>/vessel_panel.png
//! <DIR>/stepwise/00_original_resized.png
//! ...
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod panel;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use hemoscan_pipeline::{
    DetectionConfig, Dimensions, Execution, PipelineDiagnostics, PipelineResult, RasterImage,
    ResizeFilter, StepwiseConfig, SystemClock, VesselConfig, stepwise, vessel,
};
use image::RgbImage;

/// Detect candidate hemorrhage regions in a fundus photograph.
///
/// Runs one or both detection pipelines and writes every stage image to
/// the output directory.
#[derive(Parser)]
#[command(name = "hemoscan", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    #[arg(required_unless_present = "print_config")]
    image: Option<PathBuf>,

    /// Directory to write stage images and panels into.
    #[arg(long, short, required_unless_present = "print_config")]
    out: Option<PathBuf>,

    /// Which pipeline(s) to run.
    #[arg(long, value_enum, default_value_t = Which::Both)]
    method: Which,

    /// Run both pipelines one after the other instead of concurrently.
    #[arg(long)]
    sequential: bool,

    /// Print diagnostics as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,

    /// Skip writing the comparison panels.
    #[arg(long)]
    no_panel: bool,

    /// Show the raw red-lesion mask instead of the hemorrhage mask in the
    /// Method 1 panel.
    #[arg(long)]
    show_red_lesions: bool,

    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    print_config: bool,

    /// Full detection config as a JSON file.
    ///
    /// When provided, all other pipeline parameter flags are ignored.
    /// Missing fields take their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// 8-bit vesselness response above which a pixel is a vessel.
    #[arg(long, default_value_t = VesselConfig::DEFAULT_VESSEL_THRESHOLD)]
    vessel_threshold: u8,

    /// Vessel components smaller than this many pixels are dropped.
    #[arg(long, default_value_t = VesselConfig::DEFAULT_MIN_VESSEL_SIZE)]
    min_vessel_size: u32,

    /// Minimum HSV saturation of a red lesion pixel.
    #[arg(long, default_value_t = VesselConfig::DEFAULT_MIN_SATURATION)]
    min_saturation: u8,

    /// Minimum HSV value of a red lesion pixel.
    #[arg(long, default_value_t = VesselConfig::DEFAULT_MIN_VALUE)]
    min_value: u8,

    /// Side length of the square working grid for Method 2.
    #[arg(long, default_value_t = StepwiseConfig::DEFAULT_CANONICAL_SIZE.width, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    canonical_size: u32,

    /// Resize filter for Method 2 (nearest, triangle, catmull-rom, gaussian, lanczos3).
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_FILTER)]
    resize_filter: Filter,

    /// CLAHE clip limit.
    #[arg(long, default_value_t = StepwiseConfig::DEFAULT_CLAHE_CLIP_LIMIT)]
    clahe_clip_limit: f32,

    /// Adaptive threshold window size (odd, at least 3).
    #[arg(long, default_value_t = StepwiseConfig::DEFAULT_BLOCK_SIZE)]
    block_size: u32,

    /// Margin a pixel must exceed its local mean by to be foreground.
    #[arg(long, default_value_t = StepwiseConfig::DEFAULT_THRESHOLD_OFFSET, allow_negative_numbers = true)]
    threshold_offset: i32,
}

/// Pipeline selection.
#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Which {
    /// Method 1 only.
    Vessel,
    /// Method 2 only.
    Stepwise,
    /// Both methods.
    Both,
}

/// Resize filter selection.
#[derive(Clone, Copy, ValueEnum)]
enum Filter {
    /// Nearest-neighbor (fastest, blocky).
    Nearest,
    /// Bilinear interpolation.
    Triangle,
    /// Bicubic Catmull-Rom.
    CatmullRom,
    /// Gaussian (smooth).
    Gaussian,
    /// Lanczos with 3 lobes (slowest, sharpest).
    Lanczos3,
}

/// Maps a [`ResizeFilter`] to the local CLI [`Filter`] enum.
const fn filter_from_pipeline(f: ResizeFilter) -> Filter {
    match f {
        ResizeFilter::Nearest => Filter::Nearest,
        ResizeFilter::Triangle => Filter::Triangle,
        ResizeFilter::CatmullRom => Filter::CatmullRom,
        ResizeFilter::Gaussian => Filter::Gaussian,
        ResizeFilter::Lanczos3 => Filter::Lanczos3,
    }
}

const fn filter_to_pipeline(f: Filter) -> ResizeFilter {
    match f {
        Filter::Nearest => ResizeFilter::Nearest,
        Filter::Triangle => ResizeFilter::Triangle,
        Filter::CatmullRom => ResizeFilter::CatmullRom,
        Filter::Gaussian => ResizeFilter::Gaussian,
        Filter::Lanczos3 => ResizeFilter::Lanczos3,
    }
}

/// The CLI default filter, derived from
/// [`StepwiseConfig::DEFAULT_RESIZE_FILTER`] so the two cannot silently
/// diverge.
const CLI_DEFAULT_FILTER: Filter = filter_from_pipeline(StepwiseConfig::DEFAULT_RESIZE_FILTER);

/// Build a [`DetectionConfig`] from CLI arguments.
///
/// If `--config` is provided, the file is parsed directly and all
/// individual parameter flags are ignored. Otherwise, a config is
/// assembled from the individual flags.
fn config_from_cli(cli: &Cli) -> Result<DetectionConfig, String> {
    if let Some(ref path) = cli.config {
        let json = std::fs::read_to_string(path)
            .map_err(|e| format!("Error reading {}: {e}", path.display()))?;
        return serde_json::from_str(&json)
            .map_err(|e| format!("Error parsing {}: {e}", path.display()));
    }

    Ok(DetectionConfig {
        vessel: VesselConfig {
            vessel_threshold: cli.vessel_threshold,
            min_vessel_size: cli.min_vessel_size,
            min_saturation: cli.min_saturation,
            min_value: cli.min_value,
            ..VesselConfig::default()
        },
        stepwise: StepwiseConfig {
            canonical_size: Dimensions::new(cli.canonical_size, cli.canonical_size),
            resize_filter: filter_to_pipeline(cli.resize_filter),
            clahe_clip_limit: cli.clahe_clip_limit,
            block_size: cli.block_size,
            threshold_offset: cli.threshold_offset,
            ..StepwiseConfig::default()
        },
    })
}

/// One method's rendered output, ready to be written.
struct MethodOutput {
    result: PipelineResult,
    diagnostics: PipelineDiagnostics,
    panel_tiles: Vec<RgbImage>,
}

fn vessel_output(
    stages: vessel::VesselStages,
    diagnostics: PipelineDiagnostics,
    show_red_lesions: bool,
) -> MethodOutput {
    let red_lesions = show_red_lesions.then(|| RasterImage::from(stages.red_lesion_mask.clone()));
    let result = stages.into_pipeline_result();
    let mut panel_tiles = panel::tiles(&result);
    if let Some(ref red) = red_lesions {
        panel_tiles = panel::with_tile(panel_tiles, 1, red);
    }
    MethodOutput {
        result,
        diagnostics,
        panel_tiles,
    }
}

fn stepwise_output(
    stages: stepwise::StepwiseStages,
    diagnostics: PipelineDiagnostics,
) -> MethodOutput {
    let result = stages.into_pipeline_result();
    let panel_tiles = panel::tiles(&result);
    MethodOutput {
        result,
        diagnostics,
        panel_tiles,
    }
}

/// Run the selected pipelines on `input`.
fn run_pipelines(
    cli: &Cli,
    input: &RasterImage,
    config: &DetectionConfig,
) -> Result<Vec<MethodOutput>, String> {
    let fail = |e: hemoscan_pipeline::PipelineError| format!("Pipeline error: {e}");
    match cli.method {
        Which::Vessel => {
            let (stages, diag) =
                vessel::detect_with_diagnostics(input, &config.vessel, &SystemClock).map_err(fail)?;
            Ok(vec![vessel_output(stages, diag, cli.show_red_lesions)])
        }
        Which::Stepwise => {
            let (stages, diag) =
                stepwise::detect_with_diagnostics(input, &config.stepwise, &SystemClock)
                    .map_err(fail)?;
            Ok(vec![stepwise_output(stages, diag)])
        }
        Which::Both => {
            let execution = if cli.sequential {
                Execution::Sequential
            } else {
                Execution::Concurrent
            };
            let detections =
                hemoscan_pipeline::detect_all_with(input, config, execution, &SystemClock)
                    .map_err(fail)?;
            Ok(vec![
                vessel_output(
                    detections.vessel,
                    detections.vessel_diagnostics,
                    cli.show_red_lesions,
                ),
                stepwise_output(detections.stepwise, detections.stepwise_diagnostics),
            ])
        }
    }
}

/// Write every stage as `<out>/<method>/<NN>_<label>.png` and, unless
/// disabled, the panel as `<out>/<method>_panel.png`.
fn write_output(out: &Path, output: &MethodOutput, with_panel: bool) -> Result<(), String> {
    let slug = output.result.method.slug();
    let dir = out.join(slug);
    std::fs::create_dir_all(&dir)
        .map_err(|e| format!("Error creating {}: {e}", dir.display()))?;

    for (index, stage) in output.result.iter().enumerate() {
        let path = dir.join(format!("{index:02}_{}.png", stage.label));
        image::DynamicImage::from(stage.image.clone())
            .save(&path)
            .map_err(|e| format!("Error writing {}: {e}", path.display()))?;
        tracing::debug!(path = %path.display(), "wrote stage image");
    }

    if with_panel {
        let path = out.join(format!("{slug}_panel.png"));
        panel::compose(&output.panel_tiles)
            .save(&path)
            .map_err(|e| format!("Error writing {}: {e}", path.display()))?;
        tracing::info!(path = %path.display(), "wrote comparison panel");
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<(), String> {
    let config = config_from_cli(cli)?;

    if cli.print_config {
        let json = serde_json::to_string_pretty(&config)
            .map_err(|e| format!("Error serializing config: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    let (Some(image_path), Some(out)) = (&cli.image, &cli.out) else {
        return Err("An input image and --out directory are required".to_owned());
    };

    let bytes = std::fs::read(image_path)
        .map_err(|e| format!("Error reading {}: {e}", image_path.display()))?;
    tracing::info!(
        path = %image_path.display(),
        bytes = bytes.len(),
        "loaded input image",
    );

    let input = hemoscan_pipeline::decode(&bytes).map_err(|e| format!("Pipeline error: {e}"))?;
    let outputs = run_pipelines(cli, &input, &config)?;

    for output in &outputs {
        write_output(out, output, !cli.no_panel)?;
    }

    if cli.json {
        let diagnostics: Vec<&PipelineDiagnostics> =
            outputs.iter().map(|o| &o.diagnostics).collect();
        let json = serde_json::to_string_pretty(&diagnostics)
            .map_err(|e| format!("Error serializing diagnostics: {e}"))?;
        println!("{json}");
    } else {
        for output in &outputs {
            println!("{}\n", output.diagnostics.report());
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}
