//! Integration tests: end-to-end behaviour of both detection pipelines on
//! synthetic fundus-like images.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use hemoscan_pipeline::threshold::local_mean_threshold;
use hemoscan_pipeline::{
    BinaryMask, DetectionConfig, Dimensions, Method, PipelineError, RasterImage, StepwiseConfig,
    VesselConfig, stepwise, vessel,
};
use image::{GrayImage, Luma, Rgb, RgbImage};

/// Pale fundus background with a dark red vessel running diagonally and
/// a saturated red blot, off the vessel, whose luminance matches the
/// background so it does not look like a vessel in grayscale.
fn synthetic_fundus() -> RgbImage {
    RgbImage::from_fn(96, 96, |x, y| {
        let on_vessel = x.abs_diff(y) <= 1;
        let blot = (70..80).contains(&x) && (10..20).contains(&y);
        if on_vessel {
            Rgb([140, 15, 10])
        } else if blot {
            Rgb([255, 125, 100])
        } else {
            Rgb([210, 150, 120])
        }
    })
}

fn color(img: RgbImage) -> RasterImage {
    RasterImage::Color(img)
}

#[test]
fn vessel_pipeline_stage_order() {
    let result = vessel::detect(&color(synthetic_fundus()), &VesselConfig::default())
        .unwrap()
        .into_pipeline_result();
    assert_eq!(result.method, Method::Vessel);
    assert_eq!(
        result.labels(),
        vec!["original", "hemorrhage_mask", "highlighted_overlay"]
    );
    assert_eq!(result.stages()[1].image.channel_count(), 1);
    assert_eq!(result.stages()[2].image.channel_count(), 3);
}

#[test]
fn stepwise_pipeline_stage_order() {
    let result = stepwise::detect(&color(synthetic_fundus()), &StepwiseConfig::default())
        .unwrap()
        .into_pipeline_result();
    assert_eq!(result.method, Method::Stepwise);
    assert_eq!(
        result.labels(),
        vec![
            "original_resized",
            "contrast_enhanced_green",
            "complemented",
            "intensity_adjusted",
            "binary_mask",
            "closed_mask",
        ]
    );
}

#[test]
fn repeated_runs_are_bit_identical() {
    let input = color(synthetic_fundus());
    let config = DetectionConfig::default();
    let first = hemoscan_pipeline::detect_all(&input, &config)
        .unwrap()
        .into_results();
    let second = hemoscan_pipeline::detect_all(&input, &config)
        .unwrap()
        .into_results();
    assert_eq!(first, second);
}

#[test]
fn hemorrhage_mask_is_subset_of_red_lesions() {
    let stages = vessel::detect(&color(synthetic_fundus()), &VesselConfig::default()).unwrap();
    assert!(stages.hemorrhage_mask.is_subset_of(&stages.red_lesion_mask));
    // The off-vessel blot is red but not a vessel.
    assert!(stages.red_lesion_mask.is_set(75, 15));
    assert!(!stages.hemorrhage_mask.is_set(75, 15));
}

#[test]
fn stepwise_output_is_canonical_size_for_any_input() {
    for (w, h) in [(100, 100), (512, 512), (2000, 1500)] {
        let input = color(RgbImage::from_pixel(w, h, Rgb([190, 100, 60])));
        let result = stepwise::detect(&input, &StepwiseConfig::default())
            .unwrap()
            .into_pipeline_result();
        let resized = result.get("original_resized").unwrap();
        assert_eq!(
            resized.dimensions(),
            Dimensions::new(512, 512),
            "input {w}x{h}"
        );
    }
}

#[test]
fn all_black_image_is_handled() {
    let input = color(RgbImage::new(100, 100));
    let vessel = vessel::detect(&input, &VesselConfig::default()).unwrap();
    assert!(vessel.red_lesion_mask.is_empty());
    assert!(vessel.hemorrhage_mask.is_empty());

    let stepwise = stepwise::detect(&input, &StepwiseConfig::default()).unwrap();
    assert_eq!(stepwise.into_pipeline_result().len(), 6);
}

#[test]
fn red_square_mask_matches_square_exactly() {
    let inside = |x: u32, y: u32| (40..60).contains(&x) && (40..60).contains(&y);
    let img = RgbImage::from_fn(100, 100, |x, y| {
        if inside(x, y) {
            Rgb([255, 0, 0])
        } else {
            Rgb([0, 0, 0])
        }
    });
    let stages = vessel::detect(&color(img), &VesselConfig::default()).unwrap();
    let expected = BinaryMask::from_fn(100, 100, inside);
    assert_eq!(stages.red_lesion_mask, expected);
}

#[test]
fn pixel_equal_to_local_mean_is_background() {
    // Checkerboard of 100 / 140 with one pixel forced to its window mean.
    let mut img = GrayImage::from_fn(21, 21, |x, y| {
        Luma([if (x + y) % 2 == 0 { 100 } else { 140 }])
    });
    img.put_pixel(10, 10, Luma([120]));
    let mask = local_mean_threshold(&img, 3, 0);
    // Window around (10, 10): four 140s, four 100s and the centre 120,
    // mean 120.
    assert!(!mask.is_set(10, 10));
}

#[test]
fn grayscale_input_is_invalid_for_both_pipelines() {
    let input = RasterImage::Gray(GrayImage::new(64, 64));
    assert!(matches!(
        vessel::detect(&input, &VesselConfig::default()),
        Err(PipelineError::InvalidInput(_))
    ));
    assert!(matches!(
        stepwise::detect(&input, &StepwiseConfig::default()),
        Err(PipelineError::InvalidInput(_))
    ));
}

#[test]
fn zero_sized_input_is_invalid() {
    let input = color(RgbImage::new(0, 0));
    let err = hemoscan_pipeline::detect_all(&input, &DetectionConfig::default()).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidInput(_)), "{err}");
}

#[test]
fn error_survives_json_boundary() {
    let err = hemoscan_pipeline::decode(&[]).unwrap_err();
    let json = serde_json::to_string(&err).unwrap();
    let back: PipelineError = serde_json::from_str(&json).unwrap();
    assert!(matches!(back, PipelineError::EmptyInput));
}

#[test]
fn stage_results_survive_json_boundary() {
    let result = vessel::detect(&color(synthetic_fundus()), &VesselConfig::default())
        .unwrap()
        .into_pipeline_result();
    let json = serde_json::to_string(&result).unwrap();
    let back: hemoscan_pipeline::PipelineResult = serde_json::from_str(&json).unwrap();
    assert_eq!(back, result);
}
