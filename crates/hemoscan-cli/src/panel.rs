//! Side-by-side comparison panels.
//!
//! Lays the stage images of one pipeline out in a single row on a white
//! background, so a run can be reviewed at a glance. Every tile is scaled
//! to the height of the tallest one; grayscale stages are expanded to RGB.

use hemoscan_pipeline::{PipelineResult, RasterImage};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

/// Space between tiles and around the panel edge, in pixels.
pub const GUTTER: u32 = 8;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// The stage images of `result`, in order, as RGB tiles.
#[must_use]
pub fn tiles(result: &PipelineResult) -> Vec<RgbImage> {
    result.iter().map(|stage| stage.image.to_rgb()).collect()
}

/// Replace the tile at `index` with `replacement`, if it exists.
#[must_use]
pub fn with_tile(
    mut tiles: Vec<RgbImage>,
    index: usize,
    replacement: &RasterImage,
) -> Vec<RgbImage> {
    if let Some(slot) = tiles.get_mut(index) {
        *slot = replacement.to_rgb();
    }
    tiles
}

/// Compose `tiles` into one row.
#[must_use = "returns the composed panel"]
pub fn compose(tiles: &[RgbImage]) -> RgbImage {
    let row_height = tiles.iter().map(RgbImage::height).max().unwrap_or(0).max(1);

    let scaled: Vec<RgbImage> = tiles
        .iter()
        .filter(|t| t.width() > 0 && t.height() > 0)
        .map(|t| scale_to_height(t, row_height))
        .collect();

    let content_width: u32 = scaled.iter().map(RgbImage::width).sum();
    let gaps = u32::try_from(scaled.len().saturating_sub(1)).unwrap_or(u32::MAX);
    let width = content_width + GUTTER * gaps + 2 * GUTTER;
    let height = row_height + 2 * GUTTER;

    let mut panel = RgbImage::from_pixel(width, height, BACKGROUND);
    let mut x = GUTTER;
    for tile in &scaled {
        imageops::replace(&mut panel, tile, i64::from(x), i64::from(GUTTER));
        x += tile.width() + GUTTER;
    }
    panel
}

fn scale_to_height(tile: &RgbImage, height: u32) -> RgbImage {
    if tile.height() == height {
        return tile.clone();
    }
    let width = u64::from(tile.width()) * u64::from(height) / u64::from(tile.height());
    let width = u32::try_from(width).unwrap_or(u32::MAX).max(1);
    imageops::resize(tile, width, height, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_tiles_are_placed_with_gutters() {
        let red = RgbImage::from_pixel(10, 20, Rgb([255, 0, 0]));
        let blue = RgbImage::from_pixel(10, 20, Rgb([0, 0, 255]));
        let panel = compose(&[red, blue]);
        assert_eq!(panel.dimensions(), (10 + 10 + 3 * GUTTER, 20 + 2 * GUTTER));
        assert_eq!(panel.get_pixel(0, 0), &BACKGROUND);
        assert_eq!(panel.get_pixel(GUTTER, GUTTER).0, [255, 0, 0]);
        assert_eq!(panel.get_pixel(GUTTER + 10, GUTTER), &BACKGROUND);
        assert_eq!(panel.get_pixel(2 * GUTTER + 10, GUTTER).0, [0, 0, 255]);
    }

    #[test]
    fn shorter_tiles_scale_to_tallest() {
        let tall = RgbImage::new(40, 40);
        let short = RgbImage::new(20, 10);
        let panel = compose(&[tall, short]);
        // 20x10 scaled to height 40 becomes 80 wide.
        assert_eq!(panel.width(), 40 + 80 + 3 * GUTTER);
        assert_eq!(panel.height(), 40 + 2 * GUTTER);
    }

    #[test]
    fn gray_stages_become_rgb_tiles() {
        let result = PipelineResult::new(
            hemoscan_pipeline::Method::Vessel,
            vec![(
                "mask",
                RasterImage::Gray(image::GrayImage::from_pixel(4, 4, image::Luma([255]))),
            )],
        );
        let tiles = tiles(&result);
        assert_eq!(tiles.len(), 1);
        assert_eq!(tiles[0].get_pixel(0, 0).0, [255, 255, 255]);
    }

    #[test]
    fn with_tile_replaces_in_place() {
        let original = vec![RgbImage::new(2, 2), RgbImage::new(2, 2)];
        let replacement = RasterImage::Color(RgbImage::from_pixel(3, 3, Rgb([9, 9, 9])));
        let replaced = with_tile(original, 1, &replacement);
        assert_eq!(replaced[1].dimensions(), (3, 3));
        assert_eq!(replaced[0].dimensions(), (2, 2));
    }

    #[test]
    fn empty_panel_is_just_margin() {
        let panel = compose(&[]);
        assert_eq!(panel.dimensions(), (2 * GUTTER, 1 + 2 * GUTTER));
    }
}
