//! Contrast-limited adaptive histogram equalization (CLAHE).
//!
//! The image is split into a grid of tiles. Each tile gets its own
//! histogram, clipped at `clip_limit` times the mean bin height, with the
//! clipped excess spread evenly over all bins. The cumulative histogram
//! of each tile becomes a lookup table, and every output pixel blends the
//! tables of the four nearest tile centres bilinearly so no seams appear
//! at tile borders.

use image::{GrayImage, Luma};

const BINS: usize = 256;

type Histogram = [u32; BINS];
type Lut = [u8; BINS];

/// Apply CLAHE with a `tiles_x` x `tiles_y` grid.
///
/// The grid is reduced where the image has fewer pixels than tiles along
/// an axis. A non-positive `clip_limit` disables clipping (plain adaptive
/// equalization). A zero grid returns the image unchanged.
#[must_use = "returns the equalized image"]
pub fn clahe(image: &GrayImage, tiles_x: u32, tiles_y: u32, clip_limit: f32) -> GrayImage {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 || tiles_x == 0 || tiles_y == 0 {
        return image.clone();
    }
    let tx = tiles_x.min(w);
    let ty = tiles_y.min(h);

    // Tile (i, j) spans columns bound(i, tx, w)..bound(i + 1, tx, w).
    let bound = |i: u32, n: u32, len: u32| -> u32 {
        #[allow(clippy::cast_possible_truncation)]
        let b = (u64::from(i) * u64::from(len) / u64::from(n)) as u32;
        b
    };

    let mut luts: Vec<Lut> = Vec::with_capacity((tx * ty) as usize);
    for j in 0..ty {
        let (y0, y1) = (bound(j, ty, h), bound(j + 1, ty, h));
        for i in 0..tx {
            let (x0, x1) = (bound(i, tx, w), bound(i + 1, tx, w));
            let mut hist: Histogram = [0; BINS];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[usize::from(image.get_pixel(x, y).0[0])] += 1;
                }
            }
            let area = (x1 - x0) * (y1 - y0);
            if clip_limit > 0.0 {
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let limit = ((clip_limit * area as f32 / BINS as f32) as u32).max(1);
                clip_histogram(&mut hist, limit);
            }
            luts.push(cumulative_lut(&hist, area));
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let (tile_w, tile_h) = (w as f32 / tx as f32, h as f32 / ty as f32);
    let lut_at = |i: usize, j: usize| &luts[j * tx as usize + i];

    GrayImage::from_fn(w, h, |x, y| {
        #[allow(clippy::cast_precision_loss)]
        let (ix, i_lo, i_hi) = neighbours(x as f32 / tile_w - 0.5, tx);
        #[allow(clippy::cast_precision_loss)]
        let (iy, j_lo, j_hi) = neighbours(y as f32 / tile_h - 0.5, ty);
        let v = usize::from(image.get_pixel(x, y).0[0]);

        let row = |j: usize| {
            let left = f32::from(lut_at(i_lo, j)[v]);
            let right = f32::from(lut_at(i_hi, j)[v]);
            left.mul_add(1.0 - ix, right * ix)
        };
        let (top, bottom) = (row(j_lo), row(j_hi));
        let blended = top.mul_add(1.0 - iy, bottom * iy);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Luma([blended.round().clamp(0.0, 255.0) as u8])
    })
}

/// Fractional offset and the two tile indices surrounding position `t`
/// (in tile units, relative to tile centres), clamped to the grid.
fn neighbours(t: f32, tiles: u32) -> (f32, usize, usize) {
    let lo = t.floor();
    let frac = t - lo;
    #[allow(clippy::cast_possible_truncation)]
    let lo = lo as i64;
    let last = i64::from(tiles) - 1;
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    let clamp = |i: i64| i.clamp(0, last) as usize;
    (frac, clamp(lo), clamp(lo + 1))
}

/// Cap every bin at `limit` and spread the excess over all bins.
///
/// The excess is divided evenly; whatever does not divide evenly is
/// added one count at a time to bins spaced across the histogram. The
/// total count is preserved.
fn clip_histogram(hist: &mut Histogram, limit: u32) {
    let mut excess: u32 = 0;
    for bin in hist.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    let per_bin = excess / BINS as u32;
    #[allow(clippy::cast_possible_truncation)]
    let residual = (excess % BINS as u32) as usize;
    for bin in hist.iter_mut() {
        *bin += per_bin;
    }
    if residual > 0 {
        let step = (BINS / residual).max(1);
        for bin in hist.iter_mut().step_by(step).take(residual) {
            *bin += 1;
        }
    }
}

/// Lookup table mapping intensity to `round(cdf * 255 / area)`.
fn cumulative_lut(hist: &Histogram, area: u32) -> Lut {
    let area = u64::from(area.max(1));
    let mut lut: Lut = [0; BINS];
    let mut running: u64 = 0;
    for (entry, &count) in lut.iter_mut().zip(hist) {
        running += u64::from(count);
        #[allow(clippy::cast_possible_truncation)]
        let mapped = ((running * 255 + area / 2) / area).min(255) as u8;
        *entry = mapped;
    }
    lut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_dimensions() {
        let img = GrayImage::from_fn(37, 23, |x, y| Luma([((x * 7 + y * 3) % 256) as u8]));
        assert_eq!(clahe(&img, 8, 8, 2.0).dimensions(), (37, 23));
    }

    #[test]
    fn uniform_input_gives_uniform_output() {
        let img = GrayImage::from_pixel(64, 64, Luma([90]));
        let out = clahe(&img, 8, 8, 2.0);
        let first = out.get_pixel(0, 0).0[0];
        assert!(out.pixels().all(|p| p.0[0] == first));
    }

    #[test]
    fn unclipped_single_tile_is_global_equalization() {
        // Half black, half white. Without clipping the cdf at 0 is one
        // half, so black maps to round(127.5) = 128 and white stays 255.
        let img = GrayImage::from_fn(16, 16, |x, _| Luma([if x < 8 { 0 } else { 255 }]));
        let out = clahe(&img, 1, 1, 1000.0);
        assert_eq!(out.get_pixel(0, 0).0[0], 128);
        assert_eq!(out.get_pixel(15, 15).0[0], 255);
    }

    #[test]
    fn clipping_preserves_total_count() {
        let mut hist: Histogram = [0; BINS];
        hist[10] = 1000;
        hist[200] = 37;
        clip_histogram(&mut hist, 20);
        assert_eq!(hist.iter().sum::<u32>(), 1037);
        assert!(hist.iter().all(|&b| b <= 20 + 4 + 1));
    }

    #[test]
    fn lut_ends_at_white() {
        let mut hist: Histogram = [0; BINS];
        hist[0] = 5;
        hist[100] = 5;
        let lut = cumulative_lut(&hist, 10);
        assert_eq!(lut[255], 255);
        assert!(lut.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn neighbours_clamp_at_edges() {
        assert_eq!(neighbours(-0.5, 8).1, 0);
        assert_eq!(neighbours(-0.5, 8).2, 0);
        let (_, lo, hi) = neighbours(7.4, 8);
        assert_eq!((lo, hi), (7, 7));
    }

    #[test]
    fn zero_grid_is_identity() {
        let img = GrayImage::from_fn(8, 8, |x, _| Luma([(x * 30) as u8]));
        assert_eq!(clahe(&img, 0, 4, 2.0), img);
    }
}
