//! Multi-scale Frangi vesselness filter.
//!
//! Highlights elongated dark ridges (retinal vessels are darker than the
//! surrounding fundus) from the eigenvalues of the scale-normalised
//! Hessian. At every scale the image is Gaussian-smoothed with
//! [`imageproc::filter::gaussian_blur_f32`], the Hessian is taken by
//! central differences and scaled by `sigma^2`, and the per-pixel
//! response is
//!
//! ```text
//! V = exp(-Rb^2 / 2 beta^2) * (1 - exp(-S^2 / 2 gamma^2))
//! Rb = |l1| / l2,   S = sqrt(l1^2 + l2^2),   |l1| <= |l2|
//! ```
//!
//! Pixels with `l2 <= 0` (bright ridges, flat regions) respond with
//! zero. `gamma` is half the largest `S` seen at the first scale. The
//! output is the maximum over scales, in `[0, 1]`.

use image::{GrayImage, ImageBuffer, Luma};

/// Floating-point single-channel image.
pub type ResponseImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Compute the vesselness response of `gray` over `sigmas`.
///
/// Non-positive or non-finite sigmas are skipped. An empty scale list
/// yields an all-zero response.
#[must_use = "returns the vesselness response"]
pub fn frangi(gray: &GrayImage, sigmas: &[f32], beta: f32) -> ResponseImage {
    let (w, h) = gray.dimensions();
    let input = ResponseImage::from_fn(w, h, |x, y| {
        Luma([f32::from(gray.get_pixel(x, y).0[0]) / 255.0])
    });

    let two_beta_sq = 2.0 * beta * beta;
    let mut best = ResponseImage::new(w, h);
    let mut gamma: Option<f32> = None;

    for &sigma in sigmas.iter().filter(|s| s.is_finite() && **s > 0.0) {
        let smoothed = imageproc::filter::gaussian_blur_f32(&input, sigma);
        let eigen = hessian_eigenvalues(&smoothed, sigma * sigma);

        let gamma = *gamma.get_or_insert_with(|| {
            let max_norm = eigen
                .iter()
                .map(|&(l1, l2)| l1.hypot(l2))
                .fold(0.0_f32, f32::max);
            if max_norm == 0.0 { 1.0 } else { max_norm / 2.0 }
        });
        let two_gamma_sq = 2.0 * gamma * gamma;

        for (px, &(l1, l2)) in best.pixels_mut().zip(&eigen) {
            if l2 <= 0.0 {
                continue;
            }
            let rb = l1.abs() / l2;
            let s_sq = l1.mul_add(l1, l2 * l2);
            let v = (-(rb * rb) / two_beta_sq).exp() * (1.0 - (-s_sq / two_gamma_sq).exp());
            if v > px.0[0] {
                px.0[0] = v;
            }
        }
    }

    best
}

/// Scale a `[0, 1]` response to 8 bits by truncating `v * 255`.
#[must_use = "returns the 8-bit response"]
pub fn response_to_gray(response: &ResponseImage) -> GrayImage {
    GrayImage::from_fn(response.width(), response.height(), |x, y| {
        let v = response.get_pixel(x, y).0[0].clamp(0.0, 1.0) * 255.0;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Luma([v as u8])
    })
}

/// Eigenvalues `(l1, l2)` of the scaled Hessian at every pixel, in
/// row-major order, sorted so that `|l1| <= |l2|`.
fn hessian_eigenvalues(image: &ResponseImage, scale: f32) -> Vec<(f32, f32)> {
    let (w, h) = image.dimensions();
    let at = |x: i64, y: i64| -> f32 {
        let cx = x.clamp(0, i64::from(w) - 1);
        let cy = y.clamp(0, i64::from(h) - 1);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        image.get_pixel(cx as u32, cy as u32).0[0]
    };

    let mut out = Vec::with_capacity(w as usize * h as usize);
    for y in 0..i64::from(h) {
        for x in 0..i64::from(w) {
            let c = at(x, y);
            let hxx = at(x + 1, y) - 2.0 * c + at(x - 1, y);
            let hyy = at(x, y + 1) - 2.0 * c + at(x, y - 1);
            let hxy = (at(x + 1, y + 1) - at(x + 1, y - 1) - at(x - 1, y + 1)
                + at(x - 1, y - 1))
                / 4.0;
            out.push(sorted_eigenvalues(hxx * scale, hxy * scale, hyy * scale));
        }
    }
    out
}

/// Eigenvalues of the symmetric matrix `[[a, b], [b, c]]`, ordered by
/// absolute value.
fn sorted_eigenvalues(a: f32, b: f32, c: f32) -> (f32, f32) {
    let mean = (a + c) / 2.0;
    let radius = ((a - c) / 2.0).hypot(b);
    let (e1, e2) = (mean + radius, mean - radius);
    if e1.abs() <= e2.abs() {
        (e1, e2)
    } else {
        (e2, e1)
    }
}
