//! Fidelity and efficiency metrics comparing an original and a reconstructed image.
//!
//! All reported values are rounded to [`METRIC_DIGITS`] decimal digits.

use crate::reconstruction::MAX_INTENSITY;
use crate::types::{Image, Result, SvdCompressionError};
use ndarray::{Array2, ArrayView2, Axis, Zip};
use serde::{Deserialize, Serialize};

/// Number of decimal digits kept in a [`MetricsRecord`].
pub const METRIC_DIGITS: i32 = 4;

/// PSNR reported for two identical images.
pub const PSNR_IDENTICAL: f64 = f64::INFINITY;

/// Side length of the square SSIM window.
pub const SSIM_WINDOW: usize = 7;

const SSIM_K1: f64 = 0.01;
const SSIM_K2: f64 = 0.03;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub compression_ratio: f64,
    pub peak_signal_noise_ratio: f64,
    pub structural_similarity: f64,
}

/// Round `value` to `digits` decimal digits. Non-finite values are returned unchanged.
pub fn round_to(value: f64, digits: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let scale = 10f64.powi(digits);
    (value * scale).round() / scale
}

/// Ratio of the stored original size to the stored compressed size.
pub fn compression_ratio(original_size_bytes: u64, reconstructed_size_bytes: u64) -> Result<f64> {
    if reconstructed_size_bytes == 0 {
        return Err(SvdCompressionError::InvalidInput(
            "compressed size must be positive".to_string(),
        ));
    }

    Ok(original_size_bytes as f64 / reconstructed_size_bytes as f64)
}

fn check_shapes(original: &Image, reconstructed: &Image) -> Result<()> {
    if original.shape() != reconstructed.shape() {
        return Err(SvdCompressionError::ShapeMismatch {
            original: original.shape().to_vec(),
            reconstructed: reconstructed.shape().to_vec(),
        });
    }

    if original.is_empty() {
        return Err(SvdCompressionError::InvalidInput(
            "cannot compare empty images".to_string(),
        ));
    }

    Ok(())
}

/// Peak signal to noise ratio over all pixels and channels with peak value 255.
///
/// Identical images give [`PSNR_IDENTICAL`].
pub fn peak_signal_noise_ratio(original: &Image, reconstructed: &Image) -> Result<f64> {
    check_shapes(original, reconstructed)?;

    let mut squared_error = 0.0;
    Zip::from(original)
        .and(reconstructed)
        .for_each(|&first, &second| {
            let diff = first as f64 - second as f64;
            squared_error += diff * diff;
        });

    let mse = squared_error / original.len() as f64;

    if mse == 0.0 {
        Ok(PSNR_IDENTICAL)
    } else {
        Ok(10.0 * (MAX_INTENSITY * MAX_INTENSITY / mse).log10())
    }
}

/// Summed area table with a leading row and column of zeros.
fn summed_area_table<F: Fn(usize, usize) -> f64>(dim: (usize, usize), value: F) -> Array2<f64> {
    let (m, n) = dim;
    let mut table = Array2::<f64>::zeros((m + 1, n + 1));

    for i in 0..m {
        let mut row_sum = 0.0;
        for j in 0..n {
            row_sum += value(i, j);
            table[[i + 1, j + 1]] = table[[i, j + 1]] + row_sum;
        }
    }

    table
}

fn window_sum(table: &Array2<f64>, i: usize, j: usize, size: usize) -> f64 {
    table[[i + size, j + size]] - table[[i, j + size]] - table[[i + size, j]] + table[[i, j]]
}

/// Sum of the local SSIM values of one channel and the number of windows.
fn channel_ssim_sum(first: ArrayView2<f64>, second: ArrayView2<f64>, win: usize) -> (f64, usize) {
    let dim = first.dim();
    let (m, n) = dim;

    let sx = summed_area_table(dim, |i, j| first[[i, j]]);
    let sy = summed_area_table(dim, |i, j| second[[i, j]]);
    let sxx = summed_area_table(dim, |i, j| first[[i, j]] * first[[i, j]]);
    let syy = summed_area_table(dim, |i, j| second[[i, j]] * second[[i, j]]);
    let sxy = summed_area_table(dim, |i, j| first[[i, j]] * second[[i, j]]);

    let np = (win * win) as f64;
    // Sample covariance as in Wang et al.
    let cov_norm = if win > 1 { np / (np - 1.0) } else { 1.0 };
    let c1 = (SSIM_K1 * MAX_INTENSITY).powi(2);
    let c2 = (SSIM_K2 * MAX_INTENSITY).powi(2);

    let mut total = 0.0;
    let mut count = 0;

    for i in 0..=(m - win) {
        for j in 0..=(n - win) {
            let ux = window_sum(&sx, i, j, win) / np;
            let uy = window_sum(&sy, i, j, win) / np;
            let uxx = window_sum(&sxx, i, j, win) / np;
            let uyy = window_sum(&syy, i, j, win) / np;
            let uxy = window_sum(&sxy, i, j, win) / np;

            let vx = cov_norm * (uxx - ux * ux);
            let vy = cov_norm * (uyy - uy * uy);
            let vxy = cov_norm * (uxy - ux * uy);

            let numerator = (2.0 * ux * uy + c1) * (2.0 * vxy + c2);
            let denominator = (ux * ux + uy * uy + c1) * (vx + vy + c2);

            total += numerator / denominator;
            count += 1;
        }
    }

    (total, count)
}

/// Mean structural similarity over all channels jointly.
///
/// Uses a uniform [`SSIM_WINDOW`] x [`SSIM_WINDOW`] window, shrunk to the largest
/// odd size fitting into smaller images, evaluated at every position where the
/// window lies fully inside the image.
///
/// Images narrower than the window are still scored with the shrunk window rather
/// than rejected.
pub fn structural_similarity(original: &Image, reconstructed: &Image) -> Result<f64> {
    check_shapes(original, reconstructed)?;

    let (height, width, _) = original.dim();
    let mut win = SSIM_WINDOW.min(height).min(width);
    if win % 2 == 0 {
        win -= 1;
    }

    let (total, count) = original
        .axis_iter(Axis(2))
        .zip(reconstructed.axis_iter(Axis(2)))
        .map(|(first, second)| {
            let first = first.mapv(f64::from);
            let second = second.mapv(f64::from);
            channel_ssim_sum(first.view(), second.view(), win)
        })
        .fold((0.0, 0), |(total, count), (sum, windows)| {
            (total + sum, count + windows)
        });

    Ok(total / count as f64)
}

/// Compare an original image with its reconstruction.
///
/// The byte sizes come from the storage holding both representations.
pub fn evaluate(
    original: &Image,
    reconstructed: &Image,
    original_size_bytes: u64,
    reconstructed_size_bytes: u64,
) -> Result<MetricsRecord> {
    check_shapes(original, reconstructed)?;

    let ratio = compression_ratio(original_size_bytes, reconstructed_size_bytes)?;
    let psnr = peak_signal_noise_ratio(original, reconstructed)?;
    let ssim = structural_similarity(original, reconstructed)?;

    Ok(MetricsRecord {
        compression_ratio: round_to(ratio, METRIC_DIGITS),
        peak_signal_noise_ratio: round_to(psnr, METRIC_DIGITS),
        structural_similarity: round_to(ssim, METRIC_DIGITS),
    })
}
