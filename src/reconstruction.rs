//! Reconstruction of a channel from a truncated spectrum.
//!
//! The approximation $U\mathrm{diag}(\sigma_1,\dots,\sigma_k,0,\dots,0)V^T$ is real valued
//! and unbounded. It is brought back to the display range by a min-max stretch onto
//! [0, 255], so the output always spans the full range unless the approximation is flat.

use crate::svd::SpectralDecomposition;
use ndarray::{Array1, Array2, ArrayBase, Data, Ix1, Ix2};

/// Maximum intensity of an 8 bit channel.
pub const MAX_INTENSITY: f64 = 255.0;

/// Ranges below this fraction of the largest magnitude count as flat.
pub const FLAT_RANGE_TOLERANCE: f64 = 1E-9;

/// Return a copy of `sigma` with all entries from index `k` on set to zero.
pub fn truncate_spectrum<S: Data<Elem = f64>>(sigma: &ArrayBase<S, Ix1>, k: usize) -> Array1<f64> {
    let mut truncated = sigma.to_owned();
    truncated.iter_mut().skip(k).for_each(|item| *item = 0.0);
    truncated
}

/// Linearly map the range [min, max] of `approx` onto [0, 255] and round to `u8`.
///
/// A flat input (max == min up to [`FLAT_RANGE_TOLERANCE`]) has no range to stretch;
/// every pixel then becomes the rounded min value clamped to [0, 255].
pub fn rescale_to_display_range<S: Data<Elem = f64>>(approx: &ArrayBase<S, Ix2>) -> Array2<u8> {
    let (min_val, max_val) = approx
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &item| {
            (lo.min(item), hi.max(item))
        });

    let range = max_val - min_val;
    let magnitude = min_val.abs().max(max_val.abs()).max(1.0);

    if !range.is_finite() || range <= FLAT_RANGE_TOLERANCE * magnitude {
        let value = if min_val.is_finite() {
            num::clamp(min_val.round(), 0.0, MAX_INTENSITY) as u8
        } else {
            0
        };
        return Array2::from_elem(approx.raw_dim(), value);
    }

    approx.mapv(|item| {
        let scaled = (item - min_val) * MAX_INTENSITY / range;
        num::clamp(scaled.round(), 0.0, MAX_INTENSITY) as u8
    })
}

/// Rebuild a channel from the first `k` modes of `decomposition`.
pub fn reconstruct(decomposition: &SpectralDecomposition, k: usize) -> Array2<u8> {
    let truncated = truncate_spectrum(&decomposition.s, k);
    let approx = decomposition.to_mat_with_spectrum(&truncated);

    rescale_to_display_range(&approx)
}
