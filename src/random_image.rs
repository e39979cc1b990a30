//! Generation of synthetic channels and images.

use crate::reconstruction::MAX_INTENSITY;
use crate::svd::decompose;
use crate::types::{Image, Result, SvdCompressionError, NUM_CHANNELS};
use ndarray::{Array, Array2, Array3};
use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};

/// Generate a channel with entries uniformly distributed in [0, 255].
///
/// # Arguments
///
/// * `dimension`: Tuple (rows, cols) specifying the number of rows and columns.
/// * `rng`: The random number generator to use.
pub fn random_channel<R: Rng>(dimension: (usize, usize), rng: &mut R) -> Array2<f64> {
    let uniform = Uniform::new_inclusive(0.0, MAX_INTENSITY);
    Array2::from_shape_simple_fn(dimension, || uniform.sample(rng))
}

/// Generate an image with independent uniformly distributed intensities.
pub fn uniform_random_image<R: Rng>(height: usize, width: usize, rng: &mut R) -> Image {
    Array3::from_shape_simple_fn((height, width, NUM_CHANNELS), || rng.gen::<u8>())
}

/// Generate a deterministic ramp image.
///
/// Red increases in row major order, green is the inverse of red and blue
/// increases along the columns. Every channel with more than one distinct
/// position spans the full range [0, 255].
pub fn ramp_image(height: usize, width: usize) -> Image {
    let last_index = (height * width).saturating_sub(1).max(1) as f64;
    let last_col = width.saturating_sub(1).max(1) as f64;

    Array3::from_shape_fn((height, width, NUM_CHANNELS), |(i, j, c)| {
        let red = ((i * width + j) as f64 * MAX_INTENSITY / last_index).round();
        let value = match c {
            0 => red,
            1 => MAX_INTENSITY - red,
            _ => (j as f64 * MAX_INTENSITY / last_col).round(),
        };
        value as u8
    })
}

/// Generate a smooth gradient image overlaid with Gaussian noise.
///
/// # Arguments
///
/// * `height`, `width`: Image dimensions.
/// * `noise_level`: Standard deviation of the noise in intensity units.
/// * `rng`: The random number generator to use.
pub fn noisy_gradient_image<R: Rng>(
    height: usize,
    width: usize,
    noise_level: f64,
    rng: &mut R,
) -> Result<Image> {
    let normal = Normal::new(0.0, noise_level).map_err(|err| {
        SvdCompressionError::InvalidInput(format!("invalid noise level {}: {}", noise_level, err))
    })?;

    Ok(ramp_image(height, width)
        .mapv(|item| num::clamp(item as f64 + normal.sample(rng), 0.0, MAX_INTENSITY).round() as u8))
}

/// Generate a random approximate low-rank channel.
///
/// The singular values are logarithmically distributed between
/// `sigma_max` and `sigma_min`.
///
/// # Arguments
///
/// * `dimension`: Tuple (rows, cols) specifying the number of rows and columns.
/// * `sigma_max`: Maximum singular value.
/// * `sigma_min`: Minimum singular value.
/// * `rng`: The random number generator to use.
pub fn random_low_rank_channel<R: Rng>(
    dimension: (usize, usize),
    sigma_max: f64,
    sigma_min: f64,
    rng: &mut R,
) -> Result<Array2<f64>> {
    let min_dim = std::cmp::min(dimension.0, dimension.1);

    let u = decompose(&random_gaussian((dimension.0, min_dim), rng))?.u;
    let vt = decompose(&random_gaussian((min_dim, dimension.1), rng))?.vt;

    let singvals = Array::geomspace(sigma_max, sigma_min, min_dim).unwrap_or_else(|| Array::zeros(min_dim));
    let sigma = Array2::from_diag(&singvals);

    Ok(u.dot(&sigma.dot(&vt)))
}

fn random_gaussian<R: Rng>(dimension: (usize, usize), rng: &mut R) -> Array2<f64> {
    let mut mat = Array2::<f64>::zeros(dimension);
    let normal = rand_distr::StandardNormal;
    mat.map_inplace(|item| *item = normal.sample(rng));
    mat
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::svd::ComputeSvd;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_ramp_image_spans_range() {
        let image = ramp_image(4, 4);

        assert_eq!(image.dim(), (4, 4, 3));
        assert_eq!(image[[0, 0, 0]], 0);
        assert_eq!(image[[3, 3, 0]], 255);
        assert_eq!(image[[0, 0, 1]], 255);
        assert_eq!(image[[3, 0, 2]], 0);
        assert_eq!(image[[0, 3, 2]], 255);
    }

    #[test]
    fn test_low_rank_channel_spectrum() {
        let mut rng = StdRng::seed_from_u64(0);
        let mat = random_low_rank_channel((40, 30), 1.0, 1E-6, &mut rng).unwrap();
        let svd = mat.compute_svd().unwrap();

        assert_relative_eq!(svd.s[0], 1.0, epsilon = 1E-10);
        assert_relative_eq!(svd.s[29], 1E-6, epsilon = 1E-10);
    }

    #[test]
    fn test_noisy_gradient_is_reproducible() {
        let first = noisy_gradient_image(8, 8, 4.0, &mut StdRng::seed_from_u64(2)).unwrap();
        let second = noisy_gradient_image(8, 8, 4.0, &mut StdRng::seed_from_u64(2)).unwrap();

        assert_eq!(first, second);
        assert!(noisy_gradient_image(8, 8, -1.0, &mut StdRng::seed_from_u64(2)).is_err());
    }
}
