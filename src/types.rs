//! This module collects the shared type definitions and the error type.

use ndarray::{Array2, Array3};
use ndarray_linalg::error::LinalgError;
use thiserror::Error;

/// An RGB image stored as a (height, width, 3) array of 8 bit intensities.
pub type Image = Array3<u8>;

/// A single color plane of an image as a real valued matrix.
pub type Channel = Array2<f64>;

/// Number of color channels of an [`Image`].
pub const NUM_CHANNELS: usize = 3;

/// Names of the color channels in storage order.
pub const CHANNEL_NAMES: [&str; NUM_CHANNELS] = ["red", "green", "blue"];

#[derive(Error, Debug)]
pub enum SvdCompressionError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("SVD did not converge")]
    NumericalFailure(#[from] LinalgError),
    #[error("Shape mismatch: original {original:?}, reconstructed {reconstructed:?}")]
    ShapeMismatch {
        original: Vec<usize>,
        reconstructed: Vec<usize>,
    },
    #[error("Collaborator failed: {0}")]
    Collaborator(String),
    #[error("Cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, SvdCompressionError>;

/// Return an error if `image` is empty or does not have three channels.
pub fn check_image(image: &Image) -> Result<()> {
    let (height, width, channels) = image.dim();

    if channels != NUM_CHANNELS {
        return Err(SvdCompressionError::InvalidInput(format!(
            "expected {} channels, got {}",
            NUM_CHANNELS, channels
        )));
    }

    if height == 0 || width == 0 {
        return Err(SvdCompressionError::InvalidInput(format!(
            "image has zero dimension ({}x{})",
            height, width
        )));
    }

    Ok(())
}
