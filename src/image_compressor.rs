//! Channel-wise SVD compression of RGB images.

use crate::rank_selection::select_rank;
use crate::reconstruction::reconstruct;
use crate::svd::{decompose, SpectralDecomposition};
use crate::types::{check_image, Channel, Image, Result, SvdCompressionError, CHANNEL_NAMES};
use crate::SelectionPolicy;
use log::debug;
use ndarray::{Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// What was retained of a single channel.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelMetadata {
    /// Cumulative explained variance of the retained modes, in [0, 1]
    pub variance_explained: f64,
    /// Number of retained modes, in [1, rank]
    pub num_components: usize,
}

/// Per channel metadata in red, green, blue order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompressionMetadata {
    pub channels: Vec<ChannelMetadata>,
}

impl CompressionMetadata {
    /// Look up a channel by its name ("red", "green" or "blue").
    pub fn channel(&self, name: &str) -> Option<&ChannelMetadata> {
        CHANNEL_NAMES
            .iter()
            .position(|&item| item == name)
            .and_then(|index| self.channels.get(index))
    }

    pub fn num_components(&self) -> Vec<usize> {
        self.channels.iter().map(|item| item.num_components).collect()
    }
}

#[derive(Clone, Debug)]
pub struct CompressedImage {
    /// The reconstructed image, same shape as the input
    pub image: Image,
    pub metadata: CompressionMetadata,
}

/// Spectral decompositions of the three channels of an image.
#[derive(Clone, Debug)]
pub struct ImageDecomposition {
    pub channels: Vec<SpectralDecomposition>,
}

/// Split an image into its color planes as real valued matrices.
pub fn split_channels(image: &Image) -> Result<Vec<Channel>> {
    check_image(image)?;

    Ok(image
        .axis_iter(Axis(2))
        .map(|plane| plane.mapv(f64::from))
        .collect())
}

/// Stack color planes back into an image.
pub fn merge_channels(channels: &[Array2<u8>]) -> Result<Image> {
    let views: Vec<_> = channels.iter().map(|item| item.view()).collect();

    ndarray::stack(Axis(2), &views)
        .map_err(|err| SvdCompressionError::InvalidInput(format!("cannot merge channels: {}", err)))
}

/// Decompose all channels of an image. The channels are processed in parallel.
pub fn decompose_image(image: &Image) -> Result<ImageDecomposition> {
    let channels = split_channels(image)?
        .par_iter()
        .map(|channel| decompose(channel))
        .collect::<Result<Vec<_>>>()?;

    Ok(ImageDecomposition { channels })
}

/// Compress an image from precomputed channel decompositions.
///
/// The same policy is applied to every channel; the retained number of modes
/// still differs between channels since their spectra differ.
pub fn compress_decomposed(
    decomposition: &ImageDecomposition,
    policy: SelectionPolicy,
) -> Result<CompressedImage> {
    let results = decomposition
        .channels
        .par_iter()
        .enumerate()
        .map(|(index, svd)| -> Result<(Array2<u8>, ChannelMetadata)> {
            let selection = select_rank(&svd.s, policy)?;
            let metadata = ChannelMetadata {
                variance_explained: selection.variance_explained(),
                num_components: selection.k,
            };

            debug!(
                "Channel {} ({}x{}): keeping {} of {} components, variance explained {:.6}",
                CHANNEL_NAMES[index],
                svd.nrows(),
                svd.ncols(),
                metadata.num_components,
                svd.rank(),
                metadata.variance_explained
            );

            Ok((reconstruct(svd, selection.k), metadata))
        })
        .collect::<Result<Vec<_>>>()?;

    let (planes, channels): (Vec<_>, Vec<_>) = results.into_iter().unzip();

    Ok(CompressedImage {
        image: merge_channels(&planes)?,
        metadata: CompressionMetadata { channels },
    })
}

/// Compress an image channel by channel.
pub fn compress_image(image: &Image, policy: SelectionPolicy) -> Result<CompressedImage> {
    policy.validate()?;
    let decomposition = decompose_image(image)?;
    compress_decomposed(&decomposition, policy)
}
