//! Compression strategies and their parameters.
//!
//! Two strategies share one contract: SVD truncation, implemented by this crate, and a
//! wavelet codec, which is an external encoder invoked with a target compression ratio.

use crate::image_compressor::{compress_image, CompressionMetadata};
use crate::types::{check_image, Image, Result, SvdCompressionError};
use crate::SelectionPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    SingularValueTruncation,
    WaveletCodec,
}

impl StrategyKind {
    /// File extension of the artifacts written for this strategy.
    pub fn extension(&self) -> &'static str {
        match self {
            StrategyKind::SingularValueTruncation => "png",
            StrategyKind::WaveletCodec => "jp2",
        }
    }
}

/// Parameter of a single compression run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum CompressionParameter {
    /// Explained variance threshold in (0, 1] for SVD truncation
    ExplainedVariance(f64),
    /// Fixed number of modes for SVD truncation
    FixedRank(usize),
    /// Target compression ratio for the wavelet codec
    TargetRatio(u32),
}

impl CompressionParameter {
    /// The strategy this parameter belongs to.
    pub fn kind(&self) -> StrategyKind {
        match self {
            CompressionParameter::ExplainedVariance(_) | CompressionParameter::FixedRank(_) => {
                StrategyKind::SingularValueTruncation
            }
            CompressionParameter::TargetRatio(_) => StrategyKind::WaveletCodec,
        }
    }

    /// The rank selection policy of an SVD parameter.
    pub fn selection_policy(&self) -> Option<SelectionPolicy> {
        match *self {
            CompressionParameter::ExplainedVariance(threshold) => {
                Some(SelectionPolicy::ExplainedVariance(threshold))
            }
            CompressionParameter::FixedRank(rank) => Some(SelectionPolicy::FixedRank(rank)),
            CompressionParameter::TargetRatio(_) => None,
        }
    }

    /// Check the parameter value without running a compression.
    pub fn validate(&self) -> Result<()> {
        match *self {
            CompressionParameter::TargetRatio(0) => Err(SvdCompressionError::InvalidInput(
                "target ratio must be positive".to_string(),
            )),
            CompressionParameter::TargetRatio(_) => Ok(()),
            _ => self
                .selection_policy()
                .map_or(Ok(()), |policy| policy.validate()),
        }
    }

    /// Name of the artifact holding `image_name` compressed with this parameter,
    /// e.g. `lena_expvar0.9.png` for `lena.png`.
    pub fn artifact_name(&self, image_name: &str) -> String {
        let stem = match image_name.rfind('.') {
            Some(index) if index > 0 => &image_name[..index],
            _ => image_name,
        };
        format!("{}_{}.{}", stem, self, self.kind().extension())
    }

    /// Name of the metrics table for this parameter, e.g. `metrics_cratio20.csv`.
    pub fn metrics_file_name(&self) -> String {
        format!("metrics_{}.csv", self)
    }
}

impl fmt::Display for CompressionParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionParameter::ExplainedVariance(threshold) => write!(f, "expvar{}", threshold),
            CompressionParameter::FixedRank(rank) => write!(f, "rank{}", rank),
            CompressionParameter::TargetRatio(ratio) => write!(f, "cratio{}", ratio),
        }
    }
}

/// Output of an external wavelet encoder.
#[derive(Clone, Debug)]
pub struct EncodedImage {
    /// The image decoded from the written byte stream
    pub decoded: Image,
    /// Size of the written byte stream
    pub size_bytes: u64,
}

/// An external wavelet encoder, e.g. a JPEG 2000 library.
pub trait WaveletEncoder: Sync {
    /// Encode `image` aiming at `target_ratio`, store it under `artifact_name`
    /// and return the decoded result together with the stored size.
    fn encode(&self, image: &Image, target_ratio: u32, artifact_name: &str) -> Result<EncodedImage>;
}

#[derive(Clone, Debug)]
pub struct StrategyOutput {
    pub image: Image,
    /// Per channel metadata, only produced by SVD truncation
    pub metadata: Option<CompressionMetadata>,
    /// Stored size if the strategy persisted its own output
    pub stored_size: Option<u64>,
}

#[derive(Clone, Copy)]
pub enum CompressionStrategy<'a> {
    SingularValueTruncation,
    WaveletCodec(&'a dyn WaveletEncoder),
}

impl fmt::Debug for CompressionStrategy<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind())
    }
}

impl<'a> CompressionStrategy<'a> {
    pub fn kind(&self) -> StrategyKind {
        match self {
            CompressionStrategy::SingularValueTruncation => StrategyKind::SingularValueTruncation,
            CompressionStrategy::WaveletCodec(_) => StrategyKind::WaveletCodec,
        }
    }

    /// Compress `image` with `parameter`.
    ///
    /// Fails with `InvalidInput` if the parameter belongs to another strategy.
    /// `image_name` only determines the artifact name handed to the wavelet encoder.
    pub fn compress(
        &self,
        image: &Image,
        image_name: &str,
        parameter: CompressionParameter,
    ) -> Result<StrategyOutput> {
        match (self, parameter) {
            (CompressionStrategy::WaveletCodec(encoder), CompressionParameter::TargetRatio(ratio)) => {
                parameter.validate()?;
                check_image(image)?;
                let encoded = encoder.encode(image, ratio, &parameter.artifact_name(image_name))?;
                Ok(StrategyOutput {
                    image: encoded.decoded,
                    metadata: None,
                    stored_size: Some(encoded.size_bytes),
                })
            }
            (CompressionStrategy::SingularValueTruncation, _)
                if parameter.kind() == StrategyKind::SingularValueTruncation =>
            {
                let policy = parameter.selection_policy().ok_or_else(|| {
                    SvdCompressionError::InvalidInput(format!("{} is not an SVD parameter", parameter))
                })?;
                let compressed = compress_image(image, policy)?;
                Ok(StrategyOutput {
                    image: compressed.image,
                    metadata: Some(compressed.metadata),
                    stored_size: None,
                })
            }
            _ => Err(SvdCompressionError::InvalidInput(format!(
                "parameter {} cannot be used with {:?}",
                parameter,
                self.kind()
            ))),
        }
    }
}
