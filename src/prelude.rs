//! Collect all traits and other exports here.

pub use crate::helpers::RelDiff;
pub use crate::image_compressor::{
    compress_decomposed, compress_image, decompose_image, merge_channels, split_channels,
    ChannelMetadata, CompressedImage, CompressionMetadata, ImageDecomposition,
};
pub use crate::metrics::{evaluate, MetricsRecord, PSNR_IDENTICAL};
pub use crate::rank_selection::{cumulative_variance, select_rank, RankSelection};
pub use crate::reconstruction::{reconstruct, rescale_to_display_range, truncate_spectrum};
pub use crate::strategy::{
    CompressionParameter, CompressionStrategy, EncodedImage, StrategyKind, WaveletEncoder,
};
pub use crate::svd::{decompose, ComputeSvd, SpectralDecomposition};
pub use crate::sweep::{
    ArtifactStore, CancellationToken, MetricsExporter, Outcome, SweepConfig, SweepInput,
    SweepReport, SweepRunner,
};
pub use crate::types::{Channel, Image, SvdCompressionError};
pub use crate::{SelectionPolicy, DEFAULT_EXPLAINED_VARIANCE};
