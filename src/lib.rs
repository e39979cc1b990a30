//! Lossy compression of RGB images by rank truncated singular value decompositions.
//!
//! Every color channel is factorized independently, the number of retained modes is
//! chosen by a [`SelectionPolicy`], and the truncated reconstruction is stretched back
//! into the 8 bit display range. The [`metrics`] module measures the fidelity of the
//! result and the [`sweep`] module runs whole batches of images over a set of parameters.

pub mod helpers;
pub mod image_compressor;
pub mod metrics;
pub mod random_image;
pub mod rank_selection;
pub mod reconstruction;
pub mod strategy;
pub mod svd;
pub mod sweep;
pub mod types;

pub mod prelude;

use serde::{Deserialize, Serialize};
use crate::types::{Result, SvdCompressionError};

/// Explained variance used when no other policy is requested.
pub const DEFAULT_EXPLAINED_VARIANCE: f64 = 0.975;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum SelectionPolicy {
    /// Keep the smallest number of modes whose cumulative explained variance
    /// reaches the given threshold in (0, 1]
    ExplainedVariance(f64),
    /// Keep a fixed number of modes, clamped into [1, rank]
    FixedRank(usize),
}

impl SelectionPolicy {
    /// Check that an explained variance threshold lies in (0, 1].
    ///
    /// Fixed ranks are always valid since they are clamped on use.
    pub fn validate(&self) -> Result<()> {
        match *self {
            SelectionPolicy::ExplainedVariance(threshold) => {
                if threshold.is_finite() && threshold > 0.0 && threshold <= 1.0 {
                    Ok(())
                } else {
                    Err(SvdCompressionError::InvalidInput(format!(
                        "explained variance must lie in (0, 1], got {}",
                        threshold
                    )))
                }
            }
            SelectionPolicy::FixedRank(_) => Ok(()),
        }
    }
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        SelectionPolicy::ExplainedVariance(DEFAULT_EXPLAINED_VARIANCE)
    }
}
