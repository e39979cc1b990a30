//! Selection of the number of singular values to retain.
//!
//! The energy captured by the first $k$ singular values is
//! $\sum_{i\leq k}\sigma_i^2 / \sum_j \sigma_j^2$. A [`SelectionPolicy`] either asks for
//! the smallest $k$ whose captured energy reaches a threshold or fixes $k$ directly.

use crate::types::{Result, SvdCompressionError};
use crate::SelectionPolicy;
use log::warn;
use ndarray::{Array1, ArrayBase, Data, Ix1};

/// Rank chosen for a spectrum together with the cumulative explained variance.
#[derive(Clone, Debug, PartialEq)]
pub struct RankSelection {
    /// Number of retained components, in [1, r]
    pub k: usize,
    /// Cumulative explained variance for each number of retained components
    pub cumulative_variance: Array1<f64>,
}

impl RankSelection {
    /// The cumulative variance explained by the selected `k` components.
    pub fn variance_explained(&self) -> f64 {
        self.cumulative_variance[self.k - 1]
    }
}

/// Return the cumulative explained variance of a spectrum.
///
/// If all singular values vanish the result is all zeros.
pub fn cumulative_variance<S: Data<Elem = f64>>(sigma: &ArrayBase<S, Ix1>) -> Array1<f64> {
    let total_variance: f64 = sigma.iter().map(|&item| item * item).sum();

    if total_variance == 0.0 {
        return Array1::zeros(sigma.len());
    }

    let mut running = 0.0;
    sigma
        .iter()
        .map(|&item| {
            running += item * item / total_variance;
            running
        })
        .collect()
}

/// Select the number of components to keep for a given spectrum and policy.
///
/// Fixed ranks are clamped into [1, r]. Thresholds must lie in (0, 1].
pub fn select_rank<S: Data<Elem = f64>>(
    sigma: &ArrayBase<S, Ix1>,
    policy: SelectionPolicy,
) -> Result<RankSelection> {
    let rank = sigma.len();

    if rank == 0 {
        return Err(SvdCompressionError::InvalidInput(
            "cannot select a rank from an empty spectrum".to_string(),
        ));
    }

    let cumulative_variance = cumulative_variance(sigma);
    let degenerate = cumulative_variance[rank - 1] == 0.0;

    let k = match policy {
        SelectionPolicy::ExplainedVariance(threshold) => {
            policy.validate()?;
            if degenerate {
                1
            } else if threshold >= 1.0 {
                // Rounding may push the running sum to 1.0 before the last mode.
                rank
            } else {
                match cumulative_variance.iter().position(|&item| item >= threshold) {
                    Some(index) => index + 1,
                    None => {
                        warn!(
                            "Explained variance {} not reached (max {}), keeping all {} components",
                            threshold,
                            cumulative_variance[rank - 1],
                            rank
                        );
                        rank
                    }
                }
            }
        }
        SelectionPolicy::FixedRank(requested) => num::clamp(requested, 1, rank),
    };

    Ok(RankSelection {
        k,
        cumulative_variance,
    })
}
