//! Define the spectral decomposition of a channel and its computation.
//!
//! The reduced singular value decomposition of a matrix $M\in\mathbb{R}^{h\times w}$ is
//! $M = U\Sigma V^T$ with $U\in\mathbb{R}^{h\times r}$, $V^T\in\mathbb{R}^{r\times w}$ and
//! $\Sigma = \mathrm{diag}(\sigma_1, \dots, \sigma_r)$, $\sigma_1\geq\sigma_2\geq\dots\geq 0$,
//! where $r = \min(h, w)$.

use crate::types::{Result, SvdCompressionError};
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix2, ShapeBuilder, Zip};
use ndarray_linalg::{JobSvd, SVDDCInto};

#[derive(Clone, Debug)]
pub struct SpectralDecomposition {
    /// The U matrix
    pub u: Array2<f64>,
    /// The array of singular values
    pub s: Array1<f64>,
    /// The vt matrix
    pub vt: Array2<f64>,
}

impl SpectralDecomposition {
    /// Number of rows of the decomposed matrix
    pub fn nrows(&self) -> usize {
        self.u.nrows()
    }

    /// Number of columns of the decomposed matrix
    pub fn ncols(&self) -> usize {
        self.vt.ncols()
    }

    /// Rank of the reduced decomposition, i.e. min(nrows, ncols)
    pub fn rank(&self) -> usize {
        self.s.len()
    }

    /// Return $U\mathrm{diag}(s)V^T$ for a given spectrum `s`.
    ///
    /// `s` must have the same length as the singular values of `self`.
    pub fn to_mat_with_spectrum(&self, s: &Array1<f64>) -> Array2<f64> {
        let mut scaled_vt = self.vt.clone();

        Zip::from(scaled_vt.axis_iter_mut(Axis(0)))
            .and(s)
            .for_each(|mut row, &s_elem| row.map_inplace(|item| *item *= s_elem));

        self.u.dot(&scaled_vt)
    }

    /// Convert the decomposition back to a matrix
    pub fn to_mat(&self) -> Array2<f64> {
        self.to_mat_with_spectrum(&self.s)
    }
}

/// Computation of the reduced SVD of a channel.
pub trait ComputeSvd {
    /// Compute the economy size SVD using the LAPACK divide and conquer driver.
    ///
    /// Fails with `InvalidInput` if one of the dimensions is zero and with
    /// `NumericalFailure` if LAPACK does not converge.
    fn compute_svd(&self) -> Result<SpectralDecomposition>;
}

impl<S> ComputeSvd for ArrayBase<S, Ix2>
where
    S: Data<Elem = f64>,
{
    fn compute_svd(&self) -> Result<SpectralDecomposition> {
        decompose(self)
    }
}

/// Factorize a single channel into its singular value components.
pub fn decompose<S: Data<Elem = f64>>(channel: &ArrayBase<S, Ix2>) -> Result<SpectralDecomposition> {
    let (m, n) = channel.dim();

    if m == 0 || n == 0 {
        return Err(SvdCompressionError::InvalidInput(format!(
            "cannot decompose a {}x{} channel",
            m, n
        )));
    }

    // LAPACK wants a contiguous array; Fortran order avoids an internal transpose.
    let mut mat_fortran = Array2::<f64>::zeros((m, n).f());
    mat_fortran.assign(channel);

    let (u, s, vt) = mat_fortran.svddc_into(JobSvd::Some)?;

    let (u, vt) = match (u, vt) {
        (Some(u), Some(vt)) => (u, vt),
        _ => {
            return Err(SvdCompressionError::InvalidInput(
                "LAPACK returned no singular vectors".to_string(),
            ))
        }
    };

    Ok(SpectralDecomposition { u, s, vt })
}
