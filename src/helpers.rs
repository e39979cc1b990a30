//! Routines needed by the other modules.

use ndarray::{ArrayBase, Data, Ix1, Ix2};
use ndarray_linalg::{Norm, OperationNorm};

pub trait RelDiff<Rhs = Self> {
    /// Return the relative difference of `self` and `other`, measured
    /// in the Frobenius norm for matrices and the l2 norm for vectors.
    ///
    /// Returns the absolute difference if `other` is zero.
    fn rel_diff(&self, other: &Rhs) -> f64;
}

impl<S1, S2> RelDiff<ArrayBase<S2, Ix2>> for ArrayBase<S1, Ix2>
where
    S1: Data<Elem = f64>,
    S2: Data<Elem = f64>,
{
    fn rel_diff(&self, other: &ArrayBase<S2, Ix2>) -> f64 {
        let diff = self - other;
        let diff_norm = diff.opnorm_fro().unwrap_or(f64::NAN);
        let other_norm = other.opnorm_fro().unwrap_or(f64::NAN);

        if other_norm == 0.0 {
            diff_norm
        } else {
            diff_norm / other_norm
        }
    }
}

impl<S1, S2> RelDiff<ArrayBase<S2, Ix1>> for ArrayBase<S1, Ix1>
where
    S1: Data<Elem = f64>,
    S2: Data<Elem = f64>,
{
    fn rel_diff(&self, other: &ArrayBase<S2, Ix1>) -> f64 {
        let diff = self - other;
        let other_norm = other.norm_l2();

        if other_norm == 0.0 {
            diff.norm_l2()
        } else {
            diff.norm_l2() / other_norm
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array2};

    #[test]
    fn test_rel_diff_matrix() {
        let first = array![[1.0, 0.0], [0.0, 1.0]];
        let second = array![[2.0, 0.0], [0.0, 2.0]];

        assert_relative_eq!(first.rel_diff(&second), 0.5, epsilon = 1E-12);
    }

    #[test]
    fn test_rel_diff_against_zero_is_absolute() {
        let first = array![3.0, 4.0];
        let second = ndarray::Array1::<f64>::zeros(2);

        assert_relative_eq!(first.rel_diff(&second), 5.0, epsilon = 1E-12);
        assert_eq!(Array2::<f64>::eye(3).rel_diff(&Array2::<f64>::eye(3)), 0.0);
    }
}
