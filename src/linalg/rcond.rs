#![allow(non_snake_case)]

use nalgebra::{DMatrix, DVector, RealField};

/**
 * Numerical comparison of reciprocal condition numbers
 *  Required for checking the covariance factor after each update
 */

/* Estimate the reciprocal condition number of a Diagonal Matrix for inversion.
 * D represents a diagonal matrix, the parameter is actually passed as a vector
 *
 * The Condition Number is defined from a matrix norm.
 *  Choose max element of D as the norm of the original matrix.
 *  Assume this norm for inverse matrix is min element D.
 *  Therefore rcond = min/max
 *
 * Note:
 *  Defined to be 0 for semi-definite and 0 for an empty matrix
 *  Defined to be 0 for max and min infinite
 *  Defined to be <0 for negative matrix (D element a value  < 0)
 *  Defined to be <0 with any NaN element
 */
pub fn rcond_vec<N: RealField>(dv: &DVector<N>) -> N {
    rcond_iter(dv.iter().cloned())
}

/// Estimate the reciprocal condition number of the diagonal of a square matrix.
pub fn rcond_symetric<N: RealField>(sm: &DMatrix<N>) -> N {
    let n = sm.nrows().min(sm.ncols());
    rcond_iter((0..n).map(|i| sm[(i, i)]))
}

/// Estimate the reciprocal condition number of L.L' for a triangular factor L.
///
/// The rcond of L.L' is the square of the rcond of diagonal(L). The factor diagonal of a
/// Cholesky factor is positive, a negative rcond is propagated with its sign.
pub fn rcond_factor<N: RealField>(L: &DMatrix<N>) -> N {
    let rcond = rcond_symetric(L);
    if rcond < N::zero() {
        -(rcond * rcond)
    } else {
        rcond * rcond
    }
}

fn rcond_iter<N: RealField>(mut diagonal: impl Iterator<Item = N>) -> N {
    // Special case an empty matrix
    let first = match diagonal.next() {
        Some(d) => d,
        None => return N::zero(),
    };
    let mut mind = first;
    let mut maxd = first;

    for d in std::iter::once(first).chain(diagonal) {
        if d != d {
            // NaN
            return -N::one();
        }
        if d < mind {
            mind = d;
        }
        if d > maxd {
            maxd = d;
        }
    }

    rcond_min_max(mind, maxd)
}

fn rcond_min_max<N: RealField>(mind: N, maxd: N) -> N {
    if mind < N::zero() {
        // matrix is negative
        mind    // mind < 0 but does not represent a rcond
    } else {
        let rcond = mind / maxd; // rcond from min/max norm
        if rcond != rcond {
            // NaN, singular due to (mind == maxd) == (zero or infinity)
            N::zero()
        } else {
            rcond
        }
    }
}
