#![allow(non_snake_case)]

use na::{DMatrix, DVector, RealField};
use nalgebra as na;

use crate::error::{KtdError, Result};

/// Computes the symmetric rank-one modification `mat = alpha * x * x.transpose() + beta * mat`.
pub fn quadform_x<N: RealField>(mat: &mut DMatrix<N>, alpha: N, x: &DVector<N>, beta: N) {
    mat.ger(alpha, x, x, beta);
}

/// Recompose the symmetric matrix L.L' from its factor L.
pub fn recompose<N: RealField>(L: &DMatrix<N>) -> DMatrix<N> {
    L * L.transpose()
}

/// Checks a the reciprocal condition number is > 0 .
///
/// IEC 559 NaN values are never true
pub fn check_positive<N: RealField>(rcond: N, context: &'static str) -> Result<N> {
    if rcond > N::zero() {
        Ok(rcond)
    } else {
        Err(KtdError::NotPositiveDefinite { context })
    }
}

/// Checks a vector has the expected number of rows.
pub fn check_size<N: RealField>(v: &DVector<N>, expected: usize, what: &'static str) -> Result<()> {
    if v.nrows() == expected {
        Ok(())
    } else {
        Err(KtdError::DimensionMismatch {
            what,
            expected,
            found: v.nrows(),
        })
    }
}
