#![allow(non_snake_case)]

//! Rank-one modification of Cholesky factors.
//!
//! The covariance of the parameter belief is represented by its lower triangular Cholesky factor L, where L.L' == X.
//! An observation subtracts a rank-one term from X. Rather than recompose and factorise X again, the factor is
//! modified directly:
//!
//! L.L' + alpha * x.x' == L1.L1'
//!
//! alpha < 0 is a downdate which may fail to leave a positive definite result. Failure is reported and never hidden by
//! clamping: for a filter it means the belief has diverged.
//!
//! Storage:
//! Only the lower triangle of L is part of the factor, the strict upper triangle is kept zero.

use na::{DMatrix, DVector, RealField};
use nalgebra as na;
use tracing::warn;

use super::rcond;
use crate::error::{KtdError, Result};
use crate::matrix::{self, check_positive, check_size};

/// Scratch for the incremental update.
///
/// Provides temporary variables so an update does not allocate. The factor is modified in the scratch copy and
/// only committed when every pivot is positive.
#[derive(Clone, Debug)]
pub struct RankOneScratch<N: RealField> {
    /// Working copy of the factor, unit lower triangular L during the update
    L: DMatrix<N>,
    /// Upper triangular U of the L.U form
    U: DMatrix<N>,
    /// Diagonal of the factor
    D: DVector<N>,
    x: DVector<N>,
    y: DVector<N>,
}

impl<N: RealField> RankOneScratch<N> {
    pub fn new(n: usize) -> Self {
        RankOneScratch {
            L: DMatrix::zeros(n, n),
            U: DMatrix::zeros(n, n),
            D: DVector::zeros(n),
            x: DVector::zeros(n),
            y: DVector::zeros(n),
        }
    }

    pub fn dim(&self) -> usize {
        self.D.nrows()
    }
}

/// In place rank-one modification of the lower triangular Cholesky factor L, so that L.L' becomes L.L' + alpha x.x'.
///
/// The algorithm adapts a rank-one modification of an L.U factorisation.
/// Reference: P. Stange, A. Griewank, M. Bollhöfer, On the Efficient Update of Rectangular LU Factorizations subject to
/// Low Rank Modifications. ETNA 26:161-177, 2007, fig. 2.1 left.
///
/// The Cholesky factor is first put in L.U form, L = L.inv(D) unit lower triangular and U = D.L', D = diagonal(L).
/// After the modification the factor is recovered as L.sqrt(diagonal(U)). Complexity O(n²).
///
/// Input: L a Cholesky factor with positive diagonal, x of matching size.
///
/// Output: L modified, only if all pivots remain positive. Otherwise L is unmodified.
///
/// Return: reciprocal condition number of L.L'
pub fn rank_one_update<N: RealField>(
    L: &mut DMatrix<N>,
    alpha: N,
    x: &DVector<N>,
    scratch: &mut RankOneScratch<N>,
) -> Result<N> {
    let n = L.nrows();
    if L.ncols() != n {
        return Err(KtdError::DimensionMismatch {
            what: "covariance factor columns",
            expected: n,
            found: L.ncols(),
        });
    }
    check_size(x, n, "rank-one vector")?;
    if scratch.dim() != n {
        *scratch = RankOneScratch::new(n);
    }

    let RankOneScratch { L: Lu, U, D, x: w, y } = scratch;
    Lu.copy_from(L);
    U.fill(N::zero());

    // Factor in L.U form
    for i in 0..n {
        let d = Lu[(i, i)];
        if !(d > N::zero()) {
            return Err(KtdError::NotPositiveDefinite {
                context: "covariance factor has a non positive diagonal",
            });
        }
        D[i] = d;
        for j in 0..=i {
            U[(j, i)] = Lu[(i, j)];
        }
    }
    for i in 0..n {
        for j in 0..=i {
            Lu[(i, j)] /= D[j];
            U[(j, i)] *= D[j];
        }
    }

    w.copy_from(x);
    y.copy_from(x);
    *y *= alpha;

    // Rank-one modification of L.U
    for i in 0..n {
        // U(i,i) is final once modified at step i
        let pivot = U[(i, i)] + w[i] * y[i];
        if !(pivot > N::zero()) {
            warn!(pivot = ?pivot, row = i, "rank-one downdate lost positive definiteness");
            return Err(KtdError::NotPositiveDefinite {
                context: "non positive pivot in rank-one Cholesky update",
            });
        }
        U[(i, i)] = pivot;
        y[i] /= pivot;
        let wi = w[i];
        let yi = y[i];

        for j in i + 1..n {
            w[j] -= wi * Lu[(j, i)];
            Lu[(j, i)] += yi * w[j];
        }
        for j in i + 1..n {
            U[(i, j)] += wi * y[j];
            y[j] -= yi * U[(i, j)];
        }
    }

    // Back to a Cholesky factor, L = L.sqrt(diagonal(U))
    for i in 0..n {
        D[i] = U[(i, i)].sqrt();
    }
    for i in 0..n {
        for j in 0..=i {
            Lu[(i, j)] *= D[j];
        }
    }

    std::mem::swap(L, Lu);
    let rcond = rcond::rcond_vec(D);
    check_positive(rcond * rcond, "rank-one Cholesky update")
}

/// Rank-one modification of the lower triangular Cholesky factor L by recomposition and factorisation.
///
/// Computes the factor of L.L' + alpha x.x' from scratch. Complexity O(n³), baseline for [`rank_one_update`].
///
/// Output: L modified, only if L.L' + alpha x.x' is positive definite. Otherwise L is unmodified.
///
/// Return: reciprocal condition number of L.L'
pub fn rank_one_refactorize<N: RealField>(L: &mut DMatrix<N>, alpha: N, x: &DVector<N>) -> Result<N> {
    let n = L.nrows();
    check_size(x, n, "rank-one vector")?;

    let mut X = matrix::recompose(L);
    matrix::quadform_x(&mut X, alpha, x, N::one());

    match X.cholesky() {
        Some(chol) => {
            *L = chol.l();
            check_positive(rcond::rcond_factor(L), "Cholesky factorisation")
        }
        None => {
            warn!("Cholesky refactorisation failed, modified covariance not positive definite");
            Err(KtdError::NotPositiveDefinite {
                context: "Cholesky factorisation of modified covariance",
            })
        }
    }
}
