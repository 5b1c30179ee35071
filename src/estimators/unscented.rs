#![allow(non_snake_case)]

//! Scaled 'Unscented' transform of a parameter belief.
//!
//! The belief is a mean theta and the Cholesky factor L of its covariance. The transform represents it with 2n+1
//! deterministic sigma points that have the same mean and covariance:
//!
//! point 0 = theta, points 1..n = theta + c.L(:,i), points n+1..2n = theta - c.L(:,i), with c = sqrt(n + lambda).
//!
//! The images of the points through a non-linear function are recombined with the [`UtWeights`] into the mean and
//! covariance of the transformed distribution. For a function linear in theta the recombination is exact.

use na::{DMatrix, DVector, RealField};
use nalgebra as na;

use crate::error::{KtdError, Result};

/// The three Unscented weights.
///
/// All points other than the centre point share the weight `w_i`. The weights only depend on the parameter
/// dimension and the transform hyperparameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UtWeights<N: RealField> {
    /// Mean weight of point 0
    pub w_m0: N,
    /// Covariance weight of point 0
    pub w_c0: N,
    /// Weight of points 1..2n
    pub w_i: N,
}

impl<N: RealField> UtWeights<N> {
    /// Weights of the scaled transform for `n` parameters.
    ///
    /// lambda = alpha²(n + kappa) - n, w_m0 = lambda/(n+lambda), w_c0 = w_m0 + 1 - alpha² + beta, w_i = 1/(2(n+lambda))
    pub fn new(n: usize, alpha: N, beta: N, kappa: N) -> Self {
        let n = N::from_usize(n).unwrap_or_else(N::zero);
        let two = N::one() + N::one();
        let alpha2 = alpha * alpha;
        let lambda = alpha2 * (n + kappa) - n;

        let w_m0 = lambda / (n + lambda);
        UtWeights {
            w_m0,
            w_c0: w_m0 + N::one() - alpha2 + beta,
            w_i: N::one() / (two * (n + lambda)),
        }
    }

    /// The sigma point spread c = sqrt(n + lambda).
    ///
    /// Derived from `w_i` so weights read back from a persisted state keep a consistent spread.
    pub fn scale(&self) -> N {
        let two = N::one() + N::one();
        (N::one() / (two * self.w_i)).sqrt()
    }

    /// Weighted mean of the scalar images of the sigma points.
    ///
    /// # Panics
    /// If `images` is empty. Sigma point images always include the centre point.
    pub fn mean(&self, images: &[N]) -> N {
        let mut mean = self.w_m0 * images[0];
        for yi in &images[1..] {
            mean += self.w_i * *yi;
        }
        mean
    }

    /// Weighted variance of the scalar images of the sigma points about `mean`.
    ///
    /// # Panics
    /// If `images` is empty.
    pub fn variance(&self, images: &[N], mean: N) -> N {
        let d = images[0] - mean;
        let mut variance = self.w_c0 * d * d;
        for yi in &images[1..] {
            let d = *yi - mean;
            variance += self.w_i * d * d;
        }
        variance
    }
}

/// Generate the 2n+1 sigma points of theta, L into `points`.
///
/// `points` is resized as required, existing vectors of the right size are reused.
pub fn sigma_points<N: RealField>(theta: &DVector<N>, L: &DMatrix<N>, scale: N, points: &mut Vec<DVector<N>>) -> Result<()> {
    let n = theta.nrows();
    if L.nrows() != n || L.ncols() != n {
        return Err(KtdError::DimensionMismatch {
            what: "covariance factor",
            expected: n,
            found: L.nrows(),
        });
    }

    points.resize_with(2 * n + 1, || DVector::zeros(n));
    for p in points.iter_mut() {
        if p.nrows() != n {
            *p = DVector::zeros(n);
        }
        p.copy_from(theta);
    }

    for i in 0..n {
        let column = L.column(i);
        points[i + 1].axpy(scale, &column, N::one());
        points[i + 1 + n].axpy(-scale, &column, N::one());
    }
    Ok(())
}

/// Cross covariance of the sigma points with their scalar images.
///
/// P_theta_y = w_i * sum over i in 1..2n of (point_i - theta) * (y_i - mean).
///
/// The centre point does not contribute, unlike in the variance where it carries w_c0. For points generated by
/// [`sigma_points`] from the same theta its deviation is zero.
pub fn cross_covariance<N: RealField>(
    points: &[DVector<N>],
    theta: &DVector<N>,
    images: &[N],
    mean: N,
    weights: &UtWeights<N>,
) -> DVector<N> {
    let mut XY = DVector::zeros(theta.nrows());
    for (point, yi) in points.iter().zip(images.iter()).skip(1) {
        let centred = point - theta;
        XY.axpy(weights.w_i * (*yi - mean), &centred, N::one());
    }
    XY
}

/// Mean and covariance of vector valued images of the sigma points.
///
/// # Panics
/// If `images` is empty.
pub fn kalman<N: RealField>(images: &[DVector<N>], weights: &UtWeights<N>) -> (DVector<N>, DMatrix<N>) {
    let size = images[0].nrows();

    // Mean of the distribution: x
    let mut x = images[0].scale(weights.w_m0);
    for yi in &images[1..] {
        x.axpy(weights.w_i, yi, N::one());
    }

    // Covariance of the distribution: X
    let mut X = DMatrix::zeros(size, size);
    let d0 = &images[0] - &x;
    X.ger(weights.w_c0, &d0, &d0, N::one());
    for yi in &images[1..] {
        let di = yi - &x;
        X.ger(weights.w_i, &di, &di, N::one());
    }
    (x, X)
}
