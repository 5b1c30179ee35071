//! Linear algebra for square root covariance representations.

pub mod cholesky;
pub mod rcond;
