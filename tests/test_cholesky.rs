//! Test the rank-one modification of Cholesky factors.
//!
//! The incremental O(n²) algorithm is tested against refactorisation of the modified matrix.

#![allow(non_snake_case)]

use na::{DMatrix, DVector};
use nalgebra as na;
use rand::Rng;

use ktd_estimate::linalg::cholesky::{rank_one_refactorize, rank_one_update, RankOneScratch};
use ktd_estimate::linalg::rcond;
use ktd_estimate::matrix::recompose;
use ktd_estimate::KtdError;

/// Cholesky factor of a random symmetric positive definite matrix.
fn random_factor(rng: &mut impl Rng, n: usize) -> DMatrix<f64> {
    let M = DMatrix::from_fn(n, n, |_, _| rng.gen_range(-1.0..1.));
    let X = &M * M.transpose() + DMatrix::identity(n, n) * n as f64;
    X.cholesky().unwrap().l()
}

fn random_vector(rng: &mut impl Rng, n: usize) -> DVector<f64> {
    DVector::from_fn(n, |_, _| rng.gen_range(-1.0..1.))
}

fn is_lower_triangular(L: &DMatrix<f64>) -> bool {
    (0..L.nrows()).all(|i| L[(i, i)] > 0. && (i + 1..L.ncols()).all(|j| L[(i, j)] == 0.))
}

#[test]
fn test_update() {
    let mut rng: rand::rngs::StdRng = rand::SeedableRng::seed_from_u64(1u64);
    let mut scratch = RankOneScratch::new(0);
    for n in 1..8 {
        let L = random_factor(&mut rng, n);
        let x = random_vector(&mut rng, n);

        let mut incremental = L.clone();
        let rcond = rank_one_update(&mut incremental, 1., &x, &mut scratch).unwrap();
        assert_eq!(scratch.dim(), n);
        let mut refactorized = L.clone();
        let rcond_ref = rank_one_refactorize(&mut refactorized, 1., &x).unwrap();

        assert!(is_lower_triangular(&incremental));
        approx::assert_relative_eq!(incremental, refactorized, epsilon = 1e-10);
        approx::assert_relative_eq!(recompose(&incremental), recompose(&L) + &x * x.transpose(), epsilon = 1e-10);
        approx::assert_relative_eq!(rcond, rcond_ref, epsilon = 1e-10);
        assert!(rcond > 0. && rcond <= 1.);
    }
}

#[test]
fn test_downdate() {
    let mut rng: rand::rngs::StdRng = rand::SeedableRng::seed_from_u64(2u64);
    let mut scratch = RankOneScratch::new(1);
    for n in 1..8 {
        let L = random_factor(&mut rng, n);
        // x = L.u with |u| < 1 keeps L.L' - x.x' positive definite
        let u = random_vector(&mut rng, n).normalize() * 0.9;
        let x = &L * u;

        let mut incremental = L.clone();
        rank_one_update(&mut incremental, -1., &x, &mut scratch).unwrap();
        let mut refactorized = L.clone();
        rank_one_refactorize(&mut refactorized, -1., &x).unwrap();

        assert!(is_lower_triangular(&incremental));
        approx::assert_relative_eq!(incremental, refactorized, epsilon = 1e-9);
        approx::assert_relative_eq!(recompose(&incremental), recompose(&L) - &x * x.transpose(), epsilon = 1e-9);
    }
}

/// Downdate of the identity with a vector that mixes both rows.
#[test]
fn test_downdate_coupled() {
    let mut L = DMatrix::<f64>::identity(2, 2);
    let x = DVector::from_vec(vec![0.5, 0.5]);
    rank_one_update(&mut L, -1., &x, &mut RankOneScratch::new(2)).unwrap();

    // chol([[0.75, -0.25], [-0.25, 0.75]])
    let l00 = 0.75f64.sqrt();
    let l10 = -0.25 / l00;
    let expected = DMatrix::from_row_slice(2, 2, &[l00, 0., l10, (0.75 - l10 * l10).sqrt()]);
    approx::assert_relative_eq!(L, expected, epsilon = 1e-12);
}

#[test]
fn test_zero_modification() {
    let mut L = DMatrix::from_diagonal(&DVector::from_vec(vec![2., 1.]));
    let rcond = rank_one_update(&mut L, -1., &DVector::zeros(2), &mut RankOneScratch::new(2)).unwrap();
    assert_eq!(L, DMatrix::from_diagonal(&DVector::from_vec(vec![2., 1.])));
    // rcond of L.L' = diag(4, 1)
    approx::assert_relative_eq!(rcond, 0.25);
}

/// A downdate which leaves an indefinite matrix fails and leaves the factor unmodified.
#[test]
fn test_downdate_not_positive_definite() {
    let x = DVector::from_vec(vec![2., 0.5]);

    let mut L = DMatrix::<f64>::identity(2, 2);
    let result = rank_one_update(&mut L, -1., &x, &mut RankOneScratch::new(2));
    assert!(matches!(result, Err(KtdError::NotPositiveDefinite { .. })));
    assert_eq!(L, DMatrix::identity(2, 2));

    let result = rank_one_refactorize(&mut L, -1., &x);
    assert!(matches!(result, Err(KtdError::NotPositiveDefinite { .. })));
    assert_eq!(L, DMatrix::identity(2, 2));

    // Exactly semi-definite
    let result = rank_one_update(&mut L, -1., &DVector::from_vec(vec![1., 0.]), &mut RankOneScratch::new(2));
    assert!(matches!(result, Err(KtdError::NotPositiveDefinite { .. })));
}

#[test]
fn test_dimension_mismatch() {
    let mut L = DMatrix::<f64>::identity(3, 3);
    let result = rank_one_update(&mut L, 1., &DVector::zeros(2), &mut RankOneScratch::new(3));
    assert!(matches!(
        result,
        Err(KtdError::DimensionMismatch { expected: 3, found: 2, .. })
    ));
    let result = rank_one_refactorize(&mut L, 1., &DVector::zeros(4));
    assert!(matches!(
        result,
        Err(KtdError::DimensionMismatch { expected: 3, found: 4, .. })
    ));
}

#[test]
fn test_rcond() {
    assert_eq!(rcond::rcond_vec(&DVector::<f64>::zeros(0)), 0.);
    assert_eq!(rcond::rcond_vec(&DVector::from_vec(vec![1., 4., 2.])), 0.25);
    assert_eq!(rcond::rcond_vec(&DVector::from_vec(vec![1., 0.])), 0.);
    assert!(rcond::rcond_vec(&DVector::from_vec(vec![1., -1.])) < 0.);
    assert!(rcond::rcond_vec(&DVector::from_vec(vec![1., f64::NAN])) < 0.);

    let L = DMatrix::from_row_slice(2, 2, &[2., 0., 5., 4.]);
    assert_eq!(rcond::rcond_factor(&L), 0.25);
}
