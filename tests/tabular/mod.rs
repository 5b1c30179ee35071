//! Tabular action value functions shared by the KTD tests.
//!
//! States and actions are indices, theta holds one value per (state, action) pair.

#![allow(dead_code)]

use na::DVector;
use nalgebra as na;

use ktd_estimate::config::KtdConfig;
use ktd_estimate::estimators::ktd::Ktd;
use ktd_estimate::models::ParameterBuffer;

pub const ACTIONS: usize = 2;

pub type Tabular = fn(&DVector<f64>, &usize, &usize) -> f64;

pub type TabularKtd = Ktd<f64, usize, usize, Tabular>;

pub fn tabular(theta: &DVector<f64>, s: &usize, a: &usize) -> f64 {
    theta[s * ACTIONS + a]
}

pub fn index(s: usize, a: usize) -> usize {
    s * ACTIONS + a
}

pub fn rng() -> rand::rngs::StdRng {
    rand::SeedableRng::seed_from_u64(1u64)
}

/// KTD-Q over `states` states and the two actions.
pub fn q_learning(states: usize, config: KtdConfig) -> TabularKtd {
    Ktd::q_learning(
        ParameterBuffer::zeros(states * ACTIONS),
        tabular as Tabular,
        (0..ACTIONS).collect(),
        config,
        &mut rng(),
    )
    .unwrap()
}

/// KTD-SARSA over `states` states and the two actions.
pub fn sarsa(states: usize, config: KtdConfig) -> TabularKtd {
    Ktd::sarsa(
        ParameterBuffer::zeros(states * ACTIONS),
        tabular as Tabular,
        config,
        &mut rng(),
    )
    .unwrap()
}

pub fn trace(ktd: &TabularKtd) -> f64 {
    ktd.covariance().trace()
}
