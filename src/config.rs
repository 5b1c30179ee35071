//! KTD hyperparameters.
//!
//! The hyperparameters are fixed once an estimator is constructed. They are plain `f64` values so an
//! experiment can load them from any serde format, and are converted to the estimator's scalar type on construction.

use serde::{Deserialize, Serialize};

use crate::error::{KtdError, Result};

/// Algorithm used to downdate the covariance factor after each observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DowndateMethod {
    /// O(n²) in place LU style rank-one modification of the factor.
    Incremental,
    /// Recompose L.L', subtract the rank-one term and factorise again. O(n³).
    Refactorize,
}

impl Default for DowndateMethod {
    fn default() -> Self {
        DowndateMethod::Incremental
    }
}

/// Hyperparameters of a KTD estimator.
///
/// # Examples
///
/// ```
/// use ktd_estimate::config::KtdConfig;
///
/// let config = KtdConfig::new(0.95)
///     .with_observation_noise(1e-3)
///     .with_prior_var(1.)
///     .with_random_amplitude(0.1);
/// assert!(config.validate(4).is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KtdConfig {
    /// Discount factor
    pub gamma: f64,
    /// Process noise, the covariance factor is inflated by sqrt(1 + eta_noise) before each observation
    pub eta_noise: f64,
    /// Variance of the observation (reward) noise
    pub observation_noise: f64,
    /// Prior variance of each parameter
    pub prior_var: f64,
    /// Initial parameters are drawn uniformly in [-random_amplitude, random_amplitude]
    pub random_amplitude: f64,
    /// Unscented transform spread
    pub ut_alpha: f64,
    /// Unscented transform prior knowledge of the distribution, 2 is optimal for a Gaussian
    pub ut_beta: f64,
    /// Unscented transform secondary scaling
    pub ut_kappa: f64,
    /// Evaluate q(theta, s, a) at the mean instead of the Unscented mixture. Exact for q linear in theta.
    pub use_linear_evaluation: bool,
    /// Covariance factor downdate algorithm
    pub downdate: DowndateMethod,
}

impl Default for KtdConfig {
    fn default() -> Self {
        KtdConfig {
            gamma: 0.95,
            eta_noise: 0.,
            observation_noise: 1.,
            prior_var: 10.,
            random_amplitude: 0.,
            ut_alpha: 1e-1,
            ut_beta: 2.,
            ut_kappa: 0.,
            use_linear_evaluation: false,
            downdate: DowndateMethod::default(),
        }
    }
}

impl KtdConfig {
    /// Create a configuration with discount `gamma` and default values for all other hyperparameters.
    pub fn new(gamma: f64) -> Self {
        KtdConfig {
            gamma,
            ..KtdConfig::default()
        }
    }

    pub fn with_eta_noise(mut self, eta_noise: f64) -> Self {
        self.eta_noise = eta_noise;
        self
    }

    pub fn with_observation_noise(mut self, observation_noise: f64) -> Self {
        self.observation_noise = observation_noise;
        self
    }

    pub fn with_prior_var(mut self, prior_var: f64) -> Self {
        self.prior_var = prior_var;
        self
    }

    pub fn with_random_amplitude(mut self, random_amplitude: f64) -> Self {
        self.random_amplitude = random_amplitude;
        self
    }

    /// Set the Unscented transform parameters alpha, beta and kappa.
    pub fn with_unscented(mut self, ut_alpha: f64, ut_beta: f64, ut_kappa: f64) -> Self {
        self.ut_alpha = ut_alpha;
        self.ut_beta = ut_beta;
        self.ut_kappa = ut_kappa;
        self
    }

    pub fn with_linear_evaluation(mut self, use_linear_evaluation: bool) -> Self {
        self.use_linear_evaluation = use_linear_evaluation;
        self
    }

    pub fn with_downdate(mut self, downdate: DowndateMethod) -> Self {
        self.downdate = downdate;
        self
    }

    /// The Unscented transform lambda for `n` parameters.
    pub fn ut_lambda(&self, n: usize) -> f64 {
        let n = n as f64;
        self.ut_alpha * self.ut_alpha * (n + self.ut_kappa) - n
    }

    /// Check the hyperparameters are usable for an estimator of `n` parameters.
    pub fn validate(&self, n: usize) -> Result<()> {
        let finite = [
            ("gamma", self.gamma),
            ("eta_noise", self.eta_noise),
            ("observation_noise", self.observation_noise),
            ("prior_var", self.prior_var),
            ("random_amplitude", self.random_amplitude),
            ("ut_alpha", self.ut_alpha),
            ("ut_beta", self.ut_beta),
            ("ut_kappa", self.ut_kappa),
        ];
        if let Some((name, value)) = finite.iter().find(|(_, v)| !v.is_finite()) {
            return Err(KtdError::invalid(format!("{} must be finite, got {}", name, value)));
        }

        if !(0. ..=1.).contains(&self.gamma) {
            return Err(KtdError::invalid(format!("gamma must be in [0, 1], got {}", self.gamma)));
        }
        if self.eta_noise < 0. {
            return Err(KtdError::invalid(format!("eta_noise must be >= 0, got {}", self.eta_noise)));
        }
        if self.observation_noise <= 0. {
            return Err(KtdError::invalid(format!(
                "observation_noise must be > 0, got {}",
                self.observation_noise
            )));
        }
        if self.prior_var <= 0. {
            return Err(KtdError::invalid(format!("prior_var must be > 0, got {}", self.prior_var)));
        }
        if self.random_amplitude < 0. {
            return Err(KtdError::invalid(format!(
                "random_amplitude must be >= 0, got {}",
                self.random_amplitude
            )));
        }
        if self.ut_alpha <= 0. {
            return Err(KtdError::invalid(format!("ut_alpha must be > 0, got {}", self.ut_alpha)));
        }
        let spread = n as f64 + self.ut_lambda(n);
        if spread <= 0. {
            return Err(KtdError::invalid(format!(
                "n + lambda must be > 0, got {} for {} parameters",
                spread, n
            )));
        }
        Ok(())
    }
}
