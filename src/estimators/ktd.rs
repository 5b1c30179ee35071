#![allow(non_snake_case)]

//! Kalman Temporal Differences (KTD) estimation.
//!
//! A discrete Bayesian estimator of the parameters theta of an action value function q(theta, s, a).
//! The belief over theta is the mean theta and the lower triangular Cholesky factor L of its covariance.
//!
//! Each transition is an observation of the reward r. The observation model is the Bellman residual
//!
//! r = q(theta, s, a) - gamma * V(s') + noise
//!
//! which is zero mean for the true theta. It is non-linear in theta (the bootstrap V(s') is a max for KTD-Q, q may be a
//! neural network) so it is linearised with the 'Unscented' transform. For terminal transitions the bootstrap term is
//! absent, the same Kalman machinery applies.
//!
//! The mean theta lives in a [`ParameterBuffer`] shared with the readers of the value function. Only the estimator
//! writes it.

use std::fmt::{self, Display};
use std::io::{BufRead, Write};
use std::marker::PhantomData;
use std::str::FromStr;

use na::{DMatrix, DVector, RealField};
use nalgebra as na;
use rand_core::RngCore;
use rand_distr::{Distribution, Uniform};
use tracing::{debug, trace};

use crate::config::{DowndateMethod, KtdConfig};
use crate::error::{KtdError, Result};
use crate::estimators::bootstrap::{self, Bootstrap};
use crate::estimators::unscented::{self, UtWeights};
use crate::linalg::cholesky::{self, RankOneScratch};
use crate::matrix::{self, check_size};
use crate::models::{ActionValue, Critic, ParameterBuffer};
use crate::persist::{self, Scanner};

/// KTD estimator.
///
/// `S` and `A` are the state and action types of the value function `Q`. The [`Bootstrap`] selects KTD-Q or
/// KTD-SARSA, see [`Ktd::q_learning`] and [`Ktd::sarsa`].
pub struct Ktd<N: RealField, S, A, Q> {
    config: KtdConfig,
    /// Mean of the belief, shared with the value function readers
    theta: ParameterBuffer<N>,
    /// Cholesky factor of the belief covariance
    L: DMatrix<N>,
    /// Sigma points of the last observation, columns of the persisted sigma point matrix
    points: Vec<DVector<N>>,
    /// Images of the sigma points
    images: Vec<N>,
    weights: UtWeights<N>,
    scratch: RankOneScratch<N>,
    q: Q,
    bootstrap: Bootstrap<A>,
    _state: PhantomData<fn(&S)>,
}

impl<N, S, A, Q> Ktd<N, S, A, Q>
where
    N: RealField,
    Q: ActionValue<N, S, A>,
{
    /// Create a KTD estimator of the parameters in `theta`.
    ///
    /// The parameters are initialised uniformly in [-random_amplitude, random_amplitude] from `rng` and the
    /// covariance to prior_var * I.
    pub fn new<R: RngCore + ?Sized>(
        theta: ParameterBuffer<N>,
        q: Q,
        bootstrap: Bootstrap<A>,
        config: KtdConfig,
        rng: &mut R,
    ) -> Result<Self> {
        let n = theta.len();
        if n == 0 {
            return Err(KtdError::EmptyParameters);
        }
        config.validate(n)?;
        if let Bootstrap::Greedy(actions) = &bootstrap {
            if actions.is_empty() {
                return Err(KtdError::EmptyActionSet);
            }
        }

        {
            let mut theta = theta.write()?;
            if config.random_amplitude > 0. {
                let uniform = Uniform::new_inclusive(-config.random_amplitude, config.random_amplitude);
                for t in theta.iter_mut() {
                    *t = na::convert(uniform.sample(&mut *rng));
                }
            } else {
                theta.fill(N::zero());
            }
        }

        let weights = UtWeights::new(
            n,
            na::convert(config.ut_alpha),
            na::convert(config.ut_beta),
            na::convert(config.ut_kappa),
        );
        let prior_sd: N = na::convert(config.prior_var.sqrt());
        debug!(
            parameters = n,
            w_m0 = ?weights.w_m0,
            w_c0 = ?weights.w_c0,
            w_i = ?weights.w_i,
            "KTD estimator created"
        );

        Ok(Ktd {
            config,
            theta,
            L: DMatrix::identity(n, n) * prior_sd,
            points: vec![DVector::zeros(n); 2 * n + 1],
            images: vec![N::zero(); 2 * n + 1],
            weights,
            scratch: RankOneScratch::new(n),
            q,
            bootstrap,
            _state: PhantomData,
        })
    }

    /// KTD-Q, the next state value is bootstrapped greedily over `actions`.
    pub fn q_learning<R: RngCore + ?Sized>(
        theta: ParameterBuffer<N>,
        q: Q,
        actions: Vec<A>,
        config: KtdConfig,
        rng: &mut R,
    ) -> Result<Self> {
        Self::new(theta, q, Bootstrap::Greedy(actions), config, rng)
    }

    /// KTD-SARSA, the next state value is bootstrapped with the next action taken.
    pub fn sarsa<R: RngCore + ?Sized>(theta: ParameterBuffer<N>, q: Q, config: KtdConfig, rng: &mut R) -> Result<Self> {
        Self::new(theta, q, Bootstrap::OnPolicy, config, rng)
    }

    /// Learn from a transition (s, a, r) into a terminal state.
    ///
    /// Return: reciprocal condition number of the updated covariance
    pub fn learn_terminal(&mut self, s: &S, a: &A, r: N) -> Result<N> {
        self.kalman_update(s, a, r, None)
    }

    /// Learn from a transition (s, a, r, s', a'). KTD-Q ignores a'.
    ///
    /// Return: reciprocal condition number of the updated covariance
    pub fn learn(&mut self, s: &S, a: &A, r: N, s_next: &S, a_next: &A) -> Result<N> {
        self.kalman_update(s, a, r, Some((s_next, a_next)))
    }

    fn kalman_update(&mut self, s: &S, a: &A, r: N, next: Option<(&S, &A)>) -> Result<N> {
        let n = self.dimension();
        {
            // Fail before modifying anything if a reader holds the parameters
            let theta = self.theta.write()?;
            check_size(&*theta, n, "parameter vector")?;
        }

        let gamma: N = na::convert(self.config.gamma);
        let observation_noise: N = na::convert(self.config.observation_noise);
        let inflation: N = na::convert((1. + self.config.eta_noise).sqrt());

        // Prediction: the mean is unchanged, process noise inflates the covariance
        self.L *= inflation;

        let (pred_r, P_r, gain) = {
            let theta = self.theta.read();
            unscented::sigma_points(&*theta, &self.L, self.weights.scale(), &mut self.points)?;
            self.images.resize(self.points.len(), N::zero());

            for (yi, point) in self.images.iter_mut().zip(self.points.iter()) {
                let mut y = self.q.value(point, s, a);
                if let Some((s_next, a_next)) = next {
                    y -= gamma * self.bootstrap.next_value(&self.q, point, s_next, a_next);
                }
                *yi = y;
            }

            // Predicted reward and its variance
            let pred_r = self.weights.mean(&self.images);
            let P_r = self.weights.variance(&self.images, pred_r) + observation_noise;
            // Correlation between parameters and reward
            let P_theta_r = unscented::cross_covariance(&self.points, &*theta, &self.images, pred_r, &self.weights);

            (pred_r, P_r, P_theta_r / P_r)
        };

        // Correction, L.L' -= P_r K.K' before the mean is committed
        let mut theta = self.theta.write()?;
        let rcond = match self.config.downdate {
            DowndateMethod::Incremental => cholesky::rank_one_update(&mut self.L, -P_r, &gain, &mut self.scratch),
            DowndateMethod::Refactorize => cholesky::rank_one_refactorize(&mut self.L, -P_r, &gain),
        }?;
        let innovation = r - pred_r;
        theta.axpy(innovation, &gain, N::one());

        trace!(
            predicted = ?pred_r,
            innovation = ?innovation,
            variance = ?P_r,
            rcond = ?rcond,
            terminal = next.is_none(),
            "KTD update"
        );
        Ok(rcond)
    }

    /// Value estimate of q(theta, s, a).
    ///
    /// With `use_linear_evaluation` q is evaluated at the mean, otherwise the Unscented mixture of q over fresh sigma
    /// points of the current belief.
    pub fn evaluate(&self, s: &S, a: &A) -> Result<N> {
        if self.config.use_linear_evaluation {
            let theta = self.theta.read();
            check_size(&*theta, self.dimension(), "parameter vector")?;
            Ok(self.q.value(&*theta, s, a))
        } else {
            let images = self.propagate(s, a)?;
            Ok(self.weights.mean(&images))
        }
    }

    /// Value estimate of q(theta, s, a) with its predictive variance.
    ///
    /// The variance is that of the Unscented images about the estimate, without observation noise. The sigma points
    /// are propagated for the variance in both evaluation modes.
    pub fn evaluate_with_variance(&self, s: &S, a: &A) -> Result<(N, N)> {
        let images = self.propagate(s, a)?;
        let value = if self.config.use_linear_evaluation {
            let theta = self.theta.read();
            self.q.value(&*theta, s, a)
        } else {
            self.weights.mean(&images)
        };
        Ok((value, self.weights.variance(&images, value)))
    }

    fn propagate(&self, s: &S, a: &A) -> Result<Vec<N>> {
        let theta = self.theta.read();
        check_size(&*theta, self.dimension(), "parameter vector")?;
        let mut points = Vec::with_capacity(self.points.len());
        unscented::sigma_points(&*theta, &self.L, self.weights.scale(), &mut points)?;
        Ok(points.iter().map(|point| self.q.value(point, s, a)).collect())
    }

    /// The action of `actions` with the largest value estimate in `s`, with its value. First maximum wins ties.
    pub fn greedy_over<'a>(&self, s: &S, actions: &'a [A]) -> Result<Option<(&'a A, N)>> {
        let mut best: Option<(&'a A, N)> = None;
        for a in actions {
            let value = self.evaluate(s, a)?;
            let better = match best {
                Some((_, max)) => value > max,
                None => true,
            };
            if better {
                best = Some((a, value));
            }
        }
        Ok(best)
    }

    /// The greedy action of a KTD-Q estimator in `s` and its value. None for KTD-SARSA.
    pub fn greedy(&self, s: &S) -> Result<Option<(&A, N)>> {
        match self.bootstrap.actions() {
            Some(actions) => self.greedy_over(s, actions),
            None => Ok(None),
        }
    }

    /// Max over the action set of q at the mean parameters. None for KTD-SARSA.
    pub fn max_value(&self, s: &S) -> Option<N> {
        let actions = self.bootstrap.actions()?;
        let theta = self.theta.read();
        bootstrap::max_over(&self.q, &*theta, s, actions).map(|(_, value)| value)
    }
}

impl<N: RealField, S, A, Q> Ktd<N, S, A, Q> {
    /// Number of parameters.
    pub fn dimension(&self) -> usize {
        self.L.nrows()
    }

    /// Copy of the current mean.
    pub fn theta(&self) -> DVector<N> {
        self.theta.snapshot()
    }

    /// The shared parameter buffer.
    pub fn parameters(&self) -> &ParameterBuffer<N> {
        &self.theta
    }

    pub fn covariance_factor(&self) -> &DMatrix<N> {
        &self.L
    }

    /// Covariance of the belief, L.L'.
    pub fn covariance(&self) -> DMatrix<N> {
        matrix::recompose(&self.L)
    }

    /// Sigma points of the last update.
    pub fn sigma_points(&self) -> &[DVector<N>] {
        &self.points
    }

    pub fn weights(&self) -> &UtWeights<N> {
        &self.weights
    }

    pub fn config(&self) -> &KtdConfig {
        &self.config
    }

    pub fn bootstrap(&self) -> &Bootstrap<A> {
        &self.bootstrap
    }
}

/// Clones share the parameter buffer, all other state is copied.
impl<N: RealField, S, A: Clone, Q: Clone> Clone for Ktd<N, S, A, Q> {
    fn clone(&self) -> Self {
        Ktd {
            config: self.config.clone(),
            theta: self.theta.clone(),
            L: self.L.clone(),
            points: self.points.clone(),
            images: self.images.clone(),
            weights: self.weights,
            scratch: self.scratch.clone(),
            q: self.q.clone(),
            bootstrap: self.bootstrap.clone(),
            _state: PhantomData,
        }
    }
}

impl<N: RealField, S, A: Clone, Q: Clone> Ktd<N, S, A, Q> {
    /// Clone with a parameter buffer of its own holding a copy of the current mean.
    pub fn clone_detached(&self) -> Self {
        let mut detached = self.clone();
        detached.theta = self.theta.detached();
        detached
    }

    /// Assign the state of `other` to this estimator.
    ///
    /// The mean of `other` is copied into this estimator's own parameter buffer, which stays shared with its readers.
    /// Fails without modification if the number of parameters differ.
    pub fn assign_from(&mut self, other: &Self) -> Result<()> {
        let expected = self.dimension();
        let found = other.dimension();
        if expected != found || self.theta.len() != other.theta.len() {
            return Err(KtdError::ParameterSizeMismatch {
                expected: self.theta.len(),
                found: other.theta.len(),
            });
        }

        if !self.theta.shares(&other.theta) {
            let mean = other.theta.snapshot();
            *self.theta.write()? = mean;
        }
        self.config = other.config.clone();
        self.L.copy_from(&other.L);
        self.points.clone_from(&other.points);
        self.images.clone_from(&other.images);
        self.weights = other.weights;
        self.scratch = other.scratch.clone();
        self.q = other.q.clone();
        self.bootstrap = other.bootstrap.clone();
        Ok(())
    }
}

impl<N: RealField + Display + FromStr, S, A, Q> Ktd<N, S, A, Q> {
    /// Write the estimator state: `w_m0 w_c0 w_i`, the mean, the covariance factor and the sigma points.
    pub fn write_state<W: Write>(&self, w: &mut W) -> Result<()> {
        write!(w, "{}", self)?;
        Ok(())
    }

    /// Read an estimator state written by [`write_state`].
    ///
    /// The buffers are reallocated to the sizes read. The state is only assigned if it is complete and consistent:
    /// finite weights with w_i > 0, and for n parameters the factor must be n x n and the sigma point matrix
    /// n x (2n+1).
    ///
    /// [`write_state`]: Ktd::write_state
    pub fn read_state<R: BufRead>(&mut self, r: &mut R) -> Result<()> {
        let mut scanner = Scanner::new(r);
        let w_m0: N = scanner.read_scalar()?;
        let w_c0: N = scanner.read_scalar()?;
        let w_i: N = scanner.read_scalar()?;
        let theta: DVector<N> = scanner.read_vector()?;
        let L: DMatrix<N> = scanner.read_matrix()?;
        let points: DMatrix<N> = scanner.read_matrix()?;

        if !(w_i > N::zero() && w_i.is_finite() && w_m0.is_finite() && w_c0.is_finite()) {
            return Err(KtdError::parse(format!(
                "Unscented weights must be finite with w_i > 0, got {} {} {}",
                w_m0, w_c0, w_i
            )));
        }

        let n = theta.nrows();
        if n == 0 {
            return Err(KtdError::EmptyParameters);
        }
        for &(what, found, expected) in [
            ("covariance factor rows", L.nrows(), n),
            ("covariance factor columns", L.ncols(), n),
            ("sigma point rows", points.nrows(), n),
            ("sigma point columns", points.ncols(), 2 * n + 1),
        ]
        .iter()
        {
            if found != expected {
                return Err(KtdError::DimensionMismatch {
                    what,
                    expected,
                    found,
                });
            }
        }

        *self.theta.write()? = theta;
        self.weights = UtWeights { w_m0, w_c0, w_i };
        self.L = L;
        self.points = (0..points.ncols()).map(|j| points.column(j).clone_owned()).collect();
        self.images = vec![N::zero(); 2 * n + 1];
        self.scratch = RankOneScratch::new(n);
        debug!(parameters = n, "KTD state read");
        Ok(())
    }
}

impl<N: RealField + Display, S, A, Q> Display for Ktd<N, S, A, Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} ", self.weights.w_m0, self.weights.w_c0, self.weights.w_i)?;
        persist::write_vector(f, &*self.theta.read())?;
        persist::write_matrix(f, &self.L)?;
        if self.points.is_empty() {
            persist::write_matrix(f, &DMatrix::<N>::zeros(self.dimension(), 0))
        } else {
            persist::write_matrix(f, &DMatrix::from_columns(self.points.as_slice()))
        }
    }
}

impl<N, S, A, Q> Critic<N, S, A> for Ktd<N, S, A, Q>
where
    N: RealField,
    Q: ActionValue<N, S, A>,
{
    fn learn_terminal(&mut self, s: &S, a: &A, r: N) -> Result<N> {
        self.kalman_update(s, a, r, None)
    }

    fn learn(&mut self, s: &S, a: &A, r: N, s_next: &S, a_next: &A) -> Result<N> {
        self.kalman_update(s, a, r, Some((s_next, a_next)))
    }
}
