//!
//! KTD+Estimate, Kalman Temporal Differences.
//!
//! Temporal difference learning estimates the parameters of a value function from the transitions observed while a
//! system is controlled. Kalman Temporal Differences (KTD) casts this as Bayesian filtering: the parameters are the
//! hidden state, each observed reward is an observation of it through the Bellman equation.
//!
//! The estimator maintains a mean and a square root covariance of the parameters. Value functions non-linear in their
//! parameters, and the max of the greedy bootstrap, are linearised with the 'Unscented' transform. After each
//! observation the covariance factor is downdated with an O(n²) rank-one Cholesky modification.
//!
//! KTD-Q bootstraps the next state value greedily over the action set (off-policy), KTD-SARSA with the next action
//! taken (on-policy). The uncertainty of the estimates is available for exploration.
//!
//! Value functions are represented by a trait, critics by a trait. Estimator state is a struct, the hyperparameters
//! a serde configuration.
//!
//! # Licensing
//!
//! Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction,
//! including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software,
//! and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
//!
//! The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
//!
//! THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
//! FITNESS FOR A PARTICULAR PURPOSE AND NON INFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY,
//! WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

pub mod config;
pub mod error;
pub mod estimators;
pub mod linalg;
pub mod matrix;
pub mod models;
pub mod persist;

pub use config::{DowndateMethod, KtdConfig};
pub use error::{KtdError, Result};
pub use estimators::bootstrap::Bootstrap;
pub use estimators::ktd::Ktd;
pub use models::{ActionValue, Critic, ParameterBuffer};
