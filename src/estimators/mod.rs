//! Kalman Temporal Differences estimators.

pub mod bootstrap;
pub mod ktd;
pub mod unscented;
