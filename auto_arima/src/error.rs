//! Error types for the auto_arima crate

use crate::models::ModelOrder;
use thiserror::Error;

/// Numerical failure while estimating one fixed ARIMA order.
///
/// The order search recovers from these locally by skipping the candidate.
/// They only reach the caller wrapped in [`ArimaError::Estimation`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimationError {
    /// The differenced series has too few usable observations for the order
    #[error("not enough observations: {available} usable, need more than {required}")]
    NotEnoughObservations { available: usize, required: usize },

    /// The parameter covariance matrix could not be inverted
    #[error("singular or ill-conditioned covariance (condition number {condition:.3e})")]
    SingularCovariance { condition: f64 },

    /// The optimizer ended on a non-finite objective or parameter vector
    #[error("optimizer diverged after {iterations} iterations")]
    Diverged { iterations: u64 },

    /// The stationary state covariance of the Kalman filter has no solution
    #[error("initial state covariance could not be solved")]
    StateCovariance,

    /// The fitted innovations have zero variance
    #[error("residual variance is zero")]
    ZeroVariance,

    /// The optimizer rejected its setup
    #[error("optimizer error: {0}")]
    Optimizer(String),
}

/// Custom error types for the auto_arima crate
#[derive(Debug, Error)]
pub enum ArimaError {
    /// The series is too short for the requested test or order
    #[error("Insufficient data for {stage}: need at least {needed} observations, got {got}")]
    InsufficientData {
        stage: String,
        needed: usize,
        got: usize,
    },

    /// Every candidate evaluated by the order search failed to estimate
    #[error(
        "No viable model: all {attempted} candidate(s) ARIMA(p,{d},q) with p in {start_p}..={max_p}, q in {start_q}..={max_q} failed"
    )]
    NoViableModel {
        d: usize,
        start_p: usize,
        max_p: usize,
        start_q: usize,
        max_q: usize,
        attempted: usize,
    },

    /// Estimation of a specific order failed, returned by
    /// [`estimate`](crate::estimator::estimate)
    #[error("Estimation error for {order}: {source}")]
    Estimation {
        order: ModelOrder,
        #[source]
        source: EstimationError,
    },

    /// An operation needing a fitted model ran before a successful fit
    #[error("Model not fitted: call fit() before {operation}()")]
    ModelNotFitted { operation: &'static str },

    /// Invalid configuration values
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error related to data validation
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Error from invalid call parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error from building the parameter mapping
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ArimaError>;
