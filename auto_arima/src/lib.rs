//! # Auto ARIMA
//!
//! Automatic ARIMA order selection, estimation and forecasting for
//! univariate time series.
//!
//! ## Features
//!
//! - Differencing order chosen by repeated Augmented Dickey-Fuller tests
//! - Stepwise (or exhaustive) search over AR and MA orders ranked by an
//!   information criterion (AIC, AICc, BIC or HQIC)
//! - Exact maximum-likelihood estimation through a Kalman filter, seeded by
//!   conditional sum of squares
//! - Multi-step forecasts with Gaussian prediction intervals
//! - Summary table with standard errors and residual diagnostics
//!
//! ## Quick Start
//!
//! ```no_run
//! use auto_arima::{AutoArima, AutoArimaConfig, TimeSeries};
//!
//! let values: Vec<f64> = (0..600).map(|i| (i as f64 * 0.1).sin()).collect();
//! let series = TimeSeries::new(values)?;
//!
//! // Search p in 1..=3 and q in 1..=3
//! let model = AutoArima::new(AutoArimaConfig::new(1, 3, 1, 3)?)?;
//! model.fit(&series)?;
//!
//! let forecast = model.forecast(100, true)?;
//! for (value, (lower, upper)) in forecast.values().iter().zip(forecast.intervals().unwrap_or_default()) {
//!     println!("{value:.3} [{lower:.3}, {upper:.3}]");
//! }
//!
//! let params = model.get_params()?;
//! println!("{} sigma2={:.4}", params.order, params.sigma2);
//! # Ok::<(), auto_arima::ArimaError>(())
//! ```

pub mod config;
pub mod data;
pub mod diagnostics;
pub mod error;
pub mod estimator;
pub mod forecast;
mod kalman;
pub mod models;
pub mod search;
pub mod stationarity;
mod transform;

// Re-export commonly used types
pub use crate::config::{AutoArimaConfig, EstimationMethod, InformationCriterion, SearchStrategy};
pub use crate::data::TimeSeries;
pub use crate::error::{ArimaError, EstimationError, Result};
pub use crate::forecast::ForecastResult;
pub use crate::models::{AutoArima, FittedModel, ModelOrder, ModelParams};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
