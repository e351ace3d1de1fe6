//! # ARIMA Workspace
//!
//! `arima_workspace` re-exports the [`auto_arima`] crate, which selects,
//! estimates and forecasts ARIMA models automatically.
//!
//! ## Example
//!
//! ```
//! use arima_workspace::{AutoArima, ModelOrder};
//!
//! let model = AutoArima::with_orders(1, 3, 1, 3).unwrap();
//! assert!(!model.is_fitted());
//! assert_eq!(ModelOrder::new(2, 1, 1).to_string(), "ARIMA(2,1,1)");
//! ```

pub use auto_arima::*;
