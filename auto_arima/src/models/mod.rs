//! ARIMA model orders, fitted models and the reusable model handle

use serde::Serialize;
use std::fmt;

/// ARIMA order `(p, d, q)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ModelOrder {
    /// AR order
    pub p: usize,
    /// Differencing order
    pub d: usize,
    /// MA order
    pub q: usize,
}

impl ModelOrder {
    /// Create a new order
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    /// Number of AR and MA coefficients, `p + q`
    pub fn arma_terms(&self) -> usize {
        self.p + self.q
    }
}

impl fmt::Display for ModelOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

pub mod arima;
pub mod auto;

pub use arima::{fit_auto, FittedModel, ModelParams};
pub use auto::AutoArima;
