//! Configuration for automatic ARIMA fitting

use crate::error::{ArimaError, Result};
use serde::Serialize;
use std::fmt;

/// Information criterion used to rank candidate orders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InformationCriterion {
    /// Akaike Information Criterion
    #[default]
    Aic,
    /// AIC with small-sample correction
    Aicc,
    /// Bayesian (Schwarz) Information Criterion
    Bic,
    /// Hannan-Quinn Information Criterion
    Hqic,
}

impl InformationCriterion {
    /// Score a fit with log-likelihood `log_likelihood`, `k` estimated
    /// parameters and `nobs` observations. Lower is better.
    pub fn score(self, log_likelihood: f64, k: usize, nobs: usize) -> f64 {
        let k = k as f64;
        let n = nobs as f64;
        let deviance = -2.0 * log_likelihood;
        match self {
            Self::Aic => deviance + 2.0 * k,
            Self::Aicc => {
                if n - k - 1.0 <= 0.0 {
                    f64::INFINITY
                } else {
                    deviance + 2.0 * k + 2.0 * k * (k + 1.0) / (n - k - 1.0)
                }
            }
            Self::Bic => deviance + k * n.ln(),
            Self::Hqic => deviance + 2.0 * k * n.ln().ln(),
        }
    }
}

impl fmt::Display for InformationCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Aic => "aic",
            Self::Aicc => "aicc",
            Self::Bic => "bic",
            Self::Hqic => "hqic",
        };
        f.write_str(name)
    }
}

/// How candidate (p, q) orders are explored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchStrategy {
    /// Hill-climb from the start order over +/-1 neighbours
    #[default]
    Stepwise,
    /// Evaluate every order inside the bounds
    Exhaustive,
}

/// Objective maximized by the parameter estimator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EstimationMethod {
    /// Conditional sum of squares
    Css,
    /// Exact Gaussian likelihood (Kalman filter)
    Ml,
    /// CSS estimates used as starting values for exact likelihood
    #[default]
    CssMl,
}

impl fmt::Display for EstimationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Css => "css",
            Self::Ml => "ml",
            Self::CssMl => "css-ml",
        };
        f.write_str(name)
    }
}

/// Settings for [`AutoArima`](crate::AutoArima).
///
/// The defaults follow the common auto-ARIMA policy: AR and MA orders
/// searched over `1..=3`, at most two differences chosen by an ADF test at
/// the 5% level, AIC ranking and 95% prediction intervals.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoArimaConfig {
    /// Lowest AR order considered
    pub start_p: usize,
    /// Highest AR order considered
    pub max_p: usize,
    /// Lowest MA order considered
    pub start_q: usize,
    /// Highest MA order considered
    pub max_q: usize,
    /// Highest differencing order the stationarity tester may return
    pub max_d: usize,
    /// Significance level of the unit-root test
    pub alpha: f64,
    /// Fixed ADF lag count; `None` uses `floor((n - 1)^(1/3))`
    pub adf_lags: Option<usize>,
    /// Criterion used to rank candidates
    pub criterion: InformationCriterion,
    /// Order search strategy
    pub strategy: SearchStrategy,
    /// Candidate evaluation budget of the stepwise search
    pub max_evaluations: usize,
    /// Scores closer than this are ties, resolved toward smaller p + q
    pub tie_epsilon: f64,
    /// Estimate a mean (d = 0) or drift (d = 1) term
    pub with_intercept: bool,
    /// Estimation objective
    pub method: EstimationMethod,
    /// Iteration cap of each optimizer run
    pub max_iterations: u64,
    /// Simplex standard-deviation tolerance of the optimizer
    pub tolerance: f64,
    /// Coverage of forecast intervals
    pub confidence_level: f64,
    /// Evaluate each batch of candidates on the rayon thread pool
    pub parallel: bool,
}

impl Default for AutoArimaConfig {
    fn default() -> Self {
        Self {
            start_p: 1,
            max_p: 3,
            start_q: 1,
            max_q: 3,
            max_d: 2,
            alpha: 0.05,
            adf_lags: None,
            criterion: InformationCriterion::Aic,
            strategy: SearchStrategy::Stepwise,
            max_evaluations: 30,
            tie_epsilon: 1e-8,
            with_intercept: true,
            method: EstimationMethod::CssMl,
            max_iterations: 1000,
            tolerance: 1e-8,
            confidence_level: 0.95,
            parallel: false,
        }
    }
}

impl AutoArimaConfig {
    /// Create a validated configuration with the given order bounds
    pub fn new(start_p: usize, max_p: usize, start_q: usize, max_q: usize) -> Result<Self> {
        let config = Self::default().with_order_bounds(start_p, max_p, start_q, max_q);
        config.validate()?;
        Ok(config)
    }

    /// Set the AR and MA search bounds
    pub fn with_order_bounds(
        mut self,
        start_p: usize,
        max_p: usize,
        start_q: usize,
        max_q: usize,
    ) -> Self {
        self.start_p = start_p;
        self.max_p = max_p;
        self.start_q = start_q;
        self.max_q = max_q;
        self
    }

    /// Set the maximum differencing order
    pub fn with_max_d(mut self, max_d: usize) -> Self {
        self.max_d = max_d;
        self
    }

    /// Set the unit-root test significance level
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Fix the number of ADF lags
    pub fn with_adf_lags(mut self, lags: usize) -> Self {
        self.adf_lags = Some(lags);
        self
    }

    /// Set the information criterion
    pub fn with_criterion(mut self, criterion: InformationCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Evaluate the whole bounded grid instead of searching stepwise
    pub fn exhaustive(mut self) -> Self {
        self.strategy = SearchStrategy::Exhaustive;
        self
    }

    /// Set the stepwise evaluation budget
    pub fn with_max_evaluations(mut self, max_evaluations: usize) -> Self {
        self.max_evaluations = max_evaluations;
        self
    }

    /// Set the tie tolerance between criterion scores
    pub fn with_tie_epsilon(mut self, epsilon: f64) -> Self {
        self.tie_epsilon = epsilon;
        self
    }

    /// Enable or disable the mean/drift term
    pub fn with_intercept(mut self, with_intercept: bool) -> Self {
        self.with_intercept = with_intercept;
        self
    }

    /// Set the estimation objective
    pub fn with_method(mut self, method: EstimationMethod) -> Self {
        self.method = method;
        self
    }

    /// Set the optimizer iteration cap and tolerance
    pub fn with_optimizer(mut self, max_iterations: u64, tolerance: f64) -> Self {
        self.max_iterations = max_iterations;
        self.tolerance = tolerance;
        self
    }

    /// Set the forecast interval coverage
    pub fn with_confidence_level(mut self, level: f64) -> Self {
        self.confidence_level = level;
        self
    }

    /// Evaluate candidates in parallel
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Check every setting, naming the first offending value
    pub fn validate(&self) -> Result<()> {
        if self.start_p > self.max_p {
            return Err(ArimaError::Configuration(format!(
                "start_p ({}) must not exceed max_p ({})",
                self.start_p, self.max_p
            )));
        }
        if self.start_q > self.max_q {
            return Err(ArimaError::Configuration(format!(
                "start_q ({}) must not exceed max_q ({})",
                self.start_q, self.max_q
            )));
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(ArimaError::Configuration(format!(
                "alpha ({}) must be between 0 and 1",
                self.alpha
            )));
        }
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(ArimaError::Configuration(format!(
                "confidence_level ({}) must be between 0 and 1",
                self.confidence_level
            )));
        }
        if self.max_evaluations == 0 {
            return Err(ArimaError::Configuration(
                "max_evaluations (0) must be at least 1".to_string(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(ArimaError::Configuration(
                "max_iterations (0) must be at least 1".to_string(),
            ));
        }
        if !(self.tie_epsilon >= 0.0 && self.tie_epsilon.is_finite()) {
            return Err(ArimaError::Configuration(format!(
                "tie_epsilon ({}) must be a finite non-negative number",
                self.tie_epsilon
            )));
        }
        if !(self.tolerance > 0.0 && self.tolerance.is_finite()) {
            return Err(ArimaError::Configuration(format!(
                "tolerance ({}) must be a finite positive number",
                self.tolerance
            )));
        }
        Ok(())
    }
}
