//! Reusable auto-ARIMA handle

use crate::config::AutoArimaConfig;
use crate::data::TimeSeries;
use crate::error::{ArimaError, Result};
use crate::forecast::ForecastResult;
use crate::models::arima::{fit_auto, FittedModel, ModelParams};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::warn;

/// Automatic ARIMA model.
///
/// Holds a configuration and, after a successful [`fit`](Self::fit), the
/// selected model. Each fit replaces the previous model as a whole, and a
/// failed fit leaves the handle unfitted. The handle can be shared between
/// threads; readers see either the previous or the new model.
///
/// ```no_run
/// use auto_arima::{AutoArima, AutoArimaConfig, TimeSeries};
///
/// let model = AutoArima::new(AutoArimaConfig::default())?;
/// let series = TimeSeries::new((0..600).map(|i| (i as f64 * 0.1).sin()).collect())?;
/// model.fit(&series)?;
/// let forecast = model.forecast(100, true)?;
/// println!("{}", model.summary()?);
/// # Ok::<(), auto_arima::ArimaError>(())
/// ```
#[derive(Debug)]
pub struct AutoArima {
    config: AutoArimaConfig,
    fitted: RwLock<Option<Arc<FittedModel>>>,
}

impl AutoArima {
    /// Create an unfitted handle, validating the configuration
    pub fn new(config: AutoArimaConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            fitted: RwLock::new(None),
        })
    }

    /// Create a handle searching AR orders `start_p..=max_p` and MA orders
    /// `start_q..=max_q` with default settings otherwise
    pub fn with_orders(start_p: usize, max_p: usize, start_q: usize, max_q: usize) -> Result<Self> {
        Self::new(AutoArimaConfig::new(start_p, max_p, start_q, max_q)?)
    }

    /// Configuration of this handle
    pub fn config(&self) -> &AutoArimaConfig {
        &self.config
    }

    /// Select and estimate a model for `series`, replacing any previous fit
    pub fn fit(&self, series: &TimeSeries) -> Result<()> {
        let outcome = fit_auto(series, &self.config);
        let mut slot = self.fitted.write().unwrap_or_else(PoisonError::into_inner);
        match outcome {
            Ok(model) => {
                *slot = Some(Arc::new(model));
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "fit failed, model reset");
                *slot = None;
                Err(err)
            }
        }
    }

    /// Whether a fitted model is held
    pub fn is_fitted(&self) -> bool {
        self.read_fitted().is_some()
    }

    /// The current fitted model
    pub fn fitted(&self) -> Result<Arc<FittedModel>> {
        self.require("fitted")
    }

    /// Forecast `horizon` steps past the fitted series
    pub fn forecast(&self, horizon: usize, with_intervals: bool) -> Result<ForecastResult> {
        self.require("forecast")?.forecast(horizon, with_intervals)
    }

    /// Forecast with intervals at coverage `level` instead of the configured one
    pub fn forecast_with_level(&self, horizon: usize, level: f64) -> Result<ForecastResult> {
        self.require("forecast")?.forecast_with_level(horizon, level)
    }

    /// Order, coefficients and fit statistics of the current model
    pub fn get_params(&self) -> Result<ModelParams> {
        Ok(self.require("get_params")?.params())
    }

    /// Summary table of the current model
    pub fn summary(&self) -> Result<String> {
        Ok(self.require("summary")?.summary())
    }

    fn read_fitted(&self) -> Option<Arc<FittedModel>> {
        self.fitted
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn require(&self, operation: &'static str) -> Result<Arc<FittedModel>> {
        self.read_fitted()
            .ok_or(ArimaError::ModelNotFitted { operation })
    }
}
