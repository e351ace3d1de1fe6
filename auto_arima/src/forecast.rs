//! Multi-step forecasting with prediction intervals

use crate::data;
use crate::error::{ArimaError, Result};
use crate::estimator::CandidateFit;
use statrs::distribution::{ContinuousCDF, Normal};

/// Result of a forecast operation
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResult {
    /// Point forecasts
    values: Vec<f64>,
    /// Number of steps forecast
    horizon: usize,
    /// Per-step `(lower, upper)` bounds
    intervals: Option<Vec<(f64, f64)>>,
    /// Coverage of the bounds
    level: Option<f64>,
}

impl ForecastResult {
    /// Create a forecast without intervals
    pub fn new(values: Vec<f64>, horizon: usize) -> Result<Self> {
        if values.len() != horizon {
            return Err(ArimaError::InvalidData(format!(
                "Values length ({}) doesn't match horizon ({})",
                values.len(),
                horizon
            )));
        }

        Ok(Self {
            values,
            horizon,
            intervals: None,
            level: None,
        })
    }

    /// Create a forecast with `(lower, upper)` bounds at coverage `level`
    pub fn new_with_intervals(
        values: Vec<f64>,
        horizon: usize,
        intervals: Vec<(f64, f64)>,
        level: f64,
    ) -> Result<Self> {
        if values.len() != intervals.len() {
            return Err(ArimaError::InvalidData(format!(
                "Values length ({}) doesn't match intervals length ({})",
                values.len(),
                intervals.len()
            )));
        }

        let mut result = Self::new(values, horizon)?;
        result.intervals = Some(intervals);
        result.level = Some(level);
        Ok(result)
    }

    /// Point forecasts
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of steps forecast
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Prediction intervals, if requested
    pub fn intervals(&self) -> Option<&[(f64, f64)]> {
        self.intervals.as_deref()
    }

    /// Coverage of the prediction intervals, if requested
    pub fn level(&self) -> Option<f64> {
        self.level
    }

    /// Mean absolute error against realized values
    pub fn mean_absolute_error(&self, actual: &[f64]) -> Result<f64> {
        self.check_actual(actual)?;
        let sum: f64 = self
            .values
            .iter()
            .zip(actual.iter())
            .map(|(f, a)| (f - a).abs())
            .sum();
        Ok(sum / self.values.len() as f64)
    }

    /// Mean squared error against realized values
    pub fn mean_squared_error(&self, actual: &[f64]) -> Result<f64> {
        self.check_actual(actual)?;
        let sum: f64 = self
            .values
            .iter()
            .zip(actual.iter())
            .map(|(f, a)| (f - a).powi(2))
            .sum();
        Ok(sum / self.values.len() as f64)
    }

    fn check_actual(&self, actual: &[f64]) -> Result<()> {
        if self.values.len() != actual.len() {
            return Err(ArimaError::InvalidData(format!(
                "Forecast length ({}) doesn't match actual length ({})",
                self.values.len(),
                actual.len()
            )));
        }
        Ok(())
    }
}

/// First `count` weights of the MA(infinity) form of an ARIMA model.
///
/// The AR side is `phi(B) (1 - B)^d`, so the weights of an integrated model
/// do not decay.
pub fn psi_weights(ar: &[f64], ma: &[f64], d: usize, count: usize) -> Vec<f64> {
    let phi = integrated_ar(ar, d);
    let mut psi = Vec::with_capacity(count);
    for j in 0..count {
        if j == 0 {
            psi.push(1.0);
            continue;
        }
        let mut value = ma.get(j - 1).copied().unwrap_or(0.0);
        for i in 1..=j.min(phi.len()) {
            value += phi[i - 1] * psi[j - i];
        }
        psi.push(value);
    }
    psi
}

/// AR coefficients of `phi(B) (1 - B)^d` in the `1 - sum(c_i B^i)` convention
fn integrated_ar(ar: &[f64], d: usize) -> Vec<f64> {
    // Lag polynomial with the leading 1
    let mut poly: Vec<f64> = std::iter::once(1.0).chain(ar.iter().map(|c| -c)).collect();
    for _ in 0..d {
        let mut next = vec![0.0; poly.len() + 1];
        for (i, c) in poly.iter().enumerate() {
            next[i] += c;
            next[i + 1] -= c;
        }
        poly = next;
    }
    poly.iter().skip(1).map(|c| -c).collect()
}

/// Point forecasts of the differenced process with zero future innovations
fn differenced_forecast(w: &[f64], fit: &CandidateFit, horizon: usize) -> Vec<f64> {
    let mu = fit.intercept.unwrap_or(0.0);
    let n = w.len();

    let mut extended = w.to_vec();
    extended.reserve(horizon);
    // Innovations aligned with `extended`; unknown pre-sample ones are zero
    let mut shocks = vec![0.0; n - fit.residuals.len().min(n)];
    shocks.extend_from_slice(&fit.residuals[fit.residuals.len().saturating_sub(n)..]);

    for _ in 0..horizon {
        let t = extended.len();
        let mut next = mu;
        for (i, phi) in fit.ar.iter().enumerate() {
            next += phi * (extended[t - 1 - i] - mu);
        }
        for (j, theta) in fit.ma.iter().enumerate() {
            if t > j {
                next += theta * shocks[t - 1 - j];
            }
        }
        extended.push(next);
        shocks.push(0.0);
    }

    extended.split_off(n)
}

/// Forecast `horizon` steps past the end of `history`.
///
/// `history` is the undifferenced series the model was fitted on. With
/// `level = Some(..)` the result carries Gaussian prediction intervals.
pub fn forecast(
    history: &[f64],
    fit: &CandidateFit,
    horizon: usize,
    level: Option<f64>,
) -> Result<ForecastResult> {
    if horizon == 0 {
        return Err(ArimaError::InvalidParameter(
            "horizon must be at least 1, got 0".to_string(),
        ));
    }

    let d = fit.order.d;
    let w = data::difference(history, d);
    let points = data::integrate(&differenced_forecast(&w, fit, horizon), history, d);

    let Some(level) = level else {
        return ForecastResult::new(points, horizon);
    };

    if !(level > 0.0 && level < 1.0) {
        return Err(ArimaError::InvalidParameter(format!(
            "confidence level ({level}) must be between 0 and 1"
        )));
    }
    let z = Normal::new(0.0, 1.0)
        .map_err(|e| ArimaError::InvalidParameter(e.to_string()))?
        .inverse_cdf((1.0 + level) / 2.0);

    let psi = psi_weights(&fit.ar, &fit.ma, d, horizon);
    let mut cumulative = 0.0;
    let intervals = points
        .iter()
        .zip(psi.iter())
        .map(|(point, weight)| {
            cumulative += weight * weight;
            let margin = z * (fit.sigma2 * cumulative).sqrt();
            (point - margin, point + margin)
        })
        .collect();

    ForecastResult::new_with_intervals(points, horizon, intervals, level)
}
