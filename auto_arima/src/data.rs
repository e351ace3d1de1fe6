//! Time series data handling for ARIMA fitting

use crate::error::{ArimaError, Result};
use std::sync::Arc;

/// Equally spaced univariate series.
///
/// The samples are immutable once constructed and shared between clones,
/// so handing a series to a fitted model does not copy it.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    values: Arc<[f64]>,
}

impl TimeSeries {
    /// Create a new series, rejecting empty input and non-finite samples
    pub fn new(values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(ArimaError::InvalidData("Empty time series".to_string()));
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(ArimaError::InvalidData(format!(
                "Non-finite sample {} at index {}",
                values[index], index
            )));
        }

        Ok(Self {
            values: values.into(),
        })
    }

    /// Get the samples
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series holds no samples
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Last sample
    pub fn last(&self) -> f64 {
        self.values[self.values.len() - 1]
    }

    /// Sample mean
    pub fn mean(&self) -> f64 {
        mean(&self.values)
    }

    /// Population variance
    pub fn variance(&self) -> f64 {
        variance(&self.values)
    }

    /// The series differenced `d` times
    pub fn difference(&self, d: usize) -> Vec<f64> {
        difference(&self.values, d)
    }
}

impl TryFrom<Vec<f64>> for TimeSeries {
    type Error = ArimaError;

    fn try_from(values: Vec<f64>) -> Result<Self> {
        Self::new(values)
    }
}

impl TryFrom<&[f64]> for TimeSeries {
    type Error = ArimaError;

    fn try_from(values: &[f64]) -> Result<Self> {
        Self::new(values.to_vec())
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Apply first-order differencing `d` times.
///
/// Each pass shortens the series by one sample.
pub fn difference(values: &[f64], d: usize) -> Vec<f64> {
    let mut current = values.to_vec();
    for _ in 0..d {
        if current.len() < 2 {
            return Vec::new();
        }
        current = current.windows(2).map(|w| w[1] - w[0]).collect();
    }
    current
}

/// Undo `d` differencing passes on values that continue `history`.
///
/// `forecast_diff` extends `history` differenced `d` times; the result
/// extends `history` itself. Levels are restored from the deepest
/// difference outward, each one seeded with the last observed value of
/// that level.
pub fn integrate(forecast_diff: &[f64], history: &[f64], d: usize) -> Vec<f64> {
    let mut current = forecast_diff.to_vec();
    for level in (0..d).rev() {
        let base = difference(history, level);
        let mut last = base.last().copied().unwrap_or(0.0);
        current = current
            .iter()
            .map(|step| {
                last += step;
                last
            })
            .collect();
    }
    current
}
