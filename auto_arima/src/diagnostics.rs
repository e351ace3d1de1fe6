//! Residual diagnostics reported in model summaries

use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Largest lag used by the Ljung-Box test
const MAX_LJUNG_BOX_LAGS: usize = 10;

/// Ljung-Box portmanteau test for residual autocorrelation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LjungBox {
    pub statistic: f64,
    pub p_value: f64,
    pub lags: usize,
    /// Degrees of freedom after removing the fitted ARMA terms
    pub df: usize,
}

/// Jarque-Bera test for normality of the residuals
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct JarqueBera {
    pub statistic: f64,
    pub p_value: f64,
    pub skewness: f64,
    pub kurtosis: f64,
}

/// Diagnostics of a fitted model's residuals. A test is `None` when the
/// residuals are too short or constant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResidualDiagnostics {
    pub ljung_box: Option<LjungBox>,
    pub jarque_bera: Option<JarqueBera>,
}

/// Run both tests; `arma_terms` is `p + q` of the fitted model
pub fn diagnose(residuals: &[f64], arma_terms: usize) -> ResidualDiagnostics {
    let lags = MAX_LJUNG_BOX_LAGS.min(residuals.len() / 5);
    ResidualDiagnostics {
        ljung_box: ljung_box(residuals, lags, arma_terms),
        jarque_bera: jarque_bera(residuals),
    }
}

fn chi_squared_sf(statistic: f64, df: f64) -> Option<f64> {
    let dist = ChiSquared::new(df).ok()?;
    Some((1.0 - dist.cdf(statistic)).clamp(0.0, 1.0))
}

/// Ljung-Box Q statistic over `lags` autocorrelations
pub fn ljung_box(residuals: &[f64], lags: usize, arma_terms: usize) -> Option<LjungBox> {
    let n = residuals.len();
    if lags == 0 || lags >= n {
        return None;
    }

    let mean = residuals.iter().sum::<f64>() / n as f64;
    let centered: Vec<f64> = residuals.iter().map(|e| e - mean).collect();
    let denominator: f64 = centered.iter().map(|e| e * e).sum();
    if denominator <= 0.0 {
        return None;
    }

    let nf = n as f64;
    let statistic = (1..=lags)
        .map(|k| {
            let r: f64 = centered
                .iter()
                .zip(centered.iter().skip(k))
                .map(|(a, b)| a * b)
                .sum::<f64>()
                / denominator;
            r * r / (nf - k as f64)
        })
        .sum::<f64>()
        * nf
        * (nf + 2.0);

    let df = lags.saturating_sub(arma_terms).max(1);
    let p_value = chi_squared_sf(statistic, df as f64)?;

    Some(LjungBox {
        statistic,
        p_value,
        lags,
        df,
    })
}

/// Jarque-Bera statistic from sample skewness and kurtosis
pub fn jarque_bera(residuals: &[f64]) -> Option<JarqueBera> {
    let n = residuals.len();
    if n < 3 {
        return None;
    }

    let nf = n as f64;
    let mean = residuals.iter().sum::<f64>() / nf;
    let moment = |power: i32| residuals.iter().map(|e| (e - mean).powi(power)).sum::<f64>() / nf;
    let m2 = moment(2);
    if m2 <= 0.0 {
        return None;
    }

    let skewness = moment(3) / m2.powf(1.5);
    let kurtosis = moment(4) / (m2 * m2);
    let statistic = nf / 6.0 * (skewness.powi(2) + (kurtosis - 3.0).powi(2) / 4.0);

    Some(JarqueBera {
        statistic,
        p_value: chi_squared_sf(statistic, 2.0)?,
        skewness,
        kurtosis,
    })
}
