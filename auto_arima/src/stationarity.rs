//! Augmented Dickey-Fuller unit-root testing and differencing order selection

use crate::config::AutoArimaConfig;
use crate::data::{self, TimeSeries};
use crate::error::{ArimaError, Result};
use nalgebra::{DMatrix, DVector};
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::{debug, info};

/// Bounds of the MacKinnon (1994) response surface, constant-only case
const TAU_MAX: f64 = 2.74;
const TAU_MIN: f64 = -18.83;
const TAU_STAR: f64 = -1.61;
const TAU_SMALL: [f64; 3] = [2.1659, 1.4412, 0.038269];
const TAU_LARGE: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

/// MacKinnon (2010) finite-sample critical value coefficients, constant-only case
const CV_1: [f64; 4] = [-3.43035, -6.5393, -16.786, -79.433];
const CV_5: [f64; 4] = [-2.86154, -2.8903, -4.234, -40.040];
const CV_10: [f64; 4] = [-2.56677, -1.5384, -2.809, 0.0];

/// Condition number of the scaled normal matrix above which the regression
/// is treated as singular
const MAX_CONDITION: f64 = 1e12;

/// Critical values of the ADF statistic
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CriticalValues {
    pub one_percent: f64,
    pub five_percent: f64,
    pub ten_percent: f64,
}

impl CriticalValues {
    /// Critical values for a regression with `nobs` rows
    pub fn for_nobs(nobs: usize) -> Self {
        let t = nobs as f64;
        let surface = |b: [f64; 4]| b[0] + b[1] / t + b[2] / t.powi(2) + b[3] / t.powi(3);
        Self {
            one_percent: surface(CV_1),
            five_percent: surface(CV_5),
            ten_percent: surface(CV_10),
        }
    }
}

/// Outcome of one ADF test
#[derive(Debug, Clone, PartialEq)]
pub struct AdfResult {
    /// t-ratio of the lagged level coefficient; NaN when the regression was singular
    pub statistic: f64,
    /// Approximate p-value of the unit-root null
    pub p_value: f64,
    /// Number of lagged differences in the regression
    pub lags: usize,
    /// Rows of the regression
    pub nobs: usize,
    pub critical_values: CriticalValues,
}

impl AdfResult {
    /// Whether the unit-root null is rejected at level `alpha`
    pub fn is_stationary(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// Differencing order chosen by [`ndiffs`] with the test run at each stage
#[derive(Debug, Clone, PartialEq)]
pub struct StationarityReport {
    /// Selected differencing order
    pub d: usize,
    /// Test at each differencing stage, in order. A constant stage is
    /// accepted without a test and has no entry.
    pub tests: Vec<AdfResult>,
}

/// Default lag count `floor((n - 1)^(1/3))`
pub fn default_lags(n: usize) -> usize {
    (n.saturating_sub(1) as f64).cbrt().floor() as usize
}

/// Smallest series length the test accepts with `lags` lagged differences
pub fn min_length(lags: usize) -> usize {
    2 * lags + 6
}

/// Run the ADF test with a constant on `values`.
///
/// Regresses `dy_t` on a constant, `y_{t-1}` and `lags` lagged differences.
/// `lags = None` uses [`default_lags`].
pub fn adf_test(values: &[f64], lags: Option<usize>) -> Result<AdfResult> {
    run_test(values, lags, "ADF test")
}

fn run_test(values: &[f64], lags: Option<usize>, stage: &str) -> Result<AdfResult> {
    let n = values.len();
    let k = lags.unwrap_or_else(|| default_lags(n));
    let needed = min_length(k);
    if n < needed {
        return Err(ArimaError::InsufficientData {
            stage: stage.to_string(),
            needed,
            got: n,
        });
    }

    let diff = data::difference(values, 1);
    let rows = n - 1 - k;
    let cols = k + 2;

    let x = DMatrix::from_fn(rows, cols, |row, col| {
        let t = row + k;
        match col {
            0 => 1.0,
            1 => values[t],
            lag => diff[t - (lag - 1)],
        }
    });
    let y = DVector::from_fn(rows, |row, _| diff[row + k]);

    let critical_values = CriticalValues::for_nobs(rows);
    let not_rejected = AdfResult {
        statistic: f64::NAN,
        p_value: 1.0,
        lags: k,
        nobs: rows,
        critical_values,
    };

    let xtx = x.transpose() * &x;
    if is_ill_conditioned(&xtx) {
        debug!(lags = k, nobs = rows, "ADF regression is singular");
        return Ok(not_rejected);
    }
    let Some(cholesky) = xtx.cholesky() else {
        return Ok(not_rejected);
    };

    let beta = cholesky.solve(&(x.transpose() * &y));
    let residuals = &y - &x * &beta;
    let s2 = residuals.norm_squared() / (rows - cols) as f64;
    let variance = s2 * cholesky.inverse()[(1, 1)];
    if !(variance > 0.0 && variance.is_finite()) {
        return Ok(not_rejected);
    }

    let statistic = beta[1] / variance.sqrt();
    Ok(AdfResult {
        statistic,
        p_value: mackinnon_p_value(statistic),
        lags: k,
        nobs: rows,
        critical_values,
    })
}

fn is_ill_conditioned(xtx: &DMatrix<f64>) -> bool {
    let n = xtx.nrows();
    let scale: Vec<f64> = (0..n).map(|i| xtx[(i, i)].sqrt()).collect();
    if scale.iter().any(|s| !(*s > 0.0)) {
        return true;
    }
    let scaled = DMatrix::from_fn(n, n, |i, j| xtx[(i, j)] / (scale[i] * scale[j]));
    let eigenvalues = scaled.symmetric_eigenvalues();
    let max = eigenvalues.max();
    let min = eigenvalues.min();
    min <= 0.0 || max / min > MAX_CONDITION
}

/// Approximate p-value of an ADF statistic (MacKinnon 1994, constant only)
pub fn mackinnon_p_value(statistic: f64) -> f64 {
    if statistic.is_nan() {
        return 1.0;
    }
    if statistic > TAU_MAX {
        return 1.0;
    }
    if statistic < TAU_MIN {
        return 0.0;
    }

    let coefficients: &[f64] = if statistic <= TAU_STAR {
        &TAU_SMALL
    } else {
        &TAU_LARGE
    };
    let z = coefficients
        .iter()
        .rev()
        .fold(0.0, |acc, c| acc * statistic + c);

    match Normal::new(0.0, 1.0) {
        Ok(normal) => normal.cdf(z),
        Err(_) => 1.0,
    }
}

/// Choose the smallest differencing order whose stage passes the ADF test.
///
/// Differences the series repeatedly, testing each stage below
/// `config.max_d`, and stops at the first stage that rejects the unit root
/// at `config.alpha`. Returns `max_d` when no tested stage passes.
pub fn ndiffs(series: &TimeSeries, config: &AutoArimaConfig) -> Result<StationarityReport> {
    let mut stage = series.values().to_vec();
    let mut tests = Vec::new();

    for d in 0..config.max_d {
        if data::variance(&stage) == 0.0 {
            debug!(d, "stage is constant");
            info!(d, "differencing order selected");
            return Ok(StationarityReport { d, tests });
        }

        let label = format!("ADF test at d={d}");
        let result = run_test(&stage, config.adf_lags, &label)?;
        debug!(
            d,
            statistic = result.statistic,
            p_value = result.p_value,
            lags = result.lags,
            "ADF stage tested"
        );

        let stationary = result.is_stationary(config.alpha);
        tests.push(result);
        if stationary {
            info!(d, "differencing order selected");
            return Ok(StationarityReport { d, tests });
        }

        stage = data::difference(&stage, 1);
    }

    info!(d = config.max_d, "no stage passed, using max_d");
    Ok(StationarityReport {
        d: config.max_d,
        tests,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal as NormalDist};

    fn noise(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = NormalDist::new(0.0, 1.0).unwrap();
        (0..n).map(|_| normal.sample(&mut rng)).collect()
    }

    fn random_walk(n: usize, seed: u64) -> Vec<f64> {
        noise(n, seed)
            .into_iter()
            .scan(0.0, |level, e| {
                *level += e;
                Some(*level)
            })
            .collect()
    }

    #[test]
    fn test_p_value_is_monotone() {
        let taus = [-20.0, -6.0, -4.0, -2.9, -1.61, -1.0, 0.0, 1.5, 3.0];
        let p: Vec<f64> = taus.iter().map(|t| mackinnon_p_value(*t)).collect();
        for pair in p.windows(2) {
            assert!(pair[0] <= pair[1], "{:?}", p);
        }
        assert_eq!(p[0], 0.0);
        assert_eq!(p[p.len() - 1], 1.0);
    }

    #[test]
    fn test_p_value_near_critical_values() {
        // Asymptotic 5% and 1% critical values land near those levels
        assert_abs_diff_eq!(mackinnon_p_value(-2.86), 0.05, epsilon = 0.01);
        assert_abs_diff_eq!(mackinnon_p_value(-3.43), 0.01, epsilon = 0.005);
    }

    #[test]
    fn test_critical_values_approach_asymptotes() {
        let cv = CriticalValues::for_nobs(100_000);
        assert_abs_diff_eq!(cv.one_percent, -3.43035, epsilon = 1e-3);
        assert_abs_diff_eq!(cv.five_percent, -2.86154, epsilon = 1e-3);
        assert_abs_diff_eq!(cv.ten_percent, -2.56677, epsilon = 1e-3);

        let small = CriticalValues::for_nobs(50);
        assert!(small.five_percent < cv.five_percent);
    }

    #[test]
    fn test_white_noise_rejects_unit_root() {
        let result = adf_test(&noise(300, 11), None).unwrap();
        assert_eq!(result.lags, 6);
        assert!(result.statistic < result.critical_values.one_percent);
        assert!(result.is_stationary(0.05));
    }

    #[test]
    fn test_random_walk_keeps_unit_root() {
        let result = adf_test(&random_walk(300, 5), Some(2)).unwrap();
        assert_eq!(result.nobs, 297);
        assert!(!result.is_stationary(0.01));
    }

    #[test]
    fn test_too_short_series() {
        let err = adf_test(&[1.0, 2.0, 0.5, 1.5, 0.0], None).unwrap_err();
        assert!(matches!(
            err,
            ArimaError::InsufficientData {
                needed: 8,
                got: 5,
                ..
            }
        ));
    }

    #[test]
    fn test_exact_ramp_is_not_rejected() {
        let ramp: Vec<f64> = (0..50).map(|t| t as f64).collect();
        let result = adf_test(&ramp, None).unwrap();
        assert!(result.statistic.is_nan());
        assert_eq!(result.p_value, 1.0);
    }

    #[test]
    fn test_ndiffs_on_exact_ramp_and_constant() {
        let config = AutoArimaConfig::default();

        let ramp = TimeSeries::new((0..50).map(|t| 2.0 * t as f64).collect()).unwrap();
        let report = ndiffs(&ramp, &config).unwrap();
        assert_eq!(report.d, 1);
        assert_eq!(report.tests.len(), 1);

        let flat = TimeSeries::new(vec![4.0; 30]).unwrap();
        let report = ndiffs(&flat, &config).unwrap();
        assert_eq!(report.d, 0);
        assert!(report.tests.is_empty());
    }

    #[test]
    fn test_ndiffs_random_walk_needs_one_difference() {
        let walk = TimeSeries::new(random_walk(400, 21)).unwrap();
        let report = ndiffs(&walk, &AutoArimaConfig::default().with_alpha(0.01)).unwrap();
        assert_eq!(report.d, 1);
    }

    #[test]
    fn test_ndiffs_respects_max_d() {
        let walk = TimeSeries::new(random_walk(200, 3)).unwrap();
        let report = ndiffs(&walk, &AutoArimaConfig::default().with_max_d(0)).unwrap();
        assert_eq!(report.d, 0);
        assert!(report.tests.is_empty());
    }
}
