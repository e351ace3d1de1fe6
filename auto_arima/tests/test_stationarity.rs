use auto_arima::stationarity::{adf_test, default_lags, ndiffs};
use auto_arima::{ArimaError, AutoArimaConfig, TimeSeries};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rstest::rstest;

fn noisy_sine(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 0.35).unwrap();
    (0..n)
        .map(|i| (i as f64 * 0.1).sin() + noise.sample(&mut rng))
        .collect()
}

#[test]
fn test_noisy_sine_needs_no_differencing() {
    let series = TimeSeries::new(noisy_sine(600, 11)).unwrap();
    let report = ndiffs(&series, &AutoArimaConfig::default()).unwrap();
    assert_eq!(report.d, 0);
    assert_eq!(report.tests.len(), 1);
    assert!(report.tests[0].p_value < 0.05);
}

#[rstest]
#[case::linear(1.0)]
#[case::quadratic(2.0)]
#[case::cubic(3.0)]
fn test_ramps_need_differencing(#[case] power: f64) {
    // Same shape as the demo scenarios: t^power scaled to end near 60
    let n = 600;
    let scale = 60.0 / ((n - 1) as f64 * 0.1).powf(power);
    let values: Vec<f64> = noisy_sine(n, 12)
        .into_iter()
        .enumerate()
        .map(|(i, v)| scale * (i as f64 * 0.1).powf(power) + v)
        .collect();

    let series = TimeSeries::new(values).unwrap();
    let report = ndiffs(&series, &AutoArimaConfig::default()).unwrap();
    assert!(report.d >= 1, "d = {}", report.d);
    assert!(!report.tests[0].is_stationary(0.05));
}

#[test]
fn test_adf_reports_regression_shape() {
    let values = noisy_sine(600, 13);
    let result = adf_test(&values, None).unwrap();
    assert_eq!(result.lags, default_lags(600));
    assert_eq!(result.lags, 8);
    assert_eq!(result.nobs, 600 - 1 - 8);

    let cv = result.critical_values;
    assert!(cv.one_percent < cv.five_percent && cv.five_percent < cv.ten_percent);
}

#[test]
fn test_fixed_lags_are_used() {
    let config = AutoArimaConfig::default().with_adf_lags(2);
    let series = TimeSeries::new(noisy_sine(600, 14)).unwrap();
    let report = ndiffs(&series, &config).unwrap();
    assert!(report.tests.iter().all(|t| t.lags == 2));
}

#[test]
fn test_short_series_is_insufficient() {
    let series = TimeSeries::new(vec![0.5, 1.5, 0.7, 1.1, 0.9, 1.4, 0.3]).unwrap();
    let err = ndiffs(&series, &AutoArimaConfig::default()).unwrap_err();
    match err {
        ArimaError::InsufficientData { needed, got, stage } => {
            assert_eq!(got, 7);
            assert_eq!(needed, 8);
            assert!(stage.contains("d=0"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
