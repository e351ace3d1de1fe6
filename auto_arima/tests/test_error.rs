use auto_arima::estimator::estimate;
use auto_arima::{
    ArimaError, AutoArima, AutoArimaConfig, EstimationError, ModelOrder, TimeSeries,
};
use std::error::Error;

#[test]
fn test_error_display() {
    let error = ArimaError::InsufficientData {
        stage: "ADF test at d=1".to_string(),
        needed: 12,
        got: 9,
    };
    assert_eq!(
        error.to_string(),
        "Insufficient data for ADF test at d=1: need at least 12 observations, got 9"
    );

    let error = ArimaError::Configuration("max_p must be positive".to_string());
    assert_eq!(error.to_string(), "Configuration error: max_p must be positive");

    let error = ArimaError::ModelNotFitted {
        operation: "summary",
    };
    assert_eq!(
        error.to_string(),
        "Model not fitted: call fit() before summary()"
    );
}

#[test]
fn test_estimation_error_source_chain() {
    let error = ArimaError::Estimation {
        order: ModelOrder::new(3, 0, 1),
        source: EstimationError::SingularCovariance { condition: 2.5e13 },
    };
    assert!(error.to_string().contains("ARIMA(3,0,1)"));

    let source = error.source().unwrap();
    assert!(source.to_string().contains("2.500e13"));
}

#[test]
fn test_serialization_error_conversion() {
    let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let error = ArimaError::from(json_error);
    assert!(matches!(error, ArimaError::Serialization(_)));
}

#[test]
fn test_configuration_errors_name_values() {
    let err = AutoArima::with_orders(2, 1, 0, 3).unwrap_err();
    assert!(err.to_string().contains("start_p (2) must not exceed max_p (1)"));

    let err = AutoArima::new(AutoArimaConfig::default().with_confidence_level(1.0)).unwrap_err();
    assert!(err.to_string().contains("confidence_level (1)"));

    let err = AutoArima::new(AutoArimaConfig::default().with_max_evaluations(0)).unwrap_err();
    assert!(matches!(err, ArimaError::Configuration(_)));
}

#[test]
fn test_not_fitted_errors() {
    let model = AutoArima::new(AutoArimaConfig::default()).unwrap();
    for (result, operation) in [
        (model.forecast(10, true).map(|_| ()), "forecast"),
        (model.get_params().map(|_| ()), "get_params"),
        (model.summary().map(|_| ()), "summary"),
    ] {
        match result {
            Err(ArimaError::ModelNotFitted { operation: op }) => assert_eq!(op, operation),
            other => panic!("expected ModelNotFitted for {operation}, got {other:?}"),
        }
    }
}

#[test]
fn test_constant_series_has_no_viable_model() {
    let model = AutoArima::with_orders(0, 2, 0, 2).unwrap();
    let series = TimeSeries::new(vec![3.5; 60]).unwrap();

    match model.fit(&series).unwrap_err() {
        ArimaError::NoViableModel {
            d,
            start_p,
            max_p,
            attempted,
            ..
        } => {
            assert_eq!(d, 0);
            assert_eq!((start_p, max_p), (0, 2));
            assert!(attempted >= 1);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!model.is_fitted());
}

#[test]
fn test_estimator_reports_short_series() {
    let series = TimeSeries::new(vec![1.0, 0.0, 2.0, 1.0, 3.0, 2.0]).unwrap();
    let err = estimate(&series, ModelOrder::new(3, 0, 2), &AutoArimaConfig::default()).unwrap_err();
    assert!(err.to_string().contains("ARIMA(3,0,2)"));
    assert!(matches!(
        err,
        ArimaError::Estimation {
            source: EstimationError::NotEnoughObservations { .. },
            ..
        }
    ));
}
