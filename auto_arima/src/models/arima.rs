//! Fitted ARIMA models selected by the automatic search

use crate::config::{AutoArimaConfig, EstimationMethod, InformationCriterion};
use crate::data::TimeSeries;
use crate::diagnostics::{self, ResidualDiagnostics};
use crate::error::{ArimaError, Result};
use crate::estimator::{self, CandidateFit};
use crate::forecast::{self, ForecastResult};
use crate::models::ModelOrder;
use crate::search::{self, SearchRecord};
use crate::stationarity::{self, StationarityReport};
use serde::Serialize;
use serde_json::{Map, Value};
use statrs::distribution::{ContinuousCDF, Normal};
use std::fmt;
use tracing::info;

const RULE: &str =
    "==============================================================================";
const THIN_RULE: &str =
    "------------------------------------------------------------------------------";

/// Snapshot of a fitted model's order, coefficients and fit statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelParams {
    pub order: ModelOrder,
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    /// Mean (d = 0) or drift (d = 1) of the differenced series
    pub intercept: Option<f64>,
    pub sigma2: f64,
    pub log_likelihood: f64,
    pub aic: f64,
    pub aicc: f64,
    pub bic: f64,
    pub hqic: f64,
    pub nobs: usize,
    pub converged: bool,
    pub method: EstimationMethod,
    pub criterion: InformationCriterion,
}

impl ModelParams {
    /// String-keyed view of the parameters
    pub fn to_map(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(ArimaError::InvalidData(format!(
                "Parameters serialized to a non-object value: {other}"
            ))),
        }
    }
}

/// ARIMA model selected and estimated by [`fit_auto`]
#[derive(Debug, Clone)]
pub struct FittedModel {
    /// Selected candidate
    candidate: CandidateFit,
    /// Series the model was fitted on
    history: TimeSeries,
    /// Differencing order selection
    stationarity: StationarityReport,
    /// Every order evaluated by the search
    trace: Vec<SearchRecord>,
    diagnostics: ResidualDiagnostics,
    criterion: InformationCriterion,
    /// Default coverage of forecast intervals
    confidence_level: f64,
}

/// Select the differencing order, search (p, q) and estimate the best model.
pub fn fit_auto(series: &TimeSeries, config: &AutoArimaConfig) -> Result<FittedModel> {
    config.validate()?;
    info!(
        observations = series.len(),
        criterion = %config.criterion,
        "fitting ARIMA model"
    );

    let stationarity = stationarity::ndiffs(series, config)?;
    let d = stationarity.d;
    let differenced = series.difference(d);

    let result = search::search(d, config, |order| {
        estimator::estimate_differenced(&differenced, order, config)
    })?;

    let candidate = result.best;
    let diagnostics = diagnostics::diagnose(&candidate.residuals, candidate.order.arma_terms());

    info!(
        order = %candidate.order,
        score = candidate.score,
        evaluations = result.trace.len(),
        "model selected"
    );

    Ok(FittedModel {
        candidate,
        history: series.clone(),
        stationarity,
        trace: result.trace,
        diagnostics,
        criterion: config.criterion,
        confidence_level: config.confidence_level,
    })
}

impl FittedModel {
    /// Selected order
    pub fn order(&self) -> ModelOrder {
        self.candidate.order
    }

    /// AR coefficients
    pub fn ar_coefficients(&self) -> &[f64] {
        &self.candidate.ar
    }

    /// MA coefficients
    pub fn ma_coefficients(&self) -> &[f64] {
        &self.candidate.ma
    }

    /// Mean or drift of the differenced series, when estimated
    pub fn intercept(&self) -> Option<f64> {
        self.candidate.intercept
    }

    /// Innovation variance
    pub fn sigma2(&self) -> f64 {
        self.candidate.sigma2
    }

    /// Maximized log-likelihood
    pub fn log_likelihood(&self) -> f64 {
        self.candidate.log_likelihood
    }

    /// Whether the final optimizer run converged
    pub fn converged(&self) -> bool {
        self.candidate.converged
    }

    /// Score of the fit under `criterion`
    pub fn information_criterion(&self, criterion: InformationCriterion) -> f64 {
        criterion.score(
            self.candidate.log_likelihood,
            self.candidate.n_params,
            self.candidate.nobs,
        )
    }

    /// Akaike Information Criterion
    pub fn aic(&self) -> f64 {
        self.information_criterion(InformationCriterion::Aic)
    }

    /// Bayesian Information Criterion
    pub fn bic(&self) -> f64 {
        self.information_criterion(InformationCriterion::Bic)
    }

    /// One-step residuals of the differenced series
    pub fn residuals(&self) -> &[f64] {
        &self.candidate.residuals
    }

    /// In-sample one-step predictions of the last `residuals().len()` samples
    pub fn fitted_values(&self) -> Vec<f64> {
        let values = self.history.values();
        let offset = values.len() - self.candidate.residuals.len();
        values[offset..]
            .iter()
            .zip(self.candidate.residuals.iter())
            .map(|(y, e)| y - e)
            .collect()
    }

    /// Series the model was fitted on
    pub fn history(&self) -> &TimeSeries {
        &self.history
    }

    /// Differencing order selection with its ADF tests
    pub fn stationarity(&self) -> &StationarityReport {
        &self.stationarity
    }

    /// Orders evaluated by the search
    pub fn search_trace(&self) -> &[SearchRecord] {
        &self.trace
    }

    /// Residual diagnostics
    pub fn diagnostics(&self) -> &ResidualDiagnostics {
        &self.diagnostics
    }

    /// The selected candidate with standard errors
    pub fn candidate(&self) -> &CandidateFit {
        &self.candidate
    }

    /// Forecast `horizon` steps, with intervals at the configured level
    pub fn forecast(&self, horizon: usize, with_intervals: bool) -> Result<ForecastResult> {
        let level = with_intervals.then_some(self.confidence_level);
        forecast::forecast(self.history.values(), &self.candidate, horizon, level)
    }

    /// Forecast `horizon` steps with intervals at coverage `level`
    pub fn forecast_with_level(&self, horizon: usize, level: f64) -> Result<ForecastResult> {
        forecast::forecast(self.history.values(), &self.candidate, horizon, Some(level))
    }

    /// Copy of the order, coefficients and fit statistics
    pub fn params(&self) -> ModelParams {
        ModelParams {
            order: self.order(),
            ar: self.candidate.ar.clone(),
            ma: self.candidate.ma.clone(),
            intercept: self.candidate.intercept,
            sigma2: self.candidate.sigma2,
            log_likelihood: self.candidate.log_likelihood,
            aic: self.aic(),
            aicc: self.information_criterion(InformationCriterion::Aicc),
            bic: self.bic(),
            hqic: self.information_criterion(InformationCriterion::Hqic),
            nobs: self.candidate.nobs,
            converged: self.candidate.converged,
            method: self.candidate.method,
            criterion: self.criterion,
        }
    }

    /// Human-readable table of the fit
    pub fn summary(&self) -> String {
        self.to_string()
    }

    fn coefficient_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        if self.candidate.intercept.is_some() {
            let name = if self.order().d == 0 { "const" } else { "drift" };
            names.push(name.to_string());
        }
        names.extend((1..=self.order().p).map(|i| format!("ar.L{i}")));
        names.extend((1..=self.order().q).map(|i| format!("ma.L{i}")));
        names
    }
}

impl fmt::Display for FittedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self.params();

        writeln!(f, "{:^78}", "ARIMA Results")?;
        writeln!(f, "{RULE}")?;
        writeln!(
            f,
            "{:<16}{:>22}   {:<20}{:>17}",
            "Model:",
            params.order.to_string(),
            "No. Observations:",
            params.nobs
        )?;
        writeln!(
            f,
            "{:<16}{:>22}   {:<20}{:>17.3}",
            "Method:",
            params.method.to_string(),
            "Log Likelihood",
            params.log_likelihood
        )?;
        writeln!(
            f,
            "{:<16}{:>22.5}   {:<20}{:>17.3}",
            "Sigma2:", params.sigma2, "AIC", params.aic
        )?;
        writeln!(
            f,
            "{:<16}{:>22}   {:<20}{:>17.3}",
            "Criterion:",
            params.criterion.to_string(),
            "BIC",
            params.bic
        )?;
        writeln!(
            f,
            "{:<16}{:>22}   {:<20}{:>17.3}",
            "Converged:", params.converged, "HQIC", params.hqic
        )?;
        writeln!(f, "{RULE}")?;
        writeln!(
            f,
            "{:<12}{:>11}{:>11}{:>11}{:>11}{:>11}{:>11}",
            "", "coef", "std err", "z", "P>|z|", "[0.025", "0.975]"
        )?;
        writeln!(f, "{THIN_RULE}")?;

        let normal = Normal::new(0.0, 1.0).map_err(|_| fmt::Error)?;
        let z_crit = normal.inverse_cdf(0.975);
        let coefficients = self.candidate.coefficients();
        for ((name, coef), se) in self
            .coefficient_names()
            .iter()
            .zip(coefficients.iter())
            .zip(self.candidate.std_errors.iter())
        {
            let z = coef / se;
            let p = 2.0 * (1.0 - normal.cdf(z.abs()));
            writeln!(
                f,
                "{:<12}{:>11.4}{:>11.3}{:>11.3}{:>11.3}{:>11.3}{:>11.3}",
                name,
                coef,
                se,
                z,
                p,
                coef - z_crit * se,
                coef + z_crit * se
            )?;
        }
        writeln!(f, "{:<12}{:>11.4}", "sigma2", params.sigma2)?;
        writeln!(f, "{RULE}")?;

        match self.stationarity.tests.last() {
            Some(adf) => writeln!(
                f,
                "ADF (d={}):{:>10} statistic {:.3}, p-value {:.3}, lags {}",
                self.stationarity.d,
                "",
                adf.statistic,
                adf.p_value,
                adf.lags
            )?,
            None => writeln!(f, "ADF (d={}):{:>10} not tested", self.stationarity.d, "")?,
        }
        if let Some(lb) = &self.diagnostics.ljung_box {
            writeln!(
                f,
                "Ljung-Box (L{}) (Q):{:>8.2}   Prob(Q):{:>8.3}",
                lb.lags, lb.statistic, lb.p_value
            )?;
        }
        if let Some(jb) = &self.diagnostics.jarque_bera {
            writeln!(
                f,
                "Jarque-Bera (JB):{:>11.2}   Prob(JB):{:>7.3}",
                jb.statistic, jb.p_value
            )?;
            writeln!(
                f,
                "Skew:{:>23.3}   Kurtosis:{:>7.3}",
                jb.skewness, jb.kurtosis
            )?;
        }
        write!(f, "{RULE}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal as NormalDist};

    fn ar1_series(n: usize, seed: u64) -> TimeSeries {
        let mut rng = StdRng::seed_from_u64(seed);
        let noise = NormalDist::new(0.0, 1.0).unwrap();
        let mut level = 0.0;
        let values = (0..n)
            .map(|_| {
                level = 0.5 * level + noise.sample(&mut rng);
                5.0 + level
            })
            .collect();
        TimeSeries::new(values).unwrap()
    }

    #[test]
    fn test_fit_auto_on_stationary_series() {
        let model = fit_auto(&ar1_series(200, 7), &AutoArimaConfig::default()).unwrap();
        assert_eq!(model.order().d, 0);
        assert!(model.sigma2() > 0.0);
        assert!(!model.search_trace().is_empty());
        assert_eq!(model.ar_coefficients().len(), model.order().p);
        assert_eq!(model.ma_coefficients().len(), model.order().q);
        assert_eq!(model.fitted_values().len(), model.residuals().len());
    }

    #[test]
    fn test_params_mapping() {
        let model = fit_auto(&ar1_series(200, 7), &AutoArimaConfig::default()).unwrap();
        let params = model.params();
        assert_eq!(params.order, model.order());
        assert!(params.aic < params.bic);

        let map = params.to_map().unwrap();
        for key in ["order", "ar", "ma", "intercept", "sigma2", "aic", "bic", "converged"] {
            assert!(map.contains_key(key), "missing {key}");
        }
        assert_eq!(map["method"], Value::String("css-ml".to_string()));
        assert_eq!(map["criterion"], Value::String("aic".to_string()));
        assert_eq!(map["order"]["d"], Value::from(0));
    }

    #[test]
    fn test_summary_lists_coefficients() {
        let model = fit_auto(&ar1_series(200, 7), &AutoArimaConfig::default()).unwrap();
        let summary = model.summary();
        assert!(summary.contains(&model.order().to_string()));
        assert!(summary.contains("const"));
        assert!(summary.contains("ar.L1") || summary.contains("ma.L1"));
        assert!(summary.contains("sigma2"));
        assert!(summary.contains("Ljung-Box"));
        assert!(summary.contains("Jarque-Bera"));
    }

    #[test]
    fn test_fit_auto_rejects_short_series() {
        let series = TimeSeries::new(vec![1.0, 2.0, 1.5, 2.5, 2.0]).unwrap();
        let err = fit_auto(&series, &AutoArimaConfig::default()).unwrap_err();
        assert!(matches!(err, ArimaError::InsufficientData { .. }));
    }
}
