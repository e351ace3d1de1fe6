//! Parameter estimation for a fixed ARIMA order

use crate::config::{AutoArimaConfig, EstimationMethod};
use crate::data::{self, TimeSeries};
use crate::error::{self, ArimaError, EstimationError};
use crate::kalman::{self, StateSpace};
use crate::models::ModelOrder;
use crate::transform;
use argmin::core::{CostFunction, Executor, IterState, State, TerminationReason};
use argmin::solver::neldermead::NelderMead;
use nalgebra::DMatrix;
use std::f64::consts::PI;
use tracing::{debug, warn};

/// Condition number of `J'J` above which standard errors are not reported
const MAX_CONDITION: f64 = 1e12;

/// Extra simplex runs after a run hits the iteration cap
const MAX_RESTARTS: usize = 2;

/// Step scale applied to the simplex on each restart
const RESTART_SHRINK: f64 = 0.1;

/// Estimated model for one candidate order.
///
/// Coefficients follow the sign convention
/// `(w_t - mu) = sum(phi_i (w_{t-i} - mu)) + e_t + sum(theta_j e_{t-j})`
/// on the series differenced `order.d` times.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateFit {
    /// Model order
    pub order: ModelOrder,
    /// Mean of the differenced series, `None` when not estimated
    pub intercept: Option<f64>,
    /// AR coefficients
    pub ar: Vec<f64>,
    /// MA coefficients
    pub ma: Vec<f64>,
    /// Innovation variance
    pub sigma2: f64,
    /// Maximized log-likelihood
    pub log_likelihood: f64,
    /// Observations entering the likelihood
    pub nobs: usize,
    /// Estimated parameters including the variance
    pub n_params: usize,
    /// Standard errors of `[intercept, ar.., ma..]`
    pub std_errors: Vec<f64>,
    /// One-step residuals, aligned with the end of the differenced series
    pub residuals: Vec<f64>,
    /// Whether the final optimizer run met its tolerance
    pub converged: bool,
    /// Iterations of the final optimizer run
    pub iterations: u64,
    /// Objective used
    pub method: EstimationMethod,
    /// Score under the configured information criterion
    pub score: f64,
}

impl CandidateFit {
    /// Akaike Information Criterion
    pub fn aic(&self) -> f64 {
        -2.0 * self.log_likelihood + 2.0 * self.n_params as f64
    }

    /// Coefficient vector in the layout of [`std_errors`](Self::std_errors)
    pub fn coefficients(&self) -> Vec<f64> {
        self.intercept
            .iter()
            .chain(self.ar.iter())
            .chain(self.ma.iter())
            .copied()
            .collect()
    }
}

/// Position of each block in the optimizer's parameter vector
#[derive(Debug, Clone, Copy)]
struct Layout {
    p: usize,
    q: usize,
    mean: bool,
}

impl Layout {
    fn len(&self) -> usize {
        usize::from(self.mean) + self.p + self.q
    }

    /// Split an unconstrained vector into `(mu, phi, theta)`
    fn unpack(&self, x: &[f64]) -> (f64, Vec<f64>, Vec<f64>) {
        let offset = usize::from(self.mean);
        let mu = if self.mean { x[0] } else { 0.0 };
        let ar = transform::constrain_ar(&x[offset..offset + self.p]);
        let ma = transform::constrain_ma(&x[offset + self.p..offset + self.p + self.q]);
        (mu, ar, ma)
    }

    fn pack(&self, mu: f64, ar: &[f64], ma: &[f64]) -> Vec<f64> {
        let mut x = Vec::with_capacity(self.len());
        if self.mean {
            x.push(mu);
        }
        x.extend(transform::unconstrain_ar(ar));
        x.extend(transform::unconstrain_ma(ma));
        x
    }
}

/// Conditional residuals of the model on `w`, starting after the first
/// `p` samples with pre-sample innovations set to zero.
pub(crate) fn css_residuals(w: &[f64], mu: f64, ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let p = ar.len();
    let n = w.len();
    let mut e = vec![0.0; n];
    for t in p..n {
        let mut prediction = mu;
        for (i, phi) in ar.iter().enumerate() {
            prediction += phi * (w[t - 1 - i] - mu);
        }
        for (j, theta) in ma.iter().enumerate() {
            if t >= p + 1 + j {
                prediction += theta * e[t - 1 - j];
            }
        }
        e[t] = w[t] - prediction;
    }
    e.split_off(p.min(n))
}

/// Mean squared conditional residual
#[derive(Clone, Copy)]
struct CssCost<'a> {
    w: &'a [f64],
    layout: Layout,
}

impl CostFunction for CssCost<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        let (mu, ar, ma) = self.layout.unpack(x);
        let e = css_residuals(self.w, mu, &ar, &ma);
        let mse = e.iter().map(|v| v * v).sum::<f64>() / e.len() as f64;
        Ok(if mse.is_finite() { mse } else { f64::MAX })
    }
}

/// Negative exact log-likelihood with the variance concentrated out
#[derive(Clone, Copy)]
struct ExactCost<'a> {
    w: &'a [f64],
    layout: Layout,
}

impl CostFunction for ExactCost<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        let (mu, ar, ma) = self.layout.unpack(x);
        let centered: Vec<f64> = self.w.iter().map(|v| v - mu).collect();
        match kalman::filter(&StateSpace::new(&ar, &ma), &centered) {
            Ok(out) if out.log_likelihood.is_finite() => Ok(-out.log_likelihood),
            _ => Ok(f64::MAX),
        }
    }
}

#[derive(Debug)]
struct Optimum {
    param: Vec<f64>,
    iterations: u64,
    converged: bool,
}

/// Run Nelder-Mead from `start`, restarting from the best vertex with a
/// shrunken simplex while the iteration cap is hit.
fn minimize<C>(
    cost: C,
    start: Vec<f64>,
    steps: &[f64],
    config: &AutoArimaConfig,
) -> Result<Optimum, EstimationError>
where
    C: CostFunction<Param = Vec<f64>, Output = f64> + Clone,
{
    let mut optimum = run_nelder_mead(cost.clone(), start, steps, config)?;
    let mut steps = steps.to_vec();

    for restart in 1..=MAX_RESTARTS {
        if optimum.converged {
            break;
        }
        steps.iter_mut().for_each(|step| *step *= RESTART_SHRINK);
        debug!(restart, iterations = optimum.iterations, "restarting simplex");

        let next = run_nelder_mead(cost.clone(), optimum.param.clone(), &steps, config)?;
        optimum = Optimum {
            iterations: optimum.iterations + next.iterations,
            ..next
        };
    }

    Ok(optimum)
}

fn run_nelder_mead<C>(
    cost: C,
    start: Vec<f64>,
    steps: &[f64],
    config: &AutoArimaConfig,
) -> Result<Optimum, EstimationError>
where
    C: CostFunction<Param = Vec<f64>, Output = f64>,
{
    let mut simplex = vec![start.clone()];
    for (i, step) in steps.iter().enumerate() {
        let mut vertex = start.clone();
        vertex[i] += step;
        simplex.push(vertex);
    }

    let solver = NelderMead::new(simplex)
        .with_sd_tolerance(config.tolerance)
        .map_err(|e| EstimationError::Optimizer(e.to_string()))?;

    let max_iterations = config.max_iterations;
    let result = Executor::new(cost, solver)
        .configure(|state: IterState<Vec<f64>, (), (), (), (), f64>| {
            state.max_iters(max_iterations)
        })
        .run()
        .map_err(|e| EstimationError::Optimizer(e.to_string()))?;

    let state = result.state();
    let iterations = state.get_iter();
    let param = state
        .get_best_param()
        .cloned()
        .ok_or(EstimationError::Diverged { iterations })?;

    let best_cost = state.get_best_cost();
    if !best_cost.is_finite() || best_cost >= f64::MAX || param.iter().any(|v| !v.is_finite()) {
        return Err(EstimationError::Diverged { iterations });
    }

    let converged = state.get_termination_reason() == Some(&TerminationReason::SolverConverged);

    Ok(Optimum {
        param,
        iterations,
        converged,
    })
}

/// Estimate a fixed order on `series`, differencing it `order.d` times first.
///
/// Failures carry the order in [`ArimaError::Estimation`]. A fit that hit
/// the iteration cap is returned with `converged = false`.
pub fn estimate(
    series: &TimeSeries,
    order: ModelOrder,
    config: &AutoArimaConfig,
) -> error::Result<CandidateFit> {
    let w = series.difference(order.d);
    estimate_differenced(&w, order, config)
        .map_err(|source| ArimaError::Estimation { order, source })
}

/// Estimate a fixed order on the already differenced series `w`.
pub(crate) fn estimate_differenced(
    w: &[f64],
    order: ModelOrder,
    config: &AutoArimaConfig,
) -> Result<CandidateFit, EstimationError> {
    let layout = Layout {
        p: order.p,
        q: order.q,
        mean: config.with_intercept && order.d < 2,
    };

    let required = layout.len() + 1;
    let available = w.len().saturating_sub(order.p);
    if available <= required {
        return Err(EstimationError::NotEnoughObservations {
            available,
            required,
        });
    }

    let mean = if layout.mean { data::mean(w) } else { 0.0 };
    let sd = data::variance(w).sqrt();
    if sd == 0.0 {
        return Err(EstimationError::ZeroVariance);
    }

    let (mu, ar, ma, iterations, converged) = if order.arma_terms() == 0 {
        (mean, Vec::new(), Vec::new(), 0, true)
    } else {
        let mut start = vec![0.0; layout.len()];
        if layout.mean {
            start[0] = mean;
        }
        let wide_steps = steps(layout, 0.1 * sd, 0.5);

        let optimum = match config.method {
            EstimationMethod::Css => minimize(CssCost { w, layout }, start, &wide_steps, config)?,
            EstimationMethod::Ml => {
                minimize(ExactCost { w, layout }, start, &wide_steps, config)?
            }
            EstimationMethod::CssMl => {
                // The CSS run only seeds the exact fit; its convergence is not reported
                let css = minimize(CssCost { w, layout }, start, &wide_steps, config)?;
                if !css.converged {
                    debug!(%order, iterations = css.iterations, "CSS seed did not converge");
                }
                let (mu, ar, ma) = layout.unpack(&css.param);
                // Refit from a re-packed point so clamped partials stay finite
                let seed = layout.pack(mu, &ar, &ma);
                let narrow_steps = steps(layout, 0.01 * sd, 0.1);
                minimize(ExactCost { w, layout }, seed, &narrow_steps, config)?
            }
        };

        let (mu, ar, ma) = layout.unpack(&optimum.param);
        (mu, ar, ma, optimum.iterations, optimum.converged)
    };

    if !converged {
        warn!(
            %order,
            iterations,
            "optimizer reached its iteration cap before converging, fit excluded from selection"
        );
    }

    let (log_likelihood, sigma2, nobs, residuals) = match config.method {
        EstimationMethod::Css => {
            let residuals = css_residuals(w, mu, &ar, &ma);
            let nobs = residuals.len();
            let sigma2 = residuals.iter().map(|e| e * e).sum::<f64>() / nobs as f64;
            if !(sigma2 > 0.0) {
                return Err(EstimationError::ZeroVariance);
            }
            let ll = -0.5 * nobs as f64 * ((2.0 * PI * sigma2).ln() + 1.0);
            (ll, sigma2, nobs, residuals)
        }
        EstimationMethod::Ml | EstimationMethod::CssMl => {
            let centered: Vec<f64> = w.iter().map(|v| v - mu).collect();
            let out = kalman::filter(&StateSpace::new(&ar, &ma), &centered)?;
            (out.log_likelihood, out.sigma2, w.len(), out.innovations)
        }
    };

    if !log_likelihood.is_finite() {
        return Err(EstimationError::Diverged { iterations });
    }

    let std_errors = standard_errors(w, layout, mu, &ar, &ma, sigma2)?;

    let n_params = layout.len() + 1;
    let score = config.criterion.score(log_likelihood, n_params, nobs);

    debug!(
        %order,
        log_likelihood,
        sigma2,
        score,
        converged,
        "candidate estimated"
    );

    Ok(CandidateFit {
        order,
        intercept: layout.mean.then_some(mu),
        ar,
        ma,
        sigma2,
        log_likelihood,
        nobs,
        n_params,
        std_errors,
        residuals,
        converged,
        iterations,
        method: config.method,
        score,
    })
}

fn steps(layout: Layout, mean_step: f64, coefficient_step: f64) -> Vec<f64> {
    let mut steps = Vec::with_capacity(layout.len());
    if layout.mean {
        steps.push(mean_step.max(1e-4));
    }
    steps.extend(std::iter::repeat(coefficient_step).take(layout.p + layout.q));
    steps
}

/// Gauss-Newton standard errors `sqrt(diag(sigma2 (J'J)^-1))`, with `J` the
/// central-difference Jacobian of the conditional residuals.
fn standard_errors(
    w: &[f64],
    layout: Layout,
    mu: f64,
    ar: &[f64],
    ma: &[f64],
    sigma2: f64,
) -> Result<Vec<f64>, EstimationError> {
    let k = layout.len();
    if k == 0 {
        return Ok(Vec::new());
    }

    let mut natural: Vec<f64> = Vec::with_capacity(k);
    if layout.mean {
        natural.push(mu);
    }
    natural.extend_from_slice(ar);
    natural.extend_from_slice(ma);

    let offset = usize::from(layout.mean);
    let residuals_at = |theta: &[f64]| {
        let mu = if layout.mean { theta[0] } else { 0.0 };
        css_residuals(
            w,
            mu,
            &theta[offset..offset + layout.p],
            &theta[offset + layout.p..],
        )
    };

    let rows = w.len() - layout.p;
    let mut jacobian = DMatrix::<f64>::zeros(rows, k);
    for col in 0..k {
        let h = 1e-6 * natural[col].abs().max(1.0);
        let mut forward = natural.clone();
        forward[col] += h;
        let mut backward = natural.clone();
        backward[col] -= h;

        let up = residuals_at(&forward);
        let down = residuals_at(&backward);
        for row in 0..rows {
            jacobian[(row, col)] = (up[row] - down[row]) / (2.0 * h);
        }
    }

    let information = jacobian.transpose() * &jacobian;
    let eigenvalues = information.symmetric_eigenvalues();
    let (max, min) = (eigenvalues.max(), eigenvalues.min());
    let condition = if min > 0.0 { max / min } else { f64::INFINITY };
    if !(condition.is_finite() && condition <= MAX_CONDITION) {
        return Err(EstimationError::SingularCovariance { condition });
    }

    let inverse = information
        .cholesky()
        .ok_or(EstimationError::SingularCovariance { condition })?
        .inverse();

    Ok((0..k)
        .map(|i| (sigma2 * inverse[(i, i)]).sqrt())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InformationCriterion;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    fn ar1(phi: f64, mean: f64, n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 1.0).unwrap();
        let mut level = 0.0;
        (0..n)
            .map(|_| {
                level = phi * level + normal.sample(&mut rng);
                mean + level
            })
            .collect()
    }

    #[test]
    fn test_css_residuals_of_ar1() {
        let w = [1.0, 2.0, 0.5, -1.0];
        let e = css_residuals(&w, 0.0, &[0.5], &[]);
        assert_eq!(e, vec![1.5, -0.5, -1.25]);
    }

    #[test]
    fn test_css_residuals_of_ma1() {
        let w = [1.0, 0.5, 0.0];
        let e = css_residuals(&w, 0.0, &[], &[0.5]);
        assert_eq!(e, vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_recovers_ar1_coefficient() {
        let series = TimeSeries::new(ar1(0.6, 10.0, 300, 42)).unwrap();
        let fit = estimate(&series, ModelOrder::new(1, 0, 0), &AutoArimaConfig::default()).unwrap();

        assert!((fit.ar[0] - 0.6).abs() < 0.15, "phi = {}", fit.ar[0]);
        let intercept = fit.intercept.unwrap();
        assert!((intercept - 10.0).abs() < 0.5, "mu = {}", intercept);
        assert!(fit.sigma2 > 0.7 && fit.sigma2 < 1.3, "sigma2 = {}", fit.sigma2);
        assert_eq!(fit.nobs, 300);
        assert_eq!(fit.n_params, 3);
        assert_eq!(fit.std_errors.len(), 2);
        assert!(fit.std_errors.iter().all(|se| se.is_finite() && *se > 0.0));
        assert!(fit.converged);
    }

    #[test]
    fn test_css_method_reports_conditional_nobs() {
        let series = TimeSeries::new(ar1(0.5, 0.0, 200, 8)).unwrap();
        let config = AutoArimaConfig::default().with_method(EstimationMethod::Css);
        let fit = estimate(&series, ModelOrder::new(2, 0, 0), &config).unwrap();
        assert_eq!(fit.nobs, 198);
        assert_eq!(fit.residuals.len(), 198);
        assert_eq!(fit.method, EstimationMethod::Css);
    }

    #[test]
    fn test_score_uses_configured_criterion() {
        let series = TimeSeries::new(ar1(0.5, 0.0, 150, 9)).unwrap();
        let config = AutoArimaConfig::default().with_criterion(InformationCriterion::Bic);
        let fit = estimate(&series, ModelOrder::new(1, 0, 0), &config).unwrap();
        let expected = InformationCriterion::Bic.score(fit.log_likelihood, 3, fit.nobs);
        assert!((fit.score - expected).abs() < 1e-9);
        assert!(fit.score > fit.aic());
    }

    #[test]
    fn test_no_intercept_when_twice_differenced() {
        let series = TimeSeries::new(ar1(0.4, 0.0, 120, 4)).unwrap();
        let fit = estimate(&series, ModelOrder::new(1, 2, 0), &AutoArimaConfig::default()).unwrap();
        assert!(fit.intercept.is_none());
        assert_eq!(fit.coefficients().len(), 1);
    }

    #[test]
    fn test_white_noise_order_is_closed_form() {
        let values = ar1(0.0, 3.0, 100, 1);
        let series = TimeSeries::new(values.clone()).unwrap();
        let fit = estimate(&series, ModelOrder::new(0, 0, 0), &AutoArimaConfig::default()).unwrap();
        assert!((fit.intercept.unwrap() - data::mean(&values)).abs() < 1e-12);
        assert!((fit.sigma2 - data::variance(&values)).abs() < 1e-9);
        assert_eq!(fit.iterations, 0);
    }

    #[test]
    fn test_too_few_observations() {
        let series = TimeSeries::new(vec![1.0, 2.0, 1.5, 3.0, 2.5]).unwrap();
        let err = estimate(&series, ModelOrder::new(2, 0, 2), &AutoArimaConfig::default())
            .unwrap_err();
        match err {
            ArimaError::Estimation { order, source } => {
                assert_eq!(order, ModelOrder::new(2, 0, 2));
                assert_eq!(
                    source,
                    EstimationError::NotEnoughObservations {
                        available: 3,
                        required: 6
                    }
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_constant_series_has_zero_variance() {
        let series = TimeSeries::new(vec![2.0; 40]).unwrap();
        let err = estimate_differenced(
            &series.difference(0),
            ModelOrder::new(0, 0, 0),
            &AutoArimaConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err, EstimationError::ZeroVariance);
    }
}
