//! Exact Gaussian likelihood of a stationary ARMA process.
//!
//! The process `w_t = sum(phi_i w_{t-i}) + e_t + sum(theta_j e_{t-j})` is put
//! in state-space form with state dimension `r = max(p, q + 1)`:
//!
//! ```text
//! x[t+1] = T x[t] + R e[t]
//! w[t]   = x[t][0]
//! ```
//!
//! `T` has the AR coefficients in its first column and ones on the
//! superdiagonal, `R = [1, theta_1, ..., theta_q, 0, ...]`. The filter starts
//! from the stationary state covariance and evaluates the likelihood by
//! prediction error decomposition with `sigma^2` concentrated out.

use crate::error::EstimationError;
use nalgebra::{DMatrix, DVector};
use std::f64::consts::PI;

/// Relative change of the prediction variance below which the filter is
/// treated as having reached its steady state.
const STEADY_STATE_TOLERANCE: f64 = 1e-11;

/// Companion-form state-space model of an ARMA process
#[derive(Debug, Clone)]
pub(crate) struct StateSpace {
    r: usize,
    /// First column of `T`, zero padded to length `r`
    phi: Vec<f64>,
    /// Noise loading vector `R`
    loading: Vec<f64>,
}

impl StateSpace {
    pub(crate) fn new(ar: &[f64], ma: &[f64]) -> Self {
        let r = ar.len().max(ma.len() + 1);

        let mut phi = vec![0.0; r];
        phi[..ar.len()].copy_from_slice(ar);

        let mut loading = vec![0.0; r];
        loading[0] = 1.0;
        loading[1..=ma.len()].copy_from_slice(ma);

        Self { r, phi, loading }
    }

    /// Solve `P = T P T' + R R'` for the stationary state covariance, stored
    /// row-major. Returns `None` when the AR part has a unit root.
    pub(crate) fn stationary_covariance(&self) -> Option<Vec<f64>> {
        let r = self.r;
        let n = r * r;

        // T[i][k]: phi in column 0, ones on the superdiagonal
        let t = |i: usize, k: usize| -> f64 {
            let mut value = if k == 0 { self.phi[i] } else { 0.0 };
            if k == i + 1 {
                value += 1.0;
            }
            value
        };

        let mut system = DMatrix::<f64>::identity(n, n);
        for i in 0..r {
            for j in 0..r {
                for k in 0..r {
                    let tik = t(i, k);
                    if tik == 0.0 {
                        continue;
                    }
                    for l in 0..r {
                        system[(i * r + j, k * r + l)] -= tik * t(j, l);
                    }
                }
            }
        }

        let rhs = DVector::from_fn(n, |idx, _| {
            self.loading[idx / r] * self.loading[idx % r]
        });

        let solution = system.lu().solve(&rhs)?;
        if solution.iter().any(|v| !v.is_finite()) || solution[0] <= 0.0 {
            return None;
        }

        Some(solution.iter().copied().collect())
    }
}

/// Result of one filter pass
#[derive(Debug, Clone)]
pub(crate) struct KalmanOutput {
    /// Concentrated Gaussian log-likelihood
    pub log_likelihood: f64,
    /// Maximum-likelihood innovation variance
    pub sigma2: f64,
    /// One-step prediction errors `w_t - E[w_t | w_1..w_{t-1}]`
    pub innovations: Vec<f64>,
}

/// Run the filter over the mean-removed series `data`.
pub(crate) fn filter(ss: &StateSpace, data: &[f64]) -> Result<KalmanOutput, EstimationError> {
    let r = ss.r;
    let n = data.len();
    if n == 0 {
        return Err(EstimationError::NotEnoughObservations {
            available: 0,
            required: 1,
        });
    }

    let mut p = ss
        .stationary_covariance()
        .ok_or(EstimationError::StateCovariance)?;
    let mut a = vec![0.0; r];

    let mut updated_a = vec![0.0; r];
    let mut updated_p = vec![0.0; r * r];
    let mut tp = vec![0.0; r * r];
    let mut gain = vec![0.0; r];

    let mut weighted_ss = 0.0;
    let mut sum_log_f = 0.0;
    let mut innovations = Vec::with_capacity(n);
    let mut steady = false;

    for &y in data {
        let f = p[0];
        if !(f > 0.0 && f.is_finite()) {
            return Err(EstimationError::StateCovariance);
        }
        let v = y - a[0];

        weighted_ss += v * v / f;
        sum_log_f += f.ln();
        innovations.push(v);

        for i in 0..r {
            gain[i] = p[i * r] / f;
            updated_a[i] = a[i] + gain[i] * v;
        }

        // a = T a_upd
        for i in 0..r {
            let next = if i + 1 < r { updated_a[i + 1] } else { 0.0 };
            a[i] = ss.phi[i] * updated_a[0] + next;
        }

        if steady {
            continue;
        }

        // P_upd = P - K P[0, :] F
        for i in 0..r {
            for j in 0..r {
                updated_p[i * r + j] = p[i * r + j] - gain[i] * p[j];
            }
        }

        // TP = T P_upd
        for i in 0..r {
            for j in 0..r {
                let below = if i + 1 < r {
                    updated_p[(i + 1) * r + j]
                } else {
                    0.0
                };
                tp[i * r + j] = ss.phi[i] * updated_p[j] + below;
            }
        }

        // P = TP T' + R R'
        for i in 0..r {
            for j in 0..r {
                let right = if j + 1 < r { tp[i * r + j + 1] } else { 0.0 };
                p[i * r + j] = tp[i * r] * ss.phi[j] + right + ss.loading[i] * ss.loading[j];
            }
        }

        if (p[0] - f).abs() <= STEADY_STATE_TOLERANCE * f {
            steady = true;
        }
    }

    let nf = n as f64;
    let sigma2 = weighted_ss / nf;
    if !(sigma2 > 0.0) {
        return Err(EstimationError::ZeroVariance);
    }
    let log_likelihood = -0.5 * nf * ((2.0 * PI).ln() + sigma2.ln() + 1.0) - 0.5 * sum_log_f;

    Ok(KalmanOutput {
        log_likelihood,
        sigma2,
        innovations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ar1_stationary_variance() {
        let ss = StateSpace::new(&[0.6], &[]);
        let p = ss.stationary_covariance().unwrap();
        assert_eq!(p.len(), 1);
        assert_relative_eq!(p[0], 1.0 / (1.0 - 0.36), epsilon = 1e-12);
    }

    #[test]
    fn test_ma1_stationary_covariance() {
        let ss = StateSpace::new(&[], &[0.4]);
        let p = ss.stationary_covariance().unwrap();
        // Var(w) = 1 + theta^2, state 2 is theta * e_t
        assert_relative_eq!(p[0], 1.16, epsilon = 1e-12);
        assert_relative_eq!(p[1], 0.4, epsilon = 1e-12);
        assert_relative_eq!(p[3], 0.16, epsilon = 1e-12);
    }

    #[test]
    fn test_unit_root_has_no_stationary_covariance() {
        let ss = StateSpace::new(&[1.0], &[]);
        assert!(ss.stationary_covariance().is_none());
    }

    #[test]
    fn test_white_noise_likelihood() {
        let data = [0.5, -1.0, 1.5, -0.5, 0.0, 1.0];
        let out = filter(&StateSpace::new(&[], &[]), &data).unwrap();

        let n = data.len() as f64;
        let sigma2 = data.iter().map(|v| v * v).sum::<f64>() / n;
        assert_relative_eq!(out.sigma2, sigma2, epsilon = 1e-12);
        assert_relative_eq!(
            out.log_likelihood,
            -0.5 * n * ((2.0 * PI).ln() + sigma2.ln() + 1.0),
            epsilon = 1e-10
        );
        assert_eq!(out.innovations, data.to_vec());
    }

    #[test]
    fn test_ar1_innovations_after_first_step() {
        // Past the first sample the AR(1) prediction is phi * w_{t-1}
        let data = [1.0, 2.0, 0.5, -1.0];
        let out = filter(&StateSpace::new(&[0.5], &[]), &data).unwrap();
        assert_relative_eq!(out.innovations[0], 1.0);
        assert_relative_eq!(out.innovations[1], 1.5, epsilon = 1e-12);
        assert_relative_eq!(out.innovations[2], -0.5, epsilon = 1e-12);
        assert_relative_eq!(out.innovations[3], -1.25, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_series_has_zero_variance() {
        let out = filter(&StateSpace::new(&[0.3], &[]), &[0.0; 8]);
        assert!(matches!(out, Err(EstimationError::ZeroVariance)));
    }
}
