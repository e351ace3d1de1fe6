//! Stationarity and invertibility constraints on ARMA coefficients.
//!
//! The optimizer works on unconstrained reals. Each block is mapped to
//! partial autocorrelations in `(-1, 1)` with `tanh`, then turned into
//! polynomial coefficients by the Levinson-Durbin recursion (Jones 1980,
//! Monahan 1984). Any real input therefore yields a stationary AR
//! polynomial `1 - phi_1 B - ... - phi_p B^p` or an invertible MA
//! polynomial `1 + theta_1 B + ... + theta_q B^q`.

/// Partial autocorrelations are clamped to this magnitude before `atanh`.
const MAX_PARTIAL: f64 = 0.9999;

/// Map unconstrained values to stationary AR coefficients
pub(crate) fn constrain_ar(alpha: &[f64]) -> Vec<f64> {
    let r: Vec<f64> = alpha.iter().map(|a| a.tanh()).collect();
    levinson_durbin(&r)
}

/// Map unconstrained values to invertible MA coefficients
pub(crate) fn constrain_ma(beta: &[f64]) -> Vec<f64> {
    // 1 + sum(theta B^j) is invertible iff 1 - sum(-theta B^j) is stationary
    let r: Vec<f64> = beta.iter().map(|b| -b.tanh()).collect();
    levinson_durbin(&r).into_iter().map(|c| -c).collect()
}

/// Inverse of [`constrain_ar`], used to seed the optimizer from estimates
pub(crate) fn unconstrain_ar(phi: &[f64]) -> Vec<f64> {
    partial_autocorrelations(phi)
        .into_iter()
        .map(|r| r.clamp(-MAX_PARTIAL, MAX_PARTIAL).atanh())
        .collect()
}

/// Inverse of [`constrain_ma`]
pub(crate) fn unconstrain_ma(theta: &[f64]) -> Vec<f64> {
    let negated: Vec<f64> = theta.iter().map(|t| -t).collect();
    partial_autocorrelations(&negated)
        .into_iter()
        .map(|r| -(r.clamp(-MAX_PARTIAL, MAX_PARTIAL).atanh()))
        .collect()
}

fn levinson_durbin(r: &[f64]) -> Vec<f64> {
    let p = r.len();
    if p == 0 {
        return Vec::new();
    }

    let mut phi = vec![0.0; p];
    let mut prev = vec![0.0; p];
    phi[0] = r[0];

    for k in 1..p {
        prev.copy_from_slice(&phi);
        phi[k] = r[k];
        for j in 0..k {
            phi[j] = prev[j] - r[k] * prev[k - 1 - j];
        }
    }

    phi
}

/// Run the recursion backwards. Coefficients outside the stationary region
/// produce partial autocorrelations at or beyond +/-1, which the callers
/// clamp.
fn partial_autocorrelations(phi: &[f64]) -> Vec<f64> {
    let p = phi.len();
    let mut current = phi.to_vec();
    let mut r = vec![0.0; p];

    for k in (0..p).rev() {
        r[k] = current[k];
        if k == 0 {
            break;
        }
        let denom = 1.0 - r[k] * r[k];
        if denom.abs() < f64::EPSILON {
            // Boundary of the region; remaining partials stay at zero
            r[k] = r[k].signum();
            return r;
        }
        let mut next = vec![0.0; k];
        for j in 0..k {
            next[j] = (current[j] + r[k] * current[k - 1 - j]) / denom;
        }
        current = next;
    }

    r
}

/// Whether every root of `1 - phi_1 z - ... - phi_p z^p` lies outside the
/// unit circle, checked by running the recursion backwards.
#[cfg(test)]
fn is_stationary(phi: &[f64]) -> bool {
    let mut current = phi.to_vec();
    for k in (0..phi.len()).rev() {
        let r = current[k];
        if r.abs() >= 1.0 {
            return false;
        }
        let denom = 1.0 - r * r;
        current = (0..k)
            .map(|j| (current[j] + r * current[k - 1 - j]) / denom)
            .collect();
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_empty_blocks() {
        assert!(constrain_ar(&[]).is_empty());
        assert!(constrain_ma(&[]).is_empty());
        assert!(unconstrain_ar(&[]).is_empty());
    }

    #[test]
    fn test_single_coefficient_is_tanh() {
        assert_abs_diff_eq!(constrain_ar(&[0.5])[0], 0.5f64.tanh(), epsilon = 1e-15);
        assert_abs_diff_eq!(constrain_ma(&[0.5])[0], 0.5f64.tanh(), epsilon = 1e-15);
    }

    #[test]
    fn test_round_trip() {
        let alpha = [0.8, -0.4, 0.3];
        let phi = constrain_ar(&alpha);
        let back = unconstrain_ar(&phi);
        for (a, b) in alpha.iter().zip(back.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-10);
        }

        let beta = [-1.2, 0.6];
        let theta = constrain_ma(&beta);
        let back = unconstrain_ma(&theta);
        for (a, b) in beta.iter().zip(back.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_constrained_ar_is_stationary() {
        for alpha in [[3.0, -2.0, 5.0], [-4.0, 4.0, -4.0], [0.1, 0.2, 0.3]] {
            assert!(is_stationary(&constrain_ar(&alpha)));
        }
    }

    #[test]
    fn test_constrained_ma_is_invertible() {
        for beta in [[3.0, -2.0], [-4.0, 4.0], [2.5, 2.5]] {
            let theta = constrain_ma(&beta);
            let flipped: Vec<f64> = theta.iter().map(|t| -t).collect();
            assert!(is_stationary(&flipped));
        }
    }

    #[test]
    fn test_stationarity_check() {
        assert!(is_stationary(&[0.5]));
        assert!(!is_stationary(&[1.0]));
        assert!(is_stationary(&[0.5, 0.3]));
        // phi_1 + phi_2 = 1 is a unit root
        assert!(!is_stationary(&[0.6, 0.4]));
        assert!(!is_stationary(&[0.2, 1.1]));
    }
}
