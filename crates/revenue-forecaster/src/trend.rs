//! Piecewise-linear trend with L2-shrunk changepoint deltas.
//!
//! y(t) = m + k*t + sum_j delta_j * max(t - s_j, 0)

use nalgebra::{DMatrix, DVector};
use valuation_core::{ValuationError, ValuationResult};

#[derive(Debug, Clone)]
pub struct TrendFit {
    pub offset: f64,
    pub slope: f64,
    pub changepoints: Vec<f64>,
    pub deltas: Vec<f64>,
}

impl TrendFit {
    pub fn value_at(&self, t: f64) -> f64 {
        let bends: f64 = self
            .changepoints
            .iter()
            .zip(&self.deltas)
            .map(|(s, d)| d * (t - s).max(0.0))
            .sum();
        self.offset + self.slope * t + bends
    }
}

/// Changepoint locations: evenly spaced observed times inside the first
/// `range` share of the history, excluding the first point.
pub fn changepoint_locations(t: &[f64], max_changepoints: usize, range: f64) -> Vec<f64> {
    let hist_size = (range * t.len() as f64).floor() as usize;
    let n_changepoints = max_changepoints.min(hist_size.saturating_sub(1));
    if n_changepoints == 0 {
        return Vec::new();
    }
    let last = (hist_size - 1) as f64;
    (1..=n_changepoints)
        .map(|j| {
            let idx = (j as f64 * last / n_changepoints as f64).round() as usize;
            t[idx.min(t.len() - 1)]
        })
        .collect()
}

/// Solve the penalized normal equations (X'X + P) beta = X'y where P puts
/// `penalty` on each changepoint delta and nothing on offset and slope.
pub fn fit_trend(t: &[f64], y: &[f64], changepoints: &[f64], penalty: f64) -> ValuationResult<TrendFit> {
    let n = t.len();
    let p = 2 + changepoints.len();

    let x = DMatrix::from_fn(n, p, |i, j| match j {
        0 => 1.0,
        1 => t[i],
        _ => (t[i] - changepoints[j - 2]).max(0.0),
    });
    let target = DVector::from_column_slice(y);

    let mut lhs = x.transpose() * &x;
    for j in 2..p {
        lhs[(j, j)] += penalty;
    }
    let rhs = x.transpose() * target;

    let beta = lhs
        .lu()
        .solve(&rhs)
        .ok_or_else(|| ValuationError::ModelFitFailure("trend normal equations are singular".to_string()))?;

    if beta.iter().any(|b| !b.is_finite()) {
        return Err(ValuationError::ModelFitFailure(
            "trend coefficients are not finite".to_string(),
        ));
    }

    Ok(TrendFit {
        offset: beta[0],
        slope: beta[1],
        changepoints: changepoints.to_vec(),
        deltas: beta.iter().skip(2).copied().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_changepoint_locations() {
        let t: Vec<f64> = (0..10).map(|i| i as f64 / 9.0).collect();
        // hist_size 8 -> 7 changepoints at indices 1..=7
        let cps = changepoint_locations(&t, 25, 0.8);
        assert_eq!(cps.len(), 7);
        assert_relative_eq!(cps[0], t[1]);
        assert_relative_eq!(cps[6], t[7]);

        assert_eq!(changepoint_locations(&t, 3, 0.8).len(), 3);
        assert!(changepoint_locations(&[0.0, 1.0], 25, 0.8).is_empty());
    }

    #[test]
    fn test_straight_line_is_recovered() {
        let t = [0.0, 0.25, 0.5, 0.75, 1.0];
        let y: Vec<f64> = t.iter().map(|x| 2.0 + 3.0 * x).collect();
        let fit = fit_trend(&t, &y, &[0.25, 0.5], 20.0).unwrap();
        assert_relative_eq!(fit.offset, 2.0, epsilon = 1e-9);
        assert_relative_eq!(fit.slope, 3.0, epsilon = 1e-9);
        assert_relative_eq!(fit.value_at(2.0), 8.0, epsilon = 1e-9);
    }

    #[test]
    fn test_degenerate_time_axis_fails() {
        let t = [0.0, 0.0, 0.0];
        let y = [1.0, 2.0, 3.0];
        assert!(fit_trend(&t, &y, &[], 20.0).is_err());
    }
}
