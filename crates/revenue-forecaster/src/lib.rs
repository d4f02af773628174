//! Next-period revenue forecasting from annual history.
//!
//! Annual data carries no usable seasonality, so the model is trend only:
//! a continuous piecewise-linear curve whose changepoint deltas are shrunk
//! toward zero, extrapolated one annual period past the last observation.

pub mod trend;

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use valuation_core::stats::std_dev;
use valuation_core::{RevenueForecast, RevenueSeries, ValuationError, ValuationResult};

use crate::trend::{changepoint_locations, fit_trend};

/// Minimum usable revenue points.
pub const MIN_HISTORY: usize = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Smaller values shrink trend changes harder
    pub changepoint_prior_scale: f64,
    pub n_changepoints: usize,
    /// Share of the history eligible for changepoints
    pub changepoint_range: f64,
    /// Coverage of the reported interval
    pub interval_width: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            changepoint_prior_scale: 0.05,
            n_changepoints: 25,
            changepoint_range: 0.8,
            interval_width: 0.80,
        }
    }
}

impl ForecastConfig {
    pub fn validate(&self) -> ValuationResult<()> {
        if !(self.changepoint_prior_scale > 0.0 && self.changepoint_prior_scale.is_finite()) {
            return Err(ValuationError::InvalidConfig(format!(
                "changepoint_prior_scale must be positive, got {}",
                self.changepoint_prior_scale
            )));
        }
        if !(self.changepoint_range > 0.0 && self.changepoint_range <= 1.0) {
            return Err(ValuationError::InvalidConfig(format!(
                "changepoint_range must be in (0, 1], got {}",
                self.changepoint_range
            )));
        }
        if !(self.interval_width > 0.0 && self.interval_width < 1.0) {
            return Err(ValuationError::InvalidConfig(format!(
                "interval_width must be in (0, 1), got {}",
                self.interval_width
            )));
        }
        Ok(())
    }
}

pub struct RevenueForecaster {
    config: ForecastConfig,
}

impl RevenueForecaster {
    pub fn new(config: ForecastConfig) -> ValuationResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Forecast revenue for the annual period following the last observation.
    pub fn forecast(&self, series: &RevenueSeries) -> ValuationResult<RevenueForecast> {
        let points = series.points();
        if points.len() < MIN_HISTORY {
            return Err(ValuationError::InsufficientHistory {
                available: points.len(),
                required: MIN_HISTORY,
            });
        }
        if let Some(bad) = points.iter().find(|p| !p.revenue.is_finite()) {
            return Err(ValuationError::ModelFitFailure(format!(
                "non-finite revenue for period {}",
                bad.period_end
            )));
        }

        let first = points[0].period_end;
        let last = points[points.len() - 1].period_end;
        let span = (last - first).num_days();
        if span <= 0 {
            return Err(ValuationError::ModelFitFailure(format!(
                "all {} revenue points share period end {}",
                points.len(),
                first
            )));
        }

        let scale_t = |date: NaiveDate| (date - first).num_days() as f64 / span as f64;
        let t: Vec<f64> = points.iter().map(|p| scale_t(p.period_end)).collect();

        let y_scale = points
            .iter()
            .map(|p| p.revenue.abs())
            .fold(0.0_f64, f64::max);
        let y_scale = if y_scale > 0.0 { y_scale } else { 1.0 };
        let y: Vec<f64> = points.iter().map(|p| p.revenue / y_scale).collect();

        let changepoints =
            changepoint_locations(&t, self.config.n_changepoints, self.config.changepoint_range);
        let fit = fit_trend(&t, &y, &changepoints, 1.0 / self.config.changepoint_prior_scale)?;

        // Keeps the fiscal year end (a June year stays June) instead of snapping to Dec 31.
        let next_period = last.checked_add_months(Months::new(12)).ok_or_else(|| {
            ValuationError::ModelFitFailure(format!("cannot advance {} by one year", last))
        })?;
        let value = fit.value_at(scale_t(next_period)) * y_scale;
        if !value.is_finite() {
            return Err(ValuationError::ModelFitFailure(
                "forecast is not finite".to_string(),
            ));
        }

        let residuals: Vec<f64> = t
            .iter()
            .zip(&y)
            .map(|(ti, yi)| (yi - fit.value_at(*ti)) * y_scale)
            .collect();
        let sigma = if residuals.len() > 2 { std_dev(&residuals) } else { 0.0 };
        let z = Normal::new(0.0, 1.0)
            .map_err(|e| ValuationError::ModelFitFailure(e.to_string()))?
            .inverse_cdf(0.5 + self.config.interval_width / 2.0);

        tracing::debug!(
            "Fitted revenue trend for {} over {} points with {} changepoints",
            series.ticker(),
            points.len(),
            changepoints.len()
        );

        Ok(RevenueForecast {
            ticker: series.ticker().to_string(),
            period_end: next_period,
            value,
            lower: value - z * sigma,
            upper: value + z * sigma,
        })
    }
}

impl Default for RevenueForecaster {
    fn default() -> Self {
        Self {
            config: ForecastConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use valuation_core::RevenuePoint;

    fn year_end(year: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, 12, 31).unwrap()
    }

    fn series(values: &[f64]) -> RevenueSeries {
        let points = values
            .iter()
            .enumerate()
            .map(|(i, &revenue)| RevenuePoint {
                period_end: year_end(2018 + i as i32),
                revenue,
            })
            .collect();
        RevenueSeries::new("TEST", points)
    }

    #[test]
    fn test_ten_percent_growth_continues() {
        let forecast = RevenueForecaster::default()
            .forecast(&series(&[100.0, 110.0, 121.0]))
            .unwrap();
        assert!(
            forecast.value > 120.0 && forecast.value < 145.0,
            "forecast {}",
            forecast.value
        );
        assert_eq!(forecast.period_end, year_end(2021));
        assert!(forecast.lower <= forecast.value && forecast.value <= forecast.upper);
    }

    #[test]
    fn test_single_point_is_insufficient_history() {
        let err = RevenueForecaster::default()
            .forecast(&series(&[383.0]))
            .unwrap_err();
        assert_eq!(
            err,
            ValuationError::InsufficientHistory {
                available: 1,
                required: 2
            }
        );
    }

    #[test]
    fn test_two_points_extrapolate_linearly() {
        let forecast = RevenueForecaster::default()
            .forecast(&series(&[200.0, 240.0]))
            .unwrap();
        // 2018 -> 2019 spans 365 days, 2019 -> 2020 spans 366
        let expected = 240.0 + 40.0 * 366.0 / 365.0;
        assert_relative_eq!(forecast.value, expected, epsilon = 1e-6);
        assert_relative_eq!(forecast.lower, forecast.upper);
    }

    #[test]
    fn test_june_fiscal_year_keeps_its_year_end() {
        let points = (2021..=2023)
            .zip([211.9, 245.1, 281.7])
            .map(|(year, revenue)| RevenuePoint {
                period_end: NaiveDate::from_ymd_opt(year, 6, 30).unwrap(),
                revenue,
            })
            .collect();
        let forecast = RevenueForecaster::default()
            .forecast(&RevenueSeries::new("MSFT", points))
            .unwrap();
        assert_eq!(forecast.period_end, NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());
    }

    #[test]
    fn test_flat_series_forecasts_flat() {
        let forecast = RevenueForecaster::default()
            .forecast(&series(&[50.0, 50.0, 50.0, 50.0]))
            .unwrap();
        assert_relative_eq!(forecast.value, 50.0, epsilon = 1e-6);
    }

    #[test]
    fn test_identical_dates_are_fit_failure() {
        let points = vec![
            RevenuePoint { period_end: year_end(2022), revenue: 10.0 },
            RevenuePoint { period_end: year_end(2022), revenue: 12.0 },
        ];
        let err = RevenueForecaster::default()
            .forecast(&RevenueSeries::new("DUP", points))
            .unwrap_err();
        assert_eq!(err.tag(), "ModelFitFailure");
    }

    #[test]
    fn test_infinite_revenue_is_fit_failure() {
        let err = RevenueForecaster::default()
            .forecast(&series(&[1.0, f64::INFINITY, 3.0]))
            .unwrap_err();
        assert_eq!(err.tag(), "ModelFitFailure");
    }

    #[test]
    fn test_longer_history_with_noise() {
        let values = [
            229.2, 265.6, 260.2, 274.5, 365.8, 394.3, 383.3, 391.0,
        ];
        let forecast = RevenueForecaster::default().forecast(&series(&values)).unwrap();
        assert!(forecast.value > 380.0 && forecast.value < 520.0, "forecast {}", forecast.value);
        assert!(forecast.upper > forecast.lower);
    }

    #[test]
    fn test_invalid_config() {
        let config = ForecastConfig {
            interval_width: 1.5,
            ..Default::default()
        };
        assert!(RevenueForecaster::new(config).is_err());
    }
}
