use anyhow::{ensure, Context, Result};
use revenue_forecaster::ForecastConfig;
use std::env;
use std::path::PathBuf;
use valuation_classifier::ClassifierConfig;

/// Technology basket the dataset is built from when no tickers are given.
pub const DEFAULT_TICKERS: [&str; 50] = [
    "AAPL", "MSFT", "GOOG", "AMZN", "META", "NVDA", "ORCL", "INTC", "CSCO", "IBM",
    "ADBE", "CRM", "TXN", "QCOM", "AVGO", "SAP", "NOW", "TEAM", "SNPS", "AMD",
    "INTU", "AMAT", "MU", "KLAC", "LRCX", "ADI", "ANSS", "PANW", "FTNT", "CDNS",
    "SNOW", "MDB", "DOCU", "DDOG", "OKTA", "CRWD", "NET", "SPLK", "TWLO", "WDAY",
    "PLTR", "FSLY", "ZS", "COUP", "COHR", "CDW", "AKAM", "NFLX", "ZBRA", "FFIV",
];

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub dataset_path: PathBuf,
    pub classifier: ClassifierConfig,
    pub forecast: ForecastConfig,
    pub fair_value_tolerance: f64,
    pub yahoo_timeout_secs: u64,
    pub tickers: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("stocks_enhanced.csv"),
            classifier: ClassifierConfig::default(),
            forecast: ForecastConfig::default(),
            fair_value_tolerance: 0.0,
            yahoo_timeout_secs: 30,
            tickers: DEFAULT_TICKERS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let split_seed = match lookup("CLASSIFIER_SPLIT_SEED") {
            Some(raw) if !raw.trim().is_empty() => Some(
                raw.trim()
                    .parse::<u64>()
                    .context("CLASSIFIER_SPLIT_SEED must be an unsigned integer")?,
            ),
            _ => None,
        };

        let tickers = match lookup("DATASET_TICKERS") {
            Some(raw) if !raw.trim().is_empty() => parse_ticker_list(&raw),
            _ => DEFAULT_TICKERS.iter().map(|t| t.to_string()).collect(),
        };

        let config = Self {
            dataset_path: PathBuf::from(var("DATASET_PATH", "stocks_enhanced.csv")),
            classifier: ClassifierConfig {
                n_trees: var("CLASSIFIER_TREES", "100")
                    .parse()
                    .context("CLASSIFIER_TREES must be a positive integer")?,
                test_fraction: var("CLASSIFIER_TEST_FRACTION", "0.25")
                    .parse()
                    .context("CLASSIFIER_TEST_FRACTION must be a number")?,
                split_seed,
                ..Default::default()
            },
            forecast: ForecastConfig::default(),
            fair_value_tolerance: var("FAIR_VALUE_TOLERANCE", "0.0")
                .parse()
                .context("FAIR_VALUE_TOLERANCE must be a number")?,
            yahoo_timeout_secs: var("YAHOO_TIMEOUT_SECS", "30")
                .parse()
                .context("YAHOO_TIMEOUT_SECS must be a whole number of seconds")?,
            tickers,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.classifier.validate()?;
        self.forecast.validate()?;
        ensure!(
            self.fair_value_tolerance.is_finite() && self.fair_value_tolerance >= 0.0,
            "FAIR_VALUE_TOLERANCE must be >= 0, got {}",
            self.fair_value_tolerance
        );
        ensure!(self.yahoo_timeout_secs > 0, "YAHOO_TIMEOUT_SECS must be at least 1");
        ensure!(!self.tickers.is_empty(), "ticker list is empty");
        Ok(())
    }
}

/// Split a comma separated list, upper-casing and dropping blanks.
pub fn parse_ticker_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .collect()
}
