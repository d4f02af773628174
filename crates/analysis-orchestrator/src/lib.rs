//! Caller-facing operations over a market-data provider.
//!
//! The orchestrator holds no per-user state: each flow owns a
//! [`SessionContext`] and passes it into every call.

pub mod config;
pub mod report;

pub use config::{parse_ticker_list, AppConfig, DEFAULT_TICKERS};
pub use report::{FieldValue, FundamentalsReport};

use fundamental_analysis::{
    read_dataset, write_dataset, EnrichmentReport, FairValueEngine, SkipReason, SkippedTicker,
};
use revenue_forecaster::RevenueForecaster;
use valuation_classifier::{Partition, RowPrediction, ValuationClassifier};
use valuation_core::{
    FeatureVector, FundamentalsSnapshot, MarketDataProvider, RevenueForecast, RevenueSeries,
    ValuationError, ValuationLabel, ValuationResult,
};

/// Active ticker and its fundamentals for one user flow.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    ticker: Option<String>,
    fundamentals: Option<FundamentalsSnapshot>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ticker(&self) -> Option<&str> {
        self.ticker.as_deref()
    }

    pub fn fundamentals(&self) -> Option<&FundamentalsSnapshot> {
        self.fundamentals.as_ref()
    }

    pub fn set(&mut self, ticker: String, fundamentals: FundamentalsSnapshot) {
        self.ticker = Some(ticker);
        self.fundamentals = Some(fundamentals);
    }

    fn active(&self) -> ValuationResult<(&str, &FundamentalsSnapshot)> {
        match (self.ticker.as_deref(), self.fundamentals.as_ref()) {
            (Some(ticker), Some(fundamentals)) => Ok((ticker, fundamentals)),
            _ => Err(ValuationError::NoActiveTicker),
        }
    }
}

/// Result of one classification request.
#[derive(Debug, Clone)]
pub struct ClassificationOutcome {
    pub ticker: String,
    pub label: ValuationLabel,
    pub vote_shares: Vec<(ValuationLabel, f64)>,
    pub train_accuracy: f64,
    pub test_accuracy: f64,
    pub train_size: usize,
    pub test_size: usize,
    pub test_predictions: Vec<RowPrediction>,
    pub feature_importances: Vec<(&'static str, f64)>,
}

pub fn normalize_ticker(raw: &str) -> String {
    raw.trim().to_uppercase()
}

pub struct AnalysisOrchestrator<P: MarketDataProvider> {
    provider: P,
    config: AppConfig,
    fair_value_engine: FairValueEngine,
    classifier: ValuationClassifier,
    forecaster: RevenueForecaster,
}

impl<P: MarketDataProvider> AnalysisOrchestrator<P> {
    pub fn new(provider: P, config: AppConfig) -> ValuationResult<Self> {
        Ok(Self {
            fair_value_engine: FairValueEngine::with_tolerance(config.fair_value_tolerance)?,
            classifier: ValuationClassifier::new(config.classifier.clone())?,
            forecaster: RevenueForecaster::new(config.forecast.clone())?,
            provider,
            config,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Fetch fundamentals for `ticker` and make it the session's active ticker.
    ///
    /// A failed statement fetch only blanks the revenue and net income
    /// figures; a failed snapshot fetch leaves the session untouched.
    pub async fn show_fundamentals(
        &self,
        ctx: &mut SessionContext,
        ticker: &str,
    ) -> ValuationResult<FundamentalsReport> {
        let ticker = normalize_ticker(ticker);
        if ticker.is_empty() {
            return Err(ValuationError::NoData("empty ticker symbol".to_string()));
        }

        tracing::info!("Fetching fundamentals for {} from {}", ticker, self.provider.provider_name());
        let snapshot = self.provider.fetch_fundamentals(&ticker).await?;

        let statements = match self.provider.fetch_annual_statements(&ticker).await {
            Ok(statements) => statements,
            Err(e) => {
                tracing::warn!("No annual statements for {}: {}", ticker, e);
                Vec::new()
            }
        };

        let report = FundamentalsReport::new(snapshot.clone(), &statements);
        ctx.set(ticker, snapshot);
        Ok(report)
    }

    /// Retrain on the persisted dataset and classify the active ticker.
    pub fn run_classifier(&self, ctx: &SessionContext) -> ValuationResult<ClassificationOutcome> {
        let (ticker, fundamentals) = ctx.active()?;
        let features = FeatureVector::from_snapshot(fundamentals)?;

        let dataset = read_dataset(&self.config.dataset_path)?;
        let model = self.classifier.train(&dataset)?;

        let train_accuracy = model.evaluate(Partition::Train);
        let test_accuracy = model.evaluate(Partition::Test);
        tracing::info!(
            "Classifier accuracy: train {:.3} ({} rows), test {:.3} ({} rows)",
            train_accuracy,
            model.train_len(),
            test_accuracy,
            model.test_len()
        );

        let label = model.predict(&features);
        Ok(ClassificationOutcome {
            ticker: ticker.to_string(),
            label,
            vote_shares: model.vote_shares(&features),
            train_accuracy,
            test_accuracy,
            train_size: model.train_len(),
            test_size: model.test_len(),
            test_predictions: model.partition_predictions(Partition::Test),
            feature_importances: model.feature_importances(),
        })
    }

    /// Forecast next-period revenue for the active ticker.
    pub async fn forecast_revenue(&self, ctx: &SessionContext) -> ValuationResult<RevenueForecast> {
        let ticker = ctx.ticker().ok_or(ValuationError::NoActiveTicker)?;
        let statements = self.provider.fetch_annual_statements(ticker).await?;
        let series = RevenueSeries::from_statements(ticker, &statements)?;
        let forecast = self.forecaster.forecast(&series)?;
        tracing::info!(
            "Forecast revenue for {} ({}): {:.0}",
            ticker,
            forecast.period_end,
            forecast.value
        );
        Ok(forecast)
    }

    /// Fetch, enrich and persist the dataset for `tickers`, one ticker at a time.
    pub async fn build_dataset(&self, tickers: &[String]) -> ValuationResult<EnrichmentReport> {
        let mut snapshots = Vec::with_capacity(tickers.len());
        let mut fetch_failures = Vec::new();

        for raw in tickers {
            let ticker = normalize_ticker(raw);
            match self.provider.fetch_fundamentals(&ticker).await {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => {
                    tracing::warn!("Error fetching data for {}: {}", ticker, e);
                    fetch_failures.push(SkippedTicker {
                        ticker,
                        reason: SkipReason::FetchFailed(e.to_string()),
                    });
                }
            }
        }

        let mut report = self.fair_value_engine.enrich(&snapshots)?;
        write_dataset(&self.config.dataset_path, &report.dataset)?;

        fetch_failures.append(&mut report.skipped);
        report.skipped = fetch_failures;

        tracing::info!(
            "Dataset built: {} rows, {} skipped, benchmark PE {:.2}",
            report.dataset.len(),
            report.skipped.len(),
            report.benchmark_pe
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use valuation_core::AnnualStatement;

    #[derive(Default)]
    struct StubProvider {
        snapshots: HashMap<String, FundamentalsSnapshot>,
        statements: HashMap<String, Vec<AnnualStatement>>,
    }

    impl StubProvider {
        fn with_snapshot(mut self, ticker: &str, pe: f64, price: f64, eps: f64) -> Self {
            let snapshot = FundamentalsSnapshot {
                trailing_pe: Some(pe),
                current_price: Some(price),
                trailing_eps: Some(eps),
                ..FundamentalsSnapshot::new(ticker)
            };
            self.snapshots.insert(ticker.to_string(), snapshot);
            self
        }

        fn with_revenue(mut self, ticker: &str, revenue: &[f64]) -> Self {
            let statements = revenue
                .iter()
                .enumerate()
                .map(|(i, &r)| AnnualStatement {
                    period_end: NaiveDate::from_ymd_opt(2019 + i as i32, 12, 31).unwrap(),
                    total_revenue: Some(r),
                    net_income: Some(r / 10.0),
                })
                .collect();
            self.statements.insert(ticker.to_string(), statements);
            self
        }
    }

    #[async_trait]
    impl MarketDataProvider for StubProvider {
        async fn fetch_fundamentals(&self, ticker: &str) -> ValuationResult<FundamentalsSnapshot> {
            self.snapshots
                .get(ticker)
                .cloned()
                .ok_or_else(|| ValuationError::NetworkFailure(format!("stub has no {}", ticker)))
        }

        async fn fetch_annual_statements(&self, ticker: &str) -> ValuationResult<Vec<AnnualStatement>> {
            Ok(self.statements.get(ticker).cloned().unwrap_or_default())
        }

        fn provider_name(&self) -> &'static str {
            "stub"
        }
    }

    /// Twelve peers split evenly above and below the mean PE of 20.
    fn peers() -> StubProvider {
        let mut stub = StubProvider::default();
        for i in 0..12 {
            let pe = if i % 2 == 0 { 12.0 + i as f64 * 0.1 } else { 28.0 - i as f64 * 0.1 };
            let eps = 2.0 + i as f64;
            stub = stub.with_snapshot(&format!("P{:02}", i), pe, pe * eps, eps);
        }
        stub
    }

    fn config_in(dir: &tempfile::TempDir) -> AppConfig {
        let mut config = AppConfig::default();
        config.dataset_path = dir.path().join("stocks_enhanced.csv");
        config.classifier.split_seed = Some(3);
        config.classifier.n_trees = 30;
        config
    }

    fn tickers(names: &[&str]) -> Vec<String> {
        names.iter().map(|t| t.to_string()).collect()
    }

    #[tokio::test]
    async fn test_show_fundamentals_sets_session() {
        let stub = peers().with_revenue("P01", &[100.0, 110.0]);
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = AnalysisOrchestrator::new(stub, config_in(&dir)).unwrap();
        let mut ctx = SessionContext::new();

        let report = orchestrator.show_fundamentals(&mut ctx, " p01 ").await.unwrap();
        assert_eq!(report.ticker(), "P01");
        assert_eq!(report.revenue_ttm, Some(110.0));
        assert_eq!(ctx.ticker(), Some("P01"));
        assert!(ctx.fundamentals().is_some());
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_session_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = AnalysisOrchestrator::new(peers(), config_in(&dir)).unwrap();
        let mut ctx = SessionContext::new();
        orchestrator.show_fundamentals(&mut ctx, "P02").await.unwrap();

        let err = orchestrator.show_fundamentals(&mut ctx, "NOPE").await.unwrap_err();
        assert_eq!(err.tag(), "NetworkFailure");
        assert_eq!(ctx.ticker(), Some("P02"));
    }

    #[tokio::test]
    async fn test_operations_need_an_active_ticker() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = AnalysisOrchestrator::new(peers(), config_in(&dir)).unwrap();
        let ctx = SessionContext::new();

        assert_eq!(
            orchestrator.run_classifier(&ctx).unwrap_err(),
            ValuationError::NoActiveTicker
        );
        assert_eq!(
            orchestrator.forecast_revenue(&ctx).await.unwrap_err(),
            ValuationError::NoActiveTicker
        );
    }

    #[tokio::test]
    async fn test_build_dataset_records_fetch_failures() {
        let mut stub = peers().with_snapshot("HALF", 15.0, 30.0, 2.0);
        stub.snapshots.get_mut("HALF").unwrap().trailing_eps = None;

        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let path = config.dataset_path.clone();
        let orchestrator = AnalysisOrchestrator::new(stub, config).unwrap();

        let report = orchestrator
            .build_dataset(&tickers(&["P00", "missing", "P01", "HALF", "P02"]))
            .await
            .unwrap();

        assert_eq!(report.dataset.tickers(), vec!["P00", "P01", "P02"]);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.skipped[0].ticker, "MISSING");
        assert!(matches!(report.skipped[0].reason, SkipReason::FetchFailed(_)));
        assert!(matches!(report.skipped[1].reason, SkipReason::MissingFields(_)));

        let persisted = read_dataset(&path).unwrap();
        assert_eq!(persisted, report.dataset);
    }

    #[tokio::test]
    async fn test_build_dataset_with_nothing_usable_is_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = AnalysisOrchestrator::new(peers(), config_in(&dir)).unwrap();
        let err = orchestrator.build_dataset(&tickers(&["X", "Y"])).await.unwrap_err();
        assert_eq!(err.tag(), "NoData");
    }

    #[tokio::test]
    async fn test_classifier_flow() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = AnalysisOrchestrator::new(peers(), config_in(&dir)).unwrap();
        let all: Vec<String> = (0..12).map(|i| format!("P{:02}", i)).collect();
        let report = orchestrator.build_dataset(&all).await.unwrap();
        assert_eq!(report.dataset.distinct_labels().len(), 2);

        let mut ctx = SessionContext::new();
        orchestrator.show_fundamentals(&mut ctx, "P03").await.unwrap();
        let outcome = orchestrator.run_classifier(&ctx).unwrap();

        assert_eq!(outcome.ticker, "P03");
        assert_eq!(outcome.test_size, 3);
        assert_eq!(outcome.train_size, 9);
        assert_eq!(outcome.test_predictions.len(), 3);
        assert!((0.0..=1.0).contains(&outcome.test_accuracy));
        assert!((0.0..=1.0).contains(&outcome.train_accuracy));
        assert_eq!(outcome.vote_shares.len(), 3);
    }

    #[tokio::test]
    async fn test_classifier_reports_missing_fundamental() {
        let mut stub = peers();
        stub.snapshots.get_mut("P04").unwrap().current_price = None;
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = AnalysisOrchestrator::new(stub, config_in(&dir)).unwrap();

        let mut ctx = SessionContext::new();
        orchestrator.show_fundamentals(&mut ctx, "P04").await.unwrap();
        match orchestrator.run_classifier(&ctx) {
            Err(ValuationError::InputMissing { ticker, field }) => {
                assert_eq!(ticker, "P04");
                assert_eq!(field.column_name(), "CurrentPrice");
            }
            other => panic!("expected InputMissing, got {:?}", other.map(|o| o.label)),
        }
    }

    #[tokio::test]
    async fn test_classifier_without_dataset_is_dataset_io() {
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = AnalysisOrchestrator::new(peers(), config_in(&dir)).unwrap();
        let mut ctx = SessionContext::new();
        orchestrator.show_fundamentals(&mut ctx, "P05").await.unwrap();
        assert_eq!(orchestrator.run_classifier(&ctx).unwrap_err().tag(), "DatasetIo");
    }

    #[tokio::test]
    async fn test_forecast_flow() {
        let stub = peers()
            .with_revenue("P06", &[100.0, 110.0, 121.0])
            .with_revenue("P07", &[95.0]);
        let dir = tempfile::tempdir().unwrap();
        let orchestrator = AnalysisOrchestrator::new(stub, config_in(&dir)).unwrap();
        let mut ctx = SessionContext::new();

        orchestrator.show_fundamentals(&mut ctx, "P06").await.unwrap();
        let forecast = orchestrator.forecast_revenue(&ctx).await.unwrap();
        assert!(forecast.value > 120.0 && forecast.value < 145.0);

        orchestrator.show_fundamentals(&mut ctx, "P07").await.unwrap();
        assert_eq!(
            orchestrator.forecast_revenue(&ctx).await.unwrap_err().tag(),
            "InsufficientHistory"
        );

        orchestrator.show_fundamentals(&mut ctx, "P08").await.unwrap();
        assert_eq!(orchestrator.forecast_revenue(&ctx).await.unwrap_err().tag(), "NoData");
    }
}
