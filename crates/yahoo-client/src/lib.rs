pub mod parse;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use valuation_core::{
    AnnualStatement, FundamentalsSnapshot, MarketDataProvider, ValuationError, ValuationResult,
};

pub use parse::{parse_fundamentals, parse_income_statements};

const BASE_URL: &str = "https://query2.finance.yahoo.com/v10/finance";

const FUNDAMENTAL_MODULES: [&str; 5] = [
    "price",
    "summaryDetail",
    "defaultKeyStatistics",
    "financialData",
    "assetProfile",
];
const STATEMENT_MODULES: [&str; 1] = ["incomeStatementHistory"];

#[derive(Clone)]
pub struct YahooFinanceClient {
    client: Client,
    base_url: String,
}

impl YahooFinanceClient {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetch the requested quoteSummary modules for one ticker.
    async fn quote_summary(&self, ticker: &str, modules: &[&str]) -> ValuationResult<serde_json::Value> {
        let ticker = ticker.trim();
        if ticker.is_empty() {
            return Err(ValuationError::NoData("empty ticker symbol".to_string()));
        }

        let url = format!(
            "{}/quoteSummary/{}?modules={}",
            self.base_url,
            ticker,
            modules.join(",")
        );

        let response = self.client.get(&url).send().await.map_err(|e| {
            tracing::warn!("Yahoo request for {} failed: {}", ticker, e);
            ValuationError::NetworkFailure(e.to_string())
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ValuationError::NoData(format!("Yahoo has no data for {}", ticker)));
        }
        if !status.is_success() {
            tracing::warn!("Yahoo returned {} for {}", status, ticker);
            return Err(ValuationError::NetworkFailure(format!(
                "Yahoo returned {} for {}",
                status, ticker
            )));
        }

        response.json().await.map_err(|e| {
            tracing::warn!("Yahoo response for {} was not valid JSON: {}", ticker, e);
            ValuationError::NetworkFailure(e.to_string())
        })
    }
}

impl Default for YahooFinanceClient {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl MarketDataProvider for YahooFinanceClient {
    async fn fetch_fundamentals(&self, ticker: &str) -> ValuationResult<FundamentalsSnapshot> {
        let json = self.quote_summary(ticker, &FUNDAMENTAL_MODULES).await?;
        parse_fundamentals(ticker.trim(), &json)
    }

    async fn fetch_annual_statements(&self, ticker: &str) -> ValuationResult<Vec<AnnualStatement>> {
        let json = self.quote_summary(ticker, &STATEMENT_MODULES).await?;
        parse_income_statements(ticker.trim(), &json)
    }

    fn provider_name(&self) -> &'static str {
        "yahoo"
    }
}
