use async_trait::async_trait;

use crate::{AnnualStatement, FundamentalsSnapshot, ValuationResult};

/// Source of per-ticker fundamentals and annual statements.
///
/// Implementations convert every transport or lookup fault into a tagged
/// `ValuationError` (`NetworkFailure` or `NoData`); nothing raw crosses this
/// boundary.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn fetch_fundamentals(&self, ticker: &str) -> ValuationResult<FundamentalsSnapshot>;

    /// Annual statements, in whatever order the provider returns them.
    async fn fetch_annual_statements(&self, ticker: &str) -> ValuationResult<Vec<AnnualStatement>>;

    fn provider_name(&self) -> &'static str;
}
