use serde::Serialize;
use std::fmt;
use valuation_core::{AnnualStatement, FundamentalsSnapshot};

/// One cell of the fundamentals view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(f64),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Number(n) => write!(f, "{}", n),
        }
    }
}

/// Snapshot plus the ratios derived from it and the latest annual statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundamentalsReport {
    pub snapshot: FundamentalsSnapshot,
    pub price_to_book: Option<f64>,
    pub daily_change_pct: Option<f64>,
    pub dividend_yield_pct: Option<f64>,
    pub revenue_ttm: Option<f64>,
    pub net_income: Option<f64>,
    pub revenue_growth_pct: Option<f64>,
    pub return_on_equity_pct: Option<f64>,
}

fn as_percent(fraction: Option<f64>) -> Option<f64> {
    fraction.filter(|v| *v != 0.0).map(|v| v * 100.0)
}

impl FundamentalsReport {
    pub fn new(snapshot: FundamentalsSnapshot, statements: &[AnnualStatement]) -> Self {
        let price_to_book = match (snapshot.current_price, snapshot.book_value) {
            (Some(price), Some(book)) if price != 0.0 && book != 0.0 => Some(price / book),
            _ => None,
        };
        let latest = statements.iter().max_by_key(|s| s.period_end);

        Self {
            price_to_book,
            // a flat day is a real reading, so zero is kept here
            daily_change_pct: snapshot.daily_change_percent.map(|v| v * 100.0),
            dividend_yield_pct: as_percent(snapshot.dividend_yield),
            revenue_ttm: latest.and_then(|s| s.total_revenue),
            net_income: latest.and_then(|s| s.net_income),
            revenue_growth_pct: as_percent(snapshot.revenue_growth),
            return_on_equity_pct: as_percent(snapshot.return_on_equity),
            snapshot,
        }
    }

    pub fn ticker(&self) -> &str {
        &self.snapshot.ticker
    }

    /// Labelled values in display order.
    pub fn display_rows(&self) -> Vec<(&'static str, Option<FieldValue>)> {
        let s = &self.snapshot;
        let text = |v: &Option<String>| v.clone().map(FieldValue::Text);
        let num = |v: Option<f64>| v.map(FieldValue::Number);

        vec![
            ("Company Name", text(&s.long_name)),
            ("Industry", text(&s.industry)),
            ("Market Cap", num(s.market_cap)),
            ("Current Price", num(s.current_price)),
            ("Daily Change %", num(self.daily_change_pct)),
            ("EPS", num(s.trailing_eps)),
            ("P/E Ratio", num(s.trailing_pe)),
            ("P/B Ratio", num(self.price_to_book)),
            ("Dividend Yield %", num(self.dividend_yield_pct)),
            ("Revenue (TTM)", num(self.revenue_ttm)),
            ("Net Income", num(self.net_income)),
            ("Debt-to-Equity", num(s.debt_to_equity)),
            ("Revenue Growth %", num(self.revenue_growth_pct)),
            ("Return on Equity %", num(self.return_on_equity_pct)),
        ]
    }
}
