//! quoteSummary payload parsing.
//!
//! Numeric fields come either bare or wrapped as `{"raw": .., "fmt": ..}`;
//! an empty object means the field is not reported.

use chrono::{DateTime, NaiveDate};
use serde_json::Value;
use valuation_core::{AnnualStatement, FundamentalsSnapshot, ValuationError, ValuationResult};

fn number(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.get("raw").and_then(|raw| raw.as_f64()))
        .filter(|v| v.is_finite())
}

fn module_number(result: &Value, module: &str, field: &str) -> Option<f64> {
    result.get(module).and_then(|m| m.get(field)).and_then(number)
}

fn module_string(result: &Value, module: &str, field: &str) -> Option<String> {
    result
        .get(module)
        .and_then(|m| m.get(field))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .filter(|s| !s.is_empty())
}

fn date(value: &Value) -> Option<NaiveDate> {
    if let Some(fmt) = value.get("fmt").and_then(|f| f.as_str()) {
        if let Ok(d) = NaiveDate::parse_from_str(fmt, "%Y-%m-%d") {
            return Some(d);
        }
    }
    let ts = value
        .as_i64()
        .or_else(|| value.get("raw").and_then(|raw| raw.as_i64()))?;
    DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive())
}

/// First entry of `quoteSummary.result`, or `NoData` when the lookup missed.
pub fn summary_result<'a>(ticker: &str, json: &'a Value) -> ValuationResult<&'a Value> {
    let summary = json
        .get("quoteSummary")
        .ok_or_else(|| ValuationError::NoData(format!("no quote summary for {}", ticker)))?;

    if let Some(description) = summary
        .get("error")
        .and_then(|e| e.get("description"))
        .and_then(|d| d.as_str())
    {
        return Err(ValuationError::NoData(format!("{}: {}", ticker, description)));
    }

    summary
        .get("result")
        .and_then(|r| r.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| ValuationError::NoData(format!("no fundamentals found for {}", ticker)))
}

pub fn parse_fundamentals(ticker: &str, json: &Value) -> ValuationResult<FundamentalsSnapshot> {
    let data = summary_result(ticker, json)?;

    let current_price = module_number(data, "financialData", "currentPrice")
        .or_else(|| module_number(data, "price", "regularMarketPrice"));
    let market_cap = module_number(data, "price", "marketCap")
        .or_else(|| module_number(data, "summaryDetail", "marketCap"));
    let long_name = module_string(data, "price", "longName")
        .or_else(|| module_string(data, "price", "shortName"));

    Ok(FundamentalsSnapshot {
        ticker: ticker.to_string(),
        long_name,
        industry: module_string(data, "assetProfile", "industry"),
        market_cap,
        current_price,
        daily_change_percent: module_number(data, "price", "regularMarketChangePercent"),
        trailing_pe: module_number(data, "summaryDetail", "trailingPE"),
        trailing_eps: module_number(data, "defaultKeyStatistics", "trailingEps"),
        book_value: module_number(data, "defaultKeyStatistics", "bookValue"),
        dividend_yield: module_number(data, "summaryDetail", "dividendYield"),
        debt_to_equity: module_number(data, "financialData", "debtToEquity"),
        revenue_growth: module_number(data, "financialData", "revenueGrowth"),
        return_on_equity: module_number(data, "financialData", "returnOnEquity"),
    })
}

/// Annual income statements, newest first as Yahoo reports them. Entries
/// without a parseable end date are dropped.
pub fn parse_income_statements(ticker: &str, json: &Value) -> ValuationResult<Vec<AnnualStatement>> {
    let data = summary_result(ticker, json)?;
    let entries = data
        .get("incomeStatementHistory")
        .and_then(|h| h.get("incomeStatementHistory"))
        .and_then(|arr| arr.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default();

    let statements = entries
        .iter()
        .filter_map(|entry| {
            let period_end = entry.get("endDate").and_then(date)?;
            Some(AnnualStatement {
                period_end,
                total_revenue: entry.get("totalRevenue").and_then(number),
                net_income: entry.get("netIncome").and_then(number),
            })
        })
        .collect();
    Ok(statements)
}
