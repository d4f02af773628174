use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ValuationError, ValuationResult};

/// Raw per-ticker fundamentals as returned by a market-data provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundamentalsSnapshot {
    pub ticker: String,
    pub long_name: Option<String>,
    pub industry: Option<String>,
    pub market_cap: Option<f64>,
    pub current_price: Option<f64>,
    /// Fraction of the previous close, e.g. -0.0123 for -1.23%
    pub daily_change_percent: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub trailing_eps: Option<f64>,
    pub book_value: Option<f64>,
    /// Fraction, e.g. 0.005 for 0.5%
    pub dividend_yield: Option<f64>,
    pub debt_to_equity: Option<f64>,
    /// Fraction
    pub revenue_growth: Option<f64>,
    /// Fraction
    pub return_on_equity: Option<f64>,
}

impl FundamentalsSnapshot {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            ..Default::default()
        }
    }

    /// Essential fields absent from this snapshot, in column order.
    pub fn missing_essentials(&self) -> Vec<EssentialField> {
        let mut missing = Vec::new();
        if self.trailing_pe.is_none() {
            missing.push(EssentialField::TrailingPe);
        }
        if self.current_price.is_none() {
            missing.push(EssentialField::CurrentPrice);
        }
        if self.trailing_eps.is_none() {
            missing.push(EssentialField::TrailingEps);
        }
        missing
    }
}

/// The three fundamentals every enrichment row and classifier query needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EssentialField {
    TrailingPe,
    CurrentPrice,
    TrailingEps,
}

impl EssentialField {
    pub fn column_name(&self) -> &'static str {
        match self {
            EssentialField::TrailingPe => "TrailingPE",
            EssentialField::CurrentPrice => "CurrentPrice",
            EssentialField::TrailingEps => "TrailingEPS",
        }
    }
}

impl fmt::Display for EssentialField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.column_name())
    }
}

/// Classifier input, always ordered [TrailingPE, CurrentPrice, TrailingEPS].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub trailing_pe: f64,
    pub current_price: f64,
    pub trailing_eps: f64,
}

impl FeatureVector {
    pub const LEN: usize = 3;
    pub const NAMES: [&'static str; 3] = ["TrailingPE", "CurrentPrice", "TrailingEPS"];

    pub fn new(trailing_pe: f64, current_price: f64, trailing_eps: f64) -> Self {
        Self {
            trailing_pe,
            current_price,
            trailing_eps,
        }
    }

    /// Build the query vector for a ticker, failing on the first absent field.
    pub fn from_snapshot(snapshot: &FundamentalsSnapshot) -> ValuationResult<Self> {
        if let Some(field) = snapshot.missing_essentials().into_iter().next() {
            return Err(ValuationError::InputMissing {
                ticker: snapshot.ticker.clone(),
                field,
            });
        }
        Ok(Self::new(
            snapshot.trailing_pe.unwrap_or_default(),
            snapshot.current_price.unwrap_or_default(),
            snapshot.trailing_eps.unwrap_or_default(),
        ))
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.trailing_pe, self.current_price, self.trailing_eps]
    }
}

/// Valuation category relative to the peer benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValuationLabel {
    #[serde(rename = "Over Valued")]
    OverValued,
    #[serde(rename = "Fair Valued")]
    FairValued,
    #[serde(rename = "Under Valued")]
    UnderValued,
}

impl ValuationLabel {
    pub const ALL: [ValuationLabel; 3] = [
        ValuationLabel::OverValued,
        ValuationLabel::FairValued,
        ValuationLabel::UnderValued,
    ];

    /// Label an over/under ratio. Fair iff |ratio - 1| <= tolerance; a NaN
    /// ratio falls through to UnderValued.
    pub fn from_ratio(ratio: f64, tolerance: f64) -> Self {
        let deviation = ratio - 1.0;
        if deviation > tolerance {
            ValuationLabel::OverValued
        } else if deviation.abs() <= tolerance {
            ValuationLabel::FairValued
        } else {
            ValuationLabel::UnderValued
        }
    }

    pub fn index(&self) -> usize {
        match self {
            ValuationLabel::OverValued => 0,
            ValuationLabel::FairValued => 1,
            ValuationLabel::UnderValued => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValuationLabel::OverValued => "Over Valued",
            ValuationLabel::FairValued => "Fair Valued",
            ValuationLabel::UnderValued => "Under Valued",
        }
    }
}

impl fmt::Display for ValuationLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ValuationLabel {
    type Err = ValuationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Over Valued" => Ok(ValuationLabel::OverValued),
            "Fair Valued" => Ok(ValuationLabel::FairValued),
            "Under Valued" => Ok(ValuationLabel::UnderValued),
            other => Err(ValuationError::DatasetIo(format!(
                "unknown valuation label '{}'",
                other
            ))),
        }
    }
}

/// One labeled row of the training dataset.
///
/// Field order is the persisted column order and must not change:
/// Ticker, TrailingPE, CurrentPrice, TrailingEPS, FairMarketValue,
/// OverUnderRatio, Valuation, ValuePercentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRow {
    #[serde(rename = "Ticker")]
    pub ticker: String,
    #[serde(rename = "TrailingPE")]
    pub trailing_pe: f64,
    #[serde(rename = "CurrentPrice")]
    pub current_price: f64,
    #[serde(rename = "TrailingEPS")]
    pub trailing_eps: f64,
    #[serde(rename = "FairMarketValue")]
    pub fair_market_value: f64,
    #[serde(rename = "OverUnderRatio")]
    pub over_under_ratio: f64,
    #[serde(rename = "Valuation")]
    pub valuation: ValuationLabel,
    #[serde(rename = "ValuePercentage")]
    pub value_percentage: f64,
}

impl EnrichedRow {
    pub fn features(&self) -> FeatureVector {
        FeatureVector::new(self.trailing_pe, self.current_price, self.trailing_eps)
    }
}

/// Labeled rows in retention order. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingDataset {
    rows: Vec<EnrichedRow>,
}

impl TrainingDataset {
    pub fn new(rows: Vec<EnrichedRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[EnrichedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn tickers(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.ticker.as_str()).collect()
    }

    /// Labels present in the dataset, in canonical label order.
    pub fn distinct_labels(&self) -> Vec<ValuationLabel> {
        ValuationLabel::ALL
            .into_iter()
            .filter(|label| self.rows.iter().any(|r| r.valuation == *label))
            .collect()
    }
}

/// One annual financial statement as reported by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualStatement {
    pub period_end: NaiveDate,
    pub total_revenue: Option<f64>,
    pub net_income: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RevenuePoint {
    pub period_end: NaiveDate,
    pub revenue: f64,
}

/// Annual revenue history, ascending by period end, missing values dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueSeries {
    ticker: String,
    points: Vec<RevenuePoint>,
}

impl RevenueSeries {
    pub fn new(ticker: impl Into<String>, mut points: Vec<RevenuePoint>) -> Self {
        points.retain(|p| !p.revenue.is_nan());
        points.sort_by_key(|p| p.period_end);
        Self {
            ticker: ticker.into(),
            points,
        }
    }

    /// Build from a statement history. An empty statement set is `NoData`;
    /// statements without a revenue figure are dropped.
    pub fn from_statements(ticker: &str, statements: &[AnnualStatement]) -> ValuationResult<Self> {
        if statements.is_empty() {
            return Err(ValuationError::NoData(format!(
                "no financial statements available for {}",
                ticker
            )));
        }
        let points = statements
            .iter()
            .filter_map(|s| {
                s.total_revenue.map(|revenue| RevenuePoint {
                    period_end: s.period_end,
                    revenue,
                })
            })
            .collect();
        Ok(Self::new(ticker, points))
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn points(&self) -> &[RevenuePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&RevenuePoint> {
        self.points.last()
    }
}

/// Next-period revenue point forecast with its uncertainty interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueForecast {
    pub ticker: String,
    pub period_end: NaiveDate,
    pub value: f64,
    pub lower: f64,
    pub upper: f64,
}
