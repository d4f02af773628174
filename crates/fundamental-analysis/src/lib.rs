//! Peer-relative fair value benchmarking.
//!
//! Turns a batch of raw fundamentals into a labeled training dataset: every
//! retained ticker is priced at `EPS x mean(PE)` across the batch and labeled
//! by how far its market price sits from that fair value.

pub mod dataset_io;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use valuation_core::stats::mean;
use valuation_core::{
    EnrichedRow, EssentialField, FundamentalsSnapshot, TrainingDataset, ValuationError,
    ValuationLabel, ValuationResult,
};

pub use dataset_io::{read_dataset, write_dataset, DATASET_COLUMNS};

/// Why a ticker did not make it into the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SkipReason {
    MissingFields(Vec<EssentialField>),
    FetchFailed(String),
    DuplicateTicker,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingFields(fields) => {
                let names: Vec<&str> = fields.iter().map(|f| f.column_name()).collect();
                write!(f, "missing values: {}", names.join(", "))
            }
            SkipReason::FetchFailed(msg) => write!(f, "fetch failed: {}", msg),
            SkipReason::DuplicateTicker => f.write_str("duplicate ticker"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedTicker {
    pub ticker: String,
    pub reason: SkipReason,
}

/// Output of one enrichment pass.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentReport {
    pub dataset: TrainingDataset,
    pub benchmark_pe: f64,
    pub skipped: Vec<SkippedTicker>,
}

/// Fair market value implied by the peer multiple.
pub fn fair_market_value(trailing_eps: f64, benchmark_pe: f64) -> f64 {
    trailing_eps * benchmark_pe
}

/// Price relative to fair value; > 1 means priced above peers.
pub fn over_under_ratio(current_price: f64, fair_market_value: f64) -> f64 {
    current_price / fair_market_value
}

pub fn value_percentage(over_under_ratio: f64) -> f64 {
    ((over_under_ratio - 1.0) * 100.0).abs()
}

pub struct FairValueEngine {
    fair_value_tolerance: f64,
}

impl FairValueEngine {
    /// Engine with exact-equality "Fair Valued" semantics.
    pub fn new() -> Self {
        Self {
            fair_value_tolerance: 0.0,
        }
    }

    /// Engine that labels a row Fair Valued when `|ratio - 1| <= tolerance`.
    pub fn with_tolerance(tolerance: f64) -> ValuationResult<Self> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ValuationError::InvalidConfig(format!(
                "fair value tolerance must be a finite value >= 0, got {}",
                tolerance
            )));
        }
        Ok(Self {
            fair_value_tolerance: tolerance,
        })
    }

    pub fn fair_value_tolerance(&self) -> f64 {
        self.fair_value_tolerance
    }

    /// Filter, benchmark and label a batch of snapshots.
    ///
    /// Rows keep the caller's order. A snapshot missing any essential field
    /// is skipped with a diagnostic; a batch with nothing left is `NoData`.
    pub fn enrich<'a, I>(&self, snapshots: I) -> ValuationResult<EnrichmentReport>
    where
        I: IntoIterator<Item = &'a FundamentalsSnapshot>,
    {
        let mut retained: Vec<(&str, f64, f64, f64)> = Vec::new();
        let mut skipped = Vec::new();
        let mut seen = HashSet::new();

        for snapshot in snapshots {
            if !seen.insert(snapshot.ticker.as_str()) {
                tracing::warn!("Skipping {}: duplicate ticker in batch", snapshot.ticker);
                skipped.push(SkippedTicker {
                    ticker: snapshot.ticker.clone(),
                    reason: SkipReason::DuplicateTicker,
                });
                continue;
            }

            match (snapshot.trailing_pe, snapshot.current_price, snapshot.trailing_eps) {
                (Some(pe), Some(price), Some(eps)) => {
                    retained.push((snapshot.ticker.as_str(), pe, price, eps));
                }
                _ => {
                    let reason = SkipReason::MissingFields(snapshot.missing_essentials());
                    tracing::warn!("Skipping {} due to {}", snapshot.ticker, reason);
                    skipped.push(SkippedTicker {
                        ticker: snapshot.ticker.clone(),
                        reason,
                    });
                }
            }
        }

        if retained.is_empty() {
            return Err(ValuationError::NoData(
                "no ticker has TrailingPE, CurrentPrice and TrailingEPS".to_string(),
            ));
        }

        let pes: Vec<f64> = retained.iter().map(|(_, pe, _, _)| *pe).collect();
        let benchmark_pe = mean(&pes);
        tracing::info!(
            "Mean PE across {} retained tickers: {:.2}",
            retained.len(),
            benchmark_pe
        );

        let rows = retained
            .into_iter()
            .map(|(ticker, pe, price, eps)| {
                let fmv = fair_market_value(eps, benchmark_pe);
                let ratio = over_under_ratio(price, fmv);
                EnrichedRow {
                    ticker: ticker.to_string(),
                    trailing_pe: pe,
                    current_price: price,
                    trailing_eps: eps,
                    fair_market_value: fmv,
                    over_under_ratio: ratio,
                    valuation: ValuationLabel::from_ratio(ratio, self.fair_value_tolerance),
                    value_percentage: value_percentage(ratio),
                }
            })
            .collect();

        Ok(EnrichmentReport {
            dataset: TrainingDataset::new(rows),
            benchmark_pe,
            skipped,
        })
    }
}

impl Default for FairValueEngine {
    fn default() -> Self {
        Self::new()
    }
}
