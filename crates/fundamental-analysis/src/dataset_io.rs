//! Persisted dataset format.
//!
//! The file is a CSV keyed by ticker whose column order is an external
//! contract. Reading goes through the header names, never column positions.

use std::io;
use std::path::Path;
use valuation_core::{EnrichedRow, TrainingDataset, ValuationError, ValuationResult};

pub const DATASET_COLUMNS: [&str; 8] = [
    "Ticker",
    "TrailingPE",
    "CurrentPrice",
    "TrailingEPS",
    "FairMarketValue",
    "OverUnderRatio",
    "Valuation",
    "ValuePercentage",
];

fn io_error(context: &str, err: impl std::fmt::Display) -> ValuationError {
    ValuationError::DatasetIo(format!("{}: {}", context, err))
}

pub fn write_dataset(path: &Path, dataset: &TrainingDataset) -> ValuationResult<()> {
    let file = std::fs::File::create(path)
        .map_err(|e| io_error(&format!("Failed to create {}", path.display()), e))?;
    write_dataset_to(file, dataset)?;
    tracing::info!("Wrote {} rows to {}", dataset.len(), path.display());
    Ok(())
}

pub fn write_dataset_to<W: io::Write>(writer: W, dataset: &TrainingDataset) -> ValuationResult<()> {
    let mut writer = csv::Writer::from_writer(writer);
    if dataset.is_empty() {
        // serde only emits the header alongside the first record
        writer
            .write_record(DATASET_COLUMNS)
            .map_err(|e| io_error("Failed to write header", e))?;
    }
    for row in dataset.rows() {
        writer
            .serialize(row)
            .map_err(|e| io_error(&format!("Failed to write row {}", row.ticker), e))?;
    }
    writer.flush().map_err(|e| io_error("Failed to flush dataset", e))?;
    Ok(())
}

pub fn read_dataset(path: &Path) -> ValuationResult<TrainingDataset> {
    let file = std::fs::File::open(path)
        .map_err(|e| io_error(&format!("Failed to open {}", path.display()), e))?;
    let dataset = read_dataset_from(file)?;
    tracing::debug!("Loaded {} rows from {}", dataset.len(), path.display());
    Ok(dataset)
}

pub fn read_dataset_from<R: io::Read>(reader: R) -> ValuationResult<TrainingDataset> {
    let mut reader = csv::Reader::from_reader(reader);
    let headers = reader
        .headers()
        .map_err(|e| io_error("Failed to read header", e))?
        .clone();

    let missing: Vec<&str> = DATASET_COLUMNS
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h.trim() == *col))
        .collect();
    if !missing.is_empty() {
        return Err(ValuationError::DatasetIo(format!(
            "dataset is missing column(s): {}",
            missing.join(", ")
        )));
    }

    let mut rows = Vec::new();
    for (line, record) in reader.deserialize::<EnrichedRow>().enumerate() {
        let row = record.map_err(|e| io_error(&format!("Bad record {}", line + 1), e))?;
        rows.push(row);
    }
    Ok(TrainingDataset::new(rows))
}
