use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Peer-relative stock valuation, classification and revenue forecasting.
#[derive(Debug, Parser)]
#[command(name = "stock-analyzer", author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show fundamentals and derived ratios for a ticker
    Fundamentals { ticker: String },

    /// Train on the peer dataset and classify a ticker
    Classify {
        ticker: String,
        /// Seed for the train/test split (random when omitted)
        #[arg(long)]
        seed: Option<u64>,
        /// Labeled dataset to train on (overrides DATASET_PATH)
        #[arg(long)]
        dataset: Option<PathBuf>,
    },

    /// Forecast next-year revenue for a ticker
    Forecast { ticker: String },

    /// Fetch the ticker basket and write the labeled dataset
    BuildDataset {
        /// Comma separated tickers (overrides DATASET_TICKERS)
        #[arg(long, value_delimiter = ',')]
        tickers: Option<Vec<String>>,
        /// Output file (overrides DATASET_PATH)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Interactive menu (default)
    Menu,
}
