//! stock-analyzer: peer-relative valuation from the command line.
//!
//! Usage:
//!   stock-analyzer                       # interactive menu
//!   stock-analyzer fundamentals AAPL
//!   stock-analyzer classify AAPL --seed 42
//!   stock-analyzer forecast AAPL
//!   stock-analyzer build-dataset --tickers AAPL,MSFT,NVDA

mod cli;
mod display;
mod menu;

use analysis_orchestrator::{normalize_ticker, AnalysisOrchestrator, AppConfig, SessionContext};
use anyhow::Context;
use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use valuation_core::ValuationResult;
use yahoo_client::YahooFinanceClient;

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "stock_analyzer=info,analysis_orchestrator=info,yahoo_client=warn".into()
            }),
        )
        .init();

    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Menu);

    let mut config = AppConfig::from_env().context("Failed to load configuration")?;
    match &command {
        Command::Classify { seed, dataset, .. } => {
            if seed.is_some() {
                config.classifier.split_seed = *seed;
            }
            if let Some(path) = dataset {
                config.dataset_path = path.clone();
            }
        }
        Command::BuildDataset { tickers, output } => {
            if let Some(tickers) = tickers {
                config.tickers = tickers
                    .iter()
                    .map(|t| normalize_ticker(t))
                    .filter(|t| !t.is_empty())
                    .collect();
            }
            if let Some(path) = output {
                config.dataset_path = path.clone();
            }
        }
        _ => {}
    }
    config.validate()?;
    tracing::info!(
        "Starting {:?} with dataset {}",
        command,
        config.dataset_path.display()
    );

    let provider = YahooFinanceClient::new(Duration::from_secs(config.yahoo_timeout_secs));
    let orchestrator = AnalysisOrchestrator::new(provider, config)?;

    if let Command::Menu = command {
        menu::run(&orchestrator).await?;
        return Ok(ExitCode::SUCCESS);
    }

    match run_command(&orchestrator, command).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            tracing::debug!("Command failed with {}", e.tag());
            display::print_failure(&e);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run_command(
    orchestrator: &AnalysisOrchestrator<YahooFinanceClient>,
    command: Command,
) -> ValuationResult<()> {
    let mut ctx = SessionContext::new();

    match command {
        Command::Fundamentals { ticker } => {
            let report = orchestrator.show_fundamentals(&mut ctx, &ticker).await?;
            display::print_report(&report);
        }
        Command::Classify { ticker, .. } => {
            orchestrator.show_fundamentals(&mut ctx, &ticker).await?;
            let outcome = orchestrator.run_classifier(&ctx)?;
            display::print_outcome(&outcome);
        }
        Command::Forecast { ticker } => {
            orchestrator.show_fundamentals(&mut ctx, &ticker).await?;
            let forecast = orchestrator.forecast_revenue(&ctx).await?;
            display::print_forecast(&forecast);
        }
        Command::BuildDataset { .. } => {
            let tickers = orchestrator.config().tickers.clone();
            let report = orchestrator.build_dataset(&tickers).await?;
            display::print_enrichment(&report);
            println!(
                "\nWrote {} rows to {}",
                report.dataset.len(),
                orchestrator.config().dataset_path.display()
            );
        }
        Command::Menu => {}
    }
    Ok(())
}
