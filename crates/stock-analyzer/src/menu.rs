use analysis_orchestrator::{AnalysisOrchestrator, SessionContext};
use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use valuation_core::MarketDataProvider;

use crate::display;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Fundamentals,
    Classify,
    Forecast,
    Exit,
}

impl MenuChoice {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(MenuChoice::Fundamentals),
            "2" => Some(MenuChoice::Classify),
            "3" => Some(MenuChoice::Forecast),
            "4" => Some(MenuChoice::Exit),
            _ => None,
        }
    }
}

async fn prompt(lines: &mut Lines<BufReader<Stdin>>, message: &str) -> Result<Option<String>> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(message.as_bytes()).await?;
    stdout.flush().await?;
    Ok(lines.next_line().await?)
}

/// Four-option loop over a single session. Ends on "4" or end of input.
pub async fn run<P: MarketDataProvider>(orchestrator: &AnalysisOrchestrator<P>) -> Result<()> {
    let mut ctx = SessionContext::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        println!("\n=== Stock Analysis Menu ===");
        println!("1. Show Stock Fundamentals");
        println!("2. Run Classifier");
        println!("3. Forecast Revenue");
        println!("4. Exit");

        let Some(input) = prompt(&mut lines, "Enter choice (1-4): ").await? else {
            break;
        };

        match MenuChoice::parse(&input) {
            Some(MenuChoice::Fundamentals) => {
                let Some(ticker) = prompt(&mut lines, "\nEnter stock ticker symbol: ").await? else {
                    break;
                };
                match orchestrator.show_fundamentals(&mut ctx, &ticker).await {
                    Ok(report) => display::print_report(&report),
                    Err(e) => display::print_failure(&e),
                }
            }
            Some(MenuChoice::Classify) => match orchestrator.run_classifier(&ctx) {
                Ok(outcome) => display::print_outcome(&outcome),
                Err(e) => display::print_failure(&e),
            },
            Some(MenuChoice::Forecast) => match orchestrator.forecast_revenue(&ctx).await {
                Ok(forecast) => display::print_forecast(&forecast),
                Err(e) => display::print_failure(&e),
            },
            Some(MenuChoice::Exit) => break,
            None => println!("Invalid choice. Try again."),
        }
    }

    println!("Exiting program...");
    Ok(())
}
