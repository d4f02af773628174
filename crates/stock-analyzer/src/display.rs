use analysis_orchestrator::{ClassificationOutcome, FieldValue, FundamentalsReport};
use fundamental_analysis::EnrichmentReport;
use valuation_core::{RevenueForecast, ValuationError};

/// Whole-dollar amount with thousands separators, e.g. `$383,285,000,000`.
pub fn format_currency(value: f64) -> String {
    if !value.is_finite() {
        return format!("${}", value);
    }
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}

fn format_field(label: &str, value: Option<&FieldValue>) -> String {
    match value {
        None => "N/A".to_string(),
        Some(FieldValue::Text(text)) => text.clone(),
        Some(FieldValue::Number(n)) => match label {
            "Market Cap" | "Revenue (TTM)" | "Net Income" => format_currency(*n),
            _ => format!("{:.2}", n),
        },
    }
}

pub fn print_report(report: &FundamentalsReport) {
    println!("\n=== {} Fundamentals ===", report.ticker());
    for (label, value) in report.display_rows() {
        println!("{}: {}", label, format_field(label, value.as_ref()));
    }
}

pub fn print_outcome(outcome: &ClassificationOutcome) {
    println!("Accuracy on training data: {:.3} ({} rows)", outcome.train_accuracy, outcome.train_size);
    println!("Accuracy on test data: {:.3} ({} rows)", outcome.test_accuracy, outcome.test_size);

    if !outcome.test_predictions.is_empty() {
        println!("\nTest predictions:");
        for row in &outcome.test_predictions {
            let mark = if row.actual == row.predicted { " " } else { "x" };
            println!("  {} {:<6} actual {:<12} predicted {}", mark, row.ticker, row.actual, row.predicted);
        }
    }

    let importances: Vec<String> = outcome
        .feature_importances
        .iter()
        .map(|(name, v)| format!("{} {:.2}", name, v))
        .collect();
    println!("Feature importance: {}", importances.join(", "));

    let shares: Vec<String> = outcome
        .vote_shares
        .iter()
        .map(|(label, share)| format!("{} {:.0}%", label, share * 100.0))
        .collect();
    println!("\nPrediction for {}: {} ({})", outcome.ticker, outcome.label, shares.join(", "));
}

pub fn print_forecast(forecast: &RevenueForecast) {
    println!(
        "\nForecasted next period revenue for {}: {}",
        forecast.ticker,
        format_currency(forecast.value)
    );
    println!(
        "Period ending {}, range {} to {}",
        forecast.period_end,
        format_currency(forecast.lower),
        format_currency(forecast.upper)
    );
}

pub fn print_enrichment(report: &EnrichmentReport) {
    for skipped in &report.skipped {
        println!("Skipping {}: {}", skipped.ticker, skipped.reason);
    }
    println!("Mean PE across dataset: {:.2}", report.benchmark_pe);
    println!(
        "{:<6} {:>9} {:>10} {:>8} {:>10} {:>7}  {:<12} {:>8}",
        "Ticker", "PE", "Price", "EPS", "FairValue", "Ratio", "Valuation", "Pct"
    );
    for row in report.dataset.rows() {
        println!(
            "{:<6} {:>9.2} {:>10.2} {:>8.2} {:>10.2} {:>7.3}  {:<12} {:>8.2}",
            row.ticker,
            row.trailing_pe,
            row.current_price,
            row.trailing_eps,
            row.fair_market_value,
            row.over_under_ratio,
            row.valuation.as_str(),
            row.value_percentage
        );
    }
}

pub fn print_failure(err: &ValuationError) {
    match err {
        ValuationError::NoActiveTicker => {
            println!("\nPlease view fundamentals first (option 1).");
        }
        ValuationError::InputMissing { .. } => println!("\n{}", err),
        _ => println!("\n[{}] {}", err.tag(), err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(383_285_000_000.0), "$383,285,000,000");
        assert_eq!(format_currency(999.4), "$999");
        assert_eq!(format_currency(1_000.0), "$1,000");
        assert_eq!(format_currency(0.0), "$0");
        assert_eq!(format_currency(-12_345.6), "-$12,346");
    }

    #[test]
    fn test_format_field() {
        assert_eq!(format_field("Net Income", Some(&FieldValue::Number(96_995_000_000.0))), "$96,995,000,000");
        assert_eq!(format_field("P/E Ratio", Some(&FieldValue::Number(29.4))), "29.40");
        assert_eq!(format_field("Industry", None), "N/A");
    }
}
