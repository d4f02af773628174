use thiserror::Error;

use crate::types::EssentialField;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValuationError {
    #[error("Not enough data to classify {ticker}: {field} is missing")]
    InputMissing { ticker: String, field: EssentialField },

    #[error("Insufficient revenue history: {available} usable period(s), need at least {required}")]
    InsufficientHistory { available: usize, required: usize },

    #[error("No data: {0}")]
    NoData(String),

    #[error("Model fit failure: {0}")]
    ModelFitFailure(String),

    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("No active ticker: view fundamentals first")]
    NoActiveTicker,

    #[error("Dataset I/O error: {0}")]
    DatasetIo(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ValuationError {
    /// Short stable tag for the failure kind, used by callers that log or
    /// render failures without matching on every variant.
    pub fn tag(&self) -> &'static str {
        match self {
            ValuationError::InputMissing { .. } => "InputMissing",
            ValuationError::InsufficientHistory { .. } => "InsufficientHistory",
            ValuationError::NoData(_) => "NoData",
            ValuationError::ModelFitFailure(_) => "ModelFitFailure",
            ValuationError::NetworkFailure(_) => "NetworkFailure",
            ValuationError::NoActiveTicker => "NoActiveTicker",
            ValuationError::DatasetIo(_) => "DatasetIo",
            ValuationError::InvalidConfig(_) => "InvalidConfig",
        }
    }
}

pub type ValuationResult<T> = Result<T, ValuationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_missing_names_ticker_and_field() {
        let err = ValuationError::InputMissing {
            ticker: "AAPL".to_string(),
            field: EssentialField::TrailingEps,
        };
        assert_eq!(err.to_string(), "Not enough data to classify AAPL: TrailingEPS is missing");
        assert_eq!(err.tag(), "InputMissing");
    }

    #[test]
    fn test_insufficient_history_message() {
        let err = ValuationError::InsufficientHistory { available: 1, required: 2 };
        assert!(err.to_string().contains("1 usable period"));
        assert_eq!(err.tag(), "InsufficientHistory");
    }
}
