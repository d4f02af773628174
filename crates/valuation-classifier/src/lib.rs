//! Valuation classifier.
//!
//! Every request retrains a bagged forest from the current dataset snapshot;
//! nothing is persisted between calls. Features are always
//! [TrailingPE, CurrentPrice, TrailingEPS].

pub mod forest;
pub mod split;
pub mod tree;

pub use forest::{ForestConfig, RandomForest};
pub use split::{test_size, train_test_split, SplitIndices};

use serde::{Deserialize, Serialize};
use valuation_core::{
    EnrichedRow, FeatureVector, FundamentalsSnapshot, TrainingDataset, ValuationError,
    ValuationLabel, ValuationResult,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub n_trees: usize,
    pub test_fraction: f64,
    /// None draws the partition from OS entropy
    pub split_seed: Option<u64>,
    /// Seed for bootstrap and feature sampling inside the forest
    pub tree_seed: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            test_fraction: 0.25,
            split_seed: None,
            tree_seed: 0,
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> ValuationResult<()> {
        if self.n_trees == 0 {
            return Err(ValuationError::InvalidConfig(
                "n_trees must be at least 1".to_string(),
            ));
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(ValuationError::InvalidConfig(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Train,
    Test,
}

/// Actual vs predicted label for one dataset row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowPrediction {
    pub ticker: String,
    pub actual: ValuationLabel,
    pub predicted: ValuationLabel,
}

pub struct ValuationClassifier {
    config: ClassifierConfig,
}

impl ValuationClassifier {
    pub fn new(config: ClassifierConfig) -> ValuationResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Split the dataset and fit the forest on the training share.
    ///
    /// Fails with `ModelFitFailure` for fewer than 2 rows or a single
    /// represented label.
    pub fn train(&self, dataset: &TrainingDataset) -> ValuationResult<ClassifierModel> {
        if dataset.len() < 2 {
            return Err(ValuationError::ModelFitFailure(format!(
                "need at least 2 labeled rows, dataset has {}",
                dataset.len()
            )));
        }
        let labels = dataset.distinct_labels();
        if labels.len() < 2 {
            return Err(ValuationError::ModelFitFailure(format!(
                "need at least 2 label classes, dataset only has {}",
                labels
                    .iter()
                    .map(|l| l.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        let split = train_test_split(dataset.len(), self.config.test_fraction, self.config.split_seed);
        let rows = dataset.rows();
        let train_rows: Vec<EnrichedRow> = split.train.iter().map(|&i| rows[i].clone()).collect();
        let test_rows: Vec<EnrichedRow> = split.test.iter().map(|&i| rows[i].clone()).collect();

        let features: Vec<Vec<f64>> = train_rows
            .iter()
            .map(|r| r.features().as_array().to_vec())
            .collect();
        let targets: Vec<usize> = train_rows.iter().map(|r| r.valuation.index()).collect();

        let mut forest = RandomForest::new(ForestConfig {
            n_trees: self.config.n_trees,
            seed: self.config.tree_seed,
            ..Default::default()
        });
        forest.fit(&features, &targets, ValuationLabel::ALL.len())?;

        tracing::debug!(
            "Trained valuation forest: {} train rows, {} test rows",
            train_rows.len(),
            test_rows.len()
        );

        Ok(ClassifierModel {
            forest,
            train_rows,
            test_rows,
        })
    }
}

impl Default for ValuationClassifier {
    fn default() -> Self {
        Self {
            config: ClassifierConfig::default(),
        }
    }
}

/// A fitted forest plus the partition it was fitted on.
pub struct ClassifierModel {
    forest: RandomForest,
    train_rows: Vec<EnrichedRow>,
    test_rows: Vec<EnrichedRow>,
}

impl ClassifierModel {
    fn rows(&self, partition: Partition) -> &[EnrichedRow] {
        match partition {
            Partition::Train => &self.train_rows,
            Partition::Test => &self.test_rows,
        }
    }

    pub fn predict(&self, features: &FeatureVector) -> ValuationLabel {
        let class = self.forest.predict(&features.as_array());
        ValuationLabel::from_index(class).unwrap_or(ValuationLabel::OverValued)
    }

    /// Mean tree probability per label, in label order.
    pub fn vote_shares(&self, features: &FeatureVector) -> Vec<(ValuationLabel, f64)> {
        ValuationLabel::ALL
            .into_iter()
            .zip(self.forest.predict_proba(&features.as_array()))
            .collect()
    }

    /// Classify a ticker's fundamentals. An absent essential field is
    /// reported before the model is consulted.
    pub fn predict_snapshot(&self, snapshot: &FundamentalsSnapshot) -> ValuationResult<ValuationLabel> {
        let features = FeatureVector::from_snapshot(snapshot)?;
        Ok(self.predict(&features))
    }

    /// Fraction of exact label matches; 0 for an empty partition.
    pub fn evaluate(&self, partition: Partition) -> f64 {
        let rows = self.rows(partition);
        if rows.is_empty() {
            return 0.0;
        }
        let correct = rows
            .iter()
            .filter(|r| self.predict(&r.features()) == r.valuation)
            .count();
        correct as f64 / rows.len() as f64
    }

    pub fn partition_predictions(&self, partition: Partition) -> Vec<RowPrediction> {
        self.rows(partition)
            .iter()
            .map(|r| RowPrediction {
                ticker: r.ticker.clone(),
                actual: r.valuation,
                predicted: self.predict(&r.features()),
            })
            .collect()
    }

    pub fn feature_importances(&self) -> Vec<(&'static str, f64)> {
        FeatureVector::NAMES
            .into_iter()
            .zip(self.forest.feature_importances().iter().copied())
            .collect()
    }

    pub fn train_len(&self) -> usize {
        self.train_rows.len()
    }

    pub fn test_len(&self) -> usize {
        self.test_rows.len()
    }
}
