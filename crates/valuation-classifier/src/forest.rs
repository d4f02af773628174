//! Bagged ensemble of classification trees.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use valuation_core::{ValuationError, ValuationResult};

use crate::tree::{argmax, DecisionTree, TreeConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features examined per split (floor(sqrt(n_features)) if None)
    pub max_features: Option<usize>,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    config: ForestConfig,
    n_classes: usize,
    trees: Vec<DecisionTree>,
    feature_importances: Vec<f64>,
}

impl RandomForest {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            n_classes: 0,
            trees: Vec::new(),
            feature_importances: Vec::new(),
        }
    }

    /// Train on `features` (one row per sample) with class indices in
    /// `0..n_classes`. Tree `i` draws from a generator seeded with `seed + i`.
    pub fn fit(&mut self, features: &[Vec<f64>], labels: &[usize], n_classes: usize) -> ValuationResult<()> {
        if features.is_empty() {
            return Err(ValuationError::ModelFitFailure("no training samples".to_string()));
        }
        if features.len() != labels.len() {
            return Err(ValuationError::ModelFitFailure(format!(
                "{} feature rows but {} labels",
                features.len(),
                labels.len()
            )));
        }
        if self.config.n_trees == 0 {
            return Err(ValuationError::ModelFitFailure("forest needs at least one tree".to_string()));
        }
        let n_features = features[0].len();
        if n_features == 0 || features.iter().any(|row| row.len() != n_features) {
            return Err(ValuationError::ModelFitFailure("ragged or empty feature rows".to_string()));
        }
        if let Some(&bad) = labels.iter().find(|&&l| l >= n_classes) {
            return Err(ValuationError::ModelFitFailure(format!(
                "label {} outside {} classes",
                bad, n_classes
            )));
        }

        let max_features = self
            .config
            .max_features
            .unwrap_or_else(|| ((n_features as f64).sqrt().floor() as usize).max(1));
        let n_samples = features.len();

        self.n_classes = n_classes;
        self.trees = (0..self.config.n_trees)
            .map(|i| {
                let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed.wrapping_add(i as u64));
                let indices: Vec<usize> = if self.config.bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };

                let tree_config = TreeConfig {
                    max_depth: self.config.max_depth,
                    min_samples_split: self.config.min_samples_split,
                    min_samples_leaf: self.config.min_samples_leaf,
                    max_features: Some(max_features),
                };
                let mut tree = DecisionTree::new(tree_config, n_classes);
                tree.fit(features, labels, &indices, &mut rng);
                tree
            })
            .collect();

        self.feature_importances = vec![0.0; n_features];
        for tree in &self.trees {
            for (i, &imp) in tree.feature_importances().iter().enumerate() {
                self.feature_importances[i] += imp;
            }
        }
        let sum: f64 = self.feature_importances.iter().sum();
        if sum > 0.0 {
            for imp in &mut self.feature_importances {
                *imp /= sum;
            }
        }

        tracing::debug!(
            "Fitted {} trees on {} samples (max_features={})",
            self.trees.len(),
            n_samples,
            max_features
        );
        Ok(())
    }

    /// Mean of the per-tree leaf distributions.
    pub fn predict_proba(&self, row: &[f64]) -> Vec<f64> {
        let mut proba = vec![0.0; self.n_classes];
        if self.trees.is_empty() {
            return proba;
        }
        for tree in &self.trees {
            for (acc, p) in proba.iter_mut().zip(tree.predict_proba(row)) {
                *acc += p;
            }
        }
        let n = self.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= n);
        proba
    }

    /// Highest mean probability; ties go to the lowest class index.
    pub fn predict(&self, row: &[f64]) -> usize {
        argmax(&self.predict_proba(row))
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }
}
