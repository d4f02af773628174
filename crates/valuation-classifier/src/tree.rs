//! CART classification tree (Gini impurity).

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    /// None grows until leaves are pure
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features examined per split; None = all
    pub max_features: Option<usize>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        /// Class proportions at this leaf
        distribution: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    config: TreeConfig,
    n_classes: usize,
    root: Option<Node>,
    feature_importances: Vec<f64>,
}

impl DecisionTree {
    pub fn new(config: TreeConfig, n_classes: usize) -> Self {
        Self {
            config,
            n_classes,
            root: None,
            feature_importances: Vec::new(),
        }
    }

    /// Fit on the rows of `features`/`labels` selected by `indices`.
    /// Indices may repeat (bootstrap samples).
    pub fn fit(
        &mut self,
        features: &[Vec<f64>],
        labels: &[usize],
        indices: &[usize],
        rng: &mut ChaCha8Rng,
    ) {
        let n_features = features.first().map_or(0, |row| row.len());
        self.feature_importances = vec![0.0; n_features];
        let n_total = indices.len();
        self.root = Some(self.build(features, labels, indices, 0, n_total, rng));

        let sum: f64 = self.feature_importances.iter().sum();
        if sum > 0.0 {
            for imp in &mut self.feature_importances {
                *imp /= sum;
            }
        }
    }

    fn build(
        &mut self,
        features: &[Vec<f64>],
        labels: &[usize],
        indices: &[usize],
        depth: usize,
        n_total: usize,
        rng: &mut ChaCha8Rng,
    ) -> Node {
        let counts = self.class_counts(labels, indices);
        let impurity = gini(&counts, indices.len());

        let depth_reached = self.config.max_depth.map_or(false, |max| depth >= max);
        if depth_reached || indices.len() < self.config.min_samples_split || impurity <= 1e-12 {
            return self.leaf(&counts, indices.len());
        }

        let Some(split) = self.find_best_split(features, labels, indices, &counts, rng) else {
            return self.leaf(&counts, indices.len());
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| features[i][split.feature] <= split.threshold);

        if left_idx.len() < self.config.min_samples_leaf.max(1)
            || right_idx.len() < self.config.min_samples_leaf.max(1)
        {
            return self.leaf(&counts, indices.len());
        }

        self.feature_importances[split.feature] +=
            indices.len() as f64 / n_total as f64 * split.gain;

        let left = self.build(features, labels, &left_idx, depth + 1, n_total, rng);
        let right = self.build(features, labels, &right_idx, depth + 1, n_total, rng);

        Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Scan sorted feature values, keeping running class counts on each side.
    /// Constant features do not count against `max_features`.
    fn find_best_split(
        &self,
        features: &[Vec<f64>],
        labels: &[usize],
        indices: &[usize],
        parent_counts: &[usize],
        rng: &mut ChaCha8Rng,
    ) -> Option<SplitCandidate> {
        let n = indices.len();
        let n_features = features[indices[0]].len();
        let max_features = self.config.max_features.unwrap_or(n_features).clamp(1, n_features);
        let parent_impurity = gini(parent_counts, n);

        let mut candidates: Vec<usize> = (0..n_features).collect();
        candidates.shuffle(rng);

        let mut best: Option<SplitCandidate> = None;
        let mut evaluated = 0;
        let mut order = indices.to_vec();

        for feature in candidates {
            if evaluated >= max_features {
                break;
            }
            order.sort_by(|&a, &b| features[a][feature].total_cmp(&features[b][feature]));
            let lowest = features[order[0]][feature];
            let highest = features[order[n - 1]][feature];
            if !(highest > lowest) {
                continue;
            }
            evaluated += 1;

            let mut left_counts = vec![0usize; self.n_classes];
            let mut right_counts = parent_counts.to_vec();

            for pos in 0..n - 1 {
                let class = labels[order[pos]];
                left_counts[class] += 1;
                right_counts[class] -= 1;

                let a = features[order[pos]][feature];
                let b = features[order[pos + 1]][feature];
                if !(b > a) {
                    continue;
                }

                let n_left = pos + 1;
                let n_right = n - n_left;
                if n_left < self.config.min_samples_leaf || n_right < self.config.min_samples_leaf {
                    continue;
                }

                let weighted = (n_left as f64 * gini(&left_counts, n_left)
                    + n_right as f64 * gini(&right_counts, n_right))
                    / n as f64;
                let gain = parent_impurity - weighted;

                if best.map_or(true, |current| gain > current.gain) {
                    let mid = a / 2.0 + b / 2.0;
                    let threshold = if mid.is_finite() && mid < b { mid } else { a };
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        gain,
                    });
                }
            }
        }

        best
    }

    fn class_counts(&self, labels: &[usize], indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &i in indices {
            counts[labels[i]] += 1;
        }
        counts
    }

    fn leaf(&self, counts: &[usize], n: usize) -> Node {
        let distribution = if n == 0 {
            vec![1.0 / self.n_classes as f64; self.n_classes]
        } else {
            counts.iter().map(|&c| c as f64 / n as f64).collect()
        };
        Node::Leaf { distribution }
    }

    /// Class proportions of the leaf `row` lands in.
    pub fn predict_proba(&self, row: &[f64]) -> Vec<f64> {
        let mut node = match &self.root {
            Some(root) => root,
            None => return vec![1.0 / self.n_classes as f64; self.n_classes],
        };
        loop {
            match node {
                Node::Leaf { distribution } => return distribution.clone(),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = row.get(*feature).copied().unwrap_or(f64::NAN);
                    node = if value <= *threshold { left } else { right };
                }
            }
        }
    }

    pub fn predict(&self, row: &[f64]) -> usize {
        argmax(&self.predict_proba(row))
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    pub fn depth(&self) -> usize {
        fn depth_of(node: &Node) -> usize {
            match node {
                Node::Leaf { .. } => 1,
                Node::Split { left, right, .. } => 1 + depth_of(left).max(depth_of(right)),
            }
        }
        self.root.as_ref().map_or(0, depth_of)
    }
}

fn gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum::<f64>()
}

/// Index of the largest value; ties resolve to the lowest index.
pub(crate) fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_gini() {
        assert_eq!(gini(&[5, 0, 0], 5), 0.0);
        assert!((gini(&[2, 2, 0], 4) - 0.5).abs() < 1e-12);
        assert_eq!(gini(&[], 0), 0.0);
    }

    #[test]
    fn test_argmax_ties_to_lowest() {
        assert_eq!(argmax(&[0.2, 0.5, 0.3]), 1);
        assert_eq!(argmax(&[0.5, 0.0, 0.5]), 0);
    }

    #[test]
    fn test_tree_separates_threshold_classes() {
        let features: Vec<Vec<f64>> = (0..40).map(|i| vec![i as f64, 1.0, (i % 3) as f64]).collect();
        let labels: Vec<usize> = (0..40).map(|i| if i < 20 { 2 } else { 0 }).collect();
        let indices: Vec<usize> = (0..40).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let mut tree = DecisionTree::new(TreeConfig::default(), 3);
        tree.fit(&features, &labels, &indices, &mut rng);

        for (row, &label) in features.iter().zip(labels.iter()) {
            assert_eq!(tree.predict(row), label);
        }
        assert_eq!(tree.predict(&[100.0, 1.0, 0.0]), 0);
        assert_eq!(tree.predict(&[-5.0, 1.0, 0.0]), 2);
        assert!(tree.feature_importances()[0] > 0.99);
    }

    #[test]
    fn test_constant_features_make_a_leaf() {
        let features = vec![vec![1.0, 1.0, 1.0]; 6];
        let labels = vec![0, 2, 0, 2, 0, 0];
        let indices: Vec<usize> = (0..6).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let mut tree = DecisionTree::new(TreeConfig::default(), 3);
        tree.fit(&features, &labels, &indices, &mut rng);

        assert_eq!(tree.depth(), 1);
        let proba = tree.predict_proba(&[1.0, 1.0, 1.0]);
        assert!((proba[0] - 4.0 / 6.0).abs() < 1e-12);
        assert_eq!(tree.predict(&[1.0, 1.0, 1.0]), 0);
    }

    #[test]
    fn test_max_depth_limits_growth() {
        let features: Vec<Vec<f64>> = (0..16).map(|i| vec![i as f64]).collect();
        let labels: Vec<usize> = (0..16).map(|i| i % 2).collect();
        let indices: Vec<usize> = (0..16).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let config = TreeConfig {
            max_depth: Some(2),
            ..Default::default()
        };
        let mut tree = DecisionTree::new(config, 2);
        tree.fit(&features, &labels, &indices, &mut rng);
        assert!(tree.depth() <= 3);
    }

    #[test]
    fn test_nan_query_does_not_panic() {
        let features: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64, 0.0, 0.0]).collect();
        let labels: Vec<usize> = (0..10).map(|i| if i < 5 { 0 } else { 1 }).collect();
        let indices: Vec<usize> = (0..10).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut tree = DecisionTree::new(TreeConfig::default(), 2);
        tree.fit(&features, &labels, &indices, &mut rng);

        let class = tree.predict(&[f64::NAN, f64::INFINITY, f64::NEG_INFINITY]);
        assert!(class < 2);
    }
}
