// file: src/classifier/forest.rs
// description: random forest of gini CART trees over dense feature vectors
// reference: bootstrap aggregation with per-split feature subsampling

use crate::config::ForestConfig;
use crate::error::{RouterError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

const MIN_GAIN: f64 = 1e-12;

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        distribution: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    fn predict(&self, features: &[f64]) -> &[f64] {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { distribution } => return distribution,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = features.get(*feature).copied().unwrap_or(0.0);
                    index = if value <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

struct TreeBuilder<'a> {
    samples: &'a [Vec<f64>],
    labels: &'a [usize],
    n_classes: usize,
    n_features: usize,
    max_features: usize,
    config: &'a ForestConfig,
    rng: StdRng,
    nodes: Vec<Node>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

impl TreeBuilder<'_> {
    fn build(mut self, indices: Vec<usize>) -> DecisionTree {
        self.grow(indices, 0);
        DecisionTree { nodes: self.nodes }
    }

    fn grow(&mut self, indices: Vec<usize>, depth: usize) -> usize {
        let counts = self.class_counts(&indices);
        let total = indices.len() as f64;
        let parent_impurity = gini(&counts, total);

        let stop = depth >= self.config.max_depth
            || indices.len() < self.config.min_samples_split.max(2)
            || parent_impurity <= MIN_GAIN;

        let split = if stop {
            None
        } else {
            self.best_split(&indices, parent_impurity)
        };

        let Some(split) = split else {
            let distribution = counts.iter().map(|&c| c as f64 / total).collect();
            self.nodes.push(Node::Leaf { distribution });
            return self.nodes.len() - 1;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.samples[i][split.feature] <= split.threshold);

        let node_index = self.nodes.len();
        self.nodes.push(Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: 0,
            right: 0,
        });

        let left_index = self.grow(left, depth + 1);
        let right_index = self.grow(right, depth + 1);

        if let Node::Split { left, right, .. } = &mut self.nodes[node_index] {
            *left = left_index;
            *right = right_index;
        }

        node_index
    }

    /// Visits features in random order until `max_features` non-constant
    /// features have been evaluated.
    fn best_split(&mut self, indices: &[usize], parent_impurity: f64) -> Option<BestSplit> {
        let mut features: Vec<usize> = (0..self.n_features).collect();
        features.shuffle(&mut self.rng);

        let mut evaluated = 0;
        let mut best: Option<BestSplit> = None;

        for feature in features {
            if evaluated >= self.max_features {
                break;
            }

            let mut column: Vec<(f64, usize)> = indices
                .iter()
                .map(|&i| (self.samples[i][feature], self.labels[i]))
                .collect();
            column.sort_by(|a, b| a.0.total_cmp(&b.0));

            let (first, last) = (column[0].0, column[column.len() - 1].0);
            if first == last {
                continue;
            }
            evaluated += 1;

            if let Some(candidate) = self.scan_feature(feature, &column) {
                let improves = candidate.impurity < parent_impurity - MIN_GAIN;
                if improves && best.as_ref().is_none_or(|b| candidate.impurity < b.impurity) {
                    best = Some(candidate);
                }
            }
        }

        best
    }

    fn scan_feature(&self, feature: usize, column: &[(f64, usize)]) -> Option<BestSplit> {
        let total = column.len() as f64;
        let mut right_counts = vec![0usize; self.n_classes];
        for &(_, label) in column {
            right_counts[label] += 1;
        }
        let mut left_counts = vec![0usize; self.n_classes];
        let mut best: Option<BestSplit> = None;

        for position in 0..column.len() - 1 {
            let (value, label) = column[position];
            left_counts[label] += 1;
            right_counts[label] -= 1;

            let next_value = column[position + 1].0;
            if value == next_value {
                continue;
            }

            let left_total = (position + 1) as f64;
            let right_total = total - left_total;
            let impurity = (left_total / total) * gini(&left_counts, left_total)
                + (right_total / total) * gini(&right_counts, right_total);

            if best.as_ref().is_none_or(|b| impurity < b.impurity) {
                best = Some(BestSplit {
                    feature,
                    threshold: (value + next_value) / 2.0,
                    impurity,
                });
            }
        }

        best
    }

    fn class_counts(&self, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &i in indices {
            counts[self.labels[i]] += 1;
        }
        counts
    }
}

fn gini(counts: &[usize], total: f64) -> f64 {
    if total == 0.0 {
        return 0.0;
    }
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    n_classes: usize,
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Trains on dense samples; `labels[i]` is the class index of `samples[i]`.
    pub fn fit(
        samples: &[Vec<f64>],
        labels: &[usize],
        n_classes: usize,
        config: &ForestConfig,
    ) -> Result<Self> {
        if samples.is_empty() || samples.len() != labels.len() {
            return Err(RouterError::Model(format!(
                "forest needs matching samples and labels, got {} and {}",
                samples.len(),
                labels.len()
            )));
        }

        if config.n_trees == 0 {
            return Err(RouterError::Model("forest needs at least one tree".to_string()));
        }

        if n_classes < 2 {
            return Err(RouterError::Model(
                "forest needs at least two classes".to_string(),
            ));
        }

        if let Some(&bad) = labels.iter().find(|&&l| l >= n_classes) {
            return Err(RouterError::Model(format!(
                "label index {} out of range for {} classes",
                bad, n_classes
            )));
        }

        let n_features = samples[0].len();
        if n_features == 0 || samples.iter().any(|s| s.len() != n_features) {
            return Err(RouterError::Model(
                "samples must share a non-zero feature dimension".to_string(),
            ));
        }

        let max_features = (n_features as f64).sqrt().ceil().max(1.0) as usize;
        let n = samples.len();
        let mut trees = Vec::with_capacity(config.n_trees);

        for tree_index in 0..config.n_trees {
            let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(tree_index as u64));
            let bootstrap: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();

            let builder = TreeBuilder {
                samples,
                labels,
                n_classes,
                n_features,
                max_features,
                config,
                rng,
                nodes: Vec::new(),
            };
            trees.push(builder.build(bootstrap));
        }

        debug!(
            "Trained forest: {} trees, {} features, {} classes",
            trees.len(),
            n_features,
            n_classes
        );

        Ok(Self {
            n_classes,
            n_features,
            trees,
        })
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Mean class distribution across trees.
    pub fn predict_proba(&self, features: &[f64]) -> Vec<f64> {
        let mut totals = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (total, p) in totals.iter_mut().zip(tree.predict(features)) {
                *total += p;
            }
        }

        let count = self.trees.len().max(1) as f64;
        totals.iter_mut().for_each(|t| *t /= count);
        totals
    }

    /// Winning class index and its probability; lower index wins ties.
    pub fn predict(&self, features: &[f64]) -> (usize, f64) {
        let proba = self.predict_proba(features);
        let mut best = (0, proba.first().copied().unwrap_or(0.0));
        for (index, &p) in proba.iter().enumerate().skip(1) {
            if p > best.1 {
                best = (index, p);
            }
        }
        best
    }
}
