//! Random forest of gini-split classification trees.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::common::error::{TitanicError, TitanicResult};

use super::domain::{Dataset, ForestConfig};

/// Tree node. Leaves hold the share of positive (survived) samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        positive: f64,
        samples: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    pub fn depth(&self) -> usize {
        match self {
            Node::Leaf { .. } => 1,
            Node::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    fn probability(&self, features: &[f64]) -> f64 {
        let mut node = self;
        loop {
            match node {
                Node::Leaf { positive, .. } => return *positive,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if features[*feature] <= *threshold {
                        &**left
                    } else {
                        &**right
                    };
                }
            }
        }
    }
}

fn gini(positive: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let p = positive as f64 / total as f64;
    2.0 * p * (1.0 - p)
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Per-tree growth settings.
struct TreeParams {
    max_depth: usize,
    min_samples_split: usize,
    min_samples_leaf: usize,
    max_features: usize,
}

/// Single classification tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Node,
    feature_importances: Vec<f64>,
}

impl DecisionTree {
    fn fit(data: &Dataset, indices: &[usize], params: &TreeParams, rng: &mut ChaCha8Rng) -> Self {
        let mut importances = vec![0.0; data.n_features()];
        let root = grow(data, indices.to_vec(), 0, params, rng, &mut importances);

        let sum: f64 = importances.iter().sum();
        if sum > 0.0 {
            for imp in &mut importances {
                *imp /= sum;
            }
        }
        Self {
            root,
            feature_importances: importances,
        }
    }

    pub fn predict_proba_one(&self, features: &[f64]) -> f64 {
        self.root.probability(features)
    }

    pub fn depth(&self) -> usize {
        self.root.depth()
    }
}

fn leaf(data: &Dataset, indices: &[usize]) -> Node {
    let positive = indices.iter().filter(|&&i| data.labels[i] == 1).count();
    Node::Leaf {
        positive: if indices.is_empty() {
            0.0
        } else {
            positive as f64 / indices.len() as f64
        },
        samples: indices.len(),
    }
}

fn grow(
    data: &Dataset,
    indices: Vec<usize>,
    depth: usize,
    params: &TreeParams,
    rng: &mut ChaCha8Rng,
    importances: &mut [f64],
) -> Node {
    let n = indices.len();
    let positive = indices.iter().filter(|&&i| data.labels[i] == 1).count();
    let impurity = gini(positive, n);

    if depth >= params.max_depth || n < params.min_samples_split || impurity == 0.0 {
        return leaf(data, &indices);
    }

    let Some(best) = best_split(data, &indices, impurity, params, rng) else {
        return leaf(data, &indices);
    };

    let (left, right): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .partition(|&&i| data.features[i][best.feature] <= best.threshold);
    if left.is_empty() || right.is_empty() {
        return leaf(data, &indices);
    }

    importances[best.feature] += best.gain * n as f64;
    Node::Split {
        feature: best.feature,
        threshold: best.threshold,
        left: Box::new(grow(data, left, depth + 1, params, rng, importances)),
        right: Box::new(grow(data, right, depth + 1, params, rng, importances)),
    }
}

/// Best gini split over a random subset of features. Candidate thresholds are
/// midpoints between consecutive distinct values, found in one sorted sweep.
fn best_split(
    data: &Dataset,
    indices: &[usize],
    parent_impurity: f64,
    params: &TreeParams,
    rng: &mut ChaCha8Rng,
) -> Option<BestSplit> {
    let n = indices.len();
    let total_positive = indices.iter().filter(|&&i| data.labels[i] == 1).count();

    let mut features: Vec<usize> = (0..data.n_features()).collect();
    features.shuffle(rng);
    features.truncate(params.max_features);

    let mut best: Option<BestSplit> = None;
    let mut sorted = indices.to_vec();

    for feature in features {
        sorted.sort_by(|&a, &b| data.features[a][feature].total_cmp(&data.features[b][feature]));

        let mut left_positive = 0;
        for pos in 0..n - 1 {
            if data.labels[sorted[pos]] == 1 {
                left_positive += 1;
            }
            let here = data.features[sorted[pos]][feature];
            let next = data.features[sorted[pos + 1]][feature];
            if here == next {
                continue;
            }

            let n_left = pos + 1;
            let n_right = n - n_left;
            if n_left < params.min_samples_leaf || n_right < params.min_samples_leaf {
                continue;
            }

            let weighted = (n_left as f64 * gini(left_positive, n_left)
                + n_right as f64 * gini(total_positive - left_positive, n_right))
                / n as f64;
            let gain = parent_impurity - weighted;
            if gain > best.as_ref().map_or(0.0, |b| b.gain) {
                best = Some(BestSplit {
                    feature,
                    threshold: (here + next) / 2.0,
                    gain,
                });
            }
        }
    }
    best
}

/// Bagged ensemble of `DecisionTree`s; the predicted probability is the mean
/// of the trees' leaf probabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    config: ForestConfig,
    trees: Vec<DecisionTree>,
    feature_names: Vec<String>,
    feature_importances: Vec<f64>,
}

impl RandomForest {
    /// Fit a forest. Every tree gets its own seeded RNG so results do not
    /// depend on training order.
    pub fn fit(config: &ForestConfig, data: &Dataset) -> TitanicResult<Self> {
        let n = data.n_samples();
        let n_features = data.n_features();
        if n == 0 || n_features == 0 {
            return Err(TitanicError::invalid("cannot fit a forest on an empty dataset"));
        }
        if config.n_trees == 0 {
            return Err(TitanicError::invalid("forest needs at least one tree"));
        }

        let max_features = config
            .max_features
            .unwrap_or_else(|| (n_features as f64).sqrt().ceil() as usize)
            .clamp(1, n_features);
        let params = TreeParams {
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split.max(2),
            min_samples_leaf: config.min_samples_leaf.max(1),
            max_features,
        };

        let trees: Vec<DecisionTree> = (0..config.n_trees)
            .map(|i| {
                let mut rng = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(i as u64));
                let sample: Vec<usize> = if config.bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                DecisionTree::fit(data, &sample, &params, &mut rng)
            })
            .collect();

        let mut feature_importances = vec![0.0; n_features];
        for tree in &trees {
            for (acc, imp) in feature_importances.iter_mut().zip(&tree.feature_importances) {
                *acc += imp;
            }
        }
        let sum: f64 = feature_importances.iter().sum();
        if sum > 0.0 {
            for imp in &mut feature_importances {
                *imp /= sum;
            }
        }

        Ok(Self {
            config: config.clone(),
            trees,
            feature_names: data.feature_names.clone(),
            feature_importances,
        })
    }

    /// Probability of survival for one feature vector.
    pub fn predict_proba_one(&self, features: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees
            .iter()
            .map(|t| t.predict_proba_one(features))
            .sum::<f64>()
            / self.trees.len() as f64
    }

    pub fn predict_one(&self, features: &[f64]) -> u8 {
        u8::from(self.predict_proba_one(features) > 0.5)
    }

    /// Predictions for a row-major matrix whose width must match training.
    pub fn predict(&self, rows: &[Vec<f64>]) -> TitanicResult<Vec<u8>> {
        let width = self.feature_names.len();
        if let Some(bad) = rows.iter().find(|r| r.len() != width) {
            return Err(TitanicError::invalid(format!(
                "feature vector has {} values, model expects {width}",
                bad.len()
            )));
        }
        Ok(rows.iter().map(|r| self.predict_one(r)).collect())
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    /// Feature names with importances, most important first.
    pub fn feature_importance_ranking(&self) -> Vec<(String, f64)> {
        let mut ranking: Vec<(String, f64)> = self
            .feature_names
            .iter()
            .cloned()
            .zip(self.feature_importances.iter().copied())
            .collect();
        ranking.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranking
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn threshold_dataset() -> Dataset {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..200 {
            let x = i as f64 / 20.0;
            let noise = (i % 7) as f64;
            features.push(vec![x, noise]);
            labels.push(u8::from(x > 5.0));
        }
        Dataset {
            features,
            labels,
            feature_names: vec!["x".into(), "noise".into()],
        }
    }

    fn small_config() -> ForestConfig {
        ForestConfig {
            n_trees: 15,
            ..ForestConfig::default()
        }
    }

    #[test]
    fn forest_learns_a_threshold() {
        let data = threshold_dataset();
        let forest = RandomForest::fit(&small_config(), &data).unwrap();
        let preds = forest.predict(&data.features).unwrap();
        let correct = preds.iter().zip(&data.labels).filter(|(p, l)| p == l).count();
        assert!(correct as f64 / data.n_samples() as f64 > 0.95);
        assert_eq!(forest.n_trees(), 15);
        assert_eq!(forest.feature_importance_ranking()[0].0, "x");
    }

    #[test]
    fn trees_respect_max_depth() {
        let data = threshold_dataset();
        let config = ForestConfig {
            max_depth: 2,
            ..small_config()
        };
        let forest = RandomForest::fit(&config, &data).unwrap();
        assert!(forest.trees.iter().all(|t| t.depth() <= 3));
    }

    #[test]
    fn same_seed_same_forest() {
        let data = threshold_dataset();
        let a = RandomForest::fit(&small_config(), &data).unwrap();
        let b = RandomForest::fit(&small_config(), &data).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn pure_node_becomes_a_leaf() {
        let data = Dataset {
            features: vec![vec![1.0], vec![2.0]],
            labels: vec![1, 1],
            feature_names: vec!["x".into()],
        };
        let forest = RandomForest::fit(&small_config(), &data).unwrap();
        assert_eq!(forest.predict_proba_one(&[0.0]), 1.0);
    }

    #[test]
    fn wrong_width_is_rejected() {
        let data = threshold_dataset();
        let forest = RandomForest::fit(&small_config(), &data).unwrap();
        assert!(forest.predict(&[vec![1.0]]).is_err());
    }

    #[test]
    fn empty_dataset_is_rejected() {
        let data = Dataset {
            features: vec![],
            labels: vec![],
            feature_names: vec!["x".into()],
        };
        assert!(RandomForest::fit(&small_config(), &data).is_err());
    }
}
