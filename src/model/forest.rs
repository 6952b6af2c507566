//! Bagged regression trees
//!
//! Each output column gets its own forest of CART trees fit on bootstrap
//! samples. Every feature is considered at every split and sampling uses a
//! seeded RNG, so a fit is reproducible from its parameters.

use ndarray::{ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::model::{Estimator, TrainedModel};
use crate::{GridironError, Result};

/// Forest hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    /// Trees per output
    pub n_estimators: usize,
    /// Unlimited when absent
    pub max_depth: Option<usize>,
    /// Nodes with fewer samples become leaves
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        ForestParams {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A single-output regression tree stored as a node arena
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    sse: f64,
}

struct TreeBuilder<'x, 'y> {
    x: ArrayView2<'x, f64>,
    y: ArrayView1<'y, f64>,
    max_depth: usize,
    min_samples_split: usize,
    nodes: Vec<Node>,
}

impl TreeBuilder<'_, '_> {
    fn build(&mut self, samples: Vec<usize>, depth: usize) -> usize {
        let n = samples.len() as f64;
        let sum: f64 = samples.iter().map(|&i| self.y[i]).sum();
        let sum_sq: f64 = samples.iter().map(|&i| self.y[i] * self.y[i]).sum();
        let mean = sum / n;
        let sse = sum_sq - sum * sum / n;

        let index = self.nodes.len();
        self.nodes.push(Node::Leaf { value: mean });

        if depth >= self.max_depth || samples.len() < self.min_samples_split || sse <= 1e-12 {
            return index;
        }

        let best = match self.best_split(&samples, sse) {
            Some(b) => b,
            None => return index,
        };

        let x = self.x;
        let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = samples
            .into_iter()
            .partition(|&i| x[[i, best.feature]] <= best.threshold);

        let left = self.build(left_samples, depth + 1);
        let right = self.build(right_samples, depth + 1);
        self.nodes[index] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        index
    }

    /// Lowest combined child SSE over every feature and cut point
    fn best_split(&self, samples: &[usize], parent_sse: f64) -> Option<SplitCandidate> {
        let mut best: Option<SplitCandidate> = None;
        let mut sorted = samples.to_vec();
        let total: f64 = samples.iter().map(|&i| self.y[i]).sum();
        let total_sq: f64 = samples.iter().map(|&i| self.y[i] * self.y[i]).sum();
        let n = samples.len();

        for feature in 0..self.x.ncols() {
            sorted.sort_by(|&a, &b| self.x[[a, feature]].total_cmp(&self.x[[b, feature]]));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for k in 1..n {
                let prev = sorted[k - 1];
                left_sum += self.y[prev];
                left_sq += self.y[prev] * self.y[prev];

                let lo = self.x[[prev, feature]];
                let hi = self.x[[sorted[k], feature]];
                if lo >= hi {
                    continue;
                }

                let n_left = k as f64;
                let n_right = (n - k) as f64;
                let right_sum = total - left_sum;
                let right_sq = total_sq - left_sq;
                let sse = (left_sq - left_sum * left_sum / n_left)
                    + (right_sq - right_sum * right_sum / n_right);

                if best.as_ref().map_or(true, |b| sse < b.sse) {
                    let mut threshold = lo + (hi - lo) / 2.0;
                    if threshold >= hi {
                        threshold = lo;
                    }
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        sse,
                    });
                }
            }
        }

        best.filter(|b| b.sse < parent_sse)
    }
}

impl RegressionTree {
    /// Fit on the given (possibly repeated) sample indices
    pub fn fit(
        x: ArrayView2<f64>,
        y: ArrayView1<f64>,
        samples: Vec<usize>,
        params: &ForestParams,
    ) -> Self {
        let mut builder = TreeBuilder {
            x,
            y,
            max_depth: params.max_depth.unwrap_or(usize::MAX),
            min_samples_split: params.min_samples_split.max(2),
            nodes: Vec::new(),
        };
        builder.build(samples, 0);
        RegressionTree {
            nodes: builder.nodes,
        }
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Children always follow their parent in the arena, which rules out
    /// cycles as well as dangling indices.
    fn check_structure(&self, n_features: usize) -> std::result::Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (index, node) in self.nodes.iter().enumerate() {
            if let Node::Split {
                feature,
                left,
                right,
                ..
            } = node
            {
                if *feature >= n_features {
                    return Err(format!(
                        "node {} splits on feature {} of {}",
                        index, feature, n_features
                    ));
                }
                for child in [*left, *right] {
                    if child <= index || child >= self.nodes.len() {
                        return Err(format!(
                            "node {} points to child {} of {} nodes",
                            index,
                            child,
                            self.nodes.len()
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], index: usize) -> usize {
            match &nodes[index] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => {
                    1 + walk(nodes, *left).max(walk(nodes, *right))
                }
            }
        }
        walk(&self.nodes, 0)
    }
}

/// Trees for one output column; prediction is their mean
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forest {
    trees: Vec<RegressionTree>,
}

impl Forest {
    pub fn fit(x: ArrayView2<f64>, y: ArrayView1<f64>, params: &ForestParams, seed: u64) -> Self {
        let n = x.nrows();
        let mut rng = StdRng::seed_from_u64(seed);

        let trees = (0..params.n_estimators.max(1))
            .map(|_| {
                let samples: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(x, y, samples, params)
            })
            .collect();

        Forest { trees }
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let total: f64 = self.trees.iter().map(|t| t.predict_row(row)).sum();
        total / self.trees.len() as f64
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }
}

/// One forest per output column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestModel {
    n_features: usize,
    outputs: Vec<Forest>,
}

impl ForestModel {
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_targets(&self) -> usize {
        self.outputs.len()
    }

    pub fn predict_row(&self, row: &[f64]) -> Vec<f64> {
        self.outputs.iter().map(|f| f.predict_row(row)).collect()
    }

    pub fn outputs(&self) -> &[Forest] {
        &self.outputs
    }

    /// Every tree must be walkable for a row of `n_features` values
    pub fn check_structure(&self) -> std::result::Result<(), String> {
        for (col, forest) in self.outputs.iter().enumerate() {
            if forest.trees.is_empty() {
                return Err(format!("output {} has no trees", col));
            }
            for (t, tree) in forest.trees.iter().enumerate() {
                tree.check_structure(self.n_features)
                    .map_err(|e| format!("output {} tree {}: {}", col, t, e))?;
            }
        }
        Ok(())
    }
}

impl Estimator for ForestParams {
    fn fit(&self, x: ArrayView2<f64>, y: ArrayView2<f64>) -> Result<TrainedModel> {
        if x.nrows() == 0 || x.nrows() != y.nrows() {
            return Err(GridironError::Training(format!(
                "forest needs matching non-empty inputs, got {} feature rows and {} target rows",
                x.nrows(),
                y.nrows()
            )));
        }

        let outputs: Vec<Forest> = y
            .axis_iter(Axis(1))
            .enumerate()
            .map(|(col, target)| {
                let forest = Forest::fit(x, target, self, self.seed.wrapping_add(col as u64));
                log::debug!(
                    "Output {}: {} trees, max depth {}",
                    col,
                    forest.trees.len(),
                    forest.trees.iter().map(|t| t.depth()).max().unwrap_or(0)
                );
                forest
            })
            .collect();

        Ok(TrainedModel::Forest(ForestModel {
            n_features: x.ncols(),
            outputs,
        }))
    }

    fn describe(&self) -> String {
        match self.max_depth {
            Some(d) => format!("forest({} trees, depth {})", self.n_estimators, d),
            None => format!("forest({} trees, unlimited depth)", self.n_estimators),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array2};

    fn params(n_estimators: usize, max_depth: Option<usize>) -> ForestParams {
        ForestParams {
            n_estimators,
            max_depth,
            min_samples_split: 2,
            seed: 7,
        }
    }

    #[test]
    fn test_tree_learns_step() {
        let x = array![[1.0], [2.0], [3.0], [10.0], [11.0], [12.0]];
        let y = array![0.0, 0.0, 0.0, 5.0, 5.0, 5.0];
        let tree = RegressionTree::fit(x.view(), y.view(), (0..6).collect(), &params(1, None));

        assert_eq!(tree.predict_row(&[2.5]), 0.0);
        assert_eq!(tree.predict_row(&[11.5]), 5.0);
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.node_count(), 3);
    }

    #[test]
    fn test_depth_zero_is_mean() {
        let x = array![[1.0], [2.0], [3.0]];
        let y = array![1.0, 2.0, 6.0];
        let tree = RegressionTree::fit(x.view(), y.view(), vec![0, 1, 2], &params(1, Some(0)));
        assert_relative_eq!(tree.predict_row(&[100.0]), 3.0);
    }

    #[test]
    fn test_max_depth_respected() {
        let x = Array2::from_shape_fn((64, 2), |(i, j)| (i * (j + 1)) as f64);
        let y: ndarray::Array1<f64> = (0..64).map(|i| (i * i) as f64).collect();
        let tree = RegressionTree::fit(x.view(), y.view(), (0..64).collect(), &params(1, Some(3)));
        assert!(tree.depth() <= 3);
    }

    #[test]
    fn test_constant_features_give_single_leaf() {
        let x = array![[1.0, 1.0], [1.0, 1.0], [1.0, 1.0]];
        let y = array![1.0, 2.0, 3.0];
        let tree = RegressionTree::fit(x.view(), y.view(), vec![0, 1, 2], &params(1, None));
        assert_eq!(tree.node_count(), 1);
        assert_relative_eq!(tree.predict_row(&[1.0, 1.0]), 2.0);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let x = Array2::from_shape_fn((40, 3), |(i, j)| ((i * 7 + j * 3) % 11) as f64);
        let y = Array2::from_shape_fn((40, 2), |(i, j)| ((i % 5) * (j + 1)) as f64);

        let a = params(10, Some(4)).fit(x.view(), y.view()).unwrap();
        let b = params(10, Some(4)).fit(x.view(), y.view()).unwrap();
        assert_eq!(a, b);

        let row = [3.0, 4.0, 5.0];
        assert_eq!(a.predict_row(&row), b.predict_row(&row));
    }

    #[test]
    fn test_multi_output_widths() {
        let x = Array2::from_shape_fn((20, 4), |(i, j)| (i + j) as f64);
        let y = Array2::from_shape_fn((20, 3), |(i, j)| (i * j) as f64);
        let model = params(5, Some(3)).fit(x.view(), y.view()).unwrap();

        assert_eq!(model.n_features(), 4);
        assert_eq!(model.n_targets(), 3);
        assert_eq!(model.predict_row(&[1.0, 2.0, 3.0, 4.0]).len(), 3);
    }

    #[test]
    fn test_forest_tracks_signal() {
        let x = Array2::from_shape_fn((60, 1), |(i, _)| i as f64);
        let y = Array2::from_shape_fn((60, 1), |(i, _)| if i < 30 { 0.0 } else { 10.0 });
        let model = params(20, None).fit(x.view(), y.view()).unwrap();

        assert!(model.predict_row(&[5.0])[0] < 2.0);
        assert!(model.predict_row(&[55.0])[0] > 8.0);
    }

    #[test]
    fn test_fitted_model_passes_structure_check() {
        let x = Array2::from_shape_fn((30, 3), |(i, j)| ((i * 5 + j) % 7) as f64);
        let y = Array2::from_shape_fn((30, 2), |(i, j)| (i % 4 + j) as f64);
        let model = params(4, None).fit(x.view(), y.view()).unwrap();

        match model {
            TrainedModel::Forest(forest) => assert!(forest.check_structure().is_ok()),
            other => panic!("unexpected model {:?}", other.kind()),
        }
    }

    #[test]
    fn test_structure_check_rejects_bad_indices() {
        let split = |feature, left, right| Node::Split {
            feature,
            threshold: 0.5,
            left,
            right,
        };
        let leaf = Node::Leaf { value: 1.0 };
        let model = |nodes: Vec<Node>| ForestModel {
            n_features: 2,
            outputs: vec![Forest {
                trees: vec![RegressionTree { nodes }],
            }],
        };

        assert!(model(vec![split(1, 1, 2), leaf.clone(), leaf.clone()])
            .check_structure()
            .is_ok());
        assert!(model(vec![split(2, 1, 2), leaf.clone(), leaf.clone()])
            .check_structure()
            .is_err());
        assert!(model(vec![split(0, 1, 5), leaf.clone(), leaf.clone()])
            .check_structure()
            .is_err());
        assert!(model(vec![split(0, 0, 1), leaf.clone()])
            .check_structure()
            .is_err());
        assert!(model(vec![]).check_structure().is_err());
    }

    #[test]
    fn test_empty_input_rejected() {
        let x = Array2::<f64>::zeros((0, 3));
        let y = Array2::<f64>::zeros((0, 1));
        assert!(matches!(
            params(5, None).fit(x.view(), y.view()),
            Err(GridironError::Training(_))
        ));
    }
}
