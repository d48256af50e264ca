//! CART regression tree (squared-error splits).
//!
//! # Invariants
//! - Nodes live in a flat arena; child indexes always point forward.
//! - A split is only taken when it strictly reduces squared error and
//!   leaves at least `min_samples_leaf` rows on each side.
//! - Impurity decrease per feature is accumulated for importances.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    /// `None` grows until leaves are pure or too small to split.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum TreeNode {
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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
    /// Unnormalized total squared-error decrease per feature.
    pub impurity_decrease: Vec<f64>,
}

struct SplitChoice {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl RegressionTree {
    /// Fits on the rows selected by `indices` (duplicates allowed for bagging).
    pub fn fit(rows: &[Vec<f64>], targets: &[f64], indices: &[usize], params: TreeParams) -> Self {
        let width = rows.first().map_or(0, Vec::len);
        let mut tree = Self {
            nodes: Vec::new(),
            impurity_decrease: vec![0.0; width],
        };
        if indices.is_empty() {
            tree.nodes.push(TreeNode::Leaf { value: 0.0 });
            return tree;
        }
        let mut working = indices.to_vec();
        tree.grow(rows, targets, &mut working, 0, params);
        tree
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match self.nodes.get(index) {
                Some(TreeNode::Leaf { value }) => return *value,
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = row.get(*feature).copied().unwrap_or(0.0);
                    index = if value <= *threshold { *left } else { *right };
                }
                None => return 0.0,
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[TreeNode], index: usize) -> usize {
            match nodes.get(index) {
                Some(TreeNode::Split { left, right, .. }) => {
                    1 + walk(nodes, *left).max(walk(nodes, *right))
                }
                _ => 0,
            }
        }
        walk(&self.nodes, 0)
    }

    fn grow(
        &mut self,
        rows: &[Vec<f64>],
        targets: &[f64],
        indices: &mut [usize],
        depth: usize,
        params: TreeParams,
    ) -> usize {
        let node_index = self.nodes.len();
        let value = mean_of(targets, indices);
        self.nodes.push(TreeNode::Leaf { value });

        let depth_exhausted = params.max_depth.is_some_and(|max| depth >= max);
        if depth_exhausted || indices.len() < params.min_samples_split.max(2) {
            return node_index;
        }
        let Some(choice) = best_split(rows, targets, indices, params.min_samples_leaf.max(1))
        else {
            return node_index;
        };

        let boundary = partition(indices, |index| {
            rows[index][choice.feature] <= choice.threshold
        });
        if boundary == 0 || boundary == indices.len() {
            return node_index;
        }
        self.impurity_decrease[choice.feature] += choice.gain;

        let (left_rows, right_rows) = indices.split_at_mut(boundary);
        let left = self.grow(rows, targets, left_rows, depth + 1, params);
        let right = self.grow(rows, targets, right_rows, depth + 1, params);
        self.nodes[node_index] = TreeNode::Split {
            feature: choice.feature,
            threshold: choice.threshold,
            left,
            right,
        };
        node_index
    }
}

fn mean_of(targets: &[f64], indices: &[usize]) -> f64 {
    if indices.is_empty() {
        return 0.0;
    }
    indices.iter().map(|index| targets[*index]).sum::<f64>() / indices.len() as f64
}

/// Moves rows matching `goes_left` to the front; returns the boundary.
fn partition(indices: &mut [usize], goes_left: impl Fn(usize) -> bool) -> usize {
    let mut boundary = 0;
    for position in 0..indices.len() {
        if goes_left(indices[position]) {
            indices.swap(boundary, position);
            boundary += 1;
        }
    }
    boundary
}

fn best_split(
    rows: &[Vec<f64>],
    targets: &[f64],
    indices: &[usize],
    min_leaf: usize,
) -> Option<SplitChoice> {
    let width = rows.first().map_or(0, Vec::len);
    let count = indices.len();
    let total_sum: f64 = indices.iter().map(|index| targets[*index]).sum();
    let total_sq: f64 = indices.iter().map(|index| targets[*index].powi(2)).sum();
    let parent_sse = total_sq - total_sum * total_sum / count as f64;

    let mut best: Option<SplitChoice> = None;
    let mut order = indices.to_vec();
    for feature in 0..width {
        order.sort_by(|a, b| rows[*a][feature].total_cmp(&rows[*b][feature]));
        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for position in 0..count - 1 {
            let target = targets[order[position]];
            left_sum += target;
            left_sq += target * target;
            let left_count = position + 1;
            let right_count = count - left_count;
            if left_count < min_leaf || right_count < min_leaf {
                continue;
            }
            let current = rows[order[position]][feature];
            let next = rows[order[position + 1]][feature];
            if current == next {
                continue;
            }
            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let left_sse = left_sq - left_sum * left_sum / left_count as f64;
            let right_sse = right_sq - right_sum * right_sum / right_count as f64;
            let gain = parent_sse - left_sse - right_sse;
            if gain > 1e-12 && best.as_ref().map_or(true, |choice| gain > choice.gain) {
                best = Some(SplitChoice {
                    feature,
                    threshold: (current + next) / 2.0,
                    gain,
                });
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::{RegressionTree, TreeParams};

    fn step_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let rows = vec![vec![1.0], vec![2.0], vec![3.0], vec![10.0], vec![11.0], vec![12.0]];
        let targets = vec![50.0, 50.0, 50.0, 90.0, 90.0, 90.0];
        (rows, targets)
    }

    #[test]
    fn single_split_separates_step() {
        let (rows, targets) = step_data();
        let indices: Vec<usize> = (0..rows.len()).collect();
        let tree = RegressionTree::fit(&rows, &targets, &indices, TreeParams::default());
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.predict_row(&[2.5]), 50.0);
        assert_eq!(tree.predict_row(&[11.0]), 90.0);
        assert!(tree.impurity_decrease[0] > 0.0);
    }

    #[test]
    fn depth_limit_is_respected() {
        let rows: Vec<Vec<f64>> = (0..16).map(|value| vec![value as f64]).collect();
        let targets: Vec<f64> = (0..16).map(|value| (value * value) as f64).collect();
        let indices: Vec<usize> = (0..rows.len()).collect();
        let params = TreeParams {
            max_depth: Some(3),
            ..TreeParams::default()
        };
        let tree = RegressionTree::fit(&rows, &targets, &indices, params);
        assert!(tree.depth() <= 3);
    }

    #[test]
    fn constant_target_is_single_leaf() {
        let rows = vec![vec![1.0], vec![2.0], vec![3.0]];
        let targets = vec![70.0, 70.0, 70.0];
        let tree = RegressionTree::fit(&rows, &targets, &[0, 1, 2], TreeParams::default());
        assert_eq!(tree.nodes.len(), 1);
        assert_eq!(tree.predict_row(&[100.0]), 70.0);
    }
}
