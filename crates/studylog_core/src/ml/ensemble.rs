//! Tree ensembles: bagged random forest and squared-loss gradient boosting.

use crate::ml::tree::{RegressionTree, TreeParams};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

pub const FOREST_TREES: usize = 100;
pub const BOOSTING_STAGES: usize = 100;
pub const BOOSTING_LEARNING_RATE: f64 = 0.1;
pub const BOOSTING_MAX_DEPTH: usize = 3;

/// Mean of fully grown trees, each fitted on a bootstrap resample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub trees: Vec<RegressionTree>,
}

impl RandomForest {
    pub fn fit(rows: &[Vec<f64>], targets: &[f64], tree_count: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let count = rows.len();
        let mut trees = Vec::with_capacity(tree_count);
        for _ in 0..tree_count {
            let sample: Vec<usize> = if count == 0 {
                Vec::new()
            } else {
                (0..count).map(|_| rng.gen_range(0..count)).collect()
            };
            trees.push(RegressionTree::fit(
                rows,
                targets,
                &sample,
                TreeParams::default(),
            ));
        }
        Self { trees }
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|tree| tree.predict_row(row)).sum::<f64>() / self.trees.len() as f64
    }

    pub fn feature_importances(&self) -> Vec<f64> {
        averaged_importances(&self.trees)
    }
}

/// Additive stages of shallow trees fitted to residuals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    pub initial: f64,
    pub learning_rate: f64,
    pub stages: Vec<RegressionTree>,
}

impl GradientBoosting {
    pub fn fit(
        rows: &[Vec<f64>],
        targets: &[f64],
        stage_count: usize,
        learning_rate: f64,
        max_depth: usize,
    ) -> Self {
        let initial = if targets.is_empty() {
            0.0
        } else {
            targets.iter().sum::<f64>() / targets.len() as f64
        };
        let indices: Vec<usize> = (0..rows.len()).collect();
        let params = TreeParams {
            max_depth: Some(max_depth),
            ..TreeParams::default()
        };

        let mut predictions = vec![initial; targets.len()];
        let mut stages = Vec::with_capacity(stage_count);
        for _ in 0..stage_count {
            let residuals: Vec<f64> = targets
                .iter()
                .zip(&predictions)
                .map(|(target, prediction)| target - prediction)
                .collect();
            let tree = RegressionTree::fit(rows, &residuals, &indices, params);
            for (prediction, row) in predictions.iter_mut().zip(rows) {
                *prediction += learning_rate * tree.predict_row(row);
            }
            stages.push(tree);
        }
        Self {
            initial,
            learning_rate,
            stages,
        }
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        self.initial
            + self
                .stages
                .iter()
                .map(|tree| self.learning_rate * tree.predict_row(row))
                .sum::<f64>()
    }

    pub fn feature_importances(&self) -> Vec<f64> {
        averaged_importances(&self.stages)
    }
}

/// Per-tree normalized impurity decrease, averaged and renormalized to sum 1.
fn averaged_importances(trees: &[RegressionTree]) -> Vec<f64> {
    let width = trees
        .first()
        .map_or(0, |tree| tree.impurity_decrease.len());
    let mut totals = vec![0.0; width];
    for tree in trees {
        let sum: f64 = tree.impurity_decrease.iter().sum();
        if sum <= 0.0 {
            continue;
        }
        for (total, decrease) in totals.iter_mut().zip(&tree.impurity_decrease) {
            *total += decrease / sum;
        }
    }
    let grand: f64 = totals.iter().sum();
    if grand > 0.0 {
        for total in &mut totals {
            *total /= grand;
        }
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::{GradientBoosting, RandomForest};

    fn data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let rows: Vec<Vec<f64>> = (0..20)
            .map(|value| vec![value as f64, (value % 3) as f64])
            .collect();
        let targets: Vec<f64> = (0..20).map(|value| 50.0 + 2.0 * value as f64).collect();
        (rows, targets)
    }

    #[test]
    fn forest_is_deterministic_for_a_seed() {
        let (rows, targets) = data();
        let a = RandomForest::fit(&rows, &targets, 10, 42);
        let b = RandomForest::fit(&rows, &targets, 10, 42);
        assert_eq!(a, b);
        let prediction = a.predict_row(&[10.0, 1.0]);
        assert!((50.0..=90.0).contains(&prediction));
    }

    #[test]
    fn boosting_fits_training_data_closely() {
        let (rows, targets) = data();
        let model = GradientBoosting::fit(&rows, &targets, 100, 0.1, 3);
        let error = (model.predict_row(&rows[5]) - targets[5]).abs();
        assert!(error < 2.0, "error {error}");
    }

    #[test]
    fn importances_sum_to_one_and_favor_signal() {
        let (rows, targets) = data();
        let importances = RandomForest::fit(&rows, &targets, 20, 7).feature_importances();
        let sum: f64 = importances.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(importances[0] > importances[1]);
    }
}
