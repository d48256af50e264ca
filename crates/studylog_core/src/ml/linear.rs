//! Ordinary least squares and ridge regression.
//!
//! Both solve the centered normal equations `(XᵀX + αI)β = Xᵀy`, leaving
//! the intercept unpenalized. Rank-deficient systems resolve free columns
//! to zero instead of failing.

use serde::{Deserialize, Serialize};

const PIVOT_EPSILON: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    pub alpha: f64,
}

impl LinearModel {
    /// `alpha = 0.0` is plain least squares.
    pub fn fit(rows: &[Vec<f64>], targets: &[f64], alpha: f64) -> Self {
        let width = rows.first().map_or(0, Vec::len);
        if rows.is_empty() || rows.len() != targets.len() {
            return Self {
                coefficients: vec![0.0; width],
                intercept: 0.0,
                alpha,
            };
        }

        let n = rows.len() as f64;
        let mut column_means = vec![0.0; width];
        for row in rows {
            for (mean, value) in column_means.iter_mut().zip(row) {
                *mean += value / n;
            }
        }
        let target_mean = targets.iter().sum::<f64>() / n;

        let mut gram = vec![vec![0.0; width]; width];
        let mut moment = vec![0.0; width];
        for (row, target) in rows.iter().zip(targets) {
            let centered: Vec<f64> = row
                .iter()
                .zip(&column_means)
                .map(|(value, mean)| value - mean)
                .collect();
            let dy = target - target_mean;
            for i in 0..width {
                moment[i] += centered[i] * dy;
                for j in 0..width {
                    gram[i][j] += centered[i] * centered[j];
                }
            }
        }
        for (i, row) in gram.iter_mut().enumerate() {
            row[i] += alpha;
        }

        let coefficients = solve_normal_equations(gram, moment);
        let intercept = target_mean
            - coefficients
                .iter()
                .zip(&column_means)
                .map(|(coefficient, mean)| coefficient * mean)
                .sum::<f64>();
        Self {
            coefficients,
            intercept,
            alpha,
        }
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(coefficient, value)| coefficient * value)
                .sum::<f64>()
    }
}

/// Gauss-Jordan elimination with partial pivoting.
///
/// Columns without a usable pivot are treated as free and set to zero,
/// which gives a basic solution for consistent singular systems.
fn solve_normal_equations(mut matrix: Vec<Vec<f64>>, mut rhs: Vec<f64>) -> Vec<f64> {
    let size = rhs.len();
    let mut solution = vec![0.0; size];
    let mut pivot_columns = Vec::with_capacity(size);
    let mut row = 0;

    for column in 0..size {
        if row == size {
            break;
        }
        let Some(best) = (row..size).max_by(|a, b| {
            matrix[*a][column]
                .abs()
                .total_cmp(&matrix[*b][column].abs())
        }) else {
            break;
        };
        if matrix[best][column].abs() < PIVOT_EPSILON {
            continue;
        }
        matrix.swap(row, best);
        rhs.swap(row, best);

        let pivot = matrix[row][column];
        for value in matrix[row].iter_mut() {
            *value /= pivot;
        }
        rhs[row] /= pivot;
        let normalized = matrix[row].clone();
        let normalized_rhs = rhs[row];

        for other in 0..size {
            if other == row {
                continue;
            }
            let factor = matrix[other][column];
            if factor == 0.0 {
                continue;
            }
            for (value, pivot_value) in matrix[other].iter_mut().zip(&normalized) {
                *value -= factor * pivot_value;
            }
            rhs[other] -= factor * normalized_rhs;
        }
        pivot_columns.push(column);
        row += 1;
    }

    for (pivot_row, column) in pivot_columns.into_iter().enumerate() {
        solution[column] = rhs[pivot_row];
    }
    solution
}
