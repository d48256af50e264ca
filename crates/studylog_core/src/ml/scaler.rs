//! Per-column standardization.

use serde::{Deserialize, Serialize};

/// Zero-mean, unit-variance transform fitted on training rows.
///
/// Columns with zero variance keep scale `1.0` so they map to `0.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
}

impl StandardScaler {
    /// Fits population mean/std per column. Empty input yields an empty scaler.
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let Some(first) = rows.first() else {
            return Self {
                means: Vec::new(),
                scales: Vec::new(),
            };
        };
        let columns = first.len();
        let n = rows.len() as f64;
        let mut means = vec![0.0; columns];
        for row in rows {
            for (mean, value) in means.iter_mut().zip(row) {
                *mean += value / n;
            }
        }
        let mut scales = vec![0.0; columns];
        for row in rows {
            for (column, value) in row.iter().enumerate() {
                scales[column] += (value - means[column]).powi(2) / n;
            }
        }
        for scale in &mut scales {
            *scale = scale.sqrt();
            if *scale == 0.0 || !scale.is_finite() {
                *scale = 1.0;
            }
        }
        Self { means, scales }
    }

    pub fn width(&self) -> usize {
        self.means.len()
    }

    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(value, (mean, scale))| (value - mean) / scale)
            .collect()
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }
}
