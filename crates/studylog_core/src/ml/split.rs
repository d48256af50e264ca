//! Row index splitting for hold-out and k-fold evaluation.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Hold-out share by dataset size: 0.2 below 10 rows, 0.25 below 20, else 0.3.
pub fn test_fraction(rows: usize) -> f64 {
    if rows < 10 {
        0.2
    } else if rows < 20 {
        0.25
    } else {
        0.3
    }
}

/// Shuffles `0..rows` with a seeded RNG and splits off `ceil(rows · fraction)`
/// test rows. Both sides keep at least one row when `rows >= 2`.
pub fn train_test_split(rows: usize, fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..rows).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let mut test_len = (rows as f64 * fraction).ceil() as usize;
    if rows >= 2 {
        test_len = test_len.clamp(1, rows - 1);
    } else {
        test_len = 0;
    }
    let train = indices.split_off(test_len);
    (train, indices)
}

/// Contiguous, unshuffled folds; the first `rows % k` folds get one extra row.
///
/// Returns `(train, validation)` index pairs. `k < 2` or `k > rows` yields
/// no folds.
pub fn k_fold(rows: usize, k: usize) -> Vec<(Vec<usize>, Vec<usize>)> {
    if k < 2 || k > rows {
        return Vec::new();
    }
    let base = rows / k;
    let extra = rows % k;
    let mut folds = Vec::with_capacity(k);
    let mut start = 0;
    for fold in 0..k {
        let len = base + usize::from(fold < extra);
        let end = start + len;
        let validation: Vec<usize> = (start..end).collect();
        let train: Vec<usize> = (0..start).chain(end..rows).collect();
        folds.push((train, validation));
        start = end;
    }
    folds
}

#[cfg(test)]
mod tests {
    use super::{k_fold, test_fraction, train_test_split};

    #[test]
    fn split_is_seeded_and_disjoint() {
        let (train_a, test_a) = train_test_split(12, test_fraction(12), 42);
        let (train_b, test_b) = train_test_split(12, test_fraction(12), 42);
        assert_eq!(train_a, train_b);
        assert_eq!(test_a, test_b);
        assert_eq!(test_a.len(), 3);
        assert!(test_a.iter().all(|index| !train_a.contains(index)));
    }

    #[test]
    fn small_split_keeps_one_test_row() {
        let (train, test) = train_test_split(5, 0.2, 42);
        assert_eq!(test.len(), 1);
        assert_eq!(train.len(), 4);
    }

    #[test]
    fn folds_cover_every_row_once() {
        let folds = k_fold(7, 3);
        assert_eq!(folds.len(), 3);
        let sizes: Vec<usize> = folds.iter().map(|(_, validation)| validation.len()).collect();
        assert_eq!(sizes, vec![3, 2, 2]);
        let mut seen: Vec<usize> = folds.into_iter().flat_map(|(_, v)| v).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn degenerate_fold_counts_yield_nothing() {
        assert!(k_fold(3, 1).is_empty());
        assert!(k_fold(3, 4).is_empty());
    }
}
