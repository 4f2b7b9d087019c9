use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::{ModelError, Result};

/// One train/holdout split of `0..n_samples`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// K-fold splitter with optional seeded shuffling.
///
/// Fold sizes differ by at most one: the first `n % k` folds get one extra
/// row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KFold {
    n_splits: usize,
    shuffle: bool,
    seed: Option<u64>,
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        KFold {
            n_splits,
            shuffle: true,
            seed: None,
        }
    }

    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    pub fn split(&self, n_samples: usize) -> Result<Vec<FoldSplit>> {
        if self.n_splits < 2 {
            return Err(ModelError::invalid(format!(
                "n_folds must be at least 2, got {}",
                self.n_splits
            )));
        }
        if n_samples < self.n_splits {
            return Err(ModelError::invalid(format!(
                "n_samples ({}) must be >= n_folds ({})",
                n_samples, self.n_splits
            )));
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        if self.shuffle {
            let mut rng = match self.seed {
                Some(seed) => ChaCha8Rng::seed_from_u64(seed),
                None => ChaCha8Rng::from_entropy(),
            };
            indices.shuffle(&mut rng);
        }

        let base = n_samples / self.n_splits;
        let remainder = n_samples % self.n_splits;

        let mut splits = Vec::with_capacity(self.n_splits);
        let mut current = 0;
        for fold_idx in 0..self.n_splits {
            let fold_size = if fold_idx < remainder { base + 1 } else { base };
            let test_indices = indices[current..current + fold_size].to_vec();
            let train_indices = indices[..current]
                .iter()
                .chain(indices[current + fold_size..].iter())
                .copied()
                .collect();
            splits.push(FoldSplit {
                train_indices,
                test_indices,
                fold_idx,
            });
            current += fold_size;
        }
        Ok(splits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holdouts_partition_all_rows() {
        let splits = KFold::new(3).seed(Some(7)).split(10).unwrap();
        assert_eq!(splits.len(), 3);

        let mut seen: Vec<usize> = splits.iter().flat_map(|s| s.test_indices.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());

        let sizes: Vec<usize> = splits.iter().map(|s| s.test_indices.len()).collect();
        assert_eq!(sizes, vec![4, 3, 3]);

        for s in &splits {
            assert_eq!(s.train_indices.len() + s.test_indices.len(), 10);
            assert!(s.test_indices.iter().all(|i| !s.train_indices.contains(i)));
        }
    }

    #[test]
    fn same_seed_same_folds() {
        let a = KFold::new(5).seed(Some(156)).split(23).unwrap();
        let b = KFold::new(5).seed(Some(156)).split(23).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn unshuffled_folds_are_contiguous() {
        let splits = KFold::new(2).shuffle(false).split(4).unwrap();
        assert_eq!(splits[0].test_indices, vec![0, 1]);
        assert_eq!(splits[1].test_indices, vec![2, 3]);
    }

    #[test]
    fn rejects_bad_fold_counts() {
        assert!(matches!(KFold::new(1).split(10), Err(ModelError::InvalidInput(_))));
        assert!(matches!(KFold::new(5).split(4), Err(ModelError::InvalidInput(_))));
    }
}
