// Cross-validation folds

use crate::error::{Error, Result};

use rand::seq::SliceRandom;
use rand::Rng;

/// How observations are split into cross-validation folds.
#[derive(Debug, Clone, PartialEq)]
pub enum KFold {
    /// Random partition into this many folds, redrawn at every sweep.
    Count(usize),
    /// One fold label per observation; each distinct value is a fold.
    Labels(Vec<i64>),
}

impl KFold {
    /// Checks the configuration against the number of observations.
    pub fn validate(&self, n_items: usize) -> Result<()> {
        match self {
            KFold::Count(n_folds) => {
                if *n_folds == 0 || *n_folds > n_items {
                    Err(Error::InvalidFoldCount {
                        n_folds: *n_folds,
                        n_items,
                    })
                } else {
                    Ok(())
                }
            }
            KFold::Labels(labels) => {
                if labels.len() != n_items {
                    Err(Error::LengthMismatch {
                        what: "fold labels",
                        expected: n_items,
                        actual: labels.len(),
                    })
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// Fold index of every observation; folds are `0..n_folds` and none is empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Folds {
    fold_of: Vec<usize>,
    n_folds: usize,
}

impl Folds {
    pub fn new<R: Rng>(kfold: &KFold, n_items: usize, rng: &mut R) -> Result<Self> {
        match kfold {
            KFold::Count(n_folds) => Self::random(*n_folds, n_items, rng),
            KFold::Labels(labels) => Self::from_labels(labels, n_items),
        }
    }

    /// Shuffles the items and cuts them into `n_folds` contiguous blocks whose sizes
    /// differ by at most one; the first `n_items % n_folds` blocks are the larger ones.
    pub fn random<R: Rng>(n_folds: usize, n_items: usize, rng: &mut R) -> Result<Self> {
        KFold::Count(n_folds).validate(n_items)?;
        let mut permutation: Vec<usize> = (0..n_items).collect();
        permutation.shuffle(rng);
        let small = n_items / n_folds;
        let n_large = n_items % n_folds;
        let mut fold_of = vec![0; n_items];
        let mut start = 0;
        for fold in 0..n_folds {
            let size = if fold < n_large { small + 1 } else { small };
            for &item in &permutation[start..start + size] {
                fold_of[item] = fold;
            }
            start += size;
        }
        Ok(Self { fold_of, n_folds })
    }

    /// Folds numbered by the rank of each distinct label.
    pub fn from_labels(labels: &[i64], n_items: usize) -> Result<Self> {
        KFold::Labels(labels.to_vec()).validate(n_items)?;
        let mut distinct = labels.to_vec();
        distinct.sort_unstable();
        distinct.dedup();
        let fold_of = labels
            .iter()
            .map(|label| distinct.binary_search(label).unwrap_or_default())
            .collect();
        Ok(Self {
            fold_of,
            n_folds: distinct.len(),
        })
    }

    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    pub fn n_items(&self) -> usize {
        self.fold_of.len()
    }

    pub fn fold_of(&self, item: usize) -> usize {
        self.fold_of[item]
    }

    /// Held-out and training items of `fold`, each in increasing order.
    pub fn split(&self, fold: usize) -> (Vec<usize>, Vec<usize>) {
        (0..self.fold_of.len()).partition(|&item| self.fold_of[item] == fold)
    }
}
