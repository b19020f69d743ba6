use crate::clust::Clustering;
use crate::error::{Error, Result};
use crate::folds::Folds;
use crate::imm::InfiniteMixture;
use crate::mixture::MixtureUpdater;
use crate::prelude::Density;

use nalgebra::DMatrix;
use rand::prelude::*;
use tracing::trace;

/// Draws one column index per row of `like` with probability proportional to its entries.
///
/// A row whose entries do not add up to a positive finite total is an error.
pub fn sample_categorical<R: Rng>(like: &DMatrix<f64>, rng: &mut R) -> Result<Vec<usize>> {
    let mut draws = Vec::with_capacity(like.nrows());
    for (item, row) in like.row_iter().enumerate() {
        if row.iter().any(|w| *w < 0.0 || !w.is_finite()) {
            return Err(Error::DegenerateLikelihood { item });
        }
        let total: f64 = row.iter().sum();
        if !(total > 0.0) || !total.is_finite() {
            return Err(Error::DegenerateLikelihood { item });
        }
        let target = rng.random::<f64>() * total;
        let mut cumulative = 0.0;
        let mut last_positive = 0;
        let mut draw = None;
        for (j, w) in row.iter().enumerate() {
            if *w > 0.0 {
                last_positive = j;
                cumulative += w;
                if target < cumulative {
                    draw = Some(j);
                    break;
                }
            }
        }
        // Rounding can leave the target just past the last cumulative sum.
        draws.push(draw.unwrap_or(last_positive));
    }
    Ok(draws)
}

//

/// The outcomes an indicator can take besides the `k` active components and a new one.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcomes {
    Components,
    /// A background class with a fixed density, chosen a priori with a per-item probability.
    WithNull {
        density: Density,
        probabilities: Vec<f64>,
    },
}

impl Outcomes {
    pub fn has_null(&self) -> bool {
        matches!(self, Outcomes::WithNull { .. })
    }

    /// The outcome set restricted to `items`, in that order.
    pub fn select(&self, items: &[usize]) -> Self {
        match self {
            Outcomes::Components => Outcomes::Components,
            Outcomes::WithNull {
                density,
                probabilities,
            } => Outcomes::WithNull {
                density: *density,
                probabilities: items.iter().map(|&i| probabilities[i]).collect(),
            },
        }
    }

    /// Adds the null column in front of `like` and scales the rest by the probability
    /// of not being null.
    pub fn conditional_likelihood(&self, like: DMatrix<f64>) -> DMatrix<f64> {
        match self {
            Outcomes::Components => like,
            Outcomes::WithNull {
                density,
                probabilities,
            } => DMatrix::from_fn(like.nrows(), like.ncols() + 1, |i, j| {
                let p = probabilities[i];
                if j == 0 {
                    p * *density
                } else {
                    (1.0 - p) * like[(i, j - 1)]
                }
            }),
        }
    }

    /// Turns column draws into labels given `k` active components. Every draw of the
    /// new-component column gets its own fresh label `k, k + 1, ...`.
    pub fn assign(&self, draws: &[usize], k: usize) -> Clustering {
        let offset = usize::from(self.has_null());
        let mut next = k;
        let labels = draws
            .iter()
            .map(|&draw| {
                if draw < offset {
                    None
                } else if draw - offset < k {
                    Some(draw - offset)
                } else {
                    next += 1;
                    Some(next - 1)
                }
            })
            .collect();
        Clustering::from_vector(labels)
    }
}

//

/// One Gibbs sweep over all observations: draws the indicators, compacts them and
/// redraws the parameters. Returns the total weighted likelihood of every observation
/// before the sweep.
pub fn simple_update<M, R>(
    model: &mut InfiniteMixture<M>,
    x: &DMatrix<f64>,
    clustering: &mut Clustering,
    plike: &[f64],
    outcomes: &Outcomes,
    rng: &mut R,
) -> Result<Vec<f64>>
where
    M: MixtureUpdater,
    R: Rng,
{
    let like = model.likelihood(x, plike)?;
    let totals = row_sums(&like);
    *clustering = model.draw_indicators(like, outcomes, rng)?;
    model.reduce(clustering);
    model.update(x, clustering, rng)?;
    Ok(totals)
}

/// One sweep with the parameters refit on all folds but one before the indicators of the
/// held-out fold are drawn. Returns the held-out likelihood of every observation.
pub fn cross_validated_update<M, R>(
    model: &mut InfiniteMixture<M>,
    x: &DMatrix<f64>,
    clustering: &mut Clustering,
    plike: &[f64],
    outcomes: &Outcomes,
    folds: &Folds,
    rng: &mut R,
) -> Result<Vec<f64>>
where
    M: MixtureUpdater,
    R: Rng,
{
    let mut held_out = vec![0.0; x.nrows()];
    for fold in 0..folds.n_folds() {
        let (test, train) = folds.split(fold);

        let mut train_clustering = clustering.subset(&train);
        model.reduce(&mut train_clustering);
        clustering.scatter(&train, &train_clustering);
        model.update(&x.select_rows(&train), &train_clustering, rng)?;

        let test_plike: Vec<f64> = test.iter().map(|&i| plike[i]).collect();
        let like = model.likelihood(&x.select_rows(&test), &test_plike)?;
        for (&item, total) in test.iter().zip(row_sums(&like)) {
            held_out[item] = total;
        }
        let drawn = model.draw_indicators(like, &outcomes.select(&test), rng)?;
        clustering.scatter(&test, &drawn);
        trace!(
            fold,
            n_held_out = test.len(),
            k = model.n_components(),
            "refit without fold"
        );
    }
    Ok(held_out)
}

pub(crate) fn row_sums(like: &DMatrix<f64>) -> Vec<f64> {
    like.row_iter().map(|row| row.sum()).collect()
}

#[cfg(test)]
mod tests_mcmc {
    use super::*;
    use crate::prelude::{seeded_rng, Mass};
    use crate::testing::assert_goodness_of_fit;
    use proptest::prelude::*;

    #[test]
    fn test_sample_categorical_goodness_of_fit() {
        let mut rng = seeded_rng(17);
        let weights = [0.5, 0.0, 2.0, 1.0, 0.25, 0.25];
        let total: f64 = weights.iter().sum();
        let probabilities: Vec<f64> = weights.iter().map(|w| w / total).collect();
        let like = DMatrix::from_row_slice(1, weights.len(), &weights);
        let sample_closure = || sample_categorical(&like, &mut rng).unwrap()[0];
        if let Some(string) = assert_goodness_of_fit(10000, &probabilities, sample_closure, 0.001)
        {
            panic!("{}", string);
        }
    }

    #[test]
    fn test_sample_categorical_never_picks_zero_weight() {
        let mut rng = seeded_rng(2);
        let like = DMatrix::from_row_slice(3, 3, &[0.0, 1.0, 0.0, 1e-300, 0.0, 0.0, 0.0, 0.0, 7.0]);
        for _ in 0..1000 {
            assert_eq!(sample_categorical(&like, &mut rng).unwrap(), vec![1, 0, 2]);
        }
    }

    #[test]
    fn test_sample_categorical_degenerate_rows() {
        let mut rng = seeded_rng(3);
        let zero = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 0.0, 0.0]);
        assert_eq!(
            sample_categorical(&zero, &mut rng),
            Err(Error::DegenerateLikelihood { item: 1 })
        );
        let nan = DMatrix::from_row_slice(1, 2, &[f64::NAN, 1.0]);
        assert_eq!(
            sample_categorical(&nan, &mut rng),
            Err(Error::DegenerateLikelihood { item: 0 })
        );
        let negative = DMatrix::from_row_slice(1, 2, &[-1.0, 2.0]);
        assert_eq!(
            sample_categorical(&negative, &mut rng),
            Err(Error::DegenerateLikelihood { item: 0 })
        );
    }

    #[test]
    fn test_assign() {
        let clustering = Outcomes::Components.assign(&[0, 2, 1, 2, 0, 2], 2);
        assert_eq!(
            clustering.labels(),
            &[Some(0), Some(2), Some(1), Some(3), Some(0), Some(4)]
        );
        let outcomes = Outcomes::WithNull {
            density: Density::new(1.0),
            probabilities: vec![0.5; 5],
        };
        let clustering = outcomes.assign(&[0, 1, 2, 2, 0], 1);
        assert_eq!(clustering.labels(), &[None, Some(0), Some(1), Some(2), None]);
    }

    #[test]
    fn test_assign_without_components() {
        let clustering = Outcomes::Components.assign(&[0, 0, 0], 0);
        assert_eq!(clustering.labels(), &[Some(0), Some(1), Some(2)]);
        assert_eq!(clustering.n_clusters(), 3);
    }

    #[test]
    fn test_conditional_likelihood() {
        let like = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(Outcomes::Components.conditional_likelihood(like.clone()), like);
        let outcomes = Outcomes::WithNull {
            density: Density::new(2.0),
            probabilities: vec![0.25, 1.0],
        };
        let conditional = outcomes.conditional_likelihood(like);
        assert_eq!(
            conditional,
            DMatrix::from_row_slice(2, 3, &[0.5, 0.75, 1.5, 2.0, 0.0, 0.0])
        );
    }

    #[test]
    fn test_select() {
        let outcomes = Outcomes::WithNull {
            density: Density::new(1.0),
            probabilities: vec![0.1, 0.2, 0.3, 0.4],
        };
        assert_eq!(
            outcomes.select(&[3, 1]),
            Outcomes::WithNull {
                density: Density::new(1.0),
                probabilities: vec![0.4, 0.2],
            }
        );
        assert_eq!(Outcomes::Components.select(&[0]), Outcomes::Components);
    }

    fn two_groups() -> DMatrix<f64> {
        DMatrix::from_fn(40, 1, |i, _| {
            let center = if i < 20 { -3.0 } else { 3.0 };
            center + 0.05 * (i % 5) as f64
        })
    }

    #[test]
    fn test_simple_update_keeps_state_consistent() {
        let mut rng = seeded_rng(8);
        let x = two_groups();
        let mut model = InfiniteMixture::new(Mass::new(0.5), 1);
        model.set_priors(&x).unwrap();
        let plike = model.likelihood_under_the_prior(&x).unwrap();
        let mut clustering = Clustering::one_cluster(40);
        for _ in 0..20 {
            let like = simple_update(
                &mut model,
                &x,
                &mut clustering,
                &plike,
                &Outcomes::Components,
                &mut rng,
            )
            .unwrap();
            assert_eq!(like.len(), 40);
            assert!(like.iter().all(|l| *l > 0.0 && l.is_finite()));
            assert_eq!(clustering.n_clusters(), model.n_components());
            assert_eq!(model.weights().len(), model.n_components() + 1);
            assert!(clustering.sizes().iter().all(|&size| size > 0));
        }
    }

    #[test]
    fn test_cross_validated_update_leave_one_out() {
        let mut rng = seeded_rng(9);
        let x = two_groups();
        let mut model = InfiniteMixture::new(Mass::new(0.5), 1);
        model.set_priors(&x).unwrap();
        let plike = model.likelihood_under_the_prior(&x).unwrap();
        let mut clustering = Clustering::one_cluster(40);
        let folds = Folds::random(40, 40, &mut rng).unwrap();
        let like = cross_validated_update(
            &mut model,
            &x,
            &mut clustering,
            &plike,
            &Outcomes::Components,
            &folds,
            &mut rng,
        )
        .unwrap();
        assert!(like.iter().all(|l| *l > 0.0 && l.is_finite()));
        assert_eq!(clustering.n_null(), 0);
    }

    #[test]
    fn test_cross_validated_update_single_fold() {
        let mut rng = seeded_rng(10);
        let x = two_groups();
        let mut model = InfiniteMixture::new(Mass::new(0.5), 1);
        model.set_priors(&x).unwrap();
        let plike = model.likelihood_under_the_prior(&x).unwrap();
        let mut clustering = Clustering::one_cluster(40);
        let folds = Folds::random(1, 40, &mut rng).unwrap();
        let like = cross_validated_update(
            &mut model,
            &x,
            &mut clustering,
            &plike,
            &Outcomes::Components,
            &folds,
            &mut rng,
        )
        .unwrap();
        // Nothing is left to train on, so only the prior predictive remains.
        assert_eq!(model.n_components(), 0);
        for (l, p) in like.iter().zip(plike.iter()) {
            assert!((l - p).abs() <= 1e-12 * p);
        }
        let mut labels: Vec<usize> = clustering.labels().iter().flatten().copied().collect();
        labels.sort_unstable();
        assert_eq!(labels, (0..40).collect::<Vec<_>>());
    }

    proptest! {
        #[test]
        fn prop_new_labels_are_distinct(
            draws in prop::collection::vec(0_usize..5, 0..50),
            with_null in any::<bool>(),
        ) {
            let k = if with_null { 3 } else { 4 };
            let outcomes = if with_null {
                Outcomes::WithNull { density: Density::new(1.0), probabilities: vec![0.5; draws.len()] }
            } else {
                Outcomes::Components
            };
            let clustering = outcomes.assign(&draws, k);
            let new_column = if with_null { k + 1 } else { k };
            let mut fresh: Vec<usize> = draws
                .iter()
                .zip(clustering.labels())
                .filter(|(draw, _)| **draw == new_column)
                .map(|(_, label)| label.unwrap())
                .collect();
            let n_new = fresh.len();
            prop_assert!(fresh.iter().all(|&label| label >= k));
            fresh.sort_unstable();
            fresh.dedup();
            prop_assert_eq!(fresh.len(), n_new);
            prop_assert_eq!(clustering.n_null(), if with_null { draws.iter().filter(|d| **d == 0).count() } else { 0 });
        }
    }
}
