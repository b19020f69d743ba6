// Infinite Gaussian mixture sampler with an optional null class

use crate::clust::Clustering;
use crate::error::{Error, Result};
use crate::folds::{Folds, KFold};
use crate::mcmc::{cross_validated_update, row_sums, simple_update, Outcomes};
use crate::mixture::{GaussianMixture, MixtureUpdater};
use crate::prelude::{Density, Mass};
use crate::prior::NormalWishart;
use crate::wgt::Weights;

use nalgebra::DMatrix;
use rand::Rng;
use std::borrow::Cow;
use tracing::{debug, trace};

/// Settings of one sampling call.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleOptions {
    pub n_iterations: usize,
    /// Points where the averaged density is reported instead of the observations.
    pub sampling_points: Option<DMatrix<f64>>,
    /// Restart from a single component holding every observation.
    pub init: bool,
    /// Cross-validated sweeps when set.
    pub kfold: Option<KFold>,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            n_iterations: 1,
            sampling_points: None,
            init: false,
            kfold: None,
        }
    }
}

impl SampleOptions {
    pub fn new(n_iterations: usize) -> Self {
        Self {
            n_iterations,
            ..Self::default()
        }
    }

    pub fn with_sampling_points(mut self, points: DMatrix<f64>) -> Self {
        self.sampling_points = Some(points);
        self
    }

    pub fn with_init(mut self, init: bool) -> Self {
        self.init = init;
        self
    }

    pub fn with_kfold(mut self, kfold: KFold) -> Self {
        self.kfold = Some(kfold);
        self
    }
}

/// Output of `InfiniteMixture::sample_with_null`.
#[derive(Debug, Clone, PartialEq)]
pub struct NullSample {
    /// Averaged density of the non-null part of the model.
    pub density: Vec<f64>,
    /// Fraction of sweeps in which each observation was assigned to the null class.
    pub null_posterior: Vec<f64>,
}

/// A Dirichlet process mixture of Gaussians.
///
/// `k` is the number of active components; the weights have `k + 1` entries, the last
/// being the mass of opening a new component, whose density is the prior predictive.
#[derive(Debug, Clone)]
pub struct InfiniteMixture<M: MixtureUpdater = GaussianMixture> {
    mass: Mass,
    dim: usize,
    prior: Option<NormalWishart>,
    prior_density: Option<Density>,
    null_density: Option<Density>,
    k: usize,
    mixture: M,
}

impl InfiniteMixture<GaussianMixture> {
    pub fn new(mass: Mass, dim: usize) -> Self {
        Self::with_updater(mass, dim, GaussianMixture::new())
    }
}

impl<M: MixtureUpdater> InfiniteMixture<M> {
    pub fn with_updater(mass: Mass, dim: usize, mixture: M) -> Self {
        Self {
            mass,
            dim,
            prior: None,
            prior_density: None,
            null_density: None,
            k: mixture.n_components(),
            mixture,
        }
    }

    pub fn mass(&self) -> Mass {
        self.mass
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn n_components(&self) -> usize {
        self.k
    }

    pub fn weights(&self) -> &Weights {
        self.mixture.weights()
    }

    pub fn mixture(&self) -> &M {
        &self.mixture
    }

    pub fn prior(&self) -> Option<&NormalWishart> {
        self.prior.as_ref()
    }

    pub fn null_density(&self) -> Option<Density> {
        self.null_density
    }

    pub fn prior_density(&self) -> Option<Density> {
        self.prior_density
    }

    fn check_dim(&self, x: &DMatrix<f64>) -> Result<()> {
        if x.ncols() != self.dim {
            Err(Error::DimensionMismatch {
                expected: self.dim,
                actual: x.ncols(),
            })
        } else {
            Ok(())
        }
    }

    /// Sets data-driven priors from the empirical moments of `x`.
    pub fn set_priors(&mut self, x: &DMatrix<f64>) -> Result<()> {
        self.check_dim(x)?;
        let prior = NormalWishart::from_data(x)?;
        debug!(
            n_items = x.nrows(),
            dim = self.dim,
            dof = prior.dof(),
            shrinkage = prior.shrinkage(),
            "set priors from data"
        );
        self.prior = Some(prior);
        Ok(())
    }

    pub fn set_prior(&mut self, prior: NormalWishart) -> Result<()> {
        if prior.dim() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                actual: prior.dim(),
            });
        }
        self.prior = Some(prior);
        Ok(())
    }

    /// Fixes the null density and the prior predictive density to constants. `None`
    /// leaves the null class unset and restores the prior predictive computation.
    pub fn set_constant_densities(
        &mut self,
        null_density: Option<Density>,
        prior_density: Option<Density>,
    ) {
        self.null_density = null_density;
        self.prior_density = prior_density;
    }

    /// Density of every row of `x` under the prior predictive, or the constant prior
    /// density when one is set.
    pub fn likelihood_under_the_prior(&self, x: &DMatrix<f64>) -> Result<Vec<f64>> {
        self.check_dim(x)?;
        match self.prior_density {
            Some(density) => Ok(vec![density.unwrap(); x.nrows()]),
            None => self.prior.as_ref().ok_or(Error::PriorsNotSet)?.predictive(x),
        }
    }

    /// Weighted likelihood of every row of `x` under each of the `k` components, followed
    /// by a column for a new component with the prior likelihood `plike`.
    pub fn likelihood(&self, x: &DMatrix<f64>, plike: &[f64]) -> Result<DMatrix<f64>> {
        self.check_dim(x)?;
        if plike.len() != x.nrows() {
            return Err(Error::LengthMismatch {
                what: "prior likelihood",
                expected: x.nrows(),
                actual: plike.len(),
            });
        }
        let weights = self.mixture.weights();
        if weights.len() != self.k + 1 {
            return Err(Error::LabelOutOfRange {
                label: self.k,
                n_components: weights.n_components(),
            });
        }
        let unweighted = self.mixture.unweighted_likelihood(x)?;
        Ok(DMatrix::from_fn(x.nrows(), self.k + 1, |i, j| {
            let like = if j < self.k { unweighted[(i, j)] } else { plike[i] };
            like * weights[j]
        }))
    }

    /// Draws new indicators from the weighted likelihood `like` of the rows it covers.
    pub fn draw_indicators<R: Rng>(
        &self,
        like: DMatrix<f64>,
        outcomes: &Outcomes,
        rng: &mut R,
    ) -> Result<Clustering> {
        let conditional = outcomes.conditional_likelihood(like);
        let draws = self.mixture.sample_indicator(&conditional, rng)?;
        Ok(outcomes.assign(&draws, self.k))
    }

    /// Removes empty components from `clustering` and sets `k` to the number left.
    pub fn reduce(&mut self, clustering: &mut Clustering) {
        clustering.reduce();
        self.k = clustering.n_clusters();
    }

    /// Redraws the parameters of the `k` components given the observations `x` and
    /// their compacted assignment.
    pub fn update<R: Rng>(
        &mut self,
        x: &DMatrix<f64>,
        clustering: &Clustering,
        rng: &mut R,
    ) -> Result<()> {
        let priors = self
            .prior
            .as_ref()
            .ok_or(Error::PriorsNotSet)?
            .expand(self.k);
        self.mixture.update(x, clustering, &priors, self.mass, rng)
    }

    /// Density of the current mixture, new-component term included, at every row of `points`.
    pub fn mixture_density(&self, points: &DMatrix<f64>) -> Result<Vec<f64>> {
        let plike = self.likelihood_under_the_prior(points)?;
        Ok(row_sums(&self.likelihood(points, &plike)?))
    }

    /// Runs `options.n_iterations` sweeps and returns the averaged density at the
    /// observations, or at the sampling points when given.
    pub fn sample<R: Rng>(
        &mut self,
        x: &DMatrix<f64>,
        options: &SampleOptions,
        rng: &mut R,
    ) -> Result<Vec<f64>> {
        let (density, _) = self.run(x, &Outcomes::Components, options, rng)?;
        Ok(density)
    }

    /// Like `sample` with an extra null outcome of fixed density; `null_probabilities`
    /// holds the prior probability of each observation being null.
    pub fn sample_with_null<R: Rng>(
        &mut self,
        x: &DMatrix<f64>,
        null_probabilities: &[f64],
        options: &SampleOptions,
        rng: &mut R,
    ) -> Result<NullSample> {
        let density = self.null_density.ok_or(Error::NullDensityNotSet)?;
        if null_probabilities.len() != x.nrows() {
            return Err(Error::LengthMismatch {
                what: "null probabilities",
                expected: x.nrows(),
                actual: null_probabilities.len(),
            });
        }
        if let Some((item, &value)) = null_probabilities
            .iter()
            .enumerate()
            .find(|(_, p)| !(0.0..=1.0).contains(*p))
        {
            return Err(Error::InvalidProbability { item, value });
        }
        let outcomes = Outcomes::WithNull {
            density,
            probabilities: null_probabilities.to_vec(),
        };
        let (density, null_posterior) = self.run(x, &outcomes, options, rng)?;
        Ok(NullSample {
            density,
            null_posterior,
        })
    }

    fn run<R: Rng>(
        &mut self,
        x: &DMatrix<f64>,
        outcomes: &Outcomes,
        options: &SampleOptions,
        rng: &mut R,
    ) -> Result<(Vec<f64>, Vec<f64>)> {
        let n_items = x.nrows();
        if n_items == 0 {
            return Err(Error::NoObservations);
        }
        self.check_dim(x)?;
        if self.prior.is_none() {
            return Err(Error::PriorsNotSet);
        }
        if let Some(points) = &options.sampling_points {
            self.check_dim(points)?;
        }
        let fixed_folds = match &options.kfold {
            Some(KFold::Labels(labels)) => Some(Folds::from_labels(labels, n_items)?),
            Some(kfold) => {
                kfold.validate(n_items)?;
                None
            }
            None => None,
        };

        let splike = match &options.sampling_points {
            Some(points) => Some(self.likelihood_under_the_prior(points)?),
            None => None,
        };
        let plike = self.likelihood_under_the_prior(x)?;

        if options.init {
            self.k = 1;
            self.update(x, &Clustering::one_cluster(n_items), rng)?;
        }
        let like = self.likelihood(x, &plike)?;
        let mut clustering = self.draw_indicators(like, outcomes, rng)?;

        let n_points = options
            .sampling_points
            .as_ref()
            .map_or(n_items, |points| points.nrows());
        let mut density = vec![0.0; n_points];
        let mut null_counts = vec![0_usize; n_items];
        for sweep in 0..options.n_iterations {
            let like = match &options.kfold {
                None => simple_update(self, x, &mut clustering, &plike, outcomes, rng)?,
                Some(kfold) => {
                    let folds = match &fixed_folds {
                        Some(folds) => Cow::Borrowed(folds),
                        None => Cow::Owned(Folds::new(kfold, n_items, rng)?),
                    };
                    cross_validated_update(self, x, &mut clustering, &plike, outcomes, &folds, rng)?
                }
            };
            if outcomes.has_null() {
                let like = self.likelihood(x, &plike)?;
                clustering = self.draw_indicators(like, outcomes, rng)?;
                for (count, label) in null_counts.iter_mut().zip(clustering.labels()) {
                    if label.is_none() {
                        *count += 1;
                    }
                }
            }
            let current = match (&options.sampling_points, &splike) {
                (Some(points), Some(splike)) => row_sums(&self.likelihood(points, splike)?),
                _ => like,
            };
            for (d, c) in density.iter_mut().zip(current) {
                *d += c;
            }
            trace!(sweep, k = self.k, "completed sweep");
        }

        let n = options.n_iterations as f64;
        if options.n_iterations > 0 {
            for d in density.iter_mut() {
                *d /= n;
            }
        }
        let null_posterior = null_counts
            .iter()
            .map(|&count| if options.n_iterations > 0 { count as f64 / n } else { 0.0 })
            .collect();
        debug!(
            n_iterations = options.n_iterations,
            k = self.k,
            cross_validated = options.kfold.is_some(),
            null_class = outcomes.has_null(),
            "finished sampling"
        );
        Ok((density, null_posterior))
    }
}
