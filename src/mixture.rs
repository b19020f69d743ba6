// Finite Gaussian mixture with conjugate Normal-Wishart updates

use crate::clust::Clustering;
use crate::error::{Error, Result};
use crate::linalg::{log_det_sym, row_mean, scatter};
use crate::mcmc::sample_categorical;
use crate::prelude::Mass;
use crate::prior::NormalWishart;
use crate::wgt::Weights;
use crate::wishart::{sample_multivariate_normal, sample_wishart};

use nalgebra::{DMatrix, DVector};
use rand::Rng;
use std::f64::consts::PI;

/// A finite mixture whose parameters are redrawn from their conditional posterior given
/// an assignment of the observations.
///
/// Its weights always carry one trailing entry for opening a new component, so an
/// updater with `k` components has `k + 1` weights.
pub trait MixtureUpdater {
    fn n_components(&self) -> usize;

    fn weights(&self) -> &Weights;

    /// Redraws one component per entry of `priors` given the observations assigned to
    /// it, then the weights. Null items are ignored.
    fn update<R: Rng>(
        &mut self,
        x: &DMatrix<f64>,
        clustering: &Clustering,
        priors: &[NormalWishart],
        mass: Mass,
        rng: &mut R,
    ) -> Result<()>;

    /// Density of every row of `x` under every component, without weights.
    fn unweighted_likelihood(&self, x: &DMatrix<f64>) -> Result<DMatrix<f64>>;

    /// One categorical draw per row of `like`, proportional to its entries.
    fn sample_indicator<R: Rng>(&self, like: &DMatrix<f64>, rng: &mut R) -> Result<Vec<usize>> {
        sample_categorical(like, rng)
    }

    /// Occupation count of each existing component.
    fn pop(&self, clustering: &Clustering) -> Vec<usize> {
        let mut sizes = clustering.sizes();
        sizes.resize(self.n_components(), 0);
        sizes
    }
}

//

#[derive(Debug, Clone, PartialEq)]
struct Component {
    mean: DVector<f64>,
    precision: DMatrix<f64>,
    log_normalizer: f64,
}

impl Component {
    fn sample<R: Rng>(posterior: &NormalWishart, rng: &mut R) -> Result<Self> {
        let precision = sample_wishart(posterior.dof(), posterior.scale(), rng)?;
        let mean = sample_multivariate_normal(
            posterior.mean(),
            &(&precision * posterior.shrinkage()),
            rng,
        )?;
        let log_normalizer = 0.5 * log_det_sym(&precision, "component precision")?
            - 0.5 * (mean.len() as f64) * (2.0 * PI).ln();
        Ok(Self {
            mean,
            precision,
            log_normalizer,
        })
    }

    fn log_density(&self, x: &DVector<f64>) -> f64 {
        let delta = x - &self.mean;
        self.log_normalizer - 0.5 * delta.dot(&(&self.precision * &delta))
    }
}

/// Gaussian components with means and precisions drawn from Normal-Wishart posteriors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GaussianMixture {
    components: Vec<Component>,
    weights: Weights,
}

impl GaussianMixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn means(&self) -> Vec<&DVector<f64>> {
        self.components.iter().map(|c| &c.mean).collect()
    }

    pub fn precisions(&self) -> Vec<&DMatrix<f64>> {
        self.components.iter().map(|c| &c.precision).collect()
    }
}

impl MixtureUpdater for GaussianMixture {
    fn n_components(&self) -> usize {
        self.components.len()
    }

    fn weights(&self) -> &Weights {
        &self.weights
    }

    fn update<R: Rng>(
        &mut self,
        x: &DMatrix<f64>,
        clustering: &Clustering,
        priors: &[NormalWishart],
        mass: Mass,
        rng: &mut R,
    ) -> Result<()> {
        if clustering.n_items() != x.nrows() {
            return Err(Error::LengthMismatch {
                what: "assignments",
                expected: x.nrows(),
                actual: clustering.n_items(),
            });
        }
        if clustering.n_clusters() > priors.len() {
            return Err(Error::LabelOutOfRange {
                label: clustering.n_clusters() - 1,
                n_components: priors.len(),
            });
        }
        let mut components = Vec::with_capacity(priors.len());
        for (label, prior) in priors.iter().enumerate() {
            if prior.dim() != x.ncols() {
                return Err(Error::DimensionMismatch {
                    expected: prior.dim(),
                    actual: x.ncols(),
                });
            }
            let items = clustering.items_of(label);
            let members = x.select_rows(&items);
            let center = row_mean(&members);
            let posterior = prior.posterior(items.len(), &center, &scatter(&members, &center))?;
            components.push(Component::sample(&posterior, rng)?);
        }
        self.components = components;
        let counts = self.pop(clustering);
        self.weights = Weights::from_counts(&counts, mass);
        Ok(())
    }

    fn unweighted_likelihood(&self, x: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        let mut like = DMatrix::zeros(x.nrows(), self.components.len());
        for (j, component) in self.components.iter().enumerate() {
            if component.mean.len() != x.ncols() {
                return Err(Error::DimensionMismatch {
                    expected: component.mean.len(),
                    actual: x.ncols(),
                });
            }
            for (i, row) in x.row_iter().enumerate() {
                like[(i, j)] = component.log_density(&row.transpose()).exp();
            }
        }
        Ok(like)
    }
}
