// Normal-Wishart conjugate prior

use crate::error::{Error, Result};
use crate::linalg::{inverse_sym, log_det_sym, mean_and_covariance, outer};

use nalgebra::{DMatrix, DVector};
use statrs::function::gamma::ln_gamma;
use std::f64::consts::PI;

/// Floor applied to sample variances when deriving default priors.
pub const VARIANCE_FLOOR: f64 = 1.0e-15;

/// Prior shrinkage used by `NormalWishart::from_data`.
pub const DEFAULT_SHRINKAGE: f64 = 0.01;

/// Hyperparameters of a Normal-Wishart distribution over a Gaussian mean and precision.
///
/// The precision follows Wishart(`dof`, `scale`) and, given the precision `P`, the
/// mean follows N(`mean`, (`shrinkage` P)^-1). The inverse scale and the log-determinant
/// of the scale are cached at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalWishart {
    mean: DVector<f64>,
    scale: DMatrix<f64>,
    inverse_scale: DMatrix<f64>,
    log_det_scale: f64,
    dof: f64,
    shrinkage: f64,
}

impl NormalWishart {
    pub fn new(mean: DVector<f64>, scale: DMatrix<f64>, dof: f64, shrinkage: f64) -> Result<Self> {
        let dim = mean.len();
        if dim == 0 {
            return Err(Error::InvalidHyperparameter {
                name: "mean",
                detail: "dimension must be at least one".to_string(),
            });
        }
        if scale.nrows() != dim || scale.ncols() != dim {
            return Err(Error::DimensionMismatch {
                expected: dim,
                actual: scale.nrows(),
            });
        }
        if !(dof > dim as f64) {
            return Err(Error::InvalidHyperparameter {
                name: "dof",
                detail: format!("{} must exceed the dimension {}", dof, dim),
            });
        }
        if !(shrinkage > 0.0) || !shrinkage.is_finite() {
            return Err(Error::InvalidHyperparameter {
                name: "shrinkage",
                detail: format!("{} must be positive and finite", shrinkage),
            });
        }
        let log_det_scale = log_det_sym(&scale, "prior scale")?;
        let inverse_scale = inverse_sym(&scale, "prior scale")?;
        Ok(Self {
            mean,
            scale,
            inverse_scale,
            log_det_scale,
            dof,
            shrinkage,
        })
    }

    /// Weakly informative priors derived from the empirical moments of `x`.
    ///
    /// Follows Fraley and Raftery (2007): prior mean at the sample mean, diagonal
    /// inverse-variance scale, `dim + 2` degrees of freedom and a small shrinkage.
    pub fn from_data(x: &DMatrix<f64>) -> Result<Self> {
        if x.nrows() == 0 {
            return Err(Error::NoObservations);
        }
        let dim = x.ncols();
        let (mean, covariance) = mean_and_covariance(x);
        let scale = DMatrix::from_diagonal(&DVector::from_fn(dim, |i, _| {
            1.0 / covariance[(i, i)].max(VARIANCE_FLOOR)
        }));
        Self::new(mean, scale, (dim + 2) as f64, DEFAULT_SHRINKAGE)
    }

    /// Conjugate posterior given `n` observations with sample mean `sample_mean` and
    /// centered scatter matrix `scatter`.
    pub fn posterior(
        &self,
        n: usize,
        sample_mean: &DVector<f64>,
        scatter: &DMatrix<f64>,
    ) -> Result<Self> {
        if n == 0 {
            return Ok(self.clone());
        }
        let n = n as f64;
        let shrinkage = self.shrinkage + n;
        let mean = (&self.mean * self.shrinkage + sample_mean * n) / shrinkage;
        let delta = sample_mean - &self.mean;
        let inverse_scale =
            &self.inverse_scale + scatter + outer(&delta) * (self.shrinkage * n / shrinkage);
        let scale = inverse_sym(&inverse_scale, "posterior inverse scale")?;
        let log_det_scale = log_det_sym(&scale, "posterior scale")?;
        Ok(Self {
            mean,
            scale,
            inverse_scale,
            log_det_scale,
            dof: self.dof + n,
            shrinkage,
        })
    }

    /// One copy of these hyperparameters per component.
    pub fn expand(&self, n_components: usize) -> Vec<Self> {
        vec![self.clone(); n_components]
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    pub fn scale(&self) -> &DMatrix<f64> {
        &self.scale
    }

    pub fn inverse_scale(&self) -> &DMatrix<f64> {
        &self.inverse_scale
    }

    pub fn log_det_scale(&self) -> f64 {
        self.log_det_scale
    }

    pub fn det_scale(&self) -> f64 {
        self.log_det_scale.exp()
    }

    pub fn dof(&self) -> f64 {
        self.dof
    }

    pub fn shrinkage(&self) -> f64 {
        self.shrinkage
    }

    /// Log density of each row of `x` under the prior predictive (multivariate Student-t).
    pub fn log_predictive(&self, x: &DMatrix<f64>) -> Result<Vec<f64>> {
        if x.ncols() != self.dim() {
            return Err(Error::DimensionMismatch {
                expected: self.dim(),
                actual: x.ncols(),
            });
        }
        let dim = self.dim() as f64;
        let a = self.dof;
        let tau = self.shrinkage / (1.0 + self.shrinkage);
        let constant = dim * (tau / PI).ln() + 2.0 * ln_gamma((a + 1.0) / 2.0)
            - 2.0 * ln_gamma((a + 1.0 - dim) / 2.0)
            - a * self.log_det_scale;
        x.row_iter()
            .map(|row| {
                let delta = &self.mean - row.transpose();
                let m = &self.inverse_scale + outer(&delta) * tau;
                let log_det = log_det_sym(&m, "prior predictive matrix")?;
                Ok((constant - (a + 1.0) * log_det) / 2.0)
            })
            .collect()
    }

    /// Density of each row of `x` under the prior predictive.
    pub fn predictive(&self, x: &DMatrix<f64>) -> Result<Vec<f64>> {
        Ok(self.log_predictive(x)?.into_iter().map(f64::exp).collect())
    }
}
