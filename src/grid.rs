// Regular query grids

use crate::error::{Error, Result};

use nalgebra::DMatrix;

/// A regular grid over a box, one axis per dimension, both ends of each axis included.
#[derive(Debug, Clone, PartialEq)]
pub struct GridDescriptor {
    limits: Vec<(f64, f64)>,
    n_points: Vec<usize>,
}

impl GridDescriptor {
    pub fn new(limits: &[(f64, f64)], n_points: &[usize]) -> Result<Self> {
        if limits.is_empty() {
            return Err(Error::InvalidGrid {
                detail: "at least one axis is required".to_string(),
            });
        }
        if limits.len() != n_points.len() {
            return Err(Error::InvalidGrid {
                detail: format!(
                    "{} axis limits but {} point counts",
                    limits.len(),
                    n_points.len()
                ),
            });
        }
        for (axis, (&(lower, upper), &n)) in limits.iter().zip(n_points.iter()).enumerate() {
            if !(lower < upper) || !lower.is_finite() || !upper.is_finite() {
                return Err(Error::InvalidGrid {
                    detail: format!("axis {} has limits [{}, {}]", axis, lower, upper),
                });
            }
            if n < 2 {
                return Err(Error::InvalidGrid {
                    detail: format!("axis {} has {} points, at least 2 are required", axis, n),
                });
            }
        }
        Ok(Self {
            limits: limits.to_vec(),
            n_points: n_points.to_vec(),
        })
    }

    pub fn dim(&self) -> usize {
        self.limits.len()
    }

    pub fn n_points(&self) -> usize {
        self.n_points.iter().product()
    }

    /// Spacing between neighboring points along each axis.
    pub fn steps(&self) -> Vec<f64> {
        self.limits
            .iter()
            .zip(self.n_points.iter())
            .map(|(&(lower, upper), &n)| (upper - lower) / (n - 1) as f64)
            .collect()
    }

    pub fn cell_volume(&self) -> f64 {
        self.steps().iter().product()
    }

    /// All grid points as rows; the last axis varies fastest.
    pub fn make_grid(&self) -> DMatrix<f64> {
        let steps = self.steps();
        let dim = self.dim();
        DMatrix::from_fn(self.n_points(), dim, |row, axis| {
            let stride: usize = self.n_points[axis + 1..].iter().product();
            let index = (row / stride) % self.n_points[axis];
            self.limits[axis].0 + steps[axis] * index as f64
        })
    }

    /// Riemann sum of `density` sampled at the grid points.
    pub fn integrate(&self, density: &[f64]) -> Result<f64> {
        if density.len() != self.n_points() {
            return Err(Error::LengthMismatch {
                what: "density",
                expected: self.n_points(),
                actual: density.len(),
            });
        }
        Ok(density.iter().sum::<f64>() * self.cell_volume())
    }
}
