// Wishart and multivariate normal draws

use crate::error::{Error, Result};
use crate::linalg::cholesky;

use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::{ChiSquared, Distribution, StandardNormal};

/// Draws a precision matrix from Wishart(`dof`, `scale`) via the Bartlett decomposition.
///
/// The draw has expectation `dof * scale`. Requires `dof > dim - 1`.
pub fn sample_wishart<R: Rng>(dof: f64, scale: &DMatrix<f64>, rng: &mut R) -> Result<DMatrix<f64>> {
    let d = scale.nrows();
    let l = cholesky(scale, "Wishart scale")?.unpack();
    let mut a = DMatrix::<f64>::zeros(d, d);
    for i in 0..d {
        let chi_squared = ChiSquared::new(dof - i as f64).map_err(|e| Error::Distribution {
            detail: format!("chi-squared with {} degrees of freedom: {:?}", dof - i as f64, e),
        })?;
        a[(i, i)] = chi_squared.sample(rng).sqrt();
        for j in 0..i {
            a[(i, j)] = StandardNormal.sample(rng);
        }
    }
    let la = l * a;
    Ok(&la * la.transpose())
}

/// Draws from a multivariate normal given its mean and precision matrix.
pub fn sample_multivariate_normal<R: Rng>(
    mean: &DVector<f64>,
    precision: &DMatrix<f64>,
    rng: &mut R,
) -> Result<DVector<f64>> {
    let l = cholesky(precision, "normal precision")?.unpack();
    let z = DVector::<f64>::from_fn(mean.len(), |_, _| StandardNormal.sample(rng));
    // (L L')^{-1} = L'^{-1} L^{-1}, so L'^{-1} z has the required covariance.
    let offset = l
        .transpose()
        .solve_upper_triangular(&z)
        .ok_or(Error::NotPositiveDefinite {
            what: "normal precision",
        })?;
    Ok(mean + offset)
}
