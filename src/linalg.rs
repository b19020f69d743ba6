// Symmetric matrix helpers

use crate::error::{Error, Result};

use nalgebra::{Cholesky, DMatrix, DVector, Dyn};

pub fn cholesky(m: &DMatrix<f64>, what: &'static str) -> Result<Cholesky<f64, Dyn>> {
    Cholesky::new(m.clone()).ok_or(Error::NotPositiveDefinite { what })
}

/// Log-determinant of a symmetric positive definite matrix.
pub fn log_det_sym(m: &DMatrix<f64>, what: &'static str) -> Result<f64> {
    let chol = cholesky(m, what)?;
    Ok(2.0 * chol.l_dirty().diagonal().iter().map(|d| d.ln()).sum::<f64>())
}

/// Determinant of a symmetric positive definite matrix.
pub fn det_sym(m: &DMatrix<f64>, what: &'static str) -> Result<f64> {
    log_det_sym(m, what).map(f64::exp)
}

pub fn inverse_sym(m: &DMatrix<f64>, what: &'static str) -> Result<DMatrix<f64>> {
    Ok(cholesky(m, what)?.inverse())
}

pub fn outer(v: &DVector<f64>) -> DMatrix<f64> {
    v * v.transpose()
}

/// Sample mean and (biased) sample covariance of the rows of `x`.
pub fn mean_and_covariance(x: &DMatrix<f64>) -> (DVector<f64>, DMatrix<f64>) {
    let mean = row_mean(x);
    let mut covariance = scatter(x, &mean);
    if x.nrows() > 0 {
        covariance /= x.nrows() as f64;
    }
    (mean, covariance)
}

pub fn row_mean(x: &DMatrix<f64>) -> DVector<f64> {
    let mut mean = DVector::zeros(x.ncols());
    for row in x.row_iter() {
        mean += row.transpose();
    }
    if x.nrows() > 0 {
        mean /= x.nrows() as f64;
    }
    mean
}

/// Sum of outer products of the rows of `x` centered at `center`.
pub fn scatter(x: &DMatrix<f64>, center: &DVector<f64>) -> DMatrix<f64> {
    let mut s = DMatrix::zeros(x.ncols(), x.ncols());
    for row in x.row_iter() {
        let d = row.transpose() - center;
        s += outer(&d);
    }
    s
}
