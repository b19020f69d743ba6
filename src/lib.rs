pub mod clust;
pub mod error;
pub mod folds;
pub mod grid;
pub mod imm;
pub mod linalg;
pub mod mcmc;
pub mod mixture;
pub mod prelude;
pub mod prior;
#[cfg(test)]
pub mod testing;
pub mod wgt;
pub mod wishart;
