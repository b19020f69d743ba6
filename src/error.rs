use thiserror::Error;

/// Errors raised while configuring or running the sampler.
///
/// Input errors are reported before the model is mutated. Numerical
/// failures inside a sweep propagate as-is and may leave the model in
/// the state reached by the last completed fold.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Observations do not have the model's dimension.
    #[error("observations have {actual} columns but the model dimension is {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A per-observation input does not have one entry per observation.
    #[error("{what} has length {actual} but there are {expected} observations")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// An empty observation set was supplied where data is required.
    #[error("at least one observation is required")]
    NoObservations,

    /// Sampling was requested before the priors were set.
    #[error("priors have not been set")]
    PriorsNotSet,

    /// Null-class sampling was requested without a null density.
    #[error("null density has not been set")]
    NullDensityNotSet,

    /// A matrix that must be symmetric positive definite is not.
    #[error("{what} is not positive definite")]
    NotPositiveDefinite { what: &'static str },

    /// A prior hyperparameter is outside its valid range.
    #[error("invalid hyperparameter {name}: {detail}")]
    InvalidHyperparameter { name: &'static str, detail: String },

    /// A scalar fold count outside `1..=n_items`.
    #[error("number of folds must be between 1 and {n_items}, got {n_folds}")]
    InvalidFoldCount { n_folds: usize, n_items: usize },

    /// A null-class probability outside `[0, 1]`.
    #[error("probability for observation {item} is {value}, expected a value in [0, 1]")]
    InvalidProbability { item: usize, value: f64 },

    /// An assignment refers to a component that does not exist.
    #[error("label {label} is out of range for {n_components} components")]
    LabelOutOfRange { label: usize, n_components: usize },

    /// Every outcome of an observation has zero or non-finite weight.
    #[error("observation {item} has no outcome with positive finite weight")]
    DegenerateLikelihood { item: usize },

    /// A query grid with mismatched or empty axes.
    #[error("invalid grid: {detail}")]
    InvalidGrid { detail: String },

    /// A distribution rejected its parameters.
    #[error("distribution error: {detail}")]
    Distribution { detail: String },
}

pub type Result<T> = std::result::Result<T, Error>;
