//! Error type shared by the whole crate.
use thiserror::Error;

/// Errors raised while building, evaluating or training a mixture
#[derive(Debug, Error)]
pub enum GmmError {
    /// A point does not have the dimension a component expects
    #[error("point has dimension {found}, expected {expected}")]
    DimensionMismatch {
        /// Dimension the component works in
        expected: usize,
        /// Length of the offending point
        found: usize,
    },
    /// Components of one mixture disagree on their dimension
    #[error("component {index} has dimension {found}, expected {expected}")]
    InconsistentDimensions {
        /// Position of the first disagreeing component
        index: usize,
        /// Dimension of the first component
        expected: usize,
        /// Dimension of the disagreeing component
        found: usize,
    },
    /// A mixture needs at least one component
    #[error("a mixture needs at least one component")]
    NoComponents,
    /// Number of weights differs from the number of components
    #[error("got {weights} weights for {components} components")]
    WeightCountMismatch {
        /// Number of weights given
        weights: usize,
        /// Number of components given
        components: usize,
    },
    /// Weights must be finite, non-negative and not all zero
    #[error("invalid mixture weights: {0}")]
    InvalidWeights(String),
    /// Sample weights do not line up with the points
    #[error("got {weights} sample weights for {points} points")]
    SampleWeightMismatch {
        /// Number of sample weights
        weights: usize,
        /// Number of points
        points: usize,
    },
    /// Training was called without data
    #[error("cannot train on an empty dataset")]
    EmptyData,
    /// A component produced a NaN or `+inf` log-probability
    #[error("component {component} returned log-probability {value}")]
    InvalidLogProbability {
        /// Index of the component in the mixture
        component: usize,
        /// The value it returned
        value: f64,
    },
    /// Re-estimated covariance is not positive definite
    #[error("covariance matrix is not positive definite")]
    SingularCovariance,
    /// Training options are unusable
    #[error("invalid training configuration: {0}")]
    InvalidConfig(String),
    /// This error comes directly from `statrs::StatsError`
    #[error(transparent)]
    StatsError(#[from] statrs::StatsError),
}

/// Result alias with [`GmmError`] as the error
pub type Result<T> = std::result::Result<T, GmmError>;
