//! Training options.
use crate::error::{GmmError, Result};

/// Options for [`MixtureModel::train`](crate::MixtureModel::train).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainConfig {
    /// Training stops once the log-likelihood improves by no more than this
    pub stop_threshold: f64,
    /// Hard cap on EM iterations
    pub max_iterations: usize,
    /// Ask components for diagonal covariance estimates
    pub diagonal: bool,
    /// Report every iteration at `info` level instead of `debug`
    pub verbose: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            stop_threshold: 0.1,
            max_iterations: 100_000_000,
            diagonal: false,
            verbose: false,
        }
    }
}

impl TrainConfig {
    /// Set [`stop_threshold`](Self::stop_threshold)
    pub fn with_stop_threshold(mut self, stop_threshold: f64) -> Self {
        self.stop_threshold = stop_threshold;
        self
    }

    /// Set [`max_iterations`](Self::max_iterations)
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set [`diagonal`](Self::diagonal)
    pub fn with_diagonal(mut self, diagonal: bool) -> Self {
        self.diagonal = diagonal;
        self
    }

    /// Set [`verbose`](Self::verbose)
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Reject options training cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.stop_threshold.is_nan() {
            return Err(GmmError::InvalidConfig(
                "stop_threshold must not be NaN".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let cfg = TrainConfig::default()
            .with_stop_threshold(1e-6)
            .with_max_iterations(50)
            .with_diagonal(true)
            .with_verbose(true);
        assert_eq!(cfg.stop_threshold, 1e-6);
        assert_eq!(cfg.max_iterations, 50);
        assert!(cfg.diagonal);
        assert!(cfg.verbose);
    }

    #[test]
    fn nan_threshold_is_rejected() {
        let cfg = TrainConfig::default().with_stop_threshold(f64::NAN);
        assert!(matches!(cfg.validate(), Err(GmmError::InvalidConfig(_))));
        assert!(TrainConfig::default().validate().is_ok());
    }
}
