//! Gaussian mixture models fit by Expectation-Maximization.
//!
//! A [`MixtureModel`] owns an ordered set of [`Component`]s and their mixture
//! weights. Training alternates an E-step ([`MixtureModel::a_posteriori`]),
//! computed in the log domain, with an M-step that asks every component to
//! refit itself to its column of responsibilities.
//!
//! ```
//! use gmm_em::{MixtureModel, TrainConfig, UnivariateNormal};
//! use nalgebra::DVector;
//!
//! let xs: Vec<DVector<f64>> = [0.0, 0.0, 0.0, 10.0, 10.0, 10.0]
//!     .iter()
//!     .map(|&x| DVector::from_element(1, x))
//!     .collect();
//! let components = vec![
//!     UnivariateNormal::new(1.0, 1.0)?,
//!     UnivariateNormal::new(9.0, 1.0)?,
//! ];
//! let mut gmm = MixtureModel::new(components)?;
//! gmm.train(&xs, &TrainConfig::default())?;
//!
//! assert_eq!(gmm.maximum_a_posteriori(&xs)?, vec![0, 0, 0, 1, 1, 1]);
//! # Ok::<(), gmm_em::GmmError>(())
//! ```
#![warn(
    rust_2018_idioms,
    rust_2021_compatibility,
    missing_debug_implementations,
    missing_docs
)]

pub mod component;
pub mod config;
pub mod distributions;
pub mod error;
pub mod logsumexp;
pub mod mixture;

pub use component::Component;
pub use config::TrainConfig;
pub use distributions::{MultivariateNormal, UnivariateNormal};
pub use error::{GmmError, Result};
pub use mixture::{MixtureModel, TrainReport};
