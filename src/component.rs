//! The capability a distribution needs to take part in a mixture.
use nalgebra::DVector;

use crate::error::{GmmError, Result};

/// A distribution that can serve as one component of a mixture.
///
/// The mixture only ever asks two things of a component: how likely a point
/// is, and to refit itself to weighted data. Components are also cloneable
/// through [`ComponentClone`], which lets training refit a scratch copy and
/// commit it only once every component has succeeded.
pub trait Component: Send + Sync + ComponentClone {
    /// Dimension of the points this component accepts
    fn dimension(&self) -> usize;

    /// Natural log of the density at `point`
    fn log_probability(&self, point: &DVector<f64>) -> Result<f64>;

    /// Re-estimate the parameters in place from `points`, each counted with
    /// the matching entry of `weights`. `diagonal` restricts multivariate
    /// families to a diagonal covariance.
    fn from_sample(
        &mut self,
        points: &[DVector<f64>],
        weights: &[f64],
        diagonal: bool,
    ) -> Result<()>;
}

/// Clone a component behind a trait object.
///
/// Implemented for every `Component + Clone`; there is no need to implement
/// it by hand.
pub trait ComponentClone {
    /// Boxed copy of `self`
    fn clone_box(&self) -> Box<dyn Component>;
}

impl<T: Component + Clone + 'static> ComponentClone for T {
    fn clone_box(&self) -> Box<dyn Component> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn Component> {
    fn clone(&self) -> Self {
        (**self).clone_box()
    }
}

impl Component for Box<dyn Component> {
    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn log_probability(&self, point: &DVector<f64>) -> Result<f64> {
        (**self).log_probability(point)
    }

    fn from_sample(
        &mut self,
        points: &[DVector<f64>],
        weights: &[f64],
        diagonal: bool,
    ) -> Result<()> {
        (**self).from_sample(points, weights, diagonal)
    }
}

pub(crate) fn check_dimension(expected: usize, point: &DVector<f64>) -> Result<()> {
    if point.len() == expected {
        Ok(())
    } else {
        Err(GmmError::DimensionMismatch {
            expected,
            found: point.len(),
        })
    }
}

/// Validate a weighted sample and return the total weight.
pub(crate) fn check_sample(
    expected: usize,
    points: &[DVector<f64>],
    weights: &[f64],
) -> Result<f64> {
    if points.len() != weights.len() {
        return Err(GmmError::SampleWeightMismatch {
            weights: weights.len(),
            points: points.len(),
        });
    }
    points
        .iter()
        .try_for_each(|x| check_dimension(expected, x))?;
    Ok(weights.iter().sum())
}
