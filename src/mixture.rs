//! Finite mixture of components fit by Expectation-Maximization.
use itertools::Itertools;
use log::{debug, info, warn};
use nalgebra::{DMatrix, DVector};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use rayon::prelude::*;

use crate::component::Component;
use crate::config::TrainConfig;
use crate::error::{GmmError, Result};
use crate::logsumexp::{log_add_exp, log_all, log_sum_exp, INF, NEG_INF};

/// A weighted mixture of components.
///
/// The model owns its components outright; training mutates them in place.
/// Weights are non-negative and sum to one at all times.
#[derive(Debug, Clone)]
pub struct MixtureModel<C> {
    components: Vec<C>,
    weights: Vec<f64>,
}

/// What happened during a call to [`MixtureModel::train`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrainReport {
    /// Number of EM iterations performed
    pub iterations: usize,
    /// Unweighted log-likelihood before the first iteration
    pub initial_log_likelihood: f64,
    /// Unweighted log-likelihood after the last iteration
    pub final_log_likelihood: f64,
    /// Change in log-likelihood over the last iteration
    pub improvement: f64,
    /// `true` if training stopped on the threshold rather than the cap
    pub converged: bool,
    /// Iterations (1-based) after which the log-likelihood went down
    pub decreases: Vec<usize>,
}

impl<C: Component> MixtureModel<C> {
    /// Mixture with uniform weights.
    pub fn new(components: Vec<C>) -> Result<Self> {
        let m = components.len();
        Self::with_weights(components, vec![1.0; m])
    }

    /// Mixture with the given weights, normalized to sum to one.
    pub fn with_weights(components: Vec<C>, weights: Vec<f64>) -> Result<Self> {
        if components.is_empty() {
            return Err(GmmError::NoComponents);
        }
        if weights.len() != components.len() {
            return Err(GmmError::WeightCountMismatch {
                weights: weights.len(),
                components: components.len(),
            });
        }
        if let Some(w) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(GmmError::InvalidWeights(format!(
                "{w} is not a finite non-negative number"
            )));
        }
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(GmmError::InvalidWeights("weights sum to zero".to_string()));
        }

        let expected = components[0].dimension();
        if let Some((index, c)) = components
            .iter()
            .enumerate()
            .find(|(_, c)| c.dimension() != expected)
        {
            return Err(GmmError::InconsistentDimensions {
                index,
                expected,
                found: c.dimension(),
            });
        }

        let weights = weights.iter().map(|w| w / total).collect();
        Ok(MixtureModel {
            components,
            weights,
        })
    }

    /// Mixture weights, in component order
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Components, in the order they were given
    pub fn components(&self) -> &[C] {
        &self.components
    }

    /// Number of components
    pub fn n_components(&self) -> usize {
        self.components.len()
    }

    /// Dimension shared by all components
    pub fn dimension(&self) -> usize {
        self.components[0].dimension()
    }

    /// Log of the summed component densities at `point`.
    ///
    /// The mixture weights are *not* folded in here; see
    /// [`a_posteriori`](Self::a_posteriori) for the weighted posterior.
    pub fn log_probability(&self, point: &DVector<f64>) -> Result<f64> {
        self.components
            .iter()
            .enumerate()
            .try_fold(NEG_INF, |acc, (j, c)| -> Result<f64> {
                Ok(log_add_exp(acc, checked_log_probability(j, c, point)?))
            })
    }

    /// Sum of [`log_probability`](Self::log_probability) over `points`. This
    /// is the quantity training watches for convergence.
    pub fn log_likelihood(&self, points: &[DVector<f64>]) -> Result<f64> {
        points
            .iter()
            .map(|x| self.log_probability(x))
            .sum::<Result<f64>>()
    }

    /// Responsibility of every component for every point (E-step).
    ///
    /// Row `i` is the posterior over components for `points[i]` and sums to
    /// one. A point no component can explain (every weighted log density is
    /// `-inf`) gets the mixture weights as its row.
    pub fn a_posteriori(&self, points: &[DVector<f64>]) -> Result<DMatrix<f64>> {
        let log_weights = log_all(&self.weights);
        let rows = points
            .par_iter()
            .map(|x| self.posterior_row(x, &log_weights))
            .collect::<Result<Vec<Vec<f64>>>>()?;
        Ok(DMatrix::from_fn(points.len(), self.n_components(), |i, j| {
            rows[i][j]
        }))
    }

    fn posterior_row(&self, point: &DVector<f64>, log_weights: &[f64]) -> Result<Vec<f64>> {
        let raw = self
            .components
            .iter()
            .zip_eq(log_weights)
            .enumerate()
            .map(|(j, (c, &lw))| -> Result<f64> {
                Ok(checked_log_probability(j, c, point)? + lw)
            })
            .collect::<Result<Vec<f64>>>()?;

        let total = log_sum_exp(raw.iter().copied());
        if total == NEG_INF {
            warn!("no component explains a point; falling back to the mixture weights");
            return Ok(self.weights.clone());
        }
        Ok(raw.iter().map(|r| (r - total).exp()).collect())
    }

    /// Index of the most responsible component for each point. Ties go to
    /// the lowest index.
    pub fn maximum_a_posteriori(&self, points: &[DVector<f64>]) -> Result<Vec<usize>> {
        let resp = self.a_posteriori(points)?;
        Ok(resp
            .row_iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .fold((0, NEG_INF), |(best, best_r), (j, &r)| {
                        if r > best_r {
                            (j, r)
                        } else {
                            (best, best_r)
                        }
                    })
                    .0
            })
            .collect())
    }

    /// Fit the components and weights to `points` by EM.
    ///
    /// Each iteration computes responsibilities under the current weights,
    /// refits every component to its column of responsibilities, and sets
    /// each weight to that column's share of the total. Iteration stops once
    /// the improvement in [`log_likelihood`](Self::log_likelihood) is at or
    /// below `stop_threshold`, or after `max_iterations`. At least one
    /// iteration runs unless `max_iterations` is zero.
    ///
    /// The convergence metric is the unweighted likelihood, so it can go down
    /// even though EM never lowers the weighted objective. Such iterations are
    /// logged and listed in [`TrainReport::decreases`].
    ///
    /// Each M-step refits copies of the components and commits them together
    /// with the new weights, so on error the model holds the parameters of
    /// the last completed iteration.
    pub fn train(&mut self, points: &[DVector<f64>], config: &TrainConfig) -> Result<TrainReport>
    where
        C: Clone,
    {
        config.validate()?;
        if points.is_empty() {
            return Err(GmmError::EmptyData);
        }

        let initial_log_likelihood = self.log_likelihood(points)?;
        let mut last_ll = initial_log_likelihood;
        let mut improvement = INF;
        let mut iteration = 0;
        let mut decreases = Vec::new();

        while improvement > config.stop_threshold && iteration < config.max_iterations {
            let resp = self.a_posteriori(points)?;
            let total = resp.sum();

            let mut components = self.components.clone();
            let mut weights = Vec::with_capacity(self.n_components());
            for (j, component) in components.iter_mut().enumerate() {
                let column: Vec<f64> = resp.column(j).iter().copied().collect();
                component.from_sample(points, &column, config.diagonal)?;
                weights.push(column.iter().sum::<f64>() / total);
            }
            self.components = components;
            self.weights = weights;

            let new_ll = self.log_likelihood(points)?;
            improvement = new_ll - last_ll;
            last_ll = new_ll;
            iteration += 1;

            if improvement < 0.0 {
                warn!(
                    "iteration {iteration}: log-likelihood decreased by {:.6}",
                    -improvement
                );
                decreases.push(iteration);
            }
            if config.verbose {
                info!(
                    "iteration {iteration}: log-likelihood {new_ll:.6}, change {improvement:.6}"
                );
            } else {
                debug!(
                    "iteration {iteration}: log-likelihood {new_ll:.6}, change {improvement:.6}"
                );
            }
        }

        let converged = improvement <= config.stop_threshold;
        if config.verbose {
            info!(
                "training finished after {iteration} iterations, improvement {:.6}",
                last_ll - initial_log_likelihood
            );
        }

        Ok(TrainReport {
            iterations: iteration,
            initial_log_likelihood,
            final_log_likelihood: last_ll,
            improvement,
            converged,
            decreases,
        })
    }
}

/// A component's log density at `point`, rejecting NaN and `+inf`.
fn checked_log_probability<C: Component>(j: usize, c: &C, point: &DVector<f64>) -> Result<f64> {
    let lp = c.log_probability(point)?;
    if lp.is_nan() || lp == INF {
        return Err(GmmError::InvalidLogProbability {
            component: j,
            value: lp,
        });
    }
    Ok(lp)
}

impl<C> MixtureModel<C>
where
    C: Component + Distribution<DVector<f64>>,
{
    /// Draw one point: pick a component by weight, then sample from it.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<DVector<f64>> {
        let mut draws = self.sample_n(1, rng)?;
        draws.pop().ok_or(GmmError::EmptyData)
    }

    /// Draw `n` independent points.
    pub fn sample_n<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<Vec<DVector<f64>>> {
        let picker = WeightedIndex::new(&self.weights)
            .map_err(|e| GmmError::InvalidWeights(e.to_string()))?;
        Ok((0..n)
            .map(|_| self.components[picker.sample(rng)].sample(rng))
            .collect())
    }
}
