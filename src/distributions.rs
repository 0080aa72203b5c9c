//! Gaussian components that can be mixed and refit by EM.
use nalgebra::{Cholesky, DMatrix, DVector, Dynamic};
use rand::{distributions::Distribution, Rng};
use statrs::consts::LN_SQRT_2PI;
use statrs::distribution::{Continuous, Normal};

use crate::component::{check_dimension, check_sample, Component};
use crate::error::{GmmError, Result};

const DEFAULT_MIN_STD: f64 = 1e-2;
const DEFAULT_MIN_COVAR: f64 = 1e-6;

/// One dimensional normal distribution.
///
/// Points handed to it must have length one.
#[derive(Debug, Clone)]
pub struct UnivariateNormal {
    normal: Normal,
    mean: f64,
    std_dev: f64,
    /// Floor on the refit standard deviation
    min_std: f64,
}

impl UnivariateNormal {
    /// Normal with the given mean and standard deviation. Fails unless the
    /// standard deviation is positive and finite.
    pub fn new(mean: f64, std_dev: f64) -> Result<Self> {
        let normal = Normal::new(mean, std_dev)?;
        Ok(UnivariateNormal {
            normal,
            mean,
            std_dev,
            min_std: DEFAULT_MIN_STD,
        })
    }

    /// Set the floor that [`Component::from_sample`] applies to the standard
    /// deviation. Without it a component fit to identical points has zero
    /// spread and an infinite density.
    pub fn with_min_std(mut self, min_std: f64) -> Self {
        self.min_std = min_std;
        self
    }

    /// Current mean
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Current standard deviation
    pub fn std_dev(&self) -> f64 {
        self.std_dev
    }
}

impl Component for UnivariateNormal {
    fn dimension(&self) -> usize {
        1
    }

    fn log_probability(&self, point: &DVector<f64>) -> Result<f64> {
        check_dimension(1, point)?;
        Ok(self.normal.ln_pdf(point[0]))
    }

    fn from_sample(
        &mut self,
        points: &[DVector<f64>],
        weights: &[f64],
        _diagonal: bool,
    ) -> Result<()> {
        let total = check_sample(1, points, weights)?;
        if total <= 0.0 {
            return Ok(());
        }
        let mean = points
            .iter()
            .zip(weights)
            .map(|(x, &w)| w * x[0])
            .sum::<f64>()
            / total;
        let var = points
            .iter()
            .zip(weights)
            .map(|(x, &w)| w * (x[0] - mean).powi(2))
            .sum::<f64>()
            / total;
        let std_dev = var.sqrt().max(self.min_std);

        self.normal = Normal::new(mean, std_dev)?;
        self.mean = mean;
        self.std_dev = std_dev;
        Ok(())
    }
}

impl Distribution<DVector<f64>> for UnivariateNormal {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> DVector<f64> {
        DVector::from_element(1, self.normal.sample(rng))
    }
}

/// Multivariate normal distribution with a full or diagonal covariance.
#[derive(Debug, Clone)]
pub struct MultivariateNormal {
    mean: DVector<f64>,
    cov: DMatrix<f64>,
    chol_cov: Cholesky<f64, Dynamic>,
    ln_det_cov: f64,
    std_normal: Normal,
    /// Added to the covariance diagonal after every refit
    min_covar: f64,
}

impl MultivariateNormal {
    /// Normal with the given mean and covariance. The covariance must be
    /// square, match the mean and be positive definite.
    pub fn new(mean: DVector<f64>, cov: DMatrix<f64>) -> Result<Self> {
        let d = mean.len();
        if cov.nrows() != d || cov.ncols() != d {
            return Err(GmmError::DimensionMismatch {
                expected: d,
                found: if cov.nrows() != d {
                    cov.nrows()
                } else {
                    cov.ncols()
                },
            });
        }
        let chol_cov = cov.clone().cholesky().ok_or(GmmError::SingularCovariance)?;
        let ln_det_cov = ln_det(&chol_cov);
        Ok(MultivariateNormal {
            mean,
            cov,
            chol_cov,
            ln_det_cov,
            std_normal: Normal::new(0.0, 1.0)?,
            min_covar: DEFAULT_MIN_COVAR,
        })
    }

    /// Build from a mean and a precision (inverse covariance) matrix.
    pub fn from_precision(mean: DVector<f64>, prec: DMatrix<f64>) -> Result<Self> {
        let cov = prec.try_inverse().ok_or(GmmError::SingularCovariance)?;
        Self::new(mean, cov)
    }

    /// Set the regularization added to the covariance diagonal on refit
    pub fn with_min_covar(mut self, min_covar: f64) -> Self {
        self.min_covar = min_covar;
        self
    }

    /// Current mean
    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    /// Current covariance
    pub fn cov(&self) -> &DMatrix<f64> {
        &self.cov
    }
}

fn ln_det(chol: &Cholesky<f64, Dynamic>) -> f64 {
    2.0 * chol.l_dirty().diagonal().iter().map(|l| l.ln()).sum::<f64>()
}

impl Component for MultivariateNormal {
    fn dimension(&self) -> usize {
        self.mean.len()
    }

    fn log_probability(&self, point: &DVector<f64>) -> Result<f64> {
        check_dimension(self.dimension(), point)?;
        let diff = point - &self.mean;
        // Mahalanobis term through the Cholesky factor: |L^-1 (x - mu)|^2
        let z = self
            .chol_cov
            .l()
            .solve_lower_triangular(&diff)
            .ok_or(GmmError::SingularCovariance)?;
        let d = self.dimension() as f64;
        Ok(-0.5 * z.norm_squared() - 0.5 * self.ln_det_cov - d * LN_SQRT_2PI)
    }

    fn from_sample(
        &mut self,
        points: &[DVector<f64>],
        weights: &[f64],
        diagonal: bool,
    ) -> Result<()> {
        let d = self.dimension();
        let total = check_sample(d, points, weights)?;
        if total <= 0.0 {
            return Ok(());
        }

        let mean = points
            .iter()
            .zip(weights)
            .fold(DVector::<f64>::zeros(d), |acc, (x, &w)| acc + x * w)
            / total;
        let mut cov = points
            .iter()
            .zip(weights)
            .fold(DMatrix::<f64>::zeros(d, d), |acc, (x, &w)| {
                let diff = x - &mean;
                acc + (&diff * diff.transpose()) * w
            })
            / total;
        if diagonal {
            cov = DMatrix::from_diagonal(&cov.diagonal());
        }
        for i in 0..d {
            cov[(i, i)] += self.min_covar;
        }

        let chol_cov = cov.clone().cholesky().ok_or(GmmError::SingularCovariance)?;
        self.ln_det_cov = ln_det(&chol_cov);
        self.chol_cov = chol_cov;
        self.mean = mean;
        self.cov = cov;
        Ok(())
    }
}

impl Distribution<DVector<f64>> for MultivariateNormal {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> DVector<f64> {
        let d = self.dimension();
        let z = DVector::from_iterator(d, (0..d).map(|_| self.std_normal.sample(rng)));
        self.chol_cov.l() * z + &self.mean
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use rand::{rngs::StdRng, SeedableRng};

    const TOL: f64 = 1e-10;

    fn pts(xs: &[f64]) -> Vec<DVector<f64>> {
        xs.iter().map(|&x| DVector::from_element(1, x)).collect()
    }

    #[test]
    fn univariate_log_probability_at_mean() {
        let n = UnivariateNormal::new(0.0, 1.0).unwrap();
        let lp = n.log_probability(&DVector::from_element(1, 0.0)).unwrap();
        assert_relative_eq!(lp, -LN_SQRT_2PI, epsilon = TOL);
    }

    #[test]
    fn univariate_rejects_wrong_dimension() {
        let n = UnivariateNormal::new(0.0, 1.0).unwrap();
        let err = n.log_probability(&DVector::zeros(2)).unwrap_err();
        assert!(matches!(
            err,
            GmmError::DimensionMismatch {
                expected: 1,
                found: 2
            }
        ));
    }

    #[test]
    fn univariate_rejects_bad_std_dev() {
        assert!(matches!(
            UnivariateNormal::new(0.0, -1.0),
            Err(GmmError::StatsError(_))
        ));
    }

    #[test]
    fn univariate_weighted_fit() {
        let mut n = UnivariateNormal::new(0.0, 1.0).unwrap();
        let xs = pts(&[1.0, 3.0, 100.0]);
        n.from_sample(&xs, &[1.0, 1.0, 0.0], false).unwrap();
        assert_relative_eq!(n.mean(), 2.0, epsilon = TOL);
        assert_relative_eq!(n.std_dev(), 1.0, epsilon = TOL);
    }

    #[test]
    fn univariate_std_dev_is_floored() {
        let mut n = UnivariateNormal::new(0.0, 1.0).unwrap().with_min_std(0.5);
        let xs = pts(&[4.0, 4.0, 4.0]);
        n.from_sample(&xs, &[1.0, 1.0, 1.0], false).unwrap();
        assert_relative_eq!(n.mean(), 4.0, epsilon = TOL);
        assert_relative_eq!(n.std_dev(), 0.5, epsilon = TOL);
    }

    #[test]
    fn zero_total_weight_keeps_parameters() {
        let mut n = UnivariateNormal::new(3.0, 2.0).unwrap();
        n.from_sample(&pts(&[1.0, 2.0]), &[0.0, 0.0], false).unwrap();
        assert_eq!(n.mean(), 3.0);
        assert_eq!(n.std_dev(), 2.0);

        let mut mvn = MultivariateNormal::new(DVector::zeros(2), DMatrix::identity(2, 2)).unwrap();
        let xs = vec![DVector::from_vec(vec![1.0, 1.0])];
        mvn.from_sample(&xs, &[0.0], false).unwrap();
        assert_eq!(mvn.mean(), &DVector::zeros(2));
    }

    #[test]
    fn sample_weight_count_must_match() {
        let mut n = UnivariateNormal::new(0.0, 1.0).unwrap();
        let err = n.from_sample(&pts(&[1.0, 2.0]), &[1.0], false).unwrap_err();
        assert!(matches!(
            err,
            GmmError::SampleWeightMismatch {
                weights: 1,
                points: 2
            }
        ));
    }

    #[test]
    fn mvn_standard_log_probability_at_origin() {
        let mvn = MultivariateNormal::new(DVector::zeros(3), DMatrix::identity(3, 3)).unwrap();
        let lp = mvn.log_probability(&DVector::zeros(3)).unwrap();
        assert_relative_eq!(lp, -3.0 * LN_SQRT_2PI, epsilon = TOL);
    }

    #[test]
    fn mvn_in_one_dimension_agrees_with_univariate() {
        let mvn = MultivariateNormal::new(
            DVector::from_element(1, 1.5),
            DMatrix::from_element(1, 1, 4.0),
        )
        .unwrap();
        let uvn = UnivariateNormal::new(1.5, 2.0).unwrap();
        for x in [-3.0, 0.0, 1.5, 7.25] {
            let p = DVector::from_element(1, x);
            assert_relative_eq!(
                mvn.log_probability(&p).unwrap(),
                uvn.log_probability(&p).unwrap(),
                epsilon = TOL
            );
        }
    }

    #[test]
    fn mvn_rejects_non_positive_definite_covariance() {
        let cov = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        assert!(matches!(
            MultivariateNormal::new(DVector::zeros(2), cov),
            Err(GmmError::SingularCovariance)
        ));
    }

    #[test]
    fn mvn_from_precision_inverts() {
        let prec = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 4.0]);
        let mvn = MultivariateNormal::from_precision(DVector::zeros(2), prec).unwrap();
        assert_relative_eq!(mvn.cov()[(0, 0)], 0.5, epsilon = TOL);
        assert_relative_eq!(mvn.cov()[(1, 1)], 0.25, epsilon = TOL);
    }

    #[test]
    fn mvn_fit_full_and_diagonal() {
        let xs: Vec<DVector<f64>> = [[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [3.0, 3.0]]
            .iter()
            .map(|p| DVector::from_row_slice(&p[..]))
            .collect();
        let w = [1.0; 4];

        let mut full = MultivariateNormal::new(DVector::zeros(2), DMatrix::identity(2, 2))
            .unwrap()
            .with_min_covar(1e-3);
        full.from_sample(&xs, &w, false).unwrap();
        assert_relative_eq!(full.mean()[0], 1.5, epsilon = TOL);
        assert_relative_eq!(full.mean()[1], 1.5, epsilon = TOL);
        assert_relative_eq!(full.cov()[(0, 1)], 1.25, epsilon = TOL);
        assert_relative_eq!(full.cov()[(0, 0)], 1.25 + 1e-3, epsilon = TOL);

        let mut diag = MultivariateNormal::new(DVector::zeros(2), DMatrix::identity(2, 2)).unwrap();
        diag.from_sample(&xs, &w, true).unwrap();
        assert_eq!(diag.cov()[(0, 1)], 0.0);
        assert_eq!(diag.cov()[(1, 0)], 0.0);
        assert_relative_eq!(diag.cov()[(1, 1)], 1.25 + 1e-6, epsilon = TOL);
    }

    #[test]
    fn mvn_samples_have_the_right_mean() {
        let mean = DVector::from_vec(vec![2.0, -1.0]);
        let cov = DMatrix::from_row_slice(2, 2, &[1.0, 0.3, 0.3, 0.5]);
        let mvn = MultivariateNormal::new(mean, cov).unwrap();
        let mut rng = StdRng::seed_from_u64(1337);
        let n = 20_000;
        let sum = (0..n).fold(DVector::<f64>::zeros(2), |acc, _| acc + mvn.sample(&mut rng));
        let avg = sum / n as f64;
        assert_abs_diff_eq!(avg[0], 2.0, epsilon = 0.05);
        assert_abs_diff_eq!(avg[1], -1.0, epsilon = 0.05);
    }
}
