//! Log-domain arithmetic.
//!
//! Probabilities are carried as natural logarithms so that products of many
//! small densities do not underflow. Probability zero is `NEG_INF`.

/// Log of probability zero
pub const NEG_INF: f64 = f64::NEG_INFINITY;
/// Positive infinity
pub const INF: f64 = f64::INFINITY;

/// Compute `ln(exp(a) + exp(b))` without leaving the log domain.
///
/// The larger term is factored out so the remaining exponent is never
/// positive.
///
/// ```
/// # use gmm_em::logsumexp::{log_add_exp, NEG_INF};
/// let x = log_add_exp(0.5_f64.ln(), 0.25_f64.ln());
/// assert!((x - 0.75_f64.ln()).abs() < 1e-12);
/// assert_eq!(log_add_exp(-3.0, NEG_INF), -3.0);
/// ```
#[inline]
pub fn log_add_exp(a: f64, b: f64) -> f64 {
    if a == NEG_INF {
        return b;
    }
    if b == NEG_INF {
        return a;
    }
    let (hi, lo) = if a > b { (a, b) } else { (b, a) };
    hi + (lo - hi).exp().ln_1p()
}

/// Sum log-probabilities by pairwise reduction seeded at `NEG_INF`.
///
/// An empty input is the log of an empty sum, i.e. `NEG_INF`.
pub fn log_sum_exp<I>(xs: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    xs.into_iter().fold(NEG_INF, log_add_exp)
}

/// Natural log that maps `0` to `NEG_INF` instead of failing.
#[inline]
pub fn log(x: f64) -> f64 {
    if x == 0.0 {
        NEG_INF
    } else {
        x.ln()
    }
}

/// Elementwise [`log`].
pub fn log_all(xs: &[f64]) -> Vec<f64> {
    xs.iter().map(|&x| log(x)).collect()
}
