//! Chi-square upper tail in the log domain.
//!
//! `P(X ≥ x)` for `X ~ χ²(k)` is the regularized upper incomplete gamma
//! function `Q(k/2, x/2)`. Small arguments use the power series for the lower
//! function `P`, large arguments the continued fraction for `Q`, which keeps
//! the result finite long after `Q` itself would underflow to zero.

use crate::{DomainError, log_factorial::LogFactorialTable, log_space};

const MAX_ITERATIONS: usize = 10_000;
const EPSILON: f64 = 1e-15;
const TINY: f64 = 1e-300;

/// Natural log of the chi-square survival function.
///
/// # Errors
///
/// Returns [`DomainError`] when `degrees_of_freedom` is zero, when `statistic`
/// is negative or not finite, or when the expansion fails to converge.
///
/// # Examples
///
/// ```
/// use novelty_stats::{chi_square, log_factorial::LogFactorialTable};
///
/// let table = LogFactorialTable::new();
/// // χ²(2) has survival function exp(-x / 2).
/// let log_sf = chi_square::log_survival(10.0, 2, &table).unwrap();
/// assert!((log_sf + 5.0).abs() < 1e-10);
/// ```
pub fn log_survival(
    statistic: f64,
    degrees_of_freedom: usize,
    table: &LogFactorialTable,
) -> Result<f64, DomainError> {
    if degrees_of_freedom == 0 {
        return Err(DomainError::ZeroDegreesOfFreedom);
    }
    if !statistic.is_finite() || statistic < 0.0 {
        return Err(DomainError::InvalidStatistic { statistic });
    }
    if statistic == 0.0 {
        return Ok(0.0);
    }

    #[expect(clippy::cast_precision_loss)]
    let s = degrees_of_freedom as f64 / 2.0;
    let x = statistic / 2.0;
    let ln_gamma_s = table.ln_gamma_half(degrees_of_freedom);
    let prefix = -x + s * x.ln() - ln_gamma_s;

    if x < s + 1.0 {
        let ln_lower = prefix + lower_series(s, x)?.ln();
        Ok(log_space::ln_one_minus_exp(ln_lower.min(0.0)))
    } else {
        Ok((prefix + upper_continued_fraction(s, x)?.ln()).min(0.0))
    }
}

/// Series `Σ xⁿ / (s (s+1) ... (s+n))`, so that `P(s, x) = e^{-x} xˢ / Γ(s) · series`.
fn lower_series(s: f64, x: f64) -> Result<f64, DomainError> {
    let mut denominator = s;
    let mut term = 1.0 / s;
    let mut sum = term;
    for _ in 0..MAX_ITERATIONS {
        denominator += 1.0;
        term *= x / denominator;
        sum += term;
        if term.abs() < sum.abs() * EPSILON {
            return Ok(sum);
        }
    }
    Err(DomainError::NoConvergence)
}

/// Continued fraction for `Q(s, x) · Γ(s) · eˣ / xˢ`, evaluated with the
/// modified Lentz method.
fn upper_continued_fraction(s: f64, x: f64) -> Result<f64, DomainError> {
    let mut b = x + 1.0 - s;
    let mut c = 1.0 / TINY;
    let mut d = 1.0 / b;
    let mut h = d;
    for i in 1..=MAX_ITERATIONS {
        #[expect(clippy::cast_precision_loss)]
        let i = i as f64;
        let an = -i * (i - s);
        b += 2.0;
        d = an * d + b;
        if d.abs() < TINY {
            d = TINY;
        }
        c = b + an / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;
        if (delta - 1.0).abs() < EPSILON {
            return Ok(h);
        }
    }
    Err(DomainError::NoConvergence)
}
