/// Computes `ln(Σ exp(vᵢ))` without overflow or underflow.
///
/// Returns negative infinity (`ln 0`) for an empty input or when every value
/// is negative infinity.
///
/// # Examples
///
/// ```
/// use novelty_stats::log_space::log_sum_exp;
///
/// let sum = log_sum_exp([0.5_f64.ln(), 0.25_f64.ln()]);
/// assert!((sum - 0.75_f64.ln()).abs() < 1e-12);
/// assert_eq!(log_sum_exp(std::iter::empty()), f64::NEG_INFINITY);
/// ```
#[must_use]
pub fn log_sum_exp<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let values = values.into_iter().collect::<Vec<_>>();
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    let sum = values.iter().map(|v| (v - max).exp()).sum::<f64>();
    max + sum.ln()
}

/// Computes `ln(1 - exp(x))` for `x ≤ 0`, accurate near both ends.
#[must_use]
pub fn ln_one_minus_exp(x: f64) -> f64 {
    if x > -std::f64::consts::LN_2 {
        (-x.exp_m1()).ln()
    } else {
        (-x.exp()).ln_1p()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_value_is_identity() {
        assert_eq!(log_sum_exp([-3.5]), -3.5);
    }

    #[test]
    fn test_very_small_values() {
        let sum = log_sum_exp([-2000.0, -2000.0]);
        assert!((sum - (-2000.0 + std::f64::consts::LN_2)).abs() < 1e-9);
    }

    #[test]
    fn test_negative_infinity_terms_are_ignored() {
        let sum = log_sum_exp([f64::NEG_INFINITY, -1.0]);
        assert!((sum + 1.0).abs() < 1e-12);
        assert_eq!(log_sum_exp([f64::NEG_INFINITY]), f64::NEG_INFINITY);
    }

    #[test]
    fn test_ln_one_minus_exp() {
        for p in [1e-12, 0.1, 0.5, 0.9, 0.999_999] {
            let expected = (1.0_f64 - p).ln();
            let actual = ln_one_minus_exp(p.ln());
            assert!((actual - expected).abs() < 1e-9, "p = {p}");
        }
        assert_eq!(ln_one_minus_exp(f64::NEG_INFINITY), 0.0);
    }
}
