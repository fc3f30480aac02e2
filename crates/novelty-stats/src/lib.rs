//! Log-domain statistics for novelty detection.
//!
//! This crate provides the exact combinatorial tests used to score how
//! surprising a move's first appearance is:
//!
//! - **Log-factorials**: A shared, grow-only memo of `ln(n!)`
//! - **Log-space arithmetic**: Overflow-free sums of probabilities stored as logarithms
//! - **Hypergeometric tests**: Point probabilities and the one-tailed Fisher exact test on 2×2 tables
//! - **Chi-square tails**: The survival function of the chi-square distribution, as a logarithm
//!
//! # Modules
//!
//! - [`log_factorial`]: Thread-safe memo of `ln(n!)`
//! - [`log_space`]: `log-sum-exp` and friends
//! - [`hypergeometric`]: 2×2 contingency tables and Fisher's exact test
//! - [`chi_square`]: Chi-square survival function
//!
//! # Examples
//!
//! ## Fisher exact test
//!
//! ```
//! use novelty_stats::{hypergeometric::ContingencyTable, log_factorial::LogFactorialTable};
//!
//! let factorials = LogFactorialTable::new();
//! let log_p = ContingencyTable::new(0, 12, 40, 30).fisher_left_tail(&factorials);
//! assert!(log_p < 0.0);
//! ```
//!
//! ## Combining p-values with Fisher's method
//!
//! ```
//! use novelty_stats::{chi_square, log_factorial::LogFactorialTable};
//!
//! let factorials = LogFactorialTable::new();
//! let log_ps = [0.01_f64.ln(), 0.2_f64.ln()];
//! let statistic = log_ps.iter().map(|p| -2.0 * p).sum::<f64>();
//! let combined = chi_square::log_survival(statistic, 4, &factorials).unwrap();
//! assert!(combined < 0.05_f64.ln());
//! ```

pub mod chi_square;
pub mod hypergeometric;
pub mod log_factorial;
pub mod log_space;

/// A numerical routine was called outside its mathematical domain.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum DomainError {
    #[display("chi-square distribution requires at least one degree of freedom")]
    ZeroDegreesOfFreedom,
    #[display("chi-square statistic must be finite and non-negative, got {statistic}")]
    InvalidStatistic { statistic: f64 },
    #[display("incomplete gamma expansion did not converge")]
    NoConvergence,
}
