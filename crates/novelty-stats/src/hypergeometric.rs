//! Exact tests on 2×2 contingency tables, in the log domain.
//!
//! Cell layout follows the usual Fisher convention:
//!
//! ```text
//!              group A   group B
//! success         a         b
//! failure         c         d
//! ```
//!
//! All probabilities are returned as natural logarithms so that tables with
//! thousands of observations never overflow or underflow.

use crate::{log_factorial::LogFactorialTable, log_space};

/// A 2×2 contingency table of non-negative counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContingencyTable {
    pub a: usize,
    pub b: usize,
    pub c: usize,
    pub d: usize,
}

impl ContingencyTable {
    #[must_use]
    pub const fn new(a: usize, b: usize, c: usize, d: usize) -> Self {
        Self { a, b, c, d }
    }

    /// Sum of all four cells.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.a + self.b + self.c + self.d
    }

    /// Log-probability of observing exactly this table under independence,
    /// given its margins.
    ///
    /// ```text
    /// ln P = ln (a+b)! + ln (c+d)! + ln (a+c)! + ln (b+d)!
    ///      - ln a! - ln b! - ln c! - ln d! - ln n!
    /// ```
    ///
    /// # Examples
    ///
    /// ```
    /// use novelty_stats::{hypergeometric::ContingencyTable, log_factorial::LogFactorialTable};
    ///
    /// let table = LogFactorialTable::new();
    /// // Only one arrangement is possible when a margin is zero.
    /// let p = ContingencyTable::new(0, 0, 3, 4).log_probability(&table);
    /// assert!(p.abs() < 1e-12);
    /// ```
    #[must_use]
    pub fn log_probability(&self, table: &LogFactorialTable) -> f64 {
        let Self { a, b, c, d } = *self;
        table.get(a + b) + table.get(c + d) + table.get(a + c) + table.get(b + d)
            - table.get(a)
            - table.get(b)
            - table.get(c)
            - table.get(d)
            - table.get(a + b + c + d)
    }

    /// One-tailed ("left") Fisher exact test.
    ///
    /// Sums the probabilities of every table with the same margins whose
    /// top-left cell is at most `a`, returning the natural log of that sum.
    /// A small value means group A's successes are implausibly few under
    /// independence.
    ///
    /// # Examples
    ///
    /// ```
    /// use novelty_stats::{hypergeometric::ContingencyTable, log_factorial::LogFactorialTable};
    ///
    /// let table = LogFactorialTable::new();
    /// let log_p = ContingencyTable::new(0, 20, 30, 10).fisher_left_tail(&table);
    /// assert!(log_p < 0.01_f64.ln());
    /// ```
    #[must_use]
    pub fn fisher_left_tail(&self, table: &LogFactorialTable) -> f64 {
        let Self { a, b, c, d } = *self;
        // w = d - (a - x) must stay non-negative
        let lowest = a.saturating_sub(d);
        let terms = (lowest..=a).map(|x| {
            Self {
                a: x,
                b: a + b - x,
                c: a + c - x,
                d: d + x - a,
            }
            .log_probability(table)
        });
        // A tail probability can round slightly above 1.
        log_space::log_sum_exp(terms).min(0.0)
    }
}
