use parking_lot::{RwLock, RwLockUpgradableReadGuard};

/// Grow-only memo of `ln(n!)`.
///
/// Entry `n` holds `ln(n!)`, with `ln(0!) = ln(1!) = 0` and
/// `ln(n!) = ln((n-1)!) + ln(n)`. The table is extended on demand and never
/// truncated, so a value once read stays valid for the lifetime of the table.
///
/// The table is `Sync`: lookups of already computed entries take a shared
/// read lock, and extension takes the lock exclusively. One table is meant to
/// be shared by every worker of a run.
///
/// # Examples
///
/// ```
/// use novelty_stats::log_factorial::LogFactorialTable;
///
/// let table = LogFactorialTable::new();
/// assert_eq!(table.get(0), 0.0);
/// assert_eq!(table.get(1), 0.0);
/// assert!((table.get(5) - 120.0_f64.ln()).abs() < 1e-12);
/// ```
#[derive(Debug)]
pub struct LogFactorialTable {
    values: RwLock<Vec<f64>>,
}

impl Default for LogFactorialTable {
    fn default() -> Self {
        Self::new()
    }
}

impl LogFactorialTable {
    /// Creates a table holding only `ln(0!)` and `ln(1!)`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: RwLock::new(vec![0.0, 0.0]),
        }
    }

    /// Creates a table pre-extended up to and including `ln(n!)`.
    #[must_use]
    pub fn with_capacity(n: usize) -> Self {
        let table = Self::new();
        let _ = table.get(n);
        table
    }

    /// Number of entries computed so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Always `false`: the two base entries exist from construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    /// Returns `ln(n!)`, extending the table if needed.
    #[must_use]
    pub fn get(&self, n: usize) -> f64 {
        if let Some(&value) = self.values.read().get(n) {
            return value;
        }
        // another thread may have extended the table between the two locks
        let values = self.values.upgradable_read();
        if let Some(&value) = values.get(n) {
            return value;
        }
        let mut values = RwLockUpgradableReadGuard::upgrade(values);
        extend(&mut values, n);
        values[n]
    }

    /// Returns `ln(Γ(df / 2))` for a positive integer `df`.
    ///
    /// Even `df` reduces to a factorial; odd `df` uses the half-integer identity
    /// `Γ(k + ½) = (2k)! √π / (4^k k!)`.
    #[must_use]
    pub fn ln_gamma_half(&self, df: usize) -> f64 {
        debug_assert!(df > 0, "ln Γ(0) is undefined");
        if df % 2 == 0 {
            self.get(df / 2 - 1)
        } else {
            let k = (df - 1) / 2;
            #[expect(clippy::cast_precision_loss)]
            let two_k = (2 * k) as f64;
            self.get(2 * k) - two_k * std::f64::consts::LN_2 - self.get(k)
                + 0.5 * std::f64::consts::PI.ln()
        }
    }
}

#[expect(clippy::cast_precision_loss)]
fn extend(values: &mut Vec<f64>, n: usize) {
    values.reserve((n + 1).saturating_sub(values.len()));
    while values.len() <= n {
        let k = values.len();
        let prev = values[k - 1];
        values.push(prev + (k as f64).ln());
    }
}
