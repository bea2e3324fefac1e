//! Objective vectors and Pareto dominance (C1).

use serde::{Deserialize, Serialize};

/// The six objectives tracked for every evaluated individual, plus a
/// `success` flag marking whether the evaluator could produce a usable
/// result at all.
///
/// `max_drawdown` is stored non-positive (zero or negative); comparisons
/// treat values closer to zero as better, matching every other field's
/// "larger is better" convention.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveVector {
    pub sharpe: f64,
    pub calmar: f64,
    pub max_drawdown: f64,
    pub total_return: f64,
    pub win_rate: f64,
    pub annual_return: f64,
    pub success: bool,
}

impl ObjectiveVector {
    pub fn new(
        sharpe: f64,
        calmar: f64,
        max_drawdown: f64,
        total_return: f64,
        win_rate: f64,
        annual_return: f64,
    ) -> Self {
        Self {
            sharpe,
            calmar,
            max_drawdown,
            total_return,
            win_rate,
            annual_return,
            success: true,
        }
    }

    /// A metrics vector recording an evaluation that failed to produce a
    /// usable result. All objectives are left at their worst possible
    /// value so a failed individual is always dominated by a successful one.
    pub fn failed() -> Self {
        Self {
            sharpe: f64::NEG_INFINITY,
            calmar: f64::NEG_INFINITY,
            max_drawdown: f64::NEG_INFINITY,
            total_return: f64::NEG_INFINITY,
            win_rate: f64::NEG_INFINITY,
            annual_return: f64::NEG_INFINITY,
            success: false,
        }
    }

    fn as_tuple(&self) -> [f64; 6] {
        [
            self.sharpe,
            self.calmar,
            self.max_drawdown,
            self.total_return,
            self.win_rate,
            self.annual_return,
        ]
    }

    /// Returns `true` if `self` Pareto-dominates `other`: at least as good
    /// in every objective, and strictly better in at least one.
    ///
    /// Individuals with `success = false` are incomparable with anything:
    /// a failed individual never dominates, and is never dominated by this
    /// method's result alone (callers must check `success` on both sides
    /// before trusting this, per the crowding/sort contracts which filter
    /// failed individuals out up front).
    pub fn dominates(&self, other: &Self) -> bool {
        if !self.success || !other.success {
            return false;
        }
        let a = self.as_tuple();
        let b = other.as_tuple();
        let mut strictly_better = false;
        for i in 0..a.len() {
            if a[i] < b[i] {
                return false;
            }
            if a[i] > b[i] {
                strictly_better = true;
            }
        }
        strictly_better
    }
}
