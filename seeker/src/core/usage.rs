//! Usage accounting for a single session.
//!
//! The ledger is a pure counter with no knowledge of what consumed the
//! units. It is passed by `&mut` reference through every engine and tool
//! call so nested costs bill the same session total.

use std::error::Error;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Ceilings applied to a session's ledger.
///
/// `None` disables the corresponding bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageLimits {
    /// Maximum number of engine requests, nested tool requests included.
    pub request_limit: Option<u32>,
    /// Maximum total units reported by the engine across the session.
    pub unit_ceiling: Option<u64>,
}

impl Default for UsageLimits {
    fn default() -> Self {
        Self {
            request_limit: Some(15),
            unit_ceiling: None,
        }
    }
}

/// Raised when a request or charge would exceed the configured limits.
///
/// Fatal to the session: propagated to the session loop, never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetExceededError {
    /// Requests committed before the rejected operation.
    pub requests: u32,
    /// Units committed before the rejected operation.
    pub units: u64,
    /// Which bound was hit.
    pub detail: String,
}

impl fmt::Display for BudgetExceededError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "usage budget exceeded: {} (requests={}, units={})",
            self.detail, self.requests, self.units
        )
    }
}

impl Error for BudgetExceededError {}

/// Monotonic counter of consumed usage for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UsageLedger {
    requests: u32,
    units: u64,
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine requests committed so far, nested tool requests included.
    pub fn requests(&self) -> u32 {
        self.requests
    }

    /// Usage units committed so far.
    pub fn units(&self) -> u64 {
        self.units
    }

    /// Fail if one more engine request would exceed the request limit.
    ///
    /// Checked before every engine invocation. Never mutates the ledger.
    pub fn check_request(&self, limits: &UsageLimits) -> Result<(), BudgetExceededError> {
        if let Some(limit) = limits.request_limit
            && self.requests >= limit
        {
            return Err(self.exceeded(format!("request limit {limit} reached")));
        }
        Ok(())
    }

    /// Record one completed request and its reported unit cost.
    ///
    /// The post-charge totals are checked before committing: a rejected
    /// charge leaves the ledger unmodified, so there is no partial charge.
    pub fn charge(&mut self, units: u64, limits: &UsageLimits) -> Result<(), BudgetExceededError> {
        let next_requests = self.requests.saturating_add(1);
        let next_units = self.units.saturating_add(units);
        if let Some(limit) = limits.request_limit
            && next_requests > limit
        {
            return Err(self.exceeded(format!("request limit {limit} exceeded")));
        }
        if let Some(ceiling) = limits.unit_ceiling
            && next_units > ceiling
        {
            return Err(self.exceeded(format!("unit ceiling {ceiling} exceeded")));
        }
        self.requests = next_requests;
        self.units = next_units;
        Ok(())
    }

    /// Snapshot of the totals for outcome reporting.
    pub fn report(&self) -> UsageReport {
        UsageReport {
            requests: self.requests,
            units: self.units,
        }
    }

    fn exceeded(&self, detail: String) -> BudgetExceededError {
        BudgetExceededError {
            requests: self.requests,
            units: self.units,
            detail,
        }
    }
}

/// Final totals surfaced with every session outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UsageReport {
    pub requests: u32,
    pub units: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(request_limit: Option<u32>, unit_ceiling: Option<u64>) -> UsageLimits {
        UsageLimits {
            request_limit,
            unit_ceiling,
        }
    }

    /// Charges fail exactly when the running sum would first exceed the
    /// ceiling, and a failed charge leaves the counters untouched.
    #[test]
    fn charge_rejects_at_first_would_exceed_without_partial_charge() {
        let limits = limits(None, Some(10));
        let mut ledger = UsageLedger::new();

        ledger.charge(4, &limits).expect("first charge");
        ledger.charge(6, &limits).expect("second charge");
        assert_eq!(ledger.units(), 10);
        assert_eq!(ledger.requests(), 2);

        let err = ledger.charge(1, &limits).expect_err("over ceiling");
        assert!(err.detail.contains("unit ceiling 10"));
        assert_eq!(ledger.units(), 10);
        assert_eq!(ledger.requests(), 2);
    }

    #[test]
    fn check_request_fails_at_limit_and_never_mutates() {
        let limits = limits(Some(2), None);
        let mut ledger = UsageLedger::new();

        ledger.check_request(&limits).expect("headroom");
        ledger.charge(1, &limits).expect("charge 1");
        ledger.charge(1, &limits).expect("charge 2");

        let err = ledger.check_request(&limits).expect_err("limit reached");
        assert_eq!(err.requests, 2);
        assert_eq!(ledger.requests(), 2);
    }

    #[test]
    fn charge_rejects_request_over_limit() {
        let limits = limits(Some(1), None);
        let mut ledger = UsageLedger::new();
        ledger.charge(3, &limits).expect("first request");

        let err = ledger.charge(0, &limits).expect_err("second request");
        assert!(err.detail.contains("request limit 1"));
        assert_eq!(ledger.report().units, 3);
    }

    #[test]
    fn unlimited_ledger_accepts_any_sequence() {
        let limits = limits(None, None);
        let mut ledger = UsageLedger::new();
        for units in [0, 1, 100, u64::MAX] {
            ledger.charge(units, &limits).expect("charge");
        }
        assert_eq!(ledger.units(), u64::MAX);
        assert_eq!(ledger.requests(), 4);
    }
}
