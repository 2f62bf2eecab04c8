//! Run-wide acceptance metrics and validation governance.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::candidacy::DeclineReason;
use super::AutoLayoutVerdict;

/// Counters across every container evaluated in a run.
///
/// `applied_safe + rejected == candidates` always holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutMetrics {
    /// Containers that received an auto-layout.
    pub candidates: u64,
    /// Candidates whose verdict was safe.
    pub applied_safe: u64,
    /// Candidates whose verdict was unsafe.
    pub rejected: u64,
    /// Rejection reason code → count.
    pub rejection_reasons: BTreeMap<String, u64>,
    /// Decline reason code → count (not candidates).
    pub declined: BTreeMap<String, u64>,
    /// Validations discarded for running over time.
    pub validation_timeouts: u64,
    /// Whether the circuit breaker opened during the run.
    pub circuit_open: bool,
}

impl LayoutMetrics {
    /// Count a committed verdict.
    pub fn record_verdict(&mut self, verdict: &AutoLayoutVerdict) {
        self.candidates += 1;
        if verdict.safe {
            self.applied_safe += 1;
        } else {
            self.rejected += 1;
            for reason in &verdict.reasons {
                *self.rejection_reasons.entry(reason.clone()).or_default() += 1;
            }
        }
    }

    /// Count a declined container.
    pub fn record_decline(&mut self, reason: DeclineReason) {
        *self.declined.entry(reason.code().to_string()).or_default() += 1;
    }

    /// Most frequent rejection reasons, ties broken by code.
    #[must_use]
    pub fn top_rejection_reasons(&self, limit: usize) -> Vec<ReasonCount> {
        let mut reasons: Vec<ReasonCount> = self
            .rejection_reasons
            .iter()
            .map(|(reason, count)| ReasonCount {
                reason: reason.clone(),
                count: *count,
            })
            .collect();
        reasons.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.reason.cmp(&b.reason)));
        reasons.truncate(limit);
        reasons
    }

    /// Summary for the output document.
    #[must_use]
    pub fn report(&self) -> LayoutMetricsReport {
        LayoutMetricsReport {
            candidates: self.candidates,
            applied_safe: self.applied_safe,
            rejected: self.rejected,
            top_rejection_reasons: self.top_rejection_reasons(5),
            declined: self.declined.clone(),
            validation_timeouts: self.validation_timeouts,
            circuit_open: self.circuit_open,
        }
    }
}

/// A reason code with its count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasonCount {
    /// Reason code.
    pub reason: String,
    /// Occurrences.
    pub count: u64,
}

/// Auto-layout metrics as emitted in the document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutMetricsReport {
    /// Containers that received an auto-layout.
    pub candidates: u64,
    /// Safe verdicts.
    pub applied_safe: u64,
    /// Unsafe verdicts.
    pub rejected: u64,
    /// Most frequent rejection reasons.
    pub top_rejection_reasons: Vec<ReasonCount>,
    /// Declines by reason.
    pub declined: BTreeMap<String, u64>,
    /// Discarded validations.
    pub validation_timeouts: u64,
    /// Circuit breaker state at the end of the run.
    pub circuit_open: bool,
}

/// Validation timeout counter with a circuit breaker.
///
/// Once open, the breaker stays open for the rest of the run.
#[derive(Debug, Clone)]
pub struct LayoutGovernor {
    timeout: Duration,
    threshold: u32,
    timeouts: u32,
    open: bool,
}

impl LayoutGovernor {
    /// New governor.
    #[must_use]
    pub fn new(timeout: Duration, threshold: u32) -> Self {
        Self {
            timeout,
            threshold,
            timeouts: 0,
            open: false,
        }
    }

    /// Record how long a validation took; returns `true` when it overran
    /// and its result must be discarded.
    pub fn record(&mut self, elapsed: Duration) -> bool {
        if elapsed < self.timeout {
            return false;
        }
        self.timeouts += 1;
        if !self.open && self.timeouts >= self.threshold {
            self.open = true;
            warn!(
                timeouts = self.timeouts,
                threshold = self.threshold,
                "auto-layout validation circuit breaker opened"
            );
        }
        true
    }

    /// Whether validation is short-circuited.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Timeouts seen so far.
    #[must_use]
    pub fn timeouts(&self) -> u32 {
        self.timeouts
    }
}
