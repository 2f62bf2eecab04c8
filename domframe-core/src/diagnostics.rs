//! # Diagnostics
//!
//! Bounded log of classified problems found during a run.
//!
//! ## Severities
//!
//! ```text
//! warning   non-fatal and expected (one asset failed, an unparseable color)
//! error     a subsystem failed for one node; traversal continues
//! critical  the run is aborted
//! ```
//!
//! The log keeps the most recent entries only; counts keep growing after
//! old entries are evicted, so the summary always reflects the whole run.

use std::collections::VecDeque;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Severity of a diagnostics entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Non-fatal and expected.
    Warning,
    /// A subsystem failed for one node.
    Error,
    /// The run was aborted.
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        })
    }
}

/// One logged problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticEntry {
    /// Severity.
    pub severity: Severity,
    /// Where it happened (node path, asset URL, subsystem).
    pub location: String,
    /// What happened.
    pub message: String,
    /// When it was logged (ms since epoch).
    pub timestamp: u64,
}

/// Running totals per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticCounts {
    /// Warnings.
    pub warnings: u64,
    /// Errors.
    pub errors: u64,
    /// Critical failures.
    pub critical: u64,
}

impl DiagnosticCounts {
    /// Total entries ever logged.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.warnings + self.errors + self.critical
    }
}

/// Diagnostics section of the output document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsSummary {
    /// Counts over the whole run.
    #[serde(flatten)]
    pub counts: DiagnosticCounts,
    /// Entries evicted from the log.
    pub dropped: u64,
    /// Retained entries, oldest first.
    pub entries: Vec<DiagnosticEntry>,
}

/// Fixed-capacity diagnostics log.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    entries: VecDeque<DiagnosticEntry>,
    capacity: usize,
    counts: DiagnosticCounts,
    dropped: u64,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::with_capacity(200)
    }
}

impl Diagnostics {
    /// Log retaining at most `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            counts: DiagnosticCounts::default(),
            dropped: 0,
        }
    }

    /// Log a warning.
    pub fn warn(&mut self, location: impl Into<String>, message: impl Into<String>) {
        self.push(Severity::Warning, location.into(), message.into());
    }

    /// Log an error.
    pub fn error(&mut self, location: impl Into<String>, message: impl Into<String>) {
        self.push(Severity::Error, location.into(), message.into());
    }

    /// Log a critical failure.
    pub fn critical(&mut self, location: impl Into<String>, message: impl Into<String>) {
        self.push(Severity::Critical, location.into(), message.into());
    }

    /// Log an entry of any severity; it is also emitted as a tracing event.
    pub fn push(&mut self, severity: Severity, location: String, message: String) {
        match severity {
            Severity::Warning => {
                self.counts.warnings += 1;
                tracing::warn!(location = %location, "{message}");
            }
            Severity::Error => {
                self.counts.errors += 1;
                tracing::error!(location = %location, "{message}");
            }
            Severity::Critical => {
                self.counts.critical += 1;
                tracing::error!(location = %location, critical = true, "{message}");
            }
        }

        if self.capacity == 0 {
            self.dropped += 1;
            return;
        }
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
            self.dropped += 1;
        }
        self.entries.push_back(DiagnosticEntry {
            severity,
            location,
            message,
            timestamp: now_millis(),
        });
    }

    /// Counts over the whole run.
    #[must_use]
    pub fn counts(&self) -> DiagnosticCounts {
        self.counts
    }

    /// Errors logged so far (drives degraded mode).
    #[must_use]
    pub fn errors(&self) -> u64 {
        self.counts.errors
    }

    /// Retained entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &DiagnosticEntry> {
        self.entries.iter()
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot for the output document.
    #[must_use]
    pub fn summary(&self) -> DiagnosticsSummary {
        DiagnosticsSummary {
            counts: self.counts,
            dropped: self.dropped,
            entries: self.entries.iter().cloned().collect(),
        }
    }
}

/// Current time in milliseconds since the Unix epoch.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
