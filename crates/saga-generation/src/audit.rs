//! Attempt auditing
//!
//! Every attempt made by the [`RetryingCaller`](crate::RetryingCaller) is
//! reported to an [`AuditSink`]. The narrative state implements the sink so
//! each attempt becomes one round in its action log; [`CallLog`] is a plain
//! append-only sink for tools and tests.

use crate::role::PromptRole;
use crate::DecodeStrategy;
use serde::{Deserialize, Serialize};

/// Outcome of one attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Response decoded
    Success {
        /// Decode strategy used, `None` for prose calls
        strategy: Option<DecodeStrategy>,
    },
    /// Attempt failed and will be retried
    Retrying {
        /// Failure message
        error: String,
    },
    /// Attempt failed and no attempts remain
    Failed {
        /// Failure message
        error: String,
    },
}

impl AttemptOutcome {
    /// Whether this attempt succeeded
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// One generation attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// Role that issued the call
    pub role: PromptRole,
    /// 1-based attempt number within the logical call
    pub attempt: u32,
    /// Configured attempt budget
    pub max_attempts: u32,
    /// Wall time spent on this attempt
    pub elapsed_ms: u64,
    /// What happened
    pub outcome: AttemptOutcome,
}

/// Receiver of attempt records
pub trait AuditSink: Send {
    /// Record one attempt
    fn record_attempt(&mut self, record: AttemptRecord);
}

/// Append-only attempt log
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    records: Vec<AttemptRecord>,
}

impl CallLog {
    /// Create empty log
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records so far
    #[inline]
    #[must_use]
    pub fn records(&self) -> &[AttemptRecord] {
        &self.records
    }

    /// Number of records
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has been recorded
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl AuditSink for CallLog {
    fn record_attempt(&mut self, record: AttemptRecord) {
        self.records.push(record);
    }
}
