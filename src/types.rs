use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Classes of problems a batch can exhibit, locally or during submission.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// The batch contained no identifiers at all
    Empty,
    /// The batch exceeded the configured maximum size
    TooMany,
    /// One or more identifiers failed the Base64/length format check
    InvalidFormat,
    /// One or more identifiers appeared more than once
    Duplicate,
    /// The remote enrollment service rejected the batch or part of it
    SubmissionError,
}

/// One class of problem found while validating or submitting a batch.
///
/// Issues of the same kind are merged: repeated findings increment
/// `affected_count` on a single instance instead of producing new entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub message: String,
    /// Number of identifiers contributing to this issue, when countable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected_count: Option<usize>,
    /// Opaque diagnostic payload, e.g. a raw API error body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

impl ValidationIssue {
    pub fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            affected_count: None,
            detail: None,
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.affected_count = Some(count);
        self
    }

    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// Result of contacting the enrollment service for one batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    pub overall_success: bool,
    pub processed_count: usize,
    pub failed_count: usize,
    pub message: String,
    /// Raw response payload kept for diagnostics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_detail: Option<serde_json::Value>,
}

impl SubmissionOutcome {
    /// Failure outcome where the whole batch counts as failed.
    pub fn failed(batch_size: usize, message: impl Into<String>) -> Self {
        Self {
            overall_success: false,
            processed_count: 0,
            failed_count: batch_size,
            message: message.into(),
            raw_detail: None,
        }
    }
}

/// Terminal result of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    /// Local validation (or submission) produced issues; nothing was enrolled
    ValidationFailed { issues: Vec<ValidationIssue> },
    /// The batch was submitted; see the outcome for per-record accounting
    Submitted { outcome: SubmissionOutcome },
}

/// The final artifact of one pipeline run. Created once, immutable,
/// not persisted here; display and storage are the caller's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub batch_size: usize,
    pub completed_at: DateTime<Utc>,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

impl BatchReport {
    pub fn validation_failed(batch_size: usize, issues: Vec<ValidationIssue>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            batch_size,
            completed_at: Utc::now(),
            outcome: BatchOutcome::ValidationFailed { issues },
        }
    }

    pub fn submitted(batch_size: usize, outcome: SubmissionOutcome) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            batch_size,
            completed_at: Utc::now(),
            outcome: BatchOutcome::Submitted { outcome },
        }
    }

    pub fn is_success(&self) -> bool {
        match &self.outcome {
            BatchOutcome::Submitted { outcome } => outcome.overall_success,
            BatchOutcome::ValidationFailed { .. } => false,
        }
    }

    /// Human-readable summary of the run, regardless of outcome shape.
    pub fn summary(&self) -> String {
        match &self.outcome {
            BatchOutcome::Submitted { outcome } => outcome.message.clone(),
            BatchOutcome::ValidationFailed { issues } => issues
                .iter()
                .map(|issue| match issue.affected_count {
                    Some(count) => format!("{} ({} affected)", issue.message, count),
                    None => issue.message.clone(),
                })
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}
