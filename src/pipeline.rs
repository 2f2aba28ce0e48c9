use crate::config::IntuneConfig;
use crate::intune::{GraphCredentials, GraphTransport, SubmissionClient};
use crate::parser;
use crate::types::{BatchReport, IssueKind, ValidationIssue};
use crate::validator;
use tracing::{info, instrument, warn};

/// Sequences Parser → Validator → Submission Client and reduces the results
/// into one `BatchReport`. Holds no state across runs; concurrent runs with
/// different inputs are independent.
pub struct ImportPipeline {
    client: SubmissionClient,
    max_batch_size: usize,
    min_hash_length: usize,
}

impl ImportPipeline {
    pub fn new(config: &IntuneConfig, transport: Box<dyn GraphTransport>) -> Self {
        Self {
            client: SubmissionClient::new(transport),
            max_batch_size: config.max_batch_size,
            min_hash_length: config.min_hash_length,
        }
    }

    /// Full run from raw text content (pasted hashes or a CSV export).
    #[instrument(skip(self, raw_content, credentials), fields(group_tag = %group_tag))]
    pub async fn run(
        &self,
        raw_content: &str,
        group_tag: &str,
        credentials: &GraphCredentials,
    ) -> BatchReport {
        let identifiers = parser::parse(raw_content);
        self.run_parsed(identifiers, group_tag, credentials).await
    }

    /// Run from an already-parsed identifier list, the shape the HTTP entry
    /// point receives.
    pub async fn run_parsed(
        &self,
        identifiers: Vec<String>,
        group_tag: &str,
        credentials: &GraphCredentials,
    ) -> BatchReport {
        let batch_size = identifiers.len();

        let issues =
            validator::validate(&identifiers, self.max_batch_size, self.min_hash_length);
        if !issues.is_empty() {
            // Fail fast: submission is never attempted for an invalid batch
            warn!(
                "validation failed with {} issue(s), batch_size={batch_size}",
                issues.len()
            );
            return BatchReport::validation_failed(batch_size, issues);
        }

        info!("validation passed, submitting batch_size={batch_size}");
        let outcome = self
            .client
            .submit(&identifiers, group_tag, credentials)
            .await;

        if outcome.overall_success {
            info!(
                "submission succeeded: processed={} failed={}",
                outcome.processed_count, outcome.failed_count
            );
            return BatchReport::submitted(batch_size, outcome);
        }

        // A remote failure joins the same taxonomy as local validation so the
        // caller handles one failure shape.
        warn!("submission failed: {}", outcome.message);
        let mut issue =
            ValidationIssue::new(IssueKind::SubmissionError, outcome.message.clone());
        if let Some(detail) = outcome.raw_detail.clone() {
            issue = issue.with_detail(detail);
        }
        BatchReport::validation_failed(batch_size, vec![issue])
    }
}
