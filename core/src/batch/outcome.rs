use serde::Serialize;

pub const FULL_SUCCESS_MESSAGE: &str = "Batch update completed successfully";
pub const PARTIAL_SUCCESS_MESSAGE: &str =
    "Batch update partially completed: some documents were not found";
pub const FAILURE_MESSAGE: &str = "Batch update failed: all changes were rolled back";
pub const UNDETERMINED_MESSAGE: &str = "Batch update failed while closing the transaction: \
                                        the final state of the store is undetermined";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStatus {
    Applied,
    SkippedNoMatch,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateOutcome {
    pub request_id: String,
    pub status: UpdateStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl UpdateOutcome {
    pub fn applied(request_id: impl Into<String>) -> Self {
        Self { request_id: request_id.into(), status: UpdateStatus::Applied, message: None }
    }

    pub fn skipped(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            status: UpdateStatus::SkippedNoMatch,
            message: Some(message.into()),
        }
    }

    pub fn failed(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            status: UpdateStatus::Failed,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResult {
    pub success: bool,
    pub applied_count: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub message: String,
    /// Whether the batch transaction was committed.
    pub committed: bool,
    pub outcomes: Vec<UpdateOutcome>,
}

impl BatchResult {
    pub fn has_failures(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Records an error raised while committing or rolling back. Nothing can be said about what
    /// the store holds afterwards.
    pub fn with_transaction_failure(mut self, error: impl Into<String>) -> Self {
        self.errors.push(error.into());
        self.success = false;
        self.committed = false;
        self.message = UNDETERMINED_MESSAGE.to_string();
        self
    }
}

/// Folds per-record outcomes into the batch result. `committed` is left `false`; only the
/// updater knows whether the transaction went through.
pub fn aggregate(outcomes: &[UpdateOutcome]) -> BatchResult {
    let mut applied_count = 0;
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for outcome in outcomes {
        let message = || {
            outcome
                .message
                .clone()
                .unwrap_or_else(|| format!("no details for {}", outcome.request_id))
        };

        match outcome.status {
            UpdateStatus::Applied => applied_count += 1,
            UpdateStatus::SkippedNoMatch => warnings.push(message()),
            UpdateStatus::Failed => errors.push(message()),
        }
    }

    let message = if !errors.is_empty() {
        FAILURE_MESSAGE
    } else if !warnings.is_empty() {
        PARTIAL_SUCCESS_MESSAGE
    } else {
        FULL_SUCCESS_MESSAGE
    };

    BatchResult {
        success: errors.is_empty() && warnings.is_empty(),
        applied_count,
        errors,
        warnings,
        message: message.to_string(),
        committed: false,
        outcomes: outcomes.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_applied() {
        let result = aggregate(&[
            UpdateOutcome::applied("F001-1"),
            UpdateOutcome::applied("F001-2"),
        ]);

        assert!(result.success);
        assert_eq!(result.applied_count, 2);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
        assert_eq!(result.message, FULL_SUCCESS_MESSAGE);
    }

    #[test]
    fn test_warnings_only_is_partial() {
        let result = aggregate(&[
            UpdateOutcome::applied("F001-1"),
            UpdateOutcome::skipped("F001-2", "no document found for F001-2"),
        ]);

        assert!(!result.success);
        assert_eq!(result.applied_count, 1);
        assert_eq!(result.warnings, vec!["no document found for F001-2"]);
        assert_eq!(result.message, PARTIAL_SUCCESS_MESSAGE);
    }

    #[test]
    fn test_error_takes_precedence() {
        let result = aggregate(&[
            UpdateOutcome::skipped("F001-1", "missing"),
            UpdateOutcome::failed("F001-2", "boom"),
            UpdateOutcome::applied("F001-3"),
        ]);

        assert!(!result.success);
        assert!(result.has_failures());
        assert_eq!(result.errors, vec!["boom"]);
        assert_eq!(result.warnings, vec!["missing"]);
        assert_eq!(result.applied_count, 1);
        assert_eq!(result.message, FAILURE_MESSAGE);
    }

    #[test]
    fn test_empty_is_success() {
        let result = aggregate(&[]);

        assert!(result.success);
        assert_eq!(result.applied_count, 0);
        assert!(result.outcomes.is_empty());
    }

    #[test]
    fn test_transaction_failure() {
        let result = aggregate(&[UpdateOutcome::applied("F001-1")])
            .with_transaction_failure("transaction error: connection reset");

        assert!(!result.success);
        assert!(!result.committed);
        assert_eq!(result.errors, vec!["transaction error: connection reset"]);
        assert_eq!(result.message, UNDETERMINED_MESSAGE);
    }

    #[test]
    fn test_serializes_to_json() {
        let result = aggregate(&[UpdateOutcome::skipped("F001-9", "not found")]);
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["success"], false);
        assert_eq!(json["applied_count"], 0);
        assert_eq!(json["outcomes"][0]["status"], "skipped_no_match");
        assert_eq!(json["outcomes"][0]["request_id"], "F001-9");
    }
}
