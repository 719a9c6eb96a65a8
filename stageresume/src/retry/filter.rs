//! Narrows a retry selection to the stages that actually failed.

use crate::core::StageRetryRecord;
use crate::errors::{InvalidRequestError, RetryResult};
use std::collections::HashSet;

/// Returns the requested identifiers whose recorded status is failed-class.
///
/// Every requested identifier must have a record; a single
/// unknown identifier invalidates the whole request. The result follows the
/// order of `records`.
///
/// # Errors
///
/// Returns an invalid-request error when `requested` is empty or names a
/// stage with no record.
pub fn only_failed_among<S: AsRef<str>>(
    records: &[StageRetryRecord],
    requested: &[S],
) -> RetryResult<Vec<String>> {
    if requested.is_empty() {
        return Err(InvalidRequestError::new("No stages were selected for retry").into());
    }

    let known: HashSet<&str> = records.iter().map(|r| r.identifier.as_str()).collect();
    let unknown: Vec<String> = requested
        .iter()
        .map(AsRef::as_ref)
        .filter(|id| !known.contains(id))
        .map(ToString::to_string)
        .collect();
    if !unknown.is_empty() {
        tracing::warn!(?unknown, "Retry requested for stages without execution records");
        return Err(InvalidRequestError::new(format!(
            "Stages {} were not part of the execution",
            unknown.join(", ")
        ))
        .with_stages(unknown)
        .into());
    }

    let wanted: HashSet<&str> = requested.iter().map(AsRef::as_ref).collect();
    let failed: Vec<String> = records
        .iter()
        .filter(|r| wanted.contains(r.identifier.as_str()) && r.status.is_failed_status())
        .map(|r| r.identifier.clone())
        .collect();

    tracing::debug!(
        requested = requested.len(),
        failed = failed.len(),
        "Filtered retry selection to failed stages"
    );

    Ok(failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ExecutionStatus;
    use pretty_assertions::assert_eq;

    fn record(id: &str, status: ExecutionStatus) -> StageRetryRecord {
        StageRetryRecord::new(id).with_status(status)
    }

    #[test]
    fn test_empty_request_is_invalid() {
        let err = only_failed_among::<&str>(&[], &[]).unwrap_err();
        assert!(err.is_invalid_request());
    }

    #[test]
    fn test_unknown_identifier_is_invalid() {
        let records = vec![StageRetryRecord::new("stage1")];
        let err = only_failed_among(&records, &["stage2"]).unwrap_err();
        assert!(err.is_invalid_request());
    }

    #[test]
    fn test_single_unknown_identifier_invalidates_whole_request() {
        let records = vec![record("stage1", ExecutionStatus::Failed)];
        let err = only_failed_among(&records, &["stage1", "ghost"]).unwrap_err();

        match err {
            crate::errors::RetryError::InvalidRequest(inner) => {
                assert_eq!(inner.stages, vec!["ghost".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_identifier_with_dashes_is_accepted() {
        let records = vec![
            record("deploy-prod", ExecutionStatus::Failed),
            record("smoke test", ExecutionStatus::Success),
        ];
        let failed = only_failed_among(&records, &["deploy-prod", "smoke test"]).unwrap();
        assert_eq!(failed, vec!["deploy-prod"]);
    }

    #[test]
    fn test_mixed_statuses_keep_only_failed() {
        let records = vec![
            record("stage1", ExecutionStatus::Success),
            record("stage2", ExecutionStatus::Aborted),
            record("stage3", ExecutionStatus::IgnoreFailed),
            record("stage4", ExecutionStatus::Failed),
            record("stage5", ExecutionStatus::Expired),
            record("stage6", ExecutionStatus::Approvalrejected),
            record("stage7", ExecutionStatus::ApprovalRejected),
        ];
        let requested = [
            "stage1", "stage2", "stage3", "stage4", "stage5", "stage6", "stage7",
        ];

        let failed = only_failed_among(&records, &requested).unwrap();
        assert_eq!(failed, vec!["stage2", "stage4", "stage5", "stage6", "stage7"]);
    }

    #[test]
    fn test_all_failed_returned_unchanged() {
        let records = vec![
            record("a", ExecutionStatus::Failed),
            record("b", ExecutionStatus::Expired),
        ];
        let failed = only_failed_among(&records, &["a", "b"]).unwrap();
        assert_eq!(failed, vec!["a", "b"]);
    }

    #[test]
    fn test_order_follows_records() {
        let records = vec![
            record("a", ExecutionStatus::Failed),
            record("b", ExecutionStatus::Failed),
        ];
        let failed = only_failed_among(&records, &["b", "a"]).unwrap();
        assert_eq!(failed, vec!["a", "b"]);
    }

    #[test]
    fn test_example_three_siblings() {
        let records = vec![
            record("s1", ExecutionStatus::Success).with_parent_group("p1"),
            record("s2", ExecutionStatus::Success).with_parent_group("p1"),
            record("s3", ExecutionStatus::Failed).with_parent_group("p1"),
        ];
        let failed = only_failed_among(&records, &["s1", "s2", "s3"]).unwrap();
        assert_eq!(failed, vec!["s3"]);
    }
}
