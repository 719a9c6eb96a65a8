//! Hybrid document assembly for retried runs.
//!
//! Stages before the retry frontier keep the exact resolved content of the
//! previous run so their plan nodes keep stable identities and can be
//! replayed. Selected stages and everything after the frontier use the
//! current run's resolved content.

use super::{PipelineDocument, StageSlot, StructuralSkeleton};
use crate::errors::{InvalidRequestError, RetryError, RetryResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// The result of splitting two documents around a retry frontier.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitOutcome {
    /// The hybrid document for the retried run.
    pub document: PipelineDocument,
    /// Identifiers of replayed stages, in linear order.
    pub skipped_stage_identifiers: Vec<String>,
}

/// Serializable view of a [`SplitOutcome`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitSummary {
    /// Hybrid document rendered as JSON.
    pub processed_yaml: String,
    /// Identifiers of replayed stages, in linear order.
    pub skipped_stage_identifiers: Vec<String>,
}

/// Builds the hybrid document for retrying `retry_stage_identifiers`.
///
/// # Errors
///
/// Returns an invalid request error if the selection is empty, names a stage
/// the current document does not contain, or if the two documents do not
/// share the same structural skeleton.
pub fn split<S: AsRef<str>>(
    previous: &PipelineDocument,
    current: &PipelineDocument,
    retry_stage_identifiers: &[S],
) -> RetryResult<SplitOutcome> {
    if retry_stage_identifiers.is_empty() {
        return Err(RetryError::invalid_request("No stages selected for retry"));
    }

    let previous_slots = previous.stage_slots()?;
    let current_slots = current.stage_slots()?;
    if StructuralSkeleton::from_slots(&previous_slots) != StructuralSkeleton::from_slots(&current_slots) {
        return Err(RetryError::invalid_request(
            "The previous and current pipeline documents have different stage structure",
        ));
    }

    let selected: HashSet<&str> = retry_stage_identifiers.iter().map(AsRef::as_ref).collect();
    let mut unknown: Vec<String> = selected
        .iter()
        .filter(|id| !current_slots.iter().any(|s| s.identifier == **id))
        .map(ToString::to_string)
        .collect();
    if !unknown.is_empty() {
        unknown.sort();
        return Err(InvalidRequestError::new("Retry stages are not present in the pipeline")
            .with_stages(unknown)
            .into());
    }

    let frontier = frontier_group(&current_slots, &selected);
    let mut document = current.clone();
    let mut skipped_stage_identifiers = Vec::new();

    for (slot, previous_slot) in current_slots.iter().zip(&previous_slots) {
        if !is_replayed(slot, frontier, &selected) {
            continue;
        }
        let stage = previous.stage_at(previous_slot.path).cloned().ok_or_else(|| {
            InvalidRequestError::new("Skipped stage is missing from the previous run")
                .with_stages(vec![slot.identifier.clone()])
        })?;
        if !document.replace_stage_at(slot.path, stage) {
            return Err(RetryError::invalid_request(format!(
                "Stage {} could not be carried over from the previous run",
                slot.identifier
            )));
        }
        skipped_stage_identifiers.push(slot.identifier.clone());
    }

    debug!(
        frontier,
        skipped = skipped_stage_identifiers.len(),
        retried = selected.len(),
        "Split pipeline document for retry"
    );

    Ok(SplitOutcome {
        document,
        skipped_stage_identifiers,
    })
}

/// Splits YAML documents and renders the hybrid as JSON.
///
/// # Errors
///
/// Returns an error if either document cannot be parsed, or as [`split`].
pub fn split_yaml<S: AsRef<str>>(
    previous_yaml: &str,
    current_yaml: &str,
    retry_stage_identifiers: &[S],
) -> RetryResult<SplitSummary> {
    let previous = PipelineDocument::from_yaml(previous_yaml)?;
    let current = PipelineDocument::from_yaml(current_yaml)?;
    let outcome = split(&previous, &current, retry_stage_identifiers)?;
    Ok(SplitSummary {
        processed_yaml: outcome.document.to_json_string()?,
        skipped_stage_identifiers: outcome.skipped_stage_identifiers,
    })
}

fn frontier_group(slots: &[StageSlot], selected: &HashSet<&str>) -> usize {
    slots
        .iter()
        .filter(|s| selected.contains(s.identifier.as_str()))
        .map(|s| s.path.group)
        .min()
        .unwrap_or(0)
}

fn is_replayed(slot: &StageSlot, frontier: usize, selected: &HashSet<&str>) -> bool {
    slot.path.group < frontier
        || (slot.path.group == frontier && !selected.contains(slot.identifier.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PipelineVersion;
    use crate::testing::fixtures::{golden_v0_document, golden_v1_document};
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    fn split_v0(ids: &[&str]) -> SplitOutcome {
        split(&golden_v0_document("prev"), &golden_v0_document("cur"), ids).unwrap()
    }

    fn split_v1(ids: &[&str]) -> SplitOutcome {
        split(&golden_v1_document("prev"), &golden_v1_document("cur"), ids).unwrap()
    }

    fn origin_of(outcome: &SplitOutcome, identifier: &str) -> String {
        let slot = outcome
            .document
            .stage_slots()
            .unwrap()
            .into_iter()
            .find(|s| s.identifier == identifier)
            .unwrap();
        let stage = outcome.document.stage_at(slot.path).unwrap();
        let description = match outcome.document.version() {
            PipelineVersion::V0 => stage.pointer("/stage/description"),
            PipelineVersion::V1 => stage.get("description"),
        };
        description.and_then(Value::as_str).unwrap().to_string()
    }

    #[test]
    fn test_first_stage_retry_skips_nothing() {
        let outcome = split_v0(&["stage1"]);
        assert!(outcome.skipped_stage_identifiers.is_empty());
        assert_eq!(outcome.document, golden_v0_document("cur"));
    }

    #[test]
    fn test_sequential_stage_retry() {
        let outcome = split_v0(&["stage7"]);
        assert_eq!(
            outcome.skipped_stage_identifiers,
            vec!["stage1", "stage2", "stage3", "stage4", "stage5", "stage6"]
        );
        assert_eq!(origin_of(&outcome, "stage6"), "prev");
        assert_eq!(origin_of(&outcome, "stage7"), "cur");
        assert_eq!(origin_of(&outcome, "stage8"), "cur");
    }

    #[test]
    fn test_last_stage_retry_skips_parallel_sibling() {
        let outcome = split_v0(&["stage9"]);
        assert_eq!(
            outcome.skipped_stage_identifiers,
            vec!["stage1", "stage2", "stage3", "stage4", "stage5", "stage6", "stage7", "stage8"]
        );
        assert_eq!(origin_of(&outcome, "stage8"), "prev");
        assert_eq!(origin_of(&outcome, "stage9"), "cur");
    }

    #[test]
    fn test_partial_parallel_retry() {
        let outcome = split_v0(&["stage3", "stage5"]);
        assert_eq!(outcome.skipped_stage_identifiers, vec!["stage1", "stage2", "stage4"]);
        assert_eq!(origin_of(&outcome, "stage4"), "prev");
        assert_eq!(origin_of(&outcome, "stage5"), "cur");
    }

    #[test]
    fn test_whole_parallel_group_retry() {
        let outcome = split_v0(&["stage3", "stage4", "stage5"]);
        assert_eq!(outcome.skipped_stage_identifiers, vec!["stage1", "stage2"]);
    }

    #[test]
    fn test_later_selection_does_not_move_frontier() {
        let outcome = split_v0(&["stage9", "stage4"]);
        assert_eq!(outcome.skipped_stage_identifiers, vec!["stage1", "stage2", "stage3", "stage5"]);
        assert_eq!(origin_of(&outcome, "stage8"), "cur");
    }

    #[test]
    fn test_v1_layout() {
        assert!(split_v1(&["stage1"]).skipped_stage_identifiers.is_empty());
        assert_eq!(
            split_v1(&["stage2_1", "stage2_2"]).skipped_stage_identifiers,
            vec!["stage1", "stage1_1", "stage1_2"]
        );
        let outcome = split_v1(&["stage2_2"]);
        assert_eq!(
            outcome.skipped_stage_identifiers,
            vec!["stage1", "stage1_1", "stage1_2", "stage2_1"]
        );
        assert_eq!(origin_of(&outcome, "stage2_1"), "prev");
        assert_eq!(origin_of(&outcome, "stage3"), "cur");
        assert_eq!(split_v1(&["stage1_1", "stage1_2"]).skipped_stage_identifiers, vec!["stage1"]);
    }

    #[test]
    fn test_empty_selection_is_invalid_request() {
        let empty: [&str; 0] = [];
        let err = split(&golden_v0_document("prev"), &golden_v0_document("cur"), &empty).unwrap_err();
        assert!(err.is_invalid_request());
    }

    #[test]
    fn test_unknown_stage_is_invalid_request() {
        let err = split(&golden_v0_document("prev"), &golden_v0_document("cur"), &["stage42"]).unwrap_err();
        match err {
            RetryError::InvalidRequest(inner) => assert_eq!(inner.stages, vec!["stage42"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_identifiers_outside_identifier_charset_are_split() {
        let document = |label: &str| {
            PipelineDocument::from_value(serde_json::json!({
                "pipeline": {"stages": [
                    {"stage": {"identifier": "build-app", "description": label}},
                    {"stage": {"identifier": "deploy-prod", "description": label}},
                ]}
            }))
        };
        let outcome = split(&document("prev"), &document("cur"), &["deploy-prod"]).unwrap();

        assert_eq!(outcome.skipped_stage_identifiers, vec!["build-app"]);
        assert_eq!(origin_of(&outcome, "build-app"), "prev");
        assert_eq!(origin_of(&outcome, "deploy-prod"), "cur");
    }

    #[test]
    fn test_structural_drift_is_invalid_request() {
        let err = split(&golden_v0_document("prev"), &golden_v1_document("cur"), &["stage1"]).unwrap_err();
        assert!(err.is_invalid_request());
    }

    #[test]
    fn test_split_yaml_renders_json() {
        let previous = golden_v0_document("prev").to_yaml_string().unwrap();
        let current = golden_v0_document("cur").to_yaml_string().unwrap();
        let summary = split_yaml(&previous, &current, &["stage2"]).unwrap();

        assert_eq!(summary.skipped_stage_identifiers, vec!["stage1"]);
        let rendered: Value = serde_json::from_str(&summary.processed_yaml).unwrap();
        assert_eq!(rendered.pointer("/pipeline/stages/0/stage/description"), Some(&Value::from("prev")));
        assert_eq!(rendered.pointer("/pipeline/stages/1/stage/description"), Some(&Value::from("cur")));
    }
}
