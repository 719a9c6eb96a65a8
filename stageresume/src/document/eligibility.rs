//! Structural retry eligibility.

use super::{PipelineDocument, StructuralSkeleton};
use tracing::debug;

/// Returns true if a retry against `original` may run with `updated`.
///
/// Both definitions must be present, non-blank and parseable, and their
/// structural skeletons must be identical. Display names, descriptions and
/// stage contents may differ freely.
#[must_use]
pub fn is_retry_valid(updated: Option<&str>, original: Option<&str>) -> bool {
    let (Some(updated), Some(original)) = (updated, original) else {
        return false;
    };
    if updated.trim().is_empty() || original.trim().is_empty() {
        return false;
    }

    match (PipelineDocument::from_yaml(updated), PipelineDocument::from_yaml(original)) {
        (Ok(updated), Ok(original)) => skeletons_match(&updated, &original),
        (Err(err), _) | (_, Err(err)) => {
            debug!(error = %err, "Retry definition could not be parsed");
            false
        }
    }
}

/// Returns true if both documents have the same structural skeleton.
#[must_use]
pub fn skeletons_match(updated: &PipelineDocument, original: &PipelineDocument) -> bool {
    if updated.is_empty() || original.is_empty() {
        return false;
    }

    match (
        StructuralSkeleton::extract(updated),
        StructuralSkeleton::extract(original),
    ) {
        (Ok(a), Ok(b)) => {
            let matches = a == b;
            debug!(
                updated = %a.fingerprint(),
                original = %b.fingerprint(),
                matches,
                "Compared pipeline skeletons"
            );
            matches
        }
        (Err(err), _) | (_, Err(err)) => {
            debug!(error = %err, "Pipeline skeleton could not be extracted");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGINAL: &str = r"
pipeline:
  identifier: rc
  stages:
    - stage:
        identifier: stage1
        name: stage1
        spec:
          execution:
            steps:
              - step:
                  identifier: ShellScript_1
    - stage:
        identifier: stage2
        name: stage2
    - parallel:
        - stage:
            identifier: stage3
            name: stage3
        - stage:
            identifier: stage4
            name: stage4
";

    fn edited(from: &str, to: &str) -> String {
        ORIGINAL.replacen(from, to, 1)
    }

    #[test]
    fn test_absent_or_blank_is_invalid() {
        assert!(!is_retry_valid(None, Some(ORIGINAL)));
        assert!(!is_retry_valid(Some(ORIGINAL), None));
        assert!(!is_retry_valid(Some(""), Some(ORIGINAL)));
        assert!(!is_retry_valid(Some(ORIGINAL), Some("   ")));
    }

    #[test]
    fn test_reflexive() {
        assert!(is_retry_valid(Some(ORIGINAL), Some(ORIGINAL)));
    }

    #[test]
    fn test_renamed_stage_is_valid() {
        let updated = edited("name: stage2", "name: Deploy to prod");
        assert!(is_retry_valid(Some(&updated), Some(ORIGINAL)));
    }

    #[test]
    fn test_changed_description_is_valid() {
        let described = edited("        name: stage2\n", "        name: stage2\n        description: first cut\n");
        let updated = described.replacen("description: first cut", "description: ships to prod", 1);
        assert!(is_retry_valid(Some(&updated), Some(&described)));
        assert!(is_retry_valid(Some(&described), Some(ORIGINAL)));
    }

    #[test]
    fn test_added_step_is_valid() {
        let updated = edited(
            "                  identifier: ShellScript_1\n",
            "                  identifier: ShellScript_1\n              - step:\n                  identifier: ShellScript_2\n",
        );
        assert!(is_retry_valid(Some(&updated), Some(ORIGINAL)));
    }

    #[test]
    fn test_changed_identifier_is_invalid() {
        let updated = edited("identifier: stage2", "identifier: stage2b");
        assert!(!is_retry_valid(Some(&updated), Some(ORIGINAL)));
    }

    #[test]
    fn test_added_stage_is_invalid() {
        let updated = format!(
            "{ORIGINAL}    - stage:\n        identifier: stage5\n        name: stage5\n"
        );
        assert!(!is_retry_valid(Some(&updated), Some(ORIGINAL)));
    }

    #[test]
    fn test_removed_stage_is_invalid() {
        let without_sequential = edited("    - stage:\n        identifier: stage2\n        name: stage2\n", "");
        assert!(!without_sequential.contains("identifier: stage2"));
        assert!(!is_retry_valid(Some(&without_sequential), Some(ORIGINAL)));

        let without_member = edited("        - stage:\n            identifier: stage4\n            name: stage4\n", "");
        assert!(!without_member.contains("identifier: stage4"));
        assert!(!is_retry_valid(Some(&without_member), Some(ORIGINAL)));
    }

    #[test]
    fn test_added_parallel_stage_is_invalid() {
        let updated = format!(
            "{ORIGINAL}        - stage:\n            identifier: stage5\n            name: stage5\n"
        );
        assert!(!is_retry_valid(Some(&updated), Some(ORIGINAL)));
    }

    #[test]
    fn test_shuffled_stages_are_invalid() {
        let updated = ORIGINAL
            .replacen("identifier: stage1", "identifier: tmp", 1)
            .replacen("identifier: stage2", "identifier: stage1", 1)
            .replacen("identifier: tmp", "identifier: stage2", 1);
        assert!(!is_retry_valid(Some(&updated), Some(ORIGINAL)));
    }

    #[test]
    fn test_unparseable_is_invalid() {
        assert!(!is_retry_valid(Some("pipeline: [oops"), Some(ORIGINAL)));
    }

    #[test]
    fn test_v1_documents() {
        let original = "version: 1\nstages:\n  - id: a\n  - parallel:\n      stages:\n        - id: b\n        - id: c\n";
        let renamed = "version: 1\nstages:\n  - id: a\n    name: A\n  - parallel:\n      stages:\n        - id: b\n        - id: c\n";
        let flattened = "version: 1\nstages:\n  - id: a\n  - id: b\n  - id: c\n";
        assert!(is_retry_valid(Some(renamed), Some(original)));
        assert!(!is_retry_valid(Some(flattened), Some(original)));
    }
}
