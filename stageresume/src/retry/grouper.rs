//! Groups flat stage retry records into retry groups.
//!
//! Records arrive in execution order, with parallel siblings contiguous.
//! A single pass partitions them into maximal runs sharing a parent group id.

use crate::core::{RetryGroup, RetryLineageInfo, StageRetryRecord};

/// Partitions `records` into retry groups.
///
/// Each maximal contiguous run of records with the same `parent_group_id`
/// becomes one group, emitted in scan order. The input order is trusted and
/// never re-sorted. An empty input yields an empty lineage.
#[must_use]
pub fn group_for_retry(records: &[StageRetryRecord]) -> RetryLineageInfo {
    let mut groups: Vec<RetryGroup> = Vec::new();

    for record in records {
        if let Some(group) = groups.last_mut() {
            if group.parent_group_id() == Some(record.parent_group_id.as_str()) {
                group.info.push(record.clone());
                continue;
            }
        }
        groups.push(RetryGroup::new(vec![record.clone()]));
    }

    tracing::debug!(
        records = records.len(),
        groups = groups.len(),
        "Grouped stage records for retry"
    );

    RetryLineageInfo::new(groups)
}
