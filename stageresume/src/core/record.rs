//! Stage retry records and the retry groups derived from them.

use super::ExecutionStatus;
use serde::{Deserialize, Serialize};

/// One historical stage outcome of a pipeline execution.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRetryRecord {
    /// Stage identifier, unique within the pipeline run.
    pub identifier: String,
    /// Display name of the stage.
    #[serde(default)]
    pub name: String,
    /// Id shared by stages that ran in parallel under the same fan-out.
    #[serde(default)]
    pub parent_group_id: String,
    /// Identifier of whatever follows this stage's group, if anything.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_group_id: Option<String>,
    /// Terminal execution status.
    #[serde(default)]
    pub status: ExecutionStatus,
    /// Creation time in epoch milliseconds.
    #[serde(default)]
    pub created_at: i64,
}

impl StageRetryRecord {
    /// Creates a new record for the given stage identifier.
    #[must_use]
    pub fn new(identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        Self {
            name: identifier.clone(),
            identifier,
            ..Default::default()
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the parallel group id.
    #[must_use]
    pub fn with_parent_group(mut self, parent_group_id: impl Into<String>) -> Self {
        self.parent_group_id = parent_group_id.into();
        self
    }

    /// Sets the id of the following group.
    #[must_use]
    pub fn with_next_group(mut self, next_group_id: impl Into<String>) -> Self {
        self.next_group_id = Some(next_group_id.into());
        self
    }

    /// Sets the execution status.
    #[must_use]
    pub fn with_status(mut self, status: ExecutionStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the creation timestamp.
    #[must_use]
    pub fn with_created_at(mut self, created_at: i64) -> Self {
        self.created_at = created_at;
        self
    }
}

/// Stages that executed concurrently under one fan-out, or a single sequential stage.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RetryGroup {
    /// Member records in execution order.
    pub info: Vec<StageRetryRecord>,
}

impl RetryGroup {
    /// Creates a group from its members.
    #[must_use]
    pub fn new(info: Vec<StageRetryRecord>) -> Self {
        Self { info }
    }

    /// Returns the shared parallel group id, if the group has members.
    #[must_use]
    pub fn parent_group_id(&self) -> Option<&str> {
        self.info.first().map(|r| r.parent_group_id.as_str())
    }

    /// Returns true if more than one stage ran in this group.
    #[must_use]
    pub fn is_parallel(&self) -> bool {
        self.info.len() > 1
    }

    /// Returns the member stage identifiers in order.
    #[must_use]
    pub fn identifiers(&self) -> Vec<&str> {
        self.info.iter().map(|r| r.identifier.as_str()).collect()
    }

    /// Returns the number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.info.len()
    }

    /// Returns true if the group has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.info.is_empty()
    }
}

/// The retry-selectable structure of one execution.
///
/// Also used as the answer to a retry validation request, in which case
/// `resumable` and `error_message` describe whether the execution can be
/// retried at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryLineageInfo {
    /// Ordered retry groups.
    pub groups: Vec<RetryGroup>,
    /// Whether the execution can be retried.
    pub resumable: bool,
    /// Why the execution cannot be retried.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Default for RetryLineageInfo {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            resumable: true,
            error_message: None,
        }
    }
}

impl RetryLineageInfo {
    /// Creates a resumable lineage from its groups.
    #[must_use]
    pub fn new(groups: Vec<RetryGroup>) -> Self {
        Self {
            groups,
            ..Default::default()
        }
    }

    /// Creates a non-resumable answer carrying the reason.
    #[must_use]
    pub fn not_resumable(error_message: impl Into<String>) -> Self {
        Self {
            groups: Vec::new(),
            resumable: false,
            error_message: Some(error_message.into()),
        }
    }

    /// Returns the groups.
    #[must_use]
    pub fn groups(&self) -> &[RetryGroup] {
        &self.groups
    }

    /// Returns every record, flattened in group order.
    pub fn records(&self) -> impl Iterator<Item = &StageRetryRecord> {
        self.groups.iter().flat_map(|g| g.info.iter())
    }

    /// Returns the index of the group containing the stage, if any.
    #[must_use]
    pub fn group_index_of(&self, identifier: &str) -> Option<usize> {
        self.groups
            .iter()
            .position(|g| g.info.iter().any(|r| r.identifier == identifier))
    }
}
