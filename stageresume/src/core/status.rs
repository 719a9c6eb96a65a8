//! Execution status enum as persisted for stages and pipeline executions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The persisted execution status of a stage or pipeline execution.
///
/// The rejected-approval status exists in two spellings because both are
/// present in stored records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    /// Execution has not started.
    #[default]
    #[serde(rename = "NOTSTARTED")]
    NotStarted,
    /// Execution is queued.
    Queued,
    /// Execution is running.
    Running,
    /// Waiting on an approval.
    #[serde(rename = "APPROVALWAITING")]
    ApprovalWaiting,
    /// Waiting on a manual intervention.
    #[serde(rename = "INTERVENTIONWAITING")]
    InterventionWaiting,
    /// Waiting on runtime input.
    #[serde(rename = "INPUTWAITING")]
    InputWaiting,
    /// Paused by the user.
    Paused,
    /// Completed successfully.
    Success,
    /// Skipped by a condition.
    Skipped,
    /// Failed, but the failure was ignored by a strategy.
    #[serde(rename = "IGNOREFAILED")]
    IgnoreFailed,
    /// Failed.
    Failed,
    /// Errored outside of the step logic.
    Errored,
    /// Aborted by the user or the system.
    Aborted,
    /// Timed out.
    Expired,
    /// Approval rejected (underscore spelling).
    ApprovalRejected,
    /// Approval rejected (legacy spelling).
    #[serde(rename = "APPROVALREJECTED")]
    Approvalrejected,
    /// Suspended.
    Suspended,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotStarted => "NOTSTARTED",
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::ApprovalWaiting => "APPROVALWAITING",
            Self::InterventionWaiting => "INTERVENTIONWAITING",
            Self::InputWaiting => "INPUTWAITING",
            Self::Paused => "PAUSED",
            Self::Success => "SUCCESS",
            Self::Skipped => "SKIPPED",
            Self::IgnoreFailed => "IGNOREFAILED",
            Self::Failed => "FAILED",
            Self::Errored => "ERRORED",
            Self::Aborted => "ABORTED",
            Self::Expired => "EXPIRED",
            Self::ApprovalRejected => "APPROVAL_REJECTED",
            Self::Approvalrejected => "APPROVALREJECTED",
            Self::Suspended => "SUSPENDED",
        };
        write!(f, "{label}")
    }
}

impl ExecutionStatus {
    /// Returns true if a stage with this status may be selected for retry.
    #[must_use]
    pub fn is_failed_status(&self) -> bool {
        matches!(
            self,
            Self::Expired
                | Self::Aborted
                | Self::Failed
                | Self::ApprovalRejected
                | Self::Approvalrejected
        )
    }

    /// Returns true if the status represents a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Success
                | Self::Skipped
                | Self::IgnoreFailed
                | Self::Failed
                | Self::Errored
                | Self::Aborted
                | Self::Expired
                | Self::ApprovalRejected
                | Self::Approvalrejected
        )
    }

    /// Returns true if the status indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success | Self::Skipped | Self::IgnoreFailed)
    }
}
