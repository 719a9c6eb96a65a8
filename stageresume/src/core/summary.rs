//! Pipeline execution summaries and plan execution metadata.

use super::ExecutionStatus;
use serde::{Deserialize, Serialize};

/// One row per execution attempt.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineExecutionSummary {
    /// Id of this execution attempt.
    pub plan_execution_id: String,
    /// Id shared by every attempt of one retry lineage.
    pub root_execution_id: String,
    /// Pipeline this execution belongs to.
    #[serde(default)]
    pub pipeline_identifier: String,
    /// Start time in epoch milliseconds.
    #[serde(default)]
    pub start_ts: i64,
    /// End time in epoch milliseconds, if finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_ts: Option<i64>,
    /// Execution status.
    #[serde(default)]
    pub status: ExecutionStatus,
    /// Creation time in epoch milliseconds.
    #[serde(default)]
    pub created_at: i64,
    /// Whether this is the newest attempt of its lineage.
    #[serde(default = "default_latest")]
    pub is_latest_execution: bool,
    /// Execution id of a pipeline rollback run started from this execution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback_mode_execution_id: Option<String>,
}

fn default_latest() -> bool {
    true
}

impl PipelineExecutionSummary {
    /// Creates a summary for an execution attempt.
    #[must_use]
    pub fn new(plan_execution_id: impl Into<String>, root_execution_id: impl Into<String>) -> Self {
        Self {
            plan_execution_id: plan_execution_id.into(),
            root_execution_id: root_execution_id.into(),
            is_latest_execution: true,
            ..Default::default()
        }
    }

    /// Sets the pipeline identifier.
    #[must_use]
    pub fn with_pipeline(mut self, pipeline_identifier: impl Into<String>) -> Self {
        self.pipeline_identifier = pipeline_identifier.into();
        self
    }

    /// Sets start and end timestamps.
    #[must_use]
    pub fn with_timing(mut self, start_ts: i64, end_ts: Option<i64>) -> Self {
        self.start_ts = start_ts;
        self.end_ts = end_ts;
        self
    }

    /// Sets the status.
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

    /// Sets whether this is the latest attempt.
    #[must_use]
    pub fn with_latest(mut self, is_latest: bool) -> Self {
        self.is_latest_execution = is_latest;
        self
    }

    /// Records a pipeline rollback run started from this execution.
    #[must_use]
    pub fn with_rollback_execution(mut self, execution_id: impl Into<String>) -> Self {
        self.rollback_mode_execution_id = Some(execution_id.into());
        self
    }

    /// Returns true if a pipeline rollback was run from this execution.
    #[must_use]
    pub fn has_undergone_rollback(&self) -> bool {
        self.rollback_mode_execution_id
            .as_deref()
            .is_some_and(|id| !id.is_empty())
    }
}

/// Metadata recorded when the executed stages were a user-selected subset.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagesExecutionMetadata {
    /// Stages that were selected for execution.
    #[serde(default)]
    pub stage_identifiers: Vec<String>,
    /// The complete pipeline definition the subset was taken from.
    #[serde(default)]
    pub full_pipeline_yaml: String,
}

/// Documents recorded for a plan execution.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanExecutionMetadata {
    /// Id of the plan execution.
    pub plan_execution_id: String,
    /// Pipeline definition as submitted.
    #[serde(default)]
    pub yaml: String,
    /// Pipeline definition after input resolution, as executed.
    #[serde(default)]
    pub processed_yaml: String,
    /// Present when only a subset of stages was executed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stages_execution: Option<StagesExecutionMetadata>,
}

impl PlanExecutionMetadata {
    /// Creates metadata for a plan execution.
    #[must_use]
    pub fn new(plan_execution_id: impl Into<String>) -> Self {
        Self {
            plan_execution_id: plan_execution_id.into(),
            ..Default::default()
        }
    }

    /// Sets the submitted yaml.
    #[must_use]
    pub fn with_yaml(mut self, yaml: impl Into<String>) -> Self {
        self.yaml = yaml.into();
        self
    }

    /// Sets the processed yaml.
    #[must_use]
    pub fn with_processed_yaml(mut self, processed_yaml: impl Into<String>) -> Self {
        self.processed_yaml = processed_yaml.into();
        self
    }

    /// Marks the execution as a selective stage execution.
    #[must_use]
    pub fn with_stages_execution(mut self, metadata: StagesExecutionMetadata) -> Self {
        self.stages_execution = Some(metadata);
        self
    }

    /// Returns the definition a retry must be structurally compared against.
    ///
    /// For selective stage executions this is the full pipeline definition,
    /// otherwise the executed one.
    #[must_use]
    pub fn comparable_yaml(&self) -> &str {
        match &self.stages_execution {
            Some(stages) if !stages.full_pipeline_yaml.is_empty() => &stages.full_pipeline_yaml,
            _ => &self.yaml,
        }
    }
}
