//! Collaborator interfaces the retry core reads from.
//!
//! Persistence is owned elsewhere. These traits describe the reads the core
//! needs; [`memory`] provides in-process implementations.

pub mod memory;

use crate::core::{PipelineExecutionSummary, PlanExecutionMetadata, StageRetryRecord};
use crate::errors::RetryResult;
use crate::plan::NodeExecutionRecord;
use async_trait::async_trait;

/// Reads execution summaries and per-stage retry records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExecutionSummaryStore: Send + Sync {
    /// Returns every execution attempt sharing `root_execution_id`, in any order.
    async fn fetch_summaries_by_root_id(
        &self,
        root_execution_id: &str,
    ) -> RetryResult<Vec<PipelineExecutionSummary>>;

    /// Returns the stage records of an execution in execution order.
    async fn fetch_stage_records(&self, plan_execution_id: &str) -> RetryResult<Vec<StageRetryRecord>>;

    /// Returns the summary of one execution, if it exists.
    async fn fetch_summary(&self, plan_execution_id: &str) -> RetryResult<Option<PipelineExecutionSummary>>;
}

/// Reads node executions recorded by earlier runs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NodeExecutionIndex: Send + Sync {
    /// Maps stage identifiers to the stage FQNs recorded for an execution.
    ///
    /// The result has one FQN per resolvable identifier, in input order.
    async fn resolve_stage_fqns(
        &self,
        plan_execution_id: &str,
        stage_identifiers: &[String],
    ) -> RetryResult<Vec<String>>;

    /// Returns node executions of an execution lying inside the given stages.
    async fn fetch_node_executions(
        &self,
        plan_execution_id: &str,
        stage_fqns: &[String],
    ) -> RetryResult<Vec<NodeExecutionRecord>>;

    /// Returns strategy node executions of an execution lying inside the given stages.
    async fn fetch_strategy_node_executions(
        &self,
        plan_execution_id: &str,
        stage_fqns: &[String],
    ) -> RetryResult<Vec<NodeExecutionRecord>>;
}

/// Reads pipeline definitions and recorded plan execution documents.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PipelineStore: Send + Sync {
    /// Returns the current definition of a pipeline, if it still exists.
    async fn fetch_pipeline_yaml(&self, pipeline_identifier: &str) -> RetryResult<Option<String>>;

    /// Returns the documents recorded for a plan execution.
    async fn fetch_plan_execution_metadata(
        &self,
        plan_execution_id: &str,
    ) -> RetryResult<Option<PlanExecutionMetadata>>;
}
