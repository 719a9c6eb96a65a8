//! Retry lineage lookups.
//!
//! Every attempt of a retried execution shares one root execution id. The
//! lineage service reads those attempts, newest first.

use crate::core::{ExecutionStatus, PipelineExecutionSummary};
use crate::errors::RetryResult;
use crate::store::ExecutionSummaryStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Message returned when a lineage has nothing to retry against.
pub const NO_RETRY_HISTORY: &str =
    "Unable to find the retry history for this execution. Only retried executions have a retry history.";

/// One attempt of a retry lineage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryExecutionInfo {
    /// Id of the attempt.
    pub plan_execution_id: String,
    /// Start time in epoch milliseconds.
    pub start_ts: i64,
    /// End time in epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_ts: Option<i64>,
    /// Status of the attempt.
    pub status: ExecutionStatus,
}

impl From<&PipelineExecutionSummary> for RetryExecutionInfo {
    fn from(summary: &PipelineExecutionSummary) -> Self {
        Self {
            plan_execution_id: summary.plan_execution_id.clone(),
            start_ts: summary.start_ts,
            end_ts: summary.end_ts,
            status: summary.status,
        }
    }
}

/// Full retry history of a lineage.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryHistoryResult {
    /// Attempts ordered by start time, newest first.
    pub execution_infos: Vec<RetryExecutionInfo>,
    /// Id of the newest attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_execution_id: Option<String>,
    /// Set when there is no history to report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// The newest attempt of a lineage.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryLatestResult {
    /// Id of the newest attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_execution_id: Option<String>,
    /// Set when there is no history to report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Reads retry lineages from an execution summary store.
pub struct RetryLineageService {
    store: Arc<dyn ExecutionSummaryStore>,
}

impl RetryLineageService {
    /// Creates a service over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn ExecutionSummaryStore>) -> Self {
        Self { store }
    }

    /// Returns every attempt sharing `root_execution_id`, newest first.
    pub async fn get_history(&self, root_execution_id: &str) -> RetryResult<RetryHistoryResult> {
        let summaries = self.lineage(root_execution_id).await?;
        if summaries.len() <= 1 {
            return Ok(RetryHistoryResult {
                error_message: Some(NO_RETRY_HISTORY.to_string()),
                ..Default::default()
            });
        }

        Ok(RetryHistoryResult {
            latest_execution_id: summaries.first().map(|s| s.plan_execution_id.clone()),
            execution_infos: summaries.iter().map(RetryExecutionInfo::from).collect(),
            error_message: None,
        })
    }

    /// Returns the newest attempt sharing `root_execution_id`.
    pub async fn get_latest_execution_id(&self, root_execution_id: &str) -> RetryResult<RetryLatestResult> {
        let summaries = self.lineage(root_execution_id).await?;
        if summaries.len() <= 1 {
            return Ok(RetryLatestResult {
                latest_execution_id: None,
                error_message: Some(NO_RETRY_HISTORY.to_string()),
            });
        }

        Ok(RetryLatestResult {
            latest_execution_id: summaries.first().map(|s| s.plan_execution_id.clone()),
            error_message: None,
        })
    }

    async fn lineage(&self, root_execution_id: &str) -> RetryResult<Vec<PipelineExecutionSummary>> {
        let mut summaries = self.store.fetch_summaries_by_root_id(root_execution_id).await?;
        summaries.sort_by(|a, b| b.start_ts.cmp(&a.start_ts));
        debug!(root = root_execution_id, attempts = summaries.len(), "Loaded retry lineage");
        Ok(summaries)
    }
}
