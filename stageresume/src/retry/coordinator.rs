//! Retry orchestration over the collaborator stores.

use super::{group_for_retry, only_failed_among};
use crate::config::RetryConfig;
use crate::core::RetryLineageInfo;
use crate::document::{is_retry_valid, split, PipelineDocument};
use crate::errors::{InvalidRequestError, RetryError, RetryResult};
use crate::observability::{RetrySpanAttributes, SpanTimer};
use crate::plan::{fqn_is_within, replay_strategy_nodes, rewrite, ExecutionPlan, Node, ReplayIndex};
use crate::store::{ExecutionSummaryStore, NodeExecutionIndex, PipelineStore};
use crate::utils::{is_older_than_days, now_millis};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Message for executions that were rolled back.
pub const ROLLED_BACK: &str = "This execution has undergone Pipeline Rollback, and hence cannot be retried.";
/// Message for executions that are not the newest of their lineage.
pub const NOT_LATEST: &str =
    "This execution is not the latest of all retried execution. You can only retry the latest execution.";
/// Message for pipelines whose structure changed since the execution.
pub const PIPELINE_UPDATED: &str = "The pipeline has been updated, cannot resume.";

/// A request to retry stages of an earlier execution.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RetryRequest {
    /// Pipeline the execution belongs to.
    pub pipeline_identifier: String,
    /// Execution being retried.
    pub plan_execution_id: String,
    /// Stages selected for retry.
    pub retry_stage_identifiers: Vec<String>,
    /// Current run's resolved pipeline document.
    pub current_processed_yaml: String,
    /// Retry every selected stage instead of only failed ones. Falls back to config.
    pub run_all_stages: Option<bool>,
}

impl RetryRequest {
    /// Creates a request.
    #[must_use]
    pub fn new(pipeline_identifier: impl Into<String>, plan_execution_id: impl Into<String>) -> Self {
        Self {
            pipeline_identifier: pipeline_identifier.into(),
            plan_execution_id: plan_execution_id.into(),
            ..Default::default()
        }
    }

    /// Sets the selected stages.
    #[must_use]
    pub fn with_stages<I, S>(mut self, stages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.retry_stage_identifiers = stages.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the current run's resolved document.
    #[must_use]
    pub fn with_current_processed_yaml(mut self, yaml: impl Into<String>) -> Self {
        self.current_processed_yaml = yaml.into();
        self
    }

    /// Overrides whether every selected stage is retried.
    #[must_use]
    pub fn with_run_all_stages(mut self, run_all: bool) -> Self {
        self.run_all_stages = Some(run_all);
        self
    }
}

/// Everything the plan-creation service needs to compile a retried run.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPreparation {
    /// Execution being retried.
    pub previous_execution_id: String,
    /// Stages that run again.
    pub retry_stage_identifiers: Vec<String>,
    /// Stages replayed from the earlier run, in linear order.
    pub skipped_stage_identifiers: Vec<String>,
    /// Hybrid document to compile.
    pub document: PipelineDocument,
}

/// Validates, prepares and rewrites retries.
pub struct RetryCoordinator {
    summaries: Arc<dyn ExecutionSummaryStore>,
    node_executions: Arc<dyn NodeExecutionIndex>,
    pipelines: Arc<dyn PipelineStore>,
    config: RetryConfig,
}

impl RetryCoordinator {
    /// Creates a coordinator with default config.
    #[must_use]
    pub fn new(
        summaries: Arc<dyn ExecutionSummaryStore>,
        node_executions: Arc<dyn NodeExecutionIndex>,
        pipelines: Arc<dyn PipelineStore>,
    ) -> Self {
        Self {
            summaries,
            node_executions,
            pipelines,
            config: RetryConfig::default(),
        }
    }

    /// Sets the config.
    #[must_use]
    pub fn with_config(mut self, config: RetryConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the config.
    #[must_use]
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Checks whether an execution can be retried and returns its retry groups.
    ///
    /// Refusals are reported through `resumable` and `error_message`; only
    /// collaborator failures are returned as errors.
    pub async fn validate_retry(
        &self,
        pipeline_identifier: &str,
        plan_execution_id: &str,
    ) -> RetryResult<RetryLineageInfo> {
        let timer = SpanTimer::start("retry.validate");
        let attributes = RetrySpanAttributes::new("retry.validate")
            .with_pipeline(pipeline_identifier)
            .with_plan_execution_id(plan_execution_id);

        let result = self.check_retry(pipeline_identifier, plan_execution_id).await;
        match &result {
            Ok(info) if !info.resumable => {
                let reason = info.error_message.clone().unwrap_or_default();
                warn!(plan_execution_id, reason = %reason, "Retry refused");
                timer.finish(&attributes.with_error(reason));
            }
            Ok(_) => {
                timer.finish(&attributes);
            }
            Err(err) => {
                timer.finish(&attributes.with_error(err.to_string()));
            }
        }
        result
    }

    async fn check_retry(&self, pipeline_identifier: &str, plan_execution_id: &str) -> RetryResult<RetryLineageInfo> {
        let Some(summary) = self.summaries.fetch_summary(plan_execution_id).await? else {
            return Ok(RetryLineageInfo::not_resumable(format!(
                "No execution exists for id {plan_execution_id}"
            )));
        };
        if summary.has_undergone_rollback() {
            return Ok(RetryLineageInfo::not_resumable(ROLLED_BACK));
        }
        if !summary.is_latest_execution {
            return Ok(RetryLineageInfo::not_resumable(NOT_LATEST));
        }

        let (pipeline_yaml, metadata) = futures::try_join!(
            self.pipelines.fetch_pipeline_yaml(pipeline_identifier),
            self.pipelines.fetch_plan_execution_metadata(plan_execution_id),
        )?;

        let Some(pipeline_yaml) = pipeline_yaml else {
            return Ok(RetryLineageInfo::not_resumable(format!(
                "Pipeline with the given ID: {pipeline_identifier} does not exist or has been deleted"
            )));
        };
        let max_age = self.config.max_execution_age_days;
        if is_older_than_days(summary.created_at, now_millis(), max_age) {
            return Ok(RetryLineageInfo::not_resumable(format!(
                "Execution is more than {max_age} days old. Cannot retry"
            )));
        }
        let Some(metadata) = metadata else {
            return Ok(RetryLineageInfo::not_resumable(format!(
                "No Plan Execution exists for id {plan_execution_id}"
            )));
        };
        if !is_retry_valid(Some(&pipeline_yaml), Some(metadata.comparable_yaml())) {
            return Ok(RetryLineageInfo::not_resumable(PIPELINE_UPDATED));
        }

        let records = self.summaries.fetch_stage_records(plan_execution_id).await?;
        Ok(group_for_retry(&records))
    }

    /// Builds the hybrid document and skip list for a retry.
    ///
    /// # Errors
    ///
    /// Returns an invalid request error if the selection is empty or unknown,
    /// if none of the selected stages failed while only failed stages are
    /// retried, or if the earlier run's documents are missing.
    pub async fn prepare_retry(&self, request: &RetryRequest) -> RetryResult<RetryPreparation> {
        let timer = SpanTimer::start("retry.prepare");
        let attributes = RetrySpanAttributes::new("retry.prepare")
            .with_pipeline(&request.pipeline_identifier)
            .with_plan_execution_id(&request.plan_execution_id)
            .with_retry_stages(&request.retry_stage_identifiers);

        match self.build_preparation(request).await {
            Ok(preparation) => {
                info!(
                    plan_execution_id = %request.plan_execution_id,
                    retried = ?preparation.retry_stage_identifiers,
                    skipped = preparation.skipped_stage_identifiers.len(),
                    "Prepared retry"
                );
                timer.finish(&attributes.with_skipped_stage_count(preparation.skipped_stage_identifiers.len()));
                Ok(preparation)
            }
            Err(err) => {
                timer.finish(&attributes.with_error(err.to_string()));
                Err(err)
            }
        }
    }

    async fn build_preparation(&self, request: &RetryRequest) -> RetryResult<RetryPreparation> {
        let (records, metadata) = futures::try_join!(
            self.summaries.fetch_stage_records(&request.plan_execution_id),
            self.pipelines.fetch_plan_execution_metadata(&request.plan_execution_id),
        )?;

        let run_all = request
            .run_all_stages
            .unwrap_or(self.config.run_all_stages_by_default);
        let retry_stage_identifiers = if run_all {
            request.retry_stage_identifiers.clone()
        } else {
            let failed = only_failed_among(&records, &request.retry_stage_identifiers)?;
            if failed.is_empty() {
                return Err(InvalidRequestError::new("None of the selected stages failed")
                    .with_stages(request.retry_stage_identifiers.clone())
                    .into());
            }
            failed
        };

        let Some(metadata) = metadata else {
            return Err(RetryError::invalid_request(format!(
                "No Plan Execution exists for id {}",
                request.plan_execution_id
            )));
        };
        let previous = self.parse_document(&metadata.processed_yaml)?;
        let current = self.parse_document(&request.current_processed_yaml)?;
        let outcome = split(&previous, &current, &retry_stage_identifiers)?;

        Ok(RetryPreparation {
            previous_execution_id: request.plan_execution_id.clone(),
            retry_stage_identifiers,
            skipped_stage_identifiers: outcome.skipped_stage_identifiers,
            document: outcome.document,
        })
    }

    /// Rewrites a plan compiled from a prepared hybrid document.
    ///
    /// Nodes inside skipped stages become identity nodes replaying the
    /// earlier run. Strategy nodes of retried stages are replayed when the
    /// earlier run recorded them.
    ///
    /// # Errors
    ///
    /// Returns [`RetryError::InvalidState`] if a skipped stage or one of its
    /// nodes has no recorded execution in the earlier run.
    pub async fn transform_plan(
        &self,
        plan: ExecutionPlan,
        preparation: &RetryPreparation,
    ) -> RetryResult<ExecutionPlan> {
        let timer = SpanTimer::start("retry.transform_plan");
        let attributes = RetrySpanAttributes::new("retry.transform_plan")
            .with_plan_execution_id(&preparation.previous_execution_id)
            .with_skipped_stage_count(preparation.skipped_stage_identifiers.len());

        let result = self.rewrite_plan(plan, preparation).await;
        match &result {
            Ok(_) => timer.finish(&attributes),
            Err(err) => timer.finish(&attributes.with_error(err.to_string())),
        };
        result
    }

    async fn rewrite_plan(&self, plan: ExecutionPlan, preparation: &RetryPreparation) -> RetryResult<ExecutionPlan> {
        let previous = preparation.previous_execution_id.as_str();
        let (skipped_fqns, retry_fqns) = futures::try_join!(
            self.node_executions
                .resolve_stage_fqns(previous, &preparation.skipped_stage_identifiers),
            self.node_executions
                .resolve_stage_fqns(previous, &preparation.retry_stage_identifiers),
        )?;
        if skipped_fqns.len() != preparation.skipped_stage_identifiers.len() {
            return Err(RetryError::invalid_state(format!(
                "Resolved {} of {} skipped stages in execution {previous}",
                skipped_fqns.len(),
                preparation.skipped_stage_identifiers.len()
            )));
        }

        let (executions, strategy_executions) = futures::try_join!(
            self.node_executions.fetch_node_executions(previous, &skipped_fqns),
            self.node_executions
                .fetch_strategy_node_executions(previous, &retry_fqns),
        )?;
        let index = ReplayIndex::from_records(&executions);

        let real_node_uuids: HashSet<String> = plan
            .nodes()
            .iter()
            .filter(|node| {
                node.stage_fqn()
                    .map_or(true, |fqn| !skipped_fqns.iter().any(|skip| fqn_is_within(fqn, skip)))
            })
            .map(Node::uuid)
            .map(ToString::to_string)
            .collect();

        let plan = rewrite(plan, &real_node_uuids, &skipped_fqns, &index)?;
        Ok(replay_strategy_nodes(plan, &retry_fqns, &strategy_executions))
    }

    fn parse_document(&self, text: &str) -> RetryResult<PipelineDocument> {
        let document = PipelineDocument::from_yaml(text)?;
        if document.root().get("version").is_none() {
            return Ok(document.with_version(self.config.default_pipeline_version));
        }
        Ok(document)
    }
}
