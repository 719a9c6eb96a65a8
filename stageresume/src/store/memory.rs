//! In-memory store implementations.

use super::{ExecutionSummaryStore, NodeExecutionIndex, PipelineStore};
use crate::core::{PipelineExecutionSummary, PlanExecutionMetadata, StageRetryRecord};
use crate::errors::RetryResult;
use crate::plan::{fqn_is_within, NodeExecutionRecord};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Execution summaries and stage records held in memory.
#[derive(Debug, Default)]
pub struct InMemoryExecutionSummaryStore {
    summaries: DashMap<String, PipelineExecutionSummary>,
    stage_records: DashMap<String, Vec<StageRetryRecord>>,
}

impl InMemoryExecutionSummaryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a summary.
    pub fn insert_summary(&self, summary: PipelineExecutionSummary) {
        self.summaries.insert(summary.plan_execution_id.clone(), summary);
    }

    /// Sets the stage records of an execution.
    pub fn insert_stage_records(&self, plan_execution_id: impl Into<String>, records: Vec<StageRetryRecord>) {
        self.stage_records.insert(plan_execution_id.into(), records);
    }
}

#[async_trait]
impl ExecutionSummaryStore for InMemoryExecutionSummaryStore {
    async fn fetch_summaries_by_root_id(
        &self,
        root_execution_id: &str,
    ) -> RetryResult<Vec<PipelineExecutionSummary>> {
        Ok(self
            .summaries
            .iter()
            .filter(|entry| entry.root_execution_id == root_execution_id)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn fetch_stage_records(&self, plan_execution_id: &str) -> RetryResult<Vec<StageRetryRecord>> {
        Ok(self
            .stage_records
            .get(plan_execution_id)
            .map(|records| records.clone())
            .unwrap_or_default())
    }

    async fn fetch_summary(&self, plan_execution_id: &str) -> RetryResult<Option<PipelineExecutionSummary>> {
        Ok(self.summaries.get(plan_execution_id).map(|s| s.clone()))
    }
}

/// Node executions held in memory, keyed by plan execution id.
#[derive(Debug, Default)]
pub struct InMemoryNodeExecutionIndex {
    executions: RwLock<HashMap<String, Vec<NodeExecutionRecord>>>,
}

impl InMemoryNodeExecutionIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a node execution of `plan_execution_id`.
    pub fn insert(&self, plan_execution_id: impl Into<String>, record: NodeExecutionRecord) {
        self.executions
            .write()
            .entry(plan_execution_id.into())
            .or_default()
            .push(record);
    }

    fn matching(
        &self,
        plan_execution_id: &str,
        stage_fqns: &[String],
        strategy_only: bool,
    ) -> Vec<NodeExecutionRecord> {
        let executions = self.executions.read();
        executions
            .get(plan_execution_id)
            .into_iter()
            .flatten()
            .filter(|r| !strategy_only || r.step_type.is_strategy())
            .filter(|r| stage_fqns.iter().any(|fqn| fqn_is_within(&r.stage_fqn, fqn)))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl NodeExecutionIndex for InMemoryNodeExecutionIndex {
    async fn resolve_stage_fqns(
        &self,
        plan_execution_id: &str,
        stage_identifiers: &[String],
    ) -> RetryResult<Vec<String>> {
        let executions = self.executions.read();
        let records = executions.get(plan_execution_id).map(Vec::as_slice).unwrap_or_default();

        Ok(stage_identifiers
            .iter()
            .filter_map(|identifier| {
                records
                    .iter()
                    .filter(|r| !r.step_type.is_strategy())
                    .find(|r| r.stage_fqn.rsplit('.').next() == Some(identifier.as_str()))
                    .map(|r| r.stage_fqn.clone())
            })
            .collect())
    }

    async fn fetch_node_executions(
        &self,
        plan_execution_id: &str,
        stage_fqns: &[String],
    ) -> RetryResult<Vec<NodeExecutionRecord>> {
        Ok(self.matching(plan_execution_id, stage_fqns, false))
    }

    async fn fetch_strategy_node_executions(
        &self,
        plan_execution_id: &str,
        stage_fqns: &[String],
    ) -> RetryResult<Vec<NodeExecutionRecord>> {
        Ok(self.matching(plan_execution_id, stage_fqns, true))
    }
}

/// Pipeline definitions and plan execution metadata held in memory.
#[derive(Debug, Default)]
pub struct InMemoryPipelineStore {
    pipelines: DashMap<String, String>,
    metadata: DashMap<String, PlanExecutionMetadata>,
}

impl InMemoryPipelineStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a pipeline definition.
    pub fn insert_pipeline(&self, pipeline_identifier: impl Into<String>, yaml: impl Into<String>) {
        self.pipelines.insert(pipeline_identifier.into(), yaml.into());
    }

    /// Removes a pipeline definition.
    pub fn delete_pipeline(&self, pipeline_identifier: &str) {
        self.pipelines.remove(pipeline_identifier);
    }

    /// Inserts or replaces plan execution metadata.
    pub fn insert_metadata(&self, metadata: PlanExecutionMetadata) {
        self.metadata.insert(metadata.plan_execution_id.clone(), metadata);
    }
}

#[async_trait]
impl PipelineStore for InMemoryPipelineStore {
    async fn fetch_pipeline_yaml(&self, pipeline_identifier: &str) -> RetryResult<Option<String>> {
        Ok(self.pipelines.get(pipeline_identifier).map(|y| y.clone()))
    }

    async fn fetch_plan_execution_metadata(
        &self,
        plan_execution_id: &str,
    ) -> RetryResult<Option<PlanExecutionMetadata>> {
        Ok(self.metadata.get(plan_execution_id).map(|m| m.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::StepType;
    use pretty_assertions::assert_eq;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_summaries_by_root() {
        let store = InMemoryExecutionSummaryStore::new();
        store.insert_summary(PipelineExecutionSummary::new("a", "root"));
        store.insert_summary(PipelineExecutionSummary::new("b", "root"));
        store.insert_summary(PipelineExecutionSummary::new("c", "other"));

        let mut found: Vec<String> = tokio_test::block_on(store.fetch_summaries_by_root_id("root"))
            .unwrap()
            .into_iter()
            .map(|s| s.plan_execution_id)
            .collect();
        found.sort();
        assert_eq!(found, ids(&["a", "b"]));

        assert!(tokio_test::block_on(store.fetch_summary("zzz")).unwrap().is_none());
        assert!(tokio_test::block_on(store.fetch_stage_records("a")).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_node_execution_index() {
        let index = InMemoryNodeExecutionIndex::new();
        index.insert("exec", NodeExecutionRecord::new("ne1", "u1", "pipeline.stages.stage1"));
        index.insert("exec", NodeExecutionRecord::new("ne2", "u2", "pipeline.stages.stage1.spec.steps.step1"));
        index.insert(
            "exec",
            NodeExecutionRecord::new("ne3", "u3", "pipeline.stages.stage2").with_step_type(StepType::strategy()),
        );
        index.insert("exec", NodeExecutionRecord::new("ne4", "u4", "pipeline.stages.stage2"));

        let fqns = index
            .resolve_stage_fqns("exec", &ids(&["stage2", "ghost", "stage1"]))
            .await
            .unwrap();
        assert_eq!(fqns, ids(&["pipeline.stages.stage2", "pipeline.stages.stage1"]));

        let stage1 = index.fetch_node_executions("exec", &ids(&["pipeline.stages.stage1"])).await.unwrap();
        assert_eq!(stage1.len(), 2);

        let strategies = index
            .fetch_strategy_node_executions("exec", &ids(&["pipeline.stages.stage1", "pipeline.stages.stage2"]))
            .await
            .unwrap();
        assert_eq!(strategies.len(), 1);
        assert_eq!(strategies[0].node_execution_id, "ne3");

        assert!(index.fetch_node_executions("other", &fqns).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pipeline_store() {
        let store = InMemoryPipelineStore::new();
        store.insert_pipeline("p", "pipeline: {}");
        store.insert_metadata(PlanExecutionMetadata::new("exec").with_yaml("y"));

        assert_eq!(store.fetch_pipeline_yaml("p").await.unwrap().as_deref(), Some("pipeline: {}"));
        store.delete_pipeline("p");
        assert!(store.fetch_pipeline_yaml("p").await.unwrap().is_none());
        assert_eq!(
            store.fetch_plan_execution_metadata("exec").await.unwrap().map(|m| m.yaml),
            Some("y".to_string())
        );
    }
}
