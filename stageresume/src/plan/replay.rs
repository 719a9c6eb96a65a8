//! Index of node executions recorded by an earlier run.

use super::node::StepType;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One node execution recorded by an earlier run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeExecutionRecord {
    /// Id of the node execution.
    pub node_execution_id: String,
    /// Uuid of the plan node that was executed.
    pub plan_node_uuid: String,
    /// Fully-qualified path of the executed node.
    pub stage_fqn: String,
    /// Step type of the executed node.
    #[serde(default)]
    pub step_type: StepType,
}

impl NodeExecutionRecord {
    /// Creates a record.
    #[must_use]
    pub fn new(
        node_execution_id: impl Into<String>,
        plan_node_uuid: impl Into<String>,
        stage_fqn: impl Into<String>,
    ) -> Self {
        Self {
            node_execution_id: node_execution_id.into(),
            plan_node_uuid: plan_node_uuid.into(),
            stage_fqn: stage_fqn.into(),
            step_type: StepType::default(),
        }
    }

    /// Sets the step type.
    #[must_use]
    pub fn with_step_type(mut self, step_type: StepType) -> Self {
        self.step_type = step_type;
        self
    }
}

/// Lookup from plan nodes to the node executions they replay.
///
/// Nodes are matched by plan node uuid first, then by fully-qualified path.
/// When several executions share a key the first one wins.
#[derive(Debug, Clone, Default)]
pub struct ReplayIndex {
    by_uuid: HashMap<String, String>,
    by_fqn: HashMap<String, String>,
    executions: HashSet<String>,
}

impl ReplayIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index from recorded node executions.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a NodeExecutionRecord>) -> Self {
        let mut index = Self::new();
        for record in records {
            index.insert(record);
        }
        index
    }

    /// Adds a node execution. Returns false if it is reachable by no key.
    pub fn insert(&mut self, record: &NodeExecutionRecord) -> bool {
        let mut indexed = false;
        if !record.plan_node_uuid.is_empty() && !self.by_uuid.contains_key(&record.plan_node_uuid) {
            self.by_uuid
                .insert(record.plan_node_uuid.clone(), record.node_execution_id.clone());
            indexed = true;
        }
        if !record.stage_fqn.is_empty() && !self.by_fqn.contains_key(&record.stage_fqn) {
            self.by_fqn
                .insert(record.stage_fqn.clone(), record.node_execution_id.clone());
            indexed = true;
        }
        if indexed {
            self.executions.insert(record.node_execution_id.clone());
        }
        indexed
    }

    /// Returns the node execution recorded at `stage_fqn`.
    #[must_use]
    pub fn node_execution_for_fqn(&self, stage_fqn: &str) -> Option<&str> {
        self.by_fqn.get(stage_fqn).map(String::as_str)
    }

    /// Returns the node execution recorded for a plan node uuid.
    #[must_use]
    pub fn node_execution_for_uuid(&self, uuid: &str) -> Option<&str> {
        self.by_uuid.get(uuid).map(String::as_str)
    }

    /// Resolves the node execution a plan node replays.
    #[must_use]
    pub fn resolve(&self, uuid: &str, stage_fqn: Option<&str>) -> Option<&str> {
        self.node_execution_for_uuid(uuid)
            .or_else(|| stage_fqn.and_then(|fqn| self.node_execution_for_fqn(fqn)))
    }

    /// Returns the number of distinct node executions reachable by some key.
    #[must_use]
    pub fn len(&self) -> usize {
        self.executions.len()
    }

    /// Returns true if nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.executions.is_empty()
    }
}
