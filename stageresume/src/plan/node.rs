//! Execution plan nodes.

use crate::utils::generate_uuid;
use serde::{Deserialize, Serialize};

/// Broad classification of a plan node's step type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepCategory {
    /// The pipeline root.
    Pipeline,
    /// The container of all stages.
    Stages,
    /// A stage.
    Stage,
    /// A step inside a stage.
    #[default]
    Step,
    /// A matrix, loop or parallelism strategy wrapping a stage or step.
    Strategy,
    /// A parallel fan-out.
    Fork,
}

/// The step type of a plan node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepType {
    /// Concrete type name, e.g. `ShellScript` or `STRATEGY`.
    #[serde(rename = "type")]
    pub step_type: String,
    /// Classification.
    pub category: StepCategory,
}

impl StepType {
    /// Creates a step type.
    #[must_use]
    pub fn new(step_type: impl Into<String>, category: StepCategory) -> Self {
        Self {
            step_type: step_type.into(),
            category,
        }
    }

    /// The step type of strategy nodes.
    #[must_use]
    pub fn strategy() -> Self {
        Self::new("STRATEGY", StepCategory::Strategy)
    }

    /// The step type of stage nodes.
    #[must_use]
    pub fn stage(step_type: impl Into<String>) -> Self {
        Self::new(step_type, StepCategory::Stage)
    }

    /// Returns true for strategy nodes.
    #[must_use]
    pub fn is_strategy(&self) -> bool {
        self.category == StepCategory::Strategy
    }
}

/// An adviser attached to a plan node, deciding what runs next.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdviserObtainment {
    /// Adviser type, e.g. `NEXT_STEP` or `ON_FAIL`.
    pub adviser_type: String,
    /// Opaque parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

impl AdviserObtainment {
    /// Creates an adviser without parameters.
    #[must_use]
    pub fn new(adviser_type: impl Into<String>) -> Self {
        Self {
            adviser_type: adviser_type.into(),
            parameters: None,
        }
    }

    /// Sets the parameters.
    #[must_use]
    pub fn with_parameters(mut self, parameters: serde_json::Value) -> Self {
        self.parameters = Some(parameters);
        self
    }
}

/// A unit of work in a compiled execution plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanNode {
    /// Stable node id.
    pub uuid: String,
    /// Display name.
    pub name: String,
    /// Identifier within the pipeline definition.
    pub identifier: String,
    /// Fully-qualified path of the node inside the pipeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_fqn: Option<String>,
    /// Step type.
    pub step_type: StepType,
    /// Outgoing adviser references.
    #[serde(default)]
    pub adviser_obtainments: Vec<AdviserObtainment>,
}

impl PlanNode {
    /// Creates a node with a fresh uuid.
    #[must_use]
    pub fn new(identifier: impl Into<String>, step_type: StepType) -> Self {
        let identifier = identifier.into();
        Self {
            uuid: generate_uuid().to_string(),
            name: identifier.clone(),
            identifier,
            stage_fqn: None,
            step_type,
            adviser_obtainments: Vec::new(),
        }
    }

    /// Sets the uuid.
    #[must_use]
    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = uuid.into();
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the fully-qualified path.
    #[must_use]
    pub fn with_stage_fqn(mut self, stage_fqn: impl Into<String>) -> Self {
        self.stage_fqn = Some(stage_fqn.into());
        self
    }

    /// Adds an adviser.
    #[must_use]
    pub fn with_adviser(mut self, adviser: AdviserObtainment) -> Self {
        self.adviser_obtainments.push(adviser);
        self
    }

    /// Returns true if the node's path lies inside the stage at `stage_fqn`.
    #[must_use]
    pub fn is_within(&self, stage_fqn: &str) -> bool {
        self.stage_fqn
            .as_deref()
            .is_some_and(|fqn| fqn_is_within(fqn, stage_fqn))
    }
}

pub(crate) fn fqn_is_within(fqn: &str, stage_fqn: &str) -> bool {
    fqn.strip_prefix(stage_fqn)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}

/// A plan node that replays a previous node execution instead of running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityPlanNode {
    /// The replaced node; uuid, identifier and name are preserved.
    #[serde(flatten)]
    pub node: PlanNode,
    /// The node execution from the earlier run being replayed.
    pub original_node_execution_id: String,
    /// Whether the recorded advisers of the original execution are reused.
    #[serde(default)]
    pub use_adviser_obtainments: bool,
}

impl IdentityPlanNode {
    /// Wraps `node` as a replay of `original_node_execution_id`.
    #[must_use]
    pub fn new(node: PlanNode, original_node_execution_id: impl Into<String>) -> Self {
        Self {
            node,
            original_node_execution_id: original_node_execution_id.into(),
            use_adviser_obtainments: false,
        }
    }

    /// Reuses the original execution's adviser obtainments.
    #[must_use]
    pub fn with_adviser_obtainments(mut self) -> Self {
        self.use_adviser_obtainments = true;
        self
    }
}

/// Discriminant of [`Node`], spelled as the `nodeType` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    /// A node that performs work.
    PlanNode,
    /// A node that replays an earlier execution.
    IdentityPlanNode,
}

/// A node of an execution plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "nodeType")]
pub enum Node {
    /// Performs fresh work.
    #[serde(rename = "PLAN_NODE")]
    Real(PlanNode),
    /// Replays a recorded outcome.
    #[serde(rename = "IDENTITY_PLAN_NODE")]
    Identity(IdentityPlanNode),
}

impl Node {
    /// Returns the underlying plan node.
    #[must_use]
    pub fn plan_node(&self) -> &PlanNode {
        match self {
            Self::Real(node) => node,
            Self::Identity(identity) => &identity.node,
        }
    }

    /// Returns the node uuid.
    #[must_use]
    pub fn uuid(&self) -> &str {
        &self.plan_node().uuid
    }

    /// Returns the node identifier.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.plan_node().identifier
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.plan_node().name
    }

    /// Returns the fully-qualified path, if any.
    #[must_use]
    pub fn stage_fqn(&self) -> Option<&str> {
        self.plan_node().stage_fqn.as_deref()
    }

    /// Returns the discriminant.
    #[must_use]
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Real(_) => NodeType::PlanNode,
            Self::Identity(_) => NodeType::IdentityPlanNode,
        }
    }

    /// Returns true for replay nodes.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Identity(_))
    }

    /// Returns the replayed node execution id for identity nodes.
    #[must_use]
    pub fn original_node_execution_id(&self) -> Option<&str> {
        match self {
            Self::Real(_) => None,
            Self::Identity(identity) => Some(&identity.original_node_execution_id),
        }
    }
}

impl From<PlanNode> for Node {
    fn from(node: PlanNode) -> Self {
        Self::Real(node)
    }
}

impl From<IdentityPlanNode> for Node {
    fn from(node: IdentityPlanNode) -> Self {
        Self::Identity(node)
    }
}

/// A compiled execution plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPlan {
    /// Plan id.
    pub uuid: String,
    /// Nodes in compilation order.
    pub nodes: Vec<Node>,
    /// Uuid of the node execution starts from.
    #[serde(default)]
    pub start_node_id: String,
}

impl ExecutionPlan {
    /// Creates an empty plan.
    #[must_use]
    pub fn new(start_node_id: impl Into<String>) -> Self {
        Self {
            uuid: generate_uuid().to_string(),
            nodes: Vec::new(),
            start_node_id: start_node_id.into(),
        }
    }

    /// Appends a node.
    #[must_use]
    pub fn with_node(mut self, node: impl Into<Node>) -> Self {
        self.nodes.push(node.into());
        self
    }

    /// Returns the nodes.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Finds a node by uuid.
    #[must_use]
    pub fn node(&self, uuid: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.uuid() == uuid)
    }

    /// Counts identity nodes.
    #[must_use]
    pub fn identity_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_identity()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fqn_containment() {
        assert!(fqn_is_within("pipeline.stages.s1", "pipeline.stages.s1"));
        assert!(fqn_is_within("pipeline.stages.s1.spec.execution", "pipeline.stages.s1"));
        assert!(!fqn_is_within("pipeline.stages.s10", "pipeline.stages.s1"));
        assert!(!fqn_is_within("pipeline.stages", "pipeline.stages.s1"));
    }

    #[test]
    fn test_node_accessors() {
        let plan_node = PlanNode::new("stage1", StepType::stage("Deployment"))
            .with_uuid("u1")
            .with_name("Stage One")
            .with_stage_fqn("pipeline.stages.stage1");
        let real = Node::from(plan_node.clone());
        assert_eq!(real.node_type(), NodeType::PlanNode);
        assert_eq!(real.original_node_execution_id(), None);

        let identity = Node::from(IdentityPlanNode::new(plan_node, "ne1"));
        assert_eq!(identity.node_type(), NodeType::IdentityPlanNode);
        assert_eq!(identity.uuid(), "u1");
        assert_eq!(identity.identifier(), "stage1");
        assert_eq!(identity.name(), "Stage One");
        assert_eq!(identity.original_node_execution_id(), Some("ne1"));
    }

    #[test]
    fn test_identity_node_serializes_flat() {
        let node = Node::from(IdentityPlanNode::new(
            PlanNode::new("s1", StepType::strategy()).with_uuid("u1"),
            "ne1",
        ).with_adviser_obtainments());
        let json = serde_json::to_value(&node).unwrap();

        assert_eq!(json["nodeType"], "IDENTITY_PLAN_NODE");
        assert_eq!(json["uuid"], "u1");
        assert_eq!(json["originalNodeExecutionId"], "ne1");
        assert_eq!(json["useAdviserObtainments"], true);
        assert_eq!(json["stepType"]["category"], "STRATEGY");

        let back: Node = serde_json::from_value(json).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_node_tag_matches_node_type() {
        let real = Node::from(PlanNode::new("s1", StepType::stage("Custom")).with_uuid("u1"));
        let identity = Node::from(IdentityPlanNode::new(
            PlanNode::new("s2", StepType::stage("Custom")).with_uuid("u2"),
            "ne2",
        ));

        for node in [real, identity] {
            let json = serde_json::to_value(&node).unwrap();
            assert_eq!(json["nodeType"], serde_json::to_value(node.node_type()).unwrap());
        }
        assert_eq!(serde_json::to_value(NodeType::PlanNode).unwrap(), "PLAN_NODE");
    }

    #[test]
    fn test_plan_lookup() {
        let plan = ExecutionPlan::new("root")
            .with_node(PlanNode::new("pipeline", StepType::new("PIPELINE", StepCategory::Pipeline)).with_uuid("root"))
            .with_node(PlanNode::new("s1", StepType::stage("Custom")).with_uuid("u1"));

        assert_eq!(plan.node("u1").map(Node::identifier), Some("s1"));
        assert!(plan.node("missing").is_none());
        assert_eq!(plan.identity_count(), 0);
    }
}
