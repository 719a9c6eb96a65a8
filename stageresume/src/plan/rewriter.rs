//! Rewrites compiled plans so replayed stages become identity nodes.

use super::node::{fqn_is_within, ExecutionPlan, IdentityPlanNode, Node, PlanNode};
use super::replay::{NodeExecutionRecord, ReplayIndex};
use crate::errors::{RetryError, RetryResult};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Rewrites every node that is not in `real_node_uuids` into an identity node.
///
/// A rewritten node must lie inside one of `stage_fqns_to_skip` and must
/// have a recorded node execution in `index`. Identity nodes keep the uuid,
/// identifier, name, step type and advisers of the node they replace.
/// Nodes that are already identity nodes are left alone.
///
/// # Errors
///
/// Returns [`RetryError::InvalidState`] if a node needing replay has no
/// path, lies outside every skipped stage, or has no recorded execution.
pub fn rewrite<S: AsRef<str>>(
    plan: ExecutionPlan,
    real_node_uuids: &HashSet<String>,
    stage_fqns_to_skip: &[S],
    index: &ReplayIndex,
) -> RetryResult<ExecutionPlan> {
    let ExecutionPlan {
        uuid,
        nodes,
        start_node_id,
    } = plan;

    let nodes = nodes
        .into_iter()
        .map(|node| match node {
            Node::Real(node) if !real_node_uuids.contains(&node.uuid) => {
                replay_node(node, stage_fqns_to_skip, index).map(Node::Identity)
            }
            other => Ok(other),
        })
        .collect::<RetryResult<Vec<_>>>()?;

    let plan = ExecutionPlan {
        uuid,
        nodes,
        start_node_id,
    };
    debug!(
        plan = %plan.uuid,
        nodes = plan.nodes.len(),
        identity_nodes = plan.identity_count(),
        "Rewrote plan for retry"
    );
    Ok(plan)
}

fn replay_node<S: AsRef<str>>(
    node: PlanNode,
    stage_fqns_to_skip: &[S],
    index: &ReplayIndex,
) -> RetryResult<IdentityPlanNode> {
    let Some(fqn) = node.stage_fqn.as_deref() else {
        return Err(RetryError::invalid_state(format!(
            "Plan node {} ({}) has no stage FQN to replay",
            node.identifier, node.uuid
        )));
    };

    if !stage_fqns_to_skip
        .iter()
        .any(|skip| fqn_is_within(fqn, skip.as_ref()))
    {
        return Err(RetryError::invalid_state(format!(
            "Plan node {} at {fqn} is neither retried nor part of a skipped stage",
            node.identifier
        )));
    }

    let Some(node_execution_id) = index.resolve(&node.uuid, Some(fqn)) else {
        warn!(node = %node.uuid, fqn, "No previous node execution for skipped node");
        return Err(RetryError::invalid_state(format!(
            "No previous node execution found for {fqn}"
        )));
    };

    let node_execution_id = node_execution_id.to_string();
    Ok(IdentityPlanNode::new(node, node_execution_id))
}

/// Replays strategy nodes of retried stages that already ran in the earlier run.
///
/// A real strategy node inside one of `stage_fqns_to_retry` becomes an
/// identity node reusing its recorded advisers when `strategy_executions`
/// holds an execution at the same path. Strategy nodes without a recorded
/// execution stay real, and every other node is returned unchanged.
#[must_use]
pub fn replay_strategy_nodes<S: AsRef<str>>(
    plan: ExecutionPlan,
    stage_fqns_to_retry: &[S],
    strategy_executions: &[NodeExecutionRecord],
) -> ExecutionPlan {
    let ExecutionPlan {
        uuid,
        nodes,
        start_node_id,
    } = plan;

    let nodes = nodes
        .into_iter()
        .map(|node| match node {
            Node::Real(node)
                if node.step_type.is_strategy()
                    && stage_fqns_to_retry.iter().any(|f| node.is_within(f.as_ref())) =>
            {
                let recorded = strategy_executions
                    .iter()
                    .find(|e| node.stage_fqn.as_deref() == Some(e.stage_fqn.as_str()));
                match recorded {
                    Some(execution) => {
                        let id = execution.node_execution_id.clone();
                        Node::Identity(IdentityPlanNode::new(node, id).with_adviser_obtainments())
                    }
                    None => Node::Real(node),
                }
            }
            other => other,
        })
        .collect();

    ExecutionPlan {
        uuid,
        nodes,
        start_node_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{NodeType, StepCategory, StepType};
    use crate::testing::fixtures::retry_plan;
    use pretty_assertions::assert_eq;

    const SKIPPED: [&str; 1] = ["pipeline.stages.stage1"];

    fn real(uuids: &[&str]) -> HashSet<String> {
        uuids.iter().map(ToString::to_string).collect()
    }

    fn stage1_index() -> ReplayIndex {
        ReplayIndex::from_records(&[
            NodeExecutionRecord::new("ne-stage1", "stage1-uuid", "pipeline.stages.stage1"),
            NodeExecutionRecord::new("ne-step1", "step1-uuid", "pipeline.stages.stage1.spec.execution.steps.step1"),
        ])
    }

    #[test]
    fn test_real_nodes_are_kept() {
        let plan = retry_plan();
        let all: Vec<&str> = plan.nodes().iter().map(Node::uuid).collect();
        let rewritten = rewrite(plan.clone(), &real(&all), &SKIPPED, &ReplayIndex::new()).unwrap();
        assert_eq!(rewritten, plan);
    }

    #[test]
    fn test_skipped_stage_becomes_identity() {
        let plan = retry_plan();
        let rewritten = rewrite(
            plan,
            &real(&["pipeline-uuid", "stage2-uuid", "step2-uuid"]),
            &SKIPPED,
            &stage1_index(),
        )
        .unwrap();

        let stage1 = rewritten.node("stage1-uuid").unwrap();
        assert_eq!(stage1.node_type(), NodeType::IdentityPlanNode);
        assert_eq!(stage1.original_node_execution_id(), Some("ne-stage1"));
        assert_eq!(stage1.identifier(), "stage1");
        assert_eq!(stage1.name(), "Stage 1");

        let step1 = rewritten.node("step1-uuid").unwrap();
        assert_eq!(step1.original_node_execution_id(), Some("ne-step1"));
        assert_eq!(rewritten.identity_count(), 2);
        assert!(!rewritten.node("stage2-uuid").unwrap().is_identity());
    }

    #[test]
    fn test_missing_execution_is_invalid_state() {
        let index = ReplayIndex::from_records(&[NodeExecutionRecord::new(
            "ne-stage1",
            "stage1-uuid",
            "pipeline.stages.stage1",
        )]);
        let err = rewrite(
            retry_plan(),
            &real(&["pipeline-uuid", "stage2-uuid", "step2-uuid"]),
            &SKIPPED,
            &index,
        )
        .unwrap_err();
        assert!(err.is_invalid_state());
        assert!(err.to_string().contains("steps.step1"));
    }

    #[test]
    fn test_node_outside_skip_list_is_invalid_state() {
        let err = rewrite(
            retry_plan(),
            &real(&["pipeline-uuid", "stage1-uuid", "step1-uuid"]),
            &SKIPPED,
            &stage1_index(),
        )
        .unwrap_err();
        assert!(err.is_invalid_state());
    }

    #[test]
    fn test_node_without_fqn_is_invalid_state() {
        let err = rewrite(retry_plan(), &HashSet::new(), &SKIPPED, &stage1_index()).unwrap_err();
        assert!(err.is_invalid_state());
        assert!(err.to_string().contains("pipeline-uuid"));
    }

    #[test]
    fn test_strategy_replayed_when_previously_executed() {
        let strategy = PlanNode::new("stage2", StepType::strategy())
            .with_uuid("strategy-uuid")
            .with_stage_fqn("pipeline.stages.stage2");
        let plan = retry_plan().with_node(strategy);
        let executions = [NodeExecutionRecord::new("ne-strategy", "old-uuid", "pipeline.stages.stage2")
            .with_step_type(StepType::strategy())];

        let replayed = replay_strategy_nodes(plan, &["pipeline.stages.stage2"], &executions);

        match replayed.node("strategy-uuid").unwrap() {
            Node::Identity(identity) => {
                assert!(identity.use_adviser_obtainments);
                assert_eq!(identity.original_node_execution_id, "ne-strategy");
                assert_eq!(identity.node.identifier, "stage2");
            }
            Node::Real(_) => panic!("strategy node should be replayed"),
        }
        assert_eq!(replayed.identity_count(), 1);
    }

    #[test]
    fn test_strategy_kept_without_previous_execution() {
        let strategy = PlanNode::new("stage2", StepType::strategy())
            .with_uuid("strategy-uuid")
            .with_stage_fqn("pipeline.stages.stage2");
        let plan = retry_plan().with_node(strategy);

        let replayed = replay_strategy_nodes(plan.clone(), &["pipeline.stages.stage2"], &[]);
        assert_eq!(replayed, plan);
    }

    #[test]
    fn test_non_strategy_nodes_ignored_by_strategy_replay() {
        let plan = retry_plan();
        let executions = [NodeExecutionRecord::new("ne", "x", "pipeline.stages.stage2")
            .with_step_type(StepType::new("Custom", StepCategory::Stage))];
        let replayed = replay_strategy_nodes(plan.clone(), &["pipeline.stages.stage2"], &executions);
        assert_eq!(replayed, plan);
    }
}
