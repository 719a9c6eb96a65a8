//! Assertions for retry results.

use crate::core::RetryLineageInfo;
use crate::plan::{ExecutionPlan, Node};

/// Asserts that a validation answer is resumable.
pub fn assert_resumable(info: &RetryLineageInfo) {
    assert!(
        info.resumable,
        "Expected a resumable execution, got: {:?}",
        info.error_message
    );
}

/// Asserts that a validation answer was refused with `message`.
pub fn assert_not_resumable(info: &RetryLineageInfo, message: &str) {
    assert!(!info.resumable, "Expected the retry to be refused");
    assert_eq!(info.error_message.as_deref(), Some(message));
}

/// Asserts the group shape of a lineage as identifier lists.
pub fn assert_group_identifiers(info: &RetryLineageInfo, expected: &[&[&str]]) {
    let actual: Vec<Vec<&str>> = info.groups().iter().map(|g| g.identifiers()).collect();
    let expected: Vec<Vec<&str>> = expected.iter().map(|g| g.to_vec()).collect();
    assert_eq!(actual, expected, "Retry groups differ");
}

/// Asserts that the node `uuid` replays `node_execution_id`.
pub fn assert_identity_node(plan: &ExecutionPlan, uuid: &str, node_execution_id: &str) {
    match plan.node(uuid) {
        Some(Node::Identity(identity)) => assert_eq!(
            identity.original_node_execution_id, node_execution_id,
            "Identity node {uuid} replays the wrong execution"
        ),
        Some(Node::Real(_)) => panic!("Expected node {uuid} to be an identity node"),
        None => panic!("Node {uuid} is not in the plan"),
    }
}

/// Asserts that the node `uuid` performs fresh work.
pub fn assert_real_node(plan: &ExecutionPlan, uuid: &str) {
    match plan.node(uuid) {
        Some(Node::Real(_)) => {}
        Some(Node::Identity(_)) => panic!("Expected node {uuid} to run for real"),
        None => panic!("Node {uuid} is not in the plan"),
    }
}
