//! Execution plans and their retry rewrite.
//!
//! Plans are compiled elsewhere from the hybrid document. This module turns
//! the nodes of replayed stages into identity nodes that point at node
//! executions of the earlier run.

mod node;
mod replay;
mod rewriter;

pub use node::{
    AdviserObtainment, ExecutionPlan, IdentityPlanNode, Node, NodeType, PlanNode, StepCategory,
    StepType,
};
pub use replay::{NodeExecutionRecord, ReplayIndex};
pub use rewriter::{replay_strategy_nodes, rewrite};

pub(crate) use node::fqn_is_within;
