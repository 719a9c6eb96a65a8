//! # Stageresume
//!
//! Retry and resume support for multi-stage pipeline executions.
//!
//! A failed execution is resumed by re-running only the stages that need it
//! and replaying everything else from the earlier run:
//!
//! - **Retry groups**: rebuild the sequential/parallel stage structure from flat stage records
//! - **Eligibility**: compare the structural skeletons of two pipeline definitions
//! - **Document splitting**: assemble a hybrid document from the previous and current runs
//! - **Plan rewriting**: turn nodes of replayed stages into identity nodes
//! - **Lineage**: read every attempt sharing a root execution
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stageresume::prelude::*;
//!
//! let coordinator = RetryCoordinator::new(summaries, node_executions, pipelines);
//!
//! let info = coordinator.validate_retry("my_pipeline", "exec-1").await?;
//! if info.resumable {
//!     let request = RetryRequest::new("my_pipeline", "exec-1")
//!         .with_stages(["deploy"])
//!         .with_current_processed_yaml(resolved_yaml);
//!     let preparation = coordinator.prepare_retry(&request).await?;
//!     let plan = compile(&preparation.document)?;
//!     let plan = coordinator.transform_plan(plan, &preparation).await?;
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod core;
pub mod document;
pub mod errors;
pub mod lineage;
pub mod observability;
pub mod plan;
pub mod retry;
pub mod store;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{LogFormat, RetryConfig};
    pub use crate::core::{
        ExecutionStatus, PipelineExecutionSummary, PlanExecutionMetadata, RetryGroup,
        RetryLineageInfo, StageRetryRecord, StagesExecutionMetadata,
    };
    pub use crate::document::{
        is_retry_valid, split, PipelineDocument, PipelineVersion, SplitOutcome, StructuralSkeleton,
    };
    pub use crate::errors::{
        ConfigError, DocumentError, InvalidRequestError, RetryError, RetryResult,
    };
    pub use crate::lineage::{RetryHistoryResult, RetryLatestResult, RetryLineageService};
    pub use crate::observability::init_tracing;
    pub use crate::plan::{
        replay_strategy_nodes, rewrite, ExecutionPlan, IdentityPlanNode, Node, NodeExecutionRecord,
        PlanNode, ReplayIndex, StepType,
    };
    pub use crate::retry::{
        group_for_retry, only_failed_among, RetryCoordinator, RetryPreparation, RetryRequest,
    };
    pub use crate::store::{ExecutionSummaryStore, NodeExecutionIndex, PipelineStore};
}
