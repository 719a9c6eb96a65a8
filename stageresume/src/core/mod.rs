//! Core domain model types for stageresume.
//!
//! This module contains the records the retry core reads:
//! - Execution status enum
//! - Stage retry records and retry groups
//! - Pipeline execution summaries and plan execution metadata

mod record;
mod status;
mod summary;

pub use record::{RetryGroup, RetryLineageInfo, StageRetryRecord};
pub use status::ExecutionStatus;
pub use summary::{PipelineExecutionSummary, PlanExecutionMetadata, StagesExecutionMetadata};
