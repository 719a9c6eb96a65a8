//! Retry selection and orchestration.
//!
//! [`group_for_retry`] and [`only_failed_among`] work on persisted stage
//! records. [`RetryCoordinator`] wires them together with the document and
//! plan layers over the collaborator stores.

mod coordinator;
mod filter;
mod grouper;


pub use coordinator::{
    RetryCoordinator, RetryPreparation, RetryRequest, NOT_LATEST, PIPELINE_UPDATED, ROLLED_BACK,
};
pub use filter::only_failed_among;
pub use grouper::group_for_retry;
