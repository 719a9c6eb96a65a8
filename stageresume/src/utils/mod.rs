//! Utility functions for UUID generation and timestamps.

pub mod timestamps;
mod uuid_utils;

pub use timestamps::{is_older_than_days, now_millis};
pub use uuid_utils::generate_uuid;
