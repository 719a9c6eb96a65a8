//! Testing utilities for retry code.
//!
//! This module provides:
//! - Stage record fixtures in common layouts
//! - Golden V0 and V1 pipeline documents
//! - A small execution plan
//! - Assertions for validation answers and rewritten plans

pub mod fixtures;
mod assertions;

pub use assertions::{
    assert_group_identifiers, assert_identity_node, assert_not_resumable, assert_real_node,
    assert_resumable,
};
pub use fixtures::{golden_v0_document, golden_v1_document, retry_plan};
