//! Observability utilities.

mod spans;
mod subscriber;

pub use spans::{RetrySpanAttributes, SpanTimer};
pub use subscriber::init_tracing;
