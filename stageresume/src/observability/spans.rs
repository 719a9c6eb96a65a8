//! Span timing and attributes for retry operations.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;

/// Span attributes describing one retry operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrySpanAttributes {
    /// Operation name, e.g. `retry.prepare`.
    pub operation: String,
    /// Execution being retried.
    pub plan_execution_id: Option<String>,
    /// Root of the retry lineage.
    pub root_execution_id: Option<String>,
    /// Pipeline identifier.
    pub pipeline_identifier: Option<String>,
    /// Stages selected for retry.
    pub retry_stages: Vec<String>,
    /// Number of replayed stages.
    pub skipped_stage_count: Option<usize>,
    /// Duration in milliseconds.
    pub duration_ms: Option<f64>,
    /// Error message if the operation failed.
    pub error: Option<String>,
}

impl RetrySpanAttributes {
    /// Creates attributes for `operation`.
    #[must_use]
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            ..Default::default()
        }
    }

    /// Sets the retried execution.
    #[must_use]
    pub fn with_plan_execution_id(mut self, id: impl Into<String>) -> Self {
        self.plan_execution_id = Some(id.into());
        self
    }

    /// Sets the lineage root.
    #[must_use]
    pub fn with_root_execution_id(mut self, id: impl Into<String>) -> Self {
        self.root_execution_id = Some(id.into());
        self
    }

    /// Sets the pipeline identifier.
    #[must_use]
    pub fn with_pipeline(mut self, pipeline_identifier: impl Into<String>) -> Self {
        self.pipeline_identifier = Some(pipeline_identifier.into());
        self
    }

    /// Sets the selected stages.
    #[must_use]
    pub fn with_retry_stages(mut self, stages: &[String]) -> Self {
        self.retry_stages = stages.to_vec();
        self
    }

    /// Sets the number of replayed stages.
    #[must_use]
    pub fn with_skipped_stage_count(mut self, count: usize) -> Self {
        self.skipped_stage_count = Some(count);
        self
    }

    /// Sets the duration.
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Sets the error.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Converts to OpenTelemetry attributes.
    #[must_use]
    pub fn to_otel_attributes(&self) -> HashMap<String, String> {
        let mut attrs = HashMap::new();

        attrs.insert("retry.operation".to_string(), self.operation.clone());

        if let Some(ref v) = self.plan_execution_id {
            attrs.insert("retry.plan_execution_id".to_string(), v.clone());
        }
        if let Some(ref v) = self.root_execution_id {
            attrs.insert("retry.root_execution_id".to_string(), v.clone());
        }
        if let Some(ref v) = self.pipeline_identifier {
            attrs.insert("pipeline.identifier".to_string(), v.clone());
        }
        if !self.retry_stages.is_empty() {
            attrs.insert("retry.stages".to_string(), self.retry_stages.join(","));
        }
        if let Some(v) = self.skipped_stage_count {
            attrs.insert("retry.skipped_stage_count".to_string(), v.to_string());
        }
        if let Some(v) = self.duration_ms {
            attrs.insert("retry.duration_ms".to_string(), v.to_string());
        }
        if let Some(ref v) = self.error {
            attrs.insert("retry.error".to_string(), v.clone());
        }

        attrs
    }
}

/// Simple span timing helper.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
    name: String,
}

impl SpanTimer {
    /// Starts a new span timer.
    #[must_use]
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Returns the span name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Finishes the span, logging and returning the duration.
    pub fn finish(self, attributes: &RetrySpanAttributes) -> f64 {
        let duration_ms = self.elapsed_ms();
        let attributes = attributes.clone().with_duration_ms(duration_ms).to_otel_attributes();
        match attributes.get("retry.error") {
            Some(error) => tracing::warn!(span_name = %self.name, duration_ms, error = %error, ?attributes, "Span failed"),
            None => tracing::debug!(span_name = %self.name, duration_ms, ?attributes, "Span ended"),
        }
        duration_ms
    }
}
