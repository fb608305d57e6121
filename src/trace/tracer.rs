use std::collections::HashSet;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};

use futures::FutureExt;

use serde::Serialize;

use super::span::{Span, SpanId, SpanKind, SpanStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceMetrics {
    pub tracer_name: String,
    pub total_spans: usize,
    pub completed_spans: usize,
    pub failed_spans: usize,
    pub active_spans: usize,
    pub avg_duration_ms: f64,
    pub total_events: usize,
}

/// Records spans for one trace.
///
/// Nesting is expressed only through `parent_id`. The tracer does not check
/// that a parent exists or is still open, so orphaned parent references are
/// recorded as given. No tracer operation fails: closing an unknown or
/// already closed span is logged and ignored.
///
/// # Example
/// ```
/// use agent_primitives::trace::{SpanKind, SpanStatus, Tracer};
///
/// let mut tracer = Tracer::new("demo");
/// let parent = tracer.start_span("agent_task", SpanKind::AgentExecution, None);
/// let child = tracer.start_span("tool_call", SpanKind::ToolCall, Some(parent));
/// tracer.end_span(child, SpanStatus::Success);
/// tracer.end_span(parent, SpanStatus::Success);
///
/// assert_eq!(tracer.get_trace().len(), 2);
/// assert_eq!(tracer.get_metrics().active_spans, 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Tracer {
    name: String,
    spans: Vec<Span>,
    active: HashSet<SpanId>,
}

impl Tracer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Open a span, append it to the trace and mark it active
    pub fn start_span(&mut self, name: &str, kind: SpanKind, parent_id: Option<SpanId>) -> SpanId {
        let span = Span::open(name, kind, parent_id);
        let id = span.id();

        tracing::debug!(tracer = %self.name, span = name, %kind, span_id = %id, "span started");
        self.active.insert(id);
        self.spans.push(span);
        id
    }

    /// Close a span and remove it from the active set
    pub fn end_span(&mut self, id: SpanId, status: SpanStatus) {
        let status = match status {
            SpanStatus::InProgress => {
                tracing::warn!(span_id = %id, "span closed with in_progress status, recording success");
                SpanStatus::Success
            }
            other => other,
        };

        let Some(span) = self.span_mut(id) else {
            tracing::warn!(span_id = %id, "end_span on unknown span ignored");
            return;
        };

        if span.close(status) {
            tracing::debug!(span = span.name(), span_id = %id, ?status, duration_ms = ?span.duration_ms(), "span ended");
        } else {
            tracing::warn!(span = span.name(), span_id = %id, "span already closed");
        }
        self.active.remove(&id);
    }

    /// Run `f` inside a new span.
    ///
    /// The span is closed on every path. An `Err` from `f` marks the span
    /// failed and logs an error event; the error itself is returned as is.
    /// A panic in `f` closes the span as failed before it resumes.
    pub fn in_span<T, E, F>(&mut self, name: &str, kind: SpanKind, parent_id: Option<SpanId>, f: F) -> Result<T, E>
    where
        E: std::fmt::Display,
        F: FnOnce(&mut Span) -> Result<T, E>,
    {
        let id = self.start_span(name, kind, parent_id);
        let index = self.spans.len() - 1;

        let span = &mut self.spans[index];
        match panic::catch_unwind(AssertUnwindSafe(|| f(span))) {
            Ok(result) => {
                self.finish_span(id, &result);
                result
            }
            Err(payload) => {
                self.abandon_span(id);
                panic::resume_unwind(payload)
            }
        }
    }

    /// Await `work` inside a new span.
    ///
    /// Async counterpart of [`Tracer::in_span`] for work that does not need
    /// the tracer itself, with the same closing rules.
    pub async fn in_span_async<T, E, Fut>(
        &mut self,
        name: &str,
        kind: SpanKind,
        parent_id: Option<SpanId>,
        work: Fut,
    ) -> Result<T, E>
    where
        E: std::fmt::Display,
        Fut: Future<Output = Result<T, E>>,
    {
        let id = self.start_span(name, kind, parent_id);

        match AssertUnwindSafe(work).catch_unwind().await {
            Ok(result) => {
                self.finish_span(id, &result);
                result
            }
            Err(payload) => {
                self.abandon_span(id);
                panic::resume_unwind(payload)
            }
        }
    }

    fn finish_span<T, E: std::fmt::Display>(&mut self, id: SpanId, result: &Result<T, E>) {
        let status = match result {
            Ok(_) => SpanStatus::Success,
            Err(e) => {
                if let Some(span) = self.span_mut(id) {
                    span.log_error(e.to_string());
                }
                SpanStatus::Failed
            }
        };
        self.end_span(id, status);
    }

    fn abandon_span(&mut self, id: SpanId) {
        if let Some(span) = self.span_mut(id) {
            span.log_error("panicked");
        }
        self.end_span(id, SpanStatus::Failed);
    }

    pub fn span(&self, id: SpanId) -> Option<&Span> {
        self.spans.iter().rev().find(|s| s.id() == id)
    }

    pub fn span_mut(&mut self, id: SpanId) -> Option<&mut Span> {
        self.spans.iter_mut().rev().find(|s| s.id() == id)
    }

    pub fn is_active(&self, id: SpanId) -> bool {
        self.active.contains(&id)
    }

    /// Snapshot of every span, in start order
    pub fn get_trace(&self) -> Vec<Span> {
        self.spans.clone()
    }

    /// Trace as pretty-printed JSON
    pub fn export_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.spans)
    }

    pub fn get_metrics(&self) -> TraceMetrics {
        let durations: Vec<f64> = self.spans.iter().filter_map(Span::duration_ms).collect();

        TraceMetrics {
            tracer_name: self.name.clone(),
            total_spans: self.spans.len(),
            completed_spans: self
                .spans
                .iter()
                .filter(|s| s.status() != SpanStatus::InProgress)
                .count(),
            failed_spans: self
                .spans
                .iter()
                .filter(|s| s.status() == SpanStatus::Failed)
                .count(),
            active_spans: self.active.len(),
            avg_duration_ms: if durations.is_empty() {
                0.0
            } else {
                durations.iter().sum::<f64>() / durations.len() as f64
            },
            total_events: self.spans.iter().map(|s| s.events().len()).sum(),
        }
    }
}
