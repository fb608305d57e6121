use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Map;
use uuid::Uuid;

use crate::agents::Payload;

/// Process-unique span identifier
pub type SpanId = Uuid;

/// Types of trace spans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    AgentExecution,
    ToolCall,
    LlmCall,
    Handoff,
    Validation,
    Custom,
}

impl std::fmt::Display for SpanKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpanKind::AgentExecution => write!(f, "agent_execution"),
            SpanKind::ToolCall => write!(f, "tool_call"),
            SpanKind::LlmCall => write!(f, "llm_call"),
            SpanKind::Handoff => write!(f, "handoff"),
            SpanKind::Validation => write!(f, "validation"),
            SpanKind::Custom => write!(f, "custom"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanStatus {
    InProgress,
    Success,
    Failed,
}

/// Severity of a span event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Start,
    End,
    Info,
    Warning,
    Error,
    Debug,
}

/// Timestamped entry inside a span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub kind: EventKind,
    pub message: String,
    pub data: Map<String, Payload>,
    pub timestamp: DateTime<Utc>,
}

impl TraceEvent {
    pub fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            data: Map::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_data(mut self, data: Map<String, Payload>) -> Self {
        self.data = data;
        self
    }
}

/// Named, timed unit of work.
///
/// # Invariants
/// - `end_time` is set at most once
/// - `duration_ms` is present exactly when `end_time` is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    id: SpanId,
    name: String,
    kind: SpanKind,
    parent_id: Option<SpanId>,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    duration_ms: Option<f64>,
    status: SpanStatus,
    events: Vec<TraceEvent>,
    metadata: Map<String, Payload>,
}

impl Span {
    pub(crate) fn open(name: impl Into<String>, kind: SpanKind, parent_id: Option<SpanId>) -> Self {
        let name = name.into();
        let start = TraceEvent::new(EventKind::Start, format!("Started {name}"));

        Self {
            id: Uuid::new_v4(),
            name,
            kind,
            parent_id,
            start_time: Utc::now(),
            end_time: None,
            duration_ms: None,
            status: SpanStatus::InProgress,
            events: vec![start],
            metadata: Map::new(),
        }
    }

    /// Close the span. Returns false, changing nothing, if it was already
    /// closed.
    pub(crate) fn close(&mut self, status: SpanStatus) -> bool {
        if self.end_time.is_some() {
            return false;
        }

        let end_time = Utc::now();
        let elapsed = end_time - self.start_time;
        self.duration_ms = Some(
            elapsed
                .num_microseconds()
                .map(|us| us as f64 / 1000.0)
                .unwrap_or(elapsed.num_milliseconds() as f64),
        );
        self.end_time = Some(end_time);
        self.status = status;
        self.events
            .push(TraceEvent::new(EventKind::End, format!("Ended {}", self.name)));
        true
    }

    pub fn add_event(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    pub fn log_info(&mut self, message: impl Into<String>) {
        self.add_event(TraceEvent::new(EventKind::Info, message));
    }

    pub fn log_warning(&mut self, message: impl Into<String>) {
        self.add_event(TraceEvent::new(EventKind::Warning, message));
    }

    pub fn log_error(&mut self, message: impl Into<String>) {
        self.add_event(TraceEvent::new(EventKind::Error, message));
    }

    pub fn log_debug(&mut self, message: impl Into<String>) {
        self.add_event(TraceEvent::new(EventKind::Debug, message));
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: Payload) {
        self.metadata.insert(key.into(), value);
    }

    // ===== Getters =====

    pub fn id(&self) -> SpanId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SpanKind {
        self.kind
    }

    pub fn parent_id(&self) -> Option<SpanId> {
        self.parent_id
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    pub fn duration_ms(&self) -> Option<f64> {
        self.duration_ms
    }

    pub fn status(&self) -> SpanStatus {
        self.status
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    pub fn metadata(&self) -> &Map<String, Payload> {
        &self.metadata
    }

    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }
}
