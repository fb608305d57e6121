// Execution tracing
//
// Span records owned by a Tracer. Independent of the `tracing` crate, which
// the tracer only uses for its own diagnostics.

pub mod span;
pub mod tracer;

pub use span::{EventKind, Span, SpanId, SpanKind, SpanStatus, TraceEvent};
pub use tracer::{TraceMetrics, Tracer};
