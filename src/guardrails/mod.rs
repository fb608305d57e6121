// Guardrails for input/output validation and policy enforcement
//
// A guardrail is a named predicate with its own violation log. The manager
// applies ordered lists of them either raising on the first failure or
// reporting every failure as a boolean.

pub mod builtin;
pub mod guardrail;
pub mod manager;

pub use builtin::{content_filter_guardrail, format_guardrail, length_guardrail, policy_guardrail};
pub use guardrail::{Guardrail, GuardrailKind, GuardrailMetrics, Violation};
pub use manager::{GuardrailManager, GuardrailManagerMetrics, GuardrailMode};
