// Handoff domain module
// Contains the handoff aggregate root, its status value object, domain events
// and the manager that owns handoffs between registered agents

#![allow(clippy::module_inception)]

pub mod events;
pub mod handoff;
pub mod manager;
pub mod value_objects;

// Re-export main types for convenience
pub use events::HandoffEvent;
pub use handoff::{Handoff, HandoffCondition, HandoffContext, HandoffInfo};
pub use manager::{HandoffManager, HandoffMetrics};
pub use value_objects::HandoffStatus;
