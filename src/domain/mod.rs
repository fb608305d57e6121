// Domain layer module exports
// Aggregates here hold their own invariants and emit events on transitions;
// they never perform I/O

pub mod handoff;
