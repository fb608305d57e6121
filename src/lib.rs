//! Agent Primitives Library
//!
//! Building blocks for multi-agent systems: the perceive/decide/act agent
//! contract, a runner with single, loop and parallel modes, handoffs between
//! agents, input/output guardrails, tools (agents included) with call
//! histories, execution tracing, and four orchestration topologies
//! (centralized, hierarchical, decentralized and swarm).
//!
//! Model providers, persistence and entry points are left to the caller;
//! agents that need them implement [`agents::Agent`].

pub mod agents;
pub mod config;
pub mod domain;
pub mod guardrails;
pub mod orchestration;
pub mod telemetry;
pub mod tools;
pub mod trace;
