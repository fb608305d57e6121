use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use tokio::sync::Mutex;

use super::errors::{AgentError, AgentResult};
use super::types::{AgentMetrics, Payload};

/// The three-phase decision cycle every agent implements.
///
/// Implementations only describe how input becomes output. Request counting,
/// serialization of calls and error accounting live in [`AgentHandle`], which
/// is the only way the runner and orchestrators invoke an agent.
///
/// # Example
/// ```
/// use agent_primitives::agents::{Agent, AgentHandle, AgentResult, Payload};
/// use async_trait::async_trait;
///
/// struct Echo;
///
/// #[async_trait]
/// impl Agent for Echo {
///     fn name(&self) -> &str {
///         "echo"
///     }
///
///     async fn perceive(&mut self, input: Payload) -> AgentResult<Payload> {
///         Ok(input)
///     }
///
///     async fn decide(&mut self, perception: Payload) -> AgentResult<Payload> {
///         Ok(perception)
///     }
///
///     async fn act(&mut self, decision: Payload) -> AgentResult<Payload> {
///         Ok(decision)
///     }
/// }
///
/// let handle = AgentHandle::new(Echo);
/// assert_eq!(handle.name(), "echo");
/// ```
#[async_trait]
pub trait Agent: Send {
    /// Name used for registries and execution records
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Turn raw input into a perception
    async fn perceive(&mut self, input: Payload) -> AgentResult<Payload>;

    /// Choose what to do about a perception
    async fn decide(&mut self, perception: Payload) -> AgentResult<Payload>;

    /// Carry out a decision and produce the result
    async fn act(&mut self, decision: Payload) -> AgentResult<Payload>;
}

struct AgentCell {
    agent: Box<dyn Agent>,
    metrics: AgentMetrics,
}

/// Shared, cloneable handle to a registered agent.
///
/// Calls to [`AgentHandle::run`] on the same agent are serialized through an
/// async mutex, so an agent may be registered with several runners or
/// orchestrators at once while its metrics still reflect exactly its own
/// calls.
#[derive(Clone)]
pub struct AgentHandle {
    name: Arc<str>,
    description: Arc<str>,
    created_at: DateTime<Utc>,
    cell: Arc<Mutex<AgentCell>>,
}

impl AgentHandle {
    /// Wrap an agent implementation
    pub fn new<A: Agent + 'static>(agent: A) -> Self {
        Self {
            name: Arc::from(agent.name()),
            description: Arc::from(agent.description()),
            created_at: Utc::now(),
            cell: Arc::new(Mutex::new(AgentCell {
                agent: Box::new(agent),
                metrics: AgentMetrics::default(),
            })),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Run perceive -> decide -> act and account for the request.
    ///
    /// `total_requests` is incremented before perceive. Failures from any
    /// phase increment `failed_requests` and are returned unchanged.
    /// `StopRequested` is a controlled outcome and counts as a success.
    /// A panic inside a phase is caught, counted as a failure and returned
    /// as `AgentError::Panicked`.
    pub async fn run(&self, input: Payload) -> AgentResult<Payload> {
        let mut cell = self.cell.lock().await;
        cell.metrics.total_requests += 1;

        tracing::debug!(agent = %self.name, "agent run started");
        let result = AssertUnwindSafe(run_phases(cell.agent.as_mut(), input))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(AgentError::Panicked(panic_message(panic.as_ref()))));

        match &result {
            Ok(_) | Err(AgentError::StopRequested) => cell.metrics.successful_requests += 1,
            Err(e) => {
                cell.metrics.failed_requests += 1;
                tracing::warn!(agent = %self.name, error = %e, "agent run failed");
            }
        }

        result
    }

    /// Snapshot of the agent's request counters
    pub async fn get_metrics(&self) -> AgentMetrics {
        self.cell.lock().await.metrics
    }
}

impl std::fmt::Debug for AgentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentHandle")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

async fn run_phases(agent: &mut dyn Agent, input: Payload) -> AgentResult<Payload> {
    let perception = agent.perceive(input).await?;
    let decision = agent.decide(perception).await?;
    agent.act(decision).await
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

type Phase = Box<dyn FnMut(Payload) -> AgentResult<Payload> + Send>;

fn passthrough(value: Payload) -> AgentResult<Payload> {
    Ok(value)
}

/// Agent assembled from three closures
///
/// Any phase left unset passes its value through unchanged.
pub struct FnAgent {
    name: String,
    description: String,
    perceive: Phase,
    decide: Phase,
    act: Phase,
}

impl FnAgent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            perceive: Box::new(passthrough),
            decide: Box::new(passthrough),
            act: Box::new(passthrough),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn on_perceive<F>(mut self, f: F) -> Self
    where
        F: FnMut(Payload) -> AgentResult<Payload> + Send + 'static,
    {
        self.perceive = Box::new(f);
        self
    }

    pub fn on_decide<F>(mut self, f: F) -> Self
    where
        F: FnMut(Payload) -> AgentResult<Payload> + Send + 'static,
    {
        self.decide = Box::new(f);
        self
    }

    pub fn on_act<F>(mut self, f: F) -> Self
    where
        F: FnMut(Payload) -> AgentResult<Payload> + Send + 'static,
    {
        self.act = Box::new(f);
        self
    }

    /// Convenience for `AgentHandle::new(self)`
    pub fn into_handle(self) -> AgentHandle {
        AgentHandle::new(self)
    }
}

#[async_trait]
impl Agent for FnAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn perceive(&mut self, input: Payload) -> AgentResult<Payload> {
        (self.perceive)(input)
    }

    async fn decide(&mut self, perception: Payload) -> AgentResult<Payload> {
        (self.decide)(perception)
    }

    async fn act(&mut self, decision: Payload) -> AgentResult<Payload> {
        (self.act)(decision)
    }
}
