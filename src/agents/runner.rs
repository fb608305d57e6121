use chrono::Utc;

use super::agent::AgentHandle;
use super::errors::{AgentError, AgentResult};
use super::types::{ExecutionMode, ExecutionRecord, Outcome, Payload, RunOutput, RunnerMetrics};
use crate::config::Settings;

/// Predicate deciding early termination of a loop run
pub type StopCondition = Box<dyn Fn(&Payload) -> bool + Send + Sync>;

/// Default iteration cap for loop mode
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Execution engine driving one agent once, one agent in a feedback loop,
/// or several agents against the same input.
///
/// History and metrics accumulate across every call the runner makes and
/// are never reset implicitly.
///
/// # Example
/// ```
/// use agent_primitives::agents::{ExecutionMode, FnAgent, Runner};
/// use serde_json::json;
///
/// # #[tokio::main]
/// # async fn main() {
/// let counter = FnAgent::new("counter")
///     .on_act(|v| Ok(json!(v.as_i64().unwrap_or(0) + 1)))
///     .into_handle();
///
/// let mut runner = Runner::new(ExecutionMode::Loop)
///     .with_max_iterations(10)
///     .with_stop_condition(|v| v.as_i64() >= Some(5));
///
/// let results = runner.run_loop(&counter, json!(0)).await;
/// assert_eq!(results.len(), 5);
/// # }
/// ```
pub struct Runner {
    mode: ExecutionMode,
    max_iterations: usize,
    stop_condition: Option<StopCondition>,
    execution_history: Vec<ExecutionRecord>,
    metrics: RunnerMetrics,
}

impl Runner {
    pub fn new(mode: ExecutionMode) -> Self {
        Self {
            mode,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            stop_condition: None,
            execution_history: Vec::new(),
            metrics: RunnerMetrics::default(),
        }
    }

    /// Create a runner using the configured iteration cap
    pub fn from_settings(mode: ExecutionMode, settings: &Settings) -> Self {
        Self::new(mode).with_max_iterations(settings.max_iterations)
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_stop_condition<F>(mut self, condition: F) -> Self
    where
        F: Fn(&Payload) -> bool + Send + Sync + 'static,
    {
        self.stop_condition = Some(Box::new(condition));
        self
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Execute in the configured mode.
    ///
    /// Single and loop modes drive the first agent of `agents`; parallel
    /// mode drives all of them.
    pub async fn execute(&mut self, agents: &[AgentHandle], input: Payload) -> AgentResult<RunOutput> {
        match self.mode {
            ExecutionMode::Single => {
                let agent = agents.first().ok_or(AgentError::EmptyAgentSet)?;
                self.run_single(agent, input).await.map(RunOutput::Single)
            }
            ExecutionMode::Loop => {
                let agent = agents.first().ok_or(AgentError::EmptyAgentSet)?;
                Ok(RunOutput::Loop(self.run_loop(agent, input).await))
            }
            ExecutionMode::Parallel => Ok(RunOutput::Parallel(self.run_parallel(agents, input).await)),
        }
    }

    /// Execute the agent once. Failures are recorded, then returned.
    pub async fn run_single(&mut self, agent: &AgentHandle, input: Payload) -> AgentResult<Payload> {
        let timestamp = Utc::now();
        tracing::info!(agent = agent.name(), mode = %ExecutionMode::Single, "executing agent");

        let result = agent.run(input.clone()).await;

        self.record(ExecutionRecord {
            mode: ExecutionMode::Single,
            agent: agent.name().to_string(),
            input,
            outcome: outcome_of(&result),
            timestamp,
            iteration: None,
        });

        result
    }

    /// Execute the agent repeatedly, feeding each output back as the next input.
    ///
    /// Stops after `max_iterations`, right after an iteration whose output
    /// satisfies the stop condition, at the first failure, or when the agent
    /// requests a stop. Results gathered before the stop are returned.
    pub async fn run_loop(&mut self, agent: &AgentHandle, initial_input: Payload) -> Vec<Payload> {
        let mut results = Vec::new();
        let mut current_input = initial_input;

        for iteration in 1..=self.max_iterations {
            let timestamp = Utc::now();
            let result = agent.run(current_input.clone()).await;

            self.record(ExecutionRecord {
                mode: ExecutionMode::Loop,
                agent: agent.name().to_string(),
                input: current_input.clone(),
                outcome: outcome_of(&result),
                timestamp,
                iteration: Some(iteration),
            });

            let output = match result {
                Ok(output) => output,
                Err(AgentError::StopRequested) => {
                    tracing::info!(agent = agent.name(), iteration, "agent requested stop");
                    break;
                }
                Err(e) => {
                    tracing::warn!(agent = agent.name(), iteration, error = %e, "loop iteration failed");
                    break;
                }
            };

            self.metrics.total_iterations += 1;
            results.push(output.clone());

            if self.stop_condition.as_ref().is_some_and(|stop| stop(&output)) {
                tracing::debug!(agent = agent.name(), iteration, "stop condition met");
                break;
            }

            current_input = output;
        }

        results
    }

    /// Execute every agent against the same input on independent tasks.
    ///
    /// The returned slots follow the order of `agents`; a failed or panicked
    /// agent leaves `None` in its slot without affecting its siblings.
    pub async fn run_parallel(&mut self, agents: &[AgentHandle], input: Payload) -> Vec<Option<Payload>> {
        let timestamp = Utc::now();
        tracing::info!(agents = agents.len(), mode = %ExecutionMode::Parallel, "executing agents");

        let outcomes = run_concurrently(agents, &input).await;

        let mut results = Vec::with_capacity(agents.len());
        for (agent, result) in agents.iter().zip(outcomes) {
            self.record(ExecutionRecord {
                mode: ExecutionMode::Parallel,
                agent: agent.name().to_string(),
                input: input.clone(),
                outcome: outcome_of(&result),
                timestamp,
                iteration: None,
            });

            results.push(result.ok());
        }

        results
    }

    /// Snapshot of every call this runner has made
    pub fn get_execution_history(&self) -> Vec<ExecutionRecord> {
        self.execution_history.clone()
    }

    pub fn get_metrics(&self) -> RunnerMetrics {
        self.metrics
    }

    fn record(&mut self, record: ExecutionRecord) {
        self.metrics.total_executions += 1;
        match &record.outcome {
            Outcome::Success { .. } => self.metrics.successful_executions += 1,
            Outcome::Failure { .. } => self.metrics.failed_executions += 1,
            Outcome::Stopped => {}
        }
        self.execution_history.push(record);
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("mode", &self.mode)
            .field("max_iterations", &self.max_iterations)
            .field("has_stop_condition", &self.stop_condition.is_some())
            .field("metrics", &self.metrics)
            .finish()
    }
}

/// Run every agent on its own tokio task and join them in order.
///
/// Panics are already caught by `AgentHandle::run`; a task that still fails
/// to join surfaces as `AgentError::Panicked` in its own slot.
pub(crate) async fn run_concurrently(agents: &[AgentHandle], input: &Payload) -> Vec<AgentResult<Payload>> {
    let tasks: Vec<_> = agents
        .iter()
        .map(|agent| {
            let agent = agent.clone();
            let input = input.clone();
            tokio::spawn(async move { agent.run(input).await })
        })
        .collect();

    let mut results = Vec::with_capacity(tasks.len());
    for task in tasks {
        results.push(match task.await {
            Ok(result) => result,
            Err(e) => Err(AgentError::Panicked(e.to_string())),
        });
    }
    results
}

pub(crate) fn outcome_of(result: &AgentResult<Payload>) -> Outcome {
    match result {
        Ok(output) => Outcome::Success {
            output: output.clone(),
        },
        Err(AgentError::StopRequested) => Outcome::Stopped,
        Err(e) => Outcome::Failure { error: e.to_string() },
    }
}
