use super::agent::AgentHandle;
use super::errors::{AgentError, AgentResult};
use super::types::Payload;
use crate::guardrails::GuardrailManager;
use crate::trace::{Span, SpanId, SpanKind, SpanStatus, Tracer};

/// Agent wrapped with guardrails and a tracer.
///
/// Each run opens an `agent_execution` span with one `validation` child
/// span per guardrail pass. In report mode a failed pass still surfaces as
/// `AgentError::Rejected`, since the data cannot be used either way.
#[derive(Debug)]
pub struct GuardedAgent {
    agent: AgentHandle,
    guardrails: GuardrailManager,
    tracer: Tracer,
}

impl GuardedAgent {
    pub fn new(agent: AgentHandle, guardrails: GuardrailManager) -> Self {
        let tracer = Tracer::new(format!("{}_tracer", agent.name()));
        Self {
            agent,
            guardrails,
            tracer,
        }
    }

    pub fn with_tracer(mut self, tracer: Tracer) -> Self {
        self.tracer = tracer;
        self
    }

    pub fn agent(&self) -> &AgentHandle {
        &self.agent
    }

    pub fn guardrails(&self) -> &GuardrailManager {
        &self.guardrails
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    /// Validate input, run the agent, validate its output.
    ///
    /// # Errors
    /// - `GuardrailViolation` in enforce mode
    /// - `Rejected` in report mode
    /// - any error from the agent itself
    pub async fn run(&mut self, input: Payload) -> AgentResult<Payload> {
        let span = self.tracer.start_span(
            &format!("{}.run", self.agent.name()),
            SpanKind::AgentExecution,
            None,
        );
        if let Some(s) = self.tracer.span_mut(span) {
            s.set_metadata("agent", Payload::from(self.agent.name()));
        }

        let result = self.run_in_span(span, input).await;

        let status = match &result {
            Ok(_) => SpanStatus::Success,
            Err(e) => {
                if let Some(s) = self.tracer.span_mut(span) {
                    s.log_error(e.to_string());
                }
                SpanStatus::Failed
            }
        };
        self.tracer.end_span(span, status);

        result
    }

    async fn run_in_span(&mut self, span: SpanId, input: Payload) -> AgentResult<Payload> {
        let guardrails = &mut self.guardrails;
        let accepted = self
            .tracer
            .in_span("validate_input", SpanKind::Validation, Some(span), |_: &mut Span| {
                guardrails.validate_input(&input)
            })?;
        if !accepted {
            return Err(AgentError::Rejected(format!(
                "input to '{}' failed validation",
                self.agent.name()
            )));
        }

        let output = self.agent.run(input).await?;

        let guardrails = &mut self.guardrails;
        let accepted = self
            .tracer
            .in_span("validate_output", SpanKind::Validation, Some(span), |_: &mut Span| {
                guardrails.validate_output(&output)
            })?;
        if !accepted {
            return Err(AgentError::Rejected(format!(
                "output of '{}' failed validation",
                self.agent.name()
            )));
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::FnAgent;
    use crate::guardrails::{content_filter_guardrail, length_guardrail, GuardrailKind, GuardrailMode};
    use serde_json::json;

    fn shouter() -> AgentHandle {
        FnAgent::new("shouter")
            .on_act(|v| Ok(json!(v.as_str().unwrap_or_default().to_uppercase())))
            .into_handle()
    }

    fn guarded(mode: GuardrailMode) -> GuardedAgent {
        let mut guardrails = GuardrailManager::new(mode);
        guardrails.add_input_guardrail(content_filter_guardrail("blocklist", ["spam"]));
        guardrails.add_output_guardrail(length_guardrail("short_output", 5, GuardrailKind::OutputValidation));
        GuardedAgent::new(shouter(), guardrails)
    }

    #[tokio::test]
    async fn clean_run_passes_both_checks() {
        let mut agent = guarded(GuardrailMode::Enforce);

        let out = agent.run(json!("hi")).await.unwrap();

        assert_eq!(out, json!("HI"));
        let trace = agent.tracer().get_trace();
        assert_eq!(trace.len(), 3);
        assert_eq!(trace[0].kind(), SpanKind::AgentExecution);
        assert_eq!(trace[1].parent_id(), Some(trace[0].id()));
        assert!(trace.iter().all(|s| s.status() == SpanStatus::Success));
    }

    #[tokio::test]
    async fn enforce_mode_blocks_input_before_agent_runs() {
        let mut agent = guarded(GuardrailMode::Enforce);

        let err = agent.run(json!("buy spam")).await.unwrap_err();

        assert!(matches!(err, AgentError::GuardrailViolation { .. }));
        assert_eq!(agent.agent().get_metrics().await.total_requests, 0);
        assert_eq!(agent.tracer().get_trace()[0].status(), SpanStatus::Failed);
    }

    #[tokio::test]
    async fn report_mode_rejects_output() {
        let mut agent = guarded(GuardrailMode::Report);

        let err = agent.run(json!("far too long")).await.unwrap_err();

        assert!(matches!(err, AgentError::Rejected(_)));
        assert_eq!(agent.agent().get_metrics().await.total_requests, 1);
        assert_eq!(agent.guardrails().get_metrics().total_violations, 1);
        let trace = agent.tracer().get_trace();
        assert_eq!(trace[0].status(), SpanStatus::Failed);
        assert_eq!(trace.last().unwrap().status(), SpanStatus::Success);
    }
}
