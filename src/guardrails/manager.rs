use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::guardrail::{Guardrail, GuardrailMetrics};
use crate::agents::{AgentError, AgentResult, Payload};
use crate::config::Settings;

/// How the manager reacts to a failed guardrail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardrailMode {
    /// The first failing guardrail raises, the rest of the list is skipped
    #[default]
    Enforce,
    /// Every guardrail is checked, failures only show in the returned bool
    Report,
}

impl FromStr for GuardrailMode {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "enforce" => Ok(GuardrailMode::Enforce),
            "report" => Ok(GuardrailMode::Report),
            other => Err(AgentError::ConfigError(format!(
                "unknown guardrail mode '{other}' (expected enforce or report)"
            ))),
        }
    }
}

impl std::fmt::Display for GuardrailMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GuardrailMode::Enforce => write!(f, "enforce"),
            GuardrailMode::Report => write!(f, "report"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuardrailManagerMetrics {
    pub mode: GuardrailMode,
    pub total_checks: u64,
    pub total_violations: u64,
    pub input_guardrails: Vec<GuardrailMetrics>,
    pub output_guardrails: Vec<GuardrailMetrics>,
}

/// Ordered input and output guardrail lists sharing one mode and one set of
/// counters.
///
/// `total_checks` counts checks attempted: every call adds the length of the
/// list it validates against, including guardrails that enforce mode skips
/// after a failure. Per-guardrail `checks_performed` only counts checks that
/// actually ran.
#[derive(Debug, Default)]
pub struct GuardrailManager {
    mode: GuardrailMode,
    input_guardrails: Vec<Guardrail>,
    output_guardrails: Vec<Guardrail>,
    total_checks: u64,
    total_violations: u64,
}

impl GuardrailManager {
    pub fn new(mode: GuardrailMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.guardrail_mode)
    }

    pub fn mode(&self) -> GuardrailMode {
        self.mode
    }

    pub fn add_input_guardrail(&mut self, guardrail: Guardrail) {
        self.input_guardrails.push(guardrail);
    }

    pub fn add_output_guardrail(&mut self, guardrail: Guardrail) {
        self.output_guardrails.push(guardrail);
    }

    /// Validate data entering an agent
    ///
    /// # Errors
    /// `GuardrailViolation` from the first failing guardrail, enforce mode only
    pub fn validate_input(&mut self, data: &Payload) -> AgentResult<bool> {
        let mode = self.mode;
        validate(
            &mut self.input_guardrails,
            mode,
            data,
            &mut self.total_checks,
            &mut self.total_violations,
        )
    }

    /// Validate data leaving an agent
    ///
    /// # Errors
    /// `GuardrailViolation` from the first failing guardrail, enforce mode only
    pub fn validate_output(&mut self, data: &Payload) -> AgentResult<bool> {
        let mode = self.mode;
        validate(
            &mut self.output_guardrails,
            mode,
            data,
            &mut self.total_checks,
            &mut self.total_violations,
        )
    }

    pub fn input_guardrails(&self) -> &[Guardrail] {
        &self.input_guardrails
    }

    pub fn output_guardrails(&self) -> &[Guardrail] {
        &self.output_guardrails
    }

    pub fn get_metrics(&self) -> GuardrailManagerMetrics {
        GuardrailManagerMetrics {
            mode: self.mode,
            total_checks: self.total_checks,
            total_violations: self.total_violations,
            input_guardrails: self.input_guardrails.iter().map(Guardrail::get_metrics).collect(),
            output_guardrails: self.output_guardrails.iter().map(Guardrail::get_metrics).collect(),
        }
    }
}

fn validate(
    guardrails: &mut [Guardrail],
    mode: GuardrailMode,
    data: &Payload,
    total_checks: &mut u64,
    total_violations: &mut u64,
) -> AgentResult<bool> {
    let mut all_passed = true;
    *total_checks += guardrails.len() as u64;

    for guardrail in guardrails.iter_mut() {
        match mode {
            GuardrailMode::Enforce => {
                if let Err(violation) = guardrail.enforce(data) {
                    *total_violations += 1;
                    return Err(violation);
                }
            }
            GuardrailMode::Report => {
                if !guardrail.check(data) {
                    *total_violations += 1;
                    all_passed = false;
                }
            }
        }
    }

    Ok(all_passed)
}
