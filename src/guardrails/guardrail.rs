use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agents::{AgentError, AgentResult, Payload};

/// Longest data preview kept in a violation record
const PREVIEW_CHARS: usize = 100;

/// Predicate behind a guardrail; `Err` means the check itself broke
pub type CheckFn = Box<dyn Fn(&Payload) -> Result<bool, String> + Send + Sync>;

/// Kinds of guardrails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardrailKind {
    InputValidation,
    OutputValidation,
    ContentFilter,
    PolicyEnforcement,
}

impl std::fmt::Display for GuardrailKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GuardrailKind::InputValidation => write!(f, "input_validation"),
            GuardrailKind::OutputValidation => write!(f, "output_validation"),
            GuardrailKind::ContentFilter => write!(f, "content_filter"),
            GuardrailKind::PolicyEnforcement => write!(f, "policy_enforcement"),
        }
    }
}

/// One failed check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub timestamp: DateTime<Utc>,
    /// Rendered data, cut to the first 100 characters
    pub data: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuardrailMetrics {
    pub name: String,
    pub kind: GuardrailKind,
    pub checks_performed: u64,
    pub violations: usize,
    pub violation_rate: f64,
}

/// Named, predicate-backed check applied to data crossing a validation
/// boundary.
///
/// # Invariants
/// - Every call to `check` increments `checks_performed`
/// - Every failed check appends exactly one violation, so
///   `checks_performed >= violations` always holds
pub struct Guardrail {
    name: String,
    kind: GuardrailKind,
    check: CheckFn,
    error_message: String,
    violations: Vec<Violation>,
    checks_performed: u64,
}

impl Guardrail {
    /// Guardrail from an infallible predicate
    pub fn new<F>(name: impl Into<String>, kind: GuardrailKind, check: F) -> Self
    where
        F: Fn(&Payload) -> bool + Send + Sync + 'static,
    {
        Self::fallible(name, kind, move |data| Ok(check(data)))
    }

    /// Guardrail from a predicate that may fail on its own
    pub fn fallible<F>(name: impl Into<String>, kind: GuardrailKind, check: F) -> Self
    where
        F: Fn(&Payload) -> Result<bool, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind,
            check: Box::new(check),
            error_message: "Guardrail violation".to_string(),
            violations: Vec::new(),
            checks_performed: 0,
        }
    }

    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = message.into();
        self
    }

    /// Check `data`; never fails.
    ///
    /// A predicate error counts as a failed check and is logged as a
    /// violation carrying the error text.
    pub fn check(&mut self, data: &Payload) -> bool {
        self.checks_performed += 1;

        let (passed, message) = match (self.check)(data) {
            Ok(true) => (true, None),
            Ok(false) => (false, Some(self.error_message.clone())),
            Err(e) => (false, Some(format!("Check failed: {e}"))),
        };

        if let Some(message) = message {
            tracing::warn!(guardrail = %self.name, kind = %self.kind, %message, "guardrail violation");
            self.violations.push(Violation {
                timestamp: Utc::now(),
                data: preview(data),
                message,
            });
        }

        passed
    }

    /// Check `data`, turning a failure into `AgentError::GuardrailViolation`
    pub fn enforce(&mut self, data: &Payload) -> AgentResult<()> {
        if self.check(data) {
            return Ok(());
        }

        Err(AgentError::GuardrailViolation {
            guardrail: self.name.clone(),
            kind: self.kind.to_string(),
            message: self.error_message.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> GuardrailKind {
        self.kind
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    pub fn checks_performed(&self) -> u64 {
        self.checks_performed
    }

    /// Snapshot of the violation log
    pub fn get_violations(&self) -> Vec<Violation> {
        self.violations.clone()
    }

    pub fn get_metrics(&self) -> GuardrailMetrics {
        let violations = self.violations.len();
        GuardrailMetrics {
            name: self.name.clone(),
            kind: self.kind,
            checks_performed: self.checks_performed,
            violations,
            violation_rate: if self.checks_performed > 0 {
                violations as f64 / self.checks_performed as f64
            } else {
                0.0
            },
        }
    }
}

impl std::fmt::Debug for Guardrail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Guardrail")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("checks_performed", &self.checks_performed)
            .field("violations", &self.violations.len())
            .finish()
    }
}

/// Text form of a payload: strings render bare, everything else as JSON
pub(crate) fn render(data: &Payload) -> String {
    match data {
        Payload::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn preview(data: &Payload) -> String {
    render(data).chars().take(PREVIEW_CHARS).collect()
}
