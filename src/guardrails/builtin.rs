//! Pre-built guardrails

use super::guardrail::{render, Guardrail, GuardrailKind};
use crate::agents::Payload;

/// Rejects data whose text form is longer than `max_length` characters
pub fn length_guardrail(name: impl Into<String>, max_length: usize, kind: GuardrailKind) -> Guardrail {
    Guardrail::new(name, kind, move |data| render(data).chars().count() <= max_length)
        .with_error_message(format!("Data exceeds maximum length of {max_length}"))
}

/// Rejects data containing any of `blocked_words`, ignoring case
pub fn content_filter_guardrail<I, S>(name: impl Into<String>, blocked_words: I) -> Guardrail
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let blocked: Vec<String> = blocked_words
        .into_iter()
        .map(|w| w.as_ref().to_lowercase())
        .collect();

    Guardrail::new(name, GuardrailKind::ContentFilter, move |data| {
        let text = render(data).to_lowercase();
        !blocked.iter().any(|word| text.contains(word.as_str()))
    })
    .with_error_message("Content contains blocked words")
}

/// Objects carrying a `"format"` key must name one of `allowed_formats`;
/// anything else passes
pub fn format_guardrail<I, S>(name: impl Into<String>, allowed_formats: I) -> Guardrail
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let allowed: Vec<String> = allowed_formats.into_iter().map(Into::into).collect();
    let message = format!("Format must be one of: {}", allowed.join(", "));

    Guardrail::new(name, GuardrailKind::InputValidation, move |data| {
        match data.get("format") {
            Some(Payload::String(format)) => allowed.iter().any(|a| a == format),
            Some(_) => false,
            None => true,
        }
    })
    .with_error_message(message)
}

/// Custom policy check
pub fn policy_guardrail<F>(name: impl Into<String>, policy: F, description: &str) -> Guardrail
where
    F: Fn(&Payload) -> bool + Send + Sync + 'static,
{
    Guardrail::new(name, GuardrailKind::PolicyEnforcement, policy)
        .with_error_message(format!("Policy violation: {description}"))
}
