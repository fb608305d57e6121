// Runtime configuration
//
// Settings are read once from the environment (a `.env` file is loaded first
// when present) and passed explicitly to the components that need them.

use std::str::FromStr;

use serde::Serialize;

use crate::agents::{AgentError, AgentResult, DEFAULT_MAX_ITERATIONS};
use crate::guardrails::GuardrailMode;

pub const DEFAULT_SWARM_ROUNDS: usize = 5;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment-derived settings.
///
/// Provider keys are optional; agents that call a model look them up here.
/// Keys are never serialized.
#[derive(Clone, Serialize)]
pub struct Settings {
    #[serde(skip)]
    pub openai_api_key: Option<String>,
    #[serde(skip)]
    pub anthropic_api_key: Option<String>,
    #[serde(skip)]
    pub google_api_key: Option<String>,
    pub max_iterations: usize,
    pub swarm_rounds: usize,
    pub guardrail_mode: GuardrailMode,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            anthropic_api_key: None,
            google_api_key: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            swarm_rounds: DEFAULT_SWARM_ROUNDS,
            guardrail_mode: GuardrailMode::Enforce,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl Settings {
    /// Load `.env` (if any) and read settings from the process environment
    pub fn from_env() -> AgentResult<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Blank values count as
    /// unset.
    ///
    /// # Errors
    /// `ConfigError` when a numeric or mode value cannot be parsed
    pub fn from_lookup<F>(lookup: F) -> AgentResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let settings = Self {
            openai_api_key: get("OPENAI_API_KEY"),
            anthropic_api_key: get("ANTHROPIC_API_KEY"),
            google_api_key: get("GOOGLE_API_KEY"),
            max_iterations: match get("AGENT_MAX_ITERATIONS") {
                Some(raw) => parse_count("AGENT_MAX_ITERATIONS", &raw)?,
                None => defaults.max_iterations,
            },
            swarm_rounds: match get("AGENT_SWARM_ROUNDS") {
                Some(raw) => parse_count("AGENT_SWARM_ROUNDS", &raw)?,
                None => defaults.swarm_rounds,
            },
            guardrail_mode: match get("AGENT_GUARDRAIL_MODE") {
                Some(raw) => GuardrailMode::from_str(&raw)?,
                None => defaults.guardrail_mode,
            },
            log_level: get("AGENT_LOG_LEVEL")
                .map(|v| v.trim().to_lowercase())
                .unwrap_or(defaults.log_level),
        };

        tracing::debug!(
            max_iterations = settings.max_iterations,
            swarm_rounds = settings.swarm_rounds,
            guardrail_mode = %settings.guardrail_mode,
            providers = ?settings.available_providers(),
            "settings loaded"
        );

        Ok(settings)
    }

    /// Check that at least one model provider is configured
    pub fn validate(&self) -> AgentResult<()> {
        if self.available_providers().is_empty() {
            return Err(AgentError::ConfigError(
                "no API keys configured; set OPENAI_API_KEY, ANTHROPIC_API_KEY or GOOGLE_API_KEY"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Providers with a key set, in a fixed order
    pub fn available_providers(&self) -> Vec<&'static str> {
        [
            ("openai", &self.openai_api_key),
            ("anthropic", &self.anthropic_api_key),
            ("google", &self.google_api_key),
        ]
        .into_iter()
        .filter(|(_, key)| key.is_some())
        .map(|(provider, _)| provider)
        .collect()
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("providers", &self.available_providers())
            .field("max_iterations", &self.max_iterations)
            .field("swarm_rounds", &self.swarm_rounds)
            .field("guardrail_mode", &self.guardrail_mode)
            .field("log_level", &self.log_level)
            .finish()
    }
}

fn parse_count(key: &str, raw: &str) -> AgentResult<usize> {
    raw.trim()
        .parse::<usize>()
        .map_err(|e| AgentError::ConfigError(format!("{key}: invalid value '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();

        assert_eq!(settings.max_iterations, 10);
        assert_eq!(settings.swarm_rounds, 5);
        assert_eq!(settings.guardrail_mode, GuardrailMode::Enforce);
        assert_eq!(settings.log_level, "info");
        assert!(settings.available_providers().is_empty());
    }

    #[test]
    fn reads_runtime_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            ("AGENT_MAX_ITERATIONS", "3"),
            ("AGENT_SWARM_ROUNDS", " 7 "),
            ("AGENT_GUARDRAIL_MODE", "report"),
            ("AGENT_LOG_LEVEL", "DEBUG"),
        ]))
        .unwrap();

        assert_eq!(settings.max_iterations, 3);
        assert_eq!(settings.swarm_rounds, 7);
        assert_eq!(settings.guardrail_mode, GuardrailMode::Report);
        assert_eq!(settings.log_level, "debug");
    }

    #[test]
    fn invalid_numbers_are_config_errors() {
        let err = Settings::from_lookup(lookup(&[("AGENT_MAX_ITERATIONS", "many")])).unwrap_err();

        assert!(matches!(err, AgentError::ConfigError(ref msg) if msg.contains("AGENT_MAX_ITERATIONS")));
    }

    #[test]
    fn invalid_mode_is_config_error() {
        let err = Settings::from_lookup(lookup(&[("AGENT_GUARDRAIL_MODE", "strict")])).unwrap_err();

        assert!(matches!(err, AgentError::ConfigError(_)));
    }

    #[test]
    fn validate_requires_a_provider() {
        let empty = Settings::from_lookup(lookup(&[("OPENAI_API_KEY", "  ")])).unwrap();
        assert!(empty.validate().is_err());

        let settings = Settings::from_lookup(lookup(&[
            ("ANTHROPIC_API_KEY", "sk-ant"),
            ("GOOGLE_API_KEY", "g-key"),
        ]))
        .unwrap();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.available_providers(), vec!["anthropic", "google"]);
    }

    #[test]
    fn debug_output_hides_keys() {
        let settings = Settings::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-secret")])).unwrap();

        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("openai"));
    }
}
