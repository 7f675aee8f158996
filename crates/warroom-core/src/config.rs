//! Session configuration.
//!
//! Loaded from YAML (or built in code) with serde defaults, so an empty
//! config file yields a fully working session. The introduction order doubles
//! as the roster-completion threshold: the introduction phase ends when every
//! participant in the list has introduced itself.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use warroom_proto::ParticipantId;

/// Errors that can occur while loading or validating a session config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Configuration for a single session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Agents that must introduce themselves, in speaking order. This list is
    /// the completion threshold for the introduction phase.
    pub introduction_order: Vec<ParticipantId>,

    /// Grace period in seconds before a pending question expires. `None`
    /// disables expiry. Expiry is cooperative: it is checked on the next
    /// submit/answer and on explicit sweeps, never at wall-clock precision.
    pub question_timeout_secs: Option<u64>,

    /// Capacity of the live delivery channel. A subscriber that falls more
    /// than this many messages behind is dropped and must reconnect with its
    /// cursor.
    pub delivery_buffer: usize,

    /// Optional append-only JSONL transcript file backing the message store.
    pub transcript_path: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            introduction_order: ParticipantId::AGENTS.to_vec(),
            question_timeout_secs: Some(300),
            delivery_buffer: 256,
            transcript_path: None,
        }
    }
}

impl SessionConfig {
    /// Parses a config from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a config from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Checks the introduction order for non-agents and duplicates.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, id) in self.introduction_order.iter().enumerate() {
            if !id.is_agent() {
                return Err(ConfigError::Invalid(format!(
                    "{id} cannot appear in introduction_order"
                )));
            }
            if self.introduction_order[..i].contains(id) {
                return Err(ConfigError::Invalid(format!(
                    "{id} listed twice in introduction_order"
                )));
            }
        }
        if self.delivery_buffer == 0 {
            return Err(ConfigError::Invalid(
                "delivery_buffer must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Question expiry grace period, if enabled.
    pub fn question_timeout(&self) -> Option<chrono::Duration> {
        self.question_timeout_secs
            .map(|secs| chrono::Duration::seconds(secs as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_introduces_all_five_agents() {
        let config = SessionConfig::default();
        assert_eq!(config.introduction_order, ParticipantId::AGENTS.to_vec());
        assert!(config.question_timeout().is_some());
    }

    #[test]
    fn test_empty_yaml_is_valid() {
        let config = SessionConfig::from_yaml("{}").unwrap();
        assert_eq!(config.introduction_order.len(), 5);
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let yaml = r"
introduction_order: [market, strategy, risk, executor]
question_timeout_secs: 60
";
        let config = SessionConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.introduction_order.len(), 4);
        assert!(!config.introduction_order.contains(&ParticipantId::Explainer));
        assert_eq!(config.question_timeout_secs, Some(60));
        // Defaults survive for unspecified fields
        assert_eq!(config.delivery_buffer, 256);
    }

    #[test]
    fn test_user_in_order_rejected() {
        let yaml = "introduction_order: [market, user]";
        assert!(matches!(
            SessionConfig::from_yaml(yaml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_duplicate_in_order_rejected() {
        let yaml = "introduction_order: [market, market]";
        assert!(matches!(
            SessionConfig::from_yaml(yaml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_timeout_disabled() {
        let yaml = "question_timeout_secs: null";
        let config = SessionConfig::from_yaml(yaml).unwrap();
        assert!(config.question_timeout().is_none());
    }
}
