use serde::{Deserialize, Deserializer};
use std::time::Duration;
use thiserror::Error;

use crate::gate::DEFAULT_POLL_INTERVAL;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8188".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct GateConfig {
    /// How often a paused worker re-checks its abort signal.
    #[serde(
        default = "default_poll_interval",
        deserialize_with = "deserialize_duration"
    )]
    pub poll_interval: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
        }
    }
}

fn default_poll_interval() -> Duration {
    DEFAULT_POLL_INTERVAL
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobsConfig {
    #[serde(default = "default_steps")]
    pub default_steps: usize,
    #[serde(
        default = "default_step_delay",
        deserialize_with = "deserialize_duration"
    )]
    pub step_delay: Duration,
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    #[serde(default = "default_max_size")]
    pub max_size: usize,
    #[serde(default = "default_max_finished_runs")]
    pub max_finished_runs: usize,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            default_steps: default_steps(),
            step_delay: default_step_delay(),
            max_steps: default_max_steps(),
            max_size: default_max_size(),
            max_finished_runs: default_max_finished_runs(),
        }
    }
}

fn default_steps() -> usize {
    20
}

fn default_step_delay() -> Duration {
    Duration::from_millis(250)
}

fn default_max_steps() -> usize {
    10_000
}

fn default_max_size() -> usize {
    1 << 20
}

fn default_max_finished_runs() -> usize {
    64
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        // A zero interval turns the pause wait into a spin on the signal lock.
        if self.gate.poll_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "gate.poll_interval must be greater than zero".into(),
            ));
        }
        if self.jobs.default_steps == 0 || self.jobs.default_steps > self.jobs.max_steps {
            return Err(ConfigError::Invalid(format!(
                "jobs.default_steps must be between 1 and {}",
                self.jobs.max_steps
            )));
        }
        Ok(())
    }
}
