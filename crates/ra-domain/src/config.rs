//! Runtime configuration, loaded from environment variables with sane
//! defaults. Mirrors the teacher's pattern of one `#[serde(default)]`
//! struct per concern, aggregated into a single top-level `Config`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_string_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_factor: 2.0,
            jitter: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryBackend {
    File,
    Chroma,
    Graphiti,
    None,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        MemoryBackend::File
    }
}

impl std::str::FromStr for MemoryBackend {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, ()> {
        match s.to_ascii_lowercase().as_str() {
            "file" => Ok(MemoryBackend::File),
            "chroma" => Ok(MemoryBackend::Chroma),
            "graphiti" => Ok(MemoryBackend::Graphiti),
            "none" => Ok(MemoryBackend::None),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum McpTransportKind {
    Sse,
    Stdio,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct McpServerConfig {
    pub enabled: bool,
    pub url: Option<String>,
    pub transport: McpTransportKind,
    pub command: Option<String>,
    pub args: Vec<String>,
}

impl Default for McpServerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: None,
            transport: McpTransportKind::Stdio,
            command: None,
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub backend: MemoryBackend,
    pub mcp_enabled: bool,
    pub server: McpServerConfig,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: env_or("MCP_MEMORY_BACKEND", MemoryBackend::File),
            mcp_enabled: env_or("MCP_ENABLED", false),
            server: McpServerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub model: String,
    pub summarizer_model: Option<String>,
    pub max_tokens: u32,
    pub max_messages: usize,
    pub max_tool_loops: usize,
    pub sub_conversation_threshold_tokens: usize,
    pub system_prompt: String,
    pub provider_timeout: Duration,
    pub memory_retrieve_limit: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: env_string_or("MODEL", "claude-sonnet-4"),
            summarizer_model: std::env::var("SUMMARIZER_MODEL").ok(),
            max_tokens: env_or("MAX_TOKENS", 4096),
            max_messages: env_or("MAX_MESSAGES", 6),
            max_tool_loops: 10,
            sub_conversation_threshold_tokens: env_or("SUB_CONV_THRESHOLD_TOKENS", 6000),
            system_prompt: env_string_or(
                "SYSTEM_PROMPT",
                "You are a release-readiness investigation agent. Gather evidence with the \
                 available tools and produce a verdict of ready, not_ready, or borderline with \
                 a justification grounded in the evidence you collected.",
            ),
            provider_timeout: Duration::from_secs(60),
            memory_retrieve_limit: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub conversations_dir: String,
    pub traces_dir: String,
    pub memory_dir: String,
    pub baselines_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            conversations_dir: env_string_or("CONVERSATIONS_DIR", "./data/conversations"),
            traces_dir: env_string_or("TRACES_DIR", "./data/traces"),
            memory_dir: env_string_or("MEMORY_DIR", "./data/memory"),
            baselines_dir: env_string_or("BASELINES_DIR", "./data/baselines"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    pub weights: EvalWeights,
    pub pass_threshold: f64,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            weights: EvalWeights::default(),
            pass_threshold: 0.7,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalWeights {
    pub feature_identification: f64,
    pub tool_usage: f64,
    pub decision_quality: f64,
    pub context_management: f64,
}

impl Default for EvalWeights {
    fn default() -> Self {
        Self {
            feature_identification: 0.2,
            tool_usage: 0.3,
            decision_quality: 0.4,
            context_management: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub agent: AgentConfig,
    pub retry: RetryConfig,
    pub memory: MemoryConfig,
    pub storage: StorageConfig,
    pub eval: EvalConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: ConfigSeverity,
    pub message: String,
}

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Validates cross-field invariants that a single field's `Default`
    /// can't express.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        if self.agent.max_tool_loops == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                message: "agent.max_tool_loops must be greater than zero".to_string(),
            });
        }
        if self.agent.sub_conversation_threshold_tokens == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                message: "agent.sub_conversation_threshold_tokens is zero; every tool result will be summarized".to_string(),
            });
        }
        let weight_sum = self.eval.weights.feature_identification
            + self.eval.weights.tool_usage
            + self.eval.weights.decision_quality
            + self.eval.weights.context_management;
        if (weight_sum - 1.0).abs() > 1e-6 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                message: format!("eval weights sum to {weight_sum}, not 1.0"),
            });
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_retry_config_matches_spec_defaults() {
        let cfg = RetryConfig::default();
        assert_eq!(cfg.max_attempts, 3);
        assert_eq!(cfg.initial_delay, Duration::from_secs(1));
        assert_eq!(cfg.max_delay, Duration::from_secs(60));
        assert_eq!(cfg.backoff_factor, 2.0);
        assert!(cfg.jitter);
    }

    #[test]
    fn validate_flags_zero_tool_loops() {
        let mut cfg = Config::default();
        cfg.agent.max_tool_loops = 0;
        let issues = cfg.validate();
        assert!(issues.iter().any(|i| i.severity == ConfigSeverity::Error));
    }
}
