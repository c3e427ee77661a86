//! Configuration types and loading.
//!
//! Config is stored as TOML (e.g. `~/.mira/config/config.toml`). The types
//! double as the settings-form schema: both implement
//! [`FormSchema`](crate::schema::FormSchema), and `@ui[...]` directives in
//! the field descriptions drive control generation.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::schema::{FieldSpec, FormSchema, ScalarKind, ScalarValue};

/// Model sampling parameters, grouped into their own settings section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// TopK sampling cutoff (some model adapters ignore this).
    #[serde(default = "default_top_k")]
    pub top_k: i64,

    /// Nucleus sampling threshold.
    #[serde(default = "default_top_p")]
    pub top_p: f64,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Stream the response character by character.
    #[serde(default)]
    pub stream: bool,

    /// Accept multimodal input (e.g. images).
    #[serde(default)]
    pub multimodal: bool,
}

fn default_top_k() -> i64 {
    50
}

fn default_top_p() -> f64 {
    0.8
}

fn default_temperature() -> f64 {
    0.6
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            top_p: default_top_p(),
            temperature: default_temperature(),
            stream: false,
            multimodal: false,
        }
    }
}

impl FormSchema for ModelConfig {
    fn schema_name() -> &'static str {
        "ModelConfig"
    }

    fn schema_title() -> Option<&'static str> {
        Some("Model")
    }

    fn fields(&self) -> Vec<FieldSpec> {
        vec![
            FieldSpec::scalar(
                "top_k",
                "TopK (some model adapters may not support this parameter)",
                ScalarValue::Int(self.top_k),
            ),
            FieldSpec::scalar("top_p", "@ui[slider,0,1]TopP", ScalarValue::Float(self.top_p)),
            FieldSpec::scalar(
                "temperature",
                "@ui[slider,0,1]Temperature",
                ScalarValue::Float(self.temperature),
            ),
            FieldSpec::scalar(
                "stream",
                "Whether to stream the response (output by character)",
                ScalarValue::Bool(self.stream),
            ),
            FieldSpec::scalar(
                "multimodal",
                "Whether to accept multimodal input (e.g. image recognition)",
                ScalarValue::Bool(self.multimodal),
            ),
        ]
    }
}

/// Top-level application config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Model sampling parameters. Serialized under the schema name so the
    /// settings read-back map validates without remapping.
    #[serde(default, rename = "ModelConfig")]
    pub model: ModelConfig,

    /// API key for the model provider.
    #[serde(default)]
    pub api_key: String,

    /// Use minimal context (system prompt + last user message) instead of
    /// the full message list.
    #[serde(default = "default_true")]
    pub use_minimal_context: bool,

    /// Tool calling mode: "agent", "rag", or "none".
    #[serde(default = "default_tool_calling_mode")]
    pub tool_calling_mode: String,

    /// Tool call limit per turn in agent mode.
    #[serde(default = "default_tool_call_limit")]
    pub agent_tool_call_limit: i64,

    /// Maximum number of messages kept in the memory context.
    #[serde(default = "default_memory_length_limit")]
    pub memory_length_limit: i64,

    /// Maximum tokens generated per response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: i64,

    /// API request timeout in seconds.
    #[serde(default = "default_llm_timeout")]
    pub llm_timeout: i64,

    /// Summarize and truncate old context into the system instruction.
    #[serde(default = "default_true")]
    pub enable_memory_abstract: bool,

    /// Share of the context replaced by the summary.
    #[serde(default = "default_abstract_proportion")]
    pub memory_abstract_proportion: f64,

    /// MCP server scripts to launch.
    #[serde(default)]
    pub mcp_server_scripts: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_tool_calling_mode() -> String {
    "agent".to_string()
}

fn default_tool_call_limit() -> i64 {
    20
}

fn default_memory_length_limit() -> i64 {
    50
}

fn default_max_tokens() -> i64 {
    100
}

fn default_llm_timeout() -> i64 {
    60
}

fn default_abstract_proportion() -> f64 {
    0.15
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            api_key: String::new(),
            use_minimal_context: default_true(),
            tool_calling_mode: default_tool_calling_mode(),
            agent_tool_call_limit: default_tool_call_limit(),
            memory_length_limit: default_memory_length_limit(),
            max_tokens: default_max_tokens(),
            llm_timeout: default_llm_timeout(),
            enable_memory_abstract: default_true(),
            memory_abstract_proportion: default_abstract_proportion(),
            mcp_server_scripts: Vec::new(),
        }
    }
}

impl FormSchema for AgentConfig {
    fn schema_name() -> &'static str {
        "AgentConfig"
    }

    fn fields(&self) -> Vec<FieldSpec> {
        vec![
            FieldSpec::nested(&self.model),
            FieldSpec::scalar(
                "api_key",
                "Model provider API key (password, stored in the local config file)",
                ScalarValue::Text(self.api_key.clone()),
            )
            .with_title("API key"),
            FieldSpec::scalar(
                "use_minimal_context",
                "Use minimal context (system prompt + last user message); \
                 disabling sends the full message list and may use far more tokens",
                ScalarValue::Bool(self.use_minimal_context),
            ),
            FieldSpec::scalar(
                "tool_calling_mode",
                "Tool calling mode: agent, rag, or none",
                ScalarValue::Text(self.tool_calling_mode.clone()),
            ),
            FieldSpec::scalar(
                "agent_tool_call_limit",
                "Tool call limit per turn in agent mode",
                ScalarValue::Int(self.agent_tool_call_limit),
            ),
            FieldSpec::scalar(
                "memory_length_limit",
                "Maximum number of messages in the memory context",
                ScalarValue::Int(self.memory_length_limit),
            ),
            FieldSpec::scalar(
                "max_tokens",
                "Maximum number of tokens generated in a single response",
                ScalarValue::Int(self.max_tokens),
            ),
            FieldSpec::scalar(
                "llm_timeout",
                "API request timeout duration (seconds)",
                ScalarValue::Int(self.llm_timeout),
            ),
            FieldSpec::scalar(
                "enable_memory_abstract",
                "Summarize old context into the system instruction",
                ScalarValue::Bool(self.enable_memory_abstract),
            ),
            FieldSpec::scalar(
                "memory_abstract_proportion",
                "@ui[slider,0,1]Context summarization proportion (0.15 = 15%)",
                ScalarValue::Float(self.memory_abstract_proportion),
            ),
            FieldSpec::list(
                "mcp_server_scripts",
                "List of MCP server scripts",
                ScalarKind::Text,
                self.mcp_server_scripts
                    .iter()
                    .cloned()
                    .map(ScalarValue::Text)
                    .collect(),
            ),
        ]
    }
}

/// Resolve config path from env or default (~/.mira/config/config.toml).
pub fn default_config_path() -> PathBuf {
    std::env::var("MIRA_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".mira").join("config").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    })
}

/// Resolve the session storage directory from env or default
/// (~/.mira/data/sessions).
pub fn default_sessions_dir() -> PathBuf {
    std::env::var("MIRA_DATA_DIR")
        .map(|d| PathBuf::from(d).join("sessions"))
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".mira").join("data").join("sessions"))
                .unwrap_or_else(|| PathBuf::from("sessions"))
        })
}

/// Load config from the default path (or MIRA_CONFIG_PATH). Missing file =>
/// default config. Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(AgentConfig, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        AgentConfig::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        toml::from_str(&s).with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

/// Write the config to disk, creating parent directories as needed.
pub fn save_config(config: &AgentConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating config directory {}", parent.display()))?;
    }
    let s = toml::to_string_pretty(config).context("serializing config")?;
    std::fs::write(path, s).with_context(|| format!("writing config to {}", path.display()))?;
    log::info!("saved config to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_field_default_fns() {
        let c = AgentConfig::default();
        assert_eq!(c.model.top_k, 50);
        assert_eq!(c.model.temperature, 0.6);
        assert_eq!(c.tool_calling_mode, "agent");
        assert!(c.use_minimal_context);
        assert_eq!(c.memory_abstract_proportion, 0.15);
    }

    #[test]
    fn toml_roundtrip() {
        let mut c = AgentConfig::default();
        c.api_key = "k".to_string();
        c.model.temperature = 0.2;
        c.mcp_server_scripts = vec!["srv.py".to_string()];
        let s = toml::to_string_pretty(&c).expect("serialize");
        let back: AgentConfig = toml::from_str(&s).expect("parse");
        assert_eq!(back, c);
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let c: AgentConfig = toml::from_str("").expect("parse");
        assert_eq!(c, AgentConfig::default());
    }

    #[test]
    fn nested_model_section_uses_schema_name() {
        let s = toml::to_string_pretty(&AgentConfig::default()).expect("serialize");
        assert!(s.contains("[ModelConfig]"), "{s}");
    }
}
