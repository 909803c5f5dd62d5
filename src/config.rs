//! Driver configuration.
//!
//! Loads, validates, and resolves the optional JSON config that carries the
//! interpreter, the tool-script root, and per-stage tunables. Defaults
//! reproduce the stock Agentless command lines.
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Environment variable consulted when neither `--python` nor the config
/// names an interpreter.
pub const PYTHON_ENV_VAR: &str = "AGENTLESS_PYTHON";

const DEFAULT_PYTHON: &str = "python";
const CONFIG_DIR_NAME: &str = "agentless-batch";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DriverConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// Interpreter command, parsed with shell-words (e.g. `uv run python`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python: Option<String>,
    /// Directory the `agentless/...` script paths resolve against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools_root: Option<PathBuf>,
    #[serde(default)]
    pub localize: LocalizeSettings,
    #[serde(default)]
    pub merge: MergeSettings,
    #[serde(default)]
    pub repair: RepairSettings,
    #[serde(default)]
    pub rerank: RerankSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocalizeSettings {
    pub top_n: u32,
    pub context_window: u32,
    pub temperature: f64,
    pub num_samples: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeSettings {
    pub num_samples: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepairSettings {
    pub top_n: u32,
    pub context_window: u32,
    pub max_samples: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RerankSettings {
    pub num_samples: u32,
}

impl Default for LocalizeSettings {
    fn default() -> Self {
        Self {
            top_n: 3,
            context_window: 10,
            temperature: 0.8,
            num_samples: 4,
        }
    }
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self { num_samples: 4 }
    }
}

impl Default for RepairSettings {
    fn default() -> Self {
        Self {
            top_n: 3,
            context_window: 10,
            max_samples: 10,
        }
    }
}

impl Default for RerankSettings {
    fn default() -> Self {
        Self { num_samples: 20 }
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            schema_version: CONFIG_SCHEMA_VERSION,
            python: None,
            tools_root: None,
            localize: LocalizeSettings::default(),
            merge: MergeSettings::default(),
            repair: RepairSettings::default(),
            rerank: RerankSettings::default(),
        }
    }
}

fn default_schema_version() -> u32 {
    CONFIG_SCHEMA_VERSION
}

/// Config after interpreter resolution; this is what the pipeline consumes.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Interpreter argv (program first).
    pub python: Vec<String>,
    pub tools_root: Option<PathBuf>,
    pub localize: LocalizeSettings,
    pub merge: MergeSettings,
    pub repair: RepairSettings,
    pub rerank: RerankSettings,
}

/// Load a config from disk.
pub fn load_config(path: &Path) -> Result<DriverConfig> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: DriverConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    Ok(config)
}

/// Return the per-user config path, when the platform has a config dir.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Load `--config` if given, else the per-user config if present, else defaults.
pub fn load_effective_config(explicit: Option<&Path>) -> Result<DriverConfig> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    match user_config_path() {
        Some(path) if path.is_file() => {
            tracing::debug!(path = %path.display(), "using user config");
            load_config(&path)
        }
        _ => Ok(DriverConfig::default()),
    }
}

/// Validate schema version and stage tunables.
pub fn validate_config(config: &DriverConfig) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported config schema_version {}",
            config.schema_version
        ));
    }
    if let Some(python) = config.python.as_deref() {
        if python.trim().is_empty() {
            return Err(anyhow!("python must be non-empty when set"));
        }
    }
    let temperature = config.localize.temperature;
    if !temperature.is_finite() || temperature < 0.0 {
        return Err(anyhow!(
            "localize.temperature must be a non-negative number (got {temperature})"
        ));
    }
    let counts = [
        ("localize.num_samples", config.localize.num_samples),
        ("localize.top_n", config.localize.top_n),
        ("merge.num_samples", config.merge.num_samples),
        ("repair.top_n", config.repair.top_n),
        ("repair.max_samples", config.repair.max_samples),
        ("rerank.num_samples", config.rerank.num_samples),
    ];
    for (label, value) in counts {
        if value == 0 {
            return Err(anyhow!("{label} must be at least 1"));
        }
    }
    Ok(())
}

/// Pick the interpreter command in priority order: CLI flag, config, env var.
/// A blank source counts as unset and falls through to the next one.
pub fn resolve_python_command(cli: Option<&str>, config: &DriverConfig) -> String {
    non_blank(cli.map(str::to_string))
        .or_else(|| non_blank(config.python.clone()))
        .or_else(|| non_blank(std::env::var(PYTHON_ENV_VAR).ok()))
        .unwrap_or_else(|| DEFAULT_PYTHON.to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

/// Validate the config and resolve the interpreter into an argv prefix.
pub fn resolve_config(
    config: DriverConfig,
    python_override: Option<&str>,
) -> Result<ResolvedConfig> {
    validate_config(&config)?;
    let command = resolve_python_command(python_override, &config);
    let python = shell_words::split(&command)
        .with_context(|| format!("parse python command: {command}"))?;
    if python.is_empty() {
        return Err(anyhow!("python command is empty"));
    }
    if which::which(&python[0]).is_err() {
        tracing::warn!(
            program = %python[0],
            "interpreter not found on PATH; every stage will fail"
        );
    }
    Ok(ResolvedConfig {
        python,
        tools_root: config.tools_root,
        localize: config.localize,
        merge: config.merge,
        repair: config.repair,
        rerank: config.rerank,
    })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
