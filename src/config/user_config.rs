//! User-level configuration for repoqa
//!
//! Supports loading config from:
//! - ~/.config/repoqa/config.toml
//! - an explicit `--config` file
//! - Environment variables

use crate::ai::{ClientSettings, CredentialPool};
use crate::orchestrator::OrchestratorSettings;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UserConfig {
    #[serde(default)]
    pub ai: AiConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct AiConfig {
    /// API keys tried in order when one is rate limited
    pub api_keys: Option<Vec<String>>,

    /// Single key, or several separated by commas
    pub api_key: Option<String>,

    /// OpenAI-compatible chat completions endpoint
    pub api_url: Option<String>,

    pub model: Option<String>,

    pub temperature: Option<f64>,

    pub max_tokens: Option<u32>,

    /// Per-request timeout in seconds
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct AnalysisConfig {
    /// Worker threads for per-file AI requests (default: 4)
    pub workers: Option<usize>,

    /// Files longer than this many characters are skipped (default: 50000)
    pub max_file_chars: Option<usize>,

    /// Seconds to wait for in-flight requests on shutdown (default: 60)
    pub shutdown_timeout_secs: Option<u64>,

    /// Honor .gitignore files and skip hidden files (default: false)
    pub respect_ignore_files: Option<bool>,
}

impl UserConfig {
    /// Load config from all sources, with priority:
    /// 1. Environment variables (highest)
    /// 2. Explicit config file
    /// 3. User config (~/.config/repoqa/config.toml)
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = UserConfig::default();

        if let Some(path) = Self::user_config_path().filter(|p| p.exists()) {
            match Self::from_file(&path) {
                Ok(user_config) => config.merge(user_config),
                Err(e) => warn!("Ignoring user config: {:#}", e),
            }
        }

        if let Some(path) = explicit {
            config.merge(Self::from_file(path)?);
        }

        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Parse one TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Get the user config file path
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("repoqa").join("config.toml"))
    }

    /// Environment variables override file values. Keys from the
    /// environment replace file keys entirely.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let single = lookup("AI_API_KEY").filter(|v| !v.trim().is_empty());
        let list = lookup("AI_API_KEYS").filter(|v| !v.trim().is_empty());
        if single.is_some() || list.is_some() {
            self.ai.api_key = single;
            self.ai.api_keys = list.map(|v| vec![v]);
        }
        if let Some(url) = lookup("AI_API_URL").filter(|v| !v.trim().is_empty()) {
            self.ai.api_url = Some(url);
        }
        if let Some(model) = lookup("AI_MODEL").filter(|v| !v.trim().is_empty()) {
            self.ai.model = Some(model);
        }
    }

    /// Merge another config into this one (other takes priority)
    fn merge(&mut self, other: UserConfig) {
        if other.ai.api_keys.is_some() || other.ai.api_key.is_some() {
            self.ai.api_keys = other.ai.api_keys;
            self.ai.api_key = other.ai.api_key;
        }
        if other.ai.api_url.is_some() {
            self.ai.api_url = other.ai.api_url;
        }
        if other.ai.model.is_some() {
            self.ai.model = other.ai.model;
        }
        if other.ai.temperature.is_some() {
            self.ai.temperature = other.ai.temperature;
        }
        if other.ai.max_tokens.is_some() {
            self.ai.max_tokens = other.ai.max_tokens;
        }
        if other.ai.timeout_secs.is_some() {
            self.ai.timeout_secs = other.ai.timeout_secs;
        }
        if other.analysis.workers.is_some() {
            self.analysis.workers = other.analysis.workers;
        }
        if other.analysis.max_file_chars.is_some() {
            self.analysis.max_file_chars = other.analysis.max_file_chars;
        }
        if other.analysis.shutdown_timeout_secs.is_some() {
            self.analysis.shutdown_timeout_secs = other.analysis.shutdown_timeout_secs;
        }
        if other.analysis.respect_ignore_files.is_some() {
            self.analysis.respect_ignore_files = other.analysis.respect_ignore_files;
        }
    }

    /// Build the credential pool from every configured key
    pub fn credential_pool(&self) -> CredentialPool {
        let listed = self.ai.api_keys.iter().flatten().map(String::as_str);
        CredentialPool::from_values(listed.chain(self.ai.api_key.as_deref()))
    }

    pub fn has_ai_key(&self) -> bool {
        !self.credential_pool().is_empty()
    }

    pub fn client_settings(&self) -> ClientSettings {
        let defaults = ClientSettings::default();
        ClientSettings {
            api_url: self.ai.api_url.clone().unwrap_or(defaults.api_url),
            model: self.ai.model.clone().unwrap_or(defaults.model),
            temperature: self.ai.temperature.unwrap_or(defaults.temperature),
            max_tokens: self.ai.max_tokens.unwrap_or(defaults.max_tokens),
            timeout: self
                .ai
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        let defaults = OrchestratorSettings::default();
        OrchestratorSettings {
            workers: self.analysis.workers.unwrap_or(defaults.workers).max(1),
            max_file_chars: self.analysis.max_file_chars.unwrap_or(defaults.max_file_chars),
            shutdown_timeout: self
                .analysis
                .shutdown_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.shutdown_timeout),
        }
    }

    pub fn respect_ignore_files(&self) -> bool {
        self.analysis.respect_ignore_files.unwrap_or(false)
    }

    /// Write the example config to `path` unless a file already exists there
    pub fn write_example(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, EXAMPLE_CONFIG)?;
        Ok(true)
    }
}

const EXAMPLE_CONFIG: &str = r#"# repoqa User Configuration

[ai]
# Keys are tried in order; a rate-limited key hands over to the next one.
# api_keys = ["gsk_first", "gsk_second"]
# api_key = "gsk_first,gsk_second"

# Any OpenAI-compatible chat completions endpoint
# api_url = "https://api.groq.com/openai/v1/chat/completions"
# model = "llama-3.1-8b-instant"
# temperature = 0.3
# max_tokens = 4000
# timeout_secs = 120

[analysis]
# workers = 4
# max_file_chars = 50000
# shutdown_timeout_secs = 60
# respect_ignore_files = false
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = UserConfig::default();
        assert!(!config.has_ai_key());
        let client = config.client_settings();
        assert_eq!(client.api_url, "https://api.groq.com/openai/v1/chat/completions");
        assert_eq!(client.model, "llama-3.1-8b-instant");
        assert_eq!(client.max_tokens, 4000);
        let orch = config.orchestrator_settings();
        assert_eq!(orch.workers, 4);
        assert_eq!(orch.max_file_chars, 50_000);
        assert_eq!(orch.shutdown_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
[ai]
api_keys = ["k1", "k2"]
api_key = "k2, k3"
model = "mixtral"
timeout_secs = 30

[analysis]
workers = 8
max_file_chars = 1000
"#;
        let config: UserConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.credential_pool().len(), 3);
        assert_eq!(config.client_settings().model, "mixtral");
        assert_eq!(config.client_settings().timeout, Duration::from_secs(30));
        assert_eq!(config.orchestrator_settings().workers, 8);
        assert_eq!(config.orchestrator_settings().max_file_chars, 1000);
    }

    #[test]
    fn test_toml_parsing_minimal() {
        let config: UserConfig = toml::from_str("").unwrap();
        assert!(!config.has_ai_key());
    }

    #[test]
    fn test_invalid_explicit_file_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is [[ not valid toml {{{}}}").unwrap();
        let err = UserConfig::from_file(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid config file"));
    }

    #[test]
    fn test_env_overrides_file_keys() {
        let mut config: UserConfig = toml::from_str("[ai]\napi_keys = [\"file-key\"]\n").unwrap();
        let env: HashMap<&str, &str> = [("AI_API_KEYS", "env-a,env-b"), ("AI_MODEL", "llama-3.3")]
            .into_iter()
            .collect();
        config.apply_env(|name| env.get(name).map(|v| v.to_string()));

        let pool = config.credential_pool();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.current(), Some((0, "env-a")));
        assert_eq!(config.client_settings().model, "llama-3.3");
    }

    #[test]
    fn test_blank_env_is_ignored() {
        let mut config: UserConfig = toml::from_str("[ai]\napi_key = \"file-key\"\n").unwrap();
        config.apply_env(|name| (name == "AI_API_KEY").then(|| "  ".to_string()));
        assert_eq!(config.credential_pool().current(), Some((0, "file-key")));
    }

    #[test]
    fn test_merge_preserves_base_when_other_is_none() {
        let mut base: UserConfig = toml::from_str("[ai]\napi_key = \"k\"\n[analysis]\nworkers = 2\n").unwrap();
        base.merge(UserConfig::default());
        assert!(base.has_ai_key());
        assert_eq!(base.orchestrator_settings().workers, 2);
    }

    #[test]
    fn test_write_example_does_not_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("repoqa/config.toml");
        assert!(UserConfig::write_example(&path).unwrap());
        assert!(!UserConfig::write_example(&path).unwrap());
        // The example must itself be valid config
        let parsed = UserConfig::from_file(&path).unwrap();
        assert!(!parsed.has_ai_key());
    }

    #[test]
    fn test_user_config_path() {
        if let Some(p) = UserConfig::user_config_path() {
            assert!(p.ends_with("repoqa/config.toml"));
        }
    }
}
