//! Configuration module for repoqa
//!
//! Layered TOML + environment configuration for the AI client and the
//! analysis engine. See [`UserConfig::load`] for precedence.

mod user_config;

pub use user_config::{AiConfig, AnalysisConfig, UserConfig};
