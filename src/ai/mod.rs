//! LLM-backed per-file enrichment
//!
//! Talks to any OpenAI-compatible chat-completion endpoint. Credentials are
//! pooled: when one key is rate limited the client rotates to the next and
//! retries until every key has been tried once.
//!
//! # Environment Variables
//!
//! - `AI_API_KEY` / `AI_API_KEYS`: one key or a comma-separated list
//! - `AI_API_URL`: completion endpoint (defaults to Groq)
//! - `AI_MODEL`: model name
//!
//! # Example
//!
//! ```rust,ignore
//! use repoqa::ai::{CredentialPool, ResilientClient, ClientSettings};
//!
//! let pool = CredentialPool::from_values(["key-a,key-b"]);
//! let client = ResilientClient::new(pool, ClientSettings::default());
//! let text = client.complete("You are a reviewer.", "Review this file")?;
//! ```

mod client;
mod credentials;
pub mod normalize;
pub mod prompts;

pub use client::{
    ClientSettings, HttpResponse, Message, ResilientClient, Role, Transport, UreqTransport,
    DEFAULT_API_URL, DEFAULT_MODEL,
};
pub use credentials::CredentialPool;
pub use normalize::{Normalized, ParseDiagnostic};

use thiserror::Error;

/// Errors that can occur in the AI module
#[derive(Error, Debug)]
pub enum AiError {
    #[error("No API credentials configured. Set AI_API_KEY or add api_keys to the [ai] config section")]
    NotConfigured,

    #[error("All {attempts} API credentials are rate limited: {message}")]
    RateLimitExhausted { attempts: usize, message: String },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("API request failed: {0}")]
    Transport(String),

    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type AiResult<T> = Result<T, AiError>;
