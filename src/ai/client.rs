//! Chat-completion client with credential rotation
//!
//! Uses ureq (sync HTTP), no async runtime needed. The HTTP call sits behind
//! the [`Transport`] trait so the retry logic can be exercised without a
//! network.

use crate::ai::{AiError, AiResult, CredentialPool};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

const RATE_LIMIT_MARKERS: &[&str] = &[
    "rate limit",
    "rate_limit",
    "quota",
    "429",
    "too many requests",
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Raw HTTP outcome handed back by a [`Transport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// One POST of a JSON body with bearer auth.
///
/// `Err` is reserved for failures where no HTTP status was received
/// (DNS, connect, timeout). Non-2xx responses are `Ok`.
pub trait Transport: Send + Sync {
    fn post_json(&self, url: &str, bearer: &str, body: &Value) -> Result<HttpResponse, String>;
}

/// Production transport backed by a ureq agent
pub struct UreqTransport {
    agent: ureq::Agent,
}

fn make_agent(timeout: Duration) -> ureq::Agent {
    ureq::config::Config::builder()
        .http_status_as_error(false) // status codes are classified by the client
        .timeout_global(Some(timeout))
        .build()
        .new_agent()
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: make_agent(timeout),
        }
    }
}

impl Transport for UreqTransport {
    fn post_json(&self, url: &str, bearer: &str, body: &Value) -> Result<HttpResponse, String> {
        let response = self
            .agent
            .post(url)
            .header("Content-Type", "application/json")
            .header("Authorization", &format!("Bearer {}", bearer))
            .send_json(body)
            .map_err(|e| e.to_string())?;

        let status = response.status().as_u16();
        let body = response
            .into_body()
            .read_to_string()
            .map_err(|e| e.to_string())?;
        Ok(HttpResponse { status, body })
    }
}

/// Endpoint and sampling parameters
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub api_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.3,
            max_tokens: 4000,
            timeout: Duration::from_secs(120), // LLM calls can be slow
        }
    }
}

/// Chat-completion client that fails over across a [`CredentialPool`]
pub struct ResilientClient {
    pool: CredentialPool,
    settings: ClientSettings,
    transport: Box<dyn Transport>,
}

enum Failure {
    RateLimited(String),
    Fatal(AiError),
}

impl ResilientClient {
    pub fn new(pool: CredentialPool, settings: ClientSettings) -> Self {
        let transport = UreqTransport::new(settings.timeout);
        Self::with_transport(pool, settings, transport)
    }

    pub fn with_transport(
        pool: CredentialPool,
        settings: ClientSettings,
        transport: impl Transport + 'static,
    ) -> Self {
        Self {
            pool,
            settings,
            transport: Box::new(transport),
        }
    }

    pub fn pool(&self) -> &CredentialPool {
        &self.pool
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn ensure_configured(&self) -> AiResult<()> {
        if self.pool.is_empty() {
            Err(AiError::NotConfigured)
        } else {
            Ok(())
        }
    }

    /// Send one system + user exchange and return the reply text.
    ///
    /// Each credential gets at most one attempt. A rate-limited attempt
    /// rotates the pool and retries; any other failure is returned as is.
    pub fn complete(&self, system: &str, user: &str) -> AiResult<String> {
        self.ensure_configured()?;
        let attempts = self.pool.len();

        let request = ChatRequest {
            model: &self.settings.model,
            messages: vec![Message::system(system), Message::user(user)],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };
        let body = serde_json::to_value(&request).map_err(|e| AiError::ParseError(e.to_string()))?;

        let mut last_message = String::new();
        for attempt in 0..attempts {
            let (index, key) = self.pool.current().ok_or(AiError::NotConfigured)?;
            debug!(
                "Completion attempt {}/{} with credential {}",
                attempt + 1,
                attempts,
                self.pool.masked(index)
            );

            match self.attempt(key, &body) {
                Ok(content) => return Ok(content),
                Err(Failure::Fatal(err)) => return Err(err),
                Err(Failure::RateLimited(message)) => {
                    last_message = message;
                    if attempt + 1 < attempts {
                        let next = self.pool.rotate_from(index);
                        warn!(
                            "Credential {} rate limited, rotating to {}",
                            self.pool.masked(index),
                            self.pool.masked(next)
                        );
                    }
                }
            }
        }

        Err(AiError::RateLimitExhausted {
            attempts,
            message: last_message,
        })
    }

    fn attempt(&self, key: &str, body: &Value) -> Result<String, Failure> {
        let response = self
            .transport
            .post_json(&self.settings.api_url, key, body)
            .map_err(|e| {
                if is_rate_limit_text(&e) {
                    Failure::RateLimited(e)
                } else {
                    Failure::Fatal(AiError::Transport(e))
                }
            })?;

        let parsed = serde_json::from_str::<ChatResponse>(&response.body);
        let api_message = parsed
            .as_ref()
            .ok()
            .and_then(|r| r.error.as_ref())
            .map(error_message);

        if response.status == 429 {
            return Err(Failure::RateLimited(
                api_message.unwrap_or_else(|| response.body.clone()),
            ));
        }
        if let Some(message) = api_message {
            return Err(classify(response.status, message));
        }
        if !(200..300).contains(&response.status) {
            return Err(classify(response.status, response.body));
        }

        let parsed = parsed.map_err(|e| Failure::Fatal(AiError::ParseError(e.to_string())))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| Failure::Fatal(AiError::ParseError("No response choices".to_string())))
    }
}

fn classify(status: u16, message: String) -> Failure {
    if is_rate_limit_text(&message) {
        Failure::RateLimited(message)
    } else {
        Failure::Fatal(AiError::ApiError { status, message })
    }
}

fn is_rate_limit_text(text: &str) -> bool {
    let lower = text.to_lowercase();
    RATE_LIMIT_MARKERS.iter().any(|m| lower.contains(m))
}

fn error_message(error: &Value) -> String {
    match error {
        Value::String(s) => s.clone(),
        other => other
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| other.to_string()),
    }
}

// OpenAI-compatible wire types
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}
