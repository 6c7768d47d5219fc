// API client module: a small blocking HTTP client that sends one question
// to the backend `/chat` endpoint and normalizes whatever comes back.
// Network failures never escape as panics or opaque errors: they are turned
// into an `ApiError` the session can branch on.

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

/// Answer used when the backend replies without an `answer` field.
pub const NO_ANSWER: &str = "No answer";

pub const TIMEOUT_MESSAGE: &str = "❌ Request timed out. Is your backend slow or stuck?";

/// Request body for `POST /chat`. The backend only reads `query`.
#[derive(Serialize, Debug)]
pub struct ChatRequest<'a> {
    pub query: &'a str,
}

/// Normalized backend reply: the answer text and the sources in the order
/// they were received. Sources are kept as the JSON the backend sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub answer: String,
    pub sources: Vec<Value>,
}

/// Why a question did not get a reply.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request timed out")]
    Timeout,
    /// Connection errors, non-success status, undecodable bodies.
    #[error("{detail}")]
    Transport { detail: String },
}

impl ApiError {
    /// Single display line stored as the exchange's answer.
    pub fn into_answer(self) -> String {
        match self {
            ApiError::Timeout => TIMEOUT_MESSAGE.to_string(),
            ApiError::Transport { detail } => format!("Error calling API: {}", detail),
        }
    }
}

impl Reply {
    /// Collapse an outcome into what gets displayed and logged. Failures
    /// carry no sources.
    pub fn from_outcome(outcome: Result<Reply, ApiError>) -> Reply {
        outcome.unwrap_or_else(|err| Reply {
            answer: err.into_answer(),
            sources: Vec::new(),
        })
    }

    /// Best-effort extraction from an arbitrary JSON body.
    pub fn from_json(body: &Value) -> Reply {
        let answer = match body.get("answer") {
            None | Some(Value::Null) => NO_ANSWER.to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };
        let sources = match body.get("sources") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items.clone(),
            // A lone source is still a source.
            Some(other) => vec![other.clone()],
        };
        Reply { answer, sources }
    }
}

/// Anything that can answer a question. Implemented by `ApiClient`; tests
/// and UI decorators provide their own.
pub trait Ask {
    fn ask(&self, question: &str) -> Result<Reply, ApiError>;
}

/// Blocking client bound to one backend for the whole process.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client for `base_url` (already normalized, no trailing
    /// slash) with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ApiClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn chat_url(&self) -> String {
        format!("{}/chat", &self.base_url)
    }

    fn post_chat(&self, question: &str) -> reqwest::Result<Value> {
        self.client
            .post(self.chat_url())
            .json(&ChatRequest { query: question })
            .send()?
            .error_for_status()?
            .json::<Value>()
    }
}

impl Ask for ApiClient {
    fn ask(&self, question: &str) -> Result<Reply, ApiError> {
        debug!(url = %self.chat_url(), "sending question");
        match self.post_chat(question) {
            Ok(body) => Ok(Reply::from_json(&body)),
            Err(e) if e.is_timeout() => {
                error!(url = %self.chat_url(), "chat request timed out");
                Err(ApiError::Timeout)
            }
            Err(e) => {
                // Full chain for the operator; the answer only gets one line.
                error!(error = ?e, "chat request failed");
                Err(ApiError::Transport {
                    detail: one_line(&e.to_string()),
                })
            }
        }
    }
}

fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
