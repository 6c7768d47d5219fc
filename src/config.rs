// Startup configuration. The backend address is not part of this: it is
// asked for interactively on every run (see `ui::prompt_base_url`).

use std::path::PathBuf;
use std::time::Duration;

/// Environment variable that overrides where the chat log is written.
pub const LOG_FILE_ENV: &str = "SHOPLITE_LOG_FILE";
pub const DEFAULT_LOG_FILE: &str = "chat_log.jsonl";

/// How long a single `/chat` call may take before it is reported as a
/// timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct Config {
    pub log_path: PathBuf,
    pub timeout: Duration,
}

impl Config {
    /// Read `SHOPLITE_LOG_FILE` or fall back to `chat_log.jsonl` in the
    /// working directory.
    pub fn from_env() -> Self {
        Self::from_log_file(std::env::var(LOG_FILE_ENV).ok())
    }

    fn from_log_file(value: Option<String>) -> Self {
        let log_path = value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILE.into());
        Config {
            log_path: PathBuf::from(log_path),
            timeout: REQUEST_TIMEOUT,
        }
    }
}

/// Normalize an operator-typed base address: trim whitespace and trailing
/// slashes, then require an absolute http(s) URL.
pub fn normalize_base_url(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err("Base URL is required".into());
    }
    let url = reqwest::Url::parse(trimmed).map_err(|e| format!("Invalid URL: {}", e))?;
    match url.scheme() {
        "http" | "https" => Ok(trimmed.to_string()),
        other => Err(format!("Unsupported scheme '{}', use http or https", other)),
    }
}
