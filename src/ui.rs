// UI layer: the terminal-facing pieces around the session loop. Prompts
// use `dialoguer`, the in-flight request shows an `indicatif` spinner and
// the startup summary is styled with `crossterm`.

use crate::api::{Ask, ApiError, Reply};
use crate::config::normalize_base_url;
use crate::session::LineSource;
use anyhow::{Context, Result};
use crossterm::style::Stylize;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

const URL_PROMPT: &str = "Enter the backend base URL (e.g. https://xxxx.ngrok.io)";

/// Ask the operator for the backend address until it parses. Nothing is
/// remembered between runs.
pub fn prompt_base_url() -> Result<String> {
    let raw: String = Input::new()
        .with_prompt(URL_PROMPT)
        .validate_with(|input: &String| -> Result<(), String> {
            normalize_base_url(input).map(|_| ())
        })
        .interact_text()
        .context("Failed to read backend URL")?;
    normalize_base_url(&raw).map_err(anyhow::Error::msg)
}

/// Non-interactive variant: the first input line is the address. There is
/// nobody to re-prompt, so a bad value ends startup.
pub fn read_base_url(input: &mut dyn LineSource) -> Result<String> {
    let line = input
        .next_line()?
        .context("Input ended before a backend URL was given")?;
    normalize_base_url(&line).map_err(anyhow::Error::msg)
}

/// Keyboard prompt for questions. Empty lines are accepted and sent.
#[derive(Default)]
pub struct TermPrompt;

impl LineSource for TermPrompt {
    fn next_line(&mut self) -> Result<Option<String>> {
        let line = Input::<String>::new()
            .with_prompt(">")
            .allow_empty(true)
            .interact_text();
        match line {
            Ok(line) => Ok(Some(line)),
            // Ctrl-D / closed terminal ends the session like `exit`.
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e).context("Failed to read question"),
        }
    }
}

/// Shows a spinner on stderr while the wrapped client is waiting. The
/// spinner hides itself when stderr is not a terminal.
pub struct Spinning<A> {
    inner: A,
}

impl<A: Ask> Spinning<A> {
    pub fn new(inner: A) -> Self {
        Spinning { inner }
    }
}

impl<A: Ask> Ask for Spinning<A> {
    fn ask(&self, question: &str) -> Result<Reply, ApiError> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message("Waiting for backend...");
        spinner.enable_steady_tick(Duration::from_millis(100));
        let outcome = self.inner.ask(question);
        spinner.finish_and_clear();
        outcome
    }
}

/// One-time summary printed before the first prompt.
pub fn print_startup(chat_url: &str, log_path: &Path) {
    println!("{} {}", "Backend:".dark_grey(), chat_url.to_string().bold());
    println!(
        "{} {}",
        "Logging to:".dark_grey(),
        log_path.display().to_string().bold()
    );
}
