// Session loop: reads one line at a time, runs the exchange (ask ->
// classify -> display -> log) and goes back to waiting for input. Output is
// written to any `io::Write` so the whole loop runs under test.

use crate::api::{Ask, Reply};
use crate::chat_log::{LogRecord, LogSink};
use crate::confidence::{classify, Confidence};
use anyhow::Result;
use serde_json::Value;
use std::io::{BufRead, Write};
use tracing::{error, info};

pub const BANNER: &str = "Shoplite CLI (type 'exit' to quit)";
pub const FAREWELL: &str = "Bye!";

/// What a line of operator input means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Quit,
    /// Already trimmed. May be empty; empty questions are still sent.
    Question(String),
}

impl Command {
    pub fn parse(line: &str) -> Command {
        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
            Command::Quit
        } else {
            Command::Question(trimmed.to_string())
        }
    }
}

/// Where input lines come from. `None` means input is exhausted.
pub trait LineSource {
    fn next_line(&mut self) -> Result<Option<String>>;
}

/// Line source over any buffered reader (piped stdin, test fixtures).
pub struct ReaderLines<R>(pub R);

impl<R: BufRead> LineSource for ReaderLines<R> {
    fn next_line(&mut self) -> Result<Option<String>> {
        let mut buf = String::new();
        if self.0.read_line(&mut buf)? == 0 {
            return Ok(None);
        }
        Ok(Some(buf))
    }
}

/// Result of one finished exchange, as shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
    pub sources: Vec<Value>,
    pub confidence: Confidence,
    /// False when the log append failed and the record was only reported.
    pub logged: bool,
}

/// Process-scoped context: the backend and the log, both fixed at startup.
pub struct Session<A, L> {
    api: A,
    log: L,
}

impl<A: Ask, L: LogSink> Session<A, L> {
    pub fn new(api: A, log: L) -> Self {
        Session { api, log }
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    /// Run until `exit`/`quit` or end of input.
    pub fn run(&mut self, input: &mut dyn LineSource, out: &mut dyn Write) -> Result<()> {
        writeln!(out, "{}", BANNER)?;
        info!("session started");
        loop {
            let line = match input.next_line()? {
                Some(line) => line,
                None => break,
            };
            match Command::parse(&line) {
                Command::Quit => break,
                Command::Question(question) => {
                    self.exchange(&question, out)?;
                }
            }
        }
        writeln!(out, "{}", FAREWELL)?;
        info!("session ended");
        Ok(())
    }

    /// One full exchange. Only failures writing to `out` are returned; a
    /// failed log append is reported and the session carries on.
    pub fn exchange(&mut self, question: &str, out: &mut dyn Write) -> Result<Exchange> {
        writeln!(out, "[Retrieving context...]")?;
        let Reply { answer, sources } = Reply::from_outcome(self.api.ask(question));
        writeln!(out, "[Calling LLM...]")?;

        let confidence = classify(sources.as_slice());
        writeln!(out, "Answer: {}", answer)?;
        writeln!(out, "Sources: {}", format_sources(&sources))?;
        writeln!(out, "Confidence: {}", confidence)?;

        let record = LogRecord::now(question, &answer, &sources, confidence);
        let logged = match self.log.append(&record) {
            Ok(()) => true,
            Err(e) => {
                error!(error = ?e, "failed to append chat log entry");
                writeln!(out, "Warning: could not write chat log: {:#}", e)?;
                if let Ok(line) = record.to_line() {
                    write!(out, "Unsaved record: {}", line)?;
                }
                false
            }
        };

        Ok(Exchange {
            question: question.to_string(),
            answer,
            sources,
            confidence,
            logged,
        })
    }
}

/// `["a.pdf", "b.md"]`, in received order, each source as compact JSON.
pub fn format_sources(sources: &[Value]) -> String {
    let items: Vec<String> = sources.iter().map(Value::to_string).collect();
    format!("[{}]", items.join(", "))
}
