// Library root
// -----------
// This crate exposes a small library surface for the CLI. The binary
// (`main.rs`) uses these modules to run the interactive chat.
//
// Module responsibilities:
// - `config`: Startup configuration read from the environment.
// - `api`: Sends a question to the backend `/chat` endpoint and turns the
//   outcome into an answer plus sources, or a tagged failure.
// - `confidence`: Derives the High/Low label from the returned sources.
// - `chat_log`: Append-only JSONL log of every exchange.
// - `session`: The question/answer loop and its rendering.
// - `ui`: Terminal pieces (endpoint prompt, line prompt, spinner).
//
// The session only talks to the traits `Ask`, `LogSink` and `LineSource`,
// so tests can swap the network, the log file and the keyboard for fakes.
pub mod api;
pub mod chat_log;
pub mod confidence;
pub mod config;
pub mod session;
pub mod ui;
