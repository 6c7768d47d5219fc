// Entrypoint for the CLI application.
// - Keeps `main` small: read config, ask for the backend address, open the
//   chat log and hand everything to the session loop.
// - Returns `anyhow::Result` so startup failures print and exit non-zero.

use shoplite_cli::api::ApiClient;
use shoplite_cli::chat_log::ChatLog;
use shoplite_cli::config::Config;
use shoplite_cli::session::{LineSource, ReaderLines, Session};
use shoplite_cli::ui;
use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Diagnostics go to stderr so they never mix with the transcript.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env();

    // A terminal gets dialoguer prompts; piped input is read line by line.
    let (base_url, mut input): (String, Box<dyn LineSource>) = if std::io::stdin().is_terminal() {
        (ui::prompt_base_url()?, Box::new(ui::TermPrompt))
    } else {
        let mut lines = ReaderLines(std::io::stdin().lock());
        (ui::read_base_url(&mut lines)?, Box::new(lines))
    };

    let api = ApiClient::new(&base_url, config.timeout)?;
    let log = ChatLog::open(&config.log_path)?;
    ui::print_startup(&api.chat_url(), log.path());

    let mut session = Session::new(ui::Spinning::new(api), log);
    let mut stdout = std::io::stdout().lock();
    session.run(input.as_mut(), &mut stdout)?;
    Ok(())
}
