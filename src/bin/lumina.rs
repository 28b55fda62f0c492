//! CLI binary for lumina.
//!
//! A thin shim over the library crate: maps CLI flags to `SessionConfig`,
//! uploads one document, prints its analysis, then answers questions from
//! `--ask` flags and an interactive prompt.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use lumina::{
    AnalysisResult, ConversationTurn, LuminaError, Phase, Session, SessionConfig, SessionObserver,
    Speaker, Upload,
};
use serde::Serialize;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI observer using indicatif ─────────────────────────────────────────────

/// Terminal observer: shows a spinner while a request is in flight and
/// clears it when the session settles.
struct CliObserver {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliObserver {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bar: Mutex::new(None),
        })
    }

    fn start_spinner(&self, prefix: &str, message: &str) {
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        let bar = ProgressBar::new_spinner();
        bar.set_style(style);
        bar.set_prefix(prefix.to_string());
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));

        if let Some(old) = self.bar.lock().unwrap().replace(bar) {
            old.finish_and_clear();
        }
    }

    fn stop_spinner(&self) {
        if let Some(bar) = self.bar.lock().unwrap().take() {
            bar.finish_and_clear();
        }
    }
}

impl SessionObserver for CliObserver {
    fn on_phase_change(&self, _from: Phase, to: Phase) {
        match to {
            Phase::Uploading => self.start_spinner("Uploading", "Encoding document…"),
            Phase::Analyzing => self.start_spinner("Analyzing", "Reading through the pages…"),
            Phase::Chatting => self.start_spinner("Thinking", ""),
            Phase::Ready | Phase::Empty => self.stop_spinner(),
        }
    }

    fn on_document_loaded(&self, display_name: &str, byte_size: u64) {
        if let Some(ref bar) = *self.bar.lock().unwrap() {
            bar.println(format!(
                "{} {}  {}",
                cyan("◆"),
                bold(display_name),
                dim(&lumina::format_size(byte_size))
            ));
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Analyze a document, then chat about it interactively
  lumina report.pdf

  # Ask questions non-interactively
  lumina report.pdf --ask "What is the conclusion?" --ask "Who wrote it?" --no-interactive

  # Analyze a PDF from a URL and print JSON
  lumina https://arxiv.org/pdf/1706.03762 --json

  # Use a different model
  lumina --model gemini-2.5-pro paper.pdf

INTERACTIVE COMMANDS:
  :ask N            Send suggested question N (1-based)
  :history          Print the conversation so far
  :reset            Discard the document, analysis and conversation
  :open <INPUT>     Upload a new document (after :reset)
  :help             Show this list
  :quit             Exit

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY    Google Gemini API key (API_KEY is also accepted)
  LUMINA_MODEL      Override model ID
  LUMINA_BASE_URL   Override the API base URL
  RUST_LOG          Log filter (e.g. lumina=debug)
"#;

const INTERACTIVE_HELP: &str = "Commands: :ask N, :history, :reset, :open <INPUT>, :help, :quit";

/// Summarise a PDF and chat about it using Gemini.
#[derive(Parser, Debug)]
#[command(
    name = "lumina",
    version,
    about = "Summarise a PDF and chat about it using an LLM",
    long_about = "Upload a PDF (local file or URL), get a summary, key insights and suggested \
follow-up questions, then ask questions grounded in the same document.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Question to ask after the analysis. Repeatable; asked in order.
    #[arg(short, long = "ask", value_name = "QUESTION")]
    questions: Vec<String>,

    /// LLM model ID.
    #[arg(long, env = "LUMINA_MODEL", default_value = lumina::DEFAULT_MODEL)]
    model: String,

    /// LLM provider (only `gemini` is built in).
    #[arg(long, env = "LUMINA_PROVIDER")]
    provider: Option<String>,

    /// API key; defaults to GEMINI_API_KEY / API_KEY.
    #[arg(long, env = "LUMINA_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Override the provider's base URL.
    #[arg(long, env = "LUMINA_BASE_URL")]
    base_url: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "LUMINA_TEMPERATURE")]
    temperature: Option<f32>,

    /// Max output tokens per call.
    #[arg(long, env = "LUMINA_MAX_TOKENS")]
    max_tokens: Option<u32>,

    /// Per-call API timeout in seconds (default: no timeout).
    #[arg(long, env = "LUMINA_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// HTTP download timeout in seconds for URL inputs.
    #[arg(long, env = "LUMINA_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Path to a text file containing a custom analysis instruction.
    #[arg(long, env = "LUMINA_ANALYSIS_PROMPT")]
    analysis_prompt: Option<std::path::PathBuf>,

    /// Print the analysis and answers as JSON and exit.
    #[arg(long)]
    json: bool,

    /// Exit after the analysis and any --ask questions.
    #[arg(long)]
    no_interactive: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "LUMINA_VERBOSE")]
    verbose: bool,

    /// Suppress all output except results and errors.
    #[arg(short, long, env = "LUMINA_QUIET")]
    quiet: bool,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    document: JsonDocument<'a>,
    analysis: Option<&'a AnalysisResult>,
    conversation: &'a [ConversationTurn],
    error: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonDocument<'a> {
    name: &'a str,
    byte_size: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives all the feedback that matters; keep library logs
    // at error level unless asked for more.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || !cli.json {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let show_progress = !cli.quiet && !cli.json;
    let config = build_config(&cli, show_progress).await?;
    let session = Session::new(config).context("Failed to set up the inference provider")?;

    // ── Upload + analysis ────────────────────────────────────────────────
    let upload_ok = open_document(&session, &cli.input, cli.json).await?;

    // ── Scripted questions ───────────────────────────────────────────────
    if upload_ok {
        for question in &cli.questions {
            ask(&session, question, cli.json).await;
        }
    }

    if cli.json {
        let state = session.snapshot();
        let document = state
            .document
            .as_ref()
            .context("No document loaded")?;
        let out = JsonOutput {
            document: JsonDocument {
                name: document.display_name(),
                byte_size: document.byte_size(),
            },
            analysis: state.analysis.as_ref(),
            conversation: state.log.turns(),
            error: state.last_error.as_deref(),
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&out).context("Failed to serialise output")?
        );
        return Ok(());
    }

    if cli.no_interactive {
        return Ok(());
    }

    // ── Interactive loop ─────────────────────────────────────────────────
    eprintln!("{}", dim(INTERACTIVE_HELP));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt()?;
        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_command(line) {
            Command::Quit => break,
            Command::Help => eprintln!("{}", dim(INTERACTIVE_HELP)),
            Command::History => print_history(&session),
            Command::Reset => {
                session.reset();
                eprintln!("{} Session cleared. Load a document with :open <INPUT>", green("✔"));
            }
            Command::Open(input) => {
                if session.phase() != Phase::Empty {
                    eprintln!("{}", red("A document is already loaded; :reset first."));
                } else if let Err(e) = open_document(&session, &input, false).await {
                    eprintln!("{} {}", red("✗"), red(&format!("{e:#}")));
                }
            }
            Command::AskSuggested(n) => match n.checked_sub(1) {
                Some(index) => match session.ask_suggested(index).await {
                    Ok(reply) => print_reply(&reply),
                    Err(e) => report(&e),
                },
                None => eprintln!("{}", red("Suggested questions are numbered from 1.")),
            },
            Command::Invalid(msg) => eprintln!("{}", red(&msg)),
            Command::Message(text) => ask(&session, &text, false).await,
        }
    }

    Ok(())
}

/// Resolve and upload `input`. Returns `false` when the session ended up
/// without a document; fatal input errors propagate.
async fn open_document(session: &Session, input: &str, json: bool) -> Result<bool> {
    let upload = Upload::resolve(input, session.config().download_timeout_secs)
        .await
        .with_context(|| format!("Failed to load '{input}'"))?;

    match session.upload(upload).await {
        Ok(analysis) => {
            if !json {
                print_document(session);
                print_analysis(&analysis);
            }
            Ok(true)
        }
        Err(e @ LuminaError::AnalysisFailed { .. }) => {
            report(&e);
            if !json {
                print_document(session);
                eprintln!(
                    "{}",
                    dim("You can still ask questions about the document, or :reset to start over.")
                );
            }
            Ok(true)
        }
        Err(e @ LuminaError::InvalidFileType { .. }) => {
            report(&e);
            if json {
                anyhow::bail!(e);
            }
            Ok(false)
        }
        Err(e) => Err(e).context("Upload failed"),
    }
}

async fn ask(session: &Session, question: &str, json: bool) {
    if !json {
        println!("{} {}", bold("You:"), question);
    }
    match session.send(question).await {
        Ok(reply) if !json => print_reply(&reply),
        Ok(_) => {}
        Err(e) => report(&e),
    }
}

fn report(err: &LuminaError) {
    eprintln!("{} {}", red("✗"), red(&err.user_message()));
    tracing::debug!("{err}");
}

fn prompt() -> Result<()> {
    let mut stderr = io::stderr();
    write!(stderr, "{} ", cyan("›")).context("Failed to write prompt")?;
    stderr.flush().context("Failed to flush prompt")
}

fn print_document(session: &Session) {
    if let Some(doc) = session.snapshot().document {
        eprintln!(
            "{} {}  {}  {}",
            green("✔"),
            bold(doc.display_name()),
            dim(&doc.formatted_size()),
            dim(&doc.render_handle().path().display().to_string()),
        );
    }
}

fn print_analysis(analysis: &AnalysisResult) {
    println!("\n{}\n{}\n", bold("Summary"), analysis.summary);

    println!("{}", bold("Key insights"));
    for insight in &analysis.key_insights {
        println!("  • {insight}");
    }

    println!("\n{}", bold("Suggested questions"));
    for (i, q) in analysis.suggested_questions.iter().enumerate() {
        println!("  {} {q}", cyan(&format!("[{}]", i + 1)));
    }
    println!();
}

fn print_reply(reply: &str) {
    println!("{} {}\n", bold(&green("Assistant:")), reply.trim_end());
}

fn print_history(session: &Session) {
    let state = session.snapshot();
    if state.log.is_empty() {
        eprintln!("{}", dim("No messages yet."));
        return;
    }
    for turn in &state.log {
        let label = match turn.speaker {
            Speaker::User => bold("You:"),
            Speaker::Assistant => bold(&green("Assistant:")),
        };
        println!("{label} {}", turn.text);
    }
}

#[derive(Debug, PartialEq)]
enum Command {
    Quit,
    Help,
    History,
    Reset,
    Open(String),
    AskSuggested(usize),
    Invalid(String),
    Message(String),
}

/// Parse one line of interactive input.
fn parse_command(line: &str) -> Command {
    let Some(rest) = line.strip_prefix(':') else {
        return Command::Message(line.to_string());
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match name {
        "q" | "quit" | "exit" => Command::Quit,
        "h" | "help" => Command::Help,
        "history" => Command::History,
        "reset" | "new" => Command::Reset,
        "open" if !arg.is_empty() => Command::Open(arg.to_string()),
        "open" => Command::Invalid("Usage: :open <path-or-url>".into()),
        "ask" => match arg.parse::<usize>() {
            Ok(n) => Command::AskSuggested(n),
            Err(_) => Command::Invalid(format!("Invalid question number: '{arg}'")),
        },
        other => Command::Invalid(format!("Unknown command ':{other}' ({INTERACTIVE_HELP})")),
    }
}

/// Map CLI args to `SessionConfig`.
async fn build_config(cli: &Cli, show_progress: bool) -> Result<SessionConfig> {
    let mut builder = SessionConfig::builder()
        .model(cli.model.clone())
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(ref url) = cli.base_url {
        builder = builder.base_url(url.clone());
    }
    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(n) = cli.max_tokens {
        builder = builder.max_output_tokens(n);
    }
    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if let Some(ref path) = cli.analysis_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read analysis prompt from {:?}", path))?;
        builder = builder.analysis_prompt(prompt);
    }
    if show_progress {
        builder = builder.observer(CliObserver::new() as Arc<dyn SessionObserver>);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_message() {
        assert_eq!(
            parse_command("What is the conclusion?"),
            Command::Message("What is the conclusion?".into())
        );
    }

    #[test]
    fn commands() {
        assert_eq!(parse_command(":q"), Command::Quit);
        assert_eq!(parse_command(":reset"), Command::Reset);
        assert_eq!(parse_command(":history"), Command::History);
        assert_eq!(parse_command(":ask 2"), Command::AskSuggested(2));
        assert_eq!(
            parse_command(":open  ./other.pdf "),
            Command::Open("./other.pdf".into())
        );
    }

    #[test]
    fn bad_commands_are_reported() {
        assert!(matches!(parse_command(":ask two"), Command::Invalid(_)));
        assert!(matches!(parse_command(":open"), Command::Invalid(_)));
        assert!(matches!(parse_command(":frobnicate"), Command::Invalid(_)));
    }
}
