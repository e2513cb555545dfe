mod config;
mod error;
mod toolkits;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand};
use runtime::{AnthropicBackend, Client, Reply};
use storage::{Event, EventKind, EventStore, Role};
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use error::{Error, Result};

const CONFIG_FILE: &str = "armory.toml";

#[derive(Parser)]
#[command(name = "armory")]
#[command(about = "Chat with a model that can call toolkits", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session
    Chat,
    /// List the built-in toolkits and their tools
    Tools,
    /// List recorded sessions
    Sessions {
        /// Show only the last N sessions
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Show the journal of a session
    Logs {
        /// Session ID (prefix match supported)
        #[arg(short, long)]
        session: String,
        /// Filter by event kind (message, tool_call, tool_result)
        #[arg(short, long)]
        kind: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Chat) | None => cmd_chat(&cli.config).await,
        Some(Commands::Tools) => cmd_tools(),
        Some(Commands::Sessions { limit }) => cmd_sessions(limit),
        Some(Commands::Logs { session, kind }) => cmd_logs(&session, kind.as_deref()),
    }
}

async fn cmd_chat(config_path: &Path) -> Result<()> {
    println!("armory v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load_or_default(config_path)?;
    let auth = config.auth(std::env::var("ANTHROPIC_API_KEY").ok())?;

    let mut builder = AnthropicBackend::builder(auth, &config.backend.model)
        .max_tokens(config.backend.max_tokens)
        .base_url(&config.backend.base_url);
    if let Some(system) = &config.backend.system {
        builder = builder.system(system);
    }
    let backend = builder.build();
    info!(%backend, "backend ready");

    let journal_path = journal_path();
    if let Some(dir) = journal_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let store = EventStore::open(&journal_path)?;

    let mut client = Client::from_backend(&config.prompt, backend)?.with_journal(store)?;
    if let Some(timeout) = config.tool_timeout() {
        client = client.with_tool_timeout(timeout);
    }
    for kit in toolkits::builtin()? {
        client.connect(kit)?;
    }

    if let Some(session) = client.session_id() {
        println!("Session ID: {session}");
    }
    println!("Journal: {}", journal_path.display());
    println!("Model: {}", config.backend.model);
    println!(
        "Toolkits: {}",
        client.toolkits().map(|k| k.name()).collect::<Vec<_>>().join(", ")
    );
    println!("Type 'quit' or Ctrl+D to exit.\n");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "quit" || input == "exit" {
            break;
        }

        match client.chat(input).await {
            Ok(reply) => print_reply(&reply)?,
            Err(e) => eprintln!("Error: {e}\n"),
        }
    }

    client.end()?;
    println!("\nSession ended.");
    Ok(())
}

fn print_reply(reply: &Reply) -> Result<()> {
    match reply {
        Reply::Chat { .. } => {
            if let Some(output) = reply.output() {
                println!("\n{output}\n");
            }
        }
        Reply::Tool {
            toolkit, tool_name, ..
        } => println!("\n[{toolkit}.{tool_name}]"),
    }
    println!("{}\n", serde_json::to_string_pretty(reply)?);
    Ok(())
}

fn cmd_tools() -> Result<()> {
    for kit in toolkits::builtin()? {
        println!("{}", kit.name());
        for spec in kit.specs() {
            println!("  {:<12}  {}", spec.name, spec.description);
        }
    }
    Ok(())
}

fn cmd_sessions(limit: usize) -> Result<()> {
    let store = open_journal()?;
    let sessions = store.list_sessions()?;

    if sessions.is_empty() {
        println!("No sessions found.");
        return Ok(());
    }

    println!(
        "{:<36}  {:<16}  {:<5}  {:<5}  STATUS",
        "SESSION ID", "STARTED", "MSGS", "TOOLS"
    );
    println!("{}", "-".repeat(80));

    for summary in sessions.into_iter().take(limit) {
        let started = Local
            .from_utc_datetime(&summary.started_at.naive_utc())
            .format("%Y-%m-%d %H:%M");
        let status = if summary.ended_at.is_some() {
            "ended"
        } else {
            "active"
        };
        println!(
            "{:<36}  {:<16}  {:<5}  {:<5}  {status}",
            summary.id.to_string(),
            started.to_string(),
            summary.message_count,
            summary.tool_call_count
        );
    }

    Ok(())
}

fn cmd_logs(session_prefix: &str, kind_filter: Option<&str>) -> Result<()> {
    let store = open_journal()?;

    let sessions = store.list_sessions()?;
    let matching: Vec<_> = sessions
        .iter()
        .filter(|s| s.id.to_string().starts_with(session_prefix))
        .collect();

    let session_id = match matching.as_slice() {
        [] => {
            return Err(Error::SessionNotFound {
                prefix: session_prefix.to_string(),
            });
        }
        [only] => only.id,
        _ => {
            return Err(Error::AmbiguousSession {
                prefix: session_prefix.to_string(),
                matches: matching.iter().map(|s| s.id.to_string()).collect(),
            });
        }
    };

    let events = store.load_events(session_id, kind_filter)?;
    if events.is_empty() {
        println!("No events found for session {session_id}");
        return Ok(());
    }

    println!("Session: {session_id}\n");
    for event in &events {
        print_event(event);
    }
    Ok(())
}

fn print_event(event: &Event) {
    let time = Local
        .from_utc_datetime(&event.timestamp.naive_utc())
        .format("%H:%M:%S");

    match &event.kind {
        EventKind::SessionStart => println!("[{time}] === Session started ==="),
        EventKind::SessionEnd => println!("[{time}] === Session ended ==="),
        EventKind::Message { role, content } => {
            let role = match role {
                Role::User => "USER",
                Role::Assistant => "ASSISTANT",
            };
            println!("[{time}] {role}: {}", truncate(content, 200));
        }
        EventKind::ToolCall {
            toolkit,
            name,
            input,
        } => println!("[{time}] TOOL CALL: {toolkit}.{name} {input}"),
        EventKind::ToolResult { name, output } => {
            println!("[{time}] TOOL RESULT: {name} {}", truncate(&output.to_string(), 200));
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn open_journal() -> Result<EventStore> {
    let path = journal_path();
    if !path.exists() {
        return Err(Error::JournalNotFound { path });
    }
    Ok(EventStore::open(&path)?)
}

fn journal_path() -> PathBuf {
    data_dir()
        .unwrap_or_else(|| ".armory".into())
        .join("journal.db")
}

fn data_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share/armory"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share")))
            .map(|p| p.join("armory"))
    }
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|h| PathBuf::from(h).join("armory"))
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("héllo wörld", 4), "héll...");
    }

    #[test]
    fn cli_parses_logs_command() {
        let cli = Cli::try_parse_from(["armory", "logs", "--session", "abc", "--kind", "tool_call"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Logs { ref session, kind: Some(ref k) }) if session == "abc" && k == "tool_call"
        ));
        assert_eq!(cli.config, PathBuf::from(CONFIG_FILE));
    }
}
