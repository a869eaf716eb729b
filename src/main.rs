use anyhow::{Context, Result};
use parley::llm::{
    find_preset, preset_at, ChatEvent, ChatHandle, ChatPipeline, ClientConfig, HttpTransport,
    ROLE_PRESETS,
};
use parley::session::{Session, SharedSession};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// One line typed at the prompt
#[derive(Debug, PartialEq, Eq)]
enum ShellCommand {
    Ask(String),
    Stop,
    Last,
    Roles,
    Role(String),
    Context(bool),
    Key(Option<String>),
    Quit,
    Unknown(String),
}

impl ShellCommand {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        let Some(rest) = line.strip_prefix(':') else {
            return ShellCommand::Ask(line.to_string());
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        match (name, arg) {
            ("stop", _) => ShellCommand::Stop,
            ("last", _) => ShellCommand::Last,
            ("roles", _) => ShellCommand::Roles,
            ("role", arg) if !arg.is_empty() => ShellCommand::Role(arg.to_string()),
            ("context", "on") => ShellCommand::Context(true),
            ("context", "off") => ShellCommand::Context(false),
            ("key", "") => ShellCommand::Key(None),
            ("key", arg) => ShellCommand::Key(Some(arg.to_string())),
            ("quit" | "q", _) => ShellCommand::Quit,
            _ => ShellCommand::Unknown(line.to_string()),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parley=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    info!("Starting Parley");

    let config = match std::env::args().nth(1) {
        Some(path) => ClientConfig::load(&path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        None => ClientConfig::load_or_default()?,
    };
    info!("Using endpoint {}", config.endpoint);

    let transport = HttpTransport::new(&config)?;
    let session = SharedSession::new(Session::from_config(&config));
    let handle = ChatPipeline::new(Arc::new(transport), session).start_worker()?;

    let events = handle.event_receiver();
    let printer = std::thread::spawn(move || {
        for event in events.iter() {
            if !print_event(event) {
                break;
            }
        }
    });

    println!("Type a question, or :roles, :role <n>, :context on|off, :key <value>, :last, :stop, :quit");
    run_shell(&handle)?;

    handle.shutdown()?;
    let _ = printer.join();
    info!("Parley stopped");

    Ok(())
}

fn run_shell(handle: &ChatHandle) -> Result<()> {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("Failed to read from stdin")?;
        if line.trim().is_empty() {
            continue;
        }

        match ShellCommand::parse(&line) {
            ShellCommand::Ask(question) => handle.ask(&question)?,
            ShellCommand::Stop => handle.stop()?,
            ShellCommand::Last => {
                let last = handle.session().read().recall_last_question().map(str::to_string);
                match last {
                    Some(question) => {
                        println!("> {}", question);
                        handle.ask(&question)?;
                    }
                    None => println!("No previous question"),
                }
            }
            ShellCommand::Roles => {
                for (i, preset) in ROLE_PRESETS.iter().enumerate() {
                    println!("{:>3}. {}", i + 1, preset.label);
                }
            }
            ShellCommand::Role(choice) => {
                let preset = choice
                    .parse::<usize>()
                    .ok()
                    .and_then(preset_at)
                    .or_else(|| find_preset(&choice));
                match preset {
                    Some(preset) => {
                        handle.set_role(preset.instruction)?;
                        println!("Role: {}", preset.label);
                    }
                    None => println!("Unknown role {:?}, see :roles", choice),
                }
            }
            ShellCommand::Context(enabled) => {
                handle.set_remember_context(enabled)?;
                println!("Remember context {}", if enabled { "on" } else { "off" });
            }
            ShellCommand::Key(api_key) => {
                let set = api_key.is_some();
                handle.set_api_key(api_key)?;
                println!("API key {}", if set { "set" } else { "cleared" });
            }
            ShellCommand::Quit => break,
            ShellCommand::Unknown(input) => warn!("Unknown command: {}", input),
        }
    }

    Ok(())
}

/// Print one event; returns false once the worker has shut down
fn print_event(event: ChatEvent) -> bool {
    let mut out = io::stdout().lock();
    let _ = match event {
        ChatEvent::Started { .. } => writeln!(out),
        ChatEvent::Updated { token, .. } => write!(out, "{}", token),
        ChatEvent::Complete { document, .. } => {
            write!(out, "\n\n{}\n", document)
        }
        ChatEvent::Cancelled { .. } => writeln!(out, "\n[stopped]"),
        ChatEvent::Error { error, .. } => writeln!(out, "\n[{}]", error.user_message()),
        ChatEvent::Shutdown => return false,
    };
    let _ = out.flush();
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_line_is_question() {
        assert_eq!(
            ShellCommand::parse("  what is borrowing?  "),
            ShellCommand::Ask("what is borrowing?".to_string())
        );
    }

    #[test]
    fn test_commands() {
        assert_eq!(ShellCommand::parse(":stop"), ShellCommand::Stop);
        assert_eq!(ShellCommand::parse(":last"), ShellCommand::Last);
        assert_eq!(ShellCommand::parse(":roles"), ShellCommand::Roles);
        assert_eq!(ShellCommand::parse(":role 3"), ShellCommand::Role("3".to_string()));
        assert_eq!(ShellCommand::parse(":context on"), ShellCommand::Context(true));
        assert_eq!(ShellCommand::parse(":context off"), ShellCommand::Context(false));
        assert_eq!(ShellCommand::parse(":key abc"), ShellCommand::Key(Some("abc".to_string())));
        assert_eq!(ShellCommand::parse(":key"), ShellCommand::Key(None));
        assert_eq!(ShellCommand::parse(":quit"), ShellCommand::Quit);
    }

    #[test]
    fn test_malformed_commands() {
        assert!(matches!(ShellCommand::parse(":role"), ShellCommand::Unknown(_)));
        assert!(matches!(ShellCommand::parse(":context maybe"), ShellCommand::Unknown(_)));
        assert!(matches!(ShellCommand::parse(":bogus"), ShellCommand::Unknown(_)));
    }
}
