//! CLI entry point for ceptra.

mod cli;

use ceptra::agent::Orchestrator;
use ceptra::auth::{Authenticator, HttpAuthenticator};
use ceptra::build_info;
use ceptra::config::{load_config, Config, ConfigHome, InitOutcome};
use ceptra::host::LocalHost;
use ceptra::render::Renderer;
use ceptra::repl::{self, PendingActions, SlashCommandAction};
use ceptra::runtime::{self, ActionPrompt, InboundMessage, OutboundMessage};
use ceptra::session::{Credential, SessionContext, SessionStore};
use ceptra::workspace::ProjectInspector;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[tokio::main]
async fn main() {
    ceptra::logging::init();
    let args = cli::Args::parse();

    if let Some(cli::Command::Init { force }) = args.command.as_ref() {
        run_init(*force);
        return;
    }

    let mut config = match load_config(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };
    apply_cli_overrides(&mut config, &args);
    let renderer = Renderer::new(config.display.color);

    let store = match SessionStore::open_default() {
        Ok(store) => Some(store),
        Err(e) => {
            renderer.warn(&format!("session storage unavailable: {e}"));
            None
        }
    };

    match args.command.as_ref() {
        Some(cli::Command::Login { email }) => {
            if let Err(msg) = run_login(&renderer, &config, store.as_ref(), email.clone()).await {
                renderer.error(&msg);
                std::process::exit(1);
            }
            return;
        }
        Some(cli::Command::Logout) => {
            let Some(store) = store.as_ref() else {
                renderer.error("no session storage to clear");
                std::process::exit(1);
            };
            if let Err(e) = store.clear_credential() {
                renderer.error(&e);
                std::process::exit(1);
            }
            renderer.status("Signed out");
            return;
        }
        Some(cli::Command::Init { .. }) | None => {}
    }

    let identity = startup_identity(&config, store.as_ref());
    let workspace_root = config.workspace.root.clone();
    let inspector = ProjectInspector::new(workspace_root.clone())
        .with_active_file(args.active_file.as_ref().map(PathBuf::from));
    let mut orchestrator = Orchestrator::new(
        &config,
        SessionContext::start(identity),
        Arc::new(LocalHost::default()),
        Arc::new(inspector),
    );
    orchestrator.set_session_store(store);
    let restored = orchestrator.restore_persisted_history();
    debug!(restored, "startup history");

    let authenticator: Arc<dyn Authenticator> = Arc::new(HttpAuthenticator::new(
        &config.gateway.server_url,
        Duration::from_secs(config.gateway.timeout_secs),
    ));

    if args.stdio {
        run_stdio(orchestrator, authenticator).await;
    } else if let Some(prompt) = args.prompt.as_deref() {
        if let Err(code) = run_one_shot(&renderer, orchestrator, prompt).await {
            std::process::exit(code);
        }
    } else {
        let workspace = workspace_root
            .as_ref()
            .map(|root| format!("workspace: {}", root.display()))
            .unwrap_or_else(|| "workspace: (none)".to_string());
        renderer.banner(&build_info::startup_metadata_line(), &workspace);
        run_repl(&renderer, orchestrator, authenticator).await;
    }
}

fn run_init(force: bool) {
    let Some(home) = ConfigHome::locate() else {
        eprintln!("error: could not determine the user config directory");
        std::process::exit(1);
    };
    match home.init(force) {
        Ok(InitOutcome::Created { path }) => {
            println!("Created {}", path.display());
        }
        Ok(InitOutcome::AlreadyInitialized { path }) => {
            println!(
                "{} already exists (use --force to overwrite)",
                path.display()
            );
        }
        Ok(InitOutcome::Overwritten { path, backup_path }) => {
            println!(
                "Overwrote {} (backup at {})",
                path.display(),
                backup_path.display()
            );
        }
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}

/// Flags win over every config source.
fn apply_cli_overrides(config: &mut Config, args: &cli::Args) {
    if let Some(url) = &args.server_url {
        config.gateway.server_url = url.trim().to_string();
    }
    if let Some(root) = &args.workspace {
        config.workspace.root = Some(PathBuf::from(root));
    }
    if config.workspace.root.is_none() {
        config.workspace.root = std::env::current_dir().ok();
    }
    if args.no_color {
        config.display.color = false;
    }
}

/// Stored sign-in first, then a configured static token.
fn startup_identity(config: &Config, store: Option<&SessionStore>) -> Option<Credential> {
    if let Some(store) = store {
        match store.load_credential() {
            Ok(Some(credential)) => return Some(credential),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "failed to load stored credential"),
        }
    }
    config.gateway.token.as_ref().map(|token| Credential {
        token: token.clone(),
        email: String::new(),
    })
}

async fn run_login(
    renderer: &Renderer,
    config: &Config,
    store: Option<&SessionStore>,
    email: Option<String>,
) -> Result<(), String> {
    let store = store.ok_or_else(|| "no session storage to save the credential".to_string())?;
    let email = match email {
        Some(email) => email,
        None => prompt_line("Email: ")?,
    };
    let password = rpassword::prompt_password("Password: ")
        .map_err(|e| format!("failed to read password: {e}"))?;
    let authenticator = HttpAuthenticator::new(
        &config.gateway.server_url,
        Duration::from_secs(config.gateway.timeout_secs),
    );
    let credential = authenticator
        .sign_in(&email, &password)
        .await
        .map_err(|e| format!("sign-in failed: {e}"))?;
    store.save_credential(&credential)?;
    renderer.status(&format!("Signed in as {}", credential.email));
    Ok(())
}

fn prompt_line(label: &str) -> Result<String, String> {
    eprint!("{label}");
    std::io::stderr().flush().ok();
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .map_err(|e| format!("failed to read input: {e}"))?;
    Ok(line.trim().to_string())
}

/// JSON-lines protocol: one inbound message per stdin line, one event per
/// stdout line. EOF on stdin shuts the session down.
async fn run_stdio(orchestrator: Orchestrator, authenticator: Arc<dyn Authenticator>) {
    let (handle, mut events) = runtime::spawn_session(orchestrator, authenticator);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<InboundMessage>(&line) {
                            Ok(message) => {
                                if handle.send(message).await.is_err() {
                                    stdin_open = false;
                                }
                            }
                            Err(e) => write_event(&OutboundMessage::error(format!(
                                "invalid message: {e}"
                            ))),
                        }
                    }
                    Ok(None) | Err(_) => {
                        stdin_open = false;
                        let _ = handle.send(InboundMessage::Shutdown).await;
                    }
                }
            }
            event = events.recv() => {
                let Some(event) = event else {
                    break;
                };
                write_event(&event);
            }
        }
    }
}

fn write_event(event: &OutboundMessage) {
    match serde_json::to_string(event) {
        Ok(line) => {
            let mut stdout = std::io::stdout().lock();
            let _ = writeln!(stdout, "{line}");
            let _ = stdout.flush();
        }
        Err(e) => warn!(error = %e, "failed to encode event"),
    }
}

/// Send one prompt, then ask y/N for each approval until nothing is pending.
async fn run_one_shot(
    renderer: &Renderer,
    mut orchestrator: Orchestrator,
    prompt: &str,
) -> Result<(), i32> {
    let (event_tx, mut events) = mpsc::unbounded_channel();
    orchestrator.set_event_sink(Some(event_tx));

    let outcome = orchestrator.send(prompt).await;
    drain_events(renderer, &mut events);
    outcome.map_err(|_| 1)?;

    while let Some(pending) = orchestrator.pending().first().cloned() {
        let approved = match prompt_line("Approve? [y/N] ") {
            Ok(answer) => matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"),
            Err(msg) => {
                renderer.error(&msg);
                false
            }
        };
        let outcome = orchestrator.resolve(&pending.id, approved).await;
        drain_events(renderer, &mut events);
        outcome.map_err(|_| 1)?;
    }
    orchestrator.shutdown();
    Ok(())
}

fn drain_events(renderer: &Renderer, events: &mut mpsc::UnboundedReceiver<OutboundMessage>) {
    while let Ok(event) = events.try_recv() {
        renderer.event(&event);
    }
}

async fn run_repl(
    renderer: &Renderer,
    orchestrator: Orchestrator,
    authenticator: Arc<dyn Authenticator>,
) {
    let (handle, mut events) = runtime::spawn_session(orchestrator, authenticator);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending = PendingActions::default();
    let mut busy = false;
    let mut stdin_open = true;

    if handle.send(InboundMessage::Attach).await.is_err() {
        return;
    }
    renderer.prompt();

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open && !busy => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) | Err(_) => {
                        stdin_open = false;
                        let _ = handle.send(InboundMessage::Shutdown).await;
                        continue;
                    }
                };
                match repl_message(renderer, &line, &mut pending) {
                    ReplInput::Message(message) => {
                        busy = starts_cycle(&message);
                        if handle.send(message).await.is_err() {
                            break;
                        }
                        if !busy {
                            renderer.prompt();
                        }
                    }
                    ReplInput::Local => renderer.prompt(),
                    ReplInput::Quit => {
                        stdin_open = false;
                        let _ = handle.send(InboundMessage::Shutdown).await;
                    }
                }
            }
            event = events.recv() => {
                let Some(event) = event else {
                    break;
                };
                if let OutboundMessage::Action(prompt) = &event {
                    pending.push(prompt.clone());
                }
                if renderer.event(&event) && busy {
                    busy = false;
                    renderer.prompt();
                }
            }
        }
    }
}

enum ReplInput {
    Message(InboundMessage),
    Local,
    Quit,
}

fn starts_cycle(message: &InboundMessage) -> bool {
    matches!(
        message,
        InboundMessage::Send { .. }
            | InboundMessage::ApproveRun { .. }
            | InboundMessage::ApproveWrite { .. }
            | InboundMessage::Skip { .. }
    )
}

/// Translate one REPL line into a protocol message or a local action.
fn repl_message(renderer: &Renderer, line: &str, pending: &mut PendingActions) -> ReplInput {
    let Some(action) = repl::parse_slash_command(line) else {
        if line.trim().is_empty() {
            return ReplInput::Local;
        }
        return ReplInput::Message(InboundMessage::Send {
            message: line.to_string(),
        });
    };

    match action {
        SlashCommandAction::Quit => ReplInput::Quit,
        SlashCommandAction::Help => {
            eprintln!("{}", repl::help_text());
            ReplInput::Local
        }
        SlashCommandAction::Pending => {
            if pending.is_empty() {
                renderer.status("Nothing awaiting approval.");
            }
            pending.iter().for_each(|prompt| renderer.approval(prompt));
            ReplInput::Local
        }
        SlashCommandAction::Clear => {
            pending.clear();
            renderer.status("Conversation cleared.");
            ReplInput::Message(InboundMessage::ClearHistory)
        }
        SlashCommandAction::Approve(id) => resolve_pending(renderer, pending, id, true),
        SlashCommandAction::Skip(id) => resolve_pending(renderer, pending, id, false),
        SlashCommandAction::Login(email) => {
            let email = match email {
                Some(email) => email,
                None => match prompt_line("Email: ") {
                    Ok(email) => email,
                    Err(msg) => {
                        renderer.error(&msg);
                        return ReplInput::Local;
                    }
                },
            };
            match rpassword::prompt_password("Password: ") {
                Ok(password) => ReplInput::Message(InboundMessage::Login { email, password }),
                Err(e) => {
                    renderer.error(&format!("failed to read password: {e}"));
                    ReplInput::Local
                }
            }
        }
        SlashCommandAction::Logout => ReplInput::Message(InboundMessage::SignOut),
        SlashCommandAction::Unknown(name) => {
            renderer.warn(&format!("unknown command {name}; try /help"));
            ReplInput::Local
        }
    }
}

fn resolve_pending(
    renderer: &Renderer,
    pending: &mut PendingActions,
    id: Option<String>,
    approved: bool,
) -> ReplInput {
    let prompt: Option<ActionPrompt> = pending.take(id.as_deref());
    match prompt {
        Some(prompt) => ReplInput::Message(repl::resolution_message(prompt, approved)),
        None => {
            match id {
                Some(id) => renderer.warn(&format!("no pending action {id}")),
                None => renderer.warn("nothing awaiting approval"),
            }
            ReplInput::Local
        }
    }
}
