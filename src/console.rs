//! Terminal front end
//!
//! A line-oriented REPL over a `SessionHandle`. Input is read one line at a
//! time and never waits for answers; session events are printed by a
//! separate task as they arrive.

use crate::auth::Identity;
use crate::db::{HistoryRecord, Message};
use crate::runtime::{SessionError, SessionHandle, SessionSnapshot, UserPrompt};
use crate::state_machine::SessionEvent;
use dialoguer::{theme::ColorfulTheme, Confirm};
use tokio::sync::broadcast::{self, error::RecvError};

/// Confirmation and alerts on the controlling terminal
pub struct TerminalPrompt;

impl UserPrompt for TerminalPrompt {
    fn confirm(&self, question: &str) -> bool {
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(question)
            .default(false)
            .interact()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Confirmation prompt failed");
                false
            })
    }

    fn alert(&self, message: &str) {
        println!("! {message}");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ConsoleCommand {
    Submit(String),
    ToggleFeedback,
    NewChat,
    History,
    Open(String),
    Delete(String),
    Status,
    Quit,
    Unknown(String),
    Empty,
}

fn parse_line(line: &str) -> ConsoleCommand {
    let line = line.trim();
    if line.is_empty() {
        return ConsoleCommand::Empty;
    }
    if matches!(line, "exit" | "quit") {
        return ConsoleCommand::Quit;
    }
    let Some(command) = line.strip_prefix('/') else {
        return ConsoleCommand::Submit(line.to_string());
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };
    match (name, arg) {
        ("feedback", _) => ConsoleCommand::ToggleFeedback,
        ("new", _) => ConsoleCommand::NewChat,
        ("history", _) => ConsoleCommand::History,
        ("open", id) if !id.is_empty() => ConsoleCommand::Open(id.to_string()),
        ("delete", id) if !id.is_empty() => ConsoleCommand::Delete(id.to_string()),
        ("status", _) => ConsoleCommand::Status,
        ("quit", _) => ConsoleCommand::Quit,
        _ => ConsoleCommand::Unknown(line.to_string()),
    }
}

/// Run the REPL until `/quit` or end of input
pub async fn run(handle: SessionHandle, identity: Option<Identity>) -> Result<(), SessionError> {
    let printer = tokio::spawn(print_events(handle.subscribe()));

    if identity.is_none() {
        println!("! {}", crate::locale::SIGN_IN_REQUIRED);
    }
    // Fresh session: fetches the greeting and loads the history listing
    handle.new_chat(identity.clone()).await?;

    while let Some(line) = read_line().await {
        match parse_line(&line) {
            ConsoleCommand::Empty => {}
            ConsoleCommand::Submit(text) => handle.submit(identity.clone(), text).await?,
            ConsoleCommand::ToggleFeedback => handle.toggle_feedback().await?,
            ConsoleCommand::NewChat => handle.new_chat(identity.clone()).await?,
            ConsoleCommand::History => match handle.list_history(identity.clone()).await {
                Ok(records) => print!("{}", format_listing(&records)),
                Err(e) => eprintln!("error: {e}"),
            },
            ConsoleCommand::Open(id) => {
                if let Err(e) = handle.select_chat(identity.clone(), id).await {
                    eprintln!("error: {e}");
                }
            }
            ConsoleCommand::Delete(id) => match handle.delete_chat(identity.clone(), id).await {
                Ok(true) => println!("deleted"),
                Ok(false) => {}
                Err(SessionError::Stopped) => return Err(SessionError::Stopped),
                // Already alerted by the runtime
                Err(e) => tracing::debug!(error = %e, "Delete failed"),
            },
            ConsoleCommand::Status => print!("{}", format_status(&handle.snapshot().await?)),
            ConsoleCommand::Quit => break,
            ConsoleCommand::Unknown(line) => {
                println!("unknown command: {line}");
                println!("commands: /feedback /new /history /open <id> /delete <id> /status /quit");
            }
        }
    }

    handle.shutdown();
    printer.abort();
    Ok(())
}

async fn read_line() -> Option<String> {
    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        match std::io::stdin().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line),
        }
    })
    .await
    .ok()
    .flatten()
}

async fn print_events(mut events: broadcast::Receiver<SessionEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                if let Some(text) = render_event(&event) {
                    println!("{text}");
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Console fell behind session events");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

fn render_event(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::Speaking { answer } => Some(format!("mentor (speaking): {answer}")),
        SessionEvent::Revealed { message } => Some(render_message(message)),
        SessionEvent::Greeting { text } => Some(format!("mentor: {text}")),
        SessionEvent::ModeChanged { mode } => Some(format!("[mode: {}]", mode.name())),
        SessionEvent::SessionLoaded {
            record_id,
            messages,
        } => {
            let mut out = format!(
                "--- {} ---",
                record_id.as_deref().unwrap_or("new conversation")
            );
            for message in messages {
                out.push('\n');
                out.push_str(&render_message(message));
            }
            Some(out)
        }
        SessionEvent::Error { message } => Some(format!("error: {message}")),
        // The user typed these or already saw them as alerts
        SessionEvent::MessageAppended { .. }
        | SessionEvent::HistoryUpdated { .. }
        | SessionEvent::Notice { .. } => None,
    }
}

fn render_message(message: &Message) -> String {
    if message.is_answer {
        format!("mentor: {}", message.text)
    } else {
        format!("you: {}", message.text)
    }
}

fn format_listing(records: &[HistoryRecord]) -> String {
    if records.is_empty() {
        return "(no saved conversations)\n".to_string();
    }
    records
        .iter()
        .map(|r| {
            format!(
                "{}  {}  {}\n",
                r.id,
                r.updated_at.format("%Y-%m-%d %H:%M"),
                r.title
            )
        })
        .collect()
}

fn format_status(snapshot: &SessionSnapshot) -> String {
    let mut out = format!("session: #{}\nmode: {}", snapshot.generation, snapshot.mode.name());
    if let Some(query) = snapshot.bound_query() {
        out.push_str(&format!(" ({query})"));
    }
    out.push('\n');
    out.push_str(&format!(
        "record: {}\nmessages: {}\nlast question: {}\nsaved conversations: {}\n",
        snapshot.record_id.as_deref().unwrap_or("unsaved"),
        snapshot.messages.len(),
        snapshot.last_query.as_deref().unwrap_or("-"),
        snapshot.history.len(),
    ));
    if let Some(answer) = &snapshot.pending_display {
        out.push_str(&format!("speaking: {answer}\n"));
    } else if snapshot.busy {
        out.push_str("waiting for an answer\n");
    }
    if let Some(greeting) = &snapshot.greeting {
        out.push_str(&format!("greeting: {greeting}\n"));
    }
    out
}
