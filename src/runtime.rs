//! Runtime for the live conversation session
//!
//! One task owns the `SessionState`. User operations and internal
//! completions (gateway replies, reveal timers, greetings) arrive on a
//! single ordered channel, so the state is only ever touched from that task.

mod executor;
mod history;
mod presentation;
pub mod traits;


pub use executor::SessionRuntime;
pub use history::{HistoryError, HistorySync};
pub use presentation::{PresentationScheduler, DEFAULT_REVEAL_DELAY};
pub use traits::*;

use crate::auth::Identity;
use crate::db::{HistoryRecord, Message};
use crate::gateway::AnswerGateway;
use crate::state_machine::{Event, Mode, SessionEvent, SessionState};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// Anything the runtime task consumes, in arrival order
#[derive(Debug)]
pub enum Input {
    /// Fed straight into the state machine
    Event(Event),
    /// Needs a reply or store I/O before the state machine is involved
    Command(Command),
}

/// Operations that answer the caller
#[derive(Debug)]
pub enum Command {
    SelectChat {
        caller: Option<Identity>,
        record_id: String,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    DeleteChat {
        caller: Option<Identity>,
        record_id: String,
        reply: oneshot::Sender<Result<bool, SessionError>>,
    },
    ListHistory {
        caller: Option<Identity>,
        reply: oneshot::Sender<Result<Vec<HistoryRecord>, SessionError>>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error("Session runtime has stopped")]
    Stopped,
}

/// Read-only view of the live session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub messages: Vec<Message>,
    pub mode: Mode,
    pub last_query: Option<String>,
    pub record_id: Option<String>,
    pub pending_display: Option<String>,
    pub greeting: Option<String>,
    pub busy: bool,
    pub generation: u64,
    /// Cached history listing, newest first
    pub history: Vec<HistoryRecord>,
}

impl SessionSnapshot {
    fn new(state: &SessionState, history: &[HistoryRecord]) -> Self {
        Self {
            messages: state.messages.clone(),
            mode: state.mode.clone(),
            last_query: state.last_query.clone(),
            record_id: state.record_id.clone(),
            pending_display: state.pending_display().map(String::from),
            greeting: state.greeting.clone(),
            busy: state.is_busy(),
            generation: state.generation,
            history: history.to_vec(),
        }
    }

    pub fn bound_query(&self) -> Option<&str> {
        self.mode.bound_query()
    }
}

/// Handle to interact with a running session
#[derive(Clone)]
pub struct SessionHandle {
    input_tx: mpsc::Sender<Input>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
    shutdown: CancellationToken,
}

impl SessionHandle {
    /// Submit user text
    ///
    /// Dropped by the runtime when empty or while a submission is in flight.
    pub async fn submit(
        &self,
        caller: Option<Identity>,
        text: impl Into<String>,
    ) -> Result<(), SessionError> {
        self.send_event(Event::UserSubmit {
            text: text.into(),
            caller,
        })
        .await
    }

    pub async fn toggle_feedback(&self) -> Result<(), SessionError> {
        self.send_event(Event::ToggleFeedback).await
    }

    /// Save the current transcript, then start an empty session
    pub async fn new_chat(&self, caller: Option<Identity>) -> Result<(), SessionError> {
        self.send_event(Event::NewChat { caller }).await
    }

    /// Replace the live session with a stored record
    pub async fn select_chat(
        &self,
        caller: Option<Identity>,
        record_id: impl Into<String>,
    ) -> Result<(), SessionError> {
        let record_id = record_id.into();
        self.request(|reply| Command::SelectChat {
            caller,
            record_id,
            reply,
        })
        .await?
    }

    /// Delete a stored record after the user confirms
    ///
    /// Returns `false` when the user declined.
    pub async fn delete_chat(
        &self,
        caller: Option<Identity>,
        record_id: impl Into<String>,
    ) -> Result<bool, SessionError> {
        let record_id = record_id.into();
        self.request(|reply| Command::DeleteChat {
            caller,
            record_id,
            reply,
        })
        .await?
    }

    pub async fn list_history(
        &self,
        caller: Option<Identity>,
    ) -> Result<Vec<HistoryRecord>, SessionError> {
        self.request(|reply| Command::ListHistory { caller, reply })
            .await?
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.broadcast_tx.subscribe()
    }

    /// Stop the runtime task; pending timers and replies are discarded
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    async fn send_event(&self, event: Event) -> Result<(), SessionError> {
        self.input_tx
            .send(Input::Event(event))
            .await
            .map_err(|_| SessionError::Stopped)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.input_tx
            .send(Input::Command(build(reply_tx)))
            .await
            .map_err(|_| SessionError::Stopped)?;
        reply_rx.await.map_err(|_| SessionError::Stopped)
    }
}

/// Start a session runtime on its own task
pub fn spawn_session<G, H, P>(
    gateway: G,
    store: H,
    prompt: P,
    reveal_delay: Duration,
) -> SessionHandle
where
    G: AnswerGateway + 'static,
    H: HistoryStore + 'static,
    P: UserPrompt + 'static,
{
    let (input_tx, input_rx) = mpsc::channel(64);
    let (broadcast_tx, _) = broadcast::channel(256);
    let shutdown = CancellationToken::new();

    let runtime = SessionRuntime::new(
        gateway,
        HistorySync::new(store),
        prompt,
        PresentationScheduler::new(reveal_delay, input_tx.clone()),
        input_rx,
        input_tx.clone(),
        broadcast_tx.clone(),
        shutdown.clone(),
    );
    tokio::spawn(runtime.run());

    SessionHandle {
        input_tx,
        broadcast_tx,
        shutdown,
    }
}
