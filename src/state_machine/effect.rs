//! Effects produced by state transitions

use crate::auth::Identity;
use crate::db::{HistoryRecord, Message};
use crate::state_machine::state::{GatewayRequest, Mode};

/// Effects to be executed after state transition
#[derive(Debug, Clone)]
pub enum Effect {
    /// Call the answer gateway (spawns as background task)
    CallGateway {
        request: GatewayRequest,
        caller: Option<Identity>,
        generation: u64,
    },

    /// Start the presentation delay for the answer being spoken
    ScheduleReveal { generation: u64 },

    /// Mirror a transcript into the history store
    ///
    /// Carries the transcript as it was when the transition ran, which is
    /// the live state at that instant.
    PersistTranscript {
        caller: Option<Identity>,
        record_id: Option<String>,
        messages: Vec<Message>,
        generation: u64,
    },

    /// Fetch the greeting for a session start
    FetchGreeting {
        caller: Option<Identity>,
        generation: u64,
    },

    /// Reload the cached history listing
    RefreshHistory { caller: Option<Identity> },

    /// Publish to subscribers
    Notify(SessionEvent),
}

impl Effect {
    pub fn notify_mode(mode: &Mode) -> Self {
        Effect::Notify(SessionEvent::ModeChanged { mode: mode.clone() })
    }
}

/// Events published to session subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A user message was appended to the transcript
    MessageAppended { message: Message },
    /// An answer arrived and the avatar is speaking it
    Speaking { answer: String },
    /// The spoken answer moved into the transcript
    Revealed { message: Message },
    ModeChanged { mode: Mode },
    Greeting { text: String },
    /// The live session was replaced (new chat or opened record)
    SessionLoaded {
        record_id: Option<String>,
        messages: Vec<Message>,
    },
    HistoryUpdated { records: Vec<HistoryRecord> },
    /// Something the user must be told about
    Notice { message: String },
    Error { message: String },
}
