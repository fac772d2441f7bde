//! Events that can occur in a session

use crate::auth::Identity;
use crate::db::HistoryRecord;
use crate::gateway::{AskReply, GatewayError};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    UserSubmit {
        text: String,
        caller: Option<Identity>,
    },
    ToggleFeedback,
    NewChat {
        caller: Option<Identity>,
    },
    SelectChat {
        record: HistoryRecord,
    },

    // Gateway events
    GatewayReply {
        generation: u64,
        result: Result<AskReply, GatewayError>,
    },
    GreetingReceived {
        generation: u64,
        text: String,
    },

    // Presentation events
    RevealDue {
        generation: u64,
    },

    // History events
    TranscriptPersisted {
        generation: u64,
        record_id: String,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::UserSubmit { .. } => "user_submit",
            Event::ToggleFeedback => "toggle_feedback",
            Event::NewChat { .. } => "new_chat",
            Event::SelectChat { .. } => "select_chat",
            Event::GatewayReply { .. } => "gateway_reply",
            Event::GreetingReceived { .. } => "greeting_received",
            Event::RevealDue { .. } => "reveal_due",
            Event::TranscriptPersisted { .. } => "transcript_persisted",
        }
    }
}
