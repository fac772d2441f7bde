//! Session state types

use crate::auth::Identity;
use crate::db::Message;

// ============================================================================
// Mode
// ============================================================================

/// Interaction mode
///
/// `Teaching` and `Feedback` carry the question the next submission will be
/// attached to, so a correction mode without a bound query cannot exist.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Mode {
    /// Plain question answering
    #[default]
    Normal,
    /// The service asked to be taught the answer to `query`
    Teaching { query: String },
    /// The user is giving feedback on the answer to `query`
    Feedback { query: String },
}

impl Mode {
    pub fn bound_query(&self) -> Option<&str> {
        match self {
            Mode::Normal => None,
            Mode::Teaching { query } | Mode::Feedback { query } => Some(query),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Mode::Normal => "normal",
            Mode::Teaching { .. } => "teaching",
            Mode::Feedback { .. } => "feedback",
        }
    }
}

// ============================================================================
// Outbound requests
// ============================================================================

/// A gateway call issued for one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayRequest {
    Ask {
        question: String,
    },
    Teach {
        original_query: String,
        teach_response: String,
    },
    Feedback {
        original_query: String,
        feedback: String,
    },
}

impl GatewayRequest {
    pub fn operation(&self) -> &'static str {
        match self {
            GatewayRequest::Ask { .. } => "ask",
            GatewayRequest::Teach { .. } => "teach",
            GatewayRequest::Feedback { .. } => "feedback",
        }
    }
}

// ============================================================================
// Session State
// ============================================================================

/// Where the current submission is
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    /// Ready for input
    #[default]
    Idle,

    /// Gateway call in flight
    AwaitingAnswer {
        request: GatewayRequest,
        caller: Option<Identity>,
    },

    /// Answer received and shown as speech, not yet in the transcript
    Speaking {
        answer: String,
        caller: Option<Identity>,
    },
}

/// State of the one live conversation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    /// The transcript, in display order
    pub messages: Vec<Message>,
    pub mode: Mode,
    pub phase: Phase,
    /// Most recent question asked in `Normal` mode
    pub last_query: Option<String>,
    /// Persisted record this session mirrors, once it has been saved
    pub record_id: Option<String>,
    /// Bumped whenever the live session is replaced; completions tagged with
    /// an older generation are dropped
    pub generation: u64,
    pub greeting: Option<String>,
}

impl SessionState {
    /// Busy guard: a gateway call or a reveal is outstanding
    pub fn is_busy(&self) -> bool {
        !matches!(self.phase, Phase::Idle)
    }

    /// Answer currently shown as speech
    pub fn pending_display(&self) -> Option<&str> {
        match &self.phase {
            Phase::Speaking { answer, .. } => Some(answer),
            _ => None,
        }
    }

    pub fn bound_query(&self) -> Option<&str> {
        self.mode.bound_query()
    }

    /// Fresh session replacing this one
    pub fn next_session(&self) -> Self {
        Self {
            generation: self.generation + 1,
            ..Self::default()
        }
    }
}
