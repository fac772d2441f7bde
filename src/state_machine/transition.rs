//! Pure state transition function

use super::{Effect, Event, GatewayRequest, Mode, Phase, SessionEvent, SessionState};
use crate::auth::Identity;
use crate::db::{HistoryRecord, Message};
use crate::gateway::{AnswerStatus, AskReply, GatewayError, GatewayErrorKind};
use crate::locale;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SessionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("A submission is already in flight")]
    Busy,
    #[error("Nothing to submit")]
    EmptyInput,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
    #[error("Completion for replaced session (generation {0})")]
    Stale(u64),
}

impl TransitionError {
    /// Rejections the user should never be told about
    pub fn is_silent(&self) -> bool {
        !matches!(self, TransitionError::InvalidTransition(_))
    }
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs, with no I/O.
pub fn transition(state: &SessionState, event: Event) -> Result<TransitionResult, TransitionError> {
    match event {
        // ============================================================
        // User Events
        // ============================================================
        Event::UserSubmit { text, caller } => submit(state, &text, caller),

        Event::ToggleFeedback => toggle_feedback(state),

        Event::NewChat { caller } => Ok(new_chat(state, caller)),

        Event::SelectChat { record } => Ok(select_chat(state, record)),

        // ============================================================
        // Completions
        // ============================================================
        Event::GatewayReply { generation, result } => {
            if generation != state.generation {
                return Err(TransitionError::Stale(generation));
            }
            gateway_reply(state, result)
        }

        Event::RevealDue { generation } => {
            if generation != state.generation {
                return Err(TransitionError::Stale(generation));
            }
            reveal(state)
        }

        Event::GreetingReceived { generation, text } => {
            if generation != state.generation {
                return Err(TransitionError::Stale(generation));
            }
            let mut next = state.clone();
            next.greeting = Some(text.clone());
            Ok(TransitionResult::new(next)
                .with_effect(Effect::Notify(SessionEvent::Greeting { text })))
        }

        Event::TranscriptPersisted {
            generation,
            record_id,
        } => {
            if generation != state.generation {
                return Err(TransitionError::Stale(generation));
            }
            let mut next = state.clone();
            next.record_id = Some(record_id);
            Ok(TransitionResult::new(next))
        }
    }
}

fn submit(
    state: &SessionState,
    text: &str,
    caller: Option<Identity>,
) -> Result<TransitionResult, TransitionError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(TransitionError::EmptyInput);
    }
    if state.is_busy() {
        return Err(TransitionError::Busy);
    }

    let mut next = state.clone();
    let message = Message::question(text);
    next.messages.push(message.clone());

    // Teaching and feedback are single-shot: back to Normal as soon as the
    // correction is sent, whatever the gateway answers
    let request = match &state.mode {
        Mode::Normal => {
            next.last_query = Some(text.to_string());
            GatewayRequest::Ask {
                question: text.to_string(),
            }
        }
        Mode::Teaching { query } => {
            next.mode = Mode::Normal;
            GatewayRequest::Teach {
                original_query: query.clone(),
                teach_response: text.to_string(),
            }
        }
        Mode::Feedback { query } => {
            next.mode = Mode::Normal;
            GatewayRequest::Feedback {
                original_query: query.clone(),
                feedback: text.to_string(),
            }
        }
    };

    next.phase = Phase::AwaitingAnswer {
        request: request.clone(),
        caller: caller.clone(),
    };

    let mut effects = vec![Effect::Notify(SessionEvent::MessageAppended { message })];
    if next.mode != state.mode {
        effects.push(Effect::notify_mode(&next.mode));
    }
    effects.push(Effect::CallGateway {
        request,
        caller,
        generation: state.generation,
    });

    Ok(TransitionResult::new(next).with_effects(effects))
}

fn toggle_feedback(state: &SessionState) -> Result<TransitionResult, TransitionError> {
    if state.is_busy() {
        return Err(TransitionError::Busy);
    }

    let mode = match (&state.mode, &state.last_query) {
        (Mode::Feedback { .. }, _) => Mode::Normal,
        (Mode::Normal | Mode::Teaching { .. }, Some(query)) => Mode::Feedback {
            query: query.clone(),
        },
        (Mode::Normal | Mode::Teaching { .. }, None) => {
            return Err(TransitionError::InvalidTransition(
                "feedback needs a previous question".to_string(),
            ));
        }
    };

    let mut next = state.clone();
    next.mode = mode;
    let effect = Effect::notify_mode(&next.mode);
    Ok(TransitionResult::new(next).with_effect(effect))
}

fn new_chat(state: &SessionState, caller: Option<Identity>) -> TransitionResult {
    let mut effects = Vec::new();
    if !state.messages.is_empty() {
        effects.push(Effect::PersistTranscript {
            caller: caller.clone(),
            record_id: state.record_id.clone(),
            messages: state.messages.clone(),
            generation: state.generation,
        });
    }

    let next = state.next_session();
    effects.extend([
        Effect::Notify(SessionEvent::SessionLoaded {
            record_id: None,
            messages: vec![],
        }),
        Effect::FetchGreeting {
            caller: caller.clone(),
            generation: next.generation,
        },
        Effect::RefreshHistory { caller },
    ]);

    TransitionResult::new(next).with_effects(effects)
}

fn select_chat(state: &SessionState, record: HistoryRecord) -> TransitionResult {
    let mut next = state.next_session();
    next.last_query = record.last_question().map(String::from);
    next.record_id = Some(record.id);
    next.messages = record.messages;

    let effect = Effect::Notify(SessionEvent::SessionLoaded {
        record_id: next.record_id.clone(),
        messages: next.messages.clone(),
    });
    TransitionResult::new(next).with_effect(effect)
}

fn gateway_reply(
    state: &SessionState,
    result: Result<AskReply, GatewayError>,
) -> Result<TransitionResult, TransitionError> {
    let Phase::AwaitingAnswer { request, caller } = &state.phase else {
        return Err(TransitionError::Stale(state.generation));
    };

    let (answer, teach_query) = resolve_answer(request, result);

    let mut next = state.clone();
    next.phase = Phase::Speaking {
        answer: answer.clone(),
        caller: caller.clone(),
    };

    let mut effects = vec![Effect::Notify(SessionEvent::Speaking { answer })];
    if let Some(query) = teach_query {
        next.mode = Mode::Teaching { query };
        effects.push(Effect::notify_mode(&next.mode));
    }
    effects.push(Effect::ScheduleReveal {
        generation: state.generation,
    });

    Ok(TransitionResult::new(next).with_effects(effects))
}

/// Answer text to present, plus the query to bind if the service asked to be taught
///
/// Failures become a fixed answer and go through the same presentation path.
fn resolve_answer(
    request: &GatewayRequest,
    result: Result<AskReply, GatewayError>,
) -> (String, Option<String>) {
    let reply = match result {
        Ok(reply) if reply.status != AnswerStatus::Error => reply,
        Ok(_) => return (locale::ANSWER_FAILED.to_string(), None),
        Err(GatewayError {
            kind: GatewayErrorKind::AuthenticationMissing,
            ..
        }) => return (locale::SIGN_IN_REQUIRED.to_string(), None),
        Err(_) => return (locale::ANSWER_FAILED.to_string(), None),
    };

    let teach_query = match request {
        GatewayRequest::Ask { question } if reply.status == AnswerStatus::TeachMe => Some(
            reply
                .query
                .filter(|q| !q.trim().is_empty())
                .unwrap_or_else(|| question.clone()),
        ),
        _ => None,
    };

    let answer = if reply.answer.trim().is_empty() {
        locale::ANSWER_FAILED.to_string()
    } else {
        reply.answer
    };

    (answer, teach_query)
}

fn reveal(state: &SessionState) -> Result<TransitionResult, TransitionError> {
    let Phase::Speaking { answer, caller } = &state.phase else {
        return Err(TransitionError::Stale(state.generation));
    };

    // Append to the transcript as it is now, not as it was when the
    // question went out
    let mut next = state.clone();
    let message = Message::answer(answer.clone());
    next.messages.push(message.clone());
    next.phase = Phase::Idle;

    let persist = Effect::PersistTranscript {
        caller: caller.clone(),
        record_id: next.record_id.clone(),
        messages: next.messages.clone(),
        generation: next.generation,
    };

    Ok(TransitionResult::new(next)
        .with_effect(Effect::Notify(SessionEvent::Revealed { message }))
        .with_effect(persist))
}
