//! Property-based tests for the state machine
//!
//! A harness drives random user actions and delivers outstanding gateway
//! replies and reveal timers in arbitrary order, including after the
//! session they belong to has been replaced.

use super::state::*;
use super::transition::*;
use super::*;
use crate::auth::Identity;
use crate::db::{HistoryRecord, Message};
use crate::gateway::{AnswerStatus, AskReply, GatewayError};
use chrono::Utc;
use proptest::prelude::*;
use proptest::sample::Index;

// ============================================================================
// Test Harness
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum ReplyKind {
    Success,
    TeachMe,
    ErrorTagged,
    Unreachable,
}

#[derive(Debug, Clone)]
enum Action {
    Submit(String),
    ToggleFeedback,
    NewChat,
    SelectChat(usize),
    Deliver(Index, ReplyKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Reply { generation: u64 },
    Reveal { generation: u64 },
}

struct Harness {
    state: SessionState,
    pending: Vec<Pending>,
    next_record: u32,
}

impl Harness {
    fn new() -> Self {
        Self {
            state: SessionState::default(),
            pending: Vec::new(),
            next_record: 0,
        }
    }

    fn apply(&mut self, event: Event) -> Result<(), TransitionError> {
        let result = transition(&self.state, event)?;
        self.state = result.new_state;

        let mut bind = None;
        for effect in result.effects {
            match effect {
                Effect::CallGateway { generation, .. } => {
                    self.pending.push(Pending::Reply { generation });
                }
                Effect::ScheduleReveal { generation } => {
                    self.pending.push(Pending::Reveal { generation });
                }
                Effect::PersistTranscript {
                    record_id: None,
                    generation,
                    ..
                } => bind = Some(generation),
                _ => {}
            }
        }

        // Persistence succeeds immediately and reports the new id back
        if let Some(generation) = bind {
            self.next_record += 1;
            let _ = self.apply(Event::TranscriptPersisted {
                generation,
                record_id: format!("rec-{}", self.next_record),
            });
        }
        Ok(())
    }
}

fn caller() -> Option<Identity> {
    Some(Identity::new("uid-1", "token"))
}

fn sample_record(pairs: usize) -> HistoryRecord {
    let messages = (0..=pairs)
        .flat_map(|i| [Message::question(format!("q{i}")), Message::answer(format!("a{i}"))])
        .collect();
    HistoryRecord {
        id: format!("stored-{pairs}"),
        title: "q0".to_string(),
        messages,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn reply_result(kind: ReplyKind) -> Result<AskReply, GatewayError> {
    match kind {
        ReplyKind::Success => Ok(AskReply::success("answer")),
        ReplyKind::TeachMe => Ok(AskReply::teach_me("teach me", "normalized")),
        ReplyKind::ErrorTagged => Ok(AskReply {
            answer: String::new(),
            status: AnswerStatus::Error,
            query: None,
        }),
        ReplyKind::Unreachable => Err(GatewayError::unreachable("down")),
    }
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_reply_kind() -> impl Strategy<Value = ReplyKind> {
    prop_oneof![
        3 => Just(ReplyKind::Success),
        2 => Just(ReplyKind::TeachMe),
        1 => Just(ReplyKind::ErrorTagged),
        1 => Just(ReplyKind::Unreachable),
    ]
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        4 => "[a-z ]{0,12}".prop_map(Action::Submit),
        1 => Just(Action::ToggleFeedback),
        1 => Just(Action::NewChat),
        1 => (0usize..3).prop_map(Action::SelectChat),
        5 => (any::<Index>(), arb_reply_kind()).prop_map(|(i, k)| Action::Deliver(i, k)),
    ]
}

// ============================================================================
// Invariants
// ============================================================================

fn check_invariants(state: &SessionState) -> Result<(), TestCaseError> {
    // A correction mode always has something to correct
    if let Some(query) = state.bound_query() {
        prop_assert!(!query.trim().is_empty());
    }

    // Every answer lands right after the question it answers, in the
    // session that asked it
    for (i, message) in state.messages.iter().enumerate() {
        prop_assert_eq!(message.is_answer, i % 2 == 1, "transcript {:?}", state.messages);
    }
    if state.is_busy() {
        prop_assert_eq!(state.messages.len() % 2, 1);
    } else {
        prop_assert_eq!(state.messages.len() % 2, 0);
    }

    prop_assert_eq!(state.pending_display().is_some(), matches!(state.phase, Phase::Speaking { .. }));
    Ok(())
}

fn run_action(harness: &mut Harness, action: Action) -> Result<(), TestCaseError> {
    let before = harness.state.clone();

    match action {
        Action::Submit(text) => {
            let result = harness.apply(Event::UserSubmit {
                text: text.clone(),
                caller: caller(),
            });
            if text.trim().is_empty() {
                prop_assert_eq!(result, Err(TransitionError::EmptyInput));
            } else if before.is_busy() {
                prop_assert_eq!(result, Err(TransitionError::Busy));
            } else {
                prop_assert!(result.is_ok());
                prop_assert_eq!(harness.state.messages.len(), before.messages.len() + 1);
                if matches!(before.mode, Mode::Normal) {
                    prop_assert_eq!(harness.state.last_query.as_deref(), Some(text.trim()));
                } else {
                    prop_assert_eq!(&harness.state.last_query, &before.last_query);
                    prop_assert_eq!(&harness.state.mode, &Mode::Normal);
                }
            }
        }
        Action::ToggleFeedback => {
            let result = harness.apply(Event::ToggleFeedback);
            let has_query = before.last_query.is_some();
            match (&before.mode, before.is_busy()) {
                (_, true) => prop_assert_eq!(result, Err(TransitionError::Busy)),
                (Mode::Feedback { .. }, false) => prop_assert_eq!(&harness.state.mode, &Mode::Normal),
                (_, false) if has_query => {
                    prop_assert_eq!(harness.state.bound_query(), before.last_query.as_deref());
                }
                (_, false) => {
                    prop_assert!(matches!(result, Err(TransitionError::InvalidTransition(_))));
                }
            }
        }
        Action::NewChat => {
            harness.apply(Event::NewChat { caller: caller() }).map_err(|e| {
                TestCaseError::fail(format!("new chat rejected: {e}"))
            })?;
            prop_assert!(harness.state.messages.is_empty());
            prop_assert_eq!(&harness.state.mode, &Mode::Normal);
            prop_assert!(harness.state.record_id.is_none());
            prop_assert_eq!(harness.state.generation, before.generation + 1);
        }
        Action::SelectChat(pairs) => {
            let record = sample_record(pairs);
            let id = record.id.clone();
            harness
                .apply(Event::SelectChat { record })
                .map_err(|e| TestCaseError::fail(format!("select rejected: {e}")))?;
            prop_assert_eq!(harness.state.record_id.as_deref(), Some(id.as_str()));
            prop_assert!(!harness.state.is_busy());
            prop_assert_eq!(harness.state.generation, before.generation + 1);
        }
        Action::Deliver(index, kind) => {
            if harness.pending.is_empty() {
                return Ok(());
            }
            let item = harness.pending.remove(index.index(harness.pending.len()));
            let (event, generation) = match item {
                Pending::Reply { generation } => (
                    Event::GatewayReply {
                        generation,
                        result: reply_result(kind),
                    },
                    generation,
                ),
                Pending::Reveal { generation } => (Event::RevealDue { generation }, generation),
            };

            let result = harness.apply(event);
            if generation == before.generation {
                prop_assert!(result.is_ok());
            } else {
                // Completions for replaced sessions never touch the live one
                prop_assert_eq!(&result, &Err(TransitionError::Stale(generation)));
                prop_assert_eq!(&harness.state, &before);
            }

            if let (Ok(()), Phase::AwaitingAnswer { request, .. }) = (&result, &before.phase) {
                if !matches!(request, GatewayRequest::Ask { .. }) {
                    prop_assert_eq!(&harness.state.mode, &Mode::Normal);
                }
            }
        }
    }

    prop_assert!(harness.state.generation >= before.generation);
    if harness.state.generation == before.generation && before.record_id.is_some() {
        // Once a session is bound to a record it stays bound
        prop_assert_eq!(&harness.state.record_id, &before.record_id);
    }
    check_invariants(&harness.state)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn prop_session_invariants_hold(actions in proptest::collection::vec(arb_action(), 1..60)) {
        let mut harness = Harness::new();
        for action in actions {
            run_action(&mut harness, action)?;
        }
    }

    #[test]
    fn prop_busy_session_rejects_every_submission(
        text in "[a-z]{1,10}",
        second in "[a-z ]{0,10}",
        speaking in any::<bool>(),
    ) {
        let mut harness = Harness::new();
        harness.apply(Event::UserSubmit { text, caller: caller() }).unwrap();
        if speaking {
            let generation = harness.state.generation;
            harness.apply(Event::GatewayReply { generation, result: Ok(AskReply::success("a")) }).unwrap();
        }

        let before = harness.state.clone();
        let result = transition(&before, Event::UserSubmit { text: second, caller: caller() });
        prop_assert!(matches!(result, Err(TransitionError::Busy | TransitionError::EmptyInput)));
        prop_assert_eq!(harness.state, before);
    }

    #[test]
    fn prop_record_id_assigned_once_per_session(rounds in 1usize..6) {
        let mut harness = Harness::new();
        for i in 0..rounds {
            harness.apply(Event::UserSubmit { text: format!("q{i}"), caller: caller() }).unwrap();
            let generation = harness.state.generation;
            harness.apply(Event::GatewayReply { generation, result: Ok(AskReply::success("a")) }).unwrap();
            harness.apply(Event::RevealDue { generation }).unwrap();
        }
        prop_assert_eq!(harness.next_record, 1);
        prop_assert_eq!(harness.state.record_id.as_deref(), Some("rec-1"));
        prop_assert_eq!(harness.state.messages.len(), rounds * 2);
    }
}
