//! Session state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions:
//! `transition` never performs I/O, it only describes it as `Effect`s.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{Effect, SessionEvent};
pub use event::Event;
pub use state::{GatewayRequest, Mode, Phase, SessionState};
pub use transition::{transition, TransitionError, TransitionResult};
