//! Presentation scheduler
//!
//! Holds a received answer as speech for a fixed window before it is
//! revealed into the transcript. The timer only posts `RevealDue` tagged
//! with the session generation; the reveal itself is applied by the state
//! machine against whatever the live state is when the event arrives.

use super::Input;
use crate::state_machine::Event;
use std::time::Duration;
use tokio::sync::mpsc;

/// Default speaking window
pub const DEFAULT_REVEAL_DELAY: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct PresentationScheduler {
    delay: Duration,
    input_tx: mpsc::Sender<Input>,
}

impl PresentationScheduler {
    pub fn new(delay: Duration, input_tx: mpsc::Sender<Input>) -> Self {
        Self { delay, input_tx }
    }

    /// Post `RevealDue { generation }` once the delay has elapsed
    pub fn schedule(&self, generation: u64) {
        let delay = self.delay;
        let input_tx = self.input_tx.clone();
        tracing::debug!(generation, delay_ms = %delay.as_millis(), "Reveal scheduled");

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if input_tx
                .send(Input::Event(Event::RevealDue { generation }))
                .await
                .is_err()
            {
                tracing::debug!(generation, "Session stopped before reveal");
            }
        });
    }
}
