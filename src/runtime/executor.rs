//! Session runtime executor

use super::history::{HistoryError, HistorySync};
use super::presentation::PresentationScheduler;
use super::traits::{HistoryStore, UserPrompt};
use super::{Command, Input, SessionError, SessionSnapshot};

use crate::auth::{self, Identity};
use crate::db::HistoryRecord;
use crate::gateway::{AnswerGateway, AskReply, GatewayError};
use crate::locale;
use crate::state_machine::{transition, Effect, Event, GatewayRequest, SessionEvent, SessionState};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

/// Runtime that owns one live session and executes its effects
pub struct SessionRuntime<G, H, P>
where
    G: AnswerGateway + 'static,
    H: HistoryStore,
    P: UserPrompt + 'static,
{
    state: SessionState,
    gateway: Arc<G>,
    history: HistorySync<H>,
    prompt: Arc<P>,
    scheduler: PresentationScheduler,
    input_rx: mpsc::Receiver<Input>,
    input_tx: mpsc::Sender<Input>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
    shutdown: CancellationToken,
}

impl<G, H, P> SessionRuntime<G, H, P>
where
    G: AnswerGateway + 'static,
    H: HistoryStore,
    P: UserPrompt + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        gateway: G,
        history: HistorySync<H>,
        prompt: P,
        scheduler: PresentationScheduler,
        input_rx: mpsc::Receiver<Input>,
        input_tx: mpsc::Sender<Input>,
        broadcast_tx: broadcast::Sender<SessionEvent>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            state: SessionState::default(),
            gateway: Arc::new(gateway),
            history,
            prompt: Arc::new(prompt),
            scheduler,
            input_rx,
            input_tx,
            broadcast_tx,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        tracing::info!("Starting session runtime");

        // Process inputs in a loop - no recursion
        loop {
            tokio::select! {
                biased;

                () = self.shutdown.cancelled() => break,

                input = self.input_rx.recv() => match input {
                    Some(Input::Event(event)) => self.process_event(event).await,
                    Some(Input::Command(command)) => self.handle_command(command).await,
                    None => break,
                },
            }
        }

        tracing::info!(generation = self.state.generation, "Session runtime stopped");
    }

    async fn process_event(&mut self, event: Event) {
        // We need to process events in a loop to handle chained effects
        let mut events_to_process = vec![event];

        while let Some(current_event) = events_to_process.pop() {
            let name = current_event.name();

            // Pure state transition
            let result = match transition(&self.state, current_event) {
                Ok(r) => r,
                Err(e) if e.is_silent() => {
                    tracing::debug!(event = name, error = %e, "Event ignored");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(event = name, error = %e, "Transition rejected");
                    self.notify_user(locale::NO_QUESTION_FOR_FEEDBACK);
                    continue;
                }
            };

            self.state = result.new_state;

            // Execute effects and collect generated events
            for effect in result.effects {
                if let Some(generated_event) = self.execute_effect(effect).await {
                    events_to_process.push(generated_event);
                }
            }
        }
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::SelectChat {
                caller,
                record_id,
                reply,
            } => {
                let result = self.select_chat(caller.as_ref(), &record_id).await;
                let _ = reply.send(result);
            }
            Command::DeleteChat {
                caller,
                record_id,
                reply,
            } => {
                let result = self.delete_chat(caller.as_ref(), &record_id).await;
                let _ = reply.send(result);
            }
            Command::ListHistory { caller, reply } => {
                let result = self.list_history(caller.as_ref()).await;
                let _ = reply.send(result);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(SessionSnapshot::new(&self.state, self.history.listing()));
            }
        }
    }

    async fn select_chat(
        &mut self,
        caller: Option<&Identity>,
        record_id: &str,
    ) -> Result<(), SessionError> {
        let record = match self.history.find(record_id) {
            Some(record) => record.clone(),
            None => {
                // The listing may predate the record; look once more
                self.history.refresh(caller).await?;
                self.history
                    .find(record_id)
                    .cloned()
                    .ok_or_else(|| HistoryError::NotFound(record_id.to_string()))?
            }
        };

        tracing::info!(record_id = %record.id, "Opening stored conversation");
        self.process_event(Event::SelectChat { record }).await;
        Ok(())
    }

    async fn delete_chat(
        &mut self,
        caller: Option<&Identity>,
        record_id: &str,
    ) -> Result<bool, SessionError> {
        if let Err(e) = auth::require(caller) {
            tracing::warn!(record_id = %record_id, "Delete requested without a caller identity");
            self.notify_user(locale::SIGN_IN_REQUIRED);
            self.broadcast(SessionEvent::Error {
                message: e.to_string(),
            });
            return Err(HistoryError::from(e).into());
        }

        let prompt = Arc::clone(&self.prompt);
        let confirmed = tokio::task::spawn_blocking(move || prompt.confirm(locale::CONFIRM_DELETE))
            .await
            .unwrap_or(false);
        if !confirmed {
            tracing::debug!(record_id = %record_id, "Delete declined");
            return Ok(false);
        }

        match self.history.delete(caller, record_id).await {
            Ok(()) => {
                self.publish_listing();
                Ok(true)
            }
            Err(e) => {
                tracing::error!(record_id = %record_id, error = %e, "Failed to delete history record");
                self.notify_user(locale::DELETE_FAILED);
                self.broadcast(SessionEvent::Error {
                    message: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    async fn list_history(
        &mut self,
        caller: Option<&Identity>,
    ) -> Result<Vec<HistoryRecord>, SessionError> {
        let records = self.history.refresh(caller).await?.to_vec();
        self.publish_listing();
        Ok(records)
    }

    /// Execute an effect and optionally return a generated event
    async fn execute_effect(&mut self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::CallGateway {
                request,
                caller,
                generation,
            } => {
                self.spawn_gateway_call(request, caller, generation);
                None
            }

            Effect::ScheduleReveal { generation } => {
                self.scheduler.schedule(generation);
                None
            }

            Effect::PersistTranscript {
                caller,
                record_id,
                messages,
                generation,
            } => {
                match self
                    .history
                    .persist(caller.as_ref(), record_id.as_deref(), &messages)
                    .await
                {
                    Ok(record_id) => {
                        self.publish_listing();
                        Some(Event::TranscriptPersisted {
                            generation,
                            record_id,
                        })
                    }
                    Err(e) => {
                        // The in-memory transcript stays as it is
                        tracing::error!(generation, error = %e, "Failed to persist transcript");
                        self.broadcast(SessionEvent::Error {
                            message: format!("{}: {e}", locale::SAVE_FAILED),
                        });
                        None
                    }
                }
            }

            Effect::FetchGreeting { caller, generation } => {
                self.spawn_greeting(caller, generation);
                None
            }

            Effect::RefreshHistory { caller } => {
                match self.history.refresh(caller.as_ref()).await {
                    Ok(_) => self.publish_listing(),
                    Err(e) => tracing::warn!(error = %e, "Failed to refresh history"),
                }
                None
            }

            Effect::Notify(event) => {
                self.broadcast(event);
                None
            }
        }
    }

    /// Gateway calls run in the background and report back as `GatewayReply`
    fn spawn_gateway_call(
        &self,
        request: GatewayRequest,
        caller: Option<Identity>,
        generation: u64,
    ) {
        let gateway = Arc::clone(&self.gateway);
        let input_tx = self.input_tx.clone();

        tokio::spawn(async move {
            tracing::info!(
                operation = request.operation(),
                generation,
                "Calling answer gateway (background)"
            );

            let result = match auth::require(caller.as_ref()) {
                Ok(identity) => call_gateway(gateway.as_ref(), identity, &request).await,
                Err(missing) => Err(missing.into()),
            };

            if input_tx
                .send(Input::Event(Event::GatewayReply { generation, result }))
                .await
                .is_err()
            {
                tracing::debug!(generation, "Session stopped before gateway reply");
            }
        });
    }

    fn spawn_greeting(&self, caller: Option<Identity>, generation: u64) {
        let gateway = Arc::clone(&self.gateway);
        let input_tx = self.input_tx.clone();

        tokio::spawn(async move {
            let Ok(identity) = auth::require(caller.as_ref()) else {
                tracing::debug!(generation, "No caller, skipping greeting");
                return;
            };
            match gateway.greet(identity).await {
                Ok(greeting) => {
                    let _ = input_tx
                        .send(Input::Event(Event::GreetingReceived {
                            generation,
                            text: greeting.response,
                        }))
                        .await;
                }
                Err(e) => tracing::warn!(generation, error = %e, "Failed to fetch greeting"),
            }
        });
    }

    fn notify_user(&self, message: &str) {
        self.prompt.alert(message);
        self.broadcast(SessionEvent::Notice {
            message: message.to_string(),
        });
    }

    fn publish_listing(&self) {
        self.broadcast(SessionEvent::HistoryUpdated {
            records: self.history.listing().to_vec(),
        });
    }

    fn broadcast(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.broadcast_tx.send(event);
    }
}

async fn call_gateway<G: AnswerGateway + ?Sized>(
    gateway: &G,
    caller: &Identity,
    request: &GatewayRequest,
) -> Result<AskReply, GatewayError> {
    match request {
        GatewayRequest::Ask { question } => gateway.ask(caller, question).await,
        GatewayRequest::Teach {
            original_query,
            teach_response,
        } => gateway
            .teach(caller, original_query, teach_response)
            .await
            .map(AskReply::from),
        GatewayRequest::Feedback {
            original_query,
            feedback,
        } => gateway
            .feedback(caller, original_query, feedback)
            .await
            .map(AskReply::from),
    }
}
