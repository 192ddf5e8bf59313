//! Consent service — the command loop that owns the session registry.
//!
//! One task reads bridge commands, acks each on acceptance, and spawns at
//! most one session driver per request kind. A second request of an active
//! kind supersedes the old session: it is cancelled and its null terminal
//! event is flushed before the new session starts, so the host always sees
//! the old result strictly before anything from the new session.
//!
//! Shutting the service down (token or bridge closure) retires every active
//! session the same way — no session ever ends without its event.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::bridge::{CommandMessage, ConsentBus, ConsentCommand};
use crate::core::config::BrokerConfig;
use crate::platform::{ComponentIdentity, ConsentBroker, HintPicker, ListenFilter, PromptHost};

use super::dispatch::ResultDispatcher;
use super::session::{
    HintSessionCtx, SmsSessionCtx, run_hint_session, run_sms_session,
};
use super::{ConsentOutcome, RequestKind};

// ── Active sessions ──────────────────────────────────────────────────────────

struct ActiveSession {
    id: Uuid,
    cancel: CancellationToken,
    done: JoinHandle<()>,
}

/// Cancel the slot's session, if any, and wait for its terminal event to
/// flush. Awaiting an already-finished driver returns immediately.
async fn retire(slot: &mut Option<ActiveSession>) {
    if let Some(active) = slot.take() {
        debug!(session = %active.id, "retiring in-flight session");
        active.cancel.cancel();
        if active.done.await.is_err() {
            warn!(session = %active.id, "session driver panicked during retirement");
        }
    }
}

// ── ConsentService ───────────────────────────────────────────────────────────

pub struct ConsentService {
    broker: Arc<dyn ConsentBroker>,
    prompt: Arc<dyn PromptHost>,
    picker: Arc<dyn HintPicker>,
    trusted: ComponentIdentity,
    listen_to_other_apps: bool,
    bus: ConsentBus,
    sms: Option<ActiveSession>,
    hint: Option<ActiveSession>,
}

impl ConsentService {
    pub fn new(
        broker: Arc<dyn ConsentBroker>,
        prompt: Arc<dyn PromptHost>,
        picker: Arc<dyn HintPicker>,
        bus: ConsentBus,
        config: &BrokerConfig,
    ) -> Self {
        Self {
            broker,
            prompt,
            picker,
            trusted: config.trusted_identity(),
            listen_to_other_apps: config.listen_to_other_apps,
            bus,
            sms: None,
            hint: None,
        }
    }

    /// Run the command loop until `shutdown` is cancelled or the host drops
    /// its bridge handle. Active sessions are retired before returning.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(trusted = %self.trusted, "consent service ready");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("consent service shutting down");
                    break;
                }

                msg = self.bus.command_rx.recv() => {
                    let Some(CommandMessage { command, ack_tx }) = msg else {
                        info!("bridge closed, consent service exiting");
                        break;
                    };

                    debug!(?command, "bridge command received");
                    self.handle_command(command, &shutdown).await;
                    // The caller contract: every accepted command gets an
                    // immediate empty ack; results follow as events.
                    let _ = ack_tx.send(());
                }
            }
        }

        retire(&mut self.sms).await;
        retire(&mut self.hint).await;
    }

    async fn handle_command(&mut self, command: ConsentCommand, shutdown: &CancellationToken) {
        match command {
            ConsentCommand::RequestSms {
                sender_phone_number,
            } => self.start_sms(sender_phone_number, shutdown).await,
            ConsentCommand::RequestPhoneNumber => self.start_hint(shutdown).await,
        }
    }

    async fn start_sms(&mut self, sender: Option<String>, shutdown: &CancellationToken) {
        retire(&mut self.sms).await;

        let id = Uuid::now_v7();
        let dispatcher = ResultDispatcher::new(self.bus.event_tx.clone());
        let filter = ListenFilter {
            sender,
            exported: self.listen_to_other_apps,
        };

        let subscription = match self.broker.start_listening(&filter) {
            Ok(subscription) => subscription,
            Err(e) => {
                warn!(session = %id, error = %e, "broker refused listen request");
                dispatcher
                    .dispatch(ConsentOutcome::denied(RequestKind::SmsConsent))
                    .await;
                return;
            }
        };

        let cancel = shutdown.child_token();
        let done = tokio::spawn(run_sms_session(SmsSessionCtx {
            id,
            subscription,
            prompt: self.prompt.clone(),
            trusted: self.trusted.clone(),
            dispatcher,
            cancel: cancel.clone(),
        }));

        self.sms = Some(ActiveSession { id, cancel, done });
    }

    async fn start_hint(&mut self, shutdown: &CancellationToken) {
        retire(&mut self.hint).await;

        let id = Uuid::now_v7();
        let cancel = shutdown.child_token();
        let done = tokio::spawn(run_hint_session(HintSessionCtx {
            id,
            picker: self.picker.clone(),
            dispatcher: ResultDispatcher::new(self.bus.event_tx.clone()),
            cancel: cancel.clone(),
        }));

        self.hint = Some(ActiveSession { id, cancel, done });
    }
}
