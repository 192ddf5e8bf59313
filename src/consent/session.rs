//! Session state machine and per-session driver tasks.
//!
//! The transition logic lives in [`SmsSessionFsm`], a plain synchronous
//! type, so every edge of the machine is testable without a runtime. The
//! async drivers own the plumbing: pumping the subscription, launching the
//! prompt, and the release-then-dispatch teardown sequence that every exit
//! path funnels through.
//!
//! SmsConsent: `Listening → (PromptPending → Completed) | Completed`.
//! PhoneHint: `PromptPending → Completed` — no listener involved.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};
use uuid::Uuid;

use crate::platform::{
    ComponentIdentity, HintPicker, InboundSignal, PromptHandle, PromptHost, SMS_RETRIEVED_ACTION,
    SignalError, Subscription, decode_signal,
};

use super::dispatch::ResultDispatcher;
use super::validate::is_trusted;
use super::{ConsentOutcome, RequestKind, launch};

// ── State machine ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Listening,
    PromptPending,
    Completed,
}

/// What the driver must do after one decoded signal.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum SignalStep {
    /// Not terminal for this session; keep listening.
    Stay,
    /// The handle survived validation — launch it and await the decision.
    Launch(PromptHandle),
    /// Terminal with no prompt shown; deliver the null outcome.
    Finish,
}

/// Pure transition function for one SmsConsent session.
pub(crate) struct SmsSessionFsm {
    state: SessionState,
    trusted: ComponentIdentity,
}

impl SmsSessionFsm {
    pub(crate) fn new(trusted: ComponentIdentity) -> Self {
        Self {
            state: SessionState::Listening,
            trusted,
        }
    }

    pub(crate) fn state(&self) -> SessionState {
        self.state
    }

    /// Feed one decode attempt. Only meaningful while Listening; the driver
    /// stops pumping signals once the machine leaves that state.
    pub(crate) fn on_signal(&mut self, decoded: Result<InboundSignal, SignalError>) -> SignalStep {
        if self.state != SessionState::Listening {
            return SignalStep::Stay;
        }

        match decoded {
            Err(e) => {
                // Malformed payloads are dropped, not terminal.
                debug!(error = %e, "dropping undecodable notification");
                SignalStep::Stay
            }
            Ok(InboundSignal::Success { handle }) if is_trusted(&handle, &self.trusted) => {
                self.state = SessionState::PromptPending;
                SignalStep::Launch(handle)
            }
            Ok(InboundSignal::Success { handle }) => {
                debug!(component = %handle.target, flags = handle.flags.bits(),
                    "rejecting untrusted prompt handle");
                self.state = SessionState::Completed;
                SignalStep::Finish
            }
            Ok(InboundSignal::Timeout) => {
                debug!("broker reported listen timeout");
                self.state = SessionState::Completed;
                SignalStep::Finish
            }
            Ok(InboundSignal::Other { code }) => {
                debug!(code, "broker reported terminal status");
                self.state = SessionState::Completed;
                SignalStep::Finish
            }
        }
    }

    pub(crate) fn on_prompt_done(&mut self) {
        self.state = SessionState::Completed;
    }
}

// ── Drivers ──────────────────────────────────────────────────────────────────

pub(crate) struct SmsSessionCtx {
    pub id: Uuid,
    pub subscription: Subscription,
    pub prompt: Arc<dyn PromptHost>,
    pub trusted: ComponentIdentity,
    pub dispatcher: ResultDispatcher,
    pub cancel: CancellationToken,
}

/// Drive one SmsConsent session to its terminal event.
///
/// Sole consumer of the subscription — signal handling for this session is
/// serialised on this task. Exits only through the final
/// release-then-dispatch sequence.
pub(crate) async fn run_sms_session(ctx: SmsSessionCtx) {
    let SmsSessionCtx {
        id,
        mut subscription,
        prompt,
        trusted,
        dispatcher,
        cancel,
    } = ctx;

    let mut fsm = SmsSessionFsm::new(trusted);
    info!(session = %id, "sms consent session listening");

    let outcome = loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!(session = %id, state = ?fsm.state(), "session cancelled before completion");
                break ConsentOutcome::denied(RequestKind::SmsConsent);
            }

            broadcast = subscription.next() => {
                let Some(broadcast) = broadcast else {
                    debug!(session = %id, "signal channel closed by the platform");
                    break ConsentOutcome::denied(RequestKind::SmsConsent);
                };

                if broadcast.action != SMS_RETRIEVED_ACTION {
                    trace!(session = %id, action = %broadcast.action, "ignoring unrelated broadcast");
                    continue;
                }

                match fsm.on_signal(decode_signal(&broadcast.extras)) {
                    SignalStep::Stay => continue,
                    SignalStep::Finish => break ConsentOutcome::denied(RequestKind::SmsConsent),
                    SignalStep::Launch(handle) => {
                        info!(session = %id, "consent prompt accepted — awaiting user decision");
                        let outcome = launch::prompt(prompt.as_ref(), handle, &cancel).await;
                        fsm.on_prompt_done();
                        break outcome;
                    }
                }
            }
        }
    };

    // Teardown order is load-bearing: release before the event fires.
    subscription.release();
    debug!(session = %id, completed = outcome.completed, "sms consent session finished");
    dispatcher.dispatch(outcome).await;
}

pub(crate) struct HintSessionCtx {
    pub id: Uuid,
    pub picker: Arc<dyn HintPicker>,
    pub dispatcher: ResultDispatcher,
    pub cancel: CancellationToken,
}

/// Drive one PhoneHint session: open the picker, await the selection,
/// deliver the event. The degenerate machine has no listening phase.
pub(crate) async fn run_hint_session(ctx: HintSessionCtx) {
    let HintSessionCtx {
        id,
        picker,
        dispatcher,
        cancel,
    } = ctx;

    info!(session = %id, "phone hint session opened picker");
    let outcome = launch::picker(picker.as_ref(), &cancel).await;
    debug!(session = %id, completed = outcome.completed, "phone hint session finished");
    dispatcher.dispatch(outcome).await;
}
