//! Result dispatch — translates a session's terminal outcome into its one
//! outbound bridge event.
//!
//! The dispatcher is handed to a session at spawn time and consumed by
//! delivery, so "exactly one event per session" holds by construction. It
//! never touches the platform; a host that has stopped reading events costs
//! a warning, not a fault.

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::bridge::ConsentEvent;

use super::{ConsentOutcome, RequestKind};

pub struct ResultDispatcher {
    event_tx: mpsc::Sender<ConsentEvent>,
}

impl ResultDispatcher {
    pub fn new(event_tx: mpsc::Sender<ConsentEvent>) -> Self {
        Self { event_tx }
    }

    /// Deliver the session's terminal event. Consumes the dispatcher.
    pub async fn dispatch(self, outcome: ConsentOutcome) {
        let event = match outcome.kind {
            RequestKind::PhoneHint => ConsentEvent::SelectedPhoneNumber(outcome.payload),
            RequestKind::SmsConsent => ConsentEvent::ReceivedSms(outcome.payload),
        };

        debug!(?event, completed = outcome.completed, "dispatching consent outcome");

        if self.event_tx.send(event).await.is_err() {
            warn!("host event channel closed — consent outcome dropped");
        }
    }
}
