//! Caller-facing bridge — typed command/event channel pair between the
//! host application and the consent service.
//!
//! # Contract
//!
//! Commands are fire-and-forget from the caller's point of view: the
//! service acknowledges acceptance immediately with an empty reply, and the
//! actual result arrives later as exactly one [`ConsentEvent`] per request.
//! The wire names (`requestSms`, `receivedSms`, …) are fixed by the bridge
//! contract; both enums serialize to them so a transport adapter can frame
//! messages without its own mapping table.
//!
//! The core itself is transport-free — this module owns only the in-process
//! channel ends.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::core::config::BridgeConfig;

// ── Commands & events ────────────────────────────────────────────────────────

/// A request from the host application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsentCommand {
    /// Show the phone-number picker; resolves as `selectedPhoneNumber`.
    #[serde(rename = "requestPhoneNumber")]
    RequestPhoneNumber,

    /// Listen for an inbound message and seek the user's consent to read
    /// it; resolves as `receivedSms`.
    #[serde(rename = "requestSms")]
    RequestSms {
        #[serde(rename = "senderPhoneNumber")]
        sender_phone_number: Option<String>,
    },
}

/// The single terminal event of one consent session.
///
/// A `None` value uniformly covers denial, timeout, validation rejection
/// and supersession — the caller cannot tell them apart by design.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsentEvent {
    #[serde(rename = "selectedPhoneNumber")]
    SelectedPhoneNumber(Option<String>),

    #[serde(rename = "receivedSms")]
    ReceivedSms(Option<String>),
}

/// A command with its acknowledgement slot, as read by the service loop.
#[derive(Debug)]
pub struct CommandMessage {
    pub command: ConsentCommand,
    /// Resolved with an empty reply as soon as the command is accepted.
    pub ack_tx: oneshot::Sender<()>,
}

// ── Handle ───────────────────────────────────────────────────────────────────

/// Call-level transport errors for bridge commands.
#[derive(Debug, Error)]
pub enum BridgeCallError {
    #[error("command send failed: consent service is not running")]
    Send,

    #[error("command ack failed: consent service dropped the reply sender")]
    Recv,
}

/// Cloneable host-side handle for submitting commands.
#[derive(Clone)]
pub struct BridgeHandle {
    cmd_tx: mpsc::Sender<CommandMessage>,
}

impl BridgeHandle {
    /// `requestPhoneNumber` — returns once the service has accepted the
    /// command; the picked number arrives later as an event.
    pub async fn request_phone_number(&self) -> Result<(), BridgeCallError> {
        self.submit(ConsentCommand::RequestPhoneNumber).await
    }

    /// `requestSms` — returns once the service has accepted the command;
    /// the message text arrives later as an event.
    pub async fn request_sms(
        &self,
        sender_phone_number: Option<String>,
    ) -> Result<(), BridgeCallError> {
        self.submit(ConsentCommand::RequestSms {
            sender_phone_number,
        })
        .await
    }

    async fn submit(&self, command: ConsentCommand) -> Result<(), BridgeCallError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.cmd_tx
            .send(CommandMessage { command, ack_tx })
            .await
            .map_err(|_| BridgeCallError::Send)?;

        ack_rx.await.map_err(|_| BridgeCallError::Recv)
    }
}

// ── Service endpoint ─────────────────────────────────────────────────────────

/// Owns the service-side channel ends.
pub struct ConsentBus {
    /// Service receives commands here.
    pub command_rx: mpsc::Receiver<CommandMessage>,
    /// Cloned into each session's dispatcher to deliver the terminal event.
    pub event_tx: mpsc::Sender<ConsentEvent>,
}

/// Build a connected bridge: service endpoint, host command handle, host
/// event stream.
pub fn channel(
    config: &BridgeConfig,
) -> (ConsentBus, BridgeHandle, mpsc::Receiver<ConsentEvent>) {
    let (cmd_tx, command_rx) = mpsc::channel(config.command_buffer);
    let (event_tx, event_rx) = mpsc::channel(config.event_buffer);
    (
        ConsentBus {
            command_rx,
            event_tx,
        },
        BridgeHandle { cmd_tx },
        event_rx,
    )
}
