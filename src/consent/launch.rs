//! Prompt and picker launching — asks the host to display a UI and maps
//! its completion onto a [`ConsentOutcome`].
//!
//! Host-side failure never propagates: a launch-not-found error, a dropped
//! completion slot and a cancellation all collapse into the uniform null
//! outcome. The payload bundle is read by typed deserialization; unknown
//! fields are ignored and a missing field simply yields no payload.

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::platform::{HintPicker, HostCompletion, HostResultCode, PromptHandle, PromptHost};

use super::{ConsentOutcome, RequestKind};

/// Extras bundle of an approved consent prompt.
#[derive(Deserialize)]
struct SmsExtras {
    sms_message: Option<String>,
}

/// Extras bundle of a finished hint-picker interaction.
#[derive(Deserialize)]
struct PickerExtras {
    credential: Option<Credential>,
}

#[derive(Deserialize)]
struct Credential {
    id: Option<String>,
}

/// Display a validated consent prompt and await the user's decision.
pub(crate) async fn prompt(
    host: &dyn PromptHost,
    handle: PromptHandle,
    cancel: &CancellationToken,
) -> ConsentOutcome {
    let completion_rx = match host.launch_prompt(handle) {
        Ok(rx) => rx,
        Err(e) => {
            debug!(error = %e, "consent prompt launch failed");
            return ConsentOutcome::denied(RequestKind::SmsConsent);
        }
    };

    match await_completion(completion_rx, cancel).await {
        Some(HostCompletion {
            code: HostResultCode::Ok,
            extras: Some(extras),
        }) => {
            let payload = serde_json::from_value::<SmsExtras>(extras)
                .ok()
                .and_then(|e| e.sms_message);
            ConsentOutcome::delivered(RequestKind::SmsConsent, payload)
        }
        _ => ConsentOutcome::denied(RequestKind::SmsConsent),
    }
}

/// Display the phone-number picker and await the selection.
pub(crate) async fn picker(host: &dyn HintPicker, cancel: &CancellationToken) -> ConsentOutcome {
    let completion_rx = match host.open_picker() {
        Ok(rx) => rx,
        Err(e) => {
            debug!(error = %e, "hint picker launch failed");
            return ConsentOutcome::denied(RequestKind::PhoneHint);
        }
    };

    match await_completion(completion_rx, cancel).await {
        Some(HostCompletion {
            code: HostResultCode::Ok,
            extras: Some(extras),
        }) => {
            let payload = serde_json::from_value::<PickerExtras>(extras)
                .ok()
                .and_then(|e| e.credential)
                .and_then(|c| c.id);
            ConsentOutcome::delivered(RequestKind::PhoneHint, payload)
        }
        _ => ConsentOutcome::denied(RequestKind::PhoneHint),
    }
}

/// Await a single host completion; `None` on cancellation or when the host
/// drops the slot without resolving it.
async fn await_completion(
    completion_rx: tokio::sync::oneshot::Receiver<HostCompletion>,
    cancel: &CancellationToken,
) -> Option<HostCompletion> {
    tokio::select! {
        biased;

        _ = cancel.cancelled() => {
            debug!("interaction cancelled before the host reported a result");
            None
        }
        done = completion_rx => match done {
            Ok(completion) => Some(completion),
            Err(_) => {
                debug!("host dropped the completion slot");
                None
            }
        },
    }
}
