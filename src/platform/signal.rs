//! Typed decoding of raw broker broadcasts.
//!
//! The notification payload crosses a process boundary and is untrusted;
//! instead of reaching into an untyped bundle, decoding is fallible and a
//! malformed payload surfaces as a [`SignalError`] the session drops
//! without terminating.

use serde::Deserialize;
use thiserror::Error;

use super::{ComponentIdentity, PrivilegeFlags, PromptHandle, SMS_RETRIEVED_ACTION};

/// Broker status code: a matching message arrived.
pub const STATUS_SUCCESS: i32 = 0;
/// Broker status code: the listen window elapsed without a match.
pub const STATUS_TIMEOUT: i32 = 15;

// ── RawBroadcast ─────────────────────────────────────────────────────────────

/// One platform notification as delivered into a subscription: an action
/// tag plus an opaque extras bundle.
#[derive(Debug, Clone)]
pub struct RawBroadcast {
    pub action: String,
    pub extras: serde_json::Value,
}

impl RawBroadcast {
    pub fn new(action: impl Into<String>, extras: serde_json::Value) -> Self {
        Self {
            action: action.into(),
            extras,
        }
    }

    /// Encode a success notification carrying `handle` — the broker side of
    /// the contract [`decode_signal`] consumes.
    pub fn success(handle: &PromptHandle) -> Self {
        Self::new(
            SMS_RETRIEVED_ACTION,
            serde_json::json!({
                "status": { "code": STATUS_SUCCESS },
                "consent_intent": {
                    "namespace": handle.target.namespace,
                    "name": handle.target.name,
                    "flags": handle.flags.bits(),
                },
            }),
        )
    }

    /// Encode a listen-timeout notification.
    pub fn timeout() -> Self {
        Self::new(
            SMS_RETRIEVED_ACTION,
            serde_json::json!({ "status": { "code": STATUS_TIMEOUT } }),
        )
    }

    /// Encode a notification with an arbitrary status code.
    pub fn status(code: i32) -> Self {
        Self::new(
            SMS_RETRIEVED_ACTION,
            serde_json::json!({ "status": { "code": code } }),
        )
    }
}

// ── InboundSignal ────────────────────────────────────────────────────────────

/// A decoded broker notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundSignal {
    /// A matching message arrived; the broker wants this prompt displayed.
    /// The handle is untrusted until validated.
    Success { handle: PromptHandle },
    /// The broker's listen window elapsed without a matching message.
    Timeout,
    /// Any other well-formed terminal status.
    Other { code: i32 },
}

/// Decode failure — the notification is dropped and the session keeps
/// listening, so none of these ever reach the caller.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("notification carries no status field")]
    MissingStatus,

    #[error("success status without a prompt handle")]
    MissingHandle,

    #[error("malformed notification extras: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct RawExtras {
    status: Option<RawStatus>,
    consent_intent: Option<RawConsentIntent>,
}

#[derive(Deserialize)]
struct RawStatus {
    code: i32,
}

#[derive(Deserialize)]
struct RawConsentIntent {
    namespace: String,
    name: String,
    #[serde(default)]
    flags: u32,
}

/// Decode a notification's extras bundle into an [`InboundSignal`].
///
/// The action tag is the listener's concern and must already have matched
/// [`SMS_RETRIEVED_ACTION`] before this is called.
pub fn decode_signal(extras: &serde_json::Value) -> Result<InboundSignal, SignalError> {
    let raw: RawExtras = serde_json::from_value(extras.clone())?;
    let status = raw.status.ok_or(SignalError::MissingStatus)?;

    match status.code {
        STATUS_SUCCESS => {
            let intent = raw.consent_intent.ok_or(SignalError::MissingHandle)?;
            Ok(InboundSignal::Success {
                handle: PromptHandle {
                    target: ComponentIdentity::new(intent.namespace, intent.name),
                    flags: PrivilegeFlags::from_bits(intent.flags),
                },
            })
        }
        STATUS_TIMEOUT => Ok(InboundSignal::Timeout),
        code => Ok(InboundSignal::Other { code }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_success_with_handle() {
        let handle = PromptHandle {
            target: ComponentIdentity::trusted_consent_prompt(),
            flags: PrivilegeFlags::empty(),
        };
        let broadcast = RawBroadcast::success(&handle);
        match decode_signal(&broadcast.extras).unwrap() {
            InboundSignal::Success { handle: decoded } => assert_eq!(decoded, handle),
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn decodes_grant_flags() {
        let handle = PromptHandle {
            target: ComponentIdentity::trusted_consent_prompt(),
            flags: PrivilegeFlags::from_bits(0x3),
        };
        let broadcast = RawBroadcast::success(&handle);
        match decode_signal(&broadcast.extras).unwrap() {
            InboundSignal::Success { handle: decoded } => {
                assert!(decoded.flags.contains(PrivilegeFlags::GRANT_READ));
                assert!(decoded.flags.contains(PrivilegeFlags::GRANT_WRITE));
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn decodes_timeout() {
        let broadcast = RawBroadcast::timeout();
        assert_eq!(decode_signal(&broadcast.extras).unwrap(), InboundSignal::Timeout);
    }

    #[test]
    fn unknown_code_is_other() {
        let broadcast = RawBroadcast::status(13);
        assert_eq!(
            decode_signal(&broadcast.extras).unwrap(),
            InboundSignal::Other { code: 13 }
        );
    }

    #[test]
    fn missing_status_is_error() {
        let extras = serde_json::json!({ "unrelated": true });
        assert!(matches!(
            decode_signal(&extras),
            Err(SignalError::MissingStatus)
        ));
    }

    #[test]
    fn success_without_handle_is_error() {
        let extras = serde_json::json!({ "status": { "code": STATUS_SUCCESS } });
        assert!(matches!(
            decode_signal(&extras),
            Err(SignalError::MissingHandle)
        ));
    }

    #[test]
    fn non_object_extras_is_error() {
        let extras = serde_json::json!("not a bundle");
        assert!(matches!(
            decode_signal(&extras),
            Err(SignalError::Malformed(_))
        ));
    }

    #[test]
    fn missing_flags_defaults_to_empty() {
        let extras = serde_json::json!({
            "status": { "code": STATUS_SUCCESS },
            "consent_intent": {
                "namespace": "org.example",
                "name": "org.example.Prompt",
            },
        });
        match decode_signal(&extras).unwrap() {
            InboundSignal::Success { handle } => assert_eq!(handle.flags, PrivilegeFlags::empty()),
            other => panic!("expected success, got {other:?}"),
        }
    }
}
