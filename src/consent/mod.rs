//! Consent subsystem — the request/consent/deliver state machine.
//!
//! # Architecture
//!
//! [`service::ConsentService`] runs one command loop that owns the per-kind
//! session registry. Each accepted request spawns a session driver task
//! (`session`) that is the sole consumer of its broker subscription — all
//! signal handling for a session happens on that one task, so notifications
//! are never processed concurrently. The driver feeds decoded signals to a
//! pure transition function, launches the consent prompt through `launch`
//! once a handle survives `validate`, and hands its single terminal outcome
//! to `dispatch`.
//!
//! # Teardown invariant
//!
//! Every exit path — approval, denial, timeout, validation rejection,
//! supersession, service shutdown — releases the subscription first and
//! then fires exactly one bridge event. The dispatcher is consumed by
//! delivery, so a second event per session is unrepresentable.

pub mod dispatch;
pub mod launch;
pub mod service;
pub mod session;
pub mod validate;

pub use dispatch::ResultDispatcher;
pub use service::ConsentService;
pub use session::SessionState;

// ── Outcome ──────────────────────────────────────────────────────────────────

/// The two request kinds; at most one session of each kind is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    PhoneHint,
    SmsConsent,
}

/// Terminal result of one session.
///
/// `completed = false` with no payload uniformly models timeout, denial,
/// validation rejection and supersession.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentOutcome {
    pub kind: RequestKind,
    pub payload: Option<String>,
    pub completed: bool,
}

impl ConsentOutcome {
    /// The uniform null outcome.
    pub fn denied(kind: RequestKind) -> Self {
        Self {
            kind,
            payload: None,
            completed: false,
        }
    }

    /// A completed interaction; `payload` may still be absent when the
    /// host's bundle carried no usable field.
    pub fn delivered(kind: RequestKind, payload: Option<String>) -> Self {
        Self {
            kind,
            payload,
            completed: true,
        }
    }
}
