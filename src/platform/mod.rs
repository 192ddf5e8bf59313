//! Platform collaborator interfaces — the seams between the consent core
//! and the host platform.
//!
//! # Architecture
//!
//! The core never talks to the platform directly. Three trait objects stand
//! in for it:
//!
//! - [`ConsentBroker`] — the trusted service that watches inbound messages
//!   and emits broadcasts without granting this process read access.
//! - [`PromptHost`] — displays a validated consent prompt and reports the
//!   user's decision.
//! - [`HintPicker`] — displays the phone-number picker and reports the
//!   selection.
//!
//! All three hand results back through channels, so the consent service can
//! await them from its own task without blocking. The broker's broadcasts
//! arrive through an owned [`Subscription`] value (see `subscription`);
//! prompt and picker interactions resolve a single `oneshot` slot.
//!
//! Identity constants and status codes below follow the broker's published
//! contract.

pub mod signal;
pub mod subscription;

#[cfg(feature = "sim")]
pub mod sim;

pub use signal::{InboundSignal, RawBroadcast, SignalError, decode_signal};
pub use subscription::{SignalSender, Subscription, subscription_pair};

use thiserror::Error;
use tokio::sync::oneshot;

/// Broadcast action tag carried by inbound-message notifications.
/// Broadcasts with any other action are ignored silently.
pub const SMS_RETRIEVED_ACTION: &str = "com.google.android.gms.auth.api.phone.SMS_RETRIEVED";

/// Namespace of the broker's genuine consent-prompt component.
pub const TRUSTED_PROMPT_NAMESPACE: &str = "com.google.android.gms";

/// Fully-qualified name of the broker's genuine consent-prompt component.
pub const TRUSTED_PROMPT_NAME: &str =
    "com.google.android.gms.auth.api.phone.ui.UserConsentPromptActivity";

// ── Identity & handles ───────────────────────────────────────────────────────

/// Namespace + name pair identifying a launchable platform component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentIdentity {
    pub namespace: String,
    pub name: String,
}

impl ComponentIdentity {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// The broker's published consent-prompt identity.
    pub fn trusted_consent_prompt() -> Self {
        Self::new(TRUSTED_PROMPT_NAMESPACE, TRUSTED_PROMPT_NAME)
    }
}

impl std::fmt::Display for ComponentIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Privilege grant bits attached to a prompt handle.
///
/// A trusted handle must carry neither grant bit; either one would let the
/// launched component piggyback on this process's URI access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrivilegeFlags(u32);

impl PrivilegeFlags {
    /// URI read grant.
    pub const GRANT_READ: Self = Self(0x1);
    /// URI write grant.
    pub const GRANT_WRITE: Self = Self(0x2);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// Untrusted descriptor of an interactive prompt the broker wants shown.
///
/// Originates from a broadcast payload anyone could have forged; must pass
/// [`crate::consent::validate::is_trusted`] before it reaches a
/// [`PromptHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptHandle {
    pub target: ComponentIdentity,
    pub flags: PrivilegeFlags,
}

// ── Completions ──────────────────────────────────────────────────────────────

/// Host-side result code for a finished prompt or picker interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostResultCode {
    Ok,
    Canceled,
}

/// Terminal report from a prompt or picker interaction.
///
/// `extras` is the host's opaque payload bundle; the launcher extracts the
/// fields it needs by typed deserialization and ignores the rest.
#[derive(Debug, Clone)]
pub struct HostCompletion {
    pub code: HostResultCode,
    pub extras: Option<serde_json::Value>,
}

// ── Errors ───────────────────────────────────────────────────────────────────

/// Failures surfaced by platform collaborators at the call boundary.
///
/// None of these propagate to the caller as faults; the session maps them
/// to a null outcome.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The host cannot resolve or display the requested UI.
    #[error("launch target not found")]
    LaunchNotFound,

    /// The platform service is unreachable or refused the request.
    #[error("platform unavailable: {0}")]
    Unavailable(String),
}

// ── Collaborator traits ──────────────────────────────────────────────────────

/// Scope of one listen subscription.
#[derive(Debug, Clone)]
pub struct ListenFilter {
    /// Only messages from this sender trigger a notification; any sender
    /// when absent.
    pub sender: Option<String>,
    /// Whether broadcasts originating outside the host application are
    /// accepted.
    pub exported: bool,
}

/// The trusted platform service that observes inbound messages.
pub trait ConsentBroker: Send + Sync {
    /// Start watching for a matching inbound message.
    ///
    /// The returned [`Subscription`] is exclusively owned by the session
    /// that requested it; releasing it ends delivery.
    fn start_listening(&self, filter: &ListenFilter) -> Result<Subscription, PlatformError>;
}

/// Displays a validated consent prompt.
pub trait PromptHost: Send + Sync {
    /// Ask the host to show the prompt. The returned slot resolves exactly
    /// once with the user's decision; dropping it without resolving is
    /// treated as denial.
    fn launch_prompt(
        &self,
        handle: PromptHandle,
    ) -> Result<oneshot::Receiver<HostCompletion>, PlatformError>;
}

/// Displays the phone-number hint picker.
pub trait HintPicker: Send + Sync {
    /// Ask the host to show the picker. Resolves once with the selection
    /// or a cancellation.
    fn open_picker(&self) -> Result<oneshot::Receiver<HostCompletion>, PlatformError>;
}
