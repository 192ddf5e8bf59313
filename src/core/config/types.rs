//! Public configuration types.
//!
//! These are the resolved, ready-to-use structs the service consumes.
//! Raw TOML deserialization types live in `raw.rs`.

use std::path::PathBuf;

use crate::platform::ComponentIdentity;

// ── Bridge ───────────────────────────────────────────────────────────────────

/// Caller-facing bridge channel sizing.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Capacity of the host → service command channel.
    pub command_buffer: usize,
    /// Capacity of the service → host event channel.
    pub event_buffer: usize,
}

// ── Broker ───────────────────────────────────────────────────────────────────

/// Consent-broker contract knobs.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Namespace of the broker's trusted consent-prompt component.
    pub trusted_namespace: String,
    /// Fully-qualified name of the broker's trusted consent-prompt component.
    pub trusted_name: String,
    /// Whether the listen subscription also accepts broadcasts that
    /// originate outside the host application.
    pub listen_to_other_apps: bool,
}

impl BrokerConfig {
    /// The identity every incoming prompt handle is checked against.
    pub fn trusted_identity(&self) -> ComponentIdentity {
        ComponentIdentity::new(&self.trusted_namespace, &self.trusted_name)
    }
}

// ── Sim ──────────────────────────────────────────────────────────────────────

/// How the simulated platform resolves a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimScenario {
    /// Deliver a trusted prompt handle and approve it with the scripted message.
    Approve,
    /// Deliver a trusted prompt handle, then cancel at the prompt / picker.
    Deny,
    /// Report a broker-side listen timeout.
    Timeout,
}

/// Scripted behaviour for the simulated platform (`sim` feature).
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub scenario: SimScenario,
    /// Full text of the simulated inbound message.
    pub message: String,
    /// Identifier the simulated hint picker returns.
    pub phone_number: String,
    /// Delay before the simulated broker emits its broadcast.
    pub deliver_after_ms: u64,
}

// ── Top-level ────────────────────────────────────────────────────────────────

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Display name used in logs and the console banner.
    pub service_name: String,
    /// Default log level; CLI flags and `SMS_CONSENT_LOG_LEVEL` take precedence.
    pub log_level: String,
    /// Optional log file; stderr when absent.
    pub log_file: Option<PathBuf>,
    pub bridge: BridgeConfig,
    pub broker: BrokerConfig,
    pub sim: SimConfig,
}
