//! Raw TOML deserialization types.
//!
//! These structs mirror the TOML file shape and use `serde` defaults.
//! The `load` module converts them into the public `types` structs.

use serde::Deserialize;

// ── Top-level ────────────────────────────────────────────────────────────────

/// Raw TOML shape — serde target before resolution.
#[derive(Deserialize)]
pub(super) struct RawConfig {
    pub service: RawService,
    #[serde(default)]
    pub bridge: RawBridge,
    #[serde(default)]
    pub broker: RawBroker,
    #[serde(default)]
    pub sim: RawSim,
}

#[derive(Deserialize)]
pub(super) struct RawService {
    pub name: String,
    pub log_level: String,
    #[serde(default)]
    pub log_file: Option<String>,
}

// ── Bridge ───────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct RawBridge {
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for RawBridge {
    fn default() -> Self {
        Self {
            command_buffer: default_command_buffer(),
            event_buffer: default_event_buffer(),
        }
    }
}

pub(super) fn default_command_buffer() -> usize {
    16
}

pub(super) fn default_event_buffer() -> usize {
    16
}

// ── Broker ───────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct RawBroker {
    /// Override of the trusted consent-prompt namespace; the broker's
    /// published constant when absent.
    #[serde(default)]
    pub trusted_namespace: Option<String>,
    /// Override of the trusted consent-prompt component name.
    #[serde(default)]
    pub trusted_name: Option<String>,
    #[serde(default = "default_true")]
    pub listen_to_other_apps: bool,
}

impl Default for RawBroker {
    fn default() -> Self {
        Self {
            trusted_namespace: None,
            trusted_name: None,
            listen_to_other_apps: default_true(),
        }
    }
}

// ── Sim ──────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct RawSim {
    #[serde(default = "default_sim_scenario")]
    pub scenario: String,
    #[serde(default = "default_sim_message")]
    pub message: String,
    #[serde(default = "default_sim_phone_number")]
    pub phone_number: String,
    #[serde(default = "default_sim_deliver_after_ms")]
    pub deliver_after_ms: u64,
}

impl Default for RawSim {
    fn default() -> Self {
        Self {
            scenario: default_sim_scenario(),
            message: default_sim_message(),
            phone_number: default_sim_phone_number(),
            deliver_after_ms: default_sim_deliver_after_ms(),
        }
    }
}

pub(super) fn default_sim_scenario() -> String {
    "approve".to_string()
}

pub(super) fn default_sim_message() -> String {
    "Your verification code is 123456".to_string()
}

pub(super) fn default_sim_phone_number() -> String {
    "+15551234567".to_string()
}

pub(super) fn default_sim_deliver_after_ms() -> u64 {
    250
}

fn default_true() -> bool {
    true
}
