//! Configuration loading with env-var overrides.
//!
//! Reads TOML files, supports `[meta] base = "..."` inheritance chains,
//! and applies the `SMS_CONSENT_LOG_LEVEL` env override.

use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::error::AppError;
use crate::platform::{TRUSTED_PROMPT_NAME, TRUSTED_PROMPT_NAMESPACE};

use super::raw::{self, RawConfig};
use super::types::*;

/// Deep-merge two TOML values.
/// Tables are merged recursively — the overlay only needs to specify keys that
/// differ from the base. For every other type (string, integer, array, …)
/// the overlay value replaces the base value wholesale.
fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_tbl), toml::Value::Table(overlay_tbl)) => {
            for (key, ov_val) in overlay_tbl {
                let merged = match base_tbl.remove(&key) {
                    Some(base_val) => merge_toml(base_val, ov_val),
                    None => ov_val,
                };
                base_tbl.insert(key, merged);
            }
            toml::Value::Table(base_tbl)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file, follow any `[meta] base = "..."` chain, and return the
/// fully merged `toml::Value`. `visited` carries canonicalized paths already
/// seen in this chain so circular references are caught early.
fn load_raw_merged(path: &Path, visited: &mut HashSet<PathBuf>) -> Result<toml::Value, AppError> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !visited.insert(canonical) {
        return Err(AppError::Config(format!(
            "circular base reference detected at: {}",
            path.display()
        )));
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let overlay_val: toml::Value = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    if let Some(base_str) = overlay_val
        .get("meta")
        .and_then(|m| m.get("base"))
        .and_then(|b| b.as_str())
    {
        let base_path = if Path::new(base_str).is_absolute() {
            PathBuf::from(base_str)
        } else {
            path.parent().unwrap_or(Path::new(".")).join(base_str)
        };
        let base_val = load_raw_merged(&base_path, visited)?;
        Ok(merge_toml(base_val, overlay_val))
    } else {
        Ok(overlay_val)
    }
}

/// Load config from the given path, or `config/default.toml`, then apply env-var overrides.
/// If no path is given and `config/default.toml` does not exist, returns a hardcoded minimal default.
pub fn load(config_path: Option<&str>) -> Result<Config, AppError> {
    let log_level_override = env::var("SMS_CONSENT_LOG_LEVEL").ok();

    if let Some(path) = config_path {
        return load_from(Path::new(path), log_level_override.as_deref());
    }

    let default_path = Path::new("config/default.toml");
    if default_path.exists() {
        load_from(default_path, log_level_override.as_deref())
    } else {
        // Hardcoded minimal default
        let log_level = log_level_override.unwrap_or_else(|| "info".to_string());

        Ok(Config {
            service_name: "sms-consent".to_string(),
            log_level,
            log_file: None,
            bridge: BridgeConfig {
                command_buffer: raw::default_command_buffer(),
                event_buffer: raw::default_event_buffer(),
            },
            broker: BrokerConfig {
                trusted_namespace: TRUSTED_PROMPT_NAMESPACE.to_string(),
                trusted_name: TRUSTED_PROMPT_NAME.to_string(),
                listen_to_other_apps: true,
            },
            sim: SimConfig {
                scenario: SimScenario::Approve,
                message: raw::default_sim_message(),
                phone_number: raw::default_sim_phone_number(),
                deliver_after_ms: raw::default_sim_deliver_after_ms(),
            },
        })
    }
}

/// Internal loader — accepts an explicit path and an optional override.
/// Tests pass the override directly instead of mutating env vars.
/// Follows `[meta] base = "..."` inheritance chains before resolving.
pub fn load_from(path: &Path, log_level_override: Option<&str>) -> Result<Config, AppError> {
    let merged_val = load_raw_merged(path, &mut HashSet::new())?;

    let parsed: RawConfig = Deserialize::deserialize(merged_val).map_err(|e: toml::de::Error| {
        AppError::Config(format!("config error in {}: {e}", path.display()))
    })?;

    let s = parsed.service;

    let log_level = log_level_override.unwrap_or(&s.log_level).to_string();
    let log_file = s.log_file.map(|f| expand_home(&f));

    let scenario = parse_scenario(&parsed.sim.scenario)?;

    Ok(Config {
        service_name: s.name,
        log_level,
        log_file,
        bridge: BridgeConfig {
            command_buffer: parsed.bridge.command_buffer.max(1),
            event_buffer: parsed.bridge.event_buffer.max(1),
        },
        broker: BrokerConfig {
            trusted_namespace: parsed
                .broker
                .trusted_namespace
                .unwrap_or_else(|| TRUSTED_PROMPT_NAMESPACE.to_string()),
            trusted_name: parsed
                .broker
                .trusted_name
                .unwrap_or_else(|| TRUSTED_PROMPT_NAME.to_string()),
            listen_to_other_apps: parsed.broker.listen_to_other_apps,
        },
        sim: SimConfig {
            scenario,
            message: parsed.sim.message,
            phone_number: parsed.sim.phone_number,
            deliver_after_ms: parsed.sim.deliver_after_ms,
        },
    })
}

fn parse_scenario(value: &str) -> Result<SimScenario, AppError> {
    match value {
        "approve" => Ok(SimScenario::Approve),
        "deny" => Ok(SimScenario::Deny),
        "timeout" => Ok(SimScenario::Timeout),
        other => Err(AppError::Config(format!(
            "unrecognised sim scenario '{other}' (expected approve, deny or timeout)"
        ))),
    }
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}
