//! Application-wide error types.
//!
//! `AppError` covers bootstrap-path failures only (config, logger, bridge
//! wiring). Session-path failures never become errors — they degrade to a
//! null outcome delivered through the normal event path.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("bridge error: {0}")]
    Bridge(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
