//! Broker-gated SMS consent core.
//!
//! Lets a host application obtain a one-time code from an inbound text
//! message — or a user-picked phone number — without holding any
//! message-read permission. The sensitive read is delegated to a trusted
//! platform consent broker; this crate only ever sees data after the user
//! approves the broker's prompt.
//!
//! # Module map
//!
//! - [`bridge`] — caller-facing command/event channel pair.
//! - [`consent`] — the session state machine: validation, prompt launch,
//!   teardown, result dispatch.
//! - [`platform`] — collaborator traits for the broker, prompt host and
//!   hint picker, plus the owned listen subscription and typed broadcast
//!   decoding.
//! - [`core`] — configuration and the application error enum.
//! - [`bootstrap`] — logging initialisation.
//!
//! The binary entry point (`consent-console`) is src/main.rs.

pub mod bootstrap;
pub mod bridge;
pub mod consent;
pub mod core;
pub mod platform;

pub use self::core::{config, error};
