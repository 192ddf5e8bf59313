//! Prompt-handle validation.
//!
//! The handle arrives inside a broadcast payload that any process could
//! have forged. Launching it unchecked would let a malicious sender run an
//! arbitrary component under this process's identity, with whatever URI
//! grants the handle smuggled in. The check is a pure decision — no I/O,
//! no side effects — and rejection is silent: the caller only ever sees an
//! eventual null outcome, indistinguishable from a timeout.

use crate::platform::{ComponentIdentity, PrivilegeFlags, PromptHandle};

/// Accept `handle` iff it targets exactly the trusted consent-prompt
/// component and carries neither the read- nor the write-grant bit.
pub fn is_trusted(handle: &PromptHandle, trusted: &ComponentIdentity) -> bool {
    handle.target == *trusted
        && !handle.flags.contains(PrivilegeFlags::GRANT_READ)
        && !handle.flags.contains(PrivilegeFlags::GRANT_WRITE)
}
