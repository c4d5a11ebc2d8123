// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Loop-guard filter: keeps the agent's own output from re-entering the
//! capture pipeline.
//!
//! Two checks. The textual one is the observed contract: every line the agent
//! echoes to the original output channel starts with a bracketed severity tag,
//! and a captured payload starting with one of those tags is rejected. The
//! structural one closes the rest of the loop: events emitted from inside this
//! crate (the dispatcher's own diagnostics) are rejected by `tracing` target,
//! independent of their text.

use crate::entry::Severity;

/// Target prefix of every event this crate emits.
pub const AGENT_TARGET: &str = env!("CARGO_CRATE_NAME");

/// Whether a captured message may enter the buffer. Rejects payloads whose
/// leading token is one of the agent's own echo tags.
pub fn should_capture(message: &str) -> bool {
    !Severity::ALL
        .iter()
        .any(|severity| message.starts_with(severity.tag()))
}

/// Whether a `tracing` target belongs to the agent itself.
pub fn is_agent_target(target: &str) -> bool {
    target == AGENT_TARGET
        || target
            .strip_prefix(AGENT_TARGET)
            .is_some_and(|rest| rest.starts_with("::"))
}
