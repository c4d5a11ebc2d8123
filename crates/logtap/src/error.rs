// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Errors that can be surfaced to the host application.
///
/// Nothing on a capture or flush path returns these; the host only sees them
/// from configuration, startup, and shutdown.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to build collector client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to join dispatcher on shutdown: {0}")]
    Shutdown(String),
}
