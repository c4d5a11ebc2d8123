// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Client-side telemetry capture-and-delivery agent.
//!
//! Captures log-worthy events from a running host application — explicit log
//! calls, intercepted `tracing` output, panics, failed tasks, and framework
//! error/warning callbacks — buffers them in order, and ships them to a
//! collector endpoint in batches with best-effort reliability.
//!
//! ```no_run
//! # async fn run() -> Result<(), logtap::AgentError> {
//! let handle = logtap::TelemetryAgent::new(logtap::AgentConfig::default()).start()?;
//! handle.error_with("db timeout", serde_json::json!({"table": "orders"}));
//! handle.shutdown().await?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod agent;
pub mod buffer;
pub mod client;
pub mod config;
pub mod delivery;
pub mod dispatcher;
pub mod entry;
pub mod error;
pub mod guard;
pub mod hooks;
pub mod intercept;
pub mod sink;

pub use agent::{AgentHandle, TelemetryAgent};
pub use client::{component, global, set_global, AgentClient, ComponentLogger};
pub use config::AgentConfig;
pub use entry::{LogEntry, Origin, Severity};
pub use error::AgentError;
