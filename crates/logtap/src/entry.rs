// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use tracing::Level;

/// Severity of a captured entry. Ordinal: `Debug < Info < Warn < Error`.
///
/// Appending an `Error` entry escalates delivery (immediate flush instead of
/// waiting for the next timer tick).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Debug,
        Severity::Info,
        Severity::Warn,
        Severity::Error,
    ];

    /// Bracketed tag prepended to every line the agent writes to the original
    /// output channel. The loop-guard filter rejects captured payloads that
    /// start with one of these tags, so the tag set and the reject set cannot
    /// drift apart.
    pub fn tag(self) -> &'static str {
        match self {
            Severity::Debug => "[DEBUG]",
            Severity::Info => "[INFO]",
            Severity::Warn => "[WARN]",
            Severity::Error => "[ERROR]",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        })
    }
}

impl From<Level> for Severity {
    fn from(level: Level) -> Self {
        if level == Level::ERROR {
            Severity::Error
        } else if level == Level::WARN {
            Severity::Warn
        } else if level == Level::INFO {
            Severity::Info
        } else {
            // TRACE has no counterpart on the collector side
            Severity::Debug
        }
    }
}

/// Which capture source produced an entry. Serialized as a plain string so
/// the collector can filter on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Explicit call through the agent's logging API.
    Api,
    /// Event observed on an intercepted output channel.
    Channel(Severity),
    /// Process-wide panic hook.
    Panic,
    /// Watched task that failed or panicked without a consumer.
    Task,
    /// Host framework error/warning callback.
    Framework,
    /// Named logical sub-component of the host application.
    Component(String),
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Api => f.write_str("api"),
            Origin::Channel(severity) => write!(f, "tracing.{severity}"),
            Origin::Panic => f.write_str("panic"),
            Origin::Task => f.write_str("task"),
            Origin::Framework => f.write_str("framework"),
            Origin::Component(name) => f.write_str(name),
        }
    }
}

impl Serialize for Origin {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The unit of record. Immutable once constructed: exactly one capture source
/// builds an entry, the buffer holds it, and the dispatcher only reads it.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    severity: Severity,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<Value>,
    origin: Origin,
    #[serde(skip_serializing_if = "Option::is_none")]
    trace: Option<String>,
}

impl LogEntry {
    /// Build an entry. An empty message is normalized to a placeholder rather
    /// than rejected: no capture path is allowed to fail.
    pub fn new(severity: Severity, message: impl Into<String>, origin: Origin) -> Self {
        let mut message = message.into();
        if message.is_empty() {
            message = "(empty message)".to_string();
        }
        LogEntry {
            severity,
            message,
            context: None,
            origin,
            trace: None,
        }
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> Option<&Value> {
        self.context.as_ref()
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn trace(&self) -> Option<&str> {
        self.trace.as_deref()
    }
}
