// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Output-channel interception.
//!
//! The capture layer observes every `tracing` event in the subscriber stack it
//! is composed into; the host's own formatting layer keeps printing, so
//! developer-visible output is unaffected. `start()` installs the layer
//! process-wide behind a `reload` handle, and the [`InterceptGuard`] returned
//! to the host restores the original output path by swapping the layer out.

use crate::agent::AgentInner;
use crate::entry::{LogEntry, Origin, Severity};
use crate::guard;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::registry::Registry;
use tracing_subscriber::reload;

/// Observes host `tracing` events and feeds them into the entry buffer.
pub struct CaptureLayer {
    inner: Arc<AgentInner>,
}

impl CaptureLayer {
    pub(crate) fn new(inner: Arc<AgentInner>) -> Self {
        CaptureLayer { inner }
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();

        // Structural half of the loop guard: the agent's own diagnostics are
        // rejected by target before their text is even looked at.
        if guard::is_agent_target(metadata.target()) {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let message = match visitor.message {
            Some(message) if !message.is_empty() => message,
            // no message field: fall back to the recorded fields
            _ => {
                let joined = visitor
                    .fields
                    .iter()
                    .map(|(key, value)| format!("{key}={value}"))
                    .collect::<Vec<_>>()
                    .join(" ");
                if joined.is_empty() {
                    return;
                }
                joined
            }
        };

        // Textual half: the observed contract from the echo format.
        if !guard::should_capture(&message) {
            return;
        }

        let severity = Severity::from(*metadata.level());
        let mut context = visitor.fields;
        context.insert(
            "target".to_string(),
            Value::String(metadata.target().to_string()),
        );

        self.inner.submit(
            LogEntry::new(severity, message, Origin::Channel(severity))
                .with_context(Value::Object(context)),
        );
    }
}

/// Collects an event's fields. The `message` field becomes the entry message;
/// everything else lands in the context map. Values without a primitive
/// representation are coerced through their `Debug` form, which cannot fail.
#[derive(Default)]
struct EventVisitor {
    message: Option<String>,
    fields: Map<String, Value>,
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        } else {
            self.fields
                .insert(field.name().to_string(), Value::String(format!("{value:?}")));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields
                .insert(field.name().to_string(), Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields
            .insert(field.name().to_string(), Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields
            .insert(field.name().to_string(), Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields
            .insert(field.name().to_string(), Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields
            .insert(field.name().to_string(), Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.fields
            .insert(field.name().to_string(), Value::String(value.to_string()));
    }
}

/// Owned adapter over the process-wide interception; `restore()` switches the
/// capture layer off while leaving the host's output path intact. Dropping
/// the guard restores as well.
pub struct InterceptGuard {
    handle: reload::Handle<Option<CaptureLayer>, Registry>,
    restored: bool,
}

impl InterceptGuard {
    fn new(handle: reload::Handle<Option<CaptureLayer>, Registry>) -> Self {
        InterceptGuard {
            handle,
            restored: false,
        }
    }

    pub fn restore(&mut self) {
        if self.restored {
            return;
        }
        self.restored = true;
        if self.handle.reload(None::<CaptureLayer>).is_err() {
            tracing::debug!("capture layer was already gone during restore");
        }
    }

    pub fn is_restored(&self) -> bool {
        self.restored
    }
}

impl Drop for InterceptGuard {
    fn drop(&mut self) {
        self.restore();
    }
}

/// Install the capture layer process-wide, beneath a `fmt` layer that keeps
/// the developer-visible output. Returns `None` when the host already owns a
/// global subscriber; such hosts compose `AgentHandle::capture_layer()` into
/// their own stack instead.
pub(crate) fn install_capture(inner: &Arc<AgentInner>) -> Option<InterceptGuard> {
    let (capture_layer, handle) = reload::Layer::new(Some(CaptureLayer::new(Arc::clone(inner))));
    let subscriber = Registry::default()
        .with(capture_layer)
        .with(tracing_subscriber::fmt::layer());

    match tracing::subscriber::set_global_default(subscriber) {
        Ok(()) => Some(InterceptGuard::new(handle)),
        Err(_) => {
            inner.echo(
                Severity::Warn,
                "a global tracing subscriber is already installed; output interception disabled",
            );
            None
        }
    }
}
