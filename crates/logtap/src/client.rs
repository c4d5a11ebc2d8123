// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Logging handles for the host application: the clonable [`AgentClient`],
//! component-scoped [`ComponentLogger`]s, and the process-wide registration
//! slot host components retrieve pre-bound handles from.

use crate::agent::AgentInner;
use crate::entry::{LogEntry, Origin, Severity};
use crate::hooks;
use serde_json::{json, Value};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;

/// Cheap, clonable logging client bound to a running agent.
#[derive(Clone)]
pub struct AgentClient {
    inner: Arc<AgentInner>,
}

impl AgentClient {
    pub(crate) fn new(inner: Arc<AgentInner>) -> Self {
        AgentClient { inner }
    }

    pub fn log(&self, severity: Severity, message: impl Into<String>, context: Option<Value>) {
        self.inner.log(severity, message.into(), context, Origin::Api);
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(Severity::Debug, message, None);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(Severity::Info, message, None);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(Severity::Warn, message, None);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(Severity::Error, message, None);
    }

    pub fn debug_with(&self, message: impl Into<String>, context: Value) {
        self.log(Severity::Debug, message, Some(context));
    }

    pub fn info_with(&self, message: impl Into<String>, context: Value) {
        self.log(Severity::Info, message, Some(context));
    }

    pub fn warn_with(&self, message: impl Into<String>, context: Value) {
        self.log(Severity::Warn, message, Some(context));
    }

    pub fn error_with(&self, message: impl Into<String>, context: Value) {
        self.log(Severity::Error, message, Some(context));
    }

    /// Logging handle pre-bound to a named host component.
    pub fn component(&self, name: &str) -> ComponentLogger {
        ComponentLogger {
            inner: Arc::clone(&self.inner),
            component: name.to_string(),
        }
    }

    /// Spawn a fallible task under observation; `Err` results and in-task
    /// panics are reported as error entries and escalated.
    pub fn watch<F, T, E>(&self, task: &str, future: F) -> JoinHandle<Option<T>>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        hooks::watch_task(Arc::clone(&self.inner), task, future)
    }

    /// Forward a host-framework error callback. The error's source chain is
    /// recorded as the entry trace.
    pub fn framework_error(
        &self,
        component: &str,
        phase: &str,
        error: &(dyn std::error::Error + 'static),
    ) {
        let mut entry = LogEntry::new(Severity::Error, error.to_string(), Origin::Framework)
            .with_context(json!({"component": component, "phase": phase}));
        if let Some(chain) = source_chain(error) {
            entry = entry.with_trace(chain);
        }
        self.inner
            .echo(Severity::Error, &format!("{component}/{phase}: {error}"));
        self.inner.submit(entry);
    }

    /// Forward a host-framework warning callback.
    pub fn framework_warn(&self, component: &str, phase: &str, message: &str) {
        self.inner
            .echo(Severity::Warn, &format!("{component}/{phase}: {message}"));
        self.inner.submit(
            LogEntry::new(Severity::Warn, message, Origin::Framework)
                .with_context(json!({"component": component, "phase": phase})),
        );
    }
}

/// Logging handle that stamps every entry with a host component's identity.
#[derive(Clone)]
pub struct ComponentLogger {
    inner: Arc<AgentInner>,
    component: String,
}

impl ComponentLogger {
    pub fn name(&self) -> &str {
        &self.component
    }

    fn log(&self, severity: Severity, message: impl Into<String>, context: Option<Value>) {
        self.inner.log(
            severity,
            message.into(),
            Some(merge_component(&self.component, context)),
            Origin::Component(self.component.clone()),
        );
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(Severity::Debug, message, None);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(Severity::Info, message, None);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(Severity::Warn, message, None);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(Severity::Error, message, None);
    }

    pub fn debug_with(&self, message: impl Into<String>, context: Value) {
        self.log(Severity::Debug, message, Some(context));
    }

    pub fn info_with(&self, message: impl Into<String>, context: Value) {
        self.log(Severity::Info, message, Some(context));
    }

    pub fn warn_with(&self, message: impl Into<String>, context: Value) {
        self.log(Severity::Warn, message, Some(context));
    }

    pub fn error_with(&self, message: impl Into<String>, context: Value) {
        self.log(Severity::Error, message, Some(context));
    }
}

fn merge_component(component: &str, context: Option<Value>) -> Value {
    match context {
        Some(Value::Object(mut map)) => {
            map.insert("component".to_string(), Value::String(component.to_string()));
            Value::Object(map)
        }
        Some(other) => json!({"component": component, "value": other}),
        None => json!({"component": component}),
    }
}

fn source_chain(error: &(dyn std::error::Error + 'static)) -> Option<String> {
    let mut parts = Vec::new();
    let mut source = error.source();
    while let Some(cause) = source {
        parts.push(cause.to_string());
        source = cause.source();
    }
    if parts.is_empty() {
        None
    } else {
        Some(format!("caused by: {}", parts.join("\ncaused by: ")))
    }
}

static GLOBAL: OnceLock<AgentClient> = OnceLock::new();

/// Register a client in the process-wide slot. The first registration wins;
/// returns whether this call installed it.
pub fn set_global(client: AgentClient) -> bool {
    GLOBAL.set(client).is_ok()
}

/// The process-wide client, if a host registered one.
pub fn global() -> Option<&'static AgentClient> {
    GLOBAL.get()
}

/// Component-scoped handle off the process-wide client.
pub fn component(name: &str) -> Option<ComponentLogger> {
    global().map(|client| client.component(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::EntryBuffer;
    use crate::dispatcher::FlushReason;
    use crate::sink::{ConsoleSink, MemorySink};
    use tokio::sync::mpsc;

    fn test_client() -> (
        AgentClient,
        mpsc::UnboundedReceiver<FlushReason>,
        Arc<MemorySink>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Arc::new(MemorySink::default());
        let inner = Arc::new(AgentInner::new(
            EntryBuffer::new(64),
            tx,
            sink.clone() as Arc<dyn ConsoleSink>,
            true,
        ));
        (AgentClient::new(inner), rx, sink)
    }

    #[test]
    fn error_append_raises_an_escalation() {
        let (client, mut rx, _sink) = test_client();
        client.info("no escalation for this one");
        assert!(rx.try_recv().is_err());

        client.error("db timeout");
        assert_eq!(rx.try_recv(), Ok(FlushReason::Escalation));
    }

    #[test]
    fn component_handle_stamps_identity() {
        let (client, _rx, _sink) = test_client();
        let checkout = client.component("checkout");
        checkout.warn_with("slow render", json!({"ms": 420}));

        let entries = client.inner.drain_all();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.origin(), &Origin::Component("checkout".to_string()));
        let context = entry.context().expect("context missing");
        assert_eq!(context["component"], json!("checkout"));
        assert_eq!(context["ms"], json!(420));
    }

    #[test]
    fn framework_error_records_source_chain() {
        #[derive(Debug, thiserror::Error)]
        #[error("render failed")]
        struct RenderError {
            #[source]
            cause: std::io::Error,
        }

        let (client, mut rx, _sink) = test_client();
        let error = RenderError {
            cause: std::io::Error::other("texture missing"),
        };
        client.framework_error("CheckoutForm", "render", &error);

        let entries = client.inner.drain_all();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.message(), "render failed");
        assert_eq!(entry.origin(), &Origin::Framework);
        let context = entry.context().expect("context missing");
        assert_eq!(context["component"], json!("CheckoutForm"));
        assert_eq!(context["phase"], json!("render"));
        assert_eq!(entry.trace(), Some("caused by: texture missing"));
        assert_eq!(rx.try_recv(), Ok(FlushReason::Escalation));
    }

    #[test]
    fn framework_warn_does_not_escalate() {
        let (client, mut rx, _sink) = test_client();
        client.framework_warn("CheckoutForm", "mount", "missing prop 'total'");

        let entries = client.inner.drain_all();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].severity(), Severity::Warn);
        assert!(rx.try_recv().is_err());
    }
}
