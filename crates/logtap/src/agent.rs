// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Lifecycle manager: wires the capture sources, runs the dispatcher, and
//! tears everything down in order on shutdown.

use crate::buffer::EntryBuffer;
use crate::client::{AgentClient, ComponentLogger};
use crate::config::AgentConfig;
use crate::delivery::CollectorClient;
use crate::dispatcher::{Dispatcher, FlushReason};
use crate::entry::{LogEntry, Origin, Severity};
use crate::error::AgentError;
use crate::hooks::{self, PanicHookGuard};
use crate::intercept::{self, CaptureLayer, InterceptGuard};
use crate::sink::{ConsoleSink, StderrSink};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// State shared by every capture source and the dispatcher. The entry buffer
/// is the only mutable piece and is reachable only through the operations
/// here, which keeps the ordering invariant enforced in one place.
pub(crate) struct AgentInner {
    buffer: Mutex<EntryBuffer>,
    trigger: UnboundedSender<FlushReason>,
    sink: Arc<dyn ConsoleSink>,
    enabled: AtomicBool,
}

impl AgentInner {
    pub(crate) fn new(
        buffer: EntryBuffer,
        trigger: UnboundedSender<FlushReason>,
        sink: Arc<dyn ConsoleSink>,
        enabled: bool,
    ) -> Self {
        AgentInner {
            buffer: Mutex::new(buffer),
            trigger,
            sink,
            enabled: AtomicBool::new(enabled),
        }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub(crate) fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    fn lock_buffer(&self) -> MutexGuard<'_, EntryBuffer> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an entry, escalating delivery for error severity. Never fails
    /// and never blocks beyond the buffer lock.
    pub(crate) fn submit(&self, entry: LogEntry) {
        if !self.is_enabled() {
            return;
        }
        let escalate = entry.severity() == Severity::Error;
        self.lock_buffer().append(entry);
        if escalate {
            let _ = self.trigger.send(FlushReason::Escalation);
        }
    }

    pub(crate) fn drain_all(&self) -> Vec<LogEntry> {
        self.lock_buffer().drain_all()
    }

    pub(crate) fn requeue_front(&self, batch: Vec<LogEntry>) {
        self.lock_buffer().requeue_front(batch);
    }

    pub(crate) fn buffered(&self) -> usize {
        self.lock_buffer().len()
    }

    pub(crate) fn dropped(&self) -> u64 {
        self.lock_buffer().dropped()
    }

    /// Write a tagged line to the original output channel.
    pub(crate) fn echo(&self, severity: Severity, text: &str) {
        self.sink
            .write_line(severity, &format!("{} {text}", severity.tag()));
    }

    /// Explicit-API path: echo with the severity tag, then enqueue. Context
    /// that fails to render as JSON is coerced to its `Debug` form instead of
    /// erroring.
    pub(crate) fn log(
        &self,
        severity: Severity,
        message: String,
        context: Option<Value>,
        origin: Origin,
    ) {
        if !self.is_enabled() {
            return;
        }

        match &context {
            Some(ctx) => {
                let rendered =
                    serde_json::to_string(ctx).unwrap_or_else(|_| format!("{ctx:?}"));
                self.echo(severity, &format!("{message} {rendered}"));
            }
            None => self.echo(severity, &message),
        }

        let mut entry = LogEntry::new(severity, message, origin);
        if let Some(ctx) = context {
            entry = entry.with_context(ctx);
        }
        self.submit(entry);
    }
}

/// Builder for the telemetry agent.
pub struct TelemetryAgent {
    config: AgentConfig,
    sink: Arc<dyn ConsoleSink>,
}

impl TelemetryAgent {
    pub fn new(config: AgentConfig) -> Self {
        TelemetryAgent {
            config,
            sink: Arc::new(StderrSink),
        }
    }

    /// Redirect the agent's developer-visible output away from stderr.
    pub fn with_sink(mut self, sink: Arc<dyn ConsoleSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Validate the configuration, wire the capture sources, and spawn the
    /// dispatcher. Must be called on a tokio runtime. A disabled agent wires
    /// nothing and every subsequent call is a no-op.
    pub fn start(self) -> Result<AgentHandle, AgentError> {
        self.config.validate()?;

        let (trigger_tx, trigger_rx) = tokio::sync::mpsc::unbounded_channel();
        let inner = Arc::new(AgentInner::new(
            EntryBuffer::new(self.config.buffer_capacity),
            trigger_tx,
            Arc::clone(&self.sink),
            self.config.enabled,
        ));

        if !self.config.enabled {
            return Ok(AgentHandle {
                inner,
                cancel: CancellationToken::new(),
                dispatcher: None,
                intercept: None,
                panic_guard: None,
            });
        }

        let client = CollectorClient::new(&self.config.endpoint, self.config.request_timeout)?;
        let cancel = CancellationToken::new();
        let dispatcher = Dispatcher::new(
            Arc::clone(&inner),
            client,
            self.config.flush_interval,
            trigger_rx,
            cancel.clone(),
        );
        let dispatcher = tokio::spawn(dispatcher.run());

        let intercept = if self.config.intercept_output {
            intercept::install_capture(&inner)
        } else {
            None
        };

        let panic_guard = self
            .config
            .capture_panics
            .then(|| hooks::install_panic_hook(Arc::clone(&inner)));

        inner.log(
            Severity::Info,
            "telemetry agent started".to_string(),
            Some(json!({"component": "logtap"})),
            Origin::Api,
        );

        Ok(AgentHandle {
            inner,
            cancel,
            dispatcher: Some(dispatcher),
            intercept,
            panic_guard,
        })
    }
}

/// Owned handle to a running agent. Dropping it without calling
/// [`AgentHandle::shutdown`] leaves the dispatcher running for the life of
/// the process.
pub struct AgentHandle {
    inner: Arc<AgentInner>,
    cancel: CancellationToken,
    dispatcher: Option<JoinHandle<()>>,
    intercept: Option<InterceptGuard>,
    panic_guard: Option<PanicHookGuard>,
}

impl AgentHandle {
    /// Cheap, clonable logging client for handing to other parts of the host.
    pub fn client(&self) -> AgentClient {
        AgentClient::new(Arc::clone(&self.inner))
    }

    /// Logging handle pre-bound to a named host component.
    pub fn component(&self, name: &str) -> ComponentLogger {
        self.client().component(name)
    }

    /// A capture layer for hosts that compose their own subscriber stack
    /// instead of letting `start()` install one.
    pub fn capture_layer(&self) -> CaptureLayer {
        CaptureLayer::new(Arc::clone(&self.inner))
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_enabled()
    }

    /// Entries currently waiting for delivery.
    pub fn pending(&self) -> usize {
        self.inner.buffered()
    }

    /// Entries evicted by the buffer bound since startup.
    pub fn dropped(&self) -> u64 {
        self.inner.dropped()
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.inner.log(Severity::Debug, message.into(), None, Origin::Api);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.inner.log(Severity::Info, message.into(), None, Origin::Api);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.inner.log(Severity::Warn, message.into(), None, Origin::Api);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.inner.log(Severity::Error, message.into(), None, Origin::Api);
    }

    pub fn debug_with(&self, message: impl Into<String>, context: Value) {
        self.inner
            .log(Severity::Debug, message.into(), Some(context), Origin::Api);
    }

    pub fn info_with(&self, message: impl Into<String>, context: Value) {
        self.inner
            .log(Severity::Info, message.into(), Some(context), Origin::Api);
    }

    pub fn warn_with(&self, message: impl Into<String>, context: Value) {
        self.inner
            .log(Severity::Warn, message.into(), Some(context), Origin::Api);
    }

    pub fn error_with(&self, message: impl Into<String>, context: Value) {
        self.inner
            .log(Severity::Error, message.into(), Some(context), Origin::Api);
    }

    /// Stop the timer, let the dispatcher finish its final drain-and-deliver,
    /// then restore the intercepted output path and the previous panic hook.
    /// The final flush cannot race an in-flight one: both run on the
    /// dispatcher task, which is joined here before anything is unwired.
    pub async fn shutdown(mut self) -> Result<(), AgentError> {
        self.cancel.cancel();
        if let Some(task) = self.dispatcher.take() {
            task.await
                .map_err(|err| AgentError::Shutdown(err.to_string()))?;
        }
        if let Some(mut guard) = self.intercept.take() {
            guard.restore();
        }
        if let Some(mut guard) = self.panic_guard.take() {
            guard.restore();
        }
        self.inner.disable();
        Ok(())
    }
}
