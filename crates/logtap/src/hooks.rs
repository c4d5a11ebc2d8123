// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Host-level failure hooks: the process-wide panic hook (uncaught errors)
//! and the task watcher (asynchronous failures nobody consumes).

use crate::agent::AgentInner;
use crate::entry::{LogEntry, Origin, Severity};
use serde_json::{json, Map, Value};
use std::any::Any;
use std::backtrace::Backtrace;
use std::fmt;
use std::future::Future;
use std::panic::{self, PanicHookInfo};
use std::sync::Arc;
use tokio::task::JoinHandle;

type HookFn = dyn Fn(&PanicHookInfo<'_>) + Send + Sync + 'static;

/// Owns the previously installed panic hook; `restore()` puts it back.
pub struct PanicHookGuard {
    previous: Option<Arc<HookFn>>,
}

impl PanicHookGuard {
    pub fn restore(&mut self) {
        if let Some(previous) = self.previous.take() {
            panic::set_hook(Box::new(move |info| previous(info)));
        }
    }
}

impl Drop for PanicHookGuard {
    fn drop(&mut self) {
        self.restore();
    }
}

/// Install a panic hook that reports the panic as an error entry and then
/// forwards to the hook that was installed before, so host behavior (default
/// stderr report, test harness output) is unchanged.
pub(crate) fn install_panic_hook(inner: Arc<AgentInner>) -> PanicHookGuard {
    let previous: Arc<HookFn> = Arc::from(panic::take_hook());
    let forward = Arc::clone(&previous);

    panic::set_hook(Box::new(move |info| {
        report_panic(&inner, info);
        forward(info);
    }));

    PanicHookGuard {
        previous: Some(previous),
    }
}

fn report_panic(inner: &AgentInner, info: &PanicHookInfo<'_>) {
    let message = payload_text(info.payload());

    let mut context = Map::new();
    if let Some(location) = info.location() {
        context.insert("file".to_string(), Value::String(location.file().to_string()));
        context.insert("line".to_string(), Value::from(location.line()));
        context.insert("column".to_string(), Value::from(location.column()));
    }

    let trace = Backtrace::force_capture().to_string();

    inner.submit(
        LogEntry::new(Severity::Error, message, Origin::Panic)
            .with_context(Value::Object(context))
            .with_trace(trace),
    );
}

/// Run a fallible task under observation. The future is spawned; an `Err`
/// result or an in-task panic is reported as an error entry with origin
/// `task` and escalated, since nobody else will consume the failure.
pub(crate) fn watch_task<F, T, E>(
    inner: Arc<AgentInner>,
    name: &str,
    future: F,
) -> JoinHandle<Option<T>>
where
    F: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: fmt::Display + Send + 'static,
{
    let name = name.to_string();
    tokio::spawn(async move {
        let task = tokio::spawn(future);
        match task.await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(err)) => {
                inner.submit(
                    LogEntry::new(
                        Severity::Error,
                        format!("task '{name}' failed: {err}"),
                        Origin::Task,
                    )
                    .with_context(json!({"task": name})),
                );
                None
            }
            Err(join_err) => {
                if join_err.is_panic() {
                    let payload = join_err.into_panic();
                    inner.submit(
                        LogEntry::new(
                            Severity::Error,
                            format!("task '{name}' panicked: {}", payload_text(payload.as_ref())),
                            Origin::Task,
                        )
                        .with_context(json!({"task": name})),
                    );
                }
                None
            }
        }
    })
}

fn payload_text(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
