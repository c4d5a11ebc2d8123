// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::agent::AgentInner;
use crate::delivery::CollectorClient;
use crate::entry::Severity;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// What woke the dispatcher up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushReason {
    /// Periodic timer tick.
    Timer,
    /// An error-severity entry was appended.
    Escalation,
    /// Final drain before the dispatcher exits.
    Shutdown,
}

impl fmt::Display for FlushReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FlushReason::Timer => "timer",
            FlushReason::Escalation => "escalation",
            FlushReason::Shutdown => "shutdown",
        })
    }
}

/// Drains the entry buffer and ships batches to the collector.
///
/// A single task owns every flush, so at most one delivery is ever in flight.
/// Triggers that arrive while a flush is running queue on the escalation
/// channel and are handled afterwards; if the in-flight flush already drained
/// everything they coalesce into no-ops.
pub(crate) struct Dispatcher {
    inner: Arc<AgentInner>,
    client: CollectorClient,
    flush_interval: Duration,
    trigger_rx: UnboundedReceiver<FlushReason>,
    cancel: CancellationToken,
}

impl Dispatcher {
    pub(crate) fn new(
        inner: Arc<AgentInner>,
        client: CollectorClient,
        flush_interval: Duration,
        trigger_rx: UnboundedReceiver<FlushReason>,
        cancel: CancellationToken,
    ) -> Self {
        Dispatcher {
            inner,
            client,
            flush_interval,
            trigger_rx,
            cancel,
        }
    }

    pub(crate) async fn run(mut self) {
        let mut ticker = interval(self.flush_interval);
        ticker.tick().await; // discard first tick, which is instantaneous

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    self.flush(FlushReason::Shutdown).await;
                    break;
                }
                _ = ticker.tick() => {
                    self.flush(FlushReason::Timer).await;
                }
                maybe_reason = self.trigger_rx.recv() => {
                    match maybe_reason {
                        Some(reason) => self.flush(reason).await,
                        None => {
                            // channel closed; drain what is left and stop
                            self.flush(FlushReason::Shutdown).await;
                            break;
                        }
                    }
                }
            }
        }
    }

    async fn flush(&mut self, reason: FlushReason) {
        let batch = self.inner.drain_all();
        if batch.is_empty() {
            return;
        }

        debug!("flushing {} entries ({reason})", batch.len());

        match self.client.deliver(&batch).await {
            Ok(()) => {
                debug!("delivered {} entries", batch.len());
            }
            Err(err) => {
                // Delivery failures are reported only on the original output
                // channel; routing them through the capture path would feed
                // the failure back into the buffer it came from.
                self.inner.echo(
                    Severity::Error,
                    &format!("failed to deliver {} log entries, requeued: {err}", batch.len()),
                );
                self.inner.requeue_front(batch);
            }
        }
    }
}
