// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::entry::Severity;
use std::sync::{Mutex, PoisonError};

/// The original, non-intercepted output channel.
///
/// Everything the agent writes for developers goes through this seam: the
/// tagged echo of explicit entries and the dispatcher's delivery-failure
/// reports. Nothing written here passes through the capture pipeline.
pub trait ConsoleSink: Send + Sync {
    fn write_line(&self, severity: Severity, line: &str);
}

/// Default sink: stderr.
#[derive(Debug, Default)]
pub struct StderrSink;

impl ConsoleSink for StderrSink {
    fn write_line(&self, _severity: Severity, line: &str) {
        eprintln!("{line}");
    }
}

/// Sink that records every line, for tests and embedders that redirect the
/// agent's developer-visible output.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(Severity, String)>>,
}

impl MemorySink {
    pub fn lines(&self) -> Vec<(Severity, String)> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ConsoleSink for MemorySink {
    fn write_line(&self, severity: Severity, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((severity, line.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_records_lines_in_order() {
        let sink = MemorySink::default();
        sink.write_line(Severity::Info, "[INFO] one");
        sink.write_line(Severity::Error, "[ERROR] two");
        let lines = sink.lines();
        assert_eq!(lines[0], (Severity::Info, "[INFO] one".to_string()));
        assert_eq!(lines[1], (Severity::Error, "[ERROR] two".to_string()));
    }
}
