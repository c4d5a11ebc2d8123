// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::entry::LogEntry;
use crate::error::AgentError;
use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;

/// One batched delivery: `{"logs": [entry, ...]}`.
#[derive(Serialize)]
struct LogsPayload<'a> {
    logs: &'a [LogEntry],
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("collector request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("collector returned error status {0}")]
    Status(StatusCode),
}

/// HTTP client for the collector endpoint.
pub struct CollectorClient {
    client: reqwest::Client,
    endpoint: String,
}

impl CollectorClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, AgentError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(CollectorClient {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    /// Ship one batch as a single request. Success is any non-error status;
    /// an error status or a network-level failure is a delivery failure and
    /// the caller decides what to do with the batch.
    pub async fn deliver(&self, batch: &[LogEntry]) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&LogsPayload { logs: batch })
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(DeliveryError::Status(status));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{Origin, Severity};
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn batch() -> Vec<LogEntry> {
        vec![
            LogEntry::new(Severity::Error, "db timeout", Origin::Api)
                .with_context(json!({"table": "orders"})),
            LogEntry::new(Severity::Info, "retrying", Origin::Api),
        ]
    }

    #[tokio::test]
    async fn delivers_batch_as_single_json_payload() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/logs/agent")
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJson(json!({
                "logs": [
                    {
                        "severity": "error",
                        "message": "db timeout",
                        "origin": "api",
                        "context": {"table": "orders"}
                    },
                    {"severity": "info", "message": "retrying", "origin": "api"}
                ]
            })))
            .with_status(202)
            .create_async()
            .await;

        let client = CollectorClient::new(
            &format!("{}/api/logs/agent", server.url()),
            Duration::from_secs(2),
        )
        .expect("failed to build client");

        client.deliver(&batch()).await.expect("delivery failed");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn error_status_is_a_delivery_failure() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/logs/agent")
            .with_status(500)
            .with_body("Internal Server Error")
            .create_async()
            .await;

        let client = CollectorClient::new(
            &format!("{}/api/logs/agent", server.url()),
            Duration::from_secs(2),
        )
        .expect("failed to build client");

        let result = client.deliver(&batch()).await;
        match result {
            Err(DeliveryError::Status(status)) => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            }
            other => panic!("expected status failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_collector_is_a_delivery_failure() {
        // port 9 (discard) is not listening
        let client = CollectorClient::new("http://127.0.0.1:9/api/logs/agent", Duration::from_millis(500))
            .expect("failed to build client");

        let result = client.deliver(&batch()).await;
        assert!(matches!(result, Err(DeliveryError::Network(_))));
    }
}
