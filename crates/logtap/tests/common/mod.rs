// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Request-capturing mock collector for integration tests

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use serde_json::Value;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

#[derive(Clone, Debug)]
#[allow(dead_code)]
pub struct ReceivedRequest {
    pub status: u16,
    pub payload: Value,
}

#[derive(Clone)]
#[allow(dead_code)]
pub struct MockCollector {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<ReceivedRequest>>>,
    status_plan: Arc<Mutex<VecDeque<u16>>>,
}

#[allow(dead_code)]
impl MockCollector {
    /// Start a mock collector on a random port. Responds 200 unless a status
    /// was queued with `push_status`.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock collector");
        let addr = listener.local_addr().expect("failed to get local addr");

        let requests = Arc::new(Mutex::new(Vec::new()));
        let status_plan: Arc<Mutex<VecDeque<u16>>> = Arc::new(Mutex::new(VecDeque::new()));

        let requests_clone = requests.clone();
        let plan_clone = status_plan.clone();

        tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => break,
                };

                let io = TokioIo::new(stream);
                let requests = requests_clone.clone();
                let plan = plan_clone.clone();

                tokio::spawn(async move {
                    let service = hyper::service::service_fn(move |req: Request<Incoming>| {
                        let requests = requests.clone();
                        let plan = plan.clone();
                        async move {
                            let body = req
                                .into_body()
                                .collect()
                                .await
                                .map(|collected| collected.to_bytes().to_vec())
                                .unwrap_or_default();

                            let status = plan.lock().unwrap().pop_front().unwrap_or(200);
                            let payload =
                                serde_json::from_slice::<Value>(&body).unwrap_or(Value::Null);

                            requests
                                .lock()
                                .unwrap()
                                .push(ReceivedRequest { status, payload });

                            Ok::<_, hyper::http::Error>(
                                Response::builder()
                                    .status(status)
                                    .body(Full::new(Bytes::from_static(b"{\"ok\":true}")))
                                    .unwrap(),
                            )
                        }
                    });

                    let _ = hyper::server::conn::http1::Builder::new()
                        .serve_connection(io, service)
                        .await;
                });
            }
        });

        MockCollector {
            addr,
            requests,
            status_plan,
        }
    }

    /// Endpoint URL to hand to the agent.
    pub fn url(&self) -> String {
        format!("http://{}/api/logs/agent", self.addr)
    }

    /// Queue a response status for the next request(s), oldest first.
    pub fn push_status(&self, status: u16) {
        self.status_plan.lock().unwrap().push_back(status);
    }

    /// Every request seen so far, with the status it was answered with.
    pub fn requests(&self) -> Vec<ReceivedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Messages of every entry the collector accepted (non-error responses),
    /// flattened across requests in arrival order.
    pub fn delivered_messages(&self) -> Vec<String> {
        self.entries_delivered()
            .iter()
            .filter_map(|entry| entry["message"].as_str().map(str::to_string))
            .collect()
    }

    /// Entry objects the collector accepted, flattened in arrival order.
    pub fn entries_delivered(&self) -> Vec<Value> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|req| req.status < 400)
            .filter_map(|req| req.payload["logs"].as_array().cloned())
            .flatten()
            .collect()
    }
}

/// Poll `cond` until it holds or the timeout elapses.
#[allow(dead_code)]
pub async fn wait_until<F: Fn() -> bool>(cond: F, timeout_ms: u64) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    cond()
}
