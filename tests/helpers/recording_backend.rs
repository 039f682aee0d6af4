//! A `Backend` that records every call into a journal shared across backends.
//!
//! Because all backends append to the same journal, tests can assert on the
//! relative order of calls made to different backends.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use lspx::{
    Backend, BackendEndpoint, INITIALIZE_METHOD, Notification, ResponseError, RpcResult,
    ServerRequest,
};
use serde_json::{Value, json};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Notify,
    Request,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub server: String,
    pub kind: CallKind,
    pub method: String,
    pub params: Value,
}

pub type Journal = Arc<Mutex<Vec<Call>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

/// Senders feeding a backend's inbound streams.
pub struct Pushers {
    pub notifications: mpsc::UnboundedSender<Notification>,
    pub requests: mpsc::UnboundedSender<ServerRequest>,
}

pub struct RecordingBackend {
    name: String,
    journal: Journal,
    init_result: Value,
    initialize_error: Option<ResponseError>,
    initialize_delay: Option<Duration>,
    notify_error: Option<ResponseError>,
    request_error: Option<ResponseError>,
}

impl RecordingBackend {
    /// A backend answering `initialize` with a result naming itself.
    pub fn new(name: &str, journal: &Journal) -> Self {
        Self {
            name: name.to_string(),
            journal: Arc::clone(journal),
            init_result: json!({
                "capabilities": {"hoverProvider": true},
                "serverInfo": {"name": name, "version": "1.0.0"}
            }),
            initialize_error: None,
            initialize_delay: None,
            notify_error: None,
            request_error: None,
        }
    }

    pub fn with_init_result(mut self, init_result: Value) -> Self {
        self.init_result = init_result;
        self
    }

    pub fn failing_initialize(mut self, error: ResponseError) -> Self {
        self.initialize_error = Some(error);
        self
    }

    pub fn with_initialize_delay(mut self, delay: Duration) -> Self {
        self.initialize_delay = Some(delay);
        self
    }

    pub fn failing_notify(mut self, error: ResponseError) -> Self {
        self.notify_error = Some(error);
        self
    }

    pub fn failing_requests(mut self, error: ResponseError) -> Self {
        self.request_error = Some(error);
        self
    }

    pub fn endpoint(self) -> (BackendEndpoint<Self>, Pushers) {
        let (notification_tx, notification_rx) = mpsc::unbounded_channel();
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        (
            BackendEndpoint::new(self, notification_rx, request_rx),
            Pushers {
                notifications: notification_tx,
                requests: request_tx,
            },
        )
    }

    fn record(&self, kind: CallKind, method: &str, params: &Value) {
        self.journal
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Call {
                server: self.name.clone(),
                kind,
                method: method.to_string(),
                params: params.clone(),
            });
    }
}

impl Backend for RecordingBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn notify(&self, method: &str, params: Value) -> RpcResult<()> {
        self.record(CallKind::Notify, method, &params);
        match &self.notify_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn request(&self, method: &str, params: Value) -> RpcResult<Value> {
        self.record(CallKind::Request, method, &params);

        if method == INITIALIZE_METHOD {
            if let Some(delay) = self.initialize_delay {
                tokio::time::sleep(delay).await;
            }
            return match &self.initialize_error {
                Some(error) => Err(error.clone()),
                None => Ok(self.init_result.clone()),
            };
        }

        match &self.request_error {
            Some(error) => Err(error.clone()),
            None => Ok(json!({"server": self.name, "method": method})),
        }
    }
}

/// Calls recorded so far, in order.
pub fn calls(journal: &Journal) -> Vec<Call> {
    journal.lock().unwrap_or_else(|e| e.into_inner()).clone()
}
