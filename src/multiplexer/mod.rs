//! The multiplexer endpoint.
//!
//! Presents N backends as one endpoint:
//!
//! ```text
//!                      ┌──► Backend 1
//! consumer ──► Multiplexer ──► Backend 2      notify: broadcast (after initialize)
//!                      └──► Backend N      request: first backend (after initialize)
//!
//! consumer ◄── merged notifications / server requests ◄── all backends
//! ```
//!
//! A `Multiplexer` is a scoped resource: dropping it (or calling
//! [`Multiplexer::shutdown`]) stops every forwarder task and closes both
//! merged streams.

mod capabilities;
mod forward;
mod state;

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tower_lsp_server::ls_types::ServerCapabilities;

use crate::backend::{Backend, BackendEndpoint};
use crate::config::MultiplexerSettings;
use crate::error::RpcResult;
use crate::message::{Downstream, Notification, ServerRequest};
use state::{State, Transition};

/// Merged stream of notifications pushed by all backends.
pub type MergedNotifications = mpsc::UnboundedReceiver<Downstream<Notification>>;
/// Merged stream of server requests pushed by all backends.
pub type MergedServerRequests = mpsc::UnboundedReceiver<Downstream<ServerRequest>>;

/// Several backends exposed as a single protocol endpoint.
pub struct Multiplexer<B> {
    transition: Transition<B>,
    backend_count: usize,
    notifications: Mutex<Option<MergedNotifications>>,
    requests: Mutex<Option<MergedServerRequests>>,
    forwarders: Mutex<JoinSet<()>>,
    cancel_token: CancellationToken,
}

impl<B: Backend> Multiplexer<B> {
    /// Start multiplexing `endpoints` with default settings.
    ///
    /// Must be called within a tokio runtime: the forwarder tasks are
    /// spawned immediately.
    pub fn new(endpoints: Vec<BackendEndpoint<B>>) -> Self {
        Self::with_settings(endpoints, MultiplexerSettings::default())
    }

    pub fn with_settings(endpoints: Vec<BackendEndpoint<B>>, settings: MultiplexerSettings) -> Self {
        let (notification_tx, notification_rx) = mpsc::unbounded_channel();
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let cancel_token = CancellationToken::new();
        let mut forwarders = JoinSet::new();

        let backend_count = endpoints.len();
        let mut backends = Vec::with_capacity(backend_count);
        for endpoint in endpoints {
            let name = endpoint.backend.name().to_string();
            forward::spawn_forwarder(
                &mut forwarders,
                name.clone(),
                "notifications",
                endpoint.notifications,
                notification_tx.clone(),
                cancel_token.child_token(),
            );
            forward::spawn_forwarder(
                &mut forwarders,
                name,
                "server requests",
                endpoint.requests,
                request_tx.clone(),
                cancel_token.child_token(),
            );
            backends.push(Arc::new(endpoint.backend));
        }

        log::debug!(
            target: "lspx::multiplexer",
            "Multiplexing {} backend(s)",
            backend_count
        );

        Self {
            transition: Transition::new(backends, settings.server_info),
            backend_count,
            notifications: Mutex::new(Some(notification_rx)),
            requests: Mutex::new(Some(request_rx)),
            forwarders: Mutex::new(forwarders),
            cancel_token,
        }
    }

    /// Send a notification.
    ///
    /// Before initialization this is a no-op. Afterwards the notification is
    /// broadcast to every backend in order, stopping at the first failure.
    pub async fn notify(&self, method: &str, params: Value) -> RpcResult<()> {
        let state = self.transition.current();
        state.notify(method, params).await
    }

    /// Send a request.
    ///
    /// Before initialization only `initialize` is accepted; it is sent to
    /// every backend and the first backend's result is returned. Afterwards
    /// requests are routed to the first backend.
    pub async fn request(&self, method: &str, params: Value) -> RpcResult<Value> {
        let state = self.transition.current();
        state.request(method, params, &self.transition).await
    }

    /// Take the merged notification stream. Returns `None` after the first call.
    pub fn take_notifications(&self) -> Option<MergedNotifications> {
        self.notifications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Take the merged server request stream. Returns `None` after the first call.
    pub fn take_server_requests(&self) -> Option<MergedServerRequests> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub fn is_initialized(&self) -> bool {
        self.transition.current().is_initialized()
    }

    /// Wait until the handshake has completed.
    pub async fn wait_initialized(&self) {
        let mut rx = self.transition.subscribe();
        // The sender lives as long as `self`, so this cannot fail while borrowed.
        let _ = rx.wait_for(|state| state.is_initialized()).await;
    }

    /// Capabilities advertised by each backend, in backend order.
    ///
    /// Empty until the handshake has completed.
    pub fn agents_capabilities(&self) -> Vec<(String, ServerCapabilities)> {
        match &*self.transition.current() {
            State::Uninitialized { .. } => Vec::new(),
            State::Initialized { agents } => agents
                .iter()
                .map(|agent| {
                    (
                        agent.backend().name().to_string(),
                        agent.capabilities().clone(),
                    )
                })
                .collect(),
        }
    }

    pub fn backend_count(&self) -> usize {
        self.backend_count
    }

    /// Stop all forwarders and wait for them to exit.
    pub async fn shutdown(mut self) {
        self.cancel_token.cancel();
        let forwarders = self
            .forwarders
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        while let Some(result) = forwarders.join_next().await {
            if let Err(e) = result {
                log::error!(
                    target: "lspx::multiplexer",
                    "Forwarder task panicked: {}",
                    e
                );
            }
        }
        log::debug!(target: "lspx::multiplexer", "Multiplexer shut down");
    }
}

impl<B> Drop for Multiplexer<B> {
    fn drop(&mut self) {
        // Forwarders still running are aborted when the JoinSet drops.
        self.cancel_token.cancel();
    }
}
