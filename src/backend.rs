//! Backend abstraction and a channel-based implementation.
//!
//! A backend is one downstream protocol endpoint. The multiplexer talks to it
//! through the [`Backend`] trait and drains its two inbound streams, which are
//! handed over separately in a [`BackendEndpoint`].
//!
//! [`channel_backend`] builds a backend whose other side is a [`ChannelPeer`]:
//!
//! ```text
//! Multiplexer ──► ChannelBackend ──► OutboundMessage ──► ChannelPeer (transport)
//! Multiplexer ◄── notifications / requests ◄──────────── ChannelPeer (transport)
//! ```

use std::future::Future;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::error::{ResponseError, RpcResult};
use crate::message::{Notification, ServerRequest};

/// One downstream endpoint of the multiplexed protocol.
///
/// # Error Handling
///
/// Both operations report failures as [`ResponseError`]; the multiplexer
/// passes them through to its caller unmodified.
pub trait Backend: Send + Sync + 'static {
    /// Name used to tag merged messages and in logs.
    fn name(&self) -> &str;

    /// Send a notification. Completes once the notification is handed off.
    fn notify(&self, method: &str, params: Value) -> impl Future<Output = RpcResult<()>> + Send;

    /// Send a request and wait for its result.
    fn request(&self, method: &str, params: Value)
    -> impl Future<Output = RpcResult<Value>> + Send;
}

/// A backend together with the streams of messages it pushes upstream.
pub struct BackendEndpoint<B> {
    pub backend: B,
    pub notifications: mpsc::UnboundedReceiver<Notification>,
    pub requests: mpsc::UnboundedReceiver<ServerRequest>,
}

impl<B: Backend> BackendEndpoint<B> {
    pub fn new(
        backend: B,
        notifications: mpsc::UnboundedReceiver<Notification>,
        requests: mpsc::UnboundedReceiver<ServerRequest>,
    ) -> Self {
        Self {
            backend,
            notifications,
            requests,
        }
    }
}

/// Message sent from a [`ChannelBackend`] to its [`ChannelPeer`].
#[derive(Debug)]
pub enum OutboundMessage {
    /// Notification (no response expected).
    Notification(Notification),

    /// Request; the peer answers through `respond_to`.
    Request {
        method: String,
        params: Value,
        respond_to: oneshot::Sender<RpcResult<Value>>,
    },
}

/// [`Backend`] implementation that forwards calls over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelBackend {
    name: String,
    outbound: mpsc::UnboundedSender<OutboundMessage>,
}

/// The transport side of a [`ChannelBackend`].
///
/// Dropping `notifications` or `requests` ends the matching inbound stream;
/// dropping `outbound` makes every later call on the backend fail.
#[derive(Debug)]
pub struct ChannelPeer {
    /// Calls made on the backend, in the order they were made.
    pub outbound: mpsc::UnboundedReceiver<OutboundMessage>,
    /// Notifications to push upstream.
    pub notifications: mpsc::UnboundedSender<Notification>,
    /// Server requests to push upstream.
    pub requests: mpsc::UnboundedSender<ServerRequest>,
}

/// Create a channel-backed endpoint and the peer that drives it.
pub fn channel_backend(name: impl Into<String>) -> (BackendEndpoint<ChannelBackend>, ChannelPeer) {
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (notification_tx, notification_rx) = mpsc::unbounded_channel();
    let (request_tx, request_rx) = mpsc::unbounded_channel();

    let backend = ChannelBackend {
        name: name.into(),
        outbound: outbound_tx,
    };
    let peer = ChannelPeer {
        outbound: outbound_rx,
        notifications: notification_tx,
        requests: request_tx,
    };

    (
        BackendEndpoint::new(backend, notification_rx, request_rx),
        peer,
    )
}

impl ChannelBackend {
    fn closed(&self) -> ResponseError {
        ResponseError::request_failed(format!("backend '{}': channel closed", self.name))
    }
}

impl Backend for ChannelBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn notify(&self, method: &str, params: Value) -> RpcResult<()> {
        self.outbound
            .send(OutboundMessage::Notification(Notification::new(
                method, params,
            )))
            .map_err(|_| self.closed())
    }

    async fn request(&self, method: &str, params: Value) -> RpcResult<Value> {
        let (tx, rx) = oneshot::channel();
        self.outbound
            .send(OutboundMessage::Request {
                method: method.to_string(),
                params,
                respond_to: tx,
            })
            .map_err(|_| self.closed())?;

        match rx.await {
            Ok(result) => result,
            Err(_) => {
                log::warn!(
                    target: "lspx::backend",
                    "Backend '{}' dropped request '{}' without answering",
                    self.name,
                    method
                );
                Err(self.closed())
            }
        }
    }
}
