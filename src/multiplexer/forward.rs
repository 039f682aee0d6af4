//! Fan-in of backend streams into the merged streams.
//!
//! ```text
//! Backend 1 notifications ─┐
//! Backend 2 notifications ─┼──► merged notifications ──► consumer
//! Backend N notifications ─┘
//! ```
//!
//! Server requests are merged the same way through a second channel. Each
//! forwarder owns exactly one backend stream, so per-backend order is kept;
//! messages from different backends interleave in arrival order.

use log::debug;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::message::Downstream;

/// Spawn a forwarder draining `source` into `sink` until the source ends,
/// the sink's receiver is dropped, or `cancel_token` is cancelled.
pub(super) fn spawn_forwarder<T: Send + 'static>(
    join_set: &mut JoinSet<()>,
    server_name: String,
    stream: &'static str,
    source: mpsc::UnboundedReceiver<T>,
    sink: mpsc::UnboundedSender<Downstream<T>>,
    cancel_token: CancellationToken,
) {
    join_set.spawn(forward_loop(server_name, stream, source, sink, cancel_token));
}

async fn forward_loop<T>(
    server_name: String,
    stream: &'static str,
    mut source: mpsc::UnboundedReceiver<T>,
    sink: mpsc::UnboundedSender<Downstream<T>>,
    cancel_token: CancellationToken,
) {
    debug!(
        target: "lspx::forward",
        "Forwarding {} from '{}'",
        stream,
        server_name
    );

    loop {
        tokio::select! {
            biased;

            _ = cancel_token.cancelled() => {
                debug!(
                    target: "lspx::forward",
                    "Forwarder for {} from '{}' cancelled",
                    stream,
                    server_name
                );
                return;
            }

            next = source.recv() => {
                let Some(message) = next else {
                    debug!(
                        target: "lspx::forward",
                        "Backend '{}' closed its {} stream",
                        server_name,
                        stream
                    );
                    return;
                };

                let item = Downstream {
                    server_name: server_name.clone(),
                    message,
                };
                if sink.send(item).is_err() {
                    debug!(
                        target: "lspx::forward",
                        "Merged {} stream dropped, stopping forwarder for '{}'",
                        stream,
                        server_name
                    );
                    return;
                }
            }
        }
    }
}
