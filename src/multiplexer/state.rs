//! Handshake state machine.
//!
//! The multiplexer is in exactly one of two states:
//! - Uninitialized: notifications are dropped, only `initialize` is accepted
//! - Initialized: notifications are broadcast, requests go to the first agent
//!
//! The only transition is Uninitialized -> Initialized, published through
//! [`Transition`] before the initializing request returns.

use std::sync::Arc;

use log::{debug, warn};
use serde_json::Value;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinSet;
use tower_lsp_server::ls_types::ServerCapabilities;

use super::capabilities::{merge_capabilities, parse_capabilities};
use crate::backend::Backend;
use crate::config::ServerInfoSettings;
use crate::error::{ResponseError, RpcResult};
use crate::message::is_initialize;

/// A backend that completed the handshake, with the result it returned.
pub(crate) struct Agent<B> {
    backend: Arc<B>,
    initialization: Value,
    capabilities: ServerCapabilities,
}

impl<B> Agent<B> {
    pub(crate) fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub(crate) fn initialization(&self) -> &Value {
        &self.initialization
    }

    pub(crate) fn capabilities(&self) -> &ServerCapabilities {
        &self.capabilities
    }
}

impl<B: Backend> Agent<B> {
    pub(crate) fn new(backend: Arc<B>, initialization: Value) -> Self {
        let capabilities = parse_capabilities(backend.name(), &initialization);
        Self {
            backend,
            initialization,
            capabilities,
        }
    }
}

pub(crate) enum State<B> {
    Uninitialized { backends: Vec<Arc<B>> },
    Initialized { agents: Vec<Agent<B>> },
}

/// The single-slot channel holding the current state.
///
/// Readers clone the current `Arc<State>` at call time. The handshake lock
/// serialises concurrent `initialize` calls so that at most one fan-out
/// reaches the backends and the transition is published at most once.
pub(crate) struct Transition<B> {
    current: watch::Sender<Arc<State<B>>>,
    handshake: Mutex<()>,
    fallback: ServerInfoSettings,
}

impl<B: Backend> Transition<B> {
    pub(crate) fn new(backends: Vec<Arc<B>>, fallback: ServerInfoSettings) -> Self {
        let (current, _) = watch::channel(Arc::new(State::Uninitialized { backends }));
        Self {
            current,
            handshake: Mutex::new(()),
            fallback,
        }
    }

    pub(crate) fn current(&self) -> Arc<State<B>> {
        self.current.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<State<B>>> {
        self.current.subscribe()
    }

    fn publish(&self, state: State<B>) {
        self.current.send_replace(Arc::new(state));
    }
}

impl<B> State<B> {
    pub(crate) fn is_initialized(&self) -> bool {
        matches!(self, State::Initialized { .. })
    }
}

impl<B: Backend> State<B> {
    pub(crate) async fn notify(&self, method: &str, params: Value) -> RpcResult<()> {
        match self {
            State::Uninitialized { .. } => {
                debug!(
                    target: "lspx::multiplexer",
                    "Dropping notification '{}' received before initialize",
                    method
                );
                Ok(())
            }
            State::Initialized { agents } => {
                for agent in agents {
                    if let Err(e) = agent.backend.notify(method, params.clone()).await {
                        warn!(
                            target: "lspx::multiplexer",
                            "Broadcast of '{}' to '{}' failed: {}",
                            method,
                            agent.backend.name(),
                            e
                        );
                        return Err(e);
                    }
                }
                Ok(())
            }
        }
    }

    pub(crate) async fn request(
        &self,
        method: &str,
        params: Value,
        transition: &Transition<B>,
    ) -> RpcResult<Value> {
        match self {
            State::Uninitialized { backends } => {
                if !is_initialize(method) {
                    return Err(ResponseError::not_initialized("server not initialized"));
                }
                initialize(backends, method, params, transition).await
            }
            State::Initialized { agents } => {
                if is_initialize(method) {
                    return Err(ResponseError::invalid_request("initialize invoked twice"));
                }
                let Some(first) = agents.first() else {
                    return Err(ResponseError::internal_error(
                        "no backends to route requests to",
                    ));
                };
                first.backend.request(method, params).await
            }
        }
    }
}

/// Fan `initialize` out to every backend and publish the Initialized state.
///
/// All-or-nothing: the first backend failure aborts the remaining requests
/// and leaves the state untouched. Dropping the returned future aborts the
/// fan-out the same way.
async fn initialize<B: Backend>(
    backends: &[Arc<B>],
    method: &str,
    params: Value,
    transition: &Transition<B>,
) -> RpcResult<Value> {
    let _handshake = transition.handshake.lock().await;

    // Another caller may have completed the handshake while we waited.
    let current = transition.current();
    if current.is_initialized() {
        return Err(ResponseError::invalid_request("initialize invoked twice"));
    }

    debug!(
        target: "lspx::multiplexer",
        "Initializing {} backend(s)",
        backends.len()
    );

    let mut join_set = JoinSet::new();
    for (index, backend) in backends.iter().enumerate() {
        let backend = Arc::clone(backend);
        let method = method.to_string();
        let params = params.clone();
        join_set.spawn(async move { (index, backend.request(&method, params).await) });
    }

    let mut results: Vec<Option<Value>> = vec![None; backends.len()];
    while let Some(joined) = join_set.join_next().await {
        let (index, result) = joined.map_err(|e| {
            ResponseError::internal_error(format!("initialize task failed: {}", e))
        })?;
        match result {
            Ok(value) => results[index] = Some(value),
            Err(e) => {
                warn!(
                    target: "lspx::multiplexer",
                    "Backend '{}' failed to initialize: {}",
                    backends[index].name(),
                    e
                );
                return Err(e);
            }
        }
    }

    let agents: Vec<Agent<B>> = backends
        .iter()
        .zip(results)
        .filter_map(|(backend, result)| {
            result.map(|initialization| Agent::new(Arc::clone(backend), initialization))
        })
        .collect();

    let merged = merge_capabilities(&agents, &transition.fallback);
    transition.publish(State::Initialized { agents });

    debug!(
        target: "lspx::multiplexer",
        "Handshake complete, multiplexer initialized"
    );
    Ok(merged)
}
