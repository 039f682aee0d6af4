//! Protocol message types exchanged with backends.
//!
//! The multiplexer only needs to recognise the `initialize` method; every
//! other payload is carried as opaque JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_lsp_server::jsonrpc::Id;
use tower_lsp_server::ls_types::request::{Initialize, Request};

/// Method name of the handshake request.
pub const INITIALIZE_METHOD: &str = <Initialize as Request>::METHOD;

pub(crate) fn is_initialize(method: &str) -> bool {
    method == INITIALIZE_METHOD
}

/// A notification pushed by a backend (e.g. `window/logMessage`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl Notification {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }
}

/// A server-initiated request pushed by a backend (e.g. `workspace/applyEdit`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerRequest {
    pub id: Id,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl ServerRequest {
    pub fn new(id: Id, method: impl Into<String>, params: Value) -> Self {
        Self {
            id,
            method: method.into(),
            params,
        }
    }
}

/// A message on one of the merged streams, tagged with the backend it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Downstream<T> {
    /// Name of the originating backend (see [`Backend::name`](crate::Backend::name)).
    pub server_name: String,
    pub message: T,
}
