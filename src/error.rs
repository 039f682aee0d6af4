//! JSON-RPC compliant error types for the multiplexer.
//!
//! Every failure surfaced by [`Multiplexer`](crate::Multiplexer) is a
//! [`ResponseError`]: either one of the protocol errors raised by the
//! multiplexer itself, or a backend's own error passed through unmodified.
//! The structure matches the JSON-RPC Response Message `error` member so it
//! can be serialized back to a remote caller unchanged.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tower_lsp_server::jsonrpc;

/// JSON-RPC / LSP error codes used by the multiplexer.
pub struct ErrorCodes;

impl ErrorCodes {
    /// The JSON sent is not a valid request object (JSON-RPC reserved)
    /// Use for: a second `initialize`
    pub const INVALID_REQUEST: i32 = -32600;

    /// Internal JSON-RPC error (JSON-RPC reserved)
    /// Use for: routing a request when no backend is configured
    pub const INTERNAL_ERROR: i32 = -32603;

    /// Server not initialized (JSON-RPC reserved)
    /// Use for: requests sent before `initialize`
    pub const SERVER_NOT_INITIALIZED: i32 = -32002;

    /// Request failed but was syntactically correct (LSP 3.17)
    /// Use for: a backend whose channel closed before answering
    pub const REQUEST_FAILED: i32 = -32803;
}

/// JSON-RPC error object (LSP 3.x § Response Message).
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{message} (code {code})")]
pub struct ResponseError {
    /// Error code
    pub code: i32,
    /// Human-readable error message
    pub message: String,
    /// Optional additional error data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ResponseError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create a SERVER_NOT_INITIALIZED error
    pub fn not_initialized(message: impl Into<String>) -> Self {
        Self::new(ErrorCodes::SERVER_NOT_INITIALIZED, message)
    }

    /// Create an INVALID_REQUEST error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCodes::INVALID_REQUEST, message)
    }

    /// Create an INTERNAL_ERROR error
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCodes::INTERNAL_ERROR, message)
    }

    /// Create a REQUEST_FAILED error for general backend failures
    pub fn request_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCodes::REQUEST_FAILED, message)
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl From<ResponseError> for jsonrpc::Error {
    fn from(error: ResponseError) -> Self {
        jsonrpc::Error {
            code: jsonrpc::ErrorCode::from(i64::from(error.code)),
            message: error.message.into(),
            data: error.data,
        }
    }
}

/// Result type for multiplexer and backend operations
pub type RpcResult<T> = Result<T, ResponseError>;
