//! Collapsing per-backend initialization results into one.

use serde_json::Value;
use tower_lsp_server::ls_types::{InitializeResult, ServerCapabilities, ServerInfo};

use super::state::Agent;
use crate::config::ServerInfoSettings;

/// Compute the `initialize` result returned to the consumer.
///
/// The first agent's own result wins, verbatim; capabilities of the other
/// agents are not merged in. With no agents, an empty capability set is
/// advertised under the fallback server identity.
pub(crate) fn merge_capabilities<B>(agents: &[Agent<B>], fallback: &ServerInfoSettings) -> Value {
    match agents.first() {
        Some(first) => first.initialization().clone(),
        None => default_initialize_result(fallback),
    }
}

pub(crate) fn default_initialize_result(fallback: &ServerInfoSettings) -> Value {
    let result = InitializeResult {
        capabilities: ServerCapabilities::default(),
        server_info: Some(ServerInfo {
            name: fallback.name.clone(),
            version: Some(fallback.version.clone()),
        }),
        ..Default::default()
    };
    serde_json::to_value(result).unwrap_or_else(|e| {
        log::warn!(
            target: "lspx::multiplexer",
            "Failed to serialize default initialize result: {}",
            e
        );
        Value::Null
    })
}

/// Parse the capability set out of a raw initialization result.
///
/// A result that does not carry a well-formed `capabilities` member yields
/// the empty set; the raw result is still kept and returned verbatim.
pub(crate) fn parse_capabilities(server_name: &str, initialization: &Value) -> ServerCapabilities {
    let Some(raw) = initialization.get("capabilities") else {
        log::warn!(
            target: "lspx::multiplexer",
            "Backend '{}' returned no capabilities",
            server_name
        );
        return ServerCapabilities::default();
    };

    serde_json::from_value(raw.clone()).unwrap_or_else(|e| {
        log::warn!(
            target: "lspx::multiplexer",
            "Backend '{}' returned malformed capabilities: {}",
            server_name,
            e
        );
        ServerCapabilities::default()
    })
}
