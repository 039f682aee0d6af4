//! Multiplex several language servers behind a single LSP endpoint.
//!
//! ```ignore
//! let (lua, lua_peer) = lspx::channel_backend("lua-ls");
//! let (md, md_peer) = lspx::channel_backend("marksman");
//! // hand the peers to the transport layer, then:
//! let multiplexer = lspx::Multiplexer::new(vec![lua, md]);
//! let init = multiplexer.request("initialize", params).await?;
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod message;
pub mod multiplexer;

pub use backend::{
    Backend, BackendEndpoint, ChannelBackend, ChannelPeer, OutboundMessage, channel_backend,
};
pub use config::{ConfigError, MultiplexerSettings, ServerInfoSettings, user_config_path};
pub use error::{ErrorCodes, ResponseError, RpcResult};
pub use message::{Downstream, INITIALIZE_METHOD, Notification, ServerRequest};
pub use multiplexer::{MergedNotifications, MergedServerRequests, Multiplexer};
