//! # WebSocket JSON-RPC Server
//!
//! This crate serves JSON-RPC 2.0 over WebSocket. Every accepted connection
//! gets its own handler object, built by a factory installed on the
//! [`Listener`], and its own [`Connection`] adapter that parses frames,
//! dispatches requests to the handler and sends responses back.
//!
//! ## Features
//! - Generic over any handler type implementing [`RpcTarget`]
//! - Text and binary frames, strictly ordered per connection
//! - Error responses for malformed input without dropping the connection
//! - Active-connection registry and cooperative shutdown

pub mod config;
pub mod connection;
pub mod listener;
pub mod registry;

// Re-export main types
pub use config::{FrameFormat, ServerConfig};
pub use connection::{Connection, ConnectionState};
pub use listener::{HandlerFactory, Listener};
pub use registry::{ConnectionId, ConnectionInfo, ConnectionRegistry};

// Re-export foundational types
pub use wsrpc_json_rpc::{JsonRpcException, MethodTable, ParamType, RpcTarget};

use std::net::SocketAddr;

/// Result type for server operations
pub type Result<T> = std::result::Result<T, WsRpcError>;

/// Server specific errors
#[derive(Debug, thiserror::Error)]
pub enum WsRpcError {
    #[error("Failed to listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Listener is already accepting connections on {0}")]
    AlreadyListening(SocketAddr),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
