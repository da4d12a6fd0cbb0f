//! # JSON-RPC 2.0 Message Layer
//!
//! A transport-agnostic implementation of the JSON-RPC 2.0 message layer.
//! This crate validates and models inbound/outbound messages, translates
//! failures into standard error objects and provides the method
//! dispatch capability that handler objects expose. It performs no I/O.
//!
//! ## Features
//! - Strict envelope validation (`jsonrpc`, id shape, method, positional params)
//! - A closed exception taxonomy with a single projection onto error objects
//! - Registration tables mapping method names onto typed handler operations
//! - Async dispatch trait with the `async` feature

pub mod dispatch;
pub mod error;
pub mod exception;
pub mod message;
pub mod prelude;
pub mod request;
pub mod response;
pub mod types;

#[cfg(feature = "async")]
pub mod r#async;

// Re-export main types
pub use dispatch::{Arguments, MethodTable, ParamType, json_type_name};
pub use error::{JsonRpcErrorCode, JsonRpcErrorObject, ToJsonRpcError};
pub use exception::JsonRpcException;
pub use message::{InboundMessage, Message, Rejection};
pub use request::JsonRpcRequest;
pub use response::{JsonRpcResponse, ResponsePayload};
pub use types::{JsonRpcVersion, RequestId};

#[cfg(feature = "async")]
pub use r#async::RpcTarget;

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC 2.0 error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
}
