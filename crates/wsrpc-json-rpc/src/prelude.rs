//! # JSON-RPC Message Layer Prelude
//!
//! This module provides convenient re-exports of the most commonly used types
//! from the message layer.
//!
//! ```rust
//! use wsrpc_json_rpc::prelude::*;
//! ```

// Core JSON-RPC types
pub use crate::dispatch::{Arguments, MethodTable, ParamType};
pub use crate::error::{JsonRpcErrorCode, JsonRpcErrorObject, ToJsonRpcError};
pub use crate::exception::JsonRpcException;
pub use crate::message::{InboundMessage, Message, Rejection};
pub use crate::request::JsonRpcRequest;
pub use crate::response::{JsonRpcResponse, ResponsePayload};
pub use crate::types::{JsonRpcVersion, RequestId};

#[cfg(feature = "async")]
pub use crate::r#async::RpcTarget;

// Standard error codes
pub use crate::error_codes::*;
