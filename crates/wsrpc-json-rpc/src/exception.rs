//! Closed taxonomy of failures raised while parsing or dispatching messages.
//!
//! Every variant projects onto a [`JsonRpcErrorObject`] whose code is fixed
//! by its family and whose message is the variant's `Display` text.

use serde_json::{Value, json};
use thiserror::Error;

use crate::dispatch::json_type_name;
use crate::error::{JsonRpcErrorCode, JsonRpcErrorObject, ToJsonRpcError};
use crate::response::JsonRpcResponse;
use crate::types::RequestId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum JsonRpcException {
    /// Raw bytes are not JSON, or the top-level value is not an object.
    #[error("{}", with_reason("Parse error", .reason.as_deref()))]
    ParseError { reason: Option<String> },

    #[error("{}", with_reason("Invalid Request", .reason.as_deref()))]
    InvalidRequest { reason: Option<String> },

    #[error("{}", with_reason("Invalid Response", .reason.as_deref()))]
    InvalidResponse { reason: Option<String> },

    /// Malformed `error` member inside a response.
    #[error("{}", with_reason("Invalid Error", .reason.as_deref()))]
    InvalidError { reason: Option<String> },

    #[error("Method '{name}' not found")]
    UnknownMethodName { name: String },

    #[error("{}", count_message(.expected, .delivered, .method.as_deref()))]
    WrongArgumentCount {
        expected: usize,
        delivered: usize,
        method: Option<String>,
    },

    #[error("{}", type_message(.expected, .received, .reason.as_deref()))]
    WrongArgumentType {
        expected: String,
        received: String,
        reason: Option<String>,
    },

    /// The target operation itself failed.
    #[error("{message}")]
    InvocationFailed { message: String },
}

fn with_reason(title: &str, reason: Option<&str>) -> String {
    match reason {
        Some(reason) if !reason.is_empty() => format!("{}: {}", title, reason),
        _ => title.to_string(),
    }
}

fn count_message(expected: &usize, delivered: &usize, method: Option<&str>) -> String {
    match method {
        Some(method) => format!(
            "Method '{}' expects {} argument(s) but {} were delivered",
            method, expected, delivered
        ),
        None => format!(
            "Expected {} argument(s) but {} were delivered",
            expected, delivered
        ),
    }
}

fn type_message(expected: &str, received: &str, reason: Option<&str>) -> String {
    let base = format!(
        "Expected argument of type {} but received {}",
        expected, received
    );
    with_reason(&base, reason)
}

impl JsonRpcException {
    pub fn parse_error(reason: impl Into<String>) -> Self {
        Self::ParseError {
            reason: Some(reason.into()),
        }
    }

    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: Some(reason.into()),
        }
    }

    pub fn invalid_response(reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            reason: Some(reason.into()),
        }
    }

    pub fn invalid_error(reason: impl Into<String>) -> Self {
        Self::InvalidError {
            reason: Some(reason.into()),
        }
    }

    pub fn unknown_method(name: impl Into<String>) -> Self {
        Self::UnknownMethodName { name: name.into() }
    }

    pub fn wrong_argument_count(expected: usize, delivered: usize) -> Self {
        Self::WrongArgumentCount {
            expected,
            delivered,
            method: None,
        }
    }

    pub fn wrong_argument_count_for(
        method: impl Into<String>,
        expected: usize,
        delivered: usize,
    ) -> Self {
        Self::WrongArgumentCount {
            expected,
            delivered,
            method: Some(method.into()),
        }
    }

    pub fn wrong_argument_type(
        expected: impl Into<String>,
        received: impl Into<String>,
        reason: Option<String>,
    ) -> Self {
        Self::WrongArgumentType {
            expected: expected.into(),
            received: received.into(),
            reason,
        }
    }

    /// Like [`wrong_argument_type`](Self::wrong_argument_type) but reports
    /// the JSON type of the value that was received.
    pub fn wrong_argument_type_for_value(
        expected: impl Into<String>,
        received: &Value,
        reason: Option<String>,
    ) -> Self {
        Self::wrong_argument_type(expected, json_type_name(received), reason)
    }

    pub fn invocation_failed(message: impl Into<String>) -> Self {
        Self::InvocationFailed {
            message: message.into(),
        }
    }

    pub fn code(&self) -> JsonRpcErrorCode {
        match self {
            Self::ParseError { .. } => JsonRpcErrorCode::ParseError,
            Self::InvalidRequest { .. }
            | Self::InvalidResponse { .. }
            | Self::InvalidError { .. } => JsonRpcErrorCode::InvalidRequest,
            Self::UnknownMethodName { .. } => JsonRpcErrorCode::MethodNotFound,
            Self::WrongArgumentCount { .. } | Self::WrongArgumentType { .. } => {
                JsonRpcErrorCode::InvalidParams
            }
            Self::InvocationFailed { .. } => JsonRpcErrorCode::InternalError,
        }
    }

    /// Failures detected before an id can be trusted.
    ///
    /// Responses for these use [`to_unidentified_response`](Self::to_unidentified_response)
    /// whenever no reliable id was recovered.
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            Self::ParseError { .. }
                | Self::InvalidRequest { .. }
                | Self::InvalidResponse { .. }
                | Self::InvalidError { .. }
        )
    }

    fn data(&self) -> Option<Value> {
        match self {
            Self::WrongArgumentCount {
                expected,
                delivered,
                method,
            } => {
                let mut data = json!({ "expected": expected, "delivered": delivered });
                if let Some(method) = method {
                    data["method"] = Value::String(method.clone());
                }
                Some(data)
            }
            Self::WrongArgumentType {
                expected, received, ..
            } => Some(json!({ "expected": expected, "received": received })),
            _ => None,
        }
    }

    /// Project onto the error object carried by a response.
    pub fn error_object(&self) -> JsonRpcErrorObject {
        JsonRpcErrorObject::new(self.code().code(), self.to_string(), self.data())
    }

    /// Error response scoped to the request `id`; `None` yields `"id": null`.
    pub fn to_response(&self, id: Option<RequestId>) -> JsonRpcResponse {
        JsonRpcResponse::error(id, self.error_object())
    }

    /// Error response for failures where no id could be recovered.
    pub fn to_unidentified_response(&self) -> JsonRpcResponse {
        self.to_response(None)
    }
}

impl ToJsonRpcError for JsonRpcException {
    fn to_error_object(&self) -> JsonRpcErrorObject {
        self.error_object()
    }
}
