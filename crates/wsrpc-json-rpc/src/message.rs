//! The JSON-RPC envelope shared by every message kind, and classification of
//! raw inbound frames.

use serde_json::{Map, Value};
use tracing::debug;

use crate::exception::JsonRpcException;
use crate::request::JsonRpcRequest;
use crate::response::JsonRpcResponse;
use crate::types::{JsonRpcVersion, RequestId};

/// Common behaviour of every JSON-RPC message: an optional id and a wire form.
pub trait Message {
    fn id(&self) -> Option<&RequestId>;

    /// A message with an absent or `null` id is a notification.
    fn has_id(&self) -> bool {
        self.id().is_some()
    }

    fn to_json(&self) -> Value;

    fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }
}

/// Which message kind is being parsed; selects the exception family raised
/// for envelope failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MessageKind {
    Request,
    Response,
}

impl MessageKind {
    fn invalid(self, reason: &str) -> JsonRpcException {
        match self {
            MessageKind::Request => JsonRpcException::invalid_request(reason),
            MessageKind::Response => JsonRpcException::invalid_response(reason),
        }
    }
}

/// Validate the `jsonrpc` tag and id shape shared by every message kind.
pub(crate) fn parse_envelope(
    object: &Map<String, Value>,
    kind: MessageKind,
) -> Result<Option<RequestId>, JsonRpcException> {
    if !JsonRpcVersion::V2_0.matches(object.get("jsonrpc")) {
        return Err(kind.invalid("the jsonrpc member must be exactly \"2.0\""));
    }

    match object.get("id") {
        None => Ok(None),
        Some(value) => RequestId::from_value(value)
            .map_err(|_| kind.invalid("the id must be a string, a number or null")),
    }
}

/// Start the wire form of a message.
///
/// When `null_id` is set an absent id is written as `"id": null`, otherwise
/// the member is omitted.
pub(crate) fn write_envelope(id: Option<&RequestId>, null_id: bool) -> Map<String, Value> {
    let mut object = Map::new();
    object.insert(
        "jsonrpc".to_string(),
        Value::String(JsonRpcVersion::V2_0.as_str().to_string()),
    );
    match id {
        Some(id) => {
            object.insert("id".to_string(), id.to_value());
        }
        None if null_id => {
            object.insert("id".to_string(), Value::Null);
        }
        None => {}
    }
    object
}

/// A parsed inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    Request(JsonRpcRequest),
    Response(JsonRpcResponse),
}

/// A frame that failed to parse, together with the best id that could be
/// recovered from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub error: JsonRpcException,
    pub id: Option<RequestId>,
}

impl Rejection {
    fn unidentified(error: JsonRpcException) -> Self {
        Self { error, id: None }
    }

    /// Error response addressed to the recovered id, or to `null`.
    pub fn to_response(&self) -> JsonRpcResponse {
        match &self.id {
            Some(id) => self.error.to_response(Some(id.clone())),
            None => self.error.to_unidentified_response(),
        }
    }
}

/// Recover a usable id from a raw object that failed validation.
///
/// Only string and number ids count; anything else is unreliable.
pub fn recover_id(object: &Map<String, Value>) -> Option<RequestId> {
    object
        .get("id")
        .and_then(|value| RequestId::from_value(value).ok().flatten())
}

impl InboundMessage {
    /// Parse a raw text or binary frame.
    pub fn parse(frame: &[u8]) -> Result<Self, Rejection> {
        let value: Value = serde_json::from_slice(frame)
            .map_err(|e| Rejection::unidentified(JsonRpcException::parse_error(e.to_string())))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, Rejection> {
        let Value::Object(object) = value else {
            return Err(Rejection::unidentified(JsonRpcException::parse_error(
                "the top-level value is not an object",
            )));
        };

        let parsed = if object.contains_key("method") {
            JsonRpcRequest::from_object(&object).map(InboundMessage::Request)
        } else if object.contains_key("result") || object.contains_key("error") {
            JsonRpcResponse::from_object(&object).map(InboundMessage::Response)
        } else {
            debug!("Inbound object carries neither method nor result/error");
            Err(JsonRpcException::invalid_request(
                "the message is neither a request nor a response",
            ))
        };

        parsed.map_err(|error| Rejection {
            error,
            id: recover_id(&object),
        })
    }

    pub fn id(&self) -> Option<&RequestId> {
        match self {
            InboundMessage::Request(request) => request.id(),
            InboundMessage::Response(response) => response.id(),
        }
    }
}
