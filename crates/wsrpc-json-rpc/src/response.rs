use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::JsonRpcErrorObject;
use crate::exception::JsonRpcException;
use crate::message::{Message, MessageKind, parse_envelope, write_envelope};
use crate::types::RequestId;

/// Outcome carried by a response: either `result` or `error`, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePayload {
    Result(Value),
    Error(JsonRpcErrorObject),
}

/// A JSON-RPC response
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcResponse {
    id: Option<RequestId>,
    payload: ResponsePayload,
}

impl JsonRpcResponse {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            id: Some(id),
            payload: ResponsePayload::Result(result),
        }
    }

    /// Error response; `None` is written as `"id": null`.
    pub fn error(id: Option<RequestId>, error: JsonRpcErrorObject) -> Self {
        Self {
            id,
            payload: ResponsePayload::Error(error),
        }
    }

    /// Parse and validate an inbound response object.
    pub fn from_object(object: &Map<String, Value>) -> Result<Self, JsonRpcException> {
        let id = parse_envelope(object, MessageKind::Response)?;

        let payload = match (object.get("result"), object.get("error")) {
            (Some(result), None) => ResponsePayload::Result(result.clone()),
            (None, Some(error)) => ResponsePayload::Error(parse_error_object(error)?),
            _ => {
                return Err(JsonRpcException::invalid_response(
                    "a response must carry exactly one of result or error",
                ));
            }
        };

        Ok(Self { id, payload })
    }

    pub fn payload(&self) -> &ResponsePayload {
        &self.payload
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.payload {
            ResponsePayload::Result(value) => Some(value),
            ResponsePayload::Error(_) => None,
        }
    }

    pub fn error_object(&self) -> Option<&JsonRpcErrorObject> {
        match &self.payload {
            ResponsePayload::Error(error) => Some(error),
            ResponsePayload::Result(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.payload, ResponsePayload::Error(_))
    }
}

fn parse_error_object(value: &Value) -> Result<JsonRpcErrorObject, JsonRpcException> {
    let Value::Object(error) = value else {
        return Err(JsonRpcException::invalid_error("the error member must be an object"));
    };

    let code = error
        .get("code")
        .and_then(Value::as_i64)
        .ok_or_else(|| JsonRpcException::invalid_error("the error code must be an integer"))?;

    let message = error
        .get("message")
        .and_then(Value::as_str)
        .ok_or_else(|| JsonRpcException::invalid_error("the error message must be a string"))?;

    Ok(JsonRpcErrorObject::new(
        code,
        message.to_string(),
        error.get("data").cloned(),
    ))
}

impl Message for JsonRpcResponse {
    fn id(&self) -> Option<&RequestId> {
        self.id.as_ref()
    }

    fn to_json(&self) -> Value {
        let mut object = write_envelope(self.id.as_ref(), true);
        match &self.payload {
            ResponsePayload::Result(value) => {
                object.insert("result".to_string(), value.clone());
            }
            ResponsePayload::Error(error) => {
                object.insert("error".to_string(), error.to_value());
            }
        }
        Value::Object(object)
    }
}

impl Serialize for JsonRpcResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
