use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::debug;

use crate::exception::JsonRpcException;
use crate::message::{Message, MessageKind, parse_envelope, write_envelope};
use crate::types::RequestId;

/// A JSON-RPC request: method name plus positional arguments.
///
/// A request without an id is a notification. Only positional parameters are
/// supported; an object-valued `params` member is rejected when parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcRequest {
    id: Option<RequestId>,
    method: String,
    arguments: Vec<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: RequestId, method: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            id: Some(id),
            method: method.into(),
            arguments,
        }
    }

    /// Create a request that expects no response
    pub fn notification(method: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            id: None,
            method: method.into(),
            arguments,
        }
    }

    /// Parse and validate an inbound request object.
    pub fn from_object(object: &Map<String, Value>) -> Result<Self, JsonRpcException> {
        let id = parse_envelope(object, MessageKind::Request)?;

        let method = match object.get("method") {
            Some(Value::String(method)) => method.clone(),
            _ => return Err(JsonRpcException::invalid_request("the method is no string")),
        };

        let arguments = build_arguments(object.get("params"))?;

        Ok(Self {
            id,
            method,
            arguments,
        })
    }

    pub fn from_value(value: &Value) -> Result<Self, JsonRpcException> {
        match value {
            Value::Object(object) => Self::from_object(object),
            _ => Err(JsonRpcException::parse_error(
                "the top-level value is not an object",
            )),
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    pub fn into_parts(self) -> (Option<RequestId>, String, Vec<Value>) {
        (self.id, self.method, self.arguments)
    }

    pub fn is_notification(&self) -> bool {
        !self.has_id()
    }
}

fn build_arguments(params: Option<&Value>) -> Result<Vec<Value>, JsonRpcException> {
    match params {
        None => Ok(Vec::new()),
        Some(Value::Array(values)) => Ok(values.clone()),
        Some(Value::Object(_)) => {
            debug!("Parameter passing by name is not supported");
            Err(JsonRpcException::invalid_request(
                "params passed by name are not supported",
            ))
        }
        Some(_) => Err(JsonRpcException::invalid_request(
            "params must be an array",
        )),
    }
}

impl Message for JsonRpcRequest {
    fn id(&self) -> Option<&RequestId> {
        self.id.as_ref()
    }

    fn to_json(&self) -> Value {
        let mut object = write_envelope(self.id.as_ref(), false);
        object.insert("method".to_string(), Value::String(self.method.clone()));
        if !self.arguments.is_empty() {
            object.insert("params".to_string(), Value::Array(self.arguments.clone()));
        }
        Value::Object(object)
    }
}

impl Serialize for JsonRpcRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> Result<JsonRpcRequest, JsonRpcException> {
        JsonRpcRequest::from_value(&value)
    }

    #[test]
    fn test_request_round_trip() {
        let request = JsonRpcRequest::new(
            RequestId::from(1),
            "process",
            vec![json!("test"), json!(42), json!(true)],
        );

        let parsed = parse(request.to_json()).unwrap();
        assert_eq!(parsed.method(), "process");
        assert_eq!(parsed.arguments(), &[json!("test"), json!(42), json!(true)]);
        assert_eq!(parsed, request);
    }

    #[test]
    fn test_empty_arguments_omit_params() {
        let request = JsonRpcRequest::new(RequestId::from("req1"), "status", vec![]);
        let json = request.to_json();
        assert_eq!(json, json!({"jsonrpc": "2.0", "id": "req1", "method": "status"}));
        assert!(parse(json).unwrap().arguments().is_empty());
    }

    #[test]
    fn test_notification_omits_id() {
        let notification = JsonRpcRequest::notification("ping", vec![]);
        let json_str = serde_json::to_string(&notification).unwrap();

        assert!(!json_str.contains("\"id\""));
        assert!(json_str.contains("\"jsonrpc\":\"2.0\""));
        assert!(json_str.contains("\"method\":\"ping\""));
        assert!(notification.is_notification());
    }

    #[test]
    fn test_has_id_reflects_id_member() {
        let cases = [
            (json!({"jsonrpc": "2.0", "method": "m"}), false),
            (json!({"jsonrpc": "2.0", "id": null, "method": "m"}), false),
            (json!({"jsonrpc": "2.0", "id": "x", "method": "m"}), true),
            (json!({"jsonrpc": "2.0", "id": 0, "method": "m"}), true),
            (json!({"jsonrpc": "2.0", "id": -2.5, "method": "m"}), true),
        ];
        for (raw, has_id) in cases {
            assert_eq!(parse(raw).unwrap().has_id(), has_id);
        }
    }

    #[test]
    fn test_invalid_ids_rejected() {
        for id in [json!(false), json!([]), json!({})] {
            let error = parse(json!({"jsonrpc": "2.0", "id": id, "method": "m"})).unwrap_err();
            assert!(matches!(error, JsonRpcException::InvalidRequest { .. }));
        }
    }

    #[test]
    fn test_method_must_be_string() {
        for raw in [
            json!({"jsonrpc": "2.0", "id": 1}),
            json!({"jsonrpc": "2.0", "id": 1, "method": 5}),
            json!({"jsonrpc": "2.0", "id": 1, "method": null}),
        ] {
            let error = parse(raw).unwrap_err();
            assert!(matches!(error, JsonRpcException::InvalidRequest { .. }));
        }
    }

    #[test]
    fn test_empty_method_name_is_accepted() {
        let request = parse(json!({"jsonrpc": "2.0", "id": 1, "method": ""})).unwrap();
        assert_eq!(request.method(), "");
    }

    #[test]
    fn test_named_params_rejected() {
        for params in [json!({}), json!({"a": 1, "b": 2})] {
            let error =
                parse(json!({"jsonrpc": "2.0", "id": 1, "method": "add", "params": params}))
                    .unwrap_err();
            assert!(matches!(error, JsonRpcException::InvalidRequest { .. }));
            assert_eq!(error.error_object().code(), -32600);
        }
    }

    #[test]
    fn test_scalar_params_rejected() {
        for params in [json!(null), json!(1), json!("x"), json!(true)] {
            let error =
                parse(json!({"jsonrpc": "2.0", "id": 1, "method": "add", "params": params}))
                    .unwrap_err();
            assert!(matches!(error, JsonRpcException::InvalidRequest { .. }));
        }
    }

    #[test]
    fn test_params_order_preserved() {
        let request = parse(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "concat",
            "params": ["a", {"nested": [1, 2]}, null, 3]
        }))
        .unwrap();
        let (id, method, arguments) = request.into_parts();
        assert_eq!(id, Some(RequestId::from(1)));
        assert_eq!(method, "concat");
        assert_eq!(arguments, vec![json!("a"), json!({"nested": [1, 2]}), json!(null), json!(3)]);
    }
}
