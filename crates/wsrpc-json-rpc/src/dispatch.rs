//! Method registration tables.
//!
//! A [`MethodTable`] maps method names onto closures over a handler type,
//! each declared with the JSON types of its positional parameters. Tables are
//! built once per handler type and shared by every handler instance.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::exception::JsonRpcException;

/// Name of the JSON type of `value`.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Declared type of a positional parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Any,
    Null,
    Bool,
    /// A number without a fractional part that fits in 64 bits
    Integer,
    Number,
    String,
    Array,
    Object,
}

impl ParamType {
    pub fn name(&self) -> &'static str {
        match self {
            ParamType::Any => "any",
            ParamType::Null => "null",
            ParamType::Bool => "boolean",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::String => "string",
            ParamType::Array => "array",
            ParamType::Object => "object",
        }
    }

    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamType::Any => true,
            ParamType::Null => value.is_null(),
            ParamType::Bool => value.is_boolean(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Number => value.is_number(),
            ParamType::String => value.is_string(),
            ParamType::Array => value.is_array(),
            ParamType::Object => value.is_object(),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Positional arguments handed to a registered method.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments(Vec<Value>);

impl Arguments {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn value(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Deserialize argument `index` into `T`.
    pub fn get<T: DeserializeOwned>(&self, index: usize) -> Result<T, JsonRpcException> {
        let value = self
            .0
            .get(index)
            .ok_or_else(|| JsonRpcException::wrong_argument_count(index + 1, self.0.len()))?;

        serde_json::from_value(value.clone()).map_err(|e| {
            JsonRpcException::wrong_argument_type_for_value(
                short_type_name::<T>(),
                value,
                Some(format!("argument {}: {}", index, e)),
            )
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<Value> {
        self.0
    }
}

impl From<Vec<Value>> for Arguments {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    match full.find('<') {
        Some(generic) => full[..generic].rsplit("::").next().unwrap_or(full),
        None => full.rsplit("::").next().unwrap_or(full),
    }
}

type MethodFn<H> =
    Box<dyn Fn(&mut H, Arguments) -> Result<Value, JsonRpcException> + Send + Sync>;

struct RegisteredMethod<H> {
    params: Vec<ParamType>,
    call: MethodFn<H>,
}

/// Name → operation table for handler type `H`.
pub struct MethodTable<H> {
    methods: HashMap<String, RegisteredMethod<H>>,
}

impl<H> MethodTable<H> {
    pub fn new() -> Self {
        Self {
            methods: HashMap::new(),
        }
    }

    /// Register `name` with its declared parameter types.
    ///
    /// Re-registering a name replaces the earlier entry.
    pub fn method<R, F>(mut self, name: &str, params: &[ParamType], call: F) -> Self
    where
        R: Serialize,
        F: Fn(&mut H, Arguments) -> Result<R, JsonRpcException> + Send + Sync + 'static,
    {
        let call: MethodFn<H> = Box::new(move |target, arguments| {
            let result = call(target, arguments)?;
            serde_json::to_value(result).map_err(|e| {
                JsonRpcException::invocation_failed(format!("failed to serialize result: {}", e))
            })
        });
        self.methods.insert(
            name.to_string(),
            RegisteredMethod {
                params: params.to_vec(),
                call,
            },
        );
        self
    }

    /// Resolve `method`, check the arguments against its signature and call it.
    pub fn invoke(
        &self,
        target: &mut H,
        method: &str,
        arguments: Vec<Value>,
    ) -> Result<Value, JsonRpcException> {
        let registered = self
            .methods
            .get(method)
            .ok_or_else(|| JsonRpcException::unknown_method(method))?;

        if registered.params.len() != arguments.len() {
            return Err(JsonRpcException::wrong_argument_count_for(
                method,
                registered.params.len(),
                arguments.len(),
            ));
        }

        for (index, (expected, value)) in registered.params.iter().zip(&arguments).enumerate() {
            if !expected.accepts(value) {
                return Err(JsonRpcException::wrong_argument_type_for_value(
                    expected.name(),
                    value,
                    Some(format!("argument {}", index)),
                ));
            }
        }

        debug!("Invoking {} with {} argument(s)", method, arguments.len());
        (registered.call)(target, Arguments(arguments))
    }

    pub fn contains(&self, method: &str) -> bool {
        self.methods.contains_key(method)
    }

    pub fn signature(&self, method: &str) -> Option<&[ParamType]> {
        self.methods.get(method).map(|m| m.params.as_slice())
    }

    /// Registered method names, sorted
    pub fn method_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.methods.keys().cloned().collect();
        names.sort();
        names
    }
}

impl<H> Default for MethodTable<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> fmt::Debug for MethodTable<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodTable")
            .field("methods", &self.method_names())
            .finish()
    }
}
