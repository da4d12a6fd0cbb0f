use async_trait::async_trait;
use serde_json::Value;

use crate::exception::JsonRpcException;

/// Dispatch capability exposed by a per-connection handler object.
///
/// The protocol layer resolves nothing itself: it hands the method name and
/// positional arguments to the handler and converts whatever exception comes
/// back into an error response. Implementations usually delegate to a static
/// [`MethodTable`](crate::MethodTable).
#[async_trait]
pub trait RpcTarget: Send + 'static {
    /// Invoke `method` with positional `arguments`.
    ///
    /// Expected failures are [`JsonRpcException::UnknownMethodName`],
    /// [`JsonRpcException::WrongArgumentCount`],
    /// [`JsonRpcException::WrongArgumentType`] and
    /// [`JsonRpcException::InvocationFailed`].
    async fn invoke(&mut self, method: &str, arguments: Vec<Value>)
    -> Result<Value, JsonRpcException>;

    /// List supported methods (optional - used for introspection)
    fn method_names(&self) -> Vec<String> {
        vec![]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{MethodTable, ParamType};
    use once_cell::sync::Lazy;
    use serde_json::json;

    #[derive(Default)]
    struct Greeter {
        greeted: Vec<String>,
    }

    static GREETER_METHODS: Lazy<MethodTable<Greeter>> = Lazy::new(|| {
        MethodTable::new()
            .method("greet", &[ParamType::String], |greeter: &mut Greeter, args| {
                let name: String = args.get(0)?;
                greeter.greeted.push(name.clone());
                Ok(format!("Hello, {}!", name))
            })
            .method("history", &[], |greeter: &mut Greeter, _| {
                Ok(greeter.greeted.clone())
            })
    });

    #[async_trait]
    impl RpcTarget for Greeter {
        async fn invoke(
            &mut self,
            method: &str,
            arguments: Vec<Value>,
        ) -> Result<Value, JsonRpcException> {
            GREETER_METHODS.invoke(self, method, arguments)
        }

        fn method_names(&self) -> Vec<String> {
            GREETER_METHODS.method_names()
        }
    }

    #[tokio::test]
    async fn test_target_delegates_to_table() {
        let mut greeter = Greeter::default();
        let result = greeter.invoke("greet", vec![json!("Ada")]).await.unwrap();
        assert_eq!(result, json!("Hello, Ada!"));

        let history = greeter.invoke("history", vec![]).await.unwrap();
        assert_eq!(history, json!(["Ada"]));
        assert_eq!(greeter.method_names(), vec!["greet", "history"]);
    }

    #[tokio::test]
    async fn test_target_reports_unknown_method() {
        let mut greeter = Greeter::default();
        let error = greeter.invoke("wave", vec![]).await.unwrap_err();
        assert!(matches!(error, JsonRpcException::UnknownMethodName { .. }));
    }

    #[tokio::test]
    async fn test_instances_do_not_share_state() {
        let mut first = Greeter::default();
        let mut second = Greeter::default();
        first.invoke("greet", vec![json!("a")]).await.unwrap();
        assert_eq!(second.invoke("history", vec![]).await.unwrap(), json!([]));
    }
}
