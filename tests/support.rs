//! Shared fixtures for the WebSocket integration tests.
#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use once_cell::sync::Lazy;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::time::{Instant, sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use wsrpc_server::{JsonRpcException, Listener, MethodTable, ParamType, RpcTarget, ServerConfig};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const REPLY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handler with per-connection state used by every test server
#[derive(Default)]
pub struct Counter {
    label: String,
    count: i64,
    drops: Option<Arc<AtomicUsize>>,
}

impl Counter {
    pub fn tracked(drops: Arc<AtomicUsize>) -> Self {
        Self {
            label: String::new(),
            count: 0,
            drops: Some(drops),
        }
    }
}

impl From<String> for Counter {
    fn from(label: String) -> Self {
        Self {
            label,
            count: 0,
            drops: None,
        }
    }
}

impl Drop for Counter {
    fn drop(&mut self) {
        if let Some(drops) = &self.drops {
            drops.fetch_add(1, Ordering::SeqCst);
        }
    }
}

static COUNTER_METHODS: Lazy<MethodTable<Counter>> = Lazy::new(|| {
    MethodTable::new()
        .method("echo", &[ParamType::Any], |_: &mut Counter, args| {
            Ok(args.value(0).cloned().unwrap_or(Value::Null))
        })
        .method(
            "add",
            &[ParamType::Integer, ParamType::Integer],
            |_: &mut Counter, args| Ok(args.get::<i64>(0)? + args.get::<i64>(1)?),
        )
        .method("increment", &[], |counter: &mut Counter, _| {
            counter.count += 1;
            Ok(counter.count)
        })
        .method("label", &[], |counter: &mut Counter, _| Ok(counter.label.clone()))
        .method("fail", &[], |_: &mut Counter, _| {
            Err::<Value, _>(JsonRpcException::invocation_failed("counter refused"))
        })
});

#[async_trait]
impl RpcTarget for Counter {
    async fn invoke(
        &mut self,
        method: &str,
        arguments: Vec<Value>,
    ) -> Result<Value, JsonRpcException> {
        COUNTER_METHODS.invoke(self, method, arguments)
    }

    fn method_names(&self) -> Vec<String> {
        COUNTER_METHODS.method_names()
    }
}

pub fn local_config() -> ServerConfig {
    ServerConfig::default().bind_ip(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

/// Start `listener` on an ephemeral port.
pub async fn start<H: RpcTarget>(listener: &mut Listener<H>) -> SocketAddr {
    let _ = tracing_subscriber::fmt::try_init();
    listener.start(0).await.expect("listener should bind")
}

pub async fn connect(addr: SocketAddr) -> Client {
    let (client, _) = connect_async(format!("ws://{}", addr))
        .await
        .expect("websocket handshake");
    client
}

pub async fn send(client: &mut Client, frame: &str) {
    client
        .send(Message::text(frame.to_string()))
        .await
        .expect("send frame");
}

/// Next JSON reply, skipping control frames.
pub async fn next_reply(client: &mut Client) -> Value {
    timeout(REPLY_TIMEOUT, async {
        loop {
            match client.next().await {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str::<Value>(&text).unwrap();
                }
                Some(Ok(Message::Binary(data))) => {
                    return serde_json::from_slice::<Value>(&data).unwrap();
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                other => panic!("connection ended while waiting for a reply: {:?}", other),
            }
        }
    })
    .await
    .expect("reply within timeout")
}

pub async fn call(client: &mut Client, frame: &str) -> Value {
    send(client, frame).await;
    next_reply(client).await
}

/// Poll the registry until it reports `expected` connections.
pub async fn wait_for_connections<H: RpcTarget>(listener: &Listener<H>, expected: usize) {
    let deadline = Instant::now() + REPLY_TIMEOUT;
    loop {
        let count = listener.active_connections().await;
        if count == expected {
            return;
        }
        assert!(
            Instant::now() < deadline,
            "expected {} connections, registry reports {}",
            expected,
            count
        );
        sleep(Duration::from_millis(10)).await;
    }
}
