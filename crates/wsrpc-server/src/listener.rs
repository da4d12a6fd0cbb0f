//! Generic WebSocket listener.
//!
//! Accepts transport connections and materializes one handler object plus
//! one [`Connection`] adapter per socket. The handler type is only known to
//! the listener through its [`RpcTarget`] implementation and the factory
//! installed with [`Listener::configure_construction`].

use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_async_with_config;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use wsrpc_json_rpc::RpcTarget;

use crate::config::ServerConfig;
use crate::connection::Connection;
use crate::registry::{ConnectionId, ConnectionRegistry};
use crate::{Result, WsRpcError};

/// Builds one handler instance per accepted connection
pub type HandlerFactory<H> = Arc<dyn Fn() -> H + Send + Sync>;

pub struct Listener<H: RpcTarget> {
    config: ServerConfig,
    factory: HandlerFactory<H>,
    registry: ConnectionRegistry,
    shutdown: CancellationToken,
    local_addr: Option<SocketAddr>,
}

impl<H: RpcTarget + Default> Listener<H> {
    /// Create a listener that builds handlers with `H::default()`
    pub fn new(config: ServerConfig) -> Self {
        Self::with_factory(config, H::default)
    }
}

impl<H: RpcTarget> Listener<H> {
    pub fn with_factory<F>(config: ServerConfig, factory: F) -> Self
    where
        F: Fn() -> H + Send + Sync + 'static,
    {
        Self {
            config,
            factory: Arc::new(factory),
            registry: ConnectionRegistry::new(),
            shutdown: CancellationToken::new(),
            local_addr: None,
        }
    }

    /// Replace how handlers are built.
    ///
    /// The factory is captured by [`start`](Self::start).
    pub fn configure_construction<F>(&mut self, factory: F)
    where
        F: Fn() -> H + Send + Sync + 'static,
    {
        self.factory = Arc::new(factory);
    }

    /// Build every handler from a clone of the same `arguments`.
    pub fn construct_with<A>(&mut self, arguments: A)
    where
        H: From<A>,
        A: Clone + Send + Sync + 'static,
    {
        self.configure_construction(move || H::from(arguments.clone()));
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub async fn active_connections(&self) -> usize {
        self.registry.count().await
    }

    /// Bound address once [`start`](Self::start) succeeded
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn is_listening(&self) -> bool {
        self.local_addr.is_some()
    }

    /// Bind `port` on the configured address and start accepting.
    ///
    /// Port 0 picks an ephemeral port; the bound address is returned. A bind
    /// failure is logged and returned, leaving the listener inert.
    pub async fn start(&mut self, port: u16) -> Result<SocketAddr> {
        if let Some(addr) = self.local_addr {
            return Err(WsRpcError::AlreadyListening(addr));
        }

        let addr = self.config.socket_addr(port);
        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(source) => {
                error!("Error opening server on {}: {}", addr, source);
                return Err(WsRpcError::Bind { addr, source });
            }
        };
        let local_addr = listener.local_addr()?;
        info!("JSON-RPC WebSocket server listening on {}", local_addr);

        self.local_addr = Some(local_addr);
        tokio::spawn(accept_loop(
            listener,
            Arc::clone(&self.factory),
            self.registry.clone(),
            Arc::new(self.config.clone()),
            self.shutdown.clone(),
        ));

        Ok(local_addr)
    }

    /// Stop accepting and close every open connection.
    ///
    /// Connections answer requests already being dispatched before closing.
    /// The listener may be started again afterwards.
    pub fn shutdown(&mut self) {
        let Some(addr) = self.local_addr.take() else {
            return;
        };
        info!("Shutting down JSON-RPC WebSocket server on {}", addr);
        self.shutdown.cancel();
        self.shutdown = CancellationToken::new();
    }
}

impl<H: RpcTarget> Drop for Listener<H> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn accept_loop<H: RpcTarget>(
    listener: TcpListener,
    factory: HandlerFactory<H>,
    registry: ConnectionRegistry,
    config: Arc<ServerConfig>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(connection) => connection,
                    Err(err) => {
                        error!("Failed to accept connection: {}", err);
                        continue;
                    }
                };
                debug!("New connection from {}", peer);

                let factory = Arc::clone(&factory);
                let registry = registry.clone();
                let config = Arc::clone(&config);
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    if let Err(err) =
                        serve_connection(stream, peer, factory, registry, config, shutdown).await
                    {
                        warn!("Connection from {} ended with error: {}", peer, err);
                    }
                });
            }
        }
    }
    debug!("Accept loop stopped");
}

async fn serve_connection<H: RpcTarget>(
    stream: TcpStream,
    peer: SocketAddr,
    factory: HandlerFactory<H>,
    registry: ConnectionRegistry,
    config: Arc<ServerConfig>,
    shutdown: CancellationToken,
) -> Result<()> {
    let websocket = match accept_async_with_config(stream, Some(config.websocket_config())).await {
        Ok(websocket) => websocket,
        Err(err) => {
            warn!("WebSocket handshake with {} failed: {}", peer, err);
            return Ok(());
        }
    };
    let (mut sink, mut frames) = websocket.split();

    let id = ConnectionId::new();
    let (mut connection, mut outbound) = Connection::new(id, factory());
    registry.register(id, peer).await;
    info!("Connection {} opened from {}", id, peer);

    // Responses are flushed before the next frame is read.
    let result: Result<()> = loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => break Ok(()),

            Some(message) = outbound.recv() => {
                if let Err(err) = sink.send(config.reply_format.frame(message)).await {
                    break Err(err.into());
                }
            }

            frame = frames.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => connection.receive(text.as_bytes()).await,
                Some(Ok(WsMessage::Binary(data))) => connection.receive(&data).await,
                Some(Ok(WsMessage::Ping(data))) => {
                    if let Err(err) = sink.send(WsMessage::Pong(data)).await {
                        break Err(err.into());
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => break Ok(()),
                Some(Ok(_)) => {}
                Some(Err(err)) => break Err(err.into()),
            }
        }
    };

    if result.is_ok() {
        while let Ok(message) = outbound.try_recv() {
            if let Err(err) = sink.send(config.reply_format.frame(message)).await {
                debug!("Connection {} could not flush pending response: {}", id, err);
                break;
            }
        }
    }

    connection.close();
    registry.deregister(&id).await;
    if let Err(err) = sink.close().await {
        debug!("Connection {} close handshake failed: {}", id, err);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wsrpc_json_rpc::JsonRpcException;

    struct Tagged {
        tag: String,
    }

    impl From<String> for Tagged {
        fn from(tag: String) -> Self {
            Self { tag }
        }
    }

    impl Default for Tagged {
        fn default() -> Self {
            Self {
                tag: "default".to_string(),
            }
        }
    }

    #[async_trait]
    impl RpcTarget for Tagged {
        async fn invoke(
            &mut self,
            method: &str,
            _arguments: Vec<Value>,
        ) -> std::result::Result<Value, JsonRpcException> {
            match method {
                "tag" => Ok(Value::String(self.tag.clone())),
                _ => Err(JsonRpcException::unknown_method(method)),
            }
        }
    }

    fn local_config() -> ServerConfig {
        ServerConfig::default().bind_ip(IpAddr::V4(Ipv4Addr::LOCALHOST))
    }

    #[test]
    fn test_default_construction() {
        let listener: Listener<Tagged> = Listener::new(local_config());
        assert_eq!((listener.factory)().tag, "default");
        assert!(!listener.is_listening());
        assert!(listener.local_addr().is_none());
    }

    #[test]
    fn test_construct_with_fixed_arguments() {
        let mut listener: Listener<Tagged> = Listener::new(local_config());
        listener.construct_with("shared".to_string());
        assert_eq!((listener.factory)().tag, "shared");
        assert_eq!((listener.factory)().tag, "shared");
    }

    #[test]
    fn test_configure_construction_replaces_factory() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        let mut listener: Listener<Tagged> = Listener::new(local_config());
        listener.configure_construction(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Tagged {
                tag: format!("handler-{}", n),
            }
        });
        assert_eq!((listener.factory)().tag, "handler-0");
        assert_eq!((listener.factory)().tag, "handler-1");
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        let mut listener: Listener<Tagged> = Listener::new(local_config());
        let addr = listener.start(0).await.unwrap();
        assert_ne!(addr.port(), 0);
        assert!(listener.is_listening());

        match listener.start(0).await {
            Err(WsRpcError::AlreadyListening(existing)) => assert_eq!(existing, addr),
            other => panic!("expected AlreadyListening, got {:?}", other),
        }
        listener.shutdown();
        assert!(!listener.is_listening());
        assert!(listener.local_addr().is_none());
    }

    #[tokio::test]
    async fn test_restart_after_shutdown() {
        let mut listener: Listener<Tagged> = Listener::new(local_config());
        listener.start(0).await.unwrap();
        listener.shutdown();
        listener.shutdown();

        let addr = listener.start(0).await.unwrap();
        assert!(listener.is_listening());
        assert_eq!(listener.local_addr(), Some(addr));
        assert!(!listener.shutdown.is_cancelled());
        listener.shutdown();
    }

    #[tokio::test]
    async fn test_bind_failure_leaves_listener_inert() {
        let occupied = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = occupied.local_addr().unwrap().port();

        let mut listener: Listener<Tagged> = Listener::new(local_config());
        match listener.start(port).await {
            Err(WsRpcError::Bind { addr, .. }) => assert_eq!(addr.port(), port),
            other => panic!("expected Bind error, got {:?}", other),
        }
        assert!(!listener.is_listening());
        assert_eq!(listener.active_connections().await, 0);

        drop(occupied);
        assert!(listener.start(0).await.is_ok());
    }
}
