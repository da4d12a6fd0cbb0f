//! Per-connection glue between the transport and one handler object.
//!
//! A [`Connection`] owns its handler exclusively. Each inbound frame is
//! parsed, dispatched and answered before the next one is accepted; every
//! failure becomes at most one error response and the connection stays open.
//! Responses are emitted on the outbound channel returned by
//! [`Connection::new`], which the transport drains into the socket.

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use wsrpc_json_rpc::{
    InboundMessage, JsonRpcException, JsonRpcRequest, JsonRpcResponse, Message, RpcTarget,
};

use crate::registry::ConnectionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    Closed,
}

pub struct Connection<H: RpcTarget> {
    id: ConnectionId,
    handler: Option<H>,
    outbound: mpsc::UnboundedSender<String>,
}

impl<H: RpcTarget> Connection<H> {
    /// Bind `handler` to a new open connection.
    ///
    /// The receiver yields one fully serialized message per response that
    /// must be sent.
    pub fn new(id: ConnectionId, handler: H) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let connection = Self {
            id,
            handler: Some(handler),
            outbound,
        };
        (connection, outbound_rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        if self.handler.is_some() {
            ConnectionState::Open
        } else {
            ConnectionState::Closed
        }
    }

    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    pub fn handler(&self) -> Option<&H> {
        self.handler.as_ref()
    }

    /// Process one raw text or binary frame.
    ///
    /// Frames delivered after [`close`](Self::close) are ignored.
    pub async fn receive(&mut self, frame: &[u8]) {
        if !self.is_open() {
            debug!("Connection {} is closed, ignoring {} byte frame", self.id, frame.len());
            return;
        }

        match InboundMessage::parse(frame) {
            Ok(InboundMessage::Request(request)) => self.dispatch(request).await,
            Ok(InboundMessage::Response(response)) => {
                debug!(
                    "Connection {} ignoring inbound response for id {:?}",
                    self.id,
                    response.id()
                );
            }
            Err(rejection) => match rejection.error {
                JsonRpcException::InvalidResponse { .. }
                | JsonRpcException::InvalidError { .. } => {
                    warn!(
                        "Connection {} dropped malformed response: {}",
                        self.id, rejection.error
                    );
                }
                _ => {
                    warn!("Connection {} rejected frame: {}", self.id, rejection.error);
                    self.emit(rejection.to_response());
                }
            },
        }
    }

    async fn dispatch(&mut self, request: JsonRpcRequest) {
        let (id, method, arguments) = request.into_parts();

        let outcome: Result<Value, JsonRpcException> = match self.handler.as_mut() {
            Some(handler) => handler.invoke(&method, arguments).await,
            None => return,
        };

        match (id, outcome) {
            (Some(id), Ok(result)) => {
                debug!("Connection {} answered {} (id {})", self.id, method, id);
                self.emit(JsonRpcResponse::success(id, result));
            }
            (Some(id), Err(error)) => {
                debug!("Connection {} failed {} (id {}): {}", self.id, method, id, error);
                self.emit(error.to_response(Some(id)));
            }
            (None, Ok(_)) => {
                debug!("Connection {} handled notification {}", self.id, method);
            }
            (None, Err(error)) => {
                warn!("Connection {} notification {} failed: {}", self.id, method, error);
            }
        }
    }

    fn emit(&self, response: JsonRpcResponse) {
        if self.outbound.send(response.to_json_string()).is_err() {
            debug!("Connection {} outbound receiver is gone, dropping response", self.id);
        }
    }

    /// Close the connection and release the handler.
    ///
    /// Returns `false` if it was already closed.
    pub fn close(&mut self) -> bool {
        match self.handler.take() {
            Some(handler) => {
                drop(handler);
                info!("Connection {} closed", self.id);
                true
            }
            None => false,
        }
    }
}
