use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;

/// Frame type used for outbound messages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FrameFormat {
    #[default]
    Text,
    Binary,
}

impl FrameFormat {
    pub(crate) fn frame(&self, payload: String) -> WsMessage {
        match self {
            FrameFormat::Text => WsMessage::text(payload),
            FrameFormat::Binary => WsMessage::binary(payload.into_bytes()),
        }
    }
}

/// Configuration for the WebSocket JSON-RPC listener
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to; the port is supplied when starting
    pub bind_ip: IpAddr,
    /// Maximum size of an inbound message
    pub max_message_size: usize,
    /// Maximum size of a single inbound frame
    pub max_frame_size: usize,
    /// Frame type for responses
    pub reply_format: FrameFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            max_message_size: 16 * 1024 * 1024, // 16 MB
            max_frame_size: 4 * 1024 * 1024,    // 4 MB
            reply_format: FrameFormat::Text,
        }
    }
}

impl ServerConfig {
    pub fn bind_ip(mut self, ip: IpAddr) -> Self {
        self.bind_ip = ip;
        self
    }

    pub fn max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    pub fn max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    pub fn reply_format(mut self, format: FrameFormat) -> Self {
        self.reply_format = format;
        self
    }

    pub fn socket_addr(&self, port: u16) -> SocketAddr {
        SocketAddr::new(self.bind_ip, port)
    }

    pub(crate) fn websocket_config(&self) -> WebSocketConfig {
        WebSocketConfig::default()
            .max_message_size(Some(self.max_message_size))
            .max_frame_size(Some(self.max_frame_size))
    }
}
