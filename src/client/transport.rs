//! Transport seam between the session client and the network.
//!
//! [`WebSocketConnector`] is the production implementation. Anything that can
//! move text records both ways can stand in for it.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::error::{ConnectionError, TransportError};

/// A bidirectional text channel to the hub.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send one chunk of text.
    async fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Wait for the next chunk of text. `None` means the peer closed.
    async fn recv(&mut self) -> Option<Result<String, TransportError>>;

    /// Close the channel.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Opens fresh transports, once at startup and again on every reconnect.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Transport: Transport;

    async fn connect(&self) -> Result<Self::Transport, ConnectionError>;
}

/// Map a configured hub URL onto its WebSocket endpoint.
///
/// `http` becomes `ws` and `https` becomes `wss`; WebSocket URLs pass through.
pub fn websocket_url(url: &str) -> Result<String, ConnectionError> {
    let invalid = |reason: &str| ConnectionError::InvalidUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    let (scheme, rest) = url.trim().split_once("://").ok_or_else(|| invalid("missing scheme"))?;
    if rest.is_empty() {
        return Err(invalid("missing host"));
    }

    let scheme = match scheme.to_ascii_lowercase().as_str() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        _ => return Err(invalid("unsupported scheme")),
    };

    Ok(format!("{}://{}", scheme, rest))
}

/// Connects to the hub over a WebSocket.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: String,
}

impl WebSocketConnector {
    /// Create a connector for a hub URL (`http(s)://` or `ws(s)://`).
    pub fn new(hub_url: &str) -> Result<Self, ConnectionError> {
        Ok(Self {
            url: websocket_url(hub_url)?,
        })
    }

    /// The WebSocket endpoint this connector dials.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    type Transport = WebSocketTransport;

    async fn connect(&self) -> Result<Self::Transport, ConnectionError> {
        debug!(url = %self.url, "opening websocket");
        let (stream, _) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| ConnectionError::Transport(e.to_string()))?;
        Ok(WebSocketTransport { stream })
    }
}

/// An open WebSocket to the hub.
pub struct WebSocketTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        while let Some(msg) = self.stream.next().await {
            match msg {
                Ok(Message::Text(text)) => return Some(Ok(text.to_string())),
                Ok(Message::Binary(bytes)) => {
                    return Some(
                        String::from_utf8(bytes.to_vec())
                            .map_err(|e| TransportError(format!("non-utf8 frame: {}", e))),
                    );
                }
                Ok(Message::Close(_)) => return None,
                Ok(_) => continue,
                Err(e) => return Some(Err(TransportError(e.to_string()))),
            }
        }
        None
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.stream
            .close(None)
            .await
            .map_err(|e| TransportError(e.to_string()))
    }
}

/// In-memory transport for exercising the client without a network.
#[cfg(test)]
pub(crate) mod memory {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use tokio::sync::mpsc;

    use super::*;

    /// Client end of an in-memory link.
    pub struct MemoryTransport {
        incoming: mpsc::UnboundedReceiver<String>,
        outgoing: mpsc::UnboundedSender<String>,
    }

    /// Hub end of an in-memory link, driven by the test.
    pub struct HubEnd {
        pub to_client: mpsc::UnboundedSender<String>,
        pub from_client: mpsc::UnboundedReceiver<String>,
    }

    impl HubEnd {
        /// Wait for the next record the client sent, without its separator.
        pub async fn next_record(&mut self) -> Option<String> {
            let text = self.from_client.recv().await?;
            Some(text.trim_end_matches(crate::protocol::RECORD_SEPARATOR).to_string())
        }

        /// Consume the handshake and accept it.
        pub async fn accept_handshake(&mut self) {
            let request = self.next_record().await;
            assert_eq!(request.as_deref(), Some("{\"protocol\":\"json\",\"version\":1}"));
            self.send_raw("{}\u{1e}");
        }

        pub fn send_raw(&self, text: &str) {
            let _ = self.to_client.send(text.to_string());
        }
    }

    /// Create a linked pair of ends.
    pub fn link() -> (MemoryTransport, HubEnd) {
        let (to_client, incoming) = mpsc::unbounded_channel();
        let (outgoing, from_client) = mpsc::unbounded_channel();
        (
            MemoryTransport { incoming, outgoing },
            HubEnd {
                to_client,
                from_client,
            },
        )
    }

    #[async_trait]
    impl Transport for MemoryTransport {
        async fn send(&mut self, text: String) -> Result<(), TransportError> {
            self.outgoing
                .send(text)
                .map_err(|_| TransportError("hub end dropped".to_string()))
        }

        async fn recv(&mut self) -> Option<Result<String, TransportError>> {
            self.incoming.recv().await.map(Ok)
        }

        async fn close(&mut self) -> Result<(), TransportError> {
            self.incoming.close();
            Ok(())
        }
    }

    /// Hands out prepared transports in order; refuses once they run out.
    #[derive(Default)]
    pub struct MemoryConnector {
        links: Mutex<VecDeque<MemoryTransport>>,
    }

    impl MemoryConnector {
        pub fn push(&self, transport: MemoryTransport) {
            if let Ok(mut links) = self.links.lock() {
                links.push_back(transport);
            }
        }
    }

    #[async_trait]
    impl Connector for std::sync::Arc<MemoryConnector> {
        type Transport = MemoryTransport;

        async fn connect(&self) -> Result<Self::Transport, ConnectionError> {
            let next = self.links.lock().ok().and_then(|mut links| links.pop_front());
            next.ok_or_else(|| ConnectionError::Transport("connection refused".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_urls_map_to_websocket() {
        assert_eq!(
            websocket_url("http://localhost:5168/gamehub").unwrap(),
            "ws://localhost:5168/gamehub"
        );
        assert_eq!(
            websocket_url("HTTPS://quiz.example.com/gamehub").unwrap(),
            "wss://quiz.example.com/gamehub"
        );
        assert_eq!(
            websocket_url("ws://127.0.0.1:9000/gamehub").unwrap(),
            "ws://127.0.0.1:9000/gamehub"
        );
    }

    #[test]
    fn bad_urls_are_rejected() {
        assert!(matches!(websocket_url("localhost:5168"), Err(ConnectionError::InvalidUrl { .. })));
        assert!(matches!(
            websocket_url("ftp://host/gamehub"),
            Err(ConnectionError::InvalidUrl { .. })
        ));
        assert!(matches!(websocket_url("http://"), Err(ConnectionError::InvalidUrl { .. })));
    }

    #[test]
    fn connector_keeps_normalized_url() {
        let connector = WebSocketConnector::new("http://localhost:5168/gamehub").unwrap();
        assert_eq!(connector.url(), "ws://localhost:5168/gamehub");
    }
}
