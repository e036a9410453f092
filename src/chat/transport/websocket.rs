//! WebSocket transport for the Socket.IO event channel
//!
//! Connects straight to the WebSocket transport of the backend's Socket.IO
//! server (no long-polling upgrade):
//!
//! ```text
//! ws(s)://<socket_url host>/socket.io/?EIO=4&transport=websocket
//! ```
//!
//! Two background Tokio tasks are started on connect: one writes queued
//! frames to the socket, one forwards inbound text frames. WebSocket-level
//! pings are answered by `tungstenite` itself; Engine.IO pings are answered
//! by the channel task in [`crate::chat::transport::start_channel`].

use std::pin::Pin;
use std::sync::Arc;

use futures::{SinkExt, Stream, StreamExt};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use url::Url;

use crate::chat::transport::EventTransport;
use crate::error::{Result, StudyflowError};

/// `tokio-tungstenite` backed event transport.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use studyflow::chat::transport::{start_channel, websocket::WebSocketTransport};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> studyflow::error::Result<()> {
/// let transport = WebSocketTransport::connect("http://localhost:8000", Some("token")).await?;
/// let channel = start_channel(Arc::new(transport), CancellationToken::new());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct WebSocketTransport {
    outbound_tx: mpsc::UnboundedSender<String>,
    inbound_rx: Arc<Mutex<mpsc::UnboundedReceiver<String>>>,
}

impl WebSocketTransport {
    /// Build the Engine.IO WebSocket endpoint for a server root URL.
    ///
    /// # Errors
    ///
    /// Returns [`StudyflowError::Config`] for an unparsable URL or a scheme
    /// other than http, https, ws or wss.
    ///
    /// # Examples
    ///
    /// ```
    /// use studyflow::chat::transport::websocket::WebSocketTransport;
    ///
    /// let url = WebSocketTransport::endpoint("https://chat.example.com").unwrap();
    /// assert_eq!(
    ///     url.as_str(),
    ///     "wss://chat.example.com/socket.io/?EIO=4&transport=websocket"
    /// );
    /// ```
    pub fn endpoint(socket_url: &str) -> Result<Url> {
        let mut url = Url::parse(socket_url).map_err(|e| {
            StudyflowError::Config(format!("Invalid socket_url {}: {}", socket_url, e))
        })?;
        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(StudyflowError::Config(format!(
                    "Unsupported socket_url scheme: {}",
                    other
                ))
                .into())
            }
        };
        url.set_scheme(scheme)
            .map_err(|_| StudyflowError::Config(format!("Cannot use {} for socket_url", scheme)))?;
        url.set_path("/socket.io/");
        url.set_query(Some("EIO=4&transport=websocket"));
        Ok(url)
    }

    /// Open the WebSocket and start the pump tasks.
    ///
    /// # Arguments
    ///
    /// * `socket_url` - Socket.IO server root (http(s) or ws(s))
    /// * `token` - Bearer token sent in the upgrade request, if any
    ///
    /// # Errors
    ///
    /// Returns [`StudyflowError::WebSocket`] if the handshake fails.
    pub async fn connect(socket_url: &str, token: Option<&str>) -> Result<Self> {
        let url = Self::endpoint(socket_url)?;
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(StudyflowError::WebSocket)?;
        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| StudyflowError::Transport(format!("Invalid token header: {}", e)))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        tracing::debug!(url = %url, "Connecting event channel");
        let (stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(StudyflowError::WebSocket)?;
        tracing::info!(url = %url, "Event channel connected");

        let (mut sink, mut source) = stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();

        // Background task: queued frames -> socket.
        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                if let Err(e) = sink.send(WsMessage::text(frame)).await {
                    tracing::warn!("WebSocket write failed: {}", e);
                    break;
                }
            }
            let _ = sink.close().await;
        });

        // Background task: socket -> inbound frames.
        tokio::spawn(async move {
            while let Some(message) = source.next().await {
                match message {
                    Ok(WsMessage::Text(text)) => {
                        if inbound_tx.send(text.as_str().to_string()).is_err() {
                            break;
                        }
                    }
                    Ok(WsMessage::Close(frame)) => {
                        tracing::debug!(?frame, "WebSocket closed by server");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!("WebSocket read failed: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(Self {
            outbound_tx,
            inbound_rx: Arc::new(Mutex::new(inbound_rx)),
        })
    }
}

#[async_trait::async_trait]
impl EventTransport for WebSocketTransport {
    async fn send(&self, frame: String) -> Result<()> {
        self.outbound_tx.send(frame).map_err(|e| {
            anyhow::anyhow!(StudyflowError::Transport(format!(
                "WebSocket writer stopped: {}",
                e
            )))
        })
    }

    fn receive(&self) -> Pin<Box<dyn Stream<Item = String> + Send + '_>> {
        let rx = Arc::clone(&self.inbound_rx);
        Box::pin(futures::stream::unfold(rx, |rx| async move {
            let mut guard = rx.lock().await;
            let item = guard.recv().await?;
            drop(guard);
            Some((item, rx))
        }))
    }
}
