//! Event channel transport abstraction
//!
//! [`EventTransport`] moves raw Engine.IO text frames. Concrete
//! implementations live in submodules:
//!
//! - [`websocket::WebSocketTransport`] -- a `tokio-tungstenite` client
//!   connected to the backend's `/socket.io/` endpoint.
//! - [`fake::FakeTransport`] -- in-process fake used in tests (cfg(test)
//!   only).
//!
//! [`start_channel`] runs the protocol on top of a transport: it answers
//! pings, connects the namespace, holds outbound events until the namespace
//! is connected, and turns inbound frames into typed [`ServerEvent`]s.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::chat::codec::{self, FrameAction};
use crate::chat::events::{ClientEvent, ServerEvent};
use crate::error::Result;

pub mod websocket;

#[cfg(test)]
pub mod fake;

/// Abstraction over event channel transports.
#[async_trait::async_trait]
pub trait EventTransport: Send + Sync + std::fmt::Debug {
    /// Send one complete text frame to the server.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::StudyflowError::Transport`] if the connection
    /// is gone.
    async fn send(&self, frame: String) -> Result<()>;

    /// Returns a stream of inbound text frames. The stream ends when the
    /// connection closes.
    fn receive(&self) -> Pin<Box<dyn Stream<Item = String> + Send + '_>>;
}

/// Handles to a running event channel.
#[derive(Debug)]
pub struct EventChannel {
    /// Client events to publish. Events sent before the namespace is
    /// connected are queued, not lost.
    pub outbound: mpsc::UnboundedSender<ClientEvent>,
    /// Typed server events, in arrival order.
    pub inbound: mpsc::UnboundedReceiver<ServerEvent>,
    /// The protocol task; finishes on cancellation or disconnect.
    pub task: tokio::task::JoinHandle<()>,
}

/// Start the protocol task over `transport`.
///
/// On cancellation, outbound events already queued (such as the
/// `leave_chat` emitted when a membership is dropped) are flushed before the
/// namespace disconnect is sent.
pub fn start_channel(
    transport: Arc<dyn EventTransport>,
    cancellation: CancellationToken,
) -> EventChannel {
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ClientEvent>();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<ServerEvent>();

    let task = tokio::spawn(async move {
        let mut frames = transport.receive();
        let mut connected = false;
        let mut pending: VecDeque<ClientEvent> = VecDeque::new();

        loop {
            tokio::select! {
                biased;

                _ = cancellation.cancelled() => {
                    while let Ok(event) = outbound_rx.try_recv() {
                        pending.push_back(event);
                    }
                    if connected {
                        for event in pending.drain(..) {
                            publish(transport.as_ref(), &event).await;
                        }
                        let _ = transport.send(codec::DISCONNECT.to_string()).await;
                    }
                    break;
                }

                maybe_frame = frames.next() => {
                    let Some(frame) = maybe_frame else {
                        let _ = inbound_tx.send(ServerEvent::Disconnected {
                            reason: "connection closed".to_string(),
                        });
                        break;
                    };

                    match codec::interpret(&frame) {
                        Ok(FrameAction::Reply(reply)) => {
                            if let Err(e) = transport.send(reply.to_string()).await {
                                tracing::warn!("Failed to answer ping: {}", e);
                            }
                        }
                        Ok(FrameAction::Opened(handshake)) => {
                            tracing::debug!(sid = %handshake.sid, ping_interval = handshake.ping_interval, "Engine.IO open");
                            if let Err(e) = transport.send(codec::CONNECT.to_string()).await {
                                tracing::warn!("Failed to connect namespace: {}", e);
                            }
                        }
                        Ok(FrameAction::Deliver(event)) => {
                            let closing = matches!(event, ServerEvent::Disconnected { .. });
                            if event == ServerEvent::Connected && !connected {
                                connected = true;
                                for queued in pending.drain(..) {
                                    publish(transport.as_ref(), &queued).await;
                                }
                            }
                            if let ServerEvent::Unknown { name } = &event {
                                tracing::debug!(event = %name, "Ignoring unknown event");
                                continue;
                            }
                            if inbound_tx.send(event).is_err() || closing {
                                break;
                            }
                        }
                        Ok(FrameAction::Ignore) => {}
                        Err(e) => {
                            tracing::warn!("Dropping inbound frame: {}", e);
                        }
                    }
                }

                maybe_event = outbound_rx.recv() => {
                    match maybe_event {
                        Some(event) if connected => publish(transport.as_ref(), &event).await,
                        Some(event) => pending.push_back(event),
                        None => break,
                    }
                }
            }
        }
        tracing::debug!("Event channel stopped");
    });

    EventChannel {
        outbound: outbound_tx,
        inbound: inbound_rx,
        task,
    }
}

async fn publish(transport: &dyn EventTransport, event: &ClientEvent) {
    tracing::debug!(event = event.name(), chat_id = event.chat_id(), "Emitting event");
    if let Err(e) = transport.send(codec::encode_event(event)).await {
        tracing::warn!(event = event.name(), "Failed to emit event: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::transport::fake::FakeTransport;
    use std::time::Duration;

    const OPEN: &str = r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":20000}"#;

    async fn next_frame(handle: &mut fake::FakeTransportHandle) -> String {
        tokio::time::timeout(Duration::from_secs(2), handle.outbound_rx.recv())
            .await
            .expect("timed out")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn test_handshake_connects_namespace_and_answers_ping() {
        let (transport, mut handle) = FakeTransport::new();
        let cancel = CancellationToken::new();
        let mut channel = start_channel(Arc::new(transport), cancel.clone());

        handle.inbound_tx.send(OPEN.to_string()).unwrap();
        assert_eq!(next_frame(&mut handle).await, "40");

        handle.inbound_tx.send("40".to_string()).unwrap();
        assert_eq!(channel.inbound.recv().await, Some(ServerEvent::Connected));

        handle.inbound_tx.send("2".to_string()).unwrap();
        assert_eq!(next_frame(&mut handle).await, "3");

        cancel.cancel();
        channel.task.await.unwrap();
    }

    #[tokio::test]
    async fn test_outbound_events_wait_for_namespace_connect() {
        let (transport, mut handle) = FakeTransport::new();
        let cancel = CancellationToken::new();
        let mut channel = start_channel(Arc::new(transport), cancel.clone());

        channel
            .outbound
            .send(ClientEvent::JoinChat {
                chat_id: "c1".into(),
                user_id: "u1".into(),
            })
            .unwrap();

        handle.inbound_tx.send(OPEN.to_string()).unwrap();
        assert_eq!(next_frame(&mut handle).await, "40");
        handle.inbound_tx.send("40".to_string()).unwrap();
        assert_eq!(channel.inbound.recv().await, Some(ServerEvent::Connected));

        let frame = next_frame(&mut handle).await;
        assert!(frame.starts_with(r#"42["join_chat""#), "got {}", frame);

        cancel.cancel();
        channel.task.await.unwrap();
    }

    #[tokio::test]
    async fn test_cancellation_flushes_queued_events() {
        let (transport, mut handle) = FakeTransport::new();
        let cancel = CancellationToken::new();
        let mut channel = start_channel(Arc::new(transport), cancel.clone());

        handle.inbound_tx.send(OPEN.to_string()).unwrap();
        handle.inbound_tx.send("40".to_string()).unwrap();
        assert_eq!(next_frame(&mut handle).await, "40");
        assert_eq!(channel.inbound.recv().await, Some(ServerEvent::Connected));

        channel
            .outbound
            .send(ClientEvent::LeaveChat { chat_id: "c1".into() })
            .unwrap();
        cancel.cancel();
        channel.task.await.unwrap();

        assert_eq!(next_frame(&mut handle).await, r#"42["leave_chat",{"chat_id":"c1"}]"#);
        assert_eq!(next_frame(&mut handle).await, "41");
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_frames_are_skipped() {
        let (transport, handle) = FakeTransport::new();
        let cancel = CancellationToken::new();
        let mut channel = start_channel(Arc::new(transport), cancel.clone());

        handle.inbound_tx.send("42garbage".to_string()).unwrap();
        handle
            .inbound_tx
            .send(r#"42["presence",{"online":true}]"#.to_string())
            .unwrap();
        handle
            .inbound_tx
            .send(r#"42["messages_read",{"user_id":"u2"}]"#.to_string())
            .unwrap();

        assert_eq!(
            channel.inbound.recv().await,
            Some(ServerEvent::MessagesRead {
                user_id: "u2".into()
            })
        );

        cancel.cancel();
        channel.task.await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_transport_reports_disconnect() {
        let (transport, handle) = FakeTransport::new();
        let transport = Arc::new(transport);
        let mut channel = start_channel(transport.clone(), CancellationToken::new());

        drop(handle);
        transport.close();

        assert!(matches!(
            channel.inbound.recv().await,
            Some(ServerEvent::Disconnected { .. })
        ));
        channel.task.await.unwrap();
    }

    #[tokio::test]
    async fn test_refused_namespace_connect_reports_disconnect() {
        let (transport, mut handle) = FakeTransport::new();
        let mut channel = start_channel(Arc::new(transport), CancellationToken::new());

        channel
            .outbound
            .send(ClientEvent::JoinChat {
                chat_id: "c1".into(),
                user_id: "u1".into(),
            })
            .unwrap();

        handle.inbound_tx.send(OPEN.to_string()).unwrap();
        assert_eq!(next_frame(&mut handle).await, "40");
        handle
            .inbound_tx
            .send(r#"44{"message":"unauthorized"}"#.to_string())
            .unwrap();

        let event = tokio::time::timeout(Duration::from_secs(2), channel.inbound.recv())
            .await
            .expect("timed out");
        assert_eq!(
            event,
            Some(ServerEvent::Disconnected {
                reason: "Connection refused: unauthorized".into()
            })
        );
        tokio::time::timeout(Duration::from_secs(2), channel.task)
            .await
            .expect("task still running")
            .unwrap();
        // The queued join was never published.
        assert!(handle.outbound_rx.try_recv().is_err());
    }
}
