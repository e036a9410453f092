//! In-process fake transport for event channel tests
//!
//! [`FakeTransport::new`] returns a `(FakeTransport, FakeTransportHandle)`
//! pair. Wire the transport into the code under test; from the test side,
//! use the handle to:
//!
//! - Read frames the client sent: `handle.outbound_rx.recv().await`
//! - Inject server frames: `handle.inbound_tx.send(frame)`
//!
//! ```text
//! client send() -----> outbound_tx -----> outbound_rx (handle reads)
//! handle inbound_tx -> inbound_tx  -----> inbound_rx  (client receive())
//! ```

use std::pin::Pin;
use std::sync::Arc;

use futures::Stream;
use tokio::sync::{mpsc, Mutex};

use crate::chat::transport::EventTransport;
use crate::error::{Result, StudyflowError};

/// In-process fake transport for use in tests.
#[derive(Debug)]
pub struct FakeTransport {
    outbound_tx: mpsc::UnboundedSender<String>,
    inbound_rx: Arc<Mutex<mpsc::UnboundedReceiver<String>>>,
    /// Same channel end as `handle.inbound_tx`; taken by [`Self::close`].
    inbound_inject_tx: std::sync::Mutex<Option<mpsc::UnboundedSender<String>>>,
}

impl FakeTransport {
    /// Create a new `(FakeTransport, FakeTransportHandle)` pair.
    pub fn new() -> (Self, FakeTransportHandle) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<String>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();

        let transport = Self {
            outbound_tx,
            inbound_rx: Arc::new(Mutex::new(inbound_rx)),
            inbound_inject_tx: std::sync::Mutex::new(Some(inbound_tx.clone())),
        };

        let handle = FakeTransportHandle {
            outbound_rx,
            inbound_tx,
        };

        (transport, handle)
    }

    /// Push a server frame onto the inbound stream.
    ///
    /// # Panics
    ///
    /// Panics if the transport was closed.
    pub fn inject_frame(&self, frame: &str) {
        let guard = self.inbound_inject_tx.lock().expect("inject lock poisoned");
        guard
            .as_ref()
            .expect("FakeTransport: inject after close")
            .send(frame.to_string())
            .expect("FakeTransport: inbound channel closed");
    }

    /// Drop the transport's own inbound sender, so the inbound stream ends
    /// once the handle's sender is dropped as well.
    pub fn close(&self) {
        self.inbound_inject_tx
            .lock()
            .expect("inject lock poisoned")
            .take();
    }
}

/// The test-side handle for a [`FakeTransport`].
#[derive(Debug)]
pub struct FakeTransportHandle {
    /// Receives frames the client sent via [`EventTransport::send`].
    pub outbound_rx: mpsc::UnboundedReceiver<String>,
    /// Sends server frames into the client's [`EventTransport::receive`]
    /// stream.
    pub inbound_tx: mpsc::UnboundedSender<String>,
}

#[async_trait::async_trait]
impl EventTransport for FakeTransport {
    async fn send(&self, frame: String) -> Result<()> {
        self.outbound_tx.send(frame).map_err(|e| {
            anyhow::anyhow!(StudyflowError::Transport(format!(
                "FakeTransport outbound channel closed: {}",
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

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::time::Duration;

    #[tokio::test]
    async fn test_send_delivers_to_handle_outbound_rx() {
        let (transport, mut handle) = FakeTransport::new();
        transport.send("2".to_string()).await.unwrap();
        let received = tokio::time::timeout(Duration::from_secs(2), handle.outbound_rx.recv())
            .await
            .expect("timed out")
            .expect("channel closed");
        assert_eq!(received, "2");
    }

    #[tokio::test]
    async fn test_receive_yields_injected_frames_in_order() {
        let (transport, handle) = FakeTransport::new();
        handle.inbound_tx.send("40".to_string()).unwrap();
        transport.inject_frame("2");

        let mut stream = transport.receive();
        assert_eq!(stream.next().await.as_deref(), Some("40"));
        assert_eq!(stream.next().await.as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_stream_ends_after_close_and_handle_drop() {
        let (transport, handle) = FakeTransport::new();
        transport.close();
        drop(handle);
        assert!(transport.receive().next().await.is_none());
    }

    #[tokio::test]
    async fn test_send_fails_when_handle_dropped() {
        let (transport, handle) = FakeTransport::new();
        drop(handle);
        assert!(transport.send("3".to_string()).await.is_err());
    }
}
