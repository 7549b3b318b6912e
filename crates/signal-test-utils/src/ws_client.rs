//! WebSocket test client.
//!
//! Speaks the signaling protocol against a [`TestSignalServer`]: sends
//! [`ClientEvent`]s and decodes incoming text frames as [`ServerEvent`]s.
//!
//! [`TestSignalServer`]: crate::TestSignalServer

use common::protocol::{ClientEvent, ServerEvent};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// How long [`TestClient::recv`] waits for the next event.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// One browser-like signaling client.
pub struct TestClient {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    /// Open a WebSocket to `url` (e.g. `ws://127.0.0.1:1234/ws`).
    pub async fn connect(url: &str) -> Result<Self, anyhow::Error> {
        let (socket, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to {}: {}", url, e))?;
        Ok(Self { socket })
    }

    /// Send one client event as a JSON text frame.
    pub async fn send(&mut self, event: &ClientEvent) -> Result<(), anyhow::Error> {
        let text = serde_json::to_string(event)?;
        self.send_raw(&text).await
    }

    /// Send arbitrary text, for malformed-input tests.
    pub async fn send_raw(&mut self, text: &str) -> Result<(), anyhow::Error> {
        self.socket.send(Message::Text(text.to_string())).await?;
        Ok(())
    }

    /// Receive the next server event, skipping control frames.
    ///
    /// Fails after [`RECV_TIMEOUT`] or when the socket closes.
    pub async fn recv(&mut self) -> Result<ServerEvent, anyhow::Error> {
        tokio::time::timeout(RECV_TIMEOUT, self.next_event())
            .await
            .map_err(|_| anyhow::anyhow!("No event within {:?}", RECV_TIMEOUT))?
    }

    /// Succeeds only if no event arrives within `window`.
    pub async fn expect_silence(&mut self, window: Duration) -> Result<(), anyhow::Error> {
        match tokio::time::timeout(window, self.next_event()).await {
            Err(_) => Ok(()),
            Ok(Ok(event)) => Err(anyhow::anyhow!("Unexpected event: {:?}", event)),
            Ok(Err(e)) => Err(e),
        }
    }

    /// Wait for the server to close the socket.
    ///
    /// Returns the close code, if the server sent one.
    pub async fn expect_close(&mut self) -> Result<Option<u16>, anyhow::Error> {
        let wait = async {
            loop {
                match self.socket.next().await {
                    Some(Ok(Message::Close(frame))) => {
                        return Ok(frame.map(|f| u16::from(f.code)));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(anyhow::anyhow!("Socket error: {}", e)),
                    None => return Ok(None),
                }
            }
        };
        tokio::time::timeout(RECV_TIMEOUT, wait)
            .await
            .map_err(|_| anyhow::anyhow!("Socket not closed within {:?}", RECV_TIMEOUT))?
    }

    /// Close the socket from the client side.
    pub async fn close(mut self) -> Result<(), anyhow::Error> {
        self.socket.close(None).await?;
        Ok(())
    }

    async fn next_event(&mut self) -> Result<ServerEvent, anyhow::Error> {
        loop {
            match self.socket.next().await {
                Some(Ok(Message::Text(text))) => return Ok(serde_json::from_str(&text)?),
                Some(Ok(Message::Close(frame))) => {
                    return Err(anyhow::anyhow!("Socket closed: {:?}", frame));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(anyhow::anyhow!("Socket error: {}", e)),
                None => return Err(anyhow::anyhow!("Socket stream ended")),
            }
        }
    }
}
