//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! Both `ws://` and `wss://` URLs are supported. The close code of the frame
//! that ends the stream is kept so the session can tell "game already
//! started" (`4000`) apart from an ordinary disconnect.
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), tictactoe_client::SessionError> {
//! use tictactoe_client::{Transport, WebSocketTransport};
//!
//! let mut transport = WebSocketTransport::connect("ws://localhost:8000/ws").await?;
//! transport.send(r#"{"type":"get_open_rooms"}"#.to_string()).await?;
//!
//! while let Some(frame) = transport.recv().await {
//!     let text = frame?;
//!     if text.contains("update_open_rooms") {
//!         println!("{text}");
//!         break;
//!     }
//! }
//! if transport.close_code().is_some_and(|code| code.code() == 4000) {
//!     eprintln!("game already started");
//! }
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::close_codes::CloseCode;
use crate::error::SessionError;
use crate::transport::Transport;

/// Type alias for the underlying WebSocket stream.
pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// A [`Transport`] backed by a WebSocket connection.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) is cancel-safe: dropping its future before it
/// completes does not lose a message.
#[derive(Debug)]
pub struct WebSocketTransport {
    stream: WsStream,
    closed: bool,
    close_code: Option<CloseCode>,
}

impl WebSocketTransport {
    /// Open a connection to `url` (`ws://` or `wss://`).
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] if the URL is invalid or the handshake
    /// fails. I/O error kinds are kept; everything else maps to
    /// [`ErrorKind::Other`](std::io::ErrorKind::Other).
    pub async fn connect(url: &str) -> Result<Self, SessionError> {
        tracing::debug!(%url, "opening room server connection");
        let (stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(handshake_error)?;
        tracing::info!(%url, "room server connection open");
        Ok(Self::from_stream(stream))
    }

    /// Wrap an already-established WebSocket stream, e.g. one built with
    /// custom TLS or proxy settings.
    pub fn from_stream(stream: WsStream) -> Self {
        Self {
            stream,
            closed: false,
            close_code: None,
        }
    }

    /// [`connect`](Self::connect) with a deadline.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Timeout`] when `timeout` elapses first, and
    /// otherwise the errors of [`connect`](Self::connect).
    pub async fn connect_with_timeout(
        url: &str,
        timeout: std::time::Duration,
    ) -> Result<Self, SessionError> {
        match tokio::time::timeout(timeout, Self::connect(url)).await {
            Ok(result) => result,
            Err(_) => Err(SessionError::Timeout),
        }
    }
}

fn handshake_error(err: tokio_tungstenite::tungstenite::Error) -> SessionError {
    let kind = if let tokio_tungstenite::tungstenite::Error::Io(io) = &err {
        io.kind()
    } else {
        std::io::ErrorKind::Other
    };
    SessionError::Io(std::io::Error::new(kind, err))
}

/// What one inbound frame means for the session.
enum Inbound {
    Text(String),
    Closed(Option<CloseCode>),
    Skip,
}

fn classify(frame: Message) -> Inbound {
    match frame {
        Message::Text(text) => Inbound::Text(text.to_string()),
        Message::Close(close) => {
            tracing::debug!(?close, "close frame received");
            Inbound::Closed(close.map(|close| CloseCode::from(u16::from(close.code))))
        }
        // tungstenite answers pings itself.
        Message::Ping(_) | Message::Pong(_) => Inbound::Skip,
        Message::Binary(bytes) => {
            tracing::warn!(len = bytes.len(), "ignoring binary frame");
            Inbound::Skip
        }
        Message::Frame(_) => Inbound::Skip,
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, message: String) -> Result<(), SessionError> {
        if self.closed {
            return Err(SessionError::TransportClosed);
        }
        self.stream
            .send(Message::Text(message.into()))
            .await
            .map_err(|e| SessionError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, SessionError>> {
        while let Some(next) = self.stream.next().await {
            let frame = match next {
                Ok(frame) => frame,
                Err(e) => return Some(Err(SessionError::TransportReceive(e.to_string()))),
            };
            match classify(frame) {
                Inbound::Text(text) => return Some(Ok(text)),
                Inbound::Closed(code) => {
                    self.close_code = code;
                    return None;
                }
                Inbound::Skip => {}
            }
        }
        None
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        if std::mem::replace(&mut self.closed, true) {
            return Ok(());
        }
        self.stream
            .close(None)
            .await
            .map_err(|e| SessionError::TransportSend(e.to_string()))
    }

    fn close_code(&self) -> Option<CloseCode> {
        self.close_code
    }
}

#[cfg(test)]
#[cfg(feature = "transport-websocket")]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;

    /// Serve one connection: send `script` in order, then drain whatever the
    /// client sends back into the returned receiver until it disconnects.
    async fn scripted_server(
        script: Vec<Message>,
    ) -> (String, tokio::sync::mpsc::UnboundedReceiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let (seen_tx, seen_rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            for frame in script {
                if ws.send(frame).await.is_err() {
                    return;
                }
            }
            while let Some(Ok(frame)) = ws.next().await {
                if let Message::Text(text) = frame {
                    let _ = seen_tx.send(text.to_string());
                }
            }
        });

        (url, seen_rx)
    }

    fn close_with(code: u16) -> Message {
        Message::Close(Some(CloseFrame {
            code: WsCloseCode::from(code),
            reason: "bye".into(),
        }))
    }

    #[test]
    fn transport_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<WebSocketTransport>();
    }

    #[tokio::test]
    async fn invalid_url_is_an_io_error() {
        let result = WebSocketTransport::connect("room-server").await;
        assert!(matches!(result, Err(SessionError::Io(_))));
    }

    #[tokio::test]
    async fn text_frames_are_delivered_in_order() {
        let (url, _seen) = scripted_server(vec![
            Message::Text(r#"{"type":"update_open_rooms","open_rooms":[5,7]}"#.into()),
            Message::Text(r#"{"type":"draw"}"#.into()),
            close_with(1000),
        ])
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        let first = transport.recv().await.unwrap().unwrap();
        assert!(first.contains("update_open_rooms"));
        assert_eq!(transport.recv().await.unwrap().unwrap(), r#"{"type":"draw"}"#);
        assert!(transport.recv().await.is_none());
        assert_eq!(transport.close_code(), Some(CloseCode::Normal));
    }

    #[tokio::test]
    async fn game_in_progress_close_code_is_kept() {
        let (url, _seen) = scripted_server(vec![close_with(4000)]).await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        assert!(transport.recv().await.is_none());
        assert_eq!(transport.close_code(), Some(CloseCode::GameInProgress));
    }

    #[tokio::test]
    async fn binary_and_ping_frames_are_skipped() {
        let (url, _seen) = scripted_server(vec![
            Message::Binary(vec![1, 2, 3].into()),
            Message::Ping(vec![9].into()),
            Message::Text(r#"{"type":"leave_room"}"#.into()),
        ])
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        assert_eq!(
            transport.recv().await.unwrap().unwrap(),
            r#"{"type":"leave_room"}"#
        );
    }

    #[tokio::test]
    async fn outbound_messages_reach_the_server() {
        let (url, mut seen) = scripted_server(vec![]).await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport
            .send(r#"{"type":"get_open_rooms"}"#.to_string())
            .await
            .unwrap();
        assert_eq!(seen.recv().await.unwrap(), r#"{"type":"get_open_rooms"}"#);
    }

    #[tokio::test]
    async fn send_after_close_fails() {
        let (url, _seen) = scripted_server(vec![]).await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport.close().await.unwrap();
        // Closing twice is fine.
        transport.close().await.unwrap();
        let result = transport.send(r#"{"type":"create_room"}"#.to_string()).await;
        assert!(matches!(result, Err(SessionError::TransportClosed)));
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        // Accepts TCP but never answers the upgrade request.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            std::future::pending::<()>().await;
            drop(tcp);
        });

        let result =
            WebSocketTransport::connect_with_timeout(&url, std::time::Duration::from_millis(50))
                .await;
        assert!(matches!(result, Err(SessionError::Timeout)));
        server.abort();
    }
}
