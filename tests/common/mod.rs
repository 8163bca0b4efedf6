#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for the tic-tac-toe client integration tests.
//!
//! Provides a channel-driven [`MockTransport`] paired with a [`MockServer`]
//! handle, so a test can push server messages at any point of a scenario and
//! inspect what the client sent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tictactoe_client::protocol::{Board, Cell, CellIndex, ClientMessage, ServerMessage};
use tictactoe_client::{CloseCode, SessionError, SessionEvent, Transport, ViewModel};
use tokio::sync::mpsc;

// ── MockTransport ───────────────────────────────────────────────────

/// One scripted item on the inbound side of the mock channel.
#[derive(Debug)]
pub enum Incoming {
    /// A text frame.
    Text(String),
    /// The server closed the channel, optionally with a close code.
    Close(Option<u16>),
    /// A transport-level receive failure.
    Error(String),
}

/// Transport half handed to `SessionClient::start`.
pub struct MockTransport {
    incoming: mpsc::UnboundedReceiver<Incoming>,
    sent: mpsc::UnboundedSender<String>,
    closed: Arc<AtomicBool>,
    close_code: Option<CloseCode>,
}

/// Test-side handle playing the server.
pub struct MockServer {
    incoming: mpsc::UnboundedSender<Incoming>,
    sent: mpsc::UnboundedReceiver<String>,
    closed: Arc<AtomicBool>,
}

/// Create a connected transport/server pair.
pub fn mock_pair() -> (MockTransport, MockServer) {
    let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
    let (sent_tx, sent_rx) = mpsc::unbounded_channel();
    let closed = Arc::new(AtomicBool::new(false));
    let transport = MockTransport {
        incoming: incoming_rx,
        sent: sent_tx,
        closed: Arc::clone(&closed),
        close_code: None,
    };
    let server = MockServer {
        incoming: incoming_tx,
        sent: sent_rx,
        closed,
    };
    (transport, server)
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, message: String) -> Result<(), SessionError> {
        self.sent
            .send(message)
            .map_err(|e| SessionError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, SessionError>> {
        match self.incoming.recv().await {
            Some(Incoming::Text(text)) => Some(Ok(text)),
            Some(Incoming::Close(code)) => {
                self.close_code = code.map(CloseCode::from);
                None
            }
            Some(Incoming::Error(reason)) => Some(Err(SessionError::TransportReceive(reason))),
            // Server handle dropped; stay open until shutdown.
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn close_code(&self) -> Option<CloseCode> {
        self.close_code
    }
}

impl MockServer {
    /// Push a typed server message.
    pub fn push(&self, message: &ServerMessage) {
        self.push_raw(&serde_json::to_string(message).unwrap());
    }

    /// Push a raw text frame, valid JSON or not.
    pub fn push_raw(&self, text: &str) {
        self.incoming.send(Incoming::Text(text.to_owned())).unwrap();
    }

    /// Close the channel from the server side.
    pub fn close(&self, code: Option<u16>) {
        self.incoming.send(Incoming::Close(code)).unwrap();
    }

    /// Fail the next receive.
    pub fn fail(&self, reason: &str) {
        self.incoming
            .send(Incoming::Error(reason.to_owned()))
            .unwrap();
    }

    /// Wait for the next message the client sent.
    pub async fn next_sent(&mut self) -> ClientMessage {
        let text = tokio::time::timeout(Duration::from_secs(30), self.sent.recv())
            .await
            .expect("timed out waiting for a client message")
            .expect("transport dropped");
        serde_json::from_str(&text).unwrap()
    }

    /// Everything sent so far that has not been consumed yet.
    pub fn drain_sent(&mut self) -> Vec<ClientMessage> {
        let mut messages = Vec::new();
        while let Ok(text) = self.sent.try_recv() {
            messages.push(serde_json::from_str(&text).unwrap());
        }
        messages
    }

    /// Whether the client closed the transport.
    pub fn was_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }
}

// ── Event helpers ───────────────────────────────────────────────────

/// Receive the next event, failing the test after a generous timeout.
pub async fn next_event(events: &mut mpsc::Receiver<SessionEvent>) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(30), events.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event channel closed")
}

/// Skip ahead to the next view.
pub async fn next_view(events: &mut mpsc::Receiver<SessionEvent>) -> ViewModel {
    loop {
        if let SessionEvent::ViewChanged(view) = next_event(events).await {
            return *view;
        }
    }
}

/// Skip views until one satisfies `pred`.
pub async fn view_where(
    events: &mut mpsc::Receiver<SessionEvent>,
    pred: impl Fn(&ViewModel) -> bool,
) -> ViewModel {
    loop {
        let view = next_view(events).await;
        if pred(&view) {
            return view;
        }
    }
}

// ── Message helpers ─────────────────────────────────────────────────

pub fn cells(ids: &[u8]) -> Vec<CellIndex> {
    ids.iter().map(|&i| CellIndex::new(i).unwrap()).collect()
}

/// Board with the given `(cell, mark)` pairs set.
pub fn board_with(marks: &[(u8, Cell)]) -> Board {
    let mut board = Board::empty();
    for &(index, cell) in marks {
        board.set(CellIndex::new(index).unwrap(), cell);
    }
    board
}

pub fn rooms(ids: &[u64]) -> ServerMessage {
    ServerMessage::UpdateOpenRooms {
        open_rooms: ids.to_vec(),
    }
}
