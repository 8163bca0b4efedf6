//! # Tic-Tac-Toe Client
//!
//! Client-side session engine for a networked tic-tac-toe room server.
//!
//! The crate keeps one connection's lobby, room, countdown and turn state
//! consistent while JSON messages arrive from the server, countdown ticks
//! fire, and the player tries to move. Rendering is left to the
//! application: it receives a [`ViewModel`] after every change.
//!
//! ## Layers
//!
//! - [`protocol`] and [`codec`]: wire types and JSON framing.
//! - [`state`]: the session state machine, pure data with named transitions.
//! - [`dispatcher`]: routes decoded server messages to transitions.
//! - [`turn_gate`] and [`directory`]: local intents checked before sending.
//! - [`countdown`]: generation-stamped round countdown.
//! - [`view`]: the render-ready snapshot.
//! - [`client`]: the async session loop tying it all together.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tictactoe_client::{SessionClient, SessionConfig, SessionEvent, WebSocketTransport};
//!
//! # async fn run() -> Result<(), tictactoe_client::SessionError> {
//! let transport = WebSocketTransport::connect("ws://localhost:8000/ws").await?;
//! let (mut client, mut events) = SessionClient::start(transport, SessionConfig::new());
//!
//! client.create_room()?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         SessionEvent::ViewChanged(view) => {
//!             if let Some(info) = &view.info_message {
//!                 println!("{info}");
//!             }
//!             if view.can_move {
//!                 client.attempt_move(4)?;
//!             }
//!         }
//!         SessionEvent::Disconnected { .. } => break,
//!         _ => {}
//!     }
//! }
//!
//! client.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod close_codes;
pub mod codec;
pub mod directory;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod protocol;
pub mod state;
pub mod transport;
pub mod transports;
pub mod turn_gate;
pub mod view;

#[cfg(feature = "tokio-runtime")]
pub mod client;
#[cfg(feature = "tokio-runtime")]
pub mod countdown;

// Re-export primary types for ergonomic imports.
#[cfg(feature = "tokio-runtime")]
pub use client::{SessionClient, SessionConfig};
pub use close_codes::CloseCode;
pub use directory::{RoomDirectory, RoomSummary};
pub use error::{DecodeError, ProtocolViolation, SessionError, UserInputError};
pub use event::SessionEvent;
pub use protocol::{Board, Cell, CellIndex, ClientMessage, RoomId, ServerMessage, Sign};
pub use state::{Phase, SessionFlavor, SessionOptions, SessionState};
pub use transport::Transport;
#[cfg(feature = "transport-websocket")]
pub use transports::WebSocketTransport;
pub use view::{Highlight, HighlightColor, UiState, ViewModel};
