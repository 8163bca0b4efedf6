//! # Console Session Demo
//!
//! Plays tic-tac-toe against a room server from the terminal:
//!
//! 1. Connect via WebSocket and wait for the open room list
//! 2. Join the first open room, or create one if none is open
//! 3. Print the board after every change
//! 4. Play the first free cell whenever a move is allowed
//! 5. Shut down gracefully on Ctrl+C or disconnect
//!
//! ## Running
//!
//! ```sh
//! # Start a room server on localhost:8000, then:
//! cargo run --example console_session
//!
//! # Override the server URL:
//! TICTACTOE_URL=ws://my-server:8000/ws cargo run --example console_session
//! ```

use tictactoe_client::protocol::{Board, Cell};
use tictactoe_client::{
    Phase, SessionClient, SessionConfig, SessionEvent, ViewModel, WebSocketTransport,
};

/// Default server URL when `TICTACTOE_URL` is not set.
const DEFAULT_URL: &str = "ws://localhost:8000/ws";

fn render(board: &Board) -> String {
    board
        .rows()
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Cell::Empty => '.',
                    Cell::X => 'x',
                    Cell::O => 'o',
                })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// React to one view: pick a room in the lobby, move when allowed.
fn act(
    client: &SessionClient,
    view: &ViewModel,
    asked_for_room: &mut bool,
) -> tictactoe_client::error::Result<()> {
    if view.phase.in_room() {
        *asked_for_room = false;
    }
    match view.phase {
        Phase::RoomIdle if !*asked_for_room => {
            *asked_for_room = true;
            match view.open_rooms.first() {
                Some(room) => {
                    tracing::info!("Joining room {}", room.room_id);
                    client.join_room(room.room_id)?;
                }
                None => {
                    tracing::info!("No open rooms, creating one");
                    client.create_room()?;
                }
            }
        }
        Phase::Playing if view.can_move => {
            if let Some((cell, _)) = view.board.cells().find(|(_, cell)| cell.is_empty()) {
                tracing::info!("Playing cell {cell}");
                client.attempt_move(cell.get())?;
            }
        }
        _ => {}
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Logging ─────────────────────────────────────────────────────
    // Set `RUST_LOG=debug` for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ───────────────────────────────────────────────
    let url = std::env::var("TICTACTOE_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
    tracing::info!("Connecting to {url}");

    // ── Connect ─────────────────────────────────────────────────────
    let transport = WebSocketTransport::connect(&url).await?;
    let (mut client, mut event_rx) = SessionClient::start(transport, SessionConfig::new());
    let mut asked_for_room = false;

    // ── Event loop ──────────────────────────────────────────────────
    loop {
        tokio::select! {
            event = event_rx.recv() => {
                let Some(event) = event else {
                    tracing::info!("Event channel closed, exiting");
                    break;
                };

                match event {
                    SessionEvent::Connected => {
                        tracing::info!("Connected, waiting for the room list");
                    }
                    SessionEvent::ViewChanged(view) => {
                        if let Some(info) = &view.info_message {
                            tracing::info!("{info}");
                        }
                        if let Some(countdown) = view.countdown {
                            tracing::info!("Round starts in {countdown}");
                        }
                        if view.phase.in_room() {
                            println!("{}\n", render(&view.board));
                        }
                        act(&client, &view, &mut asked_for_room)?;
                    }
                    SessionEvent::InputRejected(reason) => {
                        tracing::warn!("Rejected: {reason}");
                    }
                    SessionEvent::Disconnected { reason, close_code } => {
                        tracing::warn!(
                            ?close_code,
                            "Disconnected: {}",
                            reason.as_deref().unwrap_or("closed by server")
                        );
                        break;
                    }
                }
            }

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, shutting down");
                break;
            }
        }
    }

    client.shutdown().await;
    tracing::info!("Client shut down cleanly");
    Ok(())
}
