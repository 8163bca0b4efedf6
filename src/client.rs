//! Async session client.
//!
//! [`SessionClient`] is a thin handle that talks to one background session
//! loop over an unbounded MPSC channel. The loop owns the
//! [`SessionState`], the [`RoomDirectory`] and the [`CountdownTimer`], and is
//! their only writer: local commands, countdown ticks and server messages are
//! all serialized through one `tokio::select!`. After every transition the
//! loop emits a fresh [`ViewModel`] on the bounded event channel returned from
//! [`SessionClient::start`].
//!
//! # Example
//!
//! ```rust,ignore
//! let transport = WebSocketTransport::connect("ws://localhost:8000/ws").await?;
//! let (client, mut events) = SessionClient::start(transport, SessionConfig::new());
//!
//! client.create_room()?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         SessionEvent::ViewChanged(view) if view.can_move => client.attempt_move(4)?,
//!         SessionEvent::Disconnected { .. } => break,
//!         _ => {}
//!     }
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, warn};

use crate::close_codes::CloseCode;
use crate::codec;
use crate::countdown::{CountdownTimer, DEFAULT_TICK_PERIOD, MIN_TICK_PERIOD};
use crate::directory::{parse_room_input, RoomDirectory};
use crate::dispatcher::dispatch;
use crate::error::{Result, SessionError, UserInputError};
use crate::event::SessionEvent;
use crate::protocol::{ClientMessage, RoomId};
use crate::state::{
    Phase, SessionFlavor, SessionOptions, SessionState, TickOutcome, TimerDirective,
    DEFAULT_COUNTDOWN_START,
};
use crate::transport::Transport;
use crate::turn_gate;
use crate::view::ViewModel;

/// Default capacity of the bounded event channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default timeout for the graceful shutdown.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for a [`SessionClient`].
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use tictactoe_client::client::SessionConfig;
/// use tictactoe_client::state::SessionFlavor;
///
/// let config = SessionConfig::new()
///     .with_flavor(SessionFlavor::SingleGame)
///     .with_tick_period(Duration::from_millis(500))
///     .with_event_channel_capacity(64);
/// assert_eq!(config.countdown_start, 3);
/// assert!(config.request_rooms_on_connect);
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Capacity of the bounded event channel.
    ///
    /// When the consumer cannot keep up, view and rejection events are
    /// dropped (with a warning logged) to avoid blocking the session loop.
    /// The latest view stays available through [`SessionClient::view`], and
    /// `Disconnected` is always delivered.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// Time the session loop is given to close the transport on
    /// [`SessionClient::shutdown`] before it is aborted.
    ///
    /// Defaults to **1 second**.
    pub shutdown_timeout: Duration,
    /// Value the round countdown starts from. Defaults to **3**; values below
    /// 1 are clamped to 1.
    pub countdown_start: u8,
    /// Time between two countdown ticks. Defaults to **1 second**.
    pub tick_period: Duration,
    /// Whether a room plays a multi-round match or a single game.
    pub flavor: SessionFlavor,
    /// Derive `can_move` from board updates assuming alternating turns.
    /// Defaults to `false`: the server alone decides when moves unlock.
    pub alternate_turns: bool,
    /// Send `get_open_rooms` as soon as the loop starts. Defaults to `true`.
    pub request_rooms_on_connect: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self {
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            countdown_start: DEFAULT_COUNTDOWN_START,
            tick_period: DEFAULT_TICK_PERIOD,
            flavor: SessionFlavor::default(),
            alternate_turns: false,
            request_rooms_on_connect: true,
        }
    }

    /// Set the capacity of the bounded event channel. Values below 1 are
    /// clamped to 1.
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    /// Set the timeout for the graceful shutdown.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set the value the countdown starts from. Values below 1 are clamped
    /// to 1.
    #[must_use]
    pub fn with_countdown_start(mut self, start: u8) -> Self {
        self.countdown_start = start.max(1);
        self
    }

    /// Set the time between two countdown ticks. Values below
    /// [`MIN_TICK_PERIOD`] are clamped to it.
    #[must_use]
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period.max(MIN_TICK_PERIOD);
        self
    }

    #[must_use]
    pub fn with_flavor(mut self, flavor: SessionFlavor) -> Self {
        self.flavor = flavor;
        self
    }

    #[must_use]
    pub fn with_alternate_turns(mut self, alternate_turns: bool) -> Self {
        self.alternate_turns = alternate_turns;
        self
    }

    #[must_use]
    pub fn with_request_rooms_on_connect(mut self, request: bool) -> Self {
        self.request_rooms_on_connect = request;
        self
    }

    fn session_options(&self) -> SessionOptions {
        SessionOptions {
            flavor: self.flavor,
            countdown_start: self.countdown_start,
            alternate_turns: self.alternate_turns,
        }
    }
}

// ── Commands ────────────────────────────────────────────────────────

/// Local intents queued from the handle to the session loop.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    RequestRooms,
    CreateRoom,
    JoinRoom(RoomId),
    JoinRoomInput(String),
    LeaveRoom,
    Move(u8),
}

// ── Shared state ────────────────────────────────────────────────────

/// Read-only mirrors published by the session loop for the handle.
struct SharedState {
    connected: AtomicBool,
    view: Mutex<ViewModel>,
}

impl SharedState {
    fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            view: Mutex::new(ViewModel::default()),
        }
    }
}

// ── Client handle ───────────────────────────────────────────────────

/// Async client handle for one tic-tac-toe session.
///
/// All command methods queue the intent for the session loop and return
/// immediately. Turn-gate checks run in the loop; a rejected intent shows up
/// as [`SessionEvent::InputRejected`] followed by a view whose info message
/// explains it.
pub struct SessionClient {
    /// Sender half of the command channel to the session loop.
    cmd_tx: mpsc::UnboundedSender<Command>,
    /// Mirrors updated by the session loop.
    shared: Arc<SharedState>,
    /// Handle to the background session loop task.
    task: Option<tokio::task::JoinHandle<()>>,
    /// Oneshot sender to signal the session loop to shut down gracefully.
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    /// Timeout for the graceful shutdown.
    shutdown_timeout: Duration,
}

impl SessionClient {
    /// Start the session loop on a connected transport and return a handle
    /// plus the event receiver.
    ///
    /// The loop emits [`SessionEvent::Connected`], moves the session to
    /// [`Phase::AwaitingRooms`] and, unless disabled in the config, asks the
    /// server for the open rooms.
    #[must_use = "the event receiver must be used to receive events"]
    pub fn start(
        transport: impl Transport,
        config: SessionConfig,
    ) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<Command>();
        // Clamp capacity to at least 1 (tokio panics on 0).
        let capacity = config.event_channel_capacity.max(1);
        let (event_tx, event_rx) = mpsc::channel::<SessionEvent>(capacity);
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let shared = Arc::new(SharedState::new());

        if config.request_rooms_on_connect {
            // Cannot fail: the receiver is alive until the loop exits.
            let _ = cmd_tx.send(Command::RequestRooms);
        }

        let shutdown_timeout = config.shutdown_timeout;
        let task = tokio::spawn(session_loop(
            transport,
            cmd_rx,
            event_tx,
            Arc::clone(&shared),
            shutdown_rx,
            config,
        ));

        let client = Self {
            cmd_tx,
            shared,
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout,
        };

        (client, event_rx)
    }

    // ── Public API methods ──────────────────────────────────────────

    /// Ask the server for the current list of open rooms.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotConnected`] if the session loop has exited.
    pub fn request_rooms(&self) -> Result<()> {
        self.send(Command::RequestRooms)
    }

    /// Create a new room.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotConnected`] if the session loop has exited.
    pub fn create_room(&self) -> Result<()> {
        self.send(Command::CreateRoom)
    }

    /// Join the room with the given id, e.g. one picked from
    /// [`ViewModel::open_rooms`].
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotConnected`] if the session loop has exited.
    pub fn join_room(&self, room_id: RoomId) -> Result<()> {
        self.send(Command::JoinRoom(room_id))
    }

    /// Join the room typed by the player. Input that is not a non-negative
    /// integer is rejected with [`UserInputError::InvalidRoomId`].
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotConnected`] if the session loop has exited.
    pub fn join_room_input(&self, input: impl Into<String>) -> Result<()> {
        self.send(Command::JoinRoomInput(input.into()))
    }

    /// Leave the current room.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotConnected`] if the session loop has exited.
    pub fn leave_room(&self) -> Result<()> {
        self.send(Command::LeaveRoom)
    }

    /// Try to place the local sign on `cell` (`0..=8`, row-major).
    ///
    /// The local board is not changed; it follows the server's next
    /// `update_board`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotConnected`] if the session loop has exited.
    pub fn attempt_move(&self, cell: u8) -> Result<()> {
        self.send(Command::Move(cell))
    }

    /// Shut down the client, closing the transport and stopping the loop.
    ///
    /// After calling this method, the event receiver yields `None` once the
    /// session loop exits.
    pub async fn shutdown(&mut self) {
        debug!("SessionClient: shutdown requested");

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("session loop terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("session loop did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("session loop aborted: {join_err}");
                    }
                }
            }
        }

        self.shared.connected.store(false, Ordering::Release);
    }

    // ── State accessors ─────────────────────────────────────────────

    /// Returns `true` while the transport is believed to be open.
    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Acquire)
    }

    /// The most recent view emitted by the session loop.
    pub async fn view(&self) -> ViewModel {
        self.shared.view.lock().await.clone()
    }

    /// Phase of the most recent view.
    pub async fn phase(&self) -> Phase {
        self.shared.view.lock().await.phase
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn send(&self, cmd: Command) -> Result<()> {
        if !self.shared.connected.load(Ordering::Acquire) {
            return Err(SessionError::NotConnected);
        }
        self.cmd_tx
            .send(cmd)
            .map_err(|_| SessionError::NotConnected)
    }
}

impl std::fmt::Debug for SessionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClient")
            .field("connected", &self.is_connected())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl Drop for SessionClient {
    fn drop(&mut self) {
        // No executor is available here to drive a graceful close, so the
        // loop future is simply dropped.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ── Session loop ────────────────────────────────────────────────────

/// Everything the session loop owns.
struct Session {
    state: SessionState,
    directory: RoomDirectory,
    timer: CountdownTimer,
    tick_tx: mpsc::UnboundedSender<u64>,
    tick_period: Duration,
    event_tx: mpsc::Sender<SessionEvent>,
    shared: Arc<SharedState>,
}

impl Session {
    /// Turn a local command into the outbound message, after the turn gate.
    fn outbound_for(
        &mut self,
        cmd: Command,
    ) -> std::result::Result<ClientMessage, UserInputError> {
        match cmd {
            Command::RequestRooms => Ok(ClientMessage::GetOpenRooms),
            Command::CreateRoom => {
                turn_gate::check_can_enter_room(&self.state)?;
                Ok(ClientMessage::CreateRoom)
            }
            Command::JoinRoom(room_id) => {
                turn_gate::check_can_enter_room(&self.state)?;
                Ok(self.directory.select(room_id))
            }
            Command::JoinRoomInput(input) => {
                turn_gate::check_can_enter_room(&self.state)?;
                let room_id = parse_room_input(&input)?;
                Ok(self.directory.select(room_id))
            }
            Command::LeaveRoom => {
                turn_gate::check_can_leave(&self.state)?;
                Ok(ClientMessage::LeaveRoom)
            }
            Command::Move(cell) => turn_gate::attempt_move(&self.state, cell),
        }
    }

    /// Handle a local command. Returns the message to send, if any.
    async fn handle_command(&mut self, cmd: Command) -> Option<ClientMessage> {
        let picked_room = matches!(cmd, Command::JoinRoom(_) | Command::JoinRoomInput(_));
        match self.outbound_for(cmd) {
            Ok(msg) => {
                if picked_room {
                    self.publish_view().await;
                }
                Some(msg)
            }
            Err(rejection) => {
                debug!("local command rejected: {rejection}");
                self.state.input_rejected(&rejection);
                emit_event(&self.event_tx, SessionEvent::InputRejected(rejection)).await;
                self.publish_view().await;
                None
            }
        }
    }

    /// Decode and dispatch one inbound text frame.
    async fn handle_incoming(&mut self, text: &str) {
        let message = match codec::decode(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("discarding server message ({e}): {text}");
                return;
            }
        };
        let outcome = dispatch(&mut self.state, &mut self.directory, message);
        if outcome.is_applied() {
            self.follow(outcome.timer());
            self.publish_view().await;
        }
    }

    async fn handle_tick(&mut self, generation: u64) {
        match self.state.tick(generation) {
            TickOutcome::Stale => {
                debug!(generation, "discarding stale countdown tick");
            }
            TickOutcome::Counting(_) => self.publish_view().await,
            TickOutcome::Expired => {
                self.timer.cancel();
                self.publish_view().await;
            }
        }
    }

    async fn handle_closed(&mut self, close_code: Option<CloseCode>, reason: Option<String>) {
        let directive = self.state.connection_closed(close_code);
        self.follow(directive);
        self.directory = RoomDirectory::new();
        self.publish_view().await;
        emit_disconnected(&self.event_tx, &self.shared, reason, close_code).await;
    }

    fn follow(&mut self, directive: TimerDirective) {
        match directive {
            TimerDirective::Keep => {}
            TimerDirective::Start {
                initial,
                generation,
            } => {
                self.timer
                    .start(initial, generation, self.tick_period, self.tick_tx.clone());
            }
            TimerDirective::Cancel => self.timer.cancel(),
        }
    }

    async fn publish_view(&self) {
        let view = ViewModel::project(&self.state, &self.directory);
        *self.shared.view.lock().await = view.clone();
        emit_event(&self.event_tx, SessionEvent::ViewChanged(Box::new(view))).await;
    }
}

/// Serialize and send one outbound message.
async fn send_message(transport: &mut impl Transport, msg: &ClientMessage) -> Result<()> {
    let json = codec::encode(msg)?;
    debug!("sending client message: {json}");
    transport.send(json).await
}

/// Background loop that multiplexes commands, ticks and inbound messages via
/// `tokio::select!`.
///
/// Exits when:
/// - The command channel closes (client handle dropped)
/// - The shutdown signal fires
/// - The transport returns `None` (server closed the connection)
/// - A transport error occurs
async fn session_loop(
    mut transport: impl Transport,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    event_tx: mpsc::Sender<SessionEvent>,
    shared: Arc<SharedState>,
    mut shutdown_rx: tokio::sync::oneshot::Receiver<()>,
    config: SessionConfig,
) {
    debug!("session loop started");

    let (tick_tx, mut tick_rx) = mpsc::unbounded_channel::<u64>();
    let mut session = Session {
        state: SessionState::new(config.session_options()),
        directory: RoomDirectory::new(),
        timer: CountdownTimer::new(),
        tick_tx,
        tick_period: config.tick_period,
        event_tx: event_tx.clone(),
        shared,
    };

    emit_event(&event_tx, SessionEvent::Connected).await;
    if let Err(violation) = session.state.connection_opened() {
        warn!("unexpected session state at start: {violation}");
    }
    session.publish_view().await;

    loop {
        tokio::select! {
            // Branch 1: local command from the client handle
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(cmd) => {
                        if let Some(msg) = session.handle_command(cmd).await {
                            if let Err(e) = send_message(&mut transport, &msg).await {
                                error!("transport send error: {e}");
                                session
                                    .handle_closed(None, Some(format!("transport send error: {e}")))
                                    .await;
                                break;
                            }
                        }
                    }
                    // Command channel closed: the client handle was dropped.
                    None => {
                        debug!("command channel closed, shutting down session loop");
                        let _ = transport.close().await;
                        session.handle_closed(None, Some("client shut down".into())).await;
                        break;
                    }
                }
            }

            // Branch 2: shutdown signal
            _ = &mut shutdown_rx => {
                debug!("shutdown signal received");
                let _ = transport.close().await;
                session.handle_closed(None, Some("client shut down".into())).await;
                break;
            }

            // Branch 3: countdown tick
            Some(generation) = tick_rx.recv() => {
                session.handle_tick(generation).await;
            }

            // Branch 4: incoming message from the server
            incoming = transport.recv() => {
                match incoming {
                    Some(Ok(text)) => session.handle_incoming(&text).await,
                    Some(Err(e)) => {
                        error!("transport receive error: {e}");
                        session
                            .handle_closed(None, Some(format!("transport receive error: {e}")))
                            .await;
                        break;
                    }
                    None => {
                        let close_code = transport.close_code();
                        debug!(?close_code, "transport closed by server");
                        session.handle_closed(close_code, None).await;
                        break;
                    }
                }
            }
        }
    }

    session.timer.cancel();
    debug!("session loop exited");
}

/// Emit an event to the event channel. If the channel is full, log a warning
/// and drop the event to avoid blocking the session loop.
async fn emit_event(event_tx: &mpsc::Sender<SessionEvent>, event: SessionEvent) {
    match event_tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(dropped)) => {
            warn!(
                "event channel full, dropping event: {:?}",
                std::mem::discriminant(&dropped)
            );
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!("event channel closed, receiver dropped");
        }
    }
}

/// Emit a [`Disconnected`](SessionEvent::Disconnected) event and update the
/// shared flag.
///
/// Uses `send().await` instead of `try_send` because `Disconnected` is always
/// the last event on the channel and must never be dropped.
async fn emit_disconnected(
    event_tx: &mpsc::Sender<SessionEvent>,
    shared: &SharedState,
    reason: Option<String>,
    close_code: Option<CloseCode>,
) {
    shared.connected.store(false, Ordering::Release);
    let event = SessionEvent::Disconnected { reason, close_code };
    if event_tx.send(event).await.is_err() {
        debug!("event channel closed, receiver dropped");
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
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
    use crate::protocol::{ServerMessage, Sign};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    // ── Mock transport ──────────────────────────────────────────────

    /// A mock transport that records sent messages and replays scripted
    /// responses.
    struct MockTransport {
        /// Messages that `recv()` will yield in order.
        incoming: VecDeque<Option<std::result::Result<String, SessionError>>>,
        /// Recorded outgoing messages.
        sent: Arc<StdMutex<Vec<String>>>,
        /// Whether `close()` was called.
        closed: Arc<AtomicBool>,
        /// Close code reported after a scripted `None`.
        close_code: Option<CloseCode>,
    }

    impl MockTransport {
        fn new(
            incoming: Vec<Option<std::result::Result<String, SessionError>>>,
        ) -> (Self, Arc<StdMutex<Vec<String>>>, Arc<AtomicBool>) {
            let sent = Arc::new(StdMutex::new(Vec::new()));
            let closed = Arc::new(AtomicBool::new(false));
            let transport = Self {
                incoming: VecDeque::from(incoming),
                sent: Arc::clone(&sent),
                closed: Arc::clone(&closed),
                close_code: None,
            };
            (transport, sent, closed)
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&mut self, message: String) -> std::result::Result<(), SessionError> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }

        async fn recv(&mut self) -> Option<std::result::Result<String, SessionError>> {
            if let Some(item) = self.incoming.pop_front() {
                item
            } else {
                // Script exhausted; hang until shutdown.
                std::future::pending().await
            }
        }

        async fn close(&mut self) -> std::result::Result<(), SessionError> {
            self.closed.store(true, Ordering::Relaxed);
            Ok(())
        }

        fn close_code(&self) -> Option<CloseCode> {
            self.close_code
        }
    }

    fn json(msg: &ServerMessage) -> Option<std::result::Result<String, SessionError>> {
        Some(Ok(serde_json::to_string(msg).unwrap()))
    }

    fn sent_messages(sent: &Arc<StdMutex<Vec<String>>>) -> Vec<ClientMessage> {
        sent.lock()
            .unwrap()
            .iter()
            .map(|text| serde_json::from_str(text).unwrap())
            .collect()
    }

    async fn next_view(events: &mut mpsc::Receiver<SessionEvent>) -> ViewModel {
        loop {
            match events.recv().await.expect("event channel closed") {
                SessionEvent::ViewChanged(view) => return *view,
                _ => continue,
            }
        }
    }

    // ── Tests ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn start_requests_open_rooms() {
        let (transport, sent, _closed) = MockTransport::new(vec![]);
        let (mut client, mut events) = SessionClient::start(transport, SessionConfig::new());

        assert!(matches!(
            events.recv().await.unwrap(),
            SessionEvent::Connected
        ));
        let view = next_view(&mut events).await;
        assert_eq!(view.phase, Phase::AwaitingRooms);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(sent_messages(&sent), vec![ClientMessage::GetOpenRooms]);

        client.shutdown().await;
    }

    #[tokio::test]
    async fn room_request_can_be_disabled() {
        let (transport, sent, _closed) = MockTransport::new(vec![]);
        let config = SessionConfig::new().with_request_rooms_on_connect(false);
        let (mut client, mut events) = SessionClient::start(transport, config);
        let _ = next_view(&mut events).await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(sent_messages(&sent).is_empty());

        client.shutdown().await;
    }

    #[tokio::test]
    async fn rooms_update_reaches_the_view() {
        let (transport, _sent, _closed) =
            MockTransport::new(vec![json(&ServerMessage::UpdateOpenRooms {
                open_rooms: vec![5, 7],
            })]);
        let (mut client, mut events) = SessionClient::start(transport, SessionConfig::new());

        let _ = next_view(&mut events).await; // AwaitingRooms
        let view = next_view(&mut events).await;
        assert_eq!(view.phase, Phase::RoomIdle);
        let ids: Vec<_> = view.open_rooms.iter().map(|r| r.room_id).collect();
        assert_eq!(ids, vec![5, 7]);
        assert_eq!(client.view().await, view);

        client.shutdown().await;
    }

    #[tokio::test]
    async fn invalid_room_input_is_rejected_locally() {
        let (transport, sent, _closed) = MockTransport::new(vec![]);
        let config = SessionConfig::new().with_request_rooms_on_connect(false);
        let (mut client, mut events) = SessionClient::start(transport, config);
        let _ = next_view(&mut events).await;

        client.join_room_input("-4").unwrap();
        let event = events.recv().await.unwrap();
        assert_eq!(
            event,
            SessionEvent::InputRejected(UserInputError::InvalidRoomId {
                input: "-4".into()
            })
        );
        let view = next_view(&mut events).await;
        assert_eq!(view.info_message.as_deref(), Some("Wrong room id!"));
        assert!(sent_messages(&sent).is_empty());

        client.shutdown().await;
    }

    #[tokio::test]
    async fn join_room_records_the_selection() {
        let (transport, sent, _closed) = MockTransport::new(vec![]);
        let config = SessionConfig::new().with_request_rooms_on_connect(false);
        let (mut client, mut events) = SessionClient::start(transport, config);
        let _ = next_view(&mut events).await;

        client.join_room_input(" 12 ").unwrap();
        let view = next_view(&mut events).await;
        assert_eq!(view.room_input, Some(12));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(
            sent_messages(&sent),
            vec![ClientMessage::JoinRoom { room_id: 12 }]
        );

        client.shutdown().await;
    }

    #[tokio::test]
    async fn unknown_and_malformed_messages_are_discarded() {
        let (transport, _sent, _closed) = MockTransport::new(vec![
            Some(Ok(r#"{"type":"teleport"}"#.into())),
            Some(Ok("{oops".into())),
            json(&ServerMessage::CreateRoom {
                room_id: 3,
                sign: Sign::X,
            }),
        ]);
        let (mut client, mut events) = SessionClient::start(transport, SessionConfig::new());

        let _ = next_view(&mut events).await; // AwaitingRooms
        let view = next_view(&mut events).await;
        assert_eq!(view.phase, Phase::RoomWaiting);
        assert!(client.is_connected());

        client.shutdown().await;
    }

    #[tokio::test]
    async fn ignored_messages_emit_no_view() {
        let (transport, _sent, _closed) = MockTransport::new(vec![
            json(&ServerMessage::Draw),
            json(&ServerMessage::CreateRoom {
                room_id: 3,
                sign: Sign::O,
            }),
        ]);
        let (mut client, mut events) = SessionClient::start(transport, SessionConfig::new());

        let _ = next_view(&mut events).await; // AwaitingRooms
        let view = next_view(&mut events).await;
        assert_eq!(view.phase, Phase::RoomWaiting);
        assert_eq!(view.sign, Some(Sign::O));

        client.shutdown().await;
    }

    #[tokio::test]
    async fn close_code_4000_reports_game_in_progress() {
        let (mut transport, _sent, _closed) = MockTransport::new(vec![None]);
        transport.close_code = Some(CloseCode::GameInProgress);
        let (mut client, mut events) = SessionClient::start(transport, SessionConfig::new());

        let mut last_view = None;
        let disconnected = loop {
            match events.recv().await.unwrap() {
                SessionEvent::ViewChanged(view) => last_view = Some(*view),
                event @ SessionEvent::Disconnected { .. } => break event,
                _ => {}
            }
        };
        assert_eq!(
            disconnected,
            SessionEvent::Disconnected {
                reason: None,
                close_code: Some(CloseCode::GameInProgress)
            }
        );
        let view = last_view.unwrap();
        assert_eq!(view.phase, Phase::Disconnected);
        assert_eq!(view.info_message.as_deref(), Some("Game is already started."));
        assert!(!client.is_connected());

        client.shutdown().await;
    }

    #[tokio::test]
    async fn not_connected_error_after_shutdown() {
        let (transport, _sent, closed) = MockTransport::new(vec![]);
        let (mut client, mut events) = SessionClient::start(transport, SessionConfig::new());
        let _ = events.recv().await; // Connected

        client.shutdown().await;
        assert!(closed.load(Ordering::Relaxed));
        assert!(matches!(
            client.create_room(),
            Err(SessionError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn config_defaults() {
        let config = SessionConfig::new();
        assert_eq!(config.event_channel_capacity, 256);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
        assert_eq!(config.countdown_start, 3);
        assert_eq!(config.tick_period, Duration::from_secs(1));
        assert_eq!(config.flavor, SessionFlavor::Rounds { max_rounds: 6 });
        assert!(!config.alternate_turns);
        assert!(config.request_rooms_on_connect);
    }

    #[tokio::test]
    async fn config_builders_clamp() {
        let config = SessionConfig::new()
            .with_event_channel_capacity(0)
            .with_countdown_start(0)
            .with_tick_period(Duration::ZERO);
        assert_eq!(config.event_channel_capacity, 1);
        assert_eq!(config.countdown_start, 1);
        assert_eq!(config.tick_period, MIN_TICK_PERIOD);
    }

    #[tokio::test]
    async fn zero_event_channel_capacity_does_not_panic() {
        let (transport, _sent, _closed) = MockTransport::new(vec![]);
        let mut config = SessionConfig::new().with_shutdown_timeout(Duration::from_millis(50));
        config.event_channel_capacity = 0;
        let (mut client, mut events) = SessionClient::start(transport, config);

        let event = events.recv().await.unwrap();
        assert!(matches!(event, SessionEvent::Connected));

        client.shutdown().await;
    }

    #[tokio::test]
    async fn small_event_channel_capacity_drops_views_but_not_disconnect() {
        let mut incoming = Vec::new();
        for id in 0..20 {
            incoming.push(json(&ServerMessage::UpdateOpenRooms {
                open_rooms: vec![id],
            }));
        }
        incoming.push(None);
        let (transport, _sent, _closed) = MockTransport::new(incoming);

        let config = SessionConfig::new().with_event_channel_capacity(1);
        let (mut client, mut events) = SessionClient::start(transport, config);

        // Let the channel fill up and views get dropped.
        tokio::time::sleep(Duration::from_millis(100)).await;

        let mut count = 0;
        let mut last = None;
        while let Some(event) = events.recv().await {
            count += 1;
            last = Some(event);
        }
        // Connected fits the single slot; Disconnected is always delivered.
        assert!(count >= 2, "expected at least 2 events, got {count}");
        assert!(count < 23, "expected dropped views, but got all {count}");
        assert!(matches!(last, Some(SessionEvent::Disconnected { .. })));

        // The mirror still holds the latest view.
        assert_eq!(client.view().await.phase, Phase::Disconnected);

        client.shutdown().await;
    }

    /// Transport that hangs forever in `close()` so shutdown timeout/abort can be tested.
    struct HangingCloseTransport {
        close_called: Arc<AtomicBool>,
        dropped: Arc<AtomicBool>,
    }

    impl Drop for HangingCloseTransport {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::Release);
        }
    }

    #[async_trait]
    impl Transport for HangingCloseTransport {
        async fn send(&mut self, _message: String) -> std::result::Result<(), SessionError> {
            Ok(())
        }

        async fn recv(&mut self) -> Option<std::result::Result<String, SessionError>> {
            std::future::pending().await
        }

        async fn close(&mut self) -> std::result::Result<(), SessionError> {
            self.close_called.store(true, Ordering::Release);
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn shutdown_timeout_aborts_stuck_session_loop() {
        let close_called = Arc::new(AtomicBool::new(false));
        let dropped = Arc::new(AtomicBool::new(false));
        let transport = HangingCloseTransport {
            close_called: Arc::clone(&close_called),
            dropped: Arc::clone(&dropped),
        };
        let config = SessionConfig::new().with_shutdown_timeout(Duration::from_millis(20));
        let (mut client, mut events) = SessionClient::start(transport, config);

        let event = events.recv().await.unwrap();
        assert!(matches!(event, SessionEvent::Connected));

        client.shutdown().await;

        assert!(close_called.load(Ordering::Acquire));
        assert!(
            dropped.load(Ordering::Acquire),
            "timed-out shutdown should abort and drop the session loop"
        );
        assert!(!client.is_connected());
    }
}
