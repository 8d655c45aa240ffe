//! Client side of a networked match.
//!
//! The session keeps a shadow copy of the server's game, refreshed by every
//! GAME_STATE frame. Moves are checked against the shadow before they are
//! sent; the server has the final word.

use crate::core::PlayerId;
use crate::error::SessionError;
use crate::game::Game;
use crate::network::lock;
use crate::network::protocol::{FrameBuffer, MessageType, NetworkMessage};
use crate::network::transport::{
    connect_with_timeout, Connection, ReadOutcome, BUFFER_SIZE, DEFAULT_TIMEOUT_SECONDS,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const RECEIVE_POLL_INTERVAL: Duration = Duration::from_millis(50);
const DEFAULT_PLAYER_NAME: &str = "Player";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Disconnected,
    Connecting,
    Connected,
    InGame,
    Error,
}

struct Shared {
    running: AtomicBool,
    state: Mutex<ClientState>,
    role: Mutex<Option<PlayerId>>,
    game: Mutex<Game>,
    status: Mutex<String>,
    last_error: Mutex<String>,
    pongs: AtomicU64,
}

impl Shared {
    fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            state: Mutex::new(ClientState::Disconnected),
            role: Mutex::new(None),
            game: Mutex::new(Game::new()),
            status: Mutex::new("Not connected".to_string()),
            last_error: Mutex::new(String::new()),
            pongs: AtomicU64::new(0),
        }
    }

    fn state(&self) -> ClientState {
        *lock(&self.state)
    }

    fn set_state(&self, state: ClientState) {
        let mut current = lock(&self.state);
        if *current != state {
            tracing::info!(from = ?*current, to = ?state, "client state");
            *current = state;
        }
    }

    fn set_status(&self, msg: impl Into<String>) {
        *lock(&self.status) = msg.into();
    }

    fn fail(&self, error: String, status: impl Into<String>) {
        tracing::warn!("{}", error);
        *lock(&self.last_error) = error;
        self.set_status(status);
        self.set_state(ClientState::Error);
    }
}

pub struct ClientSession {
    player_name: String,
    timeout: Duration,
    shared: Arc<Shared>,
    conn: Option<Arc<Connection>>,
    receiver: Option<JoinHandle<()>>,
}

impl Default for ClientSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientSession {
    pub fn new() -> Self {
        Self {
            player_name: DEFAULT_PLAYER_NAME.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            shared: Arc::new(Shared::new()),
            conn: None,
            receiver: None,
        }
    }

    /// Display name sent in the CONNECT handshake.
    pub fn with_name(mut self, name: &str) -> Self {
        self.player_name = name.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Opens the connection, sends CONNECT and starts the receive loop.
    /// The role arrives later with ACCEPT; until then the state is
    /// `Connected`.
    pub fn connect(&mut self, host: &str, port: u16) -> Result<(), SessionError> {
        if self.shared.state() != ClientState::Disconnected {
            return Err(SessionError::AlreadyConnected);
        }
        self.shared.set_state(ClientState::Connecting);
        self.shared.set_status(format!("Connecting to {}:{}", host, port));
        *lock(&self.shared.role) = None;
        *lock(&self.shared.game) = Game::new();
        lock(&self.shared.last_error).clear();

        let conn = match connect_with_timeout(host, port, self.timeout) {
            Ok(conn) => Arc::new(conn),
            Err(e) => {
                self.shared
                    .fail(format!("Failed to connect: {}", e), "Connection failed");
                return Err(e.into());
            }
        };
        if let Err(e) = conn.send(&NetworkMessage::connect(&self.player_name)) {
            conn.shutdown();
            self.shared
                .fail(format!("Handshake failed: {}", e), "Connection failed");
            return Err(e.into());
        }

        self.shared.set_state(ClientState::Connected);
        self.shared.set_status("Connected, waiting for the server");
        self.shared.running.store(true, Ordering::SeqCst);

        let shared = Arc::clone(&self.shared);
        let reader = Arc::clone(&conn);
        self.receiver = Some(thread::spawn(move || receive_loop(shared, reader)));
        self.conn = Some(conn);
        Ok(())
    }

    /// Says goodbye if the link is still up, stops the receive loop and
    /// returns to `Disconnected`.
    pub fn disconnect(&mut self) {
        if let Some(conn) = &self.conn {
            if matches!(
                self.shared.state(),
                ClientState::Connected | ClientState::InGame
            ) {
                let _ = conn.send(&NetworkMessage::disconnect());
            }
        }
        self.shared.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.receiver.take() {
            if handle.join().is_err() {
                tracing::warn!("receive thread panicked");
            }
        }
        if let Some(conn) = self.conn.take() {
            conn.shutdown();
            tracing::info!("disconnected");
        }
        *lock(&self.shared.role) = None;
        self.shared.set_status("Disconnected");
        self.shared.set_state(ClientState::Disconnected);
    }

    pub fn state(&self) -> ClientState {
        self.shared.state()
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state(), ClientState::Connected | ClientState::InGame)
    }

    pub fn player_role(&self) -> Option<PlayerId> {
        *lock(&self.shared.role)
    }

    /// Copy of the shadow game.
    pub fn game(&self) -> Game {
        lock(&self.shared.game).clone()
    }

    pub fn status_message(&self) -> String {
        lock(&self.shared.status).clone()
    }

    pub fn last_error(&self) -> String {
        lock(&self.shared.last_error).clone()
    }

    /// PONG frames received so far.
    pub fn pong_count(&self) -> u64 {
        self.shared.pongs.load(Ordering::SeqCst)
    }

    pub fn send_move(&self, column: i32) -> Result<(), SessionError> {
        if self.state() != ClientState::InGame {
            return Err(SessionError::NotInGame);
        }
        let role = self.player_role().ok_or(SessionError::NotInGame)?;
        self.game().check_move(column, role)?;
        self.send(&NetworkMessage::make_move(column))
    }

    pub fn request_reset(&self) -> Result<(), SessionError> {
        self.send(&NetworkMessage::reset())
    }

    pub fn send_ping(&self) -> Result<(), SessionError> {
        self.send(&NetworkMessage::ping())
    }

    fn send(&self, msg: &NetworkMessage) -> Result<(), SessionError> {
        if !self.is_connected() {
            return Err(SessionError::NotConnected);
        }
        let conn = self.conn.as_ref().ok_or(SessionError::NotConnected)?;
        conn.send(msg)?;
        Ok(())
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn receive_loop(shared: Arc<Shared>, conn: Arc<Connection>) {
    let mut frames = FrameBuffer::new();
    let mut buf = [0u8; BUFFER_SIZE];

    while shared.running.load(Ordering::SeqCst) {
        let mut lost = None;
        loop {
            match conn.read_nonblocking(&mut buf) {
                Ok(ReadOutcome::Data(n)) => frames.push(&buf[..n]),
                Ok(ReadOutcome::WouldBlock) => break,
                Ok(ReadOutcome::Closed) => {
                    lost = Some("Server closed the connection".to_string());
                    break;
                }
                Err(e) => {
                    lost = Some(format!("Connection error: {}", e));
                    break;
                }
            }
        }

        // 切断前に届いたフレームを先に処理する (REJECT など)
        for msg in frames.extract_messages() {
            dispatch(&shared, msg);
        }

        if let Some(reason) = lost {
            shared.running.store(false, Ordering::SeqCst);
            if shared.state() != ClientState::Error {
                shared.fail(reason, "Server disconnected");
            }
            break;
        }
        thread::sleep(RECEIVE_POLL_INTERVAL);
    }
}

fn turn_status(game: &Game, role: Option<PlayerId>) -> &'static str {
    if game.is_game_over() {
        "Game Over"
    } else if role == Some(game.current_player()) {
        "Your turn"
    } else {
        "Opponent's turn"
    }
}

fn dispatch(shared: &Shared, msg: NetworkMessage) {
    tracing::debug!(kind = msg.kind.as_str(), payload = %msg.payload, "recv");
    let role = *lock(&shared.role);

    match msg.kind {
        MessageType::Accept => match msg.parse_role() {
            Some(assigned) => {
                *lock(&shared.role) = Some(assigned);
                shared.set_state(ClientState::InGame);
                shared.set_status(format!("Joined as {}", assigned));
            }
            None => tracing::warn!(payload = %msg.payload, "ACCEPT without a valid role"),
        },
        MessageType::Reject => {
            let reason = if msg.payload.is_empty() {
                "Connection rejected".to_string()
            } else {
                msg.payload.clone()
            };
            shared.fail(reason.clone(), format!("Rejected: {}", reason));
        }
        MessageType::GameState => {
            let applied = msg.parse_game_state().and_then(|state| {
                let current = PlayerId::from_symbol(state.current_player)
                    .ok_or(crate::error::SnapshotError::Payload)?;
                let mut game = lock(&shared.game);
                game.apply_remote_state(&state.board, current, state.status)?;
                Ok(turn_status(&game, role))
            });
            match applied {
                Ok(status) => shared.set_status(status),
                Err(e) => tracing::warn!("ignoring GAME_STATE: {}", e),
            }
        }
        MessageType::Turn => {
            if let Some(player) = msg.parse_role() {
                let status = if role == Some(player) {
                    "Your turn"
                } else {
                    "Opponent's turn"
                };
                shared.set_status(status);
            }
        }
        MessageType::Win => {
            let status = if role.is_some() && msg.parse_role() == role {
                "You win!"
            } else {
                "You lose!"
            };
            shared.set_status(status);
        }
        MessageType::Draw => shared.set_status("Game ended in a draw!"),
        MessageType::Pong => {
            shared.pongs.fetch_add(1, Ordering::SeqCst);
        }
        MessageType::Disconnect => shared.set_status("Opponent disconnected"),
        _ => {}
    }
}
