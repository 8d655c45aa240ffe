//! Authoritative two-player game server.
//!
//! Threads: an accept loop that seats two peers (and turns away anyone
//! else), and once both seats are taken a game loop that owns the `Game`.
//! Nothing else mutates the game: host-side commands travel to the game
//! loop over a channel, and readers get a copy published after every change.

use crate::core::PlayerId;
use crate::display::board_to_text;
use crate::error::SessionError;
use crate::game::Game;
use crate::network::lock;
use crate::network::protocol::{FrameBuffer, MessageType, NetworkMessage};
use crate::network::transport::{
    local_ip_address, Connection, Listener, ReadOutcome, BUFFER_SIZE,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);
const GAME_POLL_INTERVAL: Duration = Duration::from_millis(50);
const MAX_PLAYERS: usize = 2;
/// How long a turned-away connection is kept open for the peer to read REJECT.
const REJECT_LINGER: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Idle,
    WaitingForPlayers,
    GameInProgress,
    Error,
}

/// Requests from the hosting process, applied by the game loop.
#[derive(Debug, Clone, Copy)]
enum HostCommand {
    Move { column: i32, role: PlayerId },
    Reset,
}

struct Shared {
    running: AtomicBool,
    state: Mutex<ServerState>,
    /// 着席順: index 0 が X, 1 が O
    peers: Mutex<Vec<Arc<Connection>>>,
    /// Read-only copy of the authoritative game.
    game: Mutex<Game>,
    status: Mutex<String>,
    last_error: Mutex<String>,
}

impl Shared {
    fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            state: Mutex::new(ServerState::Idle),
            peers: Mutex::new(Vec::new()),
            game: Mutex::new(Game::new()),
            status: Mutex::new("Server idle".to_string()),
            last_error: Mutex::new(String::new()),
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn set_state(&self, state: ServerState) {
        let mut current = lock(&self.state);
        if *current != state {
            tracing::info!(from = ?*current, to = ?state, "server state");
            *current = state;
        }
    }

    fn set_status(&self, msg: impl Into<String>) {
        *lock(&self.status) = msg.into();
    }

    fn fail(&self, reason: String) {
        tracing::warn!("{}", reason);
        self.set_status(reason.clone());
        *lock(&self.last_error) = reason;
        self.set_state(ServerState::Error);
    }
}

pub struct ServerSession {
    shared: Arc<Shared>,
    port: u16,
    ip_address: String,
    commands: Option<Sender<HostCommand>>,
    accept_thread: Option<JoinHandle<()>>,
}

impl Default for ServerSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerSession {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared::new()),
            port: 0,
            ip_address: String::new(),
            commands: None,
            accept_thread: None,
        }
    }

    /// Binds `0.0.0.0:port` and starts accepting players. Port 0 picks a
    /// free port; read it back with [`ServerSession::port`].
    pub fn start(&mut self, port: u16) -> Result<(), SessionError> {
        if self.accept_thread.is_some() {
            return Err(SessionError::AlreadyRunning);
        }

        let listener = match Listener::bind(port) {
            Ok(listener) => listener,
            Err(e) => {
                self.shared.fail(format!("Failed to start server: {}", e));
                return Err(e.into());
            }
        };
        self.port = listener.port();
        self.ip_address = local_ip_address();

        // 失敗した start の後は一度 Idle に戻してから待機へ
        if self.state() == ServerState::Error {
            self.shared.set_state(ServerState::Idle);
        }

        lock(&self.shared.peers).clear();
        lock(&self.shared.last_error).clear();
        *lock(&self.shared.game) = Game::new();
        self.shared.running.store(true, Ordering::SeqCst);
        self.shared.set_state(ServerState::WaitingForPlayers);
        self.shared
            .set_status(format!("Waiting for players on port {}", self.port));
        tracing::info!(ip = %self.ip_address, port = self.port, "server listening");

        let (tx, rx) = mpsc::channel();
        self.commands = Some(tx);
        let shared = Arc::clone(&self.shared);
        self.accept_thread = Some(thread::spawn(move || accept_loop(shared, listener, rx)));
        Ok(())
    }

    /// Stops every loop, waits for the threads, closes all sockets and
    /// returns to `Idle`. Safe to call in any state.
    pub fn stop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.accept_thread.take() {
            if handle.join().is_err() {
                tracing::warn!("accept thread panicked");
            }
        }
        self.commands = None;

        for peer in lock(&self.shared.peers).drain(..) {
            peer.shutdown();
        }
        if *lock(&self.shared.state) != ServerState::Idle {
            tracing::info!(port = self.port, "server stopped");
            self.shared.set_status("Server stopped");
        }
        self.shared.set_state(ServerState::Idle);
    }

    pub fn state(&self) -> ServerState {
        *lock(&self.shared.state)
    }

    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn ip_address(&self) -> &str {
        &self.ip_address
    }

    pub fn connected_player_count(&self) -> usize {
        lock(&self.shared.peers).len()
    }

    pub fn is_game_started(&self) -> bool {
        self.state() == ServerState::GameInProgress
    }

    /// Copy of the authoritative game as of the last applied change.
    pub fn game(&self) -> Game {
        lock(&self.shared.game).clone()
    }

    pub fn status_message(&self) -> String {
        lock(&self.shared.status).clone()
    }

    pub fn last_error(&self) -> String {
        lock(&self.shared.last_error).clone()
    }

    /// Plays `column` for `role` as if that peer had sent MOVE. Checked
    /// against the latest published game here and again by the game loop.
    pub fn submit_move(&self, column: i32, role: PlayerId) -> Result<(), SessionError> {
        if !self.is_game_started() {
            return Err(SessionError::NotInGame);
        }
        self.game().check_move(column, role)?;
        self.send_command(HostCommand::Move { column, role })
    }

    pub fn request_reset(&self) -> Result<(), SessionError> {
        if !self.is_game_started() {
            return Err(SessionError::NotInGame);
        }
        self.send_command(HostCommand::Reset)
    }

    fn send_command(&self, cmd: HostCommand) -> Result<(), SessionError> {
        self.commands
            .as_ref()
            .ok_or(SessionError::ShuttingDown)?
            .send(cmd)
            .map_err(|_| SessionError::ShuttingDown)
    }
}

impl Drop for ServerSession {
    fn drop(&mut self) {
        self.stop();
    }
}

fn accept_loop(shared: Arc<Shared>, listener: Listener, commands: Receiver<HostCommand>) {
    let mut commands = Some(commands);
    let mut game_thread: Option<JoinHandle<()>> = None;
    let mut turned_away: Vec<(Connection, Instant)> = Vec::new();
    // 着席済みだが対局前のピアの受信バッファ (peers と同じ並び)
    let mut pending: Vec<FrameBuffer> = Vec::new();

    while shared.is_running() {
        if game_thread.is_none() {
            drop_departed_peers(&shared, &mut pending);
        }

        match listener.accept_nonblocking() {
            Ok(Some(conn)) if lock(&shared.peers).len() >= MAX_PLAYERS => {
                tracing::info!(peer = ?conn.peer_addr(), "rejecting connection: server full");
                let _ = conn.send(&NetworkMessage::reject("Server full"));
                conn.shutdown_write();
                turned_away.push((conn, Instant::now()));
            }
            Ok(Some(conn)) => {
                if let Some(seats) = seat_peer(&shared, conn, &mut pending) {
                    if let Some(rx) = commands.take() {
                        let buffers = <[FrameBuffer; 2]>::try_from(std::mem::take(&mut pending))
                            .unwrap_or_default();
                        let shared = Arc::clone(&shared);
                        game_thread = Some(thread::spawn(move || {
                            GameLoop::new(shared, seats, buffers, rx).run();
                        }));
                    }
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("accept failed: {}", e),
        }
        turned_away.retain(|(conn, since)| !finished_lingering(conn, *since));
        thread::sleep(ACCEPT_POLL_INTERVAL);
    }

    if let Some(handle) = game_thread {
        if handle.join().is_err() {
            tracing::warn!("game thread panicked");
        }
    }
}

/// Polls players seated before the match starts. Anyone who hung up, failed
/// or sent DISCONNECT gives up the seat, so the next joiner takes it over.
/// PING is answered; everything else waits in `pending` for the game loop.
fn drop_departed_peers(shared: &Shared, pending: &mut Vec<FrameBuffer>) {
    let mut peers = lock(&shared.peers);
    let mut buf = [0u8; BUFFER_SIZE];
    let mut seat = 0;
    while seat < peers.len() {
        let mut gone = None;
        loop {
            match peers[seat].read_nonblocking(&mut buf) {
                Ok(ReadOutcome::Data(n)) => pending[seat].push(&buf[..n]),
                Ok(ReadOutcome::WouldBlock) => break,
                Ok(ReadOutcome::Closed) => {
                    gone = Some("connection closed".to_string());
                    break;
                }
                Err(e) => {
                    gone = Some(e.to_string());
                    break;
                }
            }
        }

        let mut kept = FrameBuffer::new();
        for msg in pending[seat].extract_messages() {
            match msg.kind {
                MessageType::Ping => {
                    let _ = peers[seat].send(&NetworkMessage::pong());
                }
                MessageType::Disconnect => gone = Some("left the game".to_string()),
                MessageType::Connect => {}
                _ => kept.push(msg.encode().as_bytes()),
            }
        }
        kept.push(pending[seat].pending());
        pending[seat] = kept;

        match gone {
            Some(why) => {
                let peer = peers.remove(seat);
                pending.remove(seat);
                tracing::warn!(peer = ?peer.peer_addr(), "player left before the game started ({})", why);
                peer.shutdown();
                shared.set_status("Player left, waiting for players");
            }
            None => seat += 1,
        }
    }
}

/// Discards whatever a rejected peer sends until it hangs up or the linger
/// time runs out. Closing with unread input would reset the connection and
/// could destroy the REJECT before the peer reads it.
fn finished_lingering(conn: &Connection, since: Instant) -> bool {
    let mut buf = [0u8; BUFFER_SIZE];
    loop {
        match conn.read_nonblocking(&mut buf) {
            Ok(ReadOutcome::Data(_)) => continue,
            Ok(ReadOutcome::WouldBlock) => return since.elapsed() > REJECT_LINGER,
            Ok(ReadOutcome::Closed) | Err(_) => return true,
        }
    }
}

/// Seats a new connection. Returns both seats once the second player is in
/// and the opening GAME_STATE has gone out.
fn seat_peer(
    shared: &Shared,
    conn: Connection,
    pending: &mut Vec<FrameBuffer>,
) -> Option<[Arc<Connection>; 2]> {
    // peers を変更するのはこのスレッドだけなので, 送信中はロックを外してよい
    let role = seat_role(lock(&shared.peers).len());
    if let Err(e) = conn.send(&NetworkMessage::accept(role)) {
        tracing::warn!(peer = ?conn.peer_addr(), "could not accept player: {}", e);
        return None;
    }
    tracing::info!(peer = ?conn.peer_addr(), %role, "player seated");

    let mut peers = lock(&shared.peers);
    peers.push(Arc::new(conn));
    pending.push(FrameBuffer::new());

    if peers.len() < MAX_PLAYERS {
        shared.set_status(format!("Player {} connected, waiting for opponent", role));
        return None;
    }

    let seats = [Arc::clone(&peers[0]), Arc::clone(&peers[1])];
    drop(peers);

    let game = Game::new();
    *lock(&shared.game) = game.clone();
    shared.set_state(ServerState::GameInProgress);
    shared.set_status("Game in progress");
    broadcast(&seats, &state_message(&game));
    Some(seats)
}

fn state_message(game: &Game) -> NetworkMessage {
    NetworkMessage::game_state(
        &game.serialize_game_state(),
        game.current_player(),
        game.status(),
    )
}

fn broadcast(seats: &[Arc<Connection>; 2], msg: &NetworkMessage) {
    for peer in seats {
        if let Err(e) = peer.send(msg) {
            tracing::warn!(peer = ?peer.peer_addr(), "broadcast failed: {}", e);
        }
    }
}

fn seat_role(seat: usize) -> PlayerId {
    if seat == 0 {
        PlayerId::Player1
    } else {
        PlayerId::Player2
    }
}

/// Owner of the authoritative game for one match.
struct GameLoop {
    shared: Arc<Shared>,
    game: Game,
    seats: [Arc<Connection>; 2],
    buffers: [FrameBuffer; 2],
    commands: Receiver<HostCommand>,
}

impl GameLoop {
    fn new(
        shared: Arc<Shared>,
        seats: [Arc<Connection>; 2],
        buffers: [FrameBuffer; 2],
        commands: Receiver<HostCommand>,
    ) -> Self {
        let game = lock(&shared.game).clone();
        Self {
            shared,
            game,
            seats,
            buffers,
            commands,
        }
    }

    fn run(mut self) {
        tracing::info!("game loop started");
        while self.shared.is_running() {
            if let Err(reason) = self.tick() {
                self.shared.fail(reason);
                self.shared.running.store(false, Ordering::SeqCst);
                break;
            }
            thread::sleep(GAME_POLL_INTERVAL);
        }
        tracing::info!("game loop finished");
    }

    /// One pass over the command queue and both sockets. `Err` carries the
    /// reason the match cannot continue.
    fn tick(&mut self) -> Result<(), String> {
        loop {
            match self.commands.try_recv() {
                Ok(HostCommand::Move { column, role }) => self.handle_move(column, role),
                Ok(HostCommand::Reset) => self.handle_reset(),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        for seat in 0..2 {
            let closed = self.drain_socket(seat);
            for msg in self.buffers[seat].extract_messages() {
                self.dispatch(seat, msg)?;
            }
            if let Some(reason) = closed {
                return Err(self.peer_lost(seat, &reason));
            }
        }
        Ok(())
    }

    /// Reads everything available on `seat`. Returns why the peer is gone,
    /// if it is.
    fn drain_socket(&mut self, seat: usize) -> Option<String> {
        let mut buf = [0u8; BUFFER_SIZE];
        loop {
            match self.seats[seat].read_nonblocking(&mut buf) {
                Ok(ReadOutcome::Data(n)) => self.buffers[seat].push(&buf[..n]),
                Ok(ReadOutcome::WouldBlock) => return None,
                Ok(ReadOutcome::Closed) => return Some("connection closed".to_string()),
                Err(e) => return Some(e.to_string()),
            }
        }
    }

    fn dispatch(&mut self, seat: usize, msg: NetworkMessage) -> Result<(), String> {
        let role = seat_role(seat);
        tracing::debug!(%role, kind = msg.kind.as_str(), payload = %msg.payload, "recv");

        match msg.kind {
            MessageType::Move => self.handle_move(msg.parse_move_column(), role),
            MessageType::Reset => self.handle_reset(),
            MessageType::Ping => {
                if let Err(e) = self.seats[seat].send(&NetworkMessage::pong()) {
                    tracing::warn!(%role, "pong failed: {}", e);
                }
            }
            MessageType::Disconnect => return Err(self.peer_lost(seat, "left the game")),
            // CONNECT は着席後に届くので無視
            _ => {}
        }
        Ok(())
    }

    fn handle_move(&mut self, column: i32, role: PlayerId) {
        if let Err(e) = self.game.check_move(column, role) {
            tracing::info!(%role, column, "move refused: {}", e);
            return;
        }
        if !self.game.make_move(column) {
            return;
        }
        self.publish();
        broadcast(&self.seats, &state_message(&self.game));

        if self.game.is_game_over() {
            tracing::debug!("final position\n{}", board_to_text(self.game.board()));
            match self.game.winner() {
                Some(winner) => {
                    tracing::info!(%winner, "game won");
                    self.shared.set_status(format!("Player {} wins!", winner));
                    broadcast(&self.seats, &NetworkMessage::win(winner));
                }
                None => {
                    tracing::info!("game drawn");
                    self.shared.set_status("Game ended in a draw");
                    broadcast(&self.seats, &NetworkMessage::draw());
                }
            }
        }
    }

    fn handle_reset(&mut self) {
        tracing::info!("game reset");
        self.game.reset();
        self.publish();
        self.shared.set_status("Game in progress");
        broadcast(&self.seats, &state_message(&self.game));
    }

    fn publish(&self) {
        *lock(&self.shared.game) = self.game.clone();
    }

    /// Tells the other seat and builds the error text for the session.
    fn peer_lost(&self, seat: usize, why: &str) -> String {
        let survivor = &self.seats[1 - seat];
        if let Err(e) = survivor.send(&NetworkMessage::disconnect()) {
            tracing::warn!("could not notify remaining player: {}", e);
        }
        format!("Player {} disconnected ({})", seat_role(seat), why)
    }
}
