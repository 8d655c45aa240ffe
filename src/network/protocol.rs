//! Line-oriented wire protocol.
//!
//! A frame is `TYPE_NAME[:payload]\n`. The newline is the only delimiter, so
//! a payload may contain `:` but never `\n`. Type names are matched
//! case-sensitively against a closed table; anything else decodes as
//! `MessageType::Invalid` and is dropped by [`FrameBuffer`].

use crate::core::PlayerId;
use crate::game::GameStatus;
use crate::error::SnapshotError;

pub const MESSAGE_DELIMITER: u8 = b'\n';
pub const FIELD_SEPARATOR: char = '|';

/// An undelimited tail longer than this is discarded.
pub const MAX_PENDING_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Connect,
    Accept,
    Reject,
    Move,
    GameState,
    Turn,
    Win,
    Draw,
    Reset,
    Disconnect,
    Ping,
    Pong,
    Invalid,
}

impl MessageType {
    /// Every type that can appear on the wire.
    pub const ALL: [MessageType; 12] = [
        MessageType::Connect,
        MessageType::Accept,
        MessageType::Reject,
        MessageType::Move,
        MessageType::GameState,
        MessageType::Turn,
        MessageType::Win,
        MessageType::Draw,
        MessageType::Reset,
        MessageType::Disconnect,
        MessageType::Ping,
        MessageType::Pong,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::Connect => "CONNECT",
            MessageType::Accept => "ACCEPT",
            MessageType::Reject => "REJECT",
            MessageType::Move => "MOVE",
            MessageType::GameState => "GAME_STATE",
            MessageType::Turn => "TURN",
            MessageType::Win => "WIN",
            MessageType::Draw => "DRAW",
            MessageType::Reset => "RESET",
            MessageType::Disconnect => "DISCONNECT",
            MessageType::Ping => "PING",
            MessageType::Pong => "PONG",
            MessageType::Invalid => "INVALID",
        }
    }

    pub fn from_name(name: &str) -> MessageType {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == name)
            .unwrap_or(MessageType::Invalid)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkMessage {
    pub kind: MessageType,
    pub payload: String,
}

impl Default for NetworkMessage {
    fn default() -> Self {
        NetworkMessage {
            kind: MessageType::Invalid,
            payload: String::new(),
        }
    }
}

/// Board snapshot, side to move and lifecycle flag of a GAME_STATE frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameStatePayload {
    pub board: String,
    pub current_player: char,
    pub status: GameStatus,
}

/// Encodes one frame. An empty payload omits the `:` separator.
pub fn serialize(kind: MessageType, payload: &str) -> String {
    let mut out = String::with_capacity(kind.as_str().len() + payload.len() + 2);
    out.push_str(kind.as_str());
    if !payload.is_empty() {
        out.push(':');
        out.push_str(payload);
    }
    out.push(MESSAGE_DELIMITER as char);
    out
}

/// Decodes one frame, delimiter included. Input without the trailing
/// delimiter yields an `Invalid` message.
pub fn deserialize(raw: &str) -> NetworkMessage {
    let Some(body) = raw.strip_suffix(MESSAGE_DELIMITER as char) else {
        return NetworkMessage::default();
    };
    let (name, payload) = body.split_once(':').unwrap_or((body, ""));
    NetworkMessage {
        kind: MessageType::from_name(name),
        payload: payload.to_string(),
    }
}

pub fn is_valid_message(raw: &str) -> bool {
    deserialize(raw).kind != MessageType::Invalid
}

impl NetworkMessage {
    pub fn new(kind: MessageType, payload: impl Into<String>) -> Self {
        NetworkMessage {
            kind,
            payload: payload.into(),
        }
    }

    pub fn encode(&self) -> String {
        serialize(self.kind, &self.payload)
    }

    pub fn connect(player_name: &str) -> Self {
        Self::new(MessageType::Connect, player_name)
    }

    pub fn accept(role: PlayerId) -> Self {
        Self::new(MessageType::Accept, role.symbol().to_string())
    }

    pub fn reject(reason: &str) -> Self {
        Self::new(MessageType::Reject, reason)
    }

    pub fn make_move(column: i32) -> Self {
        Self::new(MessageType::Move, column.to_string())
    }

    pub fn game_state(board: &str, current_player: PlayerId, status: GameStatus) -> Self {
        let payload = format!(
            "{board}{sep}{player}{sep}{status}",
            sep = FIELD_SEPARATOR,
            player = current_player.symbol(),
            status = status.as_str(),
        );
        Self::new(MessageType::GameState, payload)
    }

    pub fn turn(player: PlayerId) -> Self {
        Self::new(MessageType::Turn, player.symbol().to_string())
    }

    pub fn win(winner: PlayerId) -> Self {
        Self::new(MessageType::Win, winner.symbol().to_string())
    }

    pub fn draw() -> Self {
        Self::new(MessageType::Draw, "")
    }

    pub fn reset() -> Self {
        Self::new(MessageType::Reset, "")
    }

    pub fn disconnect() -> Self {
        Self::new(MessageType::Disconnect, "")
    }

    pub fn ping() -> Self {
        Self::new(MessageType::Ping, "")
    }

    pub fn pong() -> Self {
        Self::new(MessageType::Pong, "")
    }

    /// First payload character (ACCEPT / TURN / WIN).
    pub fn payload_char(&self) -> Option<char> {
        self.payload.chars().next()
    }

    pub fn parse_role(&self) -> Option<PlayerId> {
        self.payload_char().and_then(PlayerId::from_symbol)
    }

    /// MOVE column, or -1 when the payload is not a decimal integer.
    pub fn parse_move_column(&self) -> i32 {
        self.payload.trim().parse::<i32>().unwrap_or(-1)
    }

    pub fn parse_game_state(&self) -> Result<GameStatePayload, SnapshotError> {
        let mut parts = self.payload.split(FIELD_SEPARATOR);
        let (Some(board), Some(player), Some(status), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(SnapshotError::Payload);
        };
        let current_player = player.chars().next().ok_or(SnapshotError::Payload)?;
        let status = GameStatus::parse(status).ok_or(SnapshotError::Payload)?;
        Ok(GameStatePayload {
            board: board.to_string(),
            current_player,
            status,
        })
    }
}

/// Per-connection receive buffer that turns a byte stream into frames.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    pending: Vec<u8>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Bytes received after the last delimiter.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Drains every complete frame. Frames that do not decode are consumed
    /// and dropped; the partial tail stays for the next read.
    pub fn extract_messages(&mut self) -> Vec<NetworkMessage> {
        let mut messages = Vec::new();

        while let Some(pos) = self.pending.iter().position(|&b| b == MESSAGE_DELIMITER) {
            let frame: Vec<u8> = self.pending.drain(..=pos).collect();
            match std::str::from_utf8(&frame).map(deserialize) {
                Ok(msg) if msg.kind != MessageType::Invalid => messages.push(msg),
                _ => tracing::debug!(
                    frame = %String::from_utf8_lossy(&frame).trim_end(),
                    "dropping malformed frame"
                ),
            }
        }

        if self.pending.len() > MAX_PENDING_BYTES {
            tracing::warn!(
                bytes = self.pending.len(),
                "discarding oversized partial frame"
            );
            self.pending.clear();
        }

        messages
    }
}

/// Convenience for callers holding a raw byte buffer.
pub fn extract_messages(buffer: &mut Vec<u8>) -> Vec<NetworkMessage> {
    let mut frames = FrameBuffer {
        pending: std::mem::take(buffer),
    };
    let messages = frames.extract_messages();
    *buffer = frames.pending;
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_formats() {
        assert_eq!(serialize(MessageType::Move, "3"), "MOVE:3\n");
        assert_eq!(serialize(MessageType::Ping, ""), "PING\n");
        assert_eq!(NetworkMessage::accept(PlayerId::Player2).encode(), "ACCEPT:O\n");
        assert_eq!(NetworkMessage::draw().encode(), "DRAW\n");
    }

    #[test]
    fn every_type_round_trips() {
        for kind in MessageType::ALL {
            for payload in ["", "X", "3", "Player One", "a:b:c"] {
                let msg = deserialize(&serialize(kind, payload));
                assert_eq!(msg, NetworkMessage::new(kind, payload), "{:?}", kind);
            }
        }
    }

    #[test]
    fn payload_splits_on_first_colon_only() {
        let msg = deserialize("REJECT:full: try later\n");
        assert_eq!(msg.kind, MessageType::Reject);
        assert_eq!(msg.payload, "full: try later");
    }

    #[test]
    fn malformed_input_is_invalid() {
        assert_eq!(deserialize("MOVE:3").kind, MessageType::Invalid);
        assert_eq!(deserialize("").kind, MessageType::Invalid);
        assert_eq!(deserialize("HELLO\n").kind, MessageType::Invalid);
        assert_eq!(deserialize("move:3\n").kind, MessageType::Invalid);
        assert_eq!(deserialize("INVALID\n").kind, MessageType::Invalid);
        assert!(!is_valid_message("PING"));
        assert!(is_valid_message("PING\n"));
    }

    #[test]
    fn move_column_parsing() {
        assert_eq!(NetworkMessage::make_move(6).parse_move_column(), 6);
        assert_eq!(deserialize("MOVE:abc\n").parse_move_column(), -1);
        assert_eq!(deserialize("MOVE\n").parse_move_column(), -1);
        assert_eq!(deserialize("MOVE:-4\n").parse_move_column(), -4);
    }

    #[test]
    fn game_state_payload() {
        let board = ".".repeat(42);
        let msg = NetworkMessage::game_state(&board, PlayerId::Player1, GameStatus::Playing);
        assert_eq!(msg.payload, format!("{}|X|PLAYING", board));

        let parsed = deserialize(&msg.encode()).parse_game_state().unwrap();
        assert_eq!(parsed.board, board);
        assert_eq!(parsed.current_player, 'X');
        assert_eq!(parsed.status, GameStatus::Playing);

        assert!(deserialize("GAME_STATE:abc|X\n").parse_game_state().is_err());
        assert!(deserialize("GAME_STATE:a|X|DONE\n").parse_game_state().is_err());
        assert!(deserialize("GAME_STATE:a|X|OVER|extra\n").parse_game_state().is_err());
    }

    #[test]
    fn two_frames_and_a_partial() {
        let mut buf = FrameBuffer::new();
        buf.push(b"MOVE:3\nPING\nGAME_ST");
        let msgs = buf.extract_messages();
        assert_eq!(
            msgs,
            vec![NetworkMessage::make_move(3), NetworkMessage::ping()]
        );
        assert_eq!(buf.pending(), b"GAME_ST");

        buf.push(b"ATE:x|O|OVER\n");
        let msgs = buf.extract_messages();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].kind, MessageType::GameState);
        assert!(buf.pending().is_empty());
    }

    #[test]
    fn bad_frames_are_consumed_without_breaking_the_stream() {
        let mut buf = FrameBuffer::new();
        buf.push(b"BOGUS:1\n\nWIN:X\n\xff\xfe\nPONG\n");
        let msgs = buf.extract_messages();
        assert_eq!(msgs, vec![NetworkMessage::win(PlayerId::Player1), NetworkMessage::pong()]);
        assert!(buf.pending().is_empty());
    }

    #[test]
    fn frame_split_byte_by_byte() {
        let wire = NetworkMessage::connect("Alice").encode();
        let mut buf = FrameBuffer::new();
        let mut got = Vec::new();
        for b in wire.as_bytes() {
            buf.push(std::slice::from_ref(b));
            got.extend(buf.extract_messages());
        }
        assert_eq!(got, vec![NetworkMessage::connect("Alice")]);
    }

    #[test]
    fn oversized_tail_is_dropped() {
        let mut buf = FrameBuffer::new();
        buf.push(&vec![b'A'; MAX_PENDING_BYTES + 1]);
        assert!(buf.extract_messages().is_empty());
        assert!(buf.pending().is_empty());
        buf.push(b"PING\n");
        assert_eq!(buf.extract_messages(), vec![NetworkMessage::ping()]);
    }

    #[test]
    fn raw_buffer_helper_keeps_tail() {
        let mut raw = b"RESET\nDRA".to_vec();
        let msgs = extract_messages(&mut raw);
        assert_eq!(msgs, vec![NetworkMessage::reset()]);
        assert_eq!(raw, b"DRA");
    }
}
