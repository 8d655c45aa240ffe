use std::path::PathBuf;

/// Socket-level failures. Fatal to the operation that hit them; never retried.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("could not resolve {host}:{port}")]
    Resolve { host: String, port: u16 },

    #[error("connection to {addr} timed out after {secs}s")]
    Timeout { addr: String, secs: u64 },

    #[error("connection to {addr} failed: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    #[error("failed to bind port {port}: {source}")]
    Bind { port: u16, source: std::io::Error },

    #[error("peer closed the connection")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons a move is refused by the game rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("the game is already over")]
    GameOver,

    #[error("it is not {0}'s turn")]
    WrongTurn(char),

    #[error("column {0} is out of range")]
    InvalidColumn(i32),

    #[error("column {0} is full")]
    ColumnFull(i32),
}

/// A GAME_STATE board snapshot that cannot be turned back into a board.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot must be 42 cells, got {0}")]
    Length(usize),

    #[error("unknown cell character {0:?}")]
    Cell(char),

    #[error("piece at row {row}, column {col} has an empty cell below it")]
    Floating { row: usize, col: usize },

    #[error("malformed GAME_STATE payload")]
    Payload,
}

/// Command misuse and failures on a client or server session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("server already running")]
    AlreadyRunning,

    #[error("client already connected or connecting")]
    AlreadyConnected,

    #[error("not connected")]
    NotConnected,

    #[error("not in game")]
    NotInGame,

    #[error("invalid move: {0}")]
    InvalidMove(#[from] MoveError),

    #[error("session is shutting down")]
    ShuttingDown,

    #[error("{0}")]
    Transport(#[from] TransportError),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_error_display() {
        assert_eq!(MoveError::WrongTurn('O').to_string(), "it is not O's turn");
        assert_eq!(
            MoveError::InvalidColumn(-1).to_string(),
            "column -1 is out of range"
        );
    }

    #[test]
    fn session_error_wraps_move_error() {
        let err: SessionError = MoveError::ColumnFull(3).into();
        assert_eq!(err.to_string(), "invalid move: column 3 is full");
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::Validation("hard_depth must be >= 1".to_string());
        assert_eq!(
            err.to_string(),
            "config validation error: hard_depth must be >= 1"
        );
    }
}
