pub mod board;
pub mod serialization;
pub mod types;

pub use board::Board;
pub use serialization::{board_from_snapshot, board_to_snapshot};
pub use types::{PlayerId, Position, COLS, ROWS};
