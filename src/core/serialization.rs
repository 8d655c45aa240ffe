//! Flat board snapshot used by the GAME_STATE payload.
//!
//! 42 characters, row-major from the top row, one character per cell:
//! `'X'`, `'O'`, or `'.'` for an empty cell.

use super::board::Board;
use super::types::{PlayerId, COLS, ROWS};
use crate::error::SnapshotError;

pub const EMPTY_CELL: char = '.';
pub const SNAPSHOT_LEN: usize = ROWS * COLS;

pub fn board_to_snapshot(board: &Board) -> String {
    let mut out = String::with_capacity(SNAPSHOT_LEN);
    for row in 0..ROWS {
        for col in 0..COLS {
            out.push(board.get_cell(row, col).map_or(EMPTY_CELL, PlayerId::symbol));
        }
    }
    out
}

/// Rebuilds a board directly from its snapshot.
///
/// Pieces are never removed during a game, so the flattened grid is enough to
/// restore the position exactly. A piece sitting above an empty cell cannot
/// arise from legal play and is rejected.
pub fn board_from_snapshot(snapshot: &str) -> Result<Board, SnapshotError> {
    let len = snapshot.chars().count();
    if len != SNAPSHOT_LEN {
        return Err(SnapshotError::Length(len));
    }

    let mut board = Board::new();
    for (idx, c) in snapshot.chars().enumerate() {
        let cell = match c {
            EMPTY_CELL => None,
            other => Some(PlayerId::from_symbol(other).ok_or(SnapshotError::Cell(other))?),
        };
        board.set_cell(idx / COLS, idx % COLS, cell);
    }

    for col in 0..COLS {
        for row in 0..ROWS - 1 {
            if board.get_cell(row, col).is_some() && board.get_cell(row + 1, col).is_none() {
                return Err(SnapshotError::Floating { row, col });
            }
        }
    }

    Ok(board)
}
