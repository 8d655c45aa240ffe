use super::types::{PlayerId, Position, COLS, ROWS};
use serde::{Deserialize, Serialize};

/// 盤面
///
/// Row 0 is the top of the grid; pieces fall towards row `ROWS - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Board {
    cells: [[Option<PlayerId>; COLS]; ROWS],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        Board {
            cells: [[None; COLS]; ROWS],
        }
    }

    /// Drops a piece into `col`. Returns false if the column is out of range
    /// or already full.
    pub fn drop_piece(&mut self, col: usize, player: PlayerId) -> bool {
        match self.next_open_row(col) {
            Some(row) => {
                self.cells[row][col] = Some(player);
                true
            }
            None => false,
        }
    }

    /// Lowest empty row in `col`, if any.
    pub fn next_open_row(&self, col: usize) -> Option<usize> {
        if col >= COLS {
            return None;
        }
        (0..ROWS).rev().find(|&row| self.cells[row][col].is_none())
    }

    /// Out-of-range coordinates read as empty.
    pub fn get_cell(&self, row: usize, col: usize) -> Option<PlayerId> {
        if row < ROWS && col < COLS {
            self.cells[row][col]
        } else {
            None
        }
    }

    pub fn get(&self, pos: Position) -> Option<PlayerId> {
        self.get_cell(pos.row, pos.col)
    }

    pub(crate) fn set_cell(&mut self, row: usize, col: usize, cell: Option<PlayerId>) {
        self.cells[row][col] = cell;
    }

    /// Out-of-range columns count as full.
    pub fn is_column_full(&self, col: usize) -> bool {
        self.next_open_row(col).is_none()
    }

    pub fn is_full(&self) -> bool {
        self.cells[0].iter().all(Option::is_some)
    }

    pub fn reset(&mut self) {
        self.cells = [[None; COLS]; ROWS];
    }

    pub fn piece_count(&self) -> usize {
        self.cells.iter().flatten().filter(|c| c.is_some()).count()
    }

    pub fn check_win(&self, player: PlayerId) -> bool {
        const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

        for row in 0..ROWS {
            for col in 0..COLS {
                for &(dr, dc) in DIRECTIONS.iter() {
                    if self.line_of_four(row, col, dr, dc, player) {
                        return true;
                    }
                }
            }
        }
        false
    }

    fn line_of_four(&self, row: usize, col: usize, dr: isize, dc: isize, player: PlayerId) -> bool {
        (0..4).all(|i| {
            let r = row as isize + dr * i;
            let c = col as isize + dc * i;
            r >= 0
                && c >= 0
                && (r as usize) < ROWS
                && (c as usize) < COLS
                && self.cells[r as usize][c as usize] == Some(player)
        })
    }
}
