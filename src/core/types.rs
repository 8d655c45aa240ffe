use serde::{Deserialize, Serialize};
use std::fmt;

/// 盤面の行数
pub const ROWS: usize = 6;
/// 盤面の列数
pub const COLS: usize = 7;

/// プレイヤーID
///
/// The wire protocol identifies roles by a single character: `Player1` is
/// `'X'` and always moves first, `Player2` is `'O'`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerId {
    Player1, // 'X' (先手)
    Player2, // 'O' (後手)
}

impl Default for PlayerId {
    fn default() -> Self {
        PlayerId::Player1
    }
}

impl PlayerId {
    pub fn opponent(self) -> PlayerId {
        match self {
            PlayerId::Player1 => PlayerId::Player2,
            PlayerId::Player2 => PlayerId::Player1,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            PlayerId::Player1 => 'X',
            PlayerId::Player2 => 'O',
        }
    }

    pub fn from_symbol(c: char) -> Option<PlayerId> {
        match c {
            'X' => Some(PlayerId::Player1),
            'O' => Some(PlayerId::Player2),
            _ => None,
        }
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// 盤面座標 (row 0 が最上段)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Position { row, col }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_map_both_ways() {
        for p in [PlayerId::Player1, PlayerId::Player2] {
            assert_eq!(PlayerId::from_symbol(p.symbol()), Some(p));
        }
        assert_eq!(PlayerId::from_symbol('.'), None);
        assert_eq!(PlayerId::from_symbol('x'), None);
    }

    #[test]
    fn opponent_is_involution() {
        assert_eq!(PlayerId::Player1.opponent(), PlayerId::Player2);
        assert_eq!(PlayerId::Player1.opponent().opponent(), PlayerId::Player1);
    }
}
