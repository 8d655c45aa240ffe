use crate::core::{Board, PlayerId, Position, COLS, ROWS};

/// 合法手生成: 満杯でない列を左から順に
pub fn legal_moves(board: &Board) -> Vec<usize> {
    (0..COLS).filter(|&col| !board.is_column_full(col)).collect()
}

/// 着手後の盤面を返す (元の盤面は変更しない)
///
/// Returns `None` when the column cannot take another piece.
pub fn apply_move(board: &Board, col: usize, player: PlayerId) -> Option<Board> {
    let mut next = *board;
    if next.drop_piece(col, player) {
        Some(next)
    } else {
        None
    }
}

/// Every four-cell line on the board: horizontal, vertical, then both
/// diagonals. 69 windows on a 6x7 grid.
pub fn windows() -> impl Iterator<Item = [Position; 4]> {
    let horizontal = (0..ROWS).flat_map(|row| {
        (0..=COLS - 4).map(move |col| line(row, col, 0, 1))
    });
    let vertical = (0..COLS).flat_map(|col| {
        (0..=ROWS - 4).map(move |row| line(row, col, 1, 0))
    });
    let down_right = (0..=ROWS - 4).flat_map(|row| {
        (0..=COLS - 4).map(move |col| line(row, col, 1, 1))
    });
    let up_right = (3..ROWS).flat_map(|row| {
        (0..=COLS - 4).map(move |col| line(row, col, -1, 1))
    });

    horizontal.chain(vertical).chain(down_right).chain(up_right)
}

fn line(row: usize, col: usize, dr: isize, dc: isize) -> [Position; 4] {
    let mut out = [Position::default(); 4];
    for (i, pos) in out.iter_mut().enumerate() {
        let i = i as isize;
        *pos = Position::new(
            (row as isize + dr * i) as usize,
            (col as isize + dc * i) as usize,
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_count_matches_grid() {
        // 24 horizontal + 21 vertical + 12 + 12 diagonal
        assert_eq!(windows().count(), 69);
        for w in windows() {
            for p in w {
                assert!(p.row < ROWS && p.col < COLS, "{} out of range", p);
            }
        }
    }

    #[test]
    fn legal_moves_skip_full_columns() {
        let mut board = Board::new();
        for _ in 0..ROWS {
            board.drop_piece(2, PlayerId::Player1);
        }
        assert_eq!(legal_moves(&board), vec![0, 1, 3, 4, 5, 6]);
    }

    #[test]
    fn apply_move_leaves_original_untouched() {
        let board = Board::new();
        let next = apply_move(&board, 4, PlayerId::Player2).unwrap();
        assert_eq!(board.piece_count(), 0);
        assert_eq!(next.get_cell(ROWS - 1, 4), Some(PlayerId::Player2));
        assert!(apply_move(&board, COLS, PlayerId::Player2).is_none());
    }
}
