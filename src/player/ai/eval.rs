//! Static evaluation for the search.
//!
//! Every four-cell window is scored by how many pieces each side holds in
//! it; a window containing both colours is dead and scores nothing. AI
//! pieces in the centre column earn a flat bonus on top.

use crate::core::{Board, PlayerId, COLS, ROWS};
use crate::logic::windows;
use serde::{Deserialize, Serialize};

/// Heuristic weights. The defaults are the tuned values the engine ships
/// with; changing them changes which moves the AI prefers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalWeights {
    pub four: i32,
    pub open_three: i32,
    pub open_two: i32,
    pub opponent_open_three: i32,
    pub opponent_open_two: i32,
    pub center_piece: i32,
}

impl Default for EvalWeights {
    fn default() -> Self {
        EvalWeights {
            four: 1000,
            open_three: 100,
            open_two: 10,
            opponent_open_three: -80,
            opponent_open_two: -10,
            center_piece: 3,
        }
    }
}

/// Scores `board` from `ai`'s point of view.
pub fn evaluate(board: &Board, ai: PlayerId, opponent: PlayerId, weights: &EvalWeights) -> i32 {
    let mut score: i32 = windows()
        .map(|w| {
            let cells = w.map(|p| board.get(p));
            score_window(&cells, ai, opponent, weights)
        })
        .sum();

    let center = COLS / 2;
    let center_count = (0..ROWS)
        .filter(|&row| board.get_cell(row, center) == Some(ai))
        .count() as i32;
    score += center_count * weights.center_piece;

    score
}

pub(crate) fn score_window(
    cells: &[Option<PlayerId>; 4],
    ai: PlayerId,
    opponent: PlayerId,
    weights: &EvalWeights,
) -> i32 {
    let ai_count = cells.iter().filter(|&&c| c == Some(ai)).count();
    let opp_count = cells.iter().filter(|&&c| c == Some(opponent)).count();
    let has_empty = cells.iter().any(Option::is_none);

    if ai_count > 0 && opp_count > 0 {
        return 0;
    }

    match (ai_count, opp_count, has_empty) {
        (4, _, _) => weights.four,
        (3, _, true) => weights.open_three,
        (2, _, true) => weights.open_two,
        (_, 3, true) => weights.opponent_open_three,
        (_, 2, true) => weights.opponent_open_two,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const X: Option<PlayerId> = Some(PlayerId::Player1);
    const O: Option<PlayerId> = Some(PlayerId::Player2);

    fn score(cells: [Option<PlayerId>; 4]) -> i32 {
        score_window(
            &cells,
            PlayerId::Player1,
            PlayerId::Player2,
            &EvalWeights::default(),
        )
    }

    #[test]
    fn window_constants() {
        assert_eq!(score([X, X, X, None]), 100);
        assert_eq!(score([X, None, X, None]), 10);
        assert_eq!(score([O, O, None, O]), -80);
        assert_eq!(score([None, O, None, O]), -10);
        assert_eq!(score([X, X, X, X]), 1000);
        assert_eq!(score([X, None, None, None]), 0);
    }

    #[test]
    fn mixed_window_is_dead() {
        assert_eq!(score([X, X, X, O]), 0);
        assert_eq!(score([O, O, X, None]), 0);
    }

    #[test]
    fn empty_board_scores_zero() {
        let board = Board::new();
        assert_eq!(
            evaluate(&board, PlayerId::Player1, PlayerId::Player2, &EvalWeights::default()),
            0
        );
    }

    #[test]
    fn single_center_piece() {
        let mut board = Board::new();
        board.drop_piece(3, PlayerId::Player1);
        let w = EvalWeights::default();
        // one lone piece makes no scoring window, only the centre bonus
        assert_eq!(evaluate(&board, PlayerId::Player1, PlayerId::Player2, &w), 3);
        // from O's side there is no centre bonus and no O window
        assert_eq!(evaluate(&board, PlayerId::Player2, PlayerId::Player1, &w), 0);
    }

    #[test]
    fn open_two_on_bottom_row() {
        let mut board = Board::new();
        board.drop_piece(0, PlayerId::Player1);
        board.drop_piece(1, PlayerId::Player1);
        let w = EvalWeights::default();
        // windows [0..4) and [1..5) are not both two-X: only cols 0-3 holds both
        assert_eq!(evaluate(&board, PlayerId::Player1, PlayerId::Player2, &w), 10);
        assert_eq!(evaluate(&board, PlayerId::Player2, PlayerId::Player1, &w), -10);
    }
}
