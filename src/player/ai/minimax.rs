use super::eval::{evaluate, EvalWeights};
use crate::core::{Board, PlayerId};
use crate::logic::{apply_move, legal_moves};
use std::cell::Cell;

/// Terminal score for a completed four. Depth is added on top so that a
/// quicker win (more depth left) scores higher and a later loss hurts less.
pub const WIN_SCORE: i32 = 1_000_000;

/// Minimax with alpha-beta pruning.
///
/// Pure function of the board it is handed: no I/O, no shared state beyond
/// the node counter of the last search.
pub struct MinimaxAI {
    pub ai: PlayerId,
    pub opponent: PlayerId,
    pub depth: u32,
    pub weights: EvalWeights,
    nodes_evaluated: Cell<u64>,
}

impl MinimaxAI {
    pub fn new(ai: PlayerId, opponent: PlayerId, depth: u32) -> Self {
        Self {
            ai,
            opponent,
            depth: depth.max(1),
            weights: EvalWeights::default(),
            nodes_evaluated: Cell::new(0),
        }
    }

    pub fn with_weights(mut self, weights: EvalWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Nodes visited by the most recent `select_move`.
    pub fn nodes_evaluated(&self) -> u64 {
        self.nodes_evaluated.get()
    }

    /// Best column for the AI, or `None` if every column is full.
    ///
    /// Candidates are tried left to right and only a strictly better score
    /// replaces the current best, so ties go to the leftmost column.
    pub fn select_move(&self, board: &Board) -> Option<usize> {
        self.search_root(board).map(|(col, _)| col)
    }

    /// Like `select_move` but also returns the score of the chosen column.
    pub fn search_root(&self, board: &Board) -> Option<(usize, i32)> {
        self.nodes_evaluated.set(0);

        let mut best: Option<(usize, i32)> = None;
        for col in legal_moves(board) {
            let Some(next_board) = apply_move(board, col, self.ai) else {
                continue;
            };
            // 自分の一手は打ったので、次は相手の番 (minimizing)
            let score = self.minimax(&next_board, self.depth - 1, i32::MIN, i32::MAX, false);

            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((col, score)),
            }
        }

        tracing::debug!(
            ai = %self.ai,
            depth = self.depth,
            nodes = self.nodes_evaluated.get(),
            best = ?best,
            "minimax search finished"
        );
        best
    }

    pub fn minimax(
        &self,
        board: &Board,
        depth: u32,
        mut alpha: i32,
        mut beta: i32,
        is_maximizing: bool,
    ) -> i32 {
        self.nodes_evaluated.set(self.nodes_evaluated.get() + 1);

        if board.check_win(self.ai) {
            return WIN_SCORE + depth as i32;
        }
        if board.check_win(self.opponent) {
            return -WIN_SCORE - depth as i32;
        }
        if depth == 0 || board.is_full() {
            return evaluate(board, self.ai, self.opponent, &self.weights);
        }

        let moves = legal_moves(board);

        if is_maximizing {
            let mut max_eval = i32::MIN;
            for col in moves {
                let Some(next_board) = apply_move(board, col, self.ai) else {
                    continue;
                };
                let eval = self.minimax(&next_board, depth - 1, alpha, beta, false);
                max_eval = max_eval.max(eval);
                alpha = alpha.max(eval);
                if beta <= alpha {
                    break;
                }
            }
            max_eval
        } else {
            let mut min_eval = i32::MAX;
            for col in moves {
                let Some(next_board) = apply_move(board, col, self.opponent) else {
                    continue;
                };
                let eval = self.minimax(&next_board, depth - 1, alpha, beta, true);
                min_eval = min_eval.min(eval);
                beta = beta.min(eval);
                if beta <= alpha {
                    break;
                }
            }
            min_eval
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{COLS, ROWS};

    const X: PlayerId = PlayerId::Player1;
    const O: PlayerId = PlayerId::Player2;

    fn board_from_moves(moves: &[(usize, PlayerId)]) -> Board {
        let mut board = Board::new();
        for &(col, p) in moves {
            assert!(board.drop_piece(col, p));
        }
        board
    }

    /// Reference search without pruning.
    fn plain_minimax(ai: &MinimaxAI, board: &Board, depth: u32, maximizing: bool) -> i32 {
        if board.check_win(ai.ai) {
            return WIN_SCORE + depth as i32;
        }
        if board.check_win(ai.opponent) {
            return -WIN_SCORE - depth as i32;
        }
        if depth == 0 || board.is_full() {
            return evaluate(board, ai.ai, ai.opponent, &ai.weights);
        }
        let mover = if maximizing { ai.ai } else { ai.opponent };
        let scores = legal_moves(board)
            .into_iter()
            .filter_map(|col| apply_move(board, col, mover))
            .map(|next| plain_minimax(ai, &next, depth - 1, !maximizing));
        if maximizing {
            scores.max().unwrap()
        } else {
            scores.min().unwrap()
        }
    }

    #[test]
    fn takes_immediate_win_at_every_depth() {
        // O: three stacked in column 5; X also threatens column 2
        let board = board_from_moves(&[(5, O), (0, X), (5, O), (1, X), (5, O), (3, X)]);
        for depth in 1..=5 {
            let ai = MinimaxAI::new(O, X, depth);
            assert_eq!(ai.select_move(&board), Some(5), "depth {}", depth);
        }
    }

    #[test]
    fn takes_horizontal_win() {
        let board = board_from_moves(&[(1, X), (1, O), (2, X), (2, O), (3, X), (6, O)]);
        for depth in 1..=4 {
            let ai = MinimaxAI::new(X, O, depth);
            // either end would win; 0 is the leftmost
            assert_eq!(ai.select_move(&board), Some(0), "depth {}", depth);
        }
    }

    #[test]
    fn blocks_opponent_four() {
        // X threatens column 2 vertically; O must block
        let board = board_from_moves(&[(2, X), (4, O), (2, X), (5, O), (2, X)]);
        for depth in 2..=5 {
            let ai = MinimaxAI::new(O, X, depth);
            assert_eq!(ai.select_move(&board), Some(2), "depth {}", depth);
        }
    }

    #[test]
    fn prefers_winning_over_blocking() {
        // both sides have three stacked; O to move should win, not block
        let board = board_from_moves(&[(0, X), (6, O), (0, X), (6, O), (0, X), (6, O), (1, X)]);
        let ai = MinimaxAI::new(O, X, 4);
        assert_eq!(ai.select_move(&board), Some(6));
    }

    #[test]
    fn pruning_preserves_value() {
        let boards = [
            Board::new(),
            board_from_moves(&[(3, X), (3, O), (2, X), (4, O)]),
            board_from_moves(&[(0, X), (6, O), (1, X), (5, O), (3, X)]),
        ];
        for board in boards.iter() {
            for depth in 1..=4 {
                let ai = MinimaxAI::new(X, O, depth);
                let pruned = ai.minimax(board, depth, i32::MIN, i32::MAX, true);
                let plain = plain_minimax(&ai, board, depth, true);
                assert_eq!(pruned, plain, "depth {}", depth);
            }
        }
    }

    #[test]
    fn pruning_reduces_work() {
        let board = board_from_moves(&[(3, X), (3, O)]);
        let ai = MinimaxAI::new(X, O, 5);
        ai.select_move(&board);
        // 7^5 + 7^4 + ... leaves and inner nodes without pruning
        let unpruned: u64 = (0..5).map(|d| (COLS as u64).pow(d)).sum::<u64>() * COLS as u64;
        assert!(ai.nodes_evaluated() > 0);
        assert!(ai.nodes_evaluated() < unpruned);
    }

    #[test]
    fn ties_go_to_the_leftmost_column() {
        // depth 1 on an empty board: only the centre column earns anything
        let ai = MinimaxAI::new(X, O, 1);
        let first = ai.select_move(&Board::new());
        for _ in 0..5 {
            assert_eq!(ai.select_move(&Board::new()), first);
        }
        assert_eq!(first, Some(3));
    }

    #[test]
    fn full_board_has_no_move() {
        let mut board = Board::new();
        let mut p = X;
        // the search only cares that no column is open
        for col in 0..COLS {
            for _ in 0..ROWS {
                board.drop_piece(col, p);
                p = p.opponent();
            }
        }
        let ai = MinimaxAI::new(X, O, 3);
        assert_eq!(ai.select_move(&board), None);
    }

    #[test]
    fn zero_depth_is_clamped() {
        let ai = MinimaxAI::new(X, O, 0);
        assert_eq!(ai.depth, 1);
        assert!(ai.select_move(&Board::new()).is_some());
    }
}
