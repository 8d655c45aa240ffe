pub mod config;
pub mod eval;
pub mod minimax;
pub mod random;

pub use config::AIConfig;
pub use eval::EvalWeights;
pub use minimax::MinimaxAI;
pub use random::random_move;

use crate::core::{Board, PlayerId};
use crate::game::Game;
use crate::player::PlayerController;
use serde::{Deserialize, Serialize};

/// AI の強さ (UI 向け)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// How the computer picks a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiStrategy {
    Random,
    Minimax { depth: u32 },
}

/// Picks a column for `ai` on `board`. `None` only when the board is full.
pub fn select_move(
    board: &Board,
    ai: PlayerId,
    opponent: PlayerId,
    strategy: AiStrategy,
) -> Option<usize> {
    select_move_weighted(board, ai, opponent, strategy, &EvalWeights::default())
}

pub fn select_move_weighted(
    board: &Board,
    ai: PlayerId,
    opponent: PlayerId,
    strategy: AiStrategy,
    weights: &EvalWeights,
) -> Option<usize> {
    match strategy {
        AiStrategy::Random => random_move(board),
        AiStrategy::Minimax { depth } => MinimaxAI::new(ai, opponent, depth)
            .with_weights(*weights)
            .select_move(board),
    }
}

/// A computer player usable wherever a `PlayerController` is expected.
pub struct AiPlayer {
    pub player_id: PlayerId,
    pub name: String,
    pub strategy: AiStrategy,
    pub weights: EvalWeights,
}

impl AiPlayer {
    pub fn new(player_id: PlayerId, name: &str, strategy: AiStrategy) -> Self {
        Self {
            player_id,
            name: name.to_string(),
            strategy,
            weights: EvalWeights::default(),
        }
    }

    pub fn with_weights(mut self, weights: EvalWeights) -> Self {
        self.weights = weights;
        self
    }
}

impl PlayerController for AiPlayer {
    fn choose_move(&self, game: &Game, legal_moves: &[usize]) -> Option<usize> {
        if legal_moves.is_empty() {
            return None;
        }
        select_move_weighted(
            game.board(),
            self.player_id,
            self.player_id.opponent(),
            self.strategy,
            &self.weights,
        )
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_local(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::ai::random::random_move_with;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::cell::RefCell;

    /// Random opponent with a fixed seed so games are reproducible.
    struct SeededRandom {
        rng: RefCell<StdRng>,
    }

    impl PlayerController for SeededRandom {
        fn choose_move(&self, game: &Game, _legal_moves: &[usize]) -> Option<usize> {
            random_move_with(game.board(), &mut *self.rng.borrow_mut())
        }

        fn name(&self) -> &str {
            "Random AI"
        }

        fn is_local(&self) -> bool {
            true
        }
    }

    #[test]
    fn both_strategies_return_legal_columns() {
        let mut board = Board::new();
        for _ in 0..6 {
            board.drop_piece(3, PlayerId::Player1);
        }
        for strategy in [AiStrategy::Random, AiStrategy::Minimax { depth: 3 }] {
            let col = select_move(&board, PlayerId::Player2, PlayerId::Player1, strategy).unwrap();
            assert_ne!(col, 3);
        }
    }

    #[test]
    fn minimax_beats_random_from_either_seat() {
        for ai_seat in [PlayerId::Player1, PlayerId::Player2] {
            let smart = AiPlayer::new(ai_seat, "Minimax AI", AiStrategy::Minimax { depth: 4 });
            let dumb = SeededRandom {
                rng: RefCell::new(StdRng::seed_from_u64(2024)),
            };
            let (p1, p2): (&dyn PlayerController, &dyn PlayerController) =
                if ai_seat == PlayerId::Player1 {
                    (&smart, &dumb)
                } else {
                    (&dumb, &smart)
                };

            let mut game = Game::new();
            let winner = game.play(p1, p2, |_, _| {});
            assert_eq!(winner, Some(ai_seat));
        }
    }
}
