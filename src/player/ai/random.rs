use crate::core::Board;
use crate::logic::legal_moves;
use rand::seq::SliceRandom;
use rand::Rng;

/// Uniformly random legal column ("easy" difficulty).
pub fn random_move(board: &Board) -> Option<usize> {
    let mut rng = rand::thread_rng();
    random_move_with(board, &mut rng)
}

pub fn random_move_with<R: Rng + ?Sized>(board: &Board, rng: &mut R) -> Option<usize> {
    legal_moves(board).choose(rng).copied()
}
