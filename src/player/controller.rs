use crate::game::Game;

/// プレイヤー操作のtrait
pub trait PlayerController {
    /// Picks one of `legal_moves` (columns). `None` means resign.
    fn choose_move(&self, game: &Game, legal_moves: &[usize]) -> Option<usize>;
    fn name(&self) -> &str;
    fn is_local(&self) -> bool;
}
