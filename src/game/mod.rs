use crate::core::{board_from_snapshot, board_to_snapshot, Board, PlayerId, COLS};
use crate::error::{MoveError, SnapshotError};
use crate::player::PlayerController;
use serde::{Deserialize, Serialize};

/// Game lifecycle flag carried by GAME_STATE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    Playing,
    Over,
}

impl GameStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GameStatus::Playing => "PLAYING",
            GameStatus::Over => "OVER",
        }
    }

    pub fn parse(s: &str) -> Option<GameStatus> {
        match s {
            "PLAYING" => Some(GameStatus::Playing),
            "OVER" => Some(GameStatus::Over),
            _ => None,
        }
    }
}

/// 対局の状態 (盤面・手番・勝者)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    board: Board,
    current_player: PlayerId,
    game_over: bool,
    winner: Option<PlayerId>,
    /// 着手履歴 (列番号)
    pub history: Vec<usize>,
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

impl Game {
    pub fn new() -> Self {
        Game {
            board: Board::new(),
            current_player: PlayerId::Player1,
            game_over: false,
            winner: None,
            history: Vec::new(),
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn current_player(&self) -> PlayerId {
        self.current_player
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// `None` while playing and after a draw.
    pub fn winner(&self) -> Option<PlayerId> {
        self.winner
    }

    pub fn status(&self) -> GameStatus {
        if self.game_over {
            GameStatus::Over
        } else {
            GameStatus::Playing
        }
    }

    pub fn reset(&mut self) {
        *self = Game::new();
    }

    /// Checks whether `player` may drop into `column` right now.
    pub fn check_move(&self, column: i32, player: PlayerId) -> Result<(), MoveError> {
        if player != self.current_player {
            return Err(MoveError::WrongTurn(player.symbol()));
        }
        if self.game_over {
            return Err(MoveError::GameOver);
        }
        if column < 0 || column as usize >= COLS {
            return Err(MoveError::InvalidColumn(column));
        }
        if self.board.is_column_full(column as usize) {
            return Err(MoveError::ColumnFull(column));
        }
        Ok(())
    }

    pub fn validate_move(&self, column: i32, player: PlayerId) -> bool {
        self.check_move(column, player).is_ok()
    }

    /// Plays `column` for the current player. Detects a win first, then a
    /// draw, and only passes the turn if the game continues.
    pub fn make_move(&mut self, column: i32) -> bool {
        if self.game_over || column < 0 {
            return false;
        }
        let col = column as usize;
        if !self.board.drop_piece(col, self.current_player) {
            return false;
        }
        self.history.push(col);

        if self.board.check_win(self.current_player) {
            self.game_over = true;
            self.winner = Some(self.current_player);
        } else if self.board.is_full() {
            self.game_over = true;
            self.winner = None;
        } else {
            self.current_player = self.current_player.opponent();
        }
        true
    }

    pub fn serialize_game_state(&self) -> String {
        board_to_snapshot(&self.board)
    }

    /// Replaces the board with the one encoded in `snapshot`. Turn and
    /// game-over flags are left alone; see [`Game::apply_remote_state`].
    pub fn deserialize_game_state(&mut self, snapshot: &str) -> Result<(), SnapshotError> {
        self.board = board_from_snapshot(snapshot)?;
        self.history.clear();
        Ok(())
    }

    /// Installs a full GAME_STATE from the server: board, side to move and
    /// the PLAYING/OVER flag. The winner is recomputed from the board.
    pub fn apply_remote_state(
        &mut self,
        snapshot: &str,
        current_player: PlayerId,
        status: GameStatus,
    ) -> Result<(), SnapshotError> {
        self.deserialize_game_state(snapshot)?;
        self.current_player = current_player;
        self.game_over = status == GameStatus::Over;
        self.winner = if !self.game_over {
            None
        } else if self.board.check_win(PlayerId::Player1) {
            Some(PlayerId::Player1)
        } else if self.board.check_win(PlayerId::Player2) {
            Some(PlayerId::Player2)
        } else {
            None
        };
        Ok(())
    }

    /// 対局ループ: 終局まで両プレイヤーに手を選ばせる
    ///
    /// `on_move` is called after every applied move. Returns the winner, or
    /// `None` for a draw or when a controller gives up.
    pub fn play<F>(
        &mut self,
        p1: &dyn PlayerController,
        p2: &dyn PlayerController,
        mut on_move: F,
    ) -> Option<PlayerId>
    where
        F: FnMut(&Game, usize),
    {
        while !self.game_over {
            let controller = match self.current_player {
                PlayerId::Player1 => p1,
                PlayerId::Player2 => p2,
            };
            let moves = crate::logic::legal_moves(&self.board);

            let Some(col) = controller.choose_move(self, &moves) else {
                tracing::info!(player = %self.current_player, "{} resigned", controller.name());
                return None;
            };

            if !self.make_move(col as i32) {
                tracing::warn!(column = col, "{} chose an illegal column", controller.name());
                continue;
            }
            on_move(self, col);
        }
        self.winner
    }
}
