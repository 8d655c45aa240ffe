use crate::core::{PlayerId, COLS};
use crate::display::{render_board, DisplayState};
use crate::game::Game;
use crate::player::PlayerController;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use std::time::Duration;

/// Keyboard-driven human player: arrows + Enter, or the digit keys 1-7.
pub struct TuiController {
    player_id: PlayerId,
    name: String,
}

impl TuiController {
    pub fn new(player_id: PlayerId, name: &str) -> Self {
        Self {
            player_id,
            name: name.to_string(),
        }
    }

    /// Blocks until the user picks a legal column or presses `q`.
    pub fn read_column(game: &Game, legal_moves: &[usize], status: &str) -> Option<usize> {
        let mut state = DisplayState {
            cursor: legal_moves.first().copied(),
            status_msg: Some(status.to_string()),
            last_move: game.history.last().copied(),
        };

        loop {
            if render_board(game.board(), &state).is_err() {
                return None;
            }
            print!("[Left/Right]: Move | [Enter] or [1-7]: Drop | [q]: Quit\r\n");

            if !event::poll(Duration::from_millis(100)).unwrap_or(false) {
                continue;
            }
            // Windows では離した時のイベントも届く
            let Ok(Event::Key(KeyEvent {
                code,
                kind: KeyEventKind::Press,
                ..
            })) = event::read()
            else {
                continue;
            };
            let cursor = state.cursor.unwrap_or(0);
            match code {
                KeyCode::Char('q') => return None,
                KeyCode::Left if cursor > 0 => state.cursor = Some(cursor - 1),
                KeyCode::Right if cursor + 1 < COLS => state.cursor = Some(cursor + 1),
                KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Down => {
                    if legal_moves.contains(&cursor) {
                        return Some(cursor);
                    }
                }
                KeyCode::Char(c) => {
                    if let Some(col) = c.to_digit(10).and_then(|d| (d as usize).checked_sub(1)) {
                        if legal_moves.contains(&col) {
                            return Some(col);
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

impl PlayerController for TuiController {
    fn name(&self) -> &str {
        &self.name
    }

    fn choose_move(&self, game: &Game, legal_moves: &[usize]) -> Option<usize> {
        let status = format!("{}'s turn ({})", self.name, self.player_id);
        Self::read_column(game, legal_moves, &status)
    }

    fn is_local(&self) -> bool {
        true
    }
}
