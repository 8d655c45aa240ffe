use crate::core::{Board, PlayerId, COLS, ROWS};
use crossterm::{cursor, execute, style::Stylize, terminal};
use std::io::{self, stdout, Write};

#[derive(Default)]
pub struct DisplayState {
    /// 選択中の列
    pub cursor: Option<usize>,
    pub status_msg: Option<String>,
    pub last_move: Option<usize>,
}

fn cell_text(cell: Option<PlayerId>) -> String {
    match cell {
        Some(PlayerId::Player1) => " X ".red().bold().to_string(),
        Some(PlayerId::Player2) => " O ".yellow().bold().to_string(),
        None => " . ".dark_grey().to_string(),
    }
}

/// 盤面を描画 (raw mode 前提で \r\n を使う)
pub fn render_board(board: &Board, state: &DisplayState) -> io::Result<()> {
    let mut out = stdout();

    execute!(
        out,
        terminal::Clear(terminal::ClearType::All),
        cursor::MoveTo(0, 0)
    )?;

    print!("=== Connect Four ===\r\n");
    match &state.status_msg {
        Some(msg) => print!("{}\r\n", msg.clone().bold().yellow()),
        None => print!("\r\n"),
    }
    print!("\r\n");

    // 列番号 (1 始まり)
    print!(" ");
    for col in 0..COLS {
        let label = format!(" {} ", col + 1);
        if state.cursor == Some(col) {
            print!("{}", label.reverse());
        } else if state.last_move == Some(col) {
            print!("{}", label.underlined());
        } else {
            print!("{}", label);
        }
    }
    print!("\r\n");

    for row in 0..ROWS {
        print!("|");
        for col in 0..COLS {
            print!("{}", cell_text(board.get_cell(row, col)));
        }
        print!("|\r\n");
    }
    print!("+{}+\r\n", "---".repeat(COLS));

    out.flush()
}

/// Plain-text grid without escape codes, for logs and tests.
pub fn board_to_text(board: &Board) -> String {
    let mut text = String::new();
    for row in 0..ROWS {
        for col in 0..COLS {
            text.push(board.get_cell(row, col).map_or('.', PlayerId::symbol));
        }
        text.push('\n');
    }
    text
}
