use connect_four::config::AppConfig;
use connect_four::core::{PlayerId, COLS};
use connect_four::display::{render_board, DisplayState};
use connect_four::game::Game;
use connect_four::network::{ClientSession, ClientState, ServerSession, ServerState};
use connect_four::player::{AiPlayer, Difficulty, PlayerController, TuiController};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::{cursor, execute, terminal};
use std::io::{self, Write};
use std::time::Duration;

const INPUT_POLL: Duration = Duration::from_millis(100);

fn main() -> anyhow::Result<()> {
    // ログは stderr へ (画面は crossterm が使う)
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(tracing::Level::WARN)
        .init();

    let config = AppConfig::load_or_default();

    // ターミナル初期化
    terminal::enable_raw_mode()?;
    execute!(io::stdout(), terminal::EnterAlternateScreen)?;

    let res = run(&config);

    // ターミナル復帰
    execute!(io::stdout(), terminal::LeaveAlternateScreen)?;
    terminal::disable_raw_mode()?;

    res
}

fn clear_screen() -> io::Result<()> {
    execute!(
        io::stdout(),
        terminal::Clear(terminal::ClearType::All),
        cursor::MoveTo(0, 0)
    )
}

/// Blocks until one of `choices` (or `q`) is pressed. `None` on `q`.
fn wait_for_choice(choices: &[char]) -> anyhow::Result<Option<char>> {
    loop {
        if !event::poll(INPUT_POLL)? {
            continue;
        }
        if let Event::Key(KeyEvent {
            code: KeyCode::Char(c),
            kind: KeyEventKind::Press,
            ..
        }) = event::read()?
        {
            if c == 'q' {
                return Ok(None);
            }
            if choices.contains(&c) {
                return Ok(Some(c));
            }
        }
    }
}

fn wait_for_any_key() -> anyhow::Result<()> {
    loop {
        if event::poll(INPUT_POLL)? {
            if let Event::Key(KeyEvent {
                kind: KeyEventKind::Press,
                ..
            }) = event::read()?
            {
                return Ok(());
            }
        }
    }
}

/// Single-line text input. Empty input yields `default`; Esc cancels.
fn read_line(prompt: &str, default: &str) -> anyhow::Result<Option<String>> {
    let mut input = String::new();
    loop {
        print!("\r{} [{}]: {}", prompt, default, input);
        execute!(io::stdout(), terminal::Clear(terminal::ClearType::UntilNewLine))?;
        io::stdout().flush()?;

        if !event::poll(INPUT_POLL)? {
            continue;
        }
        let Event::Key(KeyEvent {
            code,
            kind: KeyEventKind::Press,
            ..
        }) = event::read()?
        else {
            continue;
        };
        match code {
            KeyCode::Enter => {
                print!("\r\n");
                let value = input.trim();
                return Ok(Some(if value.is_empty() {
                    default.to_string()
                } else {
                    value.to_string()
                }));
            }
            KeyCode::Esc => return Ok(None),
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Char(c) => input.push(c),
            _ => {}
        }
    }
}

fn run(config: &AppConfig) -> anyhow::Result<()> {
    clear_screen()?;
    print!("=== Connect Four ===\r\n");
    print!("\r\nSelect mode:\r\n");
    print!("1. Local Play (two players)\r\n");
    print!("2. Play against the computer\r\n");
    print!("3. Host a network game (port {})\r\n", config.network.port);
    print!("4. Join a network game\r\n");
    print!("q. Quit\r\n");
    io::stdout().flush()?;

    match wait_for_choice(&['1', '2', '3', '4'])? {
        Some('1') => run_local(None, config),
        Some('2') => {
            print!("\r\nDifficulty: 1. Easy  2. Medium  3. Hard\r\n");
            io::stdout().flush()?;
            let difficulty = match wait_for_choice(&['1', '2', '3'])? {
                Some('1') => Difficulty::Easy,
                Some('2') => Difficulty::Medium,
                Some(_) => Difficulty::Hard,
                None => return Ok(()),
            };
            run_local(Some(difficulty), config)
        }
        Some('3') => run_host(config),
        Some('4') => run_join(config),
        _ => Ok(()),
    }
}

fn run_local(ai: Option<Difficulty>, config: &AppConfig) -> anyhow::Result<()> {
    let p1 = TuiController::new(PlayerId::Player1, "Player 1");
    let p2: Box<dyn PlayerController> = match ai {
        Some(difficulty) => Box::new(
            AiPlayer::new(
                PlayerId::Player2,
                "Computer",
                config.ai.strategy_for(difficulty),
            )
            .with_weights(config.ai.weights),
        ),
        None => Box::new(TuiController::new(PlayerId::Player2, "Player 2")),
    };

    let mut game = Game::new();
    game.play(&p1, p2.as_ref(), |_, _| {});

    let result = if !game.is_game_over() {
        "Game abandoned".to_string()
    } else {
        match game.winner() {
            Some(PlayerId::Player1) => format!("{} wins!", p1.name()),
            Some(PlayerId::Player2) => format!("{} wins!", p2.name()),
            None => "Game ended in a draw!".to_string(),
        }
    };
    show_final(&game, &result)
}

fn show_final(game: &Game, message: &str) -> anyhow::Result<()> {
    let state = DisplayState {
        cursor: None,
        status_msg: Some(message.to_string()),
        last_move: game.history.last().copied(),
    };
    render_board(game.board(), &state)?;
    print!("Press any key to exit\r\n");
    io::stdout().flush()?;
    wait_for_any_key()
}

fn run_host(config: &AppConfig) -> anyhow::Result<()> {
    let mut server = ServerSession::new();
    server.start(config.network.port)?;

    // ホスト自身もクライアントとして参加する
    let mut client = ClientSession::new()
        .with_name(&config.network.player_name)
        .with_timeout(config.network.connect_timeout());
    client.connect("127.0.0.1", server.port())?;

    clear_screen()?;
    print!(
        "Hosting on {}:{}\r\nWaiting for an opponent... (q to cancel)\r\n",
        server.ip_address(),
        server.port()
    );
    io::stdout().flush()?;

    while !server.is_game_started() {
        if server.state() == ServerState::Error {
            anyhow::bail!("server failed: {}", server.last_error());
        }
        if event::poll(INPUT_POLL)? {
            if let Event::Key(KeyEvent {
                code: KeyCode::Char('q'),
                ..
            }) = event::read()?
            {
                client.disconnect();
                server.stop();
                return Ok(());
            }
        }
    }

    let res = play_network(&mut client);
    client.disconnect();
    server.stop();
    res
}

fn run_join(config: &AppConfig) -> anyhow::Result<()> {
    clear_screen()?;
    let Some(host) = read_line("Host", "127.0.0.1")? else {
        return Ok(());
    };
    let default_port = config.network.port.to_string();
    let Some(port) = read_line("Port", &default_port)? else {
        return Ok(());
    };
    let port: u16 = port.parse()?;

    print!("Connecting to {}:{}...\r\n", host, port);
    io::stdout().flush()?;
    let mut client = ClientSession::new()
        .with_name(&config.network.player_name)
        .with_timeout(config.network.connect_timeout());
    client.connect(&host, port)?;

    let res = play_network(&mut client);
    client.disconnect();
    res
}

/// Drives a connected client until the user quits or the link fails.
fn play_network(client: &mut ClientSession) -> anyhow::Result<()> {
    let mut cursor = COLS / 2;
    let mut note = String::new();

    loop {
        let game = client.game();
        let role = client
            .player_role()
            .map_or_else(|| "-".to_string(), |r| r.to_string());
        let state = DisplayState {
            cursor: Some(cursor),
            status_msg: Some(format!("[You: {}] {}", role, client.status_message())),
            last_move: None,
        };
        render_board(game.board(), &state)?;
        print!("[Left/Right] Move | [Enter]/[1-7] Drop | [r] Reset | [p] Ping | [q] Quit\r\n");
        if client.state() == ClientState::Error {
            print!("Error: {}\r\n", client.last_error());
        }
        if !note.is_empty() {
            print!("{}\r\n", note);
        }
        io::stdout().flush()?;

        if !event::poll(INPUT_POLL)? {
            continue;
        }
        let Event::Key(KeyEvent {
            code,
            kind: KeyEventKind::Press,
            ..
        }) = event::read()?
        else {
            continue;
        };

        let column = match code {
            KeyCode::Char('q') => return Ok(()),
            KeyCode::Left => {
                cursor = cursor.saturating_sub(1);
                None
            }
            KeyCode::Right => {
                cursor = (cursor + 1).min(COLS - 1);
                None
            }
            KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Down => Some(cursor),
            KeyCode::Char('r') => {
                note = match client.request_reset() {
                    Ok(()) => String::new(),
                    Err(e) => e.to_string(),
                };
                None
            }
            KeyCode::Char('p') => {
                note = match client.send_ping() {
                    Ok(()) => format!("Ping sent ({} pongs so far)", client.pong_count()),
                    Err(e) => e.to_string(),
                };
                None
            }
            KeyCode::Char(c) => c
                .to_digit(10)
                .and_then(|d| (d as usize).checked_sub(1))
                .filter(|&col| col < COLS),
            _ => None,
        };

        if let Some(col) = column {
            cursor = col;
            note = match client.send_move(col as i32) {
                Ok(()) => String::new(),
                Err(e) => e.to_string(),
            };
        }
    }
}
