use crate::core::PlayerId;
use crate::game::Game;
use crate::player::ai::{AiPlayer, AiStrategy, EvalWeights};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;

pub const RESULTS_DIR: &str = "selfplay_results";

#[derive(Debug, Clone)]
pub struct SelfPlayConfig {
    pub num_games: usize,
    pub ai1: AiStrategy,
    pub ai2: AiStrategy,
    /// 偶数局は ai1 が先手, 奇数局は ai2 が先手
    pub alternate_first: bool,
    pub weights: EvalWeights,
}

impl Default for SelfPlayConfig {
    fn default() -> Self {
        Self {
            num_games: 10,
            ai1: AiStrategy::Minimax { depth: 4 },
            ai2: AiStrategy::Random,
            alternate_first: true,
            weights: EvalWeights::default(),
        }
    }
}

/// Which configured AI won a game, independent of colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Ai1,
    Ai2,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameResult {
    pub game_index: usize,
    /// Which AI played X (moved first).
    pub first: Side,
    pub winner: Option<Side>,
    pub moves: usize,
    pub time_ms: u128,
    /// 着手した列の列
    pub history: Vec<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelfPlayStats {
    pub total_games: usize,
    pub ai1_wins: usize,
    pub ai2_wins: usize,
    pub draws: usize,
    /// Wins by whichever side moved first.
    pub first_player_wins: usize,
    pub avg_moves: f64,
    pub avg_time_ms: f64,
    pub ai1: String,
    pub ai2: String,
    pub games: Vec<GameResult>,
}

impl SelfPlayStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_result(&mut self, result: GameResult) {
        self.total_games += 1;
        match result.winner {
            Some(Side::Ai1) => self.ai1_wins += 1,
            Some(Side::Ai2) => self.ai2_wins += 1,
            None => self.draws += 1,
        }
        if result.winner.is_some() && result.winner == Some(result.first) {
            self.first_player_wins += 1;
        }
        self.games.push(result);
        self.recalculate_averages();
    }

    fn recalculate_averages(&mut self) {
        if self.games.is_empty() {
            return;
        }
        let total_moves: usize = self.games.iter().map(|g| g.moves).sum();
        let total_time: u128 = self.games.iter().map(|g| g.time_ms).sum();
        self.avg_moves = total_moves as f64 / self.games.len() as f64;
        self.avg_time_ms = total_time as f64 / self.games.len() as f64;
    }

    pub fn win_rate(&self, side: Side) -> f64 {
        if self.total_games == 0 {
            return 0.0;
        }
        let wins = match side {
            Side::Ai1 => self.ai1_wins,
            Side::Ai2 => self.ai2_wins,
        };
        wins as f64 / self.total_games as f64
    }
}

fn strategy_label(strategy: AiStrategy) -> String {
    match strategy {
        AiStrategy::Random => "Random".to_string(),
        AiStrategy::Minimax { depth } => format!("Minimax(depth={})", depth),
    }
}

/// Plays `num_games` independent games in parallel.
pub fn run_selfplay(config: SelfPlayConfig) -> anyhow::Result<SelfPlayStats> {
    if config.num_games == 0 {
        anyhow::bail!("num_games must be at least 1");
    }
    tracing::info!(
        games = config.num_games,
        ai1 = %strategy_label(config.ai1),
        ai2 = %strategy_label(config.ai2),
        "self-play started"
    );

    let mut results: Vec<GameResult> = (0..config.num_games)
        .into_par_iter()
        .map(|index| play_one(&config, index))
        .collect();
    results.sort_by_key(|r| r.game_index);

    let mut stats = SelfPlayStats {
        ai1: strategy_label(config.ai1),
        ai2: strategy_label(config.ai2),
        ..SelfPlayStats::new()
    };
    for result in results {
        stats.add_result(result);
    }

    tracing::info!(
        ai1_wins = stats.ai1_wins,
        ai2_wins = stats.ai2_wins,
        draws = stats.draws,
        "self-play finished"
    );
    Ok(stats)
}

fn play_one(config: &SelfPlayConfig, index: usize) -> GameResult {
    let start = Instant::now();
    let first = if config.alternate_first && index % 2 == 1 {
        Side::Ai2
    } else {
        Side::Ai1
    };
    let (x_strategy, o_strategy) = match first {
        Side::Ai1 => (config.ai1, config.ai2),
        Side::Ai2 => (config.ai2, config.ai1),
    };

    let p1 = AiPlayer::new(PlayerId::Player1, "AI-X", x_strategy).with_weights(config.weights);
    let p2 = AiPlayer::new(PlayerId::Player2, "AI-O", o_strategy).with_weights(config.weights);

    let mut game = Game::new();
    let winner = game.play(&p1, &p2, |_, _| {}).map(|id| match (id, first) {
        (PlayerId::Player1, side) => side,
        (PlayerId::Player2, Side::Ai1) => Side::Ai2,
        (PlayerId::Player2, Side::Ai2) => Side::Ai1,
    });

    let result = GameResult {
        game_index: index,
        first,
        winner,
        moves: game.history.len(),
        time_ms: start.elapsed().as_millis(),
        history: game.history.clone(),
    };
    tracing::debug!(
        game = index + 1,
        winner = ?result.winner,
        moves = result.moves,
        "game finished"
    );
    result
}

/// Writes `stats` to `selfplay_results/<timestamp>.json` and returns the path.
pub fn save_stats(stats: &SelfPlayStats) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(RESULTS_DIR)?;
    let path = PathBuf::from(format!(
        "{}/{}.json",
        RESULTS_DIR,
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    ));
    let file = std::fs::File::create(&path)?;
    serde_json::to_writer_pretty(file, stats)?;
    tracing::info!(path = %path.display(), "self-play stats saved");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(first: Side, winner: Option<Side>, moves: usize) -> GameResult {
        GameResult {
            game_index: 0,
            first,
            winner,
            moves,
            time_ms: 10,
            history: Vec::new(),
        }
    }

    #[test]
    fn stats_accumulate() {
        let mut stats = SelfPlayStats::new();
        stats.add_result(result(Side::Ai1, Some(Side::Ai1), 7));
        stats.add_result(result(Side::Ai2, Some(Side::Ai1), 9));
        stats.add_result(result(Side::Ai1, None, 42));

        assert_eq!(stats.total_games, 3);
        assert_eq!(stats.ai1_wins, 2);
        assert_eq!(stats.ai2_wins, 0);
        assert_eq!(stats.draws, 1);
        assert_eq!(stats.first_player_wins, 1);
        assert!((stats.avg_moves - 58.0 / 3.0).abs() < 1e-9);
        assert!((stats.win_rate(Side::Ai1) - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn random_vs_random_completes() {
        let config = SelfPlayConfig {
            num_games: 6,
            ai1: AiStrategy::Random,
            ai2: AiStrategy::Random,
            ..SelfPlayConfig::default()
        };
        let stats = run_selfplay(config).unwrap();
        assert_eq!(stats.total_games, 6);
        assert_eq!(stats.ai1_wins + stats.ai2_wins + stats.draws, 6);
        for (i, game) in stats.games.iter().enumerate() {
            assert_eq!(game.game_index, i);
            assert!(game.moves >= 7 && game.moves <= 42);
        }
        // colours alternate
        assert_eq!(stats.games[0].first, Side::Ai1);
        assert_eq!(stats.games[1].first, Side::Ai2);
    }

    #[test]
    fn zero_games_is_an_error() {
        let config = SelfPlayConfig {
            num_games: 0,
            ..SelfPlayConfig::default()
        };
        assert!(run_selfplay(config).is_err());
    }
}
