//! Runs AI-vs-AI games and saves the statistics.
//!
//! Usage: selfplay [num_games] [ai1] [ai2]
//! where each AI is `random` or `minimax:<depth>` (default `minimax:4` vs `random`).

use connect_four::config::AppConfig;
use connect_four::player::ai::AiStrategy;
use connect_four::selfplay::{run_selfplay, save_stats, SelfPlayConfig, Side};
use std::env;

fn parse_strategy(arg: &str) -> anyhow::Result<AiStrategy> {
    match arg.split_once(':') {
        None if arg == "random" => Ok(AiStrategy::Random),
        Some(("minimax", depth)) => Ok(AiStrategy::Minimax {
            depth: depth.parse()?,
        }),
        _ => anyhow::bail!("unknown AI {:?} (expected random or minimax:<depth>)", arg),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        eprintln!("Usage: selfplay [num_games] [random|minimax:<depth>] [random|minimax:<depth>]");
        return Ok(());
    }

    let app = AppConfig::load_or_default();
    let mut config = SelfPlayConfig {
        weights: app.ai.weights,
        ..SelfPlayConfig::default()
    };
    if let Some(n) = args.get(1) {
        config.num_games = n.parse()?;
    }
    if let Some(ai1) = args.get(2) {
        config.ai1 = parse_strategy(ai1)?;
    }
    if let Some(ai2) = args.get(3) {
        config.ai2 = parse_strategy(ai2)?;
    }

    let stats = run_selfplay(config)?;

    println!("=== Self-Play Results ===");
    println!("Games: {}", stats.total_games);
    println!(
        "AI1 {}: {} wins ({:.1}%)",
        stats.ai1,
        stats.ai1_wins,
        stats.win_rate(Side::Ai1) * 100.0
    );
    println!(
        "AI2 {}: {} wins ({:.1}%)",
        stats.ai2,
        stats.ai2_wins,
        stats.win_rate(Side::Ai2) * 100.0
    );
    println!("Draws: {}", stats.draws);
    println!("First player wins: {}", stats.first_player_wins);
    println!("Avg Moves: {:.1}", stats.avg_moves);
    println!("Avg Time: {:.1}ms", stats.avg_time_ms);

    let path = save_stats(&stats)?;
    println!("Saved to {}", path.display());
    Ok(())
}
