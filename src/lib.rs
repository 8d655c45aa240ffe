//! Connect four: game model, minimax search and a line-based TCP protocol
//! for two-player network matches.

pub mod config;
pub mod core;
pub mod display;
pub mod error;
pub mod game;
pub mod logic;
pub mod network;
pub mod player;
pub mod selfplay;
