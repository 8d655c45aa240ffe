pub mod ai;
pub mod controller;
pub mod tui;

pub use ai::{AiPlayer, AiStrategy, Difficulty};
pub use controller::PlayerController;
pub use tui::TuiController;
