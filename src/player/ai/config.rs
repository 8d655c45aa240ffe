use super::eval::EvalWeights;
use super::{AiStrategy, Difficulty};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AIConfig {
    pub medium_depth: u32,
    pub hard_depth: u32,
    pub weights: EvalWeights,
}

impl Default for AIConfig {
    fn default() -> Self {
        AIConfig {
            medium_depth: 4,
            hard_depth: 6,
            weights: EvalWeights::default(),
        }
    }
}

impl AIConfig {
    pub fn strategy_for(&self, difficulty: Difficulty) -> AiStrategy {
        match difficulty {
            Difficulty::Easy => AiStrategy::Random,
            Difficulty::Medium => AiStrategy::Minimax {
                depth: self.medium_depth,
            },
            Difficulty::Hard => AiStrategy::Minimax {
                depth: self.hard_depth,
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.medium_depth == 0 || self.hard_depth == 0 {
            return Err(ConfigError::Validation(
                "search depths must be >= 1".to_string(),
            ));
        }
        // 7^10 nodes is already far too slow for interactive play
        if self.hard_depth > 10 || self.medium_depth > 10 {
            return Err(ConfigError::Validation(
                "search depths must be <= 10".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_mapping() {
        let config = AIConfig::default();
        assert_eq!(config.strategy_for(Difficulty::Easy), AiStrategy::Random);
        assert_eq!(
            config.strategy_for(Difficulty::Medium),
            AiStrategy::Minimax { depth: 4 }
        );
        assert_eq!(
            config.strategy_for(Difficulty::Hard),
            AiStrategy::Minimax { depth: 6 }
        );
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: AIConfig = serde_json::from_str(r#"{"hard_depth": 8}"#).unwrap();
        assert_eq!(config.hard_depth, 8);
        assert_eq!(config.medium_depth, 4);
        assert_eq!(config.weights, EvalWeights::default());
    }

    #[test]
    fn rejects_zero_depth() {
        let config = AIConfig {
            medium_depth: 0,
            ..AIConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
