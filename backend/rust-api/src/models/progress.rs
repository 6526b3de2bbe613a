use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::GameType;

/// Per-game metric value. Each game documents its own keys; the value space
/// is deliberately closed instead of an untyped blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GameMetric {
    Flag(bool),
    Number(f64),
    Text(String),
    Series(Vec<f64>),
}

/// Per (user, game) progress record. This service only reads it; level
/// completion and scoring are written by the game-progress collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameProgress {
    pub user_id: String,
    pub game_type: GameType,
    #[serde(default)]
    pub completed_levels: Vec<u32>,
    #[serde(default = "default_level")]
    pub current_level: u32,
    #[serde(default)]
    pub total_score: i64,
    #[serde(default)]
    pub time_spent: u64,
    #[serde(
        default,
        with = "crate::utils::time::optional_bson_datetime_as_chrono"
    )]
    pub last_played: Option<DateTime<Utc>>,
    #[serde(default)]
    pub game_specific_data: HashMap<String, GameMetric>,
}

fn default_level() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_values_deserialize_untagged() {
        let json = r#"{
            "user_id": "u1",
            "game_type": "judge",
            "completed_levels": [1, 2],
            "current_level": 3,
            "last_played": null,
            "game_specific_data": {
                "cases_reviewed": 7.0,
                "verdict_streak": [1.0, 1.0, 0.0],
                "tutorial_done": true,
                "last_verdict": "guilty"
            }
        }"#;

        let progress: GameProgress = serde_json::from_str(json).unwrap();
        assert_eq!(progress.completed_levels, vec![1, 2]);
        assert_eq!(
            progress.game_specific_data["cases_reviewed"],
            GameMetric::Number(7.0)
        );
        assert_eq!(
            progress.game_specific_data["tutorial_done"],
            GameMetric::Flag(true)
        );
        assert_eq!(
            progress.game_specific_data["verdict_streak"],
            GameMetric::Series(vec![1.0, 1.0, 0.0])
        );
        assert_eq!(
            progress.game_specific_data["last_verdict"],
            GameMetric::Text("guilty".to_string())
        );
    }

    #[test]
    fn missing_fields_take_defaults() {
        let json = r#"{"user_id":"u1","game_type":"laws","last_played":null}"#;
        let progress: GameProgress = serde_json::from_str(json).unwrap();
        assert_eq!(progress.current_level, 1);
        assert!(progress.completed_levels.is_empty());
        assert_eq!(progress.time_spent, 0);
    }
}
