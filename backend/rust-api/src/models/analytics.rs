use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{
    assessment::Assessment,
    progress::GameProgress,
    GameType,
};

/// Derived comparison artifact for one (user, game, level). Exactly one
/// document per tuple; the composite `_id` makes upserts atomic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub game_type: GameType,
    pub level: u32,

    // Assessment comparison
    pub pre_assessment_score: u32,
    pub post_assessment_score: u32,
    pub improvement_percentage: f64,

    // Game performance
    pub attempts: u32,
    pub success_rate: f64,
    pub average_time_per_level: u64,

    // Detailed metrics
    pub skills_improved: Vec<String>,
    pub weak_areas: Vec<String>,
    pub strength_areas: Vec<String>,

    // Progress tracking
    #[serde(
        default,
        with = "crate::utils::time::optional_bson_datetime_as_chrono"
    )]
    pub completion_date: Option<DateTime<Utc>>,
    pub total_play_time: u64,

    pub badges_earned: Vec<String>,
    pub ai_generated_insights: String,
    #[serde(with = "crate::utils::time::bson_datetime_as_chrono")]
    pub last_updated: DateTime<Utc>,
}

impl AnalyticsRecord {
    /// Unique key for one (user, game, level) tuple.
    pub fn record_id(user_id: &str, game_type: GameType, level: u32) -> String {
        format!("{}:{}:{}", user_id, game_type, level)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAnalyticsRequest {
    pub game_type: GameType,
    #[validate(range(min = 1, message = "Level must be a positive integer"))]
    pub level: u32,
}

#[derive(Debug, Serialize)]
pub struct AnalyticsOverview {
    pub total_games_played: usize,
    pub total_levels_completed: usize,
    pub total_play_time: u64,
    pub average_improvement: f64,
    pub total_badges: usize,
    pub badges: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct UserAnalytics {
    pub overview: AnalyticsOverview,
    pub game_analytics: Vec<AnalyticsRecord>,
    pub recent_assessments: Vec<Assessment>,
    pub progress_by_game: Vec<GameProgress>,
}

#[derive(Debug, Serialize)]
pub struct GameAnalytics {
    pub analytics: Vec<AnalyticsRecord>,
    pub progress: Option<GameProgress>,
    pub assessments: Vec<Assessment>,
}

#[derive(Debug, Serialize)]
pub struct AdminAnalytics {
    pub total_users: usize,
    pub total_games_played: usize,
    pub average_improvement: f64,
    pub total_play_time: u64,
    pub game_popularity: HashMap<String, u64>,
    pub recent_activity: Vec<AnalyticsRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_id_is_composite_tuple_key() {
        assert_eq!(
            AnalyticsRecord::record_id("u42", GameType::Phishing, 3),
            "u42:phishing:3"
        );
    }
}
