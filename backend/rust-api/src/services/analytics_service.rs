//! Analytics aggregation over submitted assessments and game progress.
//!
//! Writes are idempotent upserts keyed by the composite (user, game, level)
//! id, so the fire-and-forget trigger from the submit path can retry or
//! race without duplicating rows.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::{Collection, Database};

use crate::config::Config;
use crate::errors::ApiError;
use crate::models::analytics::{
    AdminAnalytics, AnalyticsOverview, AnalyticsRecord, GameAnalytics, UserAnalytics,
};
use crate::models::assessment::{Assessment, Question};
use crate::models::progress::GameProgress;
use crate::models::{AssessmentKind, GameType};
use crate::services::gemini::{GeminiService, InsightGenerator};
use crate::services::taxonomy::KeywordTaxonomy;
use crate::utils::time::chrono_to_bson;

const PRE_INSIGHT_PLACEHOLDER: &str =
    "Pre-assessment completed. Complete the post-assessment for full insights.";

const RECENT_ASSESSMENTS_LIMIT: i64 = 10;
const RECENT_ACTIVITY_LIMIT: usize = 20;

pub struct AnalyticsService {
    mongo: Database,
    insights: Arc<dyn InsightGenerator>,
    taxonomy: KeywordTaxonomy,
}

impl AnalyticsService {
    pub fn new(mongo: Database, config: &Config) -> Self {
        Self {
            mongo,
            insights: Arc::new(GeminiService::new(config)),
            taxonomy: KeywordTaxonomy::default(),
        }
    }

    /// Seam for swapping the insight generator (tests, alternative providers).
    pub fn with_insight_generator(mongo: Database, insights: Arc<dyn InsightGenerator>) -> Self {
        Self {
            mongo,
            insights,
            taxonomy: KeywordTaxonomy::default(),
        }
    }

    fn analytics(&self) -> Collection<AnalyticsRecord> {
        self.mongo.collection("analytics")
    }

    fn assessments(&self) -> Collection<Assessment> {
        self.mongo.collection("assessments")
    }

    fn progress(&self) -> Collection<GameProgress> {
        self.mongo.collection("game_progress")
    }

    async fn find_submitted_assessment(
        &self,
        user_id: &str,
        game_type: GameType,
        level: u32,
        kind: AssessmentKind,
    ) -> Result<Option<Assessment>, ApiError> {
        let assessment = self
            .assessments()
            .find_one(doc! {
                "user_id": user_id,
                "game_type": game_type.as_str(),
                "level": level,
                "kind": kind.as_str(),
                "completed_at": { "$ne": null },
            })
            .await
            .context("Failed to look up submitted assessment")?;
        Ok(assessment)
    }

    async fn find_progress(
        &self,
        user_id: &str,
        game_type: GameType,
    ) -> Result<Option<GameProgress>, ApiError> {
        let progress = self
            .progress()
            .find_one(doc! { "user_id": user_id, "game_type": game_type.as_str() })
            .await
            .context("Failed to look up game progress")?;
        Ok(progress)
    }

    async fn read_back(&self, id: &str) -> Result<AnalyticsRecord, ApiError> {
        let record = self
            .analytics()
            .find_one(doc! { "_id": id })
            .await
            .context("Failed to read back analytics record")?
            .ok_or_else(|| anyhow::anyhow!("Analytics record missing after upsert"))?;
        Ok(record)
    }

    /// Baseline analytics after a pre-assessment submission. Resets the
    /// comparison fields but leaves any existing `completion_date` alone,
    /// so a redone pre-assessment does not un-complete a level.
    pub async fn store_pre_assessment_analytics(
        &self,
        user_id: &str,
        game_type: GameType,
        level: u32,
    ) -> Result<AnalyticsRecord, ApiError> {
        let pre = self
            .find_submitted_assessment(user_id, game_type, level, AssessmentKind::Pre)
            .await?
            .ok_or_else(|| ApiError::NotFound("Pre-assessment not found".to_string()))?;

        let progress = self.find_progress(user_id, game_type).await?;
        let (attempts, success_rate, total_play_time) = progress_stats(progress.as_ref());

        let weak_areas = self.taxonomy.weak_areas(&pre.questions);
        let strength_areas = self.taxonomy.strength_areas(&pre.questions);

        let id = AnalyticsRecord::record_id(user_id, game_type, level);
        let update = doc! {
            "$set": {
                "user_id": user_id,
                "game_type": game_type.as_str(),
                "level": level,
                "pre_assessment_score": pre.score,
                "post_assessment_score": 0u32,
                "improvement_percentage": 0.0,
                "attempts": attempts,
                "success_rate": success_rate,
                "average_time_per_level": pre.time_spent as i64,
                "skills_improved": Vec::<String>::new(),
                "weak_areas": weak_areas,
                "strength_areas": strength_areas,
                "total_play_time": total_play_time as i64,
                "badges_earned": Vec::<String>::new(),
                "ai_generated_insights": PRE_INSIGHT_PLACEHOLDER,
                "last_updated": chrono_to_bson(Utc::now()),
            }
        };

        self.analytics()
            .update_one(doc! { "_id": &id }, update)
            .upsert(true)
            .await
            .context("Failed to upsert pre-assessment analytics")?;

        tracing::info!(
            user_id,
            game = %game_type,
            level,
            score = pre.score,
            "Stored pre-assessment analytics baseline"
        );

        self.read_back(&id).await
    }

    /// Full analytics derivation once both assessments for the tuple are
    /// submitted. Stamps `completion_date` and produces the AI insight.
    pub async fn update_analytics(
        &self,
        user_id: &str,
        game_type: GameType,
        level: u32,
    ) -> Result<AnalyticsRecord, ApiError> {
        let pre = self
            .find_submitted_assessment(user_id, game_type, level, AssessmentKind::Pre)
            .await?;
        let post = self
            .find_submitted_assessment(user_id, game_type, level, AssessmentKind::Post)
            .await?;

        let (Some(pre), Some(post)) = (pre, post) else {
            return Err(ApiError::MissingPrerequisite(
                "Both pre and post assessments are required for analytics".to_string(),
            ));
        };

        let progress = self.find_progress(user_id, game_type).await?;
        let (attempts, success_rate, total_play_time) = progress_stats(progress.as_ref());
        let levels_completed = progress
            .as_ref()
            .map(|p| p.completed_levels.len())
            .unwrap_or(0);

        let improvement = improvement_percentage(pre.score, post.score);
        let weak_areas = self.taxonomy.weak_areas(&post.questions);
        let strength_areas = self.taxonomy.strength_areas(&post.questions);
        let skills_improved =
            improved_skills(&pre.questions, &post.questions, pre.score, post.score);
        // Badge thresholds read the raw score delta, not the relative
        // improvement percentage.
        let badges = calculate_badges(
            post.score as i64 - pre.score as i64,
            post.score,
            levels_completed,
        );

        let insight = self
            .insights
            .generate_insight(game_type, pre.score, post.score, &weak_areas, &strength_areas)
            .await;

        let id = AnalyticsRecord::record_id(user_id, game_type, level);
        let update = doc! {
            "$set": {
                "user_id": user_id,
                "game_type": game_type.as_str(),
                "level": level,
                "pre_assessment_score": pre.score,
                "post_assessment_score": post.score,
                "improvement_percentage": improvement,
                "attempts": attempts,
                "success_rate": success_rate,
                "average_time_per_level": ((pre.time_spent + post.time_spent) / 2) as i64,
                "skills_improved": skills_improved,
                "weak_areas": weak_areas,
                "strength_areas": strength_areas,
                "completion_date": chrono_to_bson(Utc::now()),
                "total_play_time": total_play_time as i64,
                "badges_earned": badges,
                "ai_generated_insights": insight,
                "last_updated": chrono_to_bson(Utc::now()),
            }
        };

        self.analytics()
            .update_one(doc! { "_id": &id }, update)
            .upsert(true)
            .await
            .context("Failed to upsert analytics record")?;

        tracing::info!(
            user_id,
            game = %game_type,
            level,
            improvement,
            "Updated analytics after post-assessment"
        );

        self.read_back(&id).await
    }

    pub async fn get_user_analytics(&self, user_id: &str) -> Result<UserAnalytics, ApiError> {
        let records: Vec<AnalyticsRecord> = self
            .analytics()
            .find(doc! { "user_id": user_id })
            .sort(doc! { "last_updated": -1 })
            .await
            .context("Failed to query user analytics")?
            .try_collect()
            .await
            .context("Failed to read user analytics cursor")?;

        let progress_by_game: Vec<GameProgress> = self
            .progress()
            .find(doc! { "user_id": user_id })
            .await
            .context("Failed to query game progress")?
            .try_collect()
            .await
            .context("Failed to read game progress cursor")?;

        let recent_assessments: Vec<Assessment> = self
            .assessments()
            .find(doc! { "user_id": user_id, "completed_at": { "$ne": null } })
            .sort(doc! { "completed_at": -1 })
            .limit(RECENT_ASSESSMENTS_LIMIT)
            .await
            .context("Failed to query recent assessments")?
            .try_collect()
            .await
            .context("Failed to read recent assessments cursor")?;

        let total_levels_completed = progress_by_game
            .iter()
            .map(|p| p.completed_levels.len())
            .sum();
        let total_play_time = progress_by_game.iter().map(|p| p.time_spent).sum();
        let badges = dedup_badges(&records);

        let overview = AnalyticsOverview {
            total_games_played: records.len(),
            total_levels_completed,
            total_play_time,
            average_improvement: mean_improvement(&records),
            total_badges: badges.len(),
            badges,
        };

        Ok(UserAnalytics {
            overview,
            game_analytics: records,
            recent_assessments,
            progress_by_game,
        })
    }

    pub async fn get_game_analytics(
        &self,
        user_id: &str,
        game_type: GameType,
    ) -> Result<GameAnalytics, ApiError> {
        let analytics: Vec<AnalyticsRecord> = self
            .analytics()
            .find(doc! { "user_id": user_id, "game_type": game_type.as_str() })
            .sort(doc! { "level": 1 })
            .await
            .context("Failed to query game analytics")?
            .try_collect()
            .await
            .context("Failed to read game analytics cursor")?;

        let progress = self.find_progress(user_id, game_type).await?;

        let assessments: Vec<Assessment> = self
            .assessments()
            .find(doc! { "user_id": user_id, "game_type": game_type.as_str() })
            .sort(doc! { "level": 1, "kind": 1 })
            .await
            .context("Failed to query game assessments")?
            .try_collect()
            .await
            .context("Failed to read game assessments cursor")?;

        Ok(GameAnalytics {
            analytics,
            progress,
            assessments,
        })
    }

    /// Platform-wide aggregation. The analytics collection is one row per
    /// completed (user, game, level), small enough to scan.
    pub async fn get_admin_analytics(&self) -> Result<AdminAnalytics, ApiError> {
        let records: Vec<AnalyticsRecord> = self
            .analytics()
            .find(doc! {})
            .sort(doc! { "last_updated": -1 })
            .await
            .context("Failed to query analytics records")?
            .try_collect()
            .await
            .context("Failed to read analytics cursor")?;

        let users: HashSet<&str> = records.iter().map(|r| r.user_id.as_str()).collect();
        let total_users = users.len();

        let mut game_popularity: HashMap<String, u64> = HashMap::new();
        for record in &records {
            *game_popularity
                .entry(record.game_type.as_str().to_string())
                .or_insert(0) += 1;
        }

        let total_play_time = records.iter().map(|r| r.total_play_time).sum();
        let average_improvement = mean_improvement(&records);

        let mut recent_activity = records;
        recent_activity.truncate(RECENT_ACTIVITY_LIMIT);

        Ok(AdminAnalytics {
            total_users,
            total_games_played: game_popularity.values().map(|c| *c as usize).sum(),
            average_improvement,
            total_play_time,
            game_popularity,
            recent_activity,
        })
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Relative improvement over the pre-assessment baseline, in percent.
/// A zero baseline cannot divide; any post score above it counts as 100%.
fn improvement_percentage(pre_score: u32, post_score: u32) -> f64 {
    if pre_score == 0 {
        return if post_score > 0 { 100.0 } else { 0.0 };
    }
    round2((post_score as f64 - pre_score as f64) / pre_score as f64 * 100.0)
}

/// Skills the post-assessment shows mastered that the pre-assessment did
/// not. Never empty, so the record always has something to show.
fn improved_skills(
    pre_questions: &[Question],
    post_questions: &[Question],
    pre_score: u32,
    post_score: u32,
) -> Vec<String> {
    let mut skills = Vec::new();
    for (i, post_question) in post_questions.iter().enumerate() {
        let pre_correct = pre_questions
            .get(i)
            .and_then(|q| q.is_correct)
            .unwrap_or(false);
        if post_question.is_correct == Some(true) && !pre_correct {
            skills.push(format!("Question {} mastery", i + 1));
        }
    }
    if post_score > pre_score {
        skills.push("Overall Understanding".to_string());
    }
    if skills.is_empty() {
        skills.push("Continued Learning".to_string());
    }
    skills
}

/// Thresholds are additive, not mutually exclusive: a 100% post score
/// earns both Near Perfect and Perfect Score. `improvement` is the raw
/// post-minus-pre score delta.
fn calculate_badges(improvement: i64, post_score: u32, levels_completed: usize) -> Vec<String> {
    let mut badges = Vec::new();

    if improvement >= 30 {
        badges.push("Quick Learner".to_string());
    }
    if improvement >= 50 {
        badges.push("Outstanding Improvement".to_string());
    }

    if post_score >= 90 {
        badges.push("Near Perfect".to_string());
    }
    if post_score == 100 {
        badges.push("Perfect Score".to_string());
    }

    if levels_completed >= 5 {
        badges.push("Dedicated Player".to_string());
    }
    if levels_completed >= 10 {
        badges.push("Game Master".to_string());
    }

    badges
}

fn progress_stats(progress: Option<&GameProgress>) -> (u32, f64, u64) {
    match progress {
        Some(p) => {
            let attempts = p.completed_levels.len() as u32 + 1;
            let success_rate = if p.current_level == 0 {
                0.0
            } else {
                round2(p.completed_levels.len() as f64 / p.current_level as f64 * 100.0)
            };
            (attempts, success_rate, p.time_spent)
        }
        None => (1, 0.0, 0),
    }
}

fn mean_improvement(records: &[AnalyticsRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    round2(
        records.iter().map(|r| r.improvement_percentage).sum::<f64>() / records.len() as f64,
    )
}

fn dedup_badges(records: &[AnalyticsRecord]) -> Vec<String> {
    let mut badges: Vec<String> = Vec::new();
    for record in records {
        for badge in &record.badges_earned {
            if !badges.contains(badge) {
                badges.push(badge.clone());
            }
        }
    }
    badges
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn question(is_correct: Option<bool>) -> Question {
        Question {
            question: "Q?".to_string(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_answer_index: 0,
            user_answer: is_correct.map(|_| 0),
            is_correct,
        }
    }

    fn record(improvement: f64, badges: &[&str]) -> AnalyticsRecord {
        AnalyticsRecord {
            id: "u:phishing:1".to_string(),
            user_id: "u".to_string(),
            game_type: GameType::Phishing,
            level: 1,
            pre_assessment_score: 0,
            post_assessment_score: 0,
            improvement_percentage: improvement,
            attempts: 1,
            success_rate: 0.0,
            average_time_per_level: 0,
            skills_improved: vec![],
            weak_areas: vec![],
            strength_areas: vec![],
            completion_date: None,
            total_play_time: 0,
            badges_earned: badges.iter().map(|b| b.to_string()).collect(),
            ai_generated_insights: String::new(),
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn improvement_is_relative_to_baseline() {
        assert_eq!(improvement_percentage(50, 80), 60.0);
        assert_eq!(improvement_percentage(80, 60), -25.0);
        assert_eq!(improvement_percentage(60, 60), 0.0);
    }

    #[test]
    fn zero_baseline_does_not_divide() {
        assert_eq!(improvement_percentage(0, 0), 0.0);
        assert_eq!(improvement_percentage(0, 40), 100.0);
    }

    #[test]
    fn improvement_rounds_to_two_decimals() {
        // (100 - 33) / 33 * 100 = 203.0303...
        assert_eq!(improvement_percentage(33, 100), 203.03);
    }

    #[test]
    fn newly_correct_questions_become_mastered_skills() {
        let pre = vec![question(Some(false)), question(Some(true)), question(None)];
        let post = vec![question(Some(true)), question(Some(true)), question(Some(true))];

        let skills = improved_skills(&pre, &post, 33, 100);
        assert_eq!(
            skills,
            vec![
                "Question 1 mastery".to_string(),
                "Question 3 mastery".to_string(),
                "Overall Understanding".to_string(),
            ]
        );
    }

    #[test]
    fn no_improvement_still_yields_a_skill_entry() {
        let pre = vec![question(Some(true))];
        let post = vec![question(Some(true))];
        assert_eq!(improved_skills(&pre, &post, 100, 100), vec!["Continued Learning"]);
    }

    #[test]
    fn badges_match_threshold_brackets() {
        assert_eq!(
            calculate_badges(35, 95, 6),
            vec!["Quick Learner", "Near Perfect", "Dedicated Player"]
        );
        assert!(calculate_badges(10, 50, 1).is_empty());
        // Regressions never earn improvement badges.
        assert_eq!(calculate_badges(-40, 95, 0), vec!["Near Perfect"]);
    }

    #[test]
    fn badge_thresholds_stack() {
        assert_eq!(
            calculate_badges(55, 100, 12),
            vec![
                "Quick Learner",
                "Outstanding Improvement",
                "Near Perfect",
                "Perfect Score",
                "Dedicated Player",
                "Game Master",
            ]
        );
    }

    #[test]
    fn progress_stats_without_progress_default_to_first_attempt() {
        assert_eq!(progress_stats(None), (1, 0.0, 0));
    }

    #[test]
    fn progress_stats_guard_zero_current_level() {
        let progress = GameProgress {
            user_id: "u".to_string(),
            game_type: GameType::Judge,
            completed_levels: vec![1, 2, 3],
            current_level: 0,
            total_score: 0,
            time_spent: 120,
            last_played: None,
            game_specific_data: Default::default(),
        };
        assert_eq!(progress_stats(Some(&progress)), (4, 0.0, 120));
    }

    #[test]
    fn progress_stats_success_rate_is_completed_over_current() {
        let progress = GameProgress {
            user_id: "u".to_string(),
            game_type: GameType::Judge,
            completed_levels: vec![1, 2],
            current_level: 3,
            total_score: 0,
            time_spent: 60,
            last_played: None,
            game_specific_data: Default::default(),
        };
        let (attempts, success_rate, play_time) = progress_stats(Some(&progress));
        assert_eq!(attempts, 3);
        assert_eq!(success_rate, 66.67);
        assert_eq!(play_time, 60);
    }

    #[test]
    fn mean_improvement_guards_empty_set() {
        assert_eq!(mean_improvement(&[]), 0.0);
        let records = vec![record(60.0, &[]), record(30.0, &[])];
        assert_eq!(mean_improvement(&records), 45.0);
    }

    #[test]
    fn badges_dedup_preserves_first_seen_order() {
        let records = vec![
            record(0.0, &["Quick Learner", "Near Perfect"]),
            record(0.0, &["Quick Learner", "Game Master"]),
        ];
        assert_eq!(
            dedup_badges(&records),
            vec!["Quick Learner", "Near Perfect", "Game Master"]
        );
    }
}
