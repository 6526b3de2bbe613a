use anyhow::Context;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::Database;
use redis::aio::ConnectionManager;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::Config;
use crate::errors::ApiError;
use crate::metrics::{record_analytics_update, record_generation, ASSESSMENTS_SUBMITTED_TOTAL, QUESTION_SOURCE_FAILURES_TOTAL};
use crate::models::assessment::{
    Assessment, GenerateAssessmentRequest, PublicAssessment, Question, SubmitAssessmentRequest,
    SubmittedAssessment,
};
use crate::models::AssessmentKind;
use crate::services::analytics_service::AnalyticsService;
use crate::services::gemini::{GeminiService, QuestionSource, QuestionSourceError};
use crate::services::question_bank;
use crate::utils::retry::{retry_async_with_config, RetryConfig};
use crate::utils::time::chrono_to_bson;

const NUMBER_OF_QUESTIONS: usize = 5;
const GENERATION_LOCK_TTL_SECS: u64 = 30;

pub struct AssessmentService {
    mongo: Database,
    redis: ConnectionManager,
    config: Config,
    questions: Arc<dyn QuestionSource>,
}

impl AssessmentService {
    pub fn new(mongo: Database, redis: ConnectionManager, config: Config) -> Self {
        let questions = Arc::new(GeminiService::new(&config));
        Self {
            mongo,
            redis,
            config,
            questions,
        }
    }

    /// Seam for swapping the question source (tests, alternative providers).
    pub fn with_question_source(
        mongo: Database,
        redis: ConnectionManager,
        config: Config,
        questions: Arc<dyn QuestionSource>,
    ) -> Self {
        Self {
            mongo,
            redis,
            config,
            questions,
        }
    }

    fn collection(&self) -> mongodb::Collection<Assessment> {
        self.mongo.collection("assessments")
    }

    /// Generates (or returns the cached) assessment for one identity tuple.
    /// Returns the public projection and whether a new document was created.
    pub async fn generate(
        &self,
        user_id: &str,
        req: &GenerateAssessmentRequest,
    ) -> Result<(PublicAssessment, bool), ApiError> {
        // The find-or-create below is not atomic on its own; a per-tuple
        // Redis lock serializes concurrent generation requests so they
        // cannot duplicate or orphan assessment rows.
        let lock_key = format!(
            "assessment:lock:{}:{}:{}:{}",
            user_id, req.game_type, req.level, req.kind
        );

        if !self.try_acquire_lock(&lock_key).await? {
            return Err(ApiError::Conflict(
                "Assessment generation already in progress for this level".to_string(),
            ));
        }

        let result = self.generate_locked(user_id, req).await;
        self.release_lock(&lock_key).await;
        result
    }

    async fn generate_locked(
        &self,
        user_id: &str,
        req: &GenerateAssessmentRequest,
    ) -> Result<(PublicAssessment, bool), ApiError> {
        let filter = doc! {
            "user_id": user_id,
            "game_type": req.game_type.as_str(),
            "level": req.level,
            "kind": req.kind.as_str(),
        };

        if let Some(existing) = self
            .collection()
            .find_one(filter.clone())
            .await
            .context("Failed to look up existing assessment")?
        {
            if !existing.is_submitted() && !req.force_regenerate {
                // Unsubmitted assessment already exists: return it without a
                // new external call. Repeated generation requests are served
                // from this cache until submission.
                tracing::info!(
                    assessment_id = %existing.id,
                    "Returning cached assessment to save question source quota"
                );
                record_generation(req.kind.as_str(), "cache");
                return Ok((PublicAssessment::from(&existing), false));
            }

            tracing::info!(
                assessment_id = %existing.id,
                force_regenerate = req.force_regenerate,
                "Deleting stale assessment before regeneration"
            );
            self.collection()
                .delete_one(doc! { "_id": &existing.id })
                .await
                .context("Failed to delete stale assessment")?;
        }

        let questions = match self
            .questions
            .generate_questions(req.game_type, req.level, req.kind, NUMBER_OF_QUESTIONS)
            .await
        {
            Ok(questions) => {
                record_generation(req.kind.as_str(), "gemini");
                questions
            }
            Err(QuestionSourceError::MissingCredentials) => {
                QUESTION_SOURCE_FAILURES_TOTAL
                    .with_label_values(&["missing_credentials"])
                    .inc();
                return Err(ApiError::ServiceUnavailable(
                    "Online question generation failed. Check question source configuration."
                        .to_string(),
                ));
            }
            Err(e) => {
                // Degraded service, not an error: the static bank keeps the
                // assessment flow available when the online source fails.
                tracing::warn!(error = %e, game = %req.game_type, "Question source failed, using fallback bank");
                QUESTION_SOURCE_FAILURES_TOTAL
                    .with_label_values(&["fallback"])
                    .inc();
                record_generation(req.kind.as_str(), "fallback");
                question_bank::fallback_questions(req.game_type, NUMBER_OF_QUESTIONS)
            }
        };

        let assessment = Assessment {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            game_type: req.game_type,
            level: req.level,
            kind: req.kind,
            total_questions: questions.len() as u32,
            questions,
            score: 0,
            correct_answers: 0,
            time_spent: 0,
            completed_at: None,
            created_at: Utc::now(),
        };

        self.collection()
            .insert_one(&assessment)
            .await
            .context("Failed to persist generated assessment")?;

        Ok((PublicAssessment::from(&assessment), true))
    }

    /// Records the user's answers, scores the assessment and triggers the
    /// analytics derivation as a non-blocking side effect.
    pub async fn submit(
        &self,
        user_id: &str,
        req: &SubmitAssessmentRequest,
    ) -> Result<SubmittedAssessment, ApiError> {
        let mut assessment = self
            .collection()
            .find_one(doc! { "_id": &req.assessment_id, "user_id": user_id })
            .await
            .context("Failed to look up assessment")?
            .ok_or_else(|| ApiError::NotFound("Assessment not found".to_string()))?;

        if assessment.is_submitted()
            || assessment.questions.iter().all(|q| q.user_answer.is_some())
        {
            return Err(ApiError::Conflict(
                "Assessment already submitted".to_string(),
            ));
        }

        if req.answers.len() != assessment.total_questions as usize {
            return Err(ApiError::Validation(format!(
                "Answers must be an array of length {}",
                assessment.total_questions
            )));
        }

        let correct = apply_answers(&mut assessment.questions, &req.answers);
        assessment.correct_answers = correct;
        assessment.score = compute_score(correct, assessment.total_questions);
        assessment.time_spent = req.time_spent.max(0) as u64;
        let now = Utc::now();
        assessment.completed_at = Some(now);

        // Compare-and-set on the unsubmitted state: a concurrent submit
        // that won the race leaves nothing to match and gets the same
        // Conflict as the fast-path guard above.
        let questions = mongodb::bson::to_bson(&assessment.questions)
            .context("Failed to serialize scored questions")?;
        let updated = self
            .collection()
            .update_one(
                doc! {
                    "_id": &assessment.id,
                    "user_id": user_id,
                    "completed_at": mongodb::bson::Bson::Null,
                },
                doc! {
                    "$set": {
                        "questions": questions,
                        "score": assessment.score,
                        "correct_answers": assessment.correct_answers,
                        "time_spent": assessment.time_spent as i64,
                        "completed_at": chrono_to_bson(now),
                    }
                },
            )
            .await
            .context("Failed to persist submitted assessment")?;

        if updated.matched_count == 0 {
            return Err(ApiError::Conflict(
                "Assessment already submitted".to_string(),
            ));
        }

        ASSESSMENTS_SUBMITTED_TOTAL
            .with_label_values(&[assessment.kind.as_str()])
            .inc();

        tracing::info!(
            assessment_id = %assessment.id,
            kind = %assessment.kind,
            score = assessment.score,
            "Assessment submitted"
        );

        self.spawn_analytics_update(&assessment);

        Ok(SubmittedAssessment::from(&assessment))
    }

    /// Fire-and-forget analytics trigger. The submitter's score is the
    /// source of truth; derivation failures are logged and dropped after
    /// a single retry, never surfaced to the submit caller.
    fn spawn_analytics_update(&self, assessment: &Assessment) {
        let mongo = self.mongo.clone();
        let config = self.config.clone();
        let user_id = assessment.user_id.clone();
        let game_type = assessment.game_type;
        let level = assessment.level;
        let kind = assessment.kind;

        tokio::spawn(async move {
            let analytics = AnalyticsService::new(mongo, &config);
            let stage = kind.as_str();

            let result = retry_async_with_config(RetryConfig::single_retry(), || async {
                match kind {
                    AssessmentKind::Pre => analytics
                        .store_pre_assessment_analytics(&user_id, game_type, level)
                        .await
                        .map(|_| ()),
                    AssessmentKind::Post => analytics
                        .update_analytics(&user_id, game_type, level)
                        .await
                        .map(|_| ()),
                }
            })
            .await;

            match result {
                Ok(()) => {
                    record_analytics_update(stage, true);
                    tracing::info!(user_id = %user_id, game = %game_type, level, stage, "Analytics updated");
                }
                Err(e) => {
                    record_analytics_update(stage, false);
                    tracing::error!(user_id = %user_id, game = %game_type, level, stage, error = %e, "Analytics update failed");
                }
            }
        });
    }

    pub async fn get(&self, user_id: &str, assessment_id: &str) -> Result<Assessment, ApiError> {
        self.collection()
            .find_one(doc! { "_id": assessment_id, "user_id": user_id })
            .await
            .context("Failed to look up assessment")?
            .ok_or_else(|| ApiError::NotFound("Assessment not found".to_string()))
    }

    pub async fn list_all(&self, user_id: &str) -> Result<Vec<Assessment>, ApiError> {
        let assessments = self
            .collection()
            .find(doc! { "user_id": user_id })
            .sort(doc! { "completed_at": -1 })
            .await
            .context("Failed to query assessments")?
            .try_collect()
            .await
            .context("Failed to read assessments cursor")?;
        Ok(assessments)
    }

    pub async fn list_for_game(
        &self,
        user_id: &str,
        game_type: crate::models::GameType,
        level: u32,
    ) -> Result<Vec<Assessment>, ApiError> {
        let assessments = self
            .collection()
            .find(doc! {
                "user_id": user_id,
                "game_type": game_type.as_str(),
                "level": level,
            })
            .sort(doc! { "completed_at": -1 })
            .await
            .context("Failed to query game assessments")?
            .try_collect()
            .await
            .context("Failed to read game assessments cursor")?;
        Ok(assessments)
    }

    pub async fn delete(&self, user_id: &str, assessment_id: &str) -> Result<(), ApiError> {
        let deleted = self
            .collection()
            .delete_one(doc! { "_id": assessment_id, "user_id": user_id })
            .await
            .context("Failed to delete assessment")?;

        if deleted.deleted_count == 0 {
            return Err(ApiError::NotFound("Assessment not found".to_string()));
        }
        Ok(())
    }

    async fn try_acquire_lock(&self, key: &str) -> Result<bool, ApiError> {
        let mut conn = self.redis.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg("1")
            .arg("NX")
            .arg("EX")
            .arg(GENERATION_LOCK_TTL_SECS)
            .query_async(&mut conn)
            .await
            .context("Failed to acquire generation lock")?;
        Ok(reply.is_some())
    }

    async fn release_lock(&self, key: &str) {
        let mut conn = self.redis.clone();
        if let Err(e) = redis::cmd("DEL")
            .arg(key)
            .query_async::<()>(&mut conn)
            .await
        {
            // TTL will reap the lock if the delete fails.
            tracing::warn!(key, error = %e, "Failed to release generation lock");
        }
    }
}

/// Attaches answers to questions and returns the correct count. Lenient
/// per-answer policy: absent or out-of-range answers are skipped and count
/// as incorrect instead of rejecting the whole submission.
fn apply_answers(questions: &mut [Question], answers: &[Option<i64>]) -> u32 {
    let mut correct = 0;
    for (question, answer) in questions.iter_mut().zip(answers) {
        let Some(answer) = answer else { continue };
        if !(0..=3).contains(answer) {
            continue;
        }
        let answer = *answer as u32;
        question.user_answer = Some(answer);
        let is_correct = answer == question.correct_answer_index;
        question.is_correct = Some(is_correct);
        if is_correct {
            correct += 1;
        }
    }
    correct
}

fn compute_score(correct: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    ((correct as f64 / total as f64) * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn questions(correct_indices: &[u32]) -> Vec<Question> {
        correct_indices
            .iter()
            .enumerate()
            .map(|(i, &correct)| {
                Question::new(
                    format!("Question {}?", i + 1),
                    vec!["a".into(), "b".into(), "c".into(), "d".into()],
                    correct,
                )
            })
            .collect()
    }

    #[test]
    fn all_correct_answers_score_100() {
        let mut qs = questions(&[0, 1, 2, 3, 1]);
        let correct = apply_answers(
            &mut qs,
            &[Some(0), Some(1), Some(2), Some(3), Some(1)],
        );
        assert_eq!(correct, 5);
        assert_eq!(compute_score(correct, 5), 100);
        assert!(qs.iter().all(|q| q.is_correct == Some(true)));
    }

    #[test]
    fn all_wrong_answers_score_0() {
        let mut qs = questions(&[0, 0, 0]);
        let correct = apply_answers(&mut qs, &[Some(1), Some(2), Some(3)]);
        assert_eq!(correct, 0);
        assert_eq!(compute_score(correct, 3), 0);
    }

    #[test]
    fn partial_score_is_rounded() {
        let mut qs = questions(&[0, 0, 0]);
        let correct = apply_answers(&mut qs, &[Some(0), Some(1), Some(1)]);
        assert_eq!(correct, 1);
        // 1/3 of 100 rounds to 33
        assert_eq!(compute_score(correct, 3), 33);

        let mut qs = questions(&[0, 0, 0]);
        let correct = apply_answers(&mut qs, &[Some(0), Some(0), Some(1)]);
        // 2/3 of 100 rounds to 67
        assert_eq!(compute_score(correct, 3), 67);
        assert_eq!(correct, 2);
    }

    #[test]
    fn out_of_range_answers_are_skipped_not_rejected() {
        let mut qs = questions(&[1, 1]);
        let correct = apply_answers(&mut qs, &[Some(7), Some(1)]);
        assert_eq!(correct, 1);
        assert!(qs[0].user_answer.is_none());
        assert!(qs[0].is_correct.is_none());
        assert_eq!(qs[1].user_answer, Some(1));
    }

    #[test]
    fn absent_answers_are_skipped() {
        let mut qs = questions(&[2, 2]);
        let correct = apply_answers(&mut qs, &[None, Some(2)]);
        assert_eq!(correct, 1);
        assert!(qs[0].user_answer.is_none());
    }

    #[test]
    fn negative_answers_are_skipped() {
        let mut qs = questions(&[0]);
        let correct = apply_answers(&mut qs, &[Some(-1)]);
        assert_eq!(correct, 0);
        assert!(qs[0].user_answer.is_none());
    }

    #[test]
    fn score_is_always_within_bounds() {
        for total in 1..=10u32 {
            for correct in 0..=total {
                let score = compute_score(correct, total);
                assert!(score <= 100);
            }
        }
        assert_eq!(compute_score(0, 0), 0);
    }
}
