use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{AssessmentKind, GameType};

/// One multiple-choice question. `user_answer` and `is_correct` stay unset
/// until submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer_index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_answer: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
}

impl Question {
    pub fn new(question: impl Into<String>, options: Vec<String>, correct_answer_index: u32) -> Self {
        Self {
            question: question.into(),
            options,
            correct_answer_index,
            user_answer: None,
            is_correct: None,
        }
    }
}

/// Stored assessment document. At most one row exists per
/// (user_id, game_type, level, kind); generation replaces stale rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub game_type: GameType,
    pub level: u32,
    pub kind: AssessmentKind,
    pub questions: Vec<Question>,
    pub score: u32,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub time_spent: u64,
    #[serde(
        default,
        with = "crate::utils::time::optional_bson_datetime_as_chrono"
    )]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(with = "crate::utils::time::bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
}

impl Assessment {
    /// Submission is recorded exactly once by setting `completed_at`; the
    /// document is immutable afterwards.
    pub fn is_submitted(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Pre-submission projection sent to the client. Never carries
/// `correct_answer_index`.
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub question: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicAssessment {
    pub id: String,
    pub game_type: GameType,
    pub level: u32,
    pub kind: AssessmentKind,
    pub questions: Vec<PublicQuestion>,
    pub total_questions: u32,
}

impl From<&Assessment> for PublicAssessment {
    fn from(assessment: &Assessment) -> Self {
        Self {
            id: assessment.id.clone(),
            game_type: assessment.game_type,
            level: assessment.level,
            kind: assessment.kind,
            questions: assessment
                .questions
                .iter()
                .map(|q| PublicQuestion {
                    question: q.question.clone(),
                    options: q.options.clone(),
                })
                .collect(),
            total_questions: assessment.total_questions,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateAssessmentRequest {
    pub game_type: GameType,
    #[validate(range(min = 1, message = "Level must be a positive integer"))]
    pub level: u32,
    pub kind: AssessmentKind,
    #[serde(default)]
    pub force_regenerate: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAssessmentRequest {
    #[validate(length(min = 1, message = "Assessment ID is required"))]
    pub assessment_id: String,
    /// One slot per question; `null` marks an unanswered question.
    pub answers: Vec<Option<i64>>,
    #[serde(default)]
    pub time_spent: i64,
}

/// Post-submission view, correct indices included for review.
#[derive(Debug, Serialize)]
pub struct SubmittedAssessment {
    pub id: String,
    pub score: u32,
    pub correct_answers: u32,
    pub total_questions: u32,
    pub questions: Vec<Question>,
    pub kind: AssessmentKind,
}

impl From<&Assessment> for SubmittedAssessment {
    fn from(assessment: &Assessment) -> Self {
        Self {
            id: assessment.id.clone(),
            score: assessment.score,
            correct_answers: assessment.correct_answers,
            total_questions: assessment.total_questions,
            questions: assessment.questions.clone(),
            kind: assessment.kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_assessment() -> Assessment {
        Assessment {
            id: "a1".to_string(),
            user_id: "u1".to_string(),
            game_type: GameType::Phishing,
            level: 1,
            kind: AssessmentKind::Pre,
            questions: vec![Question::new(
                "What is spear phishing?",
                vec!["A".into(), "B".into(), "C".into(), "D".into()],
                1,
            )],
            score: 0,
            total_questions: 1,
            correct_answers: 0,
            time_spent: 0,
            completed_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn public_projection_hides_correct_answers() {
        let assessment = sample_assessment();
        let public = PublicAssessment::from(&assessment);
        let json = serde_json::to_value(&public).unwrap();
        let questions = json["questions"].as_array().unwrap();
        assert_eq!(questions.len(), 1);
        assert!(questions[0].get("correct_answer_index").is_none());
        assert!(questions[0].get("user_answer").is_none());
        assert_eq!(questions[0]["options"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn submission_state_follows_completed_at() {
        let mut assessment = sample_assessment();
        assert!(!assessment.is_submitted());
        assessment.completed_at = Some(Utc::now());
        assert!(assessment.is_submitted());
    }

    #[test]
    fn submit_request_accepts_null_answers() {
        let req: SubmitAssessmentRequest =
            serde_json::from_str(r#"{"assessment_id":"a1","answers":[0,null,3]}"#).unwrap();
        assert_eq!(req.answers, vec![Some(0), None, Some(3)]);
        assert_eq!(req.time_spent, 0);
    }
}
