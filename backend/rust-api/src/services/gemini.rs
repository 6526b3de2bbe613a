//! Gemini-backed question source and insight generator.
//!
//! Question generation is online-only: without an API key the call fails
//! with `MissingCredentials` and the lifecycle manager reports the
//! generation as unavailable. Malformed or failed responses are reported
//! as errors here; the lifecycle manager decides whether to fall back to
//! the static bank. Insight generation never fails — it degrades to a
//! templated string.

use async_trait::async_trait;
use lazy_static::lazy_static;
use rand::seq::IndexedRandom;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;

use crate::config::Config;
use crate::metrics::INSIGHTS_GENERATED_TOTAL;
use crate::models::{assessment::Question, AssessmentKind, GameType};

#[derive(Debug, thiserror::Error)]
pub enum QuestionSourceError {
    #[error("question source credentials are not configured")]
    MissingCredentials,
    #[error("question source request failed: {0}")]
    Request(String),
    #[error("question source returned a malformed question set: {0}")]
    MalformedResponse(String),
}

#[async_trait]
pub trait QuestionSource: Send + Sync {
    async fn generate_questions(
        &self,
        game_type: GameType,
        level: u32,
        kind: AssessmentKind,
        count: usize,
    ) -> Result<Vec<Question>, QuestionSourceError>;
}

#[async_trait]
pub trait InsightGenerator: Send + Sync {
    async fn generate_insight(
        &self,
        game_type: GameType,
        pre_score: u32,
        post_score: u32,
        weak_areas: &[String],
        strength_areas: &[String],
    ) -> String;
}

pub struct GeminiService {
    http: reqwest::Client,
    api_key: Option<String>,
    api_url: String,
    model: String,
}

const TOPIC_FOCUS: &[&str] = &[
    "practical real-world scenarios",
    "technical implementation details",
    "case studies and examples",
    "policy and compliance aspects",
    "threat detection methods",
    "common security vulnerabilities",
    "incident response procedures",
    "risk assessment scenarios",
    "legal framework applications",
    "prevention strategies",
];

const QUESTION_STYLES: &[&str] = &[
    "'what if' scenarios",
    "multiple-step reasoning",
    "real company examples",
    "comparative analysis",
    "data interpretation",
    "ethical dilemmas",
    "troubleshooting scenarios",
    "best practice identification",
];

const SCENARIO_SETTINGS: &[&str] = &[
    "a large financial institution",
    "a healthcare provider",
    "an e-commerce platform",
    "a government agency",
    "a tech startup",
    "a retail business",
    "an educational institution",
    "a manufacturing company",
];

impl GeminiService {
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.gemini_timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            http,
            api_key: config.gemini_api_key.clone(),
            api_url: config.gemini_api_url.clone(),
            model: config.gemini_model.clone(),
        }
    }

    async fn call_generate_content(&self, prompt: &str, temperature: f64) -> anyhow::Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("GEMINI_API_KEY is not configured"))?;

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.api_url, self.model, api_key
        );

        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": temperature,
                "topK": 40,
                "topP": 0.95,
                "maxOutputTokens": 2048
            }
        });

        let response = self.http.post(&url).json(&body).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("Gemini API returned status {}", response.status());
        }

        let payload: serde_json::Value = response.json().await?;
        let text = payload["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Gemini response has no text part"))?;

        Ok(text.to_string())
    }
}

#[async_trait]
impl QuestionSource for GeminiService {
    async fn generate_questions(
        &self,
        game_type: GameType,
        level: u32,
        kind: AssessmentKind,
        count: usize,
    ) -> Result<Vec<Question>, QuestionSourceError> {
        if self.api_key.is_none() {
            return Err(QuestionSourceError::MissingCredentials);
        }

        let prompt = build_assessment_prompt(game_type, level, kind, count);

        let text = self
            .call_generate_content(&prompt, 1.0)
            .await
            .map_err(|e| QuestionSourceError::Request(e.to_string()))?;

        let questions = parse_questions(&text, count)?;

        tracing::info!(
            game = %game_type,
            level,
            kind = %kind,
            count = questions.len(),
            "Generated questions via Gemini"
        );

        Ok(questions)
    }
}

#[async_trait]
impl InsightGenerator for GeminiService {
    async fn generate_insight(
        &self,
        game_type: GameType,
        pre_score: u32,
        post_score: u32,
        weak_areas: &[String],
        strength_areas: &[String],
    ) -> String {
        let prompt = build_insight_prompt(game_type, pre_score, post_score, weak_areas, strength_areas);

        match self.call_generate_content(&prompt, 0.7).await {
            Ok(text) if !text.trim().is_empty() => {
                INSIGHTS_GENERATED_TOTAL.with_label_values(&["gemini"]).inc();
                text.trim().to_string()
            }
            Ok(_) | Err(_) => {
                tracing::warn!(game = %game_type, "Insight generation failed, using templated fallback");
                INSIGHTS_GENERATED_TOTAL
                    .with_label_values(&["fallback"])
                    .inc();
                fallback_insight(pre_score, post_score)
            }
        }
    }
}

/// Prompt with randomized focus/style/setting so repeated generations for
/// the same tuple do not converge on one question set.
fn build_assessment_prompt(
    game_type: GameType,
    level: u32,
    kind: AssessmentKind,
    count: usize,
) -> String {
    let mut rng = rand::rng();
    let focus = TOPIC_FOCUS.choose(&mut rng).copied().unwrap_or(TOPIC_FOCUS[0]);
    let style = QUESTION_STYLES
        .choose(&mut rng)
        .copied()
        .unwrap_or(QUESTION_STYLES[0]);
    let setting = SCENARIO_SETTINGS
        .choose(&mut rng)
        .copied()
        .unwrap_or(SCENARIO_SETTINGS[0]);
    let request_id = uuid::Uuid::new_v4();

    let context = game_type.context();
    let difficulty = kind.difficulty();

    format!(
        "GENERATION REQUEST #{request_id}\n\n\
         OBJECTIVE: Create {count} unique, varied multiple-choice questions for a {difficulty}-level {kind}-assessment.\n\n\
         SUBJECT: \"{title}\" - Level {level}\n\
         CONTEXT: {description}\n\n\
         SPECIALIZED FOCUS: {focus} relating to {game_focus}\n\
         PRESENTATION STYLE: Use {style}\n\
         SCENARIO SETTING: {setting}\n\n\
         DIVERSITY REQUIREMENTS:\n\
         * Each question must use different industry examples\n\
         * Vary difficulty within {difficulty} parameters\n\
         * Balance technical, legal, practical, and theoretical aspects\n\
         * Include realistic, contemporary examples\n\n\
         TECHNICAL SPECIFICATIONS:\n\
         * Total questions: {count}\n\
         * Options per question: 4\n\
         * Correct answer index: 0-3\n\
         * All options must be plausible, only one correct\n\n\
         OUTPUT FORMAT - JSON only, no markdown, no code blocks:\n\
         {{\n\
           \"questions\": [\n\
             {{\"question\": \"...\", \"options\": [\"A\", \"B\", \"C\", \"D\"], \"correctAnswerIndex\": 0}}\n\
           ]\n\
         }}\n\n\
         GENERATE NOW:",
        title = context.title,
        description = context.description,
        game_focus = context.focus,
    )
}

fn build_insight_prompt(
    game_type: GameType,
    pre_score: u32,
    post_score: u32,
    weak_areas: &[String],
    strength_areas: &[String],
) -> String {
    let context = game_type.context();
    let improvement = post_score as i64 - pre_score as i64;
    let weak = if weak_areas.is_empty() {
        "None identified".to_string()
    } else {
        weak_areas.join(", ")
    };
    let strong = if strength_areas.is_empty() {
        "General understanding".to_string()
    } else {
        strength_areas.join(", ")
    };

    format!(
        "As an educational AI assistant, provide encouraging and insightful feedback \
         for a student learning about {title}.\n\n\
         Student Performance:\n\
         - Pre-assessment score: {pre_score}%\n\
         - Post-assessment score: {post_score}%\n\
         - Improvement: {improvement}%\n\
         - Weak areas: {weak}\n\
         - Strong areas: {strong}\n\n\
         Provide a brief, encouraging 2-3 sentence insight that:\n\
         1. Acknowledges their progress or encourages improvement\n\
         2. Highlights specific achievements or areas needing focus\n\
         3. Offers a practical tip for continued learning\n\n\
         Keep it conversational, positive, and actionable.",
        title = context.title,
    )
}

/// Templated insight by improvement bracket, used when the online call
/// fails or returns nothing.
pub fn fallback_insight(pre_score: u32, post_score: u32) -> String {
    let improvement = post_score as i64 - pre_score as i64;
    if improvement > 20 {
        "Excellent progress! You've shown significant improvement, demonstrating strong learning and adaptation. Keep up the great work!".to_string()
    } else if improvement > 0 {
        "Good progress! You're moving in the right direction. Focus on reviewing the challenging areas to further strengthen your skills.".to_string()
    } else {
        "Keep practicing! Learning takes time and repetition. Review the material and try again - you've got this!".to_string()
    }
}

#[derive(Debug, Deserialize)]
struct GeneratedQuestionSet {
    questions: Vec<GeneratedQuestion>,
}

#[derive(Debug, Deserialize)]
struct GeneratedQuestion {
    question: String,
    options: Vec<String>,
    #[serde(rename = "correctAnswerIndex")]
    correct_answer_index: i64,
}

lazy_static! {
    static ref CODE_FENCE: Regex = Regex::new(r"```(?:json)?").unwrap();
}

fn strip_code_fences(text: &str) -> String {
    CODE_FENCE.replace_all(text, "").trim().to_string()
}

/// Parses and strictly validates a generated question set: exact count,
/// exactly 4 options each, correct index in range.
fn parse_questions(text: &str, expected_count: usize) -> Result<Vec<Question>, QuestionSourceError> {
    let cleaned = strip_code_fences(text);

    let parsed: GeneratedQuestionSet = serde_json::from_str(&cleaned)
        .map_err(|e| QuestionSourceError::MalformedResponse(e.to_string()))?;

    if parsed.questions.len() != expected_count {
        return Err(QuestionSourceError::MalformedResponse(format!(
            "expected {} questions, got {}",
            expected_count,
            parsed.questions.len()
        )));
    }

    let mut questions = Vec::with_capacity(expected_count);
    for generated in parsed.questions {
        if generated.question.trim().is_empty() {
            return Err(QuestionSourceError::MalformedResponse(
                "empty question text".to_string(),
            ));
        }
        if generated.options.len() != 4 {
            return Err(QuestionSourceError::MalformedResponse(format!(
                "question has {} options, expected 4",
                generated.options.len()
            )));
        }
        if !(0..=3).contains(&generated.correct_answer_index) {
            return Err(QuestionSourceError::MalformedResponse(format!(
                "correct answer index {} out of range",
                generated.correct_answer_index
            )));
        }
        questions.push(Question::new(
            generated.question,
            generated.options,
            generated.correct_answer_index as u32,
        ));
    }

    Ok(questions)
}
