use serde::{Deserialize, Serialize};

/// Closed set of mini-games. Adding a game requires a prompt context here
/// and a fallback bank entry in `services::question_bank`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Phishing,
    Loophole,
    Judge,
    Architect,
    Veo,
    Laws,
}

/// Topic context handed to the question source when building prompts.
pub struct GameContext {
    pub title: &'static str,
    pub description: &'static str,
    pub focus: &'static str,
}

impl GameType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameType::Phishing => "phishing",
            GameType::Loophole => "loophole",
            GameType::Judge => "judge",
            GameType::Architect => "architect",
            GameType::Veo => "veo",
            GameType::Laws => "laws",
        }
    }

    pub fn context(&self) -> GameContext {
        match self {
            GameType::Phishing => GameContext {
                title: "Phishing Detection",
                description: "Training users to identify and avoid phishing attacks and social engineering tactics",
                focus: "email security, red flags, URL inspection, sender verification",
            },
            GameType::Loophole => GameContext {
                title: "Legal Loopholes",
                description: "Understanding legal loopholes in cyber law and how to identify gaps in legislation",
                focus: "legal analysis, critical thinking, policy gaps, regulatory compliance",
            },
            GameType::Judge => GameContext {
                title: "Cyber Judge",
                description: "Making judgments on cybercrime cases based on evidence and legal precedent",
                focus: "legal reasoning, evidence evaluation, cyber law application, case analysis",
            },
            GameType::Architect => GameContext {
                title: "Legislation Architect",
                description: "Designing and analyzing cybersecurity legislation and policy",
                focus: "policy design, long-term impact, regulatory frameworks, stakeholder considerations",
            },
            GameType::Veo => GameContext {
                title: "VEO Creator",
                description: "Creating visual explanations of cybersecurity concepts",
                focus: "visual communication, concept explanation, educational content creation",
            },
            GameType::Laws => GameContext {
                title: "Learn Laws",
                description: "Learning fundamental cybersecurity laws and regulations",
                focus: "legal knowledge, regulatory understanding, compliance requirements",
            },
        }
    }
}

impl std::fmt::Display for GameType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase of the assessment relative to gameplay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssessmentKind {
    Pre,
    Post,
}

impl AssessmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssessmentKind::Pre => "pre",
            AssessmentKind::Post => "post",
        }
    }

    /// Difficulty weighting passed to the question source.
    pub fn difficulty(&self) -> &'static str {
        match self {
            AssessmentKind::Pre => "foundational",
            AssessmentKind::Post => "advanced",
        }
    }
}

impl std::fmt::Display for AssessmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub mod analytics;
pub mod assessment;
pub mod progress;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_type_serde_round_trip() {
        let json = serde_json::to_string(&GameType::Phishing).unwrap();
        assert_eq!(json, "\"phishing\"");
        let parsed: GameType = serde_json::from_str("\"laws\"").unwrap();
        assert_eq!(parsed, GameType::Laws);
    }

    #[test]
    fn unknown_game_type_is_rejected() {
        assert!(serde_json::from_str::<GameType>("\"chess\"").is_err());
    }

    #[test]
    fn kind_maps_to_difficulty() {
        assert_eq!(AssessmentKind::Pre.difficulty(), "foundational");
        assert_eq!(AssessmentKind::Post.difficulty(), "advanced");
    }
}
