use crate::models::assessment::Question;

/// Maps question text to a topic tag. Swappable so the taxonomy can grow
/// without touching aggregation logic.
pub trait TopicClassifier: Send + Sync {
    fn classify(&self, question: &str) -> &'static str;
}

/// Ordered keyword rules, first match wins. Unanswered or incorrect
/// questions contribute their topic to weak areas; correct ones to
/// strength areas.
pub struct KeywordTaxonomy {
    rules: &'static [(&'static [&'static str], &'static str)],
    fallback: &'static str,
}

const DEFAULT_RULES: &[(&[&str], &str)] = &[
    (&["phishing", "email"], "Email Security"),
    (&["password"], "Password Security"),
    (&["malware", "virus"], "Malware Detection"),
    (&["law", "legal"], "Legal Knowledge"),
    (&["policy", "regulation"], "Policy Understanding"),
];

impl Default for KeywordTaxonomy {
    fn default() -> Self {
        Self {
            rules: DEFAULT_RULES,
            fallback: "General Concepts",
        }
    }
}

impl TopicClassifier for KeywordTaxonomy {
    fn classify(&self, question: &str) -> &'static str {
        let lowered = question.to_lowercase();
        for (keywords, tag) in self.rules {
            if keywords.iter().any(|kw| lowered.contains(kw)) {
                return tag;
            }
        }
        self.fallback
    }
}

impl KeywordTaxonomy {
    /// Topics of questions answered incorrectly (or not at all), de-duplicated.
    pub fn weak_areas(&self, questions: &[Question]) -> Vec<String> {
        self.collect_topics(questions, false)
    }

    /// Topics of correctly answered questions, de-duplicated.
    pub fn strength_areas(&self, questions: &[Question]) -> Vec<String> {
        self.collect_topics(questions, true)
    }

    fn collect_topics(&self, questions: &[Question], correct: bool) -> Vec<String> {
        let mut topics: Vec<String> = Vec::new();
        for question in questions {
            if (question.is_correct == Some(true)) != correct {
                continue;
            }
            let topic = self.classify(&question.question).to_string();
            if !topics.contains(&topic) {
                topics.push(topic);
            }
        }
        topics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(text: &str, is_correct: Option<bool>) -> Question {
        Question {
            question: text.to_string(),
            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            correct_answer_index: 0,
            user_answer: is_correct.map(|_| 0),
            is_correct,
        }
    }

    #[test]
    fn classifies_by_first_matching_rule() {
        let taxonomy = KeywordTaxonomy::default();
        assert_eq!(
            taxonomy.classify("How do you spot a phishing email?"),
            "Email Security"
        );
        assert_eq!(
            taxonomy.classify("What makes a strong password?"),
            "Password Security"
        );
        assert_eq!(
            taxonomy.classify("How does a virus spread?"),
            "Malware Detection"
        );
        assert_eq!(
            taxonomy.classify("Which law governs data breaches?"),
            "Legal Knowledge"
        );
        assert_eq!(
            taxonomy.classify("What does this regulation require?"),
            "Policy Understanding"
        );
    }

    #[test]
    fn unmatched_question_gets_default_tag() {
        let taxonomy = KeywordTaxonomy::default();
        assert_eq!(taxonomy.classify("What is two-factor auth?"), "General Concepts");
    }

    #[test]
    fn email_rule_wins_over_legal_rule_by_order() {
        let taxonomy = KeywordTaxonomy::default();
        // Contains both "email" and "legal"; the email rule is first.
        assert_eq!(
            taxonomy.classify("Is reading employee email legal?"),
            "Email Security"
        );
    }

    #[test]
    fn weak_and_strength_areas_split_and_dedup() {
        let taxonomy = KeywordTaxonomy::default();
        let questions = vec![
            question("Spot the phishing attempt", Some(false)),
            question("Another phishing question", Some(false)),
            question("Pick a strong password", Some(true)),
            question("Name this law", Some(true)),
        ];

        assert_eq!(taxonomy.weak_areas(&questions), vec!["Email Security"]);
        assert_eq!(
            taxonomy.strength_areas(&questions),
            vec!["Password Security", "Legal Knowledge"]
        );
    }

    #[test]
    fn unanswered_questions_count_as_weak() {
        let taxonomy = KeywordTaxonomy::default();
        let questions = vec![question("Which malware is this?", None)];
        assert_eq!(taxonomy.weak_areas(&questions), vec!["Malware Detection"]);
        assert!(taxonomy.strength_areas(&questions).is_empty());
    }
}
