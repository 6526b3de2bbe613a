//! Static fallback question bank, used when the online question source
//! fails or returns a malformed set. Serving from here is degraded service,
//! not an error: the caller still gets a well-formed assessment.

use crate::models::{assessment::Question, GameType};

fn q(text: &str, options: [&str; 4], correct: u32) -> Question {
    Question::new(
        text,
        options.iter().map(|o| o.to_string()).collect(),
        correct,
    )
}

/// Returns exactly `count` questions for the game, repeating the bank if
/// necessary.
pub fn fallback_questions(game_type: GameType, count: usize) -> Vec<Question> {
    let bank = bank_for(game_type);
    let mut questions = Vec::with_capacity(count);
    while questions.len() < count {
        for question in &bank {
            if questions.len() == count {
                break;
            }
            questions.push(question.clone());
        }
    }
    questions
}

fn bank_for(game_type: GameType) -> Vec<Question> {
    match game_type {
        GameType::Phishing => vec![
            q(
                "What is the primary goal of a phishing attack?",
                [
                    "To install antivirus software",
                    "To steal sensitive information",
                    "To improve email security",
                    "To provide technical support",
                ],
                1,
            ),
            q(
                "Which of these is a common red flag in a phishing email?",
                [
                    "Personalized greeting with your name",
                    "Generic greeting like \"Dear Customer\"",
                    "Email from a known contact",
                    "Professional formatting",
                ],
                1,
            ),
            q(
                "What should you do if you receive a suspicious email?",
                [
                    "Click the link to verify",
                    "Reply with your information",
                    "Report it and delete it",
                    "Forward it to friends",
                ],
                2,
            ),
            q(
                "Which email address is most likely to be legitimate?",
                [
                    "support@paypa1-security.com",
                    "admin@bank-verify-urgent.net",
                    "service@amazon.com",
                    "security@g00gle-alert.com",
                ],
                2,
            ),
            q(
                "What is spear phishing?",
                [
                    "Fishing with a spear",
                    "A targeted phishing attack on specific individuals",
                    "A type of malware",
                    "A legitimate security practice",
                ],
                1,
            ),
        ],
        GameType::Loophole => vec![
            q(
                "What is a legal loophole?",
                [
                    "A door in a courthouse",
                    "A gap or ambiguity in law that can be exploited",
                    "A type of legal document",
                    "A court procedure",
                ],
                1,
            ),
            q(
                "Why do legal loopholes exist?",
                [
                    "They are intentionally created",
                    "Laws cannot cover every possible scenario",
                    "Lawyers create them",
                    "They are part of the constitution",
                ],
                1,
            ),
            q(
                "How can legal loopholes be closed?",
                [
                    "By ignoring them",
                    "Through legislative amendments",
                    "By judges only",
                    "They cannot be closed",
                ],
                1,
            ),
            q(
                "What is the principle of 'letter vs spirit' of the law?",
                [
                    "Reading vs writing laws",
                    "Following exact wording vs intended purpose",
                    "Criminal vs civil law",
                    "Federal vs state law",
                ],
                1,
            ),
            q(
                "Who typically identifies legal loopholes?",
                [
                    "Only judges",
                    "Lawyers, scholars, and those affected by laws",
                    "Police officers",
                    "Politicians exclusively",
                ],
                1,
            ),
        ],
        GameType::Judge => vec![
            q(
                "What is the burden of proof in criminal cyber cases?",
                [
                    "Preponderance of evidence",
                    "Clear and convincing evidence",
                    "Beyond reasonable doubt",
                    "Probable cause",
                ],
                2,
            ),
            q(
                "What is digital forensics?",
                [
                    "Creating digital art",
                    "Recovering and investigating electronic data for legal cases",
                    "Writing computer programs",
                    "Building websites",
                ],
                1,
            ),
            q(
                "What is an IP address in cyber investigations?",
                [
                    "Intellectual Property address",
                    "A unique identifier for devices on a network",
                    "Internet Protocol document",
                    "A password",
                ],
                1,
            ),
            q(
                "What does jurisdiction mean in cyber law?",
                [
                    "The power of a court to hear a case",
                    "Type of crime",
                    "A legal document",
                    "An investigation tool",
                ],
                0,
            ),
            q(
                "What is the chain of custody in digital evidence?",
                [
                    "A prisoner transport system",
                    "Documentation of evidence handling to ensure integrity",
                    "A type of blockchain",
                    "A court filing procedure",
                ],
                1,
            ),
        ],
        GameType::Architect => vec![
            q(
                "What is the primary purpose of data protection legislation?",
                [
                    "To increase government revenue",
                    "To protect individual privacy rights",
                    "To promote technology companies",
                    "To restrict internet access",
                ],
                1,
            ),
            q(
                "What does 'transparency' mean in legislation?",
                [
                    "Laws written on clear paper",
                    "Making laws clear and understandable to the public",
                    "Secret government operations",
                    "Corporate policies",
                ],
                1,
            ),
            q(
                "Why is public consultation important in lawmaking?",
                [
                    "It's not important",
                    "To gather diverse perspectives and identify potential issues",
                    "To delay the process",
                    "For entertainment",
                ],
                1,
            ),
            q(
                "What is a 'sunset clause' in legislation?",
                [
                    "Laws that apply only at night",
                    "Automatic expiration date for a law",
                    "Laws about solar energy",
                    "End of a legislative session",
                ],
                1,
            ),
            q(
                "What are unintended consequences in legislation?",
                [
                    "Typos in legal documents",
                    "Unexpected effects that laws have beyond their intended purpose",
                    "Deliberate loopholes",
                    "Benefits of new laws",
                ],
                1,
            ),
        ],
        GameType::Veo => vec![
            q(
                "What makes an effective cybersecurity educational video?",
                [
                    "Complex technical jargon",
                    "Clear visuals and simple explanations",
                    "Long duration",
                    "No examples",
                ],
                1,
            ),
            q(
                "Why is visual storytelling important in education?",
                [
                    "It's not important",
                    "It helps engage viewers and improve retention",
                    "It's cheaper to produce",
                    "To show off editing skills",
                ],
                1,
            ),
            q(
                "What is the ideal length for an educational video?",
                [
                    "Over 1 hour",
                    "5-10 minutes for focused topics",
                    "Under 30 seconds",
                    "Exactly 1 minute",
                ],
                1,
            ),
            q(
                "What should be included in a cybersecurity awareness video?",
                [
                    "Only text slides",
                    "Real-world examples and practical tips",
                    "Complex code demonstrations",
                    "Only background music",
                ],
                1,
            ),
            q(
                "How can videos improve cybersecurity training?",
                [
                    "They can't",
                    "By demonstrating concepts visually and engaging learners",
                    "By replacing all written materials",
                    "By being entertaining only",
                ],
                1,
            ),
        ],
        GameType::Laws => vec![
            q(
                "What does GDPR stand for?",
                [
                    "General Data Protection Regulation",
                    "Global Digital Privacy Rule",
                    "Government Data Processing Rights",
                    "General Digital Protection Rights",
                ],
                0,
            ),
            q(
                "What is the purpose of cybersecurity laws?",
                [
                    "To ban computers",
                    "To protect digital systems and data from unauthorized access",
                    "To make internet expensive",
                    "To monitor all citizens",
                ],
                1,
            ),
            q(
                "What is 'right to be forgotten'?",
                [
                    "Forgetting passwords",
                    "Right to have personal data deleted",
                    "Amnesia treatment",
                    "Witness protection program",
                ],
                1,
            ),
            q(
                "What does 'data breach notification' require?",
                [
                    "Nothing",
                    "Organizations must inform affected individuals when data is compromised",
                    "Only informing the CEO",
                    "Waiting 10 years to notify",
                ],
                1,
            ),
            q(
                "What is 'consent' in data protection laws?",
                [
                    "Automatic permission",
                    "Freely given, informed agreement to data processing",
                    "Something companies assume",
                    "Not necessary",
                ],
                1,
            ),
        ],
    }
}
