use std::fs;
use std::path::Path;

use thiserror::Error;

use super::{BlockChoice, Question};

/// Errors from loading the combined question bank.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read bank file: {0}")]
    Io(#[from] std::io::Error),

    #[error("bank file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid record (id {id}): {reason}")]
    InvalidRecord { id: u32, reason: String },
}

/// The in-memory question bank. Loaded once at startup (and again on
/// `/reload`), read-only in between.
#[derive(Debug, Default)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let raw = fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    /// Parses and validates a JSON list of question records. A single bad
    /// record fails the whole load; records are never silently coerced.
    pub fn parse(raw: &str) -> Result<Self, LoadError> {
        let questions: Vec<Question> = serde_json::from_str(raw)?;
        for question in &questions {
            if let Err(reason) = validate_question(question) {
                return Err(LoadError::InvalidRecord {
                    id: question.id,
                    reason,
                });
            }
        }
        Ok(Self { questions })
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// The subset matching a selection. `Random` matches the whole bank and
    /// ignores any topic.
    pub fn filter(&self, block: BlockChoice, topic: Option<u32>) -> Vec<Question> {
        match block {
            BlockChoice::Random => self.questions.clone(),
            BlockChoice::Block(number) => self
                .questions
                .iter()
                .filter(|q| q.block == number && topic.map_or(true, |t| q.topic == t))
                .cloned()
                .collect(),
        }
    }
}

/// Record invariants, shared with the offline `validate_bank` tool so the
/// loader and the validator can never disagree.
pub fn validate_question(question: &Question) -> Result<(), String> {
    if question.text.trim().is_empty() {
        return Err("empty question text".to_string());
    }
    if question.options.len() < 2 {
        return Err(format!(
            "needs at least 2 options, has {}",
            question.options.len()
        ));
    }
    if question.correct_index >= question.options.len() {
        return Err(format!(
            "correct_index {} is out of range for {} options",
            question.correct_index,
            question.options.len()
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: u32, block: u32, topic: u32) -> Question {
        Question::new(
            id,
            format!("question {}", id),
            vec!["A".to_string(), "B".to_string()],
            0,
            block,
            topic,
        )
    }

    #[test]
    fn parse_accepts_a_valid_bank() {
        let raw = r#"[
            {"id": 1, "text": "2+2?", "options": ["3", "4"], "correct_index": 1, "block": 1, "topic": 1}
        ]"#;
        let bank = QuestionBank::parse(raw).unwrap();
        assert_eq!(bank.len(), 1);
    }

    #[test]
    fn parse_rejects_out_of_range_correct_index() {
        let raw = r#"[
            {"id": 7, "text": "2+2?", "options": ["3", "4"], "correct_index": 2, "block": 1, "topic": 1}
        ]"#;
        match QuestionBank::parse(raw) {
            Err(LoadError::InvalidRecord { id, .. }) => assert_eq!(id, 7),
            other => panic!("expected InvalidRecord, got {:?}", other),
        }
    }

    #[test]
    fn parse_rejects_single_option_records() {
        let raw = r#"[
            {"id": 3, "text": "2+2?", "options": ["4"], "correct_index": 0, "block": 1, "topic": 1}
        ]"#;
        assert!(matches!(
            QuestionBank::parse(raw),
            Err(LoadError::InvalidRecord { id: 3, .. })
        ));
    }

    #[test]
    fn parse_rejects_non_json_input() {
        assert!(matches!(
            QuestionBank::parse("not json at all"),
            Err(LoadError::Json(_))
        ));
    }

    #[test]
    fn load_reports_missing_file() {
        assert!(matches!(
            QuestionBank::load("/definitely/not/there.json"),
            Err(LoadError::Io(_))
        ));
    }

    #[test]
    fn filter_by_block_and_topic() {
        let bank = QuestionBank {
            questions: vec![
                question(1, 1, 1),
                question(2, 1, 2),
                question(3, 2, 1),
            ],
        };

        let picked = bank.filter(BlockChoice::Block(1), Some(2));
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].id, 2);

        let whole_block = bank.filter(BlockChoice::Block(1), None);
        assert_eq!(whole_block.len(), 2);
    }

    #[test]
    fn random_block_returns_whole_bank_and_ignores_topic() {
        let bank = QuestionBank {
            questions: vec![
                question(1, 1, 1),
                question(2, 2, 3),
                question(3, 4, 9),
            ],
        };
        assert_eq!(bank.filter(BlockChoice::Random, Some(1)).len(), 3);
        assert_eq!(bank.filter(BlockChoice::Random, None).len(), 3);
    }

    #[test]
    fn filter_on_unknown_block_is_empty() {
        let bank = QuestionBank {
            questions: vec![question(1, 1, 1)],
        };
        assert!(bank.filter(BlockChoice::Block(9), None).is_empty());
    }
}
