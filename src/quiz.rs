use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::FormError;

pub const DIFFICULTY_RANGE: RangeInclusive<u8> = 1..=10;
pub const COUNT_RANGE: RangeInclusive<u8> = 1..=20;

pub const DEFAULT_TOPIC: &str = "Photosynthesis";
pub const DEFAULT_DIFFICULTY: u8 = 5;
pub const DEFAULT_COUNT: u8 = 5;

/// Inputs for one generation attempt. Only constructible through [`QuizRequest::new`],
/// so a request in hand always has a trimmed topic and in-range numbers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuizRequest {
    topic: String,
    difficulty: u8,
    count: u8,
}

impl QuizRequest {
    pub fn new(topic: &str, difficulty: u8, count: u8) -> Result<Self, FormError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(FormError::EmptyTopic);
        }
        if !DIFFICULTY_RANGE.contains(&difficulty) {
            return Err(FormError::DifficultyOutOfRange(difficulty));
        }
        if !COUNT_RANGE.contains(&count) {
            return Err(FormError::CountOutOfRange(count));
        }

        Ok(Self {
            topic: topic.to_string(),
            difficulty,
            count,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn difficulty(&self) -> u8 {
        self.difficulty
    }

    pub fn count(&self) -> u8 {
        self.count
    }
}

/// A validated question/answer pair.
///
/// Both fields must be strings. Extra keys the model adds are ignored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizItem {
    pub question: String,
    pub answer: String,
}

impl QuizItem {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_trims_topic() {
        let request = QuizRequest::new("  Photosynthesis \n", 5, 2).unwrap();
        assert_eq!(request.topic(), "Photosynthesis");
        assert_eq!(request.difficulty(), 5);
        assert_eq!(request.count(), 2);
    }

    #[test]
    fn request_rejects_blank_topic() {
        assert_eq!(QuizRequest::new("   ", 5, 2), Err(FormError::EmptyTopic));
        assert_eq!(QuizRequest::new("", 5, 2), Err(FormError::EmptyTopic));
    }

    #[test]
    fn request_rejects_out_of_range_numbers() {
        assert_eq!(
            QuizRequest::new("Rust", 0, 2),
            Err(FormError::DifficultyOutOfRange(0))
        );
        assert_eq!(
            QuizRequest::new("Rust", 11, 2),
            Err(FormError::DifficultyOutOfRange(11))
        );
        assert_eq!(
            QuizRequest::new("Rust", 5, 0),
            Err(FormError::CountOutOfRange(0))
        );
        assert_eq!(
            QuizRequest::new("Rust", 5, 21),
            Err(FormError::CountOutOfRange(21))
        );
        assert!(QuizRequest::new("Rust", 10, 20).is_ok());
        assert!(QuizRequest::new("Rust", 1, 1).is_ok());
    }
}
