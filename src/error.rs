use std::fmt::Write as _;
use std::time::Duration;

use thiserror::Error;

/// Rejected form input. Raised before any request is built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("Please enter a topic.")]
    EmptyTopic,
    #[error("Difficulty must be between 1 and 10 (got {0})")]
    DifficultyOutOfRange(u8),
    #[error("Number of questions must be between 1 and 20 (got {0})")]
    CountOutOfRange(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Transport,
    SafetyOrPolicyRejection,
    Timeout,
    MalformedJson,
    UnexpectedShape,
    InvalidItem,
}

impl ErrorKind {
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration error",
            ErrorKind::Transport => "transport error",
            ErrorKind::SafetyOrPolicyRejection => "request blocked",
            ErrorKind::Timeout => "timed out",
            ErrorKind::MalformedJson => "malformed JSON",
            ErrorKind::UnexpectedShape => "unexpected response shape",
            ErrorKind::InvalidItem => "invalid question item",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationCause {
    #[error("{0}")]
    Transport(String),
    #[error("the model declined to generate: {0}")]
    Blocked(String),
    #[error("no complete response within {}s", .0.as_secs())]
    Timeout(Duration),
}

/// A failed generation call. Partial text is kept for diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Error during API call: {cause}")]
pub struct GenerationFailure {
    pub cause: GenerationCause,
    pub feedback: Option<String>,
    pub prompt: String,
    pub partial_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("Failed to parse questions JSON: {message}")]
    MalformedJson { message: String, raw_text: String },
    #[error("Expected a JSON array, but got {actual_type}")]
    UnexpectedShape {
        actual_type: &'static str,
        raw_text: String,
    },
    #[error("Invalid item format at index {index}: {reason}")]
    InvalidItem {
        index: usize,
        item: String,
        reason: String,
        raw_text: String,
    },
}

impl ValidationFailure {
    pub fn raw_text(&self) -> &str {
        match self {
            ValidationFailure::MalformedJson { raw_text, .. }
            | ValidationFailure::UnexpectedShape { raw_text, .. }
            | ValidationFailure::InvalidItem { raw_text, .. } => raw_text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizError {
    #[error("{0}")]
    Configuration(String),
    #[error(transparent)]
    Generation(#[from] GenerationFailure),
    #[error(transparent)]
    Validation(#[from] ValidationFailure),
}

impl QuizError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QuizError::Configuration(_) => ErrorKind::Configuration,
            QuizError::Generation(failure) => match failure.cause {
                GenerationCause::Transport(_) => ErrorKind::Transport,
                GenerationCause::Blocked(_) => ErrorKind::SafetyOrPolicyRejection,
                GenerationCause::Timeout(_) => ErrorKind::Timeout,
            },
            QuizError::Validation(failure) => match failure {
                ValidationFailure::MalformedJson { .. } => ErrorKind::MalformedJson,
                ValidationFailure::UnexpectedShape { .. } => ErrorKind::UnexpectedShape,
                ValidationFailure::InvalidItem { .. } => ErrorKind::InvalidItem,
            },
        }
    }

    /// Full multi-line report: the cause plus every payload the failure carries.
    pub fn diagnostic(&self) -> String {
        let mut out = self.to_string();
        match self {
            QuizError::Configuration(_) => {}
            QuizError::Generation(failure) => {
                if let Some(feedback) = &failure.feedback {
                    let _ = write!(out, "\n\nFeedback: {feedback}");
                }
                let _ = write!(out, "\n\nPrompt sent:\n{}", failure.prompt);
                if !failure.partial_text.is_empty() {
                    let _ = write!(
                        out,
                        "\n\nPartial response received before error:\n{}",
                        failure.partial_text
                    );
                }
            }
            QuizError::Validation(failure) => {
                if let ValidationFailure::InvalidItem { item, .. } = failure {
                    let _ = write!(out, "\n\nItem: {item}");
                }
                let _ = write!(out, "\n\nResponse:\n{}", failure.raw_text());
            }
        }
        out
    }
}
