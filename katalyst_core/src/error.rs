//! Error types shared across the core

use std::path::PathBuf;
use thiserror::Error;

/// Upstream text could not be coerced into the expected structure.
///
/// The raw text is kept for diagnostics but left out of the display
/// message, which is what ends up in front of the user.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("failed to parse structured response: {reason}")]
pub struct FormatError {
    reason: String,
    raw: String,
}

impl FormatError {
    pub fn new(reason: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            raw: raw.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// The offending upstream text, verbatim.
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// Errors raised while loading or driving a quiz.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuizError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("invalid question at index {index}: {reason}")]
    Validation { index: usize, reason: String },

    #[error("invalid quiz response format, expected an array of questions")]
    NotAnArray,

    #[error("no quiz questions could be generated")]
    Empty,

    #[error("question index {index} out of range (quiz has {len} questions)")]
    OutOfRange { index: usize, len: usize },

    #[error("quiz is not complete, {pending} question(s) still pending")]
    Incomplete { pending: usize },

    #[error("answer for question {index} is hidden until it has been answered")]
    RevealLocked { index: usize },
}

/// Errors from the quiz result repository.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to serialize quiz results: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("stored value under '{key}' is not a valid result log: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// One generation round trip against the AI endpoint, classified.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Network failure (`status` is `None`) or a non-2xx reply.
    #[error("request failed: {message}")]
    Transport { status: Option<u16>, message: String },

    #[error("AI service error: {message}")]
    Upstream { message: String },

    #[error("rate limit exceeded: {message}")]
    RateLimited { message: String },

    #[error("AI service reply has no 'response' field")]
    MissingResponse,

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Quiz(#[from] QuizError),
}

impl ServiceError {
    /// Message suitable for showing next to a retry button.
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::Transport { message, .. } => {
                format!("Could not reach the AI service: {}", message)
            }
            ServiceError::RateLimited { .. } => {
                "The AI service is receiving too many requests right now. Please wait a moment and try again.".to_string()
            }
            ServiceError::Upstream { message } => format!("The AI service reported an error: {}", message),
            ServiceError::MissingResponse => "The AI service returned an empty reply.".to_string(),
            ServiceError::Format(_) => "Failed to parse the AI response.".to_string(),
            ServiceError::Quiz(QuizError::Format(_)) => "Failed to parse quiz questions.".to_string(),
            ServiceError::Quiz(e) => format!("Failed to parse quiz questions: {}", e),
        }
    }

    /// Transport failures and rate limits may succeed on a manual retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ServiceError::Transport { .. } | ServiceError::RateLimited { .. }
        )
    }

    /// Raw upstream text, when the failure was a parse failure.
    pub fn raw_text(&self) -> Option<&str> {
        match self {
            ServiceError::Format(e) | ServiceError::Quiz(QuizError::Format(e)) => Some(e.raw()),
            _ => None,
        }
    }
}

/// Errors loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
