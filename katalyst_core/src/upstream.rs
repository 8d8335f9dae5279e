//! Replies from the AI processing endpoint (`POST /process/<action>`).
//!
//! The HTTP call itself belongs to the caller; this module classifies what
//! came back and hands the response text to the matching parser.

use crate::config::{QuizSettings, SectionizerConfig};
use crate::error::{FormatError, ServiceError};
use crate::flashcards::{parse_flashcards, Flashcard};
use crate::quiz::QuizRun;
use crate::sections::{parse_sections, Section};
#[cfg(feature = "python")]
use pyo3::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Generation features offered by the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feature {
    Notes,
    Summary,
    Keypoints,
    Flashcards,
    Quiz,
    Qa,
}

impl Feature {
    pub const ALL: [Feature; 6] = [
        Feature::Notes,
        Feature::Summary,
        Feature::Keypoints,
        Feature::Flashcards,
        Feature::Quiz,
        Feature::Qa,
    ];

    pub fn action(self) -> &'static str {
        match self {
            Feature::Notes => "notes",
            Feature::Summary => "summary",
            Feature::Keypoints => "keypoints",
            Feature::Flashcards => "flashcards",
            Feature::Quiz => "quiz",
            Feature::Qa => "qa",
        }
    }

    pub fn route(self) -> String {
        format!("/process/{}", self.action())
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.action())
    }
}

impl FromStr for Feature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Feature::ALL
            .into_iter()
            .find(|f| f.action() == wanted)
            .ok_or_else(|| format!("Invalid action '{}'", s.trim()))
    }
}

fn is_rate_limit(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("rate limit") || lower.contains("too many requests")
}

fn error_message(value: &Value) -> Option<String> {
    match value.get("error")? {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()),
        other => Some(other.to_string()),
    }
}

/// Classify a reply and return its response text.
///
/// `{"response": ..}` (or the older `final_output` key) is success, an
/// `error` field is an upstream failure, anything non-2xx is a transport
/// failure.
pub fn read_response(status: u16, body: &str) -> Result<String, ServiceError> {
    let parsed: Option<Value> = serde_json::from_str(body).ok();

    if !(200..300).contains(&status) {
        let message = parsed
            .as_ref()
            .and_then(error_message)
            .unwrap_or_else(|| match body.trim() {
                "" => format!("HTTP {}", status),
                text => text.to_string(),
            });
        warn!(status, %message, "AI endpoint returned an error status");
        if status == 429 || is_rate_limit(&message) {
            return Err(ServiceError::RateLimited { message });
        }
        return Err(ServiceError::Transport {
            status: Some(status),
            message,
        });
    }

    let value = parsed.ok_or_else(|| FormatError::new("reply is not JSON", body))?;

    if let Some(message) = error_message(&value) {
        warn!(%message, "AI endpoint reported an error");
        if is_rate_limit(&message) {
            return Err(ServiceError::RateLimited { message });
        }
        return Err(ServiceError::Upstream { message });
    }

    match value.get("response").or_else(|| value.get("final_output")) {
        Some(Value::String(text)) => Ok(text.clone()),
        Some(Value::Null) | None => Err(ServiceError::MissingResponse),
        Some(other) => {
            debug!("response field holds structured JSON");
            Ok(other.to_string())
        }
    }
}

/// Notes, summary or key points from a reply.
pub fn sections_response(status: u16, body: &str, config: &SectionizerConfig) -> Result<Vec<Section>, ServiceError> {
    let text = read_response(status, body)?;
    Ok(parse_sections(&text, config))
}

/// A ready-to-take quiz from a reply.
pub fn quiz_response(status: u16, body: &str, settings: &QuizSettings) -> Result<QuizRun, ServiceError> {
    let text = read_response(status, body)?;
    Ok(QuizRun::load(&text, settings)?)
}

pub fn flashcards_response(status: u16, body: &str) -> Result<Vec<Flashcard>, ServiceError> {
    let text = read_response(status, body)?;
    Ok(parse_flashcards(&text)?)
}

// ============= Python Bindings =============

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "read_response")]
pub fn py_read_response(status: u16, body: &str) -> PyResult<String> {
    read_response(status, body).map_err(|e| pyo3::exceptions::PyRuntimeError::new_err(e.user_message()))
}
