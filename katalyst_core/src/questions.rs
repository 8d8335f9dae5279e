//! Multiple-choice questions parsed from a generated quiz response

use crate::config::DEFAULT_EXPLANATION;
use crate::error::QuizError;
use crate::extract::{extract_structured, Shape};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

/// Option label of a four-option question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OptionLabel {
    A,
    B,
    C,
    D,
}

impl OptionLabel {
    pub const ALL: [OptionLabel; 4] = [OptionLabel::A, OptionLabel::B, OptionLabel::C, OptionLabel::D];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OptionLabel::A => "A",
            OptionLabel::B => "B",
            OptionLabel::C => "C",
            OptionLabel::D => "D",
        }
    }

    fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'A' => Some(OptionLabel::A),
            'B' => Some(OptionLabel::B),
            'C' => Some(OptionLabel::C),
            'D' => Some(OptionLabel::D),
            _ => None,
        }
    }

    /// Accepts `"B"`, `"b"`, `"B)"`, `"B."`, `"B: 4"` and the like.
    pub fn parse(s: &str) -> Option<Self> {
        let mut chars = s.trim().chars();
        let label = Self::from_char(chars.next()?)?;
        match chars.next() {
            None => Some(label),
            Some(c) if c == ')' || c == '.' || c == ':' || c.is_whitespace() => Some(label),
            Some(_) => None,
        }
    }
}

impl fmt::Display for OptionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("'{}' is not an option label (A-D)", s.trim()))
    }
}

/// A validated multiple-choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    /// Option texts indexed by [`OptionLabel::index`].
    pub options: [String; 4],
    pub correct_answer: OptionLabel,
    pub explanation: String,
    pub marks: f64,
}

impl Question {
    pub fn option(&self, label: OptionLabel) -> &str {
        &self.options[label.index()]
    }

    pub fn labelled_options(&self) -> impl Iterator<Item = (OptionLabel, &str)> + '_ {
        OptionLabel::ALL
            .iter()
            .map(move |&label| (label, self.option(label)))
    }

    pub fn is_correct(&self, label: OptionLabel) -> bool {
        self.correct_answer == label
    }
}

/// Parse and validate a quiz response with the default explanation text.
pub fn load_questions(raw: &str) -> Result<Vec<Question>, QuizError> {
    parse_questions(raw, DEFAULT_EXPLANATION)
}

/// Parse and validate a quiz response.
///
/// The whole batch is rejected if any question is malformed.
pub fn parse_questions(raw: &str, default_explanation: &str) -> Result<Vec<Question>, QuizError> {
    let value = extract_structured(raw, Shape::Array)?;
    questions_from_value(&value, default_explanation)
}

/// Validate an already-decoded array of question objects.
pub fn questions_from_value(value: &Value, default_explanation: &str) -> Result<Vec<Question>, QuizError> {
    let items = value.as_array().ok_or(QuizError::NotAnArray)?;
    if items.is_empty() {
        return Err(QuizError::Empty);
    }

    let questions = items
        .iter()
        .enumerate()
        .map(|(index, item)| validate_question(index, item, default_explanation))
        .collect::<Result<Vec<_>, _>>()
        .inspect_err(|e| warn!(error = %e, "rejected quiz batch"))?;

    info!(count = questions.len(), "loaded quiz questions");
    Ok(questions)
}

fn invalid(index: usize, reason: impl Into<String>) -> QuizError {
    QuizError::Validation {
        index,
        reason: reason.into(),
    }
}

fn validate_question(index: usize, item: &Value, default_explanation: &str) -> Result<Question, QuizError> {
    let obj = item
        .as_object()
        .ok_or_else(|| invalid(index, "expected a question object"))?;

    let text = match obj.get("question").and_then(Value::as_str).map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => {
            // The prompt lets the model answer with an error object instead.
            if let Some(message) = obj.get("error").or_else(|| obj.get("message")).and_then(Value::as_str) {
                return Err(invalid(index, format!("upstream reported: {}", message)));
            }
            return Err(invalid(index, "missing question text"));
        }
    };

    let options = parse_options(index, obj.get("options"))?;

    let correct_answer = match obj.get("correct_answer") {
        Some(Value::String(s)) if !s.trim().is_empty() => OptionLabel::parse(s)
            .ok_or_else(|| invalid(index, format!("correct answer '{}' is not one of A-D", s.trim())))?,
        _ => return Err(invalid(index, "missing correct answer")),
    };

    let explanation = obj
        .get("explanation")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(default_explanation)
        .to_string();

    let marks = parse_marks(index, obj.get("marks"))?;

    Ok(Question {
        text,
        options,
        correct_answer,
        explanation,
        marks,
    })
}

fn parse_options(index: usize, value: Option<&Value>) -> Result<[String; 4], QuizError> {
    let mut options: [String; 4] = Default::default();
    match value {
        Some(Value::Object(map)) => {
            for label in OptionLabel::ALL {
                options[label.index()] = option_text(map, label)
                    .ok_or_else(|| invalid(index, format!("missing option {}", label)))?;
            }
        }
        Some(Value::Array(items)) if items.len() == 4 => {
            for (slot, item) in options.iter_mut().zip(items) {
                *slot = scalar_text(item).ok_or_else(|| invalid(index, "options must be non-empty text"))?;
            }
        }
        _ => return Err(invalid(index, "options must list A, B, C and D")),
    }
    Ok(options)
}

fn option_text(map: &Map<String, Value>, label: OptionLabel) -> Option<String> {
    map.iter()
        .find(|(key, _)| key.trim().eq_ignore_ascii_case(label.as_str()))
        .and_then(|(_, value)| scalar_text(value))
}

fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn parse_marks(index: usize, value: Option<&Value>) -> Result<f64, QuizError> {
    let marks = match value {
        None | Some(Value::Null) => return Ok(1.0),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };
    match marks {
        Some(m) if m.is_finite() && m > 0.0 => Ok(m),
        _ => Err(invalid(index, "marks must be a positive number")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "question": "2+2?",
            "options": {"A": "3", "B": "4", "C": "5", "D": "6"},
            "correct_answer": "B",
            "marks": 2
        })
    }

    #[test]
    fn label_parsing_is_lenient() {
        assert_eq!(OptionLabel::parse("B"), Some(OptionLabel::B));
        assert_eq!(OptionLabel::parse(" c "), Some(OptionLabel::C));
        assert_eq!(OptionLabel::parse("D)"), Some(OptionLabel::D));
        assert_eq!(OptionLabel::parse("A. 3"), Some(OptionLabel::A));
        assert_eq!(OptionLabel::parse("B: 4"), Some(OptionLabel::B));
        assert_eq!(OptionLabel::parse("E"), None);
        assert_eq!(OptionLabel::parse("Banana"), None);
        assert_eq!(OptionLabel::parse(""), None);
        assert!("x".parse::<OptionLabel>().is_err());
    }

    #[test]
    fn valid_question_with_defaults() {
        let mut item = sample();
        item.as_object_mut().unwrap().remove("marks");
        let questions = questions_from_value(&json!([item]), DEFAULT_EXPLANATION).unwrap();
        let q = &questions[0];
        assert_eq!(q.text, "2+2?");
        assert_eq!(q.option(OptionLabel::B), "4");
        assert_eq!(q.correct_answer, OptionLabel::B);
        assert_eq!(q.explanation, DEFAULT_EXPLANATION);
        assert_eq!(q.marks, 1.0);
    }

    #[test]
    fn explicit_marks_and_explanation() {
        let mut item = sample();
        item["explanation"] = json!("Basic arithmetic.");
        let q = &questions_from_value(&json!([item]), DEFAULT_EXPLANATION).unwrap()[0];
        assert_eq!(q.marks, 2.0);
        assert_eq!(q.explanation, "Basic arithmetic.");
    }

    #[test]
    fn options_as_array_and_numbers() {
        let item = json!({
            "question": "Pick four",
            "options": [1, 2, 3, 4],
            "correct_answer": "D"
        });
        let q = &questions_from_value(&json!([item]), DEFAULT_EXPLANATION).unwrap()[0];
        let labelled: Vec<_> = q.labelled_options().collect();
        assert_eq!(labelled[3], (OptionLabel::D, "4"));
    }

    #[test]
    fn one_bad_question_rejects_the_batch() {
        let mut bad = sample();
        bad["options"].as_object_mut().unwrap().remove("C");
        let err = questions_from_value(&json!([sample(), bad]), DEFAULT_EXPLANATION).unwrap_err();
        assert_eq!(
            err,
            QuizError::Validation {
                index: 1,
                reason: "missing option C".into()
            }
        );
    }

    #[test]
    fn validation_failures_name_the_problem() {
        let cases = [
            (json!({"options": {}, "correct_answer": "A"}), "missing question text"),
            (json!({"question": "q", "options": {"A": "1", "B": "2", "C": "3", "D": ""}, "correct_answer": "A"}), "missing option D"),
            (json!({"question": "q", "options": {"A": "1", "B": "2", "C": "3", "D": "4"}}), "missing correct answer"),
            (json!({"question": "q", "options": {"A": "1", "B": "2", "C": "3", "D": "4"}, "correct_answer": "Z"}), "correct answer 'Z' is not one of A-D"),
            (json!({"question": "q", "options": {"A": "1", "B": "2", "C": "3", "D": "4"}, "correct_answer": "A", "marks": 0}), "marks must be a positive number"),
            (json!({"error": "No clear content available"}), "upstream reported: No clear content available"),
        ];
        for (item, expected) in cases {
            match questions_from_value(&json!([item]), DEFAULT_EXPLANATION) {
                Err(QuizError::Validation { index: 0, reason }) => assert_eq!(reason, expected),
                other => panic!("expected validation error, got {:?}", other),
            }
        }
    }

    #[test]
    fn empty_and_non_array_inputs() {
        assert_eq!(questions_from_value(&json!([]), DEFAULT_EXPLANATION), Err(QuizError::Empty));
        assert_eq!(questions_from_value(&json!({}), DEFAULT_EXPLANATION), Err(QuizError::NotAnArray));
        assert!(matches!(load_questions("no questions today"), Err(QuizError::Format(_))));
    }

    #[test]
    fn load_from_fenced_response() {
        let raw = format!("Here is your quiz:\n```json\n{}\n```", json!([sample()]));
        let questions = load_questions(&raw).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].marks, 2.0);
    }
}
