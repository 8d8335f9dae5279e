//! Flashcards from a `{ "term": "explanation" }` response.

use crate::error::FormatError;
use crate::extract::{extract_structured, Shape};
#[cfg(feature = "python")]
use pyo3::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[cfg_attr(feature = "python", pyclass)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    #[cfg_attr(feature = "python", pyo3(get))]
    pub front: String,
    #[cfg_attr(feature = "python", pyo3(get))]
    pub back: String,
}

#[cfg(feature = "python")]
#[pymethods]
impl Flashcard {
    fn __repr__(&self) -> String {
        format!("Flashcard(front={:?})", self.front)
    }
}

/// Parse flashcards in the order the model produced them.
pub fn parse_flashcards(raw: &str) -> Result<Vec<Flashcard>, FormatError> {
    let value = extract_structured(raw, Shape::FlatMap)?;
    let map = value
        .as_object()
        .ok_or_else(|| FormatError::new("expected a dictionary of flashcards", raw))?;

    Ok(map
        .iter()
        .filter(|(front, _)| !front.trim().is_empty())
        .map(|(front, back)| Flashcard {
            front: front.trim().to_string(),
            back: match back {
                Value::String(s) => s.trim().to_string(),
                other => other.to_string(),
            },
        })
        .collect())
}

/// A deck being studied one card at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct FlashcardDeck {
    cards: Vec<Flashcard>,
    index: usize,
    flipped: bool,
}

impl FlashcardDeck {
    pub fn new(cards: Vec<Flashcard>) -> Self {
        Self {
            cards,
            index: 0,
            flipped: false,
        }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn current(&self) -> Option<&Flashcard> {
        self.cards.get(self.index)
    }

    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    pub fn flip(&mut self) -> bool {
        self.flipped = !self.flipped;
        self.flipped
    }

    pub fn next(&mut self) -> usize {
        if self.index + 1 < self.cards.len() {
            self.index += 1;
            self.flipped = false;
        }
        self.index
    }

    pub fn previous(&mut self) -> usize {
        if self.index > 0 {
            self.index -= 1;
            self.flipped = false;
        }
        self.index
    }

    /// 1-based position and deck size, `(0, 0)` for an empty deck.
    pub fn progress(&self) -> (usize, usize) {
        if self.cards.is_empty() {
            (0, 0)
        } else {
            (self.index + 1, self.cards.len())
        }
    }
}

// ============= Python Bindings =============

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "parse_flashcards")]
pub fn py_parse_flashcards(text: &str) -> PyResult<Vec<Flashcard>> {
    parse_flashcards(text).map_err(|e| pyo3::exceptions::PyRuntimeError::new_err(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = "```json\n{\n  \"Photosynthesis\": \"Light to chemical energy\",\n  \"Osmosis\": \"Water across a membrane\",\n  \"Cell count\": 37\n}\n```";

    #[test]
    fn parses_in_model_order() {
        let cards = parse_flashcards(RESPONSE).unwrap();
        let fronts: Vec<_> = cards.iter().map(|c| c.front.as_str()).collect();
        assert_eq!(fronts, vec!["Photosynthesis", "Osmosis", "Cell count"]);
        assert_eq!(cards[2].back, "37");
    }

    #[test]
    fn missing_json_is_an_error() {
        let err = parse_flashcards("Rate limit exceeded, here are some sample cards").unwrap_err();
        assert!(err.raw().starts_with("Rate limit"));
    }

    #[test]
    fn empty_dictionary_is_an_empty_deck() {
        assert!(parse_flashcards("```json\n{}\n```").unwrap().is_empty());
    }

    #[test]
    fn navigation_resets_flip_and_clamps() {
        let mut deck = FlashcardDeck::new(parse_flashcards(RESPONSE).unwrap());
        assert_eq!(deck.progress(), (1, 3));
        assert!(deck.flip());
        assert_eq!(deck.previous(), 0);
        assert!(deck.is_flipped());
        assert_eq!(deck.next(), 1);
        assert!(!deck.is_flipped());
        deck.next();
        assert_eq!(deck.next(), 2);
        assert_eq!(deck.current().unwrap().front, "Cell count");
    }

    #[test]
    fn empty_deck() {
        let mut deck = FlashcardDeck::new(Vec::new());
        assert_eq!(deck.current(), None);
        assert_eq!(deck.next(), 0);
        assert_eq!(deck.progress(), (0, 0));
    }
}
