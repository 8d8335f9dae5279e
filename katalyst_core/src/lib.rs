//! Katalyst Core - study tooling around AI-generated material
//!
//! Parses notes, summaries, key points, flashcards and quizzes out of
//! model responses, runs quizzes and keeps a history of results.

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod flashcards;
pub mod progress;
pub mod questions;
pub mod quiz;
pub mod sections;
pub mod upstream;

pub use config::{CoreConfig, QuizSettings, SectionizerConfig, StorageSettings};
pub use db::SqliteResultStore;
pub use error::{ConfigError, FormatError, QuizError, ServiceError, StoreError};
pub use extract::{extract_structured, extract_with_strategy, Shape, Strategy};
pub use flashcards::{parse_flashcards, Flashcard, FlashcardDeck};
pub use progress::{get_dashboard, recent_results, DashboardMetrics, Grade, MemoryResultStore, QuizResult, QuizResultStore};
pub use questions::{load_questions, OptionLabel, Question};
pub use quiz::{AnswerOutcome, QuestionStatus, QuizRun};
pub use sections::{parse_sections, sectionize, sections_from_value, Section};
pub use upstream::{read_response, Feature};

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// Install a log subscriber honouring `KATALYST_LOG` (default `warn`).
#[cfg(feature = "python")]
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("KATALYST_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Katalyst Core Python Module
#[cfg(feature = "python")]
#[pymodule]
fn katalyst_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    init_tracing();

    // Response parsing
    m.add_function(wrap_pyfunction!(upstream::py_read_response, m)?)?;
    m.add_function(wrap_pyfunction!(extract::py_extract_structured, m)?)?;
    m.add_function(wrap_pyfunction!(sections::py_sectionize, m)?)?;
    m.add_function(wrap_pyfunction!(sections::py_parse_sections, m)?)?;
    m.add_function(wrap_pyfunction!(flashcards::py_parse_flashcards, m)?)?;

    // Result history
    m.add_function(wrap_pyfunction!(db::py_read_quiz_results, m)?)?;
    m.add_function(wrap_pyfunction!(db::py_get_dashboard, m)?)?;

    m.add_class::<sections::Section>()?;
    m.add_class::<flashcards::Flashcard>()?;
    m.add_class::<progress::QuizResult>()?;
    m.add_class::<progress::DashboardMetrics>()?;
    m.add_class::<quiz::PyQuizRun>()?;

    Ok(())
}
