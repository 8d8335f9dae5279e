//! Quiz session state: one question at a time, answers are final.

use crate::config::QuizSettings;
use crate::error::QuizError;
use crate::progress::{round1, Grade, QuizResult, QuizResultStore};
use crate::questions::{parse_questions, OptionLabel, Question};
use chrono::{DateTime, Utc};
#[cfg(feature = "python")]
use pyo3::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionStatus {
    Pending,
    Completed,
    Incorrect,
}

/// Result of a call to [`QuizRun::select_answer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    Correct,
    Incorrect,
    /// The question had already been answered; nothing changed.
    AlreadyAnswered,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuizRun {
    questions: Vec<Question>,
    current_index: usize,
    statuses: Vec<QuestionStatus>,
    selected: Vec<Option<OptionLabel>>,
    revealed: Vec<bool>,
    earned_marks: f64,
    total_marks: f64,
    practice_mode: bool,
}

impl QuizRun {
    /// Start a run. Every question must carry positive, finite marks.
    pub fn new(questions: Vec<Question>) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::Empty);
        }
        if let Some(index) = questions
            .iter()
            .position(|q| !(q.marks.is_finite() && q.marks > 0.0))
        {
            return Err(QuizError::Validation {
                index,
                reason: "marks must be a positive number".to_string(),
            });
        }
        let len = questions.len();
        let total_marks = questions.iter().map(|q| q.marks).sum();
        Ok(Self {
            questions,
            current_index: 0,
            statuses: vec![QuestionStatus::Pending; len],
            selected: vec![None; len],
            revealed: vec![false; len],
            earned_marks: 0.0,
            total_marks,
            practice_mode: false,
        })
    }

    /// Parse a quiz response and start a run.
    pub fn load(raw: &str, settings: &QuizSettings) -> Result<Self, QuizError> {
        let questions = parse_questions(raw, &settings.default_explanation)?;
        let run = Self::new(questions)?.with_practice_mode(settings.practice_mode);
        info!(
            questions = run.len(),
            total_marks = run.total_marks,
            practice = run.practice_mode,
            "quiz run started"
        );
        Ok(run)
    }

    pub fn with_practice_mode(mut self, enabled: bool) -> Self {
        self.practice_mode = enabled;
        self
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current(&self) -> &Question {
        &self.questions[self.current_index]
    }

    pub fn earned_marks(&self) -> f64 {
        self.earned_marks
    }

    pub fn total_marks(&self) -> f64 {
        self.total_marks
    }

    pub fn practice_mode(&self) -> bool {
        self.practice_mode
    }

    pub fn status(&self, index: usize) -> Result<QuestionStatus, QuizError> {
        self.check_index(index)?;
        Ok(self.statuses[index])
    }

    pub fn selected(&self, index: usize) -> Result<Option<OptionLabel>, QuizError> {
        self.check_index(index)?;
        Ok(self.selected[index])
    }

    pub fn answered_count(&self) -> usize {
        self.statuses
            .iter()
            .filter(|s| **s != QuestionStatus::Pending)
            .count()
    }

    pub fn correct_count(&self) -> usize {
        self.statuses
            .iter()
            .filter(|s| **s == QuestionStatus::Completed)
            .count()
    }

    fn check_index(&self, index: usize) -> Result<(), QuizError> {
        if index < self.questions.len() {
            Ok(())
        } else {
            Err(QuizError::OutOfRange {
                index,
                len: self.questions.len(),
            })
        }
    }

    /// Record an answer. A question that has been answered keeps its first answer.
    pub fn select_answer(&mut self, index: usize, label: OptionLabel) -> Result<AnswerOutcome, QuizError> {
        self.check_index(index)?;
        if self.statuses[index] != QuestionStatus::Pending {
            debug!(index, "ignoring answer for already answered question");
            return Ok(AnswerOutcome::AlreadyAnswered);
        }

        let question = &self.questions[index];
        self.selected[index] = Some(label);
        if question.is_correct(label) {
            self.statuses[index] = QuestionStatus::Completed;
            self.earned_marks += question.marks;
            Ok(AnswerOutcome::Correct)
        } else {
            self.statuses[index] = QuestionStatus::Incorrect;
            Ok(AnswerOutcome::Incorrect)
        }
    }

    pub fn select_current(&mut self, label: OptionLabel) -> Result<AnswerOutcome, QuizError> {
        self.select_answer(self.current_index, label)
    }

    pub fn go_next(&mut self) -> usize {
        self.current_index = (self.current_index + 1).min(self.questions.len() - 1);
        self.current_index
    }

    pub fn go_previous(&mut self) -> usize {
        self.current_index = self.current_index.saturating_sub(1);
        self.current_index
    }

    pub fn is_complete(&self) -> bool {
        self.statuses.iter().all(|s| *s != QuestionStatus::Pending)
    }

    /// Correct answer for a question. Outside practice mode it stays hidden
    /// until the question has been answered.
    pub fn reveal_answer(&mut self, index: usize) -> Result<OptionLabel, QuizError> {
        self.check_index(index)?;
        if !self.practice_mode && self.statuses[index] == QuestionStatus::Pending {
            return Err(QuizError::RevealLocked { index });
        }
        self.revealed[index] = true;
        Ok(self.questions[index].correct_answer)
    }

    pub fn is_revealed(&self, index: usize) -> bool {
        self.revealed.get(index).copied().unwrap_or(false)
    }

    /// Summary of a completed run, dated `date`.
    pub fn summarize_at(&self, date: DateTime<Utc>) -> Result<QuizResult, QuizError> {
        let pending = self.len() - self.answered_count();
        if pending > 0 {
            return Err(QuizError::Incomplete { pending });
        }

        let percentage = if self.total_marks > 0.0 {
            round1(self.earned_marks / self.total_marks * 100.0)
        } else {
            0.0
        };

        Ok(QuizResult {
            date,
            score: self.correct_count(),
            total_questions: self.len(),
            earned_marks: self.earned_marks,
            total_marks: self.total_marks,
            percentage,
            grade: Grade::from_percentage(percentage),
        })
    }

    pub fn summarize(&self) -> Result<QuizResult, QuizError> {
        self.summarize_at(Utc::now())
    }

    /// Summarize and append to the result log.
    ///
    /// The append is best-effort: a store failure is logged and the result
    /// is still returned to the caller.
    pub fn finalize<S: QuizResultStore + ?Sized>(&self, store: &mut S) -> Result<QuizResult, QuizError> {
        let result = self.summarize()?;
        match store.append(&result) {
            Ok(()) => info!(
                percentage = result.percentage,
                grade = %result.grade,
                "quiz result recorded"
            ),
            Err(e) => warn!(error = %e, "failed to persist quiz result"),
        }
        Ok(result)
    }
}

// ============= Python Bindings =============

/// One quiz session, as seen from Python.
#[cfg(feature = "python")]
#[pyclass(name = "QuizRun")]
pub struct PyQuizRun {
    inner: QuizRun,
}

#[cfg(feature = "python")]
fn runtime_err(e: impl std::fmt::Display) -> PyErr {
    pyo3::exceptions::PyRuntimeError::new_err(e.to_string())
}

#[cfg(feature = "python")]
#[pymethods]
impl PyQuizRun {
    #[new]
    #[pyo3(signature = (raw, practice_mode = false))]
    fn new(raw: &str, practice_mode: bool) -> PyResult<Self> {
        let settings = QuizSettings {
            practice_mode,
            ..QuizSettings::default()
        };
        QuizRun::load(raw, &settings)
            .map(|inner| Self { inner })
            .map_err(runtime_err)
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    fn __repr__(&self) -> String {
        format!(
            "QuizRun(questions={}, answered={}, marks={}/{})",
            self.inner.len(),
            self.inner.answered_count(),
            self.inner.earned_marks(),
            self.inner.total_marks()
        )
    }

    #[getter]
    fn current_index(&self) -> usize {
        self.inner.current_index()
    }

    #[getter]
    fn earned_marks(&self) -> f64 {
        self.inner.earned_marks()
    }

    #[getter]
    fn total_marks(&self) -> f64 {
        self.inner.total_marks()
    }

    /// `(text, [(label, option), ...])` for the current question.
    fn current_question(&self) -> (String, Vec<(String, String)>) {
        let question = self.inner.current();
        let options = question
            .labelled_options()
            .map(|(label, text)| (label.to_string(), text.to_string()))
            .collect();
        (question.text.clone(), options)
    }

    fn select_answer(&mut self, index: usize, label: &str) -> PyResult<&'static str> {
        let label: OptionLabel = label
            .parse()
            .map_err(pyo3::exceptions::PyValueError::new_err)?;
        let outcome = self.inner.select_answer(index, label).map_err(runtime_err)?;
        Ok(match outcome {
            AnswerOutcome::Correct => "correct",
            AnswerOutcome::Incorrect => "incorrect",
            AnswerOutcome::AlreadyAnswered => "already_answered",
        })
    }

    fn go_next(&mut self) -> usize {
        self.inner.go_next()
    }

    fn go_previous(&mut self) -> usize {
        self.inner.go_previous()
    }

    fn status(&self, index: usize) -> PyResult<&'static str> {
        let status = self.inner.status(index).map_err(runtime_err)?;
        Ok(match status {
            QuestionStatus::Pending => "pending",
            QuestionStatus::Completed => "completed",
            QuestionStatus::Incorrect => "incorrect",
        })
    }

    fn reveal_answer(&mut self, index: usize) -> PyResult<String> {
        self.inner
            .reveal_answer(index)
            .map(|label| label.to_string())
            .map_err(runtime_err)
    }

    fn is_complete(&self) -> bool {
        self.inner.is_complete()
    }

    /// Summarize and append to the store at `db_path`.
    fn finalize(&self, db_path: &str) -> PyResult<QuizResult> {
        let mut store = crate::db::SqliteResultStore::open(db_path).map_err(runtime_err)?;
        self.inner.finalize(&mut store).map_err(runtime_err)
    }
}
