//! Progress tracking - completed quiz results and dashboard statistics

use crate::error::StoreError;
#[cfg(feature = "python")]
use pyo3::prelude::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use std::fmt;
use std::str::FromStr;

/// Letter grade. Declaration order is best-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub const ALL: [Grade; 6] = [Grade::APlus, Grade::A, Grade::B, Grade::C, Grade::D, Grade::F];

    /// Fixed thresholds, first match wins.
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 90.0 {
            Grade::APlus
        } else if percentage >= 80.0 {
            Grade::A
        } else if percentage >= 70.0 {
            Grade::B
        } else if percentage >= 60.0 {
            Grade::C
        } else if percentage >= 50.0 {
            Grade::D
        } else {
            Grade::F
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Grade::ALL
            .into_iter()
            .find(|g| g.as_str() == s.trim())
            .ok_or_else(|| format!("unknown grade '{}'", s))
    }
}

/// Round to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Summary of one completed quiz.
///
/// Field names match the JSON the browser client keeps under
/// `quizResults`, where `percentage` was stored as a string.
#[serde_as]
#[cfg_attr(feature = "python", pyclass)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub date: DateTime<Utc>,
    /// Number of questions answered correctly.
    #[cfg_attr(feature = "python", pyo3(get))]
    pub score: usize,
    #[cfg_attr(feature = "python", pyo3(get))]
    pub total_questions: usize,
    #[cfg_attr(feature = "python", pyo3(get))]
    pub earned_marks: f64,
    #[cfg_attr(feature = "python", pyo3(get))]
    pub total_marks: f64,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[cfg_attr(feature = "python", pyo3(get))]
    pub percentage: f64,
    pub grade: Grade,
}

#[cfg(feature = "python")]
#[pymethods]
impl QuizResult {
    /// RFC 3339 timestamp.
    #[getter(date)]
    fn py_date(&self) -> String {
        self.date.to_rfc3339()
    }

    #[getter(grade)]
    fn py_grade(&self) -> &'static str {
        self.grade.as_str()
    }

    fn __repr__(&self) -> String {
        format!(
            "QuizResult(score={}/{}, marks={}/{}, percentage={:.1}%, grade={})",
            self.score, self.total_questions, self.earned_marks, self.total_marks, self.percentage, self.grade
        )
    }
}

/// Append-only log of completed quizzes.
pub trait QuizResultStore {
    fn append(&mut self, result: &QuizResult) -> Result<(), StoreError>;

    /// Every stored result, oldest first.
    fn read_all(&self) -> Result<Vec<QuizResult>, StoreError>;
}

/// Result log held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryResultStore {
    results: Vec<QuizResult>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl QuizResultStore for MemoryResultStore {
    fn append(&mut self, result: &QuizResult) -> Result<(), StoreError> {
        self.results.push(result.clone());
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<QuizResult>, StoreError> {
        Ok(self.results.clone())
    }
}

/// Aggregate statistics over the result log
#[cfg_attr(feature = "python", pyclass)]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    #[cfg_attr(feature = "python", pyo3(get))]
    pub total_quizzes: usize,
    /// Mean percentage, one decimal.
    #[cfg_attr(feature = "python", pyo3(get))]
    pub average_score: f64,
    pub best_grade: Grade,
    /// Whether the latest result beat the one before it; `None` with fewer than two results.
    #[cfg_attr(feature = "python", pyo3(get))]
    pub trending: Option<bool>,
    #[cfg_attr(feature = "python", pyo3(get))]
    pub total_questions: usize,
    #[cfg_attr(feature = "python", pyo3(get))]
    pub correct_answers: usize,
    /// Correct answers over questions attempted, one decimal.
    #[cfg_attr(feature = "python", pyo3(get))]
    pub success_rate: Option<f64>,
}

#[cfg(feature = "python")]
#[pymethods]
impl DashboardMetrics {
    #[getter(best_grade)]
    fn py_best_grade(&self) -> &'static str {
        self.best_grade.as_str()
    }

    fn __repr__(&self) -> String {
        format!(
            "DashboardMetrics(quizzes={}, average={:.1}%, best={})",
            self.total_quizzes, self.average_score, self.best_grade
        )
    }
}

impl DashboardMetrics {
    /// `None` when there are no results yet.
    pub fn from_results(results: &[QuizResult]) -> Option<Self> {
        let best_grade = results.iter().map(|r| r.grade).min()?;
        let total_quizzes = results.len();

        let average_score =
            round1(results.iter().map(|r| r.percentage).sum::<f64>() / total_quizzes as f64);

        let recent: Vec<f64> = results
            .iter()
            .skip(total_quizzes.saturating_sub(3))
            .map(|r| r.percentage)
            .collect();
        let trending = match recent.as_slice() {
            [.., previous, last] => Some(last > previous),
            _ => None,
        };

        let total_questions: usize = results.iter().map(|r| r.total_questions).sum();
        let correct_answers: usize = results.iter().map(|r| r.score).sum();
        let success_rate = (total_questions > 0)
            .then(|| round1(correct_answers as f64 / total_questions as f64 * 100.0));

        Some(Self {
            total_quizzes,
            average_score,
            best_grade,
            trending,
            total_questions,
            correct_answers,
            success_rate,
        })
    }
}

/// Read the log and aggregate it.
pub fn get_dashboard<S: QuizResultStore + ?Sized>(store: &S) -> Result<Option<DashboardMetrics>, StoreError> {
    let results = store.read_all()?;
    Ok(DashboardMetrics::from_results(&results))
}

/// The `limit` most recent results, newest first.
pub fn recent_results(results: &[QuizResult], limit: usize) -> Vec<&QuizResult> {
    results.iter().rev().take(limit).collect()
}
