//! Turn notes / summary / key-point responses into titled sections.

use crate::config::SectionizerConfig;
use crate::extract::{extract_with_strategy, Shape, Strategy};
#[cfg(feature = "python")]
use pyo3::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// A titled group of bullet points.
#[cfg_attr(feature = "python", pyclass)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    #[cfg_attr(feature = "python", pyo3(get))]
    pub title: String,
    #[cfg_attr(feature = "python", pyo3(get))]
    pub points: Vec<String>,
}

#[cfg(feature = "python")]
#[pymethods]
impl Section {
    fn __repr__(&self) -> String {
        format!("Section(title={:?}, points={})", self.title, self.points.len())
    }
}

impl Section {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            points: Vec::new(),
        }
    }
}

/// Lowercased boilerplate markers.
struct Boilerplate {
    prefixes: Vec<String>,
    phrases: Vec<String>,
}

impl Boilerplate {
    fn new(config: &SectionizerConfig) -> Self {
        let clean = |items: &[String]| -> Vec<String> {
            items
                .iter()
                .map(|s| normalize(s.trim()))
                .filter(|s| !s.is_empty())
                .collect()
        };
        Self {
            prefixes: clean(&config.boilerplate_prefixes),
            phrases: clean(&config.boilerplate_phrases),
        }
    }

    fn matches(&self, line: &str) -> bool {
        let line = normalize(line);
        self.prefixes.iter().any(|p| line.starts_with(p.as_str()))
            || self.phrases.iter().any(|p| line.contains(p.as_str()))
    }
}

fn normalize(s: &str) -> String {
    s.to_lowercase().replace(['\u{2018}', '\u{2019}'], "'")
}

fn strip_bullet(line: &str) -> &str {
    line.strip_prefix('-')
        .or_else(|| line.strip_prefix('*'))
        .map(str::trim_start)
        .unwrap_or(line)
}

/// `Title: inline content` → `("Title", "inline content")`. Only the first
/// colon separates; a line with nothing before its colon is not a header.
fn split_header(line: &str) -> Option<(&str, &str)> {
    let (title, rest) = line.split_once(':')?;
    let title = title.trim();
    if title.is_empty() {
        return None;
    }
    Some((title, rest.trim()))
}

/// Split free text into sections.
///
/// Emphasis markers (`*`) are dropped, boilerplate lines filtered, and each
/// line with a non-empty title before its first colon opens a new section.
/// Text without any such header becomes a single section named by
/// `config.default_title`.
pub fn sectionize(raw: &str, config: &SectionizerConfig) -> Vec<Section> {
    let cleaned = raw.trim().replace('*', "");
    let boilerplate = Boilerplate::new(config);

    let mut dropped = 0usize;
    let lines: Vec<&str> = cleaned
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| {
            let keep = !boilerplate.matches(line);
            if !keep {
                dropped += 1;
            }
            keep
        })
        .map(|line| strip_bullet(line).trim())
        .filter(|line| !line.is_empty())
        .collect();

    if dropped > 0 {
        debug!(dropped, "filtered boilerplate lines");
    }

    if lines.is_empty() {
        return Vec::new();
    }

    if !lines.iter().any(|line| split_header(line).is_some()) {
        let mut section = Section::new(config.default_title.clone());
        section.points.push(lines.join(" "));
        return vec![section];
    }

    let mut sections: Vec<Section> = Vec::new();
    for line in lines {
        match split_header(line) {
            Some((title, content)) => {
                let mut section = Section::new(title);
                if !content.is_empty() {
                    section.points.push(content.to_string());
                }
                sections.push(section);
            }
            None => {
                if let Some(current) = sections.last_mut() {
                    current.points.push(line.to_string());
                }
            }
        }
    }

    debug!(sections = sections.len(), "sectionized response");
    sections
}

/// Sections from a JSON response, for prompts that ask for structured output.
///
/// Accepts `{"Title": "text" | [..], ...}` and the key-point form
/// `[{"Concept": "..", "response": [..]}, ...]`. Returns `None` for
/// anything else.
pub fn sections_from_value(value: &Value) -> Option<Vec<Section>> {
    match value {
        Value::Object(map) => match concept_section(map) {
            Some(section) => Some(vec![section]),
            None => Some(
                map.iter()
                    .filter(|(title, _)| !title.trim().is_empty())
                    .map(|(title, body)| Section {
                        title: title.trim().to_string(),
                        points: points_of(body),
                    })
                    .collect(),
            ),
        },
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_object().and_then(concept_section))
            .collect(),
        _ => None,
    }
}

/// Structured JSON when the response is JSON, prose sectioning otherwise.
///
/// Only a fenced ```` ```json ```` block or a reply that is itself a JSON
/// value counts. Braces quoted inside prose stay prose.
pub fn parse_sections(raw: &str, config: &SectionizerConfig) -> Vec<Section> {
    let whole = raw.trim_start().starts_with(['{', '[']);
    if let Ok(extracted) = extract_with_strategy(raw, Shape::Any) {
        if whole || extracted.strategy == Strategy::Fenced {
            if let Some(sections) = sections_from_value(&extracted.value).filter(|s| !s.is_empty()) {
                debug!(sections = sections.len(), "sections from structured response");
                return sections;
            }
        }
    }
    sectionize(raw, config)
}

fn concept_section(map: &Map<String, Value>) -> Option<Section> {
    let title = field(map, &["concept", "title", "heading"])?
        .as_str()?
        .trim()
        .to_string();
    if title.is_empty() {
        return None;
    }
    let points = points_of(field(map, &["response", "points", "content"])?);
    Some(Section { title, points })
}

fn field<'a>(map: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    map.iter()
        .find(|(key, _)| names.iter().any(|n| key.eq_ignore_ascii_case(n)))
        .map(|(_, value)| value)
}

fn points_of(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                Vec::new()
            } else {
                vec![s.to_string()]
            }
        }
        Value::Array(items) => items
            .iter()
            .flat_map(points_of)
            .collect(),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| match v {
                Value::String(s) => format!("{}: {}", k, s.trim()),
                other => format!("{}: {}", k, other),
            })
            .collect(),
        other => vec![other.to_string()],
    }
}

// ============= Python Bindings =============

#[cfg(feature = "python")]
fn py_config(feature: &str) -> PyResult<SectionizerConfig> {
    let feature: crate::upstream::Feature = feature
        .parse()
        .map_err(pyo3::exceptions::PyValueError::new_err)?;
    Ok(crate::config::CoreConfig::default().sectionizer(feature).clone())
}

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "sectionize", signature = (text, feature = "notes"))]
pub fn py_sectionize(text: &str, feature: &str) -> PyResult<Vec<Section>> {
    Ok(sectionize(text, &py_config(feature)?))
}

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "parse_sections", signature = (text, feature = "notes"))]
pub fn py_parse_sections(text: &str, feature: &str) -> PyResult<Vec<Section>> {
    Ok(parse_sections(text, &py_config(feature)?))
}
