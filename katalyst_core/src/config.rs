//! Configuration for the core, loaded from TOML.
//!
//! Every section is optional; a missing section falls back to the
//! built-in defaults for that feature:
//!
//! ```toml
//! [notes]
//! default_title = "Overview"
//! boilerplate_prefixes = ["here's a breakdown"]
//!
//! [quiz]
//! practice_mode = true
//!
//! [storage]
//! results_key = "quizResults"
//! database_path = "katalyst.db"
//! ```

use crate::error::ConfigError;
use crate::upstream::Feature;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_RESULTS_KEY: &str = "quizResults";
pub const DEFAULT_EXPLANATION: &str = "No additional explanation provided.";

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoreConfig {
    #[serde(default = "SectionizerConfig::notes")]
    pub notes: SectionizerConfig,
    #[serde(default = "SectionizerConfig::summary")]
    pub summary: SectionizerConfig,
    #[serde(default = "SectionizerConfig::keypoints")]
    pub keypoints: SectionizerConfig,
    #[serde(default)]
    pub quiz: QuizSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            notes: SectionizerConfig::notes(),
            summary: SectionizerConfig::summary(),
            keypoints: SectionizerConfig::keypoints(),
            quiz: QuizSettings::default(),
            storage: StorageSettings::default(),
        }
    }
}

impl CoreConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: CoreConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!(path = %path.display(), "loaded core configuration");
        Ok(config)
    }

    /// Sectionizer settings for a text feature. Features without a
    /// sectioned display (quiz, flashcards, qa) use the notes settings.
    pub fn sectionizer(&self, feature: Feature) -> &SectionizerConfig {
        match feature {
            Feature::Summary => &self.summary,
            Feature::Keypoints => &self.keypoints,
            _ => &self.notes,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, section) in [
            ("notes", &self.notes),
            ("summary", &self.summary),
            ("keypoints", &self.keypoints),
        ] {
            if section.default_title.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "[{}] default_title must not be empty",
                    name
                )));
            }
        }
        if self.storage.results_key.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "[storage] results_key must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-feature knobs for turning free text into sections.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectionizerConfig {
    /// Title of the single section produced when the text has no headers.
    pub default_title: String,
    /// Lines whose lowercase form starts with one of these are dropped.
    #[serde(default)]
    pub boilerplate_prefixes: Vec<String>,
    /// Lines whose lowercase form contains one of these are dropped.
    #[serde(default)]
    pub boilerplate_phrases: Vec<String>,
}

impl Default for SectionizerConfig {
    fn default() -> Self {
        Self::notes()
    }
}

impl SectionizerConfig {
    pub fn new(default_title: impl Into<String>) -> Self {
        Self {
            default_title: default_title.into(),
            boilerplate_prefixes: Vec::new(),
            boilerplate_phrases: Vec::new(),
        }
    }

    pub fn with_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.boilerplate_prefixes
            .extend(prefixes.into_iter().map(Into::into));
        self
    }

    pub fn with_phrases<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.boilerplate_phrases
            .extend(phrases.into_iter().map(Into::into));
        self
    }

    pub fn notes() -> Self {
        Self::new("Overview")
            .with_prefixes(["here's a breakdown", "here is a breakdown"])
            .with_phrases(["provided document", "formatted as requested"])
    }

    pub fn summary() -> Self {
        Self::new("Summary")
            .with_prefixes([
                "here's a summary",
                "here is a summary",
                "here's a breakdown",
            ])
            .with_phrases(["provided document", "formatted as requested"])
    }

    pub fn keypoints() -> Self {
        Self::new("Key Points")
            .with_prefixes([
                "here's the keypoints",
                "here are the keypoints",
                "here's the key points",
                "here are the key points",
                "here's a breakdown",
            ])
            .with_phrases(["provided document", "formatted as requested"])
    }
}

/// Quiz-taking defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizSettings {
    /// Allow revealing the correct answer before one has been given.
    #[serde(default)]
    pub practice_mode: bool,
    #[serde(default = "default_explanation")]
    pub default_explanation: String,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            practice_mode: false,
            default_explanation: default_explanation(),
        }
    }
}

fn default_explanation() -> String {
    DEFAULT_EXPLANATION.to_string()
}

/// Where completed quiz results are kept.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageSettings {
    #[serde(default = "default_results_key")]
    pub results_key: String,
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            results_key: default_results_key(),
            database_path: None,
        }
    }
}

fn default_results_key() -> String {
    DEFAULT_RESULTS_KEY.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = CoreConfig::from_toml_str("").unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.storage.results_key, "quizResults");
        assert!(!config.quiz.practice_mode);
    }

    #[test]
    fn partial_sections_override_only_what_they_name() {
        let config = CoreConfig::from_toml_str(
            r#"
            [summary]
            default_title = "Digest"
            boilerplate_prefixes = ["in short"]

            [quiz]
            practice_mode = true
            "#,
        )
        .unwrap();
        assert_eq!(config.summary.default_title, "Digest");
        assert_eq!(config.summary.boilerplate_prefixes, vec!["in short"]);
        assert!(config.summary.boilerplate_phrases.is_empty());
        assert_eq!(config.notes, SectionizerConfig::notes());
        assert!(config.quiz.practice_mode);
        assert_eq!(config.quiz.default_explanation, DEFAULT_EXPLANATION);
    }

    #[test]
    fn blank_title_is_rejected() {
        let err = CoreConfig::from_toml_str("[notes]\ndefault_title = \"  \"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn sectionizer_lookup_by_feature() {
        let config = CoreConfig::default();
        assert_eq!(config.sectionizer(Feature::Keypoints).default_title, "Key Points");
        assert_eq!(config.sectionizer(Feature::Summary).default_title, "Summary");
        assert_eq!(config.sectionizer(Feature::Notes).default_title, "Overview");
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("katalyst.toml");
        std::fs::write(&path, "[storage]\nresults_key = \"history\"\n").unwrap();
        let config = CoreConfig::load(&path).unwrap();
        assert_eq!(config.storage.results_key, "history");

        let missing = CoreConfig::load(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }
}
