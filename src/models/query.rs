// src/models/query.rs
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Game,
    Event,
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryType::Game => write!(f, "game"),
            QueryType::Event => write!(f, "event"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "en")]
    English,
    #[serde(rename = "fr")]
    French,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::French => "fr",
        }
    }

    /// Region code used for localized video search.
    pub fn region(&self) -> &'static str {
        match self {
            Language::English => "US",
            Language::French => "FR",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// The user's request. Replaced wholesale by the classify step, never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryInput {
    pub text: String,
    pub duration_minutes: u32,
    pub query_type: Option<QueryType>,
    pub language: Option<Language>,
}

impl QueryInput {
    /// Unchecked constructor. Text is trimmed but not validated.
    pub fn new(text: &str, duration_minutes: u32) -> Self {
        Self {
            text: text.trim().to_string(),
            duration_minutes,
            query_type: None,
            language: None,
        }
    }

    /// Validating constructor: text must be non-blank and the duration inside `[min, max]`.
    pub fn validated(
        text: &str,
        duration_minutes: u32,
        min: u32,
        max: u32,
    ) -> Result<Self, ValidationError> {
        let query = Self::new(text, duration_minutes);
        query.validate(min, max)?;
        Ok(query)
    }

    pub fn validate(&self, min: u32, max: u32) -> Result<(), ValidationError> {
        if self.text.is_empty() {
            return Err(ValidationError::EmptyQuery);
        }
        if self.duration_minutes < min || self.duration_minutes > max {
            return Err(ValidationError::DurationOutOfRange {
                got: self.duration_minutes,
                min,
                max,
            });
        }
        Ok(())
    }

    pub fn classified(mut self, query_type: QueryType, language: Language) -> Self {
        self.query_type = Some(query_type);
        self.language = Some(language);
        self
    }

    /// Language once classified, English before that.
    pub fn language_or_default(&self) -> Language {
        self.language.unwrap_or(Language::English)
    }
}

/// Classification output consumed by later steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryMetadata {
    pub confidence: Option<f64>,
    pub game_name: Option<String>,
    pub video_url: Option<String>,
    pub script_format: Option<String>,
    pub relevance_reason: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl QueryMetadata {
    pub fn script_format_or_default(&self) -> &str {
        self.script_format.as_deref().unwrap_or("review")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_text_is_trimmed_and_validated() {
        let query = QueryInput::validated("  Review Hades II  ", 10, 5, 20).unwrap();
        assert_eq!(query.text, "Review Hades II");
        assert!(query.query_type.is_none());

        assert_eq!(
            QueryInput::validated("   ", 10, 5, 20),
            Err(ValidationError::EmptyQuery)
        );
    }

    #[test]
    fn test_duration_bounds_are_inclusive() {
        assert!(QueryInput::validated("x", 5, 5, 20).is_ok());
        assert!(QueryInput::validated("x", 20, 5, 20).is_ok());
        assert_eq!(
            QueryInput::validated("x", 21, 5, 20),
            Err(ValidationError::DurationOutOfRange { got: 21, min: 5, max: 20 })
        );
        assert!(QueryInput::validated("x", 4, 5, 20).is_err());
    }

    #[test]
    fn test_language_serializes_as_code() {
        assert_eq!(serde_json::to_string(&Language::French).unwrap(), "\"fr\"");
        assert_eq!(serde_json::to_string(&QueryType::Event).unwrap(), "\"event\"");
    }
}
