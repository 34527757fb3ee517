// src/models/output.rs
use super::content::{EventInfo, GameInfo, MediaAsset, ReviewScore};
use super::query::{Language, QueryType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptOutput {
    pub title: String,
    pub duration_minutes: u32,
    pub script_content: String,
    /// Section name -> "MM:SS-MM:SS"
    pub timestamps: BTreeMap<String, String>,
    /// review, preview, summary, complete_guide, general, event_summary
    pub format_type: String,
    pub language: Language,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThumbnailSuggestion {
    pub style: String,
    /// Image-generation prompt
    pub prompt: String,
    pub description: String,
    pub target_ctr: String,
    pub design_notes: Vec<String>,
}

/// Caller-facing summary of one pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub success: bool,
    pub query_type: Option<QueryType>,
    pub language: Option<Language>,
    pub processing_time: f64,
    pub cached: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub completed_steps: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_info: Option<GameInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub media_assets: Vec<MediaAsset>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub review_scores: Vec<ReviewScore>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_info: Option<EventInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<ScriptOutput>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub thumbnail_suggestions: Vec<ThumbnailSuggestion>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub youtube_tips: BTreeMap<String, Vec<String>>,
}

impl ProcessingResult {
    /// Result for a run that never produced a usable state.
    pub fn failed(error: String, processing_time: f64) -> Self {
        Self {
            success: false,
            processing_time,
            errors: vec![error],
            ..Default::default()
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
