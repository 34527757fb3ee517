// WorkflowState - the single record threaded through every node
use super::graph::NodeName;
use crate::models::{
    EventInfo, GameInfo, MediaAsset, QueryInput, QueryMetadata, ResearchType, ReviewScore,
    ScriptOutput, ThumbnailSuggestion,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// WorkflowState - The core state object passed between nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    /// Unique id of this run, used for log correlation
    pub run_id: String,

    /// Input query information
    pub query: QueryInput,
    pub query_metadata: QueryMetadata,

    /// Research results
    pub game_info: Option<GameInfo>,
    pub event_info: Option<EventInfo>,
    pub media_assets: Vec<MediaAsset>,
    pub review_scores: Vec<ReviewScore>,
    pub research_type: Option<ResearchType>,

    /// Generated output
    pub script: Option<ScriptOutput>,
    pub thumbnail_suggestions: Vec<ThumbnailSuggestion>,
    pub youtube_tips: BTreeMap<String, Vec<String>>,

    /// Append-only, never cleared
    pub errors: Vec<String>,
    pub warnings: Vec<String>,

    /// Execution trace
    pub current_step: String,
    pub completed_steps: Vec<String>,

    pub cached: bool,
    pub processing_time: f64,
}

/// Create initial state from user input
pub fn create_initial_state(text: &str, duration_minutes: u32) -> WorkflowState {
    WorkflowState::new(QueryInput::new(text, duration_minutes))
}

impl WorkflowState {
    pub fn new(query: QueryInput) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            query,
            query_metadata: QueryMetadata::default(),
            game_info: None,
            event_info: None,
            media_assets: Vec::new(),
            review_scores: Vec::new(),
            research_type: None,
            script: None,
            thumbnail_suggestions: Vec::new(),
            youtube_tips: BTreeMap::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            current_step: "start".to_string(),
            completed_steps: Vec::new(),
            cached: false,
            processing_time: 0.0,
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Run counts as successful only with a script and no errors.
    pub fn is_success(&self) -> bool {
        self.script.is_some() && self.errors.is_empty()
    }

    pub fn set_current_step(&mut self, step: &str) {
        self.current_step = step.to_string();
    }

    /// Append to the execution log unless already present.
    pub fn mark_completed(&mut self, step: &str) {
        if !self.completed_steps.iter().any(|s| s == step) {
            self.completed_steps.push(step.to_string());
        }
    }

    pub fn push_error(&mut self, error: String) {
        self.errors.push(error);
    }

    pub fn push_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Overwrite exactly the fields the update names; warnings are appended.
    /// Ownership is checked by the node manager before this is called.
    pub fn apply_update(&mut self, update: StateUpdate) {
        let StateUpdate {
            query,
            query_metadata,
            game_info,
            event_info,
            media_assets,
            review_scores,
            research_type,
            script,
            thumbnail_suggestions,
            youtube_tips,
            cached,
            warnings,
        } = update;

        if let Some(query) = query {
            self.query = query;
        }
        if let Some(metadata) = query_metadata {
            self.query_metadata = metadata;
        }
        if let Some(game_info) = game_info {
            self.game_info = game_info;
        }
        if let Some(event_info) = event_info {
            self.event_info = event_info;
        }
        if let Some(assets) = media_assets {
            self.media_assets = assets;
        }
        if let Some(scores) = review_scores {
            self.review_scores = scores;
        }
        if let Some(research_type) = research_type {
            self.research_type = research_type;
        }
        if let Some(script) = script {
            self.script = script;
        }
        if let Some(suggestions) = thumbnail_suggestions {
            self.thumbnail_suggestions = suggestions;
        }
        if let Some(tips) = youtube_tips {
            self.youtube_tips = tips;
        }
        if let Some(cached) = cached {
            self.cached = cached;
        }
        self.warnings.extend(warnings);
    }
}

/// Fields a step may write through a [`StateUpdate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StateField {
    Query,
    QueryMetadata,
    GameInfo,
    EventInfo,
    MediaAssets,
    ReviewScores,
    ResearchType,
    Script,
    ThumbnailSuggestions,
    YoutubeTips,
    Cached,
    Warnings,
}

impl StateField {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateField::Query => "query",
            StateField::QueryMetadata => "query_metadata",
            StateField::GameInfo => "game_info",
            StateField::EventInfo => "event_info",
            StateField::MediaAssets => "media_assets",
            StateField::ReviewScores => "review_scores",
            StateField::ResearchType => "research_type",
            StateField::Script => "script",
            StateField::ThumbnailSuggestions => "thumbnail_suggestions",
            StateField::YoutubeTips => "youtube_tips",
            StateField::Cached => "cached",
            StateField::Warnings => "warnings",
        }
    }
}

impl fmt::Display for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-step field ownership. `finish` writes nothing through updates.
pub fn step_ownership(node: NodeName) -> &'static [StateField] {
    match node {
        NodeName::Classify => &[
            StateField::Query,
            StateField::QueryMetadata,
            StateField::Warnings,
        ],
        NodeName::Research => &[
            StateField::GameInfo,
            StateField::EventInfo,
            StateField::MediaAssets,
            StateField::ReviewScores,
            StateField::ResearchType,
            StateField::Cached,
            StateField::Warnings,
        ],
        NodeName::ScriptGeneration => &[StateField::Script, StateField::Warnings],
        NodeName::ThumbnailGeneration => &[
            StateField::ThumbnailSuggestions,
            StateField::YoutubeTips,
            StateField::Warnings,
        ],
        NodeName::Finish => &[],
    }
}

/// Typed output of a step. `None` leaves the field untouched; `Some(None)` on an
/// optional field clears it.
#[derive(Debug, Clone, Default)]
pub struct StateUpdate {
    pub query: Option<QueryInput>,
    pub query_metadata: Option<QueryMetadata>,
    pub game_info: Option<Option<GameInfo>>,
    pub event_info: Option<Option<EventInfo>>,
    pub media_assets: Option<Vec<MediaAsset>>,
    pub review_scores: Option<Vec<ReviewScore>>,
    pub research_type: Option<Option<ResearchType>>,
    pub script: Option<Option<ScriptOutput>>,
    pub thumbnail_suggestions: Option<Vec<ThumbnailSuggestion>>,
    pub youtube_tips: Option<BTreeMap<String, Vec<String>>>,
    pub cached: Option<bool>,
    pub warnings: Vec<String>,
}

impl StateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fields this update would write, in declaration order.
    pub fn fields(&self) -> Vec<StateField> {
        let mut fields = Vec::new();
        let mut mark = |present: bool, field: StateField| {
            if present {
                fields.push(field);
            }
        };
        mark(self.query.is_some(), StateField::Query);
        mark(self.query_metadata.is_some(), StateField::QueryMetadata);
        mark(self.game_info.is_some(), StateField::GameInfo);
        mark(self.event_info.is_some(), StateField::EventInfo);
        mark(self.media_assets.is_some(), StateField::MediaAssets);
        mark(self.review_scores.is_some(), StateField::ReviewScores);
        mark(self.research_type.is_some(), StateField::ResearchType);
        mark(self.script.is_some(), StateField::Script);
        mark(self.thumbnail_suggestions.is_some(), StateField::ThumbnailSuggestions);
        mark(self.youtube_tips.is_some(), StateField::YoutubeTips);
        mark(self.cached.is_some(), StateField::Cached);
        mark(!self.warnings.is_empty(), StateField::Warnings);
        fields
    }

    /// Fields written outside the node's ownership set.
    pub fn violations(&self, node: NodeName) -> Vec<StateField> {
        let owned = step_ownership(node);
        self.fields()
            .into_iter()
            .filter(|field| !owned.contains(field))
            .collect()
    }

    pub fn with_query(mut self, query: QueryInput) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_query_metadata(mut self, metadata: QueryMetadata) -> Self {
        self.query_metadata = Some(metadata);
        self
    }

    pub fn with_game_info(mut self, game_info: Option<GameInfo>) -> Self {
        self.game_info = Some(game_info);
        self
    }

    pub fn with_event_info(mut self, event_info: Option<EventInfo>) -> Self {
        self.event_info = Some(event_info);
        self
    }

    pub fn with_media_assets(mut self, assets: Vec<MediaAsset>) -> Self {
        self.media_assets = Some(assets);
        self
    }

    pub fn with_review_scores(mut self, scores: Vec<ReviewScore>) -> Self {
        self.review_scores = Some(scores);
        self
    }

    pub fn with_research_type(mut self, research_type: ResearchType) -> Self {
        self.research_type = Some(Some(research_type));
        self
    }

    pub fn with_script(mut self, script: ScriptOutput) -> Self {
        self.script = Some(Some(script));
        self
    }

    pub fn with_thumbnails(mut self, suggestions: Vec<ThumbnailSuggestion>) -> Self {
        self.thumbnail_suggestions = Some(suggestions);
        self
    }

    pub fn with_youtube_tips(mut self, tips: BTreeMap<String, Vec<String>>) -> Self {
        self.youtube_tips = Some(tips);
        self
    }

    pub fn with_cached(mut self, cached: bool) -> Self {
        self.cached = Some(cached);
        self
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Language, QueryType};

    #[test]
    fn test_initial_state_is_empty() {
        let state = create_initial_state("Review Hades II", 10);
        assert_eq!(state.current_step, "start");
        assert_eq!(state.query.text, "Review Hades II");
        assert_eq!(state.query.duration_minutes, 10);
        assert!(state.query.query_type.is_none());
        assert!(state.errors.is_empty() && state.warnings.is_empty());
        assert!(state.completed_steps.is_empty());
        assert!(state.media_assets.is_empty() && state.review_scores.is_empty());
        assert!(state.thumbnail_suggestions.is_empty() && state.youtube_tips.is_empty());
        assert!(state.game_info.is_none() && state.event_info.is_none() && state.script.is_none());
        assert!(!state.cached);
        assert_eq!(state.processing_time, 0.0);
    }

    #[test]
    fn test_mark_completed_is_idempotent() {
        let mut state = create_initial_state("q", 10);
        state.mark_completed("classify");
        state.mark_completed("research");
        state.mark_completed("classify");
        assert_eq!(state.completed_steps, vec!["classify", "research"]);
    }

    #[test]
    fn test_apply_update_overwrites_only_named_fields() {
        let mut state = create_initial_state("q", 10);
        state.warnings.push("earlier".to_string());
        state.media_assets.push(MediaAsset {
            title: "t".into(),
            url: "u".into(),
            asset_type: "trailer".into(),
            duration_seconds: None,
            channel_name: None,
            upload_date: None,
            language: None,
            source: Default::default(),
        });

        let query = state.query.clone().classified(QueryType::Game, Language::French);
        state.apply_update(
            StateUpdate::new()
                .with_query(query.clone())
                .with_warning("later"),
        );

        assert_eq!(state.query, query);
        assert_eq!(state.media_assets.len(), 1);
        assert_eq!(state.warnings, vec!["earlier", "later"]);
    }

    #[test]
    fn test_update_fields_and_violations() {
        let update = StateUpdate::new()
            .with_script(ScriptOutput {
                title: "t".into(),
                duration_minutes: 10,
                script_content: "c".into(),
                timestamps: BTreeMap::new(),
                format_type: "review".into(),
                language: Language::English,
            })
            .with_cached(true);

        assert_eq!(update.fields(), vec![StateField::Script, StateField::Cached]);
        assert!(update.violations(NodeName::Research) == vec![StateField::Script]);
        assert_eq!(update.violations(NodeName::ScriptGeneration), vec![StateField::Cached]);
        assert!(StateUpdate::new().with_warning("w").violations(NodeName::Classify).is_empty());
    }

    #[test]
    fn test_finish_owns_nothing() {
        assert!(step_ownership(NodeName::Finish).is_empty());
        for node in NodeName::STEPS {
            assert!(step_ownership(node).contains(&StateField::Warnings));
        }
    }
}
