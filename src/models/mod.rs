// src/models/mod.rs
pub mod content;
pub mod output;
pub mod query;

pub use content::{DataSource, EventInfo, GameInfo, MediaAsset, ResearchType, ReviewScore};
pub use output::{ProcessingResult, ScriptOutput, ThumbnailSuggestion};
pub use query::{Language, QueryInput, QueryMetadata, QueryType};
