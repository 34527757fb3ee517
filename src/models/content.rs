// src/models/content.rs
//! Research records. Anything that may be substituted with placeholder data
//! carries a [`DataSource`] so fallbacks stay distinguishable from lookups.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// Returned by an external lookup service
    #[default]
    Lookup,
    /// Placeholder produced because the lookup was unavailable
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResearchType {
    Game,
    Event,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameInfo {
    pub name: String,
    pub developer: Option<String>,
    pub publisher: Option<String>,
    pub release_date: Option<String>,
    pub platforms: Vec<String>,
    pub genre: Option<String>,
    pub price: Option<f64>,
    pub description: Option<String>,
    pub rating: Option<f64>,
    #[serde(default)]
    pub source: DataSource,
}

impl GameInfo {
    pub fn fallback(game_name: &str) -> Self {
        Self {
            name: game_name.to_string(),
            developer: Some("Game Studio".to_string()),
            publisher: Some("Publisher".to_string()),
            release_date: Some("2023".to_string()),
            platforms: vec!["PC".into(), "PlayStation".into(), "Xbox".into()],
            genre: Some("Adventure".to_string()),
            price: None,
            description: Some(format!(
                "An exciting {} gaming experience with immersive gameplay and engaging story.",
                game_name
            )),
            rating: None,
            source: DataSource::Fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == DataSource::Fallback
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaAsset {
    pub title: String,
    pub url: String,
    /// trailer, launch_trailer, announcement_trailer, gameplay, review, other
    pub asset_type: String,
    pub duration_seconds: Option<u64>,
    pub channel_name: Option<String>,
    pub upload_date: Option<String>,
    pub language: Option<String>,
    #[serde(default)]
    pub source: DataSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewScore {
    pub outlet_name: String,
    pub score: String,
    pub max_score: Option<String>,
    pub review_url: Option<String>,
    pub summary: Option<String>,
    #[serde(default)]
    pub source: DataSource,
}

impl ReviewScore {
    pub fn fallback_set() -> Vec<ReviewScore> {
        vec![
            ReviewScore {
                outlet_name: "Gaming Review".to_string(),
                score: "8.5".to_string(),
                max_score: Some("10".to_string()),
                review_url: None,
                summary: Some("Solid gameplay with engaging mechanics".to_string()),
                source: DataSource::Fallback,
            },
            ReviewScore {
                outlet_name: "Game Critic".to_string(),
                score: "85".to_string(),
                max_score: Some("100".to_string()),
                review_url: None,
                summary: Some("Impressive visuals and storytelling".to_string()),
                source: DataSource::Fallback,
            },
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventInfo {
    pub title: String,
    pub video_url: String,
    pub duration_seconds: Option<u64>,
    pub announced_games: Vec<String>,
    /// Lookup results for the announced games, at most five
    #[serde(default)]
    pub announced_game_info: Vec<GameInfo>,
    pub highlights: Vec<String>,
    pub timestamps: BTreeMap<String, String>,
    #[serde(default)]
    pub source: DataSource,
}
