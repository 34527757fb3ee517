// src/agent/researcher.rs
//! Research step for both query types.
//!
//! Game queries look up the game record, YouTube media and review scores.
//! Event queries analyse the event video and research up to five of the games
//! it announces. Results backed by live lookups are cached; fallback data is
//! tagged and never cached.

use super::StepAgent;
use crate::error::StepError;
use crate::igdb_client::GameDatabase;
use crate::models::{
    DataSource, EventInfo, GameInfo, Language, MediaAsset, QueryType, ResearchType, ReviewScore,
};
use crate::services::CacheService;
use crate::utils::extract_video_id;
use crate::workflow::state::{StateUpdate, WorkflowState};
use crate::youtube_client::{VideoDetails, VideoSearch};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const MEDIA_SEARCHES: [&str; 4] = [
    "official trailer",
    "gameplay",
    "launch trailer",
    "announcement trailer",
];
const MEDIA_RESULTS_PER_SEARCH: u32 = 2;
const MAX_EVENT_GAMES: usize = 5;
const MAX_HIGHLIGHTS: usize = 5;

const HIGHLIGHT_KEYWORDS: &[&str] = &[
    "announced", "revealed", "coming soon", "exclusive", "first look", "gameplay", "trailer",
    "release date",
];

lazy_static! {
    static ref ANNOUNCED_GAME_PATTERNS: Vec<Regex> = [
        r"(?i)\bHalo(?: \w+)?",
        r"(?i)\bCall of Duty:? \w+(?: \w+)?",
        r"(?i)\bAssassin's Creed:? \w+",
        r"(?i)\bGrand Theft Auto \w+",
        r"(?i)\bThe Elder Scrolls:? \w+",
        r"(?i)\bFinal Fantasy \w+",
        r"(?i)\bMetroid Prime \d+",
        r"(?i)\bSpider-Man(?: \d+)?",
        r"(?i)\bBaldur's Gate \d+",
        r"(?i)\bStarfield\b",
        r"(?i)\bHogwarts Legacy\b",
        r"(?i)\bHollow Knight: Silksong\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();
}

/// Cached payload for a game query.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GameResearch {
    game_info: GameInfo,
    media_assets: Vec<MediaAsset>,
    review_scores: Vec<ReviewScore>,
}

/// Cached payload for an event query.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EventResearch {
    event_info: EventInfo,
    media_assets: Vec<MediaAsset>,
}

pub struct ResearchAgent {
    games: Option<Arc<dyn GameDatabase>>,
    videos: Option<Arc<dyn VideoSearch>>,
    cache: CacheService,
    cache_ttl: Duration,
}

impl ResearchAgent {
    pub fn new(
        games: Option<Arc<dyn GameDatabase>>,
        videos: Option<Arc<dyn VideoSearch>>,
        cache: CacheService,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            games,
            videos,
            cache,
            cache_ttl,
        }
    }

    pub fn game_cache_key(game_name: &str, language: Language) -> String {
        format!("game_research:{}:{}", game_name, language.code())
    }

    pub fn event_cache_key(video_url: &str, language: Language) -> String {
        format!("event_research:{}:{}", video_url, language.code())
    }

    async fn research_game(
        &self,
        state: &WorkflowState,
        language: Language,
    ) -> Result<StateUpdate, StepError> {
        let game_name = state
            .query_metadata
            .game_name
            .as_deref()
            .ok_or_else(|| StepError::MissingInput("no game name found for research".to_string()))?;

        let key = Self::game_cache_key(game_name, language);
        if let Some(cached) = self.cache.get_json::<GameResearch>(&key).await {
            info!("💾 Using cached research for game '{}'", game_name);
            return Ok(game_update(cached).with_cached(true));
        }

        let mut warnings = Vec::new();
        let game_info = match self.lookup_game(game_name).await {
            Some(info) => info,
            None => {
                warnings.push(format!("Using fallback data for game: {}", game_name));
                GameInfo::fallback(game_name)
            }
        };
        let media_assets = self.find_media(game_name, language, &mut warnings).await;
        let review_scores = ReviewScore::fallback_set();

        let research = GameResearch {
            game_info,
            media_assets,
            review_scores,
        };
        if !research.game_info.is_fallback() {
            self.cache.set_json(&key, &research, self.cache_ttl).await;
        }

        info!(
            "📚 Researched game '{}': {} media asset(s)",
            research.game_info.name,
            research.media_assets.len()
        );
        let mut update = game_update(research).with_cached(false);
        update.warnings = warnings;
        Ok(update)
    }

    async fn research_event(
        &self,
        state: &WorkflowState,
        language: Language,
    ) -> Result<StateUpdate, StepError> {
        let video_url = state.query_metadata.video_url.as_deref().ok_or_else(|| {
            StepError::MissingInput("no video URL found for event research".to_string())
        })?;

        let key = Self::event_cache_key(video_url, language);
        if let Some(cached) = self.cache.get_json::<EventResearch>(&key).await {
            info!("💾 Using cached research for event '{}'", video_url);
            return Ok(event_update(cached).with_cached(true));
        }

        let video_id = extract_video_id(video_url).ok_or_else(|| {
            StepError::failed(format!("Failed to analyze event video: unrecognised URL {}", video_url))
        })?;

        let mut warnings = Vec::new();
        let (details, source) = match self.lookup_video(&video_id).await {
            Some(details) => (details, DataSource::Lookup),
            None => {
                warnings.push(format!("Using fallback data for event video: {}", video_url));
                (fallback_video(&video_id), DataSource::Fallback)
            }
        };

        let text = format!("{} {}", details.title, details.description);
        let announced_games = extract_announced_games(&text);
        let highlights = extract_highlights(&details.title, &details.description);

        let mut announced_game_info = Vec::new();
        let mut media_assets = Vec::new();
        for game in announced_games.iter().take(MAX_EVENT_GAMES) {
            if let Some(info) = self.lookup_game(game).await {
                announced_game_info.push(info);
            }
            media_assets.extend(self.find_media(game, language, &mut warnings).await);
        }

        let research = EventResearch {
            event_info: EventInfo {
                title: details.title,
                video_url: video_url.to_string(),
                duration_seconds: details.duration_seconds,
                announced_games,
                announced_game_info,
                highlights,
                timestamps: BTreeMap::new(),
                source,
            },
            media_assets,
        };
        if source == DataSource::Lookup {
            self.cache.set_json(&key, &research, self.cache_ttl.saturating_mul(2)).await;
        }

        info!(
            "📚 Researched event '{}': {} announced game(s)",
            research.event_info.title,
            research.event_info.announced_games.len()
        );
        let mut update = event_update(research).with_cached(false);
        update.warnings = warnings;
        Ok(update)
    }

    async fn lookup_game(&self, name: &str) -> Option<GameInfo> {
        let db = self.games.as_ref()?;
        match db.search_game(name).await {
            Ok(found) => found,
            Err(e) => {
                warn!("⚠️ Game lookup failed for '{}': {}", name, e);
                None
            }
        }
    }

    async fn lookup_video(&self, video_id: &str) -> Option<VideoDetails> {
        let videos = self.videos.as_ref()?;
        match videos.get_video_details(video_id).await {
            Ok(found) => found,
            Err(e) => {
                warn!("⚠️ Video lookup failed for '{}': {}", video_id, e);
                None
            }
        }
    }

    async fn find_media(
        &self,
        game_name: &str,
        language: Language,
        warnings: &mut Vec<String>,
    ) -> Vec<MediaAsset> {
        let Some(videos) = self.videos.as_ref() else {
            warnings.push(format!("Video search unavailable, no media assets for: {}", game_name));
            return Vec::new();
        };

        let mut assets = Vec::new();
        for suffix in MEDIA_SEARCHES {
            let query = format!("{} {}", game_name, suffix);
            match videos
                .search_videos(&query, MEDIA_RESULTS_PER_SEARCH, language)
                .await
            {
                Ok(found) => assets.extend(found.into_iter().map(|video| {
                    let asset_type = asset_type_for(&video.title, suffix);
                    video.into_media_asset(asset_type, language)
                })),
                Err(e) => warn!("⚠️ Video search '{}' failed: {}", query, e),
            }
        }
        assets
    }
}

#[async_trait]
impl StepAgent for ResearchAgent {
    fn name(&self) -> &'static str {
        "ResearchAgent"
    }

    async fn conduct(&self, state: &WorkflowState) -> Result<StateUpdate, StepError> {
        let language = state.query.language_or_default();
        match state.query.query_type {
            Some(QueryType::Game) => self.research_game(state, language).await,
            Some(QueryType::Event) => self.research_event(state, language).await,
            None => Err(StepError::MissingInput(
                "query type has not been classified".to_string(),
            )),
        }
    }
}

fn game_update(research: GameResearch) -> StateUpdate {
    StateUpdate::new()
        .with_game_info(Some(research.game_info))
        .with_event_info(None)
        .with_media_assets(research.media_assets)
        .with_review_scores(research.review_scores)
        .with_research_type(ResearchType::Game)
}

fn event_update(research: EventResearch) -> StateUpdate {
    StateUpdate::new()
        .with_event_info(Some(research.event_info))
        .with_game_info(None)
        .with_media_assets(research.media_assets)
        .with_review_scores(Vec::new())
        .with_research_type(ResearchType::Event)
}

fn fallback_video(video_id: &str) -> VideoDetails {
    VideoDetails {
        id: video_id.to_string(),
        title: "Gaming Event".to_string(),
        description: String::new(),
        channel_name: None,
        published_at: None,
        duration_seconds: None,
    }
}

fn asset_type_for(title: &str, search: &str) -> &'static str {
    let title = title.to_lowercase();
    if search.contains("trailer") {
        if title.contains("launch") || title.contains("release") {
            "launch_trailer"
        } else if title.contains("announce") {
            "announcement_trailer"
        } else {
            "trailer"
        }
    } else if search.contains("gameplay") {
        "gameplay"
    } else {
        "other"
    }
}

/// Game titles recognised in event text, first occurrence order, no duplicates.
pub fn extract_announced_games(text: &str) -> Vec<String> {
    let mut found: Vec<(usize, String)> = Vec::new();
    for pattern in ANNOUNCED_GAME_PATTERNS.iter() {
        for m in pattern.find_iter(text) {
            let name = m.as_str().trim().to_string();
            if !found.iter().any(|(_, n)| n.eq_ignore_ascii_case(&name)) {
                found.push((m.start(), name));
            }
        }
    }
    found.sort_by_key(|(pos, _)| *pos);
    found.into_iter().map(|(_, name)| name).collect()
}

/// One sentence per highlight keyword, at most five.
pub fn extract_highlights(title: &str, description: &str) -> Vec<String> {
    let text = format!("{}. {}", title, description).to_lowercase();
    let sentences: Vec<&str> = text
        .split(|c| c == '.' || c == '\n' || c == '!')
        .map(str::trim)
        .filter(|s| s.chars().count() > 10)
        .collect();

    let mut highlights: Vec<String> = Vec::new();
    for keyword in HIGHLIGHT_KEYWORDS {
        if let Some(sentence) = sentences.iter().find(|s| s.contains(keyword)) {
            let highlight = capitalize(sentence);
            if !highlights.contains(&highlight) {
                highlights.push(highlight);
            }
        }
        if highlights.len() == MAX_HIGHLIGHTS {
            break;
        }
    }
    highlights
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LookupError;
    use crate::models::QueryMetadata;
    use crate::workflow::graph::NodeName;
    use crate::workflow::state::create_initial_state;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingDatabase {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GameDatabase for CountingDatabase {
        async fn search_game(&self, name: &str) -> Result<Option<GameInfo>, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(GameInfo {
                source: DataSource::Lookup,
                ..GameInfo::fallback(name)
            }))
        }
    }

    struct FixedVideos;

    #[async_trait]
    impl VideoSearch for FixedVideos {
        async fn search_videos(
            &self,
            query: &str,
            _max_results: u32,
            _language: Language,
        ) -> Result<Vec<VideoDetails>, LookupError> {
            Ok(vec![VideoDetails {
                id: "abcdefghijk".into(),
                title: format!("{} (Official)", query),
                description: String::new(),
                channel_name: None,
                published_at: None,
                duration_seconds: None,
            }])
        }

        async fn get_video_details(&self, video_id: &str) -> Result<Option<VideoDetails>, LookupError> {
            Ok(Some(VideoDetails {
                id: video_id.into(),
                title: "Xbox Games Showcase 2024".into(),
                description: "Call of Duty Black Ops 6 gameplay revealed. Gears of War E-Day announced \
                              with a first look trailer. Halo Infinite update coming soon."
                    .into(),
                channel_name: Some("Xbox".into()),
                published_at: None,
                duration_seconds: Some(5400),
            }))
        }
    }

    fn game_state(name: &str) -> WorkflowState {
        let mut state = create_initial_state("review", 10);
        state.query = state.query.classified(QueryType::Game, Language::English);
        state.query_metadata = QueryMetadata {
            game_name: Some(name.to_string()),
            ..Default::default()
        };
        state
    }

    #[tokio::test]
    async fn test_warm_cache_skips_lookups() {
        let db = Arc::new(CountingDatabase::default());
        let agent = ResearchAgent::new(
            Some(db.clone()),
            Some(Arc::new(FixedVideos)),
            CacheService::in_memory(),
            Duration::from_secs(60),
        );
        let state = game_state("Hades II");

        let first = agent.conduct(&state).await.unwrap();
        assert_eq!(first.cached, Some(false));
        assert_eq!(first.media_assets.as_ref().map(Vec::len), Some(4));
        assert!(first.warnings.is_empty());

        let second = agent.conduct(&state).await.unwrap();
        assert_eq!(second.cached, Some(true));
        assert_eq!(second.game_info, first.game_info);
        assert_eq!(db.calls.load(Ordering::SeqCst), 1);
        assert!(second.violations(NodeName::Research).is_empty());
    }

    #[tokio::test]
    async fn test_unconfigured_services_fall_back_and_skip_cache() {
        let cache = CacheService::in_memory();
        let agent = ResearchAgent::new(None, None, cache.clone(), Duration::from_secs(60));
        let update = agent.conduct(&game_state("Silksong")).await.unwrap();

        let info = update.game_info.clone().flatten().unwrap();
        assert!(info.is_fallback());
        assert!(update
            .warnings
            .contains(&"Using fallback data for game: Silksong".to_string()));
        assert!(update
            .review_scores
            .unwrap()
            .iter()
            .all(|r| r.source == DataSource::Fallback));
        assert_eq!(
            cache.get(&ResearchAgent::game_cache_key("Silksong", Language::English)).await,
            None
        );
    }

    #[tokio::test]
    async fn test_missing_game_name_is_an_error() {
        let agent = ResearchAgent::new(None, None, CacheService::in_memory(), Duration::from_secs(60));
        let mut state = game_state("x");
        state.query_metadata.game_name = None;
        assert!(matches!(
            agent.conduct(&state).await,
            Err(StepError::MissingInput(_))
        ));
    }

    #[tokio::test]
    async fn test_event_research() {
        let db = Arc::new(CountingDatabase::default());
        let agent = ResearchAgent::new(
            Some(db.clone()),
            Some(Arc::new(FixedVideos)),
            CacheService::in_memory(),
            Duration::from_secs(60),
        );
        let mut state = create_initial_state("summarize", 10);
        state.query = state.query.classified(QueryType::Event, Language::English);
        state.query_metadata.video_url = Some("https://youtu.be/abcdefghijk".into());

        let update = agent.conduct(&state).await.unwrap();
        let event = update.event_info.clone().flatten().unwrap();
        assert_eq!(event.title, "Xbox Games Showcase 2024");
        assert_eq!(event.announced_games, vec!["Call of Duty Black Ops", "Halo Infinite"]);
        assert_eq!(event.announced_game_info.len(), 2);
        assert!(!event.highlights.is_empty() && event.highlights.len() <= 5);
        assert_eq!(update.research_type, Some(Some(ResearchType::Event)));
        assert_eq!(update.review_scores, Some(Vec::new()));
        assert!(update.violations(NodeName::Research).is_empty());
    }

    #[tokio::test]
    async fn test_event_cache_ttl_saturates() {
        let db = Arc::new(CountingDatabase::default());
        let agent = ResearchAgent::new(
            Some(db.clone()),
            Some(Arc::new(FixedVideos)),
            CacheService::in_memory(),
            Duration::MAX,
        );
        let mut state = create_initial_state("summarize", 10);
        state.query = state.query.classified(QueryType::Event, Language::English);
        state.query_metadata.video_url = Some("https://youtu.be/abcdefghijk".into());

        let first = agent.conduct(&state).await.unwrap();
        assert_eq!(first.cached, Some(false));
        let lookups = db.calls.load(Ordering::SeqCst);

        let second = agent.conduct(&state).await.unwrap();
        assert_eq!(second.cached, Some(true));
        assert_eq!(second.event_info, first.event_info);
        assert_eq!(db.calls.load(Ordering::SeqCst), lookups);
    }

    #[test]
    fn test_asset_types() {
        assert_eq!(asset_type_for("Hades II - Launch Trailer", "launch trailer"), "launch_trailer");
        assert_eq!(asset_type_for("Hades II Announcement", "announcement trailer"), "announcement_trailer");
        assert_eq!(asset_type_for("20 minutes of Hades II", "gameplay"), "gameplay");
    }

    #[test]
    fn test_highlights_are_capped() {
        let highlights = extract_highlights(
            "Showcase",
            "Fable was announced today. Perfect Dark revealed in full. An exclusive deal was signed. \
             A first look at Doom. New gameplay footage shown. A trailer dropped for Gears. \
             The release date is set for October.",
        );
        assert_eq!(highlights.len(), 5);
        assert_eq!(highlights[0], "Fable was announced today");
    }
}
