// src/agent/classifier.rs
//! Query classification: relevance gate, language, query type, and the
//! metadata later steps need (game name, event video URL, script format).
//!
//! Every LLM decision has a keyword heuristic behind it, used when no model
//! is configured or the call fails.

use super::StepAgent;
use crate::error::StepError;
use crate::llm_client::LlmService;
use crate::models::{Language, QueryMetadata, QueryType};
use crate::workflow::state::{StateUpdate, WorkflowState};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const SCRIPT_FORMATS: [&str; 5] = ["preview", "review", "summary", "complete_guide", "general"];
const CLASSIFICATION_CONFIDENCE: f64 = 0.9;

const GAMING_KEYWORDS: &[&str] = &[
    "game", "gaming", "gameplay", "review", "preview", "trailer", "nintendo", "playstation",
    "xbox", "steam", "rpg", "fps", "mmo", "indie", "aaa", "multiplayer", "zelda", "mario",
    "pokemon", "minecraft", "fortnite", "call of duty", "showcase", "direct", "conference",
    "e3", "gdc", "gamescom", "tournament", "esports", "jeu", "critique",
];

const CONTENT_KEYWORDS: &[&str] = &[
    "youtube", "video", "vidéo", "script", "thumbnail", "channel", "streaming", "twitch",
    "creator", "upload", "subscribe", "views", "engagement",
];

const EVENT_KEYWORDS: &[&str] = &[
    "direct", "showcase", "state of play", "game awards", "gamescom", "summer game fest",
    "e3", "pax", "conference", "keynote", "presentation", "livestream",
];

const FRENCH_WORDS: &[&str] = &[
    "le", "la", "les", "de", "du", "des", "un", "une", "et", "est", "sur", "avec", "pour",
    "dans", "par", "fais", "crée", "créer", "résumé", "vidéo", "critique", "aperçu", "jeu",
];

const ENGLISH_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "in", "on", "at", "to", "for", "of", "with", "by", "make",
    "create", "write", "review", "preview", "game", "about", "summarize",
];

lazy_static! {
    static ref VIDEO_URL: Regex = Regex::new(r#"https?://[^\s"'<>]+"#).unwrap();
    static ref QUOTED: Regex = Regex::new(r#"["“«]\s*([^"”»]+?)\s*["”»]"#).unwrap();
    static ref GAME_AFTER_PREPOSITION: Regex =
        Regex::new(r"(?i)\b(?:about|of|for|on|de|du|sur)\s+(.+)$").unwrap();
    static ref TRAILING_DURATION: Regex =
        Regex::new(r"(?i)[\s,]+(?:in|en)\s+\d+\s*(?:minutes?|min)\b.*$").unwrap();
}

pub struct ClassifierAgent {
    llm: Option<Arc<dyn LlmService>>,
}

struct Relevance {
    relevant: bool,
    reason: String,
}

impl ClassifierAgent {
    pub fn new(llm: Option<Arc<dyn LlmService>>) -> Self {
        Self { llm }
    }

    /// Ask the model, `None` when no model is bound or the call failed.
    async fn ask(&self, prompt: &str, max_tokens: u32, degraded: &mut bool) -> Option<String> {
        let llm = self.llm.as_ref()?;
        match llm.generate_text(prompt, max_tokens).await {
            Ok(text) => Some(text.trim().to_string()),
            Err(e) => {
                warn!("Classifier LLM call failed, using heuristics: {}", e);
                *degraded = true;
                None
            }
        }
    }

    async fn check_relevance(&self, text: &str, degraded: &mut bool) -> Relevance {
        let prompt = format!(
            "You are a content relevance validator for a gaming YouTube content creation tool.\n\
             Decide whether this query is about video games, gaming events or YouTube content creation.\n\n\
             Query: \"{}\"\n\n\
             Respond in this exact format:\nRELEVANT: [YES/NO]\nREASON: [Brief explanation]",
            text
        );
        match self.ask(&prompt, 150, degraded).await {
            Some(response) => parse_relevance(&response),
            None => keyword_relevance(text),
        }
    }

    async fn detect_language(&self, text: &str, degraded: &mut bool) -> Language {
        let prompt = format!(
            "Detect the language of this text. Respond with only \"ENGLISH\" or \"FRENCH\".\n\nText: \"{}\"\n\nLanguage:",
            text
        );
        match self.ask(&prompt, 10, degraded).await {
            Some(r) if r.to_uppercase().contains("FRENCH") => Language::French,
            Some(r) if r.to_uppercase().contains("ENGLISH") => Language::English,
            Some(_) => Language::English,
            None => detect_language_heuristic(text),
        }
    }

    async fn classify_type(&self, text: &str, degraded: &mut bool) -> QueryType {
        let prompt = format!(
            "Classify this gaming content request.\n\
             EVENT: gaming events, showcases, conferences, streams, or analysis of a specific video URL.\n\
             GAME: specific games, reviews, previews, or general gaming content.\n\n\
             Query: \"{}\"\n\nRespond with only \"EVENT\" or \"GAME\".",
            text
        );
        match self.ask(&prompt, 10, degraded).await {
            Some(r) if r.to_uppercase().contains("EVENT") => QueryType::Event,
            Some(r) if r.to_uppercase().contains("GAME") => QueryType::Game,
            Some(_) => QueryType::Game,
            None => classify_type_heuristic(text),
        }
    }

    async fn extract_game_name(&self, text: &str, degraded: &mut bool) -> Option<String> {
        let prompt = format!(
            "Extract the game name from this gaming content request.\n\
             If no specific game name is mentioned, respond with \"NONE\".\n\n\
             Query: \"{}\"\n\nGame name:",
            text
        );
        match self.ask(&prompt, 50, degraded).await {
            Some(r) => {
                let name = r.trim_matches(|c| c == '"' || c == '\'').trim();
                if name.is_empty() || name.eq_ignore_ascii_case("NONE") {
                    None
                } else {
                    Some(name.to_string())
                }
            }
            None => extract_game_name_heuristic(text),
        }
    }

    async fn extract_format(&self, text: &str, degraded: &mut bool) -> String {
        let prompt = format!(
            "Identify the content format requested in this query.\n\
             Choose from: preview, review, summary, complete_guide, or general.\n\n\
             Query: \"{}\"\n\nFormat:",
            text
        );
        match self.ask(&prompt, 20, degraded).await {
            Some(r) => {
                let candidate = r.to_lowercase();
                if SCRIPT_FORMATS.contains(&candidate.as_str()) {
                    candidate
                } else {
                    "review".to_string()
                }
            }
            None => detect_format_heuristic(text).to_string(),
        }
    }
}

#[async_trait]
impl StepAgent for ClassifierAgent {
    fn name(&self) -> &'static str {
        "ClassifierAgent"
    }

    async fn conduct(&self, state: &WorkflowState) -> Result<StateUpdate, StepError> {
        let text = state.query.text.as_str();
        let mut degraded = false;

        let relevance = self.check_relevance(text, &mut degraded).await;
        if !relevance.relevant {
            return Err(StepError::Irrelevant(relevance.reason));
        }

        let language = self.detect_language(text, &mut degraded).await;
        let query_type = self.classify_type(text, &mut degraded).await;

        let game_name = match query_type {
            QueryType::Game => self.extract_game_name(text, &mut degraded).await,
            QueryType::Event => None,
        };
        let video_url = match query_type {
            QueryType::Event => extract_video_url(text),
            QueryType::Game => None,
        };
        let script_format = self.extract_format(text, &mut degraded).await;

        info!(
            "🔎 Classified query as {} ({}), format {}",
            query_type, language, script_format
        );
        debug!("game_name={:?} video_url={:?}", game_name, video_url);

        let metadata = QueryMetadata {
            confidence: Some(CLASSIFICATION_CONFIDENCE),
            game_name,
            video_url,
            script_format: Some(script_format),
            relevance_reason: Some(relevance.reason),
            ..Default::default()
        };

        let mut update = StateUpdate::new()
            .with_query(state.query.clone().classified(query_type, language))
            .with_query_metadata(metadata);
        if degraded {
            update = update.with_warning("LLM unavailable during classification, keyword heuristics were used");
        }
        Ok(update)
    }
}

fn parse_relevance(response: &str) -> Relevance {
    let line = |prefix: &str| {
        response
            .lines()
            .map(str::trim)
            .find(|l| l.to_uppercase().starts_with(prefix))
            .map(|l| l[prefix.len()..].trim().to_string())
    };
    let relevant = line("RELEVANT:")
        .map(|v| v.to_uppercase().contains("YES"))
        .unwrap_or(false);
    let reason = line("REASON:").unwrap_or_else(|| "Query relevance unclear".to_string());
    Relevance { relevant, reason }
}

fn keyword_relevance(text: &str) -> Relevance {
    let lower = text.to_lowercase();
    let score = GAMING_KEYWORDS
        .iter()
        .chain(CONTENT_KEYWORDS)
        .filter(|k| lower.contains(*k))
        .count();
    if score > 0 {
        Relevance {
            relevant: true,
            reason: "Query appears gaming/content related".to_string(),
        }
    } else {
        Relevance {
            relevant: false,
            reason: "No gaming or content-creation keywords found".to_string(),
        }
    }
}

pub fn detect_language_heuristic(text: &str) -> Language {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .collect();
    let french = words.iter().filter(|w| FRENCH_WORDS.contains(w)).count();
    let english = words.iter().filter(|w| ENGLISH_WORDS.contains(w)).count();
    if french > english {
        Language::French
    } else {
        Language::English
    }
}

pub fn classify_type_heuristic(text: &str) -> QueryType {
    let lower = text.to_lowercase();
    if VIDEO_URL.is_match(text) || EVENT_KEYWORDS.iter().any(|k| lower.contains(k)) {
        QueryType::Event
    } else {
        QueryType::Game
    }
}

pub fn extract_game_name_heuristic(text: &str) -> Option<String> {
    if let Some(caps) = QUOTED.captures(text) {
        return Some(caps[1].to_string());
    }
    let caps = GAME_AFTER_PREPOSITION.captures(text)?;
    let name = TRAILING_DURATION.replace(&caps[1], "");
    let name = name.trim().trim_end_matches(|c: char| ".!?".contains(c)).trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

pub fn extract_video_url(text: &str) -> Option<String> {
    VIDEO_URL
        .find(text)
        .map(|m| m.as_str().trim_end_matches(|c: char| ".,;!?)".contains(c)).to_string())
}

pub fn detect_format_heuristic(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    if lower.contains("preview") || lower.contains("aperçu") {
        "preview"
    } else if lower.contains("guide") {
        "complete_guide"
    } else if lower.contains("summar") || lower.contains("résumé") || lower.contains("recap") {
        "summary"
    } else {
        "review"
    }
}
