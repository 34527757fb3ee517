// src/agent/script_writer.rs
//! Template-based script generation with section timestamps scaled to the
//! requested duration.

use super::StepAgent;
use crate::error::StepError;
use crate::models::{EventInfo, GameInfo, Language, QueryType, ScriptOutput};
use crate::utils::truncate_text;
use crate::workflow::state::{StateUpdate, WorkflowState};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::info;

#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptWriterAgent;

impl ScriptWriterAgent {
    pub fn new() -> Self {
        Self
    }

    fn write_game_script(&self, state: &WorkflowState, language: Language) -> Result<ScriptOutput, StepError> {
        let game = state.game_info.as_ref().ok_or_else(|| {
            StepError::MissingInput("no game information available for script generation".to_string())
        })?;
        let duration = state.query.duration_minutes;
        let format = state.query_metadata.script_format_or_default().to_string();

        let reviews = state
            .review_scores
            .iter()
            .take(3)
            .map(|r| format!("{}: {}", r.outlet_name, r.score))
            .collect::<Vec<_>>()
            .join(", ");
        let context = GameContext::new(game, reviews, state.media_assets.len(), duration);

        let (script_content, timestamps) = if format == "review" {
            (review_template(&context, language), review_timestamps(duration))
        } else {
            (general_template(&context, &format, language), general_timestamps(duration))
        };

        Ok(ScriptOutput {
            title: format!("{} - {}", game.name, title_case(&format)),
            duration_minutes: duration,
            script_content,
            timestamps,
            format_type: format,
            language,
        })
    }

    fn write_event_script(&self, state: &WorkflowState, language: Language) -> Result<ScriptOutput, StepError> {
        let event = state.event_info.as_ref().ok_or_else(|| {
            StepError::MissingInput("no event information available for script generation".to_string())
        })?;
        let duration = state.query.duration_minutes;

        Ok(ScriptOutput {
            title: format!("{} - Summary", event.title),
            duration_minutes: duration,
            script_content: event_template(event, duration, language),
            timestamps: event_timestamps(duration),
            format_type: "event_summary".to_string(),
            language,
        })
    }
}

#[async_trait]
impl StepAgent for ScriptWriterAgent {
    fn name(&self) -> &'static str {
        "ScriptWriterAgent"
    }

    async fn conduct(&self, state: &WorkflowState) -> Result<StateUpdate, StepError> {
        let language = state.query.language_or_default();
        let script = match state.query.query_type {
            Some(QueryType::Game) => self.write_game_script(state, language)?,
            Some(QueryType::Event) => self.write_event_script(state, language)?,
            None => {
                return Err(StepError::MissingInput(
                    "query type has not been classified".to_string(),
                ))
            }
        };

        info!(
            "✍️ Generated {} script '{}' ({} min, {} sections)",
            script.format_type,
            script.title,
            script.duration_minutes,
            script.timestamps.len()
        );
        Ok(StateUpdate::new().with_script(script))
    }
}

struct GameContext {
    name: String,
    developer: String,
    publisher: String,
    platforms: String,
    genre: String,
    description: String,
    reviews: String,
    media_count: usize,
    duration: u32,
}

impl GameContext {
    fn new(game: &GameInfo, reviews: String, media_count: usize, duration: u32) -> Self {
        Self {
            name: game.name.clone(),
            developer: game.developer.clone().unwrap_or_else(|| "an independent studio".to_string()),
            publisher: game.publisher.clone().unwrap_or_else(|| "its publisher".to_string()),
            platforms: if game.platforms.is_empty() {
                "various platforms".to_string()
            } else {
                game.platforms.join(", ")
            },
            genre: game.genre.clone().unwrap_or_else(|| "game".to_string()),
            description: game
                .description
                .as_deref()
                .map(|d| truncate_text(d, 400, "..."))
                .unwrap_or_default(),
            reviews: if reviews.is_empty() {
                "not yet reviewed".to_string()
            } else {
                reviews
            },
            media_count,
            duration,
        }
    }
}

/// End minutes of the gameplay and critics sections of a review.
fn review_marks(duration: u32) -> (u32, u32) {
    let end_gameplay = duration.saturating_sub(3).min(duration * 6 / 10);
    let end_review = duration.saturating_sub(1).min(duration * 9 / 10);
    (end_gameplay, end_review)
}

fn event_mark(duration: u32) -> u32 {
    duration.saturating_sub(2).min(duration * 8 / 10)
}

fn minute(m: u32) -> String {
    format!("{:02}:00", m)
}

pub fn review_timestamps(duration: u32) -> BTreeMap<String, String> {
    let (gameplay, review) = review_marks(duration);
    BTreeMap::from([
        ("hook".to_string(), "00:00-00:30".to_string()),
        ("overview".to_string(), "00:30-02:00".to_string()),
        ("gameplay".to_string(), format!("02:00-{}", minute(gameplay))),
        ("review_scores".to_string(), format!("{}-{}", minute(gameplay), minute(review))),
        ("conclusion".to_string(), format!("{}-{}", minute(review), minute(duration))),
    ])
}

pub fn general_timestamps(duration: u32) -> BTreeMap<String, String> {
    let closing = duration.saturating_sub(1);
    BTreeMap::from([
        ("intro".to_string(), "00:00-00:30".to_string()),
        ("main_content".to_string(), format!("00:30-{}", minute(closing))),
        ("conclusion".to_string(), format!("{}-{}", minute(closing), minute(duration))),
    ])
}

pub fn event_timestamps(duration: u32) -> BTreeMap<String, String> {
    let highlights = event_mark(duration);
    BTreeMap::from([
        ("intro".to_string(), "00:00-00:30".to_string()),
        ("announcements".to_string(), "00:30-02:00".to_string()),
        ("highlights".to_string(), format!("02:00-{}", minute(highlights))),
        ("conclusion".to_string(), format!("{}-{}", minute(highlights), minute(duration))),
    ])
}

fn review_template(c: &GameContext, language: Language) -> String {
    let (gameplay, review) = review_marks(c.duration);
    let (gameplay, review, end) = (minute(gameplay), minute(review), minute(c.duration));
    match language {
        Language::French => format!(
            "[00:00-00:30] Salut tout le monde ! Aujourd'hui on parle de {name}, développé par {dev}. \
             Ce {genre} a fait beaucoup parler de lui récemment.\n\n\
             [00:30-02:00] {name} est développé par {dev} et édité par {publ}, disponible sur {platforms}. {desc}\n\n\
             [02:00-{gameplay}] Côté gameplay, {name} propose une expérience unique dans le genre {genre}. \
             Le jeu se distingue par ses mécaniques et son attention aux détails.\n\n\
             [{gameplay}-{review}] Côté critiques : {reviews}. La communauté semble apprécier l'expérience globale.\n\n\
             [{review}-{end}] En conclusion, {name} mérite sa place dans votre ludothèque. \
             Dites-moi en commentaire ce que vous en pensez !",
            name = c.name, dev = c.developer, publ = c.publisher, genre = c.genre,
            platforms = c.platforms, desc = c.description, reviews = c.reviews,
        ),
        Language::English => format!(
            "[00:00-00:30] Hey everyone! Today we're diving into {name} from {dev}. \
             This {genre} has been making waves lately.\n\n\
             [00:30-02:00] {name} is developed by {dev} and published by {publ}, available on {platforms}. {desc}\n\n\
             [02:00-{gameplay}] The gameplay in {name} offers a distinct take on the {genre} space, \
             with mechanics and attention to detail that set it apart.\n\n\
             [{gameplay}-{review}] Critics have weighed in: {reviews}. The community response has been strong.\n\n\
             [{review}-{end}] Overall, {name} is a solid addition to your gaming library. \
             Let me know what you think in the comments below!",
            name = c.name, dev = c.developer, publ = c.publisher, genre = c.genre,
            platforms = c.platforms, desc = c.description, reviews = c.reviews,
        ),
    }
}

fn general_template(c: &GameContext, format: &str, language: Language) -> String {
    let closing = minute(c.duration.saturating_sub(1));
    let end = minute(c.duration);
    let kind = title_case(format).to_lowercase();
    match language {
        Language::French => format!(
            "[00:00-00:30] Bienvenue ! Au programme aujourd'hui : {name}, en format {kind}.\n\n\
             [00:30-{closing}] {name} ({genre}) est disponible sur {platforms}. {desc} \
             Nous avons rassemblé {media} vidéos de référence pour illustrer ce contenu.\n\n\
             [{closing}-{end}] Merci d'avoir regardé ! Abonnez-vous pour la suite.",
            name = c.name, genre = c.genre, platforms = c.platforms, desc = c.description,
            media = c.media_count,
        ),
        Language::English => format!(
            "[00:00-00:30] Welcome back! Today's {kind}: {name}.\n\n\
             [00:30-{closing}] {name} is a {genre} available on {platforms}. {desc} \
             We pulled {media} reference videos to walk through it.\n\n\
             [{closing}-{end}] Thanks for watching! Subscribe for more.",
            name = c.name, genre = c.genre, platforms = c.platforms, desc = c.description,
            media = c.media_count,
        ),
    }
}

fn event_template(event: &EventInfo, duration: u32, language: Language) -> String {
    let mark = minute(event_mark(duration));
    let end = minute(duration);
    let games = if event.announced_games.is_empty() {
        None
    } else {
        Some(
            event
                .announced_games
                .iter()
                .take(5)
                .cloned()
                .collect::<Vec<_>>()
                .join(", "),
        )
    };
    let highlights = if event.highlights.is_empty() {
        None
    } else {
        Some(event.highlights.iter().take(3).cloned().collect::<Vec<_>>().join(". "))
    };
    let count = event.announced_games.len();

    match language {
        Language::French => format!(
            "[00:00-00:30] Salut ! Résumé complet de {title} aujourd'hui !\n\n\
             [00:30-02:00] Cet événement nous a apporté {count} annonces majeures : {games}.\n\n\
             [02:00-{mark}] Les moments forts : {highlights}\n\n\
             [{mark}-{end}] C'était un événement riche en surprises ! Dites-moi quel jeu vous attend le plus !",
            title = event.title,
            games = games.unwrap_or_else(|| "plusieurs jeux".to_string()),
            highlights = highlights.unwrap_or_else(|| "des annonces et révélations passionnantes".to_string()),
        ),
        Language::English => format!(
            "[00:00-00:30] Hey everyone! Complete {title} summary coming right up!\n\n\
             [00:30-02:00] This showcase brought us {count} major announcements including: {games}.\n\n\
             [02:00-{mark}] Key highlights include: {highlights}\n\n\
             [{mark}-{end}] What an event! Let me know which announcement excited you most in the comments!",
            title = event.title,
            games = games.unwrap_or_else(|| "various games".to_string()),
            highlights = highlights.unwrap_or_else(|| "exciting announcements and reveals".to_string()),
        ),
    }
}

/// `complete_guide` -> `Complete Guide`
fn title_case(format: &str) -> String {
    format
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
