// src/agent/youtube_coach.rs
//! Thumbnail concepts and channel optimisation tips for a finished script.

use super::StepAgent;
use crate::error::StepError;
use crate::models::{ResearchType, ScriptOutput, ThumbnailSuggestion};
use crate::workflow::state::{StateUpdate, WorkflowState};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::info;

#[derive(Debug, Default, Clone, Copy)]
pub struct YouTubeCoachAgent;

impl YouTubeCoachAgent {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StepAgent for YouTubeCoachAgent {
    fn name(&self) -> &'static str {
        "YouTubeCoachAgent"
    }

    async fn conduct(&self, state: &WorkflowState) -> Result<StateUpdate, StepError> {
        let script = state.script.as_ref().ok_or_else(|| {
            StepError::MissingInput("no script available for thumbnail generation".to_string())
        })?;

        let thumbnails = match state.research_type {
            Some(ResearchType::Game) => game_thumbnails(state, script),
            Some(ResearchType::Event) => event_thumbnails(state),
            None => default_thumbnails(script),
        };
        let tips = optimization_tips(state.research_type);

        info!(
            "🖼️ Prepared {} thumbnail concept(s) and {} tip group(s)",
            thumbnails.len(),
            tips.len()
        );
        Ok(StateUpdate::new()
            .with_thumbnails(thumbnails)
            .with_youtube_tips(tips))
    }
}

fn suggestion(style: &str, prompt: String, description: String, ctr: &str, notes: &[&str]) -> ThumbnailSuggestion {
    ThumbnailSuggestion {
        style: style.to_string(),
        prompt,
        description,
        target_ctr: ctr.to_string(),
        design_notes: notes.iter().map(|n| n.to_string()).collect(),
    }
}

fn game_thumbnails(state: &WorkflowState, script: &ScriptOutput) -> Vec<ThumbnailSuggestion> {
    let game = state.game_info.as_ref();
    let name = game.map(|g| g.name.as_str()).unwrap_or("Game");
    let genre = game
        .and_then(|g| g.genre.as_deref())
        .unwrap_or("Gaming")
        .to_lowercase();
    let is_review = script.format_type == "review";

    let (emotion, colors) = if is_review {
        ("shocked", "vibrant red and yellow")
    } else {
        ("hyped", "electric blue and purple")
    };
    let visual = if genre.contains("action") || genre.contains("rpg") || genre.contains("role-playing") {
        "epic boss battle"
    } else {
        "stunning landscape"
    };
    let hook = if is_review { "WORTH IT?" } else { "THE HYPE REAL?" };

    vec![
        suggestion(
            "Emotional Reaction",
            format!(
                "YouTube thumbnail: Person with {emotion} facial expression, mouth open, pointing at {name} logo. \
                 {colors} gradient background. Bold white text '{name}' at top, 'THIS IS INSANE!' at bottom. \
                 High contrast, dramatic lighting. Ultra-realistic, 4K quality."
            ),
            format!("High-impact emotional thumbnail for {} content", script.format_type),
            "8-12%",
            &[
                "Exaggerated expression drives engagement",
                "Saturated colors stand out in the feed",
                "Large text readable on mobile devices",
                "Pointing gesture creates a clear focus direction",
            ],
        ),
        suggestion(
            "Game Visual Showcase",
            format!(
                "YouTube thumbnail: Split screen showing {visual} from {name} on left, excited gamer face on right. \
                 Neon green arrow pointing from person to game. Text: '{name}' (large, white with black outline), \
                 'INCREDIBLE' (smaller, bright yellow). Dark background with subtle game-themed effects."
            ),
            "Showcases actual game visuals while keeping personality".to_string(),
            "6-10%",
            &[
                "Split-screen layout balances game content and personality",
                "Neon arrows guide viewer attention",
                "Dark background makes colors pop",
                "Game screenshots build credibility",
            ],
        ),
        suggestion(
            "Curiosity Hook",
            format!(
                "YouTube thumbnail: {name} logo prominently displayed with question mark overlay. \
                 Thoughtful person chin-in-hand pose. Background: blurred game screenshots montage. \
                 Large yellow text '{hook}'. Blue and orange color scheme for high contrast."
            ),
            "Curiosity-driven thumbnail that encourages clicks".to_string(),
            "7-11%",
            &[
                "Question format creates a curiosity gap",
                "Thoughtful pose suggests analytical content",
                "Blue/orange contrast maximises visibility",
            ],
        ),
    ]
}

fn event_thumbnails(state: &WorkflowState) -> Vec<ThumbnailSuggestion> {
    let event = state.event_info.as_ref();
    let title = event.map(|e| e.title.as_str()).unwrap_or("Gaming Event");
    let count = event.map(|e| e.announced_games.len()).unwrap_or(0);

    vec![
        suggestion(
            "Event Reaction",
            format!(
                "YouTube thumbnail: Person with shocked expression, hands on head. Background: {title} logo \
                 with game logos arranged around it. Red arrow pointing to the biggest announcement. \
                 White text '{title}' at top, 'MIND BLOWN!' at bottom. Explosive red, yellow and white effects."
            ),
            "High-energy reaction thumbnail for event coverage".to_string(),
            "9-13%",
            &[
                "Shocked expression signals exciting content",
                "Multiple game logos show comprehensive coverage",
                "Arrow highlights the biggest announcement",
            ],
        ),
        suggestion(
            "Game Lineup",
            format!(
                "YouTube thumbnail: Grid layout showing the major game logos from {title}. \
                 Center text: '{count} HUGE GAMES!' in bold white on red. Bottom banner: 'EVERYTHING ANNOUNCED' \
                 in yellow. Dark background with subtle gaming pattern."
            ),
            "Information-rich thumbnail showing content value".to_string(),
            "6-9%",
            &[
                "Grid layout shows comprehensive coverage",
                "A number emphasises the value on offer",
                "Dark background prevents visual clutter",
            ],
        ),
        suggestion(
            "Hype Meter",
            format!(
                "YouTube thumbnail: Split screen, left side shows calm person 'BEFORE {title}', right side \
                 shows the same person extremely excited 'AFTER'. Progress bar at bottom filled to 100% \
                 labeled 'HYPE METER'. Large text: 'THIS CHANGED EVERYTHING!'"
            ),
            "Before/after concept showing transformative content".to_string(),
            "8-12%",
            &[
                "Before/after creates a story",
                "Progress bar visualises impact",
                "Bright green and red keep it visible",
            ],
        ),
    ]
}

fn default_thumbnails(script: &ScriptOutput) -> Vec<ThumbnailSuggestion> {
    let title = &script.title;
    vec![
        suggestion(
            "Bold Text",
            format!(
                "YouTube thumbnail: Large bold text '{title}' on bright gradient background. \
                 Excited person pointing at text. High contrast colors."
            ),
            "Simple, effective text-focused thumbnail".to_string(),
            "5-8%",
            &["Bold text ensures readability", "High contrast maximises visibility"],
        ),
        suggestion(
            "Question Hook",
            "YouTube thumbnail: Person with curious expression, question mark overlay, \
             text 'WORTH WATCHING?' in large font."
                .to_string(),
            "Curiosity-driven engagement thumbnail".to_string(),
            "6-9%",
            &["Question format creates curiosity", "Clear emotional expression"],
        ),
        suggestion(
            "Reaction",
            "YouTube thumbnail: Shocked facial expression, bright background, \
             text 'UNBELIEVABLE!' in bold letters."
                .to_string(),
            "Emotional reaction thumbnail".to_string(),
            "7-10%",
            &["Strong emotion drives engagement", "Bold text complements expression"],
        ),
    ]
}

fn tips(items: &[&str]) -> Vec<String> {
    items.iter().map(|t| t.to_string()).collect()
}

pub fn optimization_tips(research_type: Option<ResearchType>) -> BTreeMap<String, Vec<String>> {
    let mut groups = BTreeMap::from([
        (
            "mobile_optimization".to_string(),
            tips(&[
                "Text must be readable on mobile screens (minimum 30pt font)",
                "Use high contrast colors (white text on dark background)",
                "Avoid small details that disappear at thumbnail size",
                "Keep important elements in the center 80% of the image",
            ]),
        ),
        (
            "color_psychology".to_string(),
            tips(&[
                "Red/Orange: urgency and excitement",
                "Blue/Purple: professionalism and trust",
                "Yellow/Green: positivity and success",
                "High contrast pairs perform best (blue/orange, red/white)",
            ]),
        ),
        (
            "facial_expressions".to_string(),
            tips(&[
                "Surprised expressions tend to lift click-through",
                "Pointing gestures direct attention",
                "Direct eye contact with the camera builds connection",
                "Exaggerated emotions read better than subtle ones",
            ]),
        ),
    ]);

    match research_type {
        Some(ResearchType::Game) => {
            groups.insert(
                "game_specific".to_string(),
                tips(&[
                    "Include recognizable game elements (logos, characters, UI)",
                    "Match the color scheme to the genre (dark for horror, bright for adventure)",
                    "Show gameplay screenshots for credibility",
                    "Add rating or score elements for review content",
                ]),
            );
        }
        Some(ResearchType::Event) => {
            groups.insert(
                "event_specific".to_string(),
                tips(&[
                    "Show multiple game logos for a comprehensive feel",
                    "Use the event's branding colors when possible",
                    "Include the number of games announced",
                    "Highlight the biggest announcement with arrows",
                ]),
            );
        }
        None => {}
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventInfo, GameInfo, Language};
    use crate::workflow::graph::NodeName;
    use crate::workflow::state::create_initial_state;

    fn script(format: &str) -> ScriptOutput {
        ScriptOutput {
            title: "Hades II - Review".into(),
            duration_minutes: 10,
            script_content: "...".into(),
            timestamps: BTreeMap::new(),
            format_type: format.into(),
            language: Language::English,
        }
    }

    #[tokio::test]
    async fn test_requires_script() {
        let state = create_initial_state("q", 10);
        assert!(matches!(
            YouTubeCoachAgent::new().conduct(&state).await,
            Err(StepError::MissingInput(_))
        ));
    }

    #[tokio::test]
    async fn test_game_thumbnails_and_tips() {
        let mut state = create_initial_state("q", 10);
        state.script = Some(script("review"));
        state.research_type = Some(ResearchType::Game);
        state.game_info = Some(GameInfo::fallback("Hades II"));

        let update = YouTubeCoachAgent::new().conduct(&state).await.unwrap();
        assert!(update.violations(NodeName::ThumbnailGeneration).is_empty());

        let thumbnails = update.thumbnail_suggestions.unwrap();
        assert_eq!(thumbnails.len(), 3);
        assert!(thumbnails[0].prompt.contains("Hades II"));
        assert!(thumbnails[2].prompt.contains("WORTH IT?"));

        let tips = update.youtube_tips.unwrap();
        assert!(tips.contains_key("game_specific"));
        assert!(!tips.contains_key("event_specific"));
    }

    #[tokio::test]
    async fn test_event_thumbnails_count_games() {
        let mut state = create_initial_state("q", 10);
        state.script = Some(script("event_summary"));
        state.research_type = Some(ResearchType::Event);
        state.event_info = Some(EventInfo {
            title: "Nintendo Direct".into(),
            video_url: "https://youtu.be/abcdefghijk".into(),
            duration_seconds: None,
            announced_games: vec!["Metroid Prime 4".into(), "Pokemon Legends".into()],
            announced_game_info: Vec::new(),
            highlights: Vec::new(),
            timestamps: BTreeMap::new(),
            source: Default::default(),
        });

        let update = YouTubeCoachAgent::new().conduct(&state).await.unwrap();
        let thumbnails = update.thumbnail_suggestions.unwrap();
        assert!(thumbnails[1].prompt.contains("2 HUGE GAMES!"));
        assert!(update.youtube_tips.unwrap().contains_key("event_specific"));
    }

    #[test]
    fn test_default_tips() {
        let tips = optimization_tips(None);
        assert_eq!(tips.len(), 3);
    }
}
