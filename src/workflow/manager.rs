// WorkflowManager - public entry point: validate, bind collaborators, run, report
use super::executor::WorkflowExecutor;
use super::graph::StateGraph;
use super::nodes::{panic_message, NodeManager};
use super::state::WorkflowState;
use crate::agent::{
    ClassifierAgent, Collaborators, ResearchAgent, ScriptWriterAgent, YouTubeCoachAgent,
};
use crate::config::Settings;
use crate::error::EngineError;
use crate::igdb_client::{GameDatabase, IgdbClient};
use crate::llm_client::{create_llm_client, find_model, LlmService};
use crate::models::{ProcessingResult, QueryInput};
use crate::services::CacheService;
use crate::youtube_client::{VideoSearch, YouTubeClient};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{error, info, warn};

/// Builds the collaborator set for a model.
pub trait CollaboratorFactory: Send + Sync {
    fn build(&self, model: &str) -> Result<Collaborators, EngineError>;
}

/// Production collaborators: LLM-backed classifier, IGDB/YouTube research
/// through the shared cache, template script writer, thumbnail coach.
pub struct DefaultCollaboratorFactory {
    settings: Settings,
    cache: CacheService,
    games: Option<Arc<dyn GameDatabase>>,
    videos: Option<Arc<dyn VideoSearch>>,
}

impl DefaultCollaboratorFactory {
    pub fn new(settings: Settings, cache: CacheService) -> Self {
        let games: Option<Arc<dyn GameDatabase>> =
            match (&settings.igdb_client_id, &settings.igdb_access_token) {
                (Some(id), Some(token)) => Some(Arc::new(IgdbClient::new(
                    id.clone(),
                    token.clone(),
                    settings.request_timeout,
                ))),
                _ => {
                    warn!("⚠️ IGDB credentials not configured, game research will use fallback data");
                    None
                }
            };
        let videos: Option<Arc<dyn VideoSearch>> = match &settings.youtube_api_key {
            Some(key) => Some(Arc::new(YouTubeClient::new(key.clone(), settings.request_timeout))),
            None => {
                warn!("⚠️ YOUTUBE_API_KEY not configured, media search is disabled");
                None
            }
        };

        Self {
            settings,
            cache,
            games,
            videos,
        }
    }
}

impl CollaboratorFactory for DefaultCollaboratorFactory {
    fn build(&self, model: &str) -> Result<Collaborators, EngineError> {
        find_model(model).map_err(|e| EngineError::Binding(e.to_string()))?;
        let llm: Option<Arc<dyn LlmService>> = match create_llm_client(model, &self.settings) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!("⚠️ {}; classification will use keyword heuristics", e);
                None
            }
        };

        Ok(Collaborators {
            classifier: Arc::new(ClassifierAgent::new(llm)),
            researcher: Arc::new(ResearchAgent::new(
                self.games.clone(),
                self.videos.clone(),
                self.cache.clone(),
                self.settings.cache_ttl,
            )),
            script_writer: Arc::new(ScriptWriterAgent::new()),
            thumbnail_strategist: Arc::new(YouTubeCoachAgent::new()),
        })
    }
}

struct Binding {
    model: String,
    executor: Arc<WorkflowExecutor>,
}

pub struct WorkflowManager {
    settings: Settings,
    factory: Arc<dyn CollaboratorFactory>,
    graph: StateGraph,
    binding: Mutex<Option<Binding>>,
}

impl WorkflowManager {
    /// Manager with the production collaborators and a cache chosen from settings.
    pub async fn from_settings(settings: Settings) -> Self {
        let cache = CacheService::from_settings(&settings).await;
        let factory = DefaultCollaboratorFactory::new(settings.clone(), cache);
        Self::with_factory(settings, Arc::new(factory))
    }

    pub fn with_factory(settings: Settings, factory: Arc<dyn CollaboratorFactory>) -> Self {
        Self::with_graph(settings, factory, StateGraph::standard())
    }

    /// Manager driving `graph` instead of the standard pipeline.
    pub fn with_graph(
        settings: Settings,
        factory: Arc<dyn CollaboratorFactory>,
        graph: StateGraph,
    ) -> Self {
        Self {
            settings,
            factory,
            graph,
            binding: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Model the current binding serves, if any run has happened yet.
    pub fn bound_model(&self) -> Option<String> {
        self.binding
            .lock()
            .ok()
            .and_then(|b| b.as_ref().map(|b| b.model.clone()))
    }

    /// Executor for `model`, rebuilding the binding when the model changes.
    /// Runs already holding the previous executor keep it until they finish.
    fn executor_for(&self, model: &str) -> Result<Arc<WorkflowExecutor>, EngineError> {
        let mut binding = self
            .binding
            .lock()
            .map_err(|_| EngineError::Binding("binding lock poisoned".to_string()))?;

        if let Some(current) = binding.as_ref() {
            if current.model == model {
                return Ok(current.executor.clone());
            }
            info!("🔁 Rebinding collaborators from '{}' to '{}'", current.model, model);
        }

        let collaborators = self.factory.build(model)?;
        let node_manager = NodeManager::new(collaborators, self.settings.request_timeout);
        let executor = Arc::new(WorkflowExecutor::new(self.graph.clone(), node_manager)?);
        *binding = Some(Binding {
            model: model.to_string(),
            executor: executor.clone(),
        });
        Ok(executor)
    }

    /// Run the pipeline for one query. Always returns a result.
    pub async fn process(
        &self,
        query_text: &str,
        duration_minutes: u32,
        model: Option<&str>,
    ) -> ProcessingResult {
        let started = Instant::now();

        let query = match QueryInput::validated(
            query_text,
            duration_minutes,
            self.settings.min_duration,
            self.settings.max_duration,
        ) {
            Ok(query) => query,
            Err(e) => {
                warn!("⚠️ Rejected query: {}", e);
                return ProcessingResult::failed(e.to_string(), started.elapsed().as_secs_f64());
            }
        };

        let model = model.unwrap_or(self.settings.model.as_str());
        let executor = match self.executor_for(model) {
            Ok(executor) => executor,
            Err(e) => {
                error!("❌ {}", e);
                return ProcessingResult::failed(e.to_string(), started.elapsed().as_secs_f64());
            }
        };

        let state = WorkflowState::new(query);
        info!("🎮 Processing query '{}' with model '{}'", state.query.text, model);

        let outcome = AssertUnwindSafe(executor.run(state)).catch_unwind().await;
        let elapsed = started.elapsed().as_secs_f64();

        match outcome {
            Ok(Ok(mut state)) => {
                state.processing_time = elapsed;
                format_result(state)
            }
            Ok(Err(e)) => {
                error!("❌ Workflow engine failed: {}", e);
                ProcessingResult::failed(e.to_string(), elapsed)
            }
            Err(payload) => {
                let e = EngineError::Panicked(panic_message(payload.as_ref()));
                error!("❌ {}", e);
                ProcessingResult::failed(e.to_string(), elapsed)
            }
        }
    }
}

/// Map a finished state to the caller-facing result.
pub fn format_result(state: WorkflowState) -> ProcessingResult {
    ProcessingResult {
        success: state.is_success(),
        query_type: state.query.query_type,
        language: state.query.language,
        processing_time: state.processing_time,
        cached: state.cached,
        errors: state.errors,
        warnings: state.warnings,
        completed_steps: state.completed_steps,
        game_info: state.game_info,
        media_assets: state.media_assets,
        review_scores: state.review_scores,
        event_info: state.event_info,
        script: state.script,
        thumbnail_suggestions: state.thumbnail_suggestions,
        youtube_tips: state.youtube_tips,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::StepAgent;
    use crate::error::StepError;
    use crate::models::{Language, QueryType, ScriptOutput};
    use crate::workflow::graph::{EdgeType, NodeName, Route, ROUTES};
    use crate::workflow::state::StateUpdate;
    use crate::workflow::state::create_initial_state;
    use std::collections::BTreeMap;

    #[test]
    fn test_format_result_success_requires_script_and_no_errors() {
        let mut state = create_initial_state("q", 10);
        state.query = state.query.clone().classified(QueryType::Game, Language::English);
        assert!(!format_result(state.clone()).success);

        state.script = Some(ScriptOutput {
            title: "t".into(),
            duration_minutes: 10,
            script_content: "c".into(),
            timestamps: BTreeMap::new(),
            format_type: "review".into(),
            language: Language::English,
        });
        let result = format_result(state.clone());
        assert!(result.success);
        assert_eq!(result.query_type, Some(QueryType::Game));

        state.errors.push("thumbnail_generation error: boom".into());
        assert!(!format_result(state).success);
    }

    struct NoopStep;

    #[async_trait::async_trait]
    impl StepAgent for NoopStep {
        fn name(&self) -> &'static str {
            "NoopStep"
        }

        async fn conduct(&self, _state: &WorkflowState) -> Result<StateUpdate, StepError> {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            Ok(StateUpdate::new())
        }
    }

    struct NoopFactory;

    impl CollaboratorFactory for NoopFactory {
        fn build(&self, _model: &str) -> Result<Collaborators, EngineError> {
            let step: Arc<dyn StepAgent> = Arc::new(NoopStep);
            Ok(Collaborators {
                classifier: step.clone(),
                researcher: step.clone(),
                script_writer: step.clone(),
                thumbnail_strategist: step,
            })
        }
    }

    fn skip_to_thumbnails(_state: &WorkflowState) -> NodeName {
        NodeName::ThumbnailGeneration
    }

    fn broken_router(_state: &WorkflowState) -> NodeName {
        panic!("router lost its table")
    }

    static MISROUTED: [Route; 4] = [
        Route {
            from: NodeName::Classify,
            edge: EdgeType::Conditional {
                router: skip_to_thumbnails,
                targets: [NodeName::Research, NodeName::Finish],
            },
        },
        ROUTES[1],
        ROUTES[2],
        ROUTES[3],
    ];

    static PANICKING: [Route; 4] = [
        Route {
            from: NodeName::Classify,
            edge: EdgeType::Conditional {
                router: broken_router,
                targets: [NodeName::Research, NodeName::Finish],
            },
        },
        ROUTES[1],
        ROUTES[2],
        ROUTES[3],
    ];

    fn manager_over(routes: &'static [Route]) -> WorkflowManager {
        WorkflowManager::with_graph(
            Settings::default(),
            Arc::new(NoopFactory),
            StateGraph::from_routes(routes, NodeName::Classify),
        )
    }

    #[tokio::test]
    async fn test_undeclared_route_becomes_failed_result() {
        let result = manager_over(&MISROUTED)
            .process("Review Hades II", 10, None)
            .await;
        assert!(!result.success);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("classify routed to undeclared target thumbnail_generation"));
        assert!(result.completed_steps.is_empty());
        assert!(result.processing_time > 0.0);
    }

    #[tokio::test]
    async fn test_driver_panic_becomes_failed_result() {
        let result = manager_over(&PANICKING)
            .process("Review Hades II", 10, None)
            .await;
        assert!(!result.success);
        assert_eq!(result.errors, vec!["Workflow driver panicked: router lost its table"]);
        assert!(result.processing_time > 0.0);
    }

    #[tokio::test]
    async fn test_invalid_graph_is_rejected_at_bind_time() {
        static TRUNCATED: [Route; 2] = [ROUTES[0], ROUTES[1]];
        let result = manager_over(&TRUNCATED)
            .process("Review Hades II", 10, None)
            .await;
        assert!(!result.success);
        assert!(result.errors[0].starts_with("No route out of non-terminal node"));
    }

    #[tokio::test]
    async fn test_unknown_model_degrades() {
        let manager = WorkflowManager::with_factory(
            Settings::default(),
            Arc::new(DefaultCollaboratorFactory::new(
                Settings::default(),
                CacheService::in_memory(),
            )),
        );
        let result = manager.process("Review Hades II", 10, Some("llama-2")).await;
        assert!(!result.success);
        assert!(result.errors[0].contains("Unknown model: llama-2"));
        assert!(result.completed_steps.is_empty());
    }
}
