// NodeManager - wraps each collaborator call with uniform bookkeeping
//
// A node call is total: it always hands back a valid state. Collaborator
// errors, timeouts, panics and ownership violations all become one entry in
// `errors` formatted as "<node> error: <message>".
use super::graph::NodeName;
use super::state::{StateUpdate, WorkflowState};
use crate::agent::Collaborators;
use crate::error::StepError;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{error, info, warn};

pub const FINISHED_STEP: &str = "finished";
pub const COMPLETED_WITH_ERRORS: &str = "Processing completed with errors";

pub struct NodeManager {
    collaborators: Collaborators,
    step_timeout: Duration,
}

impl NodeManager {
    pub fn new(collaborators: Collaborators, step_timeout: Duration) -> Self {
        Self {
            collaborators,
            step_timeout,
        }
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Execute one node against the running state.
    pub async fn run_node(&self, node: NodeName, state: WorkflowState) -> WorkflowState {
        if node.is_terminal() {
            return finish_node(state);
        }
        self.step_node(node, state).await
    }

    async fn step_node(&self, node: NodeName, mut state: WorkflowState) -> WorkflowState {
        state.set_current_step(node.as_str());

        let agent = match self.collaborators.for_node(node) {
            Some(agent) => agent,
            None => {
                state.push_error(format!("{} error: no collaborator bound", node));
                return state;
            }
        };

        info!("📍 Executing node '{}' ({})", node, agent.name());
        let started = Instant::now();

        let outcome = self
            .invoke(agent.conduct(&state))
            .await
            .and_then(|update| check_ownership(node, update));

        match outcome {
            Ok(update) => {
                for warning in &update.warnings {
                    warn!("⚠️ {}: {}", node, warning);
                }
                state.apply_update(update);
                state.mark_completed(node.as_str());
                info!("✅ Node '{}' completed in {:.2}s", node, started.elapsed().as_secs_f64());
            }
            Err(e) => {
                error!("❌ Node '{}' failed after {:.2}s: {}", node, started.elapsed().as_secs_f64(), e);
                state.push_error(format!("{} error: {}", node, e));
            }
        }

        state
    }

    /// Run a collaborator future under the step timeout, converting panics into errors.
    async fn invoke<F>(&self, call: F) -> Result<StateUpdate, StepError>
    where
        F: std::future::Future<Output = Result<StateUpdate, StepError>>,
    {
        match timeout(self.step_timeout, AssertUnwindSafe(call).catch_unwind()).await {
            Ok(Ok(result)) => result,
            Ok(Err(payload)) => Err(StepError::Panicked(panic_message(payload.as_ref()))),
            Err(_) => Err(StepError::Timeout(self.step_timeout)),
        }
    }
}

/// Terminal node: marks the run finished.
pub fn finish_node(mut state: WorkflowState) -> WorkflowState {
    state.set_current_step(FINISHED_STEP);
    state.mark_completed(FINISHED_STEP);

    if state.has_errors() && state.script.is_none() {
        state.push_warning(COMPLETED_WITH_ERRORS.to_string());
    }

    state
}

fn check_ownership(node: NodeName, update: StateUpdate) -> Result<StateUpdate, StepError> {
    let violations = update.violations(node);
    if violations.is_empty() {
        Ok(update)
    } else {
        let names: Vec<&str> = violations.iter().map(|f| f.as_str()).collect();
        Err(StepError::OwnershipViolation(names.join(", ")))
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::StepAgent;
    use crate::models::{Language, QueryType, ScriptOutput};
    use crate::workflow::state::create_initial_state;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    enum Behaviour {
        Succeed,
        Fail,
        Panic,
        Hang,
        Trespass,
    }

    struct Stub(Behaviour);

    #[async_trait]
    impl StepAgent for Stub {
        fn name(&self) -> &'static str {
            "Stub"
        }

        async fn conduct(&self, state: &WorkflowState) -> Result<StateUpdate, StepError> {
            match self.0 {
                Behaviour::Succeed => Ok(StateUpdate::new()
                    .with_query(state.query.clone().classified(QueryType::Game, Language::English))
                    .with_warning("low confidence")),
                Behaviour::Fail => Err(StepError::failed("model unavailable")),
                Behaviour::Panic => panic!("index out of bounds"),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(StateUpdate::new())
                }
                Behaviour::Trespass => Ok(StateUpdate::new().with_script(ScriptOutput {
                    title: "t".into(),
                    duration_minutes: 10,
                    script_content: "c".into(),
                    timestamps: BTreeMap::new(),
                    format_type: "review".into(),
                    language: Language::English,
                })),
            }
        }
    }

    fn manager(behaviour: Behaviour) -> NodeManager {
        let agent: Arc<dyn StepAgent> = Arc::new(Stub(behaviour));
        NodeManager::new(
            Collaborators {
                classifier: agent.clone(),
                researcher: agent.clone(),
                script_writer: agent.clone(),
                thumbnail_strategist: agent,
            },
            Duration::from_millis(100),
        )
    }

    #[tokio::test]
    async fn test_success_merges_and_logs_step() {
        let state = manager(Behaviour::Succeed)
            .run_node(NodeName::Classify, create_initial_state("q", 10))
            .await;
        assert_eq!(state.current_step, "classify");
        assert_eq!(state.completed_steps, vec!["classify"]);
        assert_eq!(state.query.query_type, Some(QueryType::Game));
        assert_eq!(state.warnings, vec!["low confidence"]);
        assert!(state.errors.is_empty());
    }

    #[tokio::test]
    async fn test_failure_is_captured_with_node_prefix() {
        let initial = create_initial_state("q", 10);
        let state = manager(Behaviour::Fail)
            .run_node(NodeName::Research, initial.clone())
            .await;
        assert_eq!(state.errors, vec!["research error: model unavailable"]);
        assert!(state.completed_steps.is_empty());
        assert_eq!(state.query, initial.query);
        assert_eq!(state.current_step, "research");
    }

    #[tokio::test]
    async fn test_panic_is_captured() {
        let state = manager(Behaviour::Panic)
            .run_node(NodeName::ScriptGeneration, create_initial_state("q", 10))
            .await;
        assert_eq!(state.errors.len(), 1);
        assert!(state.errors[0].starts_with("script_generation error: step panicked"));
        assert!(state.errors[0].contains("index out of bounds"));
    }

    #[tokio::test]
    async fn test_timeout_is_captured() {
        let state = manager(Behaviour::Hang)
            .run_node(NodeName::ThumbnailGeneration, create_initial_state("q", 10))
            .await;
        assert_eq!(state.errors.len(), 1);
        assert!(state.errors[0].starts_with("thumbnail_generation error: timed out"));
    }

    #[tokio::test]
    async fn test_ownership_violation_is_rejected() {
        let state = manager(Behaviour::Trespass)
            .run_node(NodeName::Classify, create_initial_state("q", 10))
            .await;
        assert_eq!(state.errors, vec!["classify error: step may not write field(s) script"]);
        assert!(state.script.is_none());
        assert!(state.completed_steps.is_empty());
    }

    #[tokio::test]
    async fn test_repeated_node_does_not_duplicate_log_entry() {
        let manager = manager(Behaviour::Succeed);
        let state = manager
            .run_node(NodeName::Classify, create_initial_state("q", 10))
            .await;
        let state = manager.run_node(NodeName::Classify, state).await;
        assert_eq!(state.completed_steps, vec!["classify"]);
    }

    #[test]
    fn test_finish_warns_only_without_script() {
        let mut state = create_initial_state("q", 10);
        state.errors.push("classify error: boom".to_string());
        let state = finish_node(state);
        assert_eq!(state.current_step, "finished");
        assert_eq!(state.completed_steps, vec!["finished"]);
        assert_eq!(state.warnings, vec![COMPLETED_WITH_ERRORS]);

        let clean = finish_node(create_initial_state("q", 10));
        assert!(clean.warnings.is_empty());
        assert_eq!(clean.completed_steps, vec!["finished"]);
    }
}
