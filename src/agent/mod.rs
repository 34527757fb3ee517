// src/agent/mod.rs
//! Step collaborators. Each one reads the running state and returns the typed
//! update for the fields its node owns.
pub mod classifier;
pub mod researcher;
pub mod script_writer;
pub mod youtube_coach;

pub use classifier::ClassifierAgent;
pub use researcher::ResearchAgent;
pub use script_writer::ScriptWriterAgent;
pub use youtube_coach::YouTubeCoachAgent;

use crate::error::StepError;
use crate::workflow::graph::NodeName;
use crate::workflow::state::{StateUpdate, WorkflowState};
use async_trait::async_trait;
use std::sync::Arc;

/// A pipeline step's business logic.
///
/// Implementations must not retry on behalf of the engine; a returned error
/// ends the run at the next routing decision. Retrying a flaky dependency is
/// the implementation's own concern.
#[async_trait]
pub trait StepAgent: Send + Sync {
    fn name(&self) -> &'static str;

    async fn conduct(&self, state: &WorkflowState) -> Result<StateUpdate, StepError>;
}

/// One collaborator per step node, bound to a single model.
#[derive(Clone)]
pub struct Collaborators {
    pub classifier: Arc<dyn StepAgent>,
    pub researcher: Arc<dyn StepAgent>,
    pub script_writer: Arc<dyn StepAgent>,
    pub thumbnail_strategist: Arc<dyn StepAgent>,
}

impl Collaborators {
    pub fn for_node(&self, node: NodeName) -> Option<&Arc<dyn StepAgent>> {
        match node {
            NodeName::Classify => Some(&self.classifier),
            NodeName::Research => Some(&self.researcher),
            NodeName::ScriptGeneration => Some(&self.script_writer),
            NodeName::ThumbnailGeneration => Some(&self.thumbnail_strategist),
            NodeName::Finish => None,
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("classifier", &self.classifier.name())
            .field("researcher", &self.researcher.name())
            .field("script_writer", &self.script_writer.name())
            .field("thumbnail_strategist", &self.thumbnail_strategist.name())
            .finish()
    }
}
