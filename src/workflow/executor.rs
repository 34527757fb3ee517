// Executor - Drives a state through the graph from entry to finish
use super::graph::{NodeName, StateGraph};
use super::nodes::NodeManager;
use super::state::WorkflowState;
use crate::error::EngineError;
use std::time::Instant;
use tracing::info;

/// Workflow executor
pub struct WorkflowExecutor {
    graph: StateGraph,
    node_manager: NodeManager,
}

impl WorkflowExecutor {
    pub fn new(graph: StateGraph, node_manager: NodeManager) -> Result<Self, EngineError> {
        graph.validate()?;
        Ok(Self {
            graph,
            node_manager,
        })
    }

    pub fn node_manager(&self) -> &NodeManager {
        &self.node_manager
    }

    /// Run workflow to completion.
    ///
    /// Node failures are recorded in the state and routed to `finish`; only a
    /// defect in the routing table itself surfaces as an `Err`.
    pub async fn run(&self, mut state: WorkflowState) -> Result<WorkflowState, EngineError> {
        info!("🚀 Starting workflow execution: {}", state.run_id);
        let started = Instant::now();

        let mut current: NodeName = self.graph.entry_point();
        let mut step = 0usize;

        loop {
            step += 1;
            state = self.node_manager.run_node(current, state).await;

            match self.graph.get_next_node(current, &state)? {
                Some(next) => {
                    if next.is_terminal() && state.has_errors() {
                        info!("⏭️ Short-circuiting to '{}' after '{}'", next, current);
                    }
                    current = next;
                }
                None => {
                    info!("🏁 Reached end node");
                    break;
                }
            }
        }

        state.processing_time = started.elapsed().as_secs_f64();
        info!(
            "🎬 Workflow execution finished: {} (steps: {}, errors: {})",
            state.run_id,
            step,
            state.errors.len()
        );

        Ok(state)
    }
}
