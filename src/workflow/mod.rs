// Workflow orchestration: typed state, routing table, node manager, driver
pub mod state;
pub mod graph;
pub mod router;
pub mod nodes;
pub mod executor;
pub mod manager;

pub use executor::WorkflowExecutor;
pub use graph::{NodeName, StateGraph};
pub use manager::{format_result, CollaboratorFactory, DefaultCollaboratorFactory, WorkflowManager};
pub use nodes::NodeManager;
pub use state::{create_initial_state, StateField, StateUpdate, WorkflowState};
