// lib.rs - Main library file that exports all modules
pub mod agent;
pub mod config;
pub mod error;
pub mod igdb_client;
pub mod llm_client;
pub mod models;
pub mod services;
pub mod utils;
pub mod workflow;
pub mod youtube_client;

// Re-export commonly used types for convenience
pub use config::Settings;
pub use error::{EngineError, StepError};
pub use models::ProcessingResult;
pub use workflow::WorkflowManager;
