// src/services/mod.rs
pub mod cache;

pub use cache::{CacheBackend, CacheService, CacheStats, MemoryBackend};
