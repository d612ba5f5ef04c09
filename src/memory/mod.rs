//! Core logic for the four memory tiers and the engine that drives them.

pub mod compression;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod entry;
pub mod policy;
pub mod recall;
pub mod store;
pub mod tier;

pub use config::{EngineConfig, EvictionPolicy, ScoreWeights, TierConfig};
pub use embedding::{Embedder, EmbeddingError, HashingEmbedder};
pub use engine::{EngineError, EngineStats, MemoryEngine, Promotion, QueryRequest, StepReport};
pub use entry::{MemoryEntry, MemoryId, PartitionKey};
pub use policy::{EnginePolicies, TierPolicies};
pub use recall::{Recall, SymbolRecall, TierRecall};
pub use store::{IdAllocator, InsertOutcome, ScoredHit, TierStats, TierStore};
pub use tier::Tier;
