//! Layered memory engine for an LLM trading agent.
//!
//! Evidence enters the short tier, decays every simulation step, rises into
//! the mid and long tiers when its importance crosses a threshold, and is
//! reinforced by trading-outcome feedback on the ids the agent cited.

pub mod feedback;
pub mod memory;
pub mod storage;

pub use feedback::{
    AccessFeedback, AccessFeedbackMulti, AccessMulti, AccessSingle, Feedback, FeedbackSignal,
    MultiAssetFeedbackWindow, SingleAssetFeedbackWindow,
};
pub use memory::{
    EngineConfig, EngineError, HashingEmbedder, MemoryEngine, MemoryEntry, QueryRequest, Recall,
    Tier, TierConfig, TierPolicies, TierRecall, TierStore,
};
pub use storage::CheckpointError;
