//! Scoring and decay strategies injected into each tier store.
//!
//! Every policy is a pure function of an entry's state and the elapsed ticks
//! or feedback, so alternate decay shapes can be swapped in without touching
//! the store.

use super::config::{EngineConfig, ScoreWeights, TierConfig};
use super::entry::MemoryEntry;
use super::tier::Tier;

/// Importance of a freshly created or freshly promoted entry
pub trait ImportanceInitialization: Send + Sync {
    fn initial_importance(&self, text: &str) -> f64;
}

/// Recency of a freshly created or freshly promoted entry
pub trait RecencyInitialization: Send + Sync {
    fn initial_recency(&self) -> f64;
}

/// Must be non-increasing in `elapsed`
pub trait ImportanceDecay: Send + Sync {
    fn decay_importance(&self, importance: f64, elapsed: u32) -> f64;
}

/// Must be non-increasing in `elapsed`
pub trait RecencyDecay: Send + Sync {
    fn decay_recency(&self, recency: f64, elapsed: u32) -> f64;
}

/// Combines the three normalized components into one ranking score
pub trait CompoundScore: Send + Sync {
    fn combine(&self, similarity: f64, recency: f64, importance: f64) -> f64;
}

/// Effect of one feedback event on an entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccessUpdate {
    pub counter_delta: i64,
    pub importance_delta: f64,
}

/// Maps a ±1 feedback event to counter and importance deltas of the same sign
pub trait AccessCounterUpdate: Send + Sync {
    fn update(&self, entry: &MemoryEntry, feedback: i32) -> AccessUpdate;
}

#[derive(Debug, Clone, Copy)]
pub struct ConstantImportanceInitialization(pub f64);

impl ImportanceInitialization for ConstantImportanceInitialization {
    fn initial_importance(&self, _text: &str) -> f64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConstantRecencyInitialization(pub f64);

impl Default for ConstantRecencyInitialization {
    fn default() -> Self {
        Self(1.0)
    }
}

impl RecencyInitialization for ConstantRecencyInitialization {
    fn initial_recency(&self) -> f64 {
        self.0
    }
}

/// `importance * rate^elapsed`
#[derive(Debug, Clone, Copy)]
pub struct ExponentialImportanceDecay {
    pub rate: f64,
}

impl ImportanceDecay for ExponentialImportanceDecay {
    fn decay_importance(&self, importance: f64, elapsed: u32) -> f64 {
        exponential(importance, self.rate, elapsed)
    }
}

/// `recency * rate^elapsed`
#[derive(Debug, Clone, Copy)]
pub struct ExponentialRecencyDecay {
    pub rate: f64,
}

impl RecencyDecay for ExponentialRecencyDecay {
    fn decay_recency(&self, recency: f64, elapsed: u32) -> f64 {
        exponential(recency, self.rate, elapsed)
    }
}

fn exponential(value: f64, rate: f64, elapsed: u32) -> f64 {
    let rate = rate.clamp(0.0, 1.0);
    let exponent = i32::try_from(elapsed).unwrap_or(i32::MAX);
    (value * rate.powi(exponent)).max(0.0)
}

#[derive(Debug, Clone, Copy)]
pub struct LinearCompoundScore {
    pub weights: ScoreWeights,
}

impl CompoundScore for LinearCompoundScore {
    fn combine(&self, similarity: f64, recency: f64, importance: f64) -> f64 {
        self.weights.similarity * similarity
            + self.weights.recency * recency
            + self.weights.importance * importance
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConstantAccessCounterUpdate {
    pub counter_step: i64,
    pub importance_step: f64,
}

impl AccessCounterUpdate for ConstantAccessCounterUpdate {
    fn update(&self, _entry: &MemoryEntry, feedback: i32) -> AccessUpdate {
        let sign = feedback.signum();
        AccessUpdate {
            counter_delta: self.counter_step * i64::from(sign),
            importance_delta: self.importance_step * f64::from(sign),
        }
    }
}

/// The full set of strategies one tier store runs with
pub struct TierPolicies {
    pub importance_init: Box<dyn ImportanceInitialization>,
    pub recency_init: Box<dyn RecencyInitialization>,
    pub importance_decay: Box<dyn ImportanceDecay>,
    pub recency_decay: Box<dyn RecencyDecay>,
    pub compound_score: Box<dyn CompoundScore>,
    pub access_update: Box<dyn AccessCounterUpdate>,
}

impl TierPolicies {
    pub fn from_config(config: &TierConfig) -> Self {
        Self {
            importance_init: Box::new(ConstantImportanceInitialization(config.importance_init)),
            recency_init: Box::new(ConstantRecencyInitialization(config.recency_init)),
            importance_decay: Box::new(ExponentialImportanceDecay {
                rate: config.importance_decay_rate,
            }),
            recency_decay: Box::new(ExponentialRecencyDecay {
                rate: config.recency_decay_rate,
            }),
            compound_score: Box::new(LinearCompoundScore {
                weights: config.weights,
            }),
            access_update: Box::new(ConstantAccessCounterUpdate {
                counter_step: config.access_counter_step,
                importance_step: config.access_importance_step,
            }),
        }
    }

    pub fn with_importance_init(mut self, policy: impl ImportanceInitialization + 'static) -> Self {
        self.importance_init = Box::new(policy);
        self
    }

    pub fn with_recency_init(mut self, policy: impl RecencyInitialization + 'static) -> Self {
        self.recency_init = Box::new(policy);
        self
    }

    pub fn with_importance_decay(mut self, policy: impl ImportanceDecay + 'static) -> Self {
        self.importance_decay = Box::new(policy);
        self
    }

    pub fn with_recency_decay(mut self, policy: impl RecencyDecay + 'static) -> Self {
        self.recency_decay = Box::new(policy);
        self
    }

    pub fn with_compound_score(mut self, policy: impl CompoundScore + 'static) -> Self {
        self.compound_score = Box::new(policy);
        self
    }

    pub fn with_access_update(mut self, policy: impl AccessCounterUpdate + 'static) -> Self {
        self.access_update = Box::new(policy);
        self
    }
}

/// Policies for all four tiers, handed to the engine at construction
pub struct EnginePolicies {
    pub short: TierPolicies,
    pub mid: TierPolicies,
    pub long: TierPolicies,
    pub reflection: TierPolicies,
}

impl EnginePolicies {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            short: TierPolicies::from_config(&config.short),
            mid: TierPolicies::from_config(&config.mid),
            long: TierPolicies::from_config(&config.long),
            reflection: TierPolicies::from_config(&config.reflection),
        }
    }

    pub fn with_tier(mut self, tier: Tier, policies: TierPolicies) -> Self {
        match tier {
            Tier::Short => self.short = policies,
            Tier::Mid => self.mid = policies,
            Tier::Long => self.long = policies,
            Tier::Reflection => self.reflection = policies,
        }
        self
    }
}

/// Cosine similarity, 0 when either vector has no magnitude or lengths differ
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
    }
}
