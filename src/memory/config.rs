use super::compression::CompressionAlgorithm;
use super::tier::Tier;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// What a bounded partition drops when it is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Lowest query-free compound score, oldest `created_at` first on ties
    #[default]
    LowestScore,
    /// Oldest inserted entry
    Fifo,
}

/// Weights of the linear compound score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub similarity: f64,
    pub recency: f64,
    pub importance: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            similarity: 1.0,
            recency: 1.0,
            importance: 1.0,
        }
    }
}

/// Configuration for one memory tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierConfig {
    /// Importance given to new and freshly promoted entries
    pub importance_init: f64,
    /// Recency given to new and freshly promoted entries
    pub recency_init: f64,
    /// Multiplier applied to importance per tick
    pub importance_decay_rate: f64,
    /// Multiplier applied to recency per tick
    pub recency_decay_rate: f64,
    /// Importance at which entries leave this tier for the next one
    pub promotion_threshold: Option<f64>,
    /// Maximum entries per symbol partition, unbounded when absent
    pub capacity: Option<usize>,
    pub eviction: EvictionPolicy,
    pub weights: ScoreWeights,
    /// Access counter change per unit of feedback
    pub access_counter_step: i64,
    /// Importance change per unit of feedback
    pub access_importance_step: f64,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            importance_init: 0.5,
            recency_init: 1.0,
            importance_decay_rate: 0.99,
            recency_decay_rate: 0.9,
            promotion_threshold: None,
            capacity: None,
            eviction: EvictionPolicy::default(),
            weights: ScoreWeights::default(),
            access_counter_step: 1,
            access_importance_step: 0.1,
        }
    }
}

impl TierConfig {
    pub fn short_term() -> Self {
        Self {
            promotion_threshold: Some(0.8),
            ..Self::default()
        }
    }

    pub fn mid_term() -> Self {
        Self {
            importance_init: 0.6,
            importance_decay_rate: 0.995,
            recency_decay_rate: 0.95,
            promotion_threshold: Some(0.9),
            ..Self::default()
        }
    }

    pub fn long_term() -> Self {
        Self {
            importance_init: 0.8,
            importance_decay_rate: 0.999,
            recency_decay_rate: 0.98,
            ..Self::default()
        }
    }

    pub fn reflection() -> Self {
        Self {
            importance_init: 0.8,
            importance_decay_rate: 0.995,
            recency_decay_rate: 0.95,
            ..Self::default()
        }
    }

    pub fn validate(&self, tier: Tier) -> Result<(), ConfigError> {
        let invalid = |what: &str| ConfigError::Invalid(format!("{} tier: {}", tier, what));

        if !(self.importance_init >= 0.0) || !(self.recency_init >= 0.0) {
            return Err(invalid("initial scores must be non-negative"));
        }
        for rate in [self.importance_decay_rate, self.recency_decay_rate] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(invalid("decay rates must lie in [0, 1]"));
            }
        }
        if let Some(threshold) = self.promotion_threshold {
            if !(threshold >= 0.0) {
                return Err(invalid("promotion threshold must be non-negative"));
            }
        }
        if self.capacity == Some(0) {
            return Err(invalid("capacity must be at least 1"));
        }
        let w = self.weights;
        if !(w.similarity >= 0.0 && w.recency >= 0.0 && w.importance >= 0.0) {
            return Err(invalid("score weights must be non-negative"));
        }
        if !(self.access_importance_step >= 0.0) || self.access_counter_step < 0 {
            return Err(invalid("access steps must be non-negative"));
        }
        Ok(())
    }
}

/// Configuration for the whole engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// One symbol selects single-asset mode, several select multi-asset mode
    pub symbols: Vec<String>,
    pub embedding_dimension: usize,
    pub short: TierConfig,
    pub mid: TierConfig,
    pub long: TierConfig,
    pub reflection: TierConfig,
    pub checkpoint_compression: CompressionAlgorithm,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            embedding_dimension: 256,
            short: TierConfig::short_term(),
            mid: TierConfig::mid_term(),
            long: TierConfig::long_term(),
            reflection: TierConfig::reflection(),
            checkpoint_compression: CompressionAlgorithm::LZ4,
        }
    }
}

impl EngineConfig {
    pub fn new<S: Into<String>>(symbols: impl IntoIterator<Item = S>) -> Self {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn tier(&self, tier: Tier) -> &TierConfig {
        match tier {
            Tier::Short => &self.short,
            Tier::Mid => &self.mid,
            Tier::Long => &self.long,
            Tier::Reflection => &self.reflection,
        }
    }

    pub fn tier_mut(&mut self, tier: Tier) -> &mut TierConfig {
        match tier {
            Tier::Short => &mut self.short,
            Tier::Mid => &mut self.mid,
            Tier::Long => &mut self.long,
            Tier::Reflection => &mut self.reflection,
        }
    }

    pub fn is_multi_asset(&self) -> bool {
        self.symbols.len() > 1
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbols.is_empty() {
            return Err(ConfigError::Invalid("at least one trading symbol is required".into()));
        }
        let mut seen = std::collections::BTreeSet::new();
        for symbol in &self.symbols {
            if !seen.insert(symbol.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate symbol {}", symbol)));
            }
        }
        if self.embedding_dimension == 0 {
            return Err(ConfigError::Invalid("embedding dimension must be positive".into()));
        }
        for tier in Tier::ALL {
            self.tier(tier).validate(tier)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::new(["TSLA"]);
        assert!(config.validate().is_ok());
        assert!(!config.is_multi_asset());
        assert_eq!(config.short.promotion_threshold, Some(0.8));
    }

    #[test]
    fn test_rejects_bad_tiers() {
        let mut config = EngineConfig::new(["TSLA", "NFLX"]);
        config.mid.recency_decay_rate = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = EngineConfig::new(["TSLA"]);
        config.long.capacity = Some(0);
        assert!(config.validate().is_err());

        assert!(EngineConfig::default().validate().is_err());
    }

    #[test]
    fn test_json_with_partial_fields() {
        let config = EngineConfig::from_json_str(
            r#"{
                "symbols": ["BTC-USD", "ETH-USD"],
                "embedding_dimension": 64,
                "short": { "promotion_threshold": 0.7, "capacity": 10, "eviction": "fifo" }
            }"#,
        )
        .unwrap();
        assert!(config.is_multi_asset());
        assert_eq!(config.embedding_dimension, 64);
        assert_eq!(config.short.capacity, Some(10));
        assert_eq!(config.short.eviction, EvictionPolicy::Fifo);
        assert_eq!(config.short.recency_init, 1.0);
        assert_eq!(config.mid, TierConfig::mid_term());
    }
}
