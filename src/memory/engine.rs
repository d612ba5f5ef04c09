//! The four-tier memory engine driven once per simulation step.

use super::compression::CompressionAlgorithm;
use super::config::{ConfigError, EngineConfig};
use super::embedding::{Embedder, EmbeddingError};
use super::entry::{MemoryEntry, MemoryId, PartitionKey};
use super::policy::EnginePolicies;
use super::recall::{Recall, SymbolRecall, TierRecall};
use super::store::{IdAllocator, TierSnapshot, TierStats, TierStore};
use super::tier::Tier;
use crate::feedback::Feedback;
use crate::storage::{CheckpointDir, CheckpointError};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

const ENGINE_FILE: &str = "engine";

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Step date {requested} is earlier than the last step {last}")]
    OutOfOrderStep { last: NaiveDate, requested: NaiveDate },
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
}

impl From<ConfigError> for EngineError {
    fn from(e: ConfigError) -> Self {
        EngineError::Configuration(e.to_string())
    }
}

/// Parameters of one retrieval round
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub date: NaiveDate,
    /// Symbols to answer for; empty means every configured symbol
    pub symbols: Vec<String>,
    pub k_short: usize,
    pub k_mid: usize,
    pub k_long: usize,
    pub k_reflection: usize,
    /// Text to embed as the query vector instead of the latest ingested evidence
    pub context: Option<String>,
}

impl QueryRequest {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            symbols: Vec::new(),
            k_short: 5,
            k_mid: 5,
            k_long: 5,
            k_reflection: 5,
            context: None,
        }
    }

    pub fn for_symbols<S: Into<String>>(mut self, symbols: impl IntoIterator<Item = S>) -> Self {
        self.symbols = symbols.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_top_k(mut self, short: usize, mid: usize, long: usize, reflection: usize) -> Self {
        self.k_short = short;
        self.k_mid = mid;
        self.k_long = long;
        self.k_reflection = reflection;
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn k(&self, tier: Tier) -> usize {
        match tier {
            Tier::Short => self.k_short,
            Tier::Mid => self.k_mid,
            Tier::Long => self.k_long,
            Tier::Reflection => self.k_reflection,
        }
    }
}

/// One entry moved up a tier during a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Promotion {
    pub symbol: PartitionKey,
    pub id: MemoryId,
    pub from: Tier,
    pub to: Tier,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    pub promotions: Vec<Promotion>,
    pub evicted: Vec<MemoryEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineStats {
    pub steps: u64,
    pub last_step: Option<NaiveDate>,
    pub tracked_ids: usize,
    pub tiers: Vec<TierStats>,
}

/// Latest short-tier evidence of a partition, the default query vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct QueryContext {
    date: NaiveDate,
    embedding: Vec<f32>,
}

/// One tier file, stamped with the save it belongs to
#[derive(Serialize, Deserialize)]
struct TierFile {
    saved_at: DateTime<Utc>,
    snapshot: TierSnapshot,
}

/// Everything the engine persists besides the tier stores themselves
#[derive(Serialize, Deserialize)]
struct EngineState {
    saved_at: DateTime<Utc>,
    config: EngineConfig,
    ids: IdAllocator,
    contexts: BTreeMap<PartitionKey, QueryContext>,
    last_step: Option<NaiveDate>,
    steps: u64,
}

/// Owns the short, mid, long and reflection stores of one simulation run
pub struct MemoryEngine {
    config: EngineConfig,
    embedder: Box<dyn Embedder>,
    stores: [TierStore; 4],
    ids: IdAllocator,
    // derived from the stores, rebuilt on load
    index: HashMap<(PartitionKey, MemoryId), Tier>,
    contexts: BTreeMap<PartitionKey, QueryContext>,
    last_step: Option<NaiveDate>,
    steps: u64,
}

impl MemoryEngine {
    /// Creates an engine whose policies are derived from `config`
    pub fn new(config: EngineConfig, embedder: Box<dyn Embedder>) -> Result<Self, EngineError> {
        let policies = EnginePolicies::from_config(&config);
        Self::with_policies(config, embedder, policies)
    }

    pub fn with_policies(
        config: EngineConfig,
        embedder: Box<dyn Embedder>,
        policies: EnginePolicies,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        if embedder.dimension() != config.embedding_dimension {
            return Err(EngineError::Configuration(format!(
                "embedder produces {} dimensions, configuration expects {}",
                embedder.dimension(),
                config.embedding_dimension
            )));
        }

        let EnginePolicies {
            short,
            mid,
            long,
            reflection,
        } = policies;
        let stores = [
            TierStore::with_policies(Tier::Short, config.short.clone(), short),
            TierStore::with_policies(Tier::Mid, config.mid.clone(), mid),
            TierStore::with_policies(Tier::Long, config.long.clone(), long),
            TierStore::with_policies(Tier::Reflection, config.reflection.clone(), reflection),
        ];

        info!(
            symbols = ?config.symbols,
            multi_asset = config.is_multi_asset(),
            dimension = config.embedding_dimension,
            "Initialized memory engine"
        );

        Ok(Self {
            config,
            embedder,
            stores,
            ids: IdAllocator::new(),
            index: HashMap::new(),
            contexts: BTreeMap::new(),
            last_step: None,
            steps: 0,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self, tier: Tier) -> &TierStore {
        &self.stores[tier.index()]
    }

    fn store_mut(&mut self, tier: Tier) -> &mut TierStore {
        &mut self.stores[tier.index()]
    }

    pub fn last_step(&self) -> Option<NaiveDate> {
        self.last_step
    }

    /// Maps a caller-supplied symbol onto a partition key
    fn partition_for(&self, symbol: Option<&str>) -> Result<PartitionKey, EngineError> {
        if self.config.is_multi_asset() {
            match symbol {
                Some(s) if self.config.symbols.iter().any(|c| c == s) => Ok(Some(s.to_string())),
                Some(s) => Err(EngineError::Configuration(format!("unknown symbol {}", s))),
                None => Err(EngineError::Configuration(
                    "a symbol is required in multi-asset mode".into(),
                )),
            }
        } else {
            match symbol {
                None => Ok(None),
                Some(s) if self.config.symbols.iter().any(|c| c == s) => Ok(None),
                Some(s) => Err(EngineError::Configuration(format!("unknown symbol {}", s))),
            }
        }
    }

    fn check_dimension(&self, embedding: &[f32]) -> Result<(), EmbeddingError> {
        if embedding.len() != self.config.embedding_dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.config.embedding_dimension,
                actual: embedding.len(),
            });
        }
        Ok(())
    }

    /// Embeds `text` and stores it as new short-term evidence
    pub fn ingest(
        &mut self,
        text: &str,
        date: NaiveDate,
        symbol: Option<&str>,
    ) -> Result<MemoryId, EngineError> {
        self.ingest_into(Tier::Short, text, date, symbol)
    }

    /// Stores one of the agent's own reflections in the reflection tier
    pub fn ingest_reflection(
        &mut self,
        text: &str,
        date: NaiveDate,
        symbol: Option<&str>,
    ) -> Result<MemoryId, EngineError> {
        self.ingest_into(Tier::Reflection, text, date, symbol)
    }

    fn ingest_into(
        &mut self,
        tier: Tier,
        text: &str,
        date: NaiveDate,
        symbol: Option<&str>,
    ) -> Result<MemoryId, EngineError> {
        let partition = self.partition_for(symbol)?;
        let embedding = self.embedder.embed(text)?;
        self.check_dimension(&embedding)?;
        Ok(self.insert(tier, partition, text, embedding, date))
    }

    /// Ingests several short-term items with a single embedder call
    pub fn ingest_batch(
        &mut self,
        items: &[(&str, NaiveDate, Option<&str>)],
    ) -> Result<Vec<MemoryId>, EngineError> {
        let partitions = items
            .iter()
            .map(|(_, _, symbol)| self.partition_for(*symbol))
            .collect::<Result<Vec<_>, _>>()?;
        let texts: Vec<&str> = items.iter().map(|(text, _, _)| *text).collect();
        let embeddings = self.embedder.embed_batch(&texts)?;
        if embeddings.len() != items.len() {
            return Err(EmbeddingError::Generation(format!(
                "expected {} embeddings, got {}",
                items.len(),
                embeddings.len()
            ))
            .into());
        }
        for embedding in &embeddings {
            self.check_dimension(embedding)?;
        }

        Ok(items
            .iter()
            .zip(partitions)
            .zip(embeddings)
            .map(|(((text, date, _), partition), embedding)| {
                self.insert(Tier::Short, partition, text, embedding, *date)
            })
            .collect())
    }

    fn insert(
        &mut self,
        tier: Tier,
        partition: PartitionKey,
        text: &str,
        embedding: Vec<f32>,
        date: NaiveDate,
    ) -> MemoryId {
        if tier == Tier::Short {
            let context = QueryContext {
                date,
                embedding: embedding.clone(),
            };
            self.contexts.insert(partition.clone(), context);
        }
        let store = &mut self.stores[tier.index()];
        let outcome = store.insert(text, embedding, date, partition.clone(), &mut self.ids);
        if let Some(evicted) = outcome.evicted {
            self.index.remove(&(evicted.partition(), evicted.id()));
        }
        self.index.insert((partition.clone(), outcome.id), tier);
        debug!(tier = %tier, symbol = ?partition, id = outcome.id, %date, "Ingested memory");
        outcome.id
    }

    /// Advances every tier by one tick, then promotes entries whose
    /// importance reached their tier's threshold. An entry rises at most one
    /// tier per step.
    pub fn step(&mut self, date: NaiveDate) -> Result<StepReport, EngineError> {
        if let Some(last) = self.last_step {
            if date < last {
                return Err(EngineError::OutOfOrderStep {
                    last,
                    requested: date,
                });
            }
        }

        for tier in Tier::ALL {
            self.store_mut(tier).decay_step(1);
        }

        // mid→long first so room freed in mid is available to short→mid
        let mut moves = Vec::new();
        for source in [Tier::Mid, Tier::Short] {
            let (Some(threshold), Some(dest)) =
                (self.config.tier(source).promotion_threshold, source.next())
            else {
                continue;
            };
            let store = self.store(source);
            for partition in store.partition_keys() {
                let ids = store.promotion_candidates(partition, threshold);
                if !ids.is_empty() {
                    moves.push((source, dest, partition.clone(), ids));
                }
            }
        }

        let mut report = StepReport::default();
        for (source, dest, partition, ids) in moves {
            let moved = self.store_mut(source).remove(&partition, &ids);
            for entry in moved {
                let id = entry.id();
                self.index.insert((partition.clone(), id), dest);
                if let Some(evicted) = self.store_mut(dest).accept(entry) {
                    self.index.remove(&(evicted.partition(), evicted.id()));
                    report.evicted.push(evicted);
                }
                report.promotions.push(Promotion {
                    symbol: partition.clone(),
                    id,
                    from: source,
                    to: dest,
                });
            }
        }

        self.last_step = Some(date);
        self.steps += 1;
        info!(
            %date,
            step = self.steps,
            promoted = report.promotions.len(),
            evicted = report.evicted.len(),
            "Memory step complete"
        );
        Ok(report)
    }

    /// Top-k retrieval from every tier for each requested symbol
    pub fn query(&self, request: &QueryRequest) -> Result<Recall, EngineError> {
        let symbols: Vec<String> = if request.symbols.is_empty() {
            self.config.symbols.clone()
        } else {
            request.symbols.clone()
        };
        let partitions = symbols
            .iter()
            .map(|s| self.partition_for(Some(s.as_str())))
            .collect::<Result<Vec<_>, _>>()?;

        let explicit = match &request.context {
            Some(text) => {
                let embedding = self.embedder.embed(text)?;
                self.check_dimension(&embedding)?;
                Some(embedding)
            }
            None => None,
        };
        let zero = vec![0.0f32; self.config.embedding_dimension];

        let mut recall = Recall::default();
        for (symbol, partition) in symbols.into_iter().zip(partitions) {
            let embedding = explicit
                .as_deref()
                .or_else(|| {
                    // a context newer than the query date is not visible
                    self.contexts
                        .get(&partition)
                        .filter(|c| c.date <= request.date)
                        .map(|c| c.embedding.as_slice())
                })
                .unwrap_or(&zero);
            let tier_recall = |tier: Tier| {
                TierRecall::new(
                    tier,
                    self.store(tier)
                        .query(&partition, embedding, request.k(tier), request.date),
                )
            };
            let symbol_recall = SymbolRecall {
                short: tier_recall(Tier::Short),
                mid: tier_recall(Tier::Mid),
                long: tier_recall(Tier::Long),
                reflection: tier_recall(Tier::Reflection),
            };
            debug!(
                symbol = %symbol,
                date = %request.date,
                short = symbol_recall.short.hits().len(),
                mid = symbol_recall.mid.hits().len(),
                long = symbol_recall.long.hits().len(),
                reflection = symbol_recall.reflection.hits().len(),
                "Answered memory query"
            );
            recall.insert(symbol, symbol_recall);
        }
        Ok(recall)
    }

    /// Routes feedback on cited ids to whichever tier holds them now.
    /// Returns how many records reached a tracked entry.
    pub fn apply_feedback(&mut self, feedback: impl Into<Feedback>) -> usize {
        let mut applied = 0;
        match feedback.into() {
            Feedback::Single(batch) => {
                if self.config.is_multi_asset() {
                    warn!(
                        records = batch.records.len(),
                        "Ignoring single-asset feedback in multi-asset mode"
                    );
                    return 0;
                }
                for record in &batch.records {
                    if self.route_feedback(&None, record.id, record.feedback.delta()) {
                        applied += 1;
                    }
                }
            }
            Feedback::Multi(batch) => {
                for record in &batch.records {
                    let Ok(partition) = self.partition_for(Some(record.symbol.as_str())) else {
                        debug!(symbol = %record.symbol, "Ignoring feedback for unknown symbol");
                        continue;
                    };
                    if self.route_feedback(&partition, record.id, record.feedback.delta()) {
                        applied += 1;
                    }
                }
            }
        }
        applied
    }

    fn route_feedback(&mut self, partition: &PartitionKey, id: MemoryId, delta: i32) -> bool {
        let Some(&tier) = self.index.get(&(partition.clone(), id)) else {
            debug!(symbol = ?partition, id, "Ignoring feedback for untracked memory");
            return false;
        };
        self.store_mut(tier).apply_feedback(partition, id, delta)
    }

    /// Tier currently holding `id`
    pub fn locate(&self, symbol: Option<&str>, id: MemoryId) -> Option<Tier> {
        let partition = self.partition_for(symbol).ok()?;
        self.index.get(&(partition, id)).copied()
    }

    pub fn entry(&self, symbol: Option<&str>, id: MemoryId) -> Option<&MemoryEntry> {
        let partition = self.partition_for(symbol).ok()?;
        let tier = *self.index.get(&(partition.clone(), id))?;
        self.store(tier).get(&partition, id)
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            steps: self.steps,
            last_step: self.last_step,
            tracked_ids: self.index.len(),
            tiers: self.stores.iter().map(TierStore::stats).collect(),
        }
    }

    /// Writes one file per tier plus the engine state into `dir`.
    ///
    /// Each file is replaced atomically, but the set is not: a crash midway
    /// leaves files from two saves. Every file carries the same save stamp
    /// and the engine file is written last, so loading such a mix fails with
    /// [`CheckpointError::Inconsistent`] instead of mixing states.
    pub fn save_checkpoint(&self, dir: impl AsRef<Path>) -> Result<(), EngineError> {
        let checkpoint = CheckpointDir::new(dir.as_ref(), self.config.checkpoint_compression);
        let saved_at = Utc::now();
        for store in &self.stores {
            let file = TierFile {
                saved_at,
                snapshot: store.snapshot(),
            };
            checkpoint.write(store.tier().label(), &file)?;
        }
        checkpoint.write(
            ENGINE_FILE,
            &EngineState {
                saved_at,
                config: self.config.clone(),
                ids: self.ids.clone(),
                contexts: self.contexts.clone(),
                last_step: self.last_step,
                steps: self.steps,
            },
        )?;
        info!(
            dir = %checkpoint.root().display(),
            entries = self.index.len(),
            step = self.steps,
            "Saved memory checkpoint"
        );
        Ok(())
    }

    /// Rebuilds an engine from [`Self::save_checkpoint`] output, deriving
    /// policies from the saved configuration
    pub fn load_checkpoint(
        dir: impl AsRef<Path>,
        embedder: Box<dyn Embedder>,
    ) -> Result<Self, EngineError> {
        let checkpoint = CheckpointDir::new(dir.as_ref(), CompressionAlgorithm::None);
        let state: EngineState = checkpoint.read(ENGINE_FILE)?;
        let policies = EnginePolicies::from_config(&state.config);
        Self::restore(&checkpoint, state, embedder, policies)
    }

    /// Like [`Self::load_checkpoint`], running with caller-supplied policies
    pub fn load_checkpoint_with_policies(
        dir: impl AsRef<Path>,
        embedder: Box<dyn Embedder>,
        policies: EnginePolicies,
    ) -> Result<Self, EngineError> {
        let checkpoint = CheckpointDir::new(dir.as_ref(), CompressionAlgorithm::None);
        let state: EngineState = checkpoint.read(ENGINE_FILE)?;
        Self::restore(&checkpoint, state, embedder, policies)
    }

    fn restore(
        checkpoint: &CheckpointDir,
        state: EngineState,
        embedder: Box<dyn Embedder>,
        policies: EnginePolicies,
    ) -> Result<Self, EngineError> {
        let mut engine = Self::with_policies(state.config, embedder, policies)?;
        engine.ids = state.ids;

        for tier in Tier::ALL {
            let TierFile { saved_at, snapshot } = checkpoint.read(tier.label())?;
            if saved_at != state.saved_at {
                return Err(inconsistent(format!(
                    "{} file was saved at {}, engine state at {}",
                    tier, saved_at, state.saved_at
                )));
            }
            if snapshot.tier != tier {
                return Err(inconsistent(format!(
                    "{} file holds the {} tier",
                    tier, snapshot.tier
                )));
            }
            for (partition, entries) in &snapshot.partitions {
                let symbol = partition.as_deref();
                if engine.partition_for(symbol).ok().as_ref() != Some(partition) {
                    return Err(inconsistent(format!("unexpected partition {:?}", partition)));
                }
                for entry in entries {
                    if entry.tier() != tier || entry.partition() != *partition {
                        return Err(inconsistent(format!(
                            "memory {} is filed under the wrong tier or symbol",
                            entry.id()
                        )));
                    }
                    if engine.index.insert((partition.clone(), entry.id()), tier).is_some() {
                        return Err(inconsistent(format!(
                            "memory {} of {:?} appears twice",
                            entry.id(),
                            partition
                        )));
                    }
                    engine.ids.reserve(partition, entry.id());
                }
            }
            engine.store_mut(tier).restore(snapshot);
        }

        for (partition, context) in &state.contexts {
            if engine.partition_for(partition.as_deref()).ok().as_ref() != Some(partition) {
                return Err(inconsistent(format!("unexpected partition {:?}", partition)));
            }
            engine.check_dimension(&context.embedding)?;
        }
        engine.contexts = state.contexts;
        engine.last_step = state.last_step;
        engine.steps = state.steps;

        info!(
            dir = %checkpoint.root().display(),
            entries = engine.index.len(),
            step = engine.steps,
            "Loaded memory checkpoint"
        );
        Ok(engine)
    }
}

fn inconsistent(message: String) -> EngineError {
    CheckpointError::Inconsistent(message).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::{
        AccessFeedback, AccessFeedbackMulti, AccessMulti, AccessSingle, FeedbackSignal,
    };
    use crate::memory::embedding::HashingEmbedder;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn single_engine() -> MemoryEngine {
        let config = EngineConfig {
            embedding_dimension: 32,
            ..EngineConfig::new(["TSLA"])
        };
        MemoryEngine::new(config, Box::new(HashingEmbedder::new(32))).unwrap()
    }

    fn multi_engine() -> MemoryEngine {
        let config = EngineConfig {
            embedding_dimension: 32,
            ..EngineConfig::new(["BTC-USD", "ETH-USD"])
        };
        MemoryEngine::new(config, Box::new(HashingEmbedder::new(32))).unwrap()
    }

    #[test]
    fn test_rejects_dimension_mismatch() {
        let config = EngineConfig::new(["TSLA"]);
        let result = MemoryEngine::new(config, Box::new(HashingEmbedder::new(8)));
        assert!(matches!(result, Err(EngineError::Configuration(_))));
    }

    #[test]
    fn test_single_asset_accepts_configured_symbol() {
        let mut engine = single_engine();
        let a = engine.ingest("record deliveries", day(1), None).unwrap();
        let b = engine.ingest("price cut in china", day(1), Some("TSLA")).unwrap();
        assert_eq!((a, b), (0, 1));
        assert!(engine.ingest("x", day(1), Some("NFLX")).is_err());
        assert_eq!(engine.locate(Some("TSLA"), 1), Some(Tier::Short));
    }

    #[test]
    fn test_multi_asset_partitions_ids() {
        let mut engine = multi_engine();
        let btc = engine.ingest("halving ahead", day(1), Some("BTC-USD")).unwrap();
        let eth = engine.ingest("merge shipped", day(1), Some("ETH-USD")).unwrap();
        assert_eq!((btc, eth), (0, 0));
        assert!(matches!(
            engine.ingest("orphan", day(1), None),
            Err(EngineError::Configuration(_))
        ));
    }

    #[test]
    fn test_unknown_symbol_query_fails() {
        let engine = multi_engine();
        let request = QueryRequest::new(day(1)).for_symbols(["DOGE-USD"]);
        assert!(matches!(
            engine.query(&request),
            Err(EngineError::Configuration(_))
        ));
    }

    #[test]
    fn test_step_rejects_going_back() {
        let mut engine = single_engine();
        engine.step(day(5)).unwrap();
        engine.step(day(5)).unwrap();
        assert!(matches!(
            engine.step(day(4)),
            Err(EngineError::OutOfOrderStep { .. })
        ));
    }

    #[test]
    fn test_feedback_routes_to_current_tier() {
        let mut engine = single_engine();
        let id = engine.ingest("beat and raise", day(1), None).unwrap();
        let feedback = AccessFeedback {
            records: vec![
                AccessSingle {
                    id,
                    feedback: FeedbackSignal::Positive,
                },
                AccessSingle {
                    id: 99,
                    feedback: FeedbackSignal::Positive,
                },
            ],
        };
        assert_eq!(engine.apply_feedback(feedback), 1);
        assert_eq!(engine.entry(None, id).unwrap().access_counter(), 1);
    }

    #[test]
    fn test_multi_feedback_ignores_unknown_symbol() {
        let mut engine = multi_engine();
        let id = engine.ingest("etf inflows", day(1), Some("BTC-USD")).unwrap();
        let feedback = AccessFeedbackMulti {
            records: vec![
                AccessMulti {
                    symbol: "BTC-USD".into(),
                    id,
                    feedback: FeedbackSignal::Negative,
                },
                AccessMulti {
                    symbol: "SOL-USD".into(),
                    id,
                    feedback: FeedbackSignal::Negative,
                },
            ],
        };
        assert_eq!(engine.apply_feedback(feedback), 1);
        assert_eq!(engine.entry(Some("BTC-USD"), id).unwrap().access_counter(), -1);
    }

    #[test]
    fn test_batch_ingest_matches_single() {
        let mut engine = multi_engine();
        let ids = engine
            .ingest_batch(&[
                ("a", day(1), Some("BTC-USD")),
                ("b", day(1), Some("BTC-USD")),
                ("c", day(1), Some("ETH-USD")),
            ])
            .unwrap();
        assert_eq!(ids, vec![0, 1, 0]);
        assert!(engine
            .ingest_batch(&[("d", day(1), Some("BTC-USD")), ("e", day(1), Some("XRP"))])
            .is_err());
        assert_eq!(engine.store(Tier::Short).len(), 3);
    }
}
