use super::config::{EvictionPolicy, TierConfig};
use super::entry::{MemoryEntry, MemoryId, PartitionKey};
use super::policy::{cosine_similarity, TierPolicies};
use super::tier::Tier;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Hands out ids per symbol partition, shared by every tier so an id names
/// exactly one entry no matter which tier currently holds it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdAllocator {
    next: BTreeMap<PartitionKey, MemoryId>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next id for `partition` and advances the counter
    pub fn allocate(&mut self, partition: &PartitionKey) -> MemoryId {
        let next = self.next.entry(partition.clone()).or_insert(0);
        let id = *next;
        *next += 1;
        id
    }

    pub fn peek(&self, partition: &PartitionKey) -> MemoryId {
        self.next.get(partition).copied().unwrap_or(0)
    }

    /// Makes sure future ids for `partition` stay above `id`
    pub(crate) fn reserve(&mut self, partition: &PartitionKey, id: MemoryId) {
        let next = self.next.entry(partition.clone()).or_insert(0);
        if *next <= id {
            *next = id + 1;
        }
    }
}

/// Result of inserting into a possibly bounded partition
#[derive(Debug, Clone)]
pub struct InsertOutcome {
    pub id: MemoryId,
    pub evicted: Option<MemoryEntry>,
}

/// One ranked query result
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredHit {
    pub id: MemoryId,
    pub text: String,
    pub score: f64,
}

/// Serializable state of a tier store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierSnapshot {
    pub tier: Tier,
    pub partitions: BTreeMap<PartitionKey, Vec<MemoryEntry>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TierStats {
    pub tier: Tier,
    pub total_entries: usize,
    pub partitions: usize,
    pub avg_importance: f64,
    pub avg_recency: f64,
    pub avg_access_counter: f64,
}

/// Holds every entry of one memory horizon, partitioned by symbol
pub struct TierStore {
    tier: Tier,
    config: TierConfig,
    policies: TierPolicies,
    partitions: BTreeMap<PartitionKey, Vec<MemoryEntry>>,
}

impl TierStore {
    /// Creates a store whose policies are derived from `config`
    pub fn new(tier: Tier, config: TierConfig) -> Self {
        let policies = TierPolicies::from_config(&config);
        Self::with_policies(tier, config, policies)
    }

    pub fn with_policies(tier: Tier, config: TierConfig, policies: TierPolicies) -> Self {
        Self {
            tier,
            config,
            policies,
            partitions: BTreeMap::new(),
        }
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn config(&self) -> &TierConfig {
        &self.config
    }

    /// Creates a new entry in `symbol`'s partition
    pub fn insert(
        &mut self,
        text: impl Into<String>,
        embedding: Vec<f32>,
        created_at: NaiveDate,
        symbol: Option<String>,
        ids: &mut IdAllocator,
    ) -> InsertOutcome {
        let mut id = ids.allocate(&symbol);
        while self.get(&symbol, id).is_some() {
            id = ids.allocate(&symbol);
        }

        let mut entry = MemoryEntry::new(id, text.into(), embedding, created_at, self.tier, symbol);
        self.initialize(&mut entry);
        let evicted = self.push(entry);
        InsertOutcome { id, evicted }
    }

    /// Takes over an entry promoted from another tier, keeping its id and
    /// restarting its scores under this tier's initialization policies
    pub fn accept(&mut self, mut entry: MemoryEntry) -> Option<MemoryEntry> {
        entry.move_to(self.tier);
        self.initialize(&mut entry);
        self.push(entry)
    }

    fn initialize(&self, entry: &mut MemoryEntry) {
        let importance = self.policies.importance_init.initial_importance(entry.text());
        let recency = self.policies.recency_init.initial_recency();
        entry.reset_scores(importance, recency);
    }

    fn push(&mut self, entry: MemoryEntry) -> Option<MemoryEntry> {
        let tier = self.tier;
        let partition_key = entry.partition();
        let capacity = self.config.capacity;
        let eviction = self.config.eviction;

        let mut evicted = None;
        if let Some(capacity) = capacity {
            let needs_room = self
                .partitions
                .get(&partition_key)
                .map_or(false, |p| p.len() >= capacity);
            if needs_room {
                if let Some(index) = self.eviction_victim(&partition_key, eviction) {
                    if let Some(partition) = self.partitions.get_mut(&partition_key) {
                        let victim = partition.remove(index);
                        debug!(
                            tier = %tier,
                            symbol = ?victim.symbol(),
                            id = victim.id(),
                            "Evicted memory from full partition"
                        );
                        evicted = Some(victim);
                    }
                }
            }
        }

        trace!(tier = %tier, symbol = ?entry.symbol(), id = entry.id(), "Stored memory");
        self.partitions.entry(partition_key).or_default().push(entry);
        evicted
    }

    fn eviction_victim(&self, partition: &PartitionKey, policy: EvictionPolicy) -> Option<usize> {
        let entries = self.partitions.get(partition)?;
        if entries.is_empty() {
            return None;
        }
        match policy {
            EvictionPolicy::Fifo => Some(0),
            EvictionPolicy::LowestScore => {
                let (max_recency, max_importance) = score_maxima(entries.iter());
                entries
                    .iter()
                    .enumerate()
                    .map(|(index, entry)| {
                        let score = self.policies.compound_score.combine(
                            0.0,
                            normalize(entry.recency(), max_recency),
                            normalize(entry.importance(), max_importance),
                        );
                        (index, score, entry)
                    })
                    .min_by(|a, b| {
                        a.1.total_cmp(&b.1)
                            .then_with(|| a.2.created_at().cmp(&b.2.created_at()))
                            .then_with(|| a.2.id().cmp(&b.2.id()))
                    })
                    .map(|(index, _, _)| index)
            }
        }
    }

    /// Applies importance and recency decay to every entry
    pub fn decay_step(&mut self, elapsed: u32) {
        let policies = &self.policies;
        for entry in self.partitions.values_mut().flat_map(|p| p.iter_mut()) {
            let importance = policies
                .importance_decay
                .decay_importance(entry.importance(), elapsed);
            let recency = policies.recency_decay.decay_recency(entry.recency(), elapsed);
            // decay never raises a score
            entry.set_importance(importance.min(entry.importance()));
            entry.set_recency(recency.min(entry.recency()));
            entry.advance_age(elapsed);
        }
    }

    /// Folds one feedback event into the entry's access counter and
    /// importance. Returns false when the id is not held by this store.
    pub fn apply_feedback(&mut self, symbol: &PartitionKey, id: MemoryId, delta: i32) -> bool {
        let tier = self.tier;
        let policies = &self.policies;
        let Some(entry) = self
            .partitions
            .get_mut(symbol)
            .and_then(|p| p.iter_mut().find(|e| e.id() == id))
        else {
            return false;
        };

        let update = policies.access_update.update(entry, delta);
        let counter_delta = if delta >= 0 {
            update.counter_delta.max(0)
        } else {
            update.counter_delta.min(0)
        };
        let importance_delta = if delta >= 0 {
            update.importance_delta.max(0.0)
        } else {
            update.importance_delta.min(0.0)
        };
        entry.adjust_access_counter(counter_delta);
        entry.set_importance(entry.importance() + importance_delta);
        debug!(
            tier = %tier,
            symbol = ?symbol,
            id,
            feedback = delta,
            access_counter = entry.access_counter(),
            importance = entry.importance(),
            "Applied feedback"
        );
        true
    }

    /// Ranks the partition against `embedding` and returns the best `k`.
    /// Entries created after `as_of` are not visible.
    pub fn query(
        &self,
        symbol: &PartitionKey,
        embedding: &[f32],
        k: usize,
        as_of: NaiveDate,
    ) -> Vec<ScoredHit> {
        if k == 0 {
            return Vec::new();
        }
        let Some(entries) = self.partitions.get(symbol) else {
            return Vec::new();
        };

        let visible: Vec<&MemoryEntry> =
            entries.iter().filter(|e| e.created_at() <= as_of).collect();
        let (max_recency, max_importance) = score_maxima(visible.iter().copied());

        let mut hits: Vec<ScoredHit> = visible
            .into_iter()
            .map(|entry| ScoredHit {
                id: entry.id(),
                text: entry.text().to_string(),
                score: self.policies.compound_score.combine(
                    cosine_similarity(embedding, entry.embedding()),
                    normalize(entry.recency(), max_recency),
                    normalize(entry.importance(), max_importance),
                ),
            })
            .collect();

        hits.sort_by(|a, b| match b.score.total_cmp(&a.score) {
            Ordering::Equal => a.id.cmp(&b.id),
            other => other,
        });
        hits.truncate(k);
        hits
    }

    /// Ids whose importance reached `threshold`, ascending
    pub fn promotion_candidates(&self, symbol: &PartitionKey, threshold: f64) -> Vec<MemoryId> {
        let mut ids: Vec<MemoryId> = self
            .partitions
            .get(symbol)
            .into_iter()
            .flatten()
            .filter(|e| e.importance() >= threshold)
            .map(MemoryEntry::id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Removes entries by id, returning them in partition order
    pub fn remove(&mut self, symbol: &PartitionKey, ids: &[MemoryId]) -> Vec<MemoryEntry> {
        let Some(partition) = self.partitions.get_mut(symbol) else {
            return Vec::new();
        };
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(partition)
            .into_iter()
            .partition(|e| ids.contains(&e.id()));
        *partition = kept;
        removed
    }

    pub fn get(&self, symbol: &PartitionKey, id: MemoryId) -> Option<&MemoryEntry> {
        self.partitions.get(symbol)?.iter().find(|e| e.id() == id)
    }

    /// Entries of one partition in insertion order
    pub fn entries(&self, symbol: &PartitionKey) -> &[MemoryEntry] {
        self.partitions.get(symbol).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn partition_keys(&self) -> impl Iterator<Item = &PartitionKey> {
        self.partitions.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemoryEntry> {
        self.partitions.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.partitions.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> TierSnapshot {
        TierSnapshot {
            tier: self.tier,
            partitions: self.partitions.clone(),
        }
    }

    /// Replaces the store contents with a snapshot taken by [`Self::snapshot`]
    pub fn restore(&mut self, snapshot: TierSnapshot) {
        self.partitions = snapshot.partitions;
    }

    pub fn stats(&self) -> TierStats {
        let total = self.len();
        let mean = |f: &dyn Fn(&MemoryEntry) -> f64| {
            if total == 0 {
                0.0
            } else {
                self.iter().map(f).sum::<f64>() / total as f64
            }
        };
        TierStats {
            tier: self.tier,
            total_entries: total,
            partitions: self.partitions.values().filter(|p| !p.is_empty()).count(),
            avg_importance: mean(&|e| e.importance()),
            avg_recency: mean(&|e| e.recency()),
            avg_access_counter: mean(&|e| e.access_counter() as f64),
        }
    }
}

fn score_maxima<'a>(entries: impl Iterator<Item = &'a MemoryEntry>) -> (f64, f64) {
    entries.fold((0.0f64, 0.0f64), |(r, i), e| {
        (r.max(e.recency()), i.max(e.importance()))
    })
}

fn normalize(value: f64, max: f64) -> f64 {
    if max > 0.0 {
        value / max
    } else {
        0.0
    }
}
