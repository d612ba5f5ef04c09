use super::tier::Tier;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier of a memory, unique per symbol partition across all tiers.
pub type MemoryId = u64;

/// `None` in single-asset mode, the trading symbol otherwise.
pub type PartitionKey = Option<String>;

/// Represents a single piece of evidence held by one memory tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    id: MemoryId,
    text: String,
    embedding: Vec<f32>,
    created_at: NaiveDate,
    importance: f64,
    recency: f64,
    access_counter: i64,
    tier: Tier,
    symbol: Option<String>,
    age: u32, // ticks since creation or last promotion
}

impl MemoryEntry {
    pub(crate) fn new(
        id: MemoryId,
        text: String,
        embedding: Vec<f32>,
        created_at: NaiveDate,
        tier: Tier,
        symbol: Option<String>,
    ) -> Self {
        Self {
            id,
            text,
            embedding,
            created_at,
            importance: 0.0,
            recency: 0.0,
            access_counter: 0,
            tier,
            symbol,
            age: 0,
        }
    }

    // Getters
    pub fn id(&self) -> MemoryId { self.id }
    pub fn text(&self) -> &str { &self.text }
    pub fn embedding(&self) -> &[f32] { &self.embedding }
    pub fn created_at(&self) -> NaiveDate { self.created_at }
    pub fn importance(&self) -> f64 { self.importance }
    pub fn recency(&self) -> f64 { self.recency }
    pub fn access_counter(&self) -> i64 { self.access_counter }
    pub fn tier(&self) -> Tier { self.tier }
    pub fn symbol(&self) -> Option<&str> { self.symbol.as_deref() }
    pub fn age(&self) -> u32 { self.age }

    pub(crate) fn partition(&self) -> PartitionKey {
        self.symbol.clone()
    }

    /// Sets both scores, clamping at zero
    pub(crate) fn reset_scores(&mut self, importance: f64, recency: f64) {
        self.importance = importance.max(0.0);
        self.recency = recency.max(0.0);
        self.age = 0;
    }

    pub(crate) fn set_importance(&mut self, importance: f64) {
        self.importance = importance.max(0.0);
    }

    pub(crate) fn set_recency(&mut self, recency: f64) {
        self.recency = recency.max(0.0);
    }

    pub(crate) fn adjust_access_counter(&mut self, delta: i64) {
        self.access_counter = self.access_counter.saturating_add(delta);
    }

    pub(crate) fn advance_age(&mut self, elapsed: u32) {
        self.age = self.age.saturating_add(elapsed);
    }

    pub(crate) fn move_to(&mut self, tier: Tier) {
        self.tier = tier;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> MemoryEntry {
        MemoryEntry::new(
            7,
            "earnings beat".into(),
            vec![1.0, 0.0],
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            Tier::Short,
            Some("TSLA".into()),
        )
    }

    #[test]
    fn test_memory_creation() {
        let entry = entry();
        assert_eq!(entry.id(), 7);
        assert_eq!(entry.text(), "earnings beat");
        assert_eq!(entry.symbol(), Some("TSLA"));
        assert_eq!(entry.access_counter(), 0);
        assert_eq!(entry.age(), 0);
    }

    #[test]
    fn test_scores_never_negative() {
        let mut entry = entry();
        entry.reset_scores(-3.0, -1.0);
        assert_eq!(entry.importance(), 0.0);
        assert_eq!(entry.recency(), 0.0);

        entry.set_importance(0.4);
        entry.set_importance(0.4 - 1.0);
        assert_eq!(entry.importance(), 0.0);
    }

    #[test]
    fn test_promotion_keeps_identity() {
        let mut entry = entry();
        entry.advance_age(3);
        entry.move_to(Tier::Mid);
        entry.reset_scores(0.6, 1.0);
        assert_eq!(entry.id(), 7);
        assert_eq!(entry.tier(), Tier::Mid);
        assert_eq!(entry.age(), 0);
    }
}
