//! Structured query results handed to prompt construction.

use super::entry::MemoryId;
use super::store::ScoredHit;
use super::tier::Tier;
use std::collections::BTreeMap;

/// Id reported for a tier with no matching memories
pub const SENTINEL_ID: i64 = -1;

/// Query result for one tier of one symbol
#[derive(Debug, Clone, PartialEq)]
pub struct TierRecall {
    tier: Tier,
    hits: Vec<ScoredHit>,
}

impl TierRecall {
    pub(crate) fn new(tier: Tier, hits: Vec<ScoredHit>) -> Self {
        Self { tier, hits }
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn hits(&self) -> &[ScoredHit] {
        &self.hits
    }

    /// Ids of the real hits, best first. Never contains the sentinel.
    pub fn ids(&self) -> Vec<MemoryId> {
        self.hits.iter().map(|h| h.id).collect()
    }

    /// `(id, text)` pairs, or exactly `[(-1, "No <tier>-term information.")]`
    /// when nothing matched.
    pub fn pairs(&self) -> Vec<(i64, String)> {
        if self.hits.is_empty() {
            return vec![(SENTINEL_ID, self.tier.empty_sentinel())];
        }
        self.hits
            .iter()
            .map(|h| (id_to_wire(h.id), h.text.clone()))
            .collect()
    }

    /// Like [`Self::pairs`], but a one-element list (a single hit or the
    /// sentinel) is repeated so prompt schemas always see at least two items.
    pub fn prompt_pairs(&self) -> Vec<(i64, String)> {
        let mut pairs = self.pairs();
        if pairs.len() == 1 {
            pairs.push(pairs[0].clone());
        }
        pairs
    }
}

fn id_to_wire(id: MemoryId) -> i64 {
    i64::try_from(id).unwrap_or(i64::MAX)
}

/// All four tiers for one symbol
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolRecall {
    pub short: TierRecall,
    pub mid: TierRecall,
    pub long: TierRecall,
    pub reflection: TierRecall,
}

impl SymbolRecall {
    pub fn tier(&self, tier: Tier) -> &TierRecall {
        match tier {
            Tier::Short => &self.short,
            Tier::Mid => &self.mid,
            Tier::Long => &self.long,
            Tier::Reflection => &self.reflection,
        }
    }

    /// Ids of every real hit across the four tiers
    pub fn all_ids(&self) -> Vec<MemoryId> {
        Tier::ALL
            .iter()
            .flat_map(|&t| self.tier(t).ids())
            .collect()
    }
}

/// Query result keyed by symbol
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Recall {
    symbols: BTreeMap<String, SymbolRecall>,
}

impl Recall {
    pub(crate) fn insert(&mut self, symbol: String, recall: SymbolRecall) {
        self.symbols.insert(symbol, recall);
    }

    pub fn symbol(&self, symbol: &str) -> Option<&SymbolRecall> {
        self.symbols.get(symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SymbolRecall)> {
        self.symbols.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
