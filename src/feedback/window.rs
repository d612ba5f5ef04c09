use super::{AccessFeedback, AccessFeedbackMulti, AccessMulti, AccessSingle, FeedbackSignal};
use crate::memory::entry::MemoryId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
    Hold,
}

/// Position held after a trade, also its sign in reward arithmetic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradePosition {
    Long,
    Short,
    Neutral,
}

impl TradePosition {
    pub fn sign(self) -> f64 {
        match self {
            TradePosition::Long => 1.0,
            TradePosition::Short => -1.0,
            TradePosition::Neutral => 0.0,
        }
    }
}

impl From<TradeAction> for TradePosition {
    fn from(action: TradeAction) -> Self {
        match action {
            TradeAction::Buy => TradePosition::Long,
            TradeAction::Sell => TradePosition::Short,
            TradeAction::Hold => TradePosition::Neutral,
        }
    }
}

fn push_bounded<T>(deque: &mut VecDeque<T>, value: T, max_len: usize) {
    deque.push_back(value);
    while deque.len() > max_len {
        deque.pop_front();
    }
}

/// Sliding look-back window of single-asset trades.
///
/// Once more than `look_back` trades have been recorded, the cumulative
/// reward over the window (`Σ Δprice · position`) decides one sign that is
/// applied to every memory cited at the oldest step still in the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingleAssetFeedbackWindow {
    look_back: usize,
    positions: VecDeque<TradePosition>,
    prices: VecDeque<f64>,
    evidence: VecDeque<Vec<MemoryId>>,
    trades_recorded: usize,
}

impl SingleAssetFeedbackWindow {
    pub fn new(look_back: usize) -> Self {
        let look_back = look_back.max(1);
        Self {
            look_back,
            positions: VecDeque::with_capacity(look_back),
            prices: VecDeque::with_capacity(look_back + 1),
            evidence: VecDeque::with_capacity(look_back),
            trades_recorded: 0,
        }
    }

    pub fn look_back(&self) -> usize {
        self.look_back
    }

    pub fn trades_recorded(&self) -> usize {
        self.trades_recorded
    }

    pub fn record(&mut self, action: TradeAction, price: f64, evidence: Vec<MemoryId>) {
        let position = TradePosition::from(action);
        push_bounded(&mut self.positions, position, self.look_back);
        push_bounded(&mut self.prices, price, self.look_back + 1);
        push_bounded(&mut self.evidence, evidence, self.look_back);
        self.trades_recorded += 1;
        trace!(?position, price, trades = self.trades_recorded, "Recorded trade");
    }

    pub fn cumulative_reward(&self) -> f64 {
        self.prices
            .iter()
            .zip(self.prices.iter().skip(1))
            .map(|(before, after)| after - before)
            .zip(self.positions.iter())
            .map(|(diff, position)| diff * position.sign())
            .sum()
    }

    pub fn feedback(&self) -> AccessFeedback {
        if self.trades_recorded <= self.look_back {
            return AccessFeedback::default();
        }
        let Some(signal) = FeedbackSignal::from_reward(self.cumulative_reward()) else {
            return AccessFeedback::default();
        };
        let records = self
            .evidence
            .front()
            .into_iter()
            .flatten()
            .map(|&id| AccessSingle {
                id,
                feedback: signal,
            })
            .collect();
        AccessFeedback { records }
    }
}

/// Sliding look-back window of multi-asset portfolio values.
///
/// The sign of the portfolio value change across the window is applied to
/// every memory cited for each symbol at the oldest step in the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiAssetFeedbackWindow {
    look_back: usize,
    symbols: Vec<String>,
    values: VecDeque<f64>,
    evidence: BTreeMap<String, VecDeque<Vec<MemoryId>>>,
    trades_recorded: usize,
}

impl MultiAssetFeedbackWindow {
    pub fn new<S: Into<String>>(look_back: usize, symbols: impl IntoIterator<Item = S>) -> Self {
        let look_back = look_back.max(1);
        let symbols: Vec<String> = symbols.into_iter().map(Into::into).collect();
        let evidence = symbols
            .iter()
            .map(|s| (s.clone(), VecDeque::with_capacity(look_back)))
            .collect();
        Self {
            look_back,
            symbols,
            values: VecDeque::with_capacity(look_back),
            evidence,
            trades_recorded: 0,
        }
    }

    pub fn trades_recorded(&self) -> usize {
        self.trades_recorded
    }

    /// Records the portfolio value after a step and the ids cited per
    /// symbol. Symbols missing from `evidence` cite nothing for this step.
    pub fn record(&mut self, portfolio_value: f64, evidence: &BTreeMap<String, Vec<MemoryId>>) {
        push_bounded(&mut self.values, portfolio_value, self.look_back);
        for symbol in &self.symbols {
            let cited = evidence.get(symbol).cloned().unwrap_or_default();
            if let Some(deque) = self.evidence.get_mut(symbol) {
                push_bounded(deque, cited, self.look_back);
            }
        }
        self.trades_recorded += 1;
        trace!(portfolio_value, trades = self.trades_recorded, "Recorded portfolio value");
    }

    pub fn cumulative_reward(&self) -> f64 {
        match (self.values.front(), self.values.back()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }

    pub fn feedback(&self) -> AccessFeedbackMulti {
        if self.trades_recorded <= self.look_back {
            return AccessFeedbackMulti::default();
        }
        let Some(signal) = FeedbackSignal::from_reward(self.cumulative_reward()) else {
            return AccessFeedbackMulti::default();
        };
        let mut records = Vec::new();
        for symbol in &self.symbols {
            let oldest = self.evidence.get(symbol).and_then(VecDeque::front);
            for &id in oldest.into_iter().flatten() {
                records.push(AccessMulti {
                    symbol: symbol.clone(),
                    id,
                    feedback: signal,
                });
            }
        }
        AccessFeedbackMulti { records }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_window_waits_until_full() {
        let mut window = SingleAssetFeedbackWindow::new(2);
        window.record(TradeAction::Buy, 100.0, vec![0, 1]);
        window.record(TradeAction::Buy, 101.0, vec![2]);
        assert!(window.feedback().is_empty());

        window.record(TradeAction::Buy, 103.0, vec![3]);
        let feedback = window.feedback();
        // oldest step still in the window cited id 2
        assert_eq!(
            feedback.records,
            vec![AccessSingle {
                id: 2,
                feedback: FeedbackSignal::Positive
            }]
        );
    }

    #[test]
    fn test_single_window_short_loses() {
        let mut window = SingleAssetFeedbackWindow::new(1);
        window.record(TradeAction::Sell, 10.0, vec![5]);
        window.record(TradeAction::Sell, 12.0, vec![6, 7]);
        assert_eq!(window.cumulative_reward(), -2.0);
        let feedback = window.feedback();
        assert_eq!(feedback.records.len(), 2);
        assert!(feedback
            .records
            .iter()
            .all(|r| r.feedback == FeedbackSignal::Negative));
    }

    #[test]
    fn test_single_window_flat_reward_is_silent() {
        let mut window = SingleAssetFeedbackWindow::new(1);
        window.record(TradeAction::Hold, 10.0, vec![1]);
        window.record(TradeAction::Hold, 15.0, vec![2]);
        assert!(window.feedback().is_empty());
    }

    #[test]
    fn test_multi_window_signs_every_symbol() {
        let mut window = MultiAssetFeedbackWindow::new(2, ["BTC-USD", "ETH-USD"]);
        let step = |btc: Vec<MemoryId>, eth: Vec<MemoryId>| {
            BTreeMap::from([("BTC-USD".to_string(), btc), ("ETH-USD".to_string(), eth)])
        };
        window.record(1000.0, &step(vec![0], vec![0]));
        window.record(990.0, &step(vec![1], vec![]));
        assert!(window.feedback().is_empty());

        window.record(980.0, &step(vec![2], vec![3]));
        let feedback = window.feedback();
        assert_eq!(
            feedback.records,
            vec![AccessMulti {
                symbol: "BTC-USD".into(),
                id: 1,
                feedback: FeedbackSignal::Negative
            }]
        );
    }
}
