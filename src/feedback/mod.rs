//! Reinforcement signals flowing from the portfolio back into memory.

mod window;

pub use window::{MultiAssetFeedbackWindow, SingleAssetFeedbackWindow, TradeAction, TradePosition};

use crate::memory::entry::MemoryId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of one feedback event, `+1` or `-1` on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum FeedbackSignal {
    Positive,
    Negative,
}

impl FeedbackSignal {
    pub fn delta(self) -> i32 {
        match self {
            FeedbackSignal::Positive => 1,
            FeedbackSignal::Negative => -1,
        }
    }

    /// Sign of a realized reward, `None` when the reward is exactly zero
    pub fn from_reward(reward: f64) -> Option<Self> {
        if reward > 0.0 {
            Some(FeedbackSignal::Positive)
        } else if reward < 0.0 {
            Some(FeedbackSignal::Negative)
        } else {
            None
        }
    }
}

impl From<FeedbackSignal> for i8 {
    fn from(signal: FeedbackSignal) -> i8 {
        match signal {
            FeedbackSignal::Positive => 1,
            FeedbackSignal::Negative => -1,
        }
    }
}

impl TryFrom<i8> for FeedbackSignal {
    type Error = InvalidFeedback;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(FeedbackSignal::Positive),
            -1 => Ok(FeedbackSignal::Negative),
            other => Err(InvalidFeedback(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidFeedback(pub i8);

impl fmt::Display for InvalidFeedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "feedback must be 1 or -1, got {}", self.0)
    }
}

impl std::error::Error for InvalidFeedback {}

/// Feedback on one memory in single-asset mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessSingle {
    pub id: MemoryId,
    pub feedback: FeedbackSignal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessFeedback {
    pub records: Vec<AccessSingle>,
}

/// Feedback on one memory of one symbol in multi-asset mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessMulti {
    pub symbol: String,
    pub id: MemoryId,
    pub feedback: FeedbackSignal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessFeedbackMulti {
    pub records: Vec<AccessMulti>,
}

impl AccessFeedback {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl AccessFeedbackMulti {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Either flavour of feedback batch accepted by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    Single(AccessFeedback),
    Multi(AccessFeedbackMulti),
}

impl From<AccessFeedback> for Feedback {
    fn from(feedback: AccessFeedback) -> Self {
        Feedback::Single(feedback)
    }
}

impl From<AccessFeedbackMulti> for Feedback {
    fn from(feedback: AccessFeedbackMulti) -> Self {
        Feedback::Multi(feedback)
    }
}
