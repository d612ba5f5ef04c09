use serde::{Deserialize, Serialize};
use std::fmt;

/// One memory horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Short,
    Mid,
    Long,
    Reflection,
}

impl Tier {
    /// All tiers in the fixed order used for decay and persistence.
    pub const ALL: [Tier; 4] = [Tier::Short, Tier::Mid, Tier::Long, Tier::Reflection];

    pub fn label(self) -> &'static str {
        match self {
            Tier::Short => "short",
            Tier::Mid => "mid",
            Tier::Long => "long",
            Tier::Reflection => "reflection",
        }
    }

    /// Text handed to prompt construction when the tier has nothing to say.
    pub fn empty_sentinel(self) -> String {
        format!("No {}-term information.", self.label())
    }

    /// Destination of a promotion out of this tier.
    pub fn next(self) -> Option<Tier> {
        match self {
            Tier::Short => Some(Tier::Mid),
            Tier::Mid => Some(Tier::Long),
            Tier::Long | Tier::Reflection => None,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Tier::Short => 0,
            Tier::Mid => 1,
            Tier::Long => 2,
            Tier::Reflection => 3,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
