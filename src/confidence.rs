//! Confidence tiers for paired comparisons.

use serde::Serialize;
use std::fmt;

/// How a pairing was established.
///
/// Ordered from the strongest automatic evidence to operator-created pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchConfidence {
    /// Same identity key and amount.
    High,

    /// Same name derived from the identity, and amount.
    Medium,

    /// Amount (and date window) only.
    Low,

    /// Paired by an operator.
    Manual,
}

impl MatchConfidence {
    pub const ALL: [MatchConfidence; 4] = [Self::High, Self::Medium, Self::Low, Self::Manual];

    /// Tiers an operator is expected to review before trusting the pair.
    pub fn requires_confirmation(self) -> bool {
        matches!(self, Self::Medium | Self::Low)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for MatchConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
