//! Tier identities and their trust ranking.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Whether the resolver may write into a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TierAccess {
    /// Externally maintained dataset.
    ReadOnly,
    /// Cache populated by the resolver.
    ReadWrite,
}

/// The five backing stores, declared in trust order (most trusted first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierId {
    /// Authoritative OpenCelliD dataset.
    OpenCellId,
    /// Community dataset (Mozilla Location Service export).
    Mozilla,
    /// Cache of answers from the binary-protocol provider.
    Glm,
    /// Cache of answers from the Unwired Labs REST provider.
    UnwiredLabs,
    /// Self-owned cache of approximated and default locations.
    Own,
}

impl TierId {
    /// All tiers in lookup order.
    pub const ALL: [TierId; 5] = [
        TierId::OpenCellId,
        TierId::Mozilla,
        TierId::Glm,
        TierId::UnwiredLabs,
        TierId::Own,
    ];

    /// Position in the lookup order; lower is more trusted.
    pub fn rank(self) -> usize {
        self as usize
    }

    pub fn access(self) -> TierAccess {
        match self {
            TierId::OpenCellId | TierId::Mozilla => TierAccess::ReadOnly,
            TierId::Glm | TierId::UnwiredLabs | TierId::Own => TierAccess::ReadWrite,
        }
    }

    pub fn is_read_only(self) -> bool {
        self.access() == TierAccess::ReadOnly
    }

    /// Tiers that outrank this one, most trusted first.
    pub fn higher(self) -> impl Iterator<Item = TierId> {
        TierId::ALL.into_iter().take(self.rank())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TierId::OpenCellId => "opencellid",
            TierId::Mozilla => "mozilla",
            TierId::Glm => "glm",
            TierId::UnwiredLabs => "unwiredlabs",
            TierId::Own => "own",
        }
    }
}

impl fmt::Display for TierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TierId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TierId::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let names: Vec<&str> = TierId::ALL.iter().map(|t| t.as_str()).collect();
                format!("unknown tier '{s}', expected one of {names:?}")
            })
    }
}
