use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Batch lifecycle: `Uploaded → Mapped → Validated → Committed → RolledBack`,
/// with `Cancelled` reachable from the three pre-commit states. `Mapped` and
/// `Validated` may be re-entered before commit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Uploaded,
    Mapped,
    Validated,
    Committed,
    RolledBack,
    Cancelled,
}

impl BatchStatus {
    /// Whether a transition from `self` to `next` is legal.
    pub fn can_transition(self, next: BatchStatus) -> bool {
        use BatchStatus::*;
        matches!(
            (self, next),
            (Uploaded, Mapped)
                | (Mapped, Mapped)
                | (Mapped, Validated)
                | (Validated, Mapped)
                | (Validated, Validated)
                | (Validated, Committed)
                | (Committed, RolledBack)
                | (Uploaded, Cancelled)
                | (Mapped, Cancelled)
                | (Validated, Cancelled)
        )
    }

    /// Terminal states accept no further transitions except
    /// `Committed → RolledBack`.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BatchStatus::Committed | BatchStatus::RolledBack | BatchStatus::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BatchStatus::Uploaded => "uploaded",
            BatchStatus::Mapped => "mapped",
            BatchStatus::Validated => "validated",
            BatchStatus::Committed => "committed",
            BatchStatus::RolledBack => "rolled_back",
            BatchStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploaded" => Ok(BatchStatus::Uploaded),
            "mapped" => Ok(BatchStatus::Mapped),
            "validated" => Ok(BatchStatus::Validated),
            "committed" => Ok(BatchStatus::Committed),
            "rolled_back" => Ok(BatchStatus::RolledBack),
            "cancelled" => Ok(BatchStatus::Cancelled),
            other => Err(format!("Unknown batch status: {other}")),
        }
    }
}
