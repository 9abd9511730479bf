use crate::money::Qty;
use serde::{Deserialize, Serialize};

/// Recoverable conditions surfaced on the report, never only logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Warning {
    /// Open lots could not cover the disposal. The shortfall portion was
    /// assigned a zero cost basis, which maximizes the reported gain.
    InsufficientBasis {
        event_id: String,
        asset: String,
        requested: Qty,
        available: Qty,
        shortfall: Qty,
    },
    /// A Specific-Identification disposal was skipped under
    /// `FailurePolicy::SkipAndWarn`.
    SkippedDisposal { event_id: String, reason: String },
}
