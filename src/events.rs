//! Normalized event feed contract.
//!
//! Upstream adapters (indexer clients, per-protocol decoders) produce this
//! feed: every event already valued in USD at event time, network/protocol
//! tagged, deduplicated, and ordered by `(timestamp, block_number, log_index)`.
//! The engine consumes it as-is and rejects anything that breaks the contract.

use crate::money::{Qty, Usd};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// Root of the JSON input format.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EventFeed {
    pub events: Vec<NormalizedEvent>,
}

/// What a normalized event does to the holder's position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum EventKind {
    /// Asset units acquired; creates a lot at the event's fiat value.
    Acquisition,
    /// Asset units disposed of; consumes lots per the configured method.
    Disposal,
    /// Ordinary income at receipt; also creates a lot at fair market value.
    Income,
}

/// Classification of an income event, carried by the upstream adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum IncomeType {
    Interest,
    StakingReward,
    Airdrop,
    LiquidityMining,
}

impl IncomeType {
    pub fn display(&self) -> &'static str {
        match self {
            IncomeType::Interest => "interest",
            IncomeType::StakingReward => "staking_reward",
            IncomeType::Airdrop => "airdrop",
            IncomeType::LiquidityMining => "liquidity_mining",
        }
    }
}

impl std::fmt::Display for IncomeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Identifier of an open lot.
///
/// One event creates exactly one lot, so the lot id is the id of the
/// acquisition or income event that created it. Specific-Identification
/// disposals reference these ids.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct LotId(String);

impl LotId {
    pub fn new(id: impl Into<String>) -> Self {
        LotId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of a Specific-Identification lot selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LotSelection {
    pub lot_id: LotId,
    pub quantity: Qty,
}

/// A normalized on-chain event, immutable input to the engine.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NormalizedEvent {
    /// Unique event id (typically tx hash + log index), used in errors,
    /// warnings and lot ids.
    pub id: String,
    pub wallet: String,
    pub network: String,
    pub protocol: String,
    /// Asset symbol, e.g. "ETH", "USDC".
    pub asset: String,
    pub kind: EventKind,
    #[schemars(with = "String")]
    pub timestamp: DateTime<Utc>,
    /// Secondary ordering key, breaks timestamp ties.
    pub block_number: u64,
    /// Tertiary ordering key, breaks block ties.
    pub log_index: u32,
    pub quantity: Qty,
    /// USD value of the event at event time (cost for acquisitions, proceeds
    /// for disposals, fair market value for income).
    pub fiat_value: Usd,
    /// The other side of a swap, informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter_asset: Option<String>,
    /// Required for `Income` events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub income_type: Option<IncomeType>,
    /// Required for `Disposal` events under Specific-Identification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lots: Option<Vec<LotSelection>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NormalizedEvent {
    /// The strict total order the input feed must follow.
    pub fn ordering_key(&self) -> (DateTime<Utc>, u64, u32) {
        (self.timestamp, self.block_number, self.log_index)
    }
}

/// Read a normalized event feed from JSON.
///
/// Input order is preserved: the feed contract says the normalizer orders
/// events, and the engine must surface `OutOfOrderEvent` rather than mask a
/// broken upstream by re-sorting.
pub fn read_json<R: Read>(reader: R) -> anyhow::Result<Vec<NormalizedEvent>> {
    let feed: EventFeed = serde_json::from_reader(reader)?;
    Ok(feed.events)
}
