//! Per (wallet, network, asset) ledger of open acquisition lots.
//!
//! The ledger is built by replaying the full event history in feed order, so
//! the lot vector for each key is always ordered by acquisition time with the
//! same tie-break as the feed itself. It is created fresh for one report
//! computation and discarded afterwards.

use super::EngineError;
use crate::events::{LotId, NormalizedEvent};
use crate::money::{Qty, Usd};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Lots are exclusively owned per key; never shared across wallets, networks
/// or assets.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct LedgerKey {
    pub wallet: String,
    pub network: String,
    pub asset: String,
}

impl LedgerKey {
    pub fn of(event: &NormalizedEvent) -> Self {
        LedgerKey {
            wallet: event.wallet.clone(),
            network: event.network.clone(),
            asset: event.asset.clone(),
        }
    }
}

/// An open acquisition lot.
///
/// `quantity_remaining` only ever decreases, and only via the matcher; a lot
/// is removed from the ledger the moment it reaches exactly zero. The unit
/// cost of a partially consumed lot never changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Lot {
    pub id: LotId,
    pub quantity_remaining: Qty,
    pub unit_cost: Usd,
    pub acquired_at: DateTime<Utc>,
    pub source_event_id: String,
}

impl Lot {
    /// Cost basis still carried by this lot.
    pub fn cost_remaining(&self) -> Usd {
        self.unit_cost.mul_qty(self.quantity_remaining)
    }
}

#[derive(Debug, Default)]
pub struct LotLedger {
    lots: BTreeMap<LedgerKey, Vec<Lot>>,
    last_key: Option<(DateTime<Utc>, u64, u32)>,
}

impl LotLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enforce the strict `(timestamp, block_number, log_index)` feed order.
    ///
    /// Must be called for every replayed event, not just acquisitions: a
    /// disposal arriving before the acquisition it should consume would
    /// silently change the result. Equal keys are duplicates, which the input
    /// contract forbids, so they are rejected too.
    pub fn check_order(&mut self, event: &NormalizedEvent) -> Result<(), EngineError> {
        let key = event.ordering_key();
        if let Some(last) = self.last_key {
            if key <= last {
                return Err(EngineError::OutOfOrderEvent {
                    id: event.id.clone(),
                });
            }
        }
        self.last_key = Some(key);
        Ok(())
    }

    /// Open a lot from an Acquisition or Income event.
    pub fn ingest(&mut self, event: &NormalizedEvent) -> Result<(), EngineError> {
        let unit_cost =
            event
                .fiat_value
                .div_qty(event.quantity)
                .ok_or_else(|| EngineError::MalformedEvent {
                    id: event.id.clone(),
                    reason: "zero quantity".into(),
                })?;
        let lot = Lot {
            id: LotId::new(event.id.clone()),
            quantity_remaining: event.quantity,
            unit_cost,
            acquired_at: event.timestamp,
            source_event_id: event.id.clone(),
        };
        log::debug!(
            "lot {} OPEN: {} {} at {}/unit",
            lot.id,
            lot.quantity_remaining,
            event.asset,
            lot.unit_cost
        );
        self.lots.entry(LedgerKey::of(event)).or_default().push(lot);
        Ok(())
    }

    /// Snapshot of the open lots for one key at the current replay point,
    /// oldest acquisition first.
    pub fn lots_for(&self, key: &LedgerKey) -> &[Lot] {
        self.lots.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Mutable access for the matcher.
    pub(crate) fn lots_mut(&mut self, key: &LedgerKey) -> &mut Vec<Lot> {
        self.lots.entry(key.clone()).or_default()
    }

    /// Total open quantity under one key.
    pub fn open_quantity(&self, key: &LedgerKey) -> Qty {
        self.lots_for(key).iter().map(|l| l.quantity_remaining).sum()
    }
}
