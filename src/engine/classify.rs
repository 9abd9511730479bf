//! Holding-period and income classification.
//!
//! A disposal becomes one `TaxEvent` per consumed lot-portion, because
//! portions acquired on different dates can land on different sides of the
//! long-term boundary. Income events bypass the matcher entirely.

use super::matcher::DisposalMatch;
use crate::events::{IncomeType, LotId, NormalizedEvent};
use crate::money::{Qty, Usd};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// US-style capital gains term. The day threshold that separates the two is
/// configuration, not a constant baked in here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HoldingTerm {
    ShortTerm,
    LongTerm,
}

impl HoldingTerm {
    /// Form 8949 box code: Part I (short) or Part II (long).
    pub fn box_code(&self) -> &'static str {
        match self {
            HoldingTerm::ShortTerm => "A",
            HoldingTerm::LongTerm => "D",
        }
    }

    pub fn display(&self) -> &'static str {
        match self {
            HoldingTerm::ShortTerm => "short",
            HoldingTerm::LongTerm => "long",
        }
    }
}

impl std::fmt::Display for HoldingTerm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// One reportable gain/loss line (a Form 8949 row).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxEvent {
    pub disposal_event_id: String,
    /// `None` for the zero-basis shortfall portion of an under-covered
    /// disposal.
    pub lot_id: Option<LotId>,
    pub asset: String,
    pub network: String,
    pub protocol: String,
    pub quantity: Qty,
    pub proceeds: Usd,
    pub cost_basis: Usd,
    pub gain_loss: Usd,
    pub acquired_at: DateTime<Utc>,
    pub disposed_at: DateTime<Utc>,
    pub term: HoldingTerm,
    pub holding_days: i64,
}

/// Ordinary income at receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeEvent {
    pub event_id: String,
    pub asset: String,
    pub network: String,
    pub protocol: String,
    pub income_type: IncomeType,
    pub quantity: Qty,
    pub fiat_value: Usd,
    pub received_at: DateTime<Utc>,
}

/// Convert a matched disposal into tax events, one per consumed lot-portion.
///
/// Proceeds are the disposal's fiat value apportioned pro rata by quantity;
/// the final portion takes the exact remainder so the shares always sum to
/// the event's `fiat_value` with no rounding drift.
pub fn classify_disposal(
    m: &DisposalMatch,
    event: &NormalizedEvent,
    long_term_threshold_days: i64,
) -> Vec<TaxEvent> {
    let portions = m.consumed.len() + usize::from(m.shortfall.is_some());
    let mut out = Vec::with_capacity(portions);
    let mut allocated = Usd::ZERO;

    for (i, c) in m.consumed.iter().enumerate() {
        let is_last = i + 1 == portions;
        let proceeds = if is_last {
            event.fiat_value - allocated
        } else {
            let ratio = c.quantity.ratio_of(event.quantity).unwrap_or_default();
            event.fiat_value.mul_ratio(ratio)
        };
        allocated += proceeds;

        let holding_days = (event.timestamp - c.acquired_at).num_days();
        let term = if holding_days > long_term_threshold_days {
            HoldingTerm::LongTerm
        } else {
            HoldingTerm::ShortTerm
        };

        out.push(TaxEvent {
            disposal_event_id: event.id.clone(),
            lot_id: Some(c.lot_id.clone()),
            asset: event.asset.clone(),
            network: event.network.clone(),
            protocol: event.protocol.clone(),
            quantity: c.quantity,
            proceeds,
            cost_basis: c.cost_basis,
            gain_loss: proceeds - c.cost_basis,
            acquired_at: c.acquired_at,
            disposed_at: event.timestamp,
            term,
            holding_days,
        });
    }

    if let Some(shortfall) = m.shortfall {
        // Zero-basis remainder: no acquisition is known, so the acquisition
        // date collapses onto the disposal date and the whole share is gain.
        let proceeds = event.fiat_value - allocated;
        out.push(TaxEvent {
            disposal_event_id: event.id.clone(),
            lot_id: None,
            asset: event.asset.clone(),
            network: event.network.clone(),
            protocol: event.protocol.clone(),
            quantity: shortfall,
            proceeds,
            cost_basis: Usd::ZERO,
            gain_loss: proceeds,
            acquired_at: event.timestamp,
            disposed_at: event.timestamp,
            term: HoldingTerm::ShortTerm,
            holding_days: 0,
        });
    }

    out
}

/// Classify an income event. The caller has already established that
/// `income_type` is present.
pub fn classify_income(event: &NormalizedEvent, income_type: IncomeType) -> IncomeEvent {
    IncomeEvent {
        event_id: event.id.clone(),
        asset: event.asset.clone(),
        network: event.network.clone(),
        protocol: event.protocol.clone(),
        income_type,
        quantity: event.quantity,
        fiat_value: event.fiat_value,
        received_at: event.timestamp,
    }
}
