//! Method-specific lot selection and disposal splitting.
//!
//! The four accounting methods differ only in the order lots are considered,
//! so FIFO/LIFO/HIFO are expressed as a pure ordering over the open-lot
//! positions (position in the ledger == chronological order) and
//! Specific-Identification consumes exactly the lots the disposal names.

use super::ledger::{LedgerKey, Lot, LotLedger};
use super::warnings::Warning;
use super::EngineError;
use crate::events::{LotId, NormalizedEvent};
use crate::money::{Qty, Usd};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lot-selection accounting method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Method {
    /// First-in-first-out: oldest acquisition first.
    #[default]
    Fifo,
    /// Last-in-first-out: newest acquisition first.
    Lifo,
    /// Highest unit cost first; ties go to the oldest acquisition.
    Hifo,
    /// The disposal names the exact lots it consumes.
    SpecificId,
}

impl Method {
    pub fn display(&self) -> &'static str {
        match self {
            Method::Fifo => "FIFO",
            Method::Lifo => "LIFO",
            Method::Hifo => "HIFO",
            Method::SpecificId => "SpecificID",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// One lot-portion consumed by a disposal.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumedLot {
    pub lot_id: LotId,
    pub quantity: Qty,
    pub unit_cost: Usd,
    pub cost_basis: Usd,
    pub acquired_at: DateTime<Utc>,
}

/// Result of matching one disposal against the ledger.
///
/// The consumed quantities plus any shortfall always sum to the disposal
/// quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct DisposalMatch {
    pub event_id: String,
    pub consumed: Vec<ConsumedLot>,
    /// Quantity no open lot could cover; carries zero cost basis downstream.
    pub shortfall: Option<Qty>,
}

/// Select and consume lots to cover `event`'s disposed quantity.
///
/// Mutates the ledger in place: partially consumed lots keep their unit cost
/// with a reduced `quantity_remaining`, exhausted lots are removed. Proceeds
/// are not touched here; gain/loss math belongs to the classifier.
pub fn match_disposal(
    ledger: &mut LotLedger,
    event: &NormalizedEvent,
    method: Method,
) -> Result<(DisposalMatch, Option<Warning>), EngineError> {
    let key = LedgerKey::of(event);
    let consumed = match method {
        Method::SpecificId => consume_selected(ledger, event, &key)?,
        _ => consume_ranked(ledger, event, &key, method),
    };

    let covered: Qty = consumed.iter().map(|c| c.quantity).sum();
    let shortfall = event.quantity - covered;
    let (shortfall, warning) = if shortfall.is_zero() {
        (None, None)
    } else {
        log::debug!(
            "disposal {}: open lots cover {} of {} {}, shortfall {}",
            event.id,
            covered,
            event.quantity,
            event.asset,
            shortfall
        );
        let warning = Warning::InsufficientBasis {
            event_id: event.id.clone(),
            asset: event.asset.clone(),
            requested: event.quantity,
            available: covered,
            shortfall,
        };
        (Some(shortfall), Some(warning))
    };

    Ok((
        DisposalMatch {
            event_id: event.id.clone(),
            consumed,
            shortfall,
        },
        warning,
    ))
}

/// Positions of the open lots in the order the method consumes them.
fn selection_order(lots: &[Lot], method: Method) -> Vec<usize> {
    let mut order: Vec<usize> = (0..lots.len()).collect();
    match method {
        Method::Fifo | Method::SpecificId => {}
        Method::Lifo => order.reverse(),
        Method::Hifo => {
            order.sort_by(|&a, &b| lots[b].unit_cost.cmp(&lots[a].unit_cost).then(a.cmp(&b)))
        }
    }
    order
}

fn consume_ranked(
    ledger: &mut LotLedger,
    event: &NormalizedEvent,
    key: &LedgerKey,
    method: Method,
) -> Vec<ConsumedLot> {
    let lots = ledger.lots_mut(key);
    let order = selection_order(lots, method);

    let mut remaining = event.quantity;
    let mut consumed = Vec::new();
    for idx in order {
        if remaining.is_zero() {
            break;
        }
        let lot = &mut lots[idx];
        let take = remaining.min(lot.quantity_remaining);
        consumed.push(take_from(lot, take, &event.id));
        remaining -= take;
    }
    lots.retain(|l| !l.quantity_remaining.is_zero());
    consumed
}

fn consume_selected(
    ledger: &mut LotLedger,
    event: &NormalizedEvent,
    key: &LedgerKey,
) -> Result<Vec<ConsumedLot>, EngineError> {
    let selections = event
        .lots
        .as_ref()
        .ok_or_else(|| EngineError::MissingLotSelection {
            id: event.id.clone(),
        })?;

    let lots = ledger.lots_mut(key);

    // Validate the whole selection before mutating anything, so a rejected
    // disposal under `SkipAndWarn` leaves the ledger untouched. Cumulative
    // totals catch the same lot referenced twice.
    let mut requested: HashMap<&LotId, Qty> = HashMap::new();
    let mut selected_total = Qty::ZERO;
    for sel in selections {
        let lot = lots.iter().find(|l| l.id == sel.lot_id).ok_or_else(|| {
            EngineError::InvalidLotReference {
                id: event.id.clone(),
                lot_id: sel.lot_id.clone(),
            }
        })?;
        let total = requested.entry(&sel.lot_id).or_insert(Qty::ZERO);
        *total += sel.quantity;
        if sel.quantity.is_zero() || sel.quantity.is_negative() || *total > lot.quantity_remaining
        {
            return Err(EngineError::InvalidLotReference {
                id: event.id.clone(),
                lot_id: sel.lot_id.clone(),
            });
        }
        selected_total += sel.quantity;
    }
    if selected_total > event.quantity {
        return Err(EngineError::MalformedEvent {
            id: event.id.clone(),
            reason: "lot selection exceeds disposal quantity".into(),
        });
    }

    let mut consumed = Vec::with_capacity(selections.len());
    for sel in selections {
        // Validated above; a missing lot here would be a logic error.
        if let Some(lot) = lots.iter_mut().find(|l| l.id == sel.lot_id) {
            consumed.push(take_from(lot, sel.quantity, &event.id));
        }
    }
    lots.retain(|l| !l.quantity_remaining.is_zero());
    Ok(consumed)
}

fn take_from(lot: &mut Lot, take: Qty, disposal_id: &str) -> ConsumedLot {
    let cost_basis = lot.unit_cost.mul_qty(take);
    lot.quantity_remaining -= take;
    log::debug!(
        "disposal {}: consume {} from lot {} (basis {}), {} left",
        disposal_id,
        take,
        lot.id,
        cost_basis,
        lot.quantity_remaining
    );
    ConsumedLot {
        lot_id: lot.id.clone(),
        quantity: take,
        unit_cost: lot.unit_cost,
        cost_basis,
        acquired_at: lot.acquired_at,
    }
}
