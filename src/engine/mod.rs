//! The tax lot cost-basis engine.
//!
//! A pure, stateless computation: one caller-supplied event feed in, one
//! immutable [`Report`] out. The ledger lives for exactly one
//! [`compute_report`] call, so concurrent computations for different wallets
//! or parameter sets share nothing.

pub mod classify;
pub mod ledger;
pub mod matcher;
pub mod report;
pub mod warnings;

// Flat public surface for domain types and functions.
pub use classify::{classify_disposal, classify_income, HoldingTerm, IncomeEvent, TaxEvent};
pub use ledger::{LedgerKey, Lot, LotLedger};
pub use matcher::{match_disposal, ConsumedLot, DisposalMatch, Method};
pub use report::{CapitalGainsSummary, IncomeSummary, Report, TermTotals};
pub use warnings::Warning;

use crate::events::{EventKind, LotId, NormalizedEvent};
use chrono::Datelike;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

/// Reference long-term boundary: strictly more than this many days held.
pub const DEFAULT_LONG_TERM_THRESHOLD_DAYS: i64 = 365;

/// Fatal engine errors. Every variant names the offending event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("malformed event {id}: {reason}")]
    MalformedEvent { id: String, reason: String },
    #[error("event {id} breaks the (timestamp, block, log) stream order")]
    OutOfOrderEvent { id: String },
    #[error("specific-identification disposal {id} carries no lot selection")]
    MissingLotSelection { id: String },
    #[error("disposal {id} references unknown or insufficient lot {lot_id}")]
    InvalidLotReference { id: String, lot_id: LotId },
}

/// What to do when a Specific-Identification disposal cannot be matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Abort the whole report; the default, for auditability.
    #[default]
    Abort,
    /// Skip the disposal and record a `Warning::SkippedDisposal`.
    SkipAndWarn,
}

/// Per-invocation engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub method: Method,
    /// Calendar-year filter on disposal / receipt dates.
    pub tax_year: Option<i32>,
    pub networks: Option<BTreeSet<String>>,
    pub protocols: Option<BTreeSet<String>>,
    pub long_term_threshold_days: i64,
    pub specific_id_failures: FailurePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            method: Method::default(),
            tax_year: None,
            networks: None,
            protocols: None,
            long_term_threshold_days: DEFAULT_LONG_TERM_THRESHOLD_DAYS,
            specific_id_failures: FailurePolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_method(method: Method) -> Self {
        EngineConfig {
            method,
            ..Default::default()
        }
    }

    fn includes_disposal(&self, e: &TaxEvent) -> bool {
        self.tax_year.is_none_or(|y| e.disposed_at.year() == y)
            && self.networks.as_ref().is_none_or(|n| n.contains(&e.network))
            && self
                .protocols
                .as_ref()
                .is_none_or(|p| p.contains(&e.protocol))
    }

    fn includes_income(&self, e: &IncomeEvent) -> bool {
        self.tax_year.is_none_or(|y| e.received_at.year() == y)
            && self.networks.as_ref().is_none_or(|n| n.contains(&e.network))
            && self
                .protocols
                .as_ref()
                .is_none_or(|p| p.contains(&e.protocol))
    }

    /// Stable digest of `(wallet, method, filters, threshold)`.
    ///
    /// The engine never deduplicates concurrent requests itself; a caller
    /// that wants at-most-one computation per parameter set can key a
    /// coalescing layer on this.
    pub fn fingerprint(&self, wallet: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(wallet.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.method.display().as_bytes());
        hasher.update([0u8]);
        if let Some(year) = self.tax_year {
            hasher.update(year.to_be_bytes());
        }
        hasher.update([0u8]);
        for network in self.networks.iter().flatten() {
            hasher.update(network.as_bytes());
            hasher.update([1u8]);
        }
        hasher.update([0u8]);
        for protocol in self.protocols.iter().flatten() {
            hasher.update(protocol.as_bytes());
            hasher.update([1u8]);
        }
        hasher.update([0u8]);
        hasher.update(self.long_term_threshold_days.to_be_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Check the §6 input contract for one event, before any lot mutation.
fn validate(event: &NormalizedEvent) -> Result<(), EngineError> {
    let malformed = |reason: &str| EngineError::MalformedEvent {
        id: event.id.clone(),
        reason: reason.to_string(),
    };
    if event.id.is_empty() {
        return Err(EngineError::MalformedEvent {
            id: "<missing>".to_string(),
            reason: "empty event id".to_string(),
        });
    }
    if event.wallet.is_empty() {
        return Err(malformed("empty wallet"));
    }
    if event.network.is_empty() {
        return Err(malformed("empty network"));
    }
    if event.protocol.is_empty() {
        return Err(malformed("empty protocol"));
    }
    if event.asset.is_empty() {
        return Err(malformed("empty asset symbol"));
    }
    if event.quantity.is_zero() || event.quantity.is_negative() {
        return Err(malformed("non-positive quantity"));
    }
    if event.fiat_value.is_negative() {
        return Err(malformed("negative fiat value"));
    }
    if event.kind == EventKind::Income && event.income_type.is_none() {
        return Err(malformed("income event without income_type"));
    }
    Ok(())
}

/// Compute a report over one normalized event feed.
///
/// Pure function of `(events, config)`: no I/O, no retained state, and
/// byte-identical output for identical inputs.
pub fn compute_report(
    events: &[NormalizedEvent],
    config: &EngineConfig,
) -> Result<Report, EngineError> {
    // Fail fast on malformed input before the ledger sees anything.
    for event in events {
        validate(event)?;
    }

    let mut ledger = LotLedger::new();
    let mut tax_events: Vec<TaxEvent> = Vec::new();
    let mut income_events: Vec<IncomeEvent> = Vec::new();
    let mut warnings: Vec<Warning> = Vec::new();

    for event in events {
        ledger.check_order(event)?;
        match event.kind {
            EventKind::Acquisition => ledger.ingest(event)?,
            EventKind::Income => {
                let income_type =
                    event
                        .income_type
                        .ok_or_else(|| EngineError::MalformedEvent {
                            id: event.id.clone(),
                            reason: "income event without income_type".to_string(),
                        })?;
                income_events.push(classify_income(event, income_type));
                // Income is taxed at receipt, then tracked as a lot at fair
                // market value for future disposal.
                ledger.ingest(event)?;
            }
            EventKind::Disposal => {
                match match_disposal(&mut ledger, event, config.method) {
                    Ok((matched, warning)) => {
                        warnings.extend(warning);
                        tax_events.extend(classify_disposal(
                            &matched,
                            event,
                            config.long_term_threshold_days,
                        ));
                    }
                    Err(
                        err @ (EngineError::MissingLotSelection { .. }
                        | EngineError::InvalidLotReference { .. }),
                    ) if config.specific_id_failures == FailurePolicy::SkipAndWarn => {
                        log::debug!("skipping disposal {}: {}", event.id, err);
                        warnings.push(Warning::SkippedDisposal {
                            event_id: event.id.clone(),
                            reason: err.to_string(),
                        });
                    }
                    Err(err) => return Err(err),
                }
            }
        }
    }

    Ok(report::assemble(tax_events, income_events, warnings, config))
}
