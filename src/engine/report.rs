//! Aggregation and report assembly.
//!
//! Reduces classified tax and income events, filtered by the request's tax
//! year / network / protocol, into the immutable `Report`. All sums are exact
//! decimal additions; rounding to cents happens only in the CSV writer.

use super::classify::{HoldingTerm, IncomeEvent, TaxEvent};
use super::matcher::Method;
use super::warnings::Warning;
use super::EngineConfig;
use crate::events::IncomeType;
use crate::money::Usd;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TermTotals {
    pub total: Usd,
    pub events: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CapitalGainsSummary {
    pub short_term: TermTotals,
    pub long_term: TermTotals,
    pub net_total: Usd,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IncomeSummary {
    pub total: Usd,
    pub events: usize,
    /// Keyed by income type; BTreeMap keeps serialization order stable.
    pub by_type: BTreeMap<IncomeType, Usd>,
}

/// The final report artifact: immutable once assembled, not persisted by the
/// engine.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub method: Method,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_year: Option<i32>,
    pub capital_gains: CapitalGainsSummary,
    pub income: IncomeSummary,
    pub form_8949_rows: Vec<TaxEvent>,
    pub income_events: Vec<IncomeEvent>,
    pub warnings: Vec<Warning>,
}

/// One CSV row per Form 8949 entry, rounded to cents at this edge only.
#[derive(Debug, Serialize)]
struct Form8949CsvRecord {
    description: String,
    date_acquired: String,
    date_disposed: String,
    proceeds: String,
    cost_basis: String,
    gain_loss: String,
    /// Box code: "A" short term, "D" long term.
    term: &'static str,
    event_id: String,
}

impl From<&TaxEvent> for Form8949CsvRecord {
    fn from(e: &TaxEvent) -> Self {
        Form8949CsvRecord {
            description: format!("{} {} ({})", e.quantity, e.asset, e.protocol),
            date_acquired: e.acquired_at.format("%m/%d/%Y").to_string(),
            date_disposed: e.disposed_at.format("%m/%d/%Y").to_string(),
            proceeds: e.proceeds.round_cents().to_string(),
            cost_basis: e.cost_basis.round_cents().to_string(),
            gain_loss: e.gain_loss.round_cents().to_string(),
            term: e.term.box_code(),
            event_id: e.disposal_event_id.clone(),
        }
    }
}

impl Report {
    /// Write the Form 8949 rows as CSV, one row per entry.
    pub fn write_form_8949_csv<W: Write>(&self, writer: W) -> anyhow::Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        for row in &self.form_8949_rows {
            let record: Form8949CsvRecord = row.into();
            wtr.serialize(record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Assemble the report from classified events.
///
/// Filters apply here, to classified outputs only; the ledger was built from
/// the full history so that pre-window acquisitions still provide basis.
pub fn assemble(
    tax_events: Vec<TaxEvent>,
    income_events: Vec<IncomeEvent>,
    warnings: Vec<Warning>,
    config: &EngineConfig,
) -> Report {
    let mut rows: Vec<TaxEvent> = tax_events
        .into_iter()
        .filter(|e| config.includes_disposal(e))
        .collect();
    // Stable: rows of one disposal keep their consumed-lot order
    rows.sort_by(|a, b| {
        a.disposed_at
            .cmp(&b.disposed_at)
            .then_with(|| a.disposal_event_id.cmp(&b.disposal_event_id))
    });

    let mut income_rows: Vec<IncomeEvent> = income_events
        .into_iter()
        .filter(|e| config.includes_income(e))
        .collect();
    income_rows.sort_by(|a, b| {
        a.received_at
            .cmp(&b.received_at)
            .then_with(|| a.event_id.cmp(&b.event_id))
    });

    let mut capital_gains = CapitalGainsSummary::default();
    for row in &rows {
        let bucket = match row.term {
            HoldingTerm::ShortTerm => &mut capital_gains.short_term,
            HoldingTerm::LongTerm => &mut capital_gains.long_term,
        };
        bucket.total += row.gain_loss;
        bucket.events += 1;
    }
    capital_gains.net_total = capital_gains.short_term.total + capital_gains.long_term.total;

    let mut income = IncomeSummary::default();
    for row in &income_rows {
        income.total += row.fiat_value;
        income.events += 1;
        *income.by_type.entry(row.income_type).or_insert(Usd::ZERO) += row.fiat_value;
    }

    Report {
        method: config.method,
        tax_year: config.tax_year,
        capital_gains,
        income,
        form_8949_rows: rows,
        income_events: income_rows,
        warnings,
    }
}
