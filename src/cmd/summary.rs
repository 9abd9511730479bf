//! Summary command - aggregated capital gains and income totals

use super::report::{print_warnings, run_engine};
use super::EngineArgs;
use crate::engine::Report;
use clap::Args;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct SummaryCommand {
    /// JSON file containing the normalized event feed (or "-" for stdin)
    #[arg(short, long)]
    events: PathBuf,

    #[command(flatten)]
    engine: EngineArgs,

    /// Output as JSON instead of formatted text
    #[arg(long)]
    json: bool,
}

/// Summary data for JSON output, rounded to cents at this edge.
#[derive(Debug, Serialize)]
struct SummaryData {
    method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tax_year: Option<i32>,
    capital_gains: CapitalGainsData,
    income: IncomeData,
    warnings: usize,
}

#[derive(Debug, Serialize)]
struct CapitalGainsData {
    short_term_total: String,
    short_term_events: usize,
    long_term_total: String,
    long_term_events: usize,
    net_total: String,
}

#[derive(Debug, Serialize)]
struct IncomeData {
    total: String,
    events: usize,
    by_type: BTreeMap<String, String>,
}

impl From<&Report> for SummaryData {
    fn from(report: &Report) -> Self {
        SummaryData {
            method: report.method.to_string(),
            tax_year: report.tax_year,
            capital_gains: CapitalGainsData {
                short_term_total: report.capital_gains.short_term.total.round_cents().to_string(),
                short_term_events: report.capital_gains.short_term.events,
                long_term_total: report.capital_gains.long_term.total.round_cents().to_string(),
                long_term_events: report.capital_gains.long_term.events,
                net_total: report.capital_gains.net_total.round_cents().to_string(),
            },
            income: IncomeData {
                total: report.income.total.round_cents().to_string(),
                events: report.income.events,
                by_type: report
                    .income
                    .by_type
                    .iter()
                    .map(|(ty, total)| (ty.to_string(), total.round_cents().to_string()))
                    .collect(),
            },
            warnings: report.warnings.len(),
        }
    }
}

impl SummaryCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let report = run_engine(&self.events, &self.engine)?;

        if self.json {
            let data = SummaryData::from(&report);
            println!("{}", serde_json::to_string_pretty(&data)?);
        } else {
            print_summary(&report);
            print_warnings(&report.warnings);
        }
        Ok(())
    }
}

fn print_summary(report: &Report) {
    let year_str = report
        .tax_year
        .map_or("All Years".to_string(), |y| y.to_string());

    println!();
    println!("TAX SUMMARY ({year_str}) - {} cost basis", report.method);
    println!();
    println!("CAPITAL GAINS");
    println!(
        "  Short-term: {:>14}  ({} events)",
        report.capital_gains.short_term.total.round_cents(),
        report.capital_gains.short_term.events
    );
    println!(
        "  Long-term:  {:>14}  ({} events)",
        report.capital_gains.long_term.total.round_cents(),
        report.capital_gains.long_term.events
    );
    println!(
        "  Net total:  {:>14}",
        report.capital_gains.net_total.round_cents()
    );
    println!();
    println!("INCOME");
    println!(
        "  Total:      {:>14}  ({} events)",
        report.income.total.round_cents(),
        report.income.events
    );
    for (ty, total) in &report.income.by_type {
        println!("    {:18} {:>12}", ty.to_string(), total.round_cents());
    }
    if !report.warnings.is_empty() {
        println!();
        println!("Warnings: {}", report.warnings.len());
    }
}
