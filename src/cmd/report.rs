//! Report command - Form 8949 rows as a table or CSV

use super::{read_events, EngineArgs};
use crate::engine::{compute_report, Report, TaxEvent, Warning};
use clap::Args;
use std::path::PathBuf;
use std::{io, path::Path};
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct ReportCommand {
    /// JSON file containing the normalized event feed (or "-" for stdin)
    #[arg(short, long)]
    events: PathBuf,

    #[command(flatten)]
    engine: EngineArgs,

    /// Output as CSV instead of formatted table
    #[arg(long)]
    csv: bool,
}

impl ReportCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let report = run_engine(&self.events, &self.engine)?;

        if self.csv {
            report.write_form_8949_csv(io::stdout())?;
        } else {
            print_table(&report);
        }
        print_warnings(&report.warnings);
        Ok(())
    }
}

pub(super) fn run_engine(events_path: &Path, engine: &EngineArgs) -> anyhow::Result<Report> {
    let events = read_events(events_path)?;
    let config = engine.to_config();
    let report = compute_report(&events, &config)?;
    Ok(report)
}

pub(super) fn print_warnings(warnings: &[Warning]) {
    for warning in warnings {
        match warning {
            Warning::InsufficientBasis {
                event_id,
                asset,
                shortfall,
                ..
            } => eprintln!(
                "warning: disposal {event_id} short {shortfall} {asset} of basis; shortfall treated as zero-cost"
            ),
            Warning::SkippedDisposal { event_id, reason } => {
                eprintln!("warning: disposal {event_id} skipped: {reason}")
            }
        }
    }
}

fn print_table(report: &Report) {
    if report.form_8949_rows.is_empty() {
        println!("No disposals found matching filters");
        return;
    }

    let rows: Vec<Form8949Row> = report.form_8949_rows.iter().map(Into::into).collect();
    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{}", table);
}

/// Row for the report table output
#[derive(Debug, Clone, Tabled)]
struct Form8949Row {
    #[tabled(rename = "Description")]
    description: String,

    #[tabled(rename = "Acquired")]
    acquired: String,

    #[tabled(rename = "Disposed")]
    disposed: String,

    #[tabled(rename = "Proceeds")]
    proceeds: String,

    #[tabled(rename = "Cost Basis")]
    cost_basis: String,

    #[tabled(rename = "Gain/Loss")]
    gain_loss: String,

    #[tabled(rename = "Term")]
    term: String,

    #[tabled(rename = "Days")]
    holding_days: String,
}

impl From<&TaxEvent> for Form8949Row {
    fn from(e: &TaxEvent) -> Self {
        Form8949Row {
            description: format!("{} {} ({})", e.quantity, e.asset, e.protocol),
            acquired: e.acquired_at.format("%Y-%m-%d").to_string(),
            disposed: e.disposed_at.format("%Y-%m-%d").to_string(),
            proceeds: e.proceeds.round_cents().to_string(),
            cost_basis: e.cost_basis.round_cents().to_string(),
            gain_loss: e.gain_loss.round_cents().to_string(),
            term: e.term.display().to_string(),
            holding_days: e.holding_days.to_string(),
        }
    }
}
