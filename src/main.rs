use clap::{Parser, Subcommand};
use taxlot::cmd::{report::ReportCommand, schema::SchemaCommand, summary::SummaryCommand};

#[derive(Parser, Debug)]
#[command(name = "taxlot", version, about = "Tax lot cost-basis engine for on-chain capital gains and income")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Form 8949 rows for a normalized event feed
    Report(ReportCommand),
    /// Aggregated capital gains and income totals
    Summary(SummaryCommand),
    /// Print the JSON Schema of the expected input feed
    Schema(SchemaCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Report(cmd) => cmd.exec(),
        Command::Summary(cmd) => cmd.exec(),
        Command::Schema(cmd) => cmd.exec(),
    }
}
