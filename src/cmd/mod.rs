pub mod report;
pub mod schema;
pub mod summary;

use crate::engine::{EngineConfig, FailurePolicy, Method};
use crate::events::{self, NormalizedEvent};
use clap::{Args, ValueEnum};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Read a normalized event feed (JSON), from a file or stdin with "-".
pub fn read_events(path: &Path) -> anyhow::Result<Vec<NormalizedEvent>> {
    if path.as_os_str() == "-" {
        read_from_stdin()
    } else {
        let file = File::open(path)?;
        events::read_json(BufReader::new(file))
    }
}

fn read_from_stdin() -> anyhow::Result<Vec<NormalizedEvent>> {
    let stdin = io::stdin();
    let mut reader = BufReader::new(stdin.lock());

    let mut buffer = Vec::new();
    reader.read_to_end(&mut buffer)?;

    if buffer.is_empty() {
        anyhow::bail!("No input received. Provide a file or pipe data to stdin.");
    }

    events::read_json(io::Cursor::new(buffer))
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum MethodArg {
    #[default]
    Fifo,
    Lifo,
    Hifo,
    SpecificId,
}

impl From<MethodArg> for Method {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Fifo => Method::Fifo,
            MethodArg::Lifo => Method::Lifo,
            MethodArg::Hifo => Method::Hifo,
            MethodArg::SpecificId => Method::SpecificId,
        }
    }
}

/// Engine options shared by the report and summary commands.
#[derive(Args, Debug)]
pub struct EngineArgs {
    /// Cost basis method
    #[arg(short, long, value_enum, default_value_t = MethodArg::Fifo)]
    pub method: MethodArg,

    /// Calendar tax year to filter (e.g., 2024)
    #[arg(short, long)]
    pub year: Option<i32>,

    /// Only include this network (repeatable)
    #[arg(long = "network")]
    pub networks: Vec<String>,

    /// Only include this protocol (repeatable)
    #[arg(long = "protocol")]
    pub protocols: Vec<String>,

    /// Days held above which a gain is long-term
    #[arg(long, default_value_t = crate::engine::DEFAULT_LONG_TERM_THRESHOLD_DAYS)]
    pub long_term_days: i64,

    /// Skip unmatched specific-ID disposals with a warning instead of
    /// aborting the report
    #[arg(long)]
    pub skip_invalid_lots: bool,
}

impl EngineArgs {
    pub fn to_config(&self) -> EngineConfig {
        EngineConfig {
            method: self.method.into(),
            tax_year: self.year,
            networks: (!self.networks.is_empty()).then(|| self.networks.iter().cloned().collect()),
            protocols: (!self.protocols.is_empty())
                .then(|| self.protocols.iter().cloned().collect()),
            long_term_threshold_days: self.long_term_days,
            specific_id_failures: if self.skip_invalid_lots {
                FailurePolicy::SkipAndWarn
            } else {
                FailurePolicy::Abort
            },
        }
    }
}
