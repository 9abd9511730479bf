//! Tax lot cost-basis engine for on-chain capital gains and income.
//!
//! Consumes a normalized, time-ordered event feed produced by upstream
//! adapters and computes capital gains (FIFO / LIFO / HIFO /
//! Specific-Identification lot matching) and ordinary income, shaped for
//! Form 8949 reporting.

pub mod cmd;
pub mod engine;
pub mod events;
pub mod money;

pub use engine::{
    compute_report, CapitalGainsSummary, DisposalMatch, EngineConfig, EngineError, FailurePolicy,
    HoldingTerm, IncomeEvent, IncomeSummary, LotLedger, Method, Report, TaxEvent, Warning,
};
pub use events::{EventFeed, EventKind, IncomeType, LotId, LotSelection, NormalizedEvent};
pub use money::{Qty, Usd};
