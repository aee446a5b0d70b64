//! Cloudmeter collector: the orchestrator tying the pipeline together.
//!
//! One run sequences credential resolution, billing retrieval, reference
//! data fetch, normalization, and the replace-by-date warehouse load for a
//! single date; the month entry points drive that pipeline across a date
//! range sequentially, with pacing between days.
//!
//! Entry points (mirrored by the CLI subcommands):
//!
//! - [`Collector::collect_daily`] — yesterday, the scheduled case
//! - [`Collector::collect_for_date`] — one explicit `YYYY-MM-DD`
//! - [`Collector::collect_for_month`] — backfill a `YYYY-MM`
//! - [`Collector::collect_for_previous_month`] — backfill last month

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
mod error;
mod pipeline;

pub use config::CollectorConfig;
pub use error::CollectError;
pub use pipeline::{Collector, DateSummary, DayOutcome};
