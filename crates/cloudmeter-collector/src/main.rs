//! Cloudmeter collector CLI.
//!
//! Invoked by a scheduler (daily) or by an operator (backfills).

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cloudmeter_collector::{Collector, CollectorConfig};
use cloudmeter_store::RocksStore;

#[derive(Parser)]
#[command(name = "cloudmeter", about = "Cloud spending collector", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Collect yesterday's spending (the scheduled case).
    Daily,

    /// Collect one date.
    Date {
        /// The date, YYYY-MM-DD.
        date: String,
    },

    /// Backfill every day of a month.
    Month {
        /// The month, YYYY-MM.
        month: String,
    },

    /// Backfill the previous calendar month.
    PreviousMonth,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,cloudmeter=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = match CollectorConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            tracing::error!(%error, "Configuration error");
            return ExitCode::FAILURE;
        }
    };

    let store = match RocksStore::open(&config.data_dir) {
        Ok(store) => store,
        Err(error) => {
            tracing::error!(%error, path = %config.data_dir, "Failed to open token cache");
            return ExitCode::FAILURE;
        }
    };

    let collector = Collector::new(config, Arc::new(store));
    run(&collector, cli.command).await
}

async fn run(collector: &Collector, command: Command) -> ExitCode {
    match command {
        Command::Daily => report_date(collector.collect_daily().await),
        Command::Date { date } => report_date(collector.collect_for_date(&date).await),
        Command::Month { month } => {
            report_month(collector.collect_for_month(&month).await)
        }
        Command::PreviousMonth => report_month(collector.collect_for_previous_month().await),
    }
}

fn report_date(
    result: Result<cloudmeter_collector::DateSummary, cloudmeter_collector::CollectError>,
) -> ExitCode {
    match result {
        Ok(summary) => {
            tracing::info!(
                date = %summary.date,
                records = summary.record_count,
                "Collection complete"
            );
            ExitCode::SUCCESS
        }
        Err(error) => {
            tracing::error!(%error, "Collection failed");
            ExitCode::FAILURE
        }
    }
}

fn report_month(
    result: Result<Vec<cloudmeter_collector::DayOutcome>, cloudmeter_collector::CollectError>,
) -> ExitCode {
    match result {
        Ok(outcomes) => {
            let failed = outcomes
                .iter()
                .filter(|outcome| outcome.result.is_err())
                .count();
            tracing::info!(
                days = outcomes.len(),
                failed,
                "Month backfill complete"
            );
            if failed == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(error) => {
            tracing::error!(%error, "Month backfill failed");
            ExitCode::FAILURE
        }
    }
}
