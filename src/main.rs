use chrono::{Datelike, Days, NaiveDate};
use clap::{Parser, Subcommand};
use comfy_table::Table;
use database::{PgStore, connect, run_migrations};
use engine::{AlertEngine, BaselineResolver, Pipeline};
use indicatif::{ProgressBar, ProgressStyle};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use store::SeriesWriter;
use tracing_subscriber::EnvFilter;

/// The main entry point for the Conduit market-conditions engine.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine when DATABASE_URL is set directly.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = configuration::load_config()?;

    // Initialize the database connection and run migrations.
    let pool = connect().await?;
    run_migrations(&pool).await?;
    let store = Arc::new(PgStore::new(pool));

    match cli.command {
        Commands::Compute(args) => handle_compute(args, store, &config).await?,
        Commands::Backfill(args) => handle_backfill(args, store, &config).await?,
        Commands::Alerts(args) => handle_alerts(args, store, &config).await?,
        Commands::Baseline(args) => handle_baseline(args, store).await?,
        Commands::Ingest(args) => handle_ingest(args, store).await?,
    }

    Ok(())
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Derives composite market-condition indicators and alerts from ingested
/// financial time series.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the transmission score, stress index and alerts for one date.
    Compute(ComputeArgs),
    /// Compute a date range, month by month.
    Backfill(BackfillArgs),
    /// Re-run alert detection for one date and show the events.
    Alerts(AlertsArgs),
    /// Show the previous available computed date for a target date.
    Baseline(BaselineArgs),
    /// Load raw observations from a CSV file into the store.
    Ingest(IngestArgs),
}

#[derive(Parser)]
struct ComputeArgs {
    /// The target date (format: YYYY-MM-DD).
    #[arg(long)]
    date: NaiveDate,
}

#[derive(Parser)]
struct BackfillArgs {
    /// The first date to compute (format: YYYY-MM-DD).
    #[arg(long)]
    from: NaiveDate,

    /// The last date to compute (format: YYYY-MM-DD).
    #[arg(long)]
    to: NaiveDate,

    /// Skip dates that already have a computed transmission score, so a
    /// cancelled run can be resumed without recomputing.
    #[arg(long)]
    resume: bool,
}

#[derive(Parser)]
struct AlertsArgs {
    /// The target date (format: YYYY-MM-DD).
    #[arg(long)]
    date: NaiveDate,
}

#[derive(Parser)]
struct BaselineArgs {
    /// The target date (format: YYYY-MM-DD).
    #[arg(long)]
    date: NaiveDate,
}

#[derive(Parser)]
struct IngestArgs {
    /// CSV file with header `series_id,date,value,source`.
    #[arg(long)]
    file: PathBuf,
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_compute(
    args: ComputeArgs,
    store: Arc<PgStore>,
    config: &configuration::Config,
) -> anyhow::Result<()> {
    let pipeline = Pipeline::new(store, config);
    let outcome = pipeline.run_date(args.date).await?;

    let mut table = Table::new();
    table.set_header(vec!["Indicator", "Value", "Regime", "Basis"]);
    table.add_row(vec![
        "Transmission score".to_string(),
        format!("{:.1}", outcome.transmission.score),
        outcome.transmission.regime.to_string(),
        if outcome.transmission.data_availability.neutral_fallback {
            "neutral fallback (calibrating)".to_string()
        } else {
            format!(
                "computed from {} families",
                outcome.transmission.data_availability.included.len()
            )
        },
    ]);
    table.add_row(vec![
        "Stress index".to_string(),
        format!("{:.1}", outcome.stress.stress_index),
        outcome.stress.regime.to_string(),
        format!(
            "{} components",
            outcome.stress.data_availability.included.len()
        ),
    ]);
    println!("{table}");

    if !outcome.stress.drivers.is_empty() {
        let mut drivers = Table::new();
        drivers.set_header(vec!["Driver", "Percentile", "Weight", "Contribution"]);
        for driver in &outcome.stress.drivers {
            drivers.add_row(vec![
                driver.component.to_string(),
                format!("{:.1}", driver.percentile),
                format!("{:.3}", driver.weight),
                format!("{:+.1}", driver.contribution),
            ]);
        }
        println!("{drivers}");
    }

    print_alerts(&outcome.alerts);
    Ok(())
}

async fn handle_backfill(
    args: BackfillArgs,
    store: Arc<PgStore>,
    config: &configuration::Config,
) -> anyhow::Result<()> {
    println!(
        "Computing {} through {}{}",
        args.from,
        args.to,
        if args.resume { " (resuming)" } else { "" }
    );

    let pipeline = Pipeline::new(store, config);

    // Month-sized chunks keep the progress readable on long ranges. Each
    // date is still computed fully before the next; parallelizing across
    // dates is safe in principle, but a single writer per date keeps the
    // upsert semantics trivial.
    let chunks = monthly_chunks(args.from, args.to);
    let progress = ProgressBar::new(chunks.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let mut computed = 0usize;
    let mut skipped = 0usize;
    let mut alerts = 0usize;
    for (start, end) in chunks {
        progress.set_message(format!("{}", start.format("%Y-%m")));
        let summary = pipeline.run_range(start, end, args.resume).await?;
        computed += summary.computed;
        skipped += summary.skipped;
        alerts += summary.alerts;
        progress.inc(1);
    }
    progress.finish_with_message("done");

    println!("Computed {computed} dates ({skipped} skipped, {alerts} alerts emitted).");
    Ok(())
}

async fn handle_alerts(
    args: AlertsArgs,
    store: Arc<PgStore>,
    config: &configuration::Config,
) -> anyhow::Result<()> {
    let engine = AlertEngine::new(store, config);
    let events = engine.detect(args.date).await?;
    print_alerts(&events);
    Ok(())
}

async fn handle_baseline(args: BaselineArgs, store: Arc<PgStore>) -> anyhow::Result<()> {
    let resolver = BaselineResolver::new(store);
    match resolver.resolve(args.date).await? {
        Some(baseline) => println!("Previous available date before {}: {}", args.date, baseline),
        None => println!("No computed data before {}.", args.date),
    }
    Ok(())
}

async fn handle_ingest(args: IngestArgs, store: Arc<PgStore>) -> anyhow::Result<()> {
    let mut reader = csv::Reader::from_path(&args.file)?;
    let mut count = 0usize;

    for record in reader.records() {
        let record = record?;
        let series_id = record
            .get(0)
            .ok_or_else(|| anyhow::anyhow!("missing series_id column"))?;
        let date: NaiveDate = record
            .get(1)
            .ok_or_else(|| anyhow::anyhow!("missing date column"))?
            .parse()?;
        let value = Decimal::from_str(
            record
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("missing value column"))?,
        )?;
        let source = record.get(3).unwrap_or("csv").to_string();

        store
            .upsert_observation(&core_types::RawObservation {
                series_id: series_id.to_string(),
                date,
                value,
                source,
            })
            .await?;
        count += 1;
    }

    println!("Ingested {count} observations from {}.", args.file.display());
    Ok(())
}

fn print_alerts(events: &[core_types::AlertEvent]) {
    if events.is_empty() {
        println!("No alerts.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Code", "Severity", "Value", "Threshold", "Message"]);
    for event in events {
        table.add_row(vec![
            event.alert_code.clone(),
            event.severity.to_string(),
            format!("{:.2}", event.metric_value),
            format!("{:.2}", event.threshold),
            event.message.clone(),
        ]);
    }
    println!("{table}");
}

/// Splits `[from, to]` into per-month `(start, end)` chunks.
fn monthly_chunks(mut from: NaiveDate, to: NaiveDate) -> Vec<(NaiveDate, NaiveDate)> {
    let mut chunks = Vec::new();

    while from <= to {
        let (next_year, next_month) = if from.month() == 12 {
            (from.year() + 1, 1)
        } else {
            (from.year(), from.month() + 1)
        };
        let end_of_month = NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .and_then(|d| d.pred_opt())
            .unwrap_or(to);

        let end = std::cmp::min(end_of_month, to);
        chunks.push((from, end));

        from = match end.checked_add_days(Days::new(1)) {
            Some(next) => next,
            None => break,
        };
    }

    chunks
}
