//! `availability` CLI: compute bookable slots from a JSON practice snapshot.
//!
//! ## Usage
//!
//! ```sh
//! # Open slots for one provider on one date (snapshot on stdin)
//! cat practice.json | availability daily --provider dr-a --date 2026-03-16 --minutes 30
//!
//! # Merged slots for every provider over a date range, duration from the catalog
//! availability range -i practice.json --start 2026-03-16 --end 2026-03-31 \
//!     --appointment-type checkup
//!
//! # Pin "now" and load practice settings
//! availability -c settings.json --now 2026-03-15T12:00:00Z range -i practice.json \
//!     --start 2026-03-16 --end 2026-03-22 --minutes 45 -o slots.json
//!
//! # Bookable date bounds, optionally checking one date
//! availability window --date 2026-06-20
//!
//! # Report same-day schedules that double-cover time
//! availability check-schedules -i practice.json
//! ```
//!
//! Results are printed as JSON on stdout. Logs go to stderr (`RUST_LOG`, or
//! `--verbose` for debug output).

use std::io::{self, Read};

use anyhow::{bail, Context, Result};
use availability_engine::time_grid::{self, parse_date};
use availability_engine::{
    find_overlapping_schedules, AvailabilityEngine, AvailabilityInputs, BookingWindow, Clock,
    DailyQuery, DurationSpec, EngineConfig, FixedClock, RangeQuery, SystemClock, WindowRejection,
};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "availability",
    version,
    about = "Appointment availability from a JSON practice snapshot"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Practice settings JSON (timezone, booking window, DST policy)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Treat this RFC 3339 instant as "now" instead of the system clock
    #[arg(long, global = true)]
    now: Option<String>,

    /// Output file (writes to stdout if omitted)
    #[arg(short, long, global = true)]
    output: Option<String>,

    /// Log debug events to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Open slots for one provider on one date
    Daily {
        /// Input snapshot JSON (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        #[arg(long)]
        provider: String,
        /// Date as YYYY-MM-DD
        #[arg(long)]
        date: String,
        #[command(flatten)]
        duration: DurationArgs,
    },
    /// Merged open slots across providers over a date range
    Range {
        /// Input snapshot JSON (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Restrict to these provider ids (repeatable; all providers if omitted)
        #[arg(long = "provider")]
        providers: Vec<String>,
        /// First date as YYYY-MM-DD
        #[arg(long)]
        start: String,
        /// Last date (inclusive) as YYYY-MM-DD
        #[arg(long)]
        end: String,
        #[command(flatten)]
        duration: DurationArgs,
    },
    /// Show the bookable date bounds, optionally checking one date
    Window {
        #[arg(long)]
        date: Option<String>,
    },
    /// Report pairs of same-weekday schedules whose hours overlap
    CheckSchedules {
        /// Input snapshot JSON (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct DurationArgs {
    /// Appointment length in minutes
    #[arg(long)]
    minutes: Option<u32>,
    /// Appointment type id looked up in the snapshot's catalog
    #[arg(long)]
    appointment_type: Option<String>,
}

impl DurationArgs {
    fn spec(&self) -> Result<DurationSpec> {
        match (&self.minutes, &self.appointment_type) {
            (Some(m), None) => Ok(DurationSpec::Minutes(*m)),
            (None, Some(t)) => Ok(DurationSpec::AppointmentType(t.clone())),
            _ => bail!("Pass exactly one of --minutes or --appointment-type"),
        }
    }
}

#[derive(Serialize)]
struct WindowReport {
    #[serde(flatten)]
    window: BookingWindow,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bookable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rejection: Option<WindowRejection>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    let clock = clock(cli.now.as_deref())?;

    let json = match cli.command {
        Commands::Daily {
            input,
            provider,
            date,
            duration,
        } => {
            let inputs = read_snapshot(input.as_deref())?;
            let query = DailyQuery {
                provider_id: provider,
                date: parse_date("date", &date)?,
                duration: duration.spec()?,
                policy: None,
            };
            let engine = AvailabilityEngine::new(config)?;
            let result = engine
                .daily_availability(&inputs, &query, clock.as_ref())
                .context("Failed to compute daily availability")?;
            serde_json::to_string_pretty(&result)?
        }
        Commands::Range {
            input,
            providers,
            start,
            end,
            duration,
        } => {
            let inputs = read_snapshot(input.as_deref())?;
            let query = RangeQuery {
                provider_ids: (!providers.is_empty()).then_some(providers),
                start_date: parse_date("start", &start)?,
                end_date: parse_date("end", &end)?,
                duration: duration.spec()?,
                policy: None,
            };
            let engine = AvailabilityEngine::new(config)?;
            let result = engine
                .range_availability(&inputs, &query, clock.as_ref())
                .context("Failed to compute range availability")?;
            serde_json::to_string_pretty(&result)?
        }
        Commands::Window { date } => {
            let today = time_grid::today(clock.now(), config.timezone);
            let window = BookingWindow::new(&config.booking_window, today);
            let date = date.map(|d| parse_date("date", &d)).transpose()?;
            let rejection = date.and_then(|d| window.check(d).err());
            let report = WindowReport {
                window,
                date,
                bookable: date.map(|_| rejection.is_none()),
                rejection,
            };
            serde_json::to_string_pretty(&report)?
        }
        Commands::CheckSchedules { input } => {
            let inputs = read_snapshot(input.as_deref())?;
            let overlaps = find_overlapping_schedules(&inputs.schedules);
            debug!(overlaps = overlaps.len(), "checked schedules");
            serde_json::to_string_pretty(&overlaps)?
        }
    };

    write_output(cli.output.as_deref(), &json)
}

fn init_tracing(verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config(path: Option<&str>) -> Result<EngineConfig> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings file: {}", path))?;
            EngineConfig::from_json_str(&raw)
                .with_context(|| format!("Invalid settings in {}", path))
        }
        None => Ok(EngineConfig::default()),
    }
}

fn clock(now: Option<&str>) -> Result<Box<dyn Clock>> {
    match now {
        Some(raw) => {
            let instant = DateTime::parse_from_rfc3339(raw)
                .with_context(|| format!("Invalid --now '{}': expected RFC 3339", raw))?;
            Ok(Box::new(FixedClock(instant.with_timezone(&Utc))))
        }
        None => Ok(Box::new(SystemClock)),
    }
}

fn read_snapshot(path: Option<&str>) -> Result<AvailabilityInputs> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            buf
        }
    };
    serde_json::from_str(&raw).context("Failed to parse input snapshot JSON")
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, format!("{}\n", content))
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
