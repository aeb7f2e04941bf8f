//! timeindex CLI
//!
//! Command-line interface for time-indexed JSON Lines logs:
//! - Append values
//! - Look up the entry at a time
//! - Dump a time range
//! - Show log status

use anyhow::{bail, Context};
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::path::{Path, PathBuf};
use timeindex::{
    Config, IndexOptions, IntoTimestamp, JsonCodec, LoggingConfig, LookupPolicy, TimeIndex,
    Timestamped,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type ValueIndex = TimeIndex<Value>;

#[derive(Parser)]
#[command(name = "timeindex")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Append to and query time-indexed JSON Lines logs")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned, human-readable rows
    Table,
    /// One JSON record per line
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Append a JSON value
    Append {
        /// Path to the log file
        log: PathBuf,
        /// Value as JSON (e.g. '{"temperature": 22.5}')
        value: String,
        /// Timestamp (default: now). Supports: "now", "yesterday", RFC 3339, Unix seconds
        #[arg(short, long)]
        time: Option<String>,
    },

    /// Show the entry at a point in time
    Get {
        /// Path to the log file
        log: PathBuf,
        /// Query time. Supports: "now", "yesterday", RFC 3339, Unix seconds
        time: String,
        /// Lookup policy (nearest, nearest_prev, nearest_next)
        #[arg(short, long)]
        policy: Option<LookupPolicy>,
    },

    /// List entries in a time range (inclusive)
    Range {
        /// Path to the log file
        log: PathBuf,
        /// Range start (default: unbounded)
        #[arg(long, conflicts_with = "last")]
        start: Option<String>,
        /// Range end (default: unbounded)
        #[arg(long)]
        end: Option<String>,
        /// Only the trailing window ending now (e.g., 12h, 7d, 4w)
        #[arg(short, long)]
        last: Option<String>,
        /// Stop after this many entries
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Show log status
    Info {
        /// Path to the log file
        log: PathBuf,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    init_logging(&config.logging);

    let options = IndexOptions::from(&config.index);
    let json = cli.format == OutputFormat::Json;

    match cli.command {
        Commands::Append { log, value, time } => {
            let value: Value = serde_json::from_str(&value)
                .with_context(|| format!("Invalid JSON value: {}", value))?;

            let mut index = open_index(&log, options)?;
            let (t, line) = {
                let entry = match time {
                    None => index.append(value)?,
                    Some(s) => index.append_at(value, parse_time(&s)?)?,
                };
                (entry.t, serde_json::to_string(entry)?)
            };

            if json {
                println!("{}", line);
            } else {
                println!("Appended entry at {} ({} total)", format_time(t), index.len());
            }
        }

        Commands::Get { log, time, policy } => {
            let index = open_index(&log, options)?;
            let policy = policy.unwrap_or(index.default_policy());
            let entry = index.entry_at_with(parse_time(&time)?, policy)?;
            print_entry(entry, json)?;
        }

        Commands::Range {
            log,
            start,
            end,
            last,
            limit,
        } => {
            let index = open_index(&log, options)?;

            let (start, end) = match last {
                Some(window) => {
                    let now = Utc::now();
                    let from = now
                        .checked_sub_signed(parse_duration(&window)?)
                        .with_context(|| format!("Window too large: {}", window))?;
                    (from.into_timestamp(), now.into_timestamp())
                }
                None => (
                    start
                        .as_deref()
                        .map(parse_time)
                        .transpose()?
                        .unwrap_or(f64::NEG_INFINITY),
                    end.as_deref()
                        .map(parse_time)
                        .transpose()?
                        .unwrap_or(f64::INFINITY),
                ),
            };

            let entries = index.range(start..=end).take(limit.unwrap_or(usize::MAX));
            let mut shown = 0;
            for entry in entries {
                print_entry(entry, json)?;
                shown += 1;
            }

            if !json && shown == 0 {
                println!("No entries in the selected time range");
            }
        }

        Commands::Info { log } => {
            let index = open_index(&log, options)?;

            println!("timeindex v{}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Log: {}", index.path().display());
            println!("Entries: {}", index.len());
            println!("Default policy: {}", index.default_policy());

            if let (Some(earliest), Some(latest)) = (index.earliest(), index.latest()) {
                println!("Earliest: {}", format_time(earliest.t));
                println!("Latest: {}", format_time(latest.t));
                println!("Span: {}", format_duration((latest.t - earliest.t) as u64));
            }
        }

        Commands::Config { output } => {
            let config = timeindex::config::generate_default_config();

            match output {
                Some(path) => {
                    // Create parent directory if needed
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

fn init_logging(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("timeindex={}", logging.level))
    });

    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so stdout stays machine-readable
    if logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn open_index(path: &Path, options: IndexOptions) -> anyhow::Result<ValueIndex> {
    TimeIndex::open_with(path, JsonCodec::new(), options)
        .with_context(|| format!("Failed to open {}", path.display()))
}

fn print_entry(entry: &Timestamped<Value>, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(entry)?);
    } else {
        println!("{:<28} {}", format_time(entry.t), entry.v);
    }
    Ok(())
}

fn parse_time(s: &str) -> anyhow::Result<f64> {
    let t = match s.trim() {
        "now" => Utc::now().into_timestamp(),
        "yesterday" => (Utc::now() - Duration::days(1)).into_timestamp(),
        s => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                dt.into_timestamp()
            } else if let Ok(ts) = s.parse::<f64>() {
                ts
            } else {
                bail!(
                    "Invalid timestamp format: {}. Use: now, yesterday, RFC 3339, or Unix seconds",
                    s
                );
            }
        }
    };
    Ok(t)
}

fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim().to_lowercase();

    let duration = if let Some(hours) = s.strip_suffix('h') {
        Duration::try_hours(hours.parse()?)
    } else if let Some(days) = s.strip_suffix('d') {
        Duration::try_days(days.parse()?)
    } else if let Some(weeks) = s.strip_suffix('w') {
        Duration::try_weeks(weeks.parse()?)
    } else if let Some(months) = s.strip_suffix('m') {
        months.parse::<i64>()?.checked_mul(30).and_then(Duration::try_days)
    } else if let Some(years) = s.strip_suffix('y') {
        years.parse::<i64>()?.checked_mul(365).and_then(Duration::try_days)
    } else {
        bail!("Invalid duration format: {}. Use: 12h, 7d, 4w, 3m, 1y", s)
    };

    duration.with_context(|| format!("Duration out of range: {}", s))
}

fn format_time(t: f64) -> String {
    Timestamped::new(t, ())
        .datetime()
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Micros, true))
        .unwrap_or_else(|| t.to_string())
}

fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else if seconds < 86400 {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    } else {
        format!("{}d {}h", seconds / 86400, (seconds % 86400) / 3600)
    }
}
