//! # timeindex
//!
//! Append-only, time-ordered storage for typed records. Each index keeps its
//! records in memory, sorted by timestamp, and mirrors every append to a
//! JSON Lines log that is replayed when the index is reopened.
//!
//! ## Features
//!
//! - **Typed values**: Any serde type, or any type with a custom [`Codec`]
//! - **Fast lookups**: Binary search for point and range queries
//! - **Lookup policies**: `nearest`, `nearest_prev`, `nearest_next`
//! - **Durability**: Every append is written before it becomes visible
//!
//! ## Modules
//!
//! - [`storage`]: Record log, codecs, clocks and core types
//! - [`index`]: The [`TimeIndex`] itself
//! - [`config`]: TOML and environment configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use serde::{Deserialize, Serialize};
//! use timeindex::{LookupPolicy, TimeIndex};
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct SensorReading {
//!     temperature: f64,
//!     humidity: f64,
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut readings = TimeIndex::open("./data/sensor.jsonl")?;
//!
//!     // Stamped with the current time
//!     readings.append(SensorReading { temperature: 22.5, humidity: 0.45 })?;
//!
//!     // Or at an explicit time
//!     readings.append_at(SensorReading { temperature: 23.0, humidity: 0.40 }, 1_900_000_000.0)?;
//!
//!     let latest = readings.latest().expect("just appended");
//!     println!("{} at {:?}", latest.v.temperature, latest.datetime());
//!
//!     // Closest reading to a point in time
//!     let reading = readings.at_with(chrono::Utc::now(), LookupPolicy::Nearest)?;
//!     println!("{:?}", reading);
//!
//!     // Everything in the last hour
//!     let now = chrono::Utc::now();
//!     for entry in readings.range_between(now - chrono::Duration::hours(1), now) {
//!         println!("{} {:?}", entry.t, entry.v);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod index;
pub mod storage;

// Re-export top-level types for convenience
pub use storage::{
    Clock, Codec, CodecError, IntoTimestamp, JsonCodec, LoadCause, LogSyncMode, LookupPolicy,
    ManualClock, SystemClock, TimeIndexError, TimeIndexResult, Timestamped, ValidatingCodec,
};

pub use index::{Entries, IndexOptions, TimeIndex};

pub use config::{Config, ConfigError, IndexConfig, LoggingConfig};
