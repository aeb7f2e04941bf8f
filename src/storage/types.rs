//! Core data types for the time index
//!
//! This module defines the fundamental types shared by the storage and
//! index layers:
//! - `Timestamped<T>`: A value paired with the time it was recorded
//! - `LookupPolicy`: How a point query resolves times between entries
//! - `IntoTimestamp`: Conversion of time representations into epoch seconds

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// A value paired with its timestamp
///
/// Ordering between records is defined by `t` alone; records with equal
/// timestamps keep the order in which they were appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timestamped<T> {
    /// Unix timestamp in seconds (fractional for sub-second precision)
    pub t: f64,
    /// The stored value
    pub v: T,
}

impl<T> Timestamped<T> {
    pub fn new(t: f64, v: T) -> Self {
        Self { t, v }
    }

    /// Timestamp as a UTC datetime, `None` if it is outside chrono's range
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        let secs = self.t.floor();
        let nanos = ((self.t - secs) * 1e9).round() as u32;
        DateTime::from_timestamp(secs as i64, nanos.min(999_999_999))
    }

    /// Map the value while preserving the timestamp
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Timestamped<U> {
        Timestamped {
            t: self.t,
            v: f(self.v),
        }
    }

    /// Borrow the value
    pub fn as_ref(&self) -> Timestamped<&T> {
        Timestamped {
            t: self.t,
            v: &self.v,
        }
    }
}

/// How a point query picks an entry when no timestamp matches exactly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupPolicy {
    /// Closest entry in either direction (ties go to the earlier entry)
    Nearest,
    /// Latest entry at or before the query time
    NearestPrev,
    /// Earliest entry at or after the query time
    NearestNext,
}

impl Default for LookupPolicy {
    fn default() -> Self {
        LookupPolicy::NearestPrev
    }
}

impl LookupPolicy {
    /// Get all policies for iteration
    pub fn all() -> &'static [LookupPolicy] {
        &[
            LookupPolicy::Nearest,
            LookupPolicy::NearestPrev,
            LookupPolicy::NearestNext,
        ]
    }

    /// Which side of the query time this policy searches
    pub fn bound_description(&self) -> &'static str {
        match self {
            LookupPolicy::Nearest => "near",
            LookupPolicy::NearestPrev => "at or before",
            LookupPolicy::NearestNext => "at or after",
        }
    }
}

impl std::fmt::Display for LookupPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupPolicy::Nearest => write!(f, "nearest"),
            LookupPolicy::NearestPrev => write!(f, "nearest_prev"),
            LookupPolicy::NearestNext => write!(f, "nearest_next"),
        }
    }
}

/// Error returned when parsing an unknown policy name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown lookup policy: {0} (expected nearest, nearest_prev or nearest_next)")]
pub struct ParsePolicyError(pub String);

impl FromStr for LookupPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "nearest" => Ok(LookupPolicy::Nearest),
            "nearest_prev" | "prev" => Ok(LookupPolicy::NearestPrev),
            "nearest_next" | "next" => Ok(LookupPolicy::NearestNext),
            _ => Err(ParsePolicyError(s.to_string())),
        }
    }
}

/// Conversion into canonical seconds since the Unix epoch
pub trait IntoTimestamp {
    fn into_timestamp(self) -> f64;
}

impl IntoTimestamp for f64 {
    fn into_timestamp(self) -> f64 {
        self
    }
}

impl<Tz: TimeZone> IntoTimestamp for DateTime<Tz> {
    fn into_timestamp(self) -> f64 {
        // Microsecond precision
        self.timestamp_micros() as f64 / 1_000_000.0
    }
}

impl IntoTimestamp for SystemTime {
    fn into_timestamp(self) -> f64 {
        match self.duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_secs_f64(),
            Err(e) => -e.duration().as_secs_f64(),
        }
    }
}
