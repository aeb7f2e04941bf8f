//! Time index error types
//!
//! Defines all errors that can occur while opening, appending to, or
//! querying a time index.

use crate::storage::codec::CodecError;
use crate::storage::types::LookupPolicy;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the time index
#[derive(Error, Debug)]
pub enum TimeIndexError {
    /// Point lookup against an index with no entries
    #[error("Cannot query an empty index")]
    Empty,

    /// A directional lookup policy could not be satisfied
    #[error("No entries {} timestamp {timestamp}", .policy.bound_description())]
    OutOfBounds {
        /// The queried timestamp
        timestamp: f64,
        /// The policy that was applied
        policy: LookupPolicy,
    },

    /// Append with a timestamp earlier than the latest entry
    #[error("Cannot append timestamp {timestamp} before latest entry {latest}")]
    OrderViolation { timestamp: f64, latest: f64 },

    /// A line of the backing log could not be loaded
    #[error("Invalid entry at {}:{line}: {cause}", .path.display())]
    Load {
        path: PathBuf,
        /// 1-based line number
        line: usize,
        #[source]
        cause: LoadCause,
    },

    /// The durable write for an append failed
    #[error("Failed to persist entry to {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O operation failed while reading the log
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// NaN or infinite timestamp
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(f64),

    /// Value could not be encoded for the log
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

impl TimeIndexError {
    /// Whether this error is a lookup miss (`Empty` or `OutOfBounds`)
    ///
    /// Only misses are converted into fallback values by
    /// [`TimeIndex::get_or`](crate::index::TimeIndex::get_or).
    pub fn is_miss(&self) -> bool {
        matches!(
            self,
            TimeIndexError::Empty | TimeIndexError::OutOfBounds { .. }
        )
    }
}

/// Why a log line was rejected during load
#[derive(Error, Debug)]
pub enum LoadCause {
    /// Line is not a `{"t": .., "v": ..}` object
    #[error("malformed record: {0}")]
    Envelope(#[from] serde_json::Error),

    #[error("non-finite timestamp {0}")]
    InvalidTimestamp(f64),

    /// Timestamp is earlier than the line before it
    #[error("timestamp {timestamp} precedes previous entry {previous}")]
    OutOfOrder { timestamp: f64, previous: f64 },

    /// The codec rejected the stored value
    #[error("{0}")]
    Codec(#[from] CodecError),
}

/// Result type alias for time index operations
pub type TimeIndexResult<T> = Result<T, TimeIndexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TimeIndexError::OrderViolation {
            timestamp: 500.0,
            latest: 3000.0,
        };
        assert_eq!(
            err.to_string(),
            "Cannot append timestamp 500 before latest entry 3000"
        );

        let err = TimeIndexError::OutOfBounds {
            timestamp: 500.0,
            policy: LookupPolicy::NearestPrev,
        };
        assert_eq!(err.to_string(), "No entries at or before timestamp 500");

        let err = TimeIndexError::OutOfBounds {
            timestamp: 4000.5,
            policy: LookupPolicy::NearestNext,
        };
        assert_eq!(err.to_string(), "No entries at or after timestamp 4000.5");
    }

    #[test]
    fn test_load_error_names_path_and_line() {
        let err = TimeIndexError::Load {
            path: PathBuf::from("data/state.jsonl"),
            line: 7,
            cause: LoadCause::InvalidTimestamp(f64::NAN),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Invalid entry at data/state.jsonl:7: "));
        assert!(msg.contains("non-finite"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TimeIndexError = io_err.into();
        assert!(matches!(err, TimeIndexError::Io(_)));
    }

    #[test]
    fn test_is_miss() {
        assert!(TimeIndexError::Empty.is_miss());
        assert!(TimeIndexError::OutOfBounds {
            timestamp: 1.0,
            policy: LookupPolicy::NearestNext,
        }
        .is_miss());
        assert!(!TimeIndexError::InvalidTimestamp(f64::NAN).is_miss());
        assert!(!TimeIndexError::OrderViolation {
            timestamp: 1.0,
            latest: 2.0,
        }
        .is_miss());
    }
}
