//! Storage layer
//!
//! This module provides everything the index needs below the query logic:
//!
//! - **types**: Core data structures (Timestamped, LookupPolicy)
//! - **codec**: Value encoding and validation
//! - **clock**: Time sources for appends
//! - **log**: JSON Lines record log for durability
//! - **error**: Error types
//!
//! # Architecture
//!
//! ```text
//! Write Path:
//!   value → Codec::encode → RecordLog (write + flush) → in-memory entries
//!
//! Open Path:
//!   RecordLog lines → envelope parse → Codec::decode → in-memory entries
//! ```

pub mod clock;
pub mod codec;
pub mod error;
pub mod log;
pub mod types;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{Codec, CodecError, JsonCodec, ValidatingCodec};
pub use error::{LoadCause, TimeIndexError, TimeIndexResult};
pub use log::{LogLines, LogRecord, LogSyncMode, RecordLog};
pub use types::{IntoTimestamp, LookupPolicy, ParsePolicyError, Timestamped};
