//! Time-ordered index over the record log
//!
//! - **TimeIndex**: Sorted in-memory entries with binary-search lookups
//! - **Entries**: Lazy chronological iterator returned by range queries
//!
//! # Lookup policies
//!
//! ```text
//! entries:        A(1000)        B(2000)        C(3000)
//! query 2500:                          ^
//!   nearest_prev  -> B   (latest at or before)
//!   nearest_next  -> C   (earliest at or after)
//!   nearest       -> B   (500 vs 500, earlier wins)
//! ```

mod time_index;

pub use time_index::{Entries, IndexOptions, TimeIndex};
