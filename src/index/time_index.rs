//! Time Index - append-only, time-ordered record store
//!
//! Keeps every record in a sorted `Vec` and mirrors each append to a JSON
//! Lines log. Point and range queries binary-search the in-memory entries;
//! the log is only read when the index is opened.
//!
//! # Performance
//! - Open: O(n) to load and validate the log
//! - Append: O(1) amortized plus one log write
//! - Point lookup: O(log n)
//! - Range query: O(log n + k) where k = results

use crate::config::IndexConfig;
use crate::storage::clock::{Clock, SystemClock};
use crate::storage::codec::{Codec, JsonCodec};
use crate::storage::error::{LoadCause, TimeIndexError, TimeIndexResult};
use crate::storage::log::{LogRecord, LogSyncMode, RecordLog};
use crate::storage::types::{IntoTimestamp, LookupPolicy, Timestamped};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::iter::FusedIterator;
use std::ops::{Bound, RangeBounds};
use std::path::Path;
use std::sync::Arc;

/// Options for opening a time index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexOptions {
    /// Policy used by lookups that don't name one
    pub policy: LookupPolicy,
    /// Log sync strategy
    pub sync_mode: LogSyncMode,
}

impl IndexOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn policy(mut self, policy: LookupPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn sync_mode(mut self, sync_mode: LogSyncMode) -> Self {
        self.sync_mode = sync_mode;
        self
    }
}

impl From<&IndexConfig> for IndexOptions {
    fn from(config: &IndexConfig) -> Self {
        Self {
            policy: config.default_policy,
            sync_mode: config.sync_mode,
        }
    }
}

/// Append-only store of timestamped values backed by a JSON Lines log
///
/// One index owns one log file. The index assumes it is the only writer;
/// share it between threads behind an external lock.
pub struct TimeIndex<T, C = JsonCodec<T>> {
    /// Records sorted by timestamp
    entries: Vec<Timestamped<T>>,
    log: RecordLog,
    codec: C,
    policy: LookupPolicy,
    clock: Arc<dyn Clock>,
}

impl<T> TimeIndex<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Create or open an index with the serde codec and default options
    pub fn open(path: impl AsRef<Path>) -> TimeIndexResult<Self> {
        Self::open_with(path, JsonCodec::new(), IndexOptions::default())
    }

    /// Create or open an index with a specific default lookup policy
    pub fn open_with_policy(path: impl AsRef<Path>, policy: LookupPolicy) -> TimeIndexResult<Self> {
        Self::open_with(path, JsonCodec::new(), IndexOptions::new().policy(policy))
    }
}

impl<T, C> TimeIndex<T, C>
where
    C: Codec<T>,
{
    /// Create or open an index with an explicit codec and options
    ///
    /// A missing log means an empty index; nothing is written until the
    /// first append. Every existing line is decoded through `codec`, and
    /// the first bad line fails the whole open.
    pub fn open_with(
        path: impl AsRef<Path>,
        codec: C,
        options: IndexOptions,
    ) -> TimeIndexResult<Self> {
        let mut log = RecordLog::new(path, options.sync_mode);
        let mut entries: Vec<Timestamped<T>> = Vec::new();

        if let Some(lines) = log.read()? {
            for record in lines {
                let LogRecord { line, t, v } = record?;
                let load_error = |cause: LoadCause| TimeIndexError::Load {
                    path: log.path().to_path_buf(),
                    line,
                    cause,
                };

                if !t.is_finite() {
                    return Err(load_error(LoadCause::InvalidTimestamp(t)));
                }
                if let Some(previous) = entries.last() {
                    if t < previous.t {
                        return Err(load_error(LoadCause::OutOfOrder {
                            timestamp: t,
                            previous: previous.t,
                        }));
                    }
                }

                let value = codec
                    .decode(v)
                    .map_err(|e| load_error(LoadCause::Codec(e)))?;
                entries.push(Timestamped::new(t, value));
            }
        }

        tracing::debug!(
            path = %log.path().display(),
            entries = entries.len(),
            policy = %options.policy,
            "Opened time index"
        );

        Ok(Self {
            entries,
            log,
            codec,
            policy: options.policy,
            clock: Arc::new(SystemClock),
        })
    }

    /// Builder: replace the time source used by [`append`](Self::append)
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Append a value stamped with the current time
    pub fn append(&mut self, value: T) -> TimeIndexResult<&Timestamped<T>> {
        let now = self.clock.now();
        self.append_at(value, now)
    }

    /// Append a value at an explicit time
    ///
    /// The timestamp may equal the latest entry's but not precede it. The
    /// record is written to the log first and only becomes visible in
    /// memory once the write succeeded.
    pub fn append_at(
        &mut self,
        value: T,
        at: impl IntoTimestamp,
    ) -> TimeIndexResult<&Timestamped<T>> {
        let t = finite(at.into_timestamp())?;

        if let Some(latest) = self.entries.last() {
            if t < latest.t {
                return Err(TimeIndexError::OrderViolation {
                    timestamp: t,
                    latest: latest.t,
                });
            }
        }

        let encoded = self.codec.encode(&value)?;
        self.log.append(t, &encoded)?;

        let idx = self.entries.len();
        self.entries.push(Timestamped::new(t, value));
        tracing::debug!(path = %self.log.path().display(), t, idx, "Appended entry");

        Ok(&self.entries[idx])
    }

    /// Value at a time, using the default policy
    pub fn at(&self, at: impl IntoTimestamp) -> TimeIndexResult<&T> {
        self.at_with(at, self.policy)
    }

    /// Value at a time, using an explicit policy
    pub fn at_with(&self, at: impl IntoTimestamp, policy: LookupPolicy) -> TimeIndexResult<&T> {
        self.entry_at_with(at, policy).map(|entry| &entry.v)
    }

    /// Value at a time, or `fallback` when the lookup misses
    ///
    /// Only `Empty` and `OutOfBounds` are turned into the fallback; any
    /// other error is returned.
    pub fn get_or<'a>(
        &'a self,
        at: impl IntoTimestamp,
        policy: Option<LookupPolicy>,
        fallback: &'a T,
    ) -> TimeIndexResult<&'a T> {
        match self.at_with(at, policy.unwrap_or(self.policy)) {
            Err(e) if e.is_miss() => Ok(fallback),
            other => other,
        }
    }

    /// Full record at a time, using the default policy
    ///
    /// Unlike [`at`](Self::at), the caller sees the matched timestamp.
    pub fn entry_at(&self, at: impl IntoTimestamp) -> TimeIndexResult<&Timestamped<T>> {
        self.entry_at_with(at, self.policy)
    }

    /// Full record at a time, using an explicit policy
    pub fn entry_at_with(
        &self,
        at: impl IntoTimestamp,
        policy: LookupPolicy,
    ) -> TimeIndexResult<&Timestamped<T>> {
        let idx = self.locate(at.into_timestamp(), policy)?;
        Ok(&self.entries[idx])
    }

    /// Find the position of the entry selected by `policy`
    fn locate(&self, t: f64, policy: LookupPolicy) -> TimeIndexResult<usize> {
        let t = finite(t)?;
        if self.entries.is_empty() {
            return Err(TimeIndexError::Empty);
        }

        let n = self.entries.len();
        let out_of_bounds = TimeIndexError::OutOfBounds {
            timestamp: t,
            policy,
        };

        match policy {
            LookupPolicy::NearestPrev => {
                // Rightmost entry with entry.t <= t
                match self.entries.partition_point(|e| e.t <= t) {
                    0 => Err(out_of_bounds),
                    idx => Ok(idx - 1),
                }
            }
            LookupPolicy::NearestNext => {
                // Leftmost entry with entry.t >= t
                let idx = self.entries.partition_point(|e| e.t < t);
                if idx == n {
                    Err(out_of_bounds)
                } else {
                    Ok(idx)
                }
            }
            LookupPolicy::Nearest => {
                let idx = self.entries.partition_point(|e| e.t < t);
                if idx == 0 {
                    return Ok(0);
                }
                if idx == n {
                    return Ok(n - 1);
                }

                // Equidistant neighbours resolve to the earlier one
                let before = &self.entries[idx - 1];
                let after = &self.entries[idx];
                if t - before.t <= after.t - t {
                    Ok(idx - 1)
                } else {
                    Ok(idx)
                }
            }
        }
    }

    /// Iterate over entries whose timestamp lies within `bounds`
    ///
    /// Accepts any range of `f64` seconds: `a..=b`, `a..b`, `a..`, `..=b`
    /// or `..`. Each call returns an independent iterator.
    pub fn range<R: RangeBounds<f64>>(&self, bounds: R) -> Entries<'_, T> {
        let start = match bounds.start_bound() {
            Bound::Included(&s) => self.entries.partition_point(|e| !(e.t >= s)),
            Bound::Excluded(&s) => self.entries.partition_point(|e| !(e.t > s)),
            Bound::Unbounded => 0,
        };
        let end = match bounds.end_bound() {
            Bound::Included(&e) => self.entries.partition_point(|x| x.t <= e),
            Bound::Excluded(&e) => self.entries.partition_point(|x| x.t < e),
            Bound::Unbounded => self.entries.len(),
        };

        Entries::new(&self.entries[start..end.max(start)])
    }

    /// Iterate over entries in `[start, end]`, both inclusive
    pub fn range_between(
        &self,
        start: impl IntoTimestamp,
        end: impl IntoTimestamp,
    ) -> Entries<'_, T> {
        self.range(start.into_timestamp()..=end.into_timestamp())
    }

    /// Iterate over all entries in chronological order
    pub fn all(&self) -> Entries<'_, T> {
        Entries::new(&self.entries)
    }

    /// Get the oldest entry, or `None` if empty
    pub fn earliest(&self) -> Option<&Timestamped<T>> {
        self.entries.first()
    }

    /// Get the most recent entry, or `None` if empty
    pub fn latest(&self) -> Option<&Timestamped<T>> {
        self.entries.last()
    }

    /// Timestamps of the earliest and latest entries
    pub fn span(&self) -> Option<(f64, f64)> {
        match (self.entries.first(), self.entries.last()) {
            (Some(first), Some(last)) => Some((first.t, last.t)),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries as a sorted slice
    pub fn as_slice(&self) -> &[Timestamped<T>] {
        &self.entries
    }

    /// Get the backing log path
    pub fn path(&self) -> &Path {
        self.log.path()
    }

    pub fn default_policy(&self) -> LookupPolicy {
        self.policy
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }
}

fn finite(t: f64) -> TimeIndexResult<f64> {
    if t.is_finite() {
        Ok(t)
    } else {
        Err(TimeIndexError::InvalidTimestamp(t))
    }
}

impl<T, C> fmt::Debug for TimeIndex<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeIndex")
            .field("path", &self.log.path())
            .field("value_type", &std::any::type_name::<T>())
            .field("policy", &self.policy)
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl<'a, T, C> IntoIterator for &'a TimeIndex<T, C> {
    type Item = &'a Timestamped<T>;
    type IntoIter = Entries<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        Entries::new(&self.entries)
    }
}

/// Lazy, chronological iterator over index entries
///
/// Returned by [`TimeIndex::range`] and [`TimeIndex::all`]. Borrows the
/// index, so no append can happen while it is alive.
pub struct Entries<'a, T> {
    inner: std::slice::Iter<'a, Timestamped<T>>,
}

impl<'a, T> Entries<'a, T> {
    fn new(entries: &'a [Timestamped<T>]) -> Self {
        Self {
            inner: entries.iter(),
        }
    }

    /// Remaining entries as a slice
    pub fn as_slice(&self) -> &'a [Timestamped<T>] {
        self.inner.as_slice()
    }
}

impl<T> Clone for Entries<'_, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Entries<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.inner.as_slice()).finish()
    }
}

impl<'a, T> Iterator for Entries<'a, T> {
    type Item = &'a Timestamped<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> DoubleEndedIterator for Entries<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back()
    }
}

impl<T> ExactSizeIterator for Entries<'_, T> {}

impl<T> FusedIterator for Entries<'_, T> {}
