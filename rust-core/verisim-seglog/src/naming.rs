// SPDX-License-Identifier: PMPL-1.0-or-later
//
// VeriSimDB Segment Log - Segment names and LSNs
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Segment names look like `wal-20221101145020-07`: a prefix, the creation
// time, and a two-digit rolling counter. Names are only labels for the
// `prev`/`next` pointers; chain order never comes from sorting them.
//
// LSNs are `yyMMddHHmmss` followed by a seven-digit rolling counter, read
// as a decimal integer. Each generator owns its counters; there is no
// process-wide registry.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, Utc};

use crate::error::{SegLogError, SegLogResult};
use crate::timestamp::{parse_timestamp, SHORT_TIMESTAMP_FORMAT, TIMESTAMP_FORMAT, TIMESTAMP_LEN};

/// The prefix used for segment names.
pub const SEGMENT_PREFIX: &str = "wal-";

/// Length of a generated segment name: prefix, timestamp, `-NN`.
pub const SEGMENT_NAME_LEN: usize = SEGMENT_PREFIX.len() + TIMESTAMP_LEN + 3;

const NAME_COUNTER_MODULUS: u64 = 100;
const LSN_COUNTER_MODULUS: u64 = 10_000_000;

/// Parsed parts of a segment name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentName {
    /// Creation time encoded in the name.
    pub created_at: DateTime<Utc>,
    /// Two-digit rolling counter.
    pub counter: u8,
}

/// Generates segment names from an owned rolling counter.
#[derive(Debug, Default)]
pub struct SegmentNamer {
    counter: AtomicU64,
}

impl SegmentNamer {
    /// A namer whose counter starts at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Next name, stamped with the current time.
    pub fn next_name(&self) -> String {
        self.name_at(&Utc::now())
    }

    /// Next name, stamped with `at`.
    pub fn name_at(&self, at: &DateTime<Utc>) -> String {
        let counter = self.counter.fetch_add(1, Ordering::Relaxed) % NAME_COUNTER_MODULUS;
        format!(
            "{SEGMENT_PREFIX}{}-{counter:02}",
            at.format(TIMESTAMP_FORMAT)
        )
    }
}

/// Parse a segment name. Returns `None` if it does not match
/// `wal-yyyyMMddHHmmss-NN`.
pub fn parse_segment_name(name: &str) -> Option<SegmentName> {
    if name.len() != SEGMENT_NAME_LEN {
        return None;
    }
    let rest = name.strip_prefix(SEGMENT_PREFIX)?;
    let (stamp, counter) = rest.split_once('-')?;
    if stamp.len() != TIMESTAMP_LEN || counter.len() != 2 {
        return None;
    }
    if !counter.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let created_at = parse_timestamp(stamp)?;
    Some(SegmentName {
        created_at,
        counter: counter.parse().ok()?,
    })
}

/// Generates strictly increasing LSNs.
#[derive(Debug)]
pub struct LsnGenerator {
    counter: AtomicU64,
    last: AtomicI64,
}

impl LsnGenerator {
    /// A generator with no LSN issued yet.
    pub fn new() -> Self {
        Self::resume_after(i64::MIN)
    }

    /// A generator that will only issue LSNs greater than `last`, e.g. the
    /// last LSN found in a recovered segment.
    pub fn resume_after(last: i64) -> Self {
        Self {
            counter: AtomicU64::new(0),
            last: AtomicI64::new(last),
        }
    }

    /// Next LSN for the current time.
    pub fn next_lsn(&self) -> SegLogResult<i64> {
        self.lsn_at(&Utc::now())
    }

    /// Next LSN for time `at`. Never less than or equal to a previously
    /// issued LSN, even if the clock goes backwards or the counter wraps.
    /// Once `i64::MAX` has been issued every call fails with `LsnExhausted`.
    pub fn lsn_at(&self, at: &DateTime<Utc>) -> SegLogResult<i64> {
        let counter = self.counter.fetch_add(1, Ordering::Relaxed) % LSN_COUNTER_MODULUS;
        let prefix: i64 = at
            .format(SHORT_TIMESTAMP_FORMAT)
            .to_string()
            .parse()
            .unwrap_or(0);
        let candidate = prefix
            .saturating_mul(LSN_COUNTER_MODULUS as i64)
            .saturating_add(counter as i64);

        let next = |prev: i64| prev.checked_add(1).map(|floor| candidate.max(floor));
        match self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, next)
        {
            Ok(previous) => next(previous).ok_or(SegLogError::LsnExhausted { last: previous }),
            Err(last) => Err(SegLogError::LsnExhausted { last }),
        }
    }
}

impl Default for LsnGenerator {
    fn default() -> Self {
        Self::new()
    }
}
