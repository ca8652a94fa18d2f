// SPDX-License-Identifier: PMPL-1.0-or-later
//! Fixed-width timestamps stored in record and segment headers.
//!
//! `writeAt` and `createAt` are 14-character `yyyyMMddHHmmss` strings in
//! UTC. Only the width is enforced, on both encode and decode; the digits
//! are informational and are not parsed back into a date.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{SegLogError, SegLogResult};

/// Length of a header timestamp string.
pub const TIMESTAMP_LEN: usize = 14;

/// `yyyyMMddHHmmss`.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// `yyMMddHHmmss`, the prefix of generated LSNs.
pub const SHORT_TIMESTAMP_FORMAT: &str = "%y%m%d%H%M%S";

/// Render `at` as a header timestamp.
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Header timestamp for the current instant.
pub fn now_timestamp() -> String {
    format_timestamp(&Utc::now())
}

/// Reject a header timestamp whose width is not `TIMESTAMP_LEN`.
pub fn check_timestamp_len(field: &'static str, value: &str) -> SegLogResult<()> {
    if value.len() != TIMESTAMP_LEN {
        return Err(SegLogError::InvalidTimestamp {
            field,
            expected: TIMESTAMP_LEN,
            length: value.len(),
        });
    }
    Ok(())
}

/// Parse a header timestamp. Returns `None` for anything that is not a
/// valid 14-character `yyyyMMddHHmmss` string.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if value.len() != TIMESTAMP_LEN {
        return None;
    }
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}
