// SPDX-License-Identifier: PMPL-1.0-or-later
//
// VeriSimDB Segment Log - Segment bookends
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// A segment file is laid out as:
//
//   SegmentHeader
//   RecordFrame*
//   [SegmentTrailer]      -- absent while active, or after a crash
//
// Header (integers little-endian, [lenenc] = length-prefixed):
//   [1 byte: type] [1 byte: version = 1] [8 bytes: start_lsn (i64)]
//   [lenenc: prev] [4 bytes: length (i32)] [9 bytes: filler]
//   [lenenc: create_at]
//
// Trailer:
//   [1 byte: flag = 0xFB] [lenenc: next] [23 bytes: filler]
//
// `prev` names the previous segment ("" for the first in a chain); `next`
// names the following one. Filler bytes are reserved and carried verbatim.

use serde::{Deserialize, Serialize};

use crate::buffer::GrowableWriteBuffer;
use crate::cursor::CursorReader;
use crate::error::{SegLogError, SegLogResult};
use crate::lenenc;
use crate::record::RecordFrame;
use crate::timestamp::{check_timestamp_len, now_timestamp};

/// Current segment format version.
pub const SEGMENT_VERSION: u8 = 1;

/// First byte of every trailer. It is also the null length marker, which
/// can never start a record frame (frames start with a non-null checksum).
pub const TRAILER_FLAG: u8 = lenenc::NULL_MARKER;

/// Reserved bytes at the end of the fixed part of the header.
pub const HEADER_FILLER_LEN: usize = 9;

/// Reserved bytes at the end of the trailer.
pub const TRAILER_FILLER_LEN: usize = 23;

// ---------------------------------------------------------------------------
// SegmentHeader
// ---------------------------------------------------------------------------

/// File-level header naming the previous segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentHeader {
    /// Segment type.
    pub segment_type: u8,
    /// Format version.
    pub version: u8,
    /// LSN of the first record written to this segment.
    pub start_lsn: i64,
    /// Name of the previous segment; empty for the first segment.
    pub prev: String,
    /// Informational length field.
    pub length: i32,
    /// Creation timestamp, `yyyyMMddHHmmss`.
    pub create_at: String,
    /// Reserved bytes.
    pub filler: [u8; HEADER_FILLER_LEN],
}

impl SegmentHeader {
    /// A version-1 header stamped with the current time.
    pub fn new(segment_type: u8, start_lsn: i64, prev: impl Into<String>) -> Self {
        Self::with_create_at(segment_type, start_lsn, prev, now_timestamp())
    }

    /// A version-1 header with an explicit creation timestamp.
    pub fn with_create_at(
        segment_type: u8,
        start_lsn: i64,
        prev: impl Into<String>,
        create_at: impl Into<String>,
    ) -> Self {
        Self {
            segment_type,
            version: SEGMENT_VERSION,
            start_lsn,
            prev: prev.into(),
            length: 0,
            create_at: create_at.into(),
            filler: [0u8; HEADER_FILLER_LEN],
        }
    }

    /// Returns `true` if this segment starts a chain.
    pub fn is_first(&self) -> bool {
        self.prev.is_empty()
    }

    /// Encoded size in bytes.
    pub fn encoded_size(&self) -> usize {
        1 + 1
            + 8
            + lenenc::encoded_size(Some(self.prev.len() as u64))
            + self.prev.len()
            + 4
            + HEADER_FILLER_LEN
            + lenenc::encoded_size(Some(self.create_at.len() as u64))
            + self.create_at.len()
    }

    /// Append this header to `buffer`.
    pub fn encode_into(&self, buffer: &mut GrowableWriteBuffer) -> SegLogResult<()> {
        check_timestamp_len("create_at", &self.create_at)?;
        buffer.put(self.segment_type)?;
        buffer.put(self.version)?;
        buffer.write_long(self.start_lsn)?;
        buffer.write_str_with_length(Some(&self.prev))?;
        buffer.write_int(self.length)?;
        buffer.put_slice(&self.filler)?;
        buffer.write_str_with_length(Some(&self.create_at))
    }

    /// Encode this header on its own.
    pub fn encode(&self) -> SegLogResult<Vec<u8>> {
        let mut buffer = GrowableWriteBuffer::new(self.encoded_size());
        self.encode_into(&mut buffer)?;
        Ok(buffer.finalize())
    }

    /// Decode a header.
    pub fn decode(cursor: &mut CursorReader<'_>) -> SegLogResult<Self> {
        let segment_type = cursor.read()?;
        let version = cursor.read()?;
        let start_lsn = cursor.read_long()?;
        let prev = cursor.read_required_string("prev")?;
        let length = cursor.read_int()?;
        let mut filler = [0u8; HEADER_FILLER_LEN];
        filler.copy_from_slice(cursor.read_bytes(HEADER_FILLER_LEN)?);
        let create_at = cursor.read_required_string("create_at")?;
        check_timestamp_len("create_at", &create_at)?;
        Ok(Self {
            segment_type,
            version,
            start_lsn,
            prev,
            length,
            create_at,
            filler,
        })
    }
}

// ---------------------------------------------------------------------------
// SegmentTrailer
// ---------------------------------------------------------------------------

/// End-of-segment marker naming the next segment. Its presence is the only
/// evidence that a segment was sealed cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentTrailer {
    /// Always `TRAILER_FLAG` for a decoded trailer.
    pub flag: u8,
    /// Name of the next segment.
    pub next: String,
    /// Reserved bytes.
    pub filler: [u8; TRAILER_FILLER_LEN],
}

impl SegmentTrailer {
    /// A trailer pointing at `next`.
    pub fn new(next: impl Into<String>) -> Self {
        Self {
            flag: TRAILER_FLAG,
            next: next.into(),
            filler: [0u8; TRAILER_FILLER_LEN],
        }
    }

    /// Encoded size in bytes.
    pub fn encoded_size(&self) -> usize {
        1 + lenenc::encoded_size(Some(self.next.len() as u64)) + self.next.len() + TRAILER_FILLER_LEN
    }

    /// Append this trailer to `buffer`. A trailer must name its successor.
    pub fn encode_into(&self, buffer: &mut GrowableWriteBuffer) -> SegLogResult<()> {
        if self.next.is_empty() {
            return Err(SegLogError::MissingTrailerNext);
        }
        buffer.put(self.flag)?;
        buffer.write_str_with_length(Some(&self.next))?;
        buffer.put_slice(&self.filler)
    }

    /// Encode this trailer on its own.
    pub fn encode(&self) -> SegLogResult<Vec<u8>> {
        let mut buffer = GrowableWriteBuffer::new(self.encoded_size());
        self.encode_into(&mut buffer)?;
        Ok(buffer.finalize())
    }

    /// Decode a trailer, asserting the flag and a non-empty `next`.
    pub fn decode(cursor: &mut CursorReader<'_>) -> SegLogResult<Self> {
        let flag = cursor.read()?;
        if flag != TRAILER_FLAG {
            return Err(SegLogError::InvalidTrailerFlag { flag });
        }
        let next = match cursor.read_string_with_length()? {
            Some(next) if !next.is_empty() => next,
            _ => return Err(SegLogError::MissingTrailerNext),
        };
        let mut filler = [0u8; TRAILER_FILLER_LEN];
        filler.copy_from_slice(cursor.read_bytes(TRAILER_FILLER_LEN)?);
        Ok(Self { flag, next, filler })
    }
}

// ---------------------------------------------------------------------------
// Segment
// ---------------------------------------------------------------------------

/// Whether a decoded segment ended with a trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentStatus {
    /// A trailer was found; the segment is complete.
    Sealed,
    /// Input ended without a trailer. The segment is either still being
    /// appended to or was cut short by a crash; the bytes alone cannot
    /// tell which.
    Unsealed,
}

/// A fully decoded segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// The segment header.
    pub header: SegmentHeader,
    /// Records in file order.
    pub records: Vec<RecordFrame>,
    /// The trailer, if the segment was sealed.
    pub trailer: Option<SegmentTrailer>,
}

impl Segment {
    /// Returns `true` if the segment carries a trailer.
    pub fn is_sealed(&self) -> bool {
        self.trailer.is_some()
    }

    /// Sealed or unsealed.
    pub fn status(&self) -> SegmentStatus {
        if self.is_sealed() {
            SegmentStatus::Sealed
        } else {
            SegmentStatus::Unsealed
        }
    }

    /// Name of the previous segment, if any.
    pub fn prev(&self) -> Option<&str> {
        Some(self.header.prev.as_str()).filter(|prev| !prev.is_empty())
    }

    /// Name of the next segment, if sealed.
    pub fn next(&self) -> Option<&str> {
        self.trailer.as_ref().map(|trailer| trailer.next.as_str())
    }

    /// LSN of the last record, if any.
    pub fn last_lsn(&self) -> Option<i64> {
        self.records.last().map(RecordFrame::lsn)
    }

    /// Encoded size of the whole segment.
    pub fn encoded_size(&self) -> usize {
        self.header.encoded_size()
            + self.records.iter().map(RecordFrame::encoded_size).sum::<usize>()
            + self.trailer.as_ref().map_or(0, SegmentTrailer::encoded_size)
    }

    /// Encode the segment back to its file bytes.
    pub fn encode(&self) -> SegLogResult<Vec<u8>> {
        let mut buffer = GrowableWriteBuffer::new(self.encoded_size());
        self.header.encode_into(&mut buffer)?;
        for record in &self.records {
            record.encode_into(&mut buffer)?;
        }
        if let Some(trailer) = &self.trailer {
            trailer.encode_into(&mut buffer)?;
        }
        Ok(buffer.finalize())
    }
}
