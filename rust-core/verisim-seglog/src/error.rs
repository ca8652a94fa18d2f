// SPDX-License-Identifier: PMPL-1.0-or-later
//
// VeriSimDB Segment Log - Error types
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Defines every error condition raised while encoding or decoding segment
// bytes. Low-level readers raise immediately; record decode wraps failures
// as `CorruptFrame`; segment decode wraps them again as `CorruptSegment`
// together with the records that decoded cleanly. An unsealed segment is
// not an error and has no variant here.

use thiserror::Error;

use crate::record::RecordFrame;

/// Errors that can occur while producing or consuming segment bytes.
#[derive(Debug, Error)]
pub enum SegLogError {
    /// A field runs past the end of the input.
    #[error("unexpected end of input at offset {offset}: needed {needed} bytes, {available} available")]
    UnexpectedEof {
        /// Cursor offset where the read started.
        offset: usize,
        /// Bytes the field requires.
        needed: usize,
        /// Bytes left in the input.
        available: usize,
    },

    /// A length prefix starts with a byte outside the encoding table.
    #[error("invalid length marker {marker:#04x} at offset {offset}")]
    InvalidLengthMarker {
        /// The offending marker byte.
        marker: u8,
        /// Offset of the marker byte.
        offset: usize,
    },

    /// A decoded length cannot be represented or is negative.
    #[error("length {length} at offset {offset} is out of range")]
    LengthOutOfRange {
        /// The raw length value.
        length: i128,
        /// Offset of the length field.
        offset: usize,
    },

    /// A length-prefixed string is not valid UTF-8.
    #[error("invalid UTF-8 in string at offset {offset}: {source}")]
    InvalidUtf8 {
        /// Offset of the string payload.
        offset: usize,
        /// The underlying conversion error.
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// A null marker was found where the format requires a value.
    #[error("unexpected null for field `{field}` at offset {offset}")]
    UnexpectedNull {
        /// Name of the field being decoded.
        field: &'static str,
        /// Offset of the null marker.
        offset: usize,
    },

    /// The stored record checksum does not match the recomputed one.
    #[error("checksum mismatch: stored {stored}, computed {computed}")]
    ChecksumMismatch {
        /// Checksum string carried in the record header.
        stored: String,
        /// Checksum recomputed over the decoded fields and body.
        computed: String,
    },

    /// A record frame failed to decode.
    #[error("corrupt record frame at offset {offset} (lsn {lsn:?}): {source}")]
    CorruptFrame {
        /// LSN of the record, once its header has been read.
        lsn: Option<i64>,
        /// Offset where the frame starts.
        offset: usize,
        /// The failure that made the frame unreadable.
        #[source]
        source: Box<SegLogError>,
    },

    /// A trailer started but its flag byte is not the trailer flag.
    #[error("invalid trailer flag {flag:#04x}")]
    InvalidTrailerFlag {
        /// The flag byte found.
        flag: u8,
    },

    /// A trailer was found but does not name the next segment.
    #[error("trailer does not name a next segment")]
    MissingTrailerNext,

    /// A segment failed to decode. The records decoded before the failure
    /// are kept so a caller can salvage the prefix.
    #[error("corrupt segment at offset {offset} after {} records: {source}", .records.len())]
    CorruptSegment {
        /// Offset where the failing structure starts.
        offset: usize,
        /// Records decoded before the failure, in order.
        records: Vec<RecordFrame>,
        /// The failure that stopped decoding.
        #[source]
        source: Box<SegLogError>,
    },

    /// A `write_at` or `create_at` field is not a 14-character timestamp.
    #[error("field `{field}` must be a {expected}-character timestamp, got {length} characters")]
    InvalidTimestamp {
        /// Name of the field.
        field: &'static str,
        /// Required length.
        expected: usize,
        /// Length found.
        length: usize,
    },

    /// An LSN generator has already issued `i64::MAX`.
    #[error("LSN space exhausted after {last}")]
    LsnExhausted {
        /// The last LSN issued.
        last: i64,
    },

    /// A write would land outside the buffer's physical storage.
    #[error("buffer overflow: position {position} + {requested} bytes exceeds capacity {capacity}")]
    BufferOverflow {
        /// Write position.
        position: usize,
        /// Bytes being written.
        requested: usize,
        /// Physical capacity of the buffer.
        capacity: usize,
    },

    /// A record body's fields could not be interpreted.
    #[error("invalid record body: {0}")]
    InvalidBody(String),

    /// Two segments name each other inconsistently.
    #[error("broken chain from `{from}` to `{to}`: {reason}")]
    BrokenChain {
        /// Segment whose pointer was followed.
        from: String,
        /// Segment the pointer names.
        to: String,
        /// What is inconsistent.
        reason: String,
    },

    /// Following `next` pointers revisited a segment.
    #[error("segment chain revisits `{0}`")]
    ChainCycle(String),

    /// A chain pointer names a segment that is not available.
    #[error("unknown segment `{0}`")]
    UnknownSegment(String),

    /// Invalid configuration document.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// An I/O error occurred while reading or writing a segment file.
    #[error("segment I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The segment directory does not exist or is not accessible.
    #[error("segment directory not found or inaccessible: {0}")]
    DirectoryNotFound(String),
}

impl SegLogError {
    /// Records salvaged before a `CorruptSegment` failure. Empty for every
    /// other variant.
    pub fn partial_records(&self) -> &[RecordFrame] {
        match self {
            SegLogError::CorruptSegment { records, .. } => records.as_slice(),
            _ => &[],
        }
    }

    /// Consume the error and take ownership of the salvaged records.
    pub fn into_partial_records(self) -> Vec<RecordFrame> {
        match self {
            SegLogError::CorruptSegment { records, .. } => records,
            _ => Vec::new(),
        }
    }

    /// The innermost error in a `CorruptSegment`/`CorruptFrame` wrapping.
    pub fn root_cause(&self) -> &SegLogError {
        match self {
            SegLogError::CorruptFrame { source, .. }
            | SegLogError::CorruptSegment { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Convenience type alias for segment log results.
pub type SegLogResult<T> = Result<T, SegLogError>;
