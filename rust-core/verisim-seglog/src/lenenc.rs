// SPDX-License-Identifier: PMPL-1.0-or-later
//
// VeriSimDB Segment Log - Length-encoded integers
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Every variable-sized field in a segment carries a length prefix chosen by
// magnitude (all multi-byte forms little-endian):
//
//   null                  -> 0xFB
//   0 ..= 250             -> the value as one byte
//   251 ..= 65_535        -> 0xFC + 2 bytes
//   65_536 ..= 16_777_215 -> 0xFD + 3 bytes
//   >= 16_777_216         -> 0xFE + 8 bytes
//
// 0xFF is the only byte with no meaning and is rejected on decode.

use crate::buffer::GrowableWriteBuffer;
use crate::cursor::CursorReader;
use crate::error::{SegLogError, SegLogResult};

/// Marker for an absent value.
pub const NULL_MARKER: u8 = 0xFB;

/// Marker for a 2-byte length.
pub const UB2_MARKER: u8 = 0xFC;

/// Marker for a 3-byte length.
pub const UB3_MARKER: u8 = 0xFD;

/// Marker for an 8-byte length.
pub const UB8_MARKER: u8 = 0xFE;

/// Largest length stored inline in the marker byte.
pub const MAX_SINGLE_BYTE: u64 = 250;

const UB2_LIMIT: u64 = 0x1_0000;
const UB3_LIMIT: u64 = 0x100_0000;

/// Number of bytes the prefix for `length` occupies (`None` is null).
pub fn encoded_size(length: Option<u64>) -> usize {
    match length {
        None => 1,
        Some(n) if n <= MAX_SINGLE_BYTE => 1,
        Some(n) if n < UB2_LIMIT => 1 + 2,
        Some(n) if n < UB3_LIMIT => 1 + 3,
        Some(_) => 1 + 8,
    }
}

/// Write the smallest prefix that represents `length`.
pub fn encode_length(buffer: &mut GrowableWriteBuffer, length: u64) -> SegLogResult<()> {
    if length <= MAX_SINGLE_BYTE {
        buffer.put(length as u8)
    } else if length < UB2_LIMIT {
        buffer.ensure_capacity(1 + 2)?;
        buffer.put(UB2_MARKER)?;
        buffer.write_ub2(length as u16)
    } else if length < UB3_LIMIT {
        buffer.ensure_capacity(1 + 3)?;
        buffer.put(UB3_MARKER)?;
        buffer.write_ub3(length as u32)
    } else {
        buffer.ensure_capacity(1 + 8)?;
        buffer.put(UB8_MARKER)?;
        buffer.write_long(length as i64)
    }
}

/// Write the null marker.
pub fn encode_null(buffer: &mut GrowableWriteBuffer) -> SegLogResult<()> {
    buffer.put(NULL_MARKER)
}

/// Read a length prefix. Returns `None` for the null marker.
pub fn decode_length(cursor: &mut CursorReader<'_>) -> SegLogResult<Option<u64>> {
    let offset = cursor.position();
    let marker = cursor.read()?;
    match marker {
        0..=250 => Ok(Some(u64::from(marker))),
        NULL_MARKER => Ok(None),
        UB2_MARKER => Ok(Some(u64::from(cursor.read_ub2()?))),
        UB3_MARKER => Ok(Some(u64::from(cursor.read_ub3()?))),
        UB8_MARKER => {
            let raw = cursor.read_long()?;
            u64::try_from(raw)
                .map(Some)
                .map_err(|_| SegLogError::LengthOutOfRange {
                    length: i128::from(raw),
                    offset,
                })
        }
        other => Err(SegLogError::InvalidLengthMarker {
            marker: other,
            offset,
        }),
    }
}
