// SPDX-License-Identifier: PMPL-1.0-or-later
//
// VeriSimDB Segment Log - Cursor reader
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The read-side mirror of `GrowableWriteBuffer`: a plain byte slice plus an
// integer offset. Every read is bounds-checked and fails with
// `UnexpectedEof` instead of panicking. Look-ahead is done by saving the
// position, reading, and restoring it; there is no hidden buffering.

use crate::error::{SegLogError, SegLogResult};
use crate::lenenc;

/// Forward-only reader over a complete byte slice.
#[derive(Debug, Clone)]
pub struct CursorReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> CursorReader<'a> {
    /// Create a cursor positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Current read offset.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Move the cursor. Positions past the end of the input are rejected.
    pub fn set_position(&mut self, position: usize) -> SegLogResult<()> {
        if position > self.data.len() {
            return Err(SegLogError::UnexpectedEof {
                offset: position,
                needed: 0,
                available: 0,
            });
        }
        self.position = position;
        Ok(())
    }

    /// Total input length.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the input is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Unread byte count.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Returns `true` if at least one byte is unread.
    pub fn has_remaining(&self) -> bool {
        self.remaining() > 0
    }

    /// Skip `count` bytes.
    pub fn skip(&mut self, count: usize) -> SegLogResult<()> {
        self.read_bytes(count).map(|_| ())
    }

    // -----------------------------------------------------------------------
    // Fixed-width readers
    // -----------------------------------------------------------------------

    /// Read one byte.
    pub fn read(&mut self) -> SegLogResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    /// Look at the next byte without consuming it.
    pub fn peek(&mut self) -> SegLogResult<u8> {
        let saved = self.position;
        let byte = self.read();
        self.position = saved;
        byte
    }

    /// Borrow the next `count` bytes and advance past them.
    pub fn read_bytes(&mut self, count: usize) -> SegLogResult<&'a [u8]> {
        let available = self.remaining();
        if count > available {
            return Err(SegLogError::UnexpectedEof {
                offset: self.position,
                needed: count,
                available,
            });
        }
        let start = self.position;
        self.position += count;
        Ok(&self.data[start..self.position])
    }

    /// Read a 2-byte unsigned integer.
    pub fn read_ub2(&mut self) -> SegLogResult<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    /// Read a 3-byte unsigned integer.
    pub fn read_ub3(&mut self) -> SegLogResult<u32> {
        let [b0, b1, b2] = self.read_array()?;
        Ok(u32::from_le_bytes([b0, b1, b2, 0]))
    }

    /// Read a 4-byte unsigned integer.
    pub fn read_ub4(&mut self) -> SegLogResult<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// Read a 4-byte signed integer.
    pub fn read_int(&mut self) -> SegLogResult<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    /// Read an 8-byte signed integer.
    pub fn read_long(&mut self) -> SegLogResult<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    /// Read a float stored as its bit pattern.
    pub fn read_float(&mut self) -> SegLogResult<f32> {
        Ok(f32::from_bits(self.read_ub4()?))
    }

    /// Read a double stored as its bit pattern.
    pub fn read_double(&mut self) -> SegLogResult<f64> {
        Ok(f64::from_bits(self.read_long()? as u64))
    }

    // -----------------------------------------------------------------------
    // Variable-length readers
    // -----------------------------------------------------------------------

    /// Read a length prefix; `None` is the null marker.
    pub fn read_length(&mut self) -> SegLogResult<Option<u64>> {
        lenenc::decode_length(self)
    }

    /// Inverse of `GrowableWriteBuffer::write_with_length`.
    pub fn read_bytes_with_length(&mut self) -> SegLogResult<Option<&'a [u8]>> {
        let offset = self.position;
        let Some(length) = self.read_length()? else {
            return Ok(None);
        };
        let length = usize::try_from(length).map_err(|_| SegLogError::LengthOutOfRange {
            length: i128::from(length),
            offset,
        })?;
        self.read_bytes(length).map(Some)
    }

    /// Read a length-prefixed UTF-8 string; `None` is the null marker.
    pub fn read_string_with_length(&mut self) -> SegLogResult<Option<String>> {
        let Some(bytes) = self.read_bytes_with_length()? else {
            return Ok(None);
        };
        let offset = self.position - bytes.len();
        String::from_utf8(bytes.to_vec())
            .map(Some)
            .map_err(|source| SegLogError::InvalidUtf8 { offset, source })
    }

    /// Read a length-prefixed string that must not be null.
    pub fn read_required_string(&mut self, field: &'static str) -> SegLogResult<String> {
        let offset = self.position;
        self.read_string_with_length()?
            .ok_or(SegLogError::UnexpectedNull { field, offset })
    }

    fn read_array<const N: usize>(&mut self) -> SegLogResult<[u8; N]> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.read_bytes(N)?);
        Ok(array)
    }
}
