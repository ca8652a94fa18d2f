// SPDX-License-Identifier: PMPL-1.0-or-later
//
// VeriSimDB Segment Log - Growable write buffer
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// An append-only byte sink used to build every structure in a segment. The
// buffer tracks three sizes:
//
//   position  -- offset of the next write
//   length    -- logical limit writes may reach without calling the
//                growth algorithm
//   capacity  -- physical size of the backing array
//
// with `position <= length <= capacity` at all times. Growth is monotonic;
// the buffer never shrinks. Finalizing copies exactly `[0, position)`, so
// over-allocated slack never reaches a segment file.
//
// All multi-byte integers are written little-endian.

use tracing::trace;

use crate::config::GrowthPolicy;
use crate::error::{SegLogError, SegLogResult};
use crate::lenenc;

// ---------------------------------------------------------------------------
// GrowableWriteBuffer
// ---------------------------------------------------------------------------

/// Append-only byte buffer with an over-allocating growth policy.
///
/// Not safe for concurrent use; one producer owns an instance until it is
/// finalized or dropped.
#[derive(Debug, Clone)]
pub struct GrowableWriteBuffer {
    /// Backing storage. `data.len()` is the physical capacity.
    data: Vec<u8>,

    /// Logical length.
    length: usize,

    /// Next write offset.
    position: usize,

    /// Over-allocation factors used when the array must be replaced.
    growth: GrowthPolicy,
}

impl GrowableWriteBuffer {
    /// Create a buffer whose physical and logical size both equal
    /// `capacity_hint`. Pre-size close to the expected output to avoid
    /// copies mid-write.
    pub fn new(capacity_hint: usize) -> Self {
        Self::with_policy(capacity_hint, GrowthPolicy::default())
    }

    /// Create a buffer with a custom growth policy.
    pub fn with_policy(capacity_hint: usize, growth: GrowthPolicy) -> Self {
        Self {
            data: vec![0u8; capacity_hint],
            length: capacity_hint,
            position: 0,
            growth,
        }
    }

    /// Create a buffer with `capacity` bytes of physical storage but a
    /// logical length of only `limit` bytes. Writes past `limit` first
    /// claim the already-allocated slack before any reallocation happens.
    ///
    /// `limit` is clamped to `capacity`.
    pub fn with_limit(capacity: usize, limit: usize) -> Self {
        Self {
            data: vec![0u8; capacity],
            length: limit.min(capacity),
            position: 0,
            growth: GrowthPolicy::default(),
        }
    }

    /// Offset of the next write, equal to the number of bytes written.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Current logical length.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Physical size of the backing array.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Bytes that can be written before the growth algorithm runs.
    pub fn remaining(&self) -> usize {
        self.length - self.position
    }

    /// Returns `true` if at least one byte fits without growth.
    pub fn has_remaining(&self) -> bool {
        self.remaining() > 0
    }

    /// Returns `true` if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.position == 0
    }

    /// The growth policy in effect.
    pub fn growth_policy(&self) -> GrowthPolicy {
        self.growth
    }

    /// Make room for `extra` more bytes at the current position.
    ///
    /// Returns the number of bytes the reallocation was sized for: `0` when
    /// the write fits in the current logical length or in the physical
    /// slack beyond it, `extra` when the array had to be replaced.
    pub fn ensure_capacity(&mut self, extra: usize) -> SegLogResult<usize> {
        let position = self.position;
        let physical = self.data.len();
        let needed = position
            .checked_add(extra)
            .ok_or(SegLogError::BufferOverflow {
                position,
                requested: extra,
                capacity: physical,
            })?;

        trace!(
            position,
            length = self.length,
            capacity = physical,
            extra,
            "ensure_capacity"
        );

        if needed <= self.length {
            return Ok(0);
        }

        // Physical slack already covers the request: widen the logical
        // length instead of copying.
        if needed < physical {
            self.length = physical;
            return Ok(0);
        }

        let mut new_length = position.saturating_add(scale(extra, self.growth.primary_factor));
        if new_length <= physical.saturating_add(extra) {
            new_length = physical
                .saturating_add(extra)
                .saturating_add(1)
                .saturating_add(scale(extra, self.growth.fallback_factor));
        }

        trace!(old_capacity = physical, new_length, "growing write buffer");

        self.data.resize(new_length, 0);
        self.length = new_length;

        Ok(extra)
    }

    // -----------------------------------------------------------------------
    // Raw writers
    // -----------------------------------------------------------------------

    /// Append a single byte.
    pub fn put(&mut self, byte: u8) -> SegLogResult<()> {
        self.ensure_capacity(1)?;
        self.check_fits(1)?;
        self.data[self.position] = byte;
        self.position += 1;
        Ok(())
    }

    /// Append a byte slice.
    pub fn put_slice(&mut self, src: &[u8]) -> SegLogResult<()> {
        self.ensure_capacity(src.len())?;
        self.check_fits(src.len())?;
        let end = self.position + src.len();
        self.data[self.position..end].copy_from_slice(src);
        self.position = end;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Fixed-width writers
    // -----------------------------------------------------------------------

    /// Write the low 2 bytes of `value`.
    pub fn write_ub2(&mut self, value: u16) -> SegLogResult<()> {
        self.put_each(&value.to_le_bytes())
    }

    /// Write the low 3 bytes of `value`. The high byte is discarded.
    pub fn write_ub3(&mut self, value: u32) -> SegLogResult<()> {
        self.put_each(&value.to_le_bytes()[..3])
    }

    /// Write a 4-byte unsigned integer.
    pub fn write_ub4(&mut self, value: u32) -> SegLogResult<()> {
        self.put_each(&value.to_le_bytes())
    }

    /// Write a 4-byte signed integer.
    pub fn write_int(&mut self, value: i32) -> SegLogResult<()> {
        self.put_each(&value.to_le_bytes())
    }

    /// Write an 8-byte signed integer.
    pub fn write_long(&mut self, value: i64) -> SegLogResult<()> {
        self.put_each(&value.to_le_bytes())
    }

    /// Write a float as its IEEE-754 bit pattern through `write_int`.
    pub fn write_float(&mut self, value: f32) -> SegLogResult<()> {
        self.write_int(value.to_bits() as i32)
    }

    /// Write a double as its IEEE-754 bit pattern through `write_long`.
    pub fn write_double(&mut self, value: f64) -> SegLogResult<()> {
        self.write_long(value.to_bits() as i64)
    }

    // -----------------------------------------------------------------------
    // Variable-length writers
    // -----------------------------------------------------------------------

    /// Write a length prefix for `length`.
    pub fn write_length(&mut self, length: u64) -> SegLogResult<()> {
        lenenc::encode_length(self, length)
    }

    /// Write `src` with a length prefix, or the null marker alone when
    /// `src` is `None`.
    pub fn write_with_length(&mut self, src: Option<&[u8]>) -> SegLogResult<()> {
        match src {
            Some(bytes) => {
                self.write_length(bytes.len() as u64)?;
                self.put_slice(bytes)
            }
            None => lenenc::encode_null(self),
        }
    }

    /// Write a UTF-8 string with a length prefix, or the null marker.
    pub fn write_str_with_length(&mut self, src: Option<&str>) -> SegLogResult<()> {
        self.write_with_length(src.map(str::as_bytes))
    }

    /// Write `src` followed by a single zero byte.
    pub fn write_with_null(&mut self, src: &[u8]) -> SegLogResult<()> {
        self.put_slice(src)?;
        self.put(0)
    }

    // -----------------------------------------------------------------------
    // Finalization
    // -----------------------------------------------------------------------

    /// Copy of exactly the bytes written so far.
    pub fn array(&self) -> Vec<u8> {
        self.data[..self.position].to_vec()
    }

    /// Consume the buffer, returning exactly the bytes written.
    pub fn finalize(mut self) -> Vec<u8> {
        self.data.truncate(self.position);
        self.data
    }

    /// Rewind to the start. Capacity is kept and the logical length is
    /// widened to the full physical array.
    pub fn reset(&mut self) {
        self.position = 0;
        self.length = self.data.len();
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    fn put_each(&mut self, bytes: &[u8]) -> SegLogResult<()> {
        for &byte in bytes {
            self.put(byte)?;
        }
        Ok(())
    }

    /// Explicit bounds guard so a faulty growth computation surfaces as an
    /// error instead of a slice panic.
    fn check_fits(&self, requested: usize) -> SegLogResult<()> {
        match self.position.checked_add(requested) {
            Some(end) if end <= self.length && self.length <= self.data.len() => Ok(()),
            _ => Err(SegLogError::BufferOverflow {
                position: self.position,
                requested,
                capacity: self.data.len(),
            }),
        }
    }
}

impl Default for GrowableWriteBuffer {
    fn default() -> Self {
        Self::new(0)
    }
}

/// `floor(extra * factor)`, saturating at the bounds of `usize`.
fn scale(extra: usize, factor: f64) -> usize {
    (extra as f64 * factor) as usize
}
