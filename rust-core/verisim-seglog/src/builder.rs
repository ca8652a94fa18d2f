// SPDX-License-Identifier: PMPL-1.0-or-later
//
// VeriSimDB Segment Log - Segment builder
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Produces segment bytes in memory: header first, then one frame per
// append, then optionally a trailer. The builder does no I/O; callers
// decide when and where the bytes are persisted.

use tracing::debug;

use crate::buffer::GrowableWriteBuffer;
use crate::config::SegmentConfig;
use crate::error::SegLogResult;
use crate::record::RecordFrame;
use crate::segment::{SegmentHeader, SegmentTrailer};

/// In-memory producer of one segment.
#[derive(Debug)]
pub struct SegmentBuilder {
    header: SegmentHeader,
    buffer: GrowableWriteBuffer,
    next_lsn: i64,
    record_count: usize,
}

impl SegmentBuilder {
    /// Start a segment with `header` already written.
    pub fn new(config: &SegmentConfig, header: SegmentHeader) -> SegLogResult<Self> {
        let capacity = config.header_capacity_hint.max(header.encoded_size())
            + config.record_capacity_hint;
        let mut buffer = GrowableWriteBuffer::with_policy(capacity, config.growth);
        header.encode_into(&mut buffer)?;

        debug!(
            start_lsn = header.start_lsn,
            prev = %header.prev,
            "Started segment"
        );

        Ok(Self {
            next_lsn: header.start_lsn,
            header,
            buffer,
            record_count: 0,
        })
    }

    /// Start a segment of the configured type following `prev`.
    pub fn start(
        config: &SegmentConfig,
        start_lsn: i64,
        prev: impl Into<String>,
    ) -> SegLogResult<Self> {
        Self::new(
            config,
            SegmentHeader::new(config.segment_type, start_lsn, prev),
        )
    }

    /// The header written at the start of the segment.
    pub fn header(&self) -> &SegmentHeader {
        &self.header
    }

    /// LSN the next `append` will use.
    pub fn next_lsn(&self) -> i64 {
        self.next_lsn
    }

    /// Number of frames appended.
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buffer.position()
    }

    /// Returns `true` if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buffer.position() == 0
    }

    /// Frame `body` with the next LSN and append it. Returns the LSN used.
    pub fn append(&mut self, record_type: u8, body: Vec<u8>) -> SegLogResult<i64> {
        let frame = RecordFrame::new(record_type, self.next_lsn, body)?;
        self.append_frame(&frame)?;
        Ok(frame.lsn())
    }

    /// Append a frame built elsewhere. Later appends continue after its LSN.
    pub fn append_frame(&mut self, frame: &RecordFrame) -> SegLogResult<()> {
        frame.encode_into(&mut self.buffer)?;
        self.record_count += 1;
        self.next_lsn = self.next_lsn.max(frame.lsn().saturating_add(1));

        debug!(lsn = frame.lsn(), size = frame.encoded_size(), "Appended record");
        Ok(())
    }

    /// Copy of the bytes written so far, without consuming the builder.
    pub fn snapshot(&self) -> Vec<u8> {
        self.buffer.array()
    }

    /// Write a trailer naming `next` and return the sealed segment. Fails
    /// with `MissingTrailerNext` if `next` is empty.
    pub fn seal(mut self, next: impl Into<String>) -> SegLogResult<Vec<u8>> {
        let trailer = SegmentTrailer::new(next);
        trailer.encode_into(&mut self.buffer)?;

        debug!(
            records = self.record_count,
            next = %trailer.next,
            "Sealed segment"
        );
        Ok(self.buffer.finalize())
    }

    /// Return the segment without a trailer.
    pub fn finish_unsealed(self) -> Vec<u8> {
        self.buffer.finalize()
    }
}
