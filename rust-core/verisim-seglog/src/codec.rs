// SPDX-License-Identifier: PMPL-1.0-or-later
//
// VeriSimDB Segment Log - Segment decoder
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Decodes a complete segment with a small state machine:
//
//   Start --header--> Records --frame--> Records
//                        |--peek 0xFB--> TrailerFound   (sealed)
//                        |--no bytes---> Exhausted      (unsealed)
//
// A missing trailer is not an error: an active segment and a segment cut
// short by a crash look identical, and telling them apart is left to
// whoever knows which segment is newest. Any structural failure becomes
// `CorruptSegment` carrying the records decoded before it.

use tracing::{debug, warn};

use crate::cursor::CursorReader;
use crate::error::{SegLogError, SegLogResult};
use crate::record::RecordFrame;
use crate::segment::{Segment, SegmentHeader, SegmentTrailer, TRAILER_FLAG};

/// Position of the decoder in the segment grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    /// Nothing decoded yet.
    Start,
    /// Header decoded; reading record frames.
    Records,
    /// A trailer was decoded. Terminal.
    TrailerFound,
    /// Input ran out before a trailer. Terminal.
    Exhausted,
}

impl DecodeState {
    /// Returns `true` for `TrailerFound` and `Exhausted`.
    pub fn is_terminal(self) -> bool {
        matches!(self, DecodeState::TrailerFound | DecodeState::Exhausted)
    }
}

/// Decoder for one segment's bytes.
#[derive(Debug)]
pub struct SegmentCodec<'a> {
    cursor: CursorReader<'a>,
    state: DecodeState,
    header: Option<SegmentHeader>,
    records: Vec<RecordFrame>,
    trailer: Option<SegmentTrailer>,
}

impl<'a> SegmentCodec<'a> {
    /// Create a decoder over a full segment.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            cursor: CursorReader::new(bytes),
            state: DecodeState::Start,
            header: None,
            records: Vec::new(),
            trailer: None,
        }
    }

    /// Current decoder state.
    pub fn state(&self) -> DecodeState {
        self.state
    }

    /// Run the decoder to a terminal state.
    pub fn decode(mut self) -> SegLogResult<Segment> {
        while !self.state.is_terminal() {
            self.step()?;
        }

        let Some(header) = self.header else {
            // Terminal states are only reachable after the header.
            return Err(SegLogError::CorruptSegment {
                offset: 0,
                records: self.records,
                source: Box::new(SegLogError::UnexpectedEof {
                    offset: 0,
                    needed: 1,
                    available: 0,
                }),
            });
        };

        if self.state == DecodeState::TrailerFound && self.cursor.has_remaining() {
            warn!(
                offset = self.cursor.position(),
                trailing = self.cursor.remaining(),
                "Ignoring bytes after segment trailer"
            );
        }

        debug!(
            records = self.records.len(),
            sealed = self.trailer.is_some(),
            start_lsn = header.start_lsn,
            "Decoded segment"
        );

        Ok(Segment {
            header,
            records: self.records,
            trailer: self.trailer,
        })
    }

    /// Perform one transition.
    fn step(&mut self) -> SegLogResult<DecodeState> {
        match self.state {
            DecodeState::Start => {
                let offset = self.cursor.position();
                let header = SegmentHeader::decode(&mut self.cursor)
                    .map_err(|e| self.corrupt(offset, e))?;
                self.header = Some(header);
                self.state = DecodeState::Records;
            }
            DecodeState::Records => {
                if !self.cursor.has_remaining() {
                    self.state = DecodeState::Exhausted;
                    return Ok(self.state);
                }

                let offset = self.cursor.position();
                if self.cursor.peek()? == TRAILER_FLAG {
                    let trailer = SegmentTrailer::decode(&mut self.cursor)
                        .map_err(|e| self.corrupt(offset, e))?;
                    self.trailer = Some(trailer);
                    self.state = DecodeState::TrailerFound;
                } else {
                    let record = RecordFrame::decode(&mut self.cursor)
                        .map_err(|e| self.corrupt(offset, e))?;
                    self.records.push(record);
                }
            }
            DecodeState::TrailerFound | DecodeState::Exhausted => {}
        }
        Ok(self.state)
    }

    /// Wrap `source` as `CorruptSegment`, handing over the records decoded
    /// so far.
    fn corrupt(&mut self, offset: usize, source: SegLogError) -> SegLogError {
        let records = std::mem::take(&mut self.records);
        warn!(
            offset,
            salvaged = records.len(),
            error = %source,
            "Corrupt segment"
        );
        SegLogError::CorruptSegment {
            offset,
            records,
            source: Box::new(source),
        }
    }
}

/// Decode a full segment.
pub fn decode_segment(bytes: &[u8]) -> SegLogResult<Segment> {
    SegmentCodec::new(bytes).decode()
}
