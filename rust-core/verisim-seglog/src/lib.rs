// SPDX-License-Identifier: PMPL-1.0-or-later
//
// VeriSimDB Segment Log crate
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// A self-describing, append-only binary log format. A log is a chain of
// **segments**; each segment is a header, a run of checksummed record
// frames, and (once the segment is closed) a trailer. Headers name the
// previous segment and trailers name the next one, so a reader can walk
// the log without any external index.
//
// # Architecture
//
// - `buffer` / `cursor`: growable little-endian write buffer and a
//   bounds-checked read cursor.
// - `lenenc`: variable-length length prefixes with a distinct null.
// - `record`: record frames (`crc`, type, LSN, body length, timestamp,
//   body) and checksum verification.
// - `segment` / `codec`: segment bookends and the decode state machine.
// - `chain`, `naming`, `builder`, `files`: walking chains, naming segments
//   and LSNs, producing segments, and file-system adapters.
//
// ## Length prefix (lenenc)
//
// ```text
// 0xFB              -> null
// 0x00..=0xFA       -> the value itself (0..=250)
// 0xFC + 2 bytes    -> value < 2^16
// 0xFD + 3 bytes    -> value < 2^24
// 0xFE + 8 bytes    -> anything larger
// ```
//
// ## Usage
//
// ```no_run
// use verisim_seglog::{decode_segment, RecordBody, SegmentBuilder, SegmentConfig, RECORD_TYPE_SQL};
//
// let config = SegmentConfig::default();
// let mut builder = SegmentBuilder::start(&config, 1, "").unwrap();
// let body = RecordBody::new("p1", 42, "insert into t values (1)");
// builder.append(RECORD_TYPE_SQL, body.to_bytes().unwrap()).unwrap();
// let bytes = builder.seal("wal-20221101145020-01").unwrap();
//
// let segment = decode_segment(&bytes).unwrap();
// for record in &segment.records {
//     println!("lsn={} type={}", record.lsn(), record.record_type());
// }
// ```

pub mod buffer;
pub mod builder;
pub mod chain;
pub mod codec;
pub mod config;
pub mod cursor;
pub mod error;
pub mod files;
pub mod lenenc;
pub mod naming;
pub mod record;
pub mod segment;
pub mod timestamp;

// Re-export the primary public API for ergonomic imports.
pub use buffer::GrowableWriteBuffer;
pub use builder::SegmentBuilder;
pub use chain::{ChainWalk, SegmentChain};
pub use codec::{decode_segment, DecodeState, SegmentCodec};
pub use config::{GrowthPolicy, SegmentConfig};
pub use cursor::CursorReader;
pub use error::{SegLogError, SegLogResult};
pub use files::{list_segment_files, load_chain, read_segment_file, write_segment_file, SegmentFile};
pub use naming::{parse_segment_name, LsnGenerator, SegmentName, SegmentNamer};
pub use record::{encode_record, RecordBody, RecordFrame, RecordHeader, RECORD_TYPE_SQL};
pub use segment::{Segment, SegmentHeader, SegmentStatus, SegmentTrailer};
