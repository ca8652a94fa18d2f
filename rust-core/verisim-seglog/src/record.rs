// SPDX-License-Identifier: PMPL-1.0-or-later
//
// VeriSimDB Segment Log - Record frames
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// A record frame is the atomic unit appended to a segment: a header
// carrying a checksum followed by an opaque body.
//
// Frame layout (integers little-endian, [lenenc] = length-prefixed):
//   [lenenc: crc]           -- 8 lowercase hex digits of CRC32
//   [1 byte: type]
//   [8 bytes: lsn (i64)]
//   [4 bytes: body_length (i32)]
//   [lenenc: write_at]      -- yyyyMMddHHmmss
//   [body_length bytes: body]
//
// The checksum covers `type ++ lsn ++ body_length ++ [lenenc] write_at ++ body`,
// i.e. everything in the frame except the checksum itself.

use crc32fast::Hasher as Crc32Hasher;
use serde::{Deserialize, Serialize};

use crate::buffer::GrowableWriteBuffer;
use crate::cursor::CursorReader;
use crate::error::{SegLogError, SegLogResult};
use crate::lenenc;
use crate::timestamp::{check_timestamp_len, now_timestamp};

/// Record type used by the SQL action body.
pub const RECORD_TYPE_SQL: u8 = 1;

/// Size of the fixed-width header fields: type, lsn, body_length.
pub const FIXED_HEADER_FIELDS_SIZE: usize = 1 + 8 + 4;

// ---------------------------------------------------------------------------
// RecordHeader
// ---------------------------------------------------------------------------

/// Checksum-protected header of a record frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordHeader {
    /// Checksum over the other header fields and the body.
    pub crc: String,
    /// Application record type.
    pub record_type: u8,
    /// Log sequence number.
    pub lsn: i64,
    /// Body length in bytes.
    pub body_length: i32,
    /// Write timestamp, exactly 14 characters.
    pub write_at: String,
}

impl RecordHeader {
    /// Encoded size of this header in bytes.
    pub fn encoded_size(&self) -> usize {
        lenenc::encoded_size(Some(self.crc.len() as u64))
            + self.crc.len()
            + FIXED_HEADER_FIELDS_SIZE
            + lenenc::encoded_size(Some(self.write_at.len() as u64))
            + self.write_at.len()
    }

    /// Append this header to `buffer`.
    pub fn encode_into(&self, buffer: &mut GrowableWriteBuffer) -> SegLogResult<()> {
        check_timestamp_len("write_at", &self.write_at)?;
        buffer.write_str_with_length(Some(&self.crc))?;
        buffer.put(self.record_type)?;
        buffer.write_long(self.lsn)?;
        buffer.write_int(self.body_length)?;
        buffer.write_str_with_length(Some(&self.write_at))
    }

    /// Encode this header on its own.
    pub fn encode(&self) -> SegLogResult<Vec<u8>> {
        let mut buffer = GrowableWriteBuffer::new(self.encoded_size());
        self.encode_into(&mut buffer)?;
        Ok(buffer.finalize())
    }

    /// Decode a header. Errors are returned unwrapped; `RecordFrame::decode`
    /// attaches frame context.
    pub fn decode(cursor: &mut CursorReader<'_>) -> SegLogResult<Self> {
        let crc = cursor.read_required_string("crc")?;
        let record_type = cursor.read()?;
        let lsn = cursor.read_long()?;
        let body_length = cursor.read_int()?;
        let write_at = cursor.read_required_string("write_at")?;
        check_timestamp_len("write_at", &write_at)?;
        Ok(Self {
            crc,
            record_type,
            lsn,
            body_length,
            write_at,
        })
    }
}

// ---------------------------------------------------------------------------
// RecordFrame
// ---------------------------------------------------------------------------

/// A header plus the body it protects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFrame {
    /// The frame header.
    pub header: RecordHeader,
    /// Opaque body bytes.
    pub body: Vec<u8>,
}

impl RecordFrame {
    /// Frame `body`, stamping it with the current time.
    pub fn new(record_type: u8, lsn: i64, body: Vec<u8>) -> SegLogResult<Self> {
        Self::with_write_at(record_type, lsn, body, now_timestamp())
    }

    /// Frame `body` with an explicit write timestamp.
    pub fn with_write_at(
        record_type: u8,
        lsn: i64,
        body: Vec<u8>,
        write_at: String,
    ) -> SegLogResult<Self> {
        check_timestamp_len("write_at", &write_at)?;
        let body_length = i32::try_from(body.len()).map_err(|_| SegLogError::LengthOutOfRange {
            length: body.len() as i128,
            offset: 0,
        })?;
        let crc = compute_checksum(record_type, lsn, body_length, &write_at, &body)?;
        Ok(Self {
            header: RecordHeader {
                crc,
                record_type,
                lsn,
                body_length,
                write_at,
            },
            body,
        })
    }

    /// Log sequence number.
    pub fn lsn(&self) -> i64 {
        self.header.lsn
    }

    /// Application record type.
    pub fn record_type(&self) -> u8 {
        self.header.record_type
    }

    /// Encoded size of the whole frame.
    pub fn encoded_size(&self) -> usize {
        self.header.encoded_size() + self.body.len()
    }

    /// Append the frame to `buffer`.
    pub fn encode_into(&self, buffer: &mut GrowableWriteBuffer) -> SegLogResult<()> {
        self.header.encode_into(buffer)?;
        buffer.put_slice(&self.body)
    }

    /// Encode the frame on its own.
    pub fn encode(&self) -> SegLogResult<Vec<u8>> {
        let mut buffer = GrowableWriteBuffer::new(self.encoded_size());
        self.encode_into(&mut buffer)?;
        Ok(buffer.finalize())
    }

    /// Recompute the checksum and compare it with the stored one.
    pub fn verify(&self) -> SegLogResult<()> {
        let computed = compute_checksum(
            self.header.record_type,
            self.header.lsn,
            self.header.body_length,
            &self.header.write_at,
            &self.body,
        )?;
        if computed != self.header.crc {
            return Err(SegLogError::ChecksumMismatch {
                stored: self.header.crc.clone(),
                computed,
            });
        }
        Ok(())
    }

    /// Decode one frame and verify its checksum.
    ///
    /// Every failure is reported as `CorruptFrame`, with the record's LSN
    /// attached once the header has been read.
    pub fn decode(cursor: &mut CursorReader<'_>) -> SegLogResult<Self> {
        let offset = cursor.position();
        let corrupt = |lsn: Option<i64>, source: SegLogError| SegLogError::CorruptFrame {
            lsn,
            offset,
            source: Box::new(source),
        };

        let header = RecordHeader::decode(cursor).map_err(|e| corrupt(None, e))?;
        let lsn = Some(header.lsn);

        let body_length = usize::try_from(header.body_length).map_err(|_| {
            corrupt(
                lsn,
                SegLogError::LengthOutOfRange {
                    length: i128::from(header.body_length),
                    offset,
                },
            )
        })?;
        let body = cursor
            .read_bytes(body_length)
            .map_err(|e| corrupt(lsn, e))?
            .to_vec();

        let frame = Self { header, body };
        frame.verify().map_err(|e| corrupt(lsn, e))?;
        Ok(frame)
    }
}

/// Checksum over a frame's fields and body, as 8 lowercase hex digits.
pub fn compute_checksum(
    record_type: u8,
    lsn: i64,
    body_length: i32,
    write_at: &str,
    body: &[u8],
) -> SegLogResult<String> {
    let capacity = FIXED_HEADER_FIELDS_SIZE
        + lenenc::encoded_size(Some(write_at.len() as u64))
        + write_at.len()
        + body.len();
    let mut buffer = GrowableWriteBuffer::new(capacity);
    buffer.put(record_type)?;
    buffer.write_long(lsn)?;
    buffer.write_int(body_length)?;
    buffer.write_str_with_length(Some(write_at))?;
    buffer.put_slice(body)?;

    let mut hasher = Crc32Hasher::new();
    hasher.update(&buffer.finalize());
    Ok(format!("{:08x}", hasher.finalize()))
}

/// Frame `body` as a record and return the encoded bytes.
pub fn encode_record(record_type: u8, lsn: i64, body: &[u8]) -> SegLogResult<Vec<u8>> {
    RecordFrame::new(record_type, lsn, body.to_vec())?.encode()
}

// ---------------------------------------------------------------------------
// RecordBody
// ---------------------------------------------------------------------------

/// Body of a SQL action record: which process ran which statement inside
/// which transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordBody {
    /// Originating process identifier.
    pub process_id: String,
    /// Transaction identifier.
    pub tid: i64,
    /// Statement text.
    pub sql: String,
}

impl RecordBody {
    /// Create a body.
    pub fn new(process_id: impl Into<String>, tid: i64, sql: impl Into<String>) -> Self {
        Self {
            process_id: process_id.into(),
            tid,
            sql: sql.into(),
        }
    }

    /// Encode as three length-prefixed strings; `tid` is stored as decimal
    /// text.
    pub fn to_bytes(&self) -> SegLogResult<Vec<u8>> {
        let tid = self.tid.to_string();
        let capacity = 3 + self.process_id.len() + tid.len() + self.sql.len();
        let mut buffer = GrowableWriteBuffer::new(capacity);
        buffer.write_str_with_length(Some(&self.process_id))?;
        buffer.write_str_with_length(Some(&tid))?;
        buffer.write_str_with_length(Some(&self.sql))?;
        Ok(buffer.finalize())
    }

    /// Decode a body from its own bytes.
    pub fn from_bytes(bytes: &[u8]) -> SegLogResult<Self> {
        Self::decode(&mut CursorReader::new(bytes))
    }

    /// Decode a body from a cursor.
    pub fn decode(cursor: &mut CursorReader<'_>) -> SegLogResult<Self> {
        let process_id = cursor.read_required_string("process_id")?;
        let tid_text = cursor.read_required_string("tid")?;
        let tid = tid_text
            .parse::<i64>()
            .map_err(|e| SegLogError::InvalidBody(format!("tid `{tid_text}`: {e}")))?;
        let sql = cursor.read_required_string("sql")?;
        Ok(Self {
            process_id,
            tid,
            sql,
        })
    }

    /// Frame this body as a `RECORD_TYPE_SQL` record.
    pub fn into_frame(self, lsn: i64) -> SegLogResult<RecordFrame> {
        RecordFrame::new(RECORD_TYPE_SQL, lsn, self.to_bytes()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WRITE_AT: &str = "20221231235959";

    fn sample_frame(lsn: i64) -> RecordFrame {
        let body = RecordBody::new("p1", i64::MAX, "create table SaleOrder (id int)")
            .to_bytes()
            .unwrap();
        RecordFrame::with_write_at(RECORD_TYPE_SQL, lsn, body, WRITE_AT.to_string()).unwrap()
    }

    #[test]
    fn test_roundtrip_encode_decode() {
        let frame = sample_frame(2_212_312_359_596_666);
        let bytes = frame.encode().unwrap();
        assert_eq!(bytes.len(), frame.encoded_size());

        let mut cursor = CursorReader::new(&bytes);
        let decoded = RecordFrame::decode(&mut cursor).unwrap();
        assert_eq!(decoded, frame);
        assert!(!cursor.has_remaining());

        let body = RecordBody::from_bytes(&decoded.body).unwrap();
        assert_eq!(body.process_id, "p1");
        assert_eq!(body.tid, i64::MAX);
    }

    #[test]
    fn test_header_layout() {
        let frame = sample_frame(1);
        let bytes = frame.header.encode().unwrap();
        // crc: length 8 then 8 hex digits.
        assert_eq!(bytes[0], 8);
        assert!(bytes[1..9].iter().all(u8::is_ascii_hexdigit));
        assert_eq!(bytes[9], RECORD_TYPE_SQL);
        assert_eq!(&bytes[10..18], &1i64.to_le_bytes());
        assert_eq!(&bytes[18..22], &frame.header.body_length.to_le_bytes());
        assert_eq!(bytes[22], 14);
        assert_eq!(&bytes[23..], WRITE_AT.as_bytes());
    }

    #[test]
    fn test_header_roundtrip_at_boundaries() {
        for lsn in [0i64, 1, 250, 251, 65_535, 65_536, 16_777_215, 16_777_216] {
            let header = RecordHeader {
                crc: "0badf00d".to_string(),
                record_type: (lsn % 256) as u8,
                lsn,
                body_length: lsn as i32,
                write_at: WRITE_AT.to_string(),
            };
            let bytes = header.encode().unwrap();
            let decoded = RecordHeader::decode(&mut CursorReader::new(&bytes)).unwrap();
            assert_eq!(decoded, header);
        }
    }

    #[test]
    fn test_body_byte_flip_is_corrupt_frame() {
        let frame = sample_frame(42);
        let mut bytes = frame.encode().unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;

        match RecordFrame::decode(&mut CursorReader::new(&bytes)) {
            Err(SegLogError::CorruptFrame { lsn, offset, source }) => {
                assert_eq!(lsn, Some(42));
                assert_eq!(offset, 0);
                assert!(matches!(*source, SegLogError::ChecksumMismatch { .. }));
            }
            other => panic!("Expected CorruptFrame, got: {other:?}"),
        }
    }

    #[test]
    fn test_checksum_byte_flip_is_corrupt_frame() {
        let frame = sample_frame(7);
        let mut bytes = frame.encode().unwrap();
        // Replace the first hex digit with a different hex digit.
        bytes[1] = if bytes[1] == b'0' { b'1' } else { b'0' };

        let result = RecordFrame::decode(&mut CursorReader::new(&bytes));
        assert!(matches!(result, Err(SegLogError::CorruptFrame { lsn: Some(7), .. })));
    }

    #[test]
    fn test_truncated_body_is_corrupt_frame() {
        let frame = sample_frame(9);
        let bytes = frame.encode().unwrap();
        let truncated = &bytes[..bytes.len() - 3];

        match RecordFrame::decode(&mut CursorReader::new(truncated)) {
            Err(SegLogError::CorruptFrame { lsn, source, .. }) => {
                assert_eq!(lsn, Some(9));
                assert!(matches!(*source, SegLogError::UnexpectedEof { .. }));
            }
            other => panic!("Expected CorruptFrame, got: {other:?}"),
        }
    }

    #[test]
    fn test_truncated_header_has_no_lsn() {
        let bytes = sample_frame(3).encode().unwrap();
        let result = RecordFrame::decode(&mut CursorReader::new(&bytes[..12]));
        assert!(matches!(result, Err(SegLogError::CorruptFrame { lsn: None, .. })));
    }

    #[test]
    fn test_negative_body_length_rejected() {
        let mut buffer = GrowableWriteBuffer::new(0);
        RecordHeader {
            crc: "00000000".to_string(),
            record_type: 1,
            lsn: 5,
            body_length: -1,
            write_at: WRITE_AT.to_string(),
        }
        .encode_into(&mut buffer)
        .unwrap();
        let bytes = buffer.finalize();

        match RecordFrame::decode(&mut CursorReader::new(&bytes)) {
            Err(SegLogError::CorruptFrame { source, .. }) => {
                assert!(matches!(
                    *source,
                    SegLogError::LengthOutOfRange { length: -1, .. }
                ));
            }
            other => panic!("Expected CorruptFrame, got: {other:?}"),
        }
    }

    #[test]
    fn test_encode_record_uses_current_time() {
        let bytes = encode_record(2, 100, b"payload").unwrap();
        let frame = RecordFrame::decode(&mut CursorReader::new(&bytes)).unwrap();
        assert_eq!(frame.record_type(), 2);
        assert_eq!(frame.lsn(), 100);
        assert_eq!(frame.body, b"payload");
        assert_eq!(frame.header.write_at.len(), crate::timestamp::TIMESTAMP_LEN);
    }

    #[test]
    fn test_body_with_large_statement() {
        let sql = "insert into SaleOrder values (1);\n".repeat(500);
        let body = RecordBody::new("p2", 66, sql.clone());
        let decoded = RecordBody::from_bytes(&body.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded.sql, sql);
        assert_eq!(decoded.tid, 66);
    }

    #[test]
    fn test_body_with_non_numeric_tid() {
        let mut buffer = GrowableWriteBuffer::new(0);
        buffer.write_str_with_length(Some("p")).unwrap();
        buffer.write_str_with_length(Some("abc")).unwrap();
        buffer.write_str_with_length(Some("select 1")).unwrap();
        let result = RecordBody::from_bytes(&buffer.finalize());
        assert!(matches!(result, Err(SegLogError::InvalidBody(_))));
    }

    #[test]
    fn test_write_at_must_be_fourteen_chars() {
        assert!(matches!(
            RecordFrame::with_write_at(RECORD_TYPE_SQL, 1, Vec::new(), "2022".to_string()),
            Err(SegLogError::InvalidTimestamp { field: "write_at", .. })
        ));

        let mut frame = sample_frame(1);
        frame.header.write_at = "202212312359590".to_string();
        assert!(matches!(
            frame.encode(),
            Err(SegLogError::InvalidTimestamp { length: 15, .. })
        ));
    }

    #[test]
    fn test_short_write_at_is_corrupt_frame_on_decode() {
        let mut buffer = GrowableWriteBuffer::new(0);
        buffer.write_str_with_length(Some("0badf00d")).unwrap();
        buffer.put(RECORD_TYPE_SQL).unwrap();
        buffer.write_long(11).unwrap();
        buffer.write_int(0).unwrap();
        buffer.write_str_with_length(Some("20221231")).unwrap();
        let bytes = buffer.finalize();

        match RecordFrame::decode(&mut CursorReader::new(&bytes)) {
            Err(SegLogError::CorruptFrame { lsn, source, .. }) => {
                assert_eq!(lsn, None);
                assert!(matches!(
                    *source,
                    SegLogError::InvalidTimestamp { length: 8, .. }
                ));
            }
            other => panic!("Expected CorruptFrame, got: {other:?}"),
        }
    }
}
