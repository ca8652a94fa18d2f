// SPDX-License-Identifier: PMPL-1.0-or-later
//! Property-based tests for the segment log format

use proptest::prelude::*;
use verisim_seglog::lenenc::{decode_length, encode_length, encoded_size};
use verisim_seglog::{
    decode_segment, CursorReader, GrowableWriteBuffer, RecordFrame, SegLogError, Segment,
    SegmentHeader, SegmentTrailer, RECORD_TYPE_SQL,
};

const STAMP: &str = "20221101145020";

/// Lengths that hit every prefix width, biased toward the boundaries.
fn arb_length() -> impl Strategy<Value = u64> {
    prop_oneof![
        0u64..=260,
        65_530u64..=65_540,
        16_777_210u64..=16_777_220,
        0u64..=i64::MAX as u64,
    ]
}

/// Arbitrary record bodies, including empty ones.
fn arb_body() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..300)
}

/// A segment with 0..8 records and an optional trailer.
fn arb_segment() -> impl Strategy<Value = Segment> {
    (
        prop::collection::vec(arb_body(), 0..8),
        "[a-z]{0,12}",
        prop::option::of("wal-[0-9]{14}-[0-9]{2}"),
        any::<i64>(),
    )
        .prop_map(|(bodies, prev, next, start_lsn)| {
            let records = bodies
                .into_iter()
                .enumerate()
                .map(|(i, body)| {
                    RecordFrame::with_write_at(
                        RECORD_TYPE_SQL,
                        start_lsn.wrapping_add(i as i64),
                        body,
                        STAMP.to_string(),
                    )
                    .unwrap()
                })
                .collect();
            Segment {
                header: SegmentHeader::with_create_at(1, start_lsn, prev, STAMP),
                records,
                trailer: next.map(SegmentTrailer::new),
            }
        })
}

proptest! {
    #[test]
    fn test_length_prefix_roundtrip(length in arb_length()) {
        let mut buffer = GrowableWriteBuffer::new(0);
        encode_length(&mut buffer, length).unwrap();
        let bytes = buffer.finalize();

        prop_assert_eq!(bytes.len(), encoded_size(Some(length)));
        let mut cursor = CursorReader::new(&bytes);
        prop_assert_eq!(decode_length(&mut cursor).unwrap(), Some(length));
        prop_assert!(!cursor.has_remaining());
    }

    #[test]
    fn test_writes_survive_any_growth(
        chunks in prop::collection::vec(arb_body(), 0..20),
        capacity in 0usize..64,
        limit in 0usize..64,
    ) {
        let mut buffer = GrowableWriteBuffer::with_limit(capacity, limit);
        let mut expected = Vec::new();
        for chunk in &chunks {
            buffer.put_slice(chunk).unwrap();
            expected.extend_from_slice(chunk);
            prop_assert!(buffer.position() <= buffer.length());
            prop_assert!(buffer.length() <= buffer.capacity());
        }
        prop_assert_eq!(buffer.array(), expected);
    }

    #[test]
    fn test_ensure_capacity_makes_room(
        capacity in 0usize..128,
        limit in 0usize..128,
        written in 0usize..128,
        extra in 0usize..512,
    ) {
        let mut buffer = GrowableWriteBuffer::with_limit(capacity, limit);
        buffer.put_slice(&vec![7u8; written]).unwrap();
        buffer.ensure_capacity(extra).unwrap();
        prop_assert!(buffer.position() + extra <= buffer.length());
        prop_assert!(buffer.length() <= buffer.capacity());
    }

    #[test]
    fn test_segment_roundtrip(segment in arb_segment()) {
        let bytes = segment.encode().unwrap();
        prop_assert_eq!(bytes.len(), segment.encoded_size());
        prop_assert_eq!(decode_segment(&bytes).unwrap(), segment);
    }

    #[test]
    fn test_body_byte_flip_is_detected(
        body in prop::collection::vec(any::<u8>(), 1..200),
        index in any::<prop::sample::Index>(),
        mask in 1u8..=255,
    ) {
        let frame = RecordFrame::with_write_at(RECORD_TYPE_SQL, 1, body, STAMP.to_string()).unwrap();
        let mut bytes = frame.encode().unwrap();
        let body_start = frame.header.encoded_size();
        let target = body_start + index.index(frame.body.len());
        bytes[target] ^= mask;

        let result = RecordFrame::decode(&mut CursorReader::new(&bytes));
        let is_corrupt_frame = matches!(result, Err(SegLogError::CorruptFrame { .. }));
        prop_assert!(is_corrupt_frame);
    }

    #[test]
    fn test_truncated_segment_salvages_a_prefix(
        segment in arb_segment(),
        cut in any::<prop::sample::Index>(),
    ) {
        let bytes = segment.encode().unwrap();
        let cut = cut.index(bytes.len());

        match decode_segment(&bytes[..cut]) {
            Ok(decoded) => {
                prop_assert!(!decoded.is_sealed());
                prop_assert_eq!(&decoded.header, &segment.header);
                prop_assert!(decoded.records.len() <= segment.records.len());
                prop_assert_eq!(&decoded.records[..], &segment.records[..decoded.records.len()]);
            }
            Err(error) => {
                let salvaged = error.partial_records();
                prop_assert!(salvaged.len() <= segment.records.len());
                prop_assert_eq!(salvaged, &segment.records[..salvaged.len()]);
            }
        }
    }

    #[test]
    fn test_null_and_empty_never_collide(bytes in arb_body()) {
        let mut null = GrowableWriteBuffer::new(0);
        null.write_with_length(None).unwrap();
        let mut present = GrowableWriteBuffer::new(0);
        present.write_with_length(Some(&bytes)).unwrap();

        let null = null.finalize();
        let present = present.finalize();
        prop_assert_ne!(&null, &present);
        prop_assert_eq!(
            CursorReader::new(&present).read_bytes_with_length().unwrap(),
            Some(&bytes[..])
        );
        prop_assert_eq!(CursorReader::new(&null).read_bytes_with_length().unwrap(), None);
    }
}
