// SPDX-License-Identifier: PMPL-1.0-or-later
// Fuzz target for segment decoding

#![no_main]

use libfuzzer_sys::fuzz_target;
use verisim_seglog::{decode_segment, CursorReader, RecordFrame};

fuzz_target!(|data: &[u8]| {
    // Decoding arbitrary bytes must fail cleanly, never panic.
    match decode_segment(data) {
        Ok(segment) => {
            // Length prefixes may be non-minimal in the input, so compare
            // decoded values rather than bytes.
            let bytes = segment.encode().unwrap();
            assert_eq!(decode_segment(&bytes).unwrap(), segment);
        }
        Err(error) => {
            for record in error.partial_records() {
                assert!(record.verify().is_ok());
            }
        }
    }

    // Frames on their own.
    let _ = RecordFrame::decode(&mut CursorReader::new(data));
});
