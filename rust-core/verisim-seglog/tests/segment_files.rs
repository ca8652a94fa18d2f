// SPDX-License-Identifier: PMPL-1.0-or-later
//! On-disk segment chains: writing, listing, walking, and damage handling

use chrono::{TimeZone, Utc};
use tempfile::TempDir;
use verisim_seglog::{
    list_segment_files, load_chain, read_segment_file, write_segment_file, LsnGenerator,
    RecordBody, SegLogError, SegmentBuilder, SegmentConfig, SegmentNamer, SegmentStatus,
    RECORD_TYPE_SQL,
};

/// Write a chain of `sealed` sealed segments followed by one active
/// segment, three records each. Returns the names in chain order.
fn write_chain(dir: &TempDir, sealed: usize) -> Vec<String> {
    let config = SegmentConfig::default();
    let namer = SegmentNamer::new();
    let lsns = LsnGenerator::new();
    // Later segments get earlier timestamps so name order disagrees with
    // chain order.
    let names: Vec<String> = (0..=sealed)
        .map(|i| {
            let at = Utc
                .with_ymd_and_hms(2022, 11, 1, 14, 50, 30 - i as u32)
                .unwrap();
            namer.name_at(&at)
        })
        .collect();

    let mut prev = String::new();
    for (i, name) in names.iter().enumerate() {
        let start = lsns.next_lsn().unwrap();
        let mut builder = SegmentBuilder::start(&config, start, prev.as_str()).unwrap();
        for j in 0..3 {
            let lsn = if j == 0 { start } else { lsns.next_lsn().unwrap() };
            let body = RecordBody::new("p1", lsn, format!("insert into t values ({i}, {j})"));
            let frame = body.into_frame(lsn).unwrap();
            builder.append_frame(&frame).unwrap();
        }

        let bytes = match names.get(i + 1) {
            Some(next) => builder.seal(next.as_str()).unwrap(),
            None => builder.finish_unsealed(),
        };
        write_segment_file(&dir.path().join(name), &bytes).unwrap();
        prev = name.clone();
    }
    names
}

#[test]
fn test_chain_walk_on_disk() {
    let dir = TempDir::new().unwrap();
    let names = write_chain(&dir, 2);

    let chain = load_chain(dir.path()).unwrap();
    assert_eq!(chain.len(), 3);

    let walk = chain.walk().unwrap();
    assert_eq!(walk.order, names.iter().map(String::as_str).collect::<Vec<_>>());
    assert_eq!(walk.dangling_next, None);
    assert_eq!(chain.active_tail().unwrap(), Some(names[2].as_str()));

    // Listing sorts by name, which here is the reverse of chain order.
    let listed: Vec<String> = list_segment_files(dir.path())
        .unwrap()
        .into_iter()
        .map(|f| f.name)
        .collect();
    let mut reversed = names.clone();
    reversed.reverse();
    assert_eq!(listed, reversed);

    let records = chain.records().unwrap();
    assert_eq!(records.len(), 9);
    assert!(records.windows(2).all(|w| w[0].lsn() < w[1].lsn()));
}

#[test]
fn test_bookends_link_neighbours() {
    let dir = TempDir::new().unwrap();
    let names = write_chain(&dir, 2);

    let middle = read_segment_file(&dir.path().join(&names[1])).unwrap();
    assert_eq!(middle.status(), SegmentStatus::Sealed);
    assert_eq!(middle.prev(), Some(names[0].as_str()));
    assert_eq!(middle.next(), Some(names[2].as_str()));

    let first = read_segment_file(&dir.path().join(&names[0])).unwrap();
    assert_eq!(first.prev(), None);

    let last = read_segment_file(&dir.path().join(&names[2])).unwrap();
    assert_eq!(last.status(), SegmentStatus::Unsealed);
}

#[test]
fn test_record_bodies_survive_disk() {
    let dir = TempDir::new().unwrap();
    let names = write_chain(&dir, 0);

    let segment = read_segment_file(&dir.path().join(&names[0])).unwrap();
    let body = RecordBody::from_bytes(&segment.records[1].body).unwrap();
    assert_eq!(body.process_id, "p1");
    assert_eq!(body.tid, segment.records[1].lsn());
    assert_eq!(body.sql, "insert into t values (0, 1)");
}

#[test]
fn test_truncated_tail_salvages_records() {
    let dir = TempDir::new().unwrap();
    let names = write_chain(&dir, 1);
    let tail = dir.path().join(&names[1]);

    let bytes = std::fs::read(&tail).unwrap();
    std::fs::write(&tail, &bytes[..bytes.len() - 3]).unwrap();

    let error = read_segment_file(&tail).unwrap_err();
    assert!(matches!(error, SegLogError::CorruptSegment { .. }));
    assert_eq!(error.partial_records().len(), 2);

    // The chain loader refuses a damaged segment.
    assert!(load_chain(dir.path()).is_err());
}

#[test]
fn test_missing_successor_file() {
    let dir = TempDir::new().unwrap();
    let names = write_chain(&dir, 1);
    // A crash after sealing but before the successor file is written.
    std::fs::remove_file(dir.path().join(&names[1])).unwrap();

    let chain = load_chain(dir.path()).unwrap();
    let walk = chain.walk().unwrap();
    assert_eq!(walk.order, vec![names[0].as_str()]);
    assert_eq!(walk.dangling_next, Some(names[1].as_str()));
    assert_eq!(chain.active_tail().unwrap(), None);
    assert_eq!(chain.records().unwrap().len(), 3);
}
