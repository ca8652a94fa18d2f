// SPDX-License-Identifier: PMPL-1.0-or-later
//
// VeriSimDB Segment Log - Segment files
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Thin adapters between whole segment files and the in-memory codec. A
// segment file is named after its segment (`wal-yyyyMMddHHmmss-NN`, no
// extension) so the names in `prev`/`next` resolve to files in the same
// directory.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::chain::SegmentChain;
use crate::codec::decode_segment;
use crate::error::{SegLogError, SegLogResult};
use crate::naming::parse_segment_name;
use crate::segment::Segment;

/// A segment file found in a directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SegmentFile {
    /// Segment name (the file name).
    pub name: String,
    /// Full path to the file.
    pub path: PathBuf,
    /// File size in bytes.
    pub file_size: u64,
}

/// Write `bytes` to `path`, replacing any existing file, and sync it.
pub fn write_segment_file(path: &Path, bytes: &[u8]) -> SegLogResult<()> {
    fs::write(path, bytes)?;
    fs::File::open(path)?.sync_all()?;
    debug!(path = %path.display(), size = bytes.len(), "Wrote segment file");
    Ok(())
}

/// Read and decode a segment file.
pub fn read_segment_file(path: &Path) -> SegLogResult<Segment> {
    let bytes = fs::read(path)?;
    debug!(path = %path.display(), size = bytes.len(), "Read segment file");
    decode_segment(&bytes)
}

/// Scan `dir` for files whose names parse as segment names, sorted by name.
///
/// The order is for display only; chain order comes from the bookends.
/// Other files are ignored.
pub fn list_segment_files(dir: &Path) -> SegLogResult<Vec<SegmentFile>> {
    if !dir.is_dir() {
        return Err(SegLogError::DirectoryNotFound(dir.display().to_string()));
    }

    let mut files = Vec::new();
    for dir_entry in fs::read_dir(dir)? {
        let dir_entry = dir_entry?;
        let file_name = dir_entry.file_name();
        let name = file_name.to_string_lossy();

        if parse_segment_name(&name).is_some() {
            let metadata = dir_entry.metadata()?;
            if metadata.is_file() {
                files.push(SegmentFile {
                    name: name.into_owned(),
                    path: dir_entry.path(),
                    file_size: metadata.len(),
                });
            }
        }
    }

    files.sort();

    debug!(
        count = files.len(),
        dir = %dir.display(),
        "Discovered segment files"
    );

    Ok(files)
}

/// Decode every segment file in `dir` into a chain.
///
/// Fails on the first segment that does not decode; use `read_segment_file`
/// per file to salvage records from a damaged one.
pub fn load_chain(dir: &Path) -> SegLogResult<SegmentChain> {
    let mut chain = SegmentChain::new();
    for file in list_segment_files(dir)? {
        let segment = read_segment_file(&file.path)?;
        chain.insert(file.name, segment);
    }

    info!(segments = chain.len(), dir = %dir.display(), "Loaded segment chain");
    Ok(chain)
}
