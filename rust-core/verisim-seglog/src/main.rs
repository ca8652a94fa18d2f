// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//!
//! seglog: inspect, verify and write VeriSimDB log segments.
//!
//! - `inspect <file>` prints the header, record summaries and status
//! - `chain <dir>` walks segments by their `prev`/`next` names
//! - `verify <file>` exits non-zero if the segment is corrupt
//! - `write <file>` builds a segment from SQL statements

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use verisim_seglog::{
    decode_segment, load_chain, write_segment_file, RecordBody, RecordFrame, SegLogError,
    Segment, SegmentBuilder, SegmentConfig, SegmentHeader, SegmentStatus, RECORD_TYPE_SQL,
};

/// Version string, pulled from Cargo.toml at compile time.
const VERSION: &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// CLI argument parsing
// ---------------------------------------------------------------------------

/// seglog: tools for VeriSimDB log segments.
#[derive(Parser, Debug)]
#[command(name = "seglog", version = VERSION, about = "Inspect VeriSimDB log segments")]
struct Cli {
    /// JSON file with a SegmentConfig; defaults apply to missing fields.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a segment's header, records and status.
    Inspect {
        /// Segment file.
        file: PathBuf,
        /// Emit JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Walk the segment chain in a directory.
    Chain {
        /// Directory holding segment files.
        dir: PathBuf,
    },
    /// Check every record checksum in a segment.
    Verify {
        /// Segment file.
        file: PathBuf,
    },
    /// Write a segment containing one SQL record per `--sql`.
    Write(WriteArgs),
}

#[derive(Args, Debug)]
struct WriteArgs {
    /// Output file.
    file: PathBuf,
    /// Name of the previous segment; empty for the first.
    #[arg(long, default_value = "")]
    prev: String,
    /// LSN of the first record.
    #[arg(long, default_value_t = 1)]
    start_lsn: i64,
    /// Seal the segment with a trailer naming this successor.
    #[arg(long)]
    seal: Option<String>,
    /// Process identifier stored in each record body.
    #[arg(long, default_value = "seglog")]
    process_id: String,
    /// Transaction identifier stored in each record body.
    #[arg(long, default_value_t = 0)]
    tid: i64,
    /// Statement text; repeat for several records.
    #[arg(long)]
    sql: Vec<String>,
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct RecordSummary {
    lsn: i64,
    record_type: u8,
    body_length: i32,
    write_at: String,
    crc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sql: Option<RecordBody>,
}

impl From<&RecordFrame> for RecordSummary {
    fn from(record: &RecordFrame) -> Self {
        let sql = (record.record_type() == RECORD_TYPE_SQL)
            .then(|| RecordBody::from_bytes(&record.body).ok())
            .flatten();
        Self {
            lsn: record.lsn(),
            record_type: record.record_type(),
            body_length: record.header.body_length,
            write_at: record.header.write_at.clone(),
            crc: record.header.crc.clone(),
            sql,
        }
    }
}

#[derive(Debug, Serialize)]
struct SegmentSummary<'a> {
    status: SegmentStatus,
    header: &'a SegmentHeader,
    next: Option<&'a str>,
    records: Vec<RecordSummary>,
}

impl<'a> From<&'a Segment> for SegmentSummary<'a> {
    fn from(segment: &'a Segment) -> Self {
        Self {
            status: segment.status(),
            header: &segment.header,
            next: segment.next(),
            records: segment.records.iter().map(RecordSummary::from).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn load_config(path: Option<&Path>) -> Result<SegmentConfig> {
    let Some(path) = path else {
        return Ok(SegmentConfig::default());
    };
    let json = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = SegmentConfig::from_json_str(&json)
        .with_context(|| format!("parsing config {}", path.display()))?;
    info!(path = %path.display(), "Loaded segment config");
    Ok(config)
}

/// Outcome of a command that completed without an operational error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Clean,
    Corrupt,
}

impl From<Verdict> for ExitCode {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Clean => ExitCode::SUCCESS,
            Verdict::Corrupt => ExitCode::FAILURE,
        }
    }
}

fn inspect(file: &Path, json: bool, out: &mut impl Write) -> Result<Verdict> {
    let bytes = fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let segment = decode_segment(&bytes)?;
    let summary = SegmentSummary::from(&segment);

    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&summary)?)?;
        return Ok(Verdict::Clean);
    }

    let header = summary.header;
    writeln!(out, "segment   {}", file.display())?;
    writeln!(out, "type      {}", header.segment_type)?;
    writeln!(out, "version   {}", header.version)?;
    writeln!(out, "start_lsn {}", header.start_lsn)?;
    writeln!(out, "prev      {}", segment.prev().unwrap_or("-"))?;
    writeln!(out, "create_at {}", header.create_at)?;
    writeln!(out, "records   {}", summary.records.len())?;
    for record in &summary.records {
        let detail = record
            .sql
            .as_ref()
            .map(|body| format!("tid={} {}", body.tid, body.sql))
            .unwrap_or_else(|| format!("{} bytes", record.body_length));
        writeln!(
            out,
            "  lsn={} type={} at={} crc={} {}",
            record.lsn, record.record_type, record.write_at, record.crc, detail
        )?;
    }
    match summary.next {
        Some(next) => writeln!(out, "sealed    next={next}")?,
        None => writeln!(out, "unsealed  (active or truncated)")?,
    }
    Ok(Verdict::Clean)
}

fn chain(dir: &Path, out: &mut impl Write) -> Result<Verdict> {
    let chain = load_chain(dir)?;
    let walk = chain.walk()?;
    let tail = chain.active_tail()?;

    for &name in &walk.order {
        let Some(segment) = chain.get(name) else {
            continue;
        };
        let marker = if tail == Some(name) {
            "  <- active or truncated".to_string()
        } else if walk.last() == Some(name) {
            walk.dangling_next
                .map(|next| format!("  <- successor `{next}` missing"))
                .unwrap_or_default()
        } else {
            String::new()
        };
        writeln!(
            out,
            "{name}  records={} status={:?}{marker}",
            segment.records.len(),
            segment.status()
        )?;
    }
    Ok(Verdict::Clean)
}

fn verify(file: &Path, out: &mut impl Write) -> Result<Verdict> {
    let bytes = fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    match decode_segment(&bytes) {
        Ok(segment) => {
            writeln!(
                out,
                "ok: {} records, {:?}",
                segment.records.len(),
                segment.status()
            )?;
            Ok(Verdict::Clean)
        }
        Err(error @ SegLogError::CorruptSegment { .. }) => {
            let salvageable = error.partial_records().len();
            warn!(file = %file.display(), salvageable, "Segment failed verification");
            writeln!(out, "corrupt: {error}")?;
            writeln!(out, "salvageable records: {salvageable}")?;
            Ok(Verdict::Corrupt)
        }
        Err(error) => Err(error.into()),
    }
}

fn write_segment(config: &SegmentConfig, args: WriteArgs) -> Result<Verdict> {
    let mut builder = SegmentBuilder::start(config, args.start_lsn, args.prev)?;
    for sql in args.sql {
        let body = RecordBody::new(args.process_id.as_str(), args.tid, sql);
        builder.append(RECORD_TYPE_SQL, body.to_bytes()?)?;
    }
    let records = builder.record_count();
    let bytes = match args.seal {
        Some(next) => builder.seal(next)?,
        None => builder.finish_unsealed(),
    };
    write_segment_file(&args.file, &bytes)?;
    info!(file = %args.file.display(), records, size = bytes.len(), "Wrote segment");
    Ok(Verdict::Clean)
}

fn run(cli: Cli, out: &mut impl Write) -> Result<Verdict> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Inspect { file, json } => inspect(&file, json, out),
        Command::Chain { dir } => chain(&dir, out),
        Command::Verify { file } => verify(&file, out),
        Command::Write(args) => write_segment(&config, args),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli, &mut io::stdout().lock()) {
        Ok(verdict) => verdict.into(),
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_args(file: PathBuf, prev: &str, seal: Option<&str>, sql: &[&str]) -> WriteArgs {
        WriteArgs {
            file,
            prev: prev.to_string(),
            start_lsn: 100,
            seal: seal.map(str::to_string),
            process_id: "p1".to_string(),
            tid: 7,
            sql: sql.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn output(buffer: Vec<u8>) -> String {
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_written_segment_verifies_clean() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("wal-20221101145020-00");
        let args = write_args(file.clone(), "", Some("wal-20221101145021-01"), &["a", "b"]);
        write_segment(&SegmentConfig::default(), args).unwrap();

        let mut out = Vec::new();
        assert_eq!(verify(&file, &mut out).unwrap(), Verdict::Clean);
        assert_eq!(output(out), "ok: 2 records, Sealed\n");
    }

    #[test]
    fn test_truncated_segment_fails_verification() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("wal-20221101145020-00");
        let args = write_args(file.clone(), "", None, &["select 1", "select 2"]);
        write_segment(&SegmentConfig::default(), args).unwrap();

        let bytes = fs::read(&file).unwrap();
        fs::write(&file, &bytes[..bytes.len() - 3]).unwrap();

        let mut out = Vec::new();
        let verdict = verify(&file, &mut out).unwrap();
        assert_eq!(verdict, Verdict::Corrupt);

        let text = output(out);
        assert!(text.starts_with("corrupt: "));
        assert!(text.contains("salvageable records: 1\n"));
    }

    #[test]
    fn test_verify_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let mut out = Vec::new();
        assert!(verify(&dir.path().join("absent"), &mut out).is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn test_seal_with_empty_successor_is_error() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("wal-20221101145020-00");
        let args = write_args(file.clone(), "", Some(""), &["a"]);
        let error = write_segment(&SegmentConfig::default(), args).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<SegLogError>(),
            Some(SegLogError::MissingTrailerNext)
        ));
        assert!(!file.exists());
    }

    #[test]
    fn test_chain_marks_active_tail() {
        let dir = TempDir::new().unwrap();
        let first = "wal-20221101145020-00";
        let second = "wal-20221101145010-01";
        let config = SegmentConfig::default();
        write_segment(&config, write_args(dir.path().join(first), "", Some(second), &["a"]))
            .unwrap();
        write_segment(&config, write_args(dir.path().join(second), first, None, &["b", "c"]))
            .unwrap();

        let mut out = Vec::new();
        assert_eq!(chain(dir.path(), &mut out).unwrap(), Verdict::Clean);
        let lines: Vec<String> = output(out).lines().map(str::to_string).collect();
        assert_eq!(
            lines,
            vec![
                format!("{first}  records=1 status=Sealed"),
                format!("{second}  records=2 status=Unsealed  <- active or truncated"),
            ]
        );
    }

    #[test]
    fn test_chain_reports_missing_successor() {
        let dir = TempDir::new().unwrap();
        let first = "wal-20221101145020-00";
        let args = write_args(dir.path().join(first), "", Some("wal-20221101145021-01"), &["a"]);
        write_segment(&SegmentConfig::default(), args).unwrap();

        let mut out = Vec::new();
        assert_eq!(chain(dir.path(), &mut out).unwrap(), Verdict::Clean);
        assert_eq!(
            output(out),
            format!("{first}  records=1 status=Sealed  <- successor `wal-20221101145021-01` missing\n")
        );
    }

    #[test]
    fn test_inspect_json() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("wal-20221101145020-00");
        let args = write_args(file.clone(), "", None, &["insert into t values (1)"]);
        write_segment(&SegmentConfig::default(), args).unwrap();

        let mut out = Vec::new();
        assert_eq!(inspect(&file, true, &mut out).unwrap(), Verdict::Clean);
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["status"], "unsealed");
        assert_eq!(json["next"], serde_json::Value::Null);
        assert_eq!(json["records"][0]["lsn"], 100);
        assert_eq!(json["records"][0]["sql"]["sql"], "insert into t values (1)");
    }

    #[test]
    fn test_cli_parses_write() {
        let cli = Cli::try_parse_from([
            "seglog", "write", "out.seg", "--seal", "wal-next", "--sql", "a", "--sql", "b",
        ])
        .unwrap();
        let Command::Write(args) = cli.command else {
            panic!("expected write");
        };
        assert_eq!(args.seal.as_deref(), Some("wal-next"));
        assert_eq!(args.sql, vec!["a", "b"]);
        assert_eq!(args.start_lsn, 1);
    }
}
