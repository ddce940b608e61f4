//! CLI binary: writes JSON-lines records into a SQLite table.
//!
//! A thin wrapper around the `table_writer` library that handles argument
//! parsing, logger setup, reading input and the summary line.

use std::path::Path;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use log::warn;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use table_writer::initialization::init_logger_with;
use table_writer::{BatchWriter, Opt, Record};

#[tokio::main]
async fn main() -> Result<()> {
    let opt = Opt::parse();

    init_logger_with(opt.log_level.clone().into(), opt.log_format.clone())
        .context("Failed to initialize logger")?;

    match run(&opt).await {
        Ok(summary) => {
            println!(
                "✅ Wrote {} record{} to {} ({} failed, {} skipped lines) in {} batch{}",
                summary.written,
                if summary.written == 1 { "" } else { "s" },
                opt.table,
                summary.failed,
                summary.skipped,
                summary.batches,
                if summary.batches == 1 { "" } else { "es" },
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("table_writer error: {:#}", e);
            process::exit(1);
        }
    }
}

struct Summary {
    written: u64,
    failed: u64,
    batches: u64,
    skipped: usize,
}

async fn run(opt: &Opt) -> Result<Summary> {
    let writer = BatchWriter::new(opt.writer_config())
        .await
        .context("Failed to create writer")?;

    let reader = open_input(&opt.file).await?;
    let fed = feed(&writer, reader).await;
    // close even if feeding failed so queued batches land and the pool is released
    let closed = writer.close().await;

    let skipped = fed?;
    closed.context("Some records could not be written")?;

    let stats = writer.stats();
    Ok(Summary {
        written: stats.records_written,
        failed: stats.records_failed,
        batches: stats.batches_sent,
        skipped,
    })
}

async fn open_input(path: &Path) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufReader::new(tokio::io::stdin())));
    }
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open input file {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Puts every line of `reader` into `writer`; returns the number of lines
/// skipped as unparseable.
async fn feed(writer: &BatchWriter, reader: Box<dyn AsyncBufRead + Unpin + Send>) -> Result<usize> {
    let mut lines = reader.lines();
    let mut line_no = 0usize;
    let mut skipped = 0usize;

    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let record = match serde_json::from_str(line)
            .map_err(|e| table_writer::WriterError::InvalidRecord(e.to_string()))
            .and_then(Record::from_json)
        {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping line {}: {}", line_no, e);
                skipped += 1;
                continue;
            }
        };

        writer
            .put(record)
            .await
            .with_context(|| format!("Failed to write record from line {}", line_no))?;
    }

    Ok(skipped)
}
