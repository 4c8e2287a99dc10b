//! CSV tables
//!
//! | file | columns |
//! |---|---|
//! | `peaks.csv` | `retention_time,intensity,compound,source,left_base,right_base` |
//! | `regressions.csv` | `source,slope,intercept,r_squared,matched_times` |
//! | `traces.csv` | `retention_time,raw_intensity,source,slope,intercept,r_squared,normalized_intensity,aligned_retention_time` |
//!
//! Absent peaks are written as zeros in every numeric column, and skipped
//! alignments as `slope=skip` with empty `intercept` and `r_squared`.
//! `matched_times` holds the fitted pairs as a JSON array.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::alignment::{AlignmentFit, AlignmentOutput, MatchedTime, RegressionRecord, TraceRecord};
use crate::detection::{AbsentReason, DetectedPeak, PeakOutcome, PeakRecord, PeakTable};

/// Value of the `slope` column for skipped files.
pub const SKIP: &str = "skip";

const PEAK_COLUMNS: [&str; 6] = [
    "retention_time",
    "intensity",
    "compound",
    "source",
    "left_base",
    "right_base",
];

const REGRESSION_COLUMNS: [&str; 5] = ["source", "slope", "intercept", "r_squared", "matched_times"];

const TRACE_COLUMNS: [&str; 8] = [
    "retention_time",
    "raw_intensity",
    "source",
    "slope",
    "intercept",
    "r_squared",
    "normalized_intensity",
    "aligned_retention_time",
];

/// Errors raised while writing or reading tables
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// A file could not be created or opened
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Offending path
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// CSV serialization or parsing error
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// JSON serialization error in the matched-times column
    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Flushing the output failed
    #[error("Failed to write output: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct PeakRow {
    retention_time: f64,
    intensity: f64,
    compound: String,
    source: String,
    left_base: f64,
    right_base: f64,
}

impl From<&PeakRecord> for PeakRow {
    fn from(record: &PeakRecord) -> Self {
        let (retention_time, intensity, left_base, right_base) = match record.outcome {
            PeakOutcome::Found(peak) => (
                peak.retention_time,
                peak.intensity,
                peak.left_base,
                peak.right_base,
            ),
            PeakOutcome::Absent(_) => (0.0, 0.0, 0.0, 0.0),
        };
        Self {
            retention_time,
            intensity,
            compound: record.compound.clone(),
            source: record.source.clone(),
            left_base,
            right_base,
        }
    }
}

impl From<PeakRow> for PeakRecord {
    fn from(row: PeakRow) -> Self {
        // retention times are measured after injection, so zero is never an apex
        let outcome = if row.retention_time == 0.0 {
            PeakOutcome::Absent(AbsentReason::Unrecorded)
        } else {
            PeakOutcome::Found(DetectedPeak {
                retention_time: row.retention_time,
                intensity: row.intensity,
                left_base: row.left_base,
                right_base: row.right_base,
                prominence: f64::NAN,
            })
        };
        Self {
            compound: row.compound,
            source: row.source,
            outcome,
        }
    }
}

#[derive(Debug, Serialize)]
struct RegressionRow<'a> {
    source: &'a str,
    slope: String,
    intercept: Option<f64>,
    r_squared: Option<f64>,
    matched_times: String,
}

impl<'a> RegressionRow<'a> {
    fn from_record(record: &'a RegressionRecord) -> Result<Self, OutputError> {
        let matched_times = serde_json::to_string(&record.matched)?;
        Ok(match &record.fit {
            AlignmentFit::Fit(map) => Self {
                source: &record.source,
                slope: format!("{:?}", map.slope),
                intercept: Some(map.intercept),
                r_squared: Some(map.r_squared),
                matched_times,
            },
            AlignmentFit::Skip { .. } => Self {
                source: &record.source,
                slope: SKIP.to_string(),
                intercept: None,
                r_squared: None,
                matched_times,
            },
        })
    }
}

/// CSV writer that has already written `columns`, so empty tables keep
/// their header row.
fn table_writer<W: Write>(writer: W, columns: &[&str]) -> Result<csv::Writer<W>, OutputError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record(columns)?;
    Ok(csv_writer)
}

/// Write a peak table as CSV.
pub fn write_peak_table<W: Write>(writer: W, table: &PeakTable) -> Result<(), OutputError> {
    let mut csv_writer = table_writer(writer, &PEAK_COLUMNS)?;
    for record in table.records() {
        csv_writer.serialize(PeakRow::from(record))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Read a peak table written by [`write_peak_table`].
///
/// Rows with a zero retention time are read as absent.
pub fn read_peak_table<R: Read>(reader: R) -> Result<PeakTable, OutputError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for row in csv_reader.deserialize::<PeakRow>() {
        records.push(PeakRecord::from(row?));
    }
    Ok(PeakTable::new(records))
}

/// Write regression records as CSV.
pub fn write_regressions<W: Write>(
    writer: W,
    records: &[RegressionRecord],
) -> Result<(), OutputError> {
    let mut csv_writer = table_writer(writer, &REGRESSION_COLUMNS)?;
    for record in records {
        csv_writer.serialize(RegressionRow::from_record(record)?)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write trace records as CSV.
pub fn write_traces<W: Write>(writer: W, records: &[TraceRecord]) -> Result<(), OutputError> {
    let mut csv_writer = table_writer(writer, &TRACE_COLUMNS)?;
    for record in records {
        csv_writer.serialize(record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write `(m/z, intensity)` pairs as a two-column CSV.
pub fn write_spectrum<W: Write>(writer: W, ions: &[(f64, f64)]) -> Result<(), OutputError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["mz", "intensity"])?;
    for (mz, intensity) in ions {
        csv_writer.serialize((mz, intensity))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write a peak table to `path`.
pub fn save_peak_table(path: &Path, table: &PeakTable) -> Result<(), OutputError> {
    write_peak_table(BufWriter::new(create(path)?), table)
}

/// Read a peak table from `path`.
pub fn load_peak_table(path: &Path) -> Result<PeakTable, OutputError> {
    let file = File::open(path).map_err(|source| OutputError::Io {
        path: path.display().to_string(),
        source,
    })?;
    read_peak_table(BufReader::new(file))
}

/// Write `regressions.csv` and `traces.csv` into `dir`, creating it if needed.
pub fn save_alignment(dir: &Path, output: &AlignmentOutput) -> Result<(), OutputError> {
    std::fs::create_dir_all(dir).map_err(|source| OutputError::Io {
        path: dir.display().to_string(),
        source,
    })?;
    write_regressions(
        BufWriter::new(create(&dir.join("regressions.csv"))?),
        &output.regressions,
    )?;
    write_traces(
        BufWriter::new(create(&dir.join("traces.csv"))?),
        &output.traces,
    )?;
    Ok(())
}

fn create(path: &Path) -> Result<File, OutputError> {
    File::create(path).map_err(|source| OutputError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Matched times parsed back from the `matched_times` column.
pub fn parse_matched_times(column: &str) -> Result<Vec<MatchedTime>, OutputError> {
    Ok(serde_json::from_str(column)?)
}
