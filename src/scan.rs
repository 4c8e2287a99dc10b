//! Scan and run data model shared by every stage of the pipeline.
//!
//! A [`Run`] is one chromatogram file loaded into memory: its scans in
//! acquisition order, each with a retention time (minutes) and parallel m/z and
//! intensity arrays. Readers produce runs through the [`ScanSource`] trait so
//! the detection and alignment stages never depend on a file format.

use std::collections::HashMap;

use crate::error::SourceError;

/// A single mass spectrum acquired at one retention time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scan {
    /// Native scan number from the source file
    pub num: u32,

    /// Retention time in minutes
    pub retention_time: f64,

    /// m/z values, unordered and sparse
    pub mz: Vec<f64>,

    /// Intensities parallel to `mz`
    pub intensity: Vec<f64>,
}

impl Scan {
    /// Create a scan from parallel m/z and intensity arrays.
    pub fn new(num: u32, retention_time: f64, mz: Vec<f64>, intensity: Vec<f64>) -> Self {
        Self {
            num,
            retention_time,
            mz,
            intensity,
        }
    }

    /// Sum of all intensities in this scan (the total ion current).
    pub fn total_intensity(&self) -> f64 {
        self.intensity.iter().sum()
    }

    /// Iterate over `(mz, intensity)` pairs.
    pub fn ions(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.mz.iter().copied().zip(self.intensity.iter().copied())
    }

    /// Number of detected ions.
    pub fn len(&self) -> usize {
        self.mz.len()
    }

    /// True when the scan carries no ions.
    pub fn is_empty(&self) -> bool {
        self.mz.is_empty()
    }
}

/// All scans of one chromatogram file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Run {
    /// Identifier of the source file (its path as given by the caller)
    pub source: String,

    /// Scans in acquisition order, retention times non-decreasing
    pub scans: Vec<Scan>,
}

impl Run {
    /// Create a run from its scans.
    pub fn new(source: impl Into<String>, scans: Vec<Scan>) -> Self {
        Self {
            source: source.into(),
            scans,
        }
    }

    /// Scans with retention time strictly after `start_time`.
    pub fn after(&self, start_time: f64) -> &[Scan] {
        let first = self
            .scans
            .partition_point(|scan| scan.retention_time <= start_time);
        &self.scans[first..]
    }

    /// Number of scans.
    pub fn len(&self) -> usize {
        self.scans.len()
    }

    /// True when the run has no scans.
    pub fn is_empty(&self) -> bool {
        self.scans.is_empty()
    }
}

/// Scans strictly inside the open retention-time window `(min_time, max_time)`.
///
/// Relies on retention times being non-decreasing within a run.
pub fn time_window(scans: &[Scan], min_time: f64, max_time: f64) -> &[Scan] {
    let start = scans.partition_point(|scan| scan.retention_time <= min_time);
    let end = scans.partition_point(|scan| scan.retention_time < max_time);
    if start >= end {
        return &[];
    }
    &scans[start..end]
}

/// Loads chromatogram files into [`Run`]s.
///
/// Implementations must be deterministic: loading the same id twice yields the
/// same run. Sources are shared across worker threads by the parallel build.
pub trait ScanSource: Sync {
    /// Load every scan of the chromatogram identified by `source`.
    fn load(&self, source: &str) -> Result<Run, SourceError>;
}

/// A [`ScanSource`] over runs already held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    runs: HashMap<String, Run>,
}

impl InMemorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a run under its own source id.
    pub fn insert(&mut self, run: Run) {
        self.runs.insert(run.source.clone(), run);
    }

    /// Builder-style [`InMemorySource::insert`].
    pub fn with_run(mut self, run: Run) -> Self {
        self.insert(run);
        self
    }
}

impl ScanSource for InMemorySource {
    fn load(&self, source: &str) -> Result<Run, SourceError> {
        self.runs
            .get(source)
            .cloned()
            .ok_or_else(|| SourceError::UnknownRun(source.to_string()))
    }
}
