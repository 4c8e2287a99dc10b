//! # gcms-align - Diagnostic-ion peak detection and chromatogram alignment
//!
//! `gcms_align` locates named compounds in GC-MS chromatograms by their
//! diagnostic ions, fits a linear retention-time map from each chromatogram
//! onto a reference, and produces aligned, baseline-corrected, normalized
//! total-ion traces that can be compared across runs.
//!
//! ## Pipeline
//!
//! 1. Load each file into a [`scan::Run`] through a [`scan::ScanSource`]
//!    ([`mzxml::MzXmlSource`] for mzXML files)
//! 2. [`detection::build_peak_table`]: for every compound in every file, find
//!    its elution peak with an adaptive-prominence search
//! 3. [`alignment::estimate_alignments`]: fit
//!    `reference time = slope * time + intercept` per file from the compounds
//!    found in both it and the reference
//! 4. [`alignment::align_traces`]: apply the fit to every scan, subtract an
//!    optional blank-run baseline and normalize
//! 5. [`output`]: write `peaks.csv`, `regressions.csv` and `traces.csv`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gcms_align::prelude::*;
//!
//! let files = vec!["sample_a.mzXML".to_string(), "sample_b.mzXML".to_string()];
//! let compounds = vec![CompoundWindow {
//!     id: "C23".to_string(),
//!     ions: IonWindow::new(324.0, 325.0),
//!     min_time: 13.0,
//!     max_time: 17.0,
//!     prominence: 250.0,
//!     min_width: 3.0,
//! }];
//! let params = DetectionParams {
//!     start_time: 12.0,
//!     min_prominence: 230.0,
//!     prominence_stride: 10.0,
//!     local_max_margin: 2.0,
//! };
//!
//! let table = build_peak_table(&MzXmlSource, &files, &compounds, &params)?;
//! let regressions = estimate_alignments(&table, "sample_a.mzXML")?;
//! for record in &regressions {
//!     println!("{}: {:?}", record.source, record.fit);
//! }
//! # Ok::<(), gcms_align::error::PipelineError>(())
//! ```
//!
//! ## Architecture
//!
//! - [`scan`]: scan/run data model and the reader trait
//! - [`mzxml`]: streaming mzXML reader
//! - [`signal`]: prominence and width peak finding
//! - [`detection`]: diagnostic traces, peak location, the peak table
//! - [`alignment`]: regression, baseline estimation, trace normalization
//! - [`viewer`]: chromatogram and spectrum lookups for plotting front ends
//! - [`output`]: CSV tables

#![warn(missing_docs)]

pub mod alignment;
pub mod detection;
pub mod error;
#[cfg(feature = "mzxml")]
pub mod mzxml;
pub mod output;
pub mod scan;
pub mod signal;
pub mod viewer;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::alignment::{
        align, align_traces, estimate_alignments, AlignmentFit, AlignmentOutput, AlignmentParams,
        BaselineMap, BaselineParams, LinearMap, RegressionRecord, TraceParams, TraceRecord,
    };
    pub use crate::detection::{
        build_peak_table, CompoundWindow, DetectionParams, IonWindow, PeakOutcome, PeakRecord,
        PeakTable,
    };
    pub use crate::error::{PipelineError, SourceError};
    #[cfg(feature = "mzxml")]
    pub use crate::mzxml::MzXmlSource;
    pub use crate::scan::{InMemorySource, Run, Scan, ScanSource};
    pub use crate::viewer::ChromatogramView;
}
