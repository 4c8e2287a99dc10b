//! Compound peak detection
//!
//! Detection runs per (file, compound) pair in three steps:
//!
//! 1. [`DiagnosticTrace::extract`] pulls one intensity per scan from the
//!    compound's diagnostic m/z window, inside its retention-time window
//! 2. [`PeakLocator`] runs the adaptive-prominence search over that trace and
//!    applies the local-maximum check
//! 3. [`build_peak_table`] repeats this for every compound in every file
//!
//! A compound that is not found is an [`PeakOutcome::Absent`] value with its
//! [`AbsentReason`], never an error.

mod locator;
mod table;
mod trace;

pub use locator::{AbsentReason, DetectedPeak, PeakLocator, PeakOutcome, ProminenceSearch};
pub use table::{
    build_peak_table, detect_in_run, CompoundWindow, DetectionParams, PeakRecord, PeakTable,
};
pub use trace::{DiagnosticTrace, IonWindow, TracePoint};
