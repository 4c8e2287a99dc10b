//! Retention-time alignment and trace normalization
//!
//! Given a [`PeakTable`], alignment proceeds as:
//!
//! 1. [`estimate_alignments`] fits a [`LinearMap`] per file onto the reference
//!    timeline, or marks the file skipped when no compound pairs up
//! 2. [`align_traces`] loads every non-skipped file, subtracts the optional
//!    blank-run baseline, normalizes, and maps each scan onto the reference
//!    timeline

mod baseline;
mod regression;
mod traces;

pub use baseline::{
    baseline_from_totals, estimate_baseline, general_gaussian, weighted_rolling_mean,
    BaselineError, BaselineParams,
};
pub use regression::{
    estimate_alignment, estimate_alignments, fit_linear_map, AlignmentFit, LinearMap,
    MatchedTime, RegressionRecord,
};
pub use traces::{
    align_traces, fit_baseline_length, normalize, BaselineMap, TraceParams, TraceRecord,
    NO_BASELINE,
};

use crate::detection::PeakTable;
use crate::error::PipelineError;
use crate::scan::ScanSource;

/// Everything alignment needs besides the peak table.
#[derive(Debug, Clone)]
pub struct AlignmentParams {
    /// Source id of the reference file
    pub reference: String,
    /// Blank run per sample file
    pub baselines: BaselineMap,
    /// Trace cutoffs
    pub traces: TraceParams,
    /// Baseline smoother
    pub baseline: BaselineParams,
}

/// Regression and trace tables of one alignment.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentOutput {
    /// One record per file in the peak table
    pub regressions: Vec<RegressionRecord>,
    /// One record per scan of every non-skipped file
    pub traces: Vec<TraceRecord>,
}

/// Fit every file against the reference, then build the aligned traces.
pub fn align<S: ScanSource + ?Sized>(
    source: &S,
    table: &PeakTable,
    params: &AlignmentParams,
) -> Result<AlignmentOutput, PipelineError> {
    params
        .baseline
        .validate()
        .map_err(|e| PipelineError::InvalidParameters(e.to_string()))?;

    let regressions = estimate_alignments(table, &params.reference)?;
    let traces = align_traces(
        source,
        &regressions,
        &params.baselines,
        &params.traces,
        &params.baseline,
    )?;

    Ok(AlignmentOutput {
        regressions,
        traces,
    })
}
