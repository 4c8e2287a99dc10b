//! Pairwise retention-time alignment.
//!
//! Each comparison file is mapped onto the reference timeline with
//! `reference = slope * comparison + intercept`, fitted on the apex times of
//! the compounds found in both files.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::detection::PeakTable;
use crate::error::PipelineError;

/// Linear retention-time map onto the reference timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearMap {
    /// Multiplier applied to comparison times
    pub slope: f64,
    /// Offset added after scaling, minutes
    pub intercept: f64,
    /// Coefficient of determination over the fitted pairs
    pub r_squared: f64,
}

impl LinearMap {
    /// The map assigned to the reference file.
    pub const IDENTITY: LinearMap = LinearMap {
        slope: 1.0,
        intercept: 0.0,
        r_squared: 1.0,
    };

    /// Map a comparison retention time onto the reference timeline.
    pub fn apply(&self, retention_time: f64) -> f64 {
        retention_time * self.slope + self.intercept
    }
}

/// Outcome of aligning one file.
#[derive(Debug, Clone, PartialEq)]
pub enum AlignmentFit {
    /// A usable map
    Fit(LinearMap),
    /// No compound was found in both files; the file is left out of the traces
    Skip {
        /// Compounds absent from the reference, the comparison, or both
        missing: Vec<String>,
    },
}

impl AlignmentFit {
    /// The map, unless the file was skipped.
    pub fn map(&self) -> Option<&LinearMap> {
        match self {
            AlignmentFit::Fit(map) => Some(map),
            AlignmentFit::Skip { .. } => None,
        }
    }
}

/// Apex times of one compound found in both files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedTime {
    /// Compound id
    pub compound: String,
    /// Apex time in the reference file
    pub reference: f64,
    /// Apex time in the comparison file
    pub comparison: f64,
}

/// Alignment of one source file against the reference.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionRecord {
    /// Source file id
    pub source: String,
    /// Fitted map or skip
    pub fit: AlignmentFit,
    /// The pairs the map was fitted on
    pub matched: Vec<MatchedTime>,
}

/// Fit `reference = slope * comparison + intercept` on matched times.
///
/// One pair gives the ratio of the two times with no intercept. Two or more
/// pairs give ordinary least squares; if every comparison time is equal the
/// slope is undefined and the ratio of the means is used instead.
pub fn fit_linear_map(matched: &[MatchedTime]) -> Option<LinearMap> {
    match matched {
        [] => None,
        [only] => Some(LinearMap {
            slope: only.reference / only.comparison,
            intercept: 0.0,
            r_squared: 1.0,
        }),
        pairs => {
            let n = pairs.len() as f64;
            let mean_x = pairs.iter().map(|p| p.comparison).sum::<f64>() / n;
            let mean_y = pairs.iter().map(|p| p.reference).sum::<f64>() / n;

            let sxx: f64 = pairs.iter().map(|p| (p.comparison - mean_x).powi(2)).sum();
            let sxy: f64 = pairs
                .iter()
                .map(|p| (p.comparison - mean_x) * (p.reference - mean_y))
                .sum();

            // Equal comparison times leave the slope undefined
            let (slope, intercept) = if sxx == 0.0 {
                (mean_y / mean_x, 0.0)
            } else {
                let slope = sxy / sxx;
                (slope, mean_y - slope * mean_x)
            };

            Some(LinearMap {
                slope,
                intercept,
                r_squared: r_squared(pairs, slope, intercept, mean_y),
            })
        }
    }
}

/// Coefficient of determination of `slope * comparison + intercept`.
///
/// A sample with no variance scores 1 when the line passes through every
/// point and 0 otherwise.
fn r_squared(pairs: &[MatchedTime], slope: f64, intercept: f64, mean_y: f64) -> f64 {
    let ss_res: f64 = pairs
        .iter()
        .map(|p| (p.reference - (slope * p.comparison + intercept)).powi(2))
        .sum();
    let ss_tot: f64 = pairs.iter().map(|p| (p.reference - mean_y).powi(2)).sum();
    if ss_tot == 0.0 {
        if ss_res == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / ss_tot
    }
}

/// Align `comparison` against `reference` using every compound in the table.
///
/// A compound missing from either file, or present but absent, is left out
/// of the fit.
pub fn estimate_alignment(table: &PeakTable, reference: &str, comparison: &str) -> RegressionRecord {
    let mut matched = Vec::new();
    let mut missing = Vec::new();

    for compound in table.compounds() {
        match (
            table.found_time(reference, compound),
            table.found_time(comparison, compound),
        ) {
            (Some(reference), Some(comparison)) => matched.push(MatchedTime {
                compound: compound.to_string(),
                reference,
                comparison,
            }),
            _ => missing.push(compound.to_string()),
        }
    }

    let fit = match fit_linear_map(&matched) {
        Some(map) => {
            debug!(
                "{}: slope {:.6}, intercept {:.6}, r² {:.4} from {} pair(s)",
                comparison,
                map.slope,
                map.intercept,
                map.r_squared,
                matched.len()
            );
            AlignmentFit::Fit(map)
        }
        None => {
            warn!(
                "Skipping {}: no compound found in both it and {} (missing: {})",
                comparison,
                reference,
                missing.join(", ")
            );
            AlignmentFit::Skip { missing }
        }
    };

    RegressionRecord {
        source: comparison.to_string(),
        fit,
        matched,
    }
}

/// Align every file in the table against `reference`.
///
/// Records follow the table's file order. The reference gets the identity map
/// without a fit.
pub fn estimate_alignments(
    table: &PeakTable,
    reference: &str,
) -> Result<Vec<RegressionRecord>, PipelineError> {
    let sources = table.sources();
    if !sources.contains(&reference) {
        return Err(PipelineError::ReferenceMissing(reference.to_string()));
    }

    Ok(sources
        .into_iter()
        .map(|source| {
            if source == reference {
                RegressionRecord {
                    source: source.to_string(),
                    fit: AlignmentFit::Fit(LinearMap::IDENTITY),
                    matched: Vec::new(),
                }
            } else {
                estimate_alignment(table, reference, source)
            }
        })
        .collect())
}
