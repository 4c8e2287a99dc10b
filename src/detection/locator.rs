//! Adaptive-prominence peak location.
//!
//! The locator looks for a compound's elution peak in its diagnostic trace.
//! It starts at a per-compound prominence and lowers the threshold stepwise
//! until something is found or the floor is reached. Candidates must then
//! pass a local-maximum check: at the candidate scan, the strongest ion inside
//! the diagnostic window has to beat every ion in the flanking m/z bands, which
//! rejects detections riding on the shoulder of a neighbouring compound.

use log::trace;

use super::trace::{DiagnosticTrace, IonWindow};
use crate::scan::Scan;
use crate::signal::{find_peaks, Peak, PeakParams};

/// Prominence schedule and width threshold for one compound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProminenceSearch {
    /// Prominence of the first pass
    pub initial: f64,
    /// Passes stop once the prominence falls to or below this floor
    pub floor: f64,
    /// Decrement between passes; must be positive for more than one pass
    pub stride: f64,
    /// Minimum width at half prominence, in trace samples
    pub min_width: f64,
}

/// A detected elution peak.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectedPeak {
    /// Apex retention time, minutes
    pub retention_time: f64,
    /// Diagnostic intensity at the apex
    pub intensity: f64,
    /// Retention time of the left peak bound
    pub left_base: f64,
    /// Retention time of the right peak bound
    pub right_base: f64,
    /// Prominence threshold of the pass that found the peak; NaN for peaks
    /// read back from a saved table
    pub prominence: f64,
}

/// Why a compound was not detected in a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsentReason {
    /// No scan in the time window carried an ion inside the diagnostic window
    EmptyTrace,
    /// The trace contained non-finite intensities
    DegenerateTrace,
    /// No peak survived any pass down to the prominence floor
    BelowProminenceFloor,
    /// Peaks were found but none was the local maximum of its neighbourhood
    NoLocalMaximum,
    /// Read back from a table that only records the all-zero sentinel
    Unrecorded,
}

impl std::fmt::Display for AbsentReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            AbsentReason::EmptyTrace => "no diagnostic ion in the time window",
            AbsentReason::DegenerateTrace => "diagnostic trace has non-finite intensities",
            AbsentReason::BelowProminenceFloor => "no peak above the prominence floor",
            AbsentReason::NoLocalMaximum => "no candidate passed the local-maximum check",
            AbsentReason::Unrecorded => "recorded as not found",
        };
        f.write_str(text)
    }
}

/// Result of locating one compound in one file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PeakOutcome {
    /// The compound's peak
    Found(DetectedPeak),
    /// The compound was not detected
    Absent(AbsentReason),
}

impl PeakOutcome {
    /// The detected peak, if any.
    pub fn found(&self) -> Option<&DetectedPeak> {
        match self {
            PeakOutcome::Found(peak) => Some(peak),
            PeakOutcome::Absent(_) => None,
        }
    }

    /// True for [`PeakOutcome::Absent`].
    pub fn is_absent(&self) -> bool {
        matches!(self, PeakOutcome::Absent(_))
    }
}

/// Locates one compound's peak within a retention-time slice of scans.
#[derive(Debug, Clone, Copy)]
pub struct PeakLocator {
    window: IonWindow,
    search: ProminenceSearch,
    around: f64,
}

impl PeakLocator {
    /// Create a locator for `window`, with flanking bands of width `around`.
    pub fn new(window: IonWindow, search: ProminenceSearch, around: f64) -> Self {
        Self {
            window,
            search,
            around,
        }
    }

    /// Find the compound's peak.
    ///
    /// `scans` must be the slice `trace` was extracted from; the local-maximum
    /// check reads the full spectrum at each candidate's scan.
    pub fn locate(&self, trace: &DiagnosticTrace, scans: &[Scan]) -> PeakOutcome {
        if trace.is_empty() {
            return PeakOutcome::Absent(AbsentReason::EmptyTrace);
        }
        let intensities = trace.intensities();
        if intensities.iter().any(|v| !v.is_finite()) {
            return PeakOutcome::Absent(AbsentReason::DegenerateTrace);
        }

        let mut prominence = self.search.initial;
        loop {
            let params = PeakParams::prominence_and_width(prominence, self.search.min_width);
            let candidates = find_peaks(&intensities, &params);
            if !candidates.is_empty() {
                trace!(
                    "{} candidate(s) at prominence {}",
                    candidates.len(),
                    prominence
                );
                return self.select(&candidates, trace, scans, prominence);
            }

            if self.search.stride <= 0.0 {
                break;
            }
            prominence -= self.search.stride;
            if prominence <= self.search.floor {
                break;
            }
        }

        PeakOutcome::Absent(AbsentReason::BelowProminenceFloor)
    }

    /// First candidate, in retention-time order, that is a local maximum.
    fn select(
        &self,
        candidates: &[Peak],
        trace: &DiagnosticTrace,
        scans: &[Scan],
        prominence: f64,
    ) -> PeakOutcome {
        let points = trace.points();
        let last = points.len() - 1;

        for candidate in candidates {
            let point = points[candidate.index];
            let Some(scan) = scans.get(point.scan_index) else {
                continue;
            };
            if !self.is_local_max(scan) {
                continue;
            }

            // Bounds extend one whole peak width to each side of the apex
            let reach = candidate.width as usize;
            let left = candidate.index.saturating_sub(reach);
            let right = (candidate.index + reach).min(last);

            return PeakOutcome::Found(DetectedPeak {
                retention_time: point.retention_time,
                intensity: point.intensity,
                left_base: points[left].retention_time,
                right_base: points[right].retention_time,
                prominence,
            });
        }

        PeakOutcome::Absent(AbsentReason::NoLocalMaximum)
    }

    /// True when the strongest ion inside the window beats every flanking ion.
    pub fn is_local_max(&self, scan: &Scan) -> bool {
        let mut inside: Option<f64> = None;
        let mut flanks: Option<f64> = None;
        for (mz, intensity) in scan.ions() {
            if self.window.contains(mz) {
                inside = Some(inside.map_or(intensity, |m| m.max(intensity)));
            } else if self.window.in_flanks(mz, self.around) {
                flanks = Some(flanks.map_or(intensity, |m| m.max(intensity)));
            }
        }

        match (inside, flanks) {
            (Some(inside), Some(flanks)) => inside > flanks,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }
}
