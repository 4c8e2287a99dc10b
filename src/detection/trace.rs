//! Diagnostic-ion trace extraction.

use crate::scan::Scan;

/// Open m/z interval `(min_ion, max_ion)` fingerprinting a compound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IonWindow {
    /// Exclusive lower m/z bound
    pub min_ion: f64,
    /// Exclusive upper m/z bound
    pub max_ion: f64,
}

impl IonWindow {
    /// Create a window from its exclusive bounds.
    pub fn new(min_ion: f64, max_ion: f64) -> Self {
        Self { min_ion, max_ion }
    }

    /// True when `mz` lies strictly inside the window.
    pub fn contains(&self, mz: f64) -> bool {
        mz > self.min_ion && mz < self.max_ion
    }

    /// True when `mz` lies in one of the two flanking bands of width `around`:
    /// `[min_ion - around, min_ion)` or `(max_ion, max_ion + around]`.
    pub fn in_flanks(&self, mz: f64, around: f64) -> bool {
        (mz >= self.min_ion - around && mz < self.min_ion)
            || (mz > self.max_ion && mz <= self.max_ion + around)
    }
}

/// One sample of a diagnostic trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TracePoint {
    /// Retention time of the scan, minutes
    pub retention_time: f64,
    /// Intensity of the first ion inside the window
    pub intensity: f64,
    /// Index of the scan in the slice the trace was extracted from
    pub scan_index: usize,
}

/// Per-scan diagnostic intensity for one compound in one file.
///
/// Scans without any ion in the window are skipped, so consecutive points
/// may be separated by gaps in retention time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiagnosticTrace {
    points: Vec<TracePoint>,
}

impl DiagnosticTrace {
    /// Extract the trace of `window` from `scans`.
    pub fn extract(scans: &[Scan], window: &IonWindow) -> Self {
        let points = scans
            .iter()
            .enumerate()
            .filter_map(|(scan_index, scan)| {
                scan.ions()
                    .find(|&(mz, _)| window.contains(mz))
                    .map(|(_, intensity)| TracePoint {
                        retention_time: scan.retention_time,
                        intensity,
                        scan_index,
                    })
            })
            .collect();
        Self { points }
    }

    /// All points in scan order.
    pub fn points(&self) -> &[TracePoint] {
        &self.points
    }

    /// Intensities in scan order, the input to peak finding.
    pub fn intensities(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.intensity).collect()
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when no scan had an ion in the window.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
