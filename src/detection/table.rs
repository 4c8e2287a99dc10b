//! Multi-compound, multi-file peak table.

use std::collections::HashSet;

use log::info;

use super::locator::{PeakLocator, PeakOutcome, ProminenceSearch};
use super::trace::{DiagnosticTrace, IonWindow};
use crate::error::PipelineError;
use crate::scan::{time_window, Run, ScanSource};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Search window and thresholds for one named compound.
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundWindow {
    /// Compound id, e.g. `C23`
    pub id: String,
    /// Diagnostic m/z window
    pub ions: IonWindow,
    /// Exclusive lower retention-time bound, minutes
    pub min_time: f64,
    /// Exclusive upper retention-time bound, minutes
    pub max_time: f64,
    /// Prominence of the first search pass
    pub prominence: f64,
    /// Minimum peak width in trace samples
    pub min_width: f64,
}

/// Parameters shared by every compound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionParams {
    /// Scans at or before this time are dropped before any window is sliced
    pub start_time: f64,
    /// Prominence floor of the adaptive search
    pub min_prominence: f64,
    /// Prominence decrement between passes
    pub prominence_stride: f64,
    /// Width of the flanking m/z bands in the local-maximum check
    pub local_max_margin: f64,
}

impl DetectionParams {
    /// Reject parameter sets the search cannot run with.
    pub fn validate(&self, compounds: &[CompoundWindow]) -> Result<(), PipelineError> {
        if !(self.prominence_stride > 0.0) {
            return Err(PipelineError::InvalidParameters(format!(
                "prominence stride must be positive, got {}",
                self.prominence_stride
            )));
        }
        if !(self.local_max_margin >= 0.0) {
            return Err(PipelineError::InvalidParameters(format!(
                "local maximum margin must not be negative, got {}",
                self.local_max_margin
            )));
        }

        let mut seen = HashSet::new();
        for compound in compounds {
            if !seen.insert(compound.id.as_str()) {
                return Err(PipelineError::InvalidParameters(format!(
                    "compound {} is listed twice",
                    compound.id
                )));
            }
            if !(compound.ions.min_ion < compound.ions.max_ion) {
                return Err(PipelineError::InvalidParameters(format!(
                    "compound {}: min_ion must be below max_ion",
                    compound.id
                )));
            }
            if !(compound.min_time < compound.max_time) {
                return Err(PipelineError::InvalidParameters(format!(
                    "compound {}: min_time must be below max_time",
                    compound.id
                )));
            }
            if !(compound.min_width > 0.0) {
                return Err(PipelineError::InvalidParameters(format!(
                    "compound {}: width must be positive",
                    compound.id
                )));
            }
        }
        Ok(())
    }

    fn search_for(&self, compound: &CompoundWindow) -> ProminenceSearch {
        ProminenceSearch {
            initial: compound.prominence,
            floor: self.min_prominence,
            stride: self.prominence_stride,
            min_width: compound.min_width,
        }
    }
}

/// Detection result for one (compound, file) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PeakRecord {
    /// Compound id
    pub compound: String,
    /// Source file id
    pub source: String,
    /// Found peak or the reason it is absent
    pub outcome: PeakOutcome,
}

impl PeakRecord {
    /// Apex retention time of a found peak.
    pub fn retention_time(&self) -> Option<f64> {
        self.outcome.found().map(|peak| peak.retention_time)
    }
}

/// One record per (compound, file) pair, in build order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeakTable {
    records: Vec<PeakRecord>,
}

impl PeakTable {
    /// Wrap already built records.
    pub fn new(records: Vec<PeakRecord>) -> Self {
        Self { records }
    }

    /// All records in build order.
    pub fn records(&self) -> &[PeakRecord] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when the table has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct source files in order of first appearance.
    pub fn sources(&self) -> Vec<&str> {
        distinct(self.records.iter().map(|r| r.source.as_str()))
    }

    /// Distinct compounds in order of first appearance.
    pub fn compounds(&self) -> Vec<&str> {
        distinct(self.records.iter().map(|r| r.compound.as_str()))
    }

    /// The record for a (source, compound) pair.
    pub fn get(&self, source: &str, compound: &str) -> Option<&PeakRecord> {
        self.records
            .iter()
            .find(|r| r.source == source && r.compound == compound)
    }

    /// Apex time of a compound in a file, `None` when absent or missing.
    pub fn found_time(&self, source: &str, compound: &str) -> Option<f64> {
        self.get(source, compound).and_then(PeakRecord::retention_time)
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    values.filter(|v| seen.insert(*v)).collect()
}

/// Locate every compound in one loaded run.
pub fn detect_in_run(
    run: &Run,
    compounds: &[CompoundWindow],
    params: &DetectionParams,
) -> Vec<PeakRecord> {
    let scans = run.after(params.start_time);

    compounds
        .iter()
        .map(|compound| {
            let window = time_window(scans, compound.min_time, compound.max_time);
            let trace = DiagnosticTrace::extract(window, &compound.ions);
            let locator = PeakLocator::new(
                compound.ions,
                params.search_for(compound),
                params.local_max_margin,
            );
            let outcome = locator.locate(&trace, window);

            if let PeakOutcome::Absent(reason) = outcome {
                info!("{} not found in {}: {}", compound.id, run.source, reason);
            }

            PeakRecord {
                compound: compound.id.clone(),
                source: run.source.clone(),
                outcome,
            }
        })
        .collect()
}

/// Build the peak table for `files`, loading each through `source`.
///
/// A file that cannot be loaded aborts the build. Absent peaks never do.
pub fn build_peak_table<S: ScanSource + ?Sized>(
    source: &S,
    files: &[String],
    compounds: &[CompoundWindow],
    params: &DetectionParams,
) -> Result<PeakTable, PipelineError> {
    params.validate(compounds)?;
    let total = files.len();

    let detect = |(i, file): (usize, &String)| -> Result<Vec<PeakRecord>, PipelineError> {
        info!("[{}/{}] Detecting peaks in {}", i + 1, total, file);
        let mut run = source.load(file)?;
        run.source.clone_from(file);
        Ok(detect_in_run(&run, compounds, params))
    };

    #[cfg(feature = "parallel")]
    let per_file: Vec<Vec<PeakRecord>> = files
        .par_iter()
        .enumerate()
        .map(detect)
        .collect::<Result<_, _>>()?;

    #[cfg(not(feature = "parallel"))]
    let per_file: Vec<Vec<PeakRecord>> = files
        .iter()
        .enumerate()
        .map(detect)
        .collect::<Result<_, _>>()?;

    let mut records = Vec::with_capacity(total * compounds.len());
    records.extend(per_file.into_iter().flatten());
    Ok(PeakTable::new(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::AbsentReason;
    use crate::scan::{InMemorySource, Scan};

    fn compound(id: &str, min_ion: f64, min_time: f64) -> CompoundWindow {
        CompoundWindow {
            id: id.to_string(),
            ions: IonWindow::new(min_ion, min_ion + 1.0),
            min_time,
            max_time: min_time + 4.0,
            prominence: 250.0,
            min_width: 3.0,
        }
    }

    fn params() -> DetectionParams {
        DetectionParams {
            start_time: 12.0,
            min_prominence: 230.0,
            prominence_stride: 10.0,
            local_max_margin: 2.0,
        }
    }

    /// A run with one Gaussian diagnostic peak at `apex` minutes on `mz`.
    fn run_with_peak(source: &str, mz: f64, apex: f64) -> Run {
        let scans = (0..1200)
            .map(|i| {
                let t = 12.0 + i as f64 * 0.01;
                let x = (t - apex) / 0.04;
                let signal = 20.0 + 2000.0 * (-0.5 * x * x).exp();
                Scan::new(i + 1, t, vec![100.0, mz], vec![50.0, signal])
            })
            .collect();
        Run::new(source, scans)
    }

    #[test]
    fn test_detects_peak_in_window() {
        let run = run_with_peak("a.mzXML", 324.5, 15.0);
        let records = detect_in_run(&run, &[compound("C23", 324.0, 13.0)], &params());

        assert_eq!(records.len(), 1);
        let time = records[0].retention_time().expect("C23 should be found");
        assert!((time - 15.0).abs() < 0.011);
    }

    #[test]
    fn test_empty_trace_yields_absent_record() {
        let run = run_with_peak("a.mzXML", 324.5, 15.0);
        // no ion in 352..353 anywhere in the run
        let records = detect_in_run(&run, &[compound("C25", 352.0, 15.0)], &params());

        assert_eq!(
            records,
            vec![PeakRecord {
                compound: "C25".to_string(),
                source: "a.mzXML".to_string(),
                outcome: PeakOutcome::Absent(AbsentReason::EmptyTrace),
            }]
        );
    }

    #[test]
    fn test_peak_outside_time_window_is_absent() {
        let run = run_with_peak("a.mzXML", 324.5, 20.0);
        let records = detect_in_run(&run, &[compound("C23", 324.0, 13.0)], &params());
        assert!(records[0].outcome.is_absent());
    }

    #[test]
    fn test_build_is_idempotent() {
        let source = InMemorySource::new()
            .with_run(run_with_peak("a.mzXML", 324.5, 15.0))
            .with_run(run_with_peak("b.mzXML", 324.5, 15.3));
        let files = vec!["a.mzXML".to_string(), "b.mzXML".to_string()];
        let compounds = vec![compound("C23", 324.0, 13.0), compound("C25", 352.0, 15.0)];

        let first = build_peak_table(&source, &files, &compounds, &params()).unwrap();
        let second = build_peak_table(&source, &files, &compounds, &params()).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 4);
        assert_eq!(first.sources(), vec!["a.mzXML", "b.mzXML"]);
        assert_eq!(first.compounds(), vec!["C23", "C25"]);
        assert!(first.found_time("b.mzXML", "C23").is_some());
        assert!(first.found_time("b.mzXML", "C25").is_none());
    }

    #[test]
    fn test_unknown_file_aborts_build() {
        let source = InMemorySource::new();
        let files = vec!["missing.mzXML".to_string()];
        let result = build_peak_table(&source, &files, &[compound("C23", 324.0, 13.0)], &params());
        assert!(matches!(result, Err(PipelineError::Source(_))));
    }

    #[test]
    fn test_validate_rejects_bad_parameters() {
        let mut bad_stride = params();
        bad_stride.prominence_stride = 0.0;
        assert!(bad_stride.validate(&[]).is_err());

        let mut inverted = compound("C23", 324.0, 13.0);
        inverted.ions = IonWindow::new(325.0, 324.0);
        assert!(params().validate(&[inverted]).is_err());

        let duplicated = vec![compound("C23", 324.0, 13.0), compound("C23", 324.0, 13.0)];
        assert!(params().validate(&duplicated).is_err());

        assert!(params().validate(&[compound("C23", 324.0, 13.0)]).is_ok());
    }
}
