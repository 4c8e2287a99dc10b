//! Aligned, baseline-corrected, normalized total-ion traces.

use std::collections::HashMap;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::baseline::{estimate_baseline, BaselineParams};
use super::regression::{AlignmentFit, RegressionRecord};
use crate::error::PipelineError;
use crate::scan::ScanSource;

/// Placeholder accepted in place of a blank file name.
pub const NO_BASELINE: &str = "NA";

/// Cutoffs for trace construction, minutes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceParams {
    /// The normalization maximum is taken over scans strictly after this time
    pub normalization_time: f64,
    /// Scans at or before this time are dropped
    pub start_time: f64,
}

/// Which blank run provides the baseline for each sample file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaselineMap {
    blanks: HashMap<String, String>,
}

impl BaselineMap {
    /// An empty mapping: no file is baseline-corrected.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `blank` as the baseline of `file`.
    pub fn insert(&mut self, file: impl Into<String>, blank: impl Into<String>) {
        self.blanks.insert(file.into(), blank.into());
    }

    /// The blank mapped to `file`, if any (`NA` counts as none).
    pub fn blank_for(&self, file: &str) -> Option<&str> {
        self.blanks
            .get(file)
            .map(String::as_str)
            .filter(|blank| *blank != NO_BASELINE)
    }
}

impl FromIterator<(String, String)> for BaselineMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            blanks: iter.into_iter().collect(),
        }
    }
}

/// One scan of an aligned file; also the row layout of `traces.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    /// Raw retention time, minutes
    pub retention_time: f64,
    /// Total ion intensity of the scan
    pub raw_intensity: f64,
    /// Source file id
    pub source: String,
    /// Slope of the file's alignment
    pub slope: f64,
    /// Intercept of the file's alignment
    pub intercept: f64,
    /// r² of the file's alignment
    pub r_squared: f64,
    /// Baseline-subtracted intensity scaled to the post-cutoff maximum
    pub normalized_intensity: f64,
    /// Retention time on the reference timeline
    pub aligned_retention_time: f64,
}

/// Baseline-subtract, floor and scale a total-ion trace.
///
/// The scale is the maximum of the floored trace over scans after
/// `normalization_time`, so that region spans `[0, 1]` while earlier scans
/// may exceed 1. Without any post-cutoff scan the whole-trace maximum is used.
/// A flat trace normalizes to zeros.
pub fn normalize(
    totals: &[f64],
    baseline: &[f64],
    times: &[f64],
    normalization_time: f64,
) -> Vec<f64> {
    let mut corrected: Vec<f64> = totals
        .iter()
        .zip(baseline)
        .map(|(total, base)| total - base)
        .collect();

    let floor = corrected.iter().copied().fold(f64::INFINITY, f64::min);
    if floor.is_finite() {
        corrected.iter_mut().for_each(|v| *v -= floor);
    }

    let post_cutoff = corrected
        .iter()
        .zip(times)
        .filter(|(_, &t)| t > normalization_time)
        .map(|(v, _)| *v)
        .fold(None, |max: Option<f64>, v| Some(max.map_or(v, |m| m.max(v))));

    let scale = match post_cutoff {
        Some(scale) => scale,
        None => {
            warn!(
                "No scan after the normalization time {}; scaling to the whole trace",
                normalization_time
            );
            corrected.iter().copied().fold(0.0, f64::max)
        }
    };

    if scale == 0.0 {
        return vec![0.0; corrected.len()];
    }
    corrected.into_iter().map(|v| v / scale).collect()
}

/// Truncate `baseline` to `len`, or extend it with its last value.
pub fn fit_baseline_length(mut baseline: Vec<f64>, len: usize) -> Vec<f64> {
    let edge = baseline.last().copied().unwrap_or(0.0);
    baseline.resize(len, edge);
    baseline
}

/// Build the aligned traces of every file that was not skipped.
///
/// Each blank run is loaded and smoothed once, however many files share it.
pub fn align_traces<S: ScanSource + ?Sized>(
    source: &S,
    regressions: &[RegressionRecord],
    baselines: &BaselineMap,
    params: &TraceParams,
    baseline_params: &BaselineParams,
) -> Result<Vec<TraceRecord>, PipelineError> {
    let mut cache: HashMap<String, Vec<f64>> = HashMap::new();
    let mut records = Vec::new();
    let total = regressions.len();

    for (i, regression) in regressions.iter().enumerate() {
        let map = match &regression.fit {
            AlignmentFit::Fit(map) => *map,
            AlignmentFit::Skip { .. } => {
                info!(
                    "[{}/{}] Leaving {} out of the aligned traces",
                    i + 1,
                    total,
                    regression.source
                );
                continue;
            }
        };
        info!("[{}/{}] Aligning {}", i + 1, total, regression.source);

        let run = source.load(&regression.source)?;
        let scans = run.after(params.start_time);
        let totals: Vec<f64> = scans.iter().map(|scan| scan.total_intensity()).collect();
        let times: Vec<f64> = scans.iter().map(|scan| scan.retention_time).collect();

        let baseline = match baselines.blank_for(&regression.source) {
            Some(blank) => {
                if !cache.contains_key(blank) {
                    let blank_run = source.load(blank)?;
                    let computed =
                        estimate_baseline(&blank_run, params.start_time, baseline_params)
                            .map_err(|source| PipelineError::Baseline {
                                path: blank.to_string(),
                                source,
                            })?;
                    cache.insert(blank.to_string(), computed);
                }
                let cached = cache.get(blank).cloned().unwrap_or_default();
                if cached.len() != totals.len() {
                    warn!(
                        "Baseline from {} has {} scans, {} has {}; resizing",
                        blank,
                        cached.len(),
                        regression.source,
                        totals.len()
                    );
                }
                fit_baseline_length(cached, totals.len())
            }
            None => vec![0.0; totals.len()],
        };

        let normalized = normalize(&totals, &baseline, &times, params.normalization_time);
        records.reserve(scans.len());
        for ((&retention_time, &raw_intensity), normalized_intensity) in
            times.iter().zip(&totals).zip(normalized)
        {
            records.push(TraceRecord {
                retention_time,
                raw_intensity,
                source: regression.source.clone(),
                slope: map.slope,
                intercept: map.intercept,
                r_squared: map.r_squared,
                normalized_intensity,
                aligned_retention_time: map.apply(retention_time),
            });
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::LinearMap;
    use crate::scan::{InMemorySource, Run, Scan};

    fn run(source: &str, totals: &[f64]) -> Run {
        let scans = totals
            .iter()
            .enumerate()
            .map(|(i, &total)| {
                Scan::new(i as u32 + 1, 12.0 + i as f64 * 0.1, vec![100.0], vec![total])
            })
            .collect();
        Run::new(source, scans)
    }

    fn fitted(source: &str, map: LinearMap) -> RegressionRecord {
        RegressionRecord {
            source: source.to_string(),
            fit: AlignmentFit::Fit(map),
            matched: Vec::new(),
        }
    }

    fn trace_params() -> TraceParams {
        TraceParams {
            normalization_time: 13.0,
            start_time: 12.0,
        }
    }

    fn baseline_params() -> BaselineParams {
        BaselineParams {
            start_delay: 0,
            num_extrapolate: 2,
            window: 3,
            kernel_width: 1.0,
            kernel_power: 1.0,
        }
    }

    #[test]
    fn test_normalize_bounds_post_cutoff_region() {
        let totals = [50.0, 900.0, 10.0, 20.0, 400.0, 30.0];
        let times = [12.5, 12.9, 13.1, 13.2, 13.3, 13.4];
        let normalized = normalize(&totals, &[0.0; 6], &times, 13.0);

        let post: Vec<f64> = normalized[2..].to_vec();
        let max = post.iter().copied().fold(f64::MIN, f64::max);
        assert!((max - 1.0).abs() < 1e-12);
        assert!(post.iter().all(|&v| (0.0..=1.0 + 1e-12).contains(&v)));
        // before the cutoff values may exceed one
        assert!(normalized[1] > 1.0);
        assert_eq!(normalized[2], 0.0);
    }

    #[test]
    fn test_normalize_subtracts_baseline() {
        let totals = [10.0, 20.0, 30.0];
        let baseline = [5.0, 5.0, 25.0];
        let normalized = normalize(&totals, &baseline, &[14.0, 15.0, 16.0], 13.0);
        // corrected 5, 15, 5 -> floored 0, 10, 0
        assert_eq!(normalized, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_normalize_flat_trace_is_zero() {
        let normalized = normalize(&[7.0, 7.0], &[0.0, 0.0], &[14.0, 15.0], 13.0);
        assert_eq!(normalized, vec![0.0, 0.0]);
    }

    #[test]
    fn test_fit_baseline_length() {
        assert_eq!(fit_baseline_length(vec![1.0, 2.0, 3.0], 2), vec![1.0, 2.0]);
        assert_eq!(fit_baseline_length(vec![1.0, 2.0], 4), vec![1.0, 2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_baseline_map_treats_na_as_none() {
        let mut map = BaselineMap::new();
        map.insert("a.mzXML", "blank.mzXML");
        map.insert("b.mzXML", NO_BASELINE);
        assert_eq!(map.blank_for("a.mzXML"), Some("blank.mzXML"));
        assert_eq!(map.blank_for("b.mzXML"), None);
        assert_eq!(map.blank_for("c.mzXML"), None);
    }

    #[test]
    fn test_skipped_file_has_no_trace() {
        let source = InMemorySource::new()
            .with_run(run("ref.mzXML", &[1.0, 2.0, 3.0]))
            .with_run(run("cmp.mzXML", &[1.0, 2.0, 3.0]));
        let regressions = vec![
            fitted("ref.mzXML", LinearMap::IDENTITY),
            RegressionRecord {
                source: "cmp.mzXML".to_string(),
                fit: AlignmentFit::Skip {
                    missing: vec!["C23".to_string()],
                },
                matched: Vec::new(),
            },
        ];

        let traces = align_traces(
            &source,
            &regressions,
            &BaselineMap::new(),
            &trace_params(),
            &baseline_params(),
        )
        .unwrap();

        // the scan at exactly 12.0 is dropped
        assert_eq!(traces.len(), 2);
        assert!(traces.iter().all(|t| t.source == "ref.mzXML"));
    }

    #[test]
    fn test_aligned_time_applies_map() {
        let source = InMemorySource::new().with_run(run("cmp.mzXML", &[1.0, 5.0, 2.0, 4.0]));
        let map = LinearMap {
            slope: 2.0,
            intercept: -1.0,
            r_squared: 0.99,
        };
        let traces = align_traces(
            &source,
            &[fitted("cmp.mzXML", map)],
            &BaselineMap::new(),
            &trace_params(),
            &baseline_params(),
        )
        .unwrap();

        for trace in &traces {
            let expected = trace.retention_time * 2.0 - 1.0;
            assert!((trace.aligned_retention_time - expected).abs() < 1e-12);
            assert_eq!(trace.r_squared, 0.99);
        }
    }

    #[test]
    fn test_shared_blank_is_applied() {
        let totals: Vec<f64> = (0..20).map(|i| 100.0 + f64::from(i)).collect();
        let source = InMemorySource::new()
            .with_run(run("a.mzXML", &totals))
            .with_run(run("b.mzXML", &totals))
            .with_run(run("blank.mzXML", &vec![10.0; 20]));
        let baselines: BaselineMap = [
            ("a.mzXML".to_string(), "blank.mzXML".to_string()),
            ("b.mzXML".to_string(), "blank.mzXML".to_string()),
        ]
        .into_iter()
        .collect();

        let traces = align_traces(
            &source,
            &[
                fitted("a.mzXML", LinearMap::IDENTITY),
                fitted("b.mzXML", LinearMap::IDENTITY),
            ],
            &baselines,
            &trace_params(),
            &baseline_params(),
        )
        .unwrap();

        assert_eq!(traces.len(), 38);
        let normalized_of = |source: &str| -> Vec<f64> {
            traces
                .iter()
                .filter(|t| t.source == source)
                .map(|t| t.normalized_intensity)
                .collect()
        };
        let a = normalized_of("a.mzXML");
        let b = normalized_of("b.mzXML");
        assert_eq!(a, b);
        assert!((a.last().copied().unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_blank_aborts() {
        let source = InMemorySource::new().with_run(run("a.mzXML", &[1.0; 10]));
        let mut baselines = BaselineMap::new();
        baselines.insert("a.mzXML", "missing.mzXML");
        let result = align_traces(
            &source,
            &[fitted("a.mzXML", LinearMap::IDENTITY)],
            &baselines,
            &trace_params(),
            &baseline_params(),
        );
        assert!(result.is_err());
    }
}
