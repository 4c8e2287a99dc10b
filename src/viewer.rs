//! Chromatogram and mass-spectrum lookups for an interactive front end.
//!
//! A plot shows the total-ion chromatogram against scan number; picking a
//! point shows that scan's spectrum, and picking a range shows every ion of
//! the scans in it. These are the pure lookups behind those interactions.

use crate::scan::{Run, Scan};

/// One point of the total-ion chromatogram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChromatogramPoint {
    /// Scan number
    pub scan_num: u32,
    /// Retention time, minutes
    pub retention_time: f64,
    /// Summed intensity of the scan
    pub total_intensity: f64,
}

/// The spectrum of a single scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spectrum<'a> {
    /// Scan number
    pub scan_num: u32,
    /// Retention time, minutes
    pub retention_time: f64,
    /// m/z values
    pub mz: &'a [f64],
    /// Intensities, parallel to `mz`
    pub intensity: &'a [f64],
}

impl Spectrum<'_> {
    /// `(m/z, intensity)` pairs.
    pub fn ions(&self) -> Vec<(f64, f64)> {
        self.mz.iter().copied().zip(self.intensity.iter().copied()).collect()
    }
}

/// The spectra of a scan range, concatenated.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// First scan number in the range
    pub first_scan: u32,
    /// Last scan number in the range
    pub last_scan: u32,
    /// Every `(m/z, intensity)` pair of every scan, in scan order
    pub ions: Vec<(f64, f64)>,
    /// Sum of all intensities in `ions`
    pub total_intensity: f64,
}

/// Total-ion chromatogram of one run, indexed for lookups.
#[derive(Debug, Clone)]
pub struct ChromatogramView<'a> {
    scans: &'a [Scan],
    points: Vec<ChromatogramPoint>,
}

impl<'a> ChromatogramView<'a> {
    /// View the scans of `run` after `start_time`, or all of them.
    pub fn from_run(run: &'a Run, start_time: Option<f64>) -> Self {
        let scans = match start_time {
            Some(start_time) => run.after(start_time),
            None => &run.scans[..],
        };
        let points = scans
            .iter()
            .map(|scan| ChromatogramPoint {
                scan_num: scan.num,
                retention_time: scan.retention_time,
                total_intensity: scan.total_intensity(),
            })
            .collect();
        Self { scans, points }
    }

    /// Chromatogram points in scan order.
    pub fn points(&self) -> &[ChromatogramPoint] {
        &self.points
    }

    /// First and last scan numbers in view.
    pub fn scan_range(&self) -> Option<(u32, u32)> {
        Some((self.points.first()?.scan_num, self.points.last()?.scan_num))
    }

    fn position(&self, scan_num: u32) -> Option<usize> {
        // scan numbers are usually consecutive, so try the offset first
        let (first, _) = self.scan_range()?;
        if let Some(guess) = scan_num.checked_sub(first).map(|offset| offset as usize) {
            if self.scans.get(guess).is_some_and(|scan| scan.num == scan_num) {
                return Some(guess);
            }
        }
        self.scans.iter().position(|scan| scan.num == scan_num)
    }

    /// Spectrum of the scan numbered `scan_num`.
    pub fn spectrum_at(&self, scan_num: u32) -> Option<Spectrum<'a>> {
        let scan = &self.scans[self.position(scan_num)?];
        Some(Spectrum {
            scan_num: scan.num,
            retention_time: scan.retention_time,
            mz: &scan.mz,
            intensity: &scan.intensity,
        })
    }

    /// Concatenated spectra of the scans numbered `start..=stop`.
    ///
    /// Bounds may be given in either order and are clamped to the view.
    pub fn select(&self, start: u32, stop: u32) -> Option<Selection> {
        let (low, high) = if start <= stop {
            (start, stop)
        } else {
            (stop, start)
        };
        let in_range: Vec<&Scan> = self
            .scans
            .iter()
            .filter(|scan| scan.num >= low && scan.num <= high)
            .collect();
        let (first, last) = (in_range.first()?, in_range.last()?);

        let ions: Vec<(f64, f64)> = in_range.iter().flat_map(|scan| scan.ions()).collect();
        let total_intensity = ions.iter().map(|(_, intensity)| intensity).sum();
        Some(Selection {
            first_scan: first.num,
            last_scan: last.num,
            ions,
            total_intensity,
        })
    }

    /// Scan number closest in retention time to `time`; ties go to the earlier scan.
    pub fn nearest_scan(&self, time: f64) -> Option<u32> {
        let after = self
            .points
            .partition_point(|point| point.retention_time < time);
        let candidates = [after.checked_sub(1), Some(after)];
        candidates
            .into_iter()
            .flatten()
            .filter_map(|i| self.points.get(i))
            .min_by(|a, b| {
                let da = (a.retention_time - time).abs();
                let db = (b.retention_time - time).abs();
                da.total_cmp(&db)
            })
            .map(|point| point.scan_num)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run() -> Run {
        let scans = (0..5u32)
            .map(|i| {
                Scan::new(
                    101 + i,
                    12.0 + f64::from(i) * 0.5,
                    vec![100.0, 200.0 + f64::from(i)],
                    vec![1.0, f64::from(i)],
                )
            })
            .collect();
        Run::new("a.mzXML", scans)
    }

    #[test]
    fn test_points_follow_start_time() {
        let run = run();
        let view = ChromatogramView::from_run(&run, Some(12.5));
        assert_eq!(view.points().len(), 3);
        assert_eq!(view.scan_range(), Some((103, 105)));
        assert!((view.points()[0].total_intensity - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_spectrum_at_scan_number() {
        let run = run();
        let view = ChromatogramView::from_run(&run, None);
        let spectrum = view.spectrum_at(103).unwrap();
        assert_eq!(spectrum.ions(), vec![(100.0, 1.0), (202.0, 2.0)]);
        assert!((spectrum.retention_time - 13.0).abs() < 1e-12);
        assert!(view.spectrum_at(99).is_none());
        assert!(view.spectrum_at(200).is_none());
    }

    #[test]
    fn test_spectrum_at_with_gaps_in_numbering() {
        let scans = vec![
            Scan::new(1, 12.0, vec![50.0], vec![1.0]),
            Scan::new(4, 12.1, vec![60.0], vec![2.0]),
        ];
        let run = Run::new("gaps.mzXML", scans);
        let view = ChromatogramView::from_run(&run, None);
        assert_eq!(view.spectrum_at(4).unwrap().mz, &[60.0]);
    }

    #[test]
    fn test_select_concatenates_range() {
        let run = run();
        let view = ChromatogramView::from_run(&run, None);
        let selection = view.select(104, 102).unwrap();
        assert_eq!(selection.first_scan, 102);
        assert_eq!(selection.last_scan, 104);
        assert_eq!(selection.ions.len(), 6);
        assert!((selection.total_intensity - 9.0).abs() < 1e-12);
        assert!(view.select(1, 50).is_none());
    }

    #[test]
    fn test_nearest_scan() {
        let run = run();
        let view = ChromatogramView::from_run(&run, None);
        assert_eq!(view.nearest_scan(11.0), Some(101));
        assert_eq!(view.nearest_scan(12.6), Some(102));
        assert_eq!(view.nearest_scan(12.8), Some(103));
        assert_eq!(view.nearest_scan(12.75), Some(102));
        assert_eq!(view.nearest_scan(99.0), Some(105));
    }
}
