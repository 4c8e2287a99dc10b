//! 1D peak finding for diagnostic-ion traces.
//!
//! Follows `scipy.signal.find_peaks` with `prominence` and `width` filters:
//!
//! 1. Local maxima, with flat plateaus reduced to their (left-biased) midpoint
//! 2. Prominence: height above the higher of the two surrounding minima, where
//!    each side is searched until a strictly higher sample or the edge
//! 3. Width at half prominence, linearly interpolated and bounded by the bases
//! 4. Threshold filters
//!
//! Positions are sample indices, never retention times, so traces with gaps
//! are handled the same as dense ones.

/// Detected peak with its properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Peak {
    /// Index of the peak in the input array.
    pub index: usize,
    /// Height (value at the peak index).
    pub height: f64,
    /// Prominence: height above the higher surrounding valley.
    pub prominence: f64,
    /// Left valley index (base of prominence calculation).
    pub left_base: usize,
    /// Right valley index (base of prominence calculation).
    pub right_base: usize,
    /// Width at half-prominence (in index units, may be fractional).
    pub width: f64,
    /// Left interpolated position of the half-prominence crossing.
    pub left_ips: f64,
    /// Right interpolated position of the half-prominence crossing.
    pub right_ips: f64,
}

/// Thresholds for peak detection. `None` disables a filter.
#[derive(Debug, Clone, Default)]
pub struct PeakParams {
    /// Minimum peak height (absolute).
    pub min_height: Option<f64>,
    /// Minimum prominence.
    pub min_prominence: Option<f64>,
    /// Minimum width at half-prominence (index units).
    pub min_width: Option<f64>,
}

impl PeakParams {
    /// Prominence and width thresholds, as used by the adaptive search.
    pub fn prominence_and_width(min_prominence: f64, min_width: f64) -> Self {
        Self {
            min_height: None,
            min_prominence: Some(min_prominence),
            min_width: Some(min_width),
        }
    }
}

/// Detect peaks in a 1D signal.
///
/// Returns peaks sorted by index. Signals shorter than three samples have no
/// interior maxima and yield an empty result.
#[must_use]
pub fn find_peaks(data: &[f64], params: &PeakParams) -> Vec<Peak> {
    let mut candidates = local_maxima(data);

    if let Some(min_h) = params.min_height {
        candidates.retain(|&idx| data[idx] >= min_h);
    }

    let mut peaks: Vec<Peak> = candidates
        .into_iter()
        .map(|idx| compute_peak_properties(data, idx))
        .collect();

    if let Some(min_p) = params.min_prominence {
        peaks.retain(|p| p.prominence >= min_p);
    }
    if let Some(min_w) = params.min_width {
        peaks.retain(|p| p.width >= min_w);
    }

    peaks
}

/// Indices of local maxima; plateaus report their midpoint.
fn local_maxima(data: &[f64]) -> Vec<usize> {
    let mut maxima = Vec::new();
    if data.len() < 3 {
        return maxima;
    }

    let i_max = data.len() - 1;
    let mut i = 1;
    while i < i_max {
        if data[i - 1] < data[i] {
            let mut i_ahead = i + 1;
            while i_ahead < i_max && data[i_ahead] == data[i] {
                i_ahead += 1;
            }
            if data[i_ahead] < data[i] {
                let left_edge = i;
                let right_edge = i_ahead - 1;
                maxima.push((left_edge + right_edge) / 2);
                i = i_ahead;
            }
        }
        i += 1;
    }

    maxima
}

/// Compute prominence and width for a single peak.
fn compute_peak_properties(data: &[f64], peak_idx: usize) -> Peak {
    let height = data[peak_idx];

    // Walk left while samples do not exceed the peak, tracking the minimum
    let mut left_min = height;
    let mut left_base = peak_idx;
    let mut i = peak_idx;
    loop {
        if data[i] > height {
            break;
        }
        if data[i] < left_min {
            left_min = data[i];
            left_base = i;
        }
        if i == 0 {
            break;
        }
        i -= 1;
    }

    let mut right_min = height;
    let mut right_base = peak_idx;
    for (i, &val) in data.iter().enumerate().skip(peak_idx) {
        if val > height {
            break;
        }
        if val < right_min {
            right_min = val;
            right_base = i;
        }
    }

    let prominence = height - left_min.max(right_min);

    let half_height = height - prominence / 2.0;
    let (left_ips, right_ips) =
        half_height_crossings(data, peak_idx, half_height, left_base, right_base);

    Peak {
        index: peak_idx,
        height,
        prominence,
        left_base,
        right_base,
        width: right_ips - left_ips,
        left_ips,
        right_ips,
    }
}

/// Interpolated positions where the signal drops to `threshold` on each side,
/// searched no further than the prominence bases.
#[allow(clippy::cast_precision_loss)] // trace lengths are far below 2^53
fn half_height_crossings(
    data: &[f64],
    peak_idx: usize,
    threshold: f64,
    left_base: usize,
    right_base: usize,
) -> (f64, f64) {
    let mut i = peak_idx;
    while left_base < i && threshold < data[i] {
        i -= 1;
    }
    let mut left_ips = i as f64;
    if data[i] < threshold {
        left_ips += (threshold - data[i]) / (data[i + 1] - data[i]);
    }

    let mut i = peak_idx;
    while i < right_base && threshold < data[i] {
        i += 1;
    }
    let mut right_ips = i as f64;
    if data[i] < threshold {
        right_ips -= (threshold - data[i]) / (data[i - 1] - data[i]);
    }

    (left_ips, right_ips)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_peak() {
        let data = [0.0, 1.0, 3.0, 1.0, 0.0];
        let peaks = find_peaks(&data, &PeakParams::default());
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].index, 2);
        assert!((peaks[0].prominence - 3.0).abs() < f64::EPSILON);
        assert_eq!(peaks[0].left_base, 0);
        assert_eq!(peaks[0].right_base, 4);
        // half height 1.5 crosses at 1.25 and 2.75
        assert!((peaks[0].width - 1.5).abs() < 1e-12);
    }

    #[test]
    fn prominence_uses_higher_valley() {
        let data = [0.0, 5.0, 4.0, 4.5, 0.0];
        let peaks = find_peaks(&data, &PeakParams::default());
        assert_eq!(peaks.len(), 2);
        assert!((peaks[0].prominence - 5.0).abs() < 1e-12);
        assert!((peaks[1].prominence - 0.5).abs() < 1e-12);
        assert_eq!(peaks[1].left_base, 2);

        let params = PeakParams {
            min_prominence: Some(2.0),
            ..PeakParams::default()
        };
        let peaks = find_peaks(&data, &params);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].index, 1);
    }

    #[test]
    fn width_filter() {
        let data = [0.0, 0.0, 5.0, 0.0, 0.0];
        let params = PeakParams {
            min_width: Some(2.0),
            ..PeakParams::default()
        };
        assert!(find_peaks(&data, &params).is_empty());
    }

    #[test]
    fn plateau_reports_left_biased_midpoint() {
        let data = [0.0, 1.0, 3.0, 3.0, 3.0, 3.0, 1.0, 0.0];
        let peaks = find_peaks(&data, &PeakParams::default());
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].index, 3);
    }

    #[test]
    fn plateau_at_edge_is_not_a_peak() {
        let data = [0.0, 1.0, 3.0, 3.0, 3.0];
        assert!(find_peaks(&data, &PeakParams::default()).is_empty());
    }

    #[test]
    fn empty_and_short_data() {
        assert!(find_peaks(&[], &PeakParams::default()).is_empty());
        assert!(find_peaks(&[1.0], &PeakParams::default()).is_empty());
        assert!(find_peaks(&[1.0, 2.0], &PeakParams::default()).is_empty());
    }

    #[test]
    fn monotonic_no_peaks() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(find_peaks(&data, &PeakParams::default()).is_empty());
    }

    #[test]
    fn gaussian_peak_width() {
        let sigma = 10.0;
        let data: Vec<f64> = (0..101)
            .map(|i| {
                let x = (f64::from(i) - 50.0) / sigma;
                (-0.5 * x * x).exp()
            })
            .collect();

        let peaks = find_peaks(&data, &PeakParams::default());
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].index, 50);
        // FWHM of a Gaussian is 2*sqrt(2*ln 2)*sigma ~ 23.55, minus the
        // small offset from the non-zero tails at the window edges
        assert!(peaks[0].width > 20.0);
        assert!(peaks[0].width < 30.0);
    }

    #[test]
    fn chromatographic_peaks() {
        let data: Vec<f64> = (0..200)
            .map(|i| {
                let x = f64::from(i);
                let p1 = 100.0 * (-0.5 * ((x - 40.0) / 5.0).powi(2)).exp();
                let p2 = 500.0 * (-0.5 * ((x - 100.0) / 8.0).powi(2)).exp();
                let p3 = 200.0 * (-0.5 * ((x - 160.0) / 6.0).powi(2)).exp();
                p1 + p2 + p3 + 10.0
            })
            .collect();

        let params = PeakParams::prominence_and_width(30.0, 3.0);
        let peaks = find_peaks(&data, &params);
        assert_eq!(peaks.len(), 3);
        assert_eq!(peaks[0].index, 40);
        assert_eq!(peaks[1].index, 100);
        assert_eq!(peaks[2].index, 160);
    }
}
