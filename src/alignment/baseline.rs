//! Background estimation from a blank run
//!
//! The baseline is the blank run's total-ion trace, smoothed with a centered
//! general-Gaussian weighted moving average. The smoother is undefined within
//! half a window of either end, so both edge regions are flattened to the mean
//! of the smoothed samples just inside them:
//!
//! ```text
//! [0, delay + window)            <- mean of [delay + window, delay + window + k)
//! [delay + window, n - window)      smoothed
//! [n - window, n)                <- mean of [n - window - k, n - window)
//! ```

use crate::scan::Run;

/// Smoothing and edge parameters, counted in scans.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaselineParams {
    /// Leading scans excluded from smoothing
    pub start_delay: usize,
    /// Interior samples averaged to fill each edge
    pub num_extrapolate: usize,
    /// Smoothing window length
    pub window: usize,
    /// Kernel standard deviation, in scans
    pub kernel_width: f64,
    /// Kernel shape; 1 is a plain Gaussian
    pub kernel_power: f64,
}

impl BaselineParams {
    /// Reject parameter sets the smoother cannot run with.
    pub fn validate(&self) -> Result<(), BaselineError> {
        if self.window == 0 {
            return Err(BaselineError::InvalidParameters(
                "window must be at least one scan".to_string(),
            ));
        }
        if self.num_extrapolate == 0 {
            return Err(BaselineError::InvalidParameters(
                "num_extrapolate must be at least one scan".to_string(),
            ));
        }
        if !(self.kernel_width > 0.0) || !(self.kernel_power > 0.0) {
            return Err(BaselineError::InvalidParameters(format!(
                "kernel width and power must be positive, got {} and {}",
                self.kernel_width, self.kernel_power
            )));
        }
        Ok(())
    }

    /// Fewest scans a blank run needs for both edge means to be defined.
    pub fn min_scans(&self) -> usize {
        self.start_delay + 2 * self.window + self.num_extrapolate
    }
}

/// Errors raised while estimating a baseline
#[derive(Debug, thiserror::Error)]
pub enum BaselineError {
    /// Parameters rejected before smoothing
    #[error("Invalid baseline parameters: {0}")]
    InvalidParameters(String),

    /// The blank run is too short for the window and edge lengths
    #[error("Blank run has {scans} scans after the start time, at least {required} are needed")]
    TooShort {
        /// Scans available
        scans: usize,
        /// Scans required
        required: usize,
    },
}

/// General Gaussian window of `m` points: `exp(-0.5 * |n / sigma|^(2 * power))`
/// with `n` centered on the middle of the window.
pub fn general_gaussian(m: usize, power: f64, sigma: f64) -> Vec<f64> {
    let center = (m as f64 - 1.0) / 2.0;
    (0..m)
        .map(|i| {
            let n = i as f64 - center;
            (-0.5 * (n / sigma).abs().powf(2.0 * power)).exp()
        })
        .collect()
}

/// Centered weighted moving average.
///
/// Sample `i` averages `values[i - w/2 ..= i + (w - 1 - w/2)]`, weighting by
/// `kernel`; `None` where the window does not fit inside `values`.
pub fn weighted_rolling_mean(values: &[f64], kernel: &[f64]) -> Vec<Option<f64>> {
    let w = kernel.len();
    let left = w / 2;
    let weight_sum: f64 = kernel.iter().sum();

    (0..values.len())
        .map(|i| {
            let start = i.checked_sub(left)?;
            let window = values.get(start..start + w)?;
            let weighted: f64 = window.iter().zip(kernel).map(|(v, k)| v * k).sum();
            Some(weighted / weight_sum)
        })
        .collect()
}

/// Baseline of a total-ion trace.
pub fn baseline_from_totals(
    totals: &[f64],
    params: &BaselineParams,
) -> Result<Vec<f64>, BaselineError> {
    params.validate()?;
    let n = totals.len();
    let required = params.min_scans();
    if n < required {
        return Err(BaselineError::TooShort { scans: n, required });
    }

    let kernel = general_gaussian(params.window, params.kernel_power, params.kernel_width);
    let mut baseline = vec![0.0; n];
    let smoothed = weighted_rolling_mean(&totals[params.start_delay..], &kernel);
    for (slot, value) in baseline[params.start_delay..].iter_mut().zip(smoothed) {
        *slot = value.unwrap_or(0.0);
    }

    let head = params.start_delay + params.window;
    let tail = n - params.window;
    let k = params.num_extrapolate;

    let head_fill = mean(&baseline[head..head + k]);
    let tail_fill = mean(&baseline[tail - k..tail]);
    baseline[..head].fill(head_fill);
    baseline[tail..].fill(tail_fill);

    Ok(baseline)
}

/// Baseline of the scans of `blank` after `start_time`.
pub fn estimate_baseline(
    blank: &Run,
    start_time: f64,
    params: &BaselineParams,
) -> Result<Vec<f64>, BaselineError> {
    let totals: Vec<f64> = blank
        .after(start_time)
        .iter()
        .map(|scan| scan.total_intensity())
        .collect();
    baseline_from_totals(&totals, params)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
