use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use gcms_align::mzxml::MzXmlSource;
use gcms_align::output::write_spectrum;
use gcms_align::viewer::ChromatogramView;

/// Print one scan's spectrum, or a scan range's concatenated spectra, as CSV
pub fn run(
    file: PathBuf,
    scan: Option<u32>,
    time: Option<f64>,
    until: Option<u32>,
    start_time: Option<f64>,
) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("Input file does not exist: {}", file.display());
    }

    let run = MzXmlSource::read_file(&file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let view = ChromatogramView::from_run(&run, start_time);

    let first = match (scan, time) {
        (Some(scan), _) => scan,
        (None, Some(time)) => view
            .nearest_scan(time)
            .with_context(|| format!("No scans in {}", file.display()))?,
        (None, None) => anyhow::bail!("Either --scan or --time is required"),
    };

    let ions = match until {
        Some(last) => {
            let selection = view
                .select(first, last)
                .with_context(|| format!("No scans between {} and {}", first, last))?;
            info!(
                "Scans {}..={}: {} ions, total intensity {}",
                selection.first_scan,
                selection.last_scan,
                selection.ions.len(),
                selection.total_intensity
            );
            selection.ions
        }
        None => {
            let spectrum = view
                .spectrum_at(first)
                .with_context(|| format!("Scan {} not found", first))?;
            info!(
                "Scan {} at {:.4} min: {} ions",
                spectrum.scan_num,
                spectrum.retention_time,
                spectrum.mz.len()
            );
            spectrum.ions()
        }
    };

    let stdout = std::io::stdout();
    write_spectrum(stdout.lock(), &ions).context("Failed to write spectrum")?;
    Ok(())
}
