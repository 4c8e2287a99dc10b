use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use gcms_align::alignment::{align, AlignmentFit};
use gcms_align::mzxml::MzXmlSource;
use gcms_align::output::{load_peak_table, save_alignment, save_peak_table};

use super::{detect::detect, load_config, source_ids};

/// Detect (or reload) peaks, then write regressions and aligned traces
pub fn run(
    files: Vec<PathBuf>,
    config: Option<PathBuf>,
    reference: Option<PathBuf>,
    peaks: Option<PathBuf>,
    output_dir: PathBuf,
) -> Result<()> {
    let config = load_config(config.as_ref())?;

    let table = match peaks {
        Some(path) => {
            info!("Reusing peak table {}", path.display());
            load_peak_table(&path)
                .with_context(|| format!("Failed to read peak table {}", path.display()))?
        }
        None => {
            let table = detect(&files, &config)?;
            std::fs::create_dir_all(&output_dir).with_context(|| {
                format!("Failed to create output directory {}", output_dir.display())
            })?;
            let peaks_path = output_dir.join("peaks.csv");
            save_peak_table(&peaks_path, &table)
                .with_context(|| format!("Failed to write {}", peaks_path.display()))?;
            table
        }
    };

    let reference = reference
        .map(|path| path.display().to_string())
        .or_else(|| config.alignment.reference.clone())
        .or_else(|| source_ids(&files).into_iter().next())
        .context("No reference file given")?;
    info!("Aligning onto {}", reference);

    let output = align(&MzXmlSource, &table, &config.alignment_params(reference))
        .context("Alignment failed")?;

    let skipped = output
        .regressions
        .iter()
        .filter(|r| matches!(r.fit, AlignmentFit::Skip { .. }))
        .count();
    info!(
        "Aligned {} file(s), skipped {}",
        output.regressions.len() - skipped,
        skipped
    );

    save_alignment(&output_dir, &output)
        .with_context(|| format!("Failed to write results to {}", output_dir.display()))?;
    info!("Results written to {}", output_dir.display());

    Ok(())
}
