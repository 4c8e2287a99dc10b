use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

use gcms_align::detection::{build_peak_table, PeakTable};
use gcms_align::mzxml::MzXmlSource;
use gcms_align::output::save_peak_table;

use super::{load_config, source_ids, Config};

/// Locate the configured compounds and write the peak table
pub fn run(files: Vec<PathBuf>, config: Option<PathBuf>, output: PathBuf) -> Result<()> {
    let config = load_config(config.as_ref())?;

    let table = detect(&files, &config)?;
    save_peak_table(&output, &table)
        .with_context(|| format!("Failed to write peak table {}", output.display()))?;

    info!("Peak table written to {}", output.display());
    Ok(())
}

/// Build the peak table for `files`, reporting how many compounds were found.
pub(super) fn detect(files: &[PathBuf], config: &Config) -> Result<PeakTable> {
    for file in files {
        if !file.exists() {
            anyhow::bail!("Input file does not exist: {}", file.display());
        }
    }

    let compounds = config.compound_windows();
    info!(
        "Detecting {} compound(s) in {} file(s)",
        compounds.len(),
        files.len()
    );

    let table = build_peak_table(
        &MzXmlSource,
        &source_ids(files),
        &compounds,
        &config.detection_params(),
    )
    .context("Peak detection failed")?;

    let found = table
        .records()
        .iter()
        .filter(|r| !r.outcome.is_absent())
        .count();
    info!("Found {} of {} compound peaks", found, table.len());

    Ok(table)
}
