//! TOML configuration file support.
//!
//! Every section is optional; omitted values fall back to the settings used
//! for cuticular hydrocarbon profiles (C23 to C29 alkanes):
//!
//! ```toml
//! # gcms.toml
//! [search]
//! start_time = 12.0
//! min_prominence = 230.0
//! prominence_stride = 10.0
//! local_max_margin = 2.0
//!
//! [[compound]]
//! id = "C23"
//! min_ion = 324.0
//! max_ion = 325.0
//! min_time = 13.0
//! max_time = 17.0
//! prominence = 250.0
//! width = 3.0
//!
//! [alignment]
//! reference = "runs/reference.mzXML"
//! normalization_time = 13.0
//! start_time = 12.0
//!
//! [alignment.baselines]
//! "runs/sample_1.mzXML" = "runs/hexane_blank.mzXML"
//! "runs/sample_2.mzXML" = "NA"
//!
//! [baseline]
//! start_delay = 0
//! num_extrapolate = 50
//! window = 300
//! kernel_width = 100.0
//! kernel_power = 1.0
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use gcms_align::alignment::{AlignmentParams, BaselineMap, BaselineParams, TraceParams};
use gcms_align::detection::{CompoundWindow, DetectionParams, IonWindow};

/// Root configuration structure for gcms.toml files.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Settings shared by every compound search.
    pub search: SearchConfig,

    /// Compounds to locate, in output order.
    #[serde(rename = "compound")]
    pub compounds: Vec<CompoundConfig>,

    /// Alignment and trace settings.
    pub alignment: AlignmentConfig,

    /// Baseline smoother settings.
    pub baseline: BaselineConfig,
}

/// The `[search]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub start_time: f64,
    pub min_prominence: f64,
    pub prominence_stride: f64,
    pub local_max_margin: f64,
}

/// One `[[compound]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CompoundConfig {
    pub id: String,
    pub min_ion: f64,
    pub max_ion: f64,
    pub min_time: f64,
    pub max_time: f64,
    #[serde(default = "default_prominence")]
    pub prominence: f64,
    #[serde(default = "default_width")]
    pub width: f64,
}

/// The `[alignment]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    /// Reference file; the first input when omitted.
    pub reference: Option<String>,
    pub normalization_time: f64,
    pub start_time: f64,
    /// Blank run per sample file (`NA` for none).
    pub baselines: HashMap<String, String>,
}

/// The `[baseline]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BaselineConfig {
    pub start_delay: usize,
    pub num_extrapolate: usize,
    pub window: usize,
    pub kernel_width: f64,
    pub kernel_power: f64,
}

fn default_prominence() -> f64 {
    250.0
}

fn default_width() -> f64 {
    3.0
}

impl Default for Config {
    fn default() -> Self {
        let alkane = |id: &str, min_ion: f64, min_time: f64| CompoundConfig {
            id: id.to_string(),
            min_ion,
            max_ion: min_ion + 1.0,
            min_time,
            max_time: min_time + 4.0,
            prominence: default_prominence(),
            width: default_width(),
        };
        Self {
            search: SearchConfig::default(),
            compounds: vec![
                alkane("C23", 324.0, 13.0),
                alkane("C25", 352.0, 15.0),
                alkane("C27", 380.0, 17.0),
                alkane("C29", 408.0, 19.0),
            ],
            alignment: AlignmentConfig::default(),
            baseline: BaselineConfig::default(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            start_time: 12.0,
            min_prominence: 230.0,
            prominence_stride: 10.0,
            local_max_margin: 2.0,
        }
    }
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            reference: None,
            normalization_time: 13.0,
            start_time: 12.0,
            baselines: HashMap::new(),
        }
    }
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            start_delay: 0,
            num_extrapolate: 50,
            window: 300,
            kernel_width: 100.0,
            kernel_power: 1.0,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }

    /// Check every value the pipeline would reject, before any file is read.
    pub fn validate(&self) -> Result<()> {
        if self.compounds.is_empty() {
            anyhow::bail!("Configuration lists no compounds");
        }
        self.detection_params()
            .validate(&self.compound_windows())
            .context("Invalid [search] or [[compound]] settings")?;
        self.baseline_params()
            .validate()
            .context("Invalid [baseline] settings")?;
        Ok(())
    }

    pub fn detection_params(&self) -> DetectionParams {
        DetectionParams {
            start_time: self.search.start_time,
            min_prominence: self.search.min_prominence,
            prominence_stride: self.search.prominence_stride,
            local_max_margin: self.search.local_max_margin,
        }
    }

    pub fn compound_windows(&self) -> Vec<CompoundWindow> {
        self.compounds
            .iter()
            .map(|c| CompoundWindow {
                id: c.id.clone(),
                ions: IonWindow::new(c.min_ion, c.max_ion),
                min_time: c.min_time,
                max_time: c.max_time,
                prominence: c.prominence,
                min_width: c.width,
            })
            .collect()
    }

    pub fn baseline_params(&self) -> BaselineParams {
        BaselineParams {
            start_delay: self.baseline.start_delay,
            num_extrapolate: self.baseline.num_extrapolate,
            window: self.baseline.window,
            kernel_width: self.baseline.kernel_width,
            kernel_power: self.baseline.kernel_power,
        }
    }

    /// Alignment parameters against `reference`.
    pub fn alignment_params(&self, reference: String) -> AlignmentParams {
        AlignmentParams {
            reference,
            baselines: self
                .alignment
                .baselines
                .iter()
                .map(|(file, blank)| (file.clone(), blank.clone()))
                .collect::<BaselineMap>(),
            traces: TraceParams {
                normalization_time: self.alignment.normalization_time,
                start_time: self.alignment.start_time,
            },
            baseline: self.baseline_params(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [search]
            start_time = 11.5
            prominence_stride = 5.0

            [[compound]]
            id = "C31"
            min_ion = 436.0
            max_ion = 437.0
            min_time = 21.0
            max_time = 25.0
            prominence = 300.0

            [alignment]
            reference = "ref.mzXML"

            [alignment.baselines]
            "a.mzXML" = "blank.mzXML"
            "b.mzXML" = "NA"

            [baseline]
            window = 120
        "#;

        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.search.start_time, 11.5);
        assert_eq!(config.search.prominence_stride, 5.0);
        assert_eq!(config.search.min_prominence, 230.0);
        assert_eq!(config.compounds.len(), 1);
        assert_eq!(config.compounds[0].prominence, 300.0);
        assert_eq!(config.compounds[0].width, 3.0);
        assert_eq!(config.alignment.reference.as_deref(), Some("ref.mzXML"));
        assert_eq!(config.baseline.window, 120);
        assert_eq!(config.baseline.num_extrapolate, 50);

        let params = config.alignment_params("ref.mzXML".to_string());
        assert_eq!(params.baselines.blank_for("a.mzXML"), Some("blank.mzXML"));
        assert_eq!(params.baselines.blank_for("b.mzXML"), None);
        config.validate().unwrap();
    }

    #[test]
    fn test_empty_config_uses_alkane_defaults() {
        let config = Config::from_str("").unwrap();
        let ids: Vec<&str> = config.compounds.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["C23", "C25", "C27", "C29"]);

        let c29 = &config.compound_windows()[3];
        assert_eq!(c29.ions, IonWindow::new(408.0, 409.0));
        assert_eq!((c29.min_time, c29.max_time), (19.0, 23.0));
        assert_eq!(config.alignment.normalization_time, 13.0);
        config.validate().unwrap();
    }

    #[test]
    fn test_rejects_non_positive_stride() {
        let config = Config::from_str("[search]\nprominence_stride = 0.0").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_ion_window() {
        let toml = r#"
            [[compound]]
            id = "C23"
            min_ion = 325.0
            max_ion = 324.0
            min_time = 13.0
            max_time = 17.0
        "#;
        let config = Config::from_str(toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_window() {
        let config = Config::from_str("[baseline]\nwindow = 0").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_compound_requires_bounds() {
        assert!(Config::from_str("[[compound]]\nid = \"C23\"").is_err());
    }
}
